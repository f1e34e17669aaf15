//! Line-oriented exam front end on stdin/stdout.

use std::fmt::Write as _;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use quiz_core::{Advance, IngestionOutcome, Phase, ScoreReport, Session, UserAnswer};
use services::ExamLoopService;

type AppResult<T> = Result<T, Box<dyn std::error::Error>>;

/// One parsed line of input while a question is on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ExamCommand {
    /// Zero-based option index.
    Choose(usize),
    Next,
    Back,
    Quit,
}

fn parse_exam_command(line: &str, option_count: usize) -> Option<ExamCommand> {
    match line.trim().to_ascii_lowercase().as_str() {
        "" | "n" | "next" => Some(ExamCommand::Next),
        "b" | "back" => Some(ExamCommand::Back),
        "q" | "quit" => Some(ExamCommand::Quit),
        other => other
            .parse::<usize>()
            .ok()
            .filter(|n| (1..=option_count).contains(n))
            .map(|n| ExamCommand::Choose(n - 1)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum MenuChoice {
    Retake,
    Load(PathBuf),
    Quit,
}

fn parse_menu_choice(line: &str, allow_retake: bool) -> Option<MenuChoice> {
    let trimmed = line.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "" => None,
        "r" | "retake" if allow_retake => Some(MenuChoice::Retake),
        "q" | "quit" => Some(MenuChoice::Quit),
        _ => Some(MenuChoice::Load(PathBuf::from(trimmed))),
    }
}

/// Stdin wrapper that treats end of input as a request to quit.
struct Input {
    lines: io::Lines<io::StdinLock<'static>>,
}

impl Input {
    fn stdin() -> Self {
        Self {
            lines: io::stdin().lock().lines(),
        }
    }

    fn prompt(&mut self, message: &str) -> AppResult<Option<String>> {
        print!("{message}");
        io::stdout().flush()?;
        Ok(self.lines.next().transpose()?)
    }
}

/// Drive one interactive session, starting with the document at `first`.
pub async fn run(service: &ExamLoopService, first: PathBuf) -> AppResult<()> {
    let mut session = service.new_session();
    let mut input = Input::stdin();
    let mut next_path = Some(first);

    loop {
        if let Some(path) = next_path.take() {
            load(service, &mut session, &path).await;
        }

        match session.phase() {
            Phase::Active => {
                if !take_exam(&mut session, &mut input)? {
                    return Ok(());
                }
            }
            Phase::Completed => {
                let report = service.score(&session)?;
                print!("{}", format_report(&report));
                let Some(line) = input.prompt("\n[r]etake, a new document path, or [q]uit: ")?
                else {
                    return Ok(());
                };
                match parse_menu_choice(&line, true) {
                    Some(MenuChoice::Retake) => session.retake()?,
                    Some(MenuChoice::Load(path)) => next_path = Some(path),
                    Some(MenuChoice::Quit) => return Ok(()),
                    None => {}
                }
            }
            Phase::Idle | Phase::Ingesting => {
                if let Some(err) = session.last_error() {
                    println!("Error: {err}");
                }
                let Some(line) = input.prompt("Document path, or [q]uit: ")? else {
                    return Ok(());
                };
                match parse_menu_choice(&line, false) {
                    Some(MenuChoice::Load(path)) => next_path = Some(path),
                    Some(MenuChoice::Quit) => return Ok(()),
                    Some(MenuChoice::Retake) | None => {}
                }
            }
        }
    }
}

async fn load(service: &ExamLoopService, session: &mut Session, path: &Path) {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            println!("Could not read {}: {err}", path.display());
            return;
        }
    };

    println!("Generating questions from {} ...", path.display());
    match service.upload(session, bytes).await {
        Ok(IngestionOutcome::Activated { questions }) => {
            println!("Ready: {questions} questions.\n");
        }
        Ok(IngestionOutcome::Failed | IngestionOutcome::Stale { .. }) => {}
        Err(err) => println!("Error: {err}"),
    }
}

/// Walk the active exam until it completes. Returns `false` if the user quit.
fn take_exam(session: &mut Session, input: &mut Input) -> AppResult<bool> {
    loop {
        let (Some(question), Some(progress)) = (session.current_question(), session.progress())
        else {
            return Ok(true);
        };
        let options = question.options().to_vec();
        let selected = session.answer_at(progress.position - 1).map(str::to_string);

        println!(
            "Question {} of {} ({} answered)",
            progress.position, progress.total, progress.answered
        );
        println!("{}", question.text());
        for (index, option) in options.iter().enumerate() {
            let marker = if selected.as_deref() == Some(option.as_str()) {
                '*'
            } else {
                ' '
            };
            println!(" {marker} {}) {option}", index + 1);
        }

        let next_label = if progress.is_last { "finish" } else { "next" };
        let Some(line) = input.prompt(&format!(
            "Option number, [n] {next_label}, [b]ack, [q]uit: "
        ))?
        else {
            return Ok(false);
        };

        let result = match parse_exam_command(&line, options.len()) {
            Some(ExamCommand::Choose(index)) => session.select_answer(&options[index]),
            Some(ExamCommand::Next) => session.advance().map(|step| {
                if step == Advance::Completed {
                    println!("\nExam complete.\n");
                }
            }),
            Some(ExamCommand::Back) => session.retreat().map(|_| ()),
            Some(ExamCommand::Quit) => return Ok(false),
            None => {
                println!("Please enter 1-{}, n, b or q.", options.len());
                Ok(())
            }
        };
        if let Err(err) = result {
            println!("{err}");
        }
        println!();
    }
}

fn format_report(report: &ScoreReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Attempt {}: {}/{} correct, {}/{} points ({}%)",
        report.attempt,
        report.correct_count,
        report.total_questions,
        report.total_points,
        report.max_points,
        report.percentage
    );
    if let Some(secs) = report.elapsed_secs {
        let _ = writeln!(out, "Time: {}m {:02}s", secs / 60, secs % 60);
    }

    for item in &report.items {
        let mark = if item.is_correct { "correct" } else { "wrong" };
        let _ = writeln!(out, "\n{}. {} [{mark}]", item.position + 1, item.text);
        match &item.user_answer {
            UserAnswer::Answered(answer) => {
                let _ = writeln!(out, "   Your answer: {answer}");
            }
            UserAnswer::Unanswered => {
                let _ = writeln!(out, "   Your answer: (none)");
            }
        }
        if item.show_correct_answer() {
            let _ = writeln!(out, "   Correct answer: {}", item.correct_answer);
        }
        if let Some(explanation) = &item.explanation {
            let _ = writeln!(out, "   {explanation}");
        }
    }
    out
}
