use std::fmt;
use std::path::PathBuf;

use quiz_core::ScoringPolicy;
use services::{ExamConfig, ExamLoopService};
use tracing_subscriber::EnvFilter;

mod terminal;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingPath,
    UnknownArg(String),
    InvalidSeed { raw: String },
    InvalidPoints { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingPath => write!(f, "a document path is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidSeed { raw } => write!(f, "invalid --seed value: {raw}"),
            ArgsError::InvalidPoints { raw } => write!(f, "invalid --points value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- <document> [--seed <u64>] [--points <n>]");
    eprintln!();
    eprintln!("Documents: PDF (needs EXAM_EXTRACT_URL) or UTF-8 plain text.");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  EXAM_AI_API_KEY, EXAM_AI_BASE_URL, EXAM_AI_MODEL");
    eprintln!("  EXAM_EXTRACT_URL, EXAM_MAX_TEXT_CHARS, EXAM_TARGET_QUESTIONS");
    eprintln!("  EXAM_POINTS_PER_QUESTION, EXAM_SHUFFLE_SEED");
    eprintln!("  RUST_LOG (default: warn)");
}

struct Args {
    path: PathBuf,
    seed: Option<u64>,
    points: Option<u32>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Option<Self>, ArgsError> {
        let mut path = None;
        let mut seed = None;
        let mut points = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--seed" => {
                    let value = require_value(args, "--seed")?;
                    let parsed = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidSeed { raw: value.clone() })?;
                    seed = Some(parsed);
                }
                "--points" => {
                    let value = require_value(args, "--points")?;
                    let parsed = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidPoints { raw: value.clone() })?;
                    points = Some(parsed);
                }
                "--help" | "-h" => return Ok(None),
                _ if arg.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ if path.is_none() => path = Some(PathBuf::from(arg)),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let path = path.ok_or(ArgsError::MissingPath)?;
        Ok(Some(Self { path, seed, points }))
    }
}

fn init_tracing() {
    // Logs go to stderr so they never interleave with the exam on stdout.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let parsed = match Args::parse(&mut argv) {
        Ok(Some(parsed)) => parsed,
        Ok(None) => {
            print_usage();
            return Ok(());
        }
        Err(err) => {
            print_usage();
            return Err(err.into());
        }
    };

    let mut config = ExamConfig::from_env();
    if let Some(seed) = parsed.seed {
        config.shuffle_seed = Some(seed);
    }
    if let Some(points) = parsed.points {
        config.scoring = ScoringPolicy::new(points);
    }
    if config.generation.is_none() {
        tracing::warn!("EXAM_AI_API_KEY is not set; question generation will fail");
    }

    let service = ExamLoopService::from_config(&config);
    terminal::run(&service, parsed.path).await
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Option<Args>, ArgsError> {
        Args::parse(&mut args.iter().map(|a| (*a).to_string()))
    }

    #[test]
    fn parses_path_and_flags() {
        let args = parse(&["notes.txt", "--seed", "42", "--points", "3"])
            .unwrap()
            .unwrap();
        assert_eq!(args.path, PathBuf::from("notes.txt"));
        assert_eq!(args.seed, Some(42));
        assert_eq!(args.points, Some(3));
    }

    #[test]
    fn help_short_circuits() {
        assert!(parse(&["--help"]).unwrap().is_none());
    }

    #[test]
    fn errors_are_returned_for_the_caller_to_report() {
        assert!(matches!(parse(&[]), Err(ArgsError::MissingPath)));
        assert!(matches!(
            parse(&["a.txt", "--seed"]),
            Err(ArgsError::MissingValue { flag: "--seed" })
        ));
        let err = parse(&["a.txt", "--points", "many"]).err().unwrap();
        assert_eq!(err.to_string(), "invalid --points value: many");
        assert!(matches!(
            parse(&["a.txt", "b.txt"]),
            Err(ArgsError::UnknownArg(arg)) if arg == "b.txt"
        ));
    }
}
