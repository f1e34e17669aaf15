use std::env;
use std::time::Duration;

use quiz_core::ScoringPolicy;

/// Connection settings for an OpenAI-compatible chat completions endpoint.
#[derive(Clone, Debug)]
pub struct GenerationConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl GenerationConfig {
    /// Read `EXAM_AI_API_KEY`, `EXAM_AI_BASE_URL` and `EXAM_AI_MODEL`.
    ///
    /// Returns `None` when no API key is set, which leaves generation disabled.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        Self::from_vars(|name| env::var(name).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let api_key = var("EXAM_AI_API_KEY").filter(|key| !key.trim().is_empty())?;
        let base_url = var("EXAM_AI_BASE_URL").unwrap_or_else(|| "https://api.openai.com/v1".into());
        let model = var("EXAM_AI_MODEL").unwrap_or_else(|| "gpt-4o-mini".into());
        Some(Self {
            base_url,
            api_key,
            model,
        })
    }
}

/// Limits applied by the ingestion adapter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IngestionSettings {
    /// Characters of extracted text passed to the generator.
    pub max_text_chars: usize,
    /// Number of questions requested from the generator.
    pub target_questions: usize,
    pub extract_timeout: Duration,
    pub generate_timeout: Duration,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            max_text_chars: 30_000,
            target_questions: 25,
            extract_timeout: Duration::from_secs(30),
            generate_timeout: Duration::from_secs(120),
        }
    }
}

/// Process-wide configuration for building and scoring exams.
#[derive(Clone, Debug, Default)]
pub struct ExamConfig {
    pub ingestion: IngestionSettings,
    pub scoring: ScoringPolicy,
    /// Remote document-to-text endpoint, used for documents the local
    /// extractor cannot read.
    pub extract_url: Option<String>,
    pub generation: Option<GenerationConfig>,
    /// Fixed shuffle seed for reproducible exams.
    pub shuffle_seed: Option<u64>,
}

impl ExamConfig {
    /// Read every `EXAM_*` variable, falling back to defaults for missing,
    /// unparsable or zero limits.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(|name| env::var(name).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let parse = |name: &str| var(name).and_then(|v| v.trim().parse::<u64>().ok());
        let positive = |name: &str| {
            parse(name)
                .filter(|n| *n > 0)
                .and_then(|n| usize::try_from(n).ok())
        };

        let default = IngestionSettings::default();
        let ingestion = IngestionSettings {
            max_text_chars: positive("EXAM_MAX_TEXT_CHARS").unwrap_or(default.max_text_chars),
            target_questions: positive("EXAM_TARGET_QUESTIONS")
                .unwrap_or(default.target_questions),
            extract_timeout: parse("EXAM_EXTRACT_TIMEOUT_SECS")
                .map_or(default.extract_timeout, Duration::from_secs),
            generate_timeout: parse("EXAM_GENERATE_TIMEOUT_SECS")
                .map_or(default.generate_timeout, Duration::from_secs),
        };
        let scoring = parse("EXAM_POINTS_PER_QUESTION")
            .and_then(|n| u32::try_from(n).ok())
            .map_or_else(ScoringPolicy::default, ScoringPolicy::new);
        let extract_url = var("EXAM_EXTRACT_URL").filter(|url| !url.trim().is_empty());

        Self {
            ingestion,
            scoring,
            extract_url,
            generation: GenerationConfig::from_vars(&var),
            shuffle_seed: parse("EXAM_SHUFFLE_SEED"),
        }
    }
}
