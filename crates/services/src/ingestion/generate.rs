use async_trait::async_trait;
use quiz_core::QuestionDraft;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::GenerationConfig;
use crate::error::GenerationError;

/// Question-generation collaborator.
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    /// Produce up to `target_count` question candidates from `text`.
    ///
    /// Output order carries no meaning and candidates are not yet validated.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError` on transport, quota or format failures.
    async fn generate(
        &self,
        text: &str,
        target_count: usize,
    ) -> Result<Vec<QuestionDraft>, GenerationError>;
}

/// Generates questions through an OpenAI-compatible chat completions API.
#[derive(Clone)]
pub struct ChatQuestionGenerator {
    client: Client,
    config: Option<GenerationConfig>,
}

impl ChatQuestionGenerator {
    #[must_use]
    pub fn new(config: Option<GenerationConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl QuestionGenerator for ChatQuestionGenerator {
    async fn generate(
        &self,
        text: &str,
        target_count: usize,
    ) -> Result<Vec<QuestionDraft>, GenerationError> {
        let config = self.config.as_ref().ok_or(GenerationError::Disabled)?;

        let url = format!(
            "{}/chat/completions",
            config.base_url.trim_end_matches('/')
        );
        let payload = ChatRequest {
            model: config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: build_prompt(text, target_count),
                },
            ],
            temperature: 0.2,
        };

        debug!(model = %config.model, chars = text.chars().count(), target_count, "requesting questions");
        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GenerationError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(GenerationError::EmptyResponse)?;

        parse_candidates(&content)
    }
}

const SYSTEM_PROMPT: &str = "You write multiple-choice exam questions strictly from the \
material you are given. You answer with JSON only.";

/// Instructions sent with the document text.
#[must_use]
pub fn build_prompt(text: &str, target_count: usize) -> String {
    format!(
        "Create up to {target_count} multiple-choice questions that test understanding of the \
material below.\n\
If the material supports fewer than {target_count} good questions, return only those; \
never invent filler questions or facts that are not in the material.\n\
Answer with a JSON array. Each element must be an object with:\n\
- \"id\": a unique integer starting at 1\n\
- \"text\": the question\n\
- \"options\": exactly 4 distinct answer strings\n\
- \"correct_answer\": the correct option, copied exactly from \"options\"\n\
- \"explanation\": one sentence on why the answer is correct\n\n\
MATERIAL:\n{text}"
    )
}

/// Parse model output into question candidates.
///
/// Accepts a bare JSON array or an object with a `questions` array, optionally
/// wrapped in a Markdown code fence. Elements that are not question-shaped are
/// skipped so one bad item does not sink the batch.
///
/// # Errors
///
/// Returns `GenerationError::Malformed` if no JSON array can be read.
pub fn parse_candidates(content: &str) -> Result<Vec<QuestionDraft>, GenerationError> {
    let json = strip_code_fence(content);
    let items = match serde_json::from_str::<Value>(json)? {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("questions") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    let total = items.len();
    let drafts: Vec<QuestionDraft> = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(draft) => Some(draft),
            Err(err) => {
                warn!(index, %err, "skipping malformed question candidate");
                None
            }
        })
        .collect();
    debug!(total, parsed = drafts.len(), "parsed question candidates");
    Ok(drafts)
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the opening fence line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().trim_end_matches("```").trim()
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}
