use std::sync::Arc;

use async_trait::async_trait;
use quiz_core::DocumentKind;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tracing::debug;

use crate::error::ExtractionError;

const PAGE_BREAK: char = '\u{000C}';
const UTF8_BOM: char = '\u{FEFF}';

/// Plain text of a document, one entry per page in reading order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractedText {
    pages: Vec<String>,
}

impl ExtractedText {
    /// Keeps page order and drops pages that are blank.
    #[must_use]
    pub fn new(pages: impl IntoIterator<Item = String>) -> Self {
        Self {
            pages: pages
                .into_iter()
                .filter(|p| !p.trim().is_empty())
                .collect(),
        }
    }

    #[must_use]
    pub fn pages(&self) -> &[String] {
        &self.pages
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.pages.is_empty()
    }

    /// All pages joined with a blank line between them.
    #[must_use]
    pub fn joined(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.trim())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Document-to-text collaborator.
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    /// Whether this extractor can read documents of `kind`.
    fn supports(&self, kind: DocumentKind) -> bool;

    /// Extract the text of a document.
    ///
    /// # Errors
    ///
    /// Returns `ExtractionError` if the document cannot be read.
    async fn extract(
        &self,
        kind: DocumentKind,
        bytes: &[u8],
    ) -> Result<ExtractedText, ExtractionError>;
}

/// Reads plain-text uploads in-process. Form feeds mark page boundaries.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTextExtractor;

#[async_trait]
impl DocumentExtractor for LocalTextExtractor {
    fn supports(&self, kind: DocumentKind) -> bool {
        kind == DocumentKind::PlainText
    }

    async fn extract(
        &self,
        kind: DocumentKind,
        bytes: &[u8],
    ) -> Result<ExtractedText, ExtractionError> {
        if !self.supports(kind) {
            return Err(ExtractionError::Unsupported(kind));
        }
        let text = std::str::from_utf8(bytes).map_err(|_| ExtractionError::InvalidEncoding)?;
        let text = text.trim_start_matches(UTF8_BOM);
        Ok(ExtractedText::new(text.split(PAGE_BREAK).map(str::to_string)))
    }
}

/// Sends documents to an HTTP document-to-text service.
///
/// The service receives the raw bytes with a matching `Content-Type` and must
/// answer with `{"pages": ["...", ...]}`.
#[derive(Clone)]
pub struct RemoteExtractor {
    client: Client,
    url: String,
}

impl RemoteExtractor {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    pages: Vec<String>,
}

#[async_trait]
impl DocumentExtractor for RemoteExtractor {
    fn supports(&self, _kind: DocumentKind) -> bool {
        true
    }

    async fn extract(
        &self,
        kind: DocumentKind,
        bytes: &[u8],
    ) -> Result<ExtractedText, ExtractionError> {
        debug!(url = %self.url, %kind, bytes = bytes.len(), "calling extraction service");
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, kind.mime_type())
            .body(bytes.to_vec())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ExtractionError::HttpStatus(response.status()));
        }

        let body: ExtractResponse = response.json().await?;
        Ok(ExtractedText::new(body.pages))
    }
}

/// Routes each document to the first extractor that supports its kind.
#[derive(Clone, Default)]
pub struct DocumentExtractors {
    extractors: Vec<Arc<dyn DocumentExtractor>>,
}

impl DocumentExtractors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, extractor: Arc<dyn DocumentExtractor>) -> Self {
        self.extractors.push(extractor);
        self
    }

    /// Local plain-text reading, plus the remote service when a URL is given.
    #[must_use]
    pub fn standard(extract_url: Option<&str>) -> Self {
        let chain = Self::new().with(Arc::new(LocalTextExtractor));
        match extract_url {
            Some(url) => chain.with(Arc::new(RemoteExtractor::new(url))),
            None => chain,
        }
    }
}

#[async_trait]
impl DocumentExtractor for DocumentExtractors {
    fn supports(&self, kind: DocumentKind) -> bool {
        self.extractors.iter().any(|e| e.supports(kind))
    }

    async fn extract(
        &self,
        kind: DocumentKind,
        bytes: &[u8],
    ) -> Result<ExtractedText, ExtractionError> {
        let extractor = self
            .extractors
            .iter()
            .find(|e| e.supports(kind))
            .ok_or(ExtractionError::Unsupported(kind))?;
        extractor.extract(kind, bytes).await
    }
}
