//! Chunk records and chunking parameters.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::CoreError;
use crate::types::Timestamp;

/// Default target chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: u32 = 500;

/// Default overlap between consecutive fixed-size chunks.
pub const DEFAULT_CHUNK_OVERLAP: u32 = 50;

/// How a document is split into chunks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkMethod {
    #[default]
    Paragraph,
    Page,
    Heading,
    Fixed,
}

impl ChunkMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Paragraph => "paragraph",
            Self::Page => "page",
            Self::Heading => "heading",
            Self::Fixed => "fixed",
        }
    }
}

impl fmt::Display for ChunkMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of a chunking job, stored verbatim as the task config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_overlap"))]
pub struct ChunkConfig {
    #[serde(default = "default_chunk_size")]
    #[validate(range(min = 1, message = "chunk_size must be at least 1"))]
    pub chunk_size: u32,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: u32,
    #[serde(default)]
    pub chunk_method: ChunkMethod,
}

fn default_chunk_size() -> u32 {
    DEFAULT_CHUNK_SIZE
}

fn default_chunk_overlap() -> u32 {
    DEFAULT_CHUNK_OVERLAP
}

fn validate_overlap(config: &ChunkConfig) -> Result<(), ValidationError> {
    if config.chunk_overlap >= config.chunk_size {
        let mut err = ValidationError::new("chunk_overlap");
        err.message = Some("chunk_overlap must be smaller than chunk_size".into());
        return Err(err);
    }
    Ok(())
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            chunk_method: ChunkMethod::default(),
        }
    }
}

impl ChunkConfig {
    /// Validate field rules plus the deployment's size ceiling.
    pub fn check(&self, max_chunk_size: u32) -> Result<(), CoreError> {
        self.validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;
        if self.chunk_size > max_chunk_size {
            return Err(CoreError::Validation(format!(
                "chunk_size {} exceeds the maximum of {max_chunk_size}",
                self.chunk_size
            )));
        }
        Ok(())
    }

    /// Read a config back out of a task's parameter bag, falling back to
    /// defaults for missing fields.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, CoreError> {
        serde_json::from_value(value.clone())
            .map_err(|e| CoreError::Validation(format!("Invalid chunk config: {e}")))
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "chunk_size": self.chunk_size,
            "chunk_overlap": self.chunk_overlap,
            "chunk_method": self.chunk_method,
        })
    }
}

/// One unit of work produced by a chunk provider, before it is bound to a
/// subject and index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkUnit {
    pub content: String,
    pub html_content: Option<String>,
    pub markdown_content: Option<String>,
    pub metadata: serde_json::Value,
}

impl ChunkUnit {
    /// Build a unit from plain text, deriving the HTML and Markdown forms.
    ///
    /// `position` is 0-based; the Markdown heading uses the 1-based number.
    pub fn from_text(position: usize, content: impl Into<String>, metadata: serde_json::Value) -> Self {
        let content = content.into();
        let html_content = Some(render_html(&content));
        let markdown_content = Some(format!("## Chunk {}\n\n{}", position + 1, content.trim()));
        Self {
            content,
            html_content,
            markdown_content,
            metadata,
        }
    }
}

/// A persisted chunk. Append-only: never rewritten once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub subject_id: String,
    /// 0-based, contiguous and unique per subject.
    pub chunk_index: i32,
    pub content: String,
    pub html_content: Option<String>,
    pub markdown_content: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: Timestamp,
}

impl Chunk {
    pub fn from_unit(subject_id: impl Into<String>, chunk_index: i32, unit: ChunkUnit) -> Self {
        Self {
            subject_id: subject_id.into(),
            chunk_index,
            content: unit.content,
            html_content: unit.html_content,
            markdown_content: unit.markdown_content,
            metadata: unit.metadata,
            created_at: Utc::now(),
        }
    }
}

/// Wrap each blank-line separated paragraph in `<p>`, escaping markup.
pub fn render_html(content: &str) -> String {
    content
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| format!("<p>{}</p>", escape_html(p)))
        .collect()
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
