//! Splitting of UTF-8 text documents.
//!
//! Sizes are counted in characters, not bytes. Every strategy falls back to
//! fixed windows for a piece that is still larger than `chunk_size`.

use std::collections::VecDeque;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::json;
use smartrag_core::chunk::{ChunkConfig, ChunkMethod, ChunkUnit};
use smartrag_core::error::CoreError;
use smartrag_core::task::Task;

use crate::chunker::UnitStream;

/// One or more blank lines.
static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n\s*").expect("valid regex"));

/// A Markdown ATX heading at the start of a line.
static HEADING_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{1,6}[ \t]+\S").expect("valid regex"));

/// Form feed, the page separator emitted by most text extractors.
const PAGE_BREAK: char = '\u{000C}';

#[derive(Debug, Clone, Default)]
pub struct TextChunker;

impl TextChunker {
    pub fn new() -> Self {
        Self
    }

    /// Read `path` and open a stream over its pieces.
    pub async fn open_file(&self, task: &Task, path: &str) -> Result<Box<dyn UnitStream>, CoreError> {
        let config = ChunkConfig::from_value(&task.config)?;
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CoreError::Upstream(format!("Failed to read {path}: {e}")))?;
        Ok(Box::new(self.open_text(&text, &config)))
    }

    fn open_text(&self, text: &str, config: &ChunkConfig) -> TextUnits {
        let pieces: VecDeque<String> = split_text(text, config).into();
        TextUnits {
            total: pieces.len(),
            pieces,
            next: 0,
            method: config.chunk_method,
        }
    }
}

struct TextUnits {
    pieces: VecDeque<String>,
    total: usize,
    next: usize,
    method: ChunkMethod,
}

#[async_trait]
impl UnitStream for TextUnits {
    fn total_units(&self) -> Option<usize> {
        Some(self.total)
    }

    async fn next_unit(&mut self) -> Result<Option<ChunkUnit>, CoreError> {
        let Some(content) = self.pieces.pop_front() else {
            return Ok(None);
        };
        let position = self.next;
        self.next += 1;
        // Give cancellation a chance between units of a large file.
        tokio::task::yield_now().await;

        let metadata = json!({
            "method": self.method,
            "chars": content.chars().count(),
            "type": "text",
        });
        Ok(Some(ChunkUnit::from_text(position, content, metadata)))
    }
}

/// Split `text` into trimmed, non-empty pieces according to `config`.
pub fn split_text(text: &str, config: &ChunkConfig) -> Vec<String> {
    let size = config.chunk_size.max(1) as usize;
    let overlap = (config.chunk_overlap as usize).min(size - 1);

    match config.chunk_method {
        ChunkMethod::Fixed => fixed_windows(text.trim(), size, overlap),
        ChunkMethod::Paragraph => {
            let paragraphs = PARAGRAPH_BREAK.split(text).map(str::trim);
            pack(paragraphs, size, overlap)
        }
        ChunkMethod::Heading => sections(text)
            .into_iter()
            .flat_map(|s| fixed_windows(s.trim(), size, overlap))
            .collect(),
        ChunkMethod::Page => text
            .split(PAGE_BREAK)
            .flat_map(|p| fixed_windows(p.trim(), size, overlap))
            .collect(),
    }
}

/// Greedily join consecutive paragraphs while they fit in `size`.
fn pack<'a>(paragraphs: impl Iterator<Item = &'a str>, size: usize, overlap: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for paragraph in paragraphs.filter(|p| !p.is_empty()) {
        let len = paragraph.chars().count();
        if len > size {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
                current_len = 0;
            }
            out.extend(fixed_windows(paragraph, size, overlap));
            continue;
        }

        let joined = if current.is_empty() { len } else { current_len + 2 + len };
        if joined > size {
            out.push(std::mem::take(&mut current));
            current.push_str(paragraph);
            current_len = len;
        } else {
            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(paragraph);
            current_len = joined;
        }
    }

    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Cut before every Markdown heading. Text before the first heading is its
/// own section.
fn sections(text: &str) -> Vec<&str> {
    let mut starts: Vec<usize> = HEADING_LINE.find_iter(text).map(|m| m.start()).collect();
    if starts.first() != Some(&0) {
        starts.insert(0, 0);
    }
    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(text.len());
            &text[start..end]
        })
        .collect()
}

/// Windows of `size` characters advancing by `size - overlap`.
fn fixed_windows(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }
    let step = size - overlap;
    let mut out = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + size).min(chars.len());
        let piece: String = chars[start..end].iter().collect();
        let piece = piece.trim();
        if !piece.is_empty() {
            out.push(piece.to_string());
        }
        if end == chars.len() {
            break;
        }
        start += step;
    }
    out
}
