//! Export schema translation for chunked documents.
//!
//! Pure transforms from a [`FileRecord`] plus its ordered [`Chunk`]s into
//! the JSON layouts understood by downstream RAG tooling.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::chunk::Chunk;
use crate::file::FileRecord;

/// Index name used by the Elasticsearch layout.
pub const ELASTICSEARCH_INDEX_NAME: &str = "smartrag_docs";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportSchema {
    #[default]
    Standard,
    Dify,
    Elasticsearch,
}

impl ExportSchema {
    pub const ALL: [ExportSchema; 3] = [Self::Standard, Self::Dify, Self::Elasticsearch];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Dify => "dify",
            Self::Elasticsearch => "elasticsearch",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Standard => "Standard JSON layout with every chunk representation",
            Self::Dify => "Dify knowledge base import layout",
            Self::Elasticsearch => "Elasticsearch bulk document layout",
        }
    }

    /// Per-chunk fields emitted by this schema.
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            Self::Standard => &[
                "chunk_index",
                "content",
                "html_content",
                "markdown_content",
                "metadata",
            ],
            Self::Dify => &["text", "metadata", "source"],
            Self::Elasticsearch => &["content", "title", "metadata", "timestamp", "source_file"],
        }
    }
}

/// Request body of `POST /export/json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub schema_type: ExportSchema,
    #[serde(default = "default_include_metadata")]
    pub include_metadata: bool,
}

fn default_include_metadata() -> bool {
    true
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            schema_type: ExportSchema::default(),
            include_metadata: true,
        }
    }
}

/// Description of one schema, as listed by `GET /export/schemas`.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaDescription {
    pub name: &'static str,
    pub description: &'static str,
    pub fields: &'static [&'static str],
}

pub fn schema_descriptions() -> Vec<SchemaDescription> {
    ExportSchema::ALL
        .iter()
        .map(|s| SchemaDescription {
            name: s.as_str(),
            description: s.description(),
            fields: s.fields(),
        })
        .collect()
}

/// Translate a file and its chunks into the configured schema.
///
/// `chunks` must already be ordered by `chunk_index`.
pub fn build_export(file: &FileRecord, chunks: &[Chunk], config: &ExportConfig) -> Value {
    match config.schema_type {
        ExportSchema::Standard => standard(file, chunks, config.include_metadata),
        ExportSchema::Dify => dify(file, chunks, config.include_metadata),
        ExportSchema::Elasticsearch => elasticsearch(file, chunks, config.include_metadata),
    }
}

fn standard(file: &FileRecord, chunks: &[Chunk], include_metadata: bool) -> Value {
    let items: Vec<Value> = chunks
        .iter()
        .map(|c| {
            let mut item = Map::new();
            item.insert("chunk_index".into(), json!(c.chunk_index));
            item.insert("content".into(), json!(c.content));
            item.insert("html_content".into(), json!(c.html_content));
            item.insert("markdown_content".into(), json!(c.markdown_content));
            with_metadata(item, c, include_metadata)
        })
        .collect();

    json!({
        "file_id": file.id,
        "filename": file.original_filename,
        "total_chunks": chunks.len(),
        "export_time": Utc::now(),
        "chunks": items,
    })
}

fn dify(file: &FileRecord, chunks: &[Chunk], include_metadata: bool) -> Value {
    let items: Vec<Value> = chunks
        .iter()
        .map(|c| {
            let mut item = Map::new();
            item.insert("text".into(), json!(c.content));
            item.insert("source".into(), json!(file.original_filename));
            with_metadata(item, c, include_metadata)
        })
        .collect();

    json!({
        "file_info": {
            "filename": file.original_filename,
            "source": file.original_filename,
            "created_at": file.uploaded_at,
        },
        "chunks": items,
    })
}

fn elasticsearch(file: &FileRecord, chunks: &[Chunk], include_metadata: bool) -> Value {
    let documents: Vec<Value> = chunks
        .iter()
        .map(|c| {
            let mut item = Map::new();
            item.insert("content".into(), json!(c.content));
            item.insert(
                "title".into(),
                json!(format!("{} - Chunk {}", file.original_filename, c.chunk_index + 1)),
            );
            item.insert("timestamp".into(), json!(c.created_at));
            item.insert("source_file".into(), json!(file.original_filename));
            with_metadata(item, c, include_metadata)
        })
        .collect();

    json!({
        "index_name": ELASTICSEARCH_INDEX_NAME,
        "documents": documents,
    })
}

fn with_metadata(mut item: Map<String, Value>, chunk: &Chunk, include_metadata: bool) -> Value {
    if include_metadata {
        item.insert("metadata".into(), chunk.metadata.clone());
    }
    Value::Object(item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkUnit;

    fn fixture() -> (FileRecord, Vec<Chunk>) {
        let file = FileRecord::new(
            uuid::Uuid::new_v4(),
            "x.txt",
            "report.txt",
            "uploads/x.txt",
            10,
            "text/plain",
        );
        let subject = file.id.to_string();
        let chunks = (0..3)
            .map(|i| {
                let unit = ChunkUnit::from_text(i, format!("chunk {i}"), json!({"page": 1}));
                Chunk::from_unit(subject.clone(), i as i32, unit)
            })
            .collect();
        (file, chunks)
    }

    #[test]
    fn standard_layout_lists_all_chunks() {
        let (file, chunks) = fixture();
        let out = build_export(&file, &chunks, &ExportConfig::default());
        assert_eq!(out["filename"], "report.txt");
        assert_eq!(out["total_chunks"], 3);
        assert_eq!(out["chunks"][2]["chunk_index"], 2);
        assert_eq!(out["chunks"][0]["metadata"]["page"], 1);
    }

    #[test]
    fn dify_layout_uses_text_and_source() {
        let (file, chunks) = fixture();
        let config = ExportConfig {
            schema_type: ExportSchema::Dify,
            include_metadata: true,
        };
        let out = build_export(&file, &chunks, &config);
        assert_eq!(out["file_info"]["source"], "report.txt");
        assert_eq!(out["chunks"][1]["text"], "chunk 1");
        assert_eq!(out["chunks"][1]["source"], "report.txt");
    }

    #[test]
    fn elasticsearch_titles_are_one_based() {
        let (file, chunks) = fixture();
        let config = ExportConfig {
            schema_type: ExportSchema::Elasticsearch,
            include_metadata: true,
        };
        let out = build_export(&file, &chunks, &config);
        assert_eq!(out["index_name"], ELASTICSEARCH_INDEX_NAME);
        assert_eq!(out["documents"][0]["title"], "report.txt - Chunk 1");
    }

    #[test]
    fn metadata_can_be_excluded() {
        let (file, chunks) = fixture();
        let config = ExportConfig {
            schema_type: ExportSchema::Standard,
            include_metadata: false,
        };
        let out = build_export(&file, &chunks, &config);
        assert!(out["chunks"][0].get("metadata").is_none());
    }

    #[test]
    fn every_schema_is_described() {
        let names: Vec<_> = schema_descriptions().iter().map(|s| s.name).collect();
        assert_eq!(names, ["standard", "dify", "elasticsearch"]);
    }
}
