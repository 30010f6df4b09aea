//! Vector storage: entry types, the [`VectorStore`] contract and its backends.
//!
//! Scores are cosine *distances* (`1 - cosine similarity`): lower is closer,
//! and searches return results in non-decreasing score order, the same
//! convention as pgvector's `<=>` operator.

pub mod memory;
pub mod pgvector;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::chunker::ChunkRecord;
use crate::error::{ConfigError, StoreError};

pub use memory::MemoryStore;
pub use pgvector::PgVectorStore;

/// Default collection (table) name.
pub const DEFAULT_COLLECTION: &str = "pdf_chunks";
/// Metadata key holding the `provider/model` that produced an entry's vector.
pub const EMBEDDING_MODEL_KEY: &str = "embedding_model";

/// One embedded chunk as persisted by a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    /// Stable identity derived from source, page and chunk position.
    pub id: Uuid,
    pub embedding: Vec<f32>,
    /// Chunk text handed to the prompt as context.
    pub document: String,
    /// Optional structured attributes (`source`, `page`, `chunk_index`, ...).
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl StoredEntry {
    /// Pairs a chunk with its embedding.
    pub fn from_chunk(chunk: &ChunkRecord, embedding: Vec<f32>) -> Self {
        let mut metadata = Map::new();
        metadata.insert("source".into(), Value::from(chunk.source_path.clone()));
        metadata.insert("page".into(), Value::from(chunk.page_index));
        metadata.insert("chunk_index".into(), Value::from(chunk.chunk_index));
        metadata.insert("char_start".into(), Value::from(chunk.char_start));
        metadata.insert("char_end".into(), Value::from(chunk.char_end));
        Self {
            id: entry_id(&chunk.source_path, chunk.page_index, chunk.chunk_index),
            embedding,
            document: chunk.text.clone(),
            metadata,
        }
    }

    /// Records the embedding model identity in the entry metadata.
    pub fn with_embedding_model(mut self, model_id: &str) -> Self {
        self.metadata.insert(EMBEDDING_MODEL_KEY.into(), Value::from(model_id));
        self
    }

    /// Embedding model recorded by [`StoredEntry::with_embedding_model`].
    pub fn embedding_model(&self) -> Option<&str> {
        self.metadata.get(EMBEDDING_MODEL_KEY).and_then(Value::as_str)
    }

    /// Source document path recorded in the metadata.
    pub fn source(&self) -> Option<&str> {
        self.metadata.get("source").and_then(Value::as_str)
    }
}

/// Deterministic id, so re-ingesting a document replaces its entries.
pub fn entry_id(source_path: &str, page_index: usize, chunk_index: usize) -> Uuid {
    let name = format!("pdfrag:{source_path}#page={page_index}&chunk={chunk_index}");
    Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes())
}

/// A stored entry matched by a similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub entry: StoredEntry,
    /// Cosine distance to the query; lower means more similar.
    pub score: f32,
}

/// Persistence and nearest-neighbour search over [`StoredEntry`] values.
pub trait VectorStore {
    /// Inserts entries, replacing any existing entry with the same id.
    fn upsert(&mut self, entries: &[StoredEntry]) -> Result<(), StoreError>;

    /// Returns at most `k` entries ordered from most to least similar.
    /// Ties keep insertion order; an empty store yields an empty vector.
    fn similarity_search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>, StoreError>;

    /// Number of stored entries.
    fn count(&self) -> Result<usize, StoreError>;

    /// Embedding model recorded with the stored vectors, `None` when unknown.
    fn embedding_model(&self) -> Result<Option<String>, StoreError>;

    /// Deletes entries from `source` whose id is not in `keep` and returns how
    /// many were removed.
    fn remove_stale(&mut self, source: &str, keep: &[Uuid]) -> Result<usize, StoreError>;
}

/// Cosine distance in `[0, 2]`; a zero vector is treated as orthogonal.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

/// Returns the shared dimension of `entries`, rejecting mixed lengths.
pub(crate) fn batch_dimension(entries: &[StoredEntry]) -> Result<Option<usize>, StoreError> {
    let Some(first) = entries.first() else {
        return Ok(None);
    };
    let expected = first.embedding.len();
    if expected == 0 {
        return Err(StoreError::Query(format!(
            "entry {} has an empty embedding",
            first.id
        )));
    }
    for entry in entries {
        if entry.embedding.len() != expected {
            return Err(StoreError::DimensionMismatch {
                expected,
                actual: entry.embedding.len(),
            });
        }
    }
    Ok(Some(expected))
}

/// Returns the embedding model shared by `entries`, rejecting mixed models.
pub(crate) fn batch_model(entries: &[StoredEntry]) -> Result<Option<&str>, StoreError> {
    let mut models = entries.iter().filter_map(StoredEntry::embedding_model);
    let Some(first) = models.next() else {
        return Ok(None);
    };
    match models.find(|model| *model != first) {
        Some(other) => Err(StoreError::ModelMismatch {
            expected: first.to_string(),
            actual: other.to_string(),
        }),
        None => Ok(Some(first)),
    }
}

/// Fails when `actual` differs from the model the store already holds.
pub(crate) fn check_model(stored: Option<&str>, actual: Option<&str>) -> Result<(), StoreError> {
    match (stored, actual) {
        (Some(expected), Some(actual)) if expected != actual => Err(StoreError::ModelMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }),
        _ => Ok(()),
    }
}

/// Fully-qualified Postgres table name (schema + collection).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    schema: String,
    table: String,
}

impl TableName {
    /// Builds a new table identifier.
    pub fn new<S, T>(schema: S, table: T) -> Result<Self, ConfigError>
    where
        S: Into<String>,
        T: Into<String>,
    {
        let schema = schema.into();
        let table = table.into();
        if schema.trim().is_empty() {
            return Err(ConfigError::InvalidCollection(
                "schema name is required".to_string(),
            ));
        }
        if table.trim().is_empty() {
            return Err(ConfigError::InvalidCollection(
                "collection name is required".to_string(),
            ));
        }
        Ok(Self { schema, table })
    }

    /// Fully-qualified table reference with quoted identifiers.
    pub fn qualified(&self) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.table))
    }

    /// Returns the raw schema string.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Returns the raw table string.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Name of the HNSW cosine index on the embedding column.
    pub fn embedding_index_name(&self) -> String {
        format!(
            "{}_{}_embedding_cos_idx",
            sanitize_ident(&self.schema),
            sanitize_ident(&self.table)
        )
    }
}

/// Quotes Postgres identifiers, escaping embedded quotes.
pub fn quote_ident(input: &str) -> String {
    let escaped = input.replace('"', "\"\"");
    format!("\"{}\"", escaped)
}

fn sanitize_ident(input: &str) -> String {
    input
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
        .collect()
}
