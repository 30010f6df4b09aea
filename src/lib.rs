//! Core library for pdfrag: load a PDF, chunk and embed its pages into
//! pgvector, then answer questions strictly from the stored chunks.

pub mod chat;
pub mod chunker;
pub mod config;
pub mod embedder;
pub mod error;
pub mod generator;
mod http;
pub mod loader;
pub mod logging;
pub mod pipeline;
pub mod prompt;
pub mod vector_store;

pub use chunker::{split_pages, split_text, ChunkConfig, ChunkRecord, Separator};
pub use config::{ProviderArgs, ProviderConfig, ProviderKind, StoreArgs, StoreConfig};
pub use embedder::Embedder;
pub use error::{
    ChunkError, ConfigError, LoadError, PipelineError, ProviderError, Stage, StoreError,
};
pub use generator::{AnswerGenerator, GenerationSettings};
pub use loader::{load_pdf, PageRecord};
pub use pipeline::{answer, ingest, ingest_pages, retrieve, IngestReport};
pub use prompt::{assemble, FALLBACK_ANSWER};
pub use vector_store::{
    MemoryStore, PgVectorStore, SearchResult, StoredEntry, TableName, VectorStore,
};
