//! Command-line and environment configuration shared by the binaries.
//!
//! Each group is a `clap::Args` struct flattened into both `pdfrag-ingest`
//! and `pdfrag-chat`, so the two processes resolve providers and stores the
//! same way.

use std::fmt;
use std::time::Duration;

use clap::{Args, ValueEnum};

use crate::chunker::{ChunkConfig, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::embedder::{Embedder, GeminiEmbedder, OpenAiEmbedder};
use crate::error::{ChunkError, ConfigError, ProviderError};
use crate::generator::{
    AnswerGenerator, GeminiGenerator, GenerationSettings, OpenAiGenerator,
    DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_TEMPERATURE,
};
use crate::pipeline::DEFAULT_TOP_K;
use crate::vector_store::{TableName, DEFAULT_COLLECTION};

/// Supported model providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderKind {
    Openai,
    Google,
}

impl ProviderKind {
    /// Name of the environment variable holding this provider's key.
    pub fn credential_var(self) -> &'static str {
        match self {
            Self::Openai => "OPENAI_API_KEY",
            Self::Google => "GOOGLE_API_KEY",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Openai => f.write_str("openai"),
            Self::Google => f.write_str("google"),
        }
    }
}

/// Provider selection and credentials.
#[derive(Args, Debug, Clone)]
pub struct ProviderArgs {
    /// Model provider; defaults to OpenAI when its key is set, else Google
    #[arg(long, env = "PDFRAG_PROVIDER", value_enum)]
    pub provider: Option<ProviderKind>,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// OpenAI-compatible API root
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub openai_base_url: String,

    /// OpenAI embedding model
    #[arg(
        long,
        env = "PDFRAG_OPENAI_EMBEDDING_MODEL",
        default_value = "text-embedding-3-small"
    )]
    pub openai_embedding_model: String,

    /// Optional dimensions override for OpenAI embeddings
    #[arg(long, env = "PDFRAG_OPENAI_EMBEDDING_DIMENSIONS")]
    pub openai_embedding_dimensions: Option<usize>,

    /// OpenAI chat model used for answers
    #[arg(long, env = "PDFRAG_OPENAI_MODEL", default_value = "gpt-4o-mini")]
    pub openai_model: String,

    /// Google Gemini API key
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    pub google_api_key: Option<String>,

    /// Gemini API root
    #[arg(
        long,
        env = "GOOGLE_BASE_URL",
        default_value = "https://generativelanguage.googleapis.com/v1beta"
    )]
    pub google_base_url: String,

    /// Gemini embedding model
    #[arg(
        long,
        env = "PDFRAG_GOOGLE_EMBEDDING_MODEL",
        default_value = "models/embedding-001"
    )]
    pub google_embedding_model: String,

    /// Gemini model used for answers
    #[arg(long, env = "PDFRAG_GOOGLE_MODEL", default_value = "gemini-2.5-flash-lite")]
    pub google_model: String,

    /// Inputs sent per embedding request
    #[arg(long, env = "PDFRAG_EMBED_BATCH_SIZE", default_value_t = 64)]
    pub embed_batch_size: usize,

    /// HTTP timeout for provider calls, in seconds
    #[arg(long, env = "PDFRAG_HTTP_TIMEOUT_SECS", default_value_t = 60)]
    pub http_timeout_secs: u64,
}

impl ProviderArgs {
    /// Picks the provider and checks that its credential is present.
    pub fn resolve(&self) -> Result<ProviderConfig, ConfigError> {
        let openai_key = non_empty(self.openai_api_key.as_deref());
        let google_key = non_empty(self.google_api_key.as_deref());
        let (kind, api_key) = match self.provider {
            Some(kind) => {
                let key = match kind {
                    ProviderKind::Openai => openai_key,
                    ProviderKind::Google => google_key,
                };
                let key = key.ok_or(ConfigError::MissingCredential(kind.credential_var()))?;
                (kind, key)
            }
            None => match (openai_key, google_key) {
                (Some(key), _) => (ProviderKind::Openai, key),
                (None, Some(key)) => (ProviderKind::Google, key),
                (None, None) => return Err(ConfigError::NoProviderCredential),
            },
        };
        let (base_url, embedding_model, generation_model) = match kind {
            ProviderKind::Openai => (
                &self.openai_base_url,
                &self.openai_embedding_model,
                &self.openai_model,
            ),
            ProviderKind::Google => (
                &self.google_base_url,
                &self.google_embedding_model,
                &self.google_model,
            ),
        };
        Ok(ProviderConfig {
            kind,
            api_key: api_key.to_string(),
            base_url: base_url.clone(),
            embedding_model: embedding_model.clone(),
            embedding_dimensions: match kind {
                ProviderKind::Openai => self.openai_embedding_dimensions,
                ProviderKind::Google => None,
            },
            generation_model: generation_model.clone(),
            embed_batch_size: self.embed_batch_size.max(1),
            timeout: Duration::from_secs(self.http_timeout_secs.max(1)),
        })
    }
}

/// Provider settings resolved once at startup.
#[derive(Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub api_key: String,
    pub base_url: String,
    pub embedding_model: String,
    pub embedding_dimensions: Option<usize>,
    pub generation_model: String,
    pub embed_batch_size: usize,
    pub timeout: Duration,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("embedding_model", &self.embedding_model)
            .field("embedding_dimensions", &self.embedding_dimensions)
            .field("generation_model", &self.generation_model)
            .field("embed_batch_size", &self.embed_batch_size)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ProviderConfig {
    /// Embedder for the selected provider.
    pub fn build_embedder(&self) -> Result<Box<dyn Embedder>, ProviderError> {
        Ok(match self.kind {
            ProviderKind::Openai => Box::new(OpenAiEmbedder::new(
                &self.api_key,
                &self.base_url,
                self.embedding_model.clone(),
                self.embedding_dimensions,
                self.timeout,
                self.embed_batch_size,
            )?),
            ProviderKind::Google => Box::new(GeminiEmbedder::new(
                &self.api_key,
                &self.base_url,
                &self.embedding_model,
                self.timeout,
                self.embed_batch_size,
            )?),
        })
    }

    /// Answer generator for the selected provider.
    pub fn build_generator(
        &self,
        settings: GenerationSettings,
    ) -> Result<Box<dyn AnswerGenerator>, ProviderError> {
        Ok(match self.kind {
            ProviderKind::Openai => Box::new(OpenAiGenerator::new(
                &self.api_key,
                &self.base_url,
                self.generation_model.clone(),
                settings,
                self.timeout,
            )?),
            ProviderKind::Google => Box::new(GeminiGenerator::new(
                &self.api_key,
                &self.base_url,
                &self.generation_model,
                settings,
                self.timeout,
            )?),
        })
    }
}

/// Postgres connection and collection.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Postgres connection string (postgres://...)
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    #[arg(long, env = "POSTGRES_CONNECTION_STRING", hide = true)]
    pub postgres_connection_string: Option<String>,

    /// Collection (table) holding the document chunks
    #[arg(long, env = "PG_VECTOR_COLLECTION_NAME")]
    pub collection: Option<String>,

    #[arg(long, env = "PGVECTOR_COLLECTION", hide = true)]
    pub pgvector_collection: Option<String>,

    /// Schema containing the collection table
    #[arg(long, env = "PDFRAG_SCHEMA", default_value = "public")]
    pub schema: String,
}

impl StoreArgs {
    /// Applies the env fallbacks and validates the collection name.
    pub fn resolve(&self) -> Result<StoreConfig, ConfigError> {
        let database_url = non_empty(self.database_url.as_deref())
            .or_else(|| non_empty(self.postgres_connection_string.as_deref()))
            .ok_or(ConfigError::MissingConnectionString)?;
        let collection = non_empty(self.collection.as_deref())
            .or_else(|| non_empty(self.pgvector_collection.as_deref()))
            .unwrap_or(DEFAULT_COLLECTION);
        Ok(StoreConfig {
            database_url: database_url.to_string(),
            table: TableName::new(self.schema.as_str(), collection)?,
        })
    }
}

/// Resolved store location.
#[derive(Clone)]
pub struct StoreConfig {
    pub database_url: String,
    pub table: TableName,
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("database_url", &"<redacted>")
            .field("table", &self.table)
            .finish()
    }
}

/// Chunking parameters.
#[derive(Args, Debug, Clone)]
pub struct ChunkArgs {
    /// Maximum characters per chunk
    #[arg(long, env = "PDFRAG_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Characters shared by adjacent chunks
    #[arg(long, env = "PDFRAG_CHUNK_OVERLAP", default_value_t = DEFAULT_CHUNK_OVERLAP)]
    pub chunk_overlap: usize,
}

impl ChunkArgs {
    /// Validated chunk configuration.
    pub fn to_config(&self) -> Result<ChunkConfig, ChunkError> {
        ChunkConfig::new(self.chunk_size, self.chunk_overlap)
    }
}

/// Retrieval and generation knobs used when answering.
#[derive(Args, Debug, Clone)]
pub struct AnswerArgs {
    /// Number of chunks retrieved per question
    #[arg(long, env = "PDFRAG_TOP_K", default_value_t = DEFAULT_TOP_K)]
    pub top_k: usize,

    /// Sampling temperature for the answer model
    #[arg(long, env = "PDFRAG_TEMPERATURE", default_value_t = DEFAULT_TEMPERATURE)]
    pub temperature: f32,

    /// Maximum tokens to request from the answer model
    #[arg(long, env = "PDFRAG_MAX_OUTPUT_TOKENS", default_value_t = DEFAULT_MAX_OUTPUT_TOKENS)]
    pub max_output_tokens: usize,
}

impl AnswerArgs {
    pub fn settings(&self) -> GenerationSettings {
        GenerationSettings {
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
