//! Error types for the ingestion and question-answering pipelines.

use std::path::PathBuf;

use thiserror::Error;

/// PDF loading errors.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The input path does not exist.
    #[error("document not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The file exists but is not a readable PDF.
    #[error("corrupt document {}: {reason}", path.display())]
    CorruptDocument { path: PathBuf, reason: String },

    /// Any other I/O failure while reading the file.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Chunking errors.
#[derive(Error, Debug)]
pub enum ChunkError {
    #[error("invalid chunk configuration: {0}")]
    InvalidConfig(String),
}

/// Errors raised by embedding and text-generation providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Credentials are missing or were rejected.
    #[error("{provider} rejected the credentials: {message}")]
    Auth {
        provider: &'static str,
        message: String,
    },

    /// The provider throttled the request; callers may retry with backoff.
    #[error("{provider} rate limit exceeded: {message}")]
    RateLimited {
        provider: &'static str,
        message: String,
    },

    /// Transport failure, timeout or server-side error.
    #[error("{provider} is unavailable: {message}")]
    Unavailable {
        provider: &'static str,
        message: String,
    },

    /// The request was refused or the response could not be used.
    #[error("{provider} returned an unusable response: {message}")]
    InvalidResponse {
        provider: &'static str,
        message: String,
    },
}

impl ProviderError {
    /// Name of the provider that produced the error.
    pub fn provider(&self) -> &'static str {
        match self {
            Self::Auth { provider, .. }
            | Self::RateLimited { provider, .. }
            | Self::Unavailable { provider, .. }
            | Self::InvalidResponse { provider, .. } => provider,
        }
    }
}

/// Vector store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing database could not be reached.
    #[error("vector store connection failed: {0}")]
    Connection(String),

    /// A vector's length differs from the dimension already stored.
    #[error("embedding dimension mismatch: store holds {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Vectors from a different embedding model than the ones already stored.
    #[error("embedding model mismatch: store holds {expected}, got {actual}")]
    ModelMismatch { expected: String, actual: String },

    /// `k` must be at least one.
    #[error("top-k must be at least 1")]
    InvalidK,

    /// Any other database failure.
    #[error("vector store query failed: {0}")]
    Query(String),
}

/// Missing or invalid runtime configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    MissingCredential(&'static str),

    #[error("no provider credential found; set OPENAI_API_KEY or GOOGLE_API_KEY")]
    NoProviderCredential,

    #[error("DATABASE_URL or POSTGRES_CONNECTION_STRING must be set")]
    MissingConnectionString,

    #[error("invalid collection: {0}")]
    InvalidCollection(String),
}

/// Pipeline stage that produced a [`PipelineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    Chunk,
    Embed,
    Store,
    Search,
    Generate,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Load => "load",
            Self::Chunk => "chunk",
            Self::Embed => "embed",
            Self::Store => "store",
            Self::Search => "search",
            Self::Generate => "generate",
        };
        f.write_str(name)
    }
}

/// First failure of an ingestion or answer run, tagged with its stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("loading failed: {0}")]
    Load(#[from] LoadError),

    #[error("chunking failed: {0}")]
    Chunk(#[from] ChunkError),

    #[error("embedding failed: {0}")]
    Embed(#[source] ProviderError),

    #[error("storing failed: {0}")]
    Store(#[source] StoreError),

    #[error("search failed: {0}")]
    Search(#[source] StoreError),

    #[error("answer generation failed: {0}")]
    Generate(#[source] ProviderError),
}

impl PipelineError {
    /// Stage that failed.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Load(_) => Stage::Load,
            Self::Chunk(_) => Stage::Chunk,
            Self::Embed(_) => Stage::Embed,
            Self::Store(_) => Stage::Store,
            Self::Search(_) => Stage::Search,
            Self::Generate(_) => Stage::Generate,
        }
    }
}
