//! Runtime configuration read once from the environment at startup.

use std::env;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

const DEFAULT_PORT: u16 = 8001;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;
const DEFAULT_GROQ_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the question-answering server.
///
/// Built once at process start and handed to every component by reference; nothing in the
/// pipeline reads the environment on its own.
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared secret expected in the `Authorization: Bearer` header.
    pub api_token: String,
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// Embedding service settings.
    pub embedding: EmbeddingConfig,
    /// Completion service settings.
    pub completion: CompletionConfig,
    /// Chunking and retrieval parameters.
    pub pipeline: PipelineSettings,
    /// Timeout applied when downloading a document URL.
    pub document_fetch_timeout_secs: u64,
}

/// Listener settings for the HTTP surface.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the server binds to.
    pub host: IpAddr,
    /// Port the server binds to.
    pub port: u16,
    /// Largest accepted request body, mainly relevant for uploads.
    pub max_upload_bytes: usize,
}

/// Supported embedding backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmbeddingProvider {
    /// Hosted OpenAI-compatible `/embeddings` API.
    OpenAI,
    /// Local Ollama runtime.
    Ollama,
    /// Deterministic in-process hashing encoder, useful offline and in tests.
    Hashed,
}

/// Settings for the embedding client.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Backend used to turn text into vectors.
    pub provider: EmbeddingProvider,
    /// Base URL of the provider.
    pub base_url: String,
    /// Optional bearer key for hosted providers.
    pub api_key: Option<String>,
    /// Model identifier passed to the provider.
    pub model: String,
    /// Dimensionality every returned vector must have.
    pub dimension: usize,
    /// Maximum number of inputs sent in one request.
    pub batch_size: usize,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

/// Supported completion backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompletionProvider {
    /// Groq's OpenAI-compatible chat completions endpoint.
    Groq,
    /// OpenAI chat completions (or any compatible server).
    OpenAI,
    /// Local Ollama runtime (`/api/generate`).
    Ollama,
}

/// Settings for the completion client.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// Backend used to generate answers.
    pub provider: CompletionProvider,
    /// Base URL of the provider.
    pub base_url: String,
    /// Optional bearer key for hosted providers.
    pub api_key: Option<String>,
    /// Chat model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound on generated tokens.
    pub max_tokens: usize,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

/// Chunking and retrieval parameters shared by every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters repeated between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of chunks retrieved per question.
    pub top_k: usize,
    /// Number of questions answered concurrently.
    pub answer_concurrency: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1500,
            chunk_overlap: 200,
            top_k: 4,
            answer_concurrency: 4,
        }
    }
}

impl Config {
    /// Load configuration from process environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup };
        let defaults = PipelineSettings::default();

        let embedding_provider: EmbeddingProvider = vars
            .required("EMBEDDING_PROVIDER")?
            .parse()
            .map_err(|()| ConfigError::InvalidValue("EMBEDDING_PROVIDER".into()))?;
        let completion_provider: CompletionProvider = match vars.optional("COMPLETION_PROVIDER") {
            Some(value) => value
                .parse()
                .map_err(|()| ConfigError::InvalidValue("COMPLETION_PROVIDER".into()))?,
            None => CompletionProvider::Groq,
        };

        let pipeline = PipelineSettings {
            chunk_size: vars.parsed_or("TEXT_SPLITTER_CHUNK_SIZE", defaults.chunk_size)?,
            chunk_overlap: vars.parsed_or("TEXT_SPLITTER_CHUNK_OVERLAP", defaults.chunk_overlap)?,
            top_k: vars.parsed_or("RETRIEVAL_TOP_K", defaults.top_k)?,
            answer_concurrency: vars
                .parsed_or("ANSWER_CONCURRENCY", defaults.answer_concurrency)?,
        };
        if pipeline.chunk_size == 0 {
            return Err(ConfigError::InvalidValue("TEXT_SPLITTER_CHUNK_SIZE".into()));
        }
        if pipeline.chunk_overlap >= pipeline.chunk_size {
            return Err(ConfigError::InvalidValue(
                "TEXT_SPLITTER_CHUNK_OVERLAP".into(),
            ));
        }
        if pipeline.top_k == 0 {
            return Err(ConfigError::InvalidValue("RETRIEVAL_TOP_K".into()));
        }
        if pipeline.answer_concurrency == 0 {
            return Err(ConfigError::InvalidValue("ANSWER_CONCURRENCY".into()));
        }

        let embedding = EmbeddingConfig {
            provider: embedding_provider,
            base_url: vars
                .optional("EMBEDDING_URL")
                .unwrap_or_else(|| embedding_provider.default_url().to_string()),
            api_key: vars.optional("EMBEDDING_API_KEY"),
            model: vars.required("EMBEDDING_MODEL")?,
            dimension: vars
                .required("EMBEDDING_DIMENSION")?
                .parse()
                .map_err(|_| ConfigError::InvalidValue("EMBEDDING_DIMENSION".into()))?,
            batch_size: vars.parsed_or("EMBEDDING_BATCH_SIZE", 32)?,
            timeout_secs: vars.parsed_or("EMBEDDING_TIMEOUT_SECS", 30)?,
        };
        if embedding.dimension == 0 {
            return Err(ConfigError::InvalidValue("EMBEDDING_DIMENSION".into()));
        }
        if embedding.batch_size == 0 {
            return Err(ConfigError::InvalidValue("EMBEDDING_BATCH_SIZE".into()));
        }

        let completion = CompletionConfig {
            provider: completion_provider,
            base_url: vars
                .optional("COMPLETION_URL")
                .unwrap_or_else(|| completion_provider.default_url().to_string()),
            api_key: vars
                .optional("COMPLETION_API_KEY")
                .or_else(|| vars.optional("GROQ_API_KEY")),
            model: vars
                .optional("COMPLETION_MODEL")
                .unwrap_or_else(|| "llama3-70b-8192".to_string()),
            temperature: vars.parsed_or("COMPLETION_TEMPERATURE", 0.5)?,
            max_tokens: vars.parsed_or("COMPLETION_MAX_TOKENS", 3072)?,
            timeout_secs: vars.parsed_or("COMPLETION_TIMEOUT_SECS", 60)?,
        };
        if completion.provider != CompletionProvider::Ollama && completion.api_key.is_none() {
            return Err(ConfigError::MissingVariable("COMPLETION_API_KEY".into()));
        }

        let port = match vars.optional("SERVER_PORT") {
            Some(_) => vars.parsed_or("SERVER_PORT", DEFAULT_PORT)?,
            None => vars.parsed_or("PORT", DEFAULT_PORT)?,
        };
        let server = ServerConfig {
            host: vars.parsed_or("SERVER_HOST", IpAddr::V4(Ipv4Addr::UNSPECIFIED))?,
            port,
            max_upload_bytes: vars.parsed_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
        };

        Ok(Self {
            api_token: vars.required("API_BEARER_TOKEN")?,
            server,
            embedding,
            completion,
            pipeline,
            document_fetch_timeout_secs: vars.parsed_or("DOCUMENT_FETCH_TIMEOUT_SECS", 30)?,
        })
    }

    /// Emit the non-secret parts of the configuration at debug level.
    pub fn log_summary(&self) {
        tracing::debug!(
            host = %self.server.host,
            port = self.server.port,
            embedding_provider = ?self.embedding.provider,
            embedding_model = %self.embedding.model,
            embedding_dimension = self.embedding.dimension,
            completion_provider = ?self.completion.provider,
            completion_model = %self.completion.model,
            chunk_size = self.pipeline.chunk_size,
            chunk_overlap = self.pipeline.chunk_overlap,
            top_k = self.pipeline.top_k,
            answer_concurrency = self.pipeline.answer_concurrency,
            "Loaded configuration"
        );
    }
}

struct Vars<F> {
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
    }

    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn parsed_or<T: std::str::FromStr>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        match self.optional(key) {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string())),
            None => Ok(default),
        }
    }
}

impl EmbeddingProvider {
    fn default_url(self) -> &'static str {
        match self {
            Self::OpenAI => DEFAULT_OPENAI_URL,
            Self::Ollama => DEFAULT_OLLAMA_URL,
            Self::Hashed => "",
        }
    }
}

impl CompletionProvider {
    fn default_url(self) -> &'static str {
        match self {
            Self::Groq => DEFAULT_GROQ_URL,
            Self::OpenAI => DEFAULT_OPENAI_URL,
            Self::Ollama => DEFAULT_OLLAMA_URL,
        }
    }
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            "hashed" => Ok(Self::Hashed),
            _ => Err(()),
        }
    }
}

impl std::str::FromStr for CompletionProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "groq" => Ok(Self::Groq),
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}
