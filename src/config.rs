use std::env;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash-latest";
const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_SUMMARIZATION_MODEL: &str = "facebook/bart-large-cnn";
const DEFAULT_QA_MODEL: &str = "deepset/roberta-base-squad2";
const DEFAULT_HUGGINGFACE_BASE_URL: &str = "https://api-inference.huggingface.co";
const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_QUIZ_FORM_URL: &str = "https://forms.gle/YOUR_GOOGLE_FORM_LINK_HERE";
const DEFAULT_TOKENIZER: &str = "cl100k_base";
const DEFAULT_SESSION_IDLE_SECS: u64 = 60 * 60;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
    /// The hosted chat provider is selected but no credential is available.
    #[error("Gemini API key not found. Add it to the environment as 'GEMINI_API_KEY'.")]
    MissingGeminiKey,
}

/// Runtime configuration for the AI Tutor server.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend answering chatbot questions.
    pub chat_provider: ChatProvider,
    /// Credential for the hosted generative chat API.
    pub gemini_api_key: Option<String>,
    /// Generative chat model identifier.
    pub gemini_model: String,
    /// Base URL of the generative chat API.
    pub gemini_base_url: String,
    /// Backend producing per-chunk summaries.
    pub summarization_provider: SummarizationProvider,
    /// Summarization model identifier passed to the provider.
    pub summarization_model: String,
    /// Optional bearer token for the Hugging Face Inference API.
    pub huggingface_api_token: Option<String>,
    /// Base URL of the Hugging Face Inference API.
    pub huggingface_base_url: String,
    /// Extractive question-answering model identifier.
    pub qa_model: String,
    /// Replacement context for the extractive backend; the built-in study context when unset.
    pub qa_context: Option<String>,
    /// Base URL of the local Ollama runtime.
    pub ollama_url: String,
    /// Chunking and length bounds for the notes summarizer.
    pub summarizer: SummarizerSettings,
    /// External quiz form embedded on the quiz page.
    pub quiz_form_url: String,
    /// Request timeout applied to every outbound model call.
    pub model_request_timeout: Duration,
    /// Idle period after which a visitor session is dropped.
    pub session_idle_timeout: Duration,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Tunables for the chunk-and-summarize pipeline.
#[derive(Debug, Clone)]
pub struct SummarizerSettings {
    /// Chunk size, in characters or tokens depending on `strategy`.
    pub chunk_size: usize,
    /// How documents are split before summarization.
    pub strategy: ChunkStrategy,
    /// Token overlap between adjacent chunks (token strategy only).
    pub chunk_overlap: usize,
    /// tiktoken encoding used to count tokens (token strategy only).
    pub tokenizer: String,
    /// Lower bound on each per-chunk summary length.
    pub min_length: usize,
    /// Upper bound on each per-chunk summary length.
    pub max_length: usize,
    /// Maximum number of summarize-and-join passes.
    pub max_passes: usize,
}

impl Default for SummarizerSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            strategy: ChunkStrategy::Characters,
            chunk_overlap: 0,
            tokenizer: DEFAULT_TOKENIZER.to_string(),
            min_length: 40,
            max_length: 150,
            max_passes: 1,
        }
    }
}

/// Supported chat backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatProvider {
    /// Hosted generative chat (Gemini `generateContent`).
    Gemini,
    /// Hosted extractive question answering against a fixed context.
    Extractive,
}

/// Supported summarization backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SummarizationProvider {
    /// Hugging Face Inference API summarization pipeline.
    HuggingFace,
    /// Local Ollama runtime prompted to summarize.
    Ollama,
}

/// Document splitting strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkStrategy {
    /// Fixed-size, non-overlapping character slices.
    Characters,
    /// Semantic segments bounded by a token budget.
    Tokens,
}

impl Config {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup, performing validation along the way.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let or_default = |key: &str, default: &str| {
            optional(key)
                .map(|value| value.trim().to_string())
                .unwrap_or_else(|| default.to_string())
        };

        let chat_provider = parse_or(optional("CHAT_PROVIDER"), "CHAT_PROVIDER", ChatProvider::Gemini)?;
        let gemini_api_key = optional("GEMINI_API_KEY");
        if chat_provider == ChatProvider::Gemini && gemini_api_key.is_none() {
            return Err(ConfigError::MissingGeminiKey);
        }

        let defaults = SummarizerSettings::default();
        let summarizer = SummarizerSettings {
            chunk_size: parse_or(
                optional("SUMMARIZER_CHUNK_SIZE"),
                "SUMMARIZER_CHUNK_SIZE",
                defaults.chunk_size,
            )?,
            strategy: parse_or(
                optional("SUMMARIZER_CHUNK_STRATEGY"),
                "SUMMARIZER_CHUNK_STRATEGY",
                defaults.strategy,
            )?,
            chunk_overlap: parse_or(
                optional("SUMMARIZER_CHUNK_OVERLAP"),
                "SUMMARIZER_CHUNK_OVERLAP",
                defaults.chunk_overlap,
            )?,
            tokenizer: or_default("SUMMARIZER_TOKENIZER", DEFAULT_TOKENIZER),
            min_length: parse_or(
                optional("SUMMARIZER_MIN_LENGTH"),
                "SUMMARIZER_MIN_LENGTH",
                defaults.min_length,
            )?,
            max_length: parse_or(
                optional("SUMMARIZER_MAX_LENGTH"),
                "SUMMARIZER_MAX_LENGTH",
                defaults.max_length,
            )?,
            max_passes: parse_or(
                optional("SUMMARIZER_MAX_PASSES"),
                "SUMMARIZER_MAX_PASSES",
                defaults.max_passes,
            )?,
        };
        summarizer.validate()?;

        let timeout_secs: u64 = parse_or(
            optional("MODEL_REQUEST_TIMEOUT_SECS"),
            "MODEL_REQUEST_TIMEOUT_SECS",
            120,
        )?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("MODEL_REQUEST_TIMEOUT_SECS".into()));
        }

        let session_idle_secs: u64 = parse_or(
            optional("SESSION_IDLE_TIMEOUT_SECS"),
            "SESSION_IDLE_TIMEOUT_SECS",
            DEFAULT_SESSION_IDLE_SECS,
        )?;
        if session_idle_secs == 0 {
            return Err(ConfigError::InvalidValue("SESSION_IDLE_TIMEOUT_SECS".into()));
        }

        Ok(Self {
            chat_provider,
            gemini_api_key,
            gemini_model: or_default("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
            gemini_base_url: or_default("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL),
            summarization_provider: parse_or(
                optional("SUMMARIZATION_PROVIDER"),
                "SUMMARIZATION_PROVIDER",
                SummarizationProvider::HuggingFace,
            )?,
            summarization_model: or_default("SUMMARIZATION_MODEL", DEFAULT_SUMMARIZATION_MODEL),
            huggingface_api_token: optional("HUGGINGFACE_API_TOKEN"),
            huggingface_base_url: or_default("HUGGINGFACE_BASE_URL", DEFAULT_HUGGINGFACE_BASE_URL),
            qa_model: or_default("QA_MODEL", DEFAULT_QA_MODEL),
            qa_context: optional("QA_CONTEXT").map(|value| value.trim().to_string()),
            ollama_url: or_default("OLLAMA_URL", DEFAULT_OLLAMA_URL),
            summarizer,
            quiz_form_url: or_default("QUIZ_FORM_URL", DEFAULT_QUIZ_FORM_URL),
            model_request_timeout: Duration::from_secs(timeout_secs),
            session_idle_timeout: Duration::from_secs(session_idle_secs),
            server_port: optional("SERVER_PORT")
                .map(|value| {
                    value
                        .trim()
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }
}

impl SummarizerSettings {
    /// Reject settings the pipeline cannot honor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidValue("SUMMARIZER_CHUNK_SIZE".into()));
        }
        if self.max_passes == 0 {
            return Err(ConfigError::InvalidValue("SUMMARIZER_MAX_PASSES".into()));
        }
        if self.min_length > self.max_length {
            return Err(ConfigError::InvalidValue("SUMMARIZER_MIN_LENGTH".into()));
        }
        Ok(())
    }
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

impl std::str::FromStr for ChatProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "extractive" | "qa" => Ok(Self::Extractive),
            _ => Err(()),
        }
    }
}

impl std::str::FromStr for SummarizationProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

impl std::str::FromStr for ChunkStrategy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "characters" | "chars" => Ok(Self::Characters),
            "tokens" => Ok(Self::Tokens),
            _ => Err(()),
        }
    }
}

/// Load `.env` (when present) and parse the configuration from the environment.
pub fn load_config() -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        chat_provider = ?config.chat_provider,
        summarization_provider = ?config.summarization_provider,
        summarization_model = %config.summarization_model,
        chunk_size = config.summarizer.chunk_size,
        strategy = ?config.summarizer.strategy,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    Ok(config)
}
