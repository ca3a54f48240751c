use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Error, Debug)]
pub enum ResumeError {
    #[error("Failed to read resume data {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid resume data: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Failures of the remote text-completion service.
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("API key not configured (set {0})")]
    MissingApiKey(String),

    #[error("Model overloaded")]
    Overloaded,

    #[error("Completion service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed completion response: {0}")]
    Malformed(String),
}

impl CompletionError {
    /// Classifies a non-success HTTP reply; 503 or an "overloaded" message is retryable.
    pub fn from_status(status: u16, body: String) -> Self {
        if status == 503 || body.to_lowercase().contains("overloaded") {
            CompletionError::Overloaded
        } else {
            CompletionError::Http { status, body }
        }
    }

    pub fn is_overloaded(&self) -> bool {
        matches!(self, CompletionError::Overloaded)
    }
}

/// Reasons a prompt is refused before it reaches the completion service.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AssistantError {
    #[error("Empty prompt")]
    EmptyPrompt,

    #[error("A request is already in flight")]
    Busy,
}
