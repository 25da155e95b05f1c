use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubmintError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Missing file, missing language selection or an unusable input file
    #[error("Validation error: {0}")]
    Validation(String),

    /// Upload or subtitle fetch failed
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("No wallet provider available: {0}")]
    ProviderUnavailable(String),

    #[error("Ownership already registered for this content")]
    DuplicateRegistration,

    /// Registration reverted or its confirmation failed
    #[error("Chain error: {0}")]
    Chain(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, SubmintError>;
