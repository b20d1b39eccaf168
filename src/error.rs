use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rate limit exhausted")]
    RateLimited,

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// A file the operation cannot run without.
    #[error("Missing required input: {0}")]
    MissingInput(String),

    /// Generated output broke an invariant; indicates a logic bug.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
