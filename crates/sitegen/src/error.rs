use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to parse generation event line: {source}\n  line: {line}")]
    Parse {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Generation cancelled")]
    Cancelled,
}
