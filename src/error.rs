use thiserror::Error;

/// Errors that can occur while resolving a share link
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Upstream returned status {status} for {url}")]
    UpstreamStatus { status: u16, url: String },

    #[error("Max retries exceeded after {attempts} attempts. Last error: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<ResolveError>,
    },

    #[error("Could not extract {what} from the share page")]
    Scrape { what: &'static str },

    #[error("No files found in the shared link")]
    NoFiles,

    #[error("Could not process any files")]
    AllFilesFailed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for share resolution operations
pub type Result<T> = std::result::Result<T, ResolveError>;
