//! Startup errors. Any of these stops the process before it serves traffic.

use crate::codes::CodeTableError;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("error loading known languages: {0}")]
    CodeTable(#[from] CodeTableError),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("HTTP server error: {0}")]
    Serve(#[source] std::io::Error),
    #[error("failed to render usage document: {0}")]
    Usage(#[from] serde_json::Error),
    #[error("failed to initialize logging: {0}")]
    Logging(String),
}
