use std::fmt;

/// Unified error type for API, cache and ingestion operations
#[derive(Debug)]
pub enum CollectionError {
    /// HTTP request failed (network error, timeout, etc.)
    Network(reqwest::Error),
    /// Failed to parse JSON response or document
    Parse(serde_json::Error),
    /// API returned an error response
    ApiResponse { code: String, details: String },
    /// HTTP error status code
    HttpStatus(reqwest::StatusCode),
    /// Lookup produced no result (including remote 404)
    NotFound(String),
    /// Requested bulk dataset variant is not offered by the manifest
    ManifestEntryMissing(String),
    /// Bulk dataset payload is not in the expected shape
    MalformedDataset(String),
    /// File I/O error
    Io(std::io::Error),
    /// Image decoding or encoding error
    Image(String),
    /// Cache operation failed
    Cache(String),
}

impl fmt::Display for CollectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionError::Network(e) => write!(f, "Network error: {}", e),
            CollectionError::Parse(e) => write!(f, "Parse error: {}", e),
            CollectionError::ApiResponse { code, details } => write!(f, "{}: {}", code, details),
            CollectionError::HttpStatus(status) => write!(f, "HTTP error: {}", status),
            CollectionError::NotFound(what) => write!(f, "Not found: {}", what),
            CollectionError::ManifestEntryMissing(variant) => {
                write!(f, "Bulk dataset variant not offered: {}", variant)
            }
            CollectionError::MalformedDataset(msg) => write!(f, "Malformed bulk dataset: {}", msg),
            CollectionError::Io(e) => write!(f, "I/O error: {}", e),
            CollectionError::Image(msg) => write!(f, "Image error: {}", msg),
            CollectionError::Cache(msg) => write!(f, "Cache error: {}", msg),
        }
    }
}

impl std::error::Error for CollectionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CollectionError::Network(e) => Some(e),
            CollectionError::Parse(e) => Some(e),
            CollectionError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for CollectionError {
    fn from(err: reqwest::Error) -> Self {
        CollectionError::Network(err)
    }
}

impl From<serde_json::Error> for CollectionError {
    fn from(err: serde_json::Error) -> Self {
        CollectionError::Parse(err)
    }
}

impl From<std::io::Error> for CollectionError {
    fn from(err: std::io::Error) -> Self {
        CollectionError::Io(err)
    }
}

/// Result type alias for collection operations
pub type Result<T> = std::result::Result<T, CollectionError>;
