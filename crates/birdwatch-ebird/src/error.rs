use thiserror::Error;

/// Errors returned by the eBird client.
///
/// Any of these from either request fails the whole fetch.
#[derive(Debug, Error)]
pub enum EbirdError {
    /// Network, TLS or timeout failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {endpoint}")]
    UnexpectedStatus { status: u16, endpoint: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid eBird base URL '{base_url}': {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },
}
