use thiserror::Error;

/// Errors returned by speech recognizers.
#[derive(Debug, Error)]
pub enum RecognitionError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The recognizer finished without producing any text.
    #[error("no speech recognized")]
    NoSpeech,

    #[error("invalid recognizer URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}
