use thiserror::Error;

/// Result type alias for taglink operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the taglink processing pipeline.
///
/// None of these are fatal to the host process: the orchestrator converts
/// them into events and error counters at the public API boundary.
#[derive(Debug, Error)]
pub enum Error {
    /// A required field was absent or empty on an incoming message.
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// An incoming payload was structurally unusable.
    #[error("Invalid payload: {message}")]
    InvalidPayload { message: String },

    /// The hex payload could not be decoded (odd length or non-hex digits).
    #[error("Hex decode error: {message}")]
    HexDecode { message: String },

    /// The decoded candidate failed length/digit validation.
    #[error("Invalid identifier: {candidate}")]
    InvalidIdentifier { candidate: String },

    /// A registry operation referenced a source that was never seen.
    #[error("Unknown client: {client}")]
    UnknownClient { client: String },
}

impl Error {
    /// Create a missing-field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Create an invalid-payload error.
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            message: message.into(),
        }
    }

    /// Create a hex-decode error.
    pub fn hex_decode(message: impl Into<String>) -> Self {
        Self::HexDecode {
            message: message.into(),
        }
    }

    /// Create an invalid-identifier error.
    pub fn invalid_identifier(candidate: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            candidate: candidate.into(),
        }
    }

    /// Create an unknown-client error.
    pub fn unknown_client(source: impl Into<String>) -> Self {
        Self::UnknownClient {
            client: source.into(),
        }
    }
}
