// Error Types
//
// Every failure the engine can report. Causes from collaborators (HTTP,
// JSON, CSV, config, filesystem) are flattened to strings so outcomes can be
// cloned into per-source diagnostics and compared in tests.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UtxoError {
    #[error("Input is not a valid address, address list or extended public key")]
    InvalidInput,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Decoding error: {0}")]
    DecodingError(String),

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("No UTXOs found for the given input")]
    NoUtxosFound,

    #[error("Extended key type '{0}' is not supported")]
    ExtendedKeyUnsupported(String),

    #[error("Address derivation failed: {0}")]
    AddressDerivationFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, UtxoError>;

impl From<reqwest::Error> for UtxoError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            UtxoError::DecodingError(e.to_string())
        } else if let Some(status) = e.status() {
            UtxoError::ApiError {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            UtxoError::NetworkError(e.to_string())
        }
    }
}

impl From<serde_json::Error> for UtxoError {
    fn from(e: serde_json::Error) -> Self {
        UtxoError::DecodingError(e.to_string())
    }
}

impl From<csv::Error> for UtxoError {
    fn from(e: csv::Error) -> Self {
        UtxoError::Io(e.to_string())
    }
}

impl From<std::io::Error> for UtxoError {
    fn from(e: std::io::Error) -> Self {
        UtxoError::Io(e.to_string())
    }
}

impl From<config::ConfigError> for UtxoError {
    fn from(e: config::ConfigError) -> Self {
        UtxoError::Config(e.to_string())
    }
}

impl UtxoError {
    /// Short label used for metrics and structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            UtxoError::InvalidInput => "invalid_input",
            UtxoError::NetworkError(_) => "network",
            UtxoError::DecodingError(_) => "decoding",
            UtxoError::ApiError { .. } => "api",
            UtxoError::NoUtxosFound => "no_utxos",
            UtxoError::ExtendedKeyUnsupported(_) => "xpub_unsupported",
            UtxoError::AddressDerivationFailed(_) => "derivation",
            UtxoError::Config(_) => "config",
            UtxoError::Io(_) => "io",
        }
    }
}
