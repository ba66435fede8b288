use thiserror::Error;

/// Errors surfaced by table persistence and configuration.
///
/// Invalid state indices are not errors: they are reported through
/// [`crate::learning::Status`] and recovered where they occur.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("malformed Q table at line {line}: {message}")]
    Format { line: usize, message: String },

    #[error("failed to {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            operation: operation.into(),
            source,
        }
    }

    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        Error::InvalidConfig {
            message: message.into(),
        }
    }
}
