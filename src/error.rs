use thiserror::Error;

/// Failures that abort a compile request.
///
/// Mistakes in the user's script are never reported here; they travel as
/// diagnostics on the returned [`crate::compilation::Compilation`].
#[derive(Debug, Error)]
pub enum Error {
    /// A required input was missing or empty.
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    /// The engine could not produce any tree for a fragment.
    #[error("could not parse {origin}: {message}")]
    Parse { origin: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn invalid_argument(name: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }

    pub fn parse(origin: &str, message: impl Into<String>) -> Self {
        Error::Parse {
            origin: if origin.is_empty() {
                "fragment".to_string()
            } else {
                origin.to_string()
            },
            message: message.into(),
        }
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument { .. })
    }
}
