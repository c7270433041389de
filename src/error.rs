// Error taxonomy for the upload client. Library code returns
// `UploadError`; the binary and the UI wrap it in `anyhow` with context.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the library modules.
pub type Result<T> = std::result::Result<T, UploadError>;

/// Everything that can go wrong during one background-removal call.
#[derive(Error, Debug)]
pub enum UploadError {
    /// Source unreadable or destination unwritable.
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Connect, DNS, timeout or body-read failure while talking to the API.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The API answered with something other than 200.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// No key from the flag, the environment or the settings file.
    #[error("no API key: pass --key, set BACKGROUND_ERASE_API_KEY or save one from the menu")]
    MissingApiKey,

    /// Malformed endpoint or header value, unusable settings file.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl UploadError {
    pub fn io<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Status code of an API error, if that is what this is.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display_carries_status_and_message() {
        let err = UploadError::Api {
            status: 402,
            message: "Insufficient credits".into(),
        };
        assert_eq!(err.to_string(), "API error 402: Insufficient credits");
        assert_eq!(err.status(), Some(402));
        assert!(!err.is_network());
    }

    #[test]
    fn io_error_display_names_the_path() {
        let err = UploadError::io(
            "missing.jpg",
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        );
        let text = err.to_string();
        assert!(text.contains("missing.jpg"));
        assert!(text.contains("no such file"));
        assert_eq!(err.status(), None);
    }
}
