use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("navigation failed for {url}: {message}")]
    Navigation { url: String, message: String },

    #[error("page at {url} did not become ready within {timeout_secs}s")]
    FetchTimeout { url: String, timeout_secs: u64 },

    #[error("parse error: {message}")]
    Parse { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    /// Process exit code reported for this failure kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Config(_) => 2,
            AppError::Navigation { .. } => 3,
            AppError::FetchTimeout { .. } => 4,
            AppError::Parse { .. } => 5,
            AppError::Io(_) | AppError::Serialization(_) => 1,
        }
    }
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::Io(_)));
    }

    #[test]
    fn test_fetch_timeout_message() {
        let err = AppError::FetchTimeout {
            url: "https://example.com/ad".to_string(),
            timeout_secs: 10,
        };
        assert_eq!(
            err.to_string(),
            "page at https://example.com/ad did not become ready within 10s"
        );
    }

    #[test]
    fn test_exit_codes_are_distinct_per_kind() {
        let config = AppError::Config(config::ConfigError::Message("missing".into()));
        let nav = AppError::Navigation {
            url: "u".into(),
            message: "m".into(),
        };
        let timeout = AppError::FetchTimeout {
            url: "u".into(),
            timeout_secs: 1,
        };
        let parse = AppError::Parse {
            message: "m".into(),
        };
        assert_eq!(config.exit_code(), 2);
        assert_eq!(nav.exit_code(), 3);
        assert_eq!(timeout.exit_code(), 4);
        assert_eq!(parse.exit_code(), 5);
    }
}
