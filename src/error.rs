use thiserror::Error;

#[derive(Debug, Error)]
pub enum DebugError {
    #[error(transparent)]
    Provider(#[from] crate::provider::ProviderError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("state error: {0}")]
    State(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_state_error_display() {
        let err = DebugError::State("debug_sleep.this already exists".to_string());
        assert_eq!(
            err.to_string(),
            "state error: debug_sleep.this already exists"
        );
    }

    #[test]
    fn test_io_error_from_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: DebugError = io_err.into();
        assert!(matches!(err, DebugError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_json_error_from_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: DebugError = json_err.into();
        assert!(matches!(err, DebugError::Json(_)));
        assert!(err.to_string().starts_with("invalid JSON"));
    }

    #[test]
    fn test_provider_error_from_conversion() {
        let provider_err =
            crate::provider::ProviderError::UnknownDataSource("debug_nope".to_string());
        let err: DebugError = provider_err.into();
        assert!(matches!(err, DebugError::Provider(_)));
        assert!(err.to_string().contains("unknown data source: debug_nope"));
    }
}
