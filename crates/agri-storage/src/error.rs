//! Error types for execution log storage.

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed log line {line}: {message}")]
    Malformed { line: usize, message: String },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Log lock poisoned")]
    LockPoisoned,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::Malformed {
            line: 3,
            message: "expected value".to_string(),
        };
        assert_eq!(err.to_string(), "Malformed log line 3: expected value");

        let err = StorageError::Io {
            path: "data/execution.log".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().starts_with("I/O error on data/execution.log"));
    }

    #[test]
    fn test_io_error_keeps_its_source() {
        use std::error::Error;

        let err = StorageError::Io {
            path: "data/execution.log".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let source = err
            .source()
            .and_then(|s| s.downcast_ref::<std::io::Error>())
            .expect("io source");
        assert_eq!(source.kind(), std::io::ErrorKind::PermissionDenied);

        let boxed: Box<dyn Error> = err.into();
        assert!(boxed.to_string().contains("data/execution.log"));
    }
}
