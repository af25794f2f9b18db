use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum SweepError {
    #[error("Failed to open session on '{context}': {message}")]
    SessionOpen { context: String, message: String },

    #[error("Rollback failed on '{context}': {message}")]
    Rollback { context: String, message: String },

    #[error("Session '{0}' is closed")]
    SessionClosed(u64),

    #[error("Notification delivery failed: {0}")]
    Notification(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unexpected fault: {0}")]
    Unexpected(String),
}

impl SweepError {
    /// Whether the failure belongs to a single pending item rather than the sweep.
    pub fn is_item_failure(&self) -> bool {
        matches!(
            self,
            Self::SessionOpen { .. } | Self::Rollback { .. } | Self::SessionClosed(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SweepError>;

impl From<serde_json::Error> for SweepError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_variants() -> Vec<SweepError> {
        vec![
            SweepError::SessionOpen {
                context: "ctx-1".into(),
                message: "refused".into(),
            },
            SweepError::Rollback {
                context: "ctx-1".into(),
                message: "broken pipe".into(),
            },
            SweepError::SessionClosed(7),
            SweepError::Notification("sink offline".into()),
            SweepError::Config("empty label".into()),
            SweepError::Unexpected("panic".into()),
        ]
    }

    #[test]
    fn test_item_failure_classification() {
        for err in all_variants() {
            // No wildcard arm: a new variant has to be classified here too
            let expected = match &err {
                SweepError::SessionOpen { .. }
                | SweepError::Rollback { .. }
                | SweepError::SessionClosed(_) => true,
                SweepError::Notification(_)
                | SweepError::Config(_)
                | SweepError::Unexpected(_) => false,
            };
            assert_eq!(err.is_item_failure(), expected, "{}", err);
        }
    }

    #[test]
    fn test_json_error_is_config_error() {
        let err: SweepError = serde_json::from_str::<u32>("{").unwrap_err().into();
        assert!(matches!(err, SweepError::Config(_)));
    }
}
