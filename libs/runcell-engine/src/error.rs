use runcell_common::FailureStage;
use thiserror::Error;

/// Errors that end a request outside the program-behavior channel
///
/// Compile, runtime and timeout failures are not errors here: they are
/// reported as an [`runcell_common::ExecutionOutcome`] with a failure stage.
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("Code and language are required")]
    MissingFields,

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Error executing code: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ExecuteError {
    /// Request-shape errors are the caller's fault and map to 4xx
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ExecuteError::MissingFields | ExecuteError::UnsupportedLanguage(_)
        )
    }

    pub fn failure_stage(&self) -> FailureStage {
        match self {
            ExecuteError::MissingFields | ExecuteError::UnsupportedLanguage(_) => {
                FailureStage::None
            }
            ExecuteError::Internal(_) => FailureStage::Internal,
        }
    }

    /// Short label for metrics and logs
    pub fn reason(&self) -> &'static str {
        match self {
            ExecuteError::MissingFields => "missing_fields",
            ExecuteError::UnsupportedLanguage(_) => "unsupported_language",
            ExecuteError::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_client_errors() {
        assert!(ExecuteError::MissingFields.is_client_error());
        assert!(ExecuteError::UnsupportedLanguage("rust".into()).is_client_error());
        assert!(!ExecuteError::Internal(anyhow!("disk full")).is_client_error());
    }

    #[test]
    fn test_failure_stage_mapping() {
        assert_eq!(
            ExecuteError::UnsupportedLanguage("go".into()).failure_stage(),
            FailureStage::None
        );
        assert_eq!(
            ExecuteError::Internal(anyhow!("spawn failed")).failure_stage(),
            FailureStage::Internal
        );
    }

    #[test]
    fn test_internal_message_includes_context_chain() {
        let err = ExecuteError::from(anyhow!("No such file").context("failed to start compiler"));
        let message = err.to_string();
        assert!(message.contains("failed to start compiler"));
        assert!(message.contains("No such file"));
    }
}
