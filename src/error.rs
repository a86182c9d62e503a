use std::any::Any;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::models::{Field, Stage};

/// Application-level error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Input payload could not be resolved
    #[error("resolution error: {0}")]
    Resolution(#[from] ResolutionError),
    /// Browser / portal interaction failed
    #[error("portal error: {0}")]
    Portal(#[from] PortalError),
    /// Submission rejected by the orchestrator
    #[error("orchestrator error: {0}")]
    Orchestrator(#[from] OrchestratorError),
    /// Bad configuration
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Field resolution errors. Raised before any browser work happens.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolutionError {
    /// None of the accepted aliases of a required field was present
    #[error("missing required field: {field}")]
    MissingRequiredField { field: &'static str },
    /// A value was present but could not be parsed
    #[error("invalid value for {field}: '{value}' (expected {expected})")]
    InvalidValue {
        field: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Errors raised by a portal driver
#[derive(Debug, Error)]
pub enum PortalError {
    /// Login or browser-context failure, fatal to the job
    #[error("session error: {reason}")]
    Session { reason: String },
    /// Element never became visible within the bounded wait
    #[error("element not found: {stage}/{} after {}ms", field.name(), waited.as_millis())]
    ElementNotFound {
        stage: Stage,
        field: Field,
        waited: Duration,
    },
    /// A navigation or page-level wait did not complete in time
    #[error("timed out at {stage} while {operation}")]
    Timeout {
        stage: Stage,
        operation: String,
    },
    /// Options were rendered but none could be chosen
    #[error("no selectable option for {stage}/{}: {reason}", field.name())]
    NoSelectableOption {
        stage: Stage,
        field: Field,
        reason: String,
    },
    /// Underlying CDP failure
    #[error("browser error: {0}")]
    Browser(#[from] chromiumoxide::error::CdpError),
    /// Script result could not be decoded
    #[error("script result error: {0}")]
    Script(#[from] serde_json::Error),
    /// Trace or profile directory I/O
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PortalError {
    /// Field the error is attached to, when known
    pub fn field(&self) -> Option<Field> {
        match self {
            PortalError::ElementNotFound { field, .. }
            | PortalError::NoSelectableOption { field, .. } => Some(*field),
            _ => None,
        }
    }

    /// Stage the error is attached to, when known
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PortalError::ElementNotFound { stage, .. }
            | PortalError::NoSelectableOption { stage, .. }
            | PortalError::Timeout { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            PortalError::Session { .. } => FailureKind::Session,
            PortalError::ElementNotFound { .. } => FailureKind::ElementNotFound,
            PortalError::Timeout { .. } => FailureKind::Timeout,
            PortalError::NoSelectableOption { .. } => FailureKind::NoSelectableOption,
            PortalError::Browser(_) | PortalError::Script(_) | PortalError::Io(_) => {
                FailureKind::Session
            }
        }
    }
}

/// Submission-time rejections
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OrchestratorError {
    #[error("duplicate job id: {0}")]
    DuplicateJobId(String),
    #[error("orchestrator is shutting down")]
    ShuttingDown,
}

/// Configuration errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {var_name}: '{value}' is not a valid {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    #[error("max_workers must be at least 1")]
    NoWorkers,
}

/// Failure category recorded on a failed job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    MissingRequiredField,
    InvalidValue,
    Session,
    ElementNotFound,
    Timeout,
    NoSelectableOption,
    Crash,
}

/// Structured cause attached to a failed job snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureDetail {
    pub kind: FailureKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
    /// Page screenshot taken when the job failed inside a browser session
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
}

impl FailureDetail {
    pub fn crash(stage: Option<Stage>, message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Crash,
            stage,
            field: None,
            message: message.into(),
            screenshot: None,
        }
    }

    pub fn deadline(stage: Stage, deadline: Duration) -> Self {
        Self {
            kind: FailureKind::Timeout,
            stage: Some(stage),
            field: None,
            message: format!("job deadline of {}s exceeded", deadline.as_secs()),
            screenshot: None,
        }
    }
}

impl From<&ResolutionError> for FailureDetail {
    fn from(err: &ResolutionError) -> Self {
        let (kind, field) = match err {
            ResolutionError::MissingRequiredField { field } => {
                (FailureKind::MissingRequiredField, field)
            }
            ResolutionError::InvalidValue { field, .. } => (FailureKind::InvalidValue, field),
        };
        Self {
            kind,
            stage: None,
            field: Some(field.to_string()),
            message: err.to_string(),
            screenshot: None,
        }
    }
}

// ========== Convenience constructors ==========

impl PortalError {
    pub fn session(reason: impl Into<String>) -> Self {
        PortalError::Session {
            reason: reason.into(),
        }
    }

    pub fn timeout(stage: Stage, operation: impl Into<String>) -> Self {
        PortalError::Timeout {
            stage,
            operation: operation.into(),
        }
    }
}

/// Text of a caught panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

/// Application result type
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_error_maps_to_failure_detail() {
        let err = ResolutionError::MissingRequiredField {
            field: "company_name",
        };
        let detail = FailureDetail::from(&err);
        assert_eq!(detail.kind, FailureKind::MissingRequiredField);
        assert_eq!(detail.field.as_deref(), Some("company_name"));
        assert!(detail.stage.is_none());
    }

    #[test]
    fn layer_errors_convert_into_app_error() {
        let err: AppError = ConfigError::NoWorkers.into();
        assert!(matches!(err, AppError::Config(ConfigError::NoWorkers)));

        let err: AppError = OrchestratorError::DuplicateJobId("q1".into()).into();
        assert_eq!(err.to_string(), "orchestrator error: duplicate job id: q1");
    }

    #[test]
    fn panic_payloads_become_messages() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");

        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "panic with non-string payload");
    }

    #[test]
    fn element_not_found_carries_stage_and_field() {
        let err = PortalError::ElementNotFound {
            stage: Stage::LocationModal,
            field: Field::GrossSales,
            waited: Duration::from_millis(1500),
        };
        assert_eq!(err.stage(), Some(Stage::LocationModal));
        assert_eq!(err.field(), Some(Field::GrossSales));
        assert_eq!(err.kind(), FailureKind::ElementNotFound);
        assert!(err.to_string().contains("gross_sales"));
    }
}
