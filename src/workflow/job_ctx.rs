//! Job context
//!
//! Which job a flow is running for, and how far it got. The stage marker is
//! shared with the job processor so a panic or deadline can be attributed to
//! the page that was active.

use std::fmt::Display;
use std::sync::{Arc, Mutex, PoisonError};

use crate::models::Stage;

#[derive(Debug, Clone)]
pub struct JobCtx {
    pub job_id: String,
    stage: Arc<Mutex<Stage>>,
}

impl JobCtx {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            stage: Arc::new(Mutex::new(Stage::Login)),
        }
    }

    /// Record that the flow moved on to `stage`
    pub fn enter(&self, stage: Stage) {
        *self.stage.lock().unwrap_or_else(PoisonError::into_inner) = stage;
    }

    /// Last stage entered
    pub fn stage(&self) -> Stage {
        *self.stage.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Display for JobCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[job {}]", self.job_id)
    }
}
