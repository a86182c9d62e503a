//! Trace writer - capability layer
//!
//! Collects the browser interactions of one job and writes them as a single
//! JSON artifact named after the job id.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;

use crate::models::{Field, Stage};
use crate::utils::file_names::job_file_stem;

/// One recorded driver interaction
#[derive(Debug, Clone, Serialize)]
pub struct TraceEvent {
    pub at: DateTime<Utc>,
    pub action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<Field>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
struct TraceArtifact<'a> {
    job_id: &'a str,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    events: &'a [TraceEvent],
}

/// In-memory trace for one job
#[derive(Debug)]
pub struct TraceRecorder {
    job_id: String,
    started_at: DateTime<Utc>,
    events: Vec<TraceEvent>,
}

impl TraceRecorder {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            started_at: Utc::now(),
            events: Vec::new(),
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn record(
        &mut self,
        action: &'static str,
        location: Option<(Stage, Field)>,
        detail: Option<String>,
        error: Option<String>,
    ) {
        self.events.push(TraceEvent {
            at: Utc::now(),
            action,
            stage: location.map(|(stage, _)| stage),
            field: location.map(|(_, field)| field),
            detail,
            ok: error.is_none(),
            error,
        });
    }
}

/// Writes trace artifacts into one directory
#[derive(Debug, Clone)]
pub struct TraceWriter {
    trace_dir: PathBuf,
}

impl TraceWriter {
    pub fn new(trace_dir: impl Into<PathBuf>) -> Self {
        Self {
            trace_dir: trace_dir.into(),
        }
    }

    /// Artifact location for a job id
    pub fn path_for(&self, job_id: &str) -> PathBuf {
        self.trace_dir.join(format!("{}.json", job_file_stem(job_id)))
    }

    /// Where the page screenshot of a failed job goes
    pub fn failure_screenshot_path(&self, job_id: &str) -> PathBuf {
        self.trace_dir
            .join(format!("{}_failure.png", job_file_stem(job_id)))
    }

    /// Write the whole trace to a temp file, then rename it into place so
    /// readers never see a partial artifact.
    pub async fn write(&self, recorder: &TraceRecorder) -> std::io::Result<PathBuf> {
        fs::create_dir_all(&self.trace_dir).await?;

        let artifact = TraceArtifact {
            job_id: &recorder.job_id,
            started_at: recorder.started_at,
            finished_at: Utc::now(),
            events: &recorder.events,
        };
        let body = serde_json::to_vec_pretty(&artifact)?;

        let target = self.path_for(&recorder.job_id);
        let staging = target.with_extension("json.partial");
        fs::write(&staging, &body).await?;
        fs::rename(&staging, &target).await?;

        debug!(
            "trace written: job {} | {} events | {}",
            recorder.job_id,
            recorder.events.len(),
            target.display()
        );

        Ok(target)
    }
}
