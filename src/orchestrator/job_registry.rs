//! Job registry - orchestration layer
//!
//! In-memory store of every submitted job. Each read or write is one short
//! critical section on a std `RwLock`; nothing awaits while holding it.
//! Terminal transitions release the job's worker permit inside the same
//! write section, so no reader ever sees more running jobs than permits.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::{Notify, OwnedSemaphorePermit};

use crate::error::{FailureDetail, OrchestratorError};
use crate::models::{QuoteSummary, RawFields, ResolvedFieldSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

/// How a running job ended
#[derive(Debug, Clone)]
pub enum JobOutcome {
    Succeeded(QuoteSummary),
    Failed(FailureDetail),
}

#[derive(Debug)]
struct JobRecord {
    id: String,
    /// Taken by the dispatcher when the job is resolved
    payload: Option<RawFields>,
    fields: Option<ResolvedFieldSet>,
    status: JobStatus,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    result: Option<QuoteSummary>,
    error: Option<FailureDetail>,
    trace_ref: Option<PathBuf>,
}

impl JobRecord {
    fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id.clone(),
            status: self.status,
            created_at: self.created_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
            result: self.result.clone(),
            error: self.error.clone(),
            trace_ref: self.trace_ref.as_ref().map(|p| p.display().to_string()),
        }
    }
}

/// Point-in-time copy of a job, as reported to callers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub id: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<QuoteSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FailureDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_ref: Option<String>,
}

/// Queue overview
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub queued: usize,
    pub running: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub max_workers: usize,
}

#[derive(Debug, Default)]
struct Jobs {
    by_id: HashMap<String, JobRecord>,
    /// Submission order
    order: Vec<String>,
}

#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: RwLock<Jobs>,
    changed: Notify,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // a panic while holding the lock cannot leave a record half-written:
    // every mutation below is a plain field assignment
    fn read(&self) -> RwLockReadGuard<'_, Jobs> {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Jobs> {
        self.jobs.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new queued job
    pub fn insert(&self, id: &str, payload: RawFields) -> Result<(), OrchestratorError> {
        let mut jobs = self.write();
        if jobs.by_id.contains_key(id) {
            return Err(OrchestratorError::DuplicateJobId(id.to_string()));
        }
        jobs.by_id.insert(
            id.to_string(),
            JobRecord {
                id: id.to_string(),
                payload: Some(payload),
                fields: None,
                status: JobStatus::Queued,
                created_at: Utc::now(),
                started_at: None,
                completed_at: None,
                result: None,
                error: None,
                trace_ref: None,
            },
        );
        jobs.order.push(id.to_string());
        Ok(())
    }

    /// Drop a job that never got enqueued
    pub fn remove(&self, id: &str) {
        let mut jobs = self.write();
        if jobs.by_id.remove(id).is_some() {
            jobs.order.retain(|other| other != id);
        }
    }

    /// Hand the raw payload to the dispatcher (once)
    pub fn take_payload(&self, id: &str) -> Option<RawFields> {
        self.write().by_id.get_mut(id)?.payload.take()
    }

    /// queued -> running. Returns false if the job is not queued.
    pub fn mark_running(&self, id: &str, fields: ResolvedFieldSet) -> bool {
        let changed = {
            let mut jobs = self.write();
            match jobs.by_id.get_mut(id) {
                Some(job) if job.status == JobStatus::Queued => {
                    job.status = JobStatus::Running;
                    job.started_at = Some(Utc::now());
                    job.fields = Some(fields);
                    true
                }
                _ => false,
            }
        };
        if changed {
            self.changed.notify_waiters();
        }
        changed
    }

    /// queued -> failed, for jobs whose input could not be resolved
    pub fn fail_unresolved(&self, id: &str, detail: FailureDetail) {
        {
            let mut jobs = self.write();
            if let Some(job) = jobs.by_id.get_mut(id) {
                if job.status == JobStatus::Queued {
                    job.status = JobStatus::Failed;
                    job.completed_at = Some(Utc::now());
                    job.error = Some(detail);
                }
            }
        }
        self.changed.notify_waiters();
    }

    /// running -> terminal. The permit is released in the same critical
    /// section that records the outcome.
    pub fn finish(
        &self,
        id: &str,
        outcome: JobOutcome,
        trace: Option<PathBuf>,
        permit: OwnedSemaphorePermit,
    ) {
        {
            let mut jobs = self.write();
            drop(permit);
            if let Some(job) = jobs.by_id.get_mut(id) {
                if job.status == JobStatus::Running {
                    job.completed_at = Some(Utc::now());
                    job.trace_ref = trace;
                    match outcome {
                        JobOutcome::Succeeded(summary) => {
                            job.status = JobStatus::Succeeded;
                            job.result = Some(summary);
                        }
                        JobOutcome::Failed(detail) => {
                            job.status = JobStatus::Failed;
                            job.error = Some(detail);
                        }
                    }
                }
            }
        }
        self.changed.notify_waiters();
    }

    pub fn snapshot(&self, id: &str) -> Option<JobSnapshot> {
        self.read().by_id.get(id).map(JobRecord::snapshot)
    }

    /// Resolved inputs of a job that reached `running`
    pub fn resolved_fields(&self, id: &str) -> Option<ResolvedFieldSet> {
        self.read().by_id.get(id)?.fields.clone()
    }

    /// Every job, in submission order
    pub fn list(&self) -> Vec<JobSnapshot> {
        let jobs = self.read();
        jobs.order
            .iter()
            .filter_map(|id| jobs.by_id.get(id))
            .map(JobRecord::snapshot)
            .collect()
    }

    pub fn stats(&self, max_workers: usize) -> QueueStats {
        let jobs = self.read();
        let mut stats = QueueStats {
            queued: 0,
            running: 0,
            succeeded: 0,
            failed: 0,
            max_workers,
        };
        for job in jobs.by_id.values() {
            match job.status {
                JobStatus::Queued => stats.queued += 1,
                JobStatus::Running => stats.running += 1,
                JobStatus::Succeeded => stats.succeeded += 1,
                JobStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }

    /// Wait until the job is terminal. `None` for unknown ids.
    pub async fn wait_terminal(&self, id: &str) -> Option<JobSnapshot> {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            // register before checking so a transition in between is not missed
            notified.as_mut().enable();

            let snapshot = self.snapshot(id)?;
            if snapshot.status.is_terminal() {
                return Some(snapshot);
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use std::sync::Arc;
    use tokio::sync::Semaphore;

    fn payload() -> RawFields {
        RawFields::new()
    }

    fn summary() -> QuoteSummary {
        QuoteSummary {
            company_name: "Acme".into(),
            applicant: crate::models::ApplicantType::Tenant,
            effective_date: "01/02/2026".into(),
            mailing_address_suggestion: None,
            protection_class: None,
            stages_completed: Vec::new(),
        }
    }

    fn fields() -> ResolvedFieldSet {
        let mut raw = RawFields::new();
        raw.insert("contact_name".into(), "Pat".into());
        raw.insert("email".into(), "pat@example.com".into());
        raw.insert("company_name".into(), "Acme".into());
        raw.insert("address".into(), "1 Main St".into());
        crate::services::field_resolver::resolve(&raw).unwrap()
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let registry = JobRegistry::new();
        registry.insert("a", payload()).unwrap();
        assert_eq!(
            registry.insert("a", payload()),
            Err(OrchestratorError::DuplicateJobId("a".into()))
        );
        assert_eq!(registry.list().len(), 1);
    }

    #[test]
    fn list_keeps_submission_order() {
        let registry = JobRegistry::new();
        for id in ["c", "a", "b"] {
            registry.insert(id, payload()).unwrap();
        }
        let ids: Vec<_> = registry.list().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[test]
    fn unresolved_jobs_fail_without_starting() {
        let registry = JobRegistry::new();
        registry.insert("a", payload()).unwrap();
        registry.fail_unresolved(
            "a",
            FailureDetail::from(&crate::error::ResolutionError::MissingRequiredField {
                field: "company_name",
            }),
        );

        let snap = registry.snapshot("a").unwrap();
        assert_eq!(snap.status, JobStatus::Failed);
        assert!(snap.started_at.is_none());
        assert_eq!(snap.error.unwrap().kind, FailureKind::MissingRequiredField);
    }

    #[tokio::test]
    async fn finish_releases_the_permit_with_the_outcome() {
        let registry = JobRegistry::new();
        let semaphore = Arc::new(Semaphore::new(1));
        registry.insert("a", payload()).unwrap();

        let permit = semaphore.clone().acquire_owned().await.unwrap();
        assert!(registry.mark_running("a", fields()));
        assert!(!registry.mark_running("a", fields()));
        assert_eq!(semaphore.available_permits(), 0);

        registry.finish("a", JobOutcome::Succeeded(summary()), None, permit);
        assert_eq!(semaphore.available_permits(), 1);

        let snap = registry.snapshot("a").unwrap();
        assert_eq!(snap.status, JobStatus::Succeeded);
        assert!(snap.completed_at.is_some());
        assert_eq!(registry.resolved_fields("a").unwrap().company_name, "Acme");
    }

    #[test]
    fn snapshot_serializes_in_camel_case() {
        let registry = JobRegistry::new();
        registry.insert("a", payload()).unwrap();
        let json = serde_json::to_value(registry.snapshot("a").unwrap()).unwrap();
        assert_eq!(json["status"], "queued");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("startedAt").is_none());
        assert!(json.get("traceRef").is_none());
    }

    #[tokio::test]
    async fn waiters_see_the_terminal_snapshot() {
        let registry = Arc::new(JobRegistry::new());
        registry.insert("a", payload()).unwrap();

        let waiter = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.wait_terminal("a").await })
        };
        tokio::task::yield_now().await;

        registry.fail_unresolved(
            "a",
            FailureDetail::crash(None, "boom"),
        );
        let snap = waiter.await.unwrap().unwrap();
        assert_eq!(snap.status, JobStatus::Failed);

        assert!(registry.wait_terminal("missing").await.is_none());
    }
}
