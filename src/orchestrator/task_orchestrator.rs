//! Task orchestrator - orchestration layer
//!
//! ## Responsibilities
//!
//! 1. **Intake**: `submit` registers a queued job and returns immediately
//! 2. **Dispatch**: one dispatcher task drains the FIFO queue, acquiring a
//!    worker permit before each job
//! 3. **Resolution**: inputs are resolved at dispatch; bad inputs fail the
//!    job without it ever running
//! 4. **Workers**: each running job gets its own task; a nested spawn turns
//!    panics into `crash` failures
//! 5. **Status**: snapshots, listing and queue stats read the registry
//!
//! The permit of a job is released in the registry's critical section that
//! records its terminal status.

use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppResult, FailureDetail, OrchestratorError};
use crate::infrastructure::SessionFactory;
use crate::models::{QuoteRequest, RawFields, ResolvedFieldSet};
use crate::orchestrator::job_processor::{JobProcessor, JobReport};
use crate::orchestrator::job_registry::{JobOutcome, JobRegistry, JobSnapshot, QueueStats};
use crate::services::field_resolver;
use crate::workflow::JobCtx;

pub struct Orchestrator {
    registry: Arc<JobRegistry>,
    queue: Mutex<Option<mpsc::UnboundedSender<String>>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    max_workers: usize,
}

impl Orchestrator {
    /// Spawn the dispatcher. Must be called inside a tokio runtime.
    pub fn start(config: &Config, factory: Arc<dyn SessionFactory>) -> AppResult<Self> {
        config.validate()?;

        let registry = Arc::new(JobRegistry::new());
        let processor = Arc::new(JobProcessor::new(config, factory));
        let semaphore = Arc::new(Semaphore::new(config.max_workers));
        let (sender, receiver) = mpsc::unbounded_channel();

        let dispatcher = tokio::spawn(dispatch(
            receiver,
            semaphore,
            config.max_workers,
            registry.clone(),
            processor,
        ));

        log_startup(config);

        Ok(Self {
            registry,
            queue: Mutex::new(Some(sender)),
            dispatcher: Mutex::new(Some(dispatcher)),
            max_workers: config.max_workers,
        })
    }

    /// Queue a job. Never waits on automation work.
    pub fn submit(
        &self,
        payload: RawFields,
        id: Option<String>,
    ) -> Result<String, OrchestratorError> {
        let id = id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(generate_job_id);

        let queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        let sender = queue.as_ref().ok_or(OrchestratorError::ShuttingDown)?;

        self.registry.insert(&id, payload)?;
        if sender.send(id.clone()).is_err() {
            // dispatcher is gone
            self.registry.remove(&id);
            return Err(OrchestratorError::ShuttingDown);
        }

        info!("[job {}] 📥 queued", id);
        Ok(id)
    }

    /// Queue a request loaded from disk or received from a caller
    pub fn submit_request(&self, request: QuoteRequest) -> Result<String, OrchestratorError> {
        self.submit(request.quote_data, request.task_id)
    }

    pub fn status(&self, id: &str) -> Option<JobSnapshot> {
        self.registry.snapshot(id)
    }

    /// Every job in submission order
    pub fn list_jobs(&self) -> Vec<JobSnapshot> {
        self.registry.list()
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.registry.stats(self.max_workers)
    }

    /// Resolved inputs of a job that reached `running`
    pub fn resolved_fields(&self, id: &str) -> Option<ResolvedFieldSet> {
        self.registry.resolved_fields(id)
    }

    /// Wait for a job's terminal snapshot. `None` for unknown ids.
    pub async fn wait_for(&self, id: &str) -> Option<JobSnapshot> {
        self.registry.wait_terminal(id).await
    }

    /// Stop accepting jobs, then wait until everything already queued or
    /// running has finished.
    pub async fn shutdown(&self) {
        let sender = self
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(sender);

        let dispatcher = self
            .dispatcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = dispatcher {
            if let Err(e) = handle.await {
                error!("dispatcher task failed: {}", e);
            }
        }
        info!("🛑 orchestrator stopped");
    }
}

/// `quote_<uuid>`
pub fn generate_job_id() -> String {
    format!("quote_{}", Uuid::new_v4().simple())
}

async fn dispatch(
    mut receiver: mpsc::UnboundedReceiver<String>,
    semaphore: Arc<Semaphore>,
    max_workers: usize,
    registry: Arc<JobRegistry>,
    processor: Arc<JobProcessor>,
) {
    while let Some(id) = receiver.recv().await {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };

        let Some(payload) = registry.take_payload(&id) else {
            warn!("[job {}] ⚠️ dequeued twice, skipping", id);
            continue;
        };

        let fields = match field_resolver::resolve(&payload) {
            Ok(fields) => fields,
            Err(e) => {
                warn!("[job {}] ❌ rejected before start: {}", id, e);
                drop(permit);
                registry.fail_unresolved(&id, FailureDetail::from(&e));
                continue;
            }
        };

        if !registry.mark_running(&id, fields.clone()) {
            continue;
        }
        debug!("[job {}] ▶ running", id);

        tokio::spawn(work(
            id,
            fields,
            permit,
            processor.clone(),
            registry.clone(),
        ));
    }

    // drain: every permit back means no job is still running
    let permits = u32::try_from(max_workers).unwrap_or(u32::MAX);
    if semaphore.acquire_many(permits).await.is_err() {
        warn!("worker semaphore closed while draining");
    }
    debug!("dispatcher drained");
}

async fn work(
    id: String,
    fields: ResolvedFieldSet,
    permit: OwnedSemaphorePermit,
    processor: Arc<JobProcessor>,
    registry: Arc<JobRegistry>,
) {
    let ctx = JobCtx::new(id.clone());

    let job = {
        let ctx = ctx.clone();
        tokio::spawn(async move { processor.process(&ctx, &fields).await })
    };

    let report = match job.await {
        Ok(report) => report,
        Err(e) => {
            error!("{} ❌ worker task failed: {}", ctx, e);
            JobReport {
                outcome: JobOutcome::Failed(FailureDetail::crash(
                    Some(ctx.stage()),
                    format!("worker task failed: {}", e),
                )),
                trace: None,
            }
        }
    };

    registry.finish(&id, report.outcome, report.trace, permit);
}

fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 quote orchestrator started");
    info!("📊 max workers: {}", config.max_workers);
    info!(
        "🧾 traces: {}",
        if config.enable_tracing {
            config.trace_dir.display().to_string()
        } else {
            "disabled".to_string()
        }
    );
    info!("{}", "=".repeat(60));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_prefixed_and_unique() {
        let a = generate_job_id();
        let b = generate_job_id();
        assert!(a.starts_with("quote_"));
        assert_eq!(a.len(), "quote_".len() + 32);
        assert_ne!(a, b);
    }
}
