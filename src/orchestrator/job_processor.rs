//! Single job processor - orchestration layer
//!
//! Runs one resolved job end to end:
//!
//! 1. Open a portal session (fresh browser context)
//! 2. Drive the quote flow, under the optional job deadline
//! 3. On failure, screenshot the page next to the trace
//! 4. Close the session and flush its trace, whatever happened
//!
//! Panics while opening or inside the flow are caught here so the session is
//! still closed; `PortalSession` catches a panicking close. The worker
//! boundary in `task_orchestrator` catches anything that escapes.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{panic_message, FailureDetail};
use crate::infrastructure::{PortalSession, SessionFactory};
use crate::models::{ResolvedFieldSet, Stage};
use crate::orchestrator::job_registry::JobOutcome;
use crate::services::TraceWriter;
use crate::workflow::{JobCtx, QuoteFlow};

/// What the worker records on the job
#[derive(Debug)]
pub struct JobReport {
    pub outcome: JobOutcome,
    pub trace: Option<PathBuf>,
}

pub struct JobProcessor {
    factory: Arc<dyn SessionFactory>,
    flow: QuoteFlow,
    trace_writer: Option<TraceWriter>,
    deadline: Option<Duration>,
}

impl JobProcessor {
    pub fn new(config: &Config, factory: Arc<dyn SessionFactory>) -> Self {
        Self {
            factory,
            flow: QuoteFlow::new(config),
            trace_writer: config
                .enable_tracing
                .then(|| TraceWriter::new(config.trace_dir.clone())),
            deadline: config.job_deadline(),
        }
    }

    pub async fn process(&self, ctx: &JobCtx, fields: &ResolvedFieldSet) -> JobReport {
        log_job_start(ctx, fields);

        let opened = AssertUnwindSafe(PortalSession::open(
            &*self.factory,
            &ctx.job_id,
            self.trace_writer.clone(),
        ))
        .catch_unwind()
        .await;

        let mut session = match opened {
            Ok(Ok(session)) => session,
            Ok(Err(failure)) => {
                error!("{} ❌ could not open a browser session: {}", ctx, failure.error);
                return JobReport {
                    outcome: JobOutcome::Failed(FailureDetail {
                        kind: failure.error.kind(),
                        stage: Some(Stage::Login),
                        field: None,
                        message: failure.error.to_string(),
                        screenshot: None,
                    }),
                    trace: failure.trace,
                };
            }
            Err(panic) => {
                // no driver came back, so there is nothing to close
                let message = panic_message(panic.as_ref());
                error!("{} ❌ session factory panicked: {}", ctx, message);
                return JobReport {
                    outcome: JobOutcome::Failed(FailureDetail::crash(Some(Stage::Login), message)),
                    trace: None,
                };
            }
        };

        let run = AssertUnwindSafe(self.flow.run(&mut session, fields, ctx)).catch_unwind();
        let finished = match self.deadline {
            Some(limit) => tokio::time::timeout(limit, run).await.map_err(|_| limit),
            None => Ok(run.await),
        };

        let outcome = match finished {
            Ok(Ok(Ok(summary))) => JobOutcome::Succeeded(summary),
            Ok(Ok(Err(failure))) => {
                error!("{} ❌ {}", ctx, failure);
                JobOutcome::Failed(failure.detail())
            }
            Ok(Err(panic)) => {
                let message = panic_message(panic.as_ref());
                error!("{} ❌ flow panicked at {}: {}", ctx, ctx.stage(), message);
                JobOutcome::Failed(FailureDetail::crash(Some(ctx.stage()), message))
            }
            Err(limit) => {
                error!(
                    "{} ❌ deadline of {}s hit during {}",
                    ctx,
                    limit.as_secs(),
                    ctx.stage()
                );
                JobOutcome::Failed(FailureDetail::deadline(ctx.stage(), limit))
            }
        };

        let outcome = match outcome {
            JobOutcome::Failed(mut detail) => {
                detail.screenshot = session
                    .capture_failure()
                    .await
                    .map(|path| path.display().to_string());
                JobOutcome::Failed(detail)
            }
            succeeded => succeeded,
        };

        let closed = session.finish().await;
        if let Some(e) = &closed.close_error {
            warn!("{} ⚠️ session closed with error: {}", ctx, e);
        }

        log_job_complete(ctx, &outcome, closed.trace.as_ref());

        JobReport {
            outcome,
            trace: closed.trace,
        }
    }
}

// ========== Logging helpers ==========

fn log_job_start(ctx: &JobCtx, fields: &ResolvedFieldSet) {
    info!("\n{}", "=".repeat(60));
    info!("{} 📝 starting quote for {}", ctx, fields.company_name);
    info!(
        "{} applicant: {:?} | effective: {}",
        ctx,
        fields.applicant_type(),
        fields.effective_date_text()
    );
    info!("{}", "=".repeat(60));
}

fn log_job_complete(ctx: &JobCtx, outcome: &JobOutcome, trace: Option<&PathBuf>) {
    info!("\n{}", "─".repeat(60));
    match outcome {
        JobOutcome::Succeeded(summary) => info!(
            "{} ✅ succeeded after {} stages",
            ctx,
            summary.stages_completed.len()
        ),
        JobOutcome::Failed(detail) => info!(
            "{} ❌ failed ({:?}) at {}",
            ctx,
            detail.kind,
            detail
                .stage
                .map(|s| s.name())
                .unwrap_or("submission")
        ),
    }
    if let Some(path) = trace {
        info!("{} trace: {}", ctx, path.display());
    }
    info!("{}", "─".repeat(60));
}
