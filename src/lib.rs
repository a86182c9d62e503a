//! # Quote Portal Automation
//!
//! Submits data-entry jobs against an insurance quoting portal through a
//! headless browser and reports each job's outcome asynchronously.
//!
//! ## Architecture
//!
//! Four layers, each depending only on the ones below it:
//!
//! ### ① Infrastructure
//! - `infrastructure/` - owns the scarce resource (one browser per job) and
//!   only exposes capabilities
//! - `PortalDriver` - page-level operations addressed by `(Stage, Field)`
//! - `ChromiumPortal` - the chromiumoxide implementation, via `JsExecutor`
//! - `PortalSession` - scoped session that records the trace and closes once
//!
//! ### ② Services
//! - `services/` - pure or single-purpose capabilities
//! - `field_resolver` - raw payload → `ResolvedFieldSet`
//! - `TraceWriter` - per-job trace artifacts
//!
//! ### ③ Workflow
//! - `workflow/` - the page graph of one quote
//! - `JobCtx` - job id plus the stage reached
//! - `QuoteFlow` - Login → … → Location Coverages
//!
//! ### ④ Orchestration
//! - `orchestrator/task_orchestrator` - bounded worker pool, FIFO dispatch
//! - `orchestrator/job_processor` - one job: session, flow, cleanup
//! - `orchestrator/job_registry` - job status records

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

pub use config::Config;
pub use error::{AppError, AppResult, FailureDetail, FailureKind};
pub use infrastructure::{ChromiumSessionFactory, PortalDriver, PortalSession, SessionFactory};
pub use models::{QuoteRequest, ResolvedFieldSet, Stage};
pub use orchestrator::{JobSnapshot, JobStatus, Orchestrator, QueueStats};
pub use workflow::{JobCtx, QuoteFlow};
