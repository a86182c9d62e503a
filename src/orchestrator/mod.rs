//! Orchestration layer
//!
//! ## Modules
//!
//! ### `task_orchestrator` - job intake and dispatch
//! - Accepts submissions, assigns ids
//! - Bounds concurrency (Semaphore), dispatches FIFO
//! - Resolves inputs at dispatch time
//! - Answers status queries
//!
//! ### `job_processor` - one job
//! - Opens the portal session
//! - Runs the quote flow under the job deadline
//! - Closes the session and flushes the trace
//!
//! ### `job_registry` - job records
//! - Status transitions, snapshots, queue stats
//!
//! ## Layering
//!
//! ```text
//! task_orchestrator (many jobs)
//!     ↓
//! job_processor (one job)
//!     ↓
//! workflow::QuoteFlow (page graph)
//!     ↓
//! infrastructure (PortalDriver / PortalSession)
//! ```

pub mod job_processor;
pub mod job_registry;
pub mod task_orchestrator;

pub use job_processor::{JobProcessor, JobReport};
pub use job_registry::{JobOutcome, JobRegistry, JobSnapshot, JobStatus, QueueStats};
pub use task_orchestrator::{generate_job_id, Orchestrator};
