pub mod job_ctx;
pub mod protection_class;
pub mod quote_flow;

pub use job_ctx::JobCtx;
pub use protection_class::{choose_protection_class, NoProtectionClass, ProtectionClassChoice};
pub use quote_flow::{QuoteFlow, StageFailure};
