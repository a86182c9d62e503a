pub mod field_resolver;
pub mod trace_writer;

pub use field_resolver::{resolve, resolve_on};
pub use trace_writer::{TraceEvent, TraceRecorder, TraceWriter};
