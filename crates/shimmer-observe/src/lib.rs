//! Shimmer Observability
//!
//! This crate provides the observation side of the shimmer interception
//! engine:
//!
//! - [`TraceRecord`]: structured log records, one per observed interaction
//! - [`TraceSink`]: pluggable consumer of records
//! - [`LoggingSink`]: default sink rendering records through `tracing`
//! - [`CollectingSink`]: sink retaining records for later analysis
//!
//! # Record Collection
//!
//! ```ignore
//! use std::sync::Arc;
//! use shimmer_observe::{CollectingSink, TraceSink};
//!
//! let sink = Arc::new(CollectingSink::new());
//! // ... hand the sink to an instrumentation configuration ...
//! for record in sink.records() {
//!     println!("{}", serde_json::to_string(&record.summary())?);
//! }
//! ```

pub mod record;
pub mod sink;

// Re-export main types
pub use record::{Correlated, Outcome, RecordSummary, TraceRecord};
pub use sink::{CollectingSink, FanoutSink, LoggingSink, TraceSink};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::record::{Correlated, Outcome, TraceRecord};
    pub use crate::sink::{CollectingSink, LoggingSink, TraceSink};
}
