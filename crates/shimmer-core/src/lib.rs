//! Core interception engine for shimmer.
//!
//! The [`ShimEngine`] instruments classes, objects, and individual
//! members of the dynamic object model so that every call, property
//! write, accessor read, and event is reported as a
//! [`shimmer_observe::TraceRecord`] through a configured sink, while
//! the instrumented code observes exactly the behavior it had before.
//!
//! Instrumentation is driven by a [`TraceConfig`] and spreads on its
//! own: results of intercepted calls whose class was registered with
//! [`ShimEngine::trace_class`] are instrumented before the caller sees
//! them, and listener registrations reveal events as they are named.

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod host;
pub mod member;
pub mod propagate;
pub mod shim;

pub use config::TraceConfig;
pub use engine::ShimEngine;
pub use error::{ShimError, ShimResult};
pub use host::ElementHost;
pub use member::MemberKind;

/// Commonly used types for working with the engine.
pub mod prelude {
    pub use crate::config::TraceConfig;
    pub use crate::engine::ShimEngine;
    pub use crate::error::{ShimError, ShimResult};
    pub use crate::host::ElementHost;
}
