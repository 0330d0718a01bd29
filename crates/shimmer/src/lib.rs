//! shimmer instruments dynamic objects so every method call, property
//! write, accessor read, and event is logged through a pluggable sink,
//! while the objects keep behaving exactly as they did before.
//!
//! # Architecture
//!
//! The workspace is split into three layers:
//!
//! - [`shimmer_object`] is the dynamic object model: classes, objects
//!   with data and accessor members, callables, and deferred values.
//! - [`shimmer_observe`] defines [`TraceRecord`] and the [`TraceSink`]
//!   implementations records are delivered to.
//! - [`shimmer_core`] is the engine that installs the shims.
//!
//! This crate ties them together behind a process-wide engine, so
//! instrumentation registered anywhere is honored everywhere.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use shimmer::prelude::*;
//! use shimmer::{ClassBuilder, CollectingSink, DynObject, Value};
//!
//! let sink = Arc::new(CollectingSink::new());
//! let config = TraceConfig::new().with_sink(sink.clone());
//!
//! let player = ClassBuilder::new("Player")
//!     .with_constructor(|class, _args| {
//!         Ok(DynObject::of_class(class.clone())
//!             .with_data("volume", Value::Number(50.0))
//!             .into_ref())
//!     })
//!     .build();
//!
//! let player = shimmer::trace_class(&player, &config);
//! let instance = player.instantiate(&[]).unwrap();
//! instance.set("volume", Value::Number(80.0)).unwrap();
//!
//! assert_eq!(sink.of_kind("constructor").len(), 1);
//! assert_eq!(sink.of_kind("setter").len(), 1);
//! ```

use std::sync::LazyLock;

pub use shimmer_core::{ElementHost, MemberKind, ShimEngine, ShimError, ShimResult, TraceConfig};
pub use shimmer_object::{
    ClassBuilder, ClassId, ClassRef, DeferredRef, DynObject, FuncRef, ObjectError, ObjectRef,
    ObjectResult, Property, Value,
};
pub use shimmer_observe::{
    CollectingSink, Correlated, FanoutSink, LoggingSink, Outcome, RecordSummary, TraceRecord,
    TraceSink,
};

/// Commonly used types for instrumenting objects.
pub mod prelude {
    pub use shimmer_core::prelude::*;
    pub use shimmer_object::prelude::*;
    pub use shimmer_observe::prelude::*;
}

static ENGINE: LazyLock<ShimEngine> = LazyLock::new(ShimEngine::new);

/// The process-wide engine behind the free functions.
///
/// Shims installed through it share one class registry and one set of
/// identity counters.
pub fn engine() -> &'static ShimEngine {
    &ENGINE
}

/// Registers a class for instrumentation and returns a replacement
/// class whose instances are instrumented on construction.
///
/// See [`ShimEngine::trace_class`].
pub fn trace_class(class: &ClassRef, config: &TraceConfig) -> ClassRef {
    ENGINE.trace_class(class, config)
}

/// Instruments an object in place or behind a wrapper, per the config.
///
/// See [`ShimEngine::trace_object`].
pub fn trace_object(object: &ObjectRef, config: &TraceConfig) -> ObjectRef {
    ENGINE.trace_object(object, config)
}

/// Instruments a single named member of an object, in place.
///
/// See [`ShimEngine::trace_member`].
pub fn trace_member(object: &ObjectRef, name: &str, config: &TraceConfig) -> ShimResult<()> {
    ENGINE.trace_member(object, name, config)
}

/// Instruments a callable shared-behavior member of a class.
///
/// See [`ShimEngine::trace_class_member`].
pub fn trace_class_member(class: &ClassRef, name: &str, config: &TraceConfig) -> ShimResult<()> {
    ENGINE.trace_class_member(class, name, config)
}

/// Instruments every current and future element of `tag` on a host.
///
/// See [`ShimEngine::trace_tag`].
pub fn trace_tag(host: &dyn ElementHost, tag: &str, config: &TraceConfig) {
    ENGINE.trace_tag(host, tag, config)
}
