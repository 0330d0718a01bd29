//! Shimmer Object Model
//!
//! This crate provides the dynamic object model the shimmer interception
//! engine instruments:
//!
//! - [`Value`]: runtime values (data, objects, functions, deferred results)
//! - [`DynObject`] / [`ObjectRef`]: reflective objects with data and
//!   accessor members, class fallback, and an event listener table
//! - [`ClassDef`] / [`ClassRef`]: classes with shared behavior and stable
//!   identity
//! - [`DeferredRef`]: asynchronous values with explicit continuation
//!   registration
//!
//! # Quick Start
//!
//! ```ignore
//! use shimmer_object::{ClassDef, DynObject, Value};
//!
//! let class = ClassDef::builder("Player")
//!     .with_constructor(|class, _args| {
//!         Ok(DynObject::of_class(class.clone())
//!             .with_data("volume", 50i64)
//!             .with_listener_support()
//!             .into_ref())
//!     })
//!     .build();
//!
//! let player = class.instantiate(&[])?;
//! player.set("volume", Value::from(11i64))?;
//! player.dispatch_event("volume_change", Value::Null)?;
//! ```

pub mod class;
pub mod deferred;
pub mod error;
pub mod object;
pub mod value;

// Re-export main types at crate root
pub use class::{ClassBuilder, ClassDef, ClassId, ClassRef, Constructor};
pub use deferred::{DeferredRef, SettleResult};
pub use error::{ObjectError, ObjectResult};
pub use object::{
    DynObject, Getter, ObjectRef, Property, Setter, ValueCell, WeakObjectRef, invoke_listener,
    on_member_event_name, LISTENER_REGISTRATION,
};
pub use value::{FuncRef, NativeFn, Value};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::class::{ClassDef, ClassRef};
    pub use crate::deferred::DeferredRef;
    pub use crate::error::{ObjectError, ObjectResult};
    pub use crate::object::{DynObject, ObjectRef, Property};
    pub use crate::value::{FuncRef, Value};
}
