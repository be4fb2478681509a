//! # Bindwire
//!
//! A runtime dependency injection container with typed in-process signals.
//!
//! ## Features
//!
//! - **Fluent bindings**: `bind::<dyn Trait>().to::<Impl>().from_new().as_singleton()`
//! - **Resolution strategies**: constructors, factories, methods, getters, fixed
//!   instances and scene-hierarchy lookups
//! - **Scopes**: transient, singleton and per-context caching
//! - **Identifiers and conditions**: several bindings per contract, picked by id
//!   or by a predicate over the injection context
//! - **Cycle detection**: errors carry the full chain of pending requests
//! - **Child containers**: lookups fall back to the parent
//! - **Signals**: typed listeners, cross-cutting handlers and broadcast streams
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bindwire::prelude::*;
//!
//! pub trait Clock: Send + Sync {
//!     fn now(&self) -> u64;
//! }
//!
//! #[derive(Injectable)]
//! pub struct SystemClock {}
//!
//! impl Clock for SystemClock {
//!     fn now(&self) -> u64 {
//!         42
//!     }
//! }
//!
//! struct Tick;
//!
//! impl SignalType for Tick {
//!     type Args = (u64,);
//! }
//!
//! fn main() -> Result<()> {
//!     let mut builder = ContainerBuilder::new();
//!     builder.implement::<SystemClock, dyn Clock, _>(|c| c as Arc<dyn Clock>);
//!     builder.bind::<dyn Clock>().to::<SystemClock>().from_new().as_singleton();
//!     builder.declare_signal::<Tick>();
//!
//!     let container = builder.build()?;
//!     let clock = container.resolve::<dyn Clock>()?;
//!
//!     let tick = container.resolve::<Signal<Tick>>()?;
//!     tick.listen(&Listener::new(|(now,): &(u64,)| println!("tick {}", now)))?;
//!     tick.fire((clock.now(),))?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod di;
pub mod error;
mod lifecycle;
pub mod module;
pub mod signals;

// Re-export core types
pub use config::ContainerSettings;
pub use di::{
    Container, ContainerBuilder, ContractId, Identifier, InjectContext, Injectable, Lazy, Scope,
};
pub use error::{BindwireError, Result};
pub use module::Module;
pub use signals::{Listener, Signal, SignalType};

// Re-export macros
pub use bindwire_macro::Injectable as DeriveInjectable;

/// Prelude module for convenient imports
///
/// ```
/// use bindwire::prelude::*;
/// ```
pub mod prelude {
    pub use crate::DeriveInjectable as Injectable;
    pub use crate::config::ContainerSettings;
    pub use crate::di::hierarchy::{Component, HierarchyQuery, LookupOptions, NodeId, Traversal};
    pub use crate::di::{
        Container, ContainerBuilder, Factory, Identifier, InjectContext, Injectable, Lazy,
        Provider, Scope,
    };
    pub use crate::error::{BindwireError, Result};
    pub use crate::module::Module;
    pub use crate::signals::{Listener, Signal, SignalSettings, SignalType};
    pub use std::sync::Arc;
}
