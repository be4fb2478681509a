//! Typed signals
//!
//! A [`Signal`] carries a fixed argument tuple to its listeners. Signals
//! declared on a [`ContainerBuilder`](crate::di::ContainerBuilder) are
//! container singletons and additionally reach the handlers bound with
//! `bind_signal`.

mod binder;
mod manager;
mod signal;
#[cfg(feature = "stream")]
pub mod stream;

pub use binder::{SignalDeclaration, SignalHandlerBinder};
pub use manager::{SignalHandler, SignalManager};
pub use signal::{Listener, Signal, SignalSettings};

pub(crate) use manager::RegisteredHandler;

use crate::di::{ContainerBuilder, ContractId, Identifier};
use std::fmt;
use std::sync::Arc;

/// Marker type naming a signal and its argument tuple.
pub trait SignalType: Send + Sync + 'static {
    type Args: Clone + Send + Sync + 'static;
}

/// Signal type plus optional identifier; handlers match on it exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalId {
    signal: ContractId,
    identifier: Option<Identifier>,
}

impl SignalId {
    pub fn of<S: SignalType>(identifier: Option<Identifier>) -> Self {
        Self {
            signal: ContractId::of::<S>(),
            identifier,
        }
    }

    pub fn signal(&self) -> ContractId {
        self.signal
    }

    pub fn identifier(&self) -> Option<&Identifier> {
        self.identifier.as_ref()
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.identifier {
            Some(id) => write!(f, "{} ({})", self.signal, id),
            None => write!(f, "{}", self.signal),
        }
    }
}

/// Bind the shared manager that carries every registered handler, chained
/// to the parent container's manager when there is one.
pub(crate) fn bind_manager(builder: &mut ContainerBuilder, handlers: Vec<RegisteredHandler>) {
    tracing::debug!("Binding signal manager ({} handlers)", handlers.len());
    builder
        .bind::<SignalManager>()
        .from_method(move |ctx| {
            let container = ctx.container();
            let parent = match container.parent() {
                Some(parent) => parent.try_resolve::<SignalManager>()?,
                None => None,
            };
            Ok(Arc::new(SignalManager::new(
                container.downgrade(),
                handlers.clone(),
                parent,
            )))
        })
        .as_singleton();
}
