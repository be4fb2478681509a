use crate::di::{Container, WeakContainer};
use crate::error::{BindwireError, Result};
use crate::signals::{SignalId, SignalType};
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Cross-cutting reaction to a fired signal, registered on the builder.
pub trait SignalHandler: Send + Sync {
    fn describe(&self) -> String;

    fn handle(&self, container: &Container, args: &(dyn Any + Send + Sync)) -> Result<()>;
}

#[derive(Clone)]
pub(crate) struct RegisteredHandler {
    pub(crate) signal: SignalId,
    pub(crate) handler: Arc<dyn SignalHandler>,
}

/// Dispatches fired signals to the handlers bound for them.
///
/// Holds the container weakly; handlers resolve their targets from it. A
/// manager built in a child container forwards every trigger to the manager
/// of the nearest ancestor, after its own handlers.
pub struct SignalManager {
    container: WeakContainer,
    handlers: Vec<RegisteredHandler>,
    parent: Option<Arc<SignalManager>>,
}

impl SignalManager {
    pub(crate) fn new(
        container: WeakContainer,
        handlers: Vec<RegisteredHandler>,
        parent: Option<Arc<SignalManager>>,
    ) -> Self {
        Self {
            container,
            handlers,
            parent,
        }
    }

    pub fn parent(&self) -> Option<&Arc<SignalManager>> {
        self.parent.as_ref()
    }

    /// Handlers for `signal` here and in every ancestor manager.
    pub fn handler_count(&self, signal: &SignalId) -> usize {
        let own = self.handlers.iter().filter(|h| &h.signal == signal).count();
        own + self.parent.as_ref().map_or(0, |p| p.handler_count(signal))
    }

    /// Run every handler bound to `signal`, own handlers first, then the
    /// ancestors'. Returns whether any exist.
    pub fn trigger(&self, signal: &SignalId, args: &(dyn Any + Send + Sync)) -> Result<bool> {
        let handled = self.trigger_own(signal, args)?;
        match &self.parent {
            Some(parent) => Ok(parent.trigger(signal, args)? || handled),
            None => Ok(handled),
        }
    }

    fn trigger_own(&self, signal: &SignalId, args: &(dyn Any + Send + Sync)) -> Result<bool> {
        let mut matching = self.handlers.iter().filter(|h| &h.signal == signal).peekable();
        if matching.peek().is_none() {
            return Ok(false);
        }

        let container = self
            .container
            .upgrade()
            .ok_or_else(|| BindwireError::ContainerDropped {
                type_name: signal.to_string(),
            })?;

        for registered in matching {
            let _span = tracing::trace_span!(
                "signal_handler",
                signal = %signal,
                handler = %registered.handler.describe()
            )
            .entered();
            registered
                .handler
                .handle(&container, args)
                .inspect_err(|e| tracing::error!("Handler for '{}' failed: {}", signal, e))?;
        }
        Ok(true)
    }
}

impl fmt::Debug for SignalManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalManager")
            .field("handlers", &self.handlers.len())
            .field("chained", &self.parent.is_some())
            .finish()
    }
}

fn downcast_args<S: SignalType>(args: &(dyn Any + Send + Sync)) -> Result<&S::Args> {
    args.downcast_ref::<S::Args>()
        .ok_or_else(|| BindwireError::DowncastFailed {
            type_name: std::any::type_name::<S::Args>().to_string(),
        })
}

/// Calls a plain function with the signal arguments.
pub(crate) struct MethodHandler<S, F> {
    method: F,
    _marker: PhantomData<fn(S)>,
}

impl<S, F> MethodHandler<S, F> {
    pub(crate) fn new(method: F) -> Self {
        Self {
            method,
            _marker: PhantomData,
        }
    }
}

impl<S, F> SignalHandler for MethodHandler<S, F>
where
    S: SignalType,
    F: Fn(&S::Args) + Send + Sync + 'static,
{
    fn describe(&self) -> String {
        "method".to_string()
    }

    fn handle(&self, _container: &Container, args: &(dyn Any + Send + Sync)) -> Result<()> {
        (self.method)(downcast_args::<S>(args)?);
        Ok(())
    }
}

/// Resolves every `H` from the container at fire time and calls the method on each.
pub(crate) struct ResolvedHandler<S, H: ?Sized, F> {
    method: F,
    _marker: PhantomData<(fn(S), fn() -> Arc<H>)>,
}

impl<S, H: ?Sized, F> ResolvedHandler<S, H, F> {
    pub(crate) fn new(method: F) -> Self {
        Self {
            method,
            _marker: PhantomData,
        }
    }
}

impl<S, H, F> SignalHandler for ResolvedHandler<S, H, F>
where
    S: SignalType,
    H: ?Sized + Send + Sync + 'static,
    F: Fn(&H, &S::Args) + Send + Sync + 'static,
{
    fn describe(&self) -> String {
        format!("resolved {}", std::any::type_name::<H>())
    }

    fn handle(&self, container: &Container, args: &(dyn Any + Send + Sync)) -> Result<()> {
        let args = downcast_args::<S>(args)?;
        for target in container.resolve_all::<H>()? {
            (self.method)(&*target, args);
        }
        Ok(())
    }
}
