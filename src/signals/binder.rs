use crate::di::strategy::MethodStrategy;
use crate::di::{ContainerBuilder, ContractId, DeclaredBinding, Identifier, InjectContext, Scope};
use crate::signals::manager::{MethodHandler, ResolvedHandler};
use crate::signals::{RegisteredHandler, Signal, SignalId, SignalManager, SignalSettings, SignalType};
use std::marker::PhantomData;
use std::sync::Arc;

impl ContainerBuilder {
    /// Declare signal `S` as a container singleton.
    ///
    /// # Example
    /// ```rust,ignore
    /// builder.declare_signal::<PlayerDied>().require_handler();
    /// builder
    ///     .bind_signal::<PlayerDied>()
    ///     .to_resolved::<Scoreboard, _>(|board, (player,)| board.record_death(player));
    /// let container = builder.build()?;
    /// container.resolve::<Signal<PlayerDied>>()?.fire(("ada".into(),))?;
    /// ```
    pub fn declare_signal<S: SignalType>(&mut self) -> SignalDeclaration<'_, S> {
        let index = self.push_declared(DeclaredBinding::new(ContractId::of::<Signal<S>>()));
        let mut declaration = SignalDeclaration {
            builder: self,
            index,
            identifier: None,
            requires_handler: None,
            _marker: PhantomData,
        };
        declaration.apply();
        declaration
    }

    /// Register a cross-cutting handler for signal `S`.
    ///
    /// Handlers bound in a child container run first, followed by those of
    /// its ancestors. A signal declared in a parent does not reach handlers
    /// bound only in a child.
    pub fn bind_signal<S: SignalType>(&mut self) -> SignalHandlerBinder<'_, S> {
        SignalHandlerBinder {
            builder: self,
            identifier: None,
            _marker: PhantomData,
        }
    }
}

pub struct SignalDeclaration<'b, S> {
    builder: &'b mut ContainerBuilder,
    index: usize,
    identifier: Option<Identifier>,
    requires_handler: Option<bool>,
    _marker: PhantomData<fn(S)>,
}

impl<S: SignalType> SignalDeclaration<'_, S> {
    pub fn with_id(mut self, identifier: impl Into<Identifier>) -> Self {
        self.identifier = Some(identifier.into());
        self.apply();
        self
    }

    /// Firing without listeners, handlers or stream observers is an error.
    pub fn require_handler(self) -> Self {
        self.requires_handler(true)
    }

    pub fn requires_handler(mut self, required: bool) -> Self {
        self.requires_handler = Some(required);
        self.apply();
        self
    }

    fn apply(&mut self) {
        let identifier = self.identifier.clone();
        let requires_handler = self.requires_handler;
        let declared = self.builder.declared_mut(self.index);
        declared.identifier = identifier.clone();
        declared.scope = Some(Scope::Singleton);
        declared.provider = Some(Arc::new(MethodStrategy::new(
            move |ctx: &InjectContext<'_>| {
                let defaults = ctx.container().settings();
                let settings = SignalSettings {
                    requires_handler: requires_handler
                        .unwrap_or(defaults.signals_require_handler),
                    stream_capacity: defaults.signal_stream_capacity,
                };
                let manager = ctx.try_resolve::<SignalManager>()?;
                Ok(Arc::new(Signal::<S>::with_manager(
                    settings,
                    identifier.clone(),
                    manager,
                )))
            },
        )));
    }
}

pub struct SignalHandlerBinder<'b, S> {
    builder: &'b mut ContainerBuilder,
    identifier: Option<Identifier>,
    _marker: PhantomData<fn(S)>,
}

impl<S: SignalType> SignalHandlerBinder<'_, S> {
    /// Only handle the signal declared with this identifier.
    pub fn with_id(mut self, identifier: impl Into<Identifier>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn to_method<F>(self, method: F)
    where
        F: Fn(&S::Args) + Send + Sync + 'static,
    {
        self.push(Arc::new(MethodHandler::<S, F>::new(method)));
    }

    /// Resolve every `H` when the signal fires and call `method` on each.
    pub fn to_resolved<H, F>(self, method: F)
    where
        H: ?Sized + Send + Sync + 'static,
        F: Fn(&H, &S::Args) + Send + Sync + 'static,
    {
        self.push(Arc::new(ResolvedHandler::<S, H, F>::new(method)));
    }

    fn push(self, handler: Arc<dyn crate::signals::SignalHandler>) {
        let signal = SignalId::of::<S>(self.identifier);
        tracing::debug!("Registering {} handler for signal '{}'", handler.describe(), signal);
        self.builder
            .signal_handlers
            .push(RegisteredHandler { signal, handler });
    }
}
