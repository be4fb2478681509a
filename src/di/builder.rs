use crate::config::ContainerSettings;
use crate::di::binding::DeclaredBinding;
use crate::di::{Container, ContractId, FromBinder, ScopeBinder, TypeRegistry};
use crate::error::Result;
use crate::module::Module;
use crate::signals::RegisteredHandler;
use std::sync::Arc;

/// Builder for constructing a dependency injection container
///
/// Declare bindings and type relationships here, then [`build`](Self::build)
/// to validate them and get the immutable [`Container`].
///
/// # Example
/// ```rust,ignore
/// let mut builder = ContainerBuilder::new();
/// builder.implement::<PostgresDatabase, dyn Database, _>(|db| db as Arc<dyn Database>);
/// builder
///     .bind::<dyn Database>()
///     .to::<PostgresDatabase>()
///     .from_new()
///     .as_singleton();
/// let container = builder.build()?;
/// ```
pub struct ContainerBuilder {
    registry: TypeRegistry,
    settings: ContainerSettings,
    declared: Vec<DeclaredBinding>,
    pub(crate) signal_handlers: Vec<RegisteredHandler>,
    parent: Option<Container>,
}

impl ContainerBuilder {
    /// Create a new container builder
    pub fn new() -> Self {
        Self {
            registry: TypeRegistry::new(),
            settings: ContainerSettings::default(),
            declared: Vec::new(),
            signal_handlers: Vec::new(),
            parent: None,
        }
    }

    /// Child builders start from the parent's type relationships and settings.
    pub(crate) fn child_of(parent: Container) -> Self {
        Self {
            registry: parent.registry().clone(),
            settings: parent.settings().clone(),
            declared: Vec::new(),
            signal_handlers: Vec::new(),
            parent: Some(parent),
        }
    }

    pub fn with_settings(mut self, settings: ContainerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &ContainerSettings {
        &self.settings
    }

    pub fn registry_mut(&mut self) -> &mut TypeRegistry {
        &mut self.registry
    }

    /// Record that `Impl` satisfies the contract `Trait`.
    ///
    /// Bindings whose produced type differs from their contract need such an
    /// entry; the caster performs the coercion.
    pub fn implement<Impl, Trait, F>(&mut self, caster: F) -> &mut Self
    where
        Impl: ?Sized + Send + Sync + 'static,
        Trait: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<Impl>) -> Arc<Trait> + Send + Sync + 'static,
    {
        self.registry.implement::<Impl, Trait, F>(caster);
        self
    }

    pub fn register_component<T: ?Sized + 'static>(&mut self) -> &mut Self {
        self.registry.register_component::<T>();
        self
    }

    pub fn declare_interface<T: ?Sized + 'static>(&mut self) -> &mut Self {
        self.registry.declare_interface::<T>();
        self
    }

    /// Begin a binding for contract `C`. It becomes active on `build`.
    pub fn bind<C>(&mut self) -> FromBinder<'_, C>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let index = self.push_declared(DeclaredBinding::new(ContractId::of::<C>()));
        FromBinder::new(self, index)
    }

    /// Register a service instance under its own type
    pub fn register<T: Send + Sync + 'static>(&mut self, instance: T) -> ScopeBinder<'_, T> {
        self.bind::<T>().from_instance(Arc::new(instance))
    }

    /// Run a module's bindings against this builder.
    pub fn install<M: Module + ?Sized>(&mut self, module: &M) -> Result<&mut Self> {
        tracing::debug!("Installing module: {}", module.name());
        module.install(self)?;
        Ok(self)
    }

    pub(crate) fn push_declared(&mut self, declared: DeclaredBinding) -> usize {
        self.declared.push(declared);
        self.declared.len() - 1
    }

    pub(crate) fn declared_mut(&mut self, index: usize) -> &mut DeclaredBinding {
        &mut self.declared[index]
    }

    /// Build the container
    ///
    /// Finalizes every declared binding and, unless disabled in the
    /// settings, instantiates the non-lazy ones.
    ///
    /// # Errors
    /// `BindingType` for the first invalid declaration, or any error raised
    /// while producing a non-lazy binding.
    pub fn build(mut self) -> Result<Container> {
        if !self.signal_handlers.is_empty() {
            let handlers = std::mem::take(&mut self.signal_handlers);
            crate::signals::bind_manager(&mut self, handlers);
        }

        let mut bindings = Vec::with_capacity(self.declared.len());
        for declared in self.declared {
            let record = declared
                .finalize(&self.registry, &self.settings)
                .inspect_err(|e| tracing::error!("Binding finalization failed: {}", e))?;
            bindings.push(record);
        }

        let count = bindings.len();
        let resolve_non_lazy = self.settings.resolve_non_lazy_on_build;
        let container = Container::from_parts(bindings, self.registry, self.settings, self.parent);
        tracing::debug!("Container built ({} bindings)", count);

        if resolve_non_lazy {
            container.resolve_non_lazy()?;
        }
        Ok(container)
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
