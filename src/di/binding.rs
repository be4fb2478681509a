use crate::config::ContainerSettings;
use crate::di::hierarchy::{HierarchyStrategy, LookupOptions, Traversal};
use crate::di::strategy::{
    Factory, FactoryStrategy, GetterStrategy, InstanceStrategy, MethodMultipleStrategy,
    MethodStrategy, NewStrategy, Provider,
};
use crate::di::{
    ContainerBuilder, ContractId, Identifier, InjectContext, Injectable, Instance, TypeRegistry,
};
use crate::error::{BindwireError, Result};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use strum_macros::{Display, EnumString};

/// Lifetime and caching policy of produced instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Scope {
    /// A new instance for every resolve.
    #[default]
    Transient,
    /// One instance per binding for the lifetime of the container.
    Singleton,
    /// One instance per binding and requesting object.
    PerContext,
}

pub(crate) type Condition = Arc<dyn Fn(&InjectContext<'_>) -> bool + Send + Sync>;
pub(crate) type DisposeFn = Arc<dyn Fn(&Instance) + Send + Sync>;

/// A finalized binding. Immutable and owned by its container.
pub struct BindingRecord {
    pub(crate) contracts: Vec<ContractId>,
    pub(crate) identifier: Option<Identifier>,
    pub(crate) concrete: ContractId,
    pub(crate) provider: Arc<dyn Provider>,
    pub(crate) scope: Scope,
    pub(crate) condition: Option<Condition>,
    pub(crate) arguments: Vec<Instance>,
    pub(crate) non_lazy: bool,
    pub(crate) on_dispose: Option<DisposeFn>,
}

impl BindingRecord {
    pub fn contracts(&self) -> &[ContractId] {
        &self.contracts
    }

    pub fn identifier(&self) -> Option<&Identifier> {
        self.identifier.as_ref()
    }

    pub fn concrete(&self) -> ContractId {
        self.concrete
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn is_conditional(&self) -> bool {
        self.condition.is_some()
    }

    pub fn is_non_lazy(&self) -> bool {
        self.non_lazy
    }
}

impl fmt::Display for BindingRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let contracts: Vec<&str> = self.contracts.iter().map(|c| c.name()).collect();
        write!(f, "Bind<{}>", contracts.join(", "))?;
        if let Some(id) = &self.identifier {
            write!(f, ".WithId({})", id)?;
        }
        write!(
            f,
            ".To<{}>() from {} as {}",
            self.concrete,
            self.provider.describe(),
            self.scope
        )?;
        if self.condition.is_some() {
            f.write_str(" when <condition>")?;
        }
        Ok(())
    }
}

impl fmt::Debug for BindingRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// A binding still being declared on a [`ContainerBuilder`].
pub(crate) struct DeclaredBinding {
    pub(crate) contracts: Vec<ContractId>,
    pub(crate) identifier: Option<Identifier>,
    pub(crate) concrete: ContractId,
    pub(crate) provider: Option<Arc<dyn Provider>>,
    pub(crate) scope: Option<Scope>,
    pub(crate) condition: Option<Condition>,
    pub(crate) arguments: Vec<Instance>,
    pub(crate) non_lazy: bool,
    pub(crate) on_dispose: Option<DisposeFn>,
}

impl DeclaredBinding {
    pub(crate) fn new(contract: ContractId) -> Self {
        Self {
            contracts: vec![contract],
            identifier: None,
            concrete: contract,
            provider: None,
            scope: None,
            condition: None,
            arguments: Vec::new(),
            non_lazy: false,
            on_dispose: None,
        }
    }

    fn describe(&self) -> String {
        let contracts: Vec<&str> = self.contracts.iter().map(|c| c.name()).collect();
        match &self.identifier {
            Some(id) => format!("Bind<{}>.WithId({})", contracts.join(", "), id),
            None => format!("Bind<{}>", contracts.join(", ")),
        }
    }

    /// Validate the declaration and freeze it into a record.
    pub(crate) fn finalize(
        self,
        registry: &TypeRegistry,
        settings: &ContainerSettings,
    ) -> Result<BindingRecord> {
        let provider = self.provider.clone().ok_or_else(|| {
            BindwireError::binding_type(
                self.describe(),
                "no resolution strategy was selected (call one of the from_* methods)",
            )
        })?;

        registry
            .assert_is_derived_from_types(self.concrete, &self.contracts)
            .map_err(|err| match err {
                BindwireError::BindingType { message, .. } => {
                    BindwireError::binding_type(self.describe(), message)
                }
                other => other,
            })?;

        let mut types = self.contracts.clone();
        if !types.contains(&self.concrete) {
            types.push(self.concrete);
        }
        provider.validate(registry, &types)?;

        Ok(BindingRecord {
            contracts: self.contracts,
            identifier: self.identifier,
            concrete: self.concrete,
            provider,
            scope: self.scope.unwrap_or(settings.default_scope),
            condition: self.condition,
            arguments: self.arguments,
            non_lazy: self.non_lazy,
            on_dispose: self.on_dispose,
        })
    }
}

/// Selects the contracts, identifier, produced type and strategy of a binding.
///
/// `P` is the type the strategy produces; it starts out as the bound contract
/// and can be changed with [`to`](Self::to).
pub struct FromBinder<'b, P: ?Sized> {
    builder: &'b mut ContainerBuilder,
    index: usize,
    _marker: PhantomData<fn() -> Arc<P>>,
}

impl<'b, P> FromBinder<'b, P>
where
    P: ?Sized + Send + Sync + 'static,
{
    pub(crate) fn new(builder: &'b mut ContainerBuilder, index: usize) -> Self {
        Self {
            builder,
            index,
            _marker: PhantomData,
        }
    }

    fn declared(&mut self) -> &mut DeclaredBinding {
        self.builder.declared_mut(self.index)
    }

    /// Add another contract satisfied by this binding.
    pub fn also<D: ?Sized + 'static>(mut self) -> Self {
        let contract = ContractId::of::<D>();
        let declared = self.declared();
        if !declared.contracts.contains(&contract) {
            declared.contracts.push(contract);
        }
        self
    }

    pub fn with_id(mut self, identifier: impl Into<Identifier>) -> Self {
        self.declared().identifier = Some(identifier.into());
        self
    }

    /// Produce `Q` instead, which must implement every bound contract.
    pub fn to<Q>(mut self) -> FromBinder<'b, Q>
    where
        Q: ?Sized + Send + Sync + 'static,
    {
        self.declared().concrete = ContractId::of::<Q>();
        FromBinder::new(self.builder, self.index)
    }

    /// Use a custom strategy.
    pub fn from_provider(mut self, provider: impl Provider + 'static) -> ScopeBinder<'b, P> {
        self.declared().provider = Some(Arc::new(provider));
        ScopeBinder::new(self.builder, self.index)
    }

    /// Construct `P` through its `Injectable` impl.
    pub fn from_new(self) -> ScopeBinder<'b, P>
    where
        P: Injectable,
    {
        self.from_provider(NewStrategy::<P>::new())
    }

    /// Resolve factory `F` (constructing it when unbound) and let it create `P`.
    pub fn from_factory<F>(self) -> ScopeBinder<'b, P>
    where
        F: Factory<P> + Injectable,
    {
        self.from_provider(FactoryStrategy::<P, F>::new())
    }

    pub fn from_method<F>(self, method: F) -> ScopeBinder<'b, P>
    where
        F: Fn(&InjectContext<'_>) -> Result<Arc<P>> + Send + Sync + 'static,
    {
        self.from_provider(MethodStrategy::new(method))
    }

    pub fn from_method_multiple<F, I>(self, method: F) -> ScopeBinder<'b, P>
    where
        F: Fn(&InjectContext<'_>) -> Result<I> + Send + Sync + 'static,
        I: IntoIterator<Item = Arc<P>>,
        I::IntoIter: 'static,
    {
        self.from_provider(MethodMultipleStrategy::new(method))
    }

    /// Resolve `O` and project `P` out of it.
    pub fn from_resolve_getter<O, F>(self, getter: F) -> ScopeBinder<'b, P>
    where
        O: ?Sized + Send + Sync + 'static,
        F: Fn(&O) -> Arc<P> + Send + Sync + 'static,
    {
        self.from_provider(GetterStrategy::new(None, getter))
    }

    pub fn from_resolve_getter_id<O, F>(
        self,
        identifier: impl Into<Identifier>,
        getter: F,
    ) -> ScopeBinder<'b, P>
    where
        O: ?Sized + Send + Sync + 'static,
        F: Fn(&O) -> Arc<P> + Send + Sync + 'static,
    {
        self.from_provider(GetterStrategy::new(Some(identifier.into()), getter))
    }

    pub fn from_instance(self, instance: Arc<P>) -> ScopeBinder<'b, P> {
        self.from_provider(InstanceStrategy::new(instance))
    }

    pub fn from_hierarchy(
        self,
        traversal: Traversal,
        options: LookupOptions<P>,
    ) -> ScopeBinder<'b, P> {
        self.from_provider(HierarchyStrategy::new(traversal, options))
    }

    pub fn from_component_in_children(self, options: LookupOptions<P>) -> ScopeBinder<'b, P> {
        self.from_hierarchy(Traversal::Children, options)
    }

    pub fn from_component_in_parents(self, exclude_self: bool) -> ScopeBinder<'b, P> {
        self.from_hierarchy(
            Traversal::Parents,
            LookupOptions::new().exclude_self(exclude_self),
        )
    }

    pub fn from_component_sibling(self) -> ScopeBinder<'b, P> {
        self.from_hierarchy(Traversal::Siblings, LookupOptions::new())
    }

    pub fn from_component_in_hierarchy(self, options: LookupOptions<P>) -> ScopeBinder<'b, P> {
        self.from_hierarchy(Traversal::WholeHierarchy, options)
    }
}

/// Scope, arguments, condition and lifecycle options of a binding.
pub struct ScopeBinder<'b, P: ?Sized> {
    builder: &'b mut ContainerBuilder,
    index: usize,
    _marker: PhantomData<fn() -> Arc<P>>,
}

impl<'b, P> ScopeBinder<'b, P>
where
    P: ?Sized + Send + Sync + 'static,
{
    fn new(builder: &'b mut ContainerBuilder, index: usize) -> Self {
        Self {
            builder,
            index,
            _marker: PhantomData,
        }
    }

    fn declared(&mut self) -> &mut DeclaredBinding {
        self.builder.declared_mut(self.index)
    }

    pub fn as_transient(mut self) -> Self {
        self.declared().scope = Some(Scope::Transient);
        self
    }

    pub fn as_singleton(mut self) -> Self {
        self.declared().scope = Some(Scope::Singleton);
        self
    }

    pub fn as_per_context(mut self) -> Self {
        self.declared().scope = Some(Scope::PerContext);
        self
    }

    pub fn in_scope(mut self, scope: Scope) -> Self {
        self.declared().scope = Some(scope);
        self
    }

    /// Extra argument handed to the strategy through the context.
    pub fn with_argument<T>(mut self, argument: Arc<T>) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.declared().arguments.push(Instance::new(argument));
        self
    }

    /// Only match requests whose context satisfies `condition`.
    pub fn when<F>(mut self, condition: F) -> Self
    where
        F: Fn(&InjectContext<'_>) -> bool + Send + Sync + 'static,
    {
        self.declared().condition = Some(Arc::new(condition));
        self
    }

    /// Instantiate when the container is built, even if nothing asks for it.
    pub fn non_lazy(mut self) -> Self {
        self.declared().non_lazy = true;
        self
    }

    /// Hook run for every cached instance when the container is disposed.
    pub fn on_dispose<F>(mut self, hook: F) -> Self
    where
        F: Fn(&P) + Send + Sync + 'static,
    {
        let hook: DisposeFn = Arc::new(move |instance: &Instance| {
            if let Some(value) = instance.downcast::<P>() {
                hook(&value);
            }
        });
        self.declared().on_dispose = Some(hook);
        self
    }
}
