use crate::config::ContainerSettings;
use crate::di::binding::BindingRecord;
use crate::di::context::Lookup;
use crate::di::identifier::describe_id;
use crate::di::strategy::Provided;
use crate::di::{
    ContainerBuilder, ContractId, Identifier, InjectContext, Injectable, Instance, Request,
    Resolved, Scope, TypeRegistry, WeakInstance,
};
use crate::error::{BindwireError, Result};
use crate::lifecycle::DisposalRegistry;
use dashmap::DashMap;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// Cache slot of a scoped binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    binding: usize,
    requester: Option<usize>,
}

/// Cached instances of one slot. Per-context slots remember their requester
/// weakly and stop matching once it is gone.
struct CacheEntry {
    owner: Option<WeakInstance>,
    instances: Vec<Instance>,
}

impl CacheEntry {
    fn is_live(&self) -> bool {
        self.owner.as_ref().is_none_or(WeakInstance::is_alive)
    }
}

pub(crate) struct ContainerInner {
    bindings: Vec<BindingRecord>,
    by_contract: HashMap<TypeId, Vec<usize>>,
    registry: Arc<TypeRegistry>,
    settings: ContainerSettings,
    cache: DashMap<CacheKey, CacheEntry>,
    disposal: DisposalRegistry,
    parent: Option<Container>,
}

impl Drop for ContainerInner {
    fn drop(&mut self) {
        self.disposal.dispose_all();
    }
}

/// Finalized set of bindings plus the caches of their scoped instances.
///
/// Cloning is cheap and shares the same bindings and caches. Built with
/// [`ContainerBuilder`]:
///
/// ```rust,ignore
/// let mut builder = ContainerBuilder::new();
/// builder.implement::<SystemClock, dyn Clock, _>(|c| c as Arc<dyn Clock>);
/// builder
///     .bind::<dyn Clock>()
///     .to::<SystemClock>()
///     .from_factory::<SystemClockFactory>()
///     .as_singleton();
/// let container = builder.build()?;
/// let clock = container.resolve::<dyn Clock>()?;
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

/// Non-owning handle to a container, for objects the container itself owns.
#[derive(Clone)]
pub struct WeakContainer {
    inner: Weak<ContainerInner>,
}

impl WeakContainer {
    pub fn upgrade(&self) -> Option<Container> {
        self.inner.upgrade().map(|inner| Container { inner })
    }
}

impl Container {
    pub(crate) fn from_parts(
        bindings: Vec<BindingRecord>,
        registry: TypeRegistry,
        settings: ContainerSettings,
        parent: Option<Container>,
    ) -> Self {
        let mut by_contract: HashMap<TypeId, Vec<usize>> = HashMap::new();
        for (index, record) in bindings.iter().enumerate() {
            for contract in &record.contracts {
                by_contract
                    .entry(contract.type_id())
                    .or_default()
                    .push(index);
            }
        }
        Self {
            inner: Arc::new(ContainerInner {
                bindings,
                by_contract,
                registry: Arc::new(registry),
                settings,
                cache: DashMap::new(),
                disposal: DisposalRegistry::new(),
                parent,
            }),
        }
    }

    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    /// Start a child container. Lookups that find nothing locally fall back
    /// to this container.
    pub fn child(&self) -> ContainerBuilder {
        ContainerBuilder::child_of(self.clone())
    }

    pub fn parent(&self) -> Option<&Container> {
        self.inner.parent.as_ref()
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.inner.registry
    }

    pub fn settings(&self) -> &ContainerSettings {
        &self.inner.settings
    }

    pub fn downgrade(&self) -> WeakContainer {
        WeakContainer {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn bindings(&self) -> &[BindingRecord] {
        &self.inner.bindings
    }

    pub fn binding_count(&self) -> usize {
        self.inner.bindings.len()
    }

    /// Whether any binding of this container or its ancestors declares `C`.
    pub fn contains<C: ?Sized + 'static>(&self) -> bool {
        self.inner.by_contract.contains_key(&TypeId::of::<C>())
            || self.parent().is_some_and(Container::contains::<C>)
    }

    pub fn request<C>(&self) -> Request<'_, C>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        Request::new(self, None)
    }

    pub fn resolve<C>(&self) -> Result<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.request::<C>().get()
    }

    pub fn resolve_id<C>(&self, identifier: impl Into<Identifier>) -> Result<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.request::<C>().id(identifier).get()
    }

    /// Like [`resolve`](Self::resolve) but `Ok(None)` when nothing matches.
    pub fn try_resolve<C>(&self) -> Result<Option<Arc<C>>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.request::<C>().try_get()
    }

    pub fn resolve_all<C>(&self) -> Result<Resolved<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.request::<C>().all()
    }

    /// Build a `T` with its dependencies injected, without binding it.
    pub fn instantiate<T: Injectable>(&self) -> Result<T> {
        let ctx = InjectContext::new(self, None, Lookup::new(ContractId::of::<T>()));
        T::inject(&ctx)
    }

    /// Produce every binding marked non-lazy.
    pub fn resolve_non_lazy(&self) -> Result<()> {
        let mut count = 0;
        for (index, record) in self.inner.bindings.iter().enumerate() {
            if !record.non_lazy {
                continue;
            }
            tracing::debug!("Instantiating non-lazy binding: {}", record);
            let lookup = Lookup::new(record.contracts[0]).with_identifier(record.identifier.clone());
            let ctx = InjectContext::new(self, None, lookup);
            self.produce(index, &ctx)?.into_vec();
            count += 1;
        }
        tracing::debug!("Non-lazy resolution complete ({} bindings)", count);
        Ok(())
    }

    /// Run dispose hooks of cached instances in reverse creation order and
    /// drop the caches.
    ///
    /// The container stays usable: later resolves build fresh instances,
    /// whose hooks run on the next `dispose` or when the container is dropped.
    pub fn dispose(&self) {
        self.inner.disposal.dispose_all();
        self.inner.cache.clear();
    }

    pub(crate) fn missing(&self, lookup: &Lookup) -> BindwireError {
        BindwireError::MissingBinding {
            contract: lookup.contract.to_string(),
            identifier: describe_id(&lookup.identifier),
        }
    }

    pub(crate) fn downcast<C>(&self, instance: &Instance) -> Result<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        instance
            .downcast::<C>()
            .ok_or_else(|| BindwireError::DowncastFailed {
                type_name: format!("{} as {}", instance.type_name(), std::any::type_name::<C>()),
            })
    }

    fn check_cycle(parent: Option<&InjectContext<'_>>, lookup: &Lookup) -> Result<()> {
        let mut current = parent;
        while let Some(ctx) = current {
            if lookup.matches(ctx) {
                let mut chain = parent.map(InjectContext::chain).unwrap_or_default();
                chain.push(lookup.describe());
                tracing::error!("Circular dependency detected: {}", chain.join(" -> "));
                return Err(BindwireError::CyclicDependency { chain });
            }
            current = ctx.parent();
        }
        Ok(())
    }

    /// Bindings of this container matching the context's contract,
    /// identifier and condition.
    fn matching(&self, ctx: &InjectContext<'_>) -> Vec<usize> {
        let Some(indexes) = self.inner.by_contract.get(&ctx.contract().type_id()) else {
            return Vec::new();
        };
        indexes
            .iter()
            .copied()
            .filter(|&index| {
                let record = &self.inner.bindings[index];
                record.identifier.as_ref() == ctx.identifier()
                    && record.condition.as_ref().is_none_or(|condition| condition(ctx))
            })
            .collect()
    }

    /// Matches with a satisfied condition win over unconditioned ones.
    fn preferred(&self, matching: Vec<usize>) -> Vec<usize> {
        let conditioned: Vec<usize> = matching
            .iter()
            .copied()
            .filter(|&index| self.inner.bindings[index].condition.is_some())
            .collect();
        if conditioned.is_empty() {
            matching
        } else {
            conditioned
        }
    }

    fn cast(&self, instance: &Instance, contract: ContractId) -> Result<Instance> {
        self.inner
            .registry
            .cast_instance(instance, contract)
            .ok_or_else(|| BindwireError::DowncastFailed {
                type_name: format!("{} as {}", instance.type_name(), contract),
            })
    }

    pub(crate) fn resolve_one(
        &self,
        parent: Option<&InjectContext<'_>>,
        lookup: Lookup,
    ) -> Result<Option<Instance>> {
        let _span = tracing::trace_span!(
            "resolve",
            contract = %lookup.contract,
            id = ?lookup.identifier
        )
        .entered();
        Self::check_cycle(parent, &lookup)?;

        let mut current = Some(self);
        while let Some(container) = current {
            let ctx = InjectContext::new(container, parent, lookup.clone());
            let candidates = container.preferred(container.matching(&ctx));
            match candidates.as_slice() {
                [] => current = container.parent(),
                [index] => return container.produce_one(*index, &ctx, &lookup),
                _ => {
                    let candidates: Vec<String> = candidates
                        .iter()
                        .map(|&index| container.inner.bindings[index].to_string())
                        .collect();
                    tracing::error!(
                        "Ambiguous bindings for {}: {}",
                        lookup.describe(),
                        candidates.join(", ")
                    );
                    return Err(BindwireError::AmbiguousBinding {
                        contract: lookup.contract.to_string(),
                        identifier: describe_id(&lookup.identifier),
                        candidates,
                    });
                }
            }
        }

        if lookup.optional {
            return Ok(None);
        }
        tracing::error!("No binding found for {}", lookup.describe());
        Err(self.missing(&lookup))
    }

    fn produce_one(
        &self,
        index: usize,
        ctx: &InjectContext<'_>,
        lookup: &Lookup,
    ) -> Result<Option<Instance>> {
        let mut instances = self.produce(index, ctx)?.into_vec();
        match instances.len() {
            0 if lookup.optional => Ok(None),
            0 => Err(self.missing(lookup)),
            1 => {
                let instance = instances.remove(0);
                self.cast(&instance, lookup.contract).map(Some)
            }
            count => Err(BindwireError::Resolution {
                contract: lookup.contract.to_string(),
                identifier: describe_id(&lookup.identifier),
                message: format!(
                    "binding {} produced {} instances where exactly one was expected",
                    self.inner.bindings[index], count
                ),
            }),
        }
    }

    /// Everything matching in this container and its ancestors, local first.
    pub(crate) fn resolve_many(
        &self,
        parent: Option<&InjectContext<'_>>,
        lookup: Lookup,
    ) -> Result<Box<dyn Iterator<Item = Instance>>> {
        let _span = tracing::trace_span!(
            "resolve_all",
            contract = %lookup.contract,
            id = ?lookup.identifier
        )
        .entered();
        Self::check_cycle(parent, &lookup)?;

        let mut parts: Vec<Box<dyn Iterator<Item = Instance>>> = Vec::new();
        let mut current = Some(self);
        while let Some(container) = current {
            let ctx = InjectContext::new(container, parent, lookup.clone());
            for index in container.matching(&ctx) {
                let produced = container.produce(index, &ctx)?;
                let registry = Arc::clone(&container.inner.registry);
                let contract = lookup.contract;
                parts.push(Box::new(produced.into_iter().filter_map(move |instance| {
                    let cast = registry.cast_instance(&instance, contract);
                    if cast.is_none() {
                        tracing::error!(
                            "Dropping {} from resolve_all: not convertible to {}",
                            instance.type_name(),
                            contract
                        );
                    }
                    cast
                })));
            }
            current = container.parent();
        }
        Ok(Box::new(parts.into_iter().flatten()))
    }

    /// Run the binding's strategy, honouring its scope.
    fn produce(&self, index: usize, ctx: &InjectContext<'_>) -> Result<Provided> {
        let record = &self.inner.bindings[index];
        let ctx = ctx.with_arguments(&record.arguments);

        let (key, owner) = match record.scope {
            Scope::Transient => return record.provider.provide(&ctx),
            Scope::Singleton => (
                CacheKey {
                    binding: index,
                    requester: None,
                },
                None,
            ),
            Scope::PerContext => {
                let owner = ctx.requester().map(Instance::downgrade);
                let key = CacheKey {
                    binding: index,
                    requester: owner.as_ref().map(WeakInstance::addr),
                };
                (key, owner)
            }
        };

        let cached = self
            .inner
            .cache
            .get(&key)
            .filter(|entry| entry.is_live())
            .map(|entry| entry.instances.clone());
        if let Some(cached) = cached {
            return Ok(Provided::Many(Box::new(cached.into_iter())));
        }
        if owner.is_some() {
            self.evict_dead_requesters();
        }

        let instances = record.provider.provide(&ctx)?.into_vec();
        tracing::debug!(
            count = instances.len(),
            "Cached new instances for {}",
            record
        );
        if let Some(hook) = &record.on_dispose {
            for instance in &instances {
                self.inner
                    .disposal
                    .register(record.to_string(), instance.clone(), Arc::clone(hook));
            }
        }
        self.inner.cache.insert(
            key,
            CacheEntry {
                owner,
                instances: instances.clone(),
            },
        );
        Ok(Provided::Many(Box::new(instances.into_iter())))
    }

    /// Drop per-context slots whose requester no longer exists.
    fn evict_dead_requesters(&self) {
        let before = self.inner.cache.len();
        self.inner.cache.retain(|_, entry| entry.is_live());
        let evicted = before.saturating_sub(self.inner.cache.len());
        if evicted > 0 {
            tracing::trace!(evicted, "Evicted per-context slots of dropped requesters");
        }
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("bindings", &self.inner.bindings)
            .field("cached", &self.inner.cache.len())
            .field("disposables", &self.inner.disposal.len())
            .field("has_parent", &self.inner.parent.is_some())
            .finish()
    }
}
