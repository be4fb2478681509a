use crate::di::hierarchy::NodeId;
use crate::di::{Container, ContractId, Identifier, Instance, Lazy, Resolved};
use crate::error::Result;
use std::marker::PhantomData;
use std::sync::Arc;

/// What is being asked for in a single resolve call.
#[derive(Clone)]
pub(crate) struct Lookup {
    pub(crate) contract: ContractId,
    pub(crate) identifier: Option<Identifier>,
    pub(crate) requester: Option<Instance>,
    pub(crate) node: Option<NodeId>,
    pub(crate) member: Option<&'static str>,
    pub(crate) arguments: Vec<Instance>,
    pub(crate) optional: bool,
}

impl Lookup {
    pub(crate) fn new(contract: ContractId) -> Self {
        Self {
            contract,
            identifier: None,
            requester: None,
            node: None,
            member: None,
            arguments: Vec::new(),
            optional: false,
        }
    }

    pub(crate) fn with_identifier(mut self, identifier: Option<Identifier>) -> Self {
        self.identifier = identifier;
        self
    }

    pub(crate) fn matches(&self, other: &InjectContext<'_>) -> bool {
        self.contract == other.contract && self.identifier == other.identifier
    }

    pub(crate) fn describe(&self) -> String {
        match &self.identifier {
            Some(id) => format!("{} ({})", self.contract, id),
            None => self.contract.to_string(),
        }
    }
}

/// Resolution context handed to strategies, conditions and `Injectable` impls.
///
/// Lives only for one resolve call. Contexts link to the context that
/// requested them, which forms the chain used for cycle detection, so nested
/// dependencies must be resolved through the context rather than through the
/// container directly.
pub struct InjectContext<'a> {
    container: &'a Container,
    parent: Option<&'a InjectContext<'a>>,
    contract: ContractId,
    identifier: Option<Identifier>,
    requester: Option<Instance>,
    node: Option<NodeId>,
    member: Option<&'static str>,
    arguments: Vec<Instance>,
    optional: bool,
}

impl<'a> InjectContext<'a> {
    pub(crate) fn new(
        container: &'a Container,
        parent: Option<&'a InjectContext<'a>>,
        lookup: Lookup,
    ) -> Self {
        Self {
            container,
            parent,
            contract: lookup.contract,
            identifier: lookup.identifier,
            requester: lookup.requester,
            node: lookup.node,
            member: lookup.member,
            arguments: lookup.arguments,
            optional: lookup.optional,
        }
    }

    /// Same request, with the binding's own arguments appended.
    pub(crate) fn with_arguments(&self, extra: &[Instance]) -> InjectContext<'a> {
        let mut arguments = self.arguments.clone();
        arguments.extend(extra.iter().cloned());
        InjectContext {
            container: self.container,
            parent: self.parent,
            contract: self.contract,
            identifier: self.identifier.clone(),
            requester: self.requester.clone(),
            node: self.node,
            member: self.member,
            arguments,
            optional: self.optional,
        }
    }

    /// The container that owns the binding being resolved.
    pub fn container(&self) -> &'a Container {
        self.container
    }

    pub fn parent(&self) -> Option<&'a InjectContext<'a>> {
        self.parent
    }

    pub fn contract(&self) -> ContractId {
        self.contract
    }

    pub fn identifier(&self) -> Option<&Identifier> {
        self.identifier.as_ref()
    }

    /// The object on whose behalf the resolve happens, if any.
    pub fn requester(&self) -> Option<&Instance> {
        self.requester.as_ref()
    }

    /// Host node of the requesting object, used by hierarchy lookups.
    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    /// Name of the field or parameter being injected.
    pub fn member(&self) -> Option<&'static str> {
        self.member
    }

    pub fn arguments(&self) -> &[Instance] {
        &self.arguments
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// First extra argument whose type is exactly `T`.
    pub fn arg<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.arguments.iter().find_map(Instance::downcast::<T>)
    }

    /// Contracts being resolved, outermost first, ending with this one.
    pub fn chain(&self) -> Vec<String> {
        let mut chain = Vec::new();
        let mut current = Some(self);
        while let Some(ctx) = current {
            chain.push(ctx.describe());
            current = ctx.parent;
        }
        chain.reverse();
        chain
    }

    pub(crate) fn describe(&self) -> String {
        match &self.identifier {
            Some(id) => format!("{} ({})", self.contract, id),
            None => self.contract.to_string(),
        }
    }

    pub fn request<C>(&self) -> Request<'_, C>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        Request::new(self.container, Some(self))
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

    pub fn lazy<C>(&self) -> Lazy<C>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.request::<C>().lazy()
    }
}

/// Builder for one resolve call.
///
/// ```rust,ignore
/// let clock = container
///     .request::<dyn Clock>()
///     .id("utc")
///     .member("clock")
///     .get()?;
/// ```
pub struct Request<'c, C: ?Sized> {
    container: &'c Container,
    parent: Option<&'c InjectContext<'c>>,
    lookup: Lookup,
    _marker: PhantomData<fn() -> Arc<C>>,
}

impl<'c, C> Request<'c, C>
where
    C: ?Sized + Send + Sync + 'static,
{
    pub(crate) fn new(container: &'c Container, parent: Option<&'c InjectContext<'c>>) -> Self {
        Self {
            container,
            parent,
            lookup: Lookup::new(ContractId::of::<C>()),
            _marker: PhantomData,
        }
    }

    pub fn id(mut self, identifier: impl Into<Identifier>) -> Self {
        self.lookup.identifier = Some(identifier.into());
        self
    }

    pub fn maybe_id(mut self, identifier: Option<Identifier>) -> Self {
        self.lookup.identifier = identifier;
        self
    }

    pub fn requester(mut self, requester: Instance) -> Self {
        self.lookup.requester = Some(requester);
        self
    }

    pub fn node(mut self, node: NodeId) -> Self {
        self.lookup.node = Some(node);
        self
    }

    pub fn member(mut self, member: &'static str) -> Self {
        self.lookup.member = Some(member);
        self
    }

    pub fn with_argument<T>(mut self, argument: Arc<T>) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.lookup.arguments.push(Instance::new(argument));
        self
    }

    /// Extra arguments of the requesting context satisfy unnamed requests
    /// for their exact type before the container is consulted.
    fn from_arguments(&self) -> Option<Arc<C>> {
        if self.lookup.identifier.is_some() {
            return None;
        }
        self.parent?.arg::<C>()
    }

    /// Resolve exactly one instance.
    pub fn get(self) -> Result<Arc<C>> {
        if let Some(argument) = self.from_arguments() {
            return Ok(argument);
        }
        let instance = self
            .container
            .resolve_one(self.parent, self.lookup.clone())?
            .ok_or_else(|| self.container.missing(&self.lookup))?;
        self.container.downcast(&instance)
    }

    /// Resolve one instance, yielding `None` instead of a missing-binding
    /// error when nothing matches.
    pub fn try_get(mut self) -> Result<Option<Arc<C>>> {
        if let Some(argument) = self.from_arguments() {
            return Ok(Some(argument));
        }
        self.lookup.optional = true;
        match self.container.resolve_one(self.parent, self.lookup)? {
            Some(instance) => self.container.downcast(&instance).map(Some),
            None => Ok(None),
        }
    }

    /// Resolve every matching instance. Never fails for lack of bindings.
    pub fn all(self) -> Result<Resolved<C>> {
        let instances = self.container.resolve_many(self.parent, self.lookup)?;
        Ok(Resolved::new(instances))
    }

    /// Defer resolution until the handle is first used.
    pub fn lazy(self) -> Lazy<C> {
        Lazy::new(self.container.downgrade(), self.lookup.identifier)
    }
}
