//! Resolution strategies: the ways a binding can produce its instances.

use crate::di::{ContractId, Identifier, InjectContext, Injectable, Instance, TypeRegistry};
use crate::error::{BindwireError, Result};
use std::marker::PhantomData;
use std::sync::Arc;

/// Output of a strategy: one instance, or a possibly lazy sequence.
pub enum Provided {
    One(Instance),
    Many(Box<dyn Iterator<Item = Instance>>),
}

impl Provided {
    pub fn into_vec(self) -> Vec<Instance> {
        match self {
            Provided::One(instance) => vec![instance],
            Provided::Many(instances) => instances.collect(),
        }
    }
}

impl IntoIterator for Provided {
    type Item = Instance;
    type IntoIter = Box<dyn Iterator<Item = Instance>>;

    fn into_iter(self) -> Self::IntoIter {
        match self {
            Provided::One(instance) => Box::new(std::iter::once(instance)),
            Provided::Many(instances) => instances,
        }
    }
}

/// A pluggable way of producing instances for a binding.
///
/// Instances returned must wrap the binding's produced type. Caching is not
/// the strategy's concern; the container applies the binding's scope.
pub trait Provider: Send + Sync {
    /// Short human readable description used in binding descriptions.
    fn describe(&self) -> String;

    fn provide(&self, ctx: &InjectContext<'_>) -> Result<Provided>;

    /// Bind-time precondition check against the binding's types.
    fn validate(&self, _registry: &TypeRegistry, _types: &[ContractId]) -> Result<()> {
        Ok(())
    }
}

/// Something able to create `P` values, resolved through the container.
///
/// # Example
/// ```rust,ignore
/// struct SystemClockFactory;
///
/// impl Factory<dyn Clock> for SystemClockFactory {
///     fn create(&self, ctx: &InjectContext<'_>) -> Result<Arc<dyn Clock>> {
///         let offset = ctx.arg::<i64>().map(|o| *o).unwrap_or_default();
///         Ok(Arc::new(SystemClock::new(offset)))
///     }
/// }
/// ```
pub trait Factory<P: ?Sized>: Send + Sync + 'static {
    fn create(&self, ctx: &InjectContext<'_>) -> Result<Arc<P>>;
}

/// Constructs `P` through its `Injectable` impl.
pub(crate) struct NewStrategy<P> {
    _marker: PhantomData<fn() -> P>,
}

impl<P: Injectable> NewStrategy<P> {
    pub(crate) fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<P: Injectable> Provider for NewStrategy<P> {
    fn describe(&self) -> String {
        format!("new {}", std::any::type_name::<P>())
    }

    fn provide(&self, ctx: &InjectContext<'_>) -> Result<Provided> {
        let value = P::inject(ctx)?;
        Ok(Provided::One(Instance::new(Arc::new(value))))
    }
}

/// Resolves the factory `F` (or builds it when unbound) and asks it for `P`.
pub(crate) struct FactoryStrategy<P: ?Sized, F> {
    _marker: PhantomData<fn() -> (Arc<P>, F)>,
}

impl<P, F> FactoryStrategy<P, F>
where
    P: ?Sized + Send + Sync + 'static,
    F: Factory<P> + Injectable,
{
    pub(crate) fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<P, F> Provider for FactoryStrategy<P, F>
where
    P: ?Sized + Send + Sync + 'static,
    F: Factory<P> + Injectable,
{
    fn describe(&self) -> String {
        format!("factory {}", std::any::type_name::<F>())
    }

    fn provide(&self, ctx: &InjectContext<'_>) -> Result<Provided> {
        let factory = match ctx.try_resolve::<F>()? {
            Some(factory) => factory,
            None => Arc::new(F::inject(ctx)?),
        };
        let value = factory.create(ctx)?;
        Ok(Provided::One(Instance::new(value)))
    }
}

pub(crate) struct MethodStrategy<P: ?Sized, F> {
    method: F,
    _marker: PhantomData<fn() -> Arc<P>>,
}

impl<P, F> MethodStrategy<P, F>
where
    P: ?Sized + Send + Sync + 'static,
    F: Fn(&InjectContext<'_>) -> Result<Arc<P>> + Send + Sync + 'static,
{
    pub(crate) fn new(method: F) -> Self {
        Self {
            method,
            _marker: PhantomData,
        }
    }
}

impl<P, F> Provider for MethodStrategy<P, F>
where
    P: ?Sized + Send + Sync + 'static,
    F: Fn(&InjectContext<'_>) -> Result<Arc<P>> + Send + Sync + 'static,
{
    fn describe(&self) -> String {
        "method".to_string()
    }

    fn provide(&self, ctx: &InjectContext<'_>) -> Result<Provided> {
        let value = (self.method)(ctx)?;
        Ok(Provided::One(Instance::new(value)))
    }
}

/// Streams whatever the method yields; nothing is collected here.
pub(crate) struct MethodMultipleStrategy<P: ?Sized, F> {
    method: F,
    _marker: PhantomData<fn() -> Arc<P>>,
}

impl<P, F, I> MethodMultipleStrategy<P, F>
where
    P: ?Sized + Send + Sync + 'static,
    F: Fn(&InjectContext<'_>) -> Result<I> + Send + Sync + 'static,
    I: IntoIterator<Item = Arc<P>>,
    I::IntoIter: 'static,
{
    pub(crate) fn new(method: F) -> Self {
        Self {
            method,
            _marker: PhantomData,
        }
    }
}

impl<P, F, I> Provider for MethodMultipleStrategy<P, F>
where
    P: ?Sized + Send + Sync + 'static,
    F: Fn(&InjectContext<'_>) -> Result<I> + Send + Sync + 'static,
    I: IntoIterator<Item = Arc<P>>,
    I::IntoIter: 'static,
{
    fn describe(&self) -> String {
        "method (multiple)".to_string()
    }

    fn provide(&self, ctx: &InjectContext<'_>) -> Result<Provided> {
        let values = (self.method)(ctx)?;
        Ok(Provided::Many(Box::new(
            values.into_iter().map(Instance::new),
        )))
    }
}

/// Resolves an owner `O`, then projects the contract out of it.
pub(crate) struct GetterStrategy<O: ?Sized, P: ?Sized, F> {
    identifier: Option<Identifier>,
    getter: F,
    _marker: PhantomData<fn(&O) -> Arc<P>>,
}

impl<O, P, F> GetterStrategy<O, P, F>
where
    O: ?Sized + Send + Sync + 'static,
    P: ?Sized + Send + Sync + 'static,
    F: Fn(&O) -> Arc<P> + Send + Sync + 'static,
{
    pub(crate) fn new(identifier: Option<Identifier>, getter: F) -> Self {
        Self {
            identifier,
            getter,
            _marker: PhantomData,
        }
    }
}

impl<O, P, F> Provider for GetterStrategy<O, P, F>
where
    O: ?Sized + Send + Sync + 'static,
    P: ?Sized + Send + Sync + 'static,
    F: Fn(&O) -> Arc<P> + Send + Sync + 'static,
{
    fn describe(&self) -> String {
        format!("getter on {}", std::any::type_name::<O>())
    }

    fn provide(&self, ctx: &InjectContext<'_>) -> Result<Provided> {
        let owner = ctx
            .request::<O>()
            .maybe_id(self.identifier.clone())
            .get()
            .map_err(|err| match err {
                BindwireError::MissingBinding { .. } => BindwireError::Resolution {
                    contract: ctx.contract().to_string(),
                    identifier: ctx.identifier().map(ToString::to_string),
                    message: format!(
                        "owner {} could not be resolved: {}",
                        std::any::type_name::<O>(),
                        err
                    ),
                },
                other => other,
            })?;
        Ok(Provided::One(Instance::new((self.getter)(&owner))))
    }
}

/// Hands out one pre-built instance.
pub(crate) struct InstanceStrategy {
    instance: Instance,
}

impl InstanceStrategy {
    pub(crate) fn new<P>(instance: Arc<P>) -> Self
    where
        P: ?Sized + Send + Sync + 'static,
    {
        Self {
            instance: Instance::new(instance),
        }
    }
}

impl Provider for InstanceStrategy {
    fn describe(&self) -> String {
        format!("instance of {}", self.instance.type_name())
    }

    fn provide(&self, _ctx: &InjectContext<'_>) -> Result<Provided> {
        Ok(Provided::One(self.instance.clone()))
    }
}
