use crate::di::{Instance, InjectContext};
use crate::error::Result;
use std::marker::PhantomData;
use std::sync::Arc;

/// Trait for types that can be constructed with dependencies from the container
///
/// This trait is typically implemented automatically via the `#[derive(Injectable)]` macro.
///
/// # Example
/// ```rust,ignore
/// use bindwire::Injectable;
/// use std::sync::Arc;
///
/// trait UserRepository: Send + Sync {}
///
/// #[derive(Injectable)]
/// pub struct UserService {
///     // Resolved from the container
///     repository: Arc<dyn UserRepository>,
///     #[inject(id = "audit")]
///     audit_log: Option<Arc<dyn AuditLog>>,
/// }
/// ```
pub trait Injectable: Sized + Send + Sync + 'static {
    /// Create an instance by resolving dependencies through the context
    ///
    /// # Errors
    /// Returns an error if any required dependency cannot be resolved.
    fn inject(ctx: &InjectContext<'_>) -> Result<Self>;
}

/// Lazy iterator over the results of `resolve_all`.
pub struct Resolved<C: ?Sized> {
    instances: Box<dyn Iterator<Item = Instance>>,
    _marker: PhantomData<fn() -> Arc<C>>,
}

impl<C> Resolved<C>
where
    C: ?Sized + Send + Sync + 'static,
{
    pub(crate) fn new(instances: Box<dyn Iterator<Item = Instance>>) -> Self {
        Self {
            instances,
            _marker: PhantomData,
        }
    }
}

impl<C> Iterator for Resolved<C>
where
    C: ?Sized + Send + Sync + 'static,
{
    type Item = Arc<C>;

    fn next(&mut self) -> Option<Arc<C>> {
        for instance in self.instances.by_ref() {
            match instance.downcast::<C>() {
                Some(value) => return Some(value),
                None => tracing::error!(
                    "Skipping {} while resolving {}",
                    instance.type_name(),
                    std::any::type_name::<C>()
                ),
            }
        }
        None
    }
}
