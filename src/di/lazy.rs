use crate::di::{Identifier, WeakContainer};
use crate::error::{BindwireError, Result};
use std::sync::{Arc, OnceLock};

/// A wrapper for lazily resolved services, used to break construction cycles.
///
/// `Lazy<C>` holds a weak reference to the container and resolves `C` only
/// when first accessed; the result is kept for later calls. Holding a `Lazy`
/// inside a singleton does not keep the container alive.
///
/// Once resolved, the `Lazy` owns a strong `Arc<C>`. A resolved `Lazy` that
/// points back at the object holding it forms a reference cycle and neither
/// side is freed. Back-references should use [`Lazy::resolve`], which goes
/// through the container each time and keeps nothing.
pub struct Lazy<C: ?Sized + Send + Sync + 'static> {
    container: WeakContainer,
    identifier: Option<Identifier>,
    instance: OnceLock<Arc<C>>,
}

impl<C> Lazy<C>
where
    C: ?Sized + Send + Sync + 'static,
{
    pub(crate) fn new(container: WeakContainer, identifier: Option<Identifier>) -> Self {
        Self {
            container,
            identifier,
            instance: OnceLock::new(),
        }
    }

    /// Resolve on first use, then return the same instance.
    ///
    /// # Errors
    /// Fails with the underlying resolve error, or `ContainerDropped` when
    /// the container no longer exists.
    pub fn get(&self) -> Result<Arc<C>> {
        if let Some(instance) = self.instance.get() {
            return Ok(Arc::clone(instance));
        }
        let resolved = self.resolve()?;
        Ok(Arc::clone(self.instance.get_or_init(|| resolved)))
    }

    /// Resolve without keeping the result, so no strong reference is held.
    ///
    /// # Errors
    /// Same as [`Lazy::get`].
    pub fn resolve(&self) -> Result<Arc<C>> {
        if let Some(instance) = self.instance.get() {
            return Ok(Arc::clone(instance));
        }
        let container =
            self.container
                .upgrade()
                .ok_or_else(|| BindwireError::ContainerDropped {
                    type_name: std::any::type_name::<C>().to_string(),
                })?;
        container
            .request::<C>()
            .maybe_id(self.identifier.clone())
            .get()
    }

    /// Drop the memoized instance; the next `get` resolves again.
    pub fn forget(&mut self) -> Option<Arc<C>> {
        self.instance.take()
    }

    pub fn is_resolved(&self) -> bool {
        self.instance.get().is_some()
    }
}

impl<C> Clone for Lazy<C>
where
    C: ?Sized + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        let instance = OnceLock::new();
        if let Some(resolved) = self.instance.get() {
            let _ = instance.set(Arc::clone(resolved));
        }
        Self {
            container: self.container.clone(),
            identifier: self.identifier.clone(),
            instance,
        }
    }
}
