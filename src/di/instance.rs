use std::any::{Any, TypeId};
use std::fmt;
use std::sync::{Arc, Weak};

trait Liveness: Send + Sync {
    fn is_alive(&self) -> bool;
}

impl<P: ?Sized + Send + Sync + 'static> Liveness for Weak<P> {
    fn is_alive(&self) -> bool {
        self.strong_count() > 0
    }
}

/// Type-erased handle to one produced object.
///
/// Wraps an `Arc<P>` for any `P: ?Sized`, so trait objects and concrete types
/// travel through the container the same way. Cloning shares the object.
#[derive(Clone)]
pub struct Instance {
    value: Arc<dyn Any + Send + Sync>,
    type_id: TypeId,
    type_name: &'static str,
    addr: usize,
    weak: Arc<dyn Liveness>,
}

impl Instance {
    pub fn new<P>(value: Arc<P>) -> Self
    where
        P: ?Sized + Send + Sync + 'static,
    {
        let addr = Arc::as_ptr(&value) as *const () as usize;
        let weak: Arc<dyn Liveness> = Arc::new(Arc::downgrade(&value));
        Self {
            weak,
            value: Arc::new(value),
            type_id: TypeId::of::<P>(),
            type_name: std::any::type_name::<P>(),
            addr,
        }
    }

    /// `TypeId` of the `P` in the wrapped `Arc<P>`.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Address of the shared object; equal addresses mean the same object.
    pub fn addr(&self) -> usize {
        self.addr
    }

    pub fn is<P: ?Sized + 'static>(&self) -> bool {
        self.type_id == TypeId::of::<P>()
    }

    /// Recover the `Arc<P>` this instance was created from.
    pub fn downcast<P>(&self) -> Option<Arc<P>>
    where
        P: ?Sized + Send + Sync + 'static,
    {
        self.value.downcast_ref::<Arc<P>>().cloned()
    }

    pub fn same_object(&self, other: &Instance) -> bool {
        self.addr == other.addr
    }

    /// Handle that tracks the object without keeping it alive.
    pub fn downgrade(&self) -> WeakInstance {
        WeakInstance {
            target: Arc::clone(&self.weak),
            addr: self.addr,
        }
    }
}

/// Non-owning counterpart of [`Instance`].
///
/// While a `WeakInstance` exists the object's allocation is kept, so its
/// address cannot be handed to another object.
#[derive(Clone)]
pub struct WeakInstance {
    target: Arc<dyn Liveness>,
    addr: usize,
}

impl WeakInstance {
    pub fn is_alive(&self) -> bool {
        self.target.is_alive()
    }

    pub fn addr(&self) -> usize {
        self.addr
    }
}

impl fmt::Debug for WeakInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakInstance")
            .field("addr", &format_args!("{:#x}", self.addr))
            .field("alive", &self.is_alive())
            .finish()
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type", &self.type_name)
            .field("addr", &format_args!("{:#x}", self.addr))
            .finish()
    }
}
