//! Disposal of container-owned instances.
//!
//! Every cached instance produced by a binding with an `on_dispose` hook is
//! recorded here. Each hook runs once, in reverse creation order, so instances
//! are torn down before the dependencies they were built from. Instances
//! recorded after a disposal are torn down by the next one.

use crate::di::Instance;
use std::sync::{Arc, Mutex, PoisonError};

type DisposeHook = Arc<dyn Fn(&Instance) + Send + Sync>;

struct Disposal {
    binding: String,
    instance: Instance,
    hook: DisposeHook,
}

pub(crate) struct DisposalRegistry {
    entries: Mutex<Vec<Disposal>>,
}

impl DisposalRegistry {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn register(&self, binding: String, instance: Instance, hook: DisposeHook) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Disposal {
                binding,
                instance,
                hook,
            });
    }

    pub(crate) fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Run and forget every recorded hook.
    pub(crate) fn dispose_all(&self) {
        let entries =
            std::mem::take(&mut *self.entries.lock().unwrap_or_else(PoisonError::into_inner));
        if entries.is_empty() {
            return;
        }

        tracing::info!("Disposing container instances...");
        let count = entries.len();
        // Execute in reverse order
        for entry in entries.into_iter().rev() {
            tracing::debug!("Disposing: {}", entry.binding);
            (entry.hook)(&entry.instance);
        }
        tracing::info!("Disposal complete ({} hooks executed)", count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispose_reverse_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let registry = DisposalRegistry::new();

        for i in 0..3u32 {
            let order = Arc::clone(&order);
            registry.register(
                format!("Service{}", i),
                Instance::new(Arc::new(i)),
                Arc::new(move |instance: &Instance| {
                    let value = instance.downcast::<u32>().unwrap();
                    order.lock().unwrap().push(*value);
                }),
            );
        }
        assert_eq!(registry.len(), 3);

        registry.dispose_all();
        registry.dispose_all();

        assert_eq!(*order.lock().unwrap(), vec![2, 1, 0]);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_entries_registered_after_dispose_run_next_time() {
        let calls = Arc::new(Mutex::new(0));
        let registry = DisposalRegistry::new();
        let hook: DisposeHook = {
            let calls = Arc::clone(&calls);
            Arc::new(move |_: &Instance| *calls.lock().unwrap() += 1)
        };

        registry.register("First".into(), Instance::new(Arc::new(1u8)), Arc::clone(&hook));
        registry.dispose_all();
        registry.register("Second".into(), Instance::new(Arc::new(2u8)), hook);
        assert_eq!(registry.len(), 1);

        registry.dispose_all();
        assert_eq!(*calls.lock().unwrap(), 2);
        assert_eq!(registry.len(), 0);
    }
}
