use crate::di::{ContractId, Instance};
use crate::error::{BindwireError, Result};
use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Converts an instance holding `Arc<Impl>` into one holding `Arc<dyn Trait>`.
type CasterFn = Arc<dyn Fn(&Instance) -> Option<Instance> + Send + Sync>;

/// Explicit table of "implements" relationships between types.
///
/// Rust has no runtime notion of a type implementing a trait, so every
/// compatibility a binding relies on is registered up front together with the
/// coercion that performs it. A type is always compatible with itself.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    casters: HashMap<(TypeId, TypeId), CasterFn>,
    components: HashSet<TypeId>,
    interfaces: HashSet<TypeId>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `Impl` can be used wherever `Trait` is expected.
    pub fn implement<Impl, Trait, F>(&mut self, caster_fn: F) -> &mut Self
    where
        Impl: ?Sized + Send + Sync + 'static,
        Trait: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<Impl>) -> Arc<Trait> + Send + Sync + 'static,
    {
        let caster: CasterFn = Arc::new(move |instance: &Instance| {
            let concrete = instance.downcast::<Impl>()?;
            Some(Instance::new(caster_fn(concrete)))
        });
        self.casters
            .insert((TypeId::of::<Impl>(), TypeId::of::<Trait>()), caster);
        self.interfaces.insert(TypeId::of::<Trait>());
        self
    }

    /// Mark `T` as a host component type, eligible for hierarchy lookups.
    pub fn register_component<T: ?Sized + 'static>(&mut self) -> &mut Self {
        self.components.insert(TypeId::of::<T>());
        self
    }

    /// Mark `T` as a polymorphic capability type without registering an
    /// implementation for it.
    pub fn declare_interface<T: ?Sized + 'static>(&mut self) -> &mut Self {
        self.interfaces.insert(TypeId::of::<T>());
        self
    }

    pub fn is_assignable(&self, from: ContractId, to: ContractId) -> bool {
        from == to || self.casters.contains_key(&(from.type_id(), to.type_id()))
    }

    pub fn is_component(&self, ty: ContractId) -> bool {
        self.components.contains(&ty.type_id())
    }

    pub fn is_interface(&self, ty: ContractId) -> bool {
        self.interfaces.contains(&ty.type_id())
    }

    /// Fails unless `candidate` is assignable to every type in `required`.
    pub fn assert_is_derived_from_types(
        &self,
        candidate: ContractId,
        required: &[ContractId],
    ) -> Result<()> {
        for contract in required {
            if !self.is_assignable(candidate, *contract) {
                return Err(BindwireError::binding_type(
                    contract.name(),
                    format!(
                        "type '{}' is not registered as implementing '{}'",
                        candidate, contract
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Fails unless every type is a registered component or an interface.
    pub fn assert_is_interface_or_component(&self, types: &[ContractId]) -> Result<()> {
        for ty in types {
            if !self.is_component(*ty) && !self.is_interface(*ty) {
                return Err(BindwireError::binding_type(
                    ty.name(),
                    format!(
                        "expected type '{}' to either be a registered component or an interface",
                        ty
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Convert an instance to the erased form of `to`, if compatible.
    pub fn cast_instance(&self, instance: &Instance, to: ContractId) -> Option<Instance> {
        if instance.type_id() == to.type_id() {
            return Some(instance.clone());
        }
        let caster = self.casters.get(&(instance.type_id(), to.type_id()))?;
        caster(instance)
    }

    pub fn cast<C>(&self, instance: &Instance) -> Option<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.cast_instance(instance, ContractId::of::<C>())?
            .downcast::<C>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Clock: Send + Sync {
        fn now(&self) -> u64;
    }

    trait Named: Send + Sync {
        fn name(&self) -> &str;
    }

    struct FixedClock(u64);

    impl Clock for FixedClock {
        fn now(&self) -> u64 {
            self.0
        }
    }

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry.implement::<FixedClock, dyn Clock, _>(|c| c as Arc<dyn Clock>);
        registry
    }

    #[test]
    fn test_assert_is_derived_from_types() {
        let registry = registry();
        let clock = ContractId::of::<dyn Clock>();
        let fixed = ContractId::of::<FixedClock>();

        registry
            .assert_is_derived_from_types(fixed, &[clock, fixed])
            .unwrap();

        let err = registry
            .assert_is_derived_from_types(fixed, &[ContractId::of::<dyn Named>()])
            .unwrap_err();
        assert!(matches!(err, BindwireError::BindingType { .. }));
        assert!(err.to_string().contains("Named"));
    }

    #[test]
    fn test_assert_is_interface_or_component() {
        let mut registry = registry();
        let named = ContractId::of::<dyn Named>();
        let fixed = ContractId::of::<FixedClock>();

        registry
            .assert_is_interface_or_component(&[ContractId::of::<dyn Clock>()])
            .unwrap();
        assert!(registry.assert_is_interface_or_component(&[named]).is_err());
        assert!(registry.assert_is_interface_or_component(&[fixed]).is_err());

        registry.declare_interface::<dyn Named>();
        registry.register_component::<FixedClock>();
        registry
            .assert_is_interface_or_component(&[named, fixed])
            .unwrap();
    }

    #[test]
    fn test_cast_through_registered_caster() {
        let registry = registry();
        let instance = Instance::new(Arc::new(FixedClock(7)));

        let clock = registry.cast::<dyn Clock>(&instance).unwrap();
        assert_eq!(clock.now(), 7);
        assert!(registry.cast::<FixedClock>(&instance).is_some());
        assert!(registry.cast::<dyn Named>(&instance).is_none());
    }
}
