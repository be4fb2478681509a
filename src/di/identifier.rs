use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Identity of a contract type, usually a trait object such as `dyn Clock`.
#[derive(Clone, Copy)]
pub struct ContractId {
    type_id: TypeId,
    name: &'static str,
}

impl ContractId {
    pub fn of<C: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<C>(),
            name: std::any::type_name::<C>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ContractId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ContractId {}

impl std::hash::Hash for ContractId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

trait IdentifierKey: Any + fmt::Debug + Send + Sync {
    fn eq_key(&self, other: &dyn IdentifierKey) -> bool;
    fn as_any(&self) -> &dyn Any;
}

impl<K> IdentifierKey for K
where
    K: Any + fmt::Debug + Eq + Send + Sync,
{
    fn eq_key(&self, other: &dyn IdentifierKey) -> bool {
        other
            .as_any()
            .downcast_ref::<K>()
            .is_some_and(|other| self == other)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Opaque key distinguishing several bindings of the same contract.
///
/// Any `Eq + Debug` value works. Two identifiers are equal only when they wrap
/// the same type and compare equal, so `"primary"` and
/// `String::from("primary")` are different keys.
#[derive(Clone)]
pub struct Identifier(Arc<dyn IdentifierKey>);

impl Identifier {
    pub fn new<K>(key: K) -> Self
    where
        K: Any + fmt::Debug + Eq + Send + Sync,
    {
        Self(Arc::new(key))
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_key(other.0.as_ref())
    }
}

impl Eq for Identifier {}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl From<&'static str> for Identifier {
    fn from(key: &'static str) -> Self {
        Self::new(key)
    }
}

impl From<String> for Identifier {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}

pub(crate) fn describe_id(identifier: &Option<Identifier>) -> Option<String> {
    identifier.as_ref().map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    enum Slot {
        Left,
        Right,
    }

    #[test]
    fn test_identifier_equality_requires_same_type() {
        assert_eq!(Identifier::from("primary"), Identifier::from("primary"));
        assert_ne!(Identifier::from("primary"), Identifier::from("backup"));
        assert_ne!(
            Identifier::from("primary"),
            Identifier::from(String::from("primary"))
        );
        assert_eq!(Identifier::new(Slot::Left), Identifier::new(Slot::Left));
        assert_ne!(Identifier::new(Slot::Left), Identifier::new(Slot::Right));
    }

    #[test]
    fn test_contract_id_names_trait_objects() {
        trait Clock {}
        let id = ContractId::of::<dyn Clock>();
        assert!(id.name().contains("Clock"));
        assert_eq!(id, ContractId::of::<dyn Clock>());
        assert_ne!(id, ContractId::of::<u32>());
    }
}
