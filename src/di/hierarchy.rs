//! Lookups backed by the host's scene hierarchy.
//!
//! The container does not walk any scene graph itself. It resolves a
//! [`HierarchyQuery`] capability from the container at resolve time and
//! filters what that capability returns.

use crate::di::strategy::{Provided, Provider};
use crate::di::{ContractId, InjectContext, Instance, TypeRegistry};
use crate::error::{BindwireError, Result};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use strum_macros::{Display, EnumString};

/// Handle to a node (scene object) owned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// A component attached to a host node.
#[derive(Debug, Clone)]
pub struct Component {
    pub node: NodeId,
    pub instance: Instance,
}

/// Hierarchy queries the host must provide for hierarchy bindings to work.
pub trait HierarchyQuery: Send + Sync {
    /// Components on `node` and all of its descendants.
    fn components_in_children(&self, node: NodeId, include_inactive: bool) -> Vec<Component>;

    /// Components on `node` and all of its ancestors.
    fn components_in_parent(&self, node: NodeId) -> Vec<Component>;

    /// Components attached to `node` itself.
    fn components(&self, node: NodeId) -> Vec<Component>;

    fn root_objects(&self) -> Vec<NodeId>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Traversal {
    Children,
    Parents,
    Siblings,
    WholeHierarchy,
}

type Predicate<P> = Arc<dyn Fn(&P) -> bool + Send + Sync>;

/// Filters applied to a hierarchy lookup.
pub struct LookupOptions<P: ?Sized> {
    include_inactive: bool,
    exclude_self: bool,
    predicate: Option<Predicate<P>>,
}

impl<P: ?Sized> Default for LookupOptions<P> {
    fn default() -> Self {
        Self {
            include_inactive: false,
            exclude_self: false,
            predicate: None,
        }
    }
}

impl<P: ?Sized> Clone for LookupOptions<P> {
    fn clone(&self) -> Self {
        Self {
            include_inactive: self.include_inactive,
            exclude_self: self.exclude_self,
            predicate: self.predicate.clone(),
        }
    }
}

impl<P: ?Sized> LookupOptions<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include_inactive(mut self, include_inactive: bool) -> Self {
        self.include_inactive = include_inactive;
        self
    }

    /// Skip every component living on the requester's own node.
    pub fn exclude_self(mut self, exclude_self: bool) -> Self {
        self.exclude_self = exclude_self;
        self
    }

    pub fn predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&P) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }
}

pub(crate) struct HierarchyStrategy<P: ?Sized> {
    traversal: Traversal,
    options: LookupOptions<P>,
    _marker: PhantomData<fn() -> Arc<P>>,
}

impl<P> HierarchyStrategy<P>
where
    P: ?Sized + Send + Sync + 'static,
{
    pub(crate) fn new(traversal: Traversal, options: LookupOptions<P>) -> Self {
        Self {
            traversal,
            options,
            _marker: PhantomData,
        }
    }

    fn requester_node(&self, ctx: &InjectContext<'_>) -> Result<NodeId> {
        ctx.node().ok_or_else(|| BindwireError::Resolution {
            contract: ctx.contract().to_string(),
            identifier: ctx.identifier().map(ToString::to_string),
            message: format!(
                "{} lookup requires a requesting node in the resolution context",
                self.traversal
            ),
        })
    }
}

impl<P> Provider for HierarchyStrategy<P>
where
    P: ?Sized + Send + Sync + 'static,
{
    fn describe(&self) -> String {
        format!("hierarchy ({})", self.traversal)
    }

    fn validate(&self, registry: &TypeRegistry, types: &[ContractId]) -> Result<()> {
        registry.assert_is_interface_or_component(types)
    }

    fn provide(&self, ctx: &InjectContext<'_>) -> Result<Provided> {
        let query = ctx.resolve::<dyn HierarchyQuery>()?;

        let components = match self.traversal {
            Traversal::Children => {
                let node = self.requester_node(ctx)?;
                query.components_in_children(node, self.options.include_inactive)
            }
            Traversal::Parents => query.components_in_parent(self.requester_node(ctx)?),
            Traversal::Siblings => query.components(self.requester_node(ctx)?),
            Traversal::WholeHierarchy => query
                .root_objects()
                .into_iter()
                .flat_map(|root| {
                    query.components_in_children(root, self.options.include_inactive)
                })
                .collect(),
        };

        let registry = ctx.container().registry();
        let requester = ctx.requester();
        let own_node = ctx.node();
        let target = ContractId::of::<P>();

        let found: Vec<Instance> = components
            .into_iter()
            .filter(|c| requester.is_none_or(|r| !r.same_object(&c.instance)))
            .filter(|c| !self.options.exclude_self || own_node != Some(c.node))
            .filter_map(|c| registry.cast_instance(&c.instance, target))
            .filter(|instance| match &self.options.predicate {
                Some(predicate) => instance.downcast::<P>().is_some_and(|p| predicate(&*p)),
                None => true,
            })
            .collect();

        tracing::trace!(
            traversal = %self.traversal,
            found = found.len(),
            "Hierarchy lookup for {}",
            target
        );
        Ok(Provided::Many(Box::new(found.into_iter())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traversal_parses_from_snake_case() {
        assert_eq!(
            "whole_hierarchy".parse::<Traversal>().unwrap(),
            Traversal::WholeHierarchy
        );
        assert_eq!(Traversal::Children.to_string(), "children");
    }

    #[test]
    fn test_options_builder() {
        let options = LookupOptions::<str>::new()
            .include_inactive(true)
            .exclude_self(true)
            .predicate(|s| s.starts_with('a'));
        assert!(options.include_inactive);
        assert!(options.exclude_self);
        assert!((options.predicate.unwrap())("abc"));
    }
}
