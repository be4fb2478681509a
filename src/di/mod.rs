mod binding;
mod builder;
mod container;
mod context;
pub mod hierarchy;
mod identifier;
mod injectable;
mod instance;
mod lazy;
mod registry;
pub mod strategy;

pub(crate) use binding::DeclaredBinding;
pub use binding::{BindingRecord, FromBinder, Scope, ScopeBinder};
pub use builder::ContainerBuilder;
pub use container::{Container, WeakContainer};
pub use context::{InjectContext, Request};
pub use hierarchy::{Component, HierarchyQuery, LookupOptions, NodeId, Traversal};
pub use identifier::{ContractId, Identifier};
pub use injectable::{Injectable, Resolved};
pub use instance::{Instance, WeakInstance};
pub use lazy::Lazy;
pub use registry::TypeRegistry;
pub use strategy::{Factory, Provided, Provider};
