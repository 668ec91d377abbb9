//! Resolution runtime for Mawrid.
//!
//! Turns an immutable [`Graph`] of adapters into a [`Container`] that
//! caches instances per [`Lifetime`], spawns nested [`Scope`]s, detects
//! cycles while resolving and finalizes instances in reverse creation
//! order.

pub mod adapter;
pub mod container;
pub mod context;
pub mod error;
pub mod graph;
pub mod hooks;
pub mod inspect;
pub mod lifetime;
pub mod memo;
pub mod port;
pub mod scope;

pub use adapter::{Adapter, Dependencies, Instance, Resolver};
pub use container::{Container, ContainerBuilder, prelude};
pub use error::{BoxError, DisposeError, ErrorKind, ResolutionError, Result};
pub use graph::Graph;
pub use hooks::{ResolutionHooks, ResolveInfo, ResolveOutcome};
pub use lifetime::Lifetime;
pub use port::Port;
pub use scope::{Scope, ScopeId};
