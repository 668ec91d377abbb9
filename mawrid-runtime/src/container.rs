//! # The Container — root of Mawrid
//!
//! Resolves ports from an immutable [`Graph`], caches instances per
//! lifetime and disposes them in reverse creation order.
//!
//! # Architecture
//! ```text
//! ContainerBuilder  ──build()──>  Container ── singleton MemoMap
//!                                    │
//!                              create_scope()
//!                                    │
//!                                    ▼
//!                                  Scope ── forked MemoMap
//! ```
//!
//! # Examples
//! ```rust
//! use mawrid_runtime::prelude::*;
//! use std::sync::Arc;
//!
//! struct Logger;
//! struct Database {
//!     logger: Arc<Logger>,
//! }
//!
//! let logger = Port::new("Logger");
//! let database = Port::new("Database");
//!
//! let container = Container::new(Graph::new(vec![
//!     Adapter::singleton(logger.clone(), |_| Ok(Logger)),
//!     Adapter::singleton(database.clone(), |deps| {
//!         Ok(Database { logger: deps.get_as::<Logger>("Logger")? })
//!     })
//!     .requires([logger.clone()]),
//! ]))
//! .expect("Failed to build container");
//!
//! let db = container.resolve_as::<Database>(&database).expect("Failed to resolve");
//! let shared = container.resolve_as::<Logger>(&logger).expect("Failed to resolve");
//! assert!(Arc::ptr_eq(&db.logger, &shared));
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, ReentrantMutex};
use tracing::{debug, info, instrument, trace};

use crate::adapter::{Adapter, Dependencies, Instance, Resolver};
use crate::context::{ContextGuard, DEFAULT_MAX_DEPTH, ResolutionContext};
use crate::error::{
    DisposeError, DisposedError, DisposedTarget, ResolutionError, Result, ScopeRequiredError,
};
use crate::graph::{AdapterMap, Graph};
use crate::hooks::{HookState, ResolutionHooks, ResolveInfo, ResolveOutcome};
use crate::inspect::{AdapterSnapshot, ContainerSnapshot};
use crate::lifetime::Lifetime;
use crate::memo::MemoMap;
use crate::port::Port;
use crate::scope::{Lifecycle, Scope, ScopeCore, ScopeId, dispose_children};

// ============================================================
// ContainerBuilder
// ============================================================

/// Configures and builds a [`Container`].
///
/// # Examples
/// ```rust,ignore
/// let container = Container::builder(graph)
///     .hooks(ResolutionHooks::new().after_resolve(|o| println!("{:?}", o.duration)))
///     .max_resolution_depth(64)
///     .build()?;
/// ```
pub struct ContainerBuilder {
    graph: Graph,
    hooks: ResolutionHooks,
    max_resolution_depth: usize,
}

impl ContainerBuilder {
    fn new(graph: Graph) -> Self {
        Self {
            graph,
            hooks: ResolutionHooks::new(),
            max_resolution_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Installs resolution hooks. Empty hooks allocate nothing.
    pub fn hooks(mut self, hooks: ResolutionHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Bounds the chain of nested creations (default 1024).
    pub fn max_resolution_depth(mut self, max: usize) -> Self {
        self.max_resolution_depth = max;
        self
    }

    /// Builds the container.
    ///
    /// # Errors
    /// [`ResolutionError::DuplicateAdapter`] if two adapters provide the
    /// same port.
    #[instrument(skip_all, name = "container_build")]
    pub fn build(self) -> Result<Container> {
        info!(adapters = self.graph.len(), "Building container");

        let adapters = AdapterMap::build(self.graph)?;
        let hooks = HookState::allocate(self.hooks);

        let core = ContainerCore {
            adapters,
            singletons: Arc::new(MemoMap::new()),
            lifecycle: Lifecycle::new(),
            children: Mutex::new(Vec::new()),
            resolution: Mutex::new(ResolutionContext::with_max_depth(self.max_resolution_depth)),
            gate: ReentrantMutex::new(()),
            hooks,
            next_scope_id: AtomicU64::new(1),
        };

        info!(hooks = core.hooks.is_some(), "Container built successfully ✓");
        Ok(Container { core: Arc::new(core) })
    }
}

// ═══════════════════════════════════════════
// ContainerCore
// ═══════════════════════════════════════════

/// The scope a resolve goes through.
#[derive(Clone, Copy)]
pub(crate) struct ScopeFrame<'a> {
    pub id: ScopeId,
    pub memo: &'a MemoMap,
}

/// Shared state behind [`Container`] and every [`Scope`] handle.
pub(crate) struct ContainerCore {
    adapters: AdapterMap,
    singletons: Arc<MemoMap>,
    lifecycle: Lifecycle,
    children: Mutex<Vec<Arc<ScopeCore>>>,
    resolution: Mutex<ResolutionContext>,
    /// Held for a whole resolve tree; nested resolves re-enter it.
    gate: ReentrantMutex<()>,
    hooks: Option<Box<HookState>>,
    next_scope_id: AtomicU64,
}

impl ContainerCore {
    pub fn ensure_active(&self, port: Option<&Port>) -> Result<()> {
        if self.lifecycle.is_disposed() {
            return Err(ResolutionError::Disposed(DisposedError {
                target: DisposedTarget::Container,
                port_name: port.map(|p| p.name().to_string()),
            }));
        }
        Ok(())
    }

    /// Resolves `port` at top level, through `scope` if given.
    ///
    /// Liveness is checked with the gate held, so a resolve tree either
    /// finishes before disposal drains the caches or never starts.
    pub fn resolve(&self, port: &Port, scope: Option<&ScopeCore>) -> Result<Instance> {
        let _gate = self.gate.lock();

        self.ensure_active(Some(port))?;
        let frame = match scope {
            Some(scope) => {
                scope.ensure_active(port)?;
                Some(scope.frame())
            }
            None => None,
        };

        self.resolve_port(port, frame, None)
    }

    /// Waits for the resolve tree in flight, if any. Called once the
    /// disposing node is marked, so no new tree can reach its cache.
    pub fn quiesce(&self) {
        drop(self.gate.lock());
    }

    fn resolve_port(&self, port: &Port, scope: Option<ScopeFrame<'_>>, required_by: Option<&Port>) -> Result<Instance> {
        let adapter = self
            .adapters
            .get(port)
            .ok_or_else(|| self.adapters.unregistered(port, required_by))?;

        match self.hooks {
            None => self.resolve_adapter(adapter, scope),
            Some(ref hooks) => self.resolve_observed(hooks, adapter, scope),
        }
    }

    fn resolve_observed(&self, hooks: &HookState, adapter: &Adapter, scope: Option<ScopeFrame<'_>>) -> Result<Instance> {
        let port = adapter.provides();
        let (parent_port, depth) = hooks.position();

        let info = ResolveInfo {
            port: port.clone(),
            port_name: port.shared_name(),
            lifetime: adapter.lifetime(),
            scope_id: scope.map(|frame| frame.id),
            parent_port,
            is_cache_hit: self.is_cached(adapter, scope),
            depth,
        };

        hooks.before(&info);
        let started = Instant::now();

        let result = {
            let _frame = hooks.push(port);
            self.resolve_adapter(adapter, scope)
        };

        hooks.after(&ResolveOutcome {
            info: &info,
            duration: started.elapsed(),
            error: result.as_ref().err(),
        });

        result
    }

    fn is_cached(&self, adapter: &Adapter, scope: Option<ScopeFrame<'_>>) -> bool {
        let port = adapter.provides();
        if !adapter.lifetime().is_cached() {
            return false;
        }

        match adapter.lifetime() {
            Lifetime::Scoped => scope.is_some_and(|frame| frame.memo.has(port)),
            _ => self.singletons.has(port),
        }
    }

    fn resolve_adapter(&self, adapter: &Adapter, scope: Option<ScopeFrame<'_>>) -> Result<Instance> {
        let port = adapter.provides();

        match adapter.lifetime() {
            // Singleton dependencies resolve from the root, never from the caller's scope.
            Lifetime::Singleton => {
                self.singletons
                    .get_or_else_memoize(port, || self.create(adapter, None), adapter.finalizer_fn())
            }
            Lifetime::Scoped => {
                let frame = scope.ok_or_else(|| {
                    ResolutionError::ScopeRequired(ScopeRequiredError {
                        port_name: port.name().to_string(),
                    })
                })?;

                frame
                    .memo
                    .get_or_else_memoize(port, || self.create(adapter, scope), adapter.finalizer_fn())
            }
            Lifetime::Request => self.create(adapter, scope),
        }
    }

    fn create(&self, adapter: &Adapter, scope: Option<ScopeFrame<'_>>) -> Result<Instance> {
        let port = adapter.provides();
        let _guard = ContextGuard::enter(&self.resolution, port.shared_name())?;

        trace!(port = %port, lifetime = %adapter.lifetime(), "Creating instance");

        let mut deps = Dependencies::with_capacity(adapter.required_ports().len());
        for required in adapter.required_ports() {
            let instance = self.resolve_port(required, scope, Some(port))?;
            deps.insert(required.shared_name(), instance);
        }

        (adapter.factory())(&deps).map_err(|source| ResolutionError::factory(port.name(), source))
    }

    /// Builds a scope core whose cache forks the singletons. Does not
    /// register it anywhere.
    pub fn spawn_scope(self: &Arc<Self>, parent: Option<&Arc<ScopeCore>>) -> Arc<ScopeCore> {
        let id = ScopeId::new(self.next_scope_id.fetch_add(1, Ordering::Relaxed));

        Arc::new(ScopeCore::new(
            id,
            self.singletons.fork(),
            Arc::downgrade(self),
            parent.map(Arc::downgrade),
        ))
    }

    fn create_scope(self: &Arc<Self>) -> Result<Arc<ScopeCore>> {
        let scope = self
            .lifecycle
            .while_active(|| {
                let scope = self.spawn_scope(None);
                self.children.lock().push(Arc::clone(&scope));
                scope
            })
            .ok_or_else(|| {
                ResolutionError::Disposed(DisposedError {
                    target: DisposedTarget::Container,
                    port_name: None,
                })
            })?;

        debug!(scope = %scope.id(), "Created scope");
        Ok(scope)
    }

    pub fn detach_scope(&self, id: ScopeId) {
        self.children.lock().retain(|scope| scope.id() != id);
    }

    async fn dispose(&self) -> std::result::Result<(), DisposeError> {
        if !self.lifecycle.begin_disposal() {
            return Ok(());
        }

        self.quiesce();
        debug!(singletons = self.singletons.len(), "Disposing container");

        let children = std::mem::take(&mut *self.children.lock());
        let mut failures = Vec::new();
        dispose_children(children, &mut failures).await;

        if let Err(err) = self.singletons.dispose().await {
            failures.extend(err.into_failures());
        }

        self.lifecycle.finish_disposal();

        info!(failures = failures.len(), "Container disposed");
        DisposeError::check(failures)
    }

    fn snapshot(&self) -> ContainerSnapshot {
        let children: Vec<Arc<ScopeCore>> = self.children.lock().clone();

        ContainerSnapshot {
            disposed: self.lifecycle.is_disposed(),
            singletons: self.singletons.entries(),
            scopes: children.iter().map(|scope| scope.snapshot()).collect(),
            adapters: self.adapters.adapters().iter().map(AdapterSnapshot::of).collect(),
        }
    }
}

// ═══════════════════════════════════════════
// Container
// ═══════════════════════════════════════════

/// Root resolver built from a [`Graph`].
///
/// Cheap to clone; clones share the same caches and scopes.
#[derive(Clone)]
pub struct Container {
    core: Arc<ContainerCore>,
}

impl Container {
    /// Builds a container without hooks and with default limits.
    pub fn new(graph: Graph) -> Result<Container> {
        Self::builder(graph).build()
    }

    /// Create a new builder.
    pub fn builder(graph: Graph) -> ContainerBuilder {
        ContainerBuilder::new(graph)
    }

    /// Creates a scope whose cache forks this container's singletons.
    ///
    /// # Errors
    /// [`ResolutionError::Disposed`] after disposal.
    pub fn create_scope(&self) -> Result<Scope> {
        let core = self.core.create_scope()?;
        Ok(Scope::new(core, Arc::clone(&self.core)))
    }

    /// Disposes every scope, newest first, then runs singleton finalizers
    /// in reverse creation order.
    ///
    /// Idempotent. Every finalizer runs even if an earlier one fails;
    /// the failures are returned together.
    pub async fn dispose(&self) -> std::result::Result<(), DisposeError> {
        self.core.dispose().await
    }

    pub fn is_disposed(&self) -> bool {
        self.core.lifecycle.is_disposed()
    }

    /// Read-only view of caches, scopes and adapters.
    #[doc(hidden)]
    pub fn inspect(&self) -> ContainerSnapshot {
        self.core.snapshot()
    }
}

impl Resolver for Container {
    fn resolve(&self, port: &Port) -> Result<Instance> {
        self.core.resolve(port, None)
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("adapters", &self.core.adapters.len())
            .field("singletons", &self.core.singletons.len())
            .field("scopes", &self.core.children.lock().len())
            .field("hooks", &self.core.hooks.is_some())
            .field("disposed", &self.core.lifecycle.is_disposed())
            .finish()
    }
}

// ═══════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════

pub mod prelude {
    pub use super::{Container, ContainerBuilder};
    pub use crate::adapter::{Adapter, Dependencies, Instance, Resolver};
    pub use crate::error::{BoxError, DisposeError, ErrorKind, ResolutionError, Result};
    pub use crate::graph::Graph;
    pub use crate::hooks::{ResolutionHooks, ResolveInfo, ResolveOutcome};
    pub use crate::lifetime::Lifetime;
    pub use crate::port::Port;
    pub use crate::scope::{Scope, ScopeId};
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════
