//! Resolution scopes.
//!
//! A [`Scope`] is an isolated resolution unit: scoped ports are cached
//! once per scope, singletons are shared with the root container.
//!
//! # Tree
//! ```text
//! Container ── singleton MemoMap
//!    ├── scope-1 ── fork of singletons
//!    │     └── scope-3 ── fork of singletons (not of scope-1)
//!    └── scope-2 ── fork of singletons
//! ```
//! Disposing a node disposes its descendants first, then its own cache,
//! then unlinks it from its parent.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::adapter::{BoxFuture, Instance, Resolver};
use crate::container::{ContainerCore, ScopeFrame};
use crate::error::{DisposeError, DisposedError, DisposedTarget, FinalizerFailure, ResolutionError, Result};
use crate::inspect::ScopeSnapshot;
use crate::memo::MemoMap;
use crate::port::Port;

/// Unique, monotonically increasing scope identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ScopeId(u64);

impl ScopeId {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope-{}", self.0)
    }
}

/// Active → Disposing → Disposed. Never goes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LifecycleState {
    Active,
    Disposing,
    Disposed,
}

#[derive(Debug)]
pub(crate) struct Lifecycle {
    state: Mutex<LifecycleState>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LifecycleState::Active),
        }
    }

    /// `true` as soon as disposal has started.
    pub fn is_disposed(&self) -> bool {
        *self.state.lock() != LifecycleState::Active
    }

    /// Runs `f` only while active, with the state held so disposal
    /// cannot start in between.
    pub fn while_active<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        let state = self.state.lock();
        if *state != LifecycleState::Active {
            return None;
        }
        Some(f())
    }

    /// Moves to `Disposing`. Returns `false` if disposal already started.
    pub fn begin_disposal(&self) -> bool {
        let mut state = self.state.lock();
        if *state != LifecycleState::Active {
            return false;
        }
        *state = LifecycleState::Disposing;
        true
    }

    pub fn finish_disposal(&self) {
        *self.state.lock() = LifecycleState::Disposed;
    }
}

/// Disposes `children` newest first, collecting every failure.
pub(crate) async fn dispose_children(children: Vec<Arc<ScopeCore>>, failures: &mut Vec<FinalizerFailure>) {
    for child in children.into_iter().rev() {
        if let Err(err) = child.dispose().await {
            failures.extend(err.into_failures());
        }
    }
}

/// Shared state behind a [`Scope`] handle.
pub(crate) struct ScopeCore {
    id: ScopeId,
    memo: MemoMap,
    container: Weak<ContainerCore>,
    parent: Option<Weak<ScopeCore>>,
    children: Mutex<Vec<Arc<ScopeCore>>>,
    lifecycle: Lifecycle,
}

impl ScopeCore {
    pub fn new(id: ScopeId, memo: MemoMap, container: Weak<ContainerCore>, parent: Option<Weak<ScopeCore>>) -> Self {
        Self {
            id,
            memo,
            container,
            parent,
            children: Mutex::new(Vec::new()),
            lifecycle: Lifecycle::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> ScopeId {
        self.id
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.lifecycle.is_disposed()
    }

    pub fn frame(&self) -> ScopeFrame<'_> {
        ScopeFrame {
            id: self.id,
            memo: &self.memo,
        }
    }

    pub fn ensure_active(&self, port: &Port) -> Result<()> {
        if self.is_disposed() {
            return Err(self.disposed_error(Some(port.name())));
        }
        Ok(())
    }

    fn disposed_error(&self, port_name: Option<&str>) -> ResolutionError {
        ResolutionError::Disposed(DisposedError {
            target: DisposedTarget::Scope(self.id),
            port_name: port_name.map(str::to_string),
        })
    }

    /// Creates a nested scope. Its cache forks the container's singletons,
    /// not this scope's cache.
    pub fn create_child(self: &Arc<Self>, container: &Arc<ContainerCore>) -> Result<Arc<ScopeCore>> {
        container.ensure_active(None)?;

        let child = self
            .lifecycle
            .while_active(|| {
                let child = container.spawn_scope(Some(self));
                self.children.lock().push(Arc::clone(&child));
                child
            })
            .ok_or_else(|| self.disposed_error(None))?;

        debug!(scope = %child.id, parent = %self.id, "Created nested scope");
        Ok(child)
    }

    /// Disposes descendants, then this scope's cache, then unlinks it.
    ///
    /// Idempotent: a second call, or a call racing the first, returns
    /// `Ok(())` without running any finalizer again.
    pub fn dispose(self: Arc<Self>) -> BoxFuture<'static, std::result::Result<(), DisposeError>> {
        Box::pin(async move {
            if !self.lifecycle.begin_disposal() {
                return Ok(());
            }

            if let Some(container) = self.container.upgrade() {
                container.quiesce();
            }
            debug!(scope = %self.id, cached = self.memo.len(), "Disposing scope");

            let children = std::mem::take(&mut *self.children.lock());
            let mut failures = Vec::new();
            dispose_children(children, &mut failures).await;

            if let Err(err) = self.memo.dispose().await {
                failures.extend(err.into_failures());
            }

            self.lifecycle.finish_disposal();
            self.detach();

            debug!(scope = %self.id, failures = failures.len(), "Scope disposed");
            DisposeError::check(failures)
        })
    }

    fn detach(&self) {
        match self.parent {
            Some(ref parent) => {
                if let Some(parent) = parent.upgrade() {
                    parent.children.lock().retain(|child| child.id != self.id);
                }
            }
            None => {
                if let Some(container) = self.container.upgrade() {
                    container.detach_scope(self.id);
                }
            }
        }
    }

    pub fn snapshot(&self) -> ScopeSnapshot {
        let children: Vec<Arc<ScopeCore>> = self.children.lock().clone();

        ScopeSnapshot {
            id: self.id,
            disposed: self.is_disposed(),
            scoped: self.memo.entries(),
            children: children.iter().map(|child| child.snapshot()).collect(),
        }
    }
}

impl fmt::Debug for ScopeCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeCore")
            .field("id", &self.id)
            .field("cached", &self.memo.len())
            .field("children", &self.children.lock().len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Handle to a resolution scope.
///
/// Keeps its container alive. Cloning yields another handle to the same
/// scope.
///
/// # Examples
/// ```
/// use mawrid_runtime::prelude::*;
///
/// let session = Port::new("Session");
/// let container = Container::new(Graph::new(vec![
///     Adapter::scoped(session.clone(), |_| Ok(String::from("guest"))),
/// ]))?;
///
/// let scope = container.create_scope()?;
/// let a = scope.resolve(&session)?;
/// let b = scope.resolve(&session)?;
/// assert!(std::sync::Arc::ptr_eq(&a, &b));
/// # Ok::<(), ResolutionError>(())
/// ```
#[derive(Clone)]
pub struct Scope {
    core: Arc<ScopeCore>,
    container: Arc<ContainerCore>,
}

impl Scope {
    pub(crate) fn new(core: Arc<ScopeCore>, container: Arc<ContainerCore>) -> Self {
        Self { core, container }
    }

    #[inline]
    pub fn id(&self) -> ScopeId {
        self.core.id()
    }

    pub fn is_disposed(&self) -> bool {
        self.core.is_disposed()
    }

    /// Creates a nested scope, disposed together with this one.
    ///
    /// # Errors
    /// [`ResolutionError::Disposed`] if this scope or the container has
    /// been disposed.
    pub fn create_scope(&self) -> Result<Scope> {
        let child = self.core.create_child(&self.container)?;
        Ok(Scope::new(child, Arc::clone(&self.container)))
    }

    /// Disposes nested scopes, then this scope's cached instances in
    /// reverse creation order.
    ///
    /// # Errors
    /// A [`DisposeError`] listing every finalizer that failed; all of
    /// them still ran.
    pub async fn dispose(&self) -> std::result::Result<(), DisposeError> {
        Arc::clone(&self.core).dispose().await
    }

    /// Read-only view of this scope and its descendants.
    #[doc(hidden)]
    pub fn inspect(&self) -> ScopeSnapshot {
        self.core.snapshot()
    }
}

impl Resolver for Scope {
    fn resolve(&self, port: &Port) -> Result<Instance> {
        self.container.resolve(port, Some(&*self.core))
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.core.id())
            .field("disposed", &self.core.is_disposed())
            .finish()
    }
}
