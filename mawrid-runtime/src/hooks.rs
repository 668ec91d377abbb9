//! Resolution instrumentation hooks.
//!
//! Hooks are optional callbacks fired before and after every resolve,
//! including the nested resolves of a factory's dependencies and
//! resolves that fail. A container built without hooks carries no hook
//! state at all; its resolve path pays a single `None` check.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::ResolutionError;
use crate::lifetime::Lifetime;
use crate::port::Port;
use crate::scope::ScopeId;

pub type BeforeResolveFn = Box<dyn Fn(&ResolveInfo) + Send + Sync>;
pub type AfterResolveFn = Box<dyn Fn(&ResolveOutcome<'_>) + Send + Sync>;

/// What is about to be resolved.
#[derive(Debug, Clone)]
pub struct ResolveInfo {
    pub port: Port,
    pub port_name: Arc<str>,
    pub lifetime: Lifetime,
    /// The scope the resolve goes through, `None` for the root container.
    pub scope_id: Option<ScopeId>,
    /// The port whose factory requested this one, `None` at top level.
    pub parent_port: Option<Port>,
    /// Whether a cached instance already exists. Always `false` for
    /// request-lifetime ports.
    pub is_cache_hit: bool,
    /// Nesting level, `0` for a top-level resolve.
    pub depth: usize,
}

/// How a resolve ended.
#[derive(Debug)]
pub struct ResolveOutcome<'a> {
    pub info: &'a ResolveInfo,
    pub duration: Duration,
    pub error: Option<&'a ResolutionError>,
}

impl ResolveOutcome<'_> {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Hook configuration, fixed for the lifetime of a container.
///
/// # Examples
/// ```
/// use mawrid_runtime::hooks::ResolutionHooks;
///
/// let hooks = ResolutionHooks::new()
///     .before_resolve(|info| println!("-> {} (depth {})", info.port_name, info.depth))
///     .after_resolve(|outcome| println!("<- {} in {:?}", outcome.info.port_name, outcome.duration));
/// assert!(!hooks.is_empty());
/// ```
#[derive(Default)]
pub struct ResolutionHooks {
    before_resolve: Option<BeforeResolveFn>,
    after_resolve: Option<AfterResolveFn>,
}

impl ResolutionHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn before_resolve(mut self, hook: impl Fn(&ResolveInfo) + Send + Sync + 'static) -> Self {
        self.before_resolve = Some(Box::new(hook));
        self
    }

    pub fn after_resolve(mut self, hook: impl Fn(&ResolveOutcome<'_>) + Send + Sync + 'static) -> Self {
        self.after_resolve = Some(Box::new(hook));
        self
    }

    /// Returns `true` if no callback is configured.
    pub fn is_empty(&self) -> bool {
        self.before_resolve.is_none() && self.after_resolve.is_none()
    }
}

impl fmt::Debug for ResolutionHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionHooks")
            .field("before_resolve", &self.before_resolve.is_some())
            .field("after_resolve", &self.after_resolve.is_some())
            .finish()
    }
}

/// Per-container hook state: the callbacks plus the stack of ports
/// currently being resolved, used for parent and depth.
pub(crate) struct HookState {
    hooks: ResolutionHooks,
    stack: Mutex<Vec<Port>>,
}

impl HookState {
    /// Allocates hook state only if at least one callback is set.
    pub fn allocate(hooks: ResolutionHooks) -> Option<Box<HookState>> {
        if hooks.is_empty() {
            return None;
        }

        Some(Box::new(HookState {
            hooks,
            stack: Mutex::new(Vec::new()),
        }))
    }

    /// Current parent port and depth.
    pub fn position(&self) -> (Option<Port>, usize) {
        let stack = self.stack.lock();
        (stack.last().cloned(), stack.len())
    }

    pub fn before(&self, info: &ResolveInfo) {
        if let Some(ref hook) = self.hooks.before_resolve {
            hook(info);
        }
    }

    pub fn after(&self, outcome: &ResolveOutcome<'_>) {
        if let Some(ref hook) = self.hooks.after_resolve {
            hook(outcome);
        }
    }

    /// Pushes `port` as the parent of nested resolves until the frame drops.
    pub fn push(&self, port: &Port) -> HookFrame<'_> {
        self.stack.lock().push(port.clone());
        HookFrame { state: self }
    }
}

impl fmt::Debug for HookState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookState")
            .field("hooks", &self.hooks)
            .field("depth", &self.stack.lock().len())
            .finish()
    }
}

pub(crate) struct HookFrame<'a> {
    state: &'a HookState,
}

impl Drop for HookFrame<'_> {
    fn drop(&mut self) {
        self.state.stack.lock().pop();
    }
}
