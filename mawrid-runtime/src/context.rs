//! Lazy circular dependency detection.
//!
//! The [`ResolutionContext`] is a stack of the ports whose instances are
//! currently being created. Entering a port that is already on the stack
//! means the graph loops back on itself. Nothing is checked ahead of
//! time: an adapter that depends on itself only fails once somebody
//! actually resolves it.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use crate::error::{CircularDependencyError, ResolutionError};

/// Default bound on nested creations.
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// Stack of in-flight port names.
///
/// # Examples
/// ```
/// use mawrid_runtime::context::ResolutionContext;
/// use mawrid_runtime::error::ErrorKind;
///
/// let mut ctx = ResolutionContext::new();
/// ctx.enter("A").unwrap();
/// ctx.enter("B").unwrap();
///
/// let err = ctx.enter("A").unwrap_err();
/// assert_eq!(err.kind(), ErrorKind::CircularDependency);
/// assert!(err.to_string().contains("A → B → A"));
/// ```
#[derive(Debug)]
pub struct ResolutionContext {
    stack: Vec<Arc<str>>,
    max_depth: usize,
}

impl ResolutionContext {
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_MAX_DEPTH)
    }

    /// Creates a context that refuses to nest deeper than `max_depth`.
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            stack: Vec::new(),
            max_depth,
        }
    }

    /// Pushes `port_name`.
    ///
    /// # Errors
    /// - [`ResolutionError::CircularDependency`] if the name is already on
    ///   the stack; the chain runs from its first occurrence to the repeat.
    /// - [`ResolutionError::DepthExceeded`] if the stack is full.
    ///
    /// Nothing is pushed when an error is returned.
    pub fn enter(&mut self, port_name: impl Into<Arc<str>>) -> Result<(), ResolutionError> {
        let name = port_name.into();

        if let Some(start) = self.stack.iter().position(|entry| **entry == *name) {
            let mut chain: Vec<String> = self.stack[start..].iter().map(|n| n.to_string()).collect();
            chain.push(name.to_string());

            warn!(cycle = ?chain, "Circular dependency detected");
            return Err(ResolutionError::CircularDependency(CircularDependencyError { chain }));
        }

        if self.stack.len() >= self.max_depth {
            return Err(ResolutionError::DepthExceeded {
                port_name: name.to_string(),
                max: self.max_depth,
            });
        }

        self.stack.push(name);
        Ok(())
    }

    /// Pops `port_name`, which must be the top of the stack.
    pub fn exit(&mut self, port_name: &str) {
        let popped = self.stack.pop();
        debug_assert_eq!(popped.as_deref(), Some(port_name), "resolution stack out of order");
    }

    /// Number of creations in flight.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

impl Default for ResolutionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps a port on the stack until dropped.
///
/// Popping in `Drop` keeps the stack balanced on every exit path,
/// including early returns and unwinding factories.
pub(crate) struct ContextGuard<'a> {
    context: &'a Mutex<ResolutionContext>,
    name: Arc<str>,
}

impl<'a> ContextGuard<'a> {
    pub fn enter(context: &'a Mutex<ResolutionContext>, name: Arc<str>) -> Result<Self, ResolutionError> {
        context.lock().enter(Arc::clone(&name))?;
        Ok(Self { context, name })
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        self.context.lock().exit(&self.name);
    }
}
