//! Error types for Mawrid runtime operations.
//!
//! Every resolution failure is a [`ResolutionError`]; callers branch on
//! [`ResolutionError::kind`] instead of matching message text.
//! Disposal never aborts half-way: finalizer failures are collected into
//! a [`DisposeError`] once every finalizer has had its turn.

use std::fmt;

use mawrid_support::rendering::render_chain;

use crate::scope::ScopeId;

/// Boxed error returned by user factories and finalizers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Stable discriminant of a [`ResolutionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Disposed,
    ScopeRequired,
    CircularDependency,
    Factory,
    UnregisteredPort,
    DuplicateAdapter,
    TypeMismatch,
    DepthExceeded,
}

/// Main error type for resolution and construction.
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    /// The container or scope was used after disposal.
    #[error("{}", .0)]
    Disposed(DisposedError),

    /// A scoped port was resolved outside of any scope.
    #[error("{}", .0)]
    ScopeRequired(ScopeRequiredError),

    /// A port was requested while it was already being created.
    #[error("{}", .0)]
    CircularDependency(CircularDependencyError),

    /// A user factory returned an error.
    #[error("Factory for '{port_name}' failed: {source}")]
    Factory {
        port_name: String,
        #[source]
        source: BoxError,
    },

    /// No adapter provides the requested port.
    #[error("{}", .0)]
    UnregisteredPort(UnregisteredPortError),

    /// Two adapters provide the same port.
    #[error("{}", .0)]
    DuplicateAdapter(DuplicateAdapterError),

    /// A resolved instance is not of the requested Rust type.
    #[error("Type mismatch for '{port_name}': expected {expected}")]
    TypeMismatch {
        port_name: String,
        expected: &'static str,
    },

    /// The chain of in-flight creations grew past the configured limit.
    #[error(
        "Resolution depth limit of {max} exceeded while creating '{port_name}'\n  Hint: Raise max_resolution_depth or flatten the dependency chain"
    )]
    DepthExceeded { port_name: String, max: usize },
}

impl ResolutionError {
    /// Wraps a factory failure with the port it was creating.
    pub fn factory(port_name: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Factory {
            port_name: port_name.into(),
            source: source.into(),
        }
    }

    /// Returns the discriminant of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Disposed(_) => ErrorKind::Disposed,
            Self::ScopeRequired(_) => ErrorKind::ScopeRequired,
            Self::CircularDependency(_) => ErrorKind::CircularDependency,
            Self::Factory { .. } => ErrorKind::Factory,
            Self::UnregisteredPort(_) => ErrorKind::UnregisteredPort,
            Self::DuplicateAdapter(_) => ErrorKind::DuplicateAdapter,
            Self::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Self::DepthExceeded { .. } => ErrorKind::DepthExceeded,
        }
    }
}

/// What was already disposed when it was used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisposedTarget {
    Container,
    Scope(ScopeId),
}

impl fmt::Display for DisposedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisposedTarget::Container => write!(f, "container"),
            DisposedTarget::Scope(id) => write!(f, "{id}"),
        }
    }
}

/// Error when resolving or creating a scope after disposal.
#[derive(Debug)]
pub struct DisposedError {
    pub target: DisposedTarget,
    /// The port being resolved, `None` for `create_scope`.
    pub port_name: Option<String>,
}

impl fmt::Display for DisposedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port_name {
            Some(ref port) => write!(f, "Cannot resolve '{port}': {} has been disposed", self.target),
            None => write!(f, "Cannot create a scope: {} has been disposed", self.target),
        }
    }
}

/// Error when a scoped port is resolved from the root container.
#[derive(Debug)]
pub struct ScopeRequiredError {
    pub port_name: String,
}

impl fmt::Display for ScopeRequiredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Port '{}' is scoped and cannot be resolved from the root container", self.port_name)?;
        write!(f, "\n  Hint: Call create_scope() and resolve it through the scope")
    }
}

/// Error when a circular dependency is detected during resolve.
///
/// The chain starts at the first occurrence of the repeated port and
/// ends with the repeat, e.g. `["A", "B", "A"]`.
#[derive(Debug)]
pub struct CircularDependencyError {
    pub chain: Vec<String>,
}

impl fmt::Display for CircularDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Circular dependency detected:\n  {}", render_chain(&self.chain))?;
        write!(f, "\n  Hint: Break the cycle by removing one of the required ports")
    }
}

/// Error when no adapter provides the requested port.
#[derive(Debug)]
pub struct UnregisteredPortError {
    pub port_name: String,
    /// The port whose creation required this one, if any.
    pub required_by: Option<String>,
    /// Registered port names that look similar.
    pub suggestions: Vec<String>,
}

impl fmt::Display for UnregisteredPortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "No adapter registered for port '{}'", self.port_name)?;

        if let Some(ref parent) = self.required_by {
            write!(f, "\n  Required by: {parent}")?;
        }

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        Ok(())
    }
}

/// Error when a graph contains two adapters for one port.
#[derive(Debug)]
pub struct DuplicateAdapterError {
    pub port_name: String,
}

impl fmt::Display for DuplicateAdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "More than one adapter provides port '{}'", self.port_name)?;
        write!(f, "\n  Hint: Each port must have exactly one adapter per graph")
    }
}

/// Error returned by [`Dependencies`](crate::adapter::Dependencies) lookups
/// inside a factory.
#[derive(Debug, thiserror::Error)]
pub enum DependencyError {
    #[error("'{0}' is not a declared dependency of this adapter")]
    Undeclared(String),

    #[error("Dependency '{name}' is not a {expected}")]
    TypeMismatch { name: String, expected: &'static str },
}

/// A finalizer that failed during disposal.
#[derive(Debug, thiserror::Error)]
#[error("Finalizer for '{port_name}' failed: {source}")]
pub struct FinalizerFailure {
    pub port_name: String,
    #[source]
    pub source: BoxError,
}

/// Every finalizer failure of one disposal pass, in the order they ran.
///
/// Never empty.
#[derive(Debug)]
pub struct DisposeError {
    failures: Vec<FinalizerFailure>,
}

impl DisposeError {
    /// Turns collected failures into a result; `Ok` when there were none.
    pub(crate) fn check(failures: Vec<FinalizerFailure>) -> std::result::Result<(), DisposeError> {
        if failures.is_empty() {
            Ok(())
        } else {
            Err(DisposeError { failures })
        }
    }

    /// The first finalizer that failed.
    pub fn first(&self) -> &FinalizerFailure {
        &self.failures[0]
    }

    pub fn failures(&self) -> &[FinalizerFailure] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<FinalizerFailure> {
        self.failures
    }
}

impl fmt::Display for DisposeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} finalizer(s) failed during disposal:", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "\n  - {failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for DisposeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.first())
    }
}

/// Convenient Result type for resolution.
pub type Result<T> = std::result::Result<T, ResolutionError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn circular_dependency_display() {
        let err = ResolutionError::CircularDependency(CircularDependencyError {
            chain: vec!["A".into(), "B".into(), "A".into()],
        });

        let msg = err.to_string();
        assert!(msg.contains("Circular"));
        assert!(msg.contains("A → B → A"));
        assert_eq!(err.kind(), ErrorKind::CircularDependency);
    }

    #[test]
    fn factory_error_keeps_cause() {
        let err = ResolutionError::factory("Service", "boom");

        assert_eq!(err.kind(), ErrorKind::Factory);
        assert!(err.to_string().contains("Service"));
        assert_eq!(err.source().unwrap().to_string(), "boom");
    }

    #[test]
    fn unregistered_display_with_suggestions() {
        let err = ResolutionError::UnregisteredPort(UnregisteredPortError {
            port_name: "Loger".into(),
            required_by: Some("Database".into()),
            suggestions: vec!["Logger".into()],
        });

        let msg = err.to_string();
        assert!(msg.contains("'Loger'"));
        assert!(msg.contains("Required by: Database"));
        assert!(msg.contains("- Logger"));
    }

    #[test]
    fn disposed_display() {
        let resolve = DisposedError {
            target: DisposedTarget::Scope(ScopeId::new(3)),
            port_name: Some("Session".into()),
        };
        assert_eq!(resolve.to_string(), "Cannot resolve 'Session': scope-3 has been disposed");

        let create = DisposedError {
            target: DisposedTarget::Container,
            port_name: None,
        };
        assert_eq!(create.to_string(), "Cannot create a scope: container has been disposed");
    }

    #[test]
    fn dispose_error_surfaces_first() {
        assert!(DisposeError::check(vec![]).is_ok());

        let err = DisposeError::check(vec![
            FinalizerFailure { port_name: "Cache".into(), source: "flush failed".into() },
            FinalizerFailure { port_name: "Pool".into(), source: "close failed".into() },
        ])
        .unwrap_err();

        assert_eq!(err.failures().len(), 2);
        assert_eq!(err.first().port_name, "Cache");
        assert!(err.to_string().contains("2 finalizer(s) failed"));
        assert!(err.source().unwrap().to_string().contains("flush failed"));
    }
}
