//! Adapter lifetimes.
//!
//! A lifetime determines how long a resolved instance is cached:
//! - [`Lifetime::Singleton`] — one instance for the whole container
//! - [`Lifetime::Scoped`] — one instance per [`Scope`](crate::scope::Scope)
//! - [`Lifetime::Request`] — a fresh instance on every resolve
//!
//! # Ordering
//! Lifetimes order by how long they live: `Singleton > Scoped > Request`.

use std::fmt;

use serde::Serialize;

/// Caching policy of an [`Adapter`](crate::adapter::Adapter).
///
/// # Examples
/// ```
/// use mawrid_runtime::lifetime::Lifetime;
///
/// assert!(Lifetime::Singleton > Lifetime::Scoped);
/// assert!(Lifetime::Scoped > Lifetime::Request);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifetime {
    /// One instance shared across the container and all of its scopes.
    ///
    /// Created on first resolve, finalized when the container is disposed.
    Singleton,

    /// One instance per scope.
    ///
    /// Only resolvable through a scope; finalized when that scope is disposed.
    Scoped,

    /// New instance on every resolve. Never cached, never finalized.
    Request,
}

impl Lifetime {
    /// Returns `true` if instances of this lifetime are memoized.
    #[inline]
    pub fn is_cached(&self) -> bool {
        matches!(self, Lifetime::Singleton | Lifetime::Scoped)
    }

    #[inline]
    fn ordering(&self) -> u8 {
        match self {
            Lifetime::Singleton => 2,
            Lifetime::Scoped => 1,
            Lifetime::Request => 0,
        }
    }
}

impl PartialOrd for Lifetime {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Lifetime {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.ordering().cmp(&other.ordering())
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifetime::Singleton => write!(f, "singleton"),
            Lifetime::Scoped => write!(f, "scoped"),
            Lifetime::Request => write!(f, "request"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifetime_ordering() {
        assert!(Lifetime::Singleton > Lifetime::Scoped);
        assert!(Lifetime::Scoped > Lifetime::Request);
        assert!(Lifetime::Singleton > Lifetime::Request);
    }

    #[test]
    fn lifetime_is_cached() {
        assert!(Lifetime::Singleton.is_cached());
        assert!(Lifetime::Scoped.is_cached());
        assert!(!Lifetime::Request.is_cached());
    }

    #[test]
    fn lifetime_display() {
        assert_eq!(Lifetime::Singleton.to_string(), "singleton");
        assert_eq!(Lifetime::Scoped.to_string(), "scoped");
        assert_eq!(Lifetime::Request.to_string(), "request");
    }

    #[test]
    fn lifetime_serializes_lowercase() {
        let json = serde_json::to_string(&Lifetime::Scoped).unwrap();
        assert_eq!(json, "\"scoped\"");
    }
}
