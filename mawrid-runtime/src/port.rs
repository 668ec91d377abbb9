//! Port identity tokens.
//!
//! A [`Port`] names a service capability. Ports are compared by
//! *identity*, not by name: two calls to [`Port::new`] with the same
//! name produce two different ports. The name is only used for error
//! messages, hook events and as the key of a factory's dependency map.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Serialize, Serializer};

/// Identifies a service capability in a [`Graph`](crate::graph::Graph).
///
/// Cloning a port is cheap and the clone stays equal to the original.
///
/// # Examples
/// ```
/// use mawrid_runtime::port::Port;
///
/// let logger = Port::new("Logger");
/// assert_eq!(logger.name(), "Logger");
/// assert_eq!(logger, logger.clone());
///
/// // Same name, different identity.
/// assert_ne!(logger, Port::new("Logger"));
/// ```
#[derive(Clone)]
pub struct Port {
    name: Arc<str>,
}

impl Port {
    /// Creates a new, unique port.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self { name: name.into() }
    }

    /// Returns the display name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a shared handle to the display name.
    #[inline]
    pub(crate) fn shared_name(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    #[inline]
    fn addr(&self) -> *const u8 {
        Arc::as_ptr(&self.name) as *const u8
    }
}

impl PartialEq for Port {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.name, &other.name)
    }
}

impl Eq for Port {}

impl Hash for Port {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl fmt::Debug for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Port({})", self.name)
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl Serialize for Port {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn clone_is_equal() {
        let port = Port::new("Database");
        assert_eq!(port, port.clone());
    }

    #[test]
    fn same_name_is_not_same_port() {
        assert_ne!(Port::new("Database"), Port::new("Database"));
    }

    #[test]
    fn port_in_hashmap() {
        let logger = Port::new("Logger");
        let db = Port::new("Database");

        let mut map = HashMap::new();
        map.insert(logger.clone(), "logger");
        map.insert(db.clone(), "db");

        assert_eq!(map.get(&logger), Some(&"logger"));
        assert_eq!(map.get(&Port::new("Logger")), None);
    }

    #[test]
    fn display_and_debug() {
        let port = Port::new("Cache");
        assert_eq!(format!("{port}"), "Cache");
        assert_eq!(format!("{port:?}"), "Port(Cache)");
    }

    #[test]
    fn serializes_as_name() {
        let json = serde_json::to_string(&Port::new("Mailer")).unwrap();
        assert_eq!(json, "\"Mailer\"");
    }
}
