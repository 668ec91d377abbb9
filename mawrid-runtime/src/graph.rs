//! Adapter graphs and the port lookup built from them.
//!
//! A [`Graph`] is the immutable, ordered list of adapters a container is
//! built from. Graph validation (missing providers, cycles, captive
//! lifetimes) happens upstream; the runtime only re-checks that no port
//! is provided twice, and detects cycles lazily while resolving.

use std::collections::HashMap;
use std::sync::Arc;

use mawrid_support::rendering::suggest_similar;
use tracing::{debug, warn};

use crate::adapter::Adapter;
use crate::error::{DuplicateAdapterError, ResolutionError, UnregisteredPortError};
use crate::port::Port;

const MAX_SUGGESTIONS: usize = 3;

/// Immutable, ordered collection of adapters.
///
/// # Examples
/// ```
/// use mawrid_runtime::adapter::Adapter;
/// use mawrid_runtime::graph::Graph;
/// use mawrid_runtime::port::Port;
///
/// let graph: Graph = [
///     Adapter::singleton(Port::new("Config"), |_| Ok("debug=true")),
///     Adapter::request(Port::new("Clock"), |_| Ok(std::time::Instant::now())),
/// ]
/// .into_iter()
/// .collect();
///
/// assert_eq!(graph.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Graph {
    adapters: Arc<[Adapter]>,
}

impl Graph {
    pub fn new(adapters: Vec<Adapter>) -> Self {
        Self {
            adapters: adapters.into(),
        }
    }

    /// The adapters in declaration order.
    pub fn adapters(&self) -> &[Adapter] {
        &self.adapters
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl FromIterator<Adapter> for Graph {
    fn from_iter<I: IntoIterator<Item = Adapter>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Port → adapter lookup, built once per container.
#[derive(Debug)]
pub(crate) struct AdapterMap {
    graph: Graph,
    index: HashMap<Port, usize>,
}

impl AdapterMap {
    /// Indexes the graph by provided port.
    ///
    /// # Errors
    /// [`ResolutionError::DuplicateAdapter`] if two adapters provide the
    /// same port.
    pub fn build(graph: Graph) -> Result<Self, ResolutionError> {
        let mut index = HashMap::with_capacity(graph.len());

        for (position, adapter) in graph.adapters().iter().enumerate() {
            let port = adapter.provides().clone();
            if index.insert(port, position).is_some() {
                warn!(port = %adapter.provides(), "Duplicate adapter in graph");
                return Err(ResolutionError::DuplicateAdapter(DuplicateAdapterError {
                    port_name: adapter.provides().name().to_string(),
                }));
            }
        }

        debug!(adapters = index.len(), "Indexed adapter graph");
        Ok(Self { graph, index })
    }

    #[inline]
    pub fn get(&self, port: &Port) -> Option<&Adapter> {
        self.index.get(port).map(|&position| &self.graph.adapters()[position])
    }

    /// The adapters in declaration order.
    pub fn adapters(&self) -> &[Adapter] {
        self.graph.adapters()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Builds the error for a port with no adapter.
    pub fn unregistered(&self, port: &Port, required_by: Option<&Port>) -> ResolutionError {
        let names: Vec<&str> = self.adapters().iter().map(|a| a.provides().name()).collect();

        ResolutionError::UnregisteredPort(UnregisteredPortError {
            port_name: port.name().to_string(),
            required_by: required_by.map(|p| p.name().to_string()),
            suggestions: suggest_similar(port.name(), &names, MAX_SUGGESTIONS),
        })
    }
}
