//! Adapters — the service descriptors a container resolves from.
//!
//! An [`Adapter`] binds a [`Port`] to a factory, the ports that factory
//! needs, a [`Lifetime`] and an optional finalizer.

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::{BoxError, DependencyError, ResolutionError, Result};
use crate::lifetime::Lifetime;
use crate::port::Port;

/// A resolved, type-erased service instance.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Boxed future returned by finalizers.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Type-erased factory.
///
/// Receives the already-resolved dependencies and returns the new
/// instance, or the error that is wrapped into
/// [`ResolutionError::Factory`].
pub type FactoryFn = Arc<dyn Fn(&Dependencies) -> std::result::Result<Instance, BoxError> + Send + Sync>;

/// Type-erased finalizer, run once per cached instance at disposal.
pub type FinalizerFn =
    Arc<dyn Fn(Instance) -> BoxFuture<'static, std::result::Result<(), BoxError>> + Send + Sync>;

/// Anything that resolves ports: a [`Container`](crate::container::Container)
/// or a [`Scope`](crate::scope::Scope).
pub trait Resolver {
    /// Resolves a port into a type-erased instance.
    fn resolve(&self, port: &Port) -> Result<Instance>;

    /// Resolves a port and downcasts it to `T`.
    ///
    /// # Errors
    /// Everything [`Resolver::resolve`] returns, plus
    /// [`ResolutionError::TypeMismatch`] when the instance is not a `T`.
    fn resolve_as<T: Any + Send + Sync>(&self, port: &Port) -> Result<Arc<T>>
    where
        Self: Sized,
    {
        self.resolve(port)?
            .downcast::<T>()
            .map_err(|_| ResolutionError::TypeMismatch {
                port_name: port.name().to_string(),
                expected: type_name::<T>(),
            })
    }
}

/// The dependencies handed to a factory, keyed by port name.
#[derive(Default)]
pub struct Dependencies {
    instances: HashMap<Arc<str>, Instance>,
}

impl Dependencies {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            instances: HashMap::with_capacity(capacity),
        }
    }

    pub(crate) fn insert(&mut self, name: Arc<str>, instance: Instance) {
        self.instances.insert(name, instance);
    }

    /// Returns the type-erased instance of a required port.
    pub fn get(&self, name: &str) -> Option<&Instance> {
        self.instances.get(name)
    }

    /// Returns a required port's instance as `Arc<T>`.
    ///
    /// ```rust,ignore
    /// Adapter::singleton(database, |deps| {
    ///     let logger = deps.get_as::<Logger>("Logger")?;
    ///     Ok(Database::new(logger))
    /// })
    /// ```
    pub fn get_as<T: Any + Send + Sync>(&self, name: &str) -> std::result::Result<Arc<T>, DependencyError> {
        let instance = self
            .instances
            .get(name)
            .ok_or_else(|| DependencyError::Undeclared(name.to_string()))?;

        Arc::clone(instance)
            .downcast::<T>()
            .map_err(|_| DependencyError::TypeMismatch {
                name: name.to_string(),
                expected: type_name::<T>(),
            })
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

/// Descriptor binding a port to a factory, its dependencies and a lifetime.
///
/// # Examples
/// ```
/// use mawrid_runtime::adapter::Adapter;
/// use mawrid_runtime::port::Port;
///
/// struct Logger;
/// struct Database { logger: std::sync::Arc<Logger> }
///
/// let logger = Port::new("Logger");
/// let database = Port::new("Database");
///
/// let adapters = vec![
///     Adapter::singleton(logger.clone(), |_| Ok(Logger)),
///     Adapter::singleton(database, |deps| {
///         Ok(Database { logger: deps.get_as::<Logger>("Logger")? })
///     })
///     .requires([logger]),
/// ];
/// assert_eq!(adapters[1].required_ports().len(), 1);
/// ```
#[derive(Clone)]
pub struct Adapter {
    provides: Port,
    requires: Vec<Port>,
    lifetime: Lifetime,
    factory: FactoryFn,
    finalizer: Option<FinalizerFn>,
}

impl Adapter {
    /// Creates an adapter with no requirements and no finalizer.
    pub fn new<T, F>(provides: Port, lifetime: Lifetime, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Dependencies) -> std::result::Result<T, BoxError> + Send + Sync + 'static,
    {
        Self {
            provides,
            requires: Vec::new(),
            lifetime,
            factory: Arc::new(move |deps: &Dependencies| factory(deps).map(|value| Arc::new(value) as Instance)),
            finalizer: None,
        }
    }

    /// Creates a [`Lifetime::Singleton`] adapter.
    pub fn singleton<T, F>(provides: Port, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Dependencies) -> std::result::Result<T, BoxError> + Send + Sync + 'static,
    {
        Self::new(provides, Lifetime::Singleton, factory)
    }

    /// Creates a [`Lifetime::Scoped`] adapter.
    pub fn scoped<T, F>(provides: Port, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Dependencies) -> std::result::Result<T, BoxError> + Send + Sync + 'static,
    {
        Self::new(provides, Lifetime::Scoped, factory)
    }

    /// Creates a [`Lifetime::Request`] adapter.
    pub fn request<T, F>(provides: Port, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Dependencies) -> std::result::Result<T, BoxError> + Send + Sync + 'static,
    {
        Self::new(provides, Lifetime::Request, factory)
    }

    /// Appends required ports; they are resolved in this order.
    pub fn requires(mut self, ports: impl IntoIterator<Item = Port>) -> Self {
        self.requires.extend(ports);
        self
    }

    /// Sets a synchronous finalizer.
    ///
    /// Request-lifetime instances are never cached and so never finalized.
    pub fn finalizer<T, F>(mut self, finalize: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        self.finalizer = Some(Arc::new(move |instance: Instance| {
            let result = match instance.downcast::<T>() {
                Ok(typed) => finalize(&typed),
                Err(_) => Err(finalizer_mismatch::<T>()),
            };
            Box::pin(std::future::ready(result)) as BoxFuture<'static, _>
        }));
        self
    }

    /// Sets an asynchronous finalizer. Disposal awaits it before moving on.
    pub fn async_finalizer<T, F, Fut>(mut self, finalize: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(Arc<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), BoxError>> + Send + 'static,
    {
        self.finalizer = Some(Arc::new(move |instance: Instance| match instance.downcast::<T>() {
            Ok(typed) => Box::pin(finalize(typed)) as BoxFuture<'static, _>,
            Err(_) => Box::pin(std::future::ready(Err(finalizer_mismatch::<T>()))) as BoxFuture<'static, _>,
        }));
        self
    }

    /// The port this adapter provides.
    #[inline]
    pub fn provides(&self) -> &Port {
        &self.provides
    }

    /// The ports the factory needs, in resolution order.
    #[inline]
    pub fn required_ports(&self) -> &[Port] {
        &self.requires
    }

    #[inline]
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    #[inline]
    pub fn has_finalizer(&self) -> bool {
        self.finalizer.is_some()
    }

    #[inline]
    pub(crate) fn factory(&self) -> &FactoryFn {
        &self.factory
    }

    #[inline]
    pub(crate) fn finalizer_fn(&self) -> Option<&FinalizerFn> {
        self.finalizer.as_ref()
    }
}

fn finalizer_mismatch<T>() -> BoxError {
    format!("finalizer expected an instance of {}", type_name::<T>()).into()
}

impl fmt::Debug for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapter")
            .field("provides", &self.provides)
            .field("requires", &self.requires)
            .field("lifetime", &self.lifetime)
            .field("has_finalizer", &self.finalizer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Config {
        url: &'static str,
    }

    fn deps_with_config() -> Dependencies {
        let mut deps = Dependencies::with_capacity(1);
        deps.insert(Arc::from("Config"), Arc::new(Config { url: "postgres://localhost" }));
        deps
    }

    #[test]
    fn factory_wraps_value() {
        let adapter = Adapter::singleton(Port::new("Answer"), |_| Ok(42u32));
        let instance = (adapter.factory())(&Dependencies::default()).unwrap();
        assert_eq!(*instance.downcast::<u32>().unwrap(), 42);
    }

    #[test]
    fn factory_error_passes_through() {
        let adapter = Adapter::request(Port::new("Broken"), |_| -> std::result::Result<u8, BoxError> {
            Err("boom".into())
        });
        let err = (adapter.factory())(&Dependencies::default()).err().unwrap();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn requires_keeps_order() {
        let a = Port::new("A");
        let b = Port::new("B");
        let adapter = Adapter::scoped(Port::new("C"), |_| Ok(()))
            .requires([a.clone()])
            .requires([b.clone()]);

        assert_eq!(adapter.required_ports(), &[a, b]);
        assert_eq!(adapter.lifetime(), Lifetime::Scoped);
    }

    #[test]
    fn dependencies_get_as() {
        let deps = deps_with_config();
        let config = deps.get_as::<Config>("Config").unwrap();
        assert_eq!(config.url, "postgres://localhost");
        assert_eq!(deps.len(), 1);
    }

    #[test]
    fn dependencies_undeclared() {
        let deps = deps_with_config();
        assert!(matches!(
            deps.get_as::<Config>("Logger"),
            Err(DependencyError::Undeclared(name)) if name == "Logger"
        ));
    }

    #[test]
    fn dependencies_type_mismatch() {
        let deps = deps_with_config();
        let err = deps.get_as::<String>("Config").unwrap_err();
        assert!(err.to_string().contains("String"));
    }

    #[tokio::test]
    async fn sync_finalizer_runs() {
        let adapter = Adapter::singleton(Port::new("Value"), |_| Ok(7i32))
            .finalizer(|value: &i32| if *value == 7 { Ok(()) } else { Err("wrong".into()) });

        let finalize = adapter.finalizer_fn().unwrap();
        assert!(finalize(Arc::new(7i32)).await.is_ok());
        assert!(finalize(Arc::new("text")).await.is_err());
    }

    #[tokio::test]
    async fn async_finalizer_runs() {
        let adapter = Adapter::singleton(Port::new("Value"), |_| Ok(1u8))
            .async_finalizer(|value: Arc<u8>| async move {
                tokio::task::yield_now().await;
                assert_eq!(*value, 1);
                Ok::<(), BoxError>(())
            });

        assert!(adapter.has_finalizer());
        let finalize = adapter.finalizer_fn().unwrap();
        assert!(finalize(Arc::new(1u8)).await.is_ok());
    }
}
