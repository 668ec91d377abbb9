//! # Mawrid — Dependency Resolution Runtime for Rust
//!
//! Builds a resolver from an immutable graph of adapters, hands out
//! instances per lifetime, manages a tree of nested scopes and disposes
//! everything it created in reverse creation order.
//!
//! # Quick start
//! ```
//! use mawrid::prelude::*;
//! use std::sync::Arc;
//!
//! struct Config {
//!     url: String,
//! }
//!
//! struct Session {
//!     config: Arc<Config>,
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let config = Port::new("Config");
//! let session = Port::new("Session");
//!
//! let container = Container::new(Graph::new(vec![
//!     Adapter::singleton(config.clone(), |_| Ok(Config { url: "postgres://localhost".into() })),
//!     Adapter::scoped(session.clone(), |deps| {
//!         Ok(Session { config: deps.get_as::<Config>("Config")? })
//!     })
//!     .requires([config.clone()])
//!     .finalizer(|_: &Session| Ok(())),
//! ]))?;
//!
//! let scope = container.create_scope()?;
//! let current = scope.resolve_as::<Session>(&session)?;
//! assert_eq!(current.config.url, "postgres://localhost");
//!
//! scope.dispose().await?;
//! container.dispose().await?;
//! # Ok(())
//! # }
//! ```

pub use mawrid_runtime::*;
pub use mawrid_support as support;
