//! Basic example of the Mawrid runtime.

use std::sync::Arc;

use mawrid::prelude::*;

// === Define your services ===

trait Logger: Send + Sync {
    fn log(&self, msg: &str);
}

struct ConsoleLogger;

impl Logger for ConsoleLogger {
    fn log(&self, msg: &str) {
        println!("[LOG] {msg}");
    }
}

struct Config {
    database_url: String,
    debug: bool,
}

struct Database {
    url: String,
    logger: Arc<dyn Logger>,
}

impl Database {
    fn query(&self, sql: &str) -> String {
        self.logger.log(&format!("Executing: {sql}"));
        format!("Results from {}", self.url)
    }
}

struct UserRepository {
    db: Arc<Database>,
}

impl UserRepository {
    fn find_user(&self, id: u64) -> String {
        self.db.query(&format!("SELECT * FROM users WHERE id = {id}"))
    }
}

struct UserService {
    repo: Arc<UserRepository>,
    logger: Arc<dyn Logger>,
}

impl UserService {
    fn get_user(&self, id: u64) -> String {
        self.logger.log(&format!("Getting user {id}"));
        self.repo.find_user(id)
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("mawrid=debug,mawrid_runtime=debug")
        .init();

    let config = Port::new("Config");
    let logger = Port::new("Logger");
    let database = Port::new("Database");
    let repository = Port::new("UserRepository");
    let service = Port::new("UserService");

    let graph = Graph::new(vec![
        // Config — singleton
        Adapter::singleton(config.clone(), |_| {
            Ok(Config {
                database_url: "postgres://localhost/myapp".to_string(),
                debug: true,
            })
        }),
        // Logger — singleton behind a trait object
        Adapter::singleton(logger.clone(), |_| Ok(Arc::new(ConsoleLogger) as Arc<dyn Logger>)),
        // Database — singleton (depends on Config + Logger), closed on dispose
        Adapter::singleton(database.clone(), |deps| {
            let config = deps.get_as::<Config>("Config")?;
            let logger = deps.get_as::<Arc<dyn Logger>>("Logger")?;
            Ok(Database {
                url: config.database_url.clone(),
                logger: Arc::clone(&*logger),
            })
        })
        .requires([config.clone(), logger.clone()])
        .async_finalizer(|db: Arc<Database>| async move {
            db.logger.log(&format!("Closing connection to {}", db.url));
            Ok::<(), BoxError>(())
        }),
        // UserRepository — scoped (one per request)
        Adapter::scoped(repository.clone(), |deps| {
            Ok(UserRepository {
                db: deps.get_as::<Database>("Database")?,
            })
        })
        .requires([database.clone()])
        .finalizer(|_: &UserRepository| {
            println!("🧹 Request repository released");
            Ok(())
        }),
        // UserService — request (new each time)
        Adapter::request(service.clone(), |deps| {
            let logger = deps.get_as::<Arc<dyn Logger>>("Logger")?;
            Ok(UserService {
                repo: deps.get_as::<UserRepository>("UserRepository")?,
                logger: Arc::clone(&*logger),
            })
        })
        .requires([repository.clone(), logger.clone()]),
    ]);

    let container = Container::builder(graph)
        .hooks(ResolutionHooks::new().after_resolve(|outcome| {
            let indent = "  ".repeat(outcome.info.depth);
            let status = if outcome.is_success() { "ok" } else { "failed" };
            println!(
                "{indent}↳ {} [{}] {status} in {:?}",
                outcome.info.port_name, outcome.info.lifetime, outcome.duration
            );
        }))
        .build()?;

    println!("✅ Container built successfully!");
    println!("{container:?}");

    // === Resolve from root container ===
    let cfg = container.resolve_as::<Config>(&config)?;
    println!("📋 Config: database_url={}, debug={}", cfg.database_url, cfg.debug);

    // Scoped ports need a scope.
    if let Err(err) = container.resolve(&repository) {
        println!("⚠️  {err}");
    }

    // === Create a scope (e.g., for an HTTP request) ===
    let scope = container.create_scope()?;

    let first = scope.resolve_as::<UserService>(&service)?;
    println!("👤 {}", first.get_user(42));

    // Resolve again in the same scope — UserRepository is reused
    let second = scope.resolve_as::<UserService>(&service)?;
    println!("👤 {}", second.get_user(7));
    println!("🔁 Same repository: {}", Arc::ptr_eq(&first.repo, &second.repo));

    println!("\n{}", container.inspect());

    scope.dispose().await?;
    container.dispose().await?;

    println!("\n🎉 Everything works!");
    Ok(())
}
