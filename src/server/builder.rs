//! ServerBuilder for fluent API to build HTTP servers

use super::composition::{DispatchEntry, RegisterRoutesOptions, compose_routes, register_controller};
use super::middleware::SharedMiddleware;
use super::router::into_router;
use crate::annotations::{Controller, Schema};
use crate::config::PipelineConfig;
use crate::core::error::PipelineError;
use crate::metadata::{MetadataStore, Registry};
use anyhow::Result;
use axum::Router;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;

type Registration =
    Box<dyn FnOnce(&Registry, &RegisterRoutesOptions, bool) -> Result<Vec<DispatchEntry>, PipelineError> + Send>;

/// Builder for creating HTTP servers from declared controllers
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new()
///     .with_config(PipelineConfig::from_yaml_file("pipeline.yaml")?)
///     .with_global_middleware(rate_limiter)
///     .declare_schema::<LoginRequest>()
///     .register_controller(AuthController::new(users))
///     .build()?;
/// ```
pub struct ServerBuilder {
    store: MetadataStore,
    configs: Vec<PipelineConfig>,
    global_middlewares: Vec<SharedMiddleware>,
    registrations: Vec<Registration>,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder with an empty metadata store
    pub fn new() -> Self {
        Self::with_store(MetadataStore::new())
    }

    /// Start from a store that already holds declarations
    pub fn with_store(store: MetadataStore) -> Self {
        Self {
            store,
            configs: Vec::new(),
            global_middlewares: Vec::new(),
            registrations: Vec::new(),
            custom_routes: Vec::new(),
        }
    }

    /// Add a configuration layer; later layers win per key
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.configs.push(config);
        self
    }

    /// Add a configuration layer read from a YAML file
    pub fn with_config_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let config = PipelineConfig::from_yaml_file(path)?;
        Ok(self.with_config(config))
    }

    /// Middleware run first on every route, in registration order
    pub fn with_global_middleware(mut self, middleware: SharedMiddleware) -> Self {
        self.global_middlewares.push(middleware);
        self
    }

    /// Add routes that are not declared through controllers
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Declare a schema type
    pub fn declare_schema<S: Schema>(mut self) -> Self {
        self.store.declare_schema::<S>();
        self
    }

    /// Declare a controller type and register a live instance of it
    pub fn register_controller<C: Controller>(mut self, controller: C) -> Self {
        self.store.declare_controller::<C>();
        let controller = Arc::new(controller);
        self.registrations.push(Box::new(move |registry, options, log| {
            if log {
                register_controller(registry, controller, options)
            } else {
                compose_routes(registry, controller, options)
            }
        }));
        self
    }

    fn options(config: &PipelineConfig, global_middlewares: Vec<SharedMiddleware>) -> RegisterRoutesOptions {
        let mut options = config.register_options();
        options.global_middlewares = global_middlewares;
        options
    }

    /// Freeze the metadata and compose every registered controller
    pub fn build_entries(self) -> Result<(Registry, Vec<DispatchEntry>, Vec<Router>)> {
        let config = PipelineConfig::merge(self.configs);
        let options = Self::options(&config, self.global_middlewares);
        let registry = self.store.freeze();

        let mut entries = Vec::new();
        for registration in self.registrations {
            entries.extend(registration(&registry, &options, config.logs_registered_routes())?);
        }

        tracing::debug!(routes = entries.len(), "route composition finished");
        Ok((registry, entries, self.custom_routes))
    }

    /// Build the final router
    pub fn build(self) -> Result<Router> {
        let (_registry, entries, custom_routes) = self.build_entries()?;

        let mut app = into_router(entries);
        for custom_router in custom_routes {
            app = app.merge(custom_router);
        }
        Ok(app)
    }

    /// Serve the application with graceful shutdown
    ///
    /// This will:
    /// - Bind to the provided address
    /// - Start serving requests
    /// - Handle SIGTERM and SIGINT (Ctrl+C) for graceful shutdown
    pub async fn serve(self, addr: &str) -> Result<()> {
        let app = self.build()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
