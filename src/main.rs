//! Entitlements service binary.
//!
//! Loads configuration and the tier catalogue, wires storage adapters and
//! serves the HTTP API until interrupted.

use std::sync::Arc;

use http::HeaderValue;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use entitlements::adapters::{
    api_router, AppState, InMemoryCapacityUsageStore, InMemorySubscriptionRepository,
    PostgresCapacityUsageStore, PostgresSubscriptionRepository,
};
use entitlements::config::{
    AppConfig, ConfigError, DatabaseConfig, MigrationMode, ServerConfig, ValidationError,
};
use entitlements::domain::entitlement::{CatalogueError, EntitlementResolver};
use entitlements::observability::init_tracing;
use entitlements::ports::{CapacityUsageStore, SubscriptionRepository};

#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Logging setup failed: {0}")]
    Tracing(#[from] tracing_subscriber::util::TryInitError),

    #[error("Refusing to start with an invalid catalogue: {0}")]
    Catalogue(#[from] CatalogueError),

    #[error("Database unavailable: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Schema is behind: migration {expected} is bundled but {applied} is the latest applied")]
    PendingMigrations { expected: i64, applied: i64 },

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

type Stores = (Arc<dyn SubscriptionRepository>, Arc<dyn CapacityUsageStore>);

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(&config.server.log_level, config.server.log_format)?;

    let catalogue = config.catalogue.load().map_err(|e| {
        tracing::error!(source = %config.catalogue.source(), error = %e, "catalogue rejected");
        e
    })?;
    tracing::info!(
        source = %config.catalogue.source(),
        tiers = catalogue.tiers_by_rank().len(),
        "tier catalogue loaded"
    );
    let resolver = EntitlementResolver::new(Arc::new(catalogue));

    let (repository, usage_store) = match &config.database {
        Some(database) => connect(database).await?,
        None => {
            tracing::warn!("no database configured, subscriptions are held in memory");
            in_memory()
        }
    };

    let state = AppState::new(repository, usage_store, resolver);
    let app = api_router(state)
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(cors_layer(&config.server))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = ?config.server.environment, "entitlements listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shut down");
    Ok(())
}

async fn connect(database: &DatabaseConfig) -> Result<Stores, StartupError> {
    let pool = PgPoolOptions::new()
        .min_connections(database.min_connections)
        .max_connections(database.max_connections)
        .acquire_timeout(database.acquire_timeout())
        .connect_with(database.connect_options()?)
        .await?;

    match database.migrations {
        MigrationMode::Apply => {
            sqlx::migrate!().run(&pool).await?;
            tracing::info!("migrations applied");
        }
        MigrationMode::Verify => verify_migrations(&pool).await?,
        MigrationMode::Skip => tracing::warn!("migrations skipped"),
    }

    Ok((
        Arc::new(PostgresSubscriptionRepository::new(pool.clone())),
        Arc::new(PostgresCapacityUsageStore::new(pool)),
    ))
}

async fn verify_migrations(pool: &PgPool) -> Result<(), StartupError> {
    let expected = sqlx::migrate!()
        .iter()
        .map(|migration| migration.version)
        .max()
        .unwrap_or(0);
    let applied: Option<i64> =
        sqlx::query_scalar("SELECT MAX(version) FROM _sqlx_migrations WHERE success")
            .fetch_one(pool)
            .await?;
    let applied = applied.unwrap_or(0);

    if applied < expected {
        return Err(StartupError::PendingMigrations { expected, applied });
    }
    tracing::info!(version = applied, "schema is current");
    Ok(())
}

fn in_memory() -> Stores {
    (
        Arc::new(InMemorySubscriptionRepository::new()),
        Arc::new(InMemoryCapacityUsageStore::new()),
    )
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new().allow_origin(AllowOrigin::list(origins))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
