use journal_portal::{
    AppState,
    auth::{IdentityState, SessionResolver},
    config::{AppConfig, Env},
    create_router,
    directory::{DirectoryState, SupabaseDirectory},
    repository::{PostgresRepository, RepositoryState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Initializes configuration, logging, the database pool, the identity and directory
/// services, and the HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast on missing production secrets).
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging. RUST_LOG wins; otherwise verbose defaults for this crate.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "journal_portal=debug,tower_http=info,axum=trace".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // JSON lines for the log aggregator.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);
    if config.env == Env::Local {
        tracing::warn!(
            "running in Local mode: the x-user-id header is accepted as a session. Set APP_ENV=production for deployments"
        );
    }

    // 3. Database.
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;

    // 4. Identity and directory services.
    let identity = Arc::new(SessionResolver::new(repo.clone(), &config)) as IdentityState;
    let directory = Arc::new(
        SupabaseDirectory::from_config(&config).expect("FATAL: Failed to build directory client."),
    ) as DirectoryState;

    // 5. Route tables, built once and shared read-only.
    let routes = Arc::new(config.route_table());
    tracing::info!(
        prefix_match = ?routes.prefix_match,
        protected = routes.protected_prefixes.len(),
        roles = routes.role_routes.len(),
        "authorization gate configured"
    );

    let bind_addr = config.bind_addr.clone();
    let app_state = AppState {
        repo,
        identity,
        directory,
        routes,
        config,
    };

    // 6. Router and server.
    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind listener. Check BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {}", e);
    }
}
