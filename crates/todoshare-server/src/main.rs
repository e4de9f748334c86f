use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use todoshare_core::model::{User, UserId};
use todoshare_core::role::Role;
use todoshare_server::cli::{Cli, Command};
use todoshare_server::config::{AppConfig, LogFormat, StorageBackend};
use todoshare_server::middleware::AuthState;
use todoshare_server::rest::{self, AppState};
use todoshare_server::service::TodoService;
use todoshare_storage::postgres::migrations::run_migrations;
use todoshare_storage::{Database, InMemoryDatabase, PostgresDatabase, Transaction, UserStore};

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    let registry = tracing_subscriber::registry().with(filter);

    match config.log.format {
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer().json();
            registry.with(fmt_layer).init();
        }
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer().pretty();
            registry.with(fmt_layer).init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;
    init_logging(&config);

    match cli.command {
        Some(Command::Migrate) => run_migrate(&config).await,
        Some(Command::CreateUser { email, role }) => run_create_user(&config, &email, &role).await,
        Some(Command::Serve) | None => run_serve(config).await,
    }
}

async fn connect(config: &AppConfig) -> Result<sqlx::PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
}

async fn run_migrate(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("running database migrations");
    let pool = connect(config).await?;
    run_migrations(&pool).await?;
    tracing::info!("migrations completed successfully");
    Ok(())
}

async fn run_create_user(
    config: &AppConfig,
    email: &str,
    role: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let role = Role::from(role);
    if !role.is_valid() {
        return Err(format!("unknown role '{role}', expected reader, writer or admin").into());
    }

    let pool = connect(config).await?;
    run_migrations(&pool).await?;

    let now = Utc::now();
    let user = User {
        id: UserId::generate(),
        email: email.to_string(),
        github_id: None,
        role,
        created_at: now,
        updated_at: now,
    };
    let db = PostgresDatabase::new(pool);
    let mut tx = db.begin().await?;
    tx.create_user(&user).await?;
    tx.commit().await?;

    println!("User created successfully");
    println!("  Email:   {}", user.email);
    println!("  Role:    {}", user.role);
    println!("  User ID: {}", user.id);
    Ok(())
}

async fn run_serve(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let auth = AuthState::hs256(config.require_jwt_secret()?.as_bytes());

    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("using in-memory storage, data will not survive a restart");
            serve(&config, Arc::new(InMemoryDatabase::new()), auth).await
        }
        StorageBackend::Postgres => {
            let pool = connect(&config).await?;
            run_migrations(&pool).await?;
            serve(&config, Arc::new(PostgresDatabase::new(pool)), auth).await
        }
    }
}

async fn serve<D: Database + 'static>(
    config: &AppConfig,
    db: Arc<D>,
    auth: AuthState,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr: std::net::SocketAddr = config.http_addr().parse()?;
    tracing::info!(
        %addr,
        backend = ?config.storage.backend,
        timeout_ms = config.request.timeout_ms,
        "starting todoshare server"
    );

    let state = AppState {
        service: Arc::new(TodoService::new(db)),
    };
    let router = rest::create_router(state, auth, config.request_timeout());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "HTTP server listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = ctrl_c => { tracing::info!("received SIGINT"); }
                _ = sigterm.recv() => { tracing::info!("received SIGTERM"); }
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to register SIGTERM handler, using SIGINT only");
            let _ = ctrl_c.await;
            tracing::info!("received SIGINT");
        }
    }
}
