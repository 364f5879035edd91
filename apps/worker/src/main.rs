//! Docvault grant reconciliation worker.

#![forbid(unsafe_code)]

use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use docvault_application::GrantReconciliationService;
use docvault_core::{AppError, AppResult};
use docvault_infrastructure::{
    PostgresAuditRepository, PostgresPermissionGrantRepository, SystemClock,
};

use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

static MIGRATOR: Migrator = sqlx::migrate!("../../crates/infrastructure/migrations");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerMode {
    Run,
    Once,
    Migrate,
}

impl WorkerMode {
    fn from_arg(arg: Option<&str>) -> AppResult<Self> {
        match arg {
            None | Some("run") => Ok(Self::Run),
            Some("once") => Ok(Self::Once),
            Some("migrate") => Ok(Self::Migrate),
            Some(other) => Err(AppError::Validation(format!(
                "unknown worker mode '{other}', expected one of: run, once, migrate"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
struct WorkerConfig {
    database_url: String,
    interval_seconds: u64,
    batch_size: usize,
    max_connections: u32,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let mode = WorkerMode::from_arg(env::args().nth(1).as_deref())?;
    let config = WorkerConfig::load()?;
    let pool = connect_pool(&config).await?;

    MIGRATOR
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    if mode == WorkerMode::Migrate {
        info!("migrations applied");
        return Ok(());
    }

    let reconciliation_service = build_reconciliation_service(pool, config.batch_size)?;

    if mode == WorkerMode::Once {
        let report = reconciliation_service.sweep().await?;
        info!(
            scanned = report.scanned,
            expired = report.expired,
            "reconciliation sweep finished"
        );
        return Ok(());
    }

    info!(
        interval_seconds = config.interval_seconds,
        batch_size = config.batch_size,
        "docvault-worker started"
    );

    let mut interval = tokio::time::interval(Duration::from_secs(config.interval_seconds));
    loop {
        tokio::select! {
            _ = interval.tick() => {
                match reconciliation_service.sweep().await {
                    Ok(report) if report.expired > 0 => info!(
                        scanned = report.scanned,
                        expired = report.expired,
                        "reconciliation sweep expired grants"
                    ),
                    Ok(_) => {}
                    Err(error) => warn!(error = %error, "reconciliation sweep failed"),
                }
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(error) = signal {
                    warn!(error = %error, "failed to listen for shutdown signal");
                }
                info!("docvault-worker stopping");
                return Ok(());
            }
        }
    }
}

async fn connect_pool(config: &WorkerConfig) -> AppResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(config.database_url.as_str())
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))
}

fn build_reconciliation_service(
    pool: PgPool,
    batch_size: usize,
) -> AppResult<GrantReconciliationService> {
    let grant_repository = Arc::new(PostgresPermissionGrantRepository::new(pool.clone()));
    let audit_repository = Arc::new(PostgresAuditRepository::new(pool));

    GrantReconciliationService::new(
        grant_repository,
        audit_repository,
        Arc::new(SystemClock),
        batch_size,
    )
}

impl WorkerConfig {
    fn load() -> AppResult<Self> {
        let database_url = required_env("DATABASE_URL")?;
        let interval_seconds = parse_env("RECONCILE_INTERVAL_SECONDS", 60_u64)?;
        let batch_size = parse_env("RECONCILE_BATCH_SIZE", 500_usize)?;
        let max_connections = parse_env("DATABASE_MAX_CONNECTIONS", 5_u32)?;

        Self::validated(database_url, interval_seconds, batch_size, max_connections)
    }

    fn validated(
        database_url: String,
        interval_seconds: u64,
        batch_size: usize,
        max_connections: u32,
    ) -> AppResult<Self> {
        if interval_seconds == 0 {
            return Err(AppError::Validation(
                "RECONCILE_INTERVAL_SECONDS must be greater than zero".to_owned(),
            ));
        }

        if batch_size == 0 {
            return Err(AppError::Validation(
                "RECONCILE_BATCH_SIZE must be greater than zero".to_owned(),
            ));
        }

        if max_connections == 0 {
            return Err(AppError::Validation(
                "DATABASE_MAX_CONNECTIONS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            database_url,
            interval_seconds,
            batch_size,
            max_connections,
        })
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> AppResult<String> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn parse_env<T>(name: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(name, env::var(name).ok(), default)
}

fn parse_value<T>(name: &str, raw: Option<String>, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(value) => value.trim().parse::<T>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        None => Ok(default),
    }
}
