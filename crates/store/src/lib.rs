//! PostgreSQL access for the ordering core.
//!
//! One repository per aggregate, all sharing a `PgPool`. Queries are
//! runtime-checked (`sqlx::query`) with explicit `FLOAT8` casts at the
//! NUMERIC boundary so domain money stays `f64`. Only `confirm_order`
//! uses a multi-statement transaction; everything else is a single
//! idempotent statement.

use sqlx::postgres::{PgPool, PgPoolOptions};

use sufra_domain::config::DatabaseConfig;
use sufra_domain::error::{Error, Result};

pub mod coverage;
pub mod menu;
pub mod orders;
pub mod promo;
pub mod sessions;

pub use coverage::CoverageRepo;
pub use menu::MenuRepo;
pub use orders::{NewOrder, NewOrderLine, OrderRepo};
pub use promo::PromoRepo;
pub use sessions::SessionRepo;

/// Connect a pool from config.
pub async fn connect(cfg: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(cfg.pool_max)
        .connect(&cfg.url)
        .await
        .map_err(db_err)?;
    tracing::info!(max_connections = cfg.pool_max, "database pool ready");
    Ok(pool)
}

/// Run the bundled SQL migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| Error::Store(format!("migrations: {e}")))?;
    tracing::info!("migrations applied");
    Ok(())
}

pub(crate) fn db_err(e: sqlx::Error) -> Error {
    Error::Store(e.to_string())
}
