//! Database operations for storefront `PostgreSQL`.
//!
//! # Database: `loomline_storefront`
//!
//! Stores local data only (Shopify is source of truth for products and
//! checkout sessions):
//!
//! ## Tables
//!
//! - `sessions` - Tower-sessions storage (cart items, checkout ids)
//!
//! # Migrations
//!
//! The sessions table comes from the `tower-sessions-sqlx-store` schema;
//! run its migration against the database before first start.

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
