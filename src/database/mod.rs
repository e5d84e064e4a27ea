//! # Database
//!
//! Connection pooling and schema migrations. Query construction lives in
//! [`crate::query_builder`]; entity access lives in [`crate::repository`].
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use examhub_core::config::DatabaseConfig;
//! use examhub_core::database::DatabaseConnection;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = DatabaseConnection::connect(&DatabaseConfig::default()).await?;
//! db.migrate().await?;
//! assert!(db.health_check().await?);
//! # Ok(())
//! # }
//! ```

pub mod connection;

pub use connection::{DatabaseConnection, MIGRATOR};
