#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Examhub Core
//!
//! Query-safety core for the exam content API: professions, qualifications,
//! exam questions and users, served through a typed query interface over
//! PostgreSQL.
//!
//! ## Overview
//!
//! Clients send structured filters, free-form sort expressions, page windows
//! and arbitrarily nested selections. This crate turns all of that into
//! bounded, parameterized SQL and refuses work that would be too expensive
//! before it reaches the database.
//!
//! ## Key Features
//!
//! - **Filter Compilation**: Typed filters lower to bound predicates and joins, never string-spliced SQL
//! - **Sort Sanitization**: Untrusted `column direction` strings become quoted, whitelisted ORDER BY terms
//! - **Complexity Admission**: Requests are priced up front and rejected over budget
//! - **Batch Loading**: Per-request, debounced, memoizing loaders remove N+1 lookups
//!
//! ## Module Organization
//!
//! - [`query_builder`] - Parameterized SELECT construction and sort sanitization
//! - [`filter`] - Field descriptors, filter trees and the filter compiler
//! - [`complexity`] - Cost model and admission check
//! - [`loader`] - Request-scoped batch loader and cancellation
//! - [`models`] - Row types, descriptor tables and typed filter inputs
//! - [`repository`] - Fetch path and write operations per entity
//! - [`resolver`] - Entry points and per-request context
//! - [`config`] - Layered configuration
//! - [`database`] - Connection pooling and migrations
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use examhub_core::config::ConfigManager;
//! use examhub_core::database::DatabaseConnection;
//! use examhub_core::resolver::Resolver;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! examhub_core::logging::init_structured_logging();
//!
//! let manager = ConfigManager::load()?;
//! let db = DatabaseConnection::connect(&manager.config().database).await?;
//! db.migrate().await?;
//!
//! let resolver = Resolver::new(db.pool().clone(), manager.config());
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! Database tests use SQLx native testing with a fresh database per test:
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # All tests, DATABASE_URL required
//! ```

pub mod background;
pub mod complexity;
pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod filter;
pub mod loader;
pub mod logging;
pub mod models;
pub mod query_builder;
pub mod repository;
pub mod resolver;

pub use complexity::{ComplexityError, ComplexityEstimator, CostModel, CostRequest};
pub use config::{ConfigManager, ExamhubConfig};
pub use database::DatabaseConnection;
pub use error::{ExamhubError, Result};
pub use filter::{FilterCompiler, FilterInput, FilterNode};
pub use loader::{BatchFn, BatchLoader, CancellationSignal, LoadError};
pub use query_builder::{SelectQuery, SortSanitizer};
pub use repository::{FetchConfig, ListResult, Repositories};
pub use resolver::{RequestContext, Resolver};
