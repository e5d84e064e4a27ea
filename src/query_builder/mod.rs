//! # Query Builder
//!
//! Parameterized SELECT construction on top of [`sqlx::QueryBuilder`].
//!
//! ## Key Components
//!
//! - [`builder`] - [`SelectQuery`], the statement builder and executor
//! - [`conditions`] - Predicates, bound values and WHERE/HAVING groups
//! - [`joins`] - Table and derived-table JOIN clauses
//! - [`pagination`] - LIMIT/OFFSET with per-entity clamping
//! - [`sort`] - Sanitization of client-supplied ORDER BY expressions
//!
//! Identifiers are always quoted and alias-qualified; values always travel as
//! bind parameters. Only integers that have already been clamped are rendered
//! as literals.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use examhub_core::query_builder::{Predicate, SelectQuery, WhereClause, qualify_column};
//!
//! let query = SelectQuery::new("professions", "profession")
//!     .where_clause(WhereClause::single(Predicate::Equals {
//!         column: qualify_column("profession", "id"),
//!         values: vec![1, 2].into(),
//!     }))
//!     .order_desc("created_at")
//!     .limit(10);
//! let rows: Vec<Profession> = query.fetch_all(&pool).await?;
//! ```

pub mod builder;
pub mod conditions;
pub mod joins;
pub mod pagination;
pub mod sort;

pub use builder::SelectQuery;
pub use conditions::{
    qualify_column, quote_ident, LogicalOperator, Predicate, RangeOp, SqlValue, WhereClause,
};
pub use joins::{Join, JoinSource, JoinType};
pub use pagination::{PageLimits, Pagination};
pub use sort::{SortDirection, SortKey, SortSanitizer};
