use super::builder::SelectQuery;
use super::conditions::quote_ident;
use sqlx::{Postgres, QueryBuilder};

/// Represents different types of SQL JOINs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
}

impl JoinType {
    pub fn to_sql(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
        }
    }
}

/// What a join reads from
#[derive(Debug, Clone)]
pub enum JoinSource {
    Table(String),
    /// A parenthesized subquery, whose bind parameters are renumbered in place
    Derived(Box<SelectQuery>),
}

/// Represents a SQL JOIN clause
#[derive(Debug, Clone)]
pub struct Join {
    pub join_type: JoinType,
    pub source: JoinSource,
    pub alias: String,
    pub on_condition: String,
}

impl Join {
    /// Create an INNER JOIN against a table
    pub fn inner(table: &str, alias: &str, on_condition: impl Into<String>) -> Self {
        Self {
            join_type: JoinType::Inner,
            source: JoinSource::Table(table.to_string()),
            alias: alias.to_string(),
            on_condition: on_condition.into(),
        }
    }

    /// Create a LEFT JOIN against a table
    pub fn left(table: &str, alias: &str, on_condition: impl Into<String>) -> Self {
        Self {
            join_type: JoinType::Left,
            source: JoinSource::Table(table.to_string()),
            alias: alias.to_string(),
            on_condition: on_condition.into(),
        }
    }

    /// Create an INNER JOIN against a derived table
    pub fn inner_derived(query: SelectQuery, alias: &str, on_condition: impl Into<String>) -> Self {
        Self {
            join_type: JoinType::Inner,
            source: JoinSource::Derived(Box::new(query)),
            alias: alias.to_string(),
            on_condition: on_condition.into(),
        }
    }

    /// Append this join to a query
    pub fn push_sql(&self, query: &mut QueryBuilder<'static, Postgres>) {
        query.push(self.join_type.to_sql());
        query.push(" ");
        match &self.source {
            JoinSource::Table(table) => {
                query.push(quote_ident(table));
            }
            JoinSource::Derived(subquery) => {
                query.push("(");
                subquery.push_sql(query);
                query.push(")");
            }
        }
        query.push(format!(
            " AS {} ON {}",
            quote_ident(&self.alias),
            self.on_condition
        ));
    }

    /// Render with positional placeholders starting at `$1`
    pub fn to_sql(&self) -> String {
        let mut query = QueryBuilder::new("");
        self.push_sql(&mut query);
        query.sql().to_string()
    }
}
