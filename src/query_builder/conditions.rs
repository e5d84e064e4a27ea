use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};

/// Quote a single SQL identifier, doubling any embedded quote
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Qualify a column with its table alias: `"alias"."column"`
///
/// A column that already carries the alias prefix (`alias.column`) is split
/// instead of being quoted as one identifier, so nested compilation under a
/// relation alias stays well-formed.
pub fn qualify_column(alias: &str, column: &str) -> String {
    if alias.is_empty() {
        return quote_ident(column);
    }

    let bare = column
        .strip_prefix(alias)
        .and_then(|rest| rest.strip_prefix('.'))
        .unwrap_or(column);

    format!("{}.{}", quote_ident(alias), quote_ident(bare))
}

/// A value bound as a query parameter
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Int(i32),
    BigInt(i64),
    Bool(bool),
    Text(String),
    Timestamp(DateTime<Utc>),
    IntArray(Vec<i32>),
    TextArray(Vec<String>),
}

impl SqlValue {
    /// Whether this is the zero value of its type, which filters treat as absent
    pub fn is_zero(&self) -> bool {
        match self {
            SqlValue::Int(v) => *v == 0,
            SqlValue::BigInt(v) => *v == 0,
            // false is a meaningful filter value; absence is modelled with Option upstream
            SqlValue::Bool(_) => false,
            SqlValue::Text(v) => v.is_empty(),
            SqlValue::Timestamp(v) => *v == DateTime::<Utc>::default(),
            SqlValue::IntArray(v) => v.is_empty(),
            SqlValue::TextArray(v) => v.is_empty(),
        }
    }

    /// Push this value as the next positional bind parameter
    pub fn push_bind(&self, query: &mut QueryBuilder<'static, Postgres>) {
        match self {
            SqlValue::Int(v) => query.push_bind(*v),
            SqlValue::BigInt(v) => query.push_bind(*v),
            SqlValue::Bool(v) => query.push_bind(*v),
            SqlValue::Text(v) => query.push_bind(v.clone()),
            SqlValue::Timestamp(v) => query.push_bind(*v),
            SqlValue::IntArray(v) => query.push_bind(v.clone()),
            SqlValue::TextArray(v) => query.push_bind(v.clone()),
        };
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Int(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::BigInt(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(value: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(value)
    }
}

impl From<Vec<i32>> for SqlValue {
    fn from(value: Vec<i32>) -> Self {
        SqlValue::IntArray(value)
    }
}

impl From<Vec<String>> for SqlValue {
    fn from(value: Vec<String>) -> Self {
        SqlValue::TextArray(value)
    }
}

impl From<&[i32]> for SqlValue {
    fn from(value: &[i32]) -> Self {
        SqlValue::IntArray(value.to_vec())
    }
}

impl From<&[String]> for SqlValue {
    fn from(value: &[String]) -> Self {
        SqlValue::TextArray(value.to_vec())
    }
}

/// Comparison used by range predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOp {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl RangeOp {
    pub fn to_sql(&self) -> &'static str {
        match self {
            RangeOp::Eq => "=",
            RangeOp::Lt => "<",
            RangeOp::Lte => "<=",
            RangeOp::Gt => ">",
            RangeOp::Gte => ">=",
        }
    }
}

/// The closed set of predicates the filter compiler emits
///
/// Column names are expected to be already alias-qualified; every value is
/// sent as a bind parameter, never interpolated.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `column = ANY($n)`
    Equals { column: String, values: SqlValue },
    /// `NOT (column = ANY($n))`
    NotEquals { column: String, values: SqlValue },
    /// `column <op> $n`
    Range {
        column: String,
        op: RangeOp,
        value: SqlValue,
    },
    /// `column LIKE $n`
    Pattern { column: String, pattern: String },
    /// `column ILIKE $n`
    CaseInsensitivePattern { column: String, pattern: String },
    /// `COUNT(column) >= $n`, used in HAVING clauses of relation subqueries
    RelationCount { column: String, min: i64 },
}

impl Predicate {
    /// Append this predicate to a query, binding its value
    pub fn push_sql(&self, query: &mut QueryBuilder<'static, Postgres>) {
        match self {
            Predicate::Equals { column, values } => {
                query.push(format!("{column} = ANY("));
                values.push_bind(query);
                query.push(")");
            }
            Predicate::NotEquals { column, values } => {
                query.push(format!("NOT ({column} = ANY("));
                values.push_bind(query);
                query.push("))");
            }
            Predicate::Range { column, op, value } => {
                query.push(format!("{column} {} ", op.to_sql()));
                value.push_bind(query);
            }
            Predicate::Pattern { column, pattern } => {
                query.push(format!("{column} LIKE "));
                query.push_bind(pattern.clone());
            }
            Predicate::CaseInsensitivePattern { column, pattern } => {
                query.push(format!("{column} ILIKE "));
                query.push_bind(pattern.clone());
            }
            Predicate::RelationCount { column, min } => {
                query.push(format!("COUNT({column}) >= "));
                query.push_bind(*min);
            }
        }
    }

    /// Render with positional placeholders starting at `$1`
    pub fn to_sql(&self) -> String {
        let mut query = QueryBuilder::new("");
        self.push_sql(&mut query);
        query.sql().to_string()
    }
}

/// Represents a group of predicates joined by one logical operator
#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    pub conditions: Vec<Predicate>,
    pub operator: LogicalOperator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

impl WhereClause {
    /// A clause holding a single predicate
    pub fn single(predicate: Predicate) -> Self {
        Self {
            conditions: vec![predicate],
            operator: LogicalOperator::And,
        }
    }

    /// Combine multiple predicates with AND
    pub fn and(conditions: Vec<Predicate>) -> Self {
        Self {
            conditions,
            operator: LogicalOperator::And,
        }
    }

    /// Combine multiple predicates with OR
    pub fn or(conditions: Vec<Predicate>) -> Self {
        Self {
            conditions,
            operator: LogicalOperator::Or,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Append this clause to a query
    ///
    /// OR groups are always parenthesized so they stay a single term when
    /// ANDed with sibling clauses.
    pub fn push_sql(&self, query: &mut QueryBuilder<'static, Postgres>) {
        if self.conditions.is_empty() {
            query.push("TRUE");
            return;
        }

        let wrap = self.operator == LogicalOperator::Or || self.conditions.len() > 1;
        let separator = match self.operator {
            LogicalOperator::And => " AND ",
            LogicalOperator::Or => " OR ",
        };

        if wrap {
            query.push("(");
        }
        for (index, condition) in self.conditions.iter().enumerate() {
            if index > 0 {
                query.push(separator);
            }
            condition.push_sql(query);
        }
        if wrap {
            query.push(")");
        }
    }

    /// Render with positional placeholders starting at `$1`
    pub fn to_sql(&self) -> String {
        let mut query = QueryBuilder::new("");
        self.push_sql(&mut query);
        query.sql().to_string()
    }
}
