use super::conditions::{qualify_column, quote_ident};
use super::{Join, Pagination, WhereClause};
use sqlx::postgres::PgRow;
use sqlx::{Executor, Postgres, QueryBuilder};

/// Parameterized SELECT builder
///
/// Every clause is rendered into a single [`sqlx::QueryBuilder`], so bind
/// placeholders are numbered in the order they appear in the final SQL, derived
/// subqueries included.
#[derive(Debug, Clone)]
pub struct SelectQuery {
    table: String,
    alias: String,
    select_fields: Vec<String>,
    joins: Vec<Join>,
    where_clauses: Vec<WhereClause>,
    group_by: Vec<String>,
    having: Vec<WhereClause>,
    order_by: Vec<String>,
    pagination: Option<Pagination>,
}

impl SelectQuery {
    /// Create a new query over `table AS alias`, selecting every column of the alias
    pub fn new(table: &str, alias: &str) -> Self {
        Self {
            table: table.to_string(),
            alias: alias.to_string(),
            select_fields: vec![format!("{}.*", quote_ident(alias))],
            joins: Vec::new(),
            where_clauses: Vec::new(),
            group_by: Vec::new(),
            having: Vec::new(),
            order_by: Vec::new(),
            pagination: None,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Set specific fields to select
    pub fn select(mut self, fields: Vec<String>) -> Self {
        self.select_fields = fields;
        self
    }

    /// Add a JOIN clause; a second join under an alias already present is ignored
    pub fn join(mut self, join: Join) -> Self {
        if !self.has_join(&join.alias) {
            self.joins.push(join);
        }
        self
    }

    pub fn has_join(&self, alias: &str) -> bool {
        self.joins.iter().any(|join| join.alias == alias)
    }

    /// Add a WHERE clause, skipping empty ones
    pub fn where_clause(mut self, clause: WhereClause) -> Self {
        if !clause.is_empty() {
            self.where_clauses.push(clause);
        }
        self
    }

    /// Add GROUP BY clause
    pub fn group_by(mut self, field: impl Into<String>) -> Self {
        self.group_by.push(field.into());
        self
    }

    /// Add HAVING clause
    pub fn having_clause(mut self, clause: WhereClause) -> Self {
        if !clause.is_empty() {
            self.having.push(clause);
        }
        self
    }

    /// Add a pre-rendered ORDER BY term
    pub fn order_by(mut self, term: impl Into<String>) -> Self {
        self.order_by.push(term.into());
        self
    }

    /// Add ORDER BY ASC on a column of the base alias
    pub fn order_asc(self, column: &str) -> Self {
        let term = format!("{} ASC", qualify_column(&self.alias, column));
        self.order_by(term)
    }

    /// Add ORDER BY DESC on a column of the base alias
    pub fn order_desc(self, column: &str) -> Self {
        let term = format!("{} DESC", qualify_column(&self.alias, column));
        self.order_by(term)
    }

    /// Add pagination (LIMIT/OFFSET)
    pub fn paginate(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    /// Add LIMIT clause
    pub fn limit(mut self, limit: u32) -> Self {
        match self.pagination {
            Some(ref mut pagination) => pagination.limit = Some(limit),
            None => self.pagination = Some(Pagination::limit_only(limit)),
        }
        self
    }

    /// The same query reduced to `COUNT(*)`, without ordering or pagination
    pub fn count_query(&self) -> Self {
        let mut count = self.clone();
        count.select_fields = vec!["COUNT(*)".to_string()];
        count.order_by.clear();
        count.pagination = None;
        count
    }

    /// The same query reduced to one column of the base alias, without ordering or pagination
    pub fn column_query(&self, column: &str) -> Self {
        let mut ids = self.clone();
        ids.select_fields = vec![qualify_column(&self.alias, column)];
        ids.order_by.clear();
        ids.pagination = None;
        ids
    }

    /// Append the full statement to an existing builder
    pub fn push_sql(&self, query: &mut QueryBuilder<'static, Postgres>) {
        query.push("SELECT ");
        query.push(self.select_fields.join(", "));
        query.push(format!(
            " FROM {} AS {}",
            quote_ident(&self.table),
            quote_ident(&self.alias)
        ));

        for join in &self.joins {
            query.push(" ");
            join.push_sql(query);
        }

        push_clauses(query, " WHERE ", &self.where_clauses);

        if !self.group_by.is_empty() {
            query.push(format!(" GROUP BY {}", self.group_by.join(", ")));
        }

        push_clauses(query, " HAVING ", &self.having);

        if !self.order_by.is_empty() {
            query.push(format!(" ORDER BY {}", self.order_by.join(", ")));
        }

        if let Some(ref pagination) = self.pagination {
            query.push(pagination.to_sql());
        }
    }

    /// Build an executable builder with every value bound
    pub fn build(&self) -> QueryBuilder<'static, Postgres> {
        let mut query = QueryBuilder::new("");
        self.push_sql(&mut query);
        query
    }

    /// Render the SQL text with positional placeholders
    pub fn to_sql(&self) -> String {
        self.build().sql().to_string()
    }

    /// Execute the query and return all rows
    pub async fn fetch_all<'e, T, E>(&self, executor: E) -> Result<Vec<T>, sqlx::Error>
    where
        T: for<'r> sqlx::FromRow<'r, PgRow> + Send + Unpin,
        E: Executor<'e, Database = Postgres>,
    {
        let mut query = self.build();
        query.build_query_as::<T>().fetch_all(executor).await
    }

    /// Execute the query and return the integer first column of every row
    pub async fn fetch_ids<'e, E>(&self, executor: E) -> Result<Vec<i32>, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut query = self.build();
        query.build_query_scalar::<i32>().fetch_all(executor).await
    }

    /// Execute count query
    pub async fn count<'e, E>(&self, executor: E) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut query = self.count_query().build();
        query.build_query_scalar::<i64>().fetch_one(executor).await
    }
}

fn push_clauses(query: &mut QueryBuilder<'static, Postgres>, keyword: &str, clauses: &[WhereClause]) {
    if clauses.is_empty() {
        return;
    }

    query.push(keyword);
    for (index, clause) in clauses.iter().enumerate() {
        if index > 0 {
            query.push(" AND ");
        }
        clause.push_sql(query);
    }
}
