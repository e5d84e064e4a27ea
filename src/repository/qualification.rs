use super::{fetch_list, list_query, FetchConfig, ListResult};
use crate::error::{ExamhubError, Result};
use crate::filter::{EntitySchema, FilterCompiler, FilterInput};
use crate::logging::log_write_operation;
use crate::models::{Qualification, QualificationFilter, QualificationInput};
use crate::query_builder::{
    qualify_column, PageLimits, Predicate, SelectQuery, SortSanitizer, WhereClause,
};
use sqlx::PgPool;
use tracing::debug;

const SIMILAR_IDS_SQL: &str = "SELECT DISTINCT other.qualification_id \
     FROM qualification_to_professions AS other \
     INNER JOIN qualification_to_professions AS own ON own.profession_id = other.profession_id \
     WHERE own.qualification_id = $1 AND other.qualification_id <> $1";

const UPDATE_COLUMNS_SQL: &str = "UPDATE qualifications SET \
     name = COALESCE($2, name), \
     code = COALESCE($3, code), \
     formula = COALESCE($4, formula), \
     description = COALESCE($5, description) \
     WHERE id = ANY($1)";

const DISSOCIATE_SQL: &str = "DELETE FROM qualification_to_professions \
     WHERE qualification_id = ANY($1) AND profession_id = ANY($2)";

const ASSOCIATE_SQL: &str = "INSERT INTO qualification_to_professions (qualification_id, profession_id) \
     SELECT q, p FROM UNNEST($1::int[]) AS q CROSS JOIN UNNEST($2::int[]) AS p \
     ON CONFLICT (qualification_id, profession_id) DO NOTHING";

#[derive(Clone)]
pub struct QualificationRepository {
    pool: PgPool,
    sanitizer: SortSanitizer,
    limits: PageLimits,
}

impl QualificationRepository {
    pub fn new(pool: PgPool, sanitizer: SortSanitizer, limits: PageLimits) -> Self {
        Self {
            pool,
            sanitizer,
            limits,
        }
    }

    pub async fn fetch(
        &self,
        config: &FetchConfig<QualificationFilter>,
    ) -> Result<ListResult<Qualification>> {
        let query = list_query::<Qualification, _>(&self.sanitizer, self.limits, config);
        fetch_list(&self.pool, &query, config.count).await
    }

    /// Rows for the given ids, in no particular order; unknown ids are skipped
    pub async fn fetch_by_ids(&self, ids: &[i32]) -> Result<Vec<Qualification>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<Qualification> = Self::by_ids_query(ids).fetch_all(&self.pool).await?;
        Ok(rows)
    }

    /// Qualifications sharing at least one profession with `qualification_id`
    ///
    /// The client filter, sort and page window apply on top; an `id` filter in
    /// it narrows the candidates instead of replacing them.
    pub async fn similar(
        &self,
        qualification_id: i32,
        config: &FetchConfig<QualificationFilter>,
    ) -> Result<ListResult<Qualification>> {
        let candidates = sqlx::query_scalar::<_, i32>(SIMILAR_IDS_SQL)
            .bind(qualification_id)
            .fetch_all(&self.pool)
            .await?;

        let mut filter = config.filter.clone().unwrap_or_default();
        let candidates = narrow_candidates(candidates, &filter.id);
        if candidates.is_empty() {
            return Ok(ListResult {
                items: Vec::new(),
                total: config.count.then_some(0),
            });
        }
        filter.id = candidates;

        let config = FetchConfig {
            filter: Some(filter),
            limit: config.limit,
            offset: config.offset,
            sort: config.sort.clone(),
            count: config.count,
        };
        self.fetch(&config).await
    }

    /// Apply `input` to every qualification matching `filter`
    ///
    /// Column changes, dissociations and associations run in one transaction;
    /// any failure rolls all of them back. Returns the affected rows as they
    /// are after the update. An empty filter is rejected before any statement
    /// runs.
    pub async fn update_many(
        &self,
        filter: &QualificationFilter,
        input: &QualificationInput,
    ) -> Result<Vec<Qualification>> {
        let node = filter.to_filter_node();
        if node.is_empty() {
            return Err(ExamhubError::ValidationError(
                "refusing to update qualifications without a filter".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let ids = FilterCompiler::apply(
            SelectQuery::new(Qualification::TABLE, Qualification::ALIAS),
            Some(&node),
        )
        .column_query("id")
        .fetch_ids(&mut *tx)
        .await?;

        if ids.is_empty() || input.is_empty() {
            let items: Vec<Qualification> = Self::by_ids_query(&ids).fetch_all(&mut *tx).await?;
            tx.commit().await?;
            return Ok(items);
        }

        if input.has_column_changes() {
            sqlx::query(UPDATE_COLUMNS_SQL)
                .bind(&ids)
                .bind(&input.name)
                .bind(&input.code)
                .bind(&input.formula)
                .bind(&input.description)
                .execute(&mut *tx)
                .await
                .map_err(map_unique_violation)?;
        }

        if !input.dissociate_profession.is_empty() {
            let removed = sqlx::query(DISSOCIATE_SQL)
                .bind(&ids)
                .bind(&input.dissociate_profession)
                .execute(&mut *tx)
                .await?;
            debug!(links = removed.rows_affected(), "Dissociated professions");
        }

        if !input.associate_profession.is_empty() {
            let added = sqlx::query(ASSOCIATE_SQL)
                .bind(&ids)
                .bind(&input.associate_profession)
                .execute(&mut *tx)
                .await?;
            debug!(links = added.rows_affected(), "Associated professions");
        }

        let items: Vec<Qualification> = Self::by_ids_query(&ids).fetch_all(&mut *tx).await?;
        tx.commit().await?;

        log_write_operation(Qualification::ENTITY, "update_many", items.len(), "committed");
        Ok(items)
    }

    fn by_ids_query(ids: &[i32]) -> SelectQuery {
        SelectQuery::new(Qualification::TABLE, Qualification::ALIAS)
            .where_clause(WhereClause::single(Predicate::Equals {
                column: qualify_column(Qualification::ALIAS, "id"),
                values: ids.into(),
            }))
            .order_asc("id")
    }
}

/// Keep only candidates also present in `requested`, unless nothing was requested
fn narrow_candidates(candidates: Vec<i32>, requested: &[i32]) -> Vec<i32> {
    if requested.is_empty() {
        return candidates;
    }
    candidates
        .into_iter()
        .filter(|id| requested.contains(id))
        .collect()
}

fn map_unique_violation(error: sqlx::Error) -> ExamhubError {
    if let sqlx::Error::Database(db) = &error {
        if db.is_unique_violation() {
            return ExamhubError::ValidationError(
                "a qualification with this name and code already exists".to_string(),
            );
        }
    }
    error.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_narrow_candidates() {
        assert_eq!(narrow_candidates(vec![1, 2, 3], &[]), vec![1, 2, 3]);
        assert_eq!(narrow_candidates(vec![1, 2, 3], &[3, 9]), vec![3]);
        assert!(narrow_candidates(vec![1, 2], &[7]).is_empty());
    }

    #[test]
    fn test_by_ids_query() {
        assert_eq!(
            QualificationRepository::by_ids_query(&[2, 1]).to_sql(),
            "SELECT \"qualification\".* FROM \"qualifications\" AS \"qualification\" \
             WHERE \"qualification\".\"id\" = ANY($1) ORDER BY \"qualification\".\"id\" ASC"
        );
    }

    #[tokio::test]
    async fn test_update_many_without_filter_is_rejected() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgresql://localhost/examhub_unreachable")
            .unwrap();
        let repository =
            QualificationRepository::new(pool, SortSanitizer::new(3), PageLimits::new(100, 100));
        let input = QualificationInput {
            name: Some("Renamed".to_string()),
            ..Default::default()
        };

        let error = repository
            .update_many(&QualificationFilter::default(), &input)
            .await
            .unwrap_err();

        assert!(matches!(error, ExamhubError::ValidationError(_)));
    }

    #[test]
    fn test_non_unique_errors_pass_through() {
        let error = map_unique_violation(sqlx::Error::RowNotFound);
        assert!(matches!(error, ExamhubError::DatabaseError(_)));
    }
}
