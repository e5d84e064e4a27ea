use super::{fetch_list, list_query, FetchConfig, ListResult};
use crate::background::spawn_best_effort;
use crate::error::{ExamhubError, Result};
use crate::filter::{EntitySchema, FilterCompiler, FilterInput};
use crate::logging::log_write_operation;
use crate::models::{Question, QuestionFilter};
use crate::query_builder::{
    qualify_column, PageLimits, Pagination, Predicate, SelectQuery, SortSanitizer, WhereClause,
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

const DELETE_RETURNING_SQL: &str = "DELETE FROM questions WHERE id = ANY($1) RETURNING *";

/// Removes stored images once the questions referencing them are gone
#[async_trait]
pub trait AssetCleanup: Send + Sync + 'static {
    async fn remove(&self, paths: Vec<String>) -> Result<()>;
}

/// Keeps every file
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAssetCleanup;

#[async_trait]
impl AssetCleanup for NoopAssetCleanup {
    async fn remove(&self, paths: Vec<String>) -> Result<()> {
        debug!(paths = paths.len(), "Skipping asset cleanup");
        Ok(())
    }
}

/// Deletes files relative to a storage root
///
/// Files already gone are ignored. Paths escaping the root are refused.
#[derive(Debug, Clone)]
pub struct FileAssetCleanup {
    root: PathBuf,
}

impl FileAssetCleanup {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path);
        let confined = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        confined.then(|| self.root.join(relative))
    }
}

#[async_trait]
impl AssetCleanup for FileAssetCleanup {
    async fn remove(&self, paths: Vec<String>) -> Result<()> {
        let mut failures = Vec::new();

        for path in paths {
            let Some(full_path) = self.resolve(&path) else {
                failures.push(format!("{path}: outside storage root"));
                continue;
            };

            match tokio::fs::remove_file(&full_path).await {
                Ok(()) => debug!(path = %full_path.display(), "Removed asset"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => failures.push(format!("{path}: {e}")),
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ExamhubError::Internal(format!(
                "failed to remove assets: {}",
                failures.join(", ")
            )))
        }
    }
}

#[derive(Clone)]
pub struct QuestionRepository {
    pool: PgPool,
    sanitizer: SortSanitizer,
    limits: PageLimits,
    test_limits: PageLimits,
    cleanup: Arc<dyn AssetCleanup>,
}

impl QuestionRepository {
    pub fn new(
        pool: PgPool,
        sanitizer: SortSanitizer,
        limits: PageLimits,
        test_limits: PageLimits,
        cleanup: Arc<dyn AssetCleanup>,
    ) -> Self {
        Self {
            pool,
            sanitizer,
            limits,
            test_limits,
            cleanup,
        }
    }

    /// Questions may also be sorted by columns of their qualification
    pub async fn fetch(&self, config: &FetchConfig<QuestionFilter>) -> Result<ListResult<Question>> {
        let query = list_query::<Question, _>(&self.sanitizer, self.limits, config);
        fetch_list(&self.pool, &query, config.count).await
    }

    /// Delete every question matching `filter` and return the removed rows
    ///
    /// Their images are handed to the asset cleanup in the background; a
    /// cleanup failure is logged and does not affect the result. An empty
    /// filter is rejected rather than deleting the whole table.
    pub async fn delete(&self, filter: &QuestionFilter) -> Result<Vec<Question>> {
        let node = filter.to_filter_node();
        if node.is_empty() {
            return Err(ExamhubError::ValidationError(
                "refusing to delete questions without a filter".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        let ids = FilterCompiler::apply(
            SelectQuery::new(Question::TABLE, Question::ALIAS),
            Some(&node),
        )
        .column_query("id")
        .fetch_ids(&mut *tx)
        .await?;

        let items: Vec<Question> = sqlx::query_as(DELETE_RETURNING_SQL)
            .bind(&ids)
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;

        log_write_operation(Question::ENTITY, "delete", items.len(), "committed");

        let paths: Vec<String> = items.iter().flat_map(Question::image_paths).collect();
        if !paths.is_empty() {
            let cleanup = Arc::clone(&self.cleanup);
            spawn_best_effort("question_asset_cleanup", async move {
                cleanup.remove(paths).await
            });
        }

        Ok(items)
    }

    /// A random selection of questions from the given qualifications
    ///
    /// The size defaults to and is capped at the generated-test limit.
    pub async fn generate_test(
        &self,
        qualification_ids: &[i32],
        limit: Option<i64>,
    ) -> Result<Vec<Question>> {
        if qualification_ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = Self::generate_test_query(qualification_ids, limit, self.test_limits);
        let items: Vec<Question> = query.fetch_all(&self.pool).await?;
        Ok(items)
    }

    fn generate_test_query(
        qualification_ids: &[i32],
        limit: Option<i64>,
        test_limits: PageLimits,
    ) -> SelectQuery {
        SelectQuery::new(Question::TABLE, Question::ALIAS)
            .where_clause(WhereClause::single(Predicate::Equals {
                column: qualify_column(Question::ALIAS, "qualification_id"),
                values: qualification_ids.into(),
            }))
            .order_by("random()")
            .paginate(Pagination::clamped(limit, None, test_limits))
    }
}
