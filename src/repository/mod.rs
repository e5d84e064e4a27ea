//! # Repositories
//!
//! The fetch path shared by every entity: a client filter, sort list and
//! page window are composed into one parameterized `SELECT`, optionally
//! followed by the matching `COUNT(*)`.
//!
//! ```text
//! FetchConfig ─┬─ filter ──► FilterCompiler ──► predicates + joins ─┐
//!              ├─ sort ────► SortSanitizer ───► ORDER BY (+ join) ──┼─► SelectQuery
//!              └─ limit ───► Pagination::clamped ───────────────────┘
//! ```

pub mod profession;
pub mod qualification;
pub mod question;
pub mod user;

pub use profession::ProfessionRepository;
pub use qualification::QualificationRepository;
pub use question::{AssetCleanup, FileAssetCleanup, NoopAssetCleanup, QuestionRepository};
pub use user::UserRepository;

use crate::config::ExamhubConfig;
use crate::error::Result;
use crate::filter::{EntitySchema, FilterCompiler, FilterInput};
use crate::query_builder::{qualify_column, Join, PageLimits, Pagination, SelectQuery, SortSanitizer};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::debug;

/// Arguments of a list fetch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig<F> {
    pub filter: Option<F>,
    /// Absent means the entity default; larger values are clamped to the maximum
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// Raw `column direction` expressions, sanitized before use
    pub sort: Vec<String>,
    /// Also compute the total number of matching rows
    pub count: bool,
}

impl<F> Default for FetchConfig<F> {
    fn default() -> Self {
        Self {
            filter: None,
            limit: None,
            offset: None,
            sort: Vec::new(),
            count: false,
        }
    }
}

impl<F> FetchConfig<F> {
    pub fn filtered(filter: F) -> Self {
        Self {
            filter: Some(filter),
            ..Default::default()
        }
    }
}

/// One page of rows and, when requested, the total across all pages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResult<T> {
    pub items: Vec<T>,
    pub total: Option<i64>,
}

/// Build the page query for entity `E`
///
/// Sort keys naming the base alias are folded onto it by the sanitizer. A key
/// naming another alias is kept only when `E` declares that relation sortable,
/// in which case the relation is left-joined; other aliased keys are dropped.
pub fn list_query<E, F>(
    sanitizer: &SortSanitizer,
    limits: PageLimits,
    config: &FetchConfig<F>,
) -> SelectQuery
where
    E: EntitySchema,
    F: FilterInput,
{
    let node = config.filter.as_ref().map(FilterInput::to_filter_node);
    let mut query = FilterCompiler::apply(SelectQuery::new(E::TABLE, E::ALIAS), node.as_ref());

    let sortable_relation = |alias: &str| {
        E::sortable_relations()
            .iter()
            .find(|relation| relation.alias == alias)
            .copied()
    };

    let sanitizer = sanitizer.clone().with_base_alias(E::ALIAS);
    let keys = sanitizer.sanitize_with(&config.sort, |key| match key.alias() {
        Some(alias) if sortable_relation(alias).is_none() => {
            debug!(entity = E::ENTITY, sort_key = %key, "Dropping sort key with unknown alias");
            false
        }
        _ => true,
    });

    for key in keys {
        if let Some(relation) = key.alias().and_then(sortable_relation) {
            let on_condition = format!(
                "{} = {}",
                qualify_column(relation.alias, relation.primary_key),
                qualify_column(E::ALIAS, relation.foreign_key)
            );
            query = query.join(Join::left(relation.table, relation.alias, on_condition));
        }
        query = query.order_by(key.to_sql(E::ALIAS));
    }

    query.paginate(Pagination::clamped(config.limit, config.offset, limits))
}

/// Run a page query and, if asked, its count
pub async fn fetch_list<T>(pool: &PgPool, query: &SelectQuery, count: bool) -> Result<ListResult<T>>
where
    T: for<'r> sqlx::FromRow<'r, PgRow> + Send + Unpin,
{
    let items = query.fetch_all::<T, _>(pool).await?;
    let total = if count {
        Some(query.count(pool).await?)
    } else {
        None
    };

    Ok(ListResult { items, total })
}

/// Every repository over one pool
#[derive(Clone)]
pub struct Repositories {
    pub professions: ProfessionRepository,
    pub qualifications: QualificationRepository,
    pub questions: QuestionRepository,
    pub users: UserRepository,
}

impl Repositories {
    pub fn new(pool: PgPool, config: &ExamhubConfig) -> Self {
        Self::with_asset_cleanup(pool, config, Arc::new(NoopAssetCleanup))
    }

    pub fn with_asset_cleanup(
        pool: PgPool,
        config: &ExamhubConfig,
        cleanup: Arc<dyn AssetCleanup>,
    ) -> Self {
        let sanitizer = SortSanitizer::new(config.query.max_sort_keys);
        let limits = &config.limits;

        Self {
            professions: ProfessionRepository::new(
                pool.clone(),
                sanitizer.clone(),
                limits.professions,
            ),
            qualifications: QualificationRepository::new(
                pool.clone(),
                sanitizer.clone(),
                limits.qualifications,
            ),
            questions: QuestionRepository::new(
                pool.clone(),
                sanitizer.clone(),
                limits.questions,
                limits.generated_test,
                cleanup,
            ),
            users: UserRepository::new(pool, sanitizer, limits.users),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Profession, ProfessionFilter, Question, QuestionFilter};

    fn sanitizer() -> SortSanitizer {
        SortSanitizer::new(3)
    }

    #[test]
    fn test_relation_sort_adds_left_join() {
        let config = FetchConfig::<QuestionFilter> {
            sort: vec!["qualification.name ASC".to_string(), "id DESC".to_string()],
            limit: Some(10),
            ..Default::default()
        };

        let sql = list_query::<Question, _>(&sanitizer(), PageLimits::new(100, 100), &config)
            .to_sql();

        assert_eq!(
            sql,
            "SELECT \"question\".* FROM \"questions\" AS \"question\" \
             LEFT JOIN \"qualifications\" AS \"qualification\" \
             ON \"qualification\".\"id\" = \"question\".\"qualification_id\" \
             ORDER BY \"qualification\".\"name\" ASC, \"question\".\"id\" DESC LIMIT 10"
        );
    }

    #[test]
    fn test_unknown_aliases_do_not_crowd_out_valid_keys() {
        let config = FetchConfig::<ProfessionFilter> {
            sort: vec![
                "x.a ASC".to_string(),
                "y.b ASC".to_string(),
                "z.c ASC".to_string(),
                "name DESC".to_string(),
            ],
            ..Default::default()
        };

        let sql = list_query::<Profession, _>(&sanitizer(), PageLimits::new(100, 100), &config)
            .to_sql();

        assert!(sql.contains(r#"ORDER BY "profession"."name" DESC"#));
        assert!(!sql.contains("JOIN"));
    }

    #[test]
    fn test_unknown_alias_is_dropped() {
        let config = FetchConfig::<ProfessionFilter> {
            sort: vec![
                "secret.password ASC".to_string(),
                "profession.createdAt DESC".to_string(),
            ],
            ..Default::default()
        };

        let sql = list_query::<Profession, _>(&sanitizer(), PageLimits::new(100, 100), &config)
            .to_sql();

        assert!(!sql.contains("secret"));
        assert!(sql.contains("ORDER BY \"profession\".\"created_at\" DESC LIMIT 100"));
    }

    #[test]
    fn test_scoped_filter_and_relation_sort_share_one_join() {
        let filter: QuestionFilter = serde_json::from_value(serde_json::json!({
            "qualificationFilter": { "code": ["EE.08"] }
        }))
        .unwrap();
        let config = FetchConfig {
            filter: Some(filter),
            sort: vec!["qualification.code DESC".to_string()],
            ..Default::default()
        };

        let sql = list_query::<Question, _>(&sanitizer(), PageLimits::new(100, 100), &config)
            .to_sql();

        assert_eq!(sql.matches("AS \"qualification\"").count(), 1);
        assert!(sql.contains("INNER JOIN \"qualifications\" AS \"qualification\""));
    }

    #[test]
    fn test_limit_is_clamped_and_negative_offset_omitted() {
        let config = FetchConfig::<ProfessionFilter> {
            limit: Some(5_000),
            offset: Some(-3),
            ..Default::default()
        };

        let sql = list_query::<Profession, _>(&sanitizer(), PageLimits::new(100, 100), &config)
            .to_sql();

        assert!(sql.ends_with(" LIMIT 100"));
    }

    #[test]
    fn test_fetch_config_deserializes_with_defaults() {
        let config: FetchConfig<ProfessionFilter> =
            serde_json::from_value(serde_json::json!({ "limit": 5, "count": true })).unwrap();

        assert_eq!(config.limit, Some(5));
        assert!(config.count);
        assert!(config.filter.is_none());
        assert!(config.sort.is_empty());
    }
}
