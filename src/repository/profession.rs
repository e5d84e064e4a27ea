use super::{fetch_list, list_query, FetchConfig, ListResult};
use crate::error::Result;
use crate::models::{Profession, ProfessionFilter, Qualification, ASSOCIATION_TABLE};
use crate::query_builder::{
    qualify_column, Join, PageLimits, Predicate, SelectQuery, SortSanitizer, WhereClause,
};
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use tracing::debug;

const LINK_ALIAS: &str = "link";

#[derive(FromRow)]
struct ProfessionQualificationRow {
    profession_id: i32,
    #[sqlx(flatten)]
    qualification: Qualification,
}

#[derive(Clone)]
pub struct ProfessionRepository {
    pool: PgPool,
    sanitizer: SortSanitizer,
    limits: PageLimits,
}

impl ProfessionRepository {
    pub fn new(pool: PgPool, sanitizer: SortSanitizer, limits: PageLimits) -> Self {
        Self {
            pool,
            sanitizer,
            limits,
        }
    }

    pub async fn fetch(
        &self,
        config: &FetchConfig<ProfessionFilter>,
    ) -> Result<ListResult<Profession>> {
        let query = list_query::<Profession, _>(&self.sanitizer, self.limits, config);
        fetch_list(&self.pool, &query, config.count).await
    }

    /// Qualifications of each profession, in one query
    ///
    /// Professions without qualifications are absent from the map.
    pub async fn associated_qualifications(
        &self,
        profession_ids: &[i32],
    ) -> Result<HashMap<i32, Vec<Qualification>>> {
        if profession_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let query = Self::associated_qualifications_query(profession_ids);
        let rows: Vec<ProfessionQualificationRow> = query.fetch_all(&self.pool).await?;

        debug!(
            professions = profession_ids.len(),
            rows = rows.len(),
            "Loaded qualifications by profession"
        );

        let mut grouped: HashMap<i32, Vec<Qualification>> = HashMap::new();
        for row in rows {
            grouped
                .entry(row.profession_id)
                .or_default()
                .push(row.qualification);
        }
        Ok(grouped)
    }

    fn associated_qualifications_query(profession_ids: &[i32]) -> SelectQuery {
        let on_condition = format!(
            "{} = {}",
            qualify_column(LINK_ALIAS, "qualification_id"),
            qualify_column("qualification", "id")
        );

        SelectQuery::new("qualifications", "qualification")
            .select(vec![
                qualify_column(LINK_ALIAS, "profession_id"),
                "\"qualification\".*".to_string(),
            ])
            .join(Join::inner(ASSOCIATION_TABLE, LINK_ALIAS, on_condition))
            .where_clause(WhereClause::single(Predicate::Equals {
                column: qualify_column(LINK_ALIAS, "profession_id"),
                values: profession_ids.into(),
            }))
            .order_asc("id")
    }
}
