use crate::constants::limits;
use crate::filter::descriptor::{
    EntitySchema, FieldDescriptor, ManyToManyDescriptor, Operator, PATTERN_OPERATORS,
    SET_OPERATORS, TEMPORAL_OPERATORS, TEXT_OPERATORS,
};
use crate::filter::{FilterInput, FilterNode};
use crate::query_builder::PageLimits;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A profession a qualification can lead to
/// Maps to `professions` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Profession {
    pub id: i32,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

pub const ENTITY: &str = "profession";

pub static ID: FieldDescriptor = FieldDescriptor::new(ENTITY, "id", "id", SET_OPERATORS);
pub static SLUG: FieldDescriptor = FieldDescriptor::new(ENTITY, "slug", "slug", SET_OPERATORS);
pub static NAME: FieldDescriptor = FieldDescriptor::new(ENTITY, "name", "name", TEXT_OPERATORS);
pub static DESCRIPTION: FieldDescriptor =
    FieldDescriptor::new(ENTITY, "description", "description", PATTERN_OPERATORS);
pub static CREATED_AT: FieldDescriptor =
    FieldDescriptor::new(ENTITY, "createdAt", "created_at", TEMPORAL_OPERATORS);

static FIELDS: [&FieldDescriptor; 5] = [&ID, &SLUG, &NAME, &DESCRIPTION, &CREATED_AT];

/// Professions linked to qualifications through `qualification_to_professions`
pub static QUALIFICATIONS: ManyToManyDescriptor = ManyToManyDescriptor {
    entity: ENTITY,
    association_entity: super::ASSOCIATION_ENTITY,
    association_table: super::ASSOCIATION_TABLE,
    owner_column: "profession_id",
    related_column: "qualification_id",
    owner_key: "id",
};

impl EntitySchema for Profession {
    const ENTITY: &'static str = ENTITY;
    const TABLE: &'static str = "professions";
    const ALIAS: &'static str = "profession";
    const PAGE_LIMITS: PageLimits = limits::PROFESSIONS;

    fn fields() -> &'static [&'static FieldDescriptor] {
        &FIELDS
    }
}

/// Client filter for profession lists
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfessionFilter {
    pub id: Vec<i32>,
    #[serde(rename = "idNEQ")]
    pub id_neq: Vec<i32>,

    pub slug: Vec<String>,
    #[serde(rename = "slugNEQ")]
    pub slug_neq: Vec<String>,

    pub name: Vec<String>,
    #[serde(rename = "nameNEQ")]
    pub name_neq: Vec<String>,
    #[serde(rename = "nameMATCH")]
    pub name_match: Option<String>,
    #[serde(rename = "nameIEQ")]
    pub name_ieq: Option<String>,

    #[serde(rename = "descriptionMATCH")]
    pub description_match: Option<String>,
    #[serde(rename = "descriptionIEQ")]
    pub description_ieq: Option<String>,

    /// Professions linked to every one of these qualifications
    #[serde(rename = "qualificationID")]
    pub qualification_id: Vec<i32>,

    #[serde(rename = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "createdAtGT")]
    pub created_at_gt: Option<DateTime<Utc>>,
    #[serde(rename = "createdAtGTE")]
    pub created_at_gte: Option<DateTime<Utc>>,
    #[serde(rename = "createdAtLT")]
    pub created_at_lt: Option<DateTime<Utc>>,
    #[serde(rename = "createdAtLTE")]
    pub created_at_lte: Option<DateTime<Utc>>,
}

impl FilterInput for ProfessionFilter {
    fn to_filter_node(&self) -> FilterNode {
        FilterNode::new(ENTITY)
            .with(&ID, Operator::In, self.id.clone())
            .with(&ID, Operator::NotIn, self.id_neq.clone())
            .with(&SLUG, Operator::In, self.slug.clone())
            .with(&SLUG, Operator::NotIn, self.slug_neq.clone())
            .with(&NAME, Operator::In, self.name.clone())
            .with(&NAME, Operator::NotIn, self.name_neq.clone())
            .with_opt(&NAME, Operator::Match, self.name_match.clone())
            .with_opt(&NAME, Operator::IEq, self.name_ieq.clone())
            .with_opt(&DESCRIPTION, Operator::Match, self.description_match.clone())
            .with_opt(&DESCRIPTION, Operator::IEq, self.description_ieq.clone())
            .with_opt(&CREATED_AT, Operator::Eq, self.created_at)
            .with_opt(&CREATED_AT, Operator::Gt, self.created_at_gt)
            .with_opt(&CREATED_AT, Operator::Gte, self.created_at_gte)
            .with_opt(&CREATED_AT, Operator::Lt, self.created_at_lt)
            .with_opt(&CREATED_AT, Operator::Lte, self.created_at_lte)
            .with_related_ids(
                &QUALIFICATIONS,
                &super::ASSOCIATED_QUALIFICATION_ID,
                &self.qualification_id,
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterCompiler;
    use crate::query_builder::SelectQuery;

    #[test]
    fn test_filter_deserializes_suffixed_fields() {
        let filter: ProfessionFilter = serde_json::from_value(serde_json::json!({
            "idNEQ": [3],
            "nameIEQ": "elektr%",
            "qualificationID": [1, 2]
        }))
        .unwrap();

        assert_eq!(filter.id_neq, vec![3]);
        assert_eq!(filter.name_ieq.as_deref(), Some("elektr%"));
        assert_eq!(filter.qualification_id, vec![1, 2]);
    }

    #[test]
    fn test_default_filter_is_empty() {
        assert!(ProfessionFilter::default().to_filter_node().is_empty());
    }

    #[test]
    fn test_qualification_filter_joins_association() {
        let filter = ProfessionFilter {
            qualification_id: vec![7, 8],
            ..Default::default()
        };
        let sql = FilterCompiler::apply(
            SelectQuery::new(Profession::TABLE, Profession::ALIAS),
            Some(&filter.to_filter_node()),
        )
        .to_sql();

        assert!(sql.contains(r#"INNER JOIN (SELECT "qualification_to_professions"."profession_id""#));
        assert!(sql.contains(r#"HAVING COUNT("qualification_to_professions"."qualification_id") >= $2"#));
        assert!(sql.ends_with(
            r#"ON "profession__qualification_to_professions_1"."profession_id" = "profession"."id""#
        ));
    }
}
