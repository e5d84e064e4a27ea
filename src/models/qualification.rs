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

/// A vocational qualification with its exam code
/// Maps to `qualifications` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Qualification {
    pub id: i32,
    pub slug: String,
    pub name: String,
    pub code: String,
    pub formula: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

pub const ENTITY: &str = "qualification";

pub static ID: FieldDescriptor = FieldDescriptor::new(ENTITY, "id", "id", SET_OPERATORS);
pub static SLUG: FieldDescriptor = FieldDescriptor::new(ENTITY, "slug", "slug", SET_OPERATORS);
pub static FORMULA: FieldDescriptor =
    FieldDescriptor::new(ENTITY, "formula", "formula", SET_OPERATORS);
pub static NAME: FieldDescriptor = FieldDescriptor::new(ENTITY, "name", "name", TEXT_OPERATORS);
pub static CODE: FieldDescriptor = FieldDescriptor::new(ENTITY, "code", "code", TEXT_OPERATORS);
pub static DESCRIPTION: FieldDescriptor =
    FieldDescriptor::new(ENTITY, "description", "description", PATTERN_OPERATORS);
pub static CREATED_AT: FieldDescriptor =
    FieldDescriptor::new(ENTITY, "createdAt", "created_at", TEMPORAL_OPERATORS);

static FIELDS: [&FieldDescriptor; 7] =
    [&ID, &SLUG, &FORMULA, &NAME, &CODE, &DESCRIPTION, &CREATED_AT];

/// Qualifications linked to professions through `qualification_to_professions`
pub static PROFESSIONS: ManyToManyDescriptor = ManyToManyDescriptor {
    entity: ENTITY,
    association_entity: super::ASSOCIATION_ENTITY,
    association_table: super::ASSOCIATION_TABLE,
    owner_column: "qualification_id",
    related_column: "profession_id",
    owner_key: "id",
};

impl EntitySchema for Qualification {
    const ENTITY: &'static str = ENTITY;
    const TABLE: &'static str = "qualifications";
    const ALIAS: &'static str = "qualification";
    const PAGE_LIMITS: PageLimits = limits::QUALIFICATIONS;

    fn fields() -> &'static [&'static FieldDescriptor] {
        &FIELDS
    }
}

/// Alternatives matched when any one of them holds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualificationFilterOr {
    #[serde(rename = "nameMATCH")]
    pub name_match: Option<String>,
    #[serde(rename = "nameIEQ")]
    pub name_ieq: Option<String>,
    #[serde(rename = "codeMATCH")]
    pub code_match: Option<String>,
    #[serde(rename = "codeIEQ")]
    pub code_ieq: Option<String>,
}

/// Client filter for qualification lists
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualificationFilter {
    pub id: Vec<i32>,
    #[serde(rename = "idNEQ")]
    pub id_neq: Vec<i32>,

    pub slug: Vec<String>,
    #[serde(rename = "slugNEQ")]
    pub slug_neq: Vec<String>,

    pub formula: Vec<String>,
    #[serde(rename = "formulaNEQ")]
    pub formula_neq: Vec<String>,

    pub name: Vec<String>,
    #[serde(rename = "nameNEQ")]
    pub name_neq: Vec<String>,
    #[serde(rename = "nameMATCH")]
    pub name_match: Option<String>,
    #[serde(rename = "nameIEQ")]
    pub name_ieq: Option<String>,

    pub code: Vec<String>,
    #[serde(rename = "codeNEQ")]
    pub code_neq: Vec<String>,
    #[serde(rename = "codeMATCH")]
    pub code_match: Option<String>,
    #[serde(rename = "codeIEQ")]
    pub code_ieq: Option<String>,

    #[serde(rename = "descriptionMATCH")]
    pub description_match: Option<String>,
    #[serde(rename = "descriptionIEQ")]
    pub description_ieq: Option<String>,

    /// Qualifications linked to every one of these professions
    #[serde(rename = "professionID")]
    pub profession_id: Vec<i32>,

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

    pub or: Option<QualificationFilterOr>,
}

impl FilterInput for QualificationFilter {
    fn to_filter_node(&self) -> FilterNode {
        let mut node = FilterNode::new(ENTITY)
            .with(&ID, Operator::In, self.id.clone())
            .with(&ID, Operator::NotIn, self.id_neq.clone())
            .with(&SLUG, Operator::In, self.slug.clone())
            .with(&SLUG, Operator::NotIn, self.slug_neq.clone())
            .with(&FORMULA, Operator::In, self.formula.clone())
            .with(&FORMULA, Operator::NotIn, self.formula_neq.clone())
            .with(&NAME, Operator::In, self.name.clone())
            .with(&NAME, Operator::NotIn, self.name_neq.clone())
            .with_opt(&NAME, Operator::Match, self.name_match.clone())
            .with_opt(&NAME, Operator::IEq, self.name_ieq.clone())
            .with(&CODE, Operator::In, self.code.clone())
            .with(&CODE, Operator::NotIn, self.code_neq.clone())
            .with_opt(&CODE, Operator::Match, self.code_match.clone())
            .with_opt(&CODE, Operator::IEq, self.code_ieq.clone())
            .with_opt(&DESCRIPTION, Operator::Match, self.description_match.clone())
            .with_opt(&DESCRIPTION, Operator::IEq, self.description_ieq.clone())
            .with_opt(&CREATED_AT, Operator::Eq, self.created_at)
            .with_opt(&CREATED_AT, Operator::Gt, self.created_at_gt)
            .with_opt(&CREATED_AT, Operator::Gte, self.created_at_gte)
            .with_opt(&CREATED_AT, Operator::Lt, self.created_at_lt)
            .with_opt(&CREATED_AT, Operator::Lte, self.created_at_lte)
            .with_related_ids(
                &PROFESSIONS,
                &super::ASSOCIATED_PROFESSION_ID,
                &self.profession_id,
            );

        if let Some(or) = &self.or {
            node = node
                .or_with_opt(&NAME, Operator::Match, or.name_match.clone())
                .or_with_opt(&NAME, Operator::IEq, or.name_ieq.clone())
                .or_with_opt(&CODE, Operator::Match, or.code_match.clone())
                .or_with_opt(&CODE, Operator::IEq, or.code_ieq.clone());
        }

        node
    }
}

/// Partial update applied to every qualification a filter matches
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QualificationInput {
    pub name: Option<String>,
    pub code: Option<String>,
    pub formula: Option<String>,
    pub description: Option<String>,
    pub associate_profession: Vec<i32>,
    pub dissociate_profession: Vec<i32>,
}

impl QualificationInput {
    pub fn has_column_changes(&self) -> bool {
        self.name.is_some()
            || self.code.is_some()
            || self.formula.is_some()
            || self.description.is_some()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_column_changes()
            && self.associate_profession.is_empty()
            && self.dissociate_profession.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_or_group_collects_populated_alternatives() {
        let filter: QualificationFilter = serde_json::from_value(serde_json::json!({
            "name": ["Electrician"],
            "or": { "codeMATCH": "EL%", "nameIEQ": "" }
        }))
        .unwrap();

        let node = filter.to_filter_node();
        assert_eq!(node.conditions().len(), 1);
        assert_eq!(node.any_of().len(), 1);
        assert_eq!(node.any_of()[0].field.column, "code");
    }

    #[test]
    fn test_empty_or_group_adds_nothing() {
        let filter = QualificationFilter {
            or: Some(QualificationFilterOr::default()),
            ..Default::default()
        };
        assert!(filter.to_filter_node().is_empty());
    }

    #[test]
    fn test_input_change_detection() {
        assert!(QualificationInput::default().is_empty());

        let input = QualificationInput {
            associate_profession: vec![1],
            ..Default::default()
        };
        assert!(!input.is_empty());
        assert!(!input.has_column_changes());
    }
}
