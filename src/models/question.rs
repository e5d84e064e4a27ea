use super::qualification::{self, QualificationFilter};
use crate::constants::limits;
use crate::filter::descriptor::{
    BelongsToDescriptor, EntitySchema, FieldDescriptor, Operator, PATTERN_OPERATORS,
    SET_OPERATORS, TEMPORAL_OPERATORS,
};
use crate::filter::{FilterInput, FilterNode};
use crate::query_builder::PageLimits;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An exam question belonging to one qualification
/// Maps to `questions` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: i32,
    /// Exam session the question was taken from
    pub from: String,
    pub content: String,
    pub image: String,
    pub answer_a: String,
    pub answer_a_image: String,
    pub answer_b: String,
    pub answer_b_image: String,
    pub answer_c: String,
    pub answer_c_image: String,
    pub answer_d: String,
    pub answer_d_image: String,
    pub correct_answer: String,
    pub qualification_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Question {
    /// Stored image paths referenced by this question
    pub fn image_paths(&self) -> Vec<String> {
        [
            &self.image,
            &self.answer_a_image,
            &self.answer_b_image,
            &self.answer_c_image,
            &self.answer_d_image,
        ]
        .into_iter()
        .filter(|path| !path.is_empty())
        .cloned()
        .collect()
    }
}

pub const ENTITY: &str = "question";

pub static ID: FieldDescriptor = FieldDescriptor::new(ENTITY, "id", "id", SET_OPERATORS);
pub static FROM: FieldDescriptor = FieldDescriptor::new(ENTITY, "from", "from", SET_OPERATORS);
pub static CONTENT: FieldDescriptor =
    FieldDescriptor::new(ENTITY, "content", "content", PATTERN_OPERATORS);
pub static QUALIFICATION_ID: FieldDescriptor =
    FieldDescriptor::new(ENTITY, "qualificationID", "qualification_id", SET_OPERATORS);
pub static CREATED_AT: FieldDescriptor =
    FieldDescriptor::new(ENTITY, "createdAt", "created_at", TEMPORAL_OPERATORS);

static FIELDS: [&FieldDescriptor; 5] = [&ID, &FROM, &CONTENT, &QUALIFICATION_ID, &CREATED_AT];

/// The owning qualification, joined as `qualification`
pub static QUALIFICATION: BelongsToDescriptor = BelongsToDescriptor {
    entity: ENTITY,
    related_entity: qualification::ENTITY,
    table: "qualifications",
    alias: "qualification",
    foreign_key: "qualification_id",
    primary_key: "id",
};

static SORTABLE_RELATIONS: [&BelongsToDescriptor; 1] = [&QUALIFICATION];

impl EntitySchema for Question {
    const ENTITY: &'static str = ENTITY;
    const TABLE: &'static str = "questions";
    const ALIAS: &'static str = "question";
    const PAGE_LIMITS: PageLimits = limits::QUESTIONS;

    fn fields() -> &'static [&'static FieldDescriptor] {
        &FIELDS
    }

    fn sortable_relations() -> &'static [&'static BelongsToDescriptor] {
        &SORTABLE_RELATIONS
    }
}

/// Client filter for question lists
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionFilter {
    pub id: Vec<i32>,
    #[serde(rename = "idNEQ")]
    pub id_neq: Vec<i32>,

    pub from: Vec<String>,

    #[serde(rename = "contentMATCH")]
    pub content_match: Option<String>,
    #[serde(rename = "contentIEQ")]
    pub content_ieq: Option<String>,

    #[serde(rename = "qualificationID")]
    pub qualification_id: Vec<i32>,
    #[serde(rename = "qualificationIDNEQ")]
    pub qualification_id_neq: Vec<i32>,

    /// Constraints on the owning qualification
    #[serde(rename = "qualificationFilter")]
    pub qualification_filter: Option<QualificationFilter>,

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

impl FilterInput for QuestionFilter {
    fn to_filter_node(&self) -> FilterNode {
        let node = FilterNode::new(ENTITY)
            .with(&ID, Operator::In, self.id.clone())
            .with(&ID, Operator::NotIn, self.id_neq.clone())
            .with(&FROM, Operator::In, self.from.clone())
            .with_opt(&CONTENT, Operator::Match, self.content_match.clone())
            .with_opt(&CONTENT, Operator::IEq, self.content_ieq.clone())
            .with(&QUALIFICATION_ID, Operator::In, self.qualification_id.clone())
            .with(&QUALIFICATION_ID, Operator::NotIn, self.qualification_id_neq.clone())
            .with_opt(&CREATED_AT, Operator::Eq, self.created_at)
            .with_opt(&CREATED_AT, Operator::Gt, self.created_at_gt)
            .with_opt(&CREATED_AT, Operator::Gte, self.created_at_gte)
            .with_opt(&CREATED_AT, Operator::Lt, self.created_at_lt)
            .with_opt(&CREATED_AT, Operator::Lte, self.created_at_lte);

        match &self.qualification_filter {
            Some(nested) => node.with_scoped(&QUALIFICATION, nested.to_filter_node()),
            None => node,
        }
    }
}
