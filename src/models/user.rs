use crate::constants::limits;
use crate::filter::descriptor::{
    EntitySchema, FieldDescriptor, Operator, EQUALITY_OPERATORS, SET_OPERATORS,
    TEMPORAL_OPERATORS, TEXT_OPERATORS,
};
use crate::filter::{FilterInput, FilterNode};
use crate::query_builder::PageLimits;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An account of the exam service; credentials are never loaded
/// Maps to `users` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i32,
    pub display_name: String,
    pub email: String,
    pub role: String,
    pub activated: bool,
    pub created_at: DateTime<Utc>,
}

pub const ENTITY: &str = "user";

pub static ID: FieldDescriptor = FieldDescriptor::new(ENTITY, "id", "id", SET_OPERATORS);
pub static ACTIVATED: FieldDescriptor =
    FieldDescriptor::new(ENTITY, "activated", "activated", EQUALITY_OPERATORS);
pub static DISPLAY_NAME: FieldDescriptor =
    FieldDescriptor::new(ENTITY, "displayName", "display_name", TEXT_OPERATORS);
pub static EMAIL: FieldDescriptor = FieldDescriptor::new(ENTITY, "email", "email", TEXT_OPERATORS);
pub static ROLE: FieldDescriptor = FieldDescriptor::new(ENTITY, "role", "role", SET_OPERATORS);
pub static CREATED_AT: FieldDescriptor =
    FieldDescriptor::new(ENTITY, "createdAt", "created_at", TEMPORAL_OPERATORS);

static FIELDS: [&FieldDescriptor; 6] = [&ID, &ACTIVATED, &DISPLAY_NAME, &EMAIL, &ROLE, &CREATED_AT];

impl EntitySchema for User {
    const ENTITY: &'static str = ENTITY;
    const TABLE: &'static str = "users";
    const ALIAS: &'static str = "user";
    const PAGE_LIMITS: PageLimits = limits::USERS;

    fn fields() -> &'static [&'static FieldDescriptor] {
        &FIELDS
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserFilterOr {
    #[serde(rename = "displayNameMATCH")]
    pub display_name_match: Option<String>,
    #[serde(rename = "displayNameIEQ")]
    pub display_name_ieq: Option<String>,
    #[serde(rename = "emailMATCH")]
    pub email_match: Option<String>,
    #[serde(rename = "emailIEQ")]
    pub email_ieq: Option<String>,
}

/// Client filter for user lists
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserFilter {
    pub id: Vec<i32>,
    #[serde(rename = "idNEQ")]
    pub id_neq: Vec<i32>,

    /// `Some(false)` selects inactive accounts
    pub activated: Option<bool>,

    #[serde(rename = "displayName")]
    pub display_name: Vec<String>,
    #[serde(rename = "displayNameNEQ")]
    pub display_name_neq: Vec<String>,
    #[serde(rename = "displayNameMATCH")]
    pub display_name_match: Option<String>,
    #[serde(rename = "displayNameIEQ")]
    pub display_name_ieq: Option<String>,

    pub email: Vec<String>,
    #[serde(rename = "emailNEQ")]
    pub email_neq: Vec<String>,
    #[serde(rename = "emailMATCH")]
    pub email_match: Option<String>,
    #[serde(rename = "emailIEQ")]
    pub email_ieq: Option<String>,

    pub role: Vec<String>,
    #[serde(rename = "roleNEQ")]
    pub role_neq: Vec<String>,

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

    pub or: Option<UserFilterOr>,
}

impl FilterInput for UserFilter {
    fn to_filter_node(&self) -> FilterNode {
        let mut node = FilterNode::new(ENTITY)
            .with(&ID, Operator::In, self.id.clone())
            .with(&ID, Operator::NotIn, self.id_neq.clone())
            .with_opt(&ACTIVATED, Operator::Eq, self.activated)
            .with(&DISPLAY_NAME, Operator::In, self.display_name.clone())
            .with(&DISPLAY_NAME, Operator::NotIn, self.display_name_neq.clone())
            .with_opt(&DISPLAY_NAME, Operator::Match, self.display_name_match.clone())
            .with_opt(&DISPLAY_NAME, Operator::IEq, self.display_name_ieq.clone())
            .with(&EMAIL, Operator::In, self.email.clone())
            .with(&EMAIL, Operator::NotIn, self.email_neq.clone())
            .with_opt(&EMAIL, Operator::Match, self.email_match.clone())
            .with_opt(&EMAIL, Operator::IEq, self.email_ieq.clone())
            .with(&ROLE, Operator::In, self.role.clone())
            .with(&ROLE, Operator::NotIn, self.role_neq.clone())
            .with_opt(&CREATED_AT, Operator::Eq, self.created_at)
            .with_opt(&CREATED_AT, Operator::Gt, self.created_at_gt)
            .with_opt(&CREATED_AT, Operator::Gte, self.created_at_gte)
            .with_opt(&CREATED_AT, Operator::Lt, self.created_at_lt)
            .with_opt(&CREATED_AT, Operator::Lte, self.created_at_lte);

        if let Some(or) = &self.or {
            node = node
                .or_with_opt(&DISPLAY_NAME, Operator::Match, or.display_name_match.clone())
                .or_with_opt(&DISPLAY_NAME, Operator::IEq, or.display_name_ieq.clone())
                .or_with_opt(&EMAIL, Operator::Match, or.email_match.clone())
                .or_with_opt(&EMAIL, Operator::IEq, or.email_ieq.clone());
        }

        node
    }
}
