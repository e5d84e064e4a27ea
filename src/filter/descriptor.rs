//! Declarative field and relation descriptors.
//!
//! Each entity publishes a static table of the fields a client may filter on,
//! which operators each field accepts, and how it relates to other entities.
//! The compiler never sees a column name that did not come from one of these
//! tables.

use crate::query_builder::PageLimits;

/// Filter operator, named after the client-facing suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Exact match against a set (no suffix)
    In,
    /// Exclusion from a set (`NEQ`)
    NotIn,
    /// Single-value equality (no suffix on scalar fields)
    Eq,
    /// `GT`
    Gt,
    /// `GTE`
    Gte,
    /// `LT`
    Lt,
    /// `LTE`
    Lte,
    /// Case-sensitive pattern (`MATCH`)
    Match,
    /// Case-insensitive pattern (`IEQ`)
    IEq,
}

impl Operator {
    /// The suffix a client appends to the field name
    pub fn suffix(&self) -> &'static str {
        match self {
            Operator::In | Operator::Eq => "",
            Operator::NotIn => "NEQ",
            Operator::Gt => "GT",
            Operator::Gte => "GTE",
            Operator::Lt => "LT",
            Operator::Lte => "LTE",
            Operator::Match => "MATCH",
            Operator::IEq => "IEQ",
        }
    }
}

pub const SET_OPERATORS: &[Operator] = &[Operator::In, Operator::NotIn];
pub const TEXT_OPERATORS: &[Operator] = &[
    Operator::In,
    Operator::NotIn,
    Operator::Match,
    Operator::IEq,
];
pub const PATTERN_OPERATORS: &[Operator] = &[Operator::Match, Operator::IEq];
pub const TEMPORAL_OPERATORS: &[Operator] = &[
    Operator::Eq,
    Operator::Gt,
    Operator::Gte,
    Operator::Lt,
    Operator::Lte,
];
pub const EQUALITY_OPERATORS: &[Operator] = &[Operator::Eq];

/// A filterable column of one entity
#[derive(Debug, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub entity: &'static str,
    /// Client-facing name, before any operator suffix
    pub name: &'static str,
    pub column: &'static str,
    pub operators: &'static [Operator],
}

impl FieldDescriptor {
    pub const fn new(
        entity: &'static str,
        name: &'static str,
        column: &'static str,
        operators: &'static [Operator],
    ) -> Self {
        Self {
            entity,
            name,
            column,
            operators,
        }
    }

    pub fn supports(&self, operator: Operator) -> bool {
        self.operators.contains(&operator)
    }
}

/// A to-many relation stored in an association table
///
/// Filtering through it requires every requested related id to be present.
#[derive(Debug, PartialEq, Eq)]
pub struct ManyToManyDescriptor {
    /// Entity that owns the relation
    pub entity: &'static str,
    /// Entity name used for descriptors of the association table
    pub association_entity: &'static str,
    pub association_table: &'static str,
    /// Association column pointing back at the owner
    pub owner_column: &'static str,
    /// Association column pointing at the related entity
    pub related_column: &'static str,
    /// Owner column the association references
    pub owner_key: &'static str,
}

/// A to-one relation reached through a foreign key on the owner
#[derive(Debug, PartialEq, Eq)]
pub struct BelongsToDescriptor {
    pub entity: &'static str,
    /// Entity name of the related side, checked against nested filters
    pub related_entity: &'static str,
    pub table: &'static str,
    /// Fixed alias the related table is joined under
    pub alias: &'static str,
    pub foreign_key: &'static str,
    pub primary_key: &'static str,
}

/// Static description of a queryable entity
pub trait EntitySchema {
    const ENTITY: &'static str;
    const TABLE: &'static str;
    const ALIAS: &'static str;
    const PAGE_LIMITS: PageLimits;

    /// Every filterable field
    fn fields() -> &'static [&'static FieldDescriptor];

    /// To-one relations a sort key may reach through its alias
    fn sortable_relations() -> &'static [&'static BelongsToDescriptor] {
        &[]
    }

    fn field(name: &str) -> Option<&'static FieldDescriptor> {
        Self::fields().iter().copied().find(|field| field.name == name)
    }
}
