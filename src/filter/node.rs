use super::descriptor::{BelongsToDescriptor, FieldDescriptor, ManyToManyDescriptor, Operator};
use crate::query_builder::SqlValue;
use tracing::warn;

/// One field constraint inside a [`FilterNode`]
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCondition {
    pub field: &'static FieldDescriptor,
    pub operator: Operator,
    pub value: SqlValue,
}

/// "Owner must be related to all of these": a to-many constraint
#[derive(Debug, Clone, PartialEq)]
pub struct RelationFilter {
    pub relation: &'static ManyToManyDescriptor,
    /// Constraint over the association table
    pub filter: FilterNode,
    /// Number of distinct related rows that must match
    pub min_matches: i64,
}

/// A nested filter over a to-one relation
#[derive(Debug, Clone, PartialEq)]
pub struct ScopedFilter {
    pub relation: &'static BelongsToDescriptor,
    pub filter: FilterNode,
}

/// Structured filter for one entity
///
/// Built from typed client input; absent or zero values never make it in,
/// so compiling an empty node adds nothing to a query.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterNode {
    entity: &'static str,
    conditions: Vec<FieldCondition>,
    any_of: Vec<FieldCondition>,
    relations: Vec<RelationFilter>,
    scoped: Vec<ScopedFilter>,
}

impl FilterNode {
    pub fn new(entity: &'static str) -> Self {
        Self {
            entity,
            conditions: Vec::new(),
            any_of: Vec::new(),
            relations: Vec::new(),
            scoped: Vec::new(),
        }
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }

    pub fn conditions(&self) -> &[FieldCondition] {
        &self.conditions
    }

    pub fn any_of(&self) -> &[FieldCondition] {
        &self.any_of
    }

    pub fn relations(&self) -> &[RelationFilter] {
        &self.relations
    }

    pub fn scoped(&self) -> &[ScopedFilter] {
        &self.scoped
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
            && self.any_of.is_empty()
            && self.relations.is_empty()
            && self.scoped.is_empty()
    }

    /// AND a constraint onto the node
    pub fn with(
        mut self,
        field: &'static FieldDescriptor,
        operator: Operator,
        value: impl Into<SqlValue>,
    ) -> Self {
        if let Some(condition) = self.accept(field, operator, value.into()) {
            self.conditions.push(condition);
        }
        self
    }

    /// AND a constraint when a value is present
    pub fn with_opt<V: Into<SqlValue>>(
        self,
        field: &'static FieldDescriptor,
        operator: Operator,
        value: Option<V>,
    ) -> Self {
        match value {
            Some(value) => self.with(field, operator, value),
            None => self,
        }
    }

    /// Add a constraint to the OR group, which compiles as one parenthesized term
    pub fn or_with(
        mut self,
        field: &'static FieldDescriptor,
        operator: Operator,
        value: impl Into<SqlValue>,
    ) -> Self {
        if let Some(condition) = self.accept(field, operator, value.into()) {
            self.any_of.push(condition);
        }
        self
    }

    pub fn or_with_opt<V: Into<SqlValue>>(
        self,
        field: &'static FieldDescriptor,
        operator: Operator,
        value: Option<V>,
    ) -> Self {
        match value {
            Some(value) => self.or_with(field, operator, value),
            None => self,
        }
    }

    /// Require the owner to be related to every id in `ids`
    ///
    /// `related_field` describes the related column of the association table.
    /// Duplicate ids are collapsed before the required match count is taken.
    pub fn with_related_ids(
        mut self,
        relation: &'static ManyToManyDescriptor,
        related_field: &'static FieldDescriptor,
        ids: &[i32],
    ) -> Self {
        if relation.entity != self.entity {
            warn!(
                entity = self.entity,
                relation_entity = relation.entity,
                "Ignoring relation filter declared for another entity"
            );
            debug_assert!(false, "relation declared for another entity");
            return self;
        }

        let mut distinct = ids.to_vec();
        distinct.sort_unstable();
        distinct.dedup();
        if distinct.is_empty() {
            return self;
        }

        let min_matches = distinct.len() as i64;
        let filter = FilterNode::new(relation.association_entity).with(
            related_field,
            Operator::In,
            distinct,
        );

        self.relations.push(RelationFilter {
            relation,
            filter,
            min_matches,
        });
        self
    }

    /// Apply a nested filter through a to-one relation
    pub fn with_scoped(mut self, relation: &'static BelongsToDescriptor, filter: FilterNode) -> Self {
        if filter.is_empty() {
            return self;
        }

        if relation.entity != self.entity || relation.related_entity != filter.entity {
            warn!(
                entity = self.entity,
                relation_entity = relation.entity,
                nested_entity = filter.entity,
                "Ignoring scoped filter with mismatched entities"
            );
            debug_assert!(false, "scoped filter entity mismatch");
            return self;
        }

        self.scoped.push(ScopedFilter { relation, filter });
        self
    }

    fn accept(
        &self,
        field: &'static FieldDescriptor,
        operator: Operator,
        value: SqlValue,
    ) -> Option<FieldCondition> {
        if value.is_zero() {
            return None;
        }

        if field.entity != self.entity || !field.supports(operator) {
            warn!(
                entity = self.entity,
                field_entity = field.entity,
                field = field.name,
                operator = ?operator,
                "Ignoring filter condition not declared for this entity"
            );
            debug_assert!(false, "undeclared filter condition");
            return None;
        }

        Some(FieldCondition {
            field,
            operator,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::descriptor::{SET_OPERATORS, TEXT_OPERATORS};

    static ID: FieldDescriptor = FieldDescriptor::new("widget", "id", "id", SET_OPERATORS);
    static NAME: FieldDescriptor = FieldDescriptor::new("widget", "name", "name", TEXT_OPERATORS);
    static PART_ID: FieldDescriptor =
        FieldDescriptor::new("widget_parts", "partID", "part_id", SET_OPERATORS);
    static PARTS: ManyToManyDescriptor = ManyToManyDescriptor {
        entity: "widget",
        association_entity: "widget_parts",
        association_table: "widget_parts",
        owner_column: "widget_id",
        related_column: "part_id",
        owner_key: "id",
    };

    #[test]
    fn test_zero_values_are_skipped() {
        let node = FilterNode::new("widget")
            .with(&ID, Operator::In, Vec::<i32>::new())
            .with(&NAME, Operator::Match, "")
            .or_with_opt(&NAME, Operator::IEq, None::<String>);

        assert!(node.is_empty());
    }

    #[test]
    fn test_conditions_accumulate() {
        let node = FilterNode::new("widget")
            .with(&ID, Operator::NotIn, vec![3])
            .or_with(&NAME, Operator::Match, "a%")
            .or_with(&NAME, Operator::IEq, "b%");

        assert_eq!(node.conditions().len(), 1);
        assert_eq!(node.any_of().len(), 2);
    }

    #[test]
    fn test_related_ids_are_deduplicated() {
        let node = FilterNode::new("widget").with_related_ids(&PARTS, &PART_ID, &[4, 4, 7]);

        let relation = &node.relations()[0];
        assert_eq!(relation.min_matches, 2);
        assert_eq!(relation.filter.conditions()[0].value, SqlValue::IntArray(vec![4, 7]));
    }

    #[test]
    fn test_empty_related_ids_add_nothing() {
        let node = FilterNode::new("widget").with_related_ids(&PARTS, &PART_ID, &[]);
        assert!(node.is_empty());
    }
}
