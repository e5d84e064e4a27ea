use super::descriptor::Operator;
use super::node::{FieldCondition, FilterNode, RelationFilter, ScopedFilter};
use crate::query_builder::{
    qualify_column, Join, Predicate, RangeOp, SelectQuery, SqlValue, WhereClause,
};
use tracing::{debug, warn};

/// Output of compiling one [`FilterNode`]
#[derive(Debug, Clone, Default)]
pub struct CompiledFilter {
    /// ANDed together by the query builder
    pub clauses: Vec<WhereClause>,
    pub joins: Vec<Join>,
}

impl CompiledFilter {
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty() && self.joins.is_empty()
    }

    /// Attach the joins and predicates to a query
    pub fn apply_to(self, query: SelectQuery) -> SelectQuery {
        let query = self.joins.into_iter().fold(query, SelectQuery::join);
        self.clauses
            .into_iter()
            .fold(query, SelectQuery::where_clause)
    }
}

/// Lowers filter nodes to parameterized predicates and joins
pub struct FilterCompiler;

impl FilterCompiler {
    /// Compile `filter` with every column qualified by `alias`
    ///
    /// `None` and empty filters compile to nothing.
    pub fn compile(filter: Option<&FilterNode>, alias: &str) -> CompiledFilter {
        let mut compiled = CompiledFilter::default();
        let Some(filter) = filter else {
            return compiled;
        };

        for condition in filter.conditions() {
            if let Some(predicate) = Self::predicate(condition, alias) {
                compiled.clauses.push(WhereClause::single(predicate));
            }
        }

        let group: Vec<Predicate> = filter
            .any_of()
            .iter()
            .filter_map(|condition| Self::predicate(condition, alias))
            .collect();
        if !group.is_empty() {
            compiled.clauses.push(WhereClause::or(group));
        }

        for (position, relation) in filter.relations().iter().enumerate() {
            compiled
                .joins
                .push(Self::relation_join(relation, alias, position + 1));
        }

        for scoped in filter.scoped() {
            let nested = Self::scoped(scoped, alias);
            compiled.joins.extend(nested.joins);
            compiled.clauses.extend(nested.clauses);
        }

        debug!(
            entity = filter.entity(),
            alias = alias,
            clauses = compiled.clauses.len(),
            joins = compiled.joins.len(),
            "Compiled filter"
        );

        compiled
    }

    /// Compile under the query's own alias and attach the result
    pub fn apply(query: SelectQuery, filter: Option<&FilterNode>) -> SelectQuery {
        let compiled = Self::compile(filter, query.alias());
        compiled.apply_to(query)
    }

    /// `None` for a pattern operator carrying a non-text value
    fn predicate(condition: &FieldCondition, alias: &str) -> Option<Predicate> {
        let column = qualify_column(alias, condition.field.column);

        let predicate = match condition.operator {
            Operator::In => Predicate::Equals {
                column,
                values: as_set(condition.value.clone()),
            },
            Operator::NotIn => Predicate::NotEquals {
                column,
                values: as_set(condition.value.clone()),
            },
            Operator::Eq => range(column, RangeOp::Eq, &condition.value),
            Operator::Gt => range(column, RangeOp::Gt, &condition.value),
            Operator::Gte => range(column, RangeOp::Gte, &condition.value),
            Operator::Lt => range(column, RangeOp::Lt, &condition.value),
            Operator::Lte => range(column, RangeOp::Lte, &condition.value),
            Operator::Match | Operator::IEq => {
                let Some(pattern) = as_pattern(&condition.value) else {
                    warn!(
                        field = condition.field.name,
                        value = ?condition.value,
                        "Skipping pattern condition without a text value"
                    );
                    return None;
                };
                if condition.operator == Operator::Match {
                    Predicate::Pattern { column, pattern }
                } else {
                    Predicate::CaseInsensitivePattern { column, pattern }
                }
            }
        };

        Some(predicate)
    }

    /// Derived table of owners related to all requested ids, inner-joined on the owner key
    ///
    /// ```sql
    /// INNER JOIN (
    ///     SELECT "links"."owner_id" FROM "links" AS "links"
    ///     WHERE "links"."related_id" = ANY($1)
    ///     GROUP BY "links"."owner_id"
    ///     HAVING COUNT("links"."related_id") >= $2
    /// ) AS "owner__links_1" ON "owner__links_1"."owner_id" = "owner"."id"
    /// ```
    ///
    /// `position` numbers the relation filters of one node, so two filters
    /// over the same association table get distinct joins.
    fn relation_join(relation_filter: &RelationFilter, alias: &str, position: usize) -> Join {
        let relation = relation_filter.relation;
        let inner_alias = relation.association_table;
        let owner = qualify_column(inner_alias, relation.owner_column);

        let subquery = SelectQuery::new(relation.association_table, inner_alias)
            .select(vec![owner.clone()])
            .group_by(owner)
            .having_clause(WhereClause::single(Predicate::RelationCount {
                column: qualify_column(inner_alias, relation.related_column),
                min: relation_filter.min_matches,
            }));
        let subquery = Self::apply(subquery, Some(&relation_filter.filter));

        let joined_alias = format!("{alias}__{}_{position}", relation.association_table);
        let on_condition = format!(
            "{} = {}",
            qualify_column(&joined_alias, relation.owner_column),
            qualify_column(alias, relation.owner_key)
        );

        Join::inner_derived(subquery, &joined_alias, on_condition)
    }

    /// Inner join to the related table, with the nested filter compiled under its alias
    fn scoped(scoped: &ScopedFilter, alias: &str) -> CompiledFilter {
        let relation = scoped.relation;
        let on_condition = format!(
            "{} = {}",
            qualify_column(relation.alias, relation.primary_key),
            qualify_column(alias, relation.foreign_key)
        );

        let nested = Self::compile(Some(&scoped.filter), relation.alias);
        let mut joins = vec![Join::inner(relation.table, relation.alias, on_condition)];
        joins.extend(nested.joins);

        CompiledFilter {
            clauses: nested.clauses,
            joins,
        }
    }
}

fn range(column: String, op: RangeOp, value: &SqlValue) -> Predicate {
    Predicate::Range {
        column,
        op,
        value: value.clone(),
    }
}

/// Set operators always bind an array, so a scalar is promoted to a singleton
fn as_set(value: SqlValue) -> SqlValue {
    match value {
        SqlValue::Int(v) => SqlValue::IntArray(vec![v]),
        SqlValue::Text(v) => SqlValue::TextArray(vec![v]),
        other => other,
    }
}

fn as_pattern(value: &SqlValue) -> Option<String> {
    match value {
        SqlValue::Text(pattern) => Some(pattern.clone()),
        SqlValue::TextArray(patterns) => patterns.first().cloned(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::descriptor::{
        BelongsToDescriptor, FieldDescriptor, ManyToManyDescriptor, SET_OPERATORS,
        TEMPORAL_OPERATORS, TEXT_OPERATORS,
    };
    use chrono::{TimeZone, Utc};

    static ID: FieldDescriptor = FieldDescriptor::new("widget", "id", "id", SET_OPERATORS);
    static NAME: FieldDescriptor = FieldDescriptor::new("widget", "name", "name", TEXT_OPERATORS);
    static CREATED_AT: FieldDescriptor =
        FieldDescriptor::new("widget", "createdAt", "created_at", TEMPORAL_OPERATORS);
    static PART_ID: FieldDescriptor =
        FieldDescriptor::new("widget_parts", "partID", "part_id", SET_OPERATORS);
    static MAKER_NAME: FieldDescriptor =
        FieldDescriptor::new("maker", "name", "name", TEXT_OPERATORS);
    static PARTS: ManyToManyDescriptor = ManyToManyDescriptor {
        entity: "widget",
        association_entity: "widget_parts",
        association_table: "widget_parts",
        owner_column: "widget_id",
        related_column: "part_id",
        owner_key: "id",
    };
    static MAKER: BelongsToDescriptor = BelongsToDescriptor {
        entity: "widget",
        related_entity: "maker",
        table: "makers",
        alias: "maker",
        foreign_key: "maker_id",
        primary_key: "id",
    };

    fn query() -> SelectQuery {
        SelectQuery::new("widgets", "widget")
    }

    #[test]
    fn test_absent_filter_adds_nothing() {
        assert!(FilterCompiler::compile(None, "widget").is_empty());
        let sql = FilterCompiler::apply(query(), Some(&FilterNode::new("widget"))).to_sql();
        assert_eq!(sql, r#"SELECT "widget".* FROM "widgets" AS "widget""#);
    }

    #[test]
    fn test_conditions_and_or_group() {
        let filter = FilterNode::new("widget")
            .with(&ID, Operator::In, vec![1, 2])
            .with(&NAME, Operator::NotIn, vec!["x".to_string()])
            .or_with(&NAME, Operator::Match, "a%")
            .or_with(&NAME, Operator::IEq, "b%");

        let sql = FilterCompiler::apply(query(), Some(&filter)).to_sql();
        assert_eq!(
            sql,
            concat!(
                r#"SELECT "widget".* FROM "widgets" AS "widget" WHERE "widget"."id" = ANY($1)"#,
                r#" AND NOT ("widget"."name" = ANY($2))"#,
                r#" AND ("widget"."name" LIKE $3 OR "widget"."name" ILIKE $4)"#
            )
        );
    }

    #[test]
    fn test_temporal_range() {
        let since = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let filter = FilterNode::new("widget")
            .with(&CREATED_AT, Operator::Gte, since)
            .with(&CREATED_AT, Operator::Lt, Utc::now());

        let sql = FilterCompiler::apply(query(), Some(&filter)).to_sql();
        assert!(sql.ends_with(r#"WHERE "widget"."created_at" >= $1 AND "widget"."created_at" < $2"#));
    }

    #[test]
    fn test_relation_filter_requires_every_id() {
        let filter = FilterNode::new("widget").with_related_ids(&PARTS, &PART_ID, &[4, 5, 5]);
        let compiled = FilterCompiler::compile(Some(&filter), "widget");

        assert!(compiled.clauses.is_empty());
        assert_eq!(compiled.joins.len(), 1);
        assert_eq!(
            compiled.joins[0].to_sql(),
            concat!(
                r#"INNER JOIN (SELECT "widget_parts"."widget_id" FROM "widget_parts" AS "widget_parts""#,
                r#" WHERE "widget_parts"."part_id" = ANY($1) GROUP BY "widget_parts"."widget_id""#,
                r#" HAVING COUNT("widget_parts"."part_id") >= $2)"#,
                r#" AS "widget__widget_parts_1" ON "widget__widget_parts_1"."widget_id" = "widget"."id""#
            )
        );
    }

    #[test]
    fn test_scoped_filter_compiles_under_relation_alias() {
        let nested = FilterNode::new("maker").with(&MAKER_NAME, Operator::IEq, "acme%");
        let filter = FilterNode::new("widget")
            .with(&ID, Operator::In, vec![9])
            .with_scoped(&MAKER, nested);

        let sql = FilterCompiler::apply(query(), Some(&filter)).to_sql();
        assert_eq!(
            sql,
            concat!(
                r#"SELECT "widget".* FROM "widgets" AS "widget""#,
                r#" INNER JOIN "makers" AS "maker" ON "maker"."id" = "widget"."maker_id""#,
                r#" WHERE "widget"."id" = ANY($1) AND "maker"."name" ILIKE $2"#
            )
        );
    }

    #[test]
    fn test_hostile_values_only_reach_bind_parameters() {
        let filter = FilterNode::new("widget").with(&NAME, Operator::Match, "'; DROP TABLE widgets; --");
        let sql = FilterCompiler::apply(query(), Some(&filter)).to_sql();
        assert!(!sql.contains("DROP"));
        assert!(sql.contains("LIKE $1"));
    }

    #[test]
    fn test_pattern_without_text_value_is_skipped() {
        let filter = FilterNode::new("widget")
            .with(&ID, Operator::In, vec![3])
            .with(&NAME, Operator::Match, 42)
            .or_with(&NAME, Operator::IEq, true);

        let compiled = FilterCompiler::compile(Some(&filter), "widget");

        assert_eq!(compiled.clauses.len(), 1);
        let sql = FilterCompiler::apply(query(), Some(&filter)).to_sql();
        assert!(!sql.contains("LIKE"));
        assert!(sql.ends_with(r#"WHERE "widget"."id" = ANY($1)"#));
    }

    #[test]
    fn test_two_filters_on_one_relation_keep_both_joins() {
        let filter = FilterNode::new("widget")
            .with_related_ids(&PARTS, &PART_ID, &[4])
            .with_related_ids(&PARTS, &PART_ID, &[5]);

        let sql = FilterCompiler::apply(query(), Some(&filter)).to_sql();

        assert_eq!(sql.matches("INNER JOIN").count(), 2);
        assert!(sql.contains(r#"AS "widget__widget_parts_1""#));
        assert!(sql.contains(r#"AS "widget__widget_parts_2""#));
        assert!(sql.contains(r#""widget_parts"."part_id" = ANY($1)"#));
        assert!(sql.contains(r#""widget_parts"."part_id" = ANY($3)"#));
    }
}
