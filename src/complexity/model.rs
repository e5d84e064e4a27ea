use crate::config::LimitsConfig;
use crate::constants::complexity::*;
use crate::query_builder::PageLimits;
use std::collections::HashMap;

/// How one field contributes to the cost of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCost {
    /// `1 + child`
    Default,
    /// `n + child`
    Fixed(u64),
    /// `rows * child * multiplier`, plus `total_cost` when the count is also requested
    List {
        limits: PageLimits,
        total_cost: u64,
        multiplier: u64,
    },
    /// The count behind a list; priced by the enclosing list
    Count,
}

/// Cost weights keyed by `Type.field`, with the budget they are checked against
#[derive(Debug, Clone)]
pub struct CostModel {
    budget: u64,
    fields: HashMap<String, FieldCost>,
}

impl CostModel {
    /// An empty model where every field costs `1 + child`
    pub fn new(budget: u64) -> Self {
        Self {
            budget,
            fields: HashMap::new(),
        }
    }

    pub fn with_field(mut self, type_name: &str, field: &str, cost: FieldCost) -> Self {
        self.fields.insert(format!("{type_name}.{field}"), cost);
        self
    }

    pub fn budget(&self) -> u64 {
        self.budget
    }

    pub fn cost_of(&self, type_name: &str, field: &str) -> FieldCost {
        self.fields
            .get(&format!("{type_name}.{field}"))
            .copied()
            .unwrap_or(FieldCost::Default)
    }

    /// The production weights, with list sizes taken from `limits`
    pub fn standard(budget: u64, limits: &LimitsConfig) -> Self {
        let list = |page: PageLimits, total_cost: u64, multiplier: u64| FieldCost::List {
            limits: page,
            total_cost,
            multiplier,
        };

        let mut model = Self::new(budget)
            .with_field("Query", "professions", list(limits.professions, PROFESSIONS_TOTAL_COST, 1))
            .with_field(
                "Query",
                "qualifications",
                list(limits.qualifications, QUALIFICATIONS_TOTAL_COST, 1),
            )
            .with_field(
                "Query",
                "similarQualifications",
                list(limits.qualifications, QUALIFICATIONS_TOTAL_COST, 1),
            )
            .with_field("Query", "questions", list(limits.questions, QUESTIONS_TOTAL_COST, 1))
            .with_field("Query", "users", list(limits.users, USERS_TOTAL_COST, 1))
            .with_field(
                "Query",
                "generateTest",
                list(limits.generated_test, 0, GENERATE_TEST_MULTIPLIER),
            )
            .with_field("ProfessionList", "total", FieldCost::Count)
            .with_field("QualificationList", "total", FieldCost::Count)
            .with_field("QuestionList", "total", FieldCost::Count)
            .with_field("UserList", "total", FieldCost::Count)
            .with_field(
                "Profession",
                "qualifications",
                FieldCost::Fixed(PROFESSION_QUALIFICATIONS_COST),
            );

        let default_mutation = FieldCost::Fixed(budget / DEFAULT_MUTATION_DIVISOR);
        for name in [
            "createProfession",
            "updateProfession",
            "deleteProfessions",
            "createQualification",
            "updateQualification",
            "deleteQualifications",
            "createUser",
            "updateUser",
            "updateManyUsers",
            "deleteUsers",
        ] {
            model = model.with_field("Mutation", name, default_mutation);
        }

        let question_mutation = FieldCost::Fixed(budget / QUESTION_MUTATION_DIVISOR);
        for name in ["createQuestion", "updateQuestion", "deleteQuestions"] {
            model = model.with_field("Mutation", name, question_mutation);
        }

        model.with_field("Mutation", "signIn", FieldCost::Fixed(budget / SIGN_IN_DIVISOR))
    }
}

impl Default for CostModel {
    fn default() -> Self {
        Self::standard(COMPLEXITY_BUDGET, &LimitsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_fields_use_default_cost() {
        let model = CostModel::default();
        assert_eq!(model.cost_of("Profession", "name"), FieldCost::Default);
        assert_eq!(model.cost_of("Nope", "nope"), FieldCost::Default);
    }

    #[test]
    fn test_standard_mutation_weights() {
        let model = CostModel::default();
        assert_eq!(model.cost_of("Mutation", "createUser"), FieldCost::Fixed(2_000));
        assert_eq!(model.cost_of("Mutation", "updateQuestion"), FieldCost::Fixed(2_500));
        assert_eq!(model.cost_of("Mutation", "signIn"), FieldCost::Fixed(5_000));
    }

    #[test]
    fn test_list_totals_are_count_fields() {
        let model = CostModel::default();
        assert_eq!(model.cost_of("QuestionList", "total"), FieldCost::Count);
        assert!(matches!(
            model.cost_of("Query", "questions"),
            FieldCost::List { total_cost: 300, multiplier: 1, .. }
        ));
    }
}
