use examhub_core::complexity::SelectionField;
use proptest::prelude::*;

/// Identifiers the sort grammar accepts, optionally alias-qualified
pub fn sort_identifier_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z][a-zA-Z_]{0,15}",
        ("[a-z][a-z_]{0,10}", "[a-z][a-zA-Z_]{0,10}").prop_map(|(alias, column)| format!("{alias}.{column}")),
    ]
}

pub fn sort_direction_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("ASC".to_string()),
        Just("DESC".to_string()),
        Just("asc".to_string()),
        Just("desc".to_string()),
        "[a-zA-Z]{1,6}",
    ]
}

/// Expressions inside the grammar
pub fn valid_sort_expression_strategy() -> impl Strategy<Value = String> {
    (sort_identifier_strategy(), sort_direction_strategy())
        .prop_map(|(identifier, direction)| format!("{identifier} {direction}"))
}

/// Arbitrary client text, mostly outside the grammar
pub fn hostile_sort_expression_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        ".{0,40}",
        "[a-z]{1,8}[;'\"()\\-]{1,4}[ a-zA-Z;]{0,10}",
        "[a-z]{1,8} [A-Z]{3,4} [a-z ;-]{1,10}",
    ]
}

/// A list of leaf fields under one object
pub fn leaves_strategy() -> impl Strategy<Value = Vec<SelectionField>> {
    prop::collection::vec("[a-z]{1,8}", 1..6)
        .prop_map(|names| names.into_iter().map(SelectionField::new).collect())
}
