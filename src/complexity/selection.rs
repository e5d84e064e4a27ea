use serde::{Deserialize, Serialize};

/// Pagination arguments that influence cost
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldArguments {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// One field of a parsed request, with its sub-selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionField {
    pub name: String,
    /// Named type the field resolves to, used to look up child costs
    #[serde(default)]
    pub output_type: Option<String>,
    #[serde(default)]
    pub arguments: FieldArguments,
    #[serde(default)]
    pub selections: Vec<SelectionField>,
}

impl SelectionField {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            output_type: None,
            arguments: FieldArguments::default(),
            selections: Vec::new(),
        }
    }

    pub fn of_type(mut self, output_type: impl Into<String>) -> Self {
        self.output_type = Some(output_type.into());
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.arguments.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.arguments.offset = Some(offset);
        self
    }

    pub fn select(mut self, field: SelectionField) -> Self {
        self.selections.push(field);
        self
    }

    /// Add several leaf fields at once
    pub fn select_leaves(mut self, names: &[&str]) -> Self {
        self.selections
            .extend(names.iter().map(|name| SelectionField::new(*name)));
        self
    }

    pub fn selects(&self, name: &str) -> bool {
        self.selections.iter().any(|field| field.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Query,
    Mutation,
}

impl OperationKind {
    pub fn root_type(&self) -> &'static str {
        match self {
            OperationKind::Query => "Query",
            OperationKind::Mutation => "Mutation",
        }
    }
}

/// The shape of one inbound operation, as seen by the complexity estimator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRequest {
    pub operation: OperationKind,
    pub selections: Vec<SelectionField>,
}

impl CostRequest {
    pub fn query(selections: Vec<SelectionField>) -> Self {
        Self {
            operation: OperationKind::Query,
            selections,
        }
    }

    pub fn mutation(selections: Vec<SelectionField>) -> Self {
        Self {
            operation: OperationKind::Mutation,
            selections,
        }
    }

    /// Whether the root field `name` asks for its `total` count
    pub fn selects_total(&self, name: &str) -> bool {
        self.selections
            .iter()
            .any(|field| field.name == name && field.selects("total"))
    }
}
