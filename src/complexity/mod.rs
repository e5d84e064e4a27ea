//! # Query Complexity Admission
//!
//! Estimates the cost of a request before anything runs and rejects requests
//! whose cost is over the budget.
//!
//! List fields dominate: a list costs `rows * child * multiplier`, where
//! `rows` is the effective limit. Selecting a list's `total` adds a fixed
//! count cost to the list instead of being multiplied per row.
//!
//! ```rust,ignore
//! let estimator = ComplexityEstimator::new(CostModel::default());
//! let request = CostRequest::query(vec![
//!     SelectionField::new("professions")
//!         .of_type("ProfessionList")
//!         .limit(50)
//!         .select_leaves(&["total"])
//!         .select(SelectionField::new("items").of_type("Profession").select_leaves(&["id", "name"])),
//! ]);
//! let cost = estimator.admit(&request)?;
//! ```

pub mod model;
pub mod selection;

pub use model::{CostModel, FieldCost};
pub use selection::{CostRequest, FieldArguments, OperationKind, SelectionField};

use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComplexityError {
    #[error("query cost {cost} exceeds the complexity budget of {budget}")]
    BudgetExceeded { cost: u64, budget: u64 },
}

/// Cost of one selection set, with count fields kept apart for the enclosing list
#[derive(Debug, Clone, Copy, Default)]
struct SelectionCost {
    per_row: u64,
    counts: u64,
}

impl SelectionCost {
    /// Cost when no list is there to price the counts; each costs 1
    fn flattened(&self) -> u64 {
        self.per_row.saturating_add(self.counts)
    }
}

/// Computes request cost against a [`CostModel`]
#[derive(Debug, Clone, Default)]
pub struct ComplexityEstimator {
    model: CostModel,
}

impl ComplexityEstimator {
    pub fn new(model: CostModel) -> Self {
        Self { model }
    }

    pub fn budget(&self) -> u64 {
        self.model.budget()
    }

    /// Total cost of the request; saturates instead of overflowing
    pub fn estimate(&self, request: &CostRequest) -> u64 {
        self.selection_cost(request.operation.root_type(), &request.selections)
            .flattened()
    }

    /// Estimate and compare against the budget; a cost equal to the budget is admitted
    pub fn admit(&self, request: &CostRequest) -> Result<u64, ComplexityError> {
        let cost = self.estimate(request);
        let budget = self.model.budget();

        if cost > budget {
            warn!(
                cost = cost,
                budget = budget,
                operation = ?request.operation,
                "Rejecting request over complexity budget"
            );
            return Err(ComplexityError::BudgetExceeded { cost, budget });
        }

        debug!(cost = cost, budget = budget, "Admitted request");
        Ok(cost)
    }

    fn selection_cost(&self, parent_type: &str, fields: &[SelectionField]) -> SelectionCost {
        fields
            .iter()
            .fold(SelectionCost::default(), |mut acc, field| {
                match self.model.cost_of(parent_type, &field.name) {
                    FieldCost::Count => acc.counts = acc.counts.saturating_add(1),
                    cost => acc.per_row = acc.per_row.saturating_add(self.field_cost(field, cost)),
                }
                acc
            })
    }

    fn field_cost(&self, field: &SelectionField, cost: FieldCost) -> u64 {
        let child_type = field.output_type.as_deref().unwrap_or_default();
        let child = self.selection_cost(child_type, &field.selections);

        match cost {
            FieldCost::Default | FieldCost::Count => 1u64.saturating_add(child.flattened()),
            FieldCost::Fixed(weight) => weight.saturating_add(child.flattened()),
            FieldCost::List {
                limits,
                total_cost,
                multiplier,
            } => {
                let rows = u64::from(limits.effective_limit(field.arguments.limit));
                let items = rows.saturating_mul(child.per_row).saturating_mul(multiplier);
                if child.counts > 0 {
                    items.saturating_add(total_cost)
                } else {
                    items
                }
            }
        }
    }
}
