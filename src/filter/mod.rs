//! # Filter Compilation
//!
//! Turns structured client filters into parameterized SQL.
//!
//! - [`descriptor`] - Static field and relation tables per entity
//! - [`node`] - [`FilterNode`], the validated filter tree
//! - [`compiler`] - [`FilterCompiler`], lowering nodes to predicates and joins
//!
//! Typed client inputs implement [`FilterInput`] to produce a node; the
//! repository layer then compiles it under the entity alias.

pub mod compiler;
pub mod descriptor;
pub mod node;

pub use compiler::{CompiledFilter, FilterCompiler};
pub use descriptor::{
    BelongsToDescriptor, EntitySchema, FieldDescriptor, ManyToManyDescriptor, Operator,
};
pub use node::{FieldCondition, FilterNode, RelationFilter, ScopedFilter};

/// Client filter input that lowers to a [`FilterNode`]
pub trait FilterInput {
    fn to_filter_node(&self) -> FilterNode;
}
