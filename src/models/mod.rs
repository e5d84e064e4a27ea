//! # Data Models
//!
//! Row types and their filter schemas.
//!
//! Every entity module carries three things side by side: the `FromRow`
//! struct, the static [`FieldDescriptor`] table describing what a client may
//! filter on, and the typed filter input that lowers to a
//! [`crate::filter::FilterNode`].
//!
//! ## Entities
//!
//! - [`Profession`] (`professions`)
//! - [`Qualification`] (`qualifications`), linked to professions many-to-many
//! - [`Question`] (`questions`), belonging to one qualification
//! - [`User`] (`users`)

pub mod profession;
pub mod qualification;
pub mod question;
pub mod user;

use crate::filter::descriptor::{FieldDescriptor, SET_OPERATORS};

pub use profession::{Profession, ProfessionFilter};
pub use qualification::{
    Qualification, QualificationFilter, QualificationFilterOr, QualificationInput,
};
pub use question::{Question, QuestionFilter};
pub use user::{User, UserFilter, UserFilterOr};

/// Association between qualifications and professions
pub const ASSOCIATION_TABLE: &str = "qualification_to_professions";
pub const ASSOCIATION_ENTITY: &str = "qualification_to_profession";

pub static ASSOCIATED_QUALIFICATION_ID: FieldDescriptor = FieldDescriptor::new(
    ASSOCIATION_ENTITY,
    "qualificationID",
    "qualification_id",
    SET_OPERATORS,
);

pub static ASSOCIATED_PROFESSION_ID: FieldDescriptor = FieldDescriptor::new(
    ASSOCIATION_ENTITY,
    "professionID",
    "profession_id",
    SET_OPERATORS,
);
