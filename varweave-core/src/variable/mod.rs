//! Variables
//!
//! A variable is a named, possibly value-bearing entity that a template can
//! reference as a placeholder. Its value is either entered directly or
//! derived by running its `code` against the values of the variables it
//! depends on.
//!
//! # Overview
//!
//! - `Variable`: the record itself (name, value, dependency list, code,
//!   metadata, last update timestamp)
//! - `VariableStore`: ordered collection of variables, the single source of
//!   truth for names, values and declared edges
//! - `validate_name`: identifier rule shared by every entry point
//!
//! The store does no cycle checking of its own. Edits that touch the
//! dependency edges go through `Document`, which consults the
//! `DependencyGraph` before committing anything.

mod name;
mod record;
mod store;

pub use name::validate_name;
pub use record::Variable;
pub use store::VariableStore;
