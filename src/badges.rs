//! Badge catalog and the evaluator that decides which badges a player has newly earned.

pub mod catalog;
pub mod evaluator;
pub mod predicates;

pub use catalog::{BadgeCatalog, CatalogError};
pub use evaluator::{evaluate, qualifies};
