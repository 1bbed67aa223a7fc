//! Feature Row Assembly
//!
//! Turns the ordered feature vectors of one or more cubes into named,
//! fixed-width rows and reads/writes them as CSV.

mod assembler;
mod error;
mod kind;
mod table;

pub use assembler::{assemble, assemble_batch, FeatureRow, FeatureSet, EXTRA_COLUMNS};
pub use error::AssemblyError;
pub use kind::FeatureKind;
pub use table::FeatureTable;
