// mod.rs - Input data structures module

pub mod expression;
pub mod traits;

pub use expression::{ExpressionMatrix, MatrixFilters};
pub use traits::TraitMatrix;
