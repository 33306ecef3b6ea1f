pub mod evaluator;
pub mod vector;
