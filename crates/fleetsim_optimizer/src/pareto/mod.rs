pub mod acceptance;
pub mod archive;
pub mod dominance;
pub mod normalizer;
