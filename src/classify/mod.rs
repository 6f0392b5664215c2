pub mod fuzzy;
pub mod signature;

pub use fuzzy::FuzzyClusterer;
pub use signature::{Classification, SignatureClassifier};
