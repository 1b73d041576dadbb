//! Predictive failure-risk scoring components

pub mod encoders;
pub mod features;
pub mod loader;
pub mod model;
pub mod scorer;

pub use encoders::{CategoricalEncoder, EncoderSet, UnknownCategoryPolicy};
pub use loader::{load_artifact, RiskArtifact};
pub use model::RiskModel;
pub use scorer::{BatchOutcome, RiskScorer};
