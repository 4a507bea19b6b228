pub mod coverage;
pub mod readiness;
pub mod stability;

pub use coverage::calculate_coverage;
pub use readiness::{compute_components, overall_score, round2, ReadinessInputs};
pub use stability::calculate_stability;
