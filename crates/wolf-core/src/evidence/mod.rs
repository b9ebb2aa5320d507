//! Evidence matrix, the update rules that feed it, and their tuning weights.

pub mod matrix;
pub mod plan;
pub mod rules;
pub mod selector;
pub mod weights;

pub use matrix::{EvidenceMatrix, SCORE_BOUND};
pub use plan::{Delta, EvidencePlan};
pub use rules::RuleContext;
pub use selector::RoleSelector;
pub use weights::RuleWeights;
