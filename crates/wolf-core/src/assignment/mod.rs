//! Complete role hypotheses, their enumeration, and ranked search over them.

pub mod hypothesis;
pub mod permutations;
pub mod search;

pub use hypothesis::Assignment;
pub use permutations::{UniquePermutations, count_unique_permutations, multinomial};
pub use search::{AssignmentSearch, RoleProbabilities, SearchConfig, SearchMode, SearchOutcome};
