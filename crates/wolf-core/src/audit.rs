//! End-of-game audit of seers that never came out.
//!
//! The set lives for the whole process and accumulates across games. It is
//! only cleared by [`reset_hidden_seers`], which batch drivers call between
//! independent experiments.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::{Level, event};

use crate::model::Agent;

static HIDDEN_SEERS: Lazy<Mutex<BTreeSet<Agent>>> = Lazy::new(|| Mutex::new(BTreeSet::new()));

/// Records `seer` as having kept its role hidden for a whole game.
pub fn record_hidden_seer(seer: Agent) {
    let inserted = HIDDEN_SEERS.lock().insert(seer);
    if inserted {
        event!(
            target: "wolf_core::audit",
            Level::INFO,
            seer = %seer,
            "seer stayed hidden for the whole game"
        );
    }
}

pub fn hidden_seers() -> BTreeSet<Agent> {
    HIDDEN_SEERS.lock().clone()
}

pub fn is_hidden_seer(agent: Agent) -> bool {
    HIDDEN_SEERS.lock().contains(&agent)
}

pub fn reset_hidden_seers() {
    HIDDEN_SEERS.lock().clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    // The set is process-wide, so everything touching it lives in one test.
    #[test]
    fn accumulates_until_reset() {
        reset_hidden_seers();
        record_hidden_seer(Agent::new(2));
        record_hidden_seer(Agent::new(2));
        record_hidden_seer(Agent::new(4));
        assert!(is_hidden_seer(Agent::new(4)));
        assert_eq!(hidden_seers().len(), 2);
        reset_hidden_seers();
        assert!(hidden_seers().is_empty());
    }
}
