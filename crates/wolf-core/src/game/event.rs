//! Structured game events consumed by the engine.

use serde::{Deserialize, Serialize};

use crate::model::{Agent, Role, Species};

/// A per-role adjustment learned outside the engine (e.g. from talk behaviour).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoleDelta {
    pub role: Role,
    pub delta: f64,
}

/// One observation. Events must be fed to the engine in the order they happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GameEvent {
    /// `target` was killed by the werewolves' attack.
    Attacked { target: Agent },
    /// A vote actually cast at the execution.
    Vote { voter: Agent, target: Agent, day: u32 },
    /// The holder's own divination result.
    Divined { target: Agent, species: Species },
    /// The holder's own identification of an executed agent.
    Identified { target: Agent, species: Species },
    /// The holder guarded `target` and nobody died that night.
    Guarded { target: Agent },
    /// Public role claim.
    Comingout {
        talker: Agent,
        role: Role,
        day: u32,
        turn: u32,
    },
    /// Stated voting intention, not yet a vote.
    VoteIntent {
        talker: Agent,
        target: Agent,
        day: u32,
        turn: u32,
    },
    DivinationReport {
        talker: Agent,
        target: Agent,
        species: Species,
        day: u32,
        turn: u32,
    },
    IdentificationReport {
        talker: Agent,
        target: Agent,
        species: Species,
        day: u32,
        turn: u32,
    },
    /// Public claim of a successful guard.
    GuardReport {
        talker: Agent,
        target: Agent,
        day: u32,
        turn: u32,
    },
    /// Periodic re-evaluation at the start of the current day.
    DayStart,
    BehaviorEstimate { agent: Agent, deltas: Vec<RoleDelta> },
}

impl GameEvent {
    /// Short name used as the rule identifier in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            GameEvent::Attacked { .. } => "attacked",
            GameEvent::Vote { .. } => "vote",
            GameEvent::Divined { .. } => "divined",
            GameEvent::Identified { .. } => "identified",
            GameEvent::Guarded { .. } => "guarded",
            GameEvent::Comingout { .. } => "comingout",
            GameEvent::VoteIntent { .. } => "vote_intent",
            GameEvent::DivinationReport { .. } => "divination_report",
            GameEvent::IdentificationReport { .. } => "identification_report",
            GameEvent::GuardReport { .. } => "guard_report",
            GameEvent::DayStart => "day_start",
            GameEvent::BehaviorEstimate { .. } => "behavior_estimate",
        }
    }

    /// Every agent referenced by the event.
    pub fn agents(&self) -> Vec<Agent> {
        match self {
            GameEvent::Attacked { target }
            | GameEvent::Divined { target, .. }
            | GameEvent::Identified { target, .. }
            | GameEvent::Guarded { target } => vec![*target],
            GameEvent::Vote { voter, target, .. } => vec![*voter, *target],
            GameEvent::Comingout { talker, .. } => vec![*talker],
            GameEvent::VoteIntent { talker, target, .. }
            | GameEvent::DivinationReport { talker, target, .. }
            | GameEvent::IdentificationReport { talker, target, .. }
            | GameEvent::GuardReport { talker, target, .. } => vec![*talker, *target],
            GameEvent::DayStart => Vec::new(),
            GameEvent::BehaviorEstimate { agent, .. } => vec![*agent],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_deserialize_from_tagged_json() {
        let raw = r#"{"kind":"divination_report","talker":1,"target":3,"species":"werewolf","day":1,"turn":2}"#;
        let event: GameEvent = serde_json::from_str(raw).expect("valid event");
        assert_eq!(
            event,
            GameEvent::DivinationReport {
                talker: Agent::new(1),
                target: Agent::new(3),
                species: Species::Werewolf,
                day: 1,
                turn: 2,
            }
        );
        assert_eq!(event.kind(), "divination_report");
    }

    #[test]
    fn agents_lists_every_participant() {
        let event = GameEvent::Vote {
            voter: Agent::new(0),
            target: Agent::new(4),
            day: 1,
        };
        assert_eq!(event.agents(), vec![Agent::new(0), Agent::new(4)]);
        assert!(GameEvent::DayStart.agents().is_empty());
    }
}
