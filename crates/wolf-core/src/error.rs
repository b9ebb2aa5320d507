use thiserror::Error;

use crate::model::{Agent, Role, Side};

/// Failures surfaced by the inference engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum EngineError {
    #[error("unsupported population size {players} (expected 5 or 15)")]
    UnsupportedPopulation { players: usize },

    #[error("side {side} has no role list in a {players}-player village")]
    InvalidSide { side: Side, players: usize },

    #[error("{agent} is outside a {players}-player village")]
    UnknownAgent { agent: Agent, players: usize },

    #[error("{role} is not part of the {players}-player composition")]
    RoleNotInVillage { role: Role, players: usize },

    #[error("known roles ask for more {role} seats than the village holds")]
    RoleOverassigned { role: Role },

    #[error("no {role} found in the revealed role map")]
    MissingRole { role: Role },

    #[error("fixed position {position} is outside a sequence of length {len}")]
    FixedPositionOutOfRange { position: usize, len: usize },

    #[error("value fixed at position {position} is not available in the multiset")]
    FixedValueUnavailable { position: usize },
}
