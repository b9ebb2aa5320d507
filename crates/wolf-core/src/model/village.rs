use serde::{Deserialize, Serialize};

use super::role::Role;
use crate::error::EngineError;

/// Population variant. Each variant fixes the role composition and the rule tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Village {
    Five,
    Fifteen,
}

const FIVE_COMPOSITION: [(Role, usize); 4] = [
    (Role::Villager, 2),
    (Role::Seer, 1),
    (Role::Possessed, 1),
    (Role::Werewolf, 1),
];

const FIFTEEN_COMPOSITION: [(Role, usize); 6] = [
    (Role::Villager, 8),
    (Role::Seer, 1),
    (Role::Possessed, 1),
    (Role::Werewolf, 3),
    (Role::Medium, 1),
    (Role::Bodyguard, 1),
];

impl Village {
    pub fn from_player_count(players: usize) -> Result<Self, EngineError> {
        match players {
            5 => Ok(Village::Five),
            15 => Ok(Village::Fifteen),
            players => Err(EngineError::UnsupportedPopulation { players }),
        }
    }

    pub const fn player_count(self) -> usize {
        match self {
            Village::Five => 5,
            Village::Fifteen => 15,
        }
    }

    /// Number of distinct roles in play; role indices at or above this are absent.
    pub const fn role_count(self) -> usize {
        match self {
            Village::Five => 4,
            Village::Fifteen => 6,
        }
    }

    pub fn composition(self) -> &'static [(Role, usize)] {
        match self {
            Village::Five => &FIVE_COMPOSITION,
            Village::Fifteen => &FIFTEEN_COMPOSITION,
        }
    }

    pub fn contains(self, role: Role) -> bool {
        role.index() < self.role_count()
    }

    pub fn count_of(self, role: Role) -> usize {
        self.composition()
            .iter()
            .find(|(candidate, _)| *candidate == role)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    /// Role multiset in composition order, one entry per seat.
    pub fn role_multiset(self) -> Vec<Role> {
        self.composition()
            .iter()
            .flat_map(|(role, count)| std::iter::repeat(*role).take(*count))
            .collect()
    }
}
