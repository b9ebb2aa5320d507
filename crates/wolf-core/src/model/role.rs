use core::fmt;
use serde::{Deserialize, Serialize};

use super::side::Side;
use super::species::Species;

/// Hidden role held by one agent. The discriminant doubles as the matrix role index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Role {
    Villager = 0,
    Seer = 1,
    Possessed = 2,
    Werewolf = 3,
    Medium = 4,
    Bodyguard = 5,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Villager,
        Role::Seer,
        Role::Possessed,
        Role::Werewolf,
        Role::Medium,
        Role::Bodyguard,
    ];

    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Role::Villager),
            1 => Some(Role::Seer),
            2 => Some(Role::Possessed),
            3 => Some(Role::Werewolf),
            4 => Some(Role::Medium),
            5 => Some(Role::Bodyguard),
            _ => None,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Coalition the role wins with.
    pub const fn side(self) -> Side {
        match self {
            Role::Possessed | Role::Werewolf => Side::Werewolves,
            _ => Side::Villagers,
        }
    }

    /// Species a seer or medium would observe for this role.
    pub const fn species(self) -> Species {
        match self {
            Role::Werewolf => Species::Werewolf,
            _ => Species::Human,
        }
    }

    /// Roles with a night ability whose holders tend to come out publicly.
    pub const fn is_special(self) -> bool {
        matches!(self, Role::Seer | Role::Medium | Role::Bodyguard)
    }

    pub const fn initial(self) -> char {
        match self {
            Role::Villager => 'V',
            Role::Seer => 'S',
            Role::Possessed => 'P',
            Role::Werewolf => 'W',
            Role::Medium => 'M',
            Role::Bodyguard => 'B',
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Role::Villager => "VILLAGER",
            Role::Seer => "SEER",
            Role::Possessed => "POSSESSED",
            Role::Werewolf => "WEREWOLF",
            Role::Medium => "MEDIUM",
            Role::Bodyguard => "BODYGUARD",
        };
        f.write_str(label)
    }
}
