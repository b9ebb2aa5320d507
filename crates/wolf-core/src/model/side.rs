use core::fmt;
use serde::{Deserialize, Serialize};

use super::role::Role;
use super::village::Village;
use crate::error::EngineError;

/// Coalition an agent wins with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Uncertain,
    Villagers,
    Werewolves,
    Any,
}

const VILLAGERS_FIVE: [Role; 2] = [Role::Villager, Role::Seer];
const VILLAGERS_FIFTEEN: [Role; 4] = [Role::Villager, Role::Seer, Role::Medium, Role::Bodyguard];
const WEREWOLVES: [Role; 2] = [Role::Werewolf, Role::Possessed];

impl Side {
    /// Concrete roles belonging to this coalition in `village`.
    pub fn roles(self, village: Village) -> Result<&'static [Role], EngineError> {
        match (self, village) {
            (Side::Villagers, Village::Five) => Ok(&VILLAGERS_FIVE),
            (Side::Villagers, Village::Fifteen) => Ok(&VILLAGERS_FIFTEEN),
            (Side::Werewolves, _) => Ok(&WEREWOLVES),
            (side, village) => Err(EngineError::InvalidSide {
                side,
                players: village.player_count(),
            }),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Side::Uncertain => "UNC",
            Side::Villagers => "VILLAGERS",
            Side::Werewolves => "WEREWOLVES",
            Side::Any => "ANY",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn villagers_grow_with_the_fifteen_player_village() {
        assert_eq!(
            Side::Villagers.roles(Village::Five).unwrap(),
            &[Role::Villager, Role::Seer]
        );
        assert_eq!(Side::Villagers.roles(Village::Fifteen).unwrap().len(), 4);
    }

    #[test]
    fn wildcards_do_not_expand() {
        let err = Side::Any.roles(Village::Five).unwrap_err();
        assert!(matches!(err, EngineError::InvalidSide { side: Side::Any, players: 5 }));
        assert!(Side::Uncertain.roles(Village::Fifteen).is_err());
    }
}
