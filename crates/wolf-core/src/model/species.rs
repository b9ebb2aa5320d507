use core::fmt;
use serde::{Deserialize, Serialize};

use super::role::Role;
use super::side::Side;
use super::village::Village;
use crate::error::EngineError;

/// Result of a divination or identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Species {
    Human,
    Werewolf,
}

impl Species {
    /// Roles that produce this species when inspected.
    pub fn roles(self, village: Village) -> Result<Vec<Role>, EngineError> {
        match self {
            Species::Human => {
                let mut roles = Side::Villagers.roles(village)?.to_vec();
                roles.push(Role::Possessed);
                Ok(roles)
            }
            Species::Werewolf => Ok(vec![Role::Werewolf]),
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Species::Human => f.write_str("HUMAN"),
            Species::Werewolf => f.write_str("WEREWOLF"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_includes_possessed() {
        let roles = Species::Human.roles(Village::Five).unwrap();
        assert_eq!(roles, vec![Role::Villager, Role::Seer, Role::Possessed]);
        assert_eq!(Species::Werewolf.roles(Village::Fifteen).unwrap(), vec![Role::Werewolf]);
    }
}
