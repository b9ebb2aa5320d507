use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::model::{Role, Side, Species, Village};

/// Which roles an additive update applies to on one side of a cell pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleSelector {
    Role(Role),
    Side(Side),
    Species(Species),
}

impl RoleSelector {
    /// Concrete roles covered in `village`.
    pub fn expand(self, village: Village) -> Result<Vec<Role>, EngineError> {
        match self {
            RoleSelector::Role(role) => Ok(vec![role]),
            RoleSelector::Side(side) => side.roles(village).map(<[Role]>::to_vec),
            RoleSelector::Species(species) => species.roles(village),
        }
    }
}

impl From<Role> for RoleSelector {
    fn from(role: Role) -> Self {
        RoleSelector::Role(role)
    }
}

impl From<Side> for RoleSelector {
    fn from(side: Side) -> Self {
        RoleSelector::Side(side)
    }
}

impl From<Species> for RoleSelector {
    fn from(species: Species) -> Self {
        RoleSelector::Species(species)
    }
}
