use core::fmt;
use serde::{Deserialize, Serialize};

/// Stable zero-based seat index of one player for the duration of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Agent(usize);

impl Agent {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Builds an agent from the one-based number used on the game server.
    pub const fn from_number(number: usize) -> Option<Self> {
        if number == 0 {
            None
        } else {
            Some(Self(number - 1))
        }
    }

    pub const fn index(self) -> usize {
        self.0
    }

    pub const fn number(self) -> usize {
        self.0 + 1
    }

    /// Iterates every agent of a village with `players` seats.
    pub fn all(players: usize) -> impl Iterator<Item = Agent> {
        (0..players).map(Agent)
    }
}

impl fmt::Display for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Agent[{:02}]", self.number())
    }
}
