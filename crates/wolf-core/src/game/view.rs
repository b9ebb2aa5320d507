//! Read-only public game state consulted by the update rules and by evaluation.

use serde::{Deserialize, Serialize};

use crate::model::Agent;

/// Public facts about the running game. Owned by the caller; the engine only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameView {
    day: u32,
    alive: Vec<bool>,
    last_dead: Vec<Agent>,
    attacked: Option<Agent>,
}

impl GameView {
    /// Day zero with every seat alive.
    pub fn new(players: usize) -> Self {
        Self {
            day: 0,
            alive: vec![true; players],
            last_dead: Vec::new(),
            attacked: None,
        }
    }

    pub fn player_count(&self) -> usize {
        self.alive.len()
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn set_day(&mut self, day: u32) {
        self.day = day;
    }

    /// Unknown agents are reported dead.
    pub fn is_alive(&self, agent: Agent) -> bool {
        self.alive.get(agent.index()).copied().unwrap_or(false)
    }

    pub fn alive_agents(&self) -> impl Iterator<Item = Agent> + '_ {
        self.alive
            .iter()
            .enumerate()
            .filter(|(_, alive)| **alive)
            .map(|(index, _)| Agent::new(index))
    }

    pub fn alive_count(&self) -> usize {
        self.alive.iter().filter(|alive| **alive).count()
    }

    /// Marks `agent` dead. Returns `false` when it was already dead or unknown.
    pub fn mark_dead(&mut self, agent: Agent) -> bool {
        match self.alive.get_mut(agent.index()) {
            Some(slot) if *slot => {
                *slot = false;
                true
            }
            _ => false,
        }
    }

    /// Agents that died during the most recent night.
    pub fn last_dead(&self) -> &[Agent] {
        &self.last_dead
    }

    pub fn set_last_dead(&mut self, dead: Vec<Agent>) {
        self.last_dead = dead;
    }

    /// Target the werewolves actually attacked last night, when the holder knows it.
    pub fn attacked(&self) -> Option<Agent> {
        self.attacked
    }

    pub fn set_attacked(&mut self, attacked: Option<Agent>) {
        self.attacked = attacked;
    }

    /// Opens `day`: records the night's deaths and marks them dead.
    pub fn begin_day(&mut self, day: u32, night_deaths: Vec<Agent>) {
        for agent in &night_deaths {
            self.mark_dead(*agent);
        }
        self.day = day;
        self.last_dead = night_deaths;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_day_marks_deaths() {
        let mut view = GameView::new(5);
        view.begin_day(2, vec![Agent::new(3)]);
        assert_eq!(view.day(), 2);
        assert_eq!(view.alive_count(), 4);
        assert!(!view.is_alive(Agent::new(3)));
        assert_eq!(view.last_dead(), &[Agent::new(3)]);
    }

    #[test]
    fn mark_dead_is_idempotent() {
        let mut view = GameView::new(5);
        assert!(view.mark_dead(Agent::new(1)));
        assert!(!view.mark_dead(Agent::new(1)));
        assert!(!view.mark_dead(Agent::new(9)));
        assert!(!view.is_alive(Agent::new(9)));
    }
}
