//! A single complete role hypothesis, its legality check and its score against the evidence matrix.

use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use rand::Rng;

use crate::evidence::EvidenceMatrix;
use crate::game::GameView;
use crate::model::{Agent, Role};

/// One complete hypothesis: the role held by every agent, by seat index.
///
/// The score is cached by [`evaluate`](Self::evaluate) and is not refreshed by
/// [`swap`](Self::swap) or [`shuffle`](Self::shuffle); callers re-evaluate
/// after mutating. Ordering and equality use `(score, structural hash)`.
#[derive(Debug, Clone)]
pub struct Assignment {
    roles: Vec<Role>,
    score: f64,
    hash: u64,
}

impl Assignment {
    pub fn new(roles: Vec<Role>) -> Self {
        let hash = structural_hash(&roles);
        Self {
            roles,
            score: 0.0,
            hash,
        }
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn into_roles(self) -> Vec<Role> {
        self.roles
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn role_of(&self, agent: Agent) -> Option<Role> {
        self.roles.get(agent.index()).copied()
    }

    /// Score from the last evaluation.
    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn structural_hash(&self) -> u64 {
        self.hash
    }

    /// Agents holding `role` under this hypothesis.
    pub fn agents_with(&self, role: Role) -> impl Iterator<Item = Agent> + '_ {
        self.roles
            .iter()
            .enumerate()
            .filter(move |(_, held)| **held == role)
            .map(|(index, _)| Agent::new(index))
    }

    /// A hypothesis in which the werewolves already hold parity among the
    /// living would have ended the game.
    pub fn is_legal(&self, view: &GameView) -> bool {
        let alive = view.alive_count();
        let werewolves = self
            .agents_with(Role::Werewolf)
            .filter(|agent| view.is_alive(*agent))
            .count();
        (werewolves as f64) < alive as f64 / 2.0
    }

    /// Sums every ordered pair of cells, self pairs included. Illegal
    /// hypotheses score `-inf` without touching the matrix.
    pub fn evaluate(&mut self, matrix: &EvidenceMatrix, view: &GameView) -> f64 {
        if !self.is_legal(view) {
            self.score = f64::NEG_INFINITY;
            return self.score;
        }
        self.evaluate_raw(matrix)
    }

    /// [`evaluate`](Self::evaluate) without the legality check.
    pub fn evaluate_raw(&mut self, matrix: &EvidenceMatrix) -> f64 {
        self.score = raw_score(&self.roles, matrix);
        self.score
    }

    /// Exchanges the roles at two seats. Out-of-range seats are ignored.
    pub fn swap(&mut self, i: usize, j: usize) {
        if i >= self.roles.len() || j >= self.roles.len() {
            return;
        }
        self.roles.swap(i, j);
        self.hash = structural_hash(&self.roles);
    }

    /// Applies `times` random swaps (default: one per seat) between seats
    /// outside `fixed`. Both ends of a swap are drawn independently, so some
    /// swaps are no-ops.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, times: Option<usize>, fixed: &[usize], rng: &mut R) {
        let free: Vec<usize> = (0..self.roles.len())
            .filter(|position| !fixed.contains(position))
            .collect();
        if free.len() < 2 {
            return;
        }
        for _ in 0..times.unwrap_or(self.roles.len()) {
            let i = free[rng.gen_range(0..free.len())];
            let j = free[rng.gen_range(0..free.len())];
            self.roles.swap(i, j);
        }
        self.hash = structural_hash(&self.roles);
    }
}

fn structural_hash(roles: &[Role]) -> u64 {
    let mut hasher = DefaultHasher::new();
    roles.hash(&mut hasher);
    hasher.finish()
}

fn raw_score(roles: &[Role], matrix: &EvidenceMatrix) -> f64 {
    let mut total = 0.0;
    for (i, first) in roles.iter().enumerate() {
        for (j, second) in roles.iter().enumerate() {
            let cell = matrix.get_index(i, first.index(), j, second.index());
            if cell == f64::NEG_INFINITY {
                return f64::NEG_INFINITY;
            }
            total += cell;
        }
    }
    total
}

impl PartialEq for Assignment {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Assignment {}

impl PartialOrd for Assignment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Assignment {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| self.hash.cmp(&other.hash))
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for role in &self.roles {
            write!(f, "{}", role.initial())?;
        }
        Ok(())
    }
}
