//! Ranked sampling of complete role hypotheses.
//!
//! Small hypothesis spaces are enumerated exhaustively through
//! [`UniquePermutations`]. Larger ones are explored by randomised local search:
//! shuffled seeds, then repeated small perturbations of the current leaders.
//! Either way the best `capacity` hypotheses are kept, ranked by score.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::time::{Duration, Instant};

use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::hypothesis::Assignment;
use super::permutations::UniquePermutations;
use crate::error::EngineError;
use crate::evidence::EvidenceMatrix;
use crate::game::GameView;
use crate::model::{Agent, Role, Village};

/// Leaders a perturbation may start from.
const PARENT_POOL: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Hypotheses kept in the ranked working set.
    pub capacity: usize,
    /// Enumerate every distinct hypothesis when there are at most this many.
    pub exhaustive_limit: u64,
    /// Randomly shuffled seeds for local search.
    pub restarts: usize,
    /// Perturbation rounds after seeding.
    pub iterations: usize,
    pub swaps_per_perturbation: usize,
    /// Wall-clock cap; `None` runs every round.
    pub time_budget_ms: Option<u64>,
    pub seed: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            exhaustive_limit: 5_000,
            restarts: 100,
            iterations: 2_000,
            swaps_per_perturbation: 2,
            time_budget_ms: None,
            seed: 0x5EED,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    Exhaustive,
    Local,
}

struct Budget {
    deadline: Option<Instant>,
}

impl Budget {
    fn new(time_budget_ms: Option<u64>) -> Self {
        Self {
            deadline: time_budget_ms.map(|ms| Instant::now() + Duration::from_millis(ms)),
        }
    }

    fn expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Search over hypotheses consistent with the holder's certain knowledge.
#[derive(Debug, Clone)]
pub struct AssignmentSearch<'a> {
    matrix: &'a EvidenceMatrix,
    view: &'a GameView,
    config: SearchConfig,
    probability_scale: f64,
    fixed: BTreeMap<usize, Role>,
    base: Assignment,
}

impl<'a> AssignmentSearch<'a> {
    /// `fixed` pins agents whose role is known; every hypothesis keeps them.
    pub fn new(
        matrix: &'a EvidenceMatrix,
        view: &'a GameView,
        fixed: &BTreeMap<Agent, Role>,
        config: SearchConfig,
    ) -> Result<Self, EngineError> {
        let village = matrix.village();
        let players = village.player_count();
        let mut positions = BTreeMap::new();
        let mut pinned: BTreeMap<Role, usize> = BTreeMap::new();
        for (&agent, &role) in fixed {
            if agent.index() >= players {
                return Err(EngineError::UnknownAgent { agent, players });
            }
            if !village.contains(role) {
                return Err(EngineError::RoleNotInVillage { role, players });
            }
            let seats = pinned.entry(role).or_default();
            *seats += 1;
            if *seats > village.count_of(role) {
                return Err(EngineError::RoleOverassigned { role });
            }
            positions.insert(agent.index(), role);
        }

        let base = base_assignment(village, &positions);
        Ok(Self {
            matrix,
            view,
            config,
            probability_scale: 0.1,
            fixed: positions,
            base,
        })
    }

    pub fn with_probability_scale(mut self, scale: f64) -> Self {
        if scale.is_finite() && scale > 0.0 {
            self.probability_scale = scale;
        }
        self
    }

    /// Fixed roles in place, every other seat filled in composition order.
    pub fn base(&self) -> &Assignment {
        &self.base
    }

    /// Distinct hypotheses consistent with the fixed seats.
    pub fn space_size(&self) -> Result<u128, EngineError> {
        Ok(self.permutations()?.total())
    }

    fn permutations(&self) -> Result<UniquePermutations<Role>, EngineError> {
        UniquePermutations::new(&self.matrix.village().role_multiset(), &self.fixed)
    }

    fn fixed_positions(&self) -> Vec<usize> {
        self.fixed.keys().copied().collect()
    }

    pub fn run<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<SearchOutcome, EngineError> {
        let budget = Budget::new(self.config.time_budget_ms);
        let capacity = self.config.capacity.max(1);
        let mut working = BTreeSet::new();

        let permutations = self.permutations()?;
        let (mode, explored) = if permutations.total() <= u128::from(self.config.exhaustive_limit) {
            let mut explored = 0;
            for roles in permutations {
                if budget.expired() {
                    break;
                }
                let mut candidate = Assignment::new(roles);
                candidate.evaluate(self.matrix, self.view);
                keep(&mut working, candidate, capacity);
                explored += 1;
            }
            (SearchMode::Exhaustive, explored)
        } else {
            (
                SearchMode::Local,
                self.local_search(&mut working, capacity, &budget, rng),
            )
        };

        let ranked: Vec<Assignment> = working.into_iter().rev().collect();
        let outcome = SearchOutcome::new(
            mode,
            explored,
            ranked,
            self.matrix.village(),
            self.probability_scale,
        );
        debug!(
            target: "wolf_core::search",
            mode = ?outcome.mode(),
            explored,
            kept = outcome.ranked().len(),
            best = outcome.best().map(Assignment::score).unwrap_or(f64::NEG_INFINITY),
            "assignment search finished"
        );
        Ok(outcome)
    }

    fn local_search<R: Rng + ?Sized>(
        &self,
        working: &mut BTreeSet<Assignment>,
        capacity: usize,
        budget: &Budget,
        rng: &mut R,
    ) -> usize {
        let fixed = self.fixed_positions();
        let mut seen = HashSet::new();
        let mut explored = 0;

        let mut consider = |mut candidate: Assignment, working: &mut BTreeSet<Assignment>| {
            if seen.insert(candidate.structural_hash()) {
                candidate.evaluate(self.matrix, self.view);
                keep(working, candidate, capacity);
                explored += 1;
            }
        };

        consider(self.base.clone(), working);
        for _ in 0..self.config.restarts {
            if budget.expired() {
                break;
            }
            let mut candidate = self.base.clone();
            candidate.shuffle(None, &fixed, rng);
            consider(candidate, working);
        }

        let swaps = self.config.swaps_per_perturbation.max(1);
        for _ in 0..self.config.iterations {
            if budget.expired() {
                break;
            }
            let pool = working.len().min(PARENT_POOL);
            if pool == 0 {
                break;
            }
            let pick = rng.gen_range(0..pool);
            let Some(parent) = working.iter().rev().nth(pick) else {
                break;
            };
            let mut candidate = parent.clone();
            candidate.shuffle(Some(swaps), &fixed, rng);
            consider(candidate, working);
        }
        explored
    }
}

fn base_assignment(village: Village, fixed: &BTreeMap<usize, Role>) -> Assignment {
    let mut remaining = village.role_multiset();
    for role in fixed.values() {
        if let Some(position) = remaining.iter().position(|candidate| candidate == role) {
            remaining.remove(position);
        }
    }
    let mut free = remaining.into_iter();
    let roles = (0..village.player_count())
        .map(|seat| {
            fixed
                .get(&seat)
                .copied()
                .or_else(|| free.next())
                .unwrap_or(Role::Villager)
        })
        .collect();
    Assignment::new(roles)
}

fn keep(working: &mut BTreeSet<Assignment>, candidate: Assignment, capacity: usize) {
    working.insert(candidate);
    while working.len() > capacity {
        working.pop_first();
    }
}

/// Per-agent role probabilities implied by a ranked hypothesis set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleProbabilities {
    /// `table[agent][role index]`.
    table: Vec<Vec<f64>>,
}

impl RoleProbabilities {
    fn from_ranked(village: Village, ranked: &[Assignment], weights: &[f64]) -> Self {
        let mut table = vec![vec![0.0; village.role_count()]; village.player_count()];
        for (assignment, weight) in ranked.iter().zip(weights) {
            for (seat, role) in assignment.roles().iter().enumerate() {
                if let Some(cell) = table.get_mut(seat).and_then(|row| row.get_mut(role.index())) {
                    *cell += weight;
                }
            }
        }
        Self { table }
    }

    pub fn probability(&self, agent: Agent, role: Role) -> f64 {
        self.table
            .get(agent.index())
            .and_then(|row| row.get(role.index()))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn row(&self, agent: Agent) -> &[f64] {
        self.table.get(agent.index()).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.table
    }
}

/// Result of one search: hypotheses best first, with normalised weights.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    mode: SearchMode,
    explored: usize,
    ranked: Vec<Assignment>,
    weights: Vec<f64>,
    probabilities: RoleProbabilities,
}

impl SearchOutcome {
    fn new(
        mode: SearchMode,
        explored: usize,
        ranked: Vec<Assignment>,
        village: Village,
        scale: f64,
    ) -> Self {
        let weights = normalised_weights(&ranked, scale);
        let probabilities = RoleProbabilities::from_ranked(village, &ranked, &weights);
        Self {
            mode,
            explored,
            ranked,
            weights,
            probabilities,
        }
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    /// Distinct hypotheses evaluated.
    pub fn explored(&self) -> usize {
        self.explored
    }

    /// Kept hypotheses, highest score first.
    pub fn ranked(&self) -> &[Assignment] {
        &self.ranked
    }

    /// Weight of each ranked hypothesis; sums to one unless every score is `-inf`.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn best(&self) -> Option<&Assignment> {
        self.ranked
            .first()
            .filter(|assignment| assignment.score() > f64::NEG_INFINITY)
    }

    pub fn probabilities(&self) -> &RoleProbabilities {
        &self.probabilities
    }

    /// Candidate most likely to hold `role`; `None` when no candidate has any weight.
    pub fn most_likely(&self, role: Role, candidates: &[Agent]) -> Option<Agent> {
        let mut best: Option<(Agent, f64)> = None;
        for &agent in candidates {
            let probability = self.probabilities.probability(agent, role);
            if probability > 0.0 && best.is_none_or(|(_, current)| probability > current) {
                best = Some((agent, probability));
            }
        }
        best.map(|(agent, _)| agent)
    }

    /// Draws one hypothesis with probability proportional to its weight.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Assignment> {
        let distribution = WeightedIndex::new(&self.weights).ok()?;
        self.ranked.get(distribution.sample(rng))
    }
}

/// `exp(score * scale)` with the best score subtracted first; `-inf` weighs nothing.
fn normalised_weights(ranked: &[Assignment], scale: f64) -> Vec<f64> {
    let top = ranked
        .iter()
        .map(Assignment::score)
        .filter(|score| score.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    if top == f64::NEG_INFINITY {
        return vec![0.0; ranked.len()];
    }
    let raw: Vec<f64> = ranked
        .iter()
        .map(|assignment| {
            let score = assignment.score();
            if score.is_finite() {
                ((score - top) * scale).exp()
            } else {
                0.0
            }
        })
        .collect();
    let total: f64 = raw.iter().sum();
    raw.into_iter().map(|weight| weight / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn a(index: usize) -> Agent {
        Agent::new(index)
    }

    #[test]
    fn five_player_space_is_enumerated() {
        let matrix = EvidenceMatrix::new(Village::Five, 0.0);
        let view = GameView::new(5);
        let fixed = BTreeMap::from([(a(0), Role::Seer)]);
        let search =
            AssignmentSearch::new(&matrix, &view, &fixed, SearchConfig::default()).unwrap();
        // {V, V, P, W} over four seats
        assert_eq!(search.space_size().unwrap(), 12);
        let outcome = search.run(&mut SmallRng::seed_from_u64(1)).unwrap();
        assert_eq!(outcome.mode(), SearchMode::Exhaustive);
        assert_eq!(outcome.explored(), 12);
        assert_eq!(outcome.ranked().len(), 12);
        assert!(outcome.ranked().iter().all(|h| h.roles()[0] == Role::Seer));
        let total: f64 = outcome.weights().iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!((outcome.probabilities().probability(a(0), Role::Seer) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn ranking_follows_the_matrix() {
        let mut matrix = EvidenceMatrix::new(Village::Five, 0.0);
        matrix.add_batch(a(3), &[(Role::Werewolf, 20.0)]);
        let view = GameView::new(5);
        let search =
            AssignmentSearch::new(&matrix, &view, &BTreeMap::new(), SearchConfig::default())
                .unwrap();
        let outcome = search.run(&mut SmallRng::seed_from_u64(2)).unwrap();
        let best = outcome.best().unwrap();
        assert_eq!(best.role_of(a(3)), Some(Role::Werewolf));
        assert!(outcome.ranked().windows(2).all(|pair| pair[0] >= pair[1]));
        assert_eq!(
            outcome.most_likely(Role::Werewolf, &[a(0), a(1), a(2), a(3), a(4)]),
            Some(a(3))
        );
    }

    #[test]
    fn local_search_keeps_fixed_seats_and_capacity() {
        let mut matrix = EvidenceMatrix::new(Village::Fifteen, 0.0);
        matrix.add_batch(a(9), &[(Role::Werewolf, 30.0)]);
        let view = GameView::new(15);
        let fixed = BTreeMap::from([(a(0), Role::Medium)]);
        let config = SearchConfig {
            capacity: 20,
            restarts: 40,
            iterations: 400,
            ..SearchConfig::default()
        };
        let search = AssignmentSearch::new(&matrix, &view, &fixed, config).unwrap();
        let outcome = search.run(&mut SmallRng::seed_from_u64(3)).unwrap();
        assert_eq!(outcome.mode(), SearchMode::Local);
        assert!(outcome.ranked().len() <= 20);
        assert!(outcome.ranked().iter().all(|h| h.role_of(a(0)) == Some(Role::Medium)));
        let hashes: HashSet<u64> = outcome
            .ranked()
            .iter()
            .map(Assignment::structural_hash)
            .collect();
        assert_eq!(hashes.len(), outcome.ranked().len());
        assert!(outcome.probabilities().probability(a(9), Role::Werewolf) > 0.5);
    }

    #[test]
    fn sampling_never_draws_excluded_hypotheses() {
        let mut matrix = EvidenceMatrix::new(Village::Five, 0.0);
        matrix.set(a(1), Role::Werewolf, a(1), Role::Werewolf, f64::INFINITY);
        let view = GameView::new(5);
        let search =
            AssignmentSearch::new(&matrix, &view, &BTreeMap::new(), SearchConfig::default())
                .unwrap();
        let outcome = search.run(&mut SmallRng::seed_from_u64(4)).unwrap();
        let mut rng = SmallRng::seed_from_u64(5);
        for _ in 0..50 {
            let drawn = outcome.sample(&mut rng).unwrap();
            assert_eq!(drawn.role_of(a(1)), Some(Role::Werewolf));
        }
    }

    #[test]
    fn invalid_fixed_maps_are_rejected() {
        let matrix = EvidenceMatrix::new(Village::Five, 0.0);
        let view = GameView::new(5);
        let config = SearchConfig::default();
        let medium = BTreeMap::from([(a(0), Role::Medium)]);
        assert!(matches!(
            AssignmentSearch::new(&matrix, &view, &medium, config),
            Err(EngineError::RoleNotInVillage { .. })
        ));
        let two_seers = BTreeMap::from([(a(0), Role::Seer), (a(1), Role::Seer)]);
        assert!(matches!(
            AssignmentSearch::new(&matrix, &view, &two_seers, config),
            Err(EngineError::RoleOverassigned { role: Role::Seer })
        ));
        let outside = BTreeMap::from([(a(9), Role::Seer)]);
        assert!(matches!(
            AssignmentSearch::new(&matrix, &view, &outside, config),
            Err(EngineError::UnknownAgent { .. })
        ));
    }

    #[test]
    fn all_excluded_outcome_has_no_best_and_no_sample() {
        let mut matrix = EvidenceMatrix::new(Village::Five, 0.0);
        for index in 0..5 {
            matrix.set(a(index), Role::Werewolf, a(index), Role::Werewolf, f64::NEG_INFINITY);
        }
        let view = GameView::new(5);
        let search =
            AssignmentSearch::new(&matrix, &view, &BTreeMap::new(), SearchConfig::default())
                .unwrap();
        let outcome = search.run(&mut SmallRng::seed_from_u64(6)).unwrap();
        assert!(outcome.best().is_none());
        assert!(outcome.sample(&mut SmallRng::seed_from_u64(7)).is_none());
        assert_eq!(outcome.most_likely(Role::Werewolf, &[a(0)]), None);
    }
}
