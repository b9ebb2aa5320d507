//! Pairwise log-relative-likelihood table over (agent, role) combinations.

use tracing::debug;

use super::plan::{Delta, EvidencePlan};
use super::selector::RoleSelector;
use crate::error::EngineError;
use crate::model::{Agent, Role, Village};

/// Bound applied to every finite write.
pub const SCORE_BOUND: f64 = 100.0;

/// Deltas at or above this magnitude are logged with the active rule span.
const LOG_THRESHOLD: f64 = 5.0;

/// `score[i, ri, j, rj]`: additive contribution of "agent i holds ri and agent j
/// holds rj" to any hypothesis containing both facts.
///
/// Cells are directional; `(i, ri, j, rj)` and `(j, rj, i, ri)` are independent.
/// Finite writes saturate at `±bound`. A `+inf` write collapses the whole
/// `(i, *, j, *)` block onto the target cell, which becomes `0` while every
/// other pairing becomes `-inf`. A `-inf` write is stored as a hard veto and
/// survives later additions. When two certainty writes disagree the latest one
/// wins, because it vetoes the earlier target along with everything else.
#[derive(Debug, Clone, PartialEq)]
pub struct EvidenceMatrix {
    village: Village,
    players: usize,
    roles: usize,
    bound: f64,
    cells: Vec<f64>,
}

impl EvidenceMatrix {
    /// Every cell starts at `start_belief`, clamped into the default bound.
    pub fn new(village: Village, start_belief: f64) -> Self {
        Self::with_bound(village, start_belief, SCORE_BOUND)
    }

    pub fn with_bound(village: Village, start_belief: f64, bound: f64) -> Self {
        let players = village.player_count();
        let roles = village.role_count();
        let bound = if bound.is_finite() && bound > 0.0 {
            bound
        } else {
            SCORE_BOUND
        };
        let start = if start_belief.is_finite() {
            start_belief.clamp(-bound, bound)
        } else {
            0.0
        };
        Self {
            village,
            players,
            roles,
            bound,
            cells: vec![start; players * roles * players * roles],
        }
    }

    pub fn village(&self) -> Village {
        self.village
    }

    pub fn player_count(&self) -> usize {
        self.players
    }

    /// Number of role indices in play (`M`).
    pub fn role_count(&self) -> usize {
        self.roles
    }

    pub fn bound(&self) -> f64 {
        self.bound
    }

    fn offset(&self, i: usize, ri: usize, j: usize, rj: usize) -> Option<usize> {
        if i >= self.players || j >= self.players || ri >= self.roles || rj >= self.roles {
            return None;
        }
        Some(((i * self.roles + ri) * self.players + j) * self.roles + rj)
    }

    /// Stored weight, or `-inf` when either role is absent from this village.
    pub fn get(&self, first: Agent, first_role: Role, second: Agent, second_role: Role) -> f64 {
        self.get_index(
            first.index(),
            first_role.index(),
            second.index(),
            second_role.index(),
        )
    }

    /// Raw-index variant of [`get`](Self::get); any out-of-range index reads `-inf`.
    pub fn get_index(&self, i: usize, ri: usize, j: usize, rj: usize) -> f64 {
        self.offset(i, ri, j, rj)
            .map(|offset| self.cells[offset])
            .unwrap_or(f64::NEG_INFINITY)
    }

    /// Weight of `agent` holding `role` on its own.
    pub fn self_score(&self, agent: Agent, role: Role) -> f64 {
        self.get(agent, role, agent, role)
    }

    /// Writes one cell. Absent roles are ignored; `+inf` is a certainty collapse.
    pub fn set(
        &mut self,
        first: Agent,
        first_role: Role,
        second: Agent,
        second_role: Role,
        value: f64,
    ) {
        self.set_index(
            first.index(),
            first_role.index(),
            second.index(),
            second_role.index(),
            value,
        );
    }

    pub fn set_index(&mut self, i: usize, ri: usize, j: usize, rj: usize, value: f64) {
        let Some(offset) = self.offset(i, ri, j, rj) else {
            return;
        };
        if value.is_nan() {
            tracing::warn!(
                target: "wolf_core::evidence",
                i, ri, j, rj,
                "ignoring NaN write"
            );
            return;
        }

        if value == f64::INFINITY {
            for a in 0..self.roles {
                for b in 0..self.roles {
                    if let Some(cell) = self.offset(i, a, j, b) {
                        self.cells[cell] = f64::NEG_INFINITY;
                    }
                }
            }
            self.cells[offset] = 0.0;
        } else if value == f64::NEG_INFINITY {
            self.cells[offset] = f64::NEG_INFINITY;
        } else {
            self.cells[offset] = value.clamp(-self.bound, self.bound);
        }
    }

    /// Adds `delta` to every cell in the cartesian product of both selectors.
    ///
    /// Each cell goes through [`get`](Self::get) and [`set`](Self::set), so
    /// saturation and vetoes apply per cell.
    pub fn add(
        &mut self,
        first: Agent,
        first_roles: impl Into<RoleSelector>,
        second: Agent,
        second_roles: impl Into<RoleSelector>,
        delta: f64,
    ) -> Result<(), EngineError> {
        let first_roles = first_roles.into().expand(self.village)?;
        let second_roles = second_roles.into().expand(self.village)?;
        if delta.abs() >= LOG_THRESHOLD {
            debug!(
                target: "wolf_core::evidence",
                first = %first,
                first_roles = ?first_roles,
                second = %second,
                second_roles = ?second_roles,
                delta,
                "large additive update"
            );
        }
        self.add_expanded(first, &first_roles, second, &second_roles, delta);
        Ok(())
    }

    /// Equivalent to `add(agent, role, agent, role, delta)` for each entry.
    pub fn add_batch(&mut self, agent: Agent, deltas: &[(Role, f64)]) {
        if deltas.iter().any(|(_, delta)| delta.abs() >= LOG_THRESHOLD) {
            let summary = deltas
                .iter()
                .map(|(role, delta)| format!("{}:{delta:+}", role.initial()))
                .collect::<Vec<_>>()
                .join(",");
            debug!(
                target: "wolf_core::evidence",
                agent = %agent,
                deltas = %summary,
                "large batch update"
            );
        }
        for (role, delta) in deltas {
            self.add_cell(agent, *role, agent, *role, *delta);
        }
    }

    /// Applies every delta of `plan`, or none of them.
    ///
    /// Selectors and agents are resolved before the first write, so an error
    /// leaves the matrix exactly as it was.
    pub fn apply(&mut self, plan: &EvidencePlan) -> Result<(), EngineError> {
        let mut resolved = Vec::with_capacity(plan.deltas().len());
        for delta in plan.deltas() {
            resolved.push(self.resolve(delta)?);
        }

        for step in resolved {
            match step {
                Resolved::Add {
                    first,
                    first_roles,
                    second,
                    second_roles,
                    delta,
                } => {
                    if delta.abs() >= LOG_THRESHOLD {
                        debug!(
                            target: "wolf_core::evidence",
                            rule = plan.rule(),
                            first = %first,
                            second = %second,
                            delta,
                            "large additive update"
                        );
                    }
                    self.add_expanded(first, &first_roles, second, &second_roles, delta);
                }
                Resolved::Batch { agent, deltas } => self.add_batch(agent, deltas),
                Resolved::Set {
                    first,
                    first_role,
                    second,
                    second_role,
                    value,
                } => self.set(first, first_role, second, second_role, value),
            }
        }
        Ok(())
    }

    fn resolve<'p>(&self, delta: &'p Delta) -> Result<Resolved<'p>, EngineError> {
        match delta {
            Delta::Add {
                first,
                first_roles,
                second,
                second_roles,
                delta,
            } => {
                self.check_agent(*first)?;
                self.check_agent(*second)?;
                Ok(Resolved::Add {
                    first: *first,
                    first_roles: first_roles.expand(self.village)?,
                    second: *second,
                    second_roles: second_roles.expand(self.village)?,
                    delta: *delta,
                })
            }
            Delta::Batch { agent, deltas } => {
                self.check_agent(*agent)?;
                Ok(Resolved::Batch {
                    agent: *agent,
                    deltas,
                })
            }
            Delta::Set {
                first,
                first_role,
                second,
                second_role,
                value,
            } => {
                self.check_agent(*first)?;
                self.check_agent(*second)?;
                Ok(Resolved::Set {
                    first: *first,
                    first_role: *first_role,
                    second: *second,
                    second_role: *second_role,
                    value: *value,
                })
            }
        }
    }

    fn check_agent(&self, agent: Agent) -> Result<(), EngineError> {
        if agent.index() < self.players {
            Ok(())
        } else {
            Err(EngineError::UnknownAgent {
                agent,
                players: self.players,
            })
        }
    }

    fn add_expanded(
        &mut self,
        first: Agent,
        first_roles: &[Role],
        second: Agent,
        second_roles: &[Role],
        delta: f64,
    ) {
        for first_role in first_roles {
            for second_role in second_roles {
                self.add_cell(first, *first_role, second, *second_role, delta);
            }
        }
    }

    fn add_cell(
        &mut self,
        first: Agent,
        first_role: Role,
        second: Agent,
        second_role: Role,
        delta: f64,
    ) {
        let current = self.get(first, first_role, second, second_role);
        // -inf is absorbing; also keeps `-inf + inf` from ever being formed.
        if current == f64::NEG_INFINITY {
            return;
        }
        self.set(first, first_role, second, second_role, current + delta);
    }
}

enum Resolved<'p> {
    Add {
        first: Agent,
        first_roles: Vec<Role>,
        second: Agent,
        second_roles: Vec<Role>,
        delta: f64,
    },
    Batch {
        agent: Agent,
        deltas: &'p [(Role, f64)],
    },
    Set {
        first: Agent,
        first_role: Role,
        second: Agent,
        second_role: Role,
        value: f64,
    },
}
