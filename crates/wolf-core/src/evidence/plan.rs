use super::selector::RoleSelector;
use crate::model::{Agent, Role};

/// One matrix mutation produced by an update rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Delta {
    /// Saturating add over the cartesian product of both selectors.
    Add {
        first: Agent,
        first_roles: RoleSelector,
        second: Agent,
        second_roles: RoleSelector,
        delta: f64,
    },
    /// Several self-pair adds for one agent.
    Batch { agent: Agent, deltas: Vec<(Role, f64)> },
    /// Direct write; `±inf` marks certain knowledge.
    Set {
        first: Agent,
        first_role: Role,
        second: Agent,
        second_role: Role,
        value: f64,
    },
}

/// Ordered list of mutations one observation implies.
#[derive(Debug, Clone, PartialEq)]
pub struct EvidencePlan {
    rule: &'static str,
    deltas: Vec<Delta>,
}

impl EvidencePlan {
    pub fn new(rule: &'static str) -> Self {
        Self {
            rule,
            deltas: Vec::new(),
        }
    }

    pub fn rule(&self) -> &'static str {
        self.rule
    }

    pub fn deltas(&self) -> &[Delta] {
        &self.deltas
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    pub fn add(
        &mut self,
        first: Agent,
        first_roles: impl Into<RoleSelector>,
        second: Agent,
        second_roles: impl Into<RoleSelector>,
        delta: f64,
    ) -> &mut Self {
        self.deltas.push(Delta::Add {
            first,
            first_roles: first_roles.into(),
            second,
            second_roles: second_roles.into(),
            delta,
        });
        self
    }

    pub fn add_batch(&mut self, agent: Agent, deltas: &[(Role, f64)]) -> &mut Self {
        if !deltas.is_empty() {
            self.deltas.push(Delta::Batch {
                agent,
                deltas: deltas.to_vec(),
            });
        }
        self
    }

    pub fn set(
        &mut self,
        first: Agent,
        first_role: Role,
        second: Agent,
        second_role: Role,
        value: f64,
    ) -> &mut Self {
        self.deltas.push(Delta::Set {
            first,
            first_role,
            second,
            second_role,
            value,
        });
        self
    }

    /// `agent` certainly holds `role`.
    pub fn certify(&mut self, agent: Agent, role: Role) -> &mut Self {
        self.set(agent, role, agent, role, f64::INFINITY)
    }

    /// `agent` certainly does not hold `role`.
    pub fn exclude(&mut self, agent: Agent, role: Role) -> &mut Self {
        self.set(agent, role, agent, role, f64::NEG_INFINITY)
    }
}
