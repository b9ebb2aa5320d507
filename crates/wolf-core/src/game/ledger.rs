//! Public statements already folded into the matrix.
//!
//! The ledger is what makes repeated observations harmless: a claim, report or
//! stated intention that was already seen is recognised and skipped. It is
//! only appended to after the corresponding rule has been applied.

use std::collections::BTreeMap;

use super::view::GameView;
use crate::model::{Agent, Role, Species};

/// A divination or identification result announced by `talker`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    pub talker: Agent,
    pub target: Agent,
    pub species: Species,
    pub day: u32,
}

/// How a new report relates to what `talker` already said about the same target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportMatch {
    New,
    Duplicate,
    Contradiction,
}

#[derive(Debug, Clone, Default)]
pub struct Ledger {
    claims: BTreeMap<Agent, Role>,
    claimants: BTreeMap<Role, Vec<Agent>>,
    divinations: Vec<Report>,
    identifications: Vec<Report>,
    guards: Vec<(Agent, Agent, u32)>,
    vote_intents: BTreeMap<Agent, Agent>,
    last_day_start: Option<u32>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest role claimed by `agent`.
    pub fn claim_of(&self, agent: Agent) -> Option<Role> {
        self.claims.get(&agent).copied()
    }

    pub fn has_claimed(&self, agent: Agent, role: Role) -> bool {
        self.claimants(role).contains(&agent)
    }

    /// Agents that claimed `role`, in order of their first claim.
    pub fn claimants(&self, role: Role) -> &[Agent] {
        self.claimants.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn record_claim(&mut self, agent: Agent, role: Role) {
        self.claims.insert(agent, role);
        let list = self.claimants.entry(role).or_default();
        if !list.contains(&agent) {
            list.push(agent);
        }
    }

    /// Claims held by agents that are still alive.
    pub fn alive_claims<'a>(&'a self, view: &'a GameView) -> impl Iterator<Item = (Agent, Role)> + 'a {
        self.claims
            .iter()
            .filter(move |(agent, _)| view.is_alive(**agent))
            .map(|(agent, role)| (*agent, *role))
    }

    pub fn divination_match(&self, talker: Agent, target: Agent, species: Species) -> ReportMatch {
        match_report(&self.divinations, talker, target, species)
    }

    pub fn identification_match(&self, talker: Agent, target: Agent, species: Species) -> ReportMatch {
        match_report(&self.identifications, talker, target, species)
    }

    pub fn divinations(&self) -> &[Report] {
        &self.divinations
    }

    pub fn identifications(&self) -> &[Report] {
        &self.identifications
    }

    pub fn record_divination(&mut self, report: Report) {
        self.divinations.push(report);
    }

    pub fn record_identification(&mut self, report: Report) {
        self.identifications.push(report);
    }

    pub fn has_guard_report(&self, talker: Agent, target: Agent, day: u32) -> bool {
        self.guards.contains(&(talker, target, day))
    }

    pub fn record_guard_report(&mut self, talker: Agent, target: Agent, day: u32) {
        if !self.has_guard_report(talker, target, day) {
            self.guards.push((talker, target, day));
        }
    }

    pub fn last_vote_intent(&self, talker: Agent) -> Option<Agent> {
        self.vote_intents.get(&talker).copied()
    }

    pub fn record_vote_intent(&mut self, talker: Agent, target: Agent) {
        self.vote_intents.insert(talker, target);
    }

    /// Whether the day-start re-evaluation already ran for `day`.
    pub fn day_start_seen(&self, day: u32) -> bool {
        self.last_day_start == Some(day)
    }

    pub fn record_day_start(&mut self, day: u32) {
        self.last_day_start = Some(day);
    }
}

/// An exact repeat wins over a contradiction, so replaying a contradicting
/// report after it was recorded is a duplicate too.
fn match_report(reports: &[Report], talker: Agent, target: Agent, species: Species) -> ReportMatch {
    let mut about_target = reports
        .iter()
        .filter(|report| report.talker == talker && report.target == target)
        .peekable();
    if about_target.peek().is_none() {
        ReportMatch::New
    } else if about_target.any(|report| report.species == species) {
        ReportMatch::Duplicate
    } else {
        ReportMatch::Contradiction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claimants_keep_first_claim_order() {
        let mut ledger = Ledger::new();
        ledger.record_claim(Agent::new(3), Role::Seer);
        ledger.record_claim(Agent::new(1), Role::Seer);
        ledger.record_claim(Agent::new(3), Role::Seer);
        assert_eq!(ledger.claimants(Role::Seer), &[Agent::new(3), Agent::new(1)]);
        assert!(ledger.has_claimed(Agent::new(1), Role::Seer));
        assert!(!ledger.has_claimed(Agent::new(1), Role::Medium));
    }

    #[test]
    fn later_claim_replaces_the_public_role() {
        let mut ledger = Ledger::new();
        ledger.record_claim(Agent::new(2), Role::Seer);
        ledger.record_claim(Agent::new(2), Role::Possessed);
        assert_eq!(ledger.claim_of(Agent::new(2)), Some(Role::Possessed));
        assert!(ledger.has_claimed(Agent::new(2), Role::Seer));
    }

    #[test]
    fn report_matching_detects_contradictions() {
        let mut ledger = Ledger::new();
        ledger.record_divination(Report {
            talker: Agent::new(0),
            target: Agent::new(2),
            species: Species::Human,
            day: 1,
        });
        assert_eq!(
            ledger.divination_match(Agent::new(0), Agent::new(2), Species::Human),
            ReportMatch::Duplicate
        );
        assert_eq!(
            ledger.divination_match(Agent::new(0), Agent::new(2), Species::Werewolf),
            ReportMatch::Contradiction
        );
        assert_eq!(
            ledger.divination_match(Agent::new(1), Agent::new(2), Species::Werewolf),
            ReportMatch::New
        );
        assert_eq!(
            ledger.identification_match(Agent::new(0), Agent::new(2), Species::Human),
            ReportMatch::New
        );

        ledger.record_divination(Report {
            talker: Agent::new(0),
            target: Agent::new(2),
            species: Species::Werewolf,
            day: 2,
        });
        assert_eq!(
            ledger.divination_match(Agent::new(0), Agent::new(2), Species::Werewolf),
            ReportMatch::Duplicate
        );
    }

    #[test]
    fn alive_claims_skip_dead_agents() {
        let mut ledger = Ledger::new();
        ledger.record_claim(Agent::new(0), Role::Seer);
        ledger.record_claim(Agent::new(1), Role::Medium);
        let mut view = GameView::new(5);
        view.mark_dead(Agent::new(0));
        let alive: Vec<_> = ledger.alive_claims(&view).collect();
        assert_eq!(alive, vec![(Agent::new(1), Role::Medium)]);
    }
}
