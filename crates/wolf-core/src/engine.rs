//! Per-game inference engine: owns the evidence matrix and the ledger, folds
//! events in through the update rules, and runs assignment searches.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug_span, error, warn};

use crate::assignment::{AssignmentSearch, SearchConfig, SearchOutcome};
use crate::audit;
use crate::error::EngineError;
use crate::evidence::{EvidenceMatrix, RuleContext, RuleWeights, rules};
use crate::game::{GameEvent, GameView, Ledger, Report};
use crate::model::{Agent, Role, Village};

/// Who the holder is and what it knows for certain at the start of the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSetup {
    pub players: usize,
    pub me: Agent,
    pub my_role: Role,
    /// Roles revealed to the holder, e.g. fellow werewolves.
    #[serde(default)]
    pub known_roles: BTreeMap<Agent, Role>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Return rule failures instead of logging and skipping the event.
    pub strict: bool,
    pub weights: RuleWeights,
    pub search: SearchConfig,
}

#[derive(Debug, Clone)]
pub struct Engine {
    village: Village,
    me: Agent,
    my_role: Role,
    known_roles: BTreeMap<Agent, Role>,
    config: EngineConfig,
    matrix: EvidenceMatrix,
    ledger: Ledger,
}

impl Engine {
    pub fn new(setup: GameSetup, config: EngineConfig) -> Result<Self, EngineError> {
        let village = Village::from_player_count(setup.players)?;
        let players = village.player_count();

        let mut known_roles = setup.known_roles;
        known_roles.insert(setup.me, setup.my_role);
        let mut seats: BTreeMap<Role, usize> = BTreeMap::new();
        for (&agent, &role) in &known_roles {
            if agent.index() >= players {
                return Err(EngineError::UnknownAgent { agent, players });
            }
            if !village.contains(role) {
                return Err(EngineError::RoleNotInVillage { role, players });
            }
            let count = seats.entry(role).or_default();
            *count += 1;
            if *count > village.count_of(role) {
                return Err(EngineError::RoleOverassigned { role });
            }
        }

        let config = EngineConfig {
            weights: config.weights.sanitized(),
            ..config
        };
        let mut matrix =
            EvidenceMatrix::with_bound(village, config.weights.start_belief, config.weights.bound);
        for (&agent, &role) in &known_roles {
            matrix.set(agent, role, agent, role, f64::INFINITY);
        }

        Ok(Self {
            village,
            me: setup.me,
            my_role: setup.my_role,
            known_roles,
            config,
            matrix,
            ledger: Ledger::new(),
        })
    }

    pub fn village(&self) -> Village {
        self.village
    }

    pub fn me(&self) -> Agent {
        self.me
    }

    pub fn my_role(&self) -> Role {
        self.my_role
    }

    /// Every role the holder knows for certain, its own included.
    pub fn known_roles(&self) -> &BTreeMap<Agent, Role> {
        &self.known_roles
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn matrix(&self) -> &EvidenceMatrix {
        &self.matrix
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    fn context<'a>(&'a self, view: &'a GameView) -> RuleContext<'a> {
        RuleContext {
            village: self.village,
            me: self.me,
            my_role: self.my_role,
            known_roles: &self.known_roles,
            ledger: &self.ledger,
            view,
            weights: &self.config.weights,
        }
    }

    /// Folds one event into the matrix. Events must arrive in the order they
    /// happened.
    ///
    /// A failing event never changes the matrix or the ledger. In strict mode
    /// the error is returned; otherwise it is logged and the event skipped.
    pub fn observe(&mut self, event: &GameEvent, view: &GameView) -> Result<(), EngineError> {
        let span = debug_span!(target: "wolf_core::rules", "rule", rule = event.kind());
        let _entered = span.enter();
        match self.try_observe(event, view) {
            Ok(()) => Ok(()),
            Err(err) if self.config.strict => Err(err),
            Err(err) => {
                warn!(
                    target: "wolf_core::rules",
                    error = %err,
                    "skipping event that could not be applied"
                );
                Ok(())
            }
        }
    }

    fn try_observe(&mut self, event: &GameEvent, view: &GameView) -> Result<(), EngineError> {
        let players = self.village.player_count();
        if let Some(agent) = event.agents().into_iter().find(|agent| agent.index() >= players) {
            return Err(EngineError::UnknownAgent { agent, players });
        }
        let plan = rules::plan(event, &self.context(view));
        self.matrix.apply(&plan)?;
        self.record(event, view);
        Ok(())
    }

    fn record(&mut self, event: &GameEvent, view: &GameView) {
        let talker = match *event {
            GameEvent::Comingout { talker, .. }
            | GameEvent::DivinationReport { talker, .. }
            | GameEvent::IdentificationReport { talker, .. }
            | GameEvent::GuardReport { talker, .. } => Some(talker),
            _ => None,
        };
        if talker.is_some_and(|talker| self.context(view).ignores(talker)) {
            return;
        }
        match *event {
            GameEvent::Comingout { talker, role, .. } => {
                self.ledger.record_claim(talker, role);
            }
            GameEvent::VoteIntent { talker, target, .. } if talker != self.me => {
                self.ledger.record_vote_intent(talker, target);
            }
            GameEvent::DivinationReport {
                talker,
                target,
                species,
                day,
                ..
            } => {
                self.ledger.record_divination(Report {
                    talker,
                    target,
                    species,
                    day,
                });
            }
            GameEvent::IdentificationReport {
                talker,
                target,
                species,
                day,
                ..
            } => {
                self.ledger.record_identification(Report {
                    talker,
                    target,
                    species,
                    day,
                });
            }
            GameEvent::GuardReport {
                talker, target, day, ..
            } => {
                self.ledger.record_guard_report(talker, target, day);
            }
            GameEvent::DayStart => self.ledger.record_day_start(view.day()),
            _ => {}
        }
    }

    /// Ranks hypotheses consistent with everything the holder knows for certain.
    pub fn search<R: Rng + ?Sized>(
        &self,
        view: &GameView,
        rng: &mut R,
    ) -> Result<SearchOutcome, EngineError> {
        AssignmentSearch::new(&self.matrix, view, &self.known_roles, self.config.search)?
            .with_probability_scale(self.config.weights.probability_scale)
            .run(rng)
    }

    /// End-of-game audit against the revealed roles. Returns the seer when it
    /// never came out and was recorded as hidden.
    pub fn finish(&self, revealed: &BTreeMap<Agent, Role>) -> Result<Option<Agent>, EngineError> {
        let Some(seer) = revealed
            .iter()
            .find(|(_, role)| **role == Role::Seer)
            .map(|(agent, _)| *agent)
        else {
            let err = EngineError::MissingRole { role: Role::Seer };
            error!(target: "wolf_core::audit", error = %err, "skipping hidden-seer audit");
            return Err(err);
        };
        if seer == self.me || self.ledger.claim_of(seer).is_some() {
            return Ok(None);
        }
        audit::record_hidden_seer(seer);
        Ok(Some(seer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Species;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn setup(me: usize, my_role: Role) -> GameSetup {
        GameSetup {
            players: 5,
            me: Agent::new(me),
            my_role,
            known_roles: BTreeMap::new(),
        }
    }

    #[test]
    fn own_role_is_certain_from_the_start() {
        let engine = Engine::new(setup(2, Role::Seer), EngineConfig::default()).unwrap();
        assert_eq!(engine.matrix().self_score(Agent::new(2), Role::Seer), 0.0);
        assert_eq!(
            engine.matrix().self_score(Agent::new(2), Role::Villager),
            f64::NEG_INFINITY
        );
    }

    #[test]
    fn construction_validates_the_setup() {
        let mut bad = setup(0, Role::Seer);
        bad.players = 7;
        assert_eq!(
            Engine::new(bad, EngineConfig::default()).unwrap_err(),
            EngineError::UnsupportedPopulation { players: 7 }
        );
        assert!(matches!(
            Engine::new(setup(0, Role::Medium), EngineConfig::default()),
            Err(EngineError::RoleNotInVillage { .. })
        ));
        let mut crowded = setup(0, Role::Werewolf);
        crowded.known_roles.insert(Agent::new(1), Role::Werewolf);
        assert_eq!(
            Engine::new(crowded, EngineConfig::default()).unwrap_err(),
            EngineError::RoleOverassigned {
                role: Role::Werewolf
            }
        );
    }

    #[test]
    fn unknown_agents_fail_in_strict_mode_only() {
        let view = GameView::new(5);
        let event = GameEvent::Attacked {
            target: Agent::new(9),
        };
        let mut lenient = Engine::new(setup(0, Role::Villager), EngineConfig::default()).unwrap();
        assert!(lenient.observe(&event, &view).is_ok());

        let strict_config = EngineConfig {
            strict: true,
            ..EngineConfig::default()
        };
        let mut strict = Engine::new(setup(0, Role::Villager), strict_config).unwrap();
        assert!(matches!(
            strict.observe(&event, &view),
            Err(EngineError::UnknownAgent { .. })
        ));
    }

    #[test]
    fn claims_are_recorded_after_they_apply() {
        let view = GameView::new(5);
        let mut engine = Engine::new(setup(0, Role::Villager), EngineConfig::default()).unwrap();
        let claim = GameEvent::Comingout {
            talker: Agent::new(1),
            role: Role::Seer,
            day: 1,
            turn: 1,
        };
        engine.observe(&claim, &view).unwrap();
        assert_eq!(engine.ledger().claimants(Role::Seer), &[Agent::new(1)]);
        // the holder's own claim is never recorded
        let own = GameEvent::Comingout {
            talker: Agent::new(0),
            role: Role::Seer,
            day: 1,
            turn: 2,
        };
        engine.observe(&own, &view).unwrap();
        assert_eq!(engine.ledger().claimants(Role::Seer), &[Agent::new(1)]);
    }

    #[test]
    fn replayed_contradiction_applies_once() {
        let view = GameView::new(5);
        let mut engine = Engine::new(setup(0, Role::Villager), EngineConfig::default()).unwrap();
        let report = |species| GameEvent::DivinationReport {
            talker: Agent::new(1),
            target: Agent::new(2),
            species,
            day: 1,
            turn: 2,
        };
        engine.observe(&report(Species::Human), &view).unwrap();
        engine.observe(&report(Species::Werewolf), &view).unwrap();
        let after_first = engine.matrix().clone();
        engine.observe(&report(Species::Werewolf), &view).unwrap();
        for role in [Role::Villager, Role::Seer, Role::Possessed, Role::Werewolf] {
            assert_eq!(
                engine.matrix().self_score(Agent::new(1), role),
                after_first.self_score(Agent::new(1), role)
            );
        }
    }

    #[test]
    fn search_pins_the_holder() {
        let view = GameView::new(5);
        let engine = Engine::new(setup(4, Role::Possessed), EngineConfig::default()).unwrap();
        let mut rng = SmallRng::seed_from_u64(9);
        let outcome = engine.search(&view, &mut rng).unwrap();
        assert!(
            outcome
                .ranked()
                .iter()
                .all(|h| h.role_of(Agent::new(4)) == Some(Role::Possessed))
        );
    }
}
