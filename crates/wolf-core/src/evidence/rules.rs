//! Update rules: one pure function per event kind, mapping an observation and
//! what the holder already knows to an [`EvidencePlan`].
//!
//! Rules never touch the matrix. They branch on the village variant and on the
//! holder's own role, and read the ledger to recognise statements that were
//! already folded in.

use std::collections::BTreeMap;

use tracing::info;

use super::plan::EvidencePlan;
use super::weights::RuleWeights;
use crate::game::{GameEvent, GameView, Ledger, ReportMatch};
use crate::model::Role::{Bodyguard, Medium, Possessed, Seer, Villager, Werewolf};
use crate::model::{Agent, Role, Side, Species, Village};

/// Near-certain weight for conclusions drawn from someone else's statement.
const STRONG: f64 = 100.0;

/// Everything a rule may read besides the event itself.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub village: Village,
    pub me: Agent,
    pub my_role: Role,
    pub known_roles: &'a BTreeMap<Agent, Role>,
    pub ledger: &'a Ledger,
    pub view: &'a GameView,
    pub weights: &'a RuleWeights,
}

impl RuleContext<'_> {
    /// Claims and reports from the holder or from a known werewolf carry no information.
    pub fn ignores(&self, talker: Agent) -> bool {
        talker == self.me || self.known_roles.get(&talker) == Some(&Werewolf)
    }

    /// For a werewolf holder: `agent` is itself or a fellow werewolf.
    pub fn is_ally(&self, agent: Agent) -> bool {
        agent == self.me || self.known_roles.get(&agent) == Some(&Werewolf)
    }
}

/// Builds the plan for `event`. An empty plan means the event adds nothing.
pub fn plan(event: &GameEvent, ctx: &RuleContext<'_>) -> EvidencePlan {
    let mut plan = EvidencePlan::new(event.kind());
    match event {
        GameEvent::Attacked { target } | GameEvent::Guarded { target } => {
            plan.exclude(*target, Werewolf);
        }
        GameEvent::Vote { voter, target, day } => vote(&mut plan, ctx, *voter, *target, *day),
        GameEvent::Divined { target, species } | GameEvent::Identified { target, species } => {
            match species {
                Species::Werewolf => plan.certify(*target, Werewolf),
                Species::Human => plan.exclude(*target, Werewolf),
            };
        }
        GameEvent::Comingout { talker, role, .. } => comingout(&mut plan, ctx, *talker, *role),
        GameEvent::VoteIntent {
            talker,
            target,
            day,
            turn,
        } => vote_intent(&mut plan, ctx, *talker, *target, *day, *turn),
        GameEvent::DivinationReport {
            talker,
            target,
            species,
            day,
            ..
        } => divination_report(&mut plan, ctx, *talker, *target, *species, *day),
        GameEvent::IdentificationReport {
            talker,
            target,
            species,
            ..
        } => identification_report(&mut plan, ctx, *talker, *target, *species),
        GameEvent::GuardReport {
            talker, target, day, ..
        } => guard_report(&mut plan, ctx, *talker, *target, *day),
        GameEvent::DayStart => day_start(&mut plan, ctx),
        GameEvent::BehaviorEstimate { agent, deltas } => {
            let finite: Vec<(Role, f64)> = deltas
                .iter()
                .filter(|entry| entry.delta.is_finite())
                .map(|entry| (entry.role, entry.delta))
                .collect();
            plan.add_batch(*agent, &finite);
        }
    }
    plan
}

fn vote(plan: &mut EvidencePlan, ctx: &RuleContext<'_>, voter: Agent, target: Agent, day: u32) {
    if voter == ctx.me {
        return;
    }
    let w = ctx.weights;
    match ctx.village {
        Village::Five => {
            plan.add(voter, Villager, target, Werewolf, w.vote_villager)
                .add(voter, Seer, target, Werewolf, w.vote_seer);
        }
        Village::Fifteen => {
            plan.add(
                voter,
                Side::Villagers,
                target,
                Werewolf,
                f64::from(day) * w.vote_per_day,
            )
            .add(voter, Side::Werewolves, target, Werewolf, w.vote_ally);
        }
    }
}

fn comingout(plan: &mut EvidencePlan, ctx: &RuleContext<'_>, talker: Agent, role: Role) {
    if ctx.ignores(talker) || ctx.ledger.has_claimed(talker, role) {
        return;
    }
    let ordinal = ctx.ledger.claimants(role).len() + 1;
    match ctx.village {
        Village::Five => comingout_five(plan, ctx, talker, role, ordinal),
        Village::Fifteen => comingout_fifteen(plan, ctx, talker, role, ordinal),
    }
}

fn comingout_five(
    plan: &mut EvidencePlan,
    ctx: &RuleContext<'_>,
    talker: Agent,
    role: Role,
    ordinal: usize,
) {
    let holder = ctx.my_role;
    let deltas: &[(Role, f64)] = match role {
        Seer => {
            plan.add_batch(talker, &[(Villager, ctx.weights.claim_villager_penalty)]);
            match (holder, ordinal) {
                (Seer, _) => &[(Seer, -STRONG), (Possessed, 5.0), (Werewolf, 3.0)],
                (Werewolf, _) => &[],
                (Possessed, 1) => &[(Seer, 1.0)],
                (Possessed, _) => &[],
                (_, 1) => &[(Seer, 2.0), (Possessed, 2.0), (Werewolf, 1.0)],
                (_, 2) => &[(Seer, 2.0), (Possessed, 2.0), (Werewolf, 2.0)],
                _ => &[(Seer, 1.0), (Possessed, 1.0), (Werewolf, 2.0)],
            }
        }
        Possessed => match holder {
            Werewolf => &[(Possessed, 5.0)],
            Possessed => &[],
            _ => &[(Possessed, 5.0), (Werewolf, 1.0)],
        },
        Werewolf => match holder {
            Possessed => &[(Werewolf, 5.0)],
            Werewolf => &[(Possessed, 5.0)],
            _ => &[(Possessed, 5.0), (Werewolf, 5.0)],
        },
        _ => &[],
    };
    plan.add_batch(talker, deltas);
}

fn comingout_fifteen(
    plan: &mut EvidencePlan,
    ctx: &RuleContext<'_>,
    talker: Agent,
    role: Role,
    ordinal: usize,
) {
    let holder = ctx.my_role;
    let penalty = ctx.weights.claim_villager_penalty;
    let deltas: &[(Role, f64)] = match role {
        Seer | Medium | Bodyguard if holder == role => &[(Possessed, STRONG), (Werewolf, STRONG)],
        Seer => {
            plan.add_batch(
                talker,
                &[(Villager, penalty), (Medium, -STRONG), (Bodyguard, -STRONG)],
            );
            match (holder, ordinal) {
                (Werewolf, _) => &[],
                (Possessed, 1) => &[(Seer, 1.0), (Werewolf, 0.5)],
                (Possessed, 2) => &[(Seer, 1.0), (Werewolf, 1.0)],
                (Possessed, _) => &[(Werewolf, 2.0)],
                (_, 1) => &[(Seer, 2.0), (Possessed, 2.0), (Werewolf, 1.0)],
                (_, 2) => &[(Seer, 2.0), (Possessed, 2.0), (Werewolf, 2.0)],
                (_, 3) => &[(Seer, 2.0), (Possessed, 1.0), (Werewolf, 2.0)],
                _ => &[(Possessed, 3.0), (Werewolf, 5.0)],
            }
        }
        Medium => {
            plan.add_batch(
                talker,
                &[(Villager, penalty), (Seer, -STRONG), (Bodyguard, -STRONG)],
            );
            // A rival medium makes the first claimant less credible.
            match ordinal {
                1 => {
                    plan.add_batch(talker, &[(Medium, 10.0)]);
                }
                2 => {
                    if let Some(first) = ctx.ledger.claimants(Medium).first() {
                        plan.add_batch(*first, &[(Medium, -10.0)]);
                    }
                }
                _ => {}
            }
            match (holder, ordinal) {
                (Werewolf, _) => &[(Medium, 1.0)],
                (Possessed, 1) => &[(Medium, 2.0), (Werewolf, 1.0)],
                (Possessed, 2) => &[(Medium, 1.0), (Werewolf, 2.0)],
                (Possessed, _) => &[(Werewolf, 2.0)],
                (_, 1 | 2) => &[(Medium, 1.0)],
                _ => &[(Werewolf, 2.0)],
            }
        }
        Bodyguard => match (holder, ordinal) {
            (Werewolf, _) => &[],
            (Possessed, 1) => &[(Bodyguard, 2.0)],
            (Possessed, _) => &[(Werewolf, 2.0)],
            (_, 1) => &[(Bodyguard, 2.0), (Werewolf, 1.0)],
            (_, 2) => &[(Bodyguard, 1.0), (Werewolf, 2.0)],
            _ => &[(Werewolf, 2.0)],
        },
        Possessed => match holder {
            Possessed => &[(Werewolf, 10.0)],
            Werewolf => &[(Possessed, 10.0)],
            _ => &[],
        },
        Werewolf => match holder {
            Werewolf => &[(Possessed, 10.0)],
            Possessed => &[(Werewolf, 10.0)],
            _ => &[(Possessed, 10.0), (Werewolf, 10.0)],
        },
        Villager => match holder {
            Werewolf => &[(Villager, 10.0)],
            _ => &[],
        },
    };
    plan.add_batch(talker, deltas);
}

fn vote_intent(
    plan: &mut EvidencePlan,
    ctx: &RuleContext<'_>,
    talker: Agent,
    target: Agent,
    day: u32,
    turn: u32,
) {
    if talker == ctx.me
        || ctx.ledger.last_vote_intent(talker) == Some(target)
        || (day == 1 && turn <= 1)
    {
        return;
    }
    let w = ctx.weights;
    match ctx.village {
        Village::Five => {
            plan.add(talker, Villager, target, Werewolf, w.vote_villager)
                .add(talker, Seer, target, Werewolf, w.vote_seer)
                .add_batch(talker, &[(Werewolf, w.intent_werewolf_bias)]);
        }
        Village::Fifteen => {
            plan.add(
                talker,
                Side::Villagers,
                target,
                Werewolf,
                f64::from(day) * w.intent_per_day,
            );
        }
    }
}

fn divination_report(
    plan: &mut EvidencePlan,
    ctx: &RuleContext<'_>,
    talker: Agent,
    target: Agent,
    species: Species,
    day: u32,
) {
    if ctx.ignores(talker) {
        return;
    }
    let contradiction = ctx.weights.contradiction;
    match ctx.ledger.divination_match(talker, target, species) {
        ReportMatch::Duplicate => return,
        ReportMatch::Contradiction => {
            info!(
                target: "wolf_core::rules",
                talker = %talker,
                subject = %target,
                "divination contradicts an earlier report"
            );
            plan.add_batch(
                talker,
                &[
                    (Villager, -STRONG),
                    (Medium, -STRONG),
                    (Bodyguard, -STRONG),
                    (Possessed, contradiction),
                    (Werewolf, contradiction),
                ],
            );
            return;
        }
        ReportMatch::New => {}
    }

    // Only a seer (real or fake) reports divinations.
    plan.add_batch(
        talker,
        &[(Villager, -STRONG), (Medium, -STRONG), (Bodyguard, -STRONG)],
    );
    let black = species == Species::Werewolf;
    match ctx.village {
        Village::Five => divination_five(plan, ctx, talker, target, black),
        Village::Fifteen => divination_fifteen(plan, ctx, talker, target, black, day),
    }
}

/// A seer holder knows the talker is lying; the claimed result says something
/// about which side the liar wants the target on.
fn rival_seer_report(
    plan: &mut EvidencePlan,
    ctx: &RuleContext<'_>,
    talker: Agent,
    target: Agent,
    black: bool,
) {
    if target == ctx.me {
        plan.add_batch(talker, &[(Possessed, STRONG), (Werewolf, STRONG)]);
        return;
    }
    let sign = if black { 1.0 } else { -1.0 };
    plan.add(talker, Side::Werewolves, target, Species::Human, 5.0 * sign)
        .add(talker, Side::Werewolves, target, Werewolf, -5.0 * sign);
}

fn divination_five(
    plan: &mut EvidencePlan,
    ctx: &RuleContext<'_>,
    talker: Agent,
    target: Agent,
    black: bool,
) {
    let on_me = target == ctx.me;
    match ctx.my_role {
        Seer => {
            plan.add_batch(talker, &[(Seer, -STRONG), (Possessed, 5.0), (Werewolf, 3.0)]);
            rival_seer_report(plan, ctx, talker, target, black);
        }
        Werewolf => match (black, on_me) {
            (true, true) => {
                plan.add_batch(talker, &[(Seer, STRONG)]);
            }
            (true, false) => {
                if ctx.ledger.has_claimed(target, Seer) {
                    plan.add_batch(talker, &[(Possessed, 10.0)]);
                }
            }
            (false, true) => {
                plan.add_batch(talker, &[(Seer, -STRONG), (Possessed, STRONG)]);
            }
            (false, false) => {
                plan.add_batch(talker, &[(Seer, 10.0), (Possessed, 5.0)]);
            }
        },
        Possessed => match (black, on_me) {
            (true, true) => {
                plan.add_batch(talker, &[(Seer, -5.0), (Werewolf, 5.0)]);
            }
            (true, false) => {
                plan.add(talker, Seer, target, Werewolf, 10.0)
                    .add_batch(talker, &[(Werewolf, 3.0)]);
            }
            (false, true) => {
                plan.add_batch(talker, &[(Seer, 10.0)]);
            }
            (false, false) => {
                plan.add(talker, Seer, target, Werewolf, -5.0)
                    .add_batch(talker, &[(Seer, 3.0), (Werewolf, 1.0)]);
            }
        },
        _ => match (black, on_me) {
            (true, true) => {
                plan.add_batch(
                    talker,
                    &[(Seer, -STRONG), (Possessed, 10.0), (Werewolf, 10.0)],
                );
            }
            (true, false) => {
                plan.add(talker, Seer, target, Werewolf, 3.0)
                    .add_batch(talker, &[(Possessed, 3.0), (Werewolf, 1.0)]);
            }
            (false, true) => {
                plan.add_batch(talker, &[(Seer, 10.0)]);
            }
            (false, false) => {
                plan.add(talker, Seer, target, Werewolf, -5.0).add_batch(
                    talker,
                    &[(Seer, 3.0), (Possessed, 1.0), (Werewolf, 1.0)],
                );
            }
        },
    }
}

fn divination_fifteen(
    plan: &mut EvidencePlan,
    ctx: &RuleContext<'_>,
    talker: Agent,
    target: Agent,
    black: bool,
    day: u32,
) {
    match ctx.my_role {
        Seer => {
            plan.add_batch(talker, &[(Possessed, STRONG), (Werewolf, STRONG)]);
            rival_seer_report(plan, ctx, talker, target, black);
        }
        Werewolf => {
            // A truthful result on a fellow werewolf is black.
            let truthful = black == ctx.is_ally(target);
            let deltas: &[(Role, f64)] = match (truthful, black) {
                (true, true) => &[(Seer, 10.0), (Possessed, 1.0)],
                (true, false) => &[(Seer, 5.0), (Possessed, 1.0)],
                (false, _) => &[(Seer, -STRONG), (Possessed, STRONG)],
            };
            plan.add_batch(talker, deltas);
        }
        _ => match (black, target == ctx.me) {
            (true, true) => {
                plan.add_batch(
                    talker,
                    &[(Seer, -STRONG), (Possessed, STRONG), (Werewolf, STRONG)],
                );
            }
            (true, false) if day <= 1 => {
                plan.add_batch(talker, &[(Seer, -5.0), (Possessed, 5.0), (Werewolf, 5.0)]);
            }
            (true, false) => {
                plan.add(talker, Seer, target, Werewolf, 5.0)
                    .add(talker, Seer, target, Species::Human, -5.0)
                    .add(talker, Side::Werewolves, target, Species::Human, 5.0)
                    .add(talker, Side::Werewolves, target, Werewolf, -5.0);
            }
            (false, true) => {
                plan.add_batch(talker, &[(Seer, 5.0), (Possessed, 1.0)]);
            }
            (false, false) => {
                plan.add(talker, Seer, target, Werewolf, -5.0)
                    .add(talker, Seer, target, Species::Human, 5.0)
                    .add(talker, Side::Werewolves, target, Werewolf, 5.0);
            }
        },
    }
}

fn identification_report(
    plan: &mut EvidencePlan,
    ctx: &RuleContext<'_>,
    talker: Agent,
    target: Agent,
    species: Species,
) {
    if ctx.ignores(talker) {
        return;
    }
    match ctx.ledger.identification_match(talker, target, species) {
        ReportMatch::Duplicate => return,
        ReportMatch::Contradiction => {
            info!(
                target: "wolf_core::rules",
                talker = %talker,
                subject = %target,
                "identification contradicts an earlier report"
            );
            let contradiction = ctx.weights.contradiction;
            plan.add_batch(
                talker,
                &[(Possessed, contradiction), (Werewolf, contradiction)],
            );
            return;
        }
        ReportMatch::New => {}
    }

    let black = species == Species::Werewolf;
    match ctx.my_role {
        Medium => {}
        Werewolf => {
            let truthful = black == ctx.is_ally(target);
            let deltas: &[(Role, f64)] = match (truthful, black) {
                (true, true) => &[(Medium, 10.0), (Possessed, 1.0)],
                (true, false) => &[(Medium, 5.0), (Possessed, 1.0)],
                (false, _) => &[(Medium, -STRONG), (Possessed, STRONG)],
            };
            plan.add_batch(talker, deltas);
        }
        _ if black => {
            plan.add(talker, Medium, target, Werewolf, 5.0)
                .add(talker, Medium, target, Species::Human, -5.0)
                .add(talker, Side::Werewolves, target, Species::Human, 3.0)
                .add(talker, Side::Werewolves, target, Werewolf, -5.0);
        }
        _ => {
            plan.add(talker, Medium, target, Werewolf, -5.0)
                .add(talker, Medium, target, Species::Human, 5.0)
                .add(talker, Side::Werewolves, target, Werewolf, 5.0);
        }
    }
}

fn guard_report(
    plan: &mut EvidencePlan,
    ctx: &RuleContext<'_>,
    talker: Agent,
    target: Agent,
    day: u32,
) {
    // A guard can only have succeeded on a night without deaths.
    if ctx.ignores(talker)
        || ctx.ledger.has_guard_report(talker, target, day)
        || !ctx.view.last_dead().is_empty()
    {
        return;
    }
    match ctx.my_role {
        Bodyguard => {
            plan.add_batch(talker, &[(Possessed, STRONG), (Werewolf, STRONG)]);
        }
        Werewolf => match ctx.view.attacked() {
            Some(attacked) if attacked == target => {
                plan.add_batch(talker, &[(Bodyguard, 10.0), (Possessed, -10.0)]);
            }
            Some(attacked) => {
                info!(
                    target: "wolf_core::rules",
                    talker = %talker,
                    claimed = %target,
                    attacked = %attacked,
                    "guard claim does not match the attack target"
                );
                plan.add_batch(talker, &[(Bodyguard, -STRONG), (Possessed, STRONG)]);
            }
            None => {}
        },
        _ => {
            plan.add(talker, Bodyguard, target, Werewolf, -2.0)
                .add(talker, Bodyguard, target, Species::Human, 2.0)
                .add(talker, Side::Werewolves, target, Side::Villagers, -1.0)
                .add(talker, Side::Werewolves, target, Side::Werewolves, 2.0);
        }
    }
}

/// Late in the game, special-role claimants the werewolves keep alive look
/// like convenient scapegoats or partners.
fn day_start(plan: &mut EvidencePlan, ctx: &RuleContext<'_>) {
    let day = ctx.view.day();
    if day <= 2 || ctx.my_role == Werewolf || ctx.ledger.day_start_seen(day) {
        return;
    }
    let day = i64::from(day);
    let alive = ctx.view.alive_count() as i64;
    let due = (day == 3 && alive <= 11) || (day >= 4 && alive <= 14 - day);
    if !due {
        return;
    }
    let w = ctx.weights;
    for (agent, role) in ctx.ledger.alive_claims(ctx.view) {
        if role.is_special() {
            plan.add_batch(
                agent,
                &[(Possessed, w.survivor_possessed), (Werewolf, w.survivor_werewolf)],
            );
        }
    }
}
