use serde::{Deserialize, Serialize};

use super::matrix::SCORE_BOUND;

/// Headline tuning constants for the update rules.
///
/// Missing fields deserialize to their defaults, so a scenario only needs to
/// name the weights it changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleWeights {
    /// Saturation bound for finite cells.
    pub bound: f64,
    /// Initial value of every cell.
    pub start_belief: f64,
    /// Multiplier applied to scores before exponentiating them into probabilities.
    pub probability_scale: f64,
    /// Added to a claimant's Villager cell on its first special-role claim.
    pub claim_villager_penalty: f64,
    /// Added to Possessed and Werewolf when a talker contradicts its own report.
    pub contradiction: f64,
    /// 5-player: villager voter -> werewolf target.
    pub vote_villager: f64,
    /// 5-player: seer voter -> werewolf target.
    pub vote_seer: f64,
    /// 15-player: per-day weight of a village-aligned vote on a werewolf target.
    pub vote_per_day: f64,
    /// 15-player: werewolf-aligned voter on a werewolf target.
    pub vote_ally: f64,
    /// 15-player: per-day weight of a stated intention.
    pub intent_per_day: f64,
    /// 5-player: talker's own Werewolf cell after a stated intention.
    pub intent_werewolf_bias: f64,
    /// Day-start nudge on surviving special-role claimants.
    pub survivor_possessed: f64,
    pub survivor_werewolf: f64,
}

impl Default for RuleWeights {
    fn default() -> Self {
        Self {
            bound: SCORE_BOUND,
            start_belief: 0.0,
            probability_scale: 0.1,
            claim_villager_penalty: -100.0,
            contradiction: 100.0,
            vote_villager: 0.1,
            vote_seer: 0.3,
            vote_per_day: 0.2,
            vote_ally: -1.0,
            intent_per_day: 0.1,
            intent_werewolf_bias: 1.0,
            survivor_possessed: 1.0,
            survivor_werewolf: 3.0,
        }
    }
}

impl RuleWeights {
    /// Replaces non-finite values with defaults and keeps the bound positive.
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let pick = |value: f64, fallback: f64| if value.is_finite() { value } else { fallback };
        Self {
            bound: if self.bound.is_finite() && self.bound > 0.0 {
                self.bound
            } else {
                defaults.bound
            },
            start_belief: pick(self.start_belief, defaults.start_belief),
            probability_scale: if self.probability_scale.is_finite() && self.probability_scale > 0.0 {
                self.probability_scale
            } else {
                defaults.probability_scale
            },
            claim_villager_penalty: pick(self.claim_villager_penalty, defaults.claim_villager_penalty),
            contradiction: pick(self.contradiction, defaults.contradiction),
            vote_villager: pick(self.vote_villager, defaults.vote_villager),
            vote_seer: pick(self.vote_seer, defaults.vote_seer),
            vote_per_day: pick(self.vote_per_day, defaults.vote_per_day),
            vote_ally: pick(self.vote_ally, defaults.vote_ally),
            intent_per_day: pick(self.intent_per_day, defaults.intent_per_day),
            intent_werewolf_bias: pick(self.intent_werewolf_bias, defaults.intent_werewolf_bias),
            survivor_possessed: pick(self.survivor_possessed, defaults.survivor_possessed),
            survivor_werewolf: pick(self.survivor_werewolf, defaults.survivor_werewolf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_like_input_keeps_defaults() {
        let weights: RuleWeights =
            serde_json::from_str(r#"{"claim_villager_penalty": -40.0}"#).unwrap();
        assert_eq!(weights.claim_villager_penalty, -40.0);
        assert_eq!(weights.contradiction, 100.0);
        assert_eq!(weights.bound, SCORE_BOUND);
    }

    #[test]
    fn sanitized_rejects_degenerate_values() {
        let weights = RuleWeights {
            bound: -1.0,
            probability_scale: 0.0,
            vote_seer: f64::NAN,
            ..RuleWeights::default()
        }
        .sanitized();
        assert_eq!(weights.bound, SCORE_BOUND);
        assert_eq!(weights.probability_scale, 0.1);
        assert_eq!(weights.vote_seer, 0.3);
    }
}
