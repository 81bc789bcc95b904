use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    rules::attack::AttackProfile,
};

/// Kill Team rolls six-sided dice for both attack and defence.
pub const DIE_SIZE: u8 = 6;
/// A natural 1 always fails, so no threshold may go below 2.
pub const MIN_THRESHOLD: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DieOutcome {
    Fail,
    Normal,
    Critical,
}

/// Classifies a single attack die face. Critical takes precedence over
/// Normal when the Lethal and hit ranges overlap.
pub fn classify_face(face: u8, success_threshold: u8, lethal_threshold: u8) -> DieOutcome {
    if face == DIE_SIZE || face >= lethal_threshold {
        DieOutcome::Critical
    } else if face >= success_threshold {
        DieOutcome::Normal
    } else {
        DieOutcome::Fail
    }
}

/// Chance that a single die shows `threshold` or higher. Thresholds above the
/// die size can never be met.
pub fn success_probability(threshold: u8) -> f64 {
    let threshold = threshold.max(1);
    if threshold > DIE_SIZE {
        0.0
    } else {
        (DIE_SIZE - threshold + 1) as f64 / DIE_SIZE as f64
    }
}

/// Probability of each outcome for one attack die.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutcomeDistribution {
    pub fail: f64,
    pub normal: f64,
    pub critical: f64,
}

impl OutcomeDistribution {
    /// The outcome of a fresh roll, before any reroll.
    pub fn base(success_threshold: u8, lethal_threshold: u8) -> Self {
        let mut dist = OutcomeDistribution {
            fail: 0.0,
            normal: 0.0,
            critical: 0.0,
        };
        let p_face = 1.0 / DIE_SIZE as f64;
        for face in 1..=DIE_SIZE {
            match classify_face(face, success_threshold, lethal_threshold) {
                DieOutcome::Fail => dist.fail += p_face,
                DieOutcome::Normal => dist.normal += p_face,
                DieOutcome::Critical => dist.critical += p_face,
            }
        }
        dist
    }

    /// Rerolls the fail mass once; the reroll result is final.
    pub fn reroll_fails(&self, fresh: &OutcomeDistribution) -> Self {
        OutcomeDistribution {
            fail: self.fail * fresh.fail,
            normal: self.normal + self.fail * fresh.normal,
            critical: self.critical + self.fail * fresh.critical,
        }
    }

    pub fn get(&self, outcome: DieOutcome) -> f64 {
        match outcome {
            DieOutcome::Fail => self.fail,
            DieOutcome::Normal => self.normal,
            DieOutcome::Critical => self.critical,
        }
    }

    pub fn success(&self) -> f64 {
        self.normal + self.critical
    }

    pub fn total(&self) -> f64 {
        self.fail + self.normal + self.critical
    }
}

/// The distribution of one attack die after the per-die reroll, if the
/// profile's strategy rerolls every fail. Pool-level effects (Balanced, auto
/// successes, conversions) are applied by the resolution engine instead.
pub fn single_die_distribution(attack: &AttackProfile) -> Result<OutcomeDistribution> {
    attack.validate()?;
    let base = OutcomeDistribution::base(attack.success_threshold, attack.lethal_threshold);
    if attack.reroll.rerolls_every_fail() {
        Ok(base.reroll_fails(&base))
    } else {
        Ok(base)
    }
}
