use serde::{Deserialize, Serialize};

use crate::{
    error::{CalcError, Result},
    rules::{
        ability::{Ability, AbilitySet, EffectTag, SAVE_IMPROVEMENT},
        dice::{DIE_SIZE, MIN_THRESHOLD, success_probability},
    },
};

/// The target of the shooting attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct DefenseProfile {
    /// Lowest face that saves an incoming success.
    pub save_threshold: u8,
    /// Only used when asking for kill probabilities.
    pub wounds: u32,
    /// Normal successes cancelled before any save is rolled.
    pub cover_normal_saves: u32,
    /// Critical (then normal) successes cancelled before any save is rolled.
    pub cover_critical_saves: u32,
    /// Feel No Pain X+: each point of damage is ignored on a roll of X or more.
    pub feel_no_pain: Option<u8>,
    /// Hardy X+: lowest face that saves a critical success. Only read when
    /// the defender has [`Ability::Hardy`].
    pub hardy_threshold: u8,
    pub abilities: AbilitySet,
}

impl Default for DefenseProfile {
    fn default() -> Self {
        Self {
            save_threshold: 3,
            wounds: 12,
            cover_normal_saves: 0,
            cover_critical_saves: 0,
            feel_no_pain: None,
            hardy_threshold: DIE_SIZE,
            abilities: AbilitySet::new(),
        }
    }
}

impl DefenseProfile {
    pub fn has(&self, ability: Ability) -> bool {
        self.abilities.has(ability)
    }

    /// Copy of this profile with a different save threshold.
    pub fn with_save(&self, save_threshold: u8) -> Self {
        Self {
            save_threshold,
            ..*self
        }
    }

    /// How far the defender's own abilities improve the save.
    pub fn save_improvement(&self) -> u8 {
        self.abilities
            .effective()
            .iter()
            .filter(|a| a.effect() == EffectTag::SaveModifier)
            .map(|_| SAVE_IMPROVEMENT)
            .sum()
    }

    /// The face the defender needs against an attack with the given piercing.
    /// A result above 6 means the success cannot be saved.
    pub fn effective_save(&self, piercing: u8) -> u8 {
        let threshold = self.save_threshold as i32 + piercing as i32 - self.save_improvement() as i32;
        threshold.clamp(MIN_THRESHOLD as i32, DIE_SIZE as i32 + 1) as u8
    }

    pub fn save_probability(&self, piercing: u8) -> f64 {
        success_probability(self.effective_save(piercing))
    }

    /// The face the defender needs against a critical success. Hardy never
    /// makes the save easier.
    pub fn effective_critical_save(&self, piercing_crits: u8) -> u8 {
        let save = self.effective_save(piercing_crits);
        if self.abilities.effective().has(Ability::Hardy) {
            save.max(self.hardy_threshold)
        } else {
            save
        }
    }

    pub fn critical_save_probability(&self, piercing_crits: u8) -> f64 {
        success_probability(self.effective_critical_save(piercing_crits))
    }

    /// Probability that a single point of damage is ignored.
    pub fn feel_no_pain_probability(&self) -> f64 {
        self.feel_no_pain.map(success_probability).unwrap_or(0.0)
    }

    pub fn validate(&self) -> Result<()> {
        if !(MIN_THRESHOLD..=DIE_SIZE).contains(&self.save_threshold) {
            return Err(CalcError::invalid(
                "save_threshold",
                self.save_threshold,
                "a die face between 2 and 6",
            ));
        }
        if self.wounds == 0 {
            return Err(CalcError::invalid("wounds", self.wounds, "at least 1"));
        }
        if let Some(fnp) = self.feel_no_pain
            && !(MIN_THRESHOLD..=DIE_SIZE).contains(&fnp)
        {
            return Err(CalcError::invalid(
                "feel_no_pain",
                fnp,
                "a die face between 2 and 6",
            ));
        }
        if !(MIN_THRESHOLD..=DIE_SIZE).contains(&self.hardy_threshold) {
            return Err(CalcError::invalid(
                "hardy_threshold",
                self.hardy_threshold,
                "a die face between 2 and 6",
            ));
        }
        Ok(())
    }
}

pub struct DefenseProfileBuilder {
    profile: DefenseProfile,
}

impl Default for DefenseProfileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DefenseProfileBuilder {
    pub fn new() -> Self {
        Self {
            profile: DefenseProfile::default(),
        }
    }

    pub fn save(mut self, threshold: u8) -> Self {
        self.profile.save_threshold = threshold;
        self
    }

    pub fn wounds(mut self, wounds: u32) -> Self {
        self.profile.wounds = wounds;
        self
    }

    pub fn cover_normal_saves(mut self, count: u32) -> Self {
        self.profile.cover_normal_saves = count;
        self
    }

    pub fn cover_critical_saves(mut self, count: u32) -> Self {
        self.profile.cover_critical_saves = count;
        self
    }

    pub fn feel_no_pain(mut self, threshold: u8) -> Self {
        self.profile.feel_no_pain = Some(threshold);
        self
    }

    /// Hardy X+.
    pub fn hardy(mut self, threshold: u8) -> Self {
        self.profile.hardy_threshold = threshold;
        self.profile.abilities.insert(Ability::Hardy);
        self
    }

    pub fn ability(mut self, ability: Ability) -> Self {
        self.profile.abilities.insert(ability);
        self
    }

    pub fn build(self) -> DefenseProfile {
        self.profile
    }
}
