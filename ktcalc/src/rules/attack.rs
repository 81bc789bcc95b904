use serde::{Deserialize, Serialize};

use crate::{
    error::{CalcError, Result},
    rules::{
        ability::{Ability, AbilitySet, RerollStrategy},
        dice::{DIE_SIZE, MIN_THRESHOLD},
    },
};

/// Upper bound on the number of attack dice the engine accepts.
pub const MAX_DICE: u32 = 30;
/// Upper bound on each damage stat (normal, critical, Devastating).
pub const MAX_DAMAGE: u32 = 100;

/// Everything about the shooting operative and its weapon that influences the
/// damage it deals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackProfile {
    pub num_dice: u32,
    /// Lowest face that counts as a normal success (the weapon's hit stat).
    pub success_threshold: u8,
    pub normal_damage: u32,
    pub critical_damage: u32,
    /// Devastating X: damage per critical success that ignores saves.
    pub devastating_x: u32,
    /// Piercing X: worsens the defender's save against every success.
    pub piercing_x: u8,
    /// Piercing Crits X: worsens the defender's save against critical successes.
    pub piercing_crits_x: u8,
    /// Lowest face that counts as a critical success. 6 means no Lethal.
    pub lethal_threshold: u8,
    pub auto_normals: u32,
    pub auto_criticals: u32,
    pub fails_to_normals: u32,
    pub normals_to_criticals: u32,
    pub reroll: RerollStrategy,
    pub abilities: AbilitySet,
}

impl Default for AttackProfile {
    fn default() -> Self {
        Self {
            num_dice: 4,
            success_threshold: 3,
            normal_damage: 3,
            critical_damage: 4,
            devastating_x: 0,
            piercing_x: 0,
            piercing_crits_x: 0,
            lethal_threshold: DIE_SIZE,
            auto_normals: 0,
            auto_criticals: 0,
            fails_to_normals: 0,
            normals_to_criticals: 0,
            reroll: RerollStrategy::None,
            abilities: AbilitySet::new(),
        }
    }
}

impl AttackProfile {
    pub fn has(&self, ability: Ability) -> bool {
        self.abilities.has(ability)
    }

    /// Abilities that still take effect after suppression.
    pub fn effective_abilities(&self) -> AbilitySet {
        self.abilities.effective()
    }

    /// Bonus damage added to each unsaved normal and critical success.
    pub fn bonus_damage(&self) -> (u32, u32) {
        use crate::rules::ability::{PUNISHING_BONUS_DAMAGE, RENDING_BONUS_DAMAGE};

        let effective = self.effective_abilities();
        let normal = if effective.has(Ability::Punishing) {
            PUNISHING_BONUS_DAMAGE
        } else {
            0
        };
        let critical = if effective.has(Ability::Rending) {
            RENDING_BONUS_DAMAGE
        } else {
            0
        };
        (normal, critical)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_dice > MAX_DICE {
            return Err(CalcError::invalid("num_dice", self.num_dice, "at most 30"));
        }
        for (field, value) in [
            ("auto_normals", self.auto_normals),
            ("auto_criticals", self.auto_criticals),
        ] {
            if value > MAX_DICE {
                return Err(CalcError::invalid(field, value, "at most 30"));
            }
        }
        for (field, value) in [
            ("normal_damage", self.normal_damage),
            ("critical_damage", self.critical_damage),
            ("devastating_x", self.devastating_x),
        ] {
            if value > MAX_DAMAGE {
                return Err(CalcError::invalid(field, value, "at most 100"));
            }
        }
        if !(MIN_THRESHOLD..=DIE_SIZE).contains(&self.success_threshold) {
            return Err(CalcError::invalid(
                "success_threshold",
                self.success_threshold,
                "a die face between 2 and 6",
            ));
        }
        if !(MIN_THRESHOLD..=DIE_SIZE).contains(&self.lethal_threshold) {
            return Err(CalcError::invalid(
                "lethal_threshold",
                self.lethal_threshold,
                "a die face between 2 and 6",
            ));
        }
        Ok(())
    }
}

pub struct AttackProfileBuilder {
    profile: AttackProfile,
}

impl Default for AttackProfileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AttackProfileBuilder {
    pub fn new() -> Self {
        Self {
            profile: AttackProfile::default(),
        }
    }

    pub fn num_dice(mut self, num_dice: u32) -> Self {
        self.profile.num_dice = num_dice;
        self
    }

    pub fn success_threshold(mut self, threshold: u8) -> Self {
        self.profile.success_threshold = threshold;
        self
    }

    pub fn damage(mut self, normal: u32, critical: u32) -> Self {
        self.profile.normal_damage = normal;
        self.profile.critical_damage = critical;
        self
    }

    pub fn devastating(mut self, x: u32) -> Self {
        self.profile.devastating_x = x;
        self
    }

    pub fn piercing(mut self, x: u8) -> Self {
        self.profile.piercing_x = x;
        self
    }

    pub fn piercing_crits(mut self, x: u8) -> Self {
        self.profile.piercing_crits_x = x;
        self
    }

    pub fn lethal(mut self, threshold: u8) -> Self {
        self.profile.lethal_threshold = threshold;
        self
    }

    pub fn auto_normals(mut self, count: u32) -> Self {
        self.profile.auto_normals = count;
        self
    }

    pub fn auto_criticals(mut self, count: u32) -> Self {
        self.profile.auto_criticals = count;
        self
    }

    pub fn fails_to_normals(mut self, count: u32) -> Self {
        self.profile.fails_to_normals = count;
        self
    }

    pub fn normals_to_criticals(mut self, count: u32) -> Self {
        self.profile.normals_to_criticals = count;
        self
    }

    pub fn reroll(mut self, reroll: RerollStrategy) -> Self {
        self.profile.reroll = reroll;
        self
    }

    pub fn ability(mut self, ability: Ability) -> Self {
        self.profile.abilities.insert(ability);
        self
    }

    pub fn build(self) -> AttackProfile {
        self.profile
    }
}
