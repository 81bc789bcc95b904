//! Side-by-side comparison of two shooting scenarios across every save
//! threshold.

use std::{collections::BTreeMap, ops::RangeInclusive};

use serde::{Deserialize, Serialize};

use crate::{
    error::{CalcError, Result},
    rules::{attack::AttackProfile, defense::DefenseProfile},
    statistics::{cache::ResolutionCache, distribution::DamageDistribution},
};

/// Save thresholds every comparison is charted for.
pub const SAVE_RANGE: RangeInclusive<u8> = 2..=6;
pub const DEFAULT_MAX_WOUNDS: u32 = 25;
/// Differences smaller than this are reported as equal.
pub const EQUAL_EPSILON: f64 = 0.001;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub attack: AttackProfile,
    pub defense: DefenseProfile,
}

impl Scenario {
    pub fn new(attack: AttackProfile, defense: DefenseProfile) -> Self {
        Self { attack, defense }
    }
}

/// Damage distributions keyed by the defender's save threshold.
pub type SaveSweep = BTreeMap<u8, DamageDistribution>;

/// Resolves the attack once per save in [`SAVE_RANGE`], keeping everything
/// else about the defender.
pub fn sweep_saves(
    attack: &AttackProfile,
    defense: &DefenseProfile,
    cache: &mut ResolutionCache,
) -> Result<SaveSweep> {
    SAVE_RANGE
        .map(|save| {
            cache
                .resolve(attack, &defense.with_save(save))
                .map(|dist| (save, dist))
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Better,
    Worse,
    Equal,
}

impl Verdict {
    /// Verdict for scenario 1 given `s1 - s2`.
    pub fn from_difference(difference: f64) -> Self {
        if difference.abs() < EQUAL_EPSILON {
            Verdict::Equal
        } else if difference > 0.0 {
            Verdict::Better
        } else {
            Verdict::Worse
        }
    }

    pub fn flip(self) -> Self {
        match self {
            Verdict::Better => Verdict::Worse,
            Verdict::Worse => Verdict::Better,
            Verdict::Equal => Verdict::Equal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub s1: f64,
    pub s2: f64,
    pub difference: f64,
    pub verdict: Verdict,
}

impl ComparisonRow {
    pub fn new(s1: f64, s2: f64) -> Self {
        let difference = s1 - s2;
        Self {
            s1,
            s2,
            difference,
            verdict: Verdict::from_difference(difference),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KillChanceRow {
    pub wounds: u32,
    pub chance: ComparisonRow,
}

/// Both scenarios fired at the same target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CombinedRow {
    pub average_damage: f64,
    pub kill_chance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveComparison {
    pub save: u8,
    pub average_damage: ComparisonRow,
    /// Rows for wounds `1..`, stopping after the last row where either
    /// scenario can still kill.
    pub kill_chances: Vec<KillChanceRow>,
    /// First wound total at which both scenarios have no chance to kill, when
    /// the table was cut short.
    pub zero_from: Option<u32>,
    pub combined: CombinedRow,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioComparison {
    pub combo_wounds: u32,
    pub max_wounds: u32,
    pub saves: Vec<SaveComparison>,
}

impl ScenarioComparison {
    /// Compares `s1` against `s2` for every save threshold. The combined rows
    /// use scenario 1's defender wounds.
    pub fn compute(
        s1: &Scenario,
        s2: &Scenario,
        max_wounds: u32,
        cache: &mut ResolutionCache,
    ) -> Result<Self> {
        if max_wounds == 0 {
            return Err(CalcError::invalid("max_wounds", max_wounds, "at least 1"));
        }
        let sweep1 = sweep_saves(&s1.attack, &s1.defense, cache)?;
        let sweep2 = sweep_saves(&s2.attack, &s2.defense, cache)?;
        let combo_wounds = s1.defense.wounds;

        let mut saves = Vec::new();
        for (save, dist1) in &sweep1 {
            let Some(dist2) = sweep2.get(save) else {
                continue;
            };
            saves.push(compare_save(*save, dist1, dist2, max_wounds, combo_wounds)?);
        }

        Ok(Self {
            combo_wounds,
            max_wounds,
            saves,
        })
    }
}

fn compare_save(
    save: u8,
    dist1: &DamageDistribution,
    dist2: &DamageDistribution,
    max_wounds: u32,
    combo_wounds: u32,
) -> Result<SaveComparison> {
    let average_damage = ComparisonRow::new(dist1.expected_value(), dist2.expected_value());

    let mut rows = Vec::new();
    let mut last_non_zero = 0;
    for wounds in 1..=max_wounds {
        let chance = ComparisonRow::new(
            dist1.kill_probability(wounds)?,
            dist2.kill_probability(wounds)?,
        );
        if chance.s1 > 0.0 || chance.s2 > 0.0 {
            last_non_zero = wounds;
        }
        rows.push(KillChanceRow { wounds, chance });
    }
    rows.truncate(last_non_zero as usize);
    let zero_from = (last_non_zero < max_wounds).then_some(last_non_zero + 1);

    let combined = dist1.combine(dist2)?;
    Ok(SaveComparison {
        save,
        average_damage,
        kill_chances: rows,
        zero_from,
        combined: CombinedRow {
            average_damage: combined.expected_value(),
            kill_chance: combined.kill_probability(combo_wounds)?,
        },
    })
}
