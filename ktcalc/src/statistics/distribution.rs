use std::collections::BTreeMap;

use derive_more::{Deref, IntoIterator};
use serde::Serialize;

use crate::{
    error::{CalcError, Result, check_unit_mass},
    statistics::pmf::binomial_probability,
};

/// Probability of every total damage value one attack can deal.
///
/// Damage values that are not listed have probability 0. The map can be read
/// through `Deref` but never mutated; combining distributions always produces a
/// new one.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deref, IntoIterator)]
#[serde(transparent)]
#[into_iterator(owned, ref)]
pub struct DamageDistribution {
    masses: BTreeMap<u32, f64>,
}

impl DamageDistribution {
    /// A distribution that deals exactly `damage` every time.
    pub fn certain(damage: u32) -> Self {
        Self {
            masses: BTreeMap::from([(damage, 1.0)]),
        }
    }

    /// Builds a distribution from `(damage, probability)` pairs, summing
    /// repeated damage values. The caller is responsible for the total mass;
    /// see [`DamageDistribution::check_mass`].
    pub fn from_masses(masses: impl IntoIterator<Item = (u32, f64)>) -> Self {
        let mut merged = BTreeMap::new();
        for (damage, p) in masses {
            *merged.entry(damage).or_insert(0.0) += p;
        }
        Self { masses: merged }
    }

    pub fn probability(&self, damage: u32) -> f64 {
        self.masses.get(&damage).copied().unwrap_or(0.0)
    }

    pub fn total_mass(&self) -> f64 {
        self.masses.values().sum()
    }

    pub fn check_mass(&self) -> Result<()> {
        check_unit_mass(self.total_mass())
    }

    pub fn max_damage(&self) -> Option<u32> {
        self.masses.keys().next_back().copied()
    }

    pub fn expected_value(&self) -> f64 {
        self.masses
            .iter()
            .map(|(&damage, &p)| damage as f64 * p)
            .sum()
    }

    /// Probability of dealing at least `wounds` damage.
    pub fn kill_probability(&self, wounds: u32) -> Result<f64> {
        if wounds == 0 {
            return Err(CalcError::invalid("wounds", wounds, "at least 1"));
        }
        Ok(self.masses.range(wounds..).map(|(_, &p)| p).sum())
    }

    /// Distribution of the sum of two independent damage values.
    pub fn combine(&self, other: &DamageDistribution) -> Result<DamageDistribution> {
        if self.is_empty() || other.is_empty() {
            return Err(CalcError::EmptyDistribution);
        }
        let mut masses = BTreeMap::new();
        for (&a, &pa) in &self.masses {
            for (&b, &pb) in &other.masses {
                *masses.entry(a + b).or_insert(0.0) += pa * pb;
            }
        }
        let combined = Self { masses };
        combined.check_mass()?;
        Ok(combined)
    }

    /// Each point of damage is independently ignored with probability
    /// `p_ignore` (Feel No Pain).
    pub fn thin(&self, p_ignore: f64) -> DamageDistribution {
        if p_ignore <= 0.0 {
            return self.clone();
        }
        let p_keep = 1.0 - p_ignore;
        let mut masses = BTreeMap::new();
        for (&damage, &p) in &self.masses {
            for kept in 0..=damage {
                let q = binomial_probability(damage, kept, p_keep);
                if q > 0.0 {
                    *masses.entry(kept).or_insert(0.0) += p * q;
                }
            }
        }
        Self { masses }
    }
}

pub fn expected_value(distribution: &DamageDistribution) -> f64 {
    distribution.expected_value()
}

pub fn kill_probability(distribution: &DamageDistribution, wounds: u32) -> Result<f64> {
    distribution.kill_probability(wounds)
}

pub fn combine(a: &DamageDistribution, b: &DamageDistribution) -> Result<DamageDistribution> {
    a.combine(b)
}
