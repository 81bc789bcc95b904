use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, check_unit_mass},
    rules::dice::OutcomeDistribution,
    statistics::pmf::multinomial_probability,
};

/// How many dice of an attack ended up in each category.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PoolCounts {
    pub fails: u32,
    pub normals: u32,
    pub criticals: u32,
}

impl PoolCounts {
    pub fn new(fails: u32, normals: u32, criticals: u32) -> Self {
        Self {
            fails,
            normals,
            criticals,
        }
    }

    pub fn successes(&self) -> u32 {
        self.normals + self.criticals
    }

    pub fn add_successes(self, normals: u32, criticals: u32) -> Self {
        Self {
            normals: self.normals + normals,
            criticals: self.criticals + criticals,
            ..self
        }
    }

    /// Turns up to `limit` fails into normal successes.
    pub fn fails_to_normals(self, limit: u32) -> Self {
        let moved = limit.min(self.fails);
        Self {
            fails: self.fails - moved,
            normals: self.normals + moved,
            ..self
        }
    }

    /// Turns up to `limit` normal successes into critical successes.
    pub fn normals_to_criticals(self, limit: u32) -> Self {
        let moved = limit.min(self.normals);
        Self {
            normals: self.normals - moved,
            criticals: self.criticals + moved,
            ..self
        }
    }
}

/// Joint distribution of [`PoolCounts`] for a whole attack.
///
/// Transforms consume the pool and return a new one; probability mass is only
/// ever moved between entries, so the total stays at 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessPool {
    outcomes: BTreeMap<PoolCounts, f64>,
}

impl SuccessPool {
    /// Enumerates every split of `num_dice` independent dice into fails,
    /// normals and criticals.
    pub fn roll(num_dice: u32, die: &OutcomeDistribution) -> Self {
        let probabilities = [die.fail, die.normal, die.critical];
        let mut outcomes = BTreeMap::new();
        for criticals in 0..=num_dice {
            for normals in 0..=(num_dice - criticals) {
                let fails = num_dice - criticals - normals;
                let p = multinomial_probability(num_dice, &[fails, normals, criticals], &probabilities);
                if p > 0.0 {
                    outcomes.insert(PoolCounts::new(fails, normals, criticals), p);
                }
            }
        }
        Self { outcomes }
    }

    /// A pool holding a single outcome with certainty.
    pub fn certain(counts: PoolCounts) -> Self {
        Self {
            outcomes: BTreeMap::from([(counts, 1.0)]),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PoolCounts, &f64)> {
        self.outcomes.iter()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn probability(&self, counts: PoolCounts) -> f64 {
        self.outcomes.get(&counts).copied().unwrap_or(0.0)
    }

    pub fn total_mass(&self) -> f64 {
        self.outcomes.values().sum()
    }

    pub fn check_mass(&self) -> Result<()> {
        check_unit_mass(self.total_mass())
    }

    /// Applies a deterministic rewrite to every outcome, merging outcomes that
    /// collide.
    pub fn map_counts(self, f: impl Fn(PoolCounts) -> PoolCounts) -> Self {
        let mut outcomes = BTreeMap::new();
        for (counts, p) in self.outcomes {
            *outcomes.entry(f(counts)).or_insert(0.0) += p;
        }
        Self { outcomes }
    }

    /// Rerolls one fail in every outcome that has one. `fresh` is the
    /// distribution of the new roll, which is final.
    pub fn reroll_one_fail(self, fresh: &OutcomeDistribution) -> Self {
        let mut outcomes = BTreeMap::new();
        for (counts, p) in self.outcomes {
            if counts.fails == 0 {
                *outcomes.entry(counts).or_insert(0.0) += p;
                continue;
            }
            let rerolled = PoolCounts {
                fails: counts.fails - 1,
                ..counts
            };
            let branches = [
                (counts, fresh.fail),
                (rerolled.add_successes(1, 0), fresh.normal),
                (rerolled.add_successes(0, 1), fresh.critical),
            ];
            for (next, q) in branches {
                if q > 0.0 {
                    *outcomes.entry(next).or_insert(0.0) += p * q;
                }
            }
        }
        Self { outcomes }
    }
}
