//! Exact resolution of one shooting attack.
//!
//! The pipeline runs in a fixed order:
//!
//! 1. per-die outcome distribution (hit stat, Lethal, Ceaseless)
//! 2. multinomial enumeration of the pool
//! 3. Balanced reroll
//! 4. auto successes, then fixed-count conversions
//! 5. conditional count shifts (Purity Seal, Close Assault, Severe)
//! 6. cover saves and Just a Scratch, then independent save rolls per success
//! 7. damage tally (Devastating, Rending, Punishing, Durable)
//! 8. Feel No Pain

use std::collections::BTreeMap;

use crate::{
    error::Result,
    rules::{
        ability::{Ability, AbilitySet, DURABLE_REDUCTION},
        attack::AttackProfile,
        defense::DefenseProfile,
        dice::{OutcomeDistribution, single_die_distribution},
    },
    statistics::{
        distribution::DamageDistribution,
        pmf::binomial_probability,
        pool::{PoolCounts, SuccessPool},
    },
};

/// Computes the full damage distribution of `attack` against `defense`.
pub fn resolve_attack(attack: &AttackProfile, defense: &DefenseProfile) -> Result<DamageDistribution> {
    attack.validate()?;
    defense.validate()?;

    let pool = roll_pool(attack)?;
    pool.check_mass()?;

    let damage = tally_damage(&pool, attack, defense);
    let damage = damage.thin(defense.feel_no_pain_probability());
    damage.check_mass()?;

    log::debug!(
        "resolved {}d @ {}+ vs {}+ save: {} damage values, mean {:.3}",
        attack.num_dice,
        attack.success_threshold,
        defense.save_threshold,
        damage.len(),
        damage.expected_value()
    );
    Ok(damage)
}

/// Distribution of retained normal and critical successes, before the
/// defender does anything.
pub fn roll_pool(attack: &AttackProfile) -> Result<SuccessPool> {
    let die = single_die_distribution(attack)?;
    let fresh = OutcomeDistribution::base(attack.success_threshold, attack.lethal_threshold);

    let mut pool = SuccessPool::roll(attack.num_dice, &die);
    log::trace!("rolled pool: {} outcomes", pool.len());

    // Ceaseless already rerolled every fail, so Balanced has nothing left to
    // target when both are in play.
    let rerollable_fails = if attack.reroll.rerolls_every_fail() {
        0
    } else {
        attack.num_dice
    };
    if attack.reroll.rerolls_single_fail(rerollable_fails) {
        pool = pool.reroll_one_fail(&fresh);
        log::trace!("after balanced reroll: {} outcomes", pool.len());
    }

    let pool = pool
        .map_counts(|c| c.add_successes(attack.auto_normals, attack.auto_criticals))
        .map_counts(|c| {
            c.fails_to_normals(attack.fails_to_normals)
                .normals_to_criticals(attack.normals_to_criticals)
        })
        .map_counts(|c| apply_conditional_shifts(c, attack.effective_abilities()));
    log::trace!("after conversions: {} outcomes", pool.len());
    Ok(pool)
}

fn apply_conditional_shifts(counts: PoolCounts, abilities: AbilitySet) -> PoolCounts {
    let mut counts = counts;
    if abilities.has(Ability::PuritySeal) && counts.fails >= 2 {
        counts = counts.fails_to_normals(1);
    }
    if abilities.has(Ability::FailToNormalIfAtLeastTwoSuccesses) && counts.successes() >= 2 {
        counts = counts.fails_to_normals(1);
    }
    if abilities.has(Ability::Severe) && counts.criticals == 0 {
        counts = counts.normals_to_criticals(1);
    }
    counts
}

/// Successes left after cover saves. Critical cover saves spill over onto
/// normal successes once the criticals run out. Just a Scratch then cancels
/// one more success, a critical one first.
fn apply_cover_saves(counts: PoolCounts, defense: &DefenseProfile) -> (u32, u32) {
    let mut normals = counts.normals.saturating_sub(defense.cover_normal_saves);
    let mut criticals = counts.criticals;
    let crit_cover = defense.cover_critical_saves.min(criticals);
    criticals -= crit_cover;
    normals = normals.saturating_sub(defense.cover_critical_saves - crit_cover);

    if defense.abilities.effective().has(Ability::JustAScratch) {
        if criticals > 0 {
            criticals -= 1;
        } else {
            normals = normals.saturating_sub(1);
        }
    }
    (normals, criticals)
}

struct DamageRule {
    normal: u32,
    critical: u32,
    devastating: u32,
    durable: bool,
    p_save_normal: f64,
    p_save_critical: f64,
}

impl DamageRule {
    fn new(attack: &AttackProfile, defense: &DefenseProfile) -> Self {
        let (normal_bonus, critical_bonus) = attack.bonus_damage();
        Self {
            normal: attack.normal_damage + normal_bonus,
            critical: attack.critical_damage + critical_bonus,
            devastating: attack.devastating_x,
            durable: defense.abilities.effective().has(Ability::Durable),
            p_save_normal: defense.save_probability(attack.piercing_x),
            p_save_critical: defense.critical_save_probability(attack.piercing_crits_x),
        }
    }

    fn damage(&self, unsaved_normals: u32, unsaved_criticals: u32, total_criticals: u32) -> u32 {
        let mut critical_damage = unsaved_criticals * self.critical;
        if self.durable && unsaved_criticals > 0 {
            critical_damage = critical_damage.saturating_sub(DURABLE_REDUCTION);
        }
        unsaved_normals * self.normal + critical_damage + total_criticals * self.devastating
    }
}

fn tally_damage(pool: &SuccessPool, attack: &AttackProfile, defense: &DefenseProfile) -> DamageDistribution {
    let rule = DamageRule::new(attack, defense);
    let mut masses: BTreeMap<u32, f64> = BTreeMap::new();

    for (&counts, &p_counts) in pool.iter() {
        let (normals, criticals) = apply_cover_saves(counts, defense);
        for unsaved_c in 0..=criticals {
            // unsaved successes are the ones whose save roll failed
            let p_c = binomial_probability(criticals, unsaved_c, 1.0 - rule.p_save_critical);
            if p_c == 0.0 {
                continue;
            }
            for unsaved_n in 0..=normals {
                let p_n = binomial_probability(normals, unsaved_n, 1.0 - rule.p_save_normal);
                if p_n == 0.0 {
                    continue;
                }
                let damage = rule.damage(unsaved_n, unsaved_c, counts.criticals);
                *masses.entry(damage).or_insert(0.0) += p_counts * p_c * p_n;
            }
        }
    }

    DamageDistribution::from_masses(masses)
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng, rngs::StdRng};
    use statrs::assert_almost_eq;

    use super::*;
    use crate::rules::{
        ability::RerollStrategy,
        attack::AttackProfileBuilder,
        defense::DefenseProfileBuilder,
        dice::{DIE_SIZE, DieOutcome, classify_face},
    };

    /// A 6+ save, which any amount of piercing makes impossible.
    fn no_saves() -> DefenseProfile {
        DefenseProfileBuilder::new().save(6).build()
    }

    fn pierce_all(builder: AttackProfileBuilder) -> AttackProfile {
        builder.piercing(1).piercing_crits(1).build()
    }

    fn assert_same(a: &DamageDistribution, b: &DamageDistribution) {
        let damages: std::collections::BTreeSet<u32> = a.keys().chain(b.keys()).copied().collect();
        for damage in damages {
            assert_almost_eq!(a.probability(damage), b.probability(damage), 1e-12);
        }
    }

    #[test]
    fn test_zero_dice() -> anyhow::Result<()> {
        let attack = AttackProfileBuilder::new().num_dice(0).build();
        let dist = resolve_attack(&attack, &DefenseProfile::default())?;
        assert_eq!(dist, DamageDistribution::certain(0));
        assert_eq!(dist.expected_value(), 0.0);
        assert_eq!(dist.kill_probability(1)?, 0.0);
        Ok(())
    }

    #[test]
    fn test_reference_scenario() -> anyhow::Result<()> {
        // 4 attacks, 3+, 3/4 damage into a 3+ save. Each die independently
        // deals 3 with chance 1/6 and 4 with chance 1/18.
        let attack = AttackProfileBuilder::new()
            .num_dice(4)
            .success_threshold(3)
            .damage(3, 4)
            .build();
        let defense = DefenseProfileBuilder::new().save(3).build();
        let dist = resolve_attack(&attack, &defense)?;
        assert_almost_eq!(dist.total_mass(), 1.0, 1e-9);
        assert_almost_eq!(dist.expected_value(), 26.0 / 9.0, 1e-9);
        assert_almost_eq!(dist.probability(0), (7.0_f64 / 9.0).powi(4), 1e-12);
        assert_almost_eq!(dist.probability(16), (1.0_f64 / 18.0).powi(4), 1e-12);
        assert_eq!(dist.max_damage(), Some(16));
        Ok(())
    }

    #[test]
    fn test_every_profile_has_unit_mass() -> anyhow::Result<()> {
        for reroll in RerollStrategy::all() {
            for threshold in 2..=DIE_SIZE {
                for save in 2..=DIE_SIZE {
                    let attack = AttackProfileBuilder::new()
                        .num_dice(6)
                        .success_threshold(threshold)
                        .lethal(5)
                        .devastating(2)
                        .piercing_crits(1)
                        .auto_normals(1)
                        .fails_to_normals(1)
                        .normals_to_criticals(1)
                        .reroll(reroll)
                        .ability(Ability::Rending)
                        .ability(Ability::PuritySeal)
                        .ability(Ability::FailToNormalIfAtLeastTwoSuccesses)
                        .build();
                    let defense = DefenseProfileBuilder::new()
                        .save(save)
                        .cover_normal_saves(1)
                        .feel_no_pain(5)
                        .ability(Ability::Durable)
                        .build();
                    let dist = resolve_attack(&attack, &defense)?;
                    assert_almost_eq!(dist.total_mass(), 1.0, 1e-9);
                }
            }
        }
        Ok(())
    }

    #[test]
    fn test_devastating_ignores_saves() -> anyhow::Result<()> {
        let attack = AttackProfileBuilder::new()
            .num_dice(1)
            .success_threshold(6)
            .damage(0, 0)
            .devastating(3)
            .build();
        let defense = DefenseProfileBuilder::new().save(2).build();
        let dist = resolve_attack(&attack, &defense)?;
        assert_almost_eq!(dist.probability(3), 1.0 / 6.0, 1e-12);
        assert_almost_eq!(dist.probability(0), 5.0 / 6.0, 1e-12);
        Ok(())
    }

    #[test]
    fn test_piercing_past_six_cannot_be_saved() -> anyhow::Result<()> {
        let attack = AttackProfileBuilder::new()
            .num_dice(1)
            .success_threshold(2)
            .piercing(5)
            .piercing_crits(5)
            .build();
        let defense = DefenseProfileBuilder::new().save(2).build();
        let dist = resolve_attack(&attack, &defense)?;
        assert_almost_eq!(dist.probability(0), 1.0 / 6.0, 1e-12);
        assert_almost_eq!(dist.probability(3), 4.0 / 6.0, 1e-12);
        assert_almost_eq!(dist.probability(4), 1.0 / 6.0, 1e-12);
        Ok(())
    }

    #[test]
    fn test_piercing_crits_only_affects_criticals() -> anyhow::Result<()> {
        // 6+ to save normally, 7+ against crits
        let attack = AttackProfileBuilder::new()
            .num_dice(1)
            .success_threshold(2)
            .piercing_crits(1)
            .build();
        let defense = DefenseProfileBuilder::new().save(6).build();
        let dist = resolve_attack(&attack, &defense)?;
        assert_almost_eq!(dist.probability(3), 4.0 / 6.0 * 5.0 / 6.0, 1e-12);
        assert_almost_eq!(dist.probability(4), 1.0 / 6.0, 1e-12);
        Ok(())
    }

    #[test]
    fn test_piercing_only_affects_normals() -> anyhow::Result<()> {
        // normals need 7+ and cannot be saved, criticals keep the 3+ save
        let attack = AttackProfileBuilder::new()
            .num_dice(1)
            .success_threshold(2)
            .piercing(4)
            .build();
        let defense = DefenseProfileBuilder::new().save(3).build();
        let dist = resolve_attack(&attack, &defense)?;
        assert_almost_eq!(dist.probability(3), 4.0 / 6.0, 1e-12);
        assert_almost_eq!(dist.probability(4), 1.0 / 6.0 * 2.0 / 6.0, 1e-12);
        assert_almost_eq!(dist.probability(0), 1.0 / 6.0 + 1.0 / 6.0 * 4.0 / 6.0, 1e-12);
        Ok(())
    }

    #[test]
    fn test_balanced_rerolls_one_fail() -> anyhow::Result<()> {
        let base = || AttackProfileBuilder::new().num_dice(2).success_threshold(4);
        let defense = no_saves();

        let none = resolve_attack(&pierce_all(base()), &defense)?;
        let balanced = resolve_attack(&pierce_all(base().reroll(RerollStrategy::Balanced)), &defense)?;
        let ceaseless = resolve_attack(&pierce_all(base().reroll(RerollStrategy::Ceaseless)), &defense)?;
        let both = resolve_attack(
            &pierce_all(base().reroll(RerollStrategy::CeaselessThenBalanced)),
            &defense,
        )?;

        assert_almost_eq!(none.probability(0), 0.25, 1e-12);
        assert_almost_eq!(balanced.probability(0), 0.125, 1e-12);
        assert_almost_eq!(ceaseless.probability(0), 0.0625, 1e-12);
        // no die is rerolled twice, so Balanced finds nothing left after Ceaseless
        assert_same(&both, &ceaseless);
        Ok(())
    }

    #[test]
    fn test_rerolls_never_lower_hit_chance() -> anyhow::Result<()> {
        for threshold in 2..=DIE_SIZE {
            for num_dice in 1..=5 {
                let base = || {
                    AttackProfileBuilder::new()
                        .num_dice(num_dice)
                        .success_threshold(threshold)
                };
                let p_hit = |attack: AttackProfile| -> anyhow::Result<f64> {
                    let pool = roll_pool(&attack)?;
                    Ok(pool
                        .iter()
                        .filter(|(c, _)| c.successes() > 0)
                        .map(|(_, p)| p)
                        .sum())
                };
                let without = p_hit(base().build())?;
                for reroll in RerollStrategy::all() {
                    let with = p_hit(base().reroll(reroll).build())?;
                    assert!(with >= without - 1e-12, "{reroll:?} lowered the hit chance");
                }
            }
        }
        Ok(())
    }

    #[test]
    fn test_severe_suppresses_rending_and_punishing() -> anyhow::Result<()> {
        let base = || {
            AttackProfileBuilder::new()
                .num_dice(5)
                .success_threshold(3)
                .lethal(5)
                .devastating(1)
                .piercing_crits(1)
                .ability(Ability::Severe)
        };
        let defense = DefenseProfileBuilder::new().save(4).build();
        let severe = resolve_attack(&base().build(), &defense)?;
        let everything = resolve_attack(
            &base()
                .ability(Ability::Rending)
                .ability(Ability::Punishing)
                .build(),
            &defense,
        )?;
        assert_same(&severe, &everything);
        Ok(())
    }

    #[test]
    fn test_severe_promotes_a_normal() -> anyhow::Result<()> {
        let attack = pierce_all(
            AttackProfileBuilder::new()
                .num_dice(1)
                .success_threshold(2)
                .ability(Ability::Severe),
        );
        let dist = resolve_attack(&attack, &no_saves())?;
        assert_almost_eq!(dist.probability(0), 1.0 / 6.0, 1e-12);
        assert_almost_eq!(dist.probability(4), 5.0 / 6.0, 1e-12);
        Ok(())
    }

    #[test]
    fn test_rending_and_punishing_bonus() -> anyhow::Result<()> {
        let attack = pierce_all(
            AttackProfileBuilder::new()
                .num_dice(1)
                .success_threshold(2)
                .ability(Ability::Rending),
        );
        let dist = resolve_attack(&attack, &no_saves())?;
        assert_almost_eq!(dist.probability(3), 4.0 / 6.0, 1e-12);
        assert_almost_eq!(dist.probability(5), 1.0 / 6.0, 1e-12);

        let attack = pierce_all(
            AttackProfileBuilder::new()
                .num_dice(1)
                .success_threshold(2)
                .ability(Ability::Punishing),
        );
        let dist = resolve_attack(&attack, &no_saves())?;
        assert_almost_eq!(dist.probability(4), 4.0 / 6.0 + 1.0 / 6.0, 1e-12);
        Ok(())
    }

    #[test]
    fn test_auto_successes_and_conversions() -> anyhow::Result<()> {
        // no dice, one auto normal promoted to a crit
        let attack = pierce_all(
            AttackProfileBuilder::new()
                .num_dice(0)
                .auto_normals(2)
                .normals_to_criticals(1),
        );
        let dist = resolve_attack(&attack, &no_saves())?;
        assert_eq!(dist, DamageDistribution::certain(7));

        // fails to normals is capped by the number of fails
        let attack = pierce_all(
            AttackProfileBuilder::new()
                .num_dice(1)
                .success_threshold(6)
                .fails_to_normals(3),
        );
        let dist = resolve_attack(&attack, &no_saves())?;
        assert_almost_eq!(dist.probability(3), 5.0 / 6.0, 1e-12);
        assert_almost_eq!(dist.probability(4), 1.0 / 6.0, 1e-12);
        Ok(())
    }

    #[test]
    fn test_purity_seal() -> anyhow::Result<()> {
        let attack = pierce_all(
            AttackProfileBuilder::new()
                .num_dice(2)
                .success_threshold(6)
                .ability(Ability::PuritySeal),
        );
        let dist = resolve_attack(&attack, &no_saves())?;
        assert_almost_eq!(dist.probability(0), 0.0, 1e-12);
        assert_almost_eq!(dist.probability(3), 25.0 / 36.0, 1e-12);
        assert_almost_eq!(dist.probability(4), 10.0 / 36.0, 1e-12);
        assert_almost_eq!(dist.probability(8), 1.0 / 36.0, 1e-12);
        Ok(())
    }

    #[test]
    fn test_close_assault() -> anyhow::Result<()> {
        let attack = pierce_all(
            AttackProfileBuilder::new()
                .num_dice(3)
                .success_threshold(6)
                .ability(Ability::FailToNormalIfAtLeastTwoSuccesses),
        );
        let dist = resolve_attack(&attack, &no_saves())?;
        // two crits and a fail: the fail comes back as a normal
        assert_almost_eq!(dist.probability(11), 15.0 / 216.0, 1e-12);
        assert_almost_eq!(dist.probability(8), 0.0, 1e-12);
        Ok(())
    }

    #[test]
    fn test_cover_saves() -> anyhow::Result<()> {
        let attack = pierce_all(AttackProfileBuilder::new().num_dice(1).success_threshold(2));
        let defense = DefenseProfileBuilder::new()
            .save(6)
            .cover_normal_saves(1)
            .build();
        let dist = resolve_attack(&attack, &defense)?;
        assert_almost_eq!(dist.probability(0), 5.0 / 6.0, 1e-12);
        assert_almost_eq!(dist.probability(4), 1.0 / 6.0, 1e-12);

        let defense = DefenseProfileBuilder::new()
            .save(6)
            .cover_critical_saves(1)
            .build();
        let dist = resolve_attack(&attack, &defense)?;
        assert_almost_eq!(dist.probability(0), 1.0, 1e-12);
        assert_eq!(dist.max_damage(), Some(0));
        Ok(())
    }

    #[test]
    fn test_durable() -> anyhow::Result<()> {
        let attack = pierce_all(AttackProfileBuilder::new().num_dice(2).success_threshold(6));
        let defense = DefenseProfileBuilder::new()
            .save(6)
            .ability(Ability::Durable)
            .build();
        let dist = resolve_attack(&attack, &defense)?;
        assert_almost_eq!(dist.probability(3), 10.0 / 36.0, 1e-12);
        assert_almost_eq!(dist.probability(7), 1.0 / 36.0, 1e-12);
        Ok(())
    }

    #[test]
    fn test_hardy() -> anyhow::Result<()> {
        // a 2+ save, but criticals are only saved on a 6
        let attack = AttackProfileBuilder::new()
            .num_dice(1)
            .success_threshold(2)
            .build();
        let defense = DefenseProfileBuilder::new().save(2).hardy(6).build();
        let dist = resolve_attack(&attack, &defense)?;
        assert_almost_eq!(dist.probability(3), 4.0 / 6.0 * 1.0 / 6.0, 1e-12);
        assert_almost_eq!(dist.probability(4), 1.0 / 6.0 * 5.0 / 6.0, 1e-12);
        Ok(())
    }

    #[test]
    fn test_just_a_scratch_cancels_a_critical_first() -> anyhow::Result<()> {
        let attack = pierce_all(AttackProfileBuilder::new().num_dice(2).success_threshold(6));
        let defense = DefenseProfileBuilder::new()
            .save(6)
            .ability(Ability::JustAScratch)
            .build();
        let dist = resolve_attack(&attack, &defense)?;
        // one critical is cancelled, so two criticals deal the damage of one
        assert_almost_eq!(dist.probability(4), 1.0 / 36.0, 1e-12);
        assert_almost_eq!(dist.probability(8), 0.0, 1e-12);
        assert_almost_eq!(dist.probability(0), 35.0 / 36.0, 1e-12);

        let attack = pierce_all(
            AttackProfileBuilder::new()
                .num_dice(0)
                .auto_normals(2),
        );
        let dist = resolve_attack(&attack, &defense)?;
        assert_eq!(dist, DamageDistribution::certain(3));
        Ok(())
    }

    #[test]
    fn test_long_damage_tail_with_feel_no_pain() -> anyhow::Result<()> {
        // up to 9 * (10 + 1 + 9) = 180 damage
        let attack = AttackProfileBuilder::new()
            .num_dice(9)
            .success_threshold(2)
            .damage(9, 10)
            .devastating(9)
            .lethal(2)
            .ability(Ability::Rending)
            .build();
        let plain = resolve_attack(&attack, &DefenseProfileBuilder::new().save(3).build())?;
        assert_eq!(plain.max_damage(), Some(180));

        let defense = DefenseProfileBuilder::new().save(3).feel_no_pain(5).build();
        let dist = resolve_attack(&attack, &defense)?;
        assert_almost_eq!(dist.total_mass(), 1.0, 1e-9);
        // each point survives Feel No Pain 5+ with chance 2/3
        assert_almost_eq!(dist.expected_value(), plain.expected_value() * 2.0 / 3.0, 1e-9);
        Ok(())
    }

    #[test]
    fn test_rejects_oversized_profiles() {
        let attack = AttackProfileBuilder::new().num_dice(0).auto_normals(u32::MAX).build();
        assert!(resolve_attack(&attack, &DefenseProfile::default()).is_err());
        let attack = AttackProfileBuilder::new()
            .num_dice(2)
            .damage(u32::MAX / 2 + 1, 1)
            .build();
        assert!(resolve_attack(&attack, &DefenseProfile::default()).is_err());
    }

    #[test]
    fn test_obscured_target_improves_save() -> anyhow::Result<()> {
        let attack = AttackProfileBuilder::new().num_dice(3).build();
        let obscured = DefenseProfileBuilder::new()
            .save(4)
            .ability(Ability::ObscuredTarget)
            .build();
        let better_save = DefenseProfileBuilder::new().save(3).build();
        assert_same(
            &resolve_attack(&attack, &obscured)?,
            &resolve_attack(&attack, &better_save)?,
        );
        Ok(())
    }

    #[test]
    fn test_feel_no_pain() -> anyhow::Result<()> {
        let attack = pierce_all(
            AttackProfileBuilder::new()
                .num_dice(0)
                .auto_normals(1)
                .damage(2, 2),
        );
        let defense = DefenseProfileBuilder::new().save(6).feel_no_pain(4).build();
        let dist = resolve_attack(&attack, &defense)?;
        assert_almost_eq!(dist.probability(0), 0.25, 1e-12);
        assert_almost_eq!(dist.probability(1), 0.5, 1e-12);
        assert_almost_eq!(dist.probability(2), 0.25, 1e-12);
        Ok(())
    }

    #[test]
    fn test_rejects_invalid_profiles() {
        let attack = AttackProfileBuilder::new().success_threshold(1).build();
        assert!(resolve_attack(&attack, &DefenseProfile::default()).is_err());
        let defense = DefenseProfileBuilder::new().save(0).build();
        assert!(resolve_attack(&AttackProfile::default(), &defense).is_err());
    }

    /// Plays one attack out die by die with the same rules the exact engine
    /// uses, for cross-checking.
    fn simulate(attack: &AttackProfile, defense: &DefenseProfile, rng: &mut StdRng) -> u32 {
        let roll = |rng: &mut StdRng| {
            let face = rng.random_range(1..=DIE_SIZE);
            classify_face(face, attack.success_threshold, attack.lethal_threshold)
        };
        let mut counts = PoolCounts::default();
        let mut unrerolled_fails = 0;
        for _ in 0..attack.num_dice {
            let mut outcome = roll(rng);
            if outcome == DieOutcome::Fail && attack.reroll.rerolls_every_fail() {
                outcome = roll(rng);
            } else if outcome == DieOutcome::Fail {
                unrerolled_fails += 1;
            }
            match outcome {
                DieOutcome::Fail => counts.fails += 1,
                DieOutcome::Normal => counts.normals += 1,
                DieOutcome::Critical => counts.criticals += 1,
            }
        }
        if attack.reroll.rerolls_single_fail(unrerolled_fails) {
            counts.fails -= 1;
            match roll(rng) {
                DieOutcome::Fail => counts.fails += 1,
                DieOutcome::Normal => counts.normals += 1,
                DieOutcome::Critical => counts.criticals += 1,
            }
        }
        let counts = counts
            .add_successes(attack.auto_normals, attack.auto_criticals)
            .fails_to_normals(attack.fails_to_normals)
            .normals_to_criticals(attack.normals_to_criticals);
        let counts = apply_conditional_shifts(counts, attack.effective_abilities());

        let rule = DamageRule::new(attack, defense);
        let (normals, criticals) = apply_cover_saves(counts, defense);
        let unsaved_n = (0..normals)
            .filter(|_| rng.random::<f64>() >= rule.p_save_normal)
            .count() as u32;
        let unsaved_c = (0..criticals)
            .filter(|_| rng.random::<f64>() >= rule.p_save_critical)
            .count() as u32;
        rule.damage(unsaved_n, unsaved_c, counts.criticals)
    }

    #[test]
    fn test_matches_sampled_attacks() -> anyhow::Result<()> {
        let attack = AttackProfileBuilder::new()
            .num_dice(5)
            .success_threshold(4)
            .damage(3, 5)
            .lethal(5)
            .devastating(1)
            .piercing(1)
            .reroll(RerollStrategy::Balanced)
            .ability(Ability::Punishing)
            .ability(Ability::FailToNormalIfAtLeastTwoSuccesses)
            .build();
        let defense = DefenseProfileBuilder::new()
            .save(3)
            .cover_normal_saves(1)
            .ability(Ability::Durable)
            .build();
        let exact = resolve_attack(&attack, &defense)?;

        let mut rng = StdRng::seed_from_u64(42);
        let samples = 200_000;
        let mut histogram: BTreeMap<u32, u32> = BTreeMap::new();
        for _ in 0..samples {
            *histogram.entry(simulate(&attack, &defense, &mut rng)).or_insert(0) += 1;
        }
        let sampled = DamageDistribution::from_masses(
            histogram
                .into_iter()
                .map(|(damage, n)| (damage, n as f64 / samples as f64)),
        );

        assert_almost_eq!(sampled.expected_value(), exact.expected_value(), 0.05);
        for wounds in 1..=10 {
            assert_almost_eq!(
                sampled.kill_probability(wounds)?,
                exact.kill_probability(wounds)?,
                0.01
            );
        }
        Ok(())
    }
}
