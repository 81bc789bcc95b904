pub mod error;
pub mod notation;
pub mod rules;
pub mod statistics;

pub mod prelude {
    pub use crate::{
        error::{CalcError, Result},
        rules::{
            ability::{Ability, AbilitySet, EffectTag, RerollStrategy, Side},
            attack::{AttackProfile, AttackProfileBuilder, MAX_DAMAGE, MAX_DICE},
            defense::{DefenseProfile, DefenseProfileBuilder},
            dice::{DieOutcome, OutcomeDistribution, single_die_distribution},
        },
        statistics::{
            cache::ResolutionCache,
            comparison::{
                DEFAULT_MAX_WOUNDS, SAVE_RANGE, Scenario, ScenarioComparison, Verdict, sweep_saves,
            },
            distribution::{DamageDistribution, combine, expected_value, kill_probability},
            resolution::resolve_attack,
        },
    };
}
