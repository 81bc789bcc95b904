use serde::{Deserialize, Serialize};

/// Extra damage per unsaved critical success granted by Rending.
pub const RENDING_BONUS_DAMAGE: u32 = 1;
/// Extra damage per unsaved normal success granted by Punishing.
pub const PUNISHING_BONUS_DAMAGE: u32 = 1;
/// Damage removed from the first unsaved critical success by Durable.
pub const DURABLE_REDUCTION: u32 = 1;
/// Save improvement granted by each save-modifying defender ability.
pub const SAVE_IMPROVEMENT: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Side {
    Attacker,
    Defender,
}

/// What part of the resolution pipeline an ability touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectTag {
    /// Adds damage to unsaved successes of one category.
    BonusDamage,
    /// Moves successes or fails between categories at the pool level.
    CountShift,
    /// Changes the threshold the defender needs on a save roll.
    SaveModifier,
    /// Lowers the damage tally after saves.
    DamageReduction,
    /// Caps how easily critical successes are saved.
    CriticalSaveLimit,
    /// Cancels a success before any save is rolled.
    SuccessCancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Ability {
    Rending,
    Severe,
    Punishing,
    PuritySeal,
    FailToNormalIfAtLeastTwoSuccesses,
    ObscuredTarget,
    Indomitus,
    Durable,
    Hardy,
    JustAScratch,
}

impl Ability {
    pub fn all() -> Vec<Ability> {
        vec![
            Ability::Rending,
            Ability::Severe,
            Ability::Punishing,
            Ability::PuritySeal,
            Ability::FailToNormalIfAtLeastTwoSuccesses,
            Ability::ObscuredTarget,
            Ability::Indomitus,
            Ability::Durable,
            Ability::Hardy,
            Ability::JustAScratch,
        ]
    }

    pub fn side(&self) -> Side {
        match self {
            Ability::Rending
            | Ability::Severe
            | Ability::Punishing
            | Ability::PuritySeal
            | Ability::FailToNormalIfAtLeastTwoSuccesses => Side::Attacker,
            Ability::ObscuredTarget
            | Ability::Indomitus
            | Ability::Durable
            | Ability::Hardy
            | Ability::JustAScratch => Side::Defender,
        }
    }

    pub fn effect(&self) -> EffectTag {
        match self {
            Ability::Rending | Ability::Punishing => EffectTag::BonusDamage,
            Ability::Severe | Ability::PuritySeal | Ability::FailToNormalIfAtLeastTwoSuccesses => {
                EffectTag::CountShift
            }
            Ability::ObscuredTarget | Ability::Indomitus => EffectTag::SaveModifier,
            Ability::Durable => EffectTag::DamageReduction,
            Ability::Hardy => EffectTag::CriticalSaveLimit,
            Ability::JustAScratch => EffectTag::SuccessCancel,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Ability::Rending => "Rending",
            Ability::Severe => "Severe",
            Ability::Punishing => "Punishing",
            Ability::PuritySeal => "Purity Seal",
            Ability::FailToNormalIfAtLeastTwoSuccesses => "Close Assault",
            Ability::ObscuredTarget => "Obscured Target",
            Ability::Indomitus => "Indomitus",
            Ability::Durable => "Durable",
            Ability::Hardy => "Hardy",
            Ability::JustAScratch => "Just a Scratch",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Ability::Rending => "Each unsaved critical success deals 1 extra damage.",
            Ability::Severe => {
                "If no critical successes are retained, one normal success becomes critical. \
                 Rending and Punishing have no effect."
            }
            Ability::Punishing => "Each unsaved normal success deals 1 extra damage.",
            Ability::PuritySeal => "With two or more fails, one fail is retained as a normal success.",
            Ability::FailToNormalIfAtLeastTwoSuccesses => {
                "With two or more successes, one fail is retained as a normal success."
            }
            Ability::ObscuredTarget => "The defender's save improves by 1.",
            Ability::Indomitus => "The defender's save improves by 1.",
            Ability::Durable => "The first unsaved critical success deals 1 less damage.",
            Ability::Hardy => "Critical successes can only be saved on a roll of X or more.",
            Ability::JustAScratch => {
                "One success is cancelled before saves, a critical one if there is any."
            }
        }
    }

    fn bit(self) -> u16 {
        1 << self as u8
    }
}

/// Abilities whose effect is switched off by another ability in the same set.
/// Each entry reads `(suppressor, suppressed)`.
pub const SUPPRESSIONS: &[(Ability, Ability)] = &[
    (Ability::Severe, Ability::Rending),
    (Ability::Severe, Ability::Punishing),
];

/// A set of abilities stored as a bitset over [`Ability`].
///
/// Serializes as a list of ability names.
#[derive(Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Ability>", into = "Vec<Ability>")]
pub struct AbilitySet {
    bits: u16,
}

impl AbilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, ability: Ability) -> Self {
        self.insert(ability);
        self
    }

    pub fn insert(&mut self, ability: Ability) {
        self.bits |= ability.bit();
    }

    pub fn remove(&mut self, ability: Ability) {
        self.bits &= !ability.bit();
    }

    /// Adds the ability when absent, removes it when present.
    pub fn toggle(&mut self, ability: Ability) {
        self.bits ^= ability.bit();
    }

    pub fn has(&self, ability: Ability) -> bool {
        self.bits & ability.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = Ability> + use<> {
        let set = *self;
        Ability::all().into_iter().filter(move |a| set.has(*a))
    }

    /// The abilities that actually take effect once the suppression table has
    /// been applied.
    pub fn effective(&self) -> AbilitySet {
        let mut effective = *self;
        for (suppressor, suppressed) in SUPPRESSIONS {
            if self.has(*suppressor) {
                effective.remove(*suppressed);
            }
        }
        effective
    }
}

impl std::fmt::Debug for AbilitySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<Ability> for AbilitySet {
    fn from_iter<I: IntoIterator<Item = Ability>>(iter: I) -> Self {
        let mut set = AbilitySet::new();
        for ability in iter {
            set.insert(ability);
        }
        set
    }
}

impl From<Vec<Ability>> for AbilitySet {
    fn from(value: Vec<Ability>) -> Self {
        value.into_iter().collect()
    }
}

impl From<AbilitySet> for Vec<Ability> {
    fn from(value: AbilitySet) -> Self {
        value.iter().collect()
    }
}

/// Which attack dice get rerolled. Only fails are ever rerolled, and a die is
/// rerolled at most once.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RerollStrategy {
    #[default]
    None,
    /// Reroll a single fail from the pool.
    Balanced,
    /// Reroll every fail once.
    Ceaseless,
    /// Ceaseless first, then Balanced on a fail Ceaseless did not reroll.
    CeaselessThenBalanced,
}

impl RerollStrategy {
    pub fn all() -> Vec<RerollStrategy> {
        vec![
            RerollStrategy::None,
            RerollStrategy::Balanced,
            RerollStrategy::Ceaseless,
            RerollStrategy::CeaselessThenBalanced,
        ]
    }

    /// Every fail is rerolled, so the reroll folds into the single-die
    /// distribution.
    pub fn rerolls_every_fail(&self) -> bool {
        matches!(
            self,
            RerollStrategy::Ceaseless | RerollStrategy::CeaselessThenBalanced
        )
    }

    /// Whether a single Balanced reroll is available for `unrerolled_fails`
    /// fails that have not been rerolled yet.
    pub fn rerolls_single_fail(&self, unrerolled_fails: u32) -> bool {
        matches!(
            self,
            RerollStrategy::Balanced | RerollStrategy::CeaselessThenBalanced
        ) && unrerolled_fails > 0
    }

    pub fn name(&self) -> &'static str {
        match self {
            RerollStrategy::None => "None",
            RerollStrategy::Balanced => "Balanced",
            RerollStrategy::Ceaseless => "Ceaseless",
            RerollStrategy::CeaselessThenBalanced => "CeaselessPlusBalanced",
        }
    }

    pub fn from_name(name: &str) -> Option<RerollStrategy> {
        RerollStrategy::all().into_iter().find(|r| r.name() == name)
    }
}
