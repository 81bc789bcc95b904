//! Compact colon-separated notation for sharing profiles.
//!
//! Attacker: `dice:hit:normal:crit:devastating:piercing:piercingcrits:reroll:lethal:autonormals:abilities`,
//! e.g. `4:3:3:4:0:0:0:None:0:0:rendsev`. A lethal of 0 means no Lethal.
//!
//! Defender: `save:wounds:coversaves:abilities`, e.g. `3:12:0:ind`.
//!
//! Ability codes are listed once in `ATTACKER_CODES` and `DEFENDER_CODES` and
//! drive both parsing and printing.
//!
//! The notation only carries the fields listed above; everything else takes
//! its default value.

use std::{fmt, str::FromStr};

use nom::{
    IResult, Parser,
    character::complete::{alpha1, char, digit1},
    combinator::{all_consuming, map_opt, map_res, opt},
    error::{Error, ErrorKind},
    multi::many0,
    sequence::preceded,
};

use crate::{
    error::CalcError,
    rules::{
        ability::{Ability, AbilitySet, RerollStrategy},
        attack::AttackProfile,
        defense::DefenseProfile,
        dice::DIE_SIZE,
    },
};

const ATTACKER_CODES: &[(Ability, &str)] = &[
    (Ability::Rending, "rend"),
    (Ability::Severe, "sev"),
    (Ability::Punishing, "pun"),
];

const DEFENDER_CODES: &[(Ability, &str)] = &[
    (Ability::Indomitus, "ind"),
    (Ability::ObscuredTarget, "obs"),
    (Ability::Durable, "dur"),
    (Ability::JustAScratch, "jas"),
];

pub fn parse_attacker(input: &str) -> Result<AttackProfile, CalcError> {
    let profile = match all_consuming(attacker).parse(input) {
        Ok((_, profile)) => profile,
        Err(_) => return Err(CalcError::Notation(format!("bad attacker `{input}`"))),
    };
    profile.validate()?;
    Ok(profile)
}

pub fn parse_defender(input: &str) -> Result<DefenseProfile, CalcError> {
    let profile = match all_consuming(defender).parse(input) {
        Ok((_, profile)) => profile,
        Err(_) => return Err(CalcError::Notation(format!("bad defender `{input}`"))),
    };
    profile.validate()?;
    Ok(profile)
}

fn number<T: FromStr>(input: &str) -> IResult<&str, T> {
    map_res(digit1, |s: &str| s.parse::<T>()).parse(input)
}

fn sep(input: &str) -> IResult<&str, char> {
    char(':').parse(input)
}

fn reroll_strategy(input: &str) -> IResult<&str, RerollStrategy> {
    map_opt(alpha1, RerollStrategy::from_name).parse(input)
}

fn ability_code<'a>(input: &'a str, codes: &[(Ability, &str)]) -> IResult<&'a str, Ability> {
    for (ability, code) in codes {
        if let Some(rest) = input.strip_prefix(*code) {
            return Ok((rest, *ability));
        }
    }
    Err(nom::Err::Error(Error::new(input, ErrorKind::Tag)))
}

fn ability_set<'a>(input: &'a str, codes: &[(Ability, &str)]) -> IResult<&'a str, AbilitySet> {
    let (input, abilities) = many0(|i: &'a str| ability_code(i, codes)).parse(input)?;
    Ok((input, abilities.into_iter().collect()))
}

fn attacker_abilities(input: &str) -> IResult<&str, AbilitySet> {
    ability_set(input, ATTACKER_CODES)
}

fn defender_abilities(input: &str) -> IResult<&str, AbilitySet> {
    ability_set(input, DEFENDER_CODES)
}

fn attacker(input: &str) -> IResult<&str, AttackProfile> {
    let (input, (num_dice, success_threshold, normal_damage, critical_damage)) = (
        number::<u32>,
        preceded(sep, number::<u8>),
        preceded(sep, number::<u32>),
        preceded(sep, number::<u32>),
    )
        .parse(input)?;
    let (input, (devastating_x, piercing_x, piercing_crits_x, reroll, lethal, auto_normals, abilities)) = (
        preceded(sep, number::<u32>),
        preceded(sep, number::<u8>),
        preceded(sep, number::<u8>),
        preceded(sep, reroll_strategy),
        preceded(sep, number::<u8>),
        preceded(sep, number::<u32>),
        opt(preceded(sep, attacker_abilities)),
    )
        .parse(input)?;

    Ok((
        input,
        AttackProfile {
            num_dice,
            success_threshold,
            normal_damage,
            critical_damage,
            devastating_x,
            piercing_x,
            piercing_crits_x,
            reroll,
            lethal_threshold: if lethal == 0 { DIE_SIZE } else { lethal },
            auto_normals,
            abilities: abilities.unwrap_or_default(),
            ..AttackProfile::default()
        },
    ))
}

fn defender(input: &str) -> IResult<&str, DefenseProfile> {
    let (input, (save_threshold, wounds, cover_normal_saves, abilities)) = (
        number::<u8>,
        preceded(sep, number::<u32>),
        preceded(sep, number::<u32>),
        opt(preceded(sep, defender_abilities)),
    )
        .parse(input)?;

    Ok((
        input,
        DefenseProfile {
            save_threshold,
            wounds,
            cover_normal_saves,
            abilities: abilities.unwrap_or_default(),
            ..DefenseProfile::default()
        },
    ))
}

fn write_codes(f: &mut fmt::Formatter<'_>, set: AbilitySet, codes: &[(Ability, &str)]) -> fmt::Result {
    for (ability, code) in codes {
        if set.has(*ability) {
            write!(f, "{code}")?;
        }
    }
    Ok(())
}

impl fmt::Display for AttackProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lethal = if self.lethal_threshold == DIE_SIZE {
            0
        } else {
            self.lethal_threshold
        };
        write!(
            f,
            "{}:{}:{}:{}:{}:{}:{}:{}:{}:{}:",
            self.num_dice,
            self.success_threshold,
            self.normal_damage,
            self.critical_damage,
            self.devastating_x,
            self.piercing_x,
            self.piercing_crits_x,
            self.reroll.name(),
            lethal,
            self.auto_normals,
        )?;
        write_codes(f, self.abilities, ATTACKER_CODES)
    }
}

impl fmt::Display for DefenseProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:",
            self.save_threshold, self.wounds, self.cover_normal_saves
        )?;
        write_codes(f, self.abilities, DEFENDER_CODES)
    }
}

impl FromStr for AttackProfile {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_attacker(s)
    }
}

impl FromStr for DefenseProfile {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_defender(s)
    }
}
