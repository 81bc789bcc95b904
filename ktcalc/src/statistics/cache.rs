use rustc_hash::FxHashMap;

use crate::{
    error::Result,
    rules::{attack::AttackProfile, defense::DefenseProfile},
    statistics::{distribution::DamageDistribution, resolution::resolve_attack},
};

/// Memoizes [`resolve_attack`] on profile equality. Resolution is a pure
/// function of its two profiles, so a hit is always safe to reuse.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: FxHashMap<(AttackProfile, DefenseProfile), DamageDistribution>,
    hits: usize,
    misses: usize,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&mut self, attack: &AttackProfile, defense: &DefenseProfile) -> Result<DamageDistribution> {
        let key = (*attack, *defense);
        if let Some(hit) = self.entries.get(&key) {
            self.hits += 1;
            log::debug!("resolution cache hit ({} hits so far)", self.hits);
            return Ok(hit.clone());
        }
        let resolved = resolve_attack(attack, defense)?;
        self.misses += 1;
        self.entries.insert(key, resolved.clone());
        Ok(resolved)
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
