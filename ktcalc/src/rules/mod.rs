pub mod ability;
pub mod attack;
pub mod defense;
pub mod dice;
