pub mod cache;
pub mod comparison;
pub mod distribution;
pub mod pmf;
pub mod pool;
pub mod resolution;
