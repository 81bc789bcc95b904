use thiserror::Error;

/// Errors produced by the calculator.
///
/// `InvalidConfiguration` and `Notation` are caller mistakes and are raised at
/// the boundary of the public operations. `NumericalDrift` means probability
/// mass was lost or created somewhere inside the engine and always indicates a
/// bug.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalcError {
    #[error("invalid {field}: {value} (expected {expected})")]
    InvalidConfiguration {
        field: &'static str,
        value: u32,
        expected: &'static str,
    },
    #[error("probability mass drifted away from 1 (total = {total})")]
    NumericalDrift { total: f64 },
    #[error("damage distribution is empty")]
    EmptyDistribution,
    #[error("failed to parse profile notation: {0}")]
    Notation(String),
}

impl CalcError {
    pub(crate) fn invalid(field: &'static str, value: impl Into<u32>, expected: &'static str) -> Self {
        CalcError::InvalidConfiguration {
            field,
            value: value.into(),
            expected,
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, CalcError::NumericalDrift { .. })
    }
}

pub type Result<T, E = CalcError> = std::result::Result<T, E>;

/// Tolerance used when checking that a distribution carries unit mass.
pub const MASS_TOLERANCE: f64 = 1e-9;

pub(crate) fn check_unit_mass(total: f64) -> Result<()> {
    if !total.is_finite() || (total - 1.0).abs() > MASS_TOLERANCE {
        log::error!("probability mass check failed: total = {total}");
        return Err(CalcError::NumericalDrift { total });
    }
    Ok(())
}
