//! Error types for boundary validation.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResonodeError {
    /// A numeric input is non-finite or outside its domain.
    #[error("invalid parameter `{name}` = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, ResonodeError>;

impl ResonodeError {
    pub fn invalid(name: &'static str, value: f64, reason: &'static str) -> Self {
        Self::InvalidParameter {
            name,
            value,
            reason,
        }
    }
}

pub(crate) fn require_finite(name: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ResonodeError::invalid(name, value, "must be finite"))
    }
}

pub(crate) fn require_positive(name: &'static str, value: f64) -> Result<f64> {
    require_finite(name, value)?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err(ResonodeError::invalid(name, value, "must be greater than zero"))
    }
}

pub(crate) fn require_non_negative(name: &'static str, value: f64) -> Result<f64> {
    require_finite(name, value)?;
    if value >= 0.0 {
        Ok(value)
    } else {
        Err(ResonodeError::invalid(name, value, "must not be negative"))
    }
}
