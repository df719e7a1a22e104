use crate::{ConfigError, ConfigResult};

/// Trait for configuration validation
pub trait ConfigValidator {
    fn validate(&self) -> ConfigResult<()>;
}

/// General validation utilities
pub struct ValidationUtils;

impl ValidationUtils {
    /// Validate that a string is not empty
    pub fn validate_not_empty(value: &str, field_name: &str) -> ConfigResult<()> {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "{field_name} cannot be empty"
            )));
        }
        Ok(())
    }

    /// Validate that an interval in seconds is within (0, max]
    pub fn validate_seconds(value: u64, field_name: &str, max: u64) -> ConfigResult<()> {
        if value == 0 {
            return Err(ConfigError::Validation(format!(
                "{field_name} must be greater than 0"
            )));
        }
        if value > max {
            return Err(ConfigError::Validation(format!(
                "{field_name} must be less than or equal to {max}"
            )));
        }
        Ok(())
    }

    /// Validate that a count is reasonable
    pub fn validate_count(count: usize, field_name: &str, max: usize) -> ConfigResult<()> {
        if count == 0 {
            return Err(ConfigError::Validation(format!(
                "{field_name} must be greater than 0"
            )));
        }
        if count > max {
            return Err(ConfigError::Validation(format!(
                "{field_name} must be less than or equal to {max}"
            )));
        }
        Ok(())
    }

    /// Validate that a float lies in the closed range [min, max]
    pub fn validate_range(value: f64, field_name: &str, min: f64, max: f64) -> ConfigResult<()> {
        if !value.is_finite() || value < min || value > max {
            return Err(ConfigError::Validation(format!(
                "{field_name} must be between {min} and {max}, got {value}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_not_empty() {
        assert!(ValidationUtils::validate_not_empty("x", "field").is_ok());
        assert!(ValidationUtils::validate_not_empty("  ", "field").is_err());
    }

    #[test]
    fn test_validate_seconds() {
        assert!(ValidationUtils::validate_seconds(5, "interval", 3600).is_ok());
        assert!(ValidationUtils::validate_seconds(0, "interval", 3600).is_err());
        assert!(ValidationUtils::validate_seconds(3601, "interval", 3600).is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(ValidationUtils::validate_range(0.5, "jitter", 0.0, 1.0).is_ok());
        assert!(ValidationUtils::validate_range(1.5, "jitter", 0.0, 1.0).is_err());
        assert!(ValidationUtils::validate_range(f64::NAN, "jitter", 0.0, 1.0).is_err());
    }
}
