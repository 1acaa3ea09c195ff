//! Runtime configuration for default synthesis and flushing

use serde::{Deserialize, Serialize};

/// Environment variable that switches default arrays to the testing shape
pub const USE_TESTING_SHAPE_ENV: &str = "DATAMODELS_USE_TESTING_SHAPE";

/// Environment variable overriding the production default shape (`8,4096,4096`)
pub const DEFAULT_SHAPE_ENV: &str = "DATAMODELS_DEFAULT_SHAPE";

/// Largest rank accepted for a configured base shape
const MAX_SHAPE_RANK: usize = 8;

/// Configuration consulted by default array synthesis and by `DataModel::save`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Production base shape; `None` disables shape defaults entirely
    pub default_shape: Option<Vec<usize>>,

    /// Small base shape used when `use_testing_shape` is set
    pub testing_shape: Vec<usize>,

    /// Select `testing_shape` instead of `default_shape`
    pub use_testing_shape: bool,

    /// Emit a warning for every field a save has to fill with a default
    pub flush_warn: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_shape: Some(vec![8, 4096, 4096]),
            testing_shape: vec![2, 8, 8],
            use_testing_shape: false,
            flush_warn: false,
        }
    }
}

impl RuntimeConfig {
    /// Configuration using the testing shape
    pub fn testing() -> Self {
        Self {
            use_testing_shape: true,
            ..Self::default()
        }
    }

    /// Defaults overlaid with `DATAMODELS_USE_TESTING_SHAPE` and `DATAMODELS_DEFAULT_SHAPE`
    pub fn from_env() -> Result<Self, String> {
        let mut config = Self::default();

        if let Ok(flag) = std::env::var(USE_TESTING_SHAPE_ENV) {
            config.use_testing_shape = parse_flag(&flag)
                .ok_or_else(|| format!("{} must be a boolean, got '{}'", USE_TESTING_SHAPE_ENV, flag))?;
        }

        if let Ok(shape) = std::env::var(DEFAULT_SHAPE_ENV) {
            config.default_shape = Some(parse_shape(&shape)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Base shape selected by the testing flag
    pub fn active_shape(&self) -> Option<&[usize]> {
        if self.use_testing_shape {
            Some(&self.testing_shape)
        } else {
            self.default_shape.as_deref()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if let Some(shape) = &self.default_shape {
            validate_shape("default_shape", shape)?;
        }

        validate_shape("testing_shape", &self.testing_shape)?;

        Ok(())
    }
}

fn validate_shape(name: &str, shape: &[usize]) -> Result<(), String> {
    if shape.is_empty() {
        return Err(format!("{} cannot be empty", name));
    }

    if shape.len() > MAX_SHAPE_RANK {
        return Err(format!(
            "{} cannot have more than {} dimensions",
            name, MAX_SHAPE_RANK
        ));
    }

    if shape.contains(&0) {
        return Err(format!("{} dimensions must be greater than 0", name));
    }

    Ok(())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Parse a comma-separated shape such as `8,4096,4096`
pub fn parse_shape(value: &str) -> Result<Vec<usize>, String> {
    value
        .split(',')
        .map(|dim| {
            dim.trim()
                .parse::<usize>()
                .map_err(|_| format!("invalid dimension '{}' in shape '{}'", dim.trim(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RuntimeConfig::default();
        assert_eq!(config.default_shape, Some(vec![8, 4096, 4096]));
        assert_eq!(config.testing_shape, vec![2, 8, 8]);
        assert!(!config.use_testing_shape);
        assert_eq!(config.active_shape(), Some(&[8, 4096, 4096][..]));
    }

    #[test]
    fn test_testing_shape_selection() {
        let config = RuntimeConfig::testing();
        assert_eq!(config.active_shape(), Some(&[2, 8, 8][..]));

        let config = RuntimeConfig {
            default_shape: None,
            ..RuntimeConfig::default()
        };
        assert_eq!(config.active_shape(), None);
    }

    #[test]
    fn test_config_validation() {
        let mut config = RuntimeConfig::default();

        // Valid config
        assert!(config.validate().is_ok());

        // Invalid: zero dimension
        config.default_shape = Some(vec![8, 0, 4096]);
        assert!(config.validate().is_err());

        // Invalid: empty testing shape
        config.default_shape = None;
        config.testing_shape = Vec::new();
        assert!(config.validate().is_err());

        // Invalid: rank too large
        config.testing_shape = vec![1; 9];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_shape_and_flag() {
        assert_eq!(parse_shape("8, 4096,4096").unwrap(), vec![8, 4096, 4096]);
        assert!(parse_shape("8,x").is_err());
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
