//! Coordination modes

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Policy applied to a new call when calls with the same key are in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Reject the new call while another one is pending
    Prevent,
    /// Cancel every pending call and admit the new one
    Abort,
    /// Admit the new call unconditionally
    Force,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Prevent => write!(f, "prevent"),
            Self::Abort => write!(f, "abort"),
            Self::Force => write!(f, "force"),
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "prevent" => Ok(Self::Prevent),
            "abort" => Ok(Self::Abort),
            "force" => Ok(Self::Force),
            _ => Err(ConfigError::InvalidMode(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_display() {
        assert_eq!(Mode::Prevent.to_string(), "prevent");
        assert_eq!(Mode::Abort.to_string(), "abort");
        assert_eq!(Mode::Force.to_string(), "force");
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("prevent".parse::<Mode>().unwrap(), Mode::Prevent);
        assert_eq!("ABORT".parse::<Mode>().unwrap(), Mode::Abort);
        assert_eq!("Force".parse::<Mode>().unwrap(), Mode::Force);
    }

    #[test]
    fn test_mode_parse_invalid() {
        assert_eq!(
            "retry".parse::<Mode>().unwrap_err(),
            ConfigError::InvalidMode("retry".to_string())
        );
        assert!("".parse::<Mode>().is_err());
    }
}
