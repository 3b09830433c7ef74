//! Rule severity levels.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How loudly a fired rule should be presented.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    utoipa::ToSchema,
)]
pub enum Severity {
    Info,
    #[default]
    Warning,
    Error,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Info, Severity::Warning, Severity::Error];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "Info" => Ok(Severity::Info),
            "Warning" => Ok(Severity::Warning),
            "Error" => Ok(Severity::Error),
            other => Err(format!("unknown severity: '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_levels() {
        for level in Severity::ALL {
            assert_eq!(level.as_str().parse::<Severity>().unwrap(), level);
        }
    }

    #[test]
    fn parse_rejects_unknown() {
        let err = "Critical".parse::<Severity>().unwrap_err();
        assert!(err.contains("Critical"));
    }

    #[test]
    fn default_is_warning() {
        assert_eq!(Severity::default(), Severity::Warning);
    }
}
