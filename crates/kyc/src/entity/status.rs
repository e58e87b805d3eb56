use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle marker shared by every table. Rows are never deleted; they move to
/// a terminal status instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Unspecified,
    Active,
    Validated,
    Canceled,
    Terminated,
}

impl Status {
    pub const TERMINAL: [Status; 2] = [Status::Canceled, Status::Terminated];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unspecified => "unspecified",
            Self::Active => "active",
            Self::Validated => "validated",
            Self::Canceled => "canceled",
            Self::Terminated => "terminated",
        }
    }

    pub fn is_terminal(self) -> bool {
        Self::TERMINAL.contains(&self)
    }

    /// Text values of the terminal statuses, ready to bind.
    pub fn terminal_values() -> Vec<&'static str> {
        Self::TERMINAL.iter().map(|s| s.as_str()).collect()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unspecified" => Ok(Self::Unspecified),
            "active" => Ok(Self::Active),
            "validated" => Ok(Self::Validated),
            "canceled" => Ok(Self::Canceled),
            "terminated" => Ok(Self::Terminated),
            other => Err(format!("unknown status '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_round_trip() {
        for status in [
            Status::Unspecified,
            Status::Active,
            Status::Validated,
            Status::Canceled,
            Status::Terminated,
        ] {
            assert_eq!(status.as_str().parse::<Status>().unwrap(), status);
        }
        assert!("deleted".parse::<Status>().is_err());
    }

    #[test]
    fn terminal_statuses() {
        assert!(Status::Canceled.is_terminal());
        assert!(Status::Terminated.is_terminal());
        assert!(!Status::Validated.is_terminal());
        assert_eq!(Status::terminal_values(), vec!["canceled", "terminated"]);
    }
}
