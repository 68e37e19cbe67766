use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Trailing range of daily bars requested from a provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Window {
    #[serde(rename = "6mo")]
    SixMonths,
    #[default]
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
}

impl Window {
    pub const ALL: [Self; 3] = [Self::SixMonths, Self::OneYear, Self::TwoYears];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SixMonths => "6mo",
            Self::OneYear => "1y",
            Self::TwoYears => "2y",
        }
    }

    /// Calendar days covered by the window.
    pub const fn days(self) -> i64 {
        match self {
            Self::SixMonths => 183,
            Self::OneYear => 365,
            Self::TwoYears => 730,
        }
    }
}

impl Display for Window {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Window {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "6mo" | "6m" => Ok(Self::SixMonths),
            "1y" => Ok(Self::OneYear),
            "2y" => Ok(Self::TwoYears),
            other => Err(ValidationError::InvalidWindow {
                value: other.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_window() {
        let window = Window::from_str("1Y").expect("must parse");
        assert_eq!(window, Window::OneYear);
        assert_eq!(Window::default(), Window::OneYear);
    }

    #[test]
    fn rejects_invalid_window() {
        let err = Window::from_str("5y").expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidWindow { .. }));
    }
}
