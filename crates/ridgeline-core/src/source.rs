use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Upstream price providers known to the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    /// Global vendor covering US listings and suffixed KRX listings.
    Yahoo,
    /// Korean exchange vendor keyed by bare six-digit codes.
    Naver,
}

impl ProviderId {
    pub const ALL: [Self; 2] = [Self::Yahoo, Self::Naver];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Yahoo => "yahoo",
            Self::Naver => "naver",
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "yahoo" => Ok(Self::Yahoo),
            "naver" => Ok(Self::Naver),
            other => Err(ValidationError::InvalidSource {
                value: other.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_provider_case_insensitively() {
        assert_eq!(ProviderId::from_str(" Naver ").expect("must parse"), ProviderId::Naver);
        assert!(matches!(
            ProviderId::from_str("google"),
            Err(ValidationError::InvalidSource { .. })
        ));
    }
}
