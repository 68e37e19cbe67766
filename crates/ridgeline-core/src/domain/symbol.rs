use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{KrxBoard, ProviderId, ValidationError};

const MAX_SYMBOL_LEN: usize = 20;

/// Provider-specific symbol spelling, e.g. `GOOGL`, `445380.KS` or `445380`.
///
/// Stored uppercase. KRX spellings may carry a Yahoo board suffix; Naver
/// only ever sees the bare code from [`Symbol::base`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let normalized = input.trim().to_ascii_uppercase();
        if normalized.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }
        if normalized.len() > MAX_SYMBOL_LEN {
            return Err(ValidationError::SymbolTooLong {
                len: normalized.len(),
                max: MAX_SYMBOL_LEN,
            });
        }
        if let Some((index, ch)) = normalized
            .char_indices()
            .find(|(_, ch)| !(ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '^')))
        {
            return Err(ValidationError::SymbolInvalidChar { ch, index });
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Code without any exchange suffix.
    pub fn base(&self) -> &str {
        self.0.split_once('.').map_or(self.0.as_str(), |(base, _)| base)
    }

    /// KRX board named by a `.KS`/`.KQ` suffix.
    pub fn board(&self) -> Option<KrxBoard> {
        match self.0.rsplit_once('.') {
            Some((_, "KS")) => Some(KrxBoard::Kospi),
            Some((_, "KQ")) => Some(KrxBoard::Kosdaq),
            _ => None,
        }
    }

    /// The same code spelled for `board` on Yahoo.
    pub fn on_board(&self, board: KrxBoard) -> Self {
        Self(format!("{}{}", self.base(), board.yahoo_suffix()))
    }

    /// Bare code, dropping whatever suffix was present.
    pub fn bare(&self) -> Self {
        Self(self.base().to_owned())
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Symbol {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}

/// One (provider, spelling) pair attempted during resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateSymbol {
    pub provider: ProviderId,
    pub symbol: Symbol,
}

impl CandidateSymbol {
    pub fn new(provider: ProviderId, symbol: Symbol) -> Self {
        Self { provider, symbol }
    }

    pub fn parse(provider: ProviderId, raw: &str) -> Result<Self, ValidationError> {
        Ok(Self::new(provider, Symbol::parse(raw)?))
    }
}

impl Display for CandidateSymbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.provider, self.symbol)
    }
}
