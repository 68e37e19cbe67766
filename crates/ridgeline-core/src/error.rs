use thiserror::Error;

/// Validation errors for domain values built from provider payloads or user input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("invalid window '{value}', expected one of 6mo, 1y, 2y")]
    InvalidWindow { value: String },
    #[error("invalid source '{value}', expected one of yahoo, naver")]
    InvalidSource { value: String },
    #[error("invalid currency '{value}', expected USD or KRW")]
    InvalidCurrency { value: String },
    #[error("invalid board '{value}', expected kospi or kosdaq")]
    InvalidBoard { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },
    #[error("date must be YYYY-MM-DD or YYYYMMDD: '{value}'")]
    InvalidDate { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },

    #[error("bar high must be >= low")]
    InvalidBarRange,
    #[error("bar open/close must be within high/low range")]
    InvalidBarBounds,

    #[error("request_id must be a UUID")]
    InvalidRequestId,
    #[error("schema_version must match vMAJOR.MINOR.PATCH: '{value}'")]
    InvalidSchemaVersion { value: String },
    #[error("error code cannot be empty")]
    EmptyErrorCode,
    #[error("error message cannot be empty")]
    EmptyErrorMessage,
}

/// Configuration and input errors. These fail fast at load or input time,
/// never at fetch time.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("instrument '{id}' has no candidate symbols")]
    EmptyCandidates { id: String },
    #[error("instrument id cannot be empty")]
    EmptyInstrumentId,
    #[error("duplicate instrument id '{id}' in watchlist")]
    DuplicateInstrument { id: String },
    #[error("watchlist must contain at least one instrument")]
    EmptyWatchlist,
    #[error("unknown instrument '{id}'")]
    UnknownInstrument { id: String },
    #[error("instrument '{id}': {source}")]
    InvalidInstrument {
        id: String,
        #[source]
        source: ValidationError,
    },

    #[error("cost basis must be a number: '{value}'")]
    InvalidCostBasis { value: String },

    #[error("environment variable {name} has invalid value '{value}'")]
    InvalidEnv { name: &'static str, value: String },
    #[error("failed to read watchlist '{path}': {message}")]
    WatchlistRead { path: String, message: String },
    #[error("failed to parse watchlist '{path}': {message}")]
    WatchlistParse { path: String, message: String },

    #[error("configuration is already installed")]
    AlreadyInstalled,
    #[error("configuration has not been installed")]
    NotInstalled,
}
