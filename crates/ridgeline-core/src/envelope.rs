//! Machine-readable response wrapper.
//!
//! Every command answers with `{ meta, data, errors }`. `meta` says where the
//! data came from (the candidates walked, the winner, cache state and
//! latency) and `errors` lists one entry per failed candidate.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::orchestrator::FailedAttempt;
use crate::{CandidateSymbol, Provenance, UtcDateTime, ValidationError};

pub const SCHEMA_VERSION: &str = "v1.0.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub meta: EnvelopeMeta,
    pub data: T,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<EnvelopeError>,
}

impl<T> Envelope<T> {
    pub fn success(meta: EnvelopeMeta, data: T) -> Self {
        Self {
            meta,
            data,
            errors: Vec::new(),
        }
    }

    /// Builds an envelope after checking the metadata and every error entry.
    pub fn with_errors(
        meta: EnvelopeMeta,
        data: T,
        errors: Vec<EnvelopeError>,
    ) -> Result<Self, ValidationError> {
        meta.validate()?;
        errors.iter().try_for_each(EnvelopeError::validate)?;
        Ok(Self { meta, data, errors })
    }

    pub fn is_partial(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeMeta {
    pub request_id: String,
    pub schema_version: String,
    pub generated_at: UtcDateTime,
    /// Candidates in the order they were tried; the winner, if any, is last.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_chain: Vec<CandidateSymbol>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
    pub latency_ms: u64,
    pub cache_hit: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl EnvelopeMeta {
    pub fn generate(latency_ms: u64, cache_hit: bool) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            schema_version: SCHEMA_VERSION.to_owned(),
            generated_at: UtcDateTime::now(),
            source_chain: Vec::new(),
            provenance: None,
            latency_ms,
            cache_hit,
            warnings: Vec::new(),
        }
    }

    pub fn with_source_chain(mut self, source_chain: Vec<CandidateSymbol>) -> Self {
        self.source_chain = source_chain;
        self
    }

    pub fn with_provenance(mut self, provenance: Option<Provenance>) -> Self {
        self.provenance = provenance;
        self
    }

    pub fn push_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        Uuid::parse_str(&self.request_id).map_err(|_| ValidationError::InvalidRequestId)?;
        parse_schema_version(&self.schema_version).ok_or_else(|| {
            ValidationError::InvalidSchemaVersion {
                value: self.schema_version.clone(),
            }
        })?;
        Ok(())
    }
}

/// One failed candidate, or a command-level failure when `source` is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<CandidateSymbol>,
}

impl EnvelopeError {
    pub fn from_attempt(attempt: &FailedAttempt) -> Self {
        Self {
            code: attempt.error.code().to_owned(),
            message: attempt.error.message().to_owned(),
            source: Some(attempt.candidate.clone()),
        }
    }

    pub fn command(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.code.trim().is_empty() {
            return Err(ValidationError::EmptyErrorCode);
        }
        if self.message.trim().is_empty() {
            return Err(ValidationError::EmptyErrorMessage);
        }
        Ok(())
    }
}

fn parse_schema_version(value: &str) -> Option<(u32, u32, u32)> {
    let mut parts = value.strip_prefix('v')?.split('.');
    let mut next = || -> Option<u32> {
        let part = parts.next()?;
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        part.parse().ok()
    };
    let version = (next()?, next()?, next()?);
    parts.next().is_none().then_some(version)
}
