use ulid::Ulid;

use crate::model::{ConflictResult, Ms};
use crate::source::{SourceError, SourceKind};

#[derive(Debug)]
pub enum EngineError {
    /// `end <= start` on a query input.
    InvalidInterval { start: Ms, end: Ms },
    UnknownResource(Ulid),
    AccessDenied(Ulid),
    /// The vehicle does not belong to the agency named by the caller.
    AgencyMismatch { vehicle_id: Ulid, agency_id: Ulid },
    Upstream { source: SourceKind, reason: String },
    /// The persistence layer refused a booking write after this engine approved it.
    RaceLossOnInsert(ConflictResult),
    LimitExceeded(&'static str),
}

impl EngineError {
    pub(crate) fn upstream(source: SourceKind, err: SourceError) -> Self {
        EngineError::Upstream {
            source,
            reason: err.to_string(),
        }
    }

    /// Conflict payload for errors that mean "slot taken", so callers can
    /// treat a lost insert race exactly like a pre-insert rejection.
    pub fn as_conflict(&self) -> Option<&ConflictResult> {
        match self {
            EngineError::RaceLossOnInsert(result) => Some(result),
            _ => None,
        }
    }

    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            EngineError::InvalidInterval { .. } => "invalid_interval",
            EngineError::UnknownResource(_) => "unknown_resource",
            EngineError::AccessDenied(_) => "access_denied",
            EngineError::AgencyMismatch { .. } => "agency_mismatch",
            EngineError::Upstream { .. } => "upstream",
            EngineError::RaceLossOnInsert(_) => "race_lost",
            EngineError::LimitExceeded(_) => "limit_exceeded",
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InvalidInterval { start, end } => {
                write!(f, "invalid interval [{start}, {end}): end must be after start")
            }
            EngineError::UnknownResource(id) => write!(f, "unknown vehicle: {id}"),
            EngineError::AccessDenied(id) => write!(f, "access denied: {id}"),
            EngineError::AgencyMismatch { vehicle_id, agency_id } => {
                write!(f, "vehicle {vehicle_id} does not belong to agency {agency_id}")
            }
            EngineError::Upstream { source, reason } => {
                write!(f, "upstream {source} fetch failed: {reason}")
            }
            EngineError::RaceLossOnInsert(result) => {
                write!(
                    f,
                    "slot [{}, {}) already claimed; {} conflicting interval(s)",
                    result.requested.span.start,
                    result.requested.span.end,
                    result.conflicts.len()
                )
            }
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}
