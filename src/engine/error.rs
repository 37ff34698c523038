use ulid::Ulid;

use crate::source::SourceError;

#[derive(Debug)]
pub enum EngineError {
    /// Malformed caller input (bad date, non-positive duration, inverted span).
    InvalidInput(String),
    NotFound(Ulid),
    AlreadyExists(Ulid),
    HasBookings(Ulid),
    /// Committed booking that blocks the write.
    Conflict(Ulid),
    LimitExceeded(&'static str),
    /// The data service could not answer; never treated as "no bookings".
    Upstream(SourceError),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::AlreadyExists(id) => write!(f, "already exists: {id}"),
            EngineError::HasBookings(id) => {
                write!(f, "cannot delete resource {id}: has bookings")
            }
            EngineError::Conflict(id) => write!(f, "conflict with booking: {id}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::Upstream(e) => write!(f, "data service failure: {e}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Upstream(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SourceError> for EngineError {
    fn from(e: SourceError) -> Self {
        match e {
            SourceError::NotFound(id) => EngineError::NotFound(id),
            SourceError::AlreadyExists(id) => EngineError::AlreadyExists(id),
            SourceError::InUse(id) => EngineError::HasBookings(id),
            SourceError::Conflict(id) => EngineError::Conflict(id),
            other => EngineError::Upstream(other),
        }
    }
}

impl EngineError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::InvalidInput(_) => "invalid_input",
            EngineError::NotFound(_) => "not_found",
            EngineError::AlreadyExists(_) => "already_exists",
            EngineError::HasBookings(_) => "has_bookings",
            EngineError::Conflict(_) => "conflict",
            EngineError::LimitExceeded(_) => "limit_exceeded",
            EngineError::Upstream(_) => "upstream",
        }
    }
}
