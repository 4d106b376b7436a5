//! Network-specific error types.

use rp_core::{PrepError, ReachId};

/// Connectivity construction and validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// The same reach id appears twice in the input.
    DuplicateReach { id: ReachId },

    /// Requested upstream width outside `[1, 12]`.
    InvalidUpstreamCap { cap: usize },

    /// A reach has more upstream neighbors than the configured width.
    UpstreamOverflow {
        id: ReachId,
        count: usize,
        cap: usize,
    },

    /// The "no downstream" sentinel is also a legitimate reach id.
    SentinelCollision { sentinel: ReachId },

    /// Following downstream links from this reach returns to it.
    Cycle { id: ReachId },

    /// A required attribute is absent from the drainage input.
    MissingField { field: String },

    /// A row of a delimited or feature file could not be parsed.
    MalformedRow { line: usize, what: String },
}

impl std::fmt::Display for NetworkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetworkError::DuplicateReach { id } => {
                write!(f, "Reach {} appears more than once", id)
            }
            NetworkError::InvalidUpstreamCap { cap } => {
                write!(
                    f,
                    "Maximum upstream count {} is outside the valid range [1, {}]",
                    cap,
                    crate::MAX_UPSTREAM_LIMIT
                )
            }
            NetworkError::UpstreamOverflow { id, count, cap } => {
                write!(
                    f,
                    "Reach {} has {} upstream reaches but the maximum is {}",
                    id, count, cap
                )
            }
            NetworkError::SentinelCollision { sentinel } => {
                write!(
                    f,
                    "Outlet sentinel {} is also a reach id; choose a different sentinel",
                    sentinel
                )
            }
            NetworkError::Cycle { id } => {
                write!(f, "Downstream links form a cycle through reach {}", id)
            }
            NetworkError::MissingField { field } => {
                write!(f, "Drainage input has no field named '{}'", field)
            }
            NetworkError::MalformedRow { line, what } => {
                write!(f, "Malformed row {}: {}", line, what)
            }
        }
    }
}

impl std::error::Error for NetworkError {}

impl From<NetworkError> for PrepError {
    fn from(err: NetworkError) -> Self {
        match err {
            NetworkError::InvalidUpstreamCap { .. }
            | NetworkError::UpstreamOverflow { .. }
            | NetworkError::SentinelCollision { .. }
            | NetworkError::MissingField { .. } => PrepError::config(err.to_string()),
            NetworkError::DuplicateReach { .. }
            | NetworkError::Cycle { .. }
            | NetworkError::MalformedRow { .. } => PrepError::data(err.to_string()),
        }
    }
}
