//! Versioned trail validation.
//!
//! [`validate`] turns an untrusted JSON value into a typed [`Trail`] or a
//! [`ValidationError`] naming the first rule it broke. Each wire version has
//! its own validator in [`schema`]; a new wire version gets a new case there
//! and never changes an existing one.

/// Per-version validators and dense-array helpers.
pub mod schema;

use thiserror::Error;

use crate::trail::Trail;

/// Reason a trail was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Root value is not a mapping.
    #[error("trail is not a JSON object")]
    NotAnObject,
    /// `version` missing, fractional or negative.
    #[error("version is not a non-negative integer")]
    BadVersion,
    /// Well-formed but unknown version.
    #[error("unsupported trail version {0}")]
    UnsupportedVersion(u64),
    /// Required field missing or of the wrong JSON type.
    #[error("field `{0}` is missing or has the wrong type")]
    BadField(&'static str),
    /// Identifier does not match the version's pattern.
    #[error("`{0}` is not a well-formed identifier")]
    BadIdentifier(&'static str),
    /// Times are not finite or violate `0 <= start <= end`.
    #[error("start/end must be finite with 0 <= start <= end")]
    BadTimeSpan,
    /// Distance not finite or negative.
    #[error("distance must be a finite non-negative number")]
    BadDistance,
    /// Activity type outside the allowed set.
    #[error("unknown activity type {0:?}")]
    BadActivityType(String),
    /// Value is not a dense array.
    #[error("`{0}` is not a dense array")]
    NotDense(&'static str),
    /// A waypoint element is malformed.
    #[error("waypoint {0} is malformed")]
    BadWaypoint(usize),
    /// A reading element is malformed.
    #[error("reading {index}: {reason}")]
    BadReading {
        /// Position in the readings array.
        index: usize,
        /// Broken rule.
        reason: &'static str,
    },
}

/// Why an uploaded body was refused.
#[derive(Debug, Error)]
pub enum TrailRejection {
    /// Body is not JSON at all.
    #[error("malformed data (not JSON): {0}")]
    Malformed(#[from] serde_json::Error),
    /// JSON that fails schema validation.
    #[error("malformed data (bad format): {0}")]
    Schema(#[from] ValidationError),
}

/// Validates a parsed JSON value and dispatches on its `version`.
pub fn validate(value: &serde_json::Value) -> Result<Trail, ValidationError> {
    let obj = value.as_object().ok_or(ValidationError::NotAnObject)?;
    let version = obj
        .get("version")
        .and_then(schema::non_negative_integer)
        .ok_or(ValidationError::BadVersion)?;

    match version {
        crate::trail::TRAIL_V1 => schema::validate_v1(obj).map(Trail::V1),
        crate::trail::TRAIL_V2 => schema::validate_v2(obj).map(Trail::V2),
        other => Err(ValidationError::UnsupportedVersion(other)),
    }
}

/// Parses raw body bytes and validates them.
pub fn parse_trail(body: &[u8]) -> Result<Trail, TrailRejection> {
    let value: serde_json::Value = serde_json::from_slice(body)?;
    Ok(validate(&value)?)
}
