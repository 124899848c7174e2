use sha1::{Digest, Sha1};

use crate::models::StackFrame;

/// Separator between the fields of a synthesized grouping source.
/// Fields are not escaped, so a `|` inside a field can make two sources collide.
const GROUPING_SEPARATOR: &str = "|";

/// Location used when an exception arrives without frames
pub const UNKNOWN_LOCATION: &str = "unknown location";

/// Computes the location of an exception from its topmost frame
pub fn compute_location(stack_trace: &[StackFrame]) -> String {
    match stack_trace.first() {
        Some(frame) => format!("{}:{}", frame.file, frame.line_number),
        None => UNKNOWN_LOCATION.to_string(),
    }
}

/// Picks the string the grouping hash is derived from.
///
/// A non-empty override is used verbatim; otherwise the source is
/// `error_class|location|severity`.
pub fn grouping_source(
    error_class: &str,
    location: &str,
    severity: &str,
    override_hash: Option<&str>,
) -> String {
    match override_hash {
        Some(custom) if !custom.is_empty() => custom.to_string(),
        _ => [error_class, location, severity].join(GROUPING_SEPARATOR),
    }
}

/// Calculates the SHA-1 hash of the grouping source as lowercase hex
pub fn hash_grouping_source(source: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(source.as_bytes());
    hex::encode(hasher.finalize())
}

/// Calculates the grouping hash for one exception occurrence
pub fn calculate_grouping_hash(
    error_class: &str,
    location: &str,
    severity: &str,
    override_hash: Option<&str>,
) -> String {
    hash_grouping_source(&grouping_source(
        error_class,
        location,
        severity,
        override_hash,
    ))
}
