//! Deduplication: files decoded occurrences under their error groups.

pub mod merge;

pub use merge::{process_error, process_notification, MergeOutcome};
