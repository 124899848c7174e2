pub mod error_group;
pub mod grouping;

pub use error_group::ErrorGroupService;
pub use grouping::{calculate_grouping_hash, compute_location, grouping_source, hash_grouping_source};
