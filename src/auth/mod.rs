pub mod basic;
pub mod extractors;

pub use basic::{keys_match, parse_basic_auth_header};
pub use extractors::OperatorAuth;
