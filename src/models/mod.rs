pub mod error_group;
pub mod event;

pub use error_group::{CandidateError, ErrorGroup, ErrorGroupResponse, NewErrorGroup};
pub use event::{Event, EventData, EventResponse, LineOfCode, NewEvent, StackFrame};
