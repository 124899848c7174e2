pub mod decoder;
pub mod notification;
pub mod stacktrace;

pub use decoder::decode;
pub use notification::Notification;
pub use stacktrace::normalize_frame;
