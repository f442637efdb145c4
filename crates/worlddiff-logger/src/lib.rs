pub mod log;
pub mod severity;
pub mod time;

pub use log::log;
pub use severity::LogSeverity;
