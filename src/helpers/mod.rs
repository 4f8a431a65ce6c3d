pub mod duration;
pub mod http_client;
pub mod retry;
pub mod spotify;

pub use duration::{format_duration, parse_duration, DurationError};
