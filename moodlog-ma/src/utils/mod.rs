//! Utility modules for moodlog-ma

pub mod retry;

pub use retry::RetryPolicy;
