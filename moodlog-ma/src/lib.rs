//! moodlog-ma library interface
//!
//! Journal entries with asynchronous mood analysis: text entries go through a
//! sentiment provider, video entries through an emotion provider's batch jobs.
//! Exposes public APIs for the binary and for integration testing.

pub mod db;
pub mod models;
pub mod services;
pub mod types;
pub mod utils;

pub use services::{EntryStore, ReconcileOutcome};
pub use utils::RetryPolicy;
