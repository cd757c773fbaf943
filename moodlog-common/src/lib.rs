//! # moodlog Common Library
//!
//! Shared code for the moodlog crates including:
//! - Error taxonomy (`Error`, `Result`) with retry classification
//! - Analysis status shared by events and entry models
//! - Event types (`JournalEvent`) and the broadcast `EventBus`
//! - Configuration loading and root folder resolution

pub mod config;
pub mod error;
pub mod events;
pub mod status;

pub use error::{Error, Result};
pub use status::AnalysisStatus;
