//! Service modules for mood analysis
//!
//! - [`entry_store`]: in-memory source of truth and entry lifecycle
//! - [`analysis_dispatcher`]: one analysis round per created entry
//! - [`status_reconciler`]: on-demand video job status checks
//! - [`sentiment_client`] / [`emotion_client`]: HTTP provider clients

pub mod analysis_dispatcher;
pub mod emotion_client;
pub mod entry_store;
pub mod http_status;
pub mod sentiment_client;
pub mod status_reconciler;

pub use analysis_dispatcher::AnalysisDispatcher;
pub use emotion_client::HttpEmotionClient;
pub use entry_store::{ApplyOutcome, EntryStore};
pub use sentiment_client::HttpSentimentClient;
pub use status_reconciler::{extract_emotion_data, ReconcileOutcome, StatusReconciler};
