//! Dropout Tracker - student dropout prevention advisor library
//!
//! - Chat-completions client for the advisor and analyst prompts
//! - Survey scoring and dropout-rate update
//! - Per-session measure and improvement history with CSV export
//! - Axum web UI and JSON API
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use dropout_tracker::{ChatClient, Config, Tracker};
//! use dropout_tracker::tracker::session::Session;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let client = ChatClient::from_config(&config.llm)?;
//!     let tracker = Tracker::new(Arc::new(client), config.scoring.seed);
//!     let session = tokio::sync::Mutex::new(Session::new());
//!     let record = tracker.recommend(&session, 18.0, "long commutes").await?;
//!     println!("{:#?}", record.measures);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod llm;
pub mod server;
pub mod tracker;

pub use config::Config;
pub use llm::{ChatClient, CompletionBackend, LlmError};
pub use tracker::{Tracker, TrackerError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get the library info
pub fn info() -> String {
    format!("{} v{} - Dropout Prevention Tracker", NAME, VERSION)
}

/// Truncate to at most `max_chars` characters without splitting a code point
pub fn truncate_safe(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
