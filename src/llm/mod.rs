//! LLM access: the chat-completions client, its error type, and the prompts
//! used by the recommendation and report steps.

pub mod client;
pub mod error;
pub mod prompts;

pub use client::{ChatClient, ChatMessage, CompletionBackend, ProviderConfig};
pub use error::LlmError;
