//! LLM provider adapters.
//!
//! One trait, one adapter: any OpenAI-compatible chat-completions
//! endpoint (OpenRouter by default). The orchestrator only ever sees the
//! provider-agnostic [`ChatRequest`]/[`ChatResponse`] pair.

pub mod openrouter;
pub mod traits;

pub use openrouter::OpenRouterProvider;
pub use traits::{ChatRequest, ChatResponse, LlmProvider};
