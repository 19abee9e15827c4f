//! LLM integration module.
//!
//! Provides an OpenAI-compatible client for LLM API calls, the service
//! boundary trait the evaluator is written against, and the judgment prompt.

mod client;
mod prompts;

pub use client::{ChatRequest, ChatService, LlmClient, LlmResponse, Message, Role, TokenUsage};
pub use prompts::Prompts;
