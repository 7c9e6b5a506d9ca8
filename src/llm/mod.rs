//! Model gateway client, prompts, and response repair.

mod client;
mod config;
pub mod prompts;
pub mod repair;

pub use client::{LlmClient, LlmError};
pub use config::LlmConfig;
