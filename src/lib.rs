//! A terminal chat companion backed by a hosted chat-completion API.

pub mod accumulator;
pub mod commands;
pub mod config;
pub mod conversation;
pub mod credentials;
pub mod error;
pub mod events;
pub mod llm;
pub mod prompts;
pub mod session;
pub mod streaming;
pub mod ui;
