//! Conversation UI components for chat interface

pub mod commands;
pub mod composer;
pub mod history;
pub mod manager;
pub mod streaming;

pub use commands::{ParsedCommand, SlashCommand, get_help_text};
pub use composer::ConversationComposer;
pub use history::ConversationHistory;
pub use manager::{ConversationAction, ConversationManager};
pub use streaming::StreamingResponse;
