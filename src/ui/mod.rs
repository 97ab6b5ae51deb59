//! Full-screen chat interface.

pub mod conversation;

use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::ExecutableCommand;
use crossterm::event::{self, DisableBracketedPaste, EnableBracketedPaste, Event};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::prelude::*;
use tracing::info;

use crate::llm::CompletionEndpoint;
use conversation::{ConversationAction, ConversationManager};

const FRAME_INTERVAL: Duration = Duration::from_millis(50);

/// Take over the terminal until the user leaves the chat
pub async fn run<E: CompletionEndpoint>(manager: &mut ConversationManager<E>) -> Result<()> {
    enable_raw_mode()?;
    io::stdout().execute(EnterAlternateScreen)?;
    io::stdout().execute(EnableBracketedPaste)?;

    let backend = CrosstermBackend::new(io::stdout());
    let result = match Terminal::new(backend) {
        Ok(mut terminal) => run_loop(&mut terminal, manager).await,
        Err(e) => Err(e.into()),
    };

    // Restore terminal
    io::stdout().execute(DisableBracketedPaste)?;
    disable_raw_mode()?;
    io::stdout().execute(LeaveAlternateScreen)?;

    info!(
        session = %manager.session().id(),
        turns = manager.session().conversation().map(|c| c.turns()).unwrap_or(0),
        "chat closed"
    );
    result
}

async fn run_loop<E: CompletionEndpoint>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    manager: &mut ConversationManager<E>,
) -> Result<()> {
    loop {
        manager.process_reply_events();
        terminal.draw(|frame| manager.render_conversation_ui(frame.size(), frame.buffer_mut()))?;

        if event::poll(FRAME_INTERVAL)? {
            let action = match event::read()? {
                Event::Key(key) => manager.handle_key(key),
                Event::Paste(text) => {
                    manager.handle_paste(&text);
                    ConversationAction::None
                }
                _ => ConversationAction::None,
            };
            if action == ConversationAction::Exit {
                break;
            }
        } else {
            // let the reply task make progress on a busy runtime
            tokio::task::yield_now().await;
        }
    }

    Ok(())
}
