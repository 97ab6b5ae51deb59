use crate::accumulator::{Reply, ResponseAccumulator};
use crate::error::CompletionError;
use crate::events::ReplyEvent;
use crate::llm::CompletionEndpoint;
use crate::prompts::{APP_TITLE, CLIENT_UNAVAILABLE, request_failed};
use crate::session::ChatSession;
use crate::ui::conversation::composer::ConversationResult;
use crate::ui::conversation::{
    ConversationComposer, ConversationHistory, ParsedCommand, SlashCommand, StreamingResponse,
    get_help_text,
};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::Widget,
};
use tokio::sync::mpsc::{self, UnboundedReceiver, error::TryRecvError};
use tracing::{debug, warn};

/// Actions that can be requested by the conversation manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationAction {
    None,
    Exit,
}

/// Owns the session and drives one reply at a time in the background
pub struct ConversationManager<E> {
    session: ChatSession,
    accumulator: ResponseAccumulator<E>,
    composer: ConversationComposer,
    streaming: StreamingResponse,
    reply_receiver: Option<UnboundedReceiver<ReplyEvent>>,
    status: Option<String>,
    notice: Option<String>,
    show_timestamps: bool,
}

impl<E: CompletionEndpoint> ConversationManager<E> {
    pub fn new(mut session: ChatSession, accumulator: ResponseAccumulator<E>) -> Self {
        session.initialize();

        let status = if accumulator.is_available() {
            None
        } else {
            Some(CLIENT_UNAVAILABLE.to_string())
        };

        Self {
            session,
            accumulator,
            composer: ConversationComposer::default(),
            streaming: StreamingResponse::new(),
            reply_receiver: None,
            status,
            notice: None,
            show_timestamps: true,
        }
    }

    pub fn with_timestamps(mut self, show: bool) -> Self {
        self.show_timestamps = show;
        self
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    /// Error or warning shown under the composer
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// True while a reply is in flight
    pub fn is_busy(&self) -> bool {
        self.reply_receiver.is_some()
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ConversationAction {
        if key.kind == KeyEventKind::Press
            && key.modifiers.contains(KeyModifiers::CONTROL)
            && key.code == KeyCode::Char('c')
        {
            return ConversationAction::Exit;
        }

        match self.composer.handle_key(key) {
            ConversationResult::Submitted(input) => {
                self.submit(input);
                ConversationAction::None
            }
            ConversationResult::Command(command) => self.handle_slash_command(command),
            ConversationResult::None => ConversationAction::None,
        }
    }

    pub fn handle_paste(&mut self, text: &str) {
        self.composer.paste(text);
    }

    /// Record the user's message and start streaming the reply.
    ///
    /// Ignored while a reply is already in flight. Without a client the
    /// input is dropped and the warning stays on screen.
    pub fn submit(&mut self, input: String) {
        if self.is_busy() || input.trim().is_empty() {
            return;
        }

        if !self.accumulator.is_available() {
            debug!("input ignored, no completion client");
            self.status = Some(CLIENT_UNAVAILABLE.to_string());
            return;
        }

        self.status = None;
        self.notice = None;
        self.session.begin_turn(input);

        let (tx, rx) = mpsc::unbounded_channel();
        let accumulator = self.accumulator.clone();
        let messages = self.session.all().to_vec();
        tokio::spawn(async move {
            let reply = accumulator
                .respond_with(&messages, |delta| {
                    let _ = tx.send(ReplyEvent::Delta(delta.to_string()));
                })
                .await;
            let _ = tx.send(ReplyEvent::Finished(reply));
        });

        self.reply_receiver = Some(rx);
        self.streaming.start_streaming();
        self.composer.set_locked(true);
    }

    /// Drain reply events without blocking (called from the draw loop)
    pub fn process_reply_events(&mut self) {
        while let Some(receiver) = self.reply_receiver.as_mut() {
            match receiver.try_recv() {
                Ok(event) => self.apply(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => self.reply_task_lost(),
            }
        }
    }

    /// Wait until the reply in flight, if any, has been recorded
    pub async fn settle(&mut self) {
        while let Some(receiver) = self.reply_receiver.as_mut() {
            let event = receiver.recv().await;
            match event {
                Some(event) => self.apply(event),
                None => self.reply_task_lost(),
            }
        }
    }

    fn apply(&mut self, event: ReplyEvent) {
        match event {
            ReplyEvent::Delta(delta) => self.streaming.push_delta(&delta),
            ReplyEvent::Finished(reply) => self.finish(reply),
        }
    }

    fn reply_task_lost(&mut self) {
        warn!("reply task ended without a result");
        self.finish(Reply::Failed(CompletionError::Stream(
            "reply task ended".to_string(),
        )));
    }

    fn finish(&mut self, reply: Reply) {
        self.session.finish_turn(&reply);
        self.status = match &reply {
            Reply::Completed(_) => None,
            Reply::Failed(error) => Some(request_failed(&error.to_string())),
            Reply::Unavailable => Some(CLIENT_UNAVAILABLE.to_string()),
        };
        self.reply_receiver = None;
        self.streaming.clear();
        self.composer.set_locked(false);
    }

    fn handle_slash_command(&mut self, command: ParsedCommand) -> ConversationAction {
        match command.command {
            SlashCommand::Help => {
                self.notice = Some(get_help_text());
                ConversationAction::None
            }
            SlashCommand::Bye => ConversationAction::Exit,
        }
    }

    /// Render the conversation UI components
    pub fn render_conversation_ui(&self, area: Rect, buf: &mut Buffer) {
        let composer_lines = self.composer.content().split('\n').count().clamp(1, 5) as u16;

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(5),                     // History
                Constraint::Length(1),                  // Thinking indicator
                Constraint::Length(composer_lines + 2), // Composer
                Constraint::Length(1),                  // Status
            ])
            .split(area);

        ConversationHistory::new(APP_TITLE, self.session.transcript())
            .streaming(self.streaming.partial())
            .notice(self.notice.as_deref())
            .show_timestamps(self.show_timestamps)
            .render(chunks[0], buf);

        self.streaming.clone().render(chunks[1], buf);
        self.composer.clone().render(chunks[2], buf);

        if let Some(status) = &self.status {
            let line = Line::from(vec![Span::styled(
                status.as_str(),
                Style::default().fg(Color::Red),
            )]);
            buf.set_line(chunks[3].x, chunks[3].y, &line, chunks[3].width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulator::testing::ScriptedEndpoint;
    use crate::events::ConversationRole;
    use crate::llm::ChatCompletionChunk;
    use crate::prompts::{FALLBACK_REPLY, SYSTEM_MESSAGE};

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(manager: &mut ConversationManager<ScriptedEndpoint>, text: &str) {
        for c in text.chars() {
            manager.handle_key(press(KeyCode::Char(c)));
        }
    }

    fn manager(endpoint: ScriptedEndpoint) -> ConversationManager<ScriptedEndpoint> {
        ConversationManager::new(
            ChatSession::new(SYSTEM_MESSAGE),
            ResponseAccumulator::new(endpoint, "m"),
        )
    }

    #[tokio::test]
    async fn test_enter_streams_reply_into_transcript() {
        let mut manager = manager(ScriptedEndpoint::deltas(&["안녕", "!"]));
        type_text(&mut manager, "hi");
        manager.handle_key(press(KeyCode::Enter));
        assert!(manager.is_busy());

        manager.settle().await;

        assert!(!manager.is_busy());
        let all = manager.session().all();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].role, ConversationRole::System);
        assert_eq!((all[1].role, all[1].content.as_str()), (ConversationRole::User, "hi"));
        assert_eq!((all[2].role, all[2].content.as_str()), (ConversationRole::Assistant, "안녕!"));
        assert_eq!(manager.status(), None);
    }

    #[tokio::test]
    async fn test_failure_shows_error_and_appends_fallback() {
        let endpoint = ScriptedEndpoint::items(vec![
            Ok(ChatCompletionChunk::text("half")),
            Err(CompletionError::Stream("reset".to_string())),
        ]);
        let mut manager = manager(endpoint);
        manager.submit("hi".to_string());
        manager.settle().await;

        assert_eq!(manager.session().all()[2].content, FALLBACK_REPLY);
        let status = manager.status().unwrap();
        assert!(status.starts_with("API 호출 중 오류 발생"));
        assert!(status.contains("reset"));
    }

    #[tokio::test]
    async fn test_unavailable_client_drops_input() {
        let mut manager = ConversationManager::new(
            ChatSession::new(SYSTEM_MESSAGE),
            ResponseAccumulator::<ScriptedEndpoint>::disabled("m"),
        );
        assert_eq!(manager.status(), Some(CLIENT_UNAVAILABLE));

        manager.submit("hi".to_string());
        assert!(!manager.is_busy());
        assert_eq!(manager.session().all().len(), 1);
    }

    #[tokio::test]
    async fn test_second_submit_ignored_while_busy() {
        let endpoint = ScriptedEndpoint::deltas(&["ok"]);
        let mut manager = manager(endpoint.clone());
        manager.submit("one".to_string());
        manager.submit("two".to_string());
        manager.settle().await;

        assert_eq!(manager.session().all().len(), 3);
        assert_eq!(endpoint.call_count(), 1);
    }

    #[tokio::test]
    async fn test_slash_commands() {
        let mut manager = manager(ScriptedEndpoint::deltas(&["ok"]));

        type_text(&mut manager, "/help me");
        assert_eq!(manager.handle_key(press(KeyCode::Enter)), ConversationAction::None);
        assert!(manager.notice().unwrap().contains("/bye"));
        assert_eq!(manager.session().all().len(), 1);

        type_text(&mut manager, "/quit now");
        assert_eq!(manager.handle_key(press(KeyCode::Enter)), ConversationAction::Exit);
    }

    #[test]
    fn test_ctrl_c_exits() {
        let mut manager = manager(ScriptedEndpoint::deltas(&[]));
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(manager.handle_key(key), ConversationAction::Exit);
    }

    #[tokio::test]
    async fn test_render_shows_transcript_without_system_message() {
        let mut manager = manager(ScriptedEndpoint::deltas(&["반가워"])).with_timestamps(false);
        manager.submit("hello".to_string());
        manager.settle().await;

        let area = Rect::new(0, 0, 50, 20);
        let mut buf = Buffer::empty(area);
        manager.render_conversation_ui(area, &mut buf);

        let mut text = String::new();
        for y in 0..area.height {
            for x in 0..area.width {
                text.push_str(buf.get(x, y).symbol());
            }
        }
        assert!(text.contains("hello"));
        assert_eq!(manager.session().transcript().len(), 2);
    }
}
