//! Conversation history display component

use crate::events::{ChatMessage, ConversationRole};
use crate::prompts::INPUT_PLACEHOLDER;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Renders the visible transcript, newest lines at the bottom.
///
/// Borrows the session's messages; the system directive is expected to have
/// been filtered out by the caller.
pub struct ConversationHistory<'a> {
    title: &'a str,
    messages: &'a [ChatMessage],
    streaming_message: Option<&'a str>,
    notice: Option<&'a str>,
    show_timestamps: bool,
}

impl<'a> ConversationHistory<'a> {
    pub fn new(title: &'a str, messages: &'a [ChatMessage]) -> Self {
        Self {
            title,
            messages,
            streaming_message: None,
            notice: None,
            show_timestamps: true,
        }
    }

    /// Partial assistant reply shown while it streams in
    pub fn streaming(mut self, text: Option<&'a str>) -> Self {
        self.streaming_message = text;
        self
    }

    /// Local UI notice such as help text; never part of the conversation
    pub fn notice(mut self, text: Option<&'a str>) -> Self {
        self.notice = text;
        self
    }

    pub fn show_timestamps(mut self, show: bool) -> Self {
        self.show_timestamps = show;
        self
    }

    /// Lay out every message into display lines for the given width
    pub fn lines(&self, width: u16) -> Vec<Line<'static>> {
        let mut all_lines = Vec::new();
        for message in self.messages {
            all_lines.extend(self.render_message(message, width));
            all_lines.push(Line::default());
        }

        if let Some(text) = self.streaming_message {
            all_lines.extend(self.render_streaming_message(text, width));
        }

        if let Some(notice) = self.notice {
            for line in wrap_text(notice, width.saturating_sub(2) as usize) {
                all_lines.push(Line::from(vec![
                    Span::raw("  "),
                    Span::styled(line, Style::default().fg(Color::Yellow)),
                ]));
            }
        }

        all_lines
    }

    fn header(&self, message: &ChatMessage) -> Line<'static> {
        let (icon, name) = match message.role {
            ConversationRole::User => ("👤", "나"),
            ConversationRole::Assistant => ("🤖", "친구봇"),
            ConversationRole::System => ("⚙️", "system"),
        };

        let mut header = format!("{} {}", icon, name);
        if self.show_timestamps {
            header.push(' ');
            header.push_str(&message.timestamp.format("%H:%M:%S").to_string());
        }

        Line::from(vec![Span::styled(header, Style::default().fg(Color::DarkGray))])
    }

    /// Render a single message into lines
    fn render_message(&self, message: &ChatMessage, width: u16) -> Vec<Line<'static>> {
        let mut lines = vec![self.header(message)];

        let style = content_style(message.role);
        for content_line in wrap_text(&message.content, width.saturating_sub(2) as usize) {
            lines.push(Line::from(vec![Span::raw("  "), Span::styled(content_line, style)]));
        }

        lines
    }

    /// Render a streaming message with typing indicator
    fn render_streaming_message(&self, text: &str, width: u16) -> Vec<Line<'static>> {
        let mut lines = vec![Line::from(vec![Span::styled(
            "🤖 친구봇",
            Style::default().fg(Color::DarkGray),
        )])];

        let content_lines = wrap_text(text, width.saturating_sub(3) as usize);
        let last = content_lines.len().saturating_sub(1);
        for (i, content_line) in content_lines.into_iter().enumerate() {
            let cursor = if i == last { "▋" } else { "" };
            lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(content_line, content_style(ConversationRole::Assistant)),
                Span::styled(cursor, Style::default().fg(Color::Yellow)),
            ]));
        }

        lines
    }
}

impl Widget for ConversationHistory<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default().borders(Borders::ALL).title(self.title);

        let inner_area = block.inner(area);
        block.render(area, buf);

        let all_lines = if self.messages.is_empty() && self.streaming_message.is_none() {
            let mut welcome = vec![
                Line::from(vec![Span::styled("안녕! 나는 친구봇이야 👋", Style::default().fg(Color::Green))]),
                Line::default(),
                Line::from(vec![Span::styled(INPUT_PLACEHOLDER, Style::default().fg(Color::Gray))]),
                Line::from(vec![Span::styled(
                    "Enter로 보내고, Shift+Enter로 줄바꿈, /help 로 도움말.",
                    Style::default().fg(Color::DarkGray),
                )]),
            ];
            if self.notice.is_some() {
                welcome.push(Line::default());
                welcome.extend(self.lines(inner_area.width));
            }
            welcome
        } else {
            self.lines(inner_area.width)
        };

        // show the tail that fits
        let height = inner_area.height as usize;
        let start = all_lines.len().saturating_sub(height);
        for (i, line) in all_lines[start..].iter().enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }
    }
}

/// Get content style based on role
fn content_style(role: ConversationRole) -> Style {
    match role {
        ConversationRole::User => Style::default().fg(Color::Blue),
        ConversationRole::Assistant => Style::default().fg(Color::Green),
        ConversationRole::System => Style::default().fg(Color::Yellow),
    }
}

/// Display width of a string in terminal cells
fn display_width(text: &str) -> usize {
    Span::raw(text).width()
}

/// Wrap text to fit within the given width, keeping explicit line breaks
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current_line = String::new();
        let mut current_width = 0;

        for word in paragraph.split_whitespace() {
            let word_width = display_width(word);
            let needed = if current_line.is_empty() { word_width } else { current_width + 1 + word_width };

            if needed <= width {
                if !current_line.is_empty() {
                    current_line.push(' ');
                }
                current_line.push_str(word);
                current_width = needed;
                continue;
            }

            if !current_line.is_empty() {
                lines.push(std::mem::take(&mut current_line));
                current_width = 0;
            }

            if word_width <= width {
                current_line.push_str(word);
                current_width = word_width;
                continue;
            }

            // hard-break words wider than the line
            for c in word.chars() {
                let char_width = display_width(c.encode_utf8(&mut [0; 4]));
                if current_width + char_width > width && !current_line.is_empty() {
                    lines.push(std::mem::take(&mut current_line));
                    current_width = 0;
                }
                current_line.push(c);
                current_width += char_width;
            }
        }

        lines.push(current_line);
    }

    lines
}
