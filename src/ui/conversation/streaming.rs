use crate::prompts::THINKING;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Widget,
};
use std::time::Instant;

/// Partial reply and thinking indicator for the call in flight
#[derive(Clone)]
pub struct StreamingResponse {
    current_response: String,
    is_streaming: bool,
    started: Instant,
}

impl Default for StreamingResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamingResponse {
    pub fn new() -> Self {
        Self {
            current_response: String::new(),
            is_streaming: false,
            started: Instant::now(),
        }
    }

    /// Start streaming a new response
    pub fn start_streaming(&mut self) {
        self.is_streaming = true;
        self.current_response.clear();
        self.started = Instant::now();
    }

    pub fn push_delta(&mut self, delta: &str) {
        self.current_response.push_str(delta);
    }

    /// Check if currently streaming
    pub fn is_streaming(&self) -> bool {
        self.is_streaming
    }

    /// Text received so far, if any
    pub fn partial(&self) -> Option<&str> {
        if self.is_streaming && !self.current_response.is_empty() {
            Some(&self.current_response)
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.current_response.clear();
        self.is_streaming = false;
    }
}

impl Widget for StreamingResponse {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if !self.is_streaming || area.height == 0 {
            return;
        }

        let dots = match (self.started.elapsed().as_millis() / 300) % 4 {
            0 => ".",
            1 => "..",
            2 => "...",
            _ => "",
        };

        let indicator = Line::from(vec![
            Span::styled("🤖 ", Style::default().fg(Color::Green)),
            Span::styled(THINKING, Style::default().fg(Color::Green)),
            Span::styled(dots, Style::default().fg(Color::Yellow)),
        ]);
        buf.set_line(area.x, area.y, &indicator, area.width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_only_while_streaming() {
        let mut streaming = StreamingResponse::new();
        assert_eq!(streaming.partial(), None);

        streaming.start_streaming();
        assert_eq!(streaming.partial(), None);
        streaming.push_delta("상윤아");
        streaming.push_delta(" 내말을");
        assert_eq!(streaming.partial(), Some("상윤아 내말을"));

        streaming.clear();
        assert!(!streaming.is_streaming());
        assert_eq!(streaming.partial(), None);
    }

    #[test]
    fn test_indicator_renders_only_while_streaming() {
        let area = Rect::new(0, 0, 30, 1);

        let mut idle = Buffer::empty(area);
        StreamingResponse::new().render(area, &mut idle);
        assert_eq!(idle, Buffer::empty(area));

        let mut active = Buffer::empty(area);
        let mut streaming = StreamingResponse::new();
        streaming.start_streaming();
        streaming.render(area, &mut active);
        assert_ne!(active, Buffer::empty(area));
    }
}
