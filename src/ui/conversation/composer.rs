use crate::prompts::INPUT_PLACEHOLDER;
use crate::ui::conversation::commands::{
    command_entries, parse_slash_command, CommandEntry, ParsedCommand,
};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Result returned when the user interacts with the conversation composer
#[derive(Debug, PartialEq)]
pub enum ConversationResult {
    Submitted(String),
    Command(ParsedCommand),
    None,
}

/// State for the text area within the composer.
///
/// `cursor` counts characters, not bytes.
#[derive(Debug, Clone, Default)]
pub struct TextAreaState {
    pub content: String,
    pub cursor: usize,
}

impl TextAreaState {
    fn byte_offset(&self, cursor: usize) -> usize {
        self.content
            .char_indices()
            .nth(cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.content.len())
    }

    fn char_len(&self) -> usize {
        self.content.chars().count()
    }

    fn insert(&mut self, c: char) {
        let at = self.byte_offset(self.cursor);
        self.content.insert(at, c);
        self.cursor += 1;
    }

    fn insert_str(&mut self, text: &str) {
        let at = self.byte_offset(self.cursor);
        self.content.insert_str(at, text);
        self.cursor += text.chars().count();
    }

    /// Delete character before cursor
    fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        let at = self.byte_offset(self.cursor);
        self.content.remove(at);
        true
    }

    /// Delete character at cursor
    fn delete(&mut self) -> bool {
        if self.cursor >= self.char_len() {
            return false;
        }
        let at = self.byte_offset(self.cursor);
        self.content.remove(at);
        true
    }

    fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.content)
    }
}

/// Conversation composer for user input
#[derive(Clone)]
pub struct ConversationComposer {
    state: TextAreaState,
    placeholder: String,
    /// While locked, Enter does not submit (a reply is pending)
    locked: bool,
    command_entries: Vec<CommandEntry>,
    filtered_commands: Vec<CommandEntry>,
    show_command_palette: bool,
    selected_command: Option<usize>,
}

impl Default for ConversationComposer {
    fn default() -> Self {
        Self::new(INPUT_PLACEHOLDER.to_string())
    }
}

impl ConversationComposer {
    pub fn new(placeholder: String) -> Self {
        Self {
            state: TextAreaState::default(),
            placeholder,
            locked: false,
            command_entries: command_entries(),
            filtered_commands: Vec::new(),
            show_command_palette: false,
            selected_command: None,
        }
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ConversationResult {
        if key.kind != KeyEventKind::Press {
            return ConversationResult::None;
        }

        match key.code {
            KeyCode::Enter => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    self.state.insert('\n');
                } else if self.show_command_palette {
                    self.apply_selected_command();
                } else if !self.locked && !self.state.content.trim().is_empty() {
                    let content = self.state.take();
                    self.close_command_palette();
                    return match parse_slash_command(&content) {
                        Some(command) => ConversationResult::Command(command),
                        None => ConversationResult::Submitted(content),
                    };
                }
            }
            KeyCode::Up if self.show_command_palette => self.move_command_selection(-1),
            KeyCode::Down if self.show_command_palette => self.move_command_selection(1),
            KeyCode::Esc if self.show_command_palette => self.close_command_palette(),
            KeyCode::Tab if self.show_command_palette => {
                self.apply_selected_command();
            }
            KeyCode::Char(c) => {
                self.state.insert(c);
                self.sync_command_palette();
            }
            KeyCode::Backspace => {
                if self.state.backspace() {
                    self.sync_command_palette();
                }
            }
            KeyCode::Delete => {
                if self.state.delete() {
                    self.sync_command_palette();
                }
            }
            KeyCode::Left => {
                self.state.cursor = self.state.cursor.saturating_sub(1);
            }
            KeyCode::Right => {
                if self.state.cursor < self.state.char_len() {
                    self.state.cursor += 1;
                }
            }
            KeyCode::Home => {
                self.state.cursor = 0;
            }
            KeyCode::End => {
                self.state.cursor = self.state.char_len();
            }
            _ => {}
        }

        ConversationResult::None
    }

    /// Insert pasted text at the cursor
    pub fn paste(&mut self, text: &str) {
        self.state.insert_str(&text.replace("\r\n", "\n"));
        self.sync_command_palette();
    }

    /// The palette is open while the input is a bare `/keyword`
    fn sync_command_palette(&mut self) {
        let content = &self.state.content;
        let wants_palette = content.starts_with('/') && !content.contains(char::is_whitespace);
        if wants_palette {
            if !self.show_command_palette {
                self.show_command_palette = true;
                self.selected_command = Some(0);
            }
            self.refresh_command_palette();
        } else {
            self.close_command_palette();
        }
    }

    fn close_command_palette(&mut self) {
        self.show_command_palette = false;
        self.filtered_commands.clear();
        self.selected_command = None;
    }

    fn refresh_command_palette(&mut self) {
        let query = self.state.content.trim_start_matches('/').to_lowercase();
        self.filtered_commands = self
            .command_entries
            .iter()
            .filter(|entry| query.is_empty() || entry.keyword.starts_with(&query))
            .copied()
            .collect();

        if self.filtered_commands.is_empty() {
            self.selected_command = None;
        } else {
            let index = self.selected_command.unwrap_or(0);
            self.selected_command = Some(index.min(self.filtered_commands.len() - 1));
        }
    }

    fn move_command_selection(&mut self, delta: isize) {
        if self.filtered_commands.is_empty() {
            self.selected_command = None;
            return;
        }

        let current = self.selected_command.unwrap_or(0) as isize;
        let len = self.filtered_commands.len() as isize;
        let next = (current + delta).rem_euclid(len);
        self.selected_command = Some(next as usize);
    }

    fn apply_selected_command(&mut self) -> bool {
        let Some(entry) = self
            .selected_command
            .and_then(|index| self.filtered_commands.get(index))
            .copied()
        else {
            self.close_command_palette();
            return false;
        };

        self.state.content = format!("/{}", entry.keyword);
        self.state.cursor = self.state.char_len();
        self.close_command_palette();
        true
    }

    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    /// Get current content
    pub fn content(&self) -> &str {
        &self.state.content
    }

    pub fn is_palette_open(&self) -> bool {
        self.show_command_palette
    }
}

impl Widget for ConversationComposer {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let state = &self.state;

        let block = Block::default()
            .borders(Borders::ALL)
            .title("💬 메시지")
            .style(if !self.locked {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::Gray)
            });

        let inner_area = block.inner(area);
        block.render(area, buf);

        if state.content.is_empty() {
            let placeholder_line = Line::from(vec![Span::styled(
                self.placeholder.as_str(),
                Style::default().fg(Color::DarkGray),
            )]);
            buf.set_line(inner_area.x, inner_area.y, &placeholder_line, inner_area.width);
        } else {
            let cursor_at = state.byte_offset(state.cursor);
            let mut content = state.content.clone();
            content.insert(cursor_at, '▌');

            // scroll so the line holding the cursor is the lowest visible one
            let cursor_line = state.content[..cursor_at].matches('\n').count();
            let lines: Vec<&str> = content.split('\n').collect();
            let height = inner_area.height as usize;
            let start = (cursor_line + 1).saturating_sub(height);
            for (i, line_text) in lines[start..].iter().take(height).enumerate() {
                let line = Line::from(vec![Span::raw(*line_text)]);
                buf.set_line(inner_area.x, inner_area.y + i as u16, &line, inner_area.width);
            }
        }

        if self.show_command_palette && !self.filtered_commands.is_empty() {
            let palette_height = (self.filtered_commands.len().min(5) + 2) as u16;
            let palette_area = Rect {
                x: area.x,
                y: area.y.saturating_sub(palette_height),
                width: area.width,
                height: palette_height.min(area.y),
            };
            if palette_area.height < 3 {
                return;
            }

            let block = Block::default()
                .borders(Borders::ALL)
                .title("Commands")
                .style(Style::default().fg(Color::Blue));
            let inner = block.inner(palette_area);
            block.render(palette_area, buf);

            for (index, entry) in self.filtered_commands.iter().enumerate() {
                if index >= inner.height as usize {
                    break;
                }

                let style = if self.selected_command == Some(index) {
                    Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::White)
                };

                let line = Line::from(vec![
                    Span::styled(format!("/{}", entry.keyword), style),
                    Span::styled(" - ", Style::default().fg(Color::DarkGray)),
                    Span::styled(entry.description, Style::default().fg(Color::Gray)),
                ]);

                buf.set_line(inner.x, inner.y + index as u16, &line, inner.width);
            }
        }
    }
}
