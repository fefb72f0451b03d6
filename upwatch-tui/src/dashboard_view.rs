use crossterm::event::KeyCode;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use upwatch_core::row::PLACEHOLDER;
use upwatch_core::{DashboardController, DashboardState, Liveness, Phase, ViewRow};

/// Message types for communication between background actions and the TUI
#[derive(Debug, Clone)]
pub enum UiMessage {
    Log { level: LogLevel, message: String },
    /// The add form was accepted; clear the inputs and leave edit mode.
    TargetAdded,
    /// A login/register request came back. `None` means it went through.
    AuthSettled { error: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputMode {
    Browse,
    Url,
    Name,
}

/// What the app loop should do after a key press on the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardCommand {
    None,
    Refresh,
    Add { url: String, name: String },
    Delete(i64),
    Logout,
    Quit,
}

pub struct DashboardScreen {
    pub controller: Arc<DashboardController>,
    /// Cancelled when the screen is left, so a late initial load is discarded.
    pub cancel: CancellationToken,
    pub state: DashboardState,
    pub selected: usize,
    pub mode: InputMode,
    pub url_input: String,
    pub name_input: String,
    pub api_url: String,
}

impl DashboardScreen {
    /// `cancel` is the screen's lifetime: it fires when the user leaves the dashboard.
    pub fn new(controller: Arc<DashboardController>, cancel: CancellationToken, api_url: impl Into<String>) -> Self {
        Self {
            controller,
            cancel,
            state: DashboardState::default(),
            selected: 0,
            mode: InputMode::Browse,
            url_input: String::new(),
            name_input: String::new(),
            api_url: api_url.into(),
        }
    }

    /// Take a fresh snapshot from the controller and keep the selection in range.
    pub fn sync_state(&mut self, state: DashboardState) {
        self.state = state;
        if self.selected >= self.state.rows.len() {
            self.selected = self.state.rows.len().saturating_sub(1);
        }
    }

    pub fn selected_row(&self) -> Option<&ViewRow> {
        self.state.rows.get(self.selected)
    }

    pub fn clear_form(&mut self) {
        self.url_input.clear();
        self.name_input.clear();
        self.mode = InputMode::Browse;
    }

    pub fn handle_key(&mut self, code: KeyCode) -> DashboardCommand {
        match self.mode {
            InputMode::Browse => self.handle_browse_key(code),
            InputMode::Url | InputMode::Name => self.handle_form_key(code),
        }
    }

    fn handle_browse_key(&mut self, code: KeyCode) -> DashboardCommand {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => DashboardCommand::Quit,
            KeyCode::Char('r') => DashboardCommand::Refresh,
            KeyCode::Char('l') => DashboardCommand::Logout,
            KeyCode::Char('a') => {
                self.mode = InputMode::Url;
                DashboardCommand::None
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if !self.state.can_delete() {
                    return DashboardCommand::None;
                }
                match self.selected_row() {
                    Some(row) => DashboardCommand::Delete(row.id()),
                    None => DashboardCommand::None,
                }
            }
            KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
                DashboardCommand::None
            }
            KeyCode::Down => {
                if self.selected + 1 < self.state.rows.len() {
                    self.selected += 1;
                }
                DashboardCommand::None
            }
            KeyCode::Home => {
                self.selected = 0;
                DashboardCommand::None
            }
            KeyCode::End => {
                self.selected = self.state.rows.len().saturating_sub(1);
                DashboardCommand::None
            }
            _ => DashboardCommand::None,
        }
    }

    fn handle_form_key(&mut self, code: KeyCode) -> DashboardCommand {
        match code {
            KeyCode::Esc => {
                self.mode = InputMode::Browse;
                DashboardCommand::None
            }
            KeyCode::Tab | KeyCode::BackTab => {
                self.mode = match self.mode {
                    InputMode::Url => InputMode::Name,
                    _ => InputMode::Url,
                };
                DashboardCommand::None
            }
            KeyCode::Enter => {
                if self.state.form.submitting {
                    return DashboardCommand::None;
                }
                DashboardCommand::Add {
                    url: self.url_input.clone(),
                    name: self.name_input.clone(),
                }
            }
            KeyCode::Backspace => {
                self.focused_input().pop();
                DashboardCommand::None
            }
            KeyCode::Char(c) => {
                self.focused_input().push(c);
                DashboardCommand::None
            }
            _ => DashboardCommand::None,
        }
    }

    fn focused_input(&mut self) -> &mut String {
        match self.mode {
            InputMode::Name => &mut self.name_input,
            _ => &mut self.url_input,
        }
    }

    pub fn render(&self, f: &mut Frame, area: Rect, logs: &[(LogLevel, String)]) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Header
                Constraint::Length(5), // Add form
                Constraint::Min(5),    // Targets
                Constraint::Length(6), // Logs
                Constraint::Length(1), // Hints
            ])
            .split(area);

        self.render_header(f, chunks[0]);
        self.render_form(f, chunks[1]);
        self.render_targets(f, chunks[2]);
        render_logs(f, chunks[3], logs);
        self.render_hints(f, chunks[4]);
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let header = Line::from(vec![
            Span::styled(
                " Dashboard ",
                Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::raw(" "),
            Span::styled(self.api_url.clone(), Style::default().fg(Color::DarkGray)),
        ]);
        f.render_widget(Paragraph::new(header), area);
    }

    fn render_form(&self, f: &mut Frame, area: Rect) {
        let editing = self.mode != InputMode::Browse;
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Add target ")
            .border_style(Style::default().fg(if editing { Color::Yellow } else { Color::DarkGray }));
        let inner = block.inner(area);
        f.render_widget(block, area);

        let field = |label: &'static str, value: &str, active: bool| {
            let style = if active {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            Line::from(vec![
                Span::styled(format!("{:<6}", label), style),
                Span::raw(value.to_string()),
            ])
        };

        let mut lines = vec![
            field("URL", &self.url_input, self.mode == InputMode::Url),
            field("Name", &self.name_input, self.mode == InputMode::Name),
        ];
        if self.state.form.submitting {
            lines.push(Line::from(Span::styled("Adding…", Style::default().fg(Color::Yellow))));
        } else if let Some(ref error) = self.state.form.error {
            lines.push(Line::from(Span::styled(error.clone(), Style::default().fg(Color::Red))));
        }

        f.render_widget(Paragraph::new(lines), inner);

        if editing {
            let (row, typed) = match self.mode {
                InputMode::Name => (1, self.name_input.chars().count()),
                _ => (0, self.url_input.chars().count()),
            };
            f.set_cursor_position((inner.x + 6 + typed as u16, inner.y + row));
        }
    }

    fn render_targets(&self, f: &mut Frame, area: Rect) {
        let title = match self.state.phase {
            Phase::Ready => format!(" Targets ({}) ", self.state.rows.len()),
            _ => " Targets ".to_string(),
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(Style::default().fg(Color::Cyan));
        let inner = block.inner(area);
        f.render_widget(block, area);

        let mut banner: Vec<Line> = Vec::new();
        if let Some(error) = self.state.error() {
            banner.push(Line::from(Span::styled(error.to_string(), Style::default().fg(Color::Red))));
        }
        if let Some(ref error) = self.state.delete_error {
            banner.push(Line::from(Span::styled(error.clone(), Style::default().fg(Color::Red))));
        }

        let message = match self.state.phase {
            Phase::Loading => Some("Loading…"),
            Phase::AuthFailed => Some("Session expired. Redirecting to login…"),
            _ if self.state.rows.is_empty() && self.state.error().is_none() => {
                Some("No targets yet. Press 'a' to add one.")
            }
            _ => None,
        };

        if let Some(message) = message {
            banner.push(Line::from(Span::styled(message, Style::default().fg(Color::DarkGray))));
        }

        let banner_height = banner.len() as u16;
        if banner_height > 0 {
            f.render_widget(
                Paragraph::new(banner).wrap(Wrap { trim: true }),
                Rect {
                    height: banner_height.min(inner.height),
                    ..inner
                },
            );
        }

        if self.state.rows.is_empty() {
            return;
        }

        let list_area = Rect {
            y: inner.y + banner_height.min(inner.height),
            height: inner.height.saturating_sub(banner_height),
            ..inner
        };
        let height = list_area.height as usize;
        if height == 0 {
            return;
        }

        // Keep the selected row in view
        let scroll_offset = self.selected.saturating_sub(height.saturating_sub(1));

        let items: Vec<ListItem> = self
            .state
            .rows
            .iter()
            .enumerate()
            .skip(scroll_offset)
            .take(height)
            .map(|(idx, row)| self.row_item(idx, row))
            .collect();

        f.render_widget(List::new(items), list_area);
    }

    fn row_item(&self, idx: usize, row: &ViewRow) -> ListItem<'static> {
        let liveness = row.liveness();
        let status_color = match liveness {
            Liveness::Up => Color::Green,
            Liveness::Down => Color::Red,
            Liveness::Unknown => Color::DarkGray,
        };

        let code = row
            .status_code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| PLACEHOLDER.to_string());
        let action = if self.state.deleting == Some(row.id()) {
            "…"
        } else {
            "Delete"
        };
        let action_style = if self.state.can_delete() {
            Style::default().fg(Color::Red)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        let mut spans = vec![
            Span::styled(format!("{:<8}", liveness.badge()), Style::default().fg(status_color)),
            Span::raw(format!("{:<32} ", truncate(row.label(), 32))),
            Span::styled(format!("{:<20} ", row.last_checked()), Style::default().fg(Color::Gray)),
            Span::styled(format!("{:>4} ", code), Style::default().fg(Color::Cyan)),
            Span::styled(action, action_style),
        ];
        if let Some(error) = row.error() {
            spans.push(Span::styled(format!("  {}", error), Style::default().fg(Color::Red)));
        }

        let style = if idx == self.selected {
            Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        ListItem::new(Line::from(spans)).style(style)
    }

    fn render_hints(&self, f: &mut Frame, area: Rect) {
        let key = Style::default().fg(Color::Black).bg(Color::Gray);
        let hints = if self.mode == InputMode::Browse {
            Line::from(vec![
                Span::styled(" a ", key),
                Span::raw(" Add  "),
                Span::styled(" d ", key),
                Span::raw(" Delete  "),
                Span::styled(" r ", key),
                Span::raw(" Refresh  "),
                Span::styled(" ↑/↓ ", key),
                Span::raw(" Select  "),
                Span::styled(" l ", key),
                Span::raw(" Logout  "),
                Span::styled(" q/ESC ", key),
                Span::raw(" Quit"),
            ])
        } else {
            Line::from(vec![
                Span::styled(" Tab ", key),
                Span::raw(" URL/Name  "),
                Span::styled(" Enter ", key),
                Span::raw(" Add  "),
                Span::styled(" ESC ", key),
                Span::raw(" Cancel"),
            ])
        };

        f.render_widget(
            Paragraph::new(hints).style(Style::default().bg(Color::Black).fg(Color::Gray)),
            area,
        );
    }
}

pub fn render_logs(f: &mut Frame, area: Rect, logs: &[(LogLevel, String)]) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Logs ")
        .border_style(Style::default().fg(Color::Magenta));

    let inner = block.inner(area);
    f.render_widget(block, area);

    // Always pinned to the newest entries
    let height = inner.height as usize;
    let items: Vec<ListItem> = logs
        .iter()
        .skip(logs.len().saturating_sub(height))
        .map(|(level, message)| {
            let (prefix, style) = match level {
                LogLevel::Info => ("INFO ", Style::default().fg(Color::Blue)),
                LogLevel::Warn => ("WARN ", Style::default().fg(Color::Yellow)),
                LogLevel::Error => ("ERROR", Style::default().fg(Color::Red)),
            };
            ListItem::new(format!("[{}] {}", prefix, message)).style(style)
        })
        .collect();

    f.render_widget(List::new(items), inner);
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{Terminal, backend::TestBackend};
    use upwatch_client::{ApiClient, ApiConfig, Target, TargetStatus};
    use upwatch_core::RecordingNavigator;

    fn screen() -> DashboardScreen {
        let client = Arc::new(ApiClient::new(ApiConfig::new("http://127.0.0.1:9").unwrap()).unwrap());
        let controller = Arc::new(DashboardController::new(client, Arc::new(RecordingNavigator::new())));
        DashboardScreen::new(controller, CancellationToken::new(), "http://127.0.0.1:9")
    }

    fn ready(rows: Vec<ViewRow>) -> DashboardState {
        DashboardState {
            phase: Phase::Ready,
            rows,
            ..DashboardState::default()
        }
    }

    fn bare(id: i64, url: &str) -> ViewRow {
        ViewRow::Bare(Target {
            id,
            url: url.to_string(),
            name: None,
            created_at: "2026-01-01T00:00:00Z".to_string(),
        })
    }

    fn draw(screen: &DashboardScreen) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 24)).unwrap();
        terminal.draw(|f| screen.render(f, f.area(), &[])).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_delete_key_targets_selected_row() {
        let mut screen = screen();
        screen.sync_state(ready(vec![bare(1, "https://a.example"), bare(2, "https://b.example")]));

        screen.handle_key(KeyCode::Down);
        assert_eq!(screen.handle_key(KeyCode::Char('d')), DashboardCommand::Delete(2));
    }

    #[test]
    fn test_delete_key_ignored_while_delete_pending() {
        let mut screen = screen();
        let mut state = ready(vec![bare(1, "https://a.example"), bare(2, "https://b.example")]);
        state.deleting = Some(1);
        screen.sync_state(state);

        screen.handle_key(KeyCode::Down);
        assert_eq!(screen.handle_key(KeyCode::Char('d')), DashboardCommand::None);
    }

    #[test]
    fn test_form_collects_url_and_name() {
        let mut screen = screen();
        screen.sync_state(ready(Vec::new()));

        screen.handle_key(KeyCode::Char('a'));
        for c in "https://x.io".chars() {
            screen.handle_key(KeyCode::Char(c));
        }
        screen.handle_key(KeyCode::Tab);
        screen.handle_key(KeyCode::Char('X'));

        assert_eq!(
            screen.handle_key(KeyCode::Enter),
            DashboardCommand::Add {
                url: "https://x.io".to_string(),
                name: "X".to_string()
            }
        );

        // 'q' is text while editing, not quit
        assert_eq!(screen.handle_key(KeyCode::Char('q')), DashboardCommand::None);
        assert_eq!(screen.name_input, "Xq");
    }

    #[test]
    fn test_selection_clamped_when_rows_shrink() {
        let mut screen = screen();
        screen.sync_state(ready(vec![bare(1, "https://a.example"), bare(2, "https://b.example")]));
        screen.handle_key(KeyCode::End);
        assert_eq!(screen.selected, 1);

        screen.sync_state(ready(vec![bare(1, "https://a.example")]));
        assert_eq!(screen.selected, 0);
    }

    #[test]
    fn test_render_loading_and_empty() {
        let mut screen = screen();
        assert!(draw(&screen).contains("Loading…"));

        screen.sync_state(ready(Vec::new()));
        assert!(draw(&screen).contains("No targets yet"));
    }

    #[test]
    fn test_render_rows_with_pending_delete() {
        let mut screen = screen();
        let mut state = ready(vec![
            ViewRow::Enriched(TargetStatus {
                id: 1,
                url: "https://a.example".to_string(),
                name: Some("A".to_string()),
                is_up: Some(true),
                checked_at: None,
                status_code: Some(200),
                error: None,
            }),
            bare(2, "https://b.example"),
        ]);
        state.deleting = Some(2);
        screen.sync_state(state);

        let screen_text = draw(&screen);
        assert!(screen_text.contains("Up"));
        assert!(screen_text.contains("200"));
        assert!(screen_text.contains("https://b.example"));
        assert!(screen_text.contains("…"));
    }

    #[test]
    fn test_render_error_banner() {
        let mut screen = screen();
        screen.sync_state(DashboardState {
            phase: Phase::Errored("Status 500".to_string()),
            ..DashboardState::default()
        });
        assert!(draw(&screen).contains("Status 500"));
    }
}
