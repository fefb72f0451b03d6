use crossterm::event::KeyCode;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use tokio_util::sync::CancellationToken;
use upwatch_core::{AuthAction, AuthForm};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AuthField {
    Email,
    Password,
}

/// What the app loop should do after a key press on the auth screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AuthCommand {
    None,
    Submit,
    SwitchAction,
    Quit,
}

pub struct AuthScreen {
    pub form: AuthForm,
    pub focus: AuthField,
    pub cancel: CancellationToken,
}

impl AuthScreen {
    pub fn new(form: AuthForm, cancel: CancellationToken) -> Self {
        Self {
            form,
            focus: AuthField::Email,
            cancel,
        }
    }

    /// Mark the form busy and hand back a copy to submit off the UI loop.
    pub fn begin_submit(&mut self) -> AuthForm {
        self.form.error = None;
        self.form.loading = true;
        self.form.clone()
    }

    pub fn settle(&mut self, error: Option<String>) {
        self.form.loading = false;
        self.form.error = error;
    }

    fn focused_input(&mut self) -> &mut String {
        match self.focus {
            AuthField::Email => &mut self.form.email,
            AuthField::Password => &mut self.form.password,
        }
    }

    pub fn handle_key(&mut self, code: KeyCode) -> AuthCommand {
        // Inputs are disabled while a request is out.
        if self.form.loading {
            return AuthCommand::None;
        }

        match code {
            KeyCode::Esc => AuthCommand::Quit,
            KeyCode::F(2) => AuthCommand::SwitchAction,
            KeyCode::Tab | KeyCode::Down | KeyCode::Up | KeyCode::BackTab => {
                self.focus = match self.focus {
                    AuthField::Email => AuthField::Password,
                    AuthField::Password => AuthField::Email,
                };
                AuthCommand::None
            }
            KeyCode::Enter => AuthCommand::Submit,
            KeyCode::Backspace => {
                self.focused_input().pop();
                AuthCommand::None
            }
            KeyCode::Char(c) => {
                self.focused_input().push(c);
                AuthCommand::None
            }
            _ => AuthCommand::None,
        }
    }

    pub fn render(&self, f: &mut Frame, area: Rect) {
        let action = self.form.action();
        let panel = centered(area, 60, 14);

        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", action.title()))
            .border_style(Style::default().fg(Color::Cyan));
        let inner = block.inner(panel);
        f.render_widget(block, panel);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Email
                Constraint::Length(3), // Password
                Constraint::Length(2), // Error / busy
                Constraint::Min(1),    // Switch hint
            ])
            .split(inner);

        self.render_input(f, chunks[0], "Email", &self.form.email, AuthField::Email);
        let masked = "•".repeat(self.form.password.chars().count());
        self.render_input(f, chunks[1], "Password", &masked, AuthField::Password);

        let status = if self.form.loading {
            Paragraph::new(action.busy_label()).style(Style::default().fg(Color::Yellow))
        } else if let Some(ref error) = self.form.error {
            Paragraph::new(error.as_str())
                .style(Style::default().fg(Color::Red))
                .wrap(Wrap { trim: true })
        } else {
            Paragraph::new("")
        };
        f.render_widget(status, chunks[2]);

        let switch = match action {
            AuthAction::Login => "No account? Press F2 to register",
            AuthAction::Register => "Already have an account? Press F2 to log in",
        };
        f.render_widget(
            Paragraph::new(switch).style(Style::default().fg(Color::DarkGray)),
            chunks[3],
        );

        let cursor_chunk = match self.focus {
            AuthField::Email => chunks[0],
            AuthField::Password => chunks[1],
        };
        let typed = match self.focus {
            AuthField::Email => self.form.email.chars().count(),
            AuthField::Password => self.form.password.chars().count(),
        };
        f.set_cursor_position((cursor_chunk.x + 1 + typed as u16, cursor_chunk.y + 1));
    }

    fn render_input(&self, f: &mut Frame, area: Rect, label: &str, value: &str, field: AuthField) {
        let border = if self.focus == field {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let input = Paragraph::new(value.to_string()).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", label))
                .border_style(border),
        );
        f.render_widget(input, area);
    }
}

pub fn render_auth_hints(f: &mut Frame, area: Rect) {
    let key = Style::default().fg(Color::Black).bg(Color::Gray);
    let hints = Line::from(vec![
        Span::styled(" Tab ", key),
        Span::raw(" Next field  "),
        Span::styled(" Enter ", key),
        Span::raw(" Submit  "),
        Span::styled(" F2 ", key),
        Span::raw(" Login/Register  "),
        Span::styled(" ESC ", key),
        Span::raw(" Quit"),
    ]);
    f.render_widget(
        Paragraph::new(hints).style(Style::default().bg(Color::Black).fg(Color::Gray).add_modifier(Modifier::DIM)),
        area,
    );
}

/// A `width` x `height` rectangle centred in `area`, clipped to fit.
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{Terminal, backend::TestBackend};
    use std::sync::Arc;
    use upwatch_client::{ApiClient, ApiConfig};
    use upwatch_core::RecordingNavigator;

    fn screen() -> AuthScreen {
        let client = Arc::new(ApiClient::new(ApiConfig::new("http://127.0.0.1:9").unwrap()).unwrap());
        let form = AuthForm::new(AuthAction::Login, client, Arc::new(RecordingNavigator::new()));
        AuthScreen::new(form, CancellationToken::new())
    }

    fn draw(screen: &AuthScreen) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal.draw(|f| screen.render(f, f.area())).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_typing_fills_focused_field() {
        let mut screen = screen();
        for c in "a@b.io".chars() {
            screen.handle_key(KeyCode::Char(c));
        }
        screen.handle_key(KeyCode::Tab);
        screen.handle_key(KeyCode::Char('x'));

        assert_eq!(screen.form.email, "a@b.io");
        assert_eq!(screen.form.password, "x");
        assert_eq!(screen.handle_key(KeyCode::Enter), AuthCommand::Submit);
    }

    #[test]
    fn test_pending_submit_shows_busy_label_and_locks_inputs() {
        let mut screen = screen();
        screen.form.email = "a@b.io".to_string();
        screen.form.error = Some("Invalid credentials".to_string());

        let submitted = screen.begin_submit();
        assert_eq!(submitted.email, "a@b.io");
        assert!(screen.form.loading);
        assert_eq!(screen.form.error, None);
        assert!(draw(&screen).contains("Logging in…"));

        assert_eq!(screen.handle_key(KeyCode::Enter), AuthCommand::None);
        assert_eq!(screen.handle_key(KeyCode::Esc), AuthCommand::None);
        screen.handle_key(KeyCode::Char('z'));
        assert_eq!(screen.form.email, "a@b.io");
    }

    #[test]
    fn test_settled_failure_shows_error_and_unlocks() {
        let mut screen = screen();
        screen.begin_submit();
        screen.settle(Some("Invalid credentials".to_string()));

        assert!(!screen.form.loading);
        assert!(draw(&screen).contains("Invalid credentials"));
        assert_eq!(screen.handle_key(KeyCode::Enter), AuthCommand::Submit);
    }
}
