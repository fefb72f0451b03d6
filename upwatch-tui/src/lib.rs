pub mod auth_view;
pub mod dashboard_view;

use anyhow::Result;
use auth_view::{AuthCommand, AuthScreen, render_auth_hints};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use dashboard_view::{DashboardCommand, DashboardScreen, LogLevel, UiMessage, render_logs};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
};
use std::io;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use upwatch_client::ApiClient;
use upwatch_core::{AddOutcome, AuthAction, AuthForm, AuthOutcome, DashboardController, DeleteOutcome, Navigator, Route};

const MAX_LOGS: usize = 500;

/// Navigator that records where the UI should go next; the event loop swaps screens.
#[derive(Debug, Default)]
pub struct ScreenNavigator {
    pending: Mutex<Option<Route>>,
    reload: AtomicBool,
}

impl ScreenNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route requested since the last call, if any. A bare refresh re-enters `current`.
    pub fn take(&self, current: Route) -> Option<Route> {
        let route = self
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        let reload = self.reload.swap(false, Ordering::SeqCst);
        route.or(if reload { Some(current) } else { None })
    }

    fn set(&self, route: Route) {
        *self
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(route);
    }
}

impl Navigator for ScreenNavigator {
    fn replace(&self, route: Route) {
        self.set(route);
    }

    fn push(&self, route: Route) {
        self.set(route);
    }

    fn refresh(&self) {
        self.reload.store(true, Ordering::SeqCst);
    }
}

/// A screen's view of the navigator. Once the screen is left, its requests are dropped.
pub struct ScopedNavigator {
    inner: Arc<ScreenNavigator>,
    cancel: CancellationToken,
}

impl ScopedNavigator {
    pub fn new(inner: Arc<ScreenNavigator>, cancel: CancellationToken) -> Self {
        Self { inner, cancel }
    }

    fn live(&self) -> bool {
        if self.cancel.is_cancelled() {
            tracing::debug!("Ignoring navigation from a screen that is gone");
            return false;
        }
        true
    }
}

impl Navigator for ScopedNavigator {
    fn replace(&self, route: Route) {
        if self.live() {
            self.inner.replace(route);
        }
    }

    fn push(&self, route: Route) {
        if self.live() {
            self.inner.push(route);
        }
    }

    fn refresh(&self) {
        if self.live() {
            self.inner.refresh();
        }
    }
}

/// Run `task` until it finishes or the owning screen is left.
fn spawn_scoped<F>(cancel: &CancellationToken, task: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    let cancel = cancel.clone();
    tokio::spawn(async move {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {}
            _ = task => {}
        }
    });
}

pub enum Screen {
    Auth(AuthScreen),
    Dashboard(DashboardScreen),
}

impl Screen {
    fn cancel(&self) -> &CancellationToken {
        match self {
            Screen::Auth(auth) => &auth.cancel,
            Screen::Dashboard(dashboard) => &dashboard.cancel,
        }
    }
}

pub struct App {
    client: Arc<ApiClient>,
    navigator: Arc<ScreenNavigator>,
    screen: Screen,
    route: Route,
    logs: Vec<(LogLevel, String)>,
    should_quit: bool,
    tx: mpsc::UnboundedSender<UiMessage>,
    rx: mpsc::UnboundedReceiver<UiMessage>,
}

impl App {
    /// Start on the dashboard; a missing or stale session bounces to login.
    pub fn new(client: Arc<ApiClient>) -> Self {
        let navigator = Arc::new(ScreenNavigator::new());
        let (tx, rx) = mpsc::unbounded_channel();
        let screen = Self::build_screen(&client, &navigator, Route::Dashboard);

        let mut app = Self {
            client,
            navigator,
            screen,
            route: Route::Dashboard,
            logs: Vec::new(),
            should_quit: false,
            tx,
            rx,
        };
        app.start_dashboard();
        app
    }

    fn build_screen(client: &Arc<ApiClient>, navigator: &Arc<ScreenNavigator>, route: Route) -> Screen {
        let cancel = CancellationToken::new();
        let nav: Arc<dyn Navigator> = Arc::new(ScopedNavigator::new(navigator.clone(), cancel.clone()));
        match route {
            Route::Dashboard => {
                let controller = Arc::new(DashboardController::new(client.clone(), nav));
                Screen::Dashboard(DashboardScreen::new(
                    controller,
                    cancel,
                    client.config().base_url().as_str(),
                ))
            }
            Route::Login => Screen::Auth(AuthScreen::new(
                AuthForm::new(AuthAction::Login, client.clone(), nav),
                cancel,
            )),
            Route::Register => Screen::Auth(AuthScreen::new(
                AuthForm::new(AuthAction::Register, client.clone(), nav),
                cancel,
            )),
        }
    }

    fn start_dashboard(&self) {
        if let Screen::Dashboard(ref dashboard) = self.screen {
            let controller = dashboard.controller.clone();
            let cancel = dashboard.cancel.clone();
            tokio::spawn(async move {
                controller.mount(&cancel).await;
            });
        }
    }

    fn navigate(&mut self, route: Route) {
        // Stops the old screen's actions and silences their navigation
        self.screen.cancel().cancel();

        tracing::debug!("Navigating to {}", route.path());
        self.screen = Self::build_screen(&self.client, &self.navigator, route);
        self.route = route;
        self.start_dashboard();
    }

    pub fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        self.logs.push((level, message.into()));
        if self.logs.len() > MAX_LOGS {
            self.logs.drain(0..self.logs.len() - MAX_LOGS);
        }
    }

    /// Drain background messages, pick up navigation, and refresh the dashboard snapshot.
    async fn tick(&mut self) {
        while let Ok(msg) = self.rx.try_recv() {
            match msg {
                UiMessage::Log { level, message } => self.log(level, message),
                UiMessage::TargetAdded => {
                    if let Screen::Dashboard(ref mut dashboard) = self.screen {
                        dashboard.clear_form();
                    }
                }
                UiMessage::AuthSettled { error } => {
                    if let Screen::Auth(ref mut auth) = self.screen {
                        auth.settle(error);
                    }
                }
            }
        }

        if let Some(route) = self.navigator.take(self.route) {
            self.navigate(route);
        }

        if let Screen::Dashboard(ref mut dashboard) = self.screen {
            let state = dashboard.controller.snapshot().await;
            dashboard.sync_state(state);
        }
    }

    fn handle_key(&mut self, code: KeyCode) {
        let command = match self.screen {
            Screen::Auth(ref mut auth) => match auth.handle_key(code) {
                AuthCommand::None => return,
                AuthCommand::Quit => {
                    self.should_quit = true;
                    return;
                }
                AuthCommand::SwitchAction => {
                    let route = auth.form.action().other().route();
                    self.navigate(route);
                    return;
                }
                AuthCommand::Submit => {
                    let mut form = auth.begin_submit();
                    let tx = self.tx.clone();
                    tokio::spawn(async move {
                        let error = match form.submit().await {
                            AuthOutcome::SignedIn(user) => {
                                let email = user.map(|user| user.email).unwrap_or(form.email);
                                let _ = tx.send(UiMessage::Log {
                                    level: LogLevel::Info,
                                    message: format!("Signed in as {}", email),
                                });
                                None
                            }
                            AuthOutcome::Failed(message) => Some(message),
                        };
                        let _ = tx.send(UiMessage::AuthSettled { error });
                    });
                    return;
                }
            },
            Screen::Dashboard(ref mut dashboard) => dashboard.handle_key(code),
        };

        let Screen::Dashboard(ref dashboard) = self.screen else {
            return;
        };
        let controller = dashboard.controller.clone();
        let cancel = dashboard.cancel.clone();
        let tx = self.tx.clone();

        match command {
            DashboardCommand::None => {}
            DashboardCommand::Quit => self.should_quit = true,
            DashboardCommand::Refresh => {
                spawn_scoped(&cancel, async move {
                    controller.refresh().await;
                });
            }
            DashboardCommand::Add { url, name } => {
                spawn_scoped(&cancel, async move {
                    let outcome = controller.add_target(&url, &name).await;
                    let msg = match outcome {
                        AddOutcome::Added => {
                            let _ = tx.send(UiMessage::TargetAdded);
                            Some((LogLevel::Info, format!("Added {}", url.trim())))
                        }
                        AddOutcome::Failed(message) => Some((LogLevel::Error, message)),
                        AddOutcome::Invalid(_) | AddOutcome::SignedOut | AddOutcome::Busy => None,
                    };
                    if let Some((level, message)) = msg {
                        let _ = tx.send(UiMessage::Log { level, message });
                    }
                });
            }
            DashboardCommand::Delete(id) => {
                spawn_scoped(&cancel, async move {
                    let msg = match controller.delete_target(id).await {
                        DeleteOutcome::Deleted => Some((LogLevel::Info, format!("Deleted target {}", id))),
                        DeleteOutcome::Failed(message) => Some((LogLevel::Error, message)),
                        DeleteOutcome::Blocked => {
                            Some((LogLevel::Warn, "Another delete is still in progress".to_string()))
                        }
                        DeleteOutcome::SignedOut => None,
                    };
                    if let Some((level, message)) = msg {
                        let _ = tx.send(UiMessage::Log { level, message });
                    }
                });
            }
            DashboardCommand::Logout => {
                spawn_scoped(&cancel, async move {
                    if let Err(e) = controller.logout().await {
                        let _ = tx.send(UiMessage::Log {
                            level: LogLevel::Warn,
                            message: format!("Logout request failed: {}", e),
                        });
                    }
                });
            }
        }
    }
}

/// Run the interactive terminal UI until the user quits.
pub async fn run(client: Arc<ApiClient>) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(client);
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        app.tick().await;
        terminal.draw(|f| ui(f, app))?;

        if app.should_quit {
            app.screen.cancel().cancel();
            return Ok(());
        }

        if !event::poll(std::time::Duration::from_millis(100))? {
            continue;
        }

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                app.should_quit = true;
                continue;
            }

            app.handle_key(key.code);
        }
    }
}

fn ui(f: &mut Frame, app: &App) {
    match app.screen {
        Screen::Dashboard(ref dashboard) => dashboard.render(f, f.area(), &app.logs),
        Screen::Auth(ref auth) => {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Min(16),   // Form
                    Constraint::Length(6), // Logs
                    Constraint::Length(1), // Hints
                ])
                .split(f.area());

            auth.render(f, chunks[0]);
            render_logs(f, chunks[1], &app.logs);
            render_auth_hints(f, chunks[2]);
        }
    }
}
