use anyhow::{Result, anyhow, bail};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use upwatch_client::config::default_session_path;
use upwatch_client::{ApiClient, ApiConfig, SessionStore, User};
use upwatch_core::report::{generate_json_report, generate_targets_report};
use upwatch_core::{
    AddOutcome, AuthAction, AuthForm, AuthOutcome, DashboardController, DashboardState, DeleteOutcome, MountOutcome,
    Navigator, Phase, Route, ViewRow,
};

pub const NOT_LOGGED_IN: &str = "Not logged in. Run `upwatch login` first.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            other => bail!("Unknown format '{}'; expected text or json", other),
        }
    }
}

/// Navigator for one-shot commands: remembers where the user should go next
/// so the caller can print it as a hint.
#[derive(Debug, Default)]
pub struct CliNavigator {
    next: Mutex<Option<Route>>,
}

impl CliNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> Option<Route> {
        *self.next.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The command to run next, if a handler asked to navigate somewhere.
    pub fn next_step(&self) -> Option<&'static str> {
        self.next().map(|route| match route {
            Route::Login => "upwatch login --email <EMAIL>",
            Route::Register => "upwatch register --email <EMAIL>",
            Route::Dashboard => "upwatch list",
        })
    }

    fn set(&self, route: Route) {
        *self.next.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(route);
    }
}

impl Navigator for CliNavigator {
    fn replace(&self, route: Route) {
        self.set(route);
    }

    fn push(&self, route: Route) {
        self.set(route);
    }

    fn refresh(&self) {}
}

/// Everything a command needs: the client, where its session lives, and
/// where it wants to send the user afterwards.
pub struct Context {
    pub client: Arc<ApiClient>,
    pub store: SessionStore,
    pub navigator: Arc<CliNavigator>,
    pub quiet: bool,
}

impl Context {
    pub fn open(api_url: Option<&str>, session_file: Option<&Path>, quiet: bool) -> Result<Self> {
        let config = ApiConfig::resolve(api_url)?;
        let path = session_file
            .map(Path::to_path_buf)
            .unwrap_or_else(default_session_path);
        let store = SessionStore::new(path);
        let client = ApiClient::with_session(config, store.clone())?;

        Ok(Self {
            client: Arc::new(client),
            store,
            navigator: Arc::new(CliNavigator::new()),
            quiet,
        })
    }

    fn dashboard(&self) -> DashboardController {
        DashboardController::new(self.client.clone(), self.navigator.clone())
    }

    fn spinner(&self, message: impl Into<String>) -> ProgressBar {
        if self.quiet {
            return ProgressBar::hidden();
        }

        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            spinner.set_style(style);
        }
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner.set_message(message.into());
        spinner
    }
}

pub fn print_prompt(msg: &str) -> Result<String> {
    print!("{} ", msg.bright_cyan().bold());
    io::stdout().flush()?;
    let mut response = String::new();
    io::stdin().read_line(&mut response)?;
    Ok(response.trim_end_matches(['\r', '\n']).to_string())
}

/// Sign in or register. The user comes back only when the server echoes it.
pub async fn handle_auth(ctx: &Context, action: AuthAction, email: &str, password: &str) -> Result<Option<User>> {
    let spinner = ctx.spinner(action.busy_label());

    let mut form = AuthForm::new(action, ctx.client.clone(), ctx.navigator.clone());
    form.email = email.to_string();
    form.password = password.to_string();
    let outcome = form.submit().await;
    spinner.finish_and_clear();

    match outcome {
        AuthOutcome::SignedIn(user) => Ok(user),
        AuthOutcome::Failed(message) => Err(anyhow!(message)),
    }
}

/// Log out on the server and always forget the local session.
pub async fn handle_logout(ctx: &Context) -> Result<()> {
    let spinner = ctx.spinner("Logging out…");
    let result = ctx.dashboard().logout().await;
    spinner.finish_and_clear();

    ctx.store.clear()?;
    result.map_err(|e| anyhow!("Local session cleared, but the server logout failed: {}", e))
}

pub async fn handle_whoami(ctx: &Context) -> Result<User> {
    match ctx.client.me().await {
        Ok(user) => Ok(user),
        Err(e) if e.is_unauthorized() => {
            ctx.navigator.replace(Route::Login);
            bail!(NOT_LOGGED_IN)
        }
        Err(e) => Err(e.into()),
    }
}

/// The read-only dashboard: load the rows once and render them.
pub async fn handle_list(ctx: &Context, format: ReportFormat, cancel: &CancellationToken) -> Result<String> {
    let spinner = ctx.spinner("Loading targets…");
    let dashboard = ctx.dashboard();
    let mounted = dashboard.mount(cancel).await;
    spinner.finish_and_clear();

    if mounted == MountOutcome::Discarded {
        bail!("Interrupted");
    }

    let state = dashboard.snapshot().await;
    match state.phase {
        Phase::AuthFailed => bail!(NOT_LOGGED_IN),
        Phase::Errored(message) => bail!(message),
        Phase::Loading | Phase::Ready => {}
    }

    match format {
        ReportFormat::Text => Ok(generate_targets_report(&state.rows)),
        ReportFormat::Json => Ok(generate_json_report(&state.rows)?),
    }
}

/// Add a target. Returns the reloaded row list when the follow-up sync went through.
pub async fn handle_add(ctx: &Context, url: &str, name: Option<&str>) -> Result<Option<Vec<ViewRow>>> {
    let spinner = ctx.spinner(format!("Adding {}…", url));
    let dashboard = ctx.dashboard();
    let outcome = dashboard.add_target(url, name.unwrap_or("")).await;
    spinner.finish_and_clear();

    match outcome {
        AddOutcome::Added => Ok(reloaded_rows(dashboard.snapshot().await)),
        AddOutcome::Invalid(message) | AddOutcome::Failed(message) => Err(anyhow!(message)),
        AddOutcome::SignedOut => bail!(NOT_LOGGED_IN),
        AddOutcome::Busy => bail!("Another add is already in progress"),
    }
}

/// Delete a target. Returns the reloaded row list like [`handle_add`].
pub async fn handle_delete(ctx: &Context, id: i64) -> Result<Option<Vec<ViewRow>>> {
    let spinner = ctx.spinner(format!("Deleting target {}…", id));
    let dashboard = ctx.dashboard();
    let outcome = dashboard.delete_target(id).await;
    spinner.finish_and_clear();

    match outcome {
        DeleteOutcome::Deleted => Ok(reloaded_rows(dashboard.snapshot().await)),
        DeleteOutcome::Failed(message) => Err(anyhow!(message)),
        DeleteOutcome::SignedOut => bail!(NOT_LOGGED_IN),
        DeleteOutcome::Blocked => bail!("Another delete is already in progress"),
    }
}

fn reloaded_rows(state: DashboardState) -> Option<Vec<ViewRow>> {
    match state.phase {
        Phase::Ready => Some(state.rows),
        _ => None,
    }
}
