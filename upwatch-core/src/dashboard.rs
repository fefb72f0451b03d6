use crate::navigation::{Navigator, Route};
use crate::row::ViewRow;
use crate::sync::{SyncOutcome, synchronize};
use crate::validate::{normalize_name, validate_target_url};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use upwatch_client::client::{detail_of, paths};
use upwatch_client::{ApiClient, ApiError, NewTarget, RequestOptions, StatusCode};

pub const NETWORK_ERROR: &str = "Network error. Try again.";
pub const DELETE_FAILED: &str = "Delete failed.";

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Loading,
    Ready,
    AuthFailed,
    Errored(String),
}

/// The add-target form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetForm {
    pub url: String,
    pub name: String,
    pub error: Option<String>,
    pub submitting: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardState {
    pub phase: Phase,
    pub rows: Vec<ViewRow>,
    pub form: TargetForm,
    /// Row whose delete is in flight. While set, every delete control is disabled.
    pub deleting: Option<i64>,
    pub delete_error: Option<String>,
}

impl DashboardState {
    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Loading
    }

    pub fn auth_failed(&self) -> bool {
        self.phase == Phase::AuthFailed
    }

    pub fn error(&self) -> Option<&str> {
        match &self.phase {
            Phase::Errored(message) => Some(message),
            _ => None,
        }
    }

    pub fn can_delete(&self) -> bool {
        self.deleting.is_none() && !self.auth_failed()
    }
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            phase: Phase::Loading,
            rows: Vec::new(),
            form: TargetForm::default(),
            deleting: None,
            delete_error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountOutcome {
    Applied,
    /// The view went away before the initial load finished.
    Discarded,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AddOutcome {
    Added,
    Invalid(String),
    Failed(String),
    SignedOut,
    Busy,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    Deleted,
    /// Another delete is still pending; nothing was sent.
    Blocked,
    Failed(String),
    SignedOut,
}

/// Owns the dashboard's state and runs every dashboard action against the API.
///
/// State sits behind an async mutex that is never held across a request.
/// Actions (load, refresh, add, delete, logout) run one at a time under a
/// second lock, so a slow reload can't land on top of a newer mutation.
/// The delete guard and the add form's busy flag are checked before queueing
/// for that lock, so a repeated click is refused straight away.
pub struct DashboardController {
    client: Arc<ApiClient>,
    navigator: Arc<dyn Navigator>,
    state: Mutex<DashboardState>,
    actions: Mutex<()>,
}

impl DashboardController {
    pub fn new(client: Arc<ApiClient>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            client,
            navigator,
            state: Mutex::new(DashboardState::default()),
            actions: Mutex::new(()),
        }
    }

    pub async fn snapshot(&self) -> DashboardState {
        self.state.lock().await.clone()
    }

    /// Initial load. If `cancel` fires first the result is dropped on the floor.
    pub async fn mount(&self, cancel: &CancellationToken) -> MountOutcome {
        let loaded = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            loaded = async {
                let action = self.actions.lock().await;
                (action, synchronize(&self.client).await)
            } => Some(loaded),
        };

        match loaded {
            Some((_action, outcome)) if !cancel.is_cancelled() => {
                self.apply(outcome).await;
                MountOutcome::Applied
            }
            _ => {
                debug!("Dashboard torn down before initial load finished; discarding result");
                MountOutcome::Discarded
            }
        }
    }

    /// Reload the whole row list. Does nothing once the session is known to be gone.
    pub async fn refresh(&self) {
        let _action = self.actions.lock().await;
        self.reload().await;
    }

    /// Refresh body for callers already holding the action lock.
    async fn reload(&self) {
        if self.state.lock().await.auth_failed() {
            return;
        }
        let outcome = synchronize(&self.client).await;
        self.apply(outcome).await;
    }

    async fn apply(&self, outcome: SyncOutcome) {
        match outcome {
            SyncOutcome::Ready(rows) => {
                let mut state = self.state.lock().await;
                state.rows = rows;
                state.phase = Phase::Ready;
            }
            SyncOutcome::AuthFailed => self.sign_out().await,
            SyncOutcome::Errored(message) => {
                let mut state = self.state.lock().await;
                state.phase = Phase::Errored(message);
            }
        }
    }

    /// Enter the auth-failed state. The login redirect fires on the first entry only.
    async fn sign_out(&self) {
        let first = {
            let mut state = self.state.lock().await;
            let first = !state.auth_failed();
            state.phase = Phase::AuthFailed;
            first
        };

        if first {
            info!("Session is no longer valid, redirecting to login");
            self.navigator.replace(Route::Login);
        }
    }

    pub async fn add_target(&self, url: &str, name: &str) -> AddOutcome {
        let validated = {
            let mut state = self.state.lock().await;
            if state.auth_failed() {
                return AddOutcome::SignedOut;
            }
            if state.form.submitting {
                return AddOutcome::Busy;
            }

            state.form.url = url.to_string();
            state.form.name = name.to_string();
            state.form.error = None;

            match validate_target_url(url) {
                Ok(url) => {
                    state.form.submitting = true;
                    url
                }
                Err(e) => {
                    let message = e.to_string();
                    state.form.error = Some(message.clone());
                    return AddOutcome::Invalid(message);
                }
            }
        };

        let new_target = NewTarget {
            url: validated,
            name: normalize_name(name),
        };

        let outcome = {
            let _action = self.actions.lock().await;
            let signed_out = self.state.lock().await.auth_failed();
            if signed_out {
                AddOutcome::SignedOut
            } else {
                self.send_add(&new_target).await
            }
        };

        self.state.lock().await.form.submitting = false;
        outcome
    }

    async fn send_add(&self, new_target: &NewTarget) -> AddOutcome {
        debug!("Adding target {}", new_target.url);

        match self.client.create_target(new_target).await {
            Ok(created) => {
                match created {
                    Some(target) => info!("Added target {} ({})", target.id, target.url),
                    None => info!("Added target {}", new_target.url),
                }
                {
                    let mut state = self.state.lock().await;
                    state.form.url.clear();
                    state.form.name.clear();
                }
                self.reload().await;
                AddOutcome::Added
            }
            Err(e) if e.is_unauthorized() => {
                self.sign_out().await;
                AddOutcome::SignedOut
            }
            Err(e) => {
                let message = form_error(&e);
                warn!("Adding target failed: {}", e);
                self.state.lock().await.form.error = Some(message.clone());
                AddOutcome::Failed(message)
            }
        }
    }

    pub async fn delete_target(&self, id: i64) -> DeleteOutcome {
        {
            let mut state = self.state.lock().await;
            if state.auth_failed() {
                return DeleteOutcome::SignedOut;
            }
            if let Some(pending) = state.deleting {
                debug!("Ignoring delete of {} while {} is pending", id, pending);
                return DeleteOutcome::Blocked;
            }
            state.deleting = Some(id);
            state.delete_error = None;
        }

        let outcome = {
            let _action = self.actions.lock().await;
            let signed_out = self.state.lock().await.auth_failed();
            if signed_out {
                DeleteOutcome::SignedOut
            } else {
                self.send_delete(id).await
            }
        };

        let mut state = self.state.lock().await;
        state.deleting = None;
        if let DeleteOutcome::Failed(ref message) = outcome {
            state.delete_error = Some(message.clone());
        }
        outcome
    }

    async fn send_delete(&self, id: i64) -> DeleteOutcome {
        let response = match self
            .client
            .raw_request(&paths::target(id), RequestOptions::delete())
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Deleting target {} failed: {}", id, e);
                return DeleteOutcome::Failed(NETWORK_ERROR.to_string());
            }
        };

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.sign_out().await;
            return DeleteOutcome::SignedOut;
        }
        if !status.is_success() {
            let message = detail_of(response)
                .await
                .unwrap_or_else(|| DELETE_FAILED.to_string());
            warn!("Deleting target {} rejected with {}: {}", id, status, message);
            return DeleteOutcome::Failed(message);
        }

        info!("Deleted target {}", id);
        self.reload().await;
        DeleteOutcome::Deleted
    }

    /// Log out. The user lands on the login view whether or not the server agreed.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let _action = self.actions.lock().await;
        match self.client.logout().await {
            Ok(()) => {
                info!("Logged out");
                self.navigator.replace(Route::Login);
                self.navigator.refresh();
                Ok(())
            }
            Err(e) => {
                warn!("Logout request failed: {}", e);
                self.navigator.replace(Route::Login);
                Err(e)
            }
        }
    }
}

fn form_error(e: &ApiError) -> String {
    match e {
        ApiError::Transport(_) => NETWORK_ERROR.to_string(),
        other => other.to_string(),
    }
}
