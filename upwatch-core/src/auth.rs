use crate::navigation::{Navigator, Route};
use std::sync::Arc;
use tracing::{info, warn};
use upwatch_client::{ApiClient, Credentials, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAction {
    Login,
    Register,
}

impl AuthAction {
    pub fn title(&self) -> &'static str {
        match self {
            AuthAction::Login => "Log in",
            AuthAction::Register => "Register",
        }
    }

    pub fn busy_label(&self) -> &'static str {
        match self {
            AuthAction::Login => "Logging in…",
            AuthAction::Register => "Registering…",
        }
    }

    /// Shown when the failure carries no message of its own.
    pub fn fallback_error(&self) -> &'static str {
        match self {
            AuthAction::Login => "Login failed",
            AuthAction::Register => "Registration failed",
        }
    }

    pub fn other(&self) -> AuthAction {
        match self {
            AuthAction::Login => AuthAction::Register,
            AuthAction::Register => AuthAction::Login,
        }
    }

    pub fn route(&self) -> Route {
        match self {
            AuthAction::Login => Route::Login,
            AuthAction::Register => Route::Register,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    /// Any 2xx. The user is only known when the server echoed it back.
    SignedIn(Option<User>),
    Failed(String),
}

/// Email/password form behind the login and register views.
#[derive(Clone)]
pub struct AuthForm {
    action: AuthAction,
    client: Arc<ApiClient>,
    navigator: Arc<dyn Navigator>,
    pub email: String,
    pub password: String,
    pub error: Option<String>,
    pub loading: bool,
}

impl AuthForm {
    pub fn new(action: AuthAction, client: Arc<ApiClient>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            action,
            client,
            navigator,
            email: String::new(),
            password: String::new(),
            error: None,
            loading: false,
        }
    }

    pub fn action(&self) -> AuthAction {
        self.action
    }

    pub async fn submit(&mut self) -> AuthOutcome {
        self.error = None;
        self.loading = true;

        let credentials = Credentials {
            email: self.email.clone(),
            password: self.password.clone(),
        };
        let result = match self.action {
            AuthAction::Login => self.client.login(&credentials).await,
            AuthAction::Register => self.client.register(&credentials).await,
        };

        let outcome = match result {
            Ok(user) => {
                info!("{} succeeded for {}", self.action.title(), self.email);
                self.navigator.push(Route::Dashboard);
                self.navigator.refresh();
                AuthOutcome::SignedIn(user)
            }
            Err(e) => {
                let message = e.to_string();
                let message = if message.trim().is_empty() {
                    self.action.fallback_error().to_string()
                } else {
                    message
                };
                warn!("{} failed: {}", self.action.title(), message);
                self.error = Some(message.clone());
                AuthOutcome::Failed(message)
            }
        };

        self.loading = false;
        outcome
    }
}
