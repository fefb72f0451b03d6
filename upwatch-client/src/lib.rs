pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod session;

pub use client::{ApiClient, RequestOptions};
pub use config::ApiConfig;
pub use error::{ApiError, SessionError};
pub use model::{Credentials, NewTarget, Target, TargetStatus, User};
pub use session::SessionStore;

pub use reqwest::{Response, StatusCode};
