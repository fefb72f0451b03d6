use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Non-2xx response; `message` is the server's `detail` when it sent one.
    #[error("{message}")]
    Status { status: StatusCode, message: String },

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid response body: {0}")]
    Decode(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for 401s, and for errors whose text says the session is gone.
    pub fn is_unauthorized(&self) -> bool {
        if self.status() == Some(StatusCode::UNAUTHORIZED) {
            return true;
        }
        let message = self.to_string();
        message.contains("401") || message.contains("Not authenticated")
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid cookie header: {0}")]
    InvalidHeader(String),
}
