#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server answered {status}: {message}")]
    Api { status: u16, message: String },
    /// The server rejected the stored token; the session has been cleared.
    #[error("session expired, continue at {redirect}")]
    SessionExpired { redirect: &'static str },
    #[error("not logged in, continue at {redirect}")]
    NotAuthenticated { redirect: &'static str },
    #[error("another login or registration is in progress")]
    AuthInProgress,
    #[error("session storage: {0}")]
    Storage(#[from] std::io::Error),
    #[error("session encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
