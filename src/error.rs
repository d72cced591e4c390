//! Error taxonomy shared by every handler, and the JSON envelope it renders to.

use std::any::Any;

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use crate::config::RunMode;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    /// Same message for unknown email and wrong password.
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::Unauthenticated(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        AppError::Unauthenticated(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }
}

/// Detail of a 500, carried in response extensions so that only
/// [`expose_error_detail`] decides whether the client gets to see it.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

const SERVER_ERROR: &str = "Server Error";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            AppError::Internal(err) => {
                error!(error = %format!("{err:#}"), "internal error");
                let mut res = (
                    status,
                    Json(json!({ "success": false, "message": SERVER_ERROR })),
                )
                    .into_response();
                res.extensions_mut().insert(ErrorDetail(format!("{err:#}")));
                res
            }
            other => (
                status,
                Json(json!({ "success": false, "message": other.to_string() })),
            )
                .into_response(),
        }
    }
}

/// Appends `error: <detail>` to 500 envelopes in development mode.
pub async fn expose_error_detail(
    State(mode): State<RunMode>,
    req: Request,
    next: Next,
) -> Response {
    let res = next.run(req).await;
    if mode.is_production() {
        return res;
    }
    let Some(ErrorDetail(detail)) = res.extensions().get::<ErrorDetail>().cloned() else {
        return res;
    };
    let status = res.status();
    (
        status,
        Json(json!({ "success": false, "message": SERVER_ERROR, "error": detail })),
    )
        .into_response()
}

/// Converts a handler panic into the regular 500 envelope.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic".to_string()
    };
    error!(panic = %detail, "handler panicked");
    let mut res = (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CONTENT_TYPE, "application/json")],
        json!({ "success": false, "message": SERVER_ERROR }).to_string(),
    )
        .into_response();
    res.extensions_mut().insert(ErrorDetail(detail));
    res
}

pub async fn not_found_fallback() -> AppError {
    warn!("route not found");
    AppError::not_found("Not Found")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(res: Response) -> serde_json::Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn taxonomy_maps_to_status_codes() {
        assert_eq!(AppError::validation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Conflict("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::unauthenticated("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::forbidden("x").status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn internal_error_is_redacted() {
        let res = AppError::Internal(anyhow::anyhow!("db exploded")).into_response();
        assert!(res.extensions().get::<ErrorDetail>().is_some());
        let body = body_json(res).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Server Error");
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn client_errors_carry_their_message() {
        let body = body_json(AppError::InvalidCredentials.into_response()).await;
        assert_eq!(body["message"], "Invalid credentials");
        assert_eq!(body["success"], false);
    }
}
