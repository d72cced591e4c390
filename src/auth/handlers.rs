use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    activity::{self, repo_types::ActivityCategory},
    auth::{
        dto::{
            AuthResponse, ForgotPasswordRequest, LoginRequest, MessageResponse, PublicUser,
            RegisterRequest, VerifyResponse,
        },
        extractors::AuthUser,
        repo_types::Role,
        services::{authenticate_credentials, issue_token, register_identity, Registration},
    },
    error::AppResult,
    extract::ValidJson,
    state::AppState,
};

const RESET_ACK: &str =
    "If an account exists with this email, you will receive a password reset link";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/verify", get(verify))
        .route("/auth/forgot-password", post(forgot_password))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let user = register_identity(
        &state,
        Registration {
            full_name: payload.full_name,
            email: payload.email,
            password: payload.password,
            phone_number: Some(payload.phone_number),
            role: Role::User,
        },
    )
    .await?;
    let token = issue_token(&state, &user)?;

    activity::record(&state, Some(user.id), ActivityCategory::Auth, "Registered").await;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            token,
            user: PublicUser::from_user(&user),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let user = authenticate_credentials(&state, &payload.email, &payload.password).await?;
    let token = issue_token(&state, &user)?;

    activity::record(&state, Some(user.id), ActivityCategory::Auth, "Logged in").await;
    info!(user_id = %user.id, "user logged in");
    Ok(Json(AuthResponse {
        success: true,
        token,
        user: PublicUser::from_user(&user),
    }))
}

#[instrument(skip(auth))]
pub async fn verify(auth: AuthUser) -> Json<VerifyResponse> {
    Json(VerifyResponse {
        success: true,
        user: auth.into_inner(),
    })
}

/// Always answers with the same acknowledgement so that account existence
/// cannot be discovered. No reset mail is sent.
#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<ForgotPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    if let Some(user) = state.users.find_by_email(&payload.email).await? {
        info!(user_id = %user.id, "password reset requested");
        activity::record(
            &state,
            Some(user.id),
            ActivityCategory::Auth,
            "Password reset requested",
        )
        .await;
    }
    Ok(Json(MessageResponse {
        success: true,
        message: RESET_ACK.into(),
    }))
}
