use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::{
    activity::{self, repo_types::ActivityCategory},
    admin::{
        dto::{ActivitiesResponse, DashboardStats, DataResponse},
        services::dashboard_stats,
        session::{admin_cookie, clear_admin_cookie},
    },
    auth::{
        dto::{AdminRegisterRequest, AuthResponse, LoginRequest, PublicUser},
        extractors::{authenticate, AdminOnly, AdminUser},
        repo_types::{Role, User, UserFilter},
        services::{
            authenticate_credentials, issue_token, register_first_admin, register_identity,
            Registration,
        },
    },
    error::{AppError, AppResult},
    extract::ValidJson,
    state::AppState,
};

const RECENT_ACTIVITY_LIMIT: i64 = 10;

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/me", get(me))
        .route("/logout", get(logout))
        .route("/dashboard-stats", get(stats))
        .route("/recent-activities", get(recent_activities))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<LoginRequest>,
) -> AppResult<Response> {
    let user = authenticate_credentials(&state, &payload.email, &payload.password).await?;
    if !user.is_admin() {
        warn!(user_id = %user.id, "admin login by non-admin");
        return Err(AppError::forbidden("Not authorized as an admin"));
    }
    let token = issue_token(&state, &user)?;
    let cookie = admin_cookie(&state.config, &token).map_err(anyhow::Error::from)?;

    activity::record(&state, Some(user.id), ActivityCategory::Admin, "Admin logged in").await;
    info!(user_id = %user.id, "admin logged in");
    let body = AuthResponse {
        success: true,
        token,
        user: PublicUser::with_role(&user),
    };
    Ok(([(SET_COOKIE, cookie)], Json(body)).into_response())
}

/// Open while no admin exists; afterwards only an admin may add another.
#[instrument(skip(state, headers, payload))]
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidJson(payload): ValidJson<AdminRegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let admins = state
        .users
        .count_users(Some(Role::Admin), UserFilter::All)
        .await?;
    let creator = if admins == 0 {
        info!("bootstrapping first admin");
        None
    } else {
        match authenticate::<AdminOnly>(&headers, &state).await {
            Ok(admin) => Some(admin.id),
            Err(AppError::Internal(e)) => return Err(AppError::Internal(e)),
            Err(_) => {
                warn!("admin registration without admin credentials");
                return Err(AppError::forbidden("Not authorized as an admin"));
            }
        }
    };

    let registration = Registration {
        full_name: payload.name,
        email: payload.email,
        password: payload.password,
        phone_number: payload.phone_number,
        role: Role::Admin,
    };
    // A concurrent bootstrap that wins the race turns this one into a 403.
    let user = match creator {
        None => register_first_admin(&state, registration).await?,
        Some(_) => register_identity(&state, registration).await?,
    };
    let token = issue_token(&state, &user)?;

    activity::record(
        &state,
        creator.or(Some(user.id)),
        ActivityCategory::Admin,
        format!("Registered admin {}", user.email),
    )
    .await;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            token,
            user: PublicUser::with_role(&user),
        }),
    ))
}

#[instrument(skip(admin), fields(admin_id = %admin.id))]
pub async fn me(admin: AdminUser) -> Json<DataResponse<User>> {
    Json(DataResponse::ok(admin.into_inner()))
}

/// Expires the cookie. Bearer tokens stay valid until they expire.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn logout(State(state): State<AppState>, admin: AdminUser) -> AppResult<Response> {
    let cookie = clear_admin_cookie(&state.config).map_err(anyhow::Error::from)?;
    activity::record(&state, Some(admin.id), ActivityCategory::Admin, "Admin logged out").await;
    let body: DataResponse<Value> = DataResponse::ok(json!({}));
    Ok(([(SET_COOKIE, cookie)], Json(body)).into_response())
}

#[instrument(skip(state, _admin))]
pub async fn stats(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<Json<DataResponse<DashboardStats>>> {
    Ok(Json(DataResponse::ok(dashboard_stats(&state).await?)))
}

#[instrument(skip(state, _admin))]
pub async fn recent_activities(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<Json<ActivitiesResponse>> {
    let data = state.activities.recent(RECENT_ACTIVITY_LIMIT).await?;
    Ok(Json(ActivitiesResponse {
        success: true,
        count: data.len(),
        data,
    }))
}
