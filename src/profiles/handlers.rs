use axum::{
    extract::{Path, State},
    routing::{delete, get},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    activity::{self, repo_types::ActivityCategory},
    auth::{
        dto::MessageResponse,
        extractors::{AdminUser, AuthUser},
        repo_types::CoreFields,
    },
    error::{AppError, AppResult},
    extract::ValidJson,
    profiles::{
        dto::{ProfileListResponse, ProfileResponse, ProfileSummary, SaveProfileRequest},
        repo_types::ProfileUpsert,
    },
    state::AppState,
};

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/api/profile", get(get_profile).post(save_profile))
        .route("/api/profile/all", get(list_profiles))
        .route("/api/profile/:id", delete(delete_profile))
}

#[instrument(skip(state, auth), fields(user_id = %auth.id))]
pub async fn get_profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<ProfileResponse>> {
    let profile = state
        .profiles
        .find_by_user(auth.id)
        .await?
        .ok_or_else(|| AppError::not_found("Profile not found"))?;
    Ok(Json(ProfileResponse {
        success: true,
        message: None,
        data: profile,
    }))
}

#[instrument(skip(state, auth, payload), fields(user_id = %auth.id))]
pub async fn save_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidJson(payload): ValidJson<SaveProfileRequest>,
) -> AppResult<Json<ProfileResponse>> {
    let personal_info = payload
        .personal_info
        .ok_or_else(|| AppError::validation("Name and email are required fields"))?;
    let core = CoreFields {
        full_name: personal_info.name.clone(),
        email: personal_info.email.clone(),
        phone_number: personal_info.mobile.clone(),
    };

    let profile = state
        .profiles
        .upsert(ProfileUpsert {
            user_id: auth.id,
            personal_info,
            documents: payload.documents,
            address: payload.address,
            about: payload.about,
            files: payload.files,
        })
        .await?;

    // Denormalized copy on the user row; not transactional with the profile write.
    if let Err(e) = state.users.update_core_fields(auth.id, &core).await {
        warn!(error = %e, "sync of user core fields failed");
    }

    activity::record(&state, Some(auth.id), ActivityCategory::Profile, "Profile saved").await;
    info!(profile_id = %profile.id, "profile saved");
    Ok(Json(ProfileResponse {
        success: true,
        message: Some("Profile saved successfully".into()),
        data: profile,
    }))
}

#[instrument(skip(state))]
pub async fn list_profiles(State(state): State<AppState>) -> AppResult<Json<ProfileListResponse>> {
    let users = state.users.list().await?;
    Ok(Json(ProfileListResponse {
        success: true,
        data: users.into_iter().map(ProfileSummary::from).collect(),
    }))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete_profile(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    if !state.profiles.delete_by_user(user_id).await? {
        return Err(AppError::not_found("Profile not found"));
    }
    state.users.delete(user_id).await?;

    activity::record(
        &state,
        Some(admin.id),
        ActivityCategory::Admin,
        format!("Deleted user {user_id}"),
    )
    .await;
    info!(%user_id, "user and profile deleted");
    Ok(Json(MessageResponse {
        success: true,
        message: "User profile deleted successfully".into(),
    }))
}
