//! Credential operations shared by the user and admin surfaces.

use axum::extract::FromRef;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::{
    auth::{
        extractors::ACCOUNT_DISABLED,
        jwt::JwtKeys,
        password::{hash_password, verify_password_or_dummy},
        repo::CreateUserError,
        repo_types::{NewUser, Role, User},
    },
    error::AppError,
    state::AppState,
};

pub struct Registration {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub phone_number: Option<String>,
    pub role: Role,
}

/// Creates the identity. `email` must already be normalized.
pub async fn register_identity(state: &AppState, reg: Registration) -> Result<User, AppError> {
    create_identity(state, reg, false).await
}

/// Creates the first admin. Fails with `Forbidden` once any admin exists,
/// including one created concurrently.
pub async fn register_first_admin(state: &AppState, reg: Registration) -> Result<User, AppError> {
    create_identity(
        state,
        Registration {
            role: Role::Admin,
            ..reg
        },
        true,
    )
    .await
}

async fn create_identity(
    state: &AppState,
    reg: Registration,
    first_admin: bool,
) -> Result<User, AppError> {
    if state.users.find_by_email(&reg.email).await?.is_some() {
        warn!(email = %reg.email, "email already registered");
        return Err(AppError::Conflict("User already exists".into()));
    }

    let password_hash = hash_password(&reg.password)?;
    let new = NewUser {
        full_name: reg.full_name,
        email: reg.email,
        password_hash,
        phone_number: reg.phone_number,
        role: reg.role,
    };
    let created = if first_admin {
        state.users.create_first_admin(new).await
    } else {
        state.users.create(new).await
    };
    let user = created.map_err(|e| match e {
        // lost a race with a concurrent registration
        CreateUserError::EmailTaken => AppError::Conflict("User already exists".into()),
        CreateUserError::AdminExists => {
            warn!("first-admin registration after an admin exists");
            AppError::forbidden("Not authorized as an admin")
        }
        CreateUserError::Other(e) => AppError::Internal(e),
    })?;

    info!(user_id = %user.id, role = user.role.as_str(), "user registered");
    Ok(user)
}

/// Checks email + password and stamps `last_login`. Unknown email and wrong
/// password fail identically and both pay for one hash verification.
pub async fn authenticate_credentials(
    state: &AppState,
    email: &str,
    password: &str,
) -> Result<User, AppError> {
    let found = state.users.find_by_email(email).await?;
    let matches = verify_password_or_dummy(
        password,
        found.as_ref().map(|u| u.password_hash.as_str()),
    )?;

    let Some(mut user) = found else {
        warn!("login unknown email");
        return Err(AppError::InvalidCredentials);
    };
    if !matches {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    if !user.is_active {
        warn!(user_id = %user.id, "login to disabled account");
        return Err(AppError::forbidden(ACCOUNT_DISABLED));
    }

    let now = OffsetDateTime::now_utc();
    state.users.record_login(user.id, now).await?;
    user.last_login = Some(now);
    Ok(user)
}

pub fn issue_token(state: &AppState, user: &User) -> Result<String, AppError> {
    let keys = JwtKeys::from_ref(state);
    Ok(keys.issue(user.id)?)
}
