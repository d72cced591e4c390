use std::{marker::PhantomData, ops::Deref};

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use tracing::warn;

use crate::{
    auth::{
        jwt::{JwtKeys, TokenError},
        repo_types::{Role, User},
    },
    error::AppError,
    state::AppState,
};

/// Name of the admin session cookie.
pub const ADMIN_COOKIE: &str = "adminToken";

pub const ACCOUNT_DISABLED: &str = "Account is disabled";

/// Capability check applied by [`Auth`]: where the token may come from and
/// which identities may pass.
pub trait Policy: Send + Sync + 'static {
    /// Whether the `adminToken` cookie is accepted when no bearer header is sent.
    const COOKIE_FALLBACK: bool;
    fn permits(role: Role) -> bool;
    fn denied_message() -> &'static str;
}

/// Any authenticated identity; bearer header only.
pub struct AnyUser;

impl Policy for AnyUser {
    const COOKIE_FALLBACK: bool = false;
    fn permits(_role: Role) -> bool {
        true
    }
    fn denied_message() -> &'static str {
        "Not authorized to access this route"
    }
}

/// Admin identities; bearer header or `adminToken` cookie.
pub struct AdminOnly;

impl Policy for AdminOnly {
    const COOKIE_FALLBACK: bool = true;
    fn permits(role: Role) -> bool {
        role == Role::Admin
    }
    fn denied_message() -> &'static str {
        "Not authorized as an admin"
    }
}

/// The identity behind a verified token, admitted by policy `P`.
pub struct Auth<P: Policy> {
    user: User,
    _policy: PhantomData<P>,
}

pub type AuthUser = Auth<AnyUser>;
pub type AdminUser = Auth<AdminOnly>;

impl<P: Policy> Auth<P> {
    pub fn into_inner(self) -> User {
        self.user
    }
}

impl<P: Policy> Deref for Auth<P> {
    type Target = User;
    fn deref(&self) -> &User {
        &self.user
    }
}

#[async_trait]
impl<P: Policy> FromRequestParts<AppState> for Auth<P> {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = authenticate::<P>(&parts.headers, state).await?;
        Ok(Auth {
            user,
            _policy: PhantomData,
        })
    }
}

/// Token lookup, verification, identity load and role check for policy `P`.
pub async fn authenticate<P: Policy>(headers: &HeaderMap, state: &AppState) -> Result<User, AppError> {
    let token = bearer_token(headers)
        .or_else(|| {
            if P::COOKIE_FALLBACK {
                cookie_value(headers, ADMIN_COOKIE)
            } else {
                None
            }
        })
        .ok_or_else(|| AppError::unauthenticated("Not authorized to access this route"))?;

    let keys = JwtKeys::from_ref(state);
    let claims = keys.verify(&token).map_err(|e| match e {
        TokenError::Expired => {
            warn!("expired token");
            AppError::unauthenticated("Session expired, please log in again")
        }
        TokenError::Invalid(reason) => {
            warn!(%reason, "invalid token");
            AppError::unauthenticated("Not authorized, token failed")
        }
    })?;

    let user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| {
            warn!(user_id = %claims.sub, "token for missing user");
            AppError::unauthenticated("User no longer exists")
        })?;

    if !user.is_active {
        warn!(user_id = %user.id, "token for disabled account");
        return Err(AppError::forbidden(ACCOUNT_DISABLED));
    }
    if !P::permits(user.role) {
        warn!(user_id = %user.id, role = user.role.as_str(), "role not permitted");
        return Err(AppError::forbidden(P::denied_message()));
    }
    Ok(user)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, val)| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_is_extracted() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc.def"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn cookie_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; adminToken=tok123; lang=en"),
        );
        assert_eq!(cookie_value(&headers, ADMIN_COOKIE).as_deref(), Some("tok123"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn cleared_cookie_counts_as_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("adminToken="));
        assert_eq!(cookie_value(&headers, ADMIN_COOKIE), None);
    }

    #[test]
    fn policies() {
        assert!(AnyUser::permits(Role::User));
        assert!(AnyUser::permits(Role::Admin));
        assert!(!AdminOnly::permits(Role::User));
        assert!(AdminOnly::permits(Role::Admin));
    }
}
