//! Token service.
//!
//! Tokens are self-contained HS256 JWTs; nothing is stored server-side, so
//! there is no revocation. Rotating `JWT_SECRET` is the only way to
//! invalidate issued tokens, and it invalidates all of them.

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::{auth::claims::Claims, config::JwtConfig, state::AppState};

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token: {0}")]
    Invalid(String),
}

#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

impl From<&JwtConfig> for JwtKeys {
    fn from(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::minutes(cfg.ttl_minutes),
        }
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        JwtKeys::from(&state.config.jwt)
    }
}

impl JwtKeys {
    pub fn issue(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.issue_with_ttl(user_id, self.ttl)
    }

    pub(crate) fn issue_with_ttl(&self, user_id: Uuid, ttl: Duration) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + ttl;
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            }
        })?;
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(secret: &str, issuer: &str, audience: &str) -> JwtKeys {
        JwtKeys::from(&JwtConfig {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl_minutes: 5,
        })
    }

    #[test]
    fn issue_and_verify() {
        let keys = make_keys("dev-secret", "test-issuer", "test-aud");
        let user_id = Uuid::new_v4();
        let token = keys.issue(user_id).expect("issue");
        let claims = keys.verify(&token).expect("verify token");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let token = keys
            .issue_with_ttl(Uuid::new_v4(), Duration::seconds(-30))
            .expect("issue");
        assert!(matches!(keys.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn rotated_secret_invalidates_tokens() {
        let old = make_keys("old-secret", "iss", "aud");
        let new = make_keys("new-secret", "iss", "aud");
        let token = old.issue(Uuid::new_v4()).expect("issue");
        assert!(matches!(new.verify(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn tampered_or_garbage_token_is_invalid() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let token = keys.issue(Uuid::new_v4()).expect("issue");
        let mut tampered = token.clone();
        tampered.push('x');
        assert!(matches!(keys.verify(&tampered), Err(TokenError::Invalid(_))));
        assert!(matches!(keys.verify("not.a.jwt"), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn wrong_issuer_or_audience_is_invalid() {
        let good = make_keys("same-secret", "good-iss", "good-aud");
        let bad = make_keys("same-secret", "bad-iss", "bad-aud");
        let token = good.issue(Uuid::new_v4()).expect("issue");
        assert!(matches!(bad.verify(&token), Err(TokenError::Invalid(_))));
    }
}
