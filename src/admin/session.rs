//! The `adminToken` cookie.

use axum::http::{header::InvalidHeaderValue, HeaderValue};

use crate::{auth::extractors::ADMIN_COOKIE, config::AppConfig};

const SECONDS_PER_DAY: i64 = 86_400;

/// `HttpOnly` cookie carrying the admin token.
pub fn admin_cookie(config: &AppConfig, token: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    let max_age = config.cookie.expire_days * SECONDS_PER_DAY;
    build(config, &format!("{ADMIN_COOKIE}={token}; Max-Age={max_age}"))
}

/// Overwrites the cookie with an empty, already expired one.
pub fn clear_admin_cookie(config: &AppConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    build(config, &format!("{ADMIN_COOKIE}=; Max-Age=0"))
}

fn build(config: &AppConfig, head: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{head}; Path=/; HttpOnly; SameSite=Lax");
    if let Some(domain) = &config.cookie.domain {
        cookie.push_str("; Domain=");
        cookie.push_str(domain);
    }
    // Plain http in development.
    if config.run_mode.is_production() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunMode;
    use crate::state::AppState;

    fn config(mode: RunMode, domain: Option<&str>) -> AppConfig {
        let mut cfg = (*AppState::fake().config).clone();
        cfg.run_mode = mode;
        cfg.cookie.domain = domain.map(String::from);
        cfg
    }

    #[test]
    fn development_cookie_is_host_only_and_not_secure() {
        let value = admin_cookie(&config(RunMode::Development, None), "tok").unwrap();
        let value = value.to_str().unwrap();
        assert!(value.starts_with("adminToken=tok; Max-Age=2592000"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("SameSite=Lax"));
        assert!(value.contains("Path=/"));
        assert!(!value.contains("Secure"));
        assert!(!value.contains("Domain"));
    }

    #[test]
    fn production_cookie_is_secure_with_configured_domain() {
        let value = admin_cookie(&config(RunMode::Production, Some("gigstm.com")), "tok").unwrap();
        let value = value.to_str().unwrap();
        assert!(value.contains("; Secure"));
        assert!(value.contains("; Domain=gigstm.com"));
    }

    #[test]
    fn cleared_cookie_expires_immediately() {
        let value = clear_admin_cookie(&config(RunMode::Development, None)).unwrap();
        assert!(value.to_str().unwrap().starts_with("adminToken=; Max-Age=0"));
    }
}
