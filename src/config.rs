use serde::Deserialize;

/// Default token lifetime: 30 days.
const DEFAULT_TTL_MINUTES: i64 = 60 * 24 * 30;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Settings for the `adminToken` session cookie.
#[derive(Debug, Clone, Deserialize)]
pub struct CookieConfig {
    pub expire_days: i64,
    /// Host-only cookie when unset.
    pub domain: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Development,
    Production,
}

impl RunMode {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => RunMode::Development,
            _ => RunMode::Production,
        }
    }

    pub fn is_production(self) -> bool {
        self == RunMode::Production
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub cookie: CookieConfig,
    pub run_mode: RunMode,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "gigstm".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "gigstm-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(DEFAULT_TTL_MINUTES),
        };
        let cookie = CookieConfig {
            expire_days: std::env::var("JWT_COOKIE_EXPIRE")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(30),
            domain: std::env::var("COOKIE_DOMAIN")
                .ok()
                .filter(|d| !d.trim().is_empty()),
        };
        let run_mode = std::env::var("APP_ENV")
            .map(|v| RunMode::parse(&v))
            .unwrap_or(RunMode::Production);
        Ok(Self {
            database_url,
            jwt,
            cookie,
            run_mode,
        })
    }

    /// `memory://` selects the in-process store instead of Postgres.
    pub fn uses_memory_store(&self) -> bool {
        self.database_url.starts_with("memory:")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_env_applies_defaults() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("postgres://localhost/gigstm")),
                ("JWT_SECRET", Some("s3cret")),
                ("JWT_ISSUER", None),
                ("JWT_AUDIENCE", None),
                ("JWT_TTL_MINUTES", None),
                ("JWT_COOKIE_EXPIRE", None),
                ("COOKIE_DOMAIN", None),
                ("APP_ENV", None),
            ],
            || {
                let cfg = AppConfig::from_env().expect("config");
                assert_eq!(cfg.jwt.issuer, "gigstm");
                assert_eq!(cfg.jwt.audience, "gigstm-users");
                assert_eq!(cfg.jwt.ttl_minutes, DEFAULT_TTL_MINUTES);
                assert_eq!(cfg.cookie.expire_days, 30);
                assert!(cfg.cookie.domain.is_none());
                assert_eq!(cfg.run_mode, RunMode::Production);
                assert!(!cfg.uses_memory_store());
            },
        );
    }

    #[test]
    fn from_env_reads_overrides() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("memory://")),
                ("JWT_SECRET", Some("s3cret")),
                ("JWT_TTL_MINUTES", Some("15")),
                ("JWT_COOKIE_EXPIRE", Some("7")),
                ("COOKIE_DOMAIN", Some("gigs.example.com")),
                ("APP_ENV", Some("development")),
            ],
            || {
                let cfg = AppConfig::from_env().expect("config");
                assert_eq!(cfg.jwt.ttl_minutes, 15);
                assert_eq!(cfg.cookie.expire_days, 7);
                assert_eq!(cfg.cookie.domain.as_deref(), Some("gigs.example.com"));
                assert_eq!(cfg.run_mode, RunMode::Development);
                assert!(cfg.uses_memory_store());
            },
        );
    }

    #[test]
    fn from_env_requires_secret() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("memory://")),
                ("JWT_SECRET", None::<&str>),
            ],
            || {
                assert!(AppConfig::from_env().is_err());
            },
        );
    }
}
