use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Coarse authorization tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String, // Argon2 PHC string, never exposed in JSON
    pub phone_number: Option<String>,
    pub role: Role,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Insert payload; `password_hash` is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub phone_number: Option<String>,
    pub role: Role,
}

/// Fields a profile save copies back onto the owning user.
#[derive(Debug, Clone)]
pub struct CoreFields {
    pub full_name: String,
    pub email: String,
    pub phone_number: Option<String>,
}

/// Which users a count covers, beyond their role.
#[derive(Debug, Clone, Copy)]
pub enum UserFilter {
    All,
    CreatedSince(OffsetDateTime),
    LoggedInSince(OffsetDateTime),
}

/// Sign-ups in one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct MonthlyCount {
    pub year: i32,
    pub month: i32,
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_is_never_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            full_name: "Ann".into(),
            email: "ann@x.com".into(),
            password_hash: "$argon2id$v=19$secret".into(),
            phone_number: Some("5551234".into()),
            role: Role::User,
            is_active: true,
            last_login: None,
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(!json.to_string().contains("argon2"));
        assert_eq!(json["fullName"], "Ann");
        assert_eq!(json["role"], "user");
        assert!(json["lastLogin"].is_null());
    }
}
