use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::{password::MIN_PASSWORD_LEN, repo_types::{Role, User}},
    error::AppError,
    extract::{is_valid_email, normalize_email, Validate},
};

/// Request body for user registration.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub password: String,
}

impl Validate for RegisterRequest {
    fn validate(mut self) -> Result<Self, AppError> {
        self.full_name = self.full_name.trim().to_string();
        self.phone_number = self.phone_number.trim().to_string();
        self.email = normalize_email(&self.email);
        if self.full_name.is_empty()
            || self.email.is_empty()
            || self.phone_number.is_empty()
            || self.password.is_empty()
        {
            return Err(AppError::validation(
                "Please provide full name, email, phone number and password",
            ));
        }
        check_email_and_password(&self.email, &self.password)?;
        Ok(self)
    }
}

/// Request body for login, shared by the user and admin surfaces.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(mut self) -> Result<Self, AppError> {
        self.email = normalize_email(&self.email);
        if self.email.is_empty() || self.password.is_empty() {
            return Err(AppError::validation("Please provide both email and password"));
        }
        Ok(self)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: String,
}

impl Validate for ForgotPasswordRequest {
    fn validate(mut self) -> Result<Self, AppError> {
        self.email = normalize_email(&self.email);
        if self.email.is_empty() {
            return Err(AppError::validation("Please provide an email"));
        }
        Ok(self)
    }
}

/// Request body for admin registration.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminRegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

impl Validate for AdminRegisterRequest {
    fn validate(mut self) -> Result<Self, AppError> {
        self.name = self.name.trim().to_string();
        self.email = normalize_email(&self.email);
        self.phone_number = self
            .phone_number
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        if self.name.is_empty() || self.email.is_empty() || self.password.is_empty() {
            return Err(AppError::validation("Please provide name, email and password"));
        }
        check_email_and_password(&self.email, &self.password)?;
        Ok(self)
    }
}

fn check_email_and_password(email: &str, password: &str) -> Result<(), AppError> {
    if !is_valid_email(email) {
        return Err(AppError::validation("Invalid email"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Response returned after login or registration.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: PublicUser,
}

/// Public part of the user returned to the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl PublicUser {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.full_name.clone(),
            email: user.email.clone(),
            role: None,
        }
    }

    pub fn with_role(user: &User) -> Self {
        Self {
            role: Some(user.role),
            ..Self::from_user(user)
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub user: User,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            full_name: " Ann ".into(),
            email: email.into(),
            phone_number: "5551234".into(),
            password: password.into(),
        }
    }

    #[test]
    fn register_normalizes_email_and_name() {
        let req = register("  Ann@X.com", "secret1").validate().unwrap();
        assert_eq!(req.email, "ann@x.com");
        assert_eq!(req.full_name, "Ann");
    }

    #[test]
    fn register_rejects_bad_input() {
        assert!(matches!(
            register("ann@x.com", "short").validate(),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            register("not-an-email", "secret1").validate(),
            Err(AppError::Validation(_))
        ));
        let mut missing_phone = register("ann@x.com", "secret1");
        missing_phone.phone_number = "  ".into();
        assert!(matches!(missing_phone.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn login_requires_both_fields() {
        let req = LoginRequest {
            email: "ann@x.com".into(),
            password: String::new(),
        };
        match req.validate() {
            Err(AppError::Validation(msg)) => {
                assert_eq!(msg, "Please provide both email and password")
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn register_body_uses_camel_case() {
        let req: RegisterRequest = serde_json::from_value(serde_json::json!({
            "fullName": "Ann",
            "email": "ann@x.com",
            "phoneNumber": "5551234",
            "password": "secret1"
        }))
        .unwrap();
        assert_eq!(req.phone_number, "5551234");
    }
}
