use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::repo_types::{Role, User},
    error::AppError,
    extract::{is_valid_email, normalize_email, Validate},
    profiles::repo_types::{Address, Documents, PersonalInfo, Profile, ProfileFiles},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveProfileRequest {
    #[serde(default)]
    pub personal_info: Option<PersonalInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<Documents>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<ProfileFiles>,
}

impl Validate for SaveProfileRequest {
    fn validate(mut self) -> Result<Self, AppError> {
        let Some(info) = self.personal_info.as_mut() else {
            return Err(AppError::validation("Name and email are required fields"));
        };
        info.name = info.name.trim().to_string();
        info.email = normalize_email(&info.email);
        if info.name.is_empty() || info.email.is_empty() {
            return Err(AppError::validation("Name and email are required fields"));
        }
        if !is_valid_email(&info.email) {
            return Err(AppError::validation("Invalid email"));
        }
        info.mobile = info
            .mobile
            .take()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());
        Ok(self)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: Profile,
}

/// One row of the public user directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login: Option<OffsetDateTime>,
}

impl From<User> for ProfileSummary {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.full_name,
            email: u.email,
            phone: u.phone_number,
            role: u.role,
            status: if u.is_active { "active" } else { "inactive" }.to_string(),
            created_at: u.created_at,
            last_login: u.last_login,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileListResponse {
    pub success: bool,
    pub data: Vec<ProfileSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn personal_info_is_required() {
        let req: SaveProfileRequest =
            serde_json::from_value(serde_json::json!({ "about": "hi" })).unwrap();
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));

        let req: SaveProfileRequest = serde_json::from_value(serde_json::json!({
            "personalInfo": { "name": "  ", "email": "ann@x.com" }
        }))
        .unwrap();
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn email_is_normalized_and_blank_mobile_dropped() {
        let req: SaveProfileRequest = serde_json::from_value(serde_json::json!({
            "personalInfo": { "name": "Ann", "email": " ANN@x.com", "mobile": " " }
        }))
        .unwrap();
        let req = req.validate().unwrap();
        let info = req.personal_info.unwrap();
        assert_eq!(info.email, "ann@x.com");
        assert_eq!(info.mobile, None);
    }
}
