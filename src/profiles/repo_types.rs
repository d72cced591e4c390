use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalInfo {
    pub name: String,
    pub email: String,
    pub mobile: Option<String>,
    pub job_role: Option<String>,
    pub gender: Option<String>,
    #[serde(with = "iso_date::option")]
    pub dob: Option<Date>,
}

/// National ID numbers, kept as opaque strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Documents {
    pub aadhaar: Option<String>,
    pub pan: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub pincode: Option<String>,
}

/// URLs of uploaded documents; the upload itself happens elsewhere.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileFiles {
    pub aadhaar_file: Option<String>,
    pub pan_file: Option<String>,
    pub profile_image: Option<String>,
}

#[derive(Debug, FromRow)]
pub struct ProfileRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub personal_info: Json<PersonalInfo>,
    pub documents: Json<Documents>,
    pub address: Json<Address>,
    pub about: Option<String>,
    pub files: Json<ProfileFiles>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub personal_info: PersonalInfo,
    pub documents: Documents,
    pub address: Address,
    pub about: Option<String>,
    pub files: ProfileFiles,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<ProfileRow> for Profile {
    fn from(r: ProfileRow) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            personal_info: r.personal_info.0,
            documents: r.documents.0,
            address: r.address.0,
            about: r.about,
            files: r.files.0,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Upsert payload. `None` blocks keep their stored value on update.
#[derive(Debug, Clone)]
pub struct ProfileUpsert {
    pub user_id: Uuid,
    pub personal_info: PersonalInfo,
    pub documents: Option<Documents>,
    pub address: Option<Address>,
    pub about: Option<String>,
    pub files: Option<ProfileFiles>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn personal_info_dates_are_iso() {
        let info: PersonalInfo = serde_json::from_value(serde_json::json!({
            "name": "Ann",
            "email": "ann@x.com",
            "jobRole": "Plumber",
            "dob": "1990-05-01"
        }))
        .unwrap();
        assert_eq!(info.dob, Some(date!(1990 - 05 - 01)));
        assert_eq!(info.job_role.as_deref(), Some("Plumber"));

        let back = serde_json::to_value(&info).unwrap();
        assert_eq!(back["dob"], "1990-05-01");
    }

    #[test]
    fn missing_dob_is_none() {
        let info: PersonalInfo =
            serde_json::from_value(serde_json::json!({ "name": "Ann", "email": "a@x.com" }))
                .unwrap();
        assert_eq!(info.dob, None);
    }
}
