use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "activity_category", rename_all = "lowercase")]
pub enum ActivityCategory {
    Auth,
    Profile,
    Admin,
}

#[derive(Debug, Clone)]
pub struct NewActivity {
    pub user_id: Option<Uuid>,
    pub action: String,
    pub category: ActivityCategory,
}

/// Log row joined with its actor, if the actor still exists.
#[derive(Debug, Clone, FromRow)]
pub struct ActivityRow {
    pub id: Uuid,
    pub action: String,
    pub category: ActivityCategory,
    pub timestamp: OffsetDateTime,
    pub user_id: Option<Uuid>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityActor {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub user: Option<ActivityActor>,
    pub action: String,
    pub category: ActivityCategory,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl From<ActivityRow> for ActivityEntry {
    fn from(r: ActivityRow) -> Self {
        let user = match (r.user_id, r.user_name, r.user_email) {
            (Some(id), Some(name), Some(email)) => Some(ActivityActor { id, name, email }),
            _ => None,
        };
        Self {
            id: r.id,
            user,
            action: r.action,
            category: r.category,
            timestamp: r.timestamp,
        }
    }
}
