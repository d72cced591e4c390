use serde::{Deserialize, Serialize};

use crate::{activity::repo_types::ActivityEntry, auth::repo_types::MonthlyCount};

/// `{success, data}` envelope used by the admin surface.
#[derive(Debug, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_users: i64,
    pub active_users: i64,
    pub new_users: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Charts {
    /// Ascending by (year, month); months without sign-ups are omitted.
    pub users_by_month: Vec<MonthlyCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub stats: UserStats,
    pub charts: Charts,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActivitiesResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<ActivityEntry>,
}
