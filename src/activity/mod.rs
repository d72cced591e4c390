//! Append-only activity log written by auth, profile and admin operations.

pub mod repo;
pub mod repo_types;

use tracing::warn;
use uuid::Uuid;

use crate::state::AppState;
use repo_types::{ActivityCategory, NewActivity};

/// Best-effort append; a failed write is logged and otherwise ignored.
pub async fn record(
    state: &AppState,
    actor: Option<Uuid>,
    category: ActivityCategory,
    action: impl Into<String>,
) {
    let entry = NewActivity {
        user_id: actor,
        action: action.into(),
        category,
    };
    if let Err(e) = state.activities.append(entry).await {
        warn!(error = %e, "activity log write failed");
    }
}
