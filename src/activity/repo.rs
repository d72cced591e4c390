use anyhow::Context;
use async_trait::async_trait;
use uuid::Uuid;

use crate::activity::repo_types::{ActivityEntry, ActivityRow, NewActivity};
use crate::db::PgStore;

#[async_trait]
pub trait ActivityRepo: Send + Sync {
    async fn append(&self, entry: NewActivity) -> anyhow::Result<()>;
    /// Newest first.
    async fn recent(&self, limit: i64) -> anyhow::Result<Vec<ActivityEntry>>;
}

#[async_trait]
impl ActivityRepo for PgStore {
    async fn append(&self, entry: NewActivity) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO activity_logs (id, user_id, action, category)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry.user_id)
        .bind(&entry.action)
        .bind(entry.category)
        .execute(&self.pool)
        .await
        .context("insert activity")?;
        Ok(())
    }

    async fn recent(&self, limit: i64) -> anyhow::Result<Vec<ActivityEntry>> {
        let rows = sqlx::query_as::<_, ActivityRow>(
            r#"
            SELECT a.id, a.action, a.category, a.timestamp,
                   u.id AS user_id, u.full_name AS user_name, u.email AS user_email
              FROM activity_logs a
              LEFT JOIN users u ON u.id = a.user_id
             ORDER BY a.timestamp DESC
             LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("list recent activity")?;
        Ok(rows.into_iter().map(ActivityEntry::from).collect())
    }
}
