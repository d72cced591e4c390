use anyhow::Context;
use async_trait::async_trait;
use sqlx::types::Json;
use uuid::Uuid;

use crate::db::PgStore;
use crate::profiles::repo_types::{Profile, ProfileRow, ProfileUpsert};

/// One profile per user, keyed by `user_id`.
#[async_trait]
pub trait ProfileRepo: Send + Sync {
    async fn find_by_user(&self, user_id: Uuid) -> anyhow::Result<Option<Profile>>;
    async fn upsert(&self, profile: ProfileUpsert) -> anyhow::Result<Profile>;
    /// Returns false when the user had no profile.
    async fn delete_by_user(&self, user_id: Uuid) -> anyhow::Result<bool>;
}

const PROFILE_COLUMNS: &str =
    "id, user_id, personal_info, documents, address, about, files, created_at, updated_at";

#[async_trait]
impl ProfileRepo for PgStore {
    async fn find_by_user(&self, user_id: Uuid) -> anyhow::Result<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("find profile by user")?;
        Ok(row.map(Profile::from))
    }

    async fn upsert(&self, p: ProfileUpsert) -> anyhow::Result<Profile> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            r#"
            INSERT INTO profiles (id, user_id, personal_info, documents, address, about, files)
            VALUES ($1, $2, $3,
                    COALESCE($4, '{{}}'::jsonb),
                    COALESCE($5, '{{}}'::jsonb),
                    $6,
                    COALESCE($7, '{{}}'::jsonb))
            ON CONFLICT (user_id) DO UPDATE SET
                personal_info = EXCLUDED.personal_info,
                documents     = COALESCE($4, profiles.documents),
                address       = COALESCE($5, profiles.address),
                about         = COALESCE($6, profiles.about),
                files         = COALESCE($7, profiles.files),
                updated_at    = now()
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(p.user_id)
        .bind(Json(&p.personal_info))
        .bind(p.documents.as_ref().map(Json))
        .bind(p.address.as_ref().map(Json))
        .bind(&p.about)
        .bind(p.files.as_ref().map(Json))
        .fetch_one(&self.pool)
        .await
        .context("upsert profile")?;
        Ok(row.into())
    }

    async fn delete_by_user(&self, user_id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM profiles WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("delete profile")?;
        Ok(res.rows_affected() > 0)
    }
}
