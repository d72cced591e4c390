use anyhow::Context;
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{CoreFields, MonthlyCount, NewUser, Role, User, UserFilter};
use crate::db::{is_unique_violation, PgStore};

#[derive(Debug, thiserror::Error)]
pub enum CreateUserError {
    #[error("email already registered")]
    EmailTaken,
    #[error("an admin already exists")]
    AdminExists,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Credential store. Emails passed in are already normalized.
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn create(&self, new: NewUser) -> Result<User, CreateUserError>;
    /// Creates `new` only while no admin exists; the check and the insert
    /// are atomic.
    async fn create_first_admin(&self, new: NewUser) -> Result<User, CreateUserError>;
    async fn record_login(&self, id: Uuid, at: OffsetDateTime) -> anyhow::Result<()>;
    async fn update_core_fields(&self, id: Uuid, fields: &CoreFields) -> anyhow::Result<()>;
    /// Returns false when no such user existed.
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
    async fn list(&self) -> anyhow::Result<Vec<User>>;
    async fn count_users(&self, role: Option<Role>, filter: UserFilter) -> anyhow::Result<i64>;
    async fn signups_by_month(
        &self,
        role: Role,
        since: OffsetDateTime,
    ) -> anyhow::Result<Vec<MonthlyCount>>;
}

const USER_COLUMNS: &str =
    "id, full_name, email, password_hash, phone_number, role, is_active, last_login, created_at";

/// Advisory lock key serializing first-admin registrations.
const FIRST_ADMIN_LOCK: i64 = 0x6769_6773_746d;

fn insert_user_sql() -> String {
    format!(
        r#"
        INSERT INTO users (id, full_name, email, password_hash, phone_number, role)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {USER_COLUMNS}
        "#
    )
}

fn map_insert_error(e: sqlx::Error) -> CreateUserError {
    if is_unique_violation(&e) {
        CreateUserError::EmailTaken
    } else {
        anyhow::Error::new(e).context("insert user").into()
    }
}

#[async_trait]
impl UserRepo for PgStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    async fn create(&self, new: NewUser) -> Result<User, CreateUserError> {
        sqlx::query_as::<_, User>(&insert_user_sql())
            .bind(Uuid::new_v4())
            .bind(&new.full_name)
            .bind(&new.email)
            .bind(&new.password_hash)
            .bind(&new.phone_number)
            .bind(new.role)
            .fetch_one(&self.pool)
            .await
            .map_err(map_insert_error)
    }

    async fn create_first_admin(&self, new: NewUser) -> Result<User, CreateUserError> {
        let mut tx = self.pool.begin().await.context("begin first-admin tx")?;
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(FIRST_ADMIN_LOCK)
            .execute(&mut *tx)
            .await
            .context("lock first-admin registration")?;
        let admins =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role = 'admin'")
                .fetch_one(&mut *tx)
                .await
                .context("count admins")?;
        if admins > 0 {
            return Err(CreateUserError::AdminExists);
        }
        let user = sqlx::query_as::<_, User>(&insert_user_sql())
            .bind(Uuid::new_v4())
            .bind(&new.full_name)
            .bind(&new.email)
            .bind(&new.password_hash)
            .bind(&new.phone_number)
            .bind(new.role)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_insert_error)?;
        tx.commit().await.context("commit first admin")?;
        Ok(user)
    }

    async fn record_login(&self, id: Uuid, at: OffsetDateTime) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET last_login = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await
            .context("update last_login")?;
        Ok(())
    }

    async fn update_core_fields(&self, id: Uuid, fields: &CoreFields) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
               SET full_name = $2, email = $3, phone_number = COALESCE($4, phone_number)
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&fields.full_name)
        .bind(&fields.email)
        .bind(&fields.phone_number)
        .execute(&self.pool)
        .await
        .context("update user core fields")?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("delete user")?;
        Ok(res.rows_affected() > 0)
    }

    async fn list(&self) -> anyhow::Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .context("list users")?;
        Ok(users)
    }

    async fn count_users(&self, role: Option<Role>, filter: UserFilter) -> anyhow::Result<i64> {
        let (clause, since) = match filter {
            UserFilter::All => ("TRUE", None),
            UserFilter::CreatedSince(t) => ("created_at >= $2", Some(t)),
            UserFilter::LoggedInSince(t) => ("last_login >= $2", Some(t)),
        };
        let sql = format!(
            "SELECT COUNT(*) FROM users WHERE ($1::user_role IS NULL OR role = $1) AND {clause}"
        );
        let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(role);
        if let Some(t) = since {
            query = query.bind(t);
        }
        let n = query.fetch_one(&self.pool).await.context("count users")?;
        Ok(n)
    }

    async fn signups_by_month(
        &self,
        role: Role,
        since: OffsetDateTime,
    ) -> anyhow::Result<Vec<MonthlyCount>> {
        let rows = sqlx::query_as::<_, MonthlyCount>(
            r#"
            SELECT EXTRACT(YEAR FROM created_at)::int4  AS year,
                   EXTRACT(MONTH FROM created_at)::int4 AS month,
                   COUNT(*)                             AS count
              FROM users
             WHERE role = $1 AND created_at >= $2
             GROUP BY 1, 2
             ORDER BY 1, 2
            "#,
        )
        .bind(role)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .context("signups by month")?;
        Ok(rows)
    }
}
