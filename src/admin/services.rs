use time::{Date, Duration, Month, OffsetDateTime};

use crate::{
    admin::dto::{Charts, DashboardStats, UserStats},
    auth::repo_types::{Role, UserFilter},
    error::AppError,
    state::AppState,
};

/// Window for "active" and "new" users.
const RECENT_DAYS: i64 = 30;
/// Calendar months covered by the sign-up chart, current month included.
const CHART_MONTHS: u32 = 6;

pub async fn dashboard_stats(state: &AppState) -> Result<DashboardStats, AppError> {
    let now = OffsetDateTime::now_utc();
    let recent = now - Duration::days(RECENT_DAYS);
    let role = Some(Role::User);

    let stats = UserStats {
        total_users: state.users.count_users(role, UserFilter::All).await?,
        active_users: state
            .users
            .count_users(role, UserFilter::LoggedInSince(recent))
            .await?,
        new_users: state
            .users
            .count_users(role, UserFilter::CreatedSince(recent))
            .await?,
    };
    let users_by_month = state
        .users
        .signups_by_month(Role::User, months_window_start(now, CHART_MONTHS))
        .await?;

    Ok(DashboardStats {
        stats,
        charts: Charts { users_by_month },
    })
}

/// Midnight UTC on the first day of the month `months - 1` months before `now`.
pub(crate) fn months_window_start(now: OffsetDateTime, months: u32) -> OffsetDateTime {
    let back = months.max(1) as i32 - 1;
    let mut year = now.year();
    let mut month = u8::from(now.month()) as i32 - back;
    while month < 1 {
        month += 12;
        year -= 1;
    }
    Month::try_from(month as u8)
        .ok()
        .and_then(|m| Date::from_calendar_date(year, m, 1).ok())
        .map(|d| d.midnight().assume_utc())
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo::UserRepo;
    use crate::auth::repo_types::NewUser;
    use crate::memory::MemoryStore;
    use std::sync::Arc;
    use time::macros::datetime;

    #[test]
    fn window_crosses_year_boundary() {
        let start = months_window_start(datetime!(2024-02-15 13:45 UTC), 6);
        assert_eq!(start, datetime!(2023-09-01 0:00 UTC));
    }

    #[test]
    fn window_of_one_month_is_current_month() {
        let start = months_window_start(datetime!(2024-07-31 23:59 UTC), 1);
        assert_eq!(start, datetime!(2024-07-01 0:00 UTC));
        assert_eq!(months_window_start(datetime!(2024-07-31 23:59 UTC), 0), start);
    }

    #[tokio::test]
    async fn stats_count_only_regular_users() {
        let store = Arc::new(MemoryStore::default());
        for (email, role) in [
            ("a@x.com", Role::User),
            ("b@x.com", Role::User),
            ("boss@x.com", Role::Admin),
        ] {
            store
                .create(NewUser {
                    full_name: "N".into(),
                    email: email.into(),
                    password_hash: "h".into(),
                    phone_number: None,
                    role,
                })
                .await
                .unwrap();
        }
        let ann = store.find_by_email("a@x.com").await.unwrap().unwrap();
        store
            .record_login(ann.id, OffsetDateTime::now_utc())
            .await
            .unwrap();

        let state = AppState::fake_with(store);
        let stats = dashboard_stats(&state).await.unwrap();
        assert_eq!(
            stats.stats,
            UserStats {
                total_users: 2,
                active_users: 1,
                new_users: 2,
            }
        );
        let charted: i64 = stats.charts.users_by_month.iter().map(|m| m.count).sum();
        assert_eq!(charted, 2);
    }
}
