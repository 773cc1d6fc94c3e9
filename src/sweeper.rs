use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use diesel::{ExpressionMethods, QueryDsl};
use diesel_async::RunQueryDsl;

use crate::{app_state::AppState, models::OrderStatus, schema::orders};

pub fn stale_cutoff(now: DateTime<Utc>, max_age_hours: i64) -> DateTime<Utc> {
    now - TimeDelta::hours(max_age_hours)
}

/// Delete pending orders older than the retention window. Shared by the
/// background task and `GET /orders/cleanup`; delete-many is idempotent, so
/// overlapping runs are harmless. Orders in any other status are never
/// touched regardless of age.
pub async fn purge_stale_pending(state: &AppState) -> Result<usize> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let cutoff = stale_cutoff(Utc::now(), state.config.cleanup.pending_max_age_hours);

    let deleted = diesel::delete(
        orders::table
            .filter(orders::status.eq(OrderStatus::Pending.as_str()))
            .filter(orders::created_at.lt(cutoff)),
    )
    .execute(conn)
    .await
    .context("Failed to purge stale pending orders")?;

    Ok(deleted)
}

pub async fn run(state: AppState) {
    let mut ticker = tokio::time::interval(Duration::from_secs(state.config.cleanup.interval_secs));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match purge_stale_pending(&state).await {
            Ok(0) => {}
            Ok(count) => tracing::info!("Purged {count} stale pending orders"),
            Err(err) => tracing::error!("Order cleanup failed: {err:#}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn cutoff_is_three_hours_before_now() {
        let now = Utc.with_ymd_and_hms(2026, 8, 30, 12, 0, 0).unwrap();
        let cutoff = stale_cutoff(now, 3);
        assert_eq!(cutoff, Utc.with_ymd_and_hms(2026, 8, 30, 9, 0, 0).unwrap());
    }

    #[test]
    fn order_created_just_inside_window_survives() {
        let now = Utc.with_ymd_and_hms(2026, 8, 30, 12, 0, 0).unwrap();
        let cutoff = stale_cutoff(now, 3);
        let created_at = Utc.with_ymd_and_hms(2026, 8, 30, 9, 30, 0).unwrap();
        assert!(created_at >= cutoff);
    }
}
