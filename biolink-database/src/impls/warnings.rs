//! Warning store: (group, user) -> (count, last warning time).
//!
//! Expiry is read-triggered. A record older than the handle's warning expiry
//! is deleted by the next read and restarted at 1 by the next violation.

use anyhow::Context as _;

use crate::database::{Database, StorageBackend};
use crate::model::warnings::WarningRecord;

#[derive(sqlx::FromRow)]
struct WarningRow {
    count: i32,
    last_warning_at: i64,
}

impl TryFrom<WarningRow> for WarningRecord {
    type Error = anyhow::Error;

    fn try_from(row: WarningRow) -> anyhow::Result<Self> {
        Ok(Self {
            count: u32::try_from(row.count).context("warning count row out of u32 range")?,
            last_warning_at: u64::try_from(row.last_warning_at)
                .context("last_warning_at row out of u64 range")?,
        })
    }
}

/// Current live warning count for a member, deleting the record if it expired.
pub async fn warning_count(
    db: &Database,
    group_id: i64,
    user_id: i64,
    now: u64,
) -> anyhow::Result<u32> {
    let window = db.warning_expiry().as_secs();

    let pool = match db.backend() {
        StorageBackend::Memory(store) => {
            return Ok(store.warning_count(group_id, user_id, now, window));
        }
        StorageBackend::Postgres(pool) => pool,
    };

    let stale_before = stale_before(now, window)?;

    sqlx::query(
        "DELETE FROM bio_warnings
         WHERE group_id = $1 AND user_id = $2 AND last_warning_at < $3",
    )
    .bind(group_id)
    .bind(user_id)
    .bind(stale_before)
    .execute(pool)
    .await?;

    let count: Option<i32> =
        sqlx::query_scalar("SELECT count FROM bio_warnings WHERE group_id = $1 AND user_id = $2")
            .bind(group_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

    count
        .map(u32::try_from)
        .transpose()
        .context("warning count row out of u32 range")
        .map(Option::unwrap_or_default)
}

/// Record one violation and return the resulting record.
///
/// Runs as a single upsert so that concurrent violations for the same member
/// each observe a distinct count. An expired record restarts at 1.
pub async fn record_violation(
    db: &Database,
    group_id: i64,
    user_id: i64,
    now: u64,
) -> anyhow::Result<WarningRecord> {
    let window = db.warning_expiry().as_secs();

    let pool = match db.backend() {
        StorageBackend::Memory(store) => {
            return Ok(store.record_violation(group_id, user_id, now, window));
        }
        StorageBackend::Postgres(pool) => pool,
    };

    let now_i64 = i64::try_from(now).context("now out of i64 range")?;
    let stale_before = stale_before(now, window)?;

    let row: WarningRow = sqlx::query_as(
        "INSERT INTO bio_warnings (group_id, user_id, count, last_warning_at)
         VALUES ($1, $2, 1, $3)
         ON CONFLICT (group_id, user_id) DO UPDATE SET
             count = CASE
                 WHEN bio_warnings.last_warning_at < $4 THEN 1
                 ELSE bio_warnings.count + 1
             END,
             last_warning_at = EXCLUDED.last_warning_at
         RETURNING count, last_warning_at",
    )
    .bind(group_id)
    .bind(user_id)
    .bind(now_i64)
    .bind(stale_before)
    .fetch_one(pool)
    .await?;

    row.try_into()
}

/// Delete a member's record. Returns whether one existed.
pub async fn reset_warning(db: &Database, group_id: i64, user_id: i64) -> anyhow::Result<bool> {
    let pool = match db.backend() {
        StorageBackend::Memory(store) => return Ok(store.reset_warning(group_id, user_id)),
        StorageBackend::Postgres(pool) => pool,
    };

    let deleted = sqlx::query("DELETE FROM bio_warnings WHERE group_id = $1 AND user_id = $2")
        .bind(group_id)
        .bind(user_id)
        .execute(pool)
        .await?
        .rows_affected();

    Ok(deleted > 0)
}

/// Delete every record in a group and return the affected user ids.
pub async fn reset_group_warnings(db: &Database, group_id: i64) -> anyhow::Result<Vec<i64>> {
    let pool = match db.backend() {
        StorageBackend::Memory(store) => return Ok(store.reset_group_warnings(group_id)),
        StorageBackend::Postgres(pool) => pool,
    };

    let mut user_ids: Vec<i64> =
        sqlx::query_scalar("DELETE FROM bio_warnings WHERE group_id = $1 RETURNING user_id")
            .bind(group_id)
            .fetch_all(pool)
            .await?;

    user_ids.sort_unstable();
    Ok(user_ids)
}

fn stale_before(now: u64, window: u64) -> anyhow::Result<i64> {
    i64::try_from(now.saturating_sub(window)).context("expiry cutoff out of i64 range")
}
