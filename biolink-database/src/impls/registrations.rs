//! Known groups and private users, and the cleanup when the bot leaves a group.

use anyhow::Context as _;
use biolink_utils::time::now_unix_secs;

use crate::cache::invalidate_group_policy;
use crate::database::{Database, StorageBackend};
use crate::model::registrations::{GroupRegistration, GroupRemoval, UserRegistration};

/// Returns `true` when the group was not registered before.
pub async fn register_group(db: &Database, group_id: i64) -> anyhow::Result<bool> {
    let pool = match db.backend() {
        StorageBackend::Memory(store) => return Ok(store.register_group(group_id)),
        StorageBackend::Postgres(pool) => pool,
    };

    let inserted = sqlx::query(
        "INSERT INTO known_groups (group_id, registered_at) VALUES ($1, $2)
         ON CONFLICT (group_id) DO NOTHING",
    )
    .bind(group_id)
    .bind(registered_at()?)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(inserted > 0)
}

/// Drop every record kept for a group in one transaction: warnings, policy
/// and registration go together or not at all.
pub async fn remove_group(db: &Database, group_id: i64) -> anyhow::Result<GroupRemoval> {
    let pool = match db.backend() {
        StorageBackend::Memory(store) => return Ok(store.remove_group(group_id)),
        StorageBackend::Postgres(pool) => pool,
    };

    let mut tx = pool.begin().await?;

    let warnings_removed = sqlx::query("DELETE FROM bio_warnings WHERE group_id = $1")
        .bind(group_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let policy_removed = sqlx::query("DELETE FROM group_policy WHERE group_id = $1")
        .bind(group_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let was_registered = sqlx::query("DELETE FROM known_groups WHERE group_id = $1")
        .bind(group_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;

    invalidate_group_policy(db.cache(), group_id).await;

    Ok(GroupRemoval {
        warnings_removed,
        policy_removed: policy_removed > 0,
        was_registered: was_registered > 0,
    })
}

/// Returns `true` when the user was not registered before.
pub async fn register_user(db: &Database, user_id: i64) -> anyhow::Result<bool> {
    let pool = match db.backend() {
        StorageBackend::Memory(store) => return Ok(store.register_user(user_id)),
        StorageBackend::Postgres(pool) => pool,
    };

    let inserted = sqlx::query(
        "INSERT INTO known_users (user_id, registered_at) VALUES ($1, $2)
         ON CONFLICT (user_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(registered_at()?)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(inserted > 0)
}

pub async fn list_groups(db: &Database) -> anyhow::Result<Vec<GroupRegistration>> {
    let ids = match db.backend() {
        StorageBackend::Memory(store) => store.groups(),
        StorageBackend::Postgres(pool) => {
            sqlx::query_scalar("SELECT group_id FROM known_groups ORDER BY group_id")
                .fetch_all(pool)
                .await?
        }
    };

    Ok(ids
        .into_iter()
        .map(|group_id| GroupRegistration { group_id })
        .collect())
}

pub async fn list_users(db: &Database) -> anyhow::Result<Vec<UserRegistration>> {
    let ids = match db.backend() {
        StorageBackend::Memory(store) => store.users(),
        StorageBackend::Postgres(pool) => {
            sqlx::query_scalar("SELECT user_id FROM known_users ORDER BY user_id")
                .fetch_all(pool)
                .await?
        }
    };

    Ok(ids
        .into_iter()
        .map(|user_id| UserRegistration { user_id })
        .collect())
}

fn registered_at() -> anyhow::Result<i64> {
    i64::try_from(now_unix_secs()).context("registered_at out of i64 range")
}
