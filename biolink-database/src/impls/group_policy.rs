use crate::cache::{CONFIG_CACHE_TTL, group_policy_key, invalidate_group_policy};
use crate::database::{Database, StorageBackend};
use crate::model::group_policy::{GroupPolicy, PolicyField};

/// Policy for a group, defaulting to warn-only when the group was never configured.
pub async fn get_group_policy(db: &Database, group_id: i64) -> anyhow::Result<GroupPolicy> {
    let pool = match db.backend() {
        StorageBackend::Memory(store) => return Ok(store.group_policy(group_id)),
        StorageBackend::Postgres(pool) => pool,
    };

    let cache_key = group_policy_key(db.cache(), group_id);
    db.cache()
        .get_or_load_json(&cache_key, CONFIG_CACHE_TTL, || async {
            let policy: Option<GroupPolicy> = sqlx::query_as(
                "SELECT mute_enabled, ban_enabled FROM group_policy WHERE group_id = $1",
            )
            .bind(group_id)
            .fetch_optional(pool)
            .await?;

            Ok(policy.unwrap_or_default())
        })
        .await
}

/// Create the default policy row for a newly seen group. Existing rows are kept.
pub async fn ensure_group_policy(db: &Database, group_id: i64) -> anyhow::Result<()> {
    let pool = match db.backend() {
        StorageBackend::Memory(store) => {
            store.ensure_group_policy(group_id);
            return Ok(());
        }
        StorageBackend::Postgres(pool) => pool,
    };

    sqlx::query(
        "INSERT INTO group_policy (group_id) VALUES ($1)
         ON CONFLICT (group_id) DO NOTHING",
    )
    .bind(group_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Flip one policy switch, creating the group's row if needed.
pub async fn set_group_policy_field(
    db: &Database,
    group_id: i64,
    field: PolicyField,
    value: bool,
) -> anyhow::Result<()> {
    let pool = match db.backend() {
        StorageBackend::Memory(store) => {
            store.set_group_policy_field(group_id, field, value);
            return Ok(());
        }
        StorageBackend::Postgres(pool) => pool,
    };

    let statement = match field {
        PolicyField::Mute => {
            "INSERT INTO group_policy (group_id, mute_enabled) VALUES ($1, $2)
             ON CONFLICT (group_id) DO UPDATE SET mute_enabled = EXCLUDED.mute_enabled"
        }
        PolicyField::Ban => {
            "INSERT INTO group_policy (group_id, ban_enabled) VALUES ($1, $2)
             ON CONFLICT (group_id) DO UPDATE SET ban_enabled = EXCLUDED.ban_enabled"
        }
    };

    sqlx::query(statement)
        .bind(group_id)
        .bind(value)
        .execute(pool)
        .await?;

    invalidate_group_policy(db.cache(), group_id).await;

    Ok(())
}
