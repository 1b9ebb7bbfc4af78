//! Process-local storage backend.
//!
//! Mirrors the Postgres contracts exactly. Every mutation of a single key runs
//! under that key's shard lock, so concurrent increments for the same
//! (group, user) serialize the same way Postgres row locks do.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};

use biolink_utils::time::is_expired;

use crate::model::group_policy::{GroupPolicy, PolicyField};
use crate::model::registrations::GroupRemoval;
use crate::model::warnings::WarningRecord;

type WarningKey = (i64, i64);

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    warnings: DashMap<WarningKey, WarningRecord>,
    policies: DashMap<i64, GroupPolicy>,
    groups: DashSet<i64>,
    users: DashSet<i64>,
}

impl MemoryStore {
    pub(crate) fn warning_count(&self, group_id: i64, user_id: i64, now: u64, window: u64) -> u32 {
        let key = (group_id, user_id);
        let stale = self
            .inner
            .warnings
            .remove_if(&key, |_, record| is_expired(record.last_warning_at, now, window));
        if stale.is_some() {
            return 0;
        }

        self.inner
            .warnings
            .get(&key)
            .map_or(0, |record| record.count)
    }

    pub(crate) fn record_violation(
        &self,
        group_id: i64,
        user_id: i64,
        now: u64,
        window: u64,
    ) -> WarningRecord {
        match self.inner.warnings.entry((group_id, user_id)) {
            Entry::Occupied(mut occupied) => {
                let record = occupied.get_mut();
                let base = if is_expired(record.last_warning_at, now, window) {
                    0
                } else {
                    record.count
                };
                *record = WarningRecord {
                    count: base.saturating_add(1),
                    last_warning_at: now,
                };
                *record
            }
            Entry::Vacant(vacant) => {
                let record = WarningRecord {
                    count: 1,
                    last_warning_at: now,
                };
                vacant.insert(record);
                record
            }
        }
    }

    pub(crate) fn reset_warning(&self, group_id: i64, user_id: i64) -> bool {
        self.inner.warnings.remove(&(group_id, user_id)).is_some()
    }

    pub(crate) fn reset_group_warnings(&self, group_id: i64) -> Vec<i64> {
        let mut cleared = Vec::new();
        self.inner.warnings.retain(|(group, user), _| {
            if *group == group_id {
                cleared.push(*user);
                false
            } else {
                true
            }
        });
        cleared.sort_unstable();
        cleared
    }

    pub(crate) fn group_policy(&self, group_id: i64) -> GroupPolicy {
        self.inner
            .policies
            .get(&group_id)
            .map(|policy| *policy)
            .unwrap_or_default()
    }

    pub(crate) fn ensure_group_policy(&self, group_id: i64) {
        self.inner.policies.entry(group_id).or_default();
    }

    pub(crate) fn set_group_policy_field(&self, group_id: i64, field: PolicyField, value: bool) {
        let mut policy = self.inner.policies.entry(group_id).or_default();
        field.apply(&mut policy, value);
    }

    pub(crate) fn register_group(&self, group_id: i64) -> bool {
        self.inner.groups.insert(group_id)
    }

    pub(crate) fn remove_group(&self, group_id: i64) -> GroupRemoval {
        GroupRemoval {
            warnings_removed: self.reset_group_warnings(group_id).len() as u64,
            policy_removed: self.inner.policies.remove(&group_id).is_some(),
            was_registered: self.inner.groups.remove(&group_id).is_some(),
        }
    }

    pub(crate) fn register_user(&self, user_id: i64) -> bool {
        self.inner.users.insert(user_id)
    }

    pub(crate) fn groups(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.inner.groups.iter().map(|id| *id).collect();
        ids.sort_unstable();
        ids
    }

    pub(crate) fn users(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.inner.users.iter().map(|id| *id).collect();
        ids.sort_unstable();
        ids
    }
}
