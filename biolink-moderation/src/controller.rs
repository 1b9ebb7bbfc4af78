//! Moderation controller: turns bio-link events into store mutations and
//! platform side effects.
//!
//! Stores are the source of truth. A store failure aborts the operation
//! before any side effect runs; a gateway failure is logged and reported in
//! the outcome but never rolls back what was already stored.

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use biolink_core::{
    ChatPermissions, Clock, GatewayError, GatewayResult, MessagingGateway, ModerationConfig,
};
use biolink_database::Database;
use biolink_database::impls::group_policy::{
    ensure_group_policy, get_group_policy, set_group_policy_field,
};
use biolink_database::impls::registrations::{register_group, register_user, remove_group};
use biolink_database::impls::warnings::{record_violation, reset_group_warnings, reset_warning};
use biolink_database::model::group_policy::PolicyField;
use biolink_database::model::registrations::GroupRemoval;
use biolink_utils::detection::contains_bio_link;
use biolink_utils::formatting::format_member_label;
use biolink_utils::text;

use crate::escalation::{EnforcementAction, decide};

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("storage failure while trying to {operation}")]
    Store {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

fn store_error(operation: &'static str) -> impl FnOnce(anyhow::Error) -> ModerationError {
    move |source| ModerationError::Store { operation, source }
}

/// A group message from a member whose profile matched the bio-link heuristic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub group_id: i64,
    pub user_id: i64,
    pub message_id: i64,
    pub display_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViolationOutcome {
    /// Live warning count after this violation.
    pub count: u32,
    pub action: EnforcementAction,
    pub gateway_failures: Vec<GatewayError>,
    /// The bot turned out to be gone from the group and its records were dropped.
    pub group_removed: bool,
}

/// Result of screening one inbound group message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Screening {
    /// Profile has no bio link.
    Clean,
    /// Profile has a bio link but the member is a group admin.
    Exempt,
    /// Profile or admin lookup failed; the message was left alone.
    Skipped(GatewayError),
    Violation(ViolationOutcome),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResetOutcome {
    /// Members whose warnings were cleared.
    pub user_ids: Vec<i64>,
    /// Restriction lifts that failed, by member.
    pub gateway_failures: Vec<(i64, GatewayError)>,
    pub group_removed: bool,
}

pub struct ModerationController {
    db: Database,
    gateway: Arc<dyn MessagingGateway>,
    clock: Arc<dyn Clock>,
    config: ModerationConfig,
}

impl ModerationController {
    pub fn new(
        db: Database,
        gateway: Arc<dyn MessagingGateway>,
        clock: Arc<dyn Clock>,
        config: ModerationConfig,
    ) -> Self {
        Self {
            db: db.with_warning_expiry(config.warning_expiry),
            gateway,
            clock,
            config,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Check a group message author's profile and handle a violation if it links out.
    pub async fn inspect_message(
        &self,
        group_id: i64,
        user_id: i64,
        message_id: i64,
        display_name: Option<&str>,
    ) -> Result<Screening, ModerationError> {
        let profile = match self
            .call("getChat", || self.gateway.get_profile_text(user_id))
            .await
        {
            Ok(profile) => profile,
            Err(source) => {
                // The lookup targets the user's own chat, so this never says
                // anything about the group.
                debug!(?source, user_id, "profile lookup failed; skipping message");
                return Ok(Screening::Skipped(source));
            }
        };

        if !contains_bio_link(&profile) {
            return Ok(Screening::Clean);
        }

        match self
            .call("getChatAdministrators", || {
                self.gateway.is_admin(group_id, user_id)
            })
            .await
        {
            Ok(true) => return Ok(Screening::Exempt),
            Ok(false) => {}
            Err(source) => {
                warn!(?source, group_id, user_id, "admin lookup failed; skipping message");
                if source.is_chat_unavailable() {
                    self.cleanup_after_gateway_loss(group_id).await;
                }
                return Ok(Screening::Skipped(source));
            }
        }

        let violation = Violation {
            group_id,
            user_id,
            message_id,
            display_name: display_name.map(str::to_owned),
        };

        self.on_violation(&violation).await.map(Screening::Violation)
    }

    /// Record a violation, then delete the message, enforce and notify.
    ///
    /// The count returned by the store is the only count used for all three
    /// side effects.
    pub async fn on_violation(
        &self,
        violation: &Violation,
    ) -> Result<ViolationOutcome, ModerationError> {
        let Violation {
            group_id,
            user_id,
            message_id,
            ..
        } = *violation;
        let now = self.clock.now_unix_secs();

        let policy = get_group_policy(&self.db, group_id)
            .await
            .map_err(store_error("read group policy"))?;
        let record = record_violation(&self.db, group_id, user_id, now)
            .await
            .map_err(store_error("record warning"))?;

        let decision = decide(
            record.count.saturating_sub(1),
            policy,
            self.config.warning_threshold,
        );
        let count = decision.new_count;
        let action = decision.action;

        info!(
            group_id,
            user_id,
            count,
            threshold = self.config.warning_threshold,
            action = action.as_str(),
            "bio link violation"
        );

        let member = format_member_label(user_id, violation.display_name.as_deref());
        let mut effects = SideEffects::new(group_id);

        let deleted = self
            .call("deleteMessage", || {
                self.gateway.delete_message(group_id, message_id)
            })
            .await;
        effects.observe("delete offending message", deleted);

        let mut enforced = false;
        if action.restricts() && effects.chat_available() {
            let result = match action {
                EnforcementAction::Ban => {
                    self.call("banChatMember", || {
                        self.gateway.remove_member(group_id, user_id)
                    })
                    .await
                }
                _ => {
                    self.call("restrictChatMember", || {
                        self.gateway
                            .restrict_member(group_id, user_id, ChatPermissions::muted())
                    })
                    .await
                }
            };
            enforced = effects.observe("enforce escalation", result);
        }

        if effects.chat_available() {
            let notice = match action {
                EnforcementAction::Ban if enforced => text::ban_notice(&member, count),
                EnforcementAction::Mute if enforced => text::mute_notice(&member, count),
                _ => text::warning_notice(
                    &member,
                    count,
                    self.config.warning_threshold,
                    self.config.warning_expiry.as_secs(),
                ),
            };
            let sent = self
                .call("sendMessage", || {
                    self.gateway.send_message(group_id, &notice, false)
                })
                .await;
            effects.observe("post warning notice", sent);
        }

        let group_removed = self.finish(effects.chat_unavailable, group_id).await;

        Ok(ViolationOutcome {
            count,
            action,
            gateway_failures: effects.failures,
            group_removed,
        })
    }

    /// Clear one member's warnings and lift any restriction.
    pub async fn reset_one(
        &self,
        group_id: i64,
        user_id: i64,
    ) -> Result<ResetOutcome, ModerationError> {
        if let Err(source) = reset_warning(&self.db, group_id, user_id).await {
            self.acknowledge(group_id, text::RESET_FAILED).await;
            return Err(store_error("reset member warnings")(source));
        }

        info!(group_id, user_id, "warnings reset for member");

        let mut outcome = ResetOutcome {
            user_ids: vec![user_id],
            ..ResetOutcome::default()
        };

        let mut effects = SideEffects::new(group_id);
        let lifted = self.lift_restriction(group_id, user_id).await;
        if let Err(source) = &lifted {
            outcome.gateway_failures.push((user_id, source.clone()));
        }
        effects.observe("lift restriction", lifted);

        if effects.chat_available() {
            let ack = text::reset_one_ok(user_id);
            effects.observe("acknowledge reset", self.send_ack(group_id, &ack).await);
        }

        outcome.group_removed = self.finish(effects.chat_unavailable, group_id).await;
        Ok(outcome)
    }

    /// Clear every member's warnings in a group and lift their restrictions.
    ///
    /// Each lift is independent; one member failing does not stop the rest.
    pub async fn reset_all(&self, group_id: i64) -> Result<ResetOutcome, ModerationError> {
        let user_ids = match reset_group_warnings(&self.db, group_id).await {
            Ok(user_ids) => user_ids,
            Err(source) => {
                self.acknowledge(group_id, text::RESET_FAILED).await;
                return Err(store_error("reset group warnings")(source));
            }
        };

        info!(group_id, members = user_ids.len(), "warnings reset for group");

        let mut effects = SideEffects::new(group_id);
        let mut gateway_failures = Vec::new();

        for &user_id in &user_ids {
            if !effects.chat_available() {
                break;
            }

            let lifted = self.lift_restriction(group_id, user_id).await;
            if let Err(source) = &lifted {
                gateway_failures.push((user_id, source.clone()));
            }
            effects.observe("lift restriction", lifted);
        }

        if effects.chat_available() {
            effects.observe(
                "acknowledge reset",
                self.send_ack(group_id, text::RESET_ALL_OK).await,
            );
        }

        let group_removed = self.finish(effects.chat_unavailable, group_id).await;
        Ok(ResetOutcome {
            user_ids,
            gateway_failures,
            group_removed,
        })
    }

    /// Flip a group's mute or ban switch. Existing warnings are not re-evaluated.
    pub async fn set_policy(
        &self,
        group_id: i64,
        field: PolicyField,
        value: bool,
    ) -> Result<(), ModerationError> {
        if let Err(source) = set_group_policy_field(&self.db, group_id, field, value).await {
            self.acknowledge(group_id, text::POLICY_FAILED).await;
            return Err(store_error("update group policy")(source));
        }

        info!(group_id, field = field.label(), value, "group policy updated");
        self.acknowledge(group_id, &text::policy_notice(field.label(), value))
            .await;
        Ok(())
    }

    /// Drop everything stored for a group the bot no longer belongs to.
    pub async fn on_group_removed(&self, group_id: i64) -> Result<GroupRemoval, ModerationError> {
        let removal = remove_group(&self.db, group_id)
            .await
            .map_err(store_error("remove group records"))?;

        info!(
            group_id,
            warnings_removed = removal.warnings_removed,
            policy_removed = removal.policy_removed,
            "group records removed"
        );

        Ok(removal)
    }

    /// Register a group and give it a default policy row. Returns `true` the first time.
    pub async fn on_group_seen(&self, group_id: i64) -> Result<bool, ModerationError> {
        let first_seen = register_group(&self.db, group_id)
            .await
            .map_err(store_error("register group"))?;
        if first_seen {
            ensure_group_policy(&self.db, group_id)
                .await
                .map_err(store_error("create group policy"))?;
            debug!(group_id, "new group registered");
        }
        Ok(first_seen)
    }

    /// The bot was added to a group: register it and post the command overview.
    pub async fn on_bot_added(&self, group_id: i64) -> Result<(), ModerationError> {
        self.on_group_seen(group_id).await?;
        let welcome = text::welcome_text(self.config.warning_threshold);
        self.acknowledge(group_id, &welcome).await;
        Ok(())
    }

    /// A user opened a private chat with the bot.
    pub async fn on_private_user(&self, user_id: i64) -> Result<bool, ModerationError> {
        register_user(&self.db, user_id)
            .await
            .map_err(store_error("register user"))
    }

    /// Restore full send permissions. This lifts a mute only: the gateway has
    /// no unban, so a member removed under ban mode has to be unbanned by an
    /// admin on the platform even though their warnings are cleared.
    async fn lift_restriction(&self, group_id: i64, user_id: i64) -> GatewayResult<()> {
        self.call("restrictChatMember", || {
            self.gateway
                .restrict_member(group_id, user_id, ChatPermissions::unrestricted())
        })
        .await
    }

    async fn send_ack(&self, group_id: i64, message: &str) -> GatewayResult<()> {
        self.call("sendMessage", || {
            self.gateway.send_message(group_id, message, false)
        })
        .await
    }

    /// Post an acknowledgement, cleaning up if the group turns out to be gone.
    async fn acknowledge(&self, group_id: i64, message: &str) {
        let mut effects = SideEffects::new(group_id);
        effects.observe("acknowledge command", self.send_ack(group_id, message).await);
        self.finish(effects.chat_unavailable, group_id).await;
    }

    async fn finish(&self, chat_unavailable: bool, group_id: i64) -> bool {
        if chat_unavailable {
            self.cleanup_after_gateway_loss(group_id).await
        } else {
            false
        }
    }

    async fn cleanup_after_gateway_loss(&self, group_id: i64) -> bool {
        warn!(group_id, "bot can no longer act in group; removing its records");
        match self.on_group_removed(group_id).await {
            Ok(_) => true,
            Err(source) => {
                error!(?source, group_id, "failed to clean up unavailable group");
                false
            }
        }
    }

    /// Run one gateway call under the configured timeout, retrying transient failures.
    async fn call<T, F, Fut>(&self, method: &'static str, op: F) -> GatewayResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = GatewayResult<T>>,
    {
        let attempts = self.config.gateway_attempts.max(1);
        let mut attempt = 1;

        loop {
            let result = match timeout(self.config.gateway_timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(GatewayError::timed_out(method, self.config.gateway_timeout)),
            };

            match result {
                Err(source) if source.is_transient() && attempt < attempts => {
                    debug!(?source, method, attempt, "retrying gateway call");
                    sleep(self.config.gateway_retry_backoff * attempt).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

/// Failure bookkeeping for the gateway calls of one operation.
struct SideEffects {
    group_id: i64,
    failures: Vec<GatewayError>,
    chat_unavailable: bool,
}

impl SideEffects {
    fn new(group_id: i64) -> Self {
        Self {
            group_id,
            failures: Vec::new(),
            chat_unavailable: false,
        }
    }

    fn chat_available(&self) -> bool {
        !self.chat_unavailable
    }

    /// Log a failed call and remember it. Returns whether the call succeeded.
    fn observe<T>(&mut self, step: &'static str, result: GatewayResult<T>) -> bool {
        let Err(source) = result else {
            return true;
        };

        match &source {
            GatewayError::Transient { .. } => {
                error!(?source, group_id = self.group_id, step, "gateway call failed")
            }
            GatewayError::Permission { .. } => warn!(
                ?source,
                group_id = self.group_id,
                step,
                "missing permissions (check the bot's admin rights)"
            ),
            GatewayError::TargetNotFound { .. } => {
                debug!(?source, group_id = self.group_id, step, "gateway target vanished")
            }
            GatewayError::ChatUnavailable { .. } => {
                warn!(?source, group_id = self.group_id, step, "group unavailable");
                self.chat_unavailable = true;
            }
        }

        self.failures.push(source);
        false
    }
}
