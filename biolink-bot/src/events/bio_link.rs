use tracing::{debug, error, info};

use biolink_moderation::{ModerationController, Screening};

/// Screen a group message author's bio and enforce when it carries a link.
pub async fn handle_group_message(
    controller: &ModerationController,
    group_id: i64,
    user_id: i64,
    message_id: i64,
    display_name: &str,
) {
    if let Err(source) = controller.on_group_seen(group_id).await {
        error!(?source, group_id, "failed to register group");
    }

    let screening = match controller
        .inspect_message(group_id, user_id, message_id, Some(display_name))
        .await
    {
        Ok(screening) => screening,
        Err(source) => {
            error!(?source, group_id, user_id, "failed to handle bio link violation");
            return;
        }
    };

    match screening {
        Screening::Clean => {}
        Screening::Exempt => debug!(group_id, user_id, "admin with bio link exempted"),
        Screening::Skipped(source) => {
            debug!(?source, group_id, user_id, "message not screened")
        }
        Screening::Violation(outcome) => {
            if !outcome.gateway_failures.is_empty() {
                info!(
                    group_id,
                    user_id,
                    failures = outcome.gateway_failures.len(),
                    group_removed = outcome.group_removed,
                    "violation handled with gateway failures"
                );
            }
        }
    }
}
