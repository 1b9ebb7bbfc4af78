use tracing::{error, info};

use biolink_moderation::ModerationController;

pub async fn handle_bot_added(controller: &ModerationController, group_id: i64) {
    match controller.on_bot_added(group_id).await {
        Ok(()) => info!(group_id, "bot added to group"),
        Err(source) => error!(?source, group_id, "failed to set up new group"),
    }
}

pub async fn handle_bot_removed(controller: &ModerationController, group_id: i64) {
    match controller.on_group_removed(group_id).await {
        Ok(cleanup) => info!(
            group_id,
            warnings_removed = cleanup.warnings_removed,
            "bot removed from group"
        ),
        Err(source) => error!(?source, group_id, "failed to clean up removed group"),
    }
}

pub async fn handle_private_message(controller: &ModerationController, user_id: i64) {
    if let Err(source) = controller.on_private_user(user_id).await {
        error!(?source, user_id, "failed to register private user");
    }
}
