pub mod bio_link;
pub mod membership;

use biolink_moderation::ModerationController;
use biolink_telegram::InboundEvent;

/// Route one classified update to the moderation controller.
pub async fn handle_event(controller: &ModerationController, event: InboundEvent) {
    match event {
        InboundEvent::GroupMessage {
            group_id,
            user_id,
            message_id,
            display_name,
        } => {
            bio_link::handle_group_message(controller, group_id, user_id, message_id, &display_name)
                .await
        }
        InboundEvent::PrivateMessage { user_id } => {
            membership::handle_private_message(controller, user_id).await
        }
        InboundEvent::BotAdded { group_id } => {
            membership::handle_bot_added(controller, group_id).await
        }
        InboundEvent::BotRemoved { group_id } => {
            membership::handle_bot_removed(controller, group_id).await
        }
    }
}
