use async_trait::async_trait;

use crate::error::GatewayResult;

/// What a restricted member may still do in a group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChatPermissions {
    pub can_send_messages: bool,
    pub can_send_media: bool,
    pub can_send_polls: bool,
    pub can_send_other: bool,
    pub can_add_previews: bool,
}

impl ChatPermissions {
    /// Read-only: every send permission revoked.
    pub const fn muted() -> Self {
        Self {
            can_send_messages: false,
            can_send_media: false,
            can_send_polls: false,
            can_send_other: false,
            can_add_previews: false,
        }
    }

    /// Every send permission restored.
    pub const fn unrestricted() -> Self {
        Self {
            can_send_messages: true,
            can_send_media: true,
            can_send_polls: true,
            can_send_other: true,
            can_add_previews: true,
        }
    }
}

/// Outbound side of the messaging platform, as seen by moderation logic.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    async fn send_message(&self, chat_id: i64, text: &str, silent: bool) -> GatewayResult<()>;

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> GatewayResult<()>;

    /// The user's profile bio; empty when they have none.
    async fn get_profile_text(&self, user_id: i64) -> GatewayResult<String>;

    async fn is_admin(&self, chat_id: i64, user_id: i64) -> GatewayResult<bool>;

    async fn restrict_member(
        &self,
        chat_id: i64,
        user_id: i64,
        permissions: ChatPermissions,
    ) -> GatewayResult<()>;

    /// Ban the member from the chat.
    async fn remove_member(&self, chat_id: i64, user_id: i64) -> GatewayResult<()>;
}
