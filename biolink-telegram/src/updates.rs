//! Inbound side: the subset of Bot API updates the bot subscribes to, and
//! their mapping onto moderation events.

use std::time::Duration;

use serde::Deserialize;

use biolink_core::GatewayResult;

use crate::client::TelegramGateway;

#[derive(Clone, Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub my_chat_member: Option<ChatMemberUpdated>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
}

#[derive(Clone, Debug, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

impl User {
    pub fn display_name(&self) -> String {
        match &self.last_name {
            Some(last) if !last.is_empty() => format!("{} {}", self.first_name, last),
            _ => self.first_name.clone(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Chat {
    pub fn is_group(&self) -> bool {
        matches!(self.kind.as_str(), "group" | "supergroup")
    }

    pub fn is_private(&self) -> bool {
        self.kind == "private"
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChatMember {
    pub status: String,
    pub user: User,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChatMemberUpdated {
    pub chat: Chat,
    pub new_chat_member: ChatMember,
}

/// What an update means for moderation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundEvent {
    GroupMessage {
        group_id: i64,
        user_id: i64,
        message_id: i64,
        display_name: String,
    },
    PrivateMessage {
        user_id: i64,
    },
    BotAdded {
        group_id: i64,
    },
    BotRemoved {
        group_id: i64,
    },
}

impl InboundEvent {
    /// Classify an update. Returns `None` for anything moderation ignores:
    /// messages from bots, channel posts, membership changes in private chats.
    pub fn from_update(update: &Update) -> Option<Self> {
        if let Some(message) = &update.message {
            let from = message.from.as_ref().filter(|user| !user.is_bot)?;

            if message.chat.is_group() {
                return Some(Self::GroupMessage {
                    group_id: message.chat.id,
                    user_id: from.id,
                    message_id: message.message_id,
                    display_name: from.display_name(),
                });
            }

            if message.chat.is_private() {
                return Some(Self::PrivateMessage { user_id: from.id });
            }

            return None;
        }

        let change = update.my_chat_member.as_ref()?;
        if !change.chat.is_group() {
            return None;
        }

        let group_id = change.chat.id;
        match change.new_chat_member.status.as_str() {
            "left" | "kicked" => Some(Self::BotRemoved { group_id }),
            "member" | "administrator" | "restricted" => Some(Self::BotAdded { group_id }),
            _ => None,
        }
    }
}

/// Tracks the `getUpdates` offset so each update is delivered once.
#[derive(Debug)]
pub struct UpdatePoller {
    gateway: TelegramGateway,
    poll_timeout: Duration,
    offset: i64,
}

impl UpdatePoller {
    pub fn new(gateway: TelegramGateway, poll_timeout: Duration) -> Self {
        Self {
            gateway,
            poll_timeout,
            offset: 0,
        }
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Wait for the next batch and acknowledge it.
    pub async fn next_batch(&mut self) -> GatewayResult<Vec<Update>> {
        let updates = self
            .gateway
            .get_updates(self.offset, self.poll_timeout)
            .await?;

        if let Some(last) = updates.iter().map(|update| update.update_id).max() {
            self.offset = self.offset.max(last + 1);
        }

        Ok(updates)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::{Value, json};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::{InboundEvent, Update, UpdatePoller};
    use crate::client::TelegramGateway;

    fn update(value: Value) -> Update {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn group_messages_carry_author_and_message() {
        let event = InboundEvent::from_update(&update(json!({
            "update_id": 1,
            "message": {
                "message_id": 77,
                "from": { "id": 5, "is_bot": false, "first_name": "Ann", "last_name": "Lee" },
                "chat": { "id": -1001, "type": "supergroup" },
                "text": "hello"
            }
        })));

        assert_eq!(
            event,
            Some(InboundEvent::GroupMessage {
                group_id: -1001,
                user_id: 5,
                message_id: 77,
                display_name: "Ann Lee".to_owned(),
            })
        );
    }

    #[test]
    fn bots_and_channels_are_ignored() {
        let from_bot = update(json!({
            "update_id": 2,
            "message": {
                "message_id": 1,
                "from": { "id": 9, "is_bot": true, "first_name": "GroupAnonymousBot" },
                "chat": { "id": -1001, "type": "supergroup" }
            }
        }));
        let channel_post = update(json!({
            "update_id": 3,
            "message": {
                "message_id": 1,
                "from": { "id": 9, "is_bot": false, "first_name": "X" },
                "chat": { "id": -1002, "type": "channel" }
            }
        }));

        assert_eq!(InboundEvent::from_update(&from_bot), None);
        assert_eq!(InboundEvent::from_update(&channel_post), None);
    }

    #[test]
    fn private_messages_register_users() {
        let event = InboundEvent::from_update(&update(json!({
            "update_id": 4,
            "message": {
                "message_id": 1,
                "from": { "id": 12, "is_bot": false, "first_name": "Sam" },
                "chat": { "id": 12, "type": "private" },
                "text": "/start"
            }
        })));
        assert_eq!(event, Some(InboundEvent::PrivateMessage { user_id: 12 }));
    }

    #[test]
    fn membership_changes_map_to_added_and_removed() {
        let change = |chat_type: &str, status: &str| {
            update(json!({
                "update_id": 5,
                "my_chat_member": {
                    "chat": { "id": -1003, "type": chat_type },
                    "new_chat_member": {
                        "status": status,
                        "user": { "id": 4242, "is_bot": true, "first_name": "BioGuard" }
                    }
                }
            }))
        };

        assert_eq!(
            InboundEvent::from_update(&change("group", "kicked")),
            Some(InboundEvent::BotRemoved { group_id: -1003 })
        );
        assert_eq!(
            InboundEvent::from_update(&change("supergroup", "administrator")),
            Some(InboundEvent::BotAdded { group_id: -1003 })
        );
        assert_eq!(InboundEvent::from_update(&change("private", "kicked")), None);
    }

    #[tokio::test]
    async fn poller_advances_past_delivered_updates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot1:t/getUpdates"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": [
                    { "update_id": 40 },
                    { "update_id": 41 }
                ]
            })))
            .mount(&server)
            .await;

        let gateway = TelegramGateway::new(&server.uri(), "1:t", Duration::from_secs(2)).unwrap();
        let mut poller = UpdatePoller::new(gateway, Duration::from_secs(0));

        let batch = poller.next_batch().await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(poller.offset(), 42);

        poller.next_batch().await.unwrap();
        let requests = server.received_requests().await.unwrap();
        let second: Value = serde_json::from_slice(&requests[1].body).unwrap();
        assert_eq!(second["offset"], json!(42));
        assert_eq!(second["allowed_updates"], json!(["message", "my_chat_member"]));
    }
}
