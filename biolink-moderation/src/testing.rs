//! In-process gateway fake that records every call.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use biolink_core::{ChatPermissions, GatewayError, GatewayResult, MessagingGateway};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Send { chat_id: i64, text: String },
    Delete { chat_id: i64, message_id: i64 },
    Profile { user_id: i64 },
    IsAdmin { chat_id: i64, user_id: i64 },
    Restrict { chat_id: i64, user_id: i64, permissions: ChatPermissions },
    Remove { chat_id: i64, user_id: i64 },
}

#[derive(Debug, Default)]
pub struct RecordingGateway {
    calls: Mutex<Vec<Call>>,
    profiles: Mutex<HashMap<i64, String>>,
    admins: Mutex<HashSet<(i64, i64)>>,
    /// Failures keyed by method name, consumed in order.
    failures: Mutex<HashMap<&'static str, Vec<GatewayError>>>,
    /// Restrict failures for specific users, applied on every call.
    user_failures: Mutex<HashMap<i64, GatewayError>>,
    delay: Mutex<Option<Duration>>,
}

impl RecordingGateway {
    pub fn with_profile(self, user_id: i64, bio: &str) -> Self {
        self.profiles.lock().unwrap().insert(user_id, bio.to_owned());
        self
    }

    pub fn with_admin(self, chat_id: i64, user_id: i64) -> Self {
        self.admins.lock().unwrap().insert((chat_id, user_id));
        self
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock().unwrap() = Some(delay);
        self
    }

    pub fn fail_next(&self, method: &'static str, error: GatewayError) {
        self.failures
            .lock()
            .unwrap()
            .entry(method)
            .or_default()
            .push(error);
    }

    pub fn fail_restrict_for(&self, user_id: i64, error: GatewayError) {
        self.user_failures.lock().unwrap().insert(user_id, error);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sent_texts(&self, chat_id: i64) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Send { chat_id: c, text } if c == chat_id => Some(text),
                _ => None,
            })
            .collect()
    }

    async fn enter(&self, method: &'static str, call: Call) -> GatewayResult<()> {
        self.calls.lock().unwrap().push(call);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut failures = self.failures.lock().unwrap();
        match failures.get_mut(method) {
            Some(queue) if !queue.is_empty() => Err(queue.remove(0)),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl MessagingGateway for RecordingGateway {
    async fn send_message(&self, chat_id: i64, text: &str, _silent: bool) -> GatewayResult<()> {
        self.enter(
            "sendMessage",
            Call::Send {
                chat_id,
                text: text.to_owned(),
            },
        )
        .await
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> GatewayResult<()> {
        self.enter("deleteMessage", Call::Delete { chat_id, message_id })
            .await
    }

    async fn get_profile_text(&self, user_id: i64) -> GatewayResult<String> {
        self.enter("getChat", Call::Profile { user_id }).await?;
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn is_admin(&self, chat_id: i64, user_id: i64) -> GatewayResult<bool> {
        self.enter("getChatAdministrators", Call::IsAdmin { chat_id, user_id })
            .await?;
        Ok(self.admins.lock().unwrap().contains(&(chat_id, user_id)))
    }

    async fn restrict_member(
        &self,
        chat_id: i64,
        user_id: i64,
        permissions: ChatPermissions,
    ) -> GatewayResult<()> {
        self.enter(
            "restrictChatMember",
            Call::Restrict {
                chat_id,
                user_id,
                permissions,
            },
        )
        .await?;

        match self.user_failures.lock().unwrap().get(&user_id) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn remove_member(&self, chat_id: i64, user_id: i64) -> GatewayResult<()> {
        self.enter("banChatMember", Call::Remove { chat_id, user_id })
            .await
    }
}
