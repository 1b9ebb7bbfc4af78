use std::fmt;
use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::{Value, json};
use tracing::debug;

use biolink_core::{BotConfig, ChatPermissions, GatewayError, GatewayResult, MessagingGateway};

use crate::errors::{classify_api_error, transport_error};
use crate::updates::{ChatMember, Update, User};

#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    error_code: Option<u16>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct ChatInfo {
    bio: Option<String>,
}

/// The bot's own account, as reported by `getMe`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BotIdentity {
    pub id: i64,
    pub username: Option<String>,
}

/// Bot API client. Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct TelegramGateway {
    http: reqwest::Client,
    endpoint: String,
}

impl fmt::Debug for TelegramGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The endpoint embeds the bot token.
        f.debug_struct("TelegramGateway").finish_non_exhaustive()
    }
}

impl TelegramGateway {
    pub fn new(api_url: &str, token: &str, request_timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("failed to build Telegram HTTP client")?;

        Ok(Self {
            http,
            endpoint: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
        })
    }

    pub fn from_config(config: &BotConfig) -> anyhow::Result<Self> {
        Self::new(&config.telegram_api_url, &config.bot_token, config.http_timeout)
    }

    pub async fn get_me(&self) -> GatewayResult<BotIdentity> {
        let me: User = self.call("getMe", json!({})).await?;
        Ok(BotIdentity {
            id: me.id,
            username: me.username,
        })
    }

    /// Long-poll for updates after `offset`. The request is allowed to stay
    /// open for `poll_timeout` on top of the client's own timeout.
    pub async fn get_updates(
        &self,
        offset: i64,
        poll_timeout: Duration,
    ) -> GatewayResult<Vec<Update>> {
        let body = json!({
            "offset": offset,
            "timeout": poll_timeout.as_secs(),
            "allowed_updates": ["message", "my_chat_member"],
        });
        self.call_with_timeout("getUpdates", body, Some(poll_timeout))
            .await
    }

    async fn call<T>(&self, method: &'static str, body: Value) -> GatewayResult<T>
    where
        T: DeserializeOwned,
    {
        self.call_with_timeout(method, body, None).await
    }

    async fn call_with_timeout<T>(
        &self,
        method: &'static str,
        body: Value,
        extra_timeout: Option<Duration>,
    ) -> GatewayResult<T>
    where
        T: DeserializeOwned,
    {
        let mut request = self
            .http
            .post(format!("{}/{}", self.endpoint, method))
            .json(&body);
        if let Some(extra) = extra_timeout {
            // Per-request timeouts replace the client default, so add the two.
            request = request.timeout(extra + Duration::from_secs(10));
        }

        let response = request
            .send()
            .await
            .map_err(|source| transport_error(method, &source))?;
        let status = response.status();

        let payload: ApiResponse<T> = match response.json().await {
            Ok(payload) => payload,
            Err(source) if status.is_success() => return Err(transport_error(method, &source)),
            Err(_) => {
                let reason = status.canonical_reason().unwrap_or("unknown status");
                return Err(classify_api_error(method, status.as_u16(), reason));
            }
        };

        if !payload.ok {
            let error_code = payload.error_code.unwrap_or(status.as_u16());
            let description = payload.description.unwrap_or_default();
            debug!(method, error_code, %description, "Bot API call rejected");
            return Err(classify_api_error(method, error_code, &description));
        }

        payload.result.ok_or_else(|| GatewayError::Transient {
            method,
            message: "response carried no result".to_owned(),
        })
    }
}

fn permissions_body(permissions: ChatPermissions) -> Value {
    let media = permissions.can_send_media;
    json!({
        "can_send_messages": permissions.can_send_messages,
        "can_send_audios": media,
        "can_send_documents": media,
        "can_send_photos": media,
        "can_send_videos": media,
        "can_send_video_notes": media,
        "can_send_voice_notes": media,
        "can_send_polls": permissions.can_send_polls,
        "can_send_other_messages": permissions.can_send_other,
        "can_add_web_page_previews": permissions.can_add_previews,
    })
}

#[async_trait]
impl MessagingGateway for TelegramGateway {
    async fn send_message(&self, chat_id: i64, text: &str, silent: bool) -> GatewayResult<()> {
        let body = json!({
            "chat_id": chat_id,
            "text": text,
            "disable_notification": silent,
        });
        self.call::<IgnoredAny>("sendMessage", body).await.map(|_| ())
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> GatewayResult<()> {
        let body = json!({ "chat_id": chat_id, "message_id": message_id });
        self.call::<IgnoredAny>("deleteMessage", body).await.map(|_| ())
    }

    async fn get_profile_text(&self, user_id: i64) -> GatewayResult<String> {
        let chat: ChatInfo = self.call("getChat", json!({ "chat_id": user_id })).await?;
        Ok(chat.bio.unwrap_or_default())
    }

    async fn is_admin(&self, chat_id: i64, user_id: i64) -> GatewayResult<bool> {
        let roster: Vec<ChatMember> = self
            .call("getChatAdministrators", json!({ "chat_id": chat_id }))
            .await?;
        Ok(roster.iter().any(|member| member.user.id == user_id))
    }

    async fn restrict_member(
        &self,
        chat_id: i64,
        user_id: i64,
        permissions: ChatPermissions,
    ) -> GatewayResult<()> {
        let body = json!({
            "chat_id": chat_id,
            "user_id": user_id,
            "permissions": permissions_body(permissions),
            "use_independent_chat_permissions": true,
        });
        self.call::<IgnoredAny>("restrictChatMember", body)
            .await
            .map(|_| ())
    }

    async fn remove_member(&self, chat_id: i64, user_id: i64) -> GatewayResult<()> {
        let body = json!({ "chat_id": chat_id, "user_id": user_id });
        self.call::<IgnoredAny>("banChatMember", body).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::{Value, json};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use biolink_core::{ChatPermissions, GatewayError, MessagingGateway};

    use super::TelegramGateway;

    const TOKEN: &str = "123:test";

    fn gateway(server: &MockServer) -> TelegramGateway {
        TelegramGateway::new(&server.uri(), TOKEN, Duration::from_millis(500)).unwrap()
    }

    fn api_path(method_name: &str) -> String {
        format!("/bot{TOKEN}/{method_name}")
    }

    fn ok(result: Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "result": result }))
    }

    fn rejected(code: u16, description: &str) -> ResponseTemplate {
        ResponseTemplate::new(code).set_body_json(json!({
            "ok": false,
            "error_code": code,
            "description": description,
        }))
    }

    #[tokio::test]
    async fn sends_messages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(api_path("sendMessage")))
            .and(body_partial_json(json!({ "chat_id": -100, "text": "hi" })))
            .respond_with(ok(json!({ "message_id": 1 })))
            .expect(1)
            .mount(&server)
            .await;

        gateway(&server).send_message(-100, "hi", false).await.unwrap();
    }

    #[tokio::test]
    async fn reads_bio_and_treats_missing_bio_as_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(api_path("getChat")))
            .and(body_partial_json(json!({ "chat_id": 7 })))
            .respond_with(ok(json!({ "id": 7, "type": "private", "bio": "t.me/x" })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(api_path("getChat")))
            .and(body_partial_json(json!({ "chat_id": 8 })))
            .respond_with(ok(json!({ "id": 8, "type": "private" })))
            .mount(&server)
            .await;

        let gateway = gateway(&server);
        assert_eq!(gateway.get_profile_text(7).await.unwrap(), "t.me/x");
        assert_eq!(gateway.get_profile_text(8).await.unwrap(), "");
    }

    #[tokio::test]
    async fn admin_roster_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(api_path("getChatAdministrators")))
            .respond_with(ok(json!([
                {
                    "status": "creator",
                    "user": { "id": 1, "is_bot": false, "first_name": "Owner" }
                },
                {
                    "status": "administrator",
                    "user": { "id": 2, "is_bot": true, "first_name": "Bot" }
                }
            ])))
            .mount(&server)
            .await;

        let gateway = gateway(&server);
        assert!(gateway.is_admin(-100, 1).await.unwrap());
        assert!(!gateway.is_admin(-100, 3).await.unwrap());
    }

    #[tokio::test]
    async fn mute_revokes_every_send_permission() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(api_path("restrictChatMember")))
            .and(body_partial_json(json!({
                "chat_id": -100,
                "user_id": 5,
                "permissions": {
                    "can_send_messages": false,
                    "can_send_photos": false,
                    "can_send_other_messages": false,
                    "can_add_web_page_previews": false
                }
            })))
            .respond_with(ok(json!(true)))
            .expect(1)
            .mount(&server)
            .await;

        gateway(&server)
            .restrict_member(-100, 5, ChatPermissions::muted())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn api_rejections_are_classified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(api_path("banChatMember")))
            .respond_with(rejected(
                400,
                "Bad Request: not enough rights to restrict/unrestrict chat member",
            ))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(api_path("deleteMessage")))
            .respond_with(rejected(403, "Forbidden: bot was kicked from the supergroup chat"))
            .mount(&server)
            .await;

        let gateway = gateway(&server);
        assert!(matches!(
            gateway.remove_member(-100, 5).await,
            Err(GatewayError::Permission { method: "banChatMember", .. })
        ));
        assert!(
            gateway
                .delete_message(-100, 9)
                .await
                .unwrap_err()
                .is_chat_unavailable()
        );
    }

    #[tokio::test]
    async fn slow_responses_become_transient_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(api_path("sendMessage")))
            .respond_with(ok(json!({ "message_id": 1 })).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let err = gateway(&server)
            .send_message(-100, "late", true)
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn identifies_itself() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(api_path("getMe")))
            .respond_with(ok(json!({
                "id": 4242, "is_bot": true, "first_name": "BioGuard", "username": "bioguard_bot"
            })))
            .mount(&server)
            .await;

        let me = gateway(&server).get_me().await.unwrap();
        assert_eq!(me.id, 4242);
        assert_eq!(me.username.as_deref(), Some("bioguard_bot"));
    }

    #[test]
    fn debug_output_hides_the_token() {
        let api_url = "https://api.telegram.org";
        let gateway = TelegramGateway::new(api_url, TOKEN, Duration::from_secs(1)).unwrap();
        assert!(!format!("{gateway:?}").contains("123:test"));
    }
}
