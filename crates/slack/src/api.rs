//! Directory and chat collaborators.
//!
//! The orchestrator talks to Slack only through these traits; tests swap
//! in scripted doubles and the server wires in the Web API client.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::blocks::MessageTemplate;

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("directory lookup failed: {0}")]
    Directory(String),
    #[error("message delivery failed: {0}")]
    Messaging(String),
}

/// Directory view of one user, as needed for mention verification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserInfo {
    pub id: String,
    pub active: bool,
    pub display_name: String,
}

/// One workspace member as returned by the member listing; all the name
/// variants a raw `@name` mention may match against.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemberRecord {
    pub id: String,
    pub name: String,
    pub real_name: String,
    pub display_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: String,
    pub name: String,
}

#[async_trait]
pub trait DirectoryClient: Send + Sync {
    async fn lookup_user(&self, user_id: &str) -> Result<UserInfo, CollaboratorError>;
    async fn list_users(&self) -> Result<Vec<MemberRecord>, CollaboratorError>;
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn post_message(
        &self,
        channel_id: &str,
        message: &MessageTemplate,
    ) -> Result<(), CollaboratorError>;

    async fn list_channels(&self) -> Result<Vec<ChannelInfo>, CollaboratorError>;
}

/// Directory double that accepts every id as an active user. Used by the
/// default dispatcher and in tests that do not exercise resolution.
#[derive(Default)]
pub struct NoopDirectoryClient;

#[async_trait]
impl DirectoryClient for NoopDirectoryClient {
    async fn lookup_user(&self, user_id: &str) -> Result<UserInfo, CollaboratorError> {
        Ok(UserInfo { id: user_id.to_owned(), active: true, display_name: user_id.to_owned() })
    }

    async fn list_users(&self) -> Result<Vec<MemberRecord>, CollaboratorError> {
        Ok(Vec::new())
    }
}

/// Chat double that drops messages and lists no channels.
#[derive(Default)]
pub struct NoopChatClient;

#[async_trait]
impl ChatClient for NoopChatClient {
    async fn post_message(
        &self,
        _channel_id: &str,
        _message: &MessageTemplate,
    ) -> Result<(), CollaboratorError> {
        Ok(())
    }

    async fn list_channels(&self) -> Result<Vec<ChannelInfo>, CollaboratorError> {
        Ok(Vec::new())
    }
}

const SLACK_API_BASE: &str = "https://slack.com/api";

/// Slack Web API client backing both collaborator traits with one bot
/// token: `users.info`, `users.list`, `chat.postMessage`,
/// `conversations.list`.
pub struct SlackWebClient {
    http: reqwest::Client,
    bot_token: SecretString,
    base_url: String,
}

impl SlackWebClient {
    pub fn new(bot_token: SecretString) -> Self {
        Self::with_base_url(bot_token, SLACK_API_BASE)
    }

    /// Points the client at a different API root; integration tests use
    /// this against a local stub.
    pub fn with_base_url(bot_token: SecretString, base_url: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), bot_token, base_url: base_url.into() }
    }

    async fn get(&self, method: &str, query: &[(&str, &str)]) -> Result<serde_json::Value, String> {
        let response = self
            .http
            .get(format!("{}/{method}", self.base_url))
            .bearer_auth(self.bot_token.expose_secret())
            .query(query)
            .send()
            .await
            .map_err(|error| format!("{method} request failed: {error}"))?;

        let body: serde_json::Value =
            response.json().await.map_err(|error| format!("{method} returned invalid JSON: {error}"))?;
        ensure_ok(method, body)
    }

    async fn post(&self, method: &str, payload: serde_json::Value) -> Result<serde_json::Value, String> {
        let response = self
            .http
            .post(format!("{}/{method}", self.base_url))
            .bearer_auth(self.bot_token.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|error| format!("{method} request failed: {error}"))?;

        let body: serde_json::Value =
            response.json().await.map_err(|error| format!("{method} returned invalid JSON: {error}"))?;
        ensure_ok(method, body)
    }
}

/// Slack envelopes errors inside a 200 response; `ok: false` plus an
/// `error` token is the failure signal.
fn ensure_ok(method: &str, body: serde_json::Value) -> Result<serde_json::Value, String> {
    if body.get("ok").and_then(serde_json::Value::as_bool) == Some(true) {
        Ok(body)
    } else {
        let reason =
            body.get("error").and_then(serde_json::Value::as_str).unwrap_or("unknown_error");
        Err(format!("{method} returned error: {reason}"))
    }
}

#[derive(Debug, Default, Deserialize)]
struct UserPayload {
    #[serde(default)]
    id: String,
    #[serde(default)]
    deleted: bool,
    #[serde(default)]
    name: String,
    #[serde(default)]
    real_name: String,
    #[serde(default)]
    profile: ProfilePayload,
}

#[derive(Debug, Default, Deserialize)]
struct ProfilePayload {
    #[serde(default)]
    display_name: String,
}

#[derive(Debug, Default, Deserialize)]
struct ChannelPayload {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
}

fn user_info_from(payload: UserPayload) -> UserInfo {
    let display_name = if !payload.profile.display_name.is_empty() {
        payload.profile.display_name
    } else if !payload.real_name.is_empty() {
        payload.real_name
    } else {
        payload.name
    };
    UserInfo { id: payload.id, active: !payload.deleted, display_name }
}

fn member_record_from(payload: UserPayload) -> MemberRecord {
    MemberRecord {
        id: payload.id,
        name: payload.name,
        real_name: payload.real_name,
        display_name: payload.profile.display_name,
    }
}

#[async_trait]
impl DirectoryClient for SlackWebClient {
    async fn lookup_user(&self, user_id: &str) -> Result<UserInfo, CollaboratorError> {
        let body = self
            .get("users.info", &[("user", user_id)])
            .await
            .map_err(CollaboratorError::Directory)?;

        let payload: UserPayload = serde_json::from_value(
            body.get("user").cloned().unwrap_or(serde_json::Value::Null),
        )
        .map_err(|error| {
            CollaboratorError::Directory(format!("users.info returned malformed user: {error}"))
        })?;

        Ok(user_info_from(payload))
    }

    async fn list_users(&self) -> Result<Vec<MemberRecord>, CollaboratorError> {
        let body = self.get("users.list", &[]).await.map_err(CollaboratorError::Directory)?;

        let members: Vec<UserPayload> = serde_json::from_value(
            body.get("members").cloned().unwrap_or_else(|| json!([])),
        )
        .map_err(|error| {
            CollaboratorError::Directory(format!("users.list returned malformed members: {error}"))
        })?;

        Ok(members.into_iter().map(member_record_from).collect())
    }
}

#[async_trait]
impl ChatClient for SlackWebClient {
    async fn post_message(
        &self,
        channel_id: &str,
        message: &MessageTemplate,
    ) -> Result<(), CollaboratorError> {
        let payload = json!({
            "channel": channel_id,
            "text": message.fallback_text,
            "blocks": message.blocks,
        });
        self.post("chat.postMessage", payload).await.map_err(CollaboratorError::Messaging)?;
        Ok(())
    }

    async fn list_channels(&self) -> Result<Vec<ChannelInfo>, CollaboratorError> {
        let body = self
            .get("conversations.list", &[("types", "public_channel")])
            .await
            .map_err(CollaboratorError::Messaging)?;

        let channels: Vec<ChannelPayload> = serde_json::from_value(
            body.get("channels").cloned().unwrap_or_else(|| json!([])),
        )
        .map_err(|error| {
            CollaboratorError::Messaging(format!(
                "conversations.list returned malformed channels: {error}"
            ))
        })?;

        Ok(channels
            .into_iter()
            .map(|channel| ChannelInfo { id: channel.id, name: channel.name })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ensure_ok, member_record_from, user_info_from, UserPayload};

    #[test]
    fn ensure_ok_accepts_ok_true_and_rejects_error_payloads() {
        assert!(ensure_ok("users.info", json!({"ok": true, "user": {}})).is_ok());

        let error = ensure_ok("users.info", json!({"ok": false, "error": "user_not_found"}))
            .expect_err("ok=false must fail");
        assert!(error.contains("user_not_found"));

        let error = ensure_ok("users.info", json!({})).expect_err("missing ok must fail");
        assert!(error.contains("unknown_error"));
    }

    #[test]
    fn user_info_prefers_display_name_then_real_name_then_username() {
        let payload: UserPayload = serde_json::from_value(json!({
            "id": "U1",
            "deleted": false,
            "name": "jdoe",
            "real_name": "Jane Doe",
            "profile": {"display_name": "janey"}
        }))
        .expect("payload parses");
        assert_eq!(user_info_from(payload).display_name, "janey");

        let payload: UserPayload = serde_json::from_value(json!({
            "id": "U1",
            "name": "jdoe",
            "real_name": "Jane Doe",
            "profile": {"display_name": ""}
        }))
        .expect("payload parses");
        assert_eq!(user_info_from(payload).display_name, "Jane Doe");

        let payload: UserPayload =
            serde_json::from_value(json!({"id": "U1", "name": "jdoe"})).expect("payload parses");
        assert_eq!(user_info_from(payload).display_name, "jdoe");
    }

    #[test]
    fn deleted_users_map_to_inactive() {
        let payload: UserPayload =
            serde_json::from_value(json!({"id": "U1", "deleted": true, "name": "gone"}))
                .expect("payload parses");
        assert!(!user_info_from(payload).active);
    }

    #[test]
    fn member_records_keep_all_name_variants() {
        let payload: UserPayload = serde_json::from_value(json!({
            "id": "U1",
            "name": "jdoe",
            "real_name": "Jane Doe",
            "profile": {"display_name": "janey"}
        }))
        .expect("payload parses");

        let record = member_record_from(payload);
        assert_eq!(record.id, "U1");
        assert_eq!(record.name, "jdoe");
        assert_eq!(record.real_name, "Jane Doe");
        assert_eq!(record.display_name, "janey");
    }
}
