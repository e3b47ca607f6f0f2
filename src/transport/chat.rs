//! REST client for the chat platform.
//!
//! Implements `NoticeTransport` and `ReviewAuthority` against the platform's
//! HTTP API, authenticating with the bot token from configuration.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::{NoticeTransport, ReviewAuthority};
use crate::notice::NoticeContent;
use crate::request::{ActionKind, NoticeId, SurfaceId, UserId};

/// Capability that marks an actor as a reviewer on a surface.
const REVIEW_CAPABILITY: &str = "manage-notices";

#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
    bot_token: String,
}

#[derive(Debug, Serialize)]
struct PostMessageRequest<'a> {
    content: &'a NoticeContent,
}

#[derive(Debug, Serialize)]
struct DirectMessageRequest<'a> {
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MemberResponse {
    permissions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotIdentity {
    pub id: String,
    pub display_name: String,
}

impl ChatClient {
    pub fn new(base_url: String, bot_token: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            bot_token,
        }
    }

    /// Resolves the bot's own identity. The startup sequence calls this to
    /// verify the session before the service starts processing events.
    pub async fn current_identity(&self) -> Result<BotIdentity> {
        let url = format!("{}/auth/me", self.base_url);

        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .context("Failed to send identity request")?;
        let response = ensure_success(response, "identity lookup").await?;

        response
            .json()
            .await
            .context("Failed to parse identity response")
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.header("Authorization", format!("Bot {}", self.bot_token))
    }
}

/// Turns a non-2xx response into an error carrying the status and body.
async fn ensure_success(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    error!("Chat API error during {}: {} - {}", what, status, error_text);
    Err(anyhow!(
        "Chat API error during {}: {} - {}",
        what,
        status,
        error_text
    ))
}

/// Pure capability check over a member's permission list.
fn member_has_capability(permissions: &[String]) -> bool {
    permissions.iter().any(|p| p == REVIEW_CAPABILITY)
}

#[async_trait]
impl NoticeTransport for ChatClient {
    async fn post(&self, surface: &SurfaceId, content: &NoticeContent) -> Result<NoticeId> {
        let url = format!("{}/channels/{}/messages", self.base_url, surface);

        let response = self
            .authorized(self.client.post(&url))
            .json(&PostMessageRequest { content })
            .send()
            .await
            .context("Failed to send notice post request")?;
        let response = ensure_success(response, "notice post").await?;

        let message: MessageResponse = response
            .json()
            .await
            .context("Failed to parse notice post response")?;
        info!("Posted notice {} to surface {}", message.id, surface);

        Ok(NoticeId(message.id))
    }

    async fn edit(
        &self,
        surface: &SurfaceId,
        notice: &NoticeId,
        content: &NoticeContent,
    ) -> Result<()> {
        let url = format!("{}/channels/{}/messages/{}", self.base_url, surface, notice);

        let response = self
            .authorized(self.client.patch(&url))
            .json(&PostMessageRequest { content })
            .send()
            .await
            .context("Failed to send notice edit request")?;
        ensure_success(response, "notice edit").await?;
        Ok(())
    }

    async fn add_affordance(
        &self,
        surface: &SurfaceId,
        notice: &NoticeId,
        kind: ActionKind,
    ) -> Result<()> {
        let url = format!(
            "{}/channels/{}/messages/{}/reactions/{}/@me",
            self.base_url,
            surface,
            notice,
            kind.affordance()
        );

        let response = self
            .authorized(self.client.put(&url))
            .send()
            .await
            .context("Failed to send affordance install request")?;
        ensure_success(response, "affordance install").await?;
        Ok(())
    }

    async fn remove_all_affordances(&self, surface: &SurfaceId, notice: &NoticeId) -> Result<()> {
        let url = format!(
            "{}/channels/{}/messages/{}/reactions",
            self.base_url, surface, notice
        );

        let response = self
            .authorized(self.client.delete(&url))
            .send()
            .await
            .context("Failed to send affordance clear request")?;
        ensure_success(response, "affordance clear").await?;
        Ok(())
    }

    async fn revert_selection(
        &self,
        surface: &SurfaceId,
        notice: &NoticeId,
        actor: &UserId,
        kind: ActionKind,
    ) -> Result<()> {
        let url = format!(
            "{}/channels/{}/messages/{}/reactions/{}/{}",
            self.base_url,
            surface,
            notice,
            kind.affordance(),
            actor
        );

        let response = self
            .authorized(self.client.delete(&url))
            .send()
            .await
            .context("Failed to send selection revert request")?;
        ensure_success(response, "selection revert").await?;
        Ok(())
    }

    async fn send_direct(&self, user: &UserId, text: &str) -> Result<()> {
        let url = format!("{}/users/{}/messages", self.base_url, user);

        let response = self
            .authorized(self.client.post(&url))
            .json(&DirectMessageRequest { content: text })
            .send()
            .await
            .context("Failed to send direct message request")?;
        ensure_success(response, "direct message").await?;
        Ok(())
    }
}

#[async_trait]
impl ReviewAuthority for ChatClient {
    async fn has_review_capability(&self, actor: &UserId, origin: &SurfaceId) -> Result<bool> {
        let url = format!("{}/channels/{}/members/{}", self.base_url, origin, actor);

        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .context("Failed to send member lookup request")?;
        let response = ensure_success(response, "member lookup").await?;

        let member: MemberResponse = response
            .json()
            .await
            .context("Failed to parse member response")?;

        Ok(member_has_capability(&member.permissions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_capability_check() {
        let reviewer = vec!["post-messages".to_string(), "manage-notices".to_string()];
        assert!(member_has_capability(&reviewer));

        let plain_member = vec!["post-messages".to_string()];
        assert!(!member_has_capability(&plain_member));

        assert!(!member_has_capability(&[]));
    }

    #[test]
    fn test_capability_name_is_exact_match() {
        let near_miss = vec!["manage-notices-admin".to_string()];
        assert!(!member_has_capability(&near_miss));
    }
}
