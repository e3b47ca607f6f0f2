//! Chat-platform collaborator contracts.
//!
//! The lifecycle code talks to the platform only through these traits, so
//! tests can substitute recording doubles for the REST client.

mod chat;

pub use chat::{BotIdentity, ChatClient};

use anyhow::Result;
use async_trait::async_trait;

use crate::notice::NoticeContent;
use crate::request::{ActionKind, NoticeId, SurfaceId, UserId};

/// Posting, editing and affordance management on the notice surfaces, plus
/// direct messages to requesters.
#[async_trait]
pub trait NoticeTransport: Send + Sync {
    /// Posts content to a surface, returning the transport-assigned notice id.
    async fn post(&self, surface: &SurfaceId, content: &NoticeContent) -> Result<NoticeId>;

    /// Replaces the rendered content of an existing notice.
    async fn edit(
        &self,
        surface: &SurfaceId,
        notice: &NoticeId,
        content: &NoticeContent,
    ) -> Result<()>;

    /// Installs one action affordance on a notice.
    async fn add_affordance(
        &self,
        surface: &SurfaceId,
        notice: &NoticeId,
        kind: ActionKind,
    ) -> Result<()>;

    /// Clears every affordance and selection from a notice.
    async fn remove_all_affordances(&self, surface: &SurfaceId, notice: &NoticeId) -> Result<()>;

    /// Undoes one actor's selection of one affordance.
    async fn revert_selection(
        &self,
        surface: &SurfaceId,
        notice: &NoticeId,
        actor: &UserId,
        kind: ActionKind,
    ) -> Result<()>;

    /// Sends a direct message to a user.
    async fn send_direct(&self, user: &UserId, text: &str) -> Result<()>;
}

/// Single boolean capability check for reviewers.
#[async_trait]
pub trait ReviewAuthority: Send + Sync {
    /// Whether the actor may exercise review affordances on the given surface.
    async fn has_review_capability(&self, actor: &UserId, origin: &SurfaceId) -> Result<bool>;
}
