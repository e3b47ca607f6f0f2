//! Dispatcher executing side-effect plans.
//!
//! The boundary between the pure decision code and the impure world. Effects
//! run sequentially in plan order; a failed effect is logged and the
//! remaining effects still run, so the steps are independent rather than
//! transactional. In particular the affordance reset at the end of every
//! plan runs no matter what happened before it.

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info, warn};

use super::effect::SideEffect;
use crate::request::{ActionKind, NoticeId, SurfaceId};
use crate::store::RequestStore;
use crate::transport::NoticeTransport;

/// Context needed to execute side effects.
pub struct DispatchContext {
    pub store: Arc<dyn RequestStore>,
    pub transport: Arc<dyn NoticeTransport>,
    pub review_surface: SurfaceId,
    pub archive_surface: SurfaceId,
}

/// Executes a plan in order, logging each failure and moving on.
///
/// A requester who cannot be reached is a warning (their mailbox may simply
/// be closed); every other failure is an error.
pub async fn execute_effects(ctx: &DispatchContext, effects: Vec<SideEffect>) {
    for effect in effects {
        let label = effect.describe();
        let notify_target = match &effect {
            SideEffect::NotifyRequester { requester, .. } => Some(requester.clone()),
            _ => None,
        };

        if let Err(e) = execute_effect(ctx, effect).await {
            match notify_target {
                Some(requester) => warn!("Could not notify requester {}: {}", requester, e),
                None => error!("Dispatch step '{}' failed: {}", label, e),
            }
        }
    }
}

async fn execute_effect(ctx: &DispatchContext, effect: SideEffect) -> Result<()> {
    match effect {
        SideEffect::PersistReview { request_id, update } => {
            ctx.store.update_review(&request_id, &update).await?;
            info!(
                "Recorded {} for request {} by {}",
                update.status, request_id, update.processed_by
            );
            Ok(())
        }

        SideEffect::EditNotice { notice_id, content } => {
            ctx.transport
                .edit(&ctx.review_surface, &notice_id, &content)
                .await
        }

        SideEffect::NotifyRequester { requester, message } => {
            ctx.transport.send_direct(&requester, &message).await
        }

        SideEffect::ArchiveCopy { content } => {
            ctx.transport
                .post(&ctx.archive_surface, &content)
                .await
                .map(|_| ())
        }

        SideEffect::ResetAffordances { notice_id } => {
            reset_affordances(ctx, &notice_id).await
        }
    }
}

/// Clears every selection, then reinstalls the three affordances in their
/// original order.
async fn reset_affordances(ctx: &DispatchContext, notice_id: &NoticeId) -> Result<()> {
    ctx.transport
        .remove_all_affordances(&ctx.review_surface, notice_id)
        .await?;
    for kind in ActionKind::ALL {
        ctx.transport
            .add_affordance(&ctx.review_surface, notice_id, kind)
            .await?;
    }
    Ok(())
}
