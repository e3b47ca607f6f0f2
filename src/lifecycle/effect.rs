//! Side effects as data.
//!
//! A genuine transition produces an ordered plan of side effects. The plan is
//! pure data; the dispatcher executes it against the store and the chat
//! transport. This keeps the interesting logic testable without mocking HTTP.

use super::transition::Transition;
use crate::notice::{self, NoticeContent};
use crate::request::{LeaveRequest, NoticeId, RequestId, UserId};
use crate::store::ReviewUpdate;

/// One step of the post-transition work, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffect {
    /// Write the latest outcome to the store.
    PersistReview {
        request_id: RequestId,
        update: ReviewUpdate,
    },

    /// Re-render the original notice with the new status and reviewer footer.
    EditNotice {
        notice_id: NoticeId,
        content: NoticeContent,
    },

    /// Direct-message the requester about the outcome.
    NotifyRequester { requester: UserId, message: String },

    /// Copy the rendering to the archive surface. Only emitted for Approved
    /// and Denied; Reconsidering never archives.
    ArchiveCopy { content: NoticeContent },

    /// Clear all selections and reinstall the three affordances, so the
    /// notice stays re-actionable.
    ResetAffordances { notice_id: NoticeId },
}

impl SideEffect {
    /// Short label for dispatch logging.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::PersistReview { .. } => "persist review",
            Self::EditNotice { .. } => "edit notice",
            Self::NotifyRequester { .. } => "notify requester",
            Self::ArchiveCopy { .. } => "archive copy",
            Self::ResetAffordances { .. } => "reset affordances",
        }
    }
}

/// Builds the ordered side-effect plan for a transition.
///
/// `request` is the record as loaded, before the transition; the plan renders
/// from the post-transition view of it. The affordance reset is always last,
/// whatever happened to the earlier steps.
pub fn plan(transition: &Transition, request: &LeaveRequest) -> Vec<SideEffect> {
    let updated = transition.applied_to(request);
    let content = notice::render(&updated, Some(&transition.actor.display_name));
    let notice_id = transition.request_id.notice_id().clone();

    let mut effects = vec![
        SideEffect::PersistReview {
            request_id: transition.request_id.clone(),
            update: transition.review_update(),
        },
        SideEffect::EditNotice {
            notice_id: notice_id.clone(),
            content: content.clone(),
        },
    ];

    if let Some(message) = notice::direct_message(&updated) {
        effects.push(SideEffect::NotifyRequester {
            requester: updated.requester_id.clone(),
            message,
        });
    }

    if transition.new_status.is_finalized() {
        effects.push(SideEffect::ArchiveCopy { content });
    }

    effects.push(SideEffect::ResetAffordances { notice_id });
    effects
}
