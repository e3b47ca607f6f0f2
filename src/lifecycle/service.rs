//! Entry points for the two inbound event kinds.
//!
//! `submit` turns a form submission into a posted notice plus a stored
//! record; `on_reviewer_action` runs the review decision and dispatches its
//! side effects. Reviewer actions on the same request are serialized by a
//! per-request lock held from the record load through the last side effect,
//! so two concurrent actions cannot both read the same prior status.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use super::dispatch::{execute_effects, DispatchContext};
use super::effect::plan;
use super::transition::{decide, Decision};
use crate::notice;
use crate::readiness::Readiness;
use crate::request::{
    ActionKind, Actor, LeaveRequest, RequestId, ReviewerAction, SubmissionFields, SurfaceId,
};
use crate::store::RequestStore;
use crate::transport::{NoticeTransport, ReviewAuthority};

/// Acknowledgment for an accepted submission.
pub const SUBMISSION_ACK: &str =
    "Your LOA request has been submitted successfully and is pending review.";

/// Acknowledgment when any submission step fails.
pub const SUBMISSION_FAILED_ACK: &str =
    "An error occurred while submitting your request. Please try again later.";

/// Acknowledgment while the startup sequence has not completed.
pub const NOT_READY_ACK: &str = "Bot is still initializing, please try again in a moment.";

/// What the submitter is told about their submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Accepted { request_id: RequestId },
    Rejected { message: String },
    NotReady,
    Failed,
}

impl SubmissionOutcome {
    /// The acknowledgment text relayed back to the submitter.
    pub fn user_message(&self) -> String {
        match self {
            Self::Accepted { .. } => SUBMISSION_ACK.to_string(),
            Self::Rejected { message } => message.clone(),
            Self::NotReady => NOT_READY_ACK.to_string(),
            Self::Failed => SUBMISSION_FAILED_ACK.to_string(),
        }
    }
}

/// Per-request locks serializing the load-decide-dispatch sequence.
///
/// Two concurrent actions on one request must observe each other's
/// outcome; without this both could read the same status and both win.
/// Entries live only while an action holds or awaits the lock; `release`
/// drops an entry once nothing references it, so the map is bounded by
/// in-flight actions rather than by every request ever reviewed.
struct RequestLockMap {
    locks: RwLock<HashMap<RequestId, Arc<Mutex<()>>>>,
}

impl RequestLockMap {
    fn new() -> Self {
        Self {
            locks: RwLock::new(HashMap::new()),
        }
    }

    async fn acquire(&self, request_id: &RequestId) -> Arc<Mutex<()>> {
        {
            let locks = self.locks.read().await;
            if let Some(lock) = locks.get(request_id) {
                return lock.clone();
            }
        }

        let mut locks = self.locks.write().await;
        locks
            .entry(request_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Removes the entry unless some action still holds a clone of it.
    /// Clones are only handed out under the map lock, so the reference
    /// count cannot change while the write lock is held here.
    async fn release(&self, request_id: &RequestId) {
        let mut locks = self.locks.write().await;
        if let Some(lock) = locks.get(request_id) {
            if Arc::strong_count(lock) == 1 {
                locks.remove(request_id);
            }
        }
    }
}

/// Coordinates the request lifecycle across store, transport and authority.
pub struct LifecycleService {
    dispatch: DispatchContext,
    authority: Arc<dyn ReviewAuthority>,
    readiness: Readiness,
    request_locks: RequestLockMap,
}

impl LifecycleService {
    pub fn new(
        store: Arc<dyn RequestStore>,
        transport: Arc<dyn NoticeTransport>,
        authority: Arc<dyn ReviewAuthority>,
        readiness: Readiness,
        review_surface: SurfaceId,
        archive_surface: SurfaceId,
    ) -> Self {
        Self {
            dispatch: DispatchContext {
                store,
                transport,
                review_surface,
                archive_surface,
            },
            authority,
            readiness,
            request_locks: RequestLockMap::new(),
        }
    }

    /// Handles a form submission end to end.
    ///
    /// Posts the notice first; its id becomes the request id. Then installs
    /// the three affordances and creates the store record. A failure after
    /// the post leaves the notice orphaned; that is logged, not rolled back.
    pub async fn submit(&self, requester: Actor, fields: SubmissionFields) -> SubmissionOutcome {
        if !self.readiness.is_ready() {
            warn!("Submission received before startup completed");
            return SubmissionOutcome::NotReady;
        }

        if let Some(field) = fields.missing_field() {
            return SubmissionOutcome::Rejected {
                message: format!("The {} field is required.", field),
            };
        }

        let submitted_at = Utc::now();
        let content = notice::render_pending(&requester, &fields, submitted_at);

        let notice_id = match self
            .dispatch
            .transport
            .post(&self.dispatch.review_surface, &content)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                error!("Failed to post request notice for {}: {}", requester.id, e);
                return SubmissionOutcome::Failed;
            }
        };
        let request_id = RequestId::from(notice_id);

        for kind in ActionKind::ALL {
            if let Err(e) = self
                .dispatch
                .transport
                .add_affordance(&self.dispatch.review_surface, request_id.notice_id(), kind)
                .await
            {
                error!(
                    "Failed to install {} affordance on notice {}: {}",
                    kind, request_id, e
                );
                return SubmissionOutcome::Failed;
            }
        }

        let request = LeaveRequest::pending(request_id.clone(), &requester, &fields, submitted_at);
        if let Err(e) = self.dispatch.store.create(&request).await {
            error!(
                "Failed to store request {}; its notice is now orphaned: {}",
                request_id, e
            );
            return SubmissionOutcome::Failed;
        }

        info!(
            "Leave request {} submitted by {}",
            request_id, requester.id
        );
        SubmissionOutcome::Accepted { request_id }
    }

    /// Handles one reviewer's affordance selection.
    ///
    /// Out-of-scope events (service actors, other surfaces) are dropped
    /// without a trace; everything past the authorization gate runs under
    /// the per-request lock.
    pub async fn on_reviewer_action(&self, action: ReviewerAction) {
        if !self.readiness.is_ready() {
            warn!(
                "Dropping reviewer action on {} received before startup completed",
                action.request_id
            );
            return;
        }

        if action.actor.is_service {
            return;
        }
        if action.origin_surface != self.dispatch.review_surface {
            return;
        }

        let authorized = match self
            .authority
            .has_review_capability(&action.actor.id, &action.origin_surface)
            .await
        {
            Ok(authorized) => authorized,
            Err(e) => {
                warn!(
                    "Could not verify review capability for {}: {}",
                    action.actor.id, e
                );
                return;
            }
        };
        if !authorized {
            self.revert_selection(&action, "unauthorized").await;
            return;
        }

        {
            let lock = self.request_locks.acquire(&action.request_id).await;
            let _guard = lock.lock().await;
            self.apply_reviewer_action(&action).await;
        }
        self.request_locks.release(&action.request_id).await;
    }

    /// The load-decide-dispatch sequence. Runs under the per-request lock.
    async fn apply_reviewer_action(&self, action: &ReviewerAction) {
        let request = match self.dispatch.store.get(&action.request_id).await {
            Ok(Some(request)) => request,
            Ok(None) => {
                warn!(
                    "No stored request for notice {}; ignoring {} by {}",
                    action.request_id, action.kind, action.actor.id
                );
                return;
            }
            Err(e) => {
                error!("Failed to load request {}: {}", action.request_id, e);
                return;
            }
        };

        match decide(request.status, action, Utc::now()) {
            Decision::NoChange => {
                debug!(
                    "Request {} already {}; reverting repeat selection by {}",
                    action.request_id, request.status, action.actor.id
                );
                self.revert_selection(action, "repeat").await;
            }
            Decision::Apply(transition) => {
                info!(
                    "Request {} moving {} -> {} by {}",
                    transition.request_id,
                    transition.previous_status,
                    transition.new_status,
                    action.actor.id
                );
                let effects = plan(&transition, &request);
                execute_effects(&self.dispatch, effects).await;
            }
        }
    }

    /// Removes the actor's selection so the notice shows no stale input.
    async fn revert_selection(&self, action: &ReviewerAction, why: &str) {
        if let Err(e) = self
            .dispatch
            .transport
            .revert_selection(
                &self.dispatch.review_surface,
                action.request_id.notice_id(),
                &action.actor.id,
                action.kind,
            )
            .await
        {
            warn!(
                "Failed to remove {} selection by {} on {}: {}",
                why, action.actor.id, action.request_id, e
            );
        }
    }
}
