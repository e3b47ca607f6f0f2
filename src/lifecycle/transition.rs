//! Pure transition decision.
//!
//! Given a request's current status and a reviewer action, decides whether a
//! genuine transition happens. No side effects here: the decision is data,
//! handed to the effect planner and the dispatcher.

use chrono::{DateTime, Utc};

use crate::request::{Actor, LeaveRequest, RequestId, RequestStatus, ReviewerAction};
use crate::store::ReviewUpdate;

/// A genuine status change, ready to be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub request_id: RequestId,
    pub previous_status: RequestStatus,
    pub new_status: RequestStatus,
    pub actor: Actor,
    pub processed_at: DateTime<Utc>,
}

impl Transition {
    /// The request as it will read once this transition is persisted.
    pub fn applied_to(&self, request: &LeaveRequest) -> LeaveRequest {
        let mut updated = request.clone();
        updated.status = self.new_status;
        updated.processed_by = Some(self.actor.id.clone());
        updated.processed_at = Some(self.processed_at);
        updated
    }

    /// The store write for this transition.
    pub fn review_update(&self) -> ReviewUpdate {
        ReviewUpdate {
            status: self.new_status,
            processed_by: self.actor.id.clone(),
            processed_at: self.processed_at,
        }
    }
}

/// Outcome of interpreting a reviewer action against the loaded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The action moves the request to a different status.
    Apply(Transition),
    /// The action targets the status the request already has. The triggering
    /// selection gets reverted to avoid clutter; nothing else happens.
    NoChange,
}

/// Pure decision function.
///
/// Every status reaches every other status: the graph is fully connected and
/// nothing is terminal, so the only no-op case is re-applying the status the
/// request is already in.
pub fn decide(current: RequestStatus, action: &ReviewerAction, at: DateTime<Utc>) -> Decision {
    let target = action.kind.target_status();
    if target == current {
        return Decision::NoChange;
    }

    Decision::Apply(Transition {
        request_id: action.request_id.clone(),
        previous_status: current,
        new_status: target,
        actor: action.actor.clone(),
        processed_at: at,
    })
}
