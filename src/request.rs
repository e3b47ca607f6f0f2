//! Domain types for leave requests and reviewer actions.
//!
//! A request's identity is the id of its posted notice: `RequestId` can only be
//! built from a `NoticeId`, so a record cannot exist before its notice does and
//! no separate foreign key is needed to join the store with the notice surface.

use chrono::{DateTime, Utc};
use std::fmt;

/// Placeholder stored when a submission leaves the notes field empty.
pub const NOTES_PLACEHOLDER: &str = "N/A";

/// Newtype for a transport-assigned notice (message) id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NoticeId(pub String);

impl fmt::Display for NoticeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for NoticeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for NoticeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identity of a leave request.
///
/// Constructed only from the id of the successfully posted notice; the two are
/// the same value by construction, not by convention.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(NoticeId);

impl RequestId {
    /// The notice this request is joined to.
    pub fn notice_id(&self) -> &NoticeId {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        &self.0 .0
    }
}

impl From<NoticeId> for RequestId {
    fn from(id: NoticeId) -> Self {
        Self(id)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Newtype for a chat-platform user id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Newtype for a chat-platform surface (channel) id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub String);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SurfaceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SurfaceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Review status of a leave request.
///
/// Pending is the unique initial status. No status is terminal: a later
/// contradictory reviewer action can always move the request again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Pending,
    Approved,
    Denied,
    Reconsidering,
}

impl RequestStatus {
    /// Stable token used in storage and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Denied => "Denied",
            Self::Reconsidering => "Reconsidering",
        }
    }

    /// Parses the storage token back into a status.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(Self::Pending),
            "Approved" => Some(Self::Approved),
            "Denied" => Some(Self::Denied),
            "Reconsidering" => Some(Self::Reconsidering),
            _ => None,
        }
    }

    /// True for the statuses that get copied to the archive surface.
    pub fn is_finalized(&self) -> bool {
        matches!(self, Self::Approved | Self::Denied)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The three recognized reviewer action kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Approve,
    Deny,
    Reconsider,
}

impl ActionKind {
    /// Install order of the affordances on a fresh notice.
    pub const ALL: [ActionKind; 3] = [Self::Approve, Self::Deny, Self::Reconsider];

    /// The status this action drives a request towards.
    pub fn target_status(&self) -> RequestStatus {
        match self {
            Self::Approve => RequestStatus::Approved,
            Self::Deny => RequestStatus::Denied,
            Self::Reconsider => RequestStatus::Reconsidering,
        }
    }

    /// Wire token of the affordance on the notice surface.
    pub fn affordance(&self) -> &'static str {
        match self {
            Self::Approve => "\u{2705}",
            Self::Deny => "\u{274c}",
            Self::Reconsider => "\u{1f914}",
        }
    }

    /// Maps a selection token back to an action kind. Unrecognized tokens are
    /// out of scope for the review workflow.
    pub fn from_affordance(token: &str) -> Option<Self> {
        match token {
            "\u{2705}" => Some(Self::Approve),
            "\u{274c}" => Some(Self::Deny),
            "\u{1f914}" => Some(Self::Reconsider),
            _ => None,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approve => write!(f, "approve"),
            Self::Deny => write!(f, "deny"),
            Self::Reconsider => write!(f, "reconsider"),
        }
    }
}

/// The identity behind an inbound event, as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    pub display_name: String,
    /// Avatar reference, captured at submission for the notice thumbnail.
    /// Reaction events do not carry one.
    pub avatar_ref: Option<String>,
    /// Set for bot/service identities, which never participate in review.
    pub is_service: bool,
}

/// A leave request and its latest review outcome.
///
/// `processed_by`/`processed_at` are `Some` iff `status != Pending`; only the
/// review transition code updates them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveRequest {
    pub id: RequestId,
    pub requester_id: UserId,
    pub requester_name: String,
    pub requester_avatar: String,
    pub start_date: String,
    pub end_date: String,
    pub category: String,
    pub notes: String,
    pub status: RequestStatus,
    pub submitted_at: DateTime<Utc>,
    pub processed_by: Option<UserId>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl LeaveRequest {
    /// Builds the freshly submitted, not-yet-reviewed request.
    pub fn pending(
        id: RequestId,
        requester: &Actor,
        fields: &SubmissionFields,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            requester_id: requester.id.clone(),
            requester_name: requester.display_name.clone(),
            requester_avatar: requester.avatar_ref.clone().unwrap_or_default(),
            start_date: fields.start_date.trim().to_string(),
            end_date: fields.end_date.trim().to_string(),
            category: fields.category.trim().to_string(),
            notes: fields.notes_or_placeholder(),
            status: RequestStatus::Pending,
            submitted_at,
            processed_by: None,
            processed_at: None,
        }
    }
}

/// Raw submission fields as delivered by the form collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionFields {
    pub start_date: String,
    pub end_date: String,
    pub category: String,
    pub notes: Option<String>,
}

impl SubmissionFields {
    /// Returns the name of the first required field that is empty (after
    /// trimming), or `None` when the submission is well-formed.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.start_date.trim().is_empty() {
            Some("start date")
        } else if self.end_date.trim().is_empty() {
            Some("end date")
        } else if self.category.trim().is_empty() {
            Some("leave type")
        } else {
            None
        }
    }

    /// Notes with the empty case collapsed to the stored placeholder.
    pub fn notes_or_placeholder(&self) -> String {
        match &self.notes {
            Some(n) if !n.trim().is_empty() => n.trim().to_string(),
            _ => NOTES_PLACEHOLDER.to_string(),
        }
    }
}

/// One reviewer's expressed decision on a request. Derived per incoming event
/// and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewerAction {
    pub request_id: RequestId,
    pub actor: Actor,
    pub kind: ActionKind,
    pub origin_surface: SurfaceId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_equals_notice_id() {
        let notice = NoticeId("9001".into());
        let request = RequestId::from(notice.clone());
        assert_eq!(request.notice_id(), &notice);
        assert_eq!(request.as_str(), "9001");
        assert_eq!(request.to_string(), "9001");
    }

    #[test]
    fn test_status_token_round_trip() {
        for status in [
            RequestStatus::Pending,
            RequestStatus::Approved,
            RequestStatus::Denied,
            RequestStatus::Reconsidering,
        ] {
            assert_eq!(RequestStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(RequestStatus::parse("Escalated"), None);
    }

    #[test]
    fn test_finalized_statuses() {
        assert!(RequestStatus::Approved.is_finalized());
        assert!(RequestStatus::Denied.is_finalized());
        assert!(!RequestStatus::Pending.is_finalized());
        assert!(!RequestStatus::Reconsidering.is_finalized());
    }

    #[test]
    fn test_action_kind_targets() {
        assert_eq!(ActionKind::Approve.target_status(), RequestStatus::Approved);
        assert_eq!(ActionKind::Deny.target_status(), RequestStatus::Denied);
        assert_eq!(
            ActionKind::Reconsider.target_status(),
            RequestStatus::Reconsidering
        );
    }

    #[test]
    fn test_affordance_tokens_round_trip() {
        for kind in ActionKind::ALL {
            assert_eq!(ActionKind::from_affordance(kind.affordance()), Some(kind));
        }
        assert_eq!(ActionKind::from_affordance("\u{1f44d}"), None);
        assert_eq!(ActionKind::from_affordance(""), None);
    }

    #[test]
    fn test_missing_field_reports_first_gap() {
        let fields = SubmissionFields {
            start_date: "  ".into(),
            end_date: "01-01-2026".into(),
            category: "Vacation".into(),
            notes: None,
        };
        assert_eq!(fields.missing_field(), Some("start date"));

        let fields = SubmissionFields {
            start_date: "25-12-2025".into(),
            end_date: "01-01-2026".into(),
            category: "".into(),
            notes: None,
        };
        assert_eq!(fields.missing_field(), Some("leave type"));

        let fields = SubmissionFields {
            start_date: "25-12-2025".into(),
            end_date: "01-01-2026".into(),
            category: "Vacation".into(),
            notes: None,
        };
        assert_eq!(fields.missing_field(), None);
    }

    #[test]
    fn test_notes_placeholder() {
        let with_notes = SubmissionFields {
            start_date: "a".into(),
            end_date: "b".into(),
            category: "c".into(),
            notes: Some("family visit".into()),
        };
        assert_eq!(with_notes.notes_or_placeholder(), "family visit");

        let blank_notes = SubmissionFields {
            notes: Some("   ".into()),
            ..with_notes.clone()
        };
        assert_eq!(blank_notes.notes_or_placeholder(), NOTES_PLACEHOLDER);

        let no_notes = SubmissionFields {
            notes: None,
            ..with_notes
        };
        assert_eq!(no_notes.notes_or_placeholder(), NOTES_PLACEHOLDER);
    }
}
