//! Presentation builder for request notices.
//!
//! Pure mapping from a request to renderable content. No I/O here: display
//! data comes from what was captured at submission, plus the transient
//! reviewer name supplied by the triggering event.

use crate::request::{Actor, LeaveRequest, RequestStatus, SubmissionFields, UserId};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Renderable notice payload, serialized as-is by the chat transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoticeContent {
    pub title: String,
    pub color: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub fields: Vec<NoticeField>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoticeField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl NoticeField {
    fn new(name: &str, value: impl Into<String>, inline: bool) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
            inline,
        }
    }
}

/// Accent color for a status.
pub const fn status_color(status: RequestStatus) -> u32 {
    match status {
        RequestStatus::Pending => 0xFFD700,
        RequestStatus::Approved => 0x00FF00,
        RequestStatus::Denied => 0xFF0000,
        RequestStatus::Reconsidering => 0xAAAAAA,
    }
}

/// Human-facing label for a status.
pub fn status_label(status: RequestStatus) -> &'static str {
    match status {
        RequestStatus::Pending => "Pending Review",
        RequestStatus::Approved => "Approved",
        RequestStatus::Denied => "Denied",
        RequestStatus::Reconsidering => "Reconsidering",
    }
}

/// Display parts a notice is built from, borrowed from whichever shape the
/// caller has in hand.
struct View<'a> {
    requester_id: &'a UserId,
    requester_name: &'a str,
    avatar: Option<&'a str>,
    start_date: &'a str,
    end_date: &'a str,
    category: &'a str,
    notes: &'a str,
    status: RequestStatus,
    submitted_at: DateTime<Utc>,
}

impl View<'_> {
    fn content(&self, reviewer_name: Option<&str>) -> NoticeContent {
        NoticeContent {
            title: format!("LOA Request: {}", self.requester_name),
            color: status_color(self.status),
            thumbnail: self.avatar.map(str::to_string),
            fields: vec![
                NoticeField::new("User", format!("<@{}>", self.requester_id), true),
                NoticeField::new(
                    "Status",
                    format!("**{}**", status_label(self.status)),
                    true,
                ),
                NoticeField::new("Start Date", self.start_date, false),
                NoticeField::new("End Date", self.end_date, true),
                NoticeField::new("Type", self.category, true),
                NoticeField::new("Notes", self.notes, false),
            ],
            timestamp: self.submitted_at,
            footer: reviewer_name.map(|name| format!("Processed by: {}", name)),
        }
    }
}

/// Renders a stored request into its notice content.
///
/// `reviewer_name` is the display name of the reviewer whose action produced
/// this rendering; `None` when re-rendering without a review.
pub fn render(request: &LeaveRequest, reviewer_name: Option<&str>) -> NoticeContent {
    View {
        requester_id: &request.requester_id,
        requester_name: &request.requester_name,
        avatar: Some(request.requester_avatar.as_str()).filter(|a| !a.is_empty()),
        start_date: &request.start_date,
        end_date: &request.end_date,
        category: &request.category,
        notes: &request.notes,
        status: request.status,
        submitted_at: request.submitted_at,
    }
    .content(reviewer_name)
}

/// Renders the initial pending notice straight from the submission, before a
/// notice id (and hence a request record) exists.
///
/// Applies the same field normalization as [`LeaveRequest::pending`], so the
/// posted notice matches what a later re-render of the stored record shows.
pub fn render_pending(
    requester: &Actor,
    fields: &SubmissionFields,
    submitted_at: DateTime<Utc>,
) -> NoticeContent {
    let notes = fields.notes_or_placeholder();
    View {
        requester_id: &requester.id,
        requester_name: &requester.display_name,
        avatar: requester.avatar_ref.as_deref().filter(|a| !a.is_empty()),
        start_date: fields.start_date.trim(),
        end_date: fields.end_date.trim(),
        category: fields.category.trim(),
        notes: &notes,
        status: RequestStatus::Pending,
        submitted_at,
    }
    .content(None)
}

/// Direct message sent to the requester after a genuine transition.
///
/// Pending has no message (no transition lands on Pending after submission).
pub fn direct_message(request: &LeaveRequest) -> Option<String> {
    match request.status {
        RequestStatus::Pending => None,
        RequestStatus::Approved => Some(format!(
            "Your LOA request for **{}** to **{}** has been **Approved**.",
            request.start_date, request.end_date
        )),
        RequestStatus::Denied => Some(format!(
            "Your LOA request for **{}** to **{}** has been **Denied**.",
            request.start_date, request.end_date
        )),
        RequestStatus::Reconsidering => Some(format!(
            "An admin is **reconsidering** your LOA request for **{}** to **{}**. \
             They may contact you for more details.",
            request.start_date, request.end_date
        )),
    }
}
