//! HTTP ingress for chat-gateway event envelopes.
//!
//! The gateway forwards form submissions and affordance selections as signed
//! JSON envelopes. Signature verification happens in middleware before any
//! parsing; the handler then routes on the `event` discriminator. Whatever
//! the lifecycle outcome, recognized events are answered 200 so the gateway
//! does not retry them.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{Json, Response},
    routing::post,
    Router,
};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use tracing::{error, info, Instrument};
use uuid::Uuid;

use crate::request::{
    ActionKind, Actor, NoticeId, RequestId, ReviewerAction, SubmissionFields, SurfaceId, UserId,
};
use crate::{AppState, CorrelationId};

/// Event envelope delivered by the chat gateway.
#[derive(Debug, Deserialize)]
pub struct GatewayEvent {
    pub event: String,
    pub submission: Option<SubmissionPayload>,
    pub reaction: Option<ReactionPayload>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SubmissionPayload {
    pub actor: ActorPayload,
    pub fields: FieldsPayload,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FieldsPayload {
    pub start_date: String,
    pub end_date: String,
    pub category: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReactionPayload {
    pub message_id: String,
    pub channel_id: String,
    /// Raw selection token; anything beyond the three review affordances is
    /// ignored here.
    pub token: String,
    pub actor: ActorPayload,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ActorPayload {
    pub id: String,
    pub display_name: String,
    pub avatar: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

impl From<ActorPayload> for Actor {
    fn from(payload: ActorPayload) -> Self {
        Actor {
            id: UserId(payload.id),
            display_name: payload.display_name,
            avatar_ref: payload.avatar,
            is_service: payload.bot,
        }
    }
}

impl From<FieldsPayload> for SubmissionFields {
    fn from(payload: FieldsPayload) -> Self {
        SubmissionFields {
            start_date: payload.start_date,
            end_date: payload.end_date,
            category: payload.category,
            notes: payload.notes,
        }
    }
}

#[derive(Serialize)]
pub struct GatewayResponse {
    pub message: String,
}

type HmacSha256 = Hmac<Sha256>;

fn verify_event_signature(secret: &str, payload: &[u8], signature: &str) -> bool {
    if !signature.starts_with("sha256=") {
        return false;
    }

    let signature_hex = &signature[7..]; // Remove "sha256=" prefix

    let signature_bytes = match hex::decode(signature_hex) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };

    mac.update(payload);

    // Constant-time verification
    mac.verify_slice(&signature_bytes).is_ok()
}

async fn verify_gateway_signature(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let correlation_id = CorrelationId(Uuid::new_v4().to_string());

    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?;

    let signature = parts
        .headers
        .get("x-signature-256")
        .and_then(|h| h.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if !verify_event_signature(&state.webhook_secret, &bytes, signature) {
        error!("Invalid gateway event signature");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let mut verified = Request::from_parts(parts, axum::body::Body::from(bytes));
    verified.extensions_mut().insert(correlation_id);

    Ok(next.run(verified).await)
}

fn reviewer_action_from(reaction: ReactionPayload) -> Option<ReviewerAction> {
    let kind = ActionKind::from_affordance(&reaction.token)?;
    Some(ReviewerAction {
        request_id: RequestId::from(NoticeId(reaction.message_id)),
        actor: reaction.actor.into(),
        kind,
        origin_surface: SurfaceId(reaction.channel_id),
    })
}

pub async fn gateway_event_handler(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<GatewayResponse>, StatusCode> {
    let correlation_id = request
        .extensions()
        .get::<CorrelationId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();

    let (_parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?;

    let envelope: GatewayEvent =
        serde_json::from_slice(&bytes).map_err(|_| StatusCode::BAD_REQUEST)?;

    let span = tracing::info_span!(
        "gateway_event",
        event = %envelope.event,
        correlation = %correlation_id,
    );
    async move {
        match envelope.event.as_str() {
            "submission" => {
                let submission = envelope.submission.ok_or(StatusCode::BAD_REQUEST)?;
                let outcome = state
                    .service
                    .submit(submission.actor.into(), submission.fields.into())
                    .await;
                Ok(Json(GatewayResponse {
                    message: outcome.user_message(),
                }))
            }
            "reaction_added" => {
                let reaction = envelope.reaction.ok_or(StatusCode::BAD_REQUEST)?;
                match reviewer_action_from(reaction) {
                    Some(action) => {
                        state.service.on_reviewer_action(action).await;
                        Ok(Json(GatewayResponse {
                            message: "processed".to_string(),
                        }))
                    }
                    None => Ok(Json(GatewayResponse {
                        message: "ignored".to_string(),
                    })),
                }
            }
            other => {
                info!("Ignoring unhandled gateway event kind '{}'", other);
                Ok(Json(GatewayResponse {
                    message: "ignored".to_string(),
                }))
            }
        }
    }
    .instrument(span)
    .await
}

pub fn gateway_router(middleware_state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/gateway/event", post(gateway_event_handler))
        .route_layer(middleware::from_fn_with_state(
            middleware_state,
            verify_gateway_signature,
        ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, payload: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(payload);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn test_signature_round_trip() {
        let payload = br#"{"event":"submission"}"#;
        let signature = sign("secret", payload);
        assert!(verify_event_signature("secret", payload, &signature));
    }

    #[test]
    fn test_signature_rejects_wrong_secret() {
        let payload = br#"{"event":"submission"}"#;
        let signature = sign("secret", payload);
        assert!(!verify_event_signature("other", payload, &signature));
    }

    #[test]
    fn test_signature_rejects_tampered_payload() {
        let signature = sign("secret", br#"{"event":"submission"}"#);
        assert!(!verify_event_signature(
            "secret",
            br#"{"event":"reaction_added"}"#,
            &signature
        ));
    }

    #[test]
    fn test_signature_rejects_malformed_header() {
        let payload = b"body";
        assert!(!verify_event_signature("secret", payload, "sha1=abcdef"));
        assert!(!verify_event_signature("secret", payload, "sha256=zzzz"));
        assert!(!verify_event_signature("secret", payload, ""));
    }

    #[test]
    fn test_envelope_parsing() {
        let body = serde_json::json!({
            "event": "reaction_added",
            "reaction": {
                "message_id": "555",
                "channel_id": "42",
                "token": "\u{2705}",
                "actor": {
                    "id": "7",
                    "display_name": "Marta",
                    "avatar": null,
                    "bot": false,
                },
            },
        });
        let envelope: GatewayEvent = serde_json::from_value(body).unwrap();
        assert_eq!(envelope.event, "reaction_added");

        let reaction = envelope.reaction.unwrap();
        let action = reviewer_action_from(reaction).unwrap();
        assert_eq!(action.kind, ActionKind::Approve);
        assert_eq!(action.request_id.as_str(), "555");
        assert_eq!(action.origin_surface, SurfaceId("42".into()));
        assert!(!action.actor.is_service);
    }

    #[test]
    fn test_unrecognized_token_is_not_an_action() {
        let reaction = ReactionPayload {
            message_id: "555".into(),
            channel_id: "42".into(),
            token: "\u{1f44d}".into(),
            actor: ActorPayload {
                id: "7".into(),
                display_name: "Marta".into(),
                avatar: None,
                bot: false,
            },
        };
        assert!(reviewer_action_from(reaction).is_none());
    }

    #[test]
    fn test_actor_payload_defaults_bot_flag() {
        let actor: ActorPayload = serde_json::from_value(serde_json::json!({
            "id": "7",
            "display_name": "Marta",
        }))
        .unwrap();
        assert!(!actor.bot);
        assert_eq!(actor.avatar, None);
    }
}
