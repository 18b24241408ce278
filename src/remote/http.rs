//! HTTP client for the suggestion service

use super::types::{SessionOpening, StepLabel, TurnReply, VariantReply};
use super::{RemoteError, SuggestionService};
use crate::guide::Evidence;
use crate::lab::VariantParams;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Suggestion service reached over JSON/HTTP
pub struct HttpSuggestionService {
    client: Client,
    base_url: String,
}

impl HttpSuggestionService {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, RemoteError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RemoteError::timeout(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    RemoteError::network(format!("Connection failed: {e}"))
                } else {
                    RemoteError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                RemoteError::timeout(format!("Response timeout: {e}"))
            } else {
                RemoteError::network(format!("Failed to read response: {e}"))
            }
        })?;

        if !status.is_success() {
            return Err(classify_error(status, &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| RemoteError::decode(format!("Failed to parse response: {e} - body: {body}")))
    }
}

pub(crate) fn classify_error(status: StatusCode, body: &str) -> RemoteError {
    match status.as_u16() {
        404 => RemoteError::invalid_request(format!("Endpoint not found: {body}")),
        408 | 504 => RemoteError::timeout(format!("Upstream timeout: {body}")),
        400..=499 => RemoteError::invalid_request(format!("Invalid request: {body}")),
        500..=599 => RemoteError::server_error(format!("Server error: {body}")),
        _ => RemoteError::unknown(format!("HTTP {status}: {body}")),
    }
}

#[async_trait]
impl SuggestionService for HttpSuggestionService {
    async fn create_session(&self) -> Result<SessionOpening, RemoteError> {
        let wire: WireResponse = self.post("/session", &serde_json::json!({})).await?;
        let session_id = wire.session_id.clone();
        Ok(wire.into_turn_reply(&session_id)?.into_opening(session_id))
    }

    async fn send_turn(&self, session_id: &str, message: &str) -> Result<TurnReply, RemoteError> {
        let wire: WireResponse = self
            .post("/chat", &ChatRequest { session_id, message })
            .await?;
        wire.into_turn_reply(session_id)
    }

    async fn reset_session(&self, session_id: &str) -> Result<TurnReply, RemoteError> {
        let wire: WireResponse = self.post("/reset", &ResetRequest { session_id }).await?;
        wire.into_turn_reply(session_id)
    }

    async fn evaluate_variant(
        &self,
        session_id: &str,
        message: &str,
        params: &VariantParams,
    ) -> Result<VariantReply, RemoteError> {
        let wire: WireResponse = self
            .post(
                "/compare",
                &CompareRequest {
                    session_id,
                    message,
                    variant: params,
                },
            )
            .await?;
        let turn = wire.into_turn_reply(session_id)?;
        Ok(VariantReply {
            reply: turn.reply.unwrap_or_default(),
            evidence: turn.evidence,
            draft_snapshot: turn.draft_snapshot,
        })
    }

    fn name(&self) -> &str {
        &self.base_url
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    session_id: &'a str,
    message: &'a str,
}

#[derive(Debug, Serialize)]
struct ResetRequest<'a> {
    session_id: &'a str,
}

#[derive(Debug, Serialize)]
struct CompareRequest<'a> {
    session_id: &'a str,
    message: &'a str,
    variant: &'a VariantParams,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    session_id: String,
    #[serde(default)]
    reply: Option<String>,
    #[serde(default)]
    draft_snapshot: Option<Value>,
    #[serde(default)]
    step: Option<String>,
    #[serde(default)]
    evidence: Option<Vec<WireEvidence>>,
}

#[derive(Debug, Deserialize)]
struct WireEvidence {
    title: String,
    file_path: String,
    line_range: String,
}

impl WireResponse {
    /// A bare `{session_id}` body is how the service reports an unknown session
    fn into_turn_reply(self, session_id: &str) -> Result<TurnReply, RemoteError> {
        if self.reply.is_none() && self.step.is_none() {
            return Err(RemoteError::session_unknown(session_id));
        }
        Ok(TurnReply {
            reply: self.reply,
            evidence: self
                .evidence
                .unwrap_or_default()
                .into_iter()
                .map(|e| Evidence {
                    title: e.title,
                    source_path: e.file_path,
                    line_range: e.line_range,
                })
                .collect(),
            draft_snapshot: self.draft_snapshot,
            step: StepLabel::new(self.step.unwrap_or_default()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::RemoteErrorKind;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;

    async fn spawn_fake_service() -> String {
        let app = Router::new()
            .route(
                "/session",
                post(|| async {
                    Json(json!({
                        "session_id": "remote-1",
                        "reply": "What kind of application is this blueprint for?",
                        "draft_snapshot": {"app_type": ""},
                        "step": "app_type",
                    }))
                }),
            )
            .route(
                "/chat",
                post(|Json(body): Json<Value>| async move {
                    if body["session_id"] == "remote-1" {
                        Json(json!({
                            "session_id": "remote-1",
                            "reply": format!("echo: {}", body["message"].as_str().unwrap_or("")),
                            "step": "complete",
                            "evidence": [{"title": "Guide", "file_path": "docs/a.md", "line_range": "L1-L4"}],
                        }))
                    } else {
                        Json(json!({ "session_id": body["session_id"] }))
                    }
                }),
            )
            .route(
                "/compare",
                post(|Json(body): Json<Value>| async move {
                    Json(json!({
                        "session_id": "remote-1",
                        "reply": format!("{} answer", body["variant"]["risk_tolerance"].as_str().unwrap_or("")),
                        "step": "app_type",
                    }))
                }),
            )
            .route(
                "/reset",
                post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_create_session() {
        let base = spawn_fake_service().await;
        let service = HttpSuggestionService::new(&base, Duration::from_secs(5));

        let opening = service.create_session().await.unwrap();
        assert_eq!(opening.session_id, "remote-1");
        assert_eq!(opening.step.as_str(), "app_type");
        assert!(opening.reply.is_some());
        assert!(opening.draft_snapshot.is_some());
    }

    #[tokio::test]
    async fn test_send_turn_maps_evidence() {
        let base = spawn_fake_service().await;
        let service = HttpSuggestionService::new(&base, Duration::from_secs(5));

        let reply = service.send_turn("remote-1", "hello").await.unwrap();
        assert_eq!(reply.reply.as_deref(), Some("echo: hello"));
        assert!(reply.step.is_complete());
        assert_eq!(reply.evidence[0].source_path, "docs/a.md");
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let base = spawn_fake_service().await;
        let service = HttpSuggestionService::new(&base, Duration::from_secs(5));

        let err = service.send_turn("missing", "hello").await.unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::SessionUnknown);
        assert!(!err.kind.is_retryable());
    }

    #[tokio::test]
    async fn test_evaluate_variant_sends_params() {
        let base = spawn_fake_service().await;
        let service = HttpSuggestionService::new(&base, Duration::from_secs(5));

        let reply = service
            .evaluate_variant("remote-1", "hello", &VariantParams::cautious())
            .await
            .unwrap();
        assert_eq!(reply.reply, "Cautious answer");
        assert!(reply.evidence.is_empty());
    }

    #[tokio::test]
    async fn test_server_error_is_retryable() {
        let base = spawn_fake_service().await;
        let service = HttpSuggestionService::new(&base, Duration::from_secs(5));

        let err = service.reset_session("remote-1").await.unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::ServerError);
        assert!(err.kind.is_retryable());
    }

    #[tokio::test]
    async fn test_connection_refused_is_network() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let service = HttpSuggestionService::new(&format!("http://{addr}"), Duration::from_secs(5));
        let err = service.create_session().await.unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::Network);
    }

    #[test]
    fn test_classify_error() {
        assert_eq!(
            classify_error(StatusCode::BAD_REQUEST, "bad").kind,
            RemoteErrorKind::InvalidRequest
        );
        assert_eq!(
            classify_error(StatusCode::GATEWAY_TIMEOUT, "slow").kind,
            RemoteErrorKind::Timeout
        );
        assert_eq!(
            classify_error(StatusCode::BAD_GATEWAY, "down").kind,
            RemoteErrorKind::ServerError
        );
    }
}
