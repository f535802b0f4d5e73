//! services/mirror/src/web/protocol.rs
//!
//! Request and response payloads for the intercepted routes. Field names
//! follow the real backend's JSON (camelCase) so callers cannot tell the
//! difference.

use crate::error::ApiError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tricklist_core::domain::FeedbackKind;

//=========================================================================================
// Payloads Sent FROM the Client
//=========================================================================================

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct GoogleSignInRequest {
    pub credential: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct FeedbackSubmission {
    #[serde(rename = "type")]
    pub kind: Option<FeedbackKind>,
    pub message: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct FeedbackDeleteRequest {
    pub index: Option<i64>,
}

/// Either field may be present; both are honoured.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct TrackRequest {
    pub trick_id: Option<u64>,
    pub trick_ids: Option<Vec<u64>>,
}

#[derive(Deserialize, Debug, Default)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    /// Prior turns. Accepted for compatibility; the canned coach ignores them.
    #[serde(default)]
    pub history: Option<Value>,
}

//=========================================================================================
// Payloads Sent FROM the Mirror
//=========================================================================================

#[derive(Serialize, Debug)]
pub struct SuccessResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct IsOwnerResponse {
    pub is_owner: bool,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LearnedTricksResponse {
    pub learned_ids: Vec<u64>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TotalScoreResponse {
    pub total_score: i64,
}

#[derive(Serialize, Debug)]
pub struct RecentAccountsResponse {
    pub accounts: Vec<String>,
}

#[derive(Serialize, Debug)]
pub struct RandomHistoryResponse {
    pub history: Vec<u64>,
}

/// One streamed chat chunk, carried in a `data:` record.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ChatChunk {
    pub content: String,
}

//=========================================================================================
// Helpers
//=========================================================================================

/// Parses a JSON request body. An empty body parses as `{}`.
pub fn parse_json_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    let body = if body.iter().all(|b| b.is_ascii_whitespace()) {
        b"{}".as_slice()
    } else {
        body
    };
    serde_json::from_slice(body).map_err(|_| ApiError::MalformedRequest("Invalid JSON".to_string()))
}

pub fn json_ok<T: Serialize>(payload: T) -> Response {
    (StatusCode::OK, Json(payload)).into_response()
}

/// `{"success": true}`
pub fn success() -> Response {
    json_ok(SuccessResponse {
        success: true,
        message: None,
    })
}

pub fn success_with_message(message: &str) -> Response {
    json_ok(SuccessResponse {
        success: true,
        message: Some(message.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_parses_as_empty_object() {
        let parsed: TrackRequest = parse_json_body(b"").unwrap();
        assert!(parsed.trick_id.is_none());
        let parsed: ChatRequest = parse_json_body(b"  \n").unwrap();
        assert_eq!(parsed.message, "");
    }

    #[test]
    fn invalid_json_is_malformed() {
        let err = parse_json_body::<TrackRequest>(b"{trickId:").unwrap_err();
        assert!(matches!(err, ApiError::MalformedRequest(_)));
    }

    #[test]
    fn track_request_reads_camel_case() {
        let parsed: TrackRequest = parse_json_body(br#"{"trickId":4,"trickIds":[5,6]}"#).unwrap();
        assert_eq!(parsed.trick_id, Some(4));
        assert_eq!(parsed.trick_ids, Some(vec![5, 6]));
    }
}
