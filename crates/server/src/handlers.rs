//! HTTP request handlers for blacklist ledger operations.

use std::sync::Arc;

use ark_bn254::Fr;
use ark_serialize::CanonicalSerialize;
use axum::{extract::State, http::StatusCode, response::IntoResponse, response::Response, Json};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use attestor_ledger::{LedgerError, SubjectId};
use attestor_smt::SiblingPath;

use crate::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn bad_request(error: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error })).into_response()
}

fn ledger_error(e: &LedgerError) -> Response {
    let status = match e {
        LedgerError::RootMismatch { .. } => StatusCode::CONFLICT,
        LedgerError::Boundary(_) => StatusCode::BAD_GATEWAY,
        LedgerError::Tree(_) => StatusCode::BAD_REQUEST,
    };
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

/// Parse a hex string into a 32-byte subject id
fn parse_subject(hex_str: &str) -> Result<SubjectId, String> {
    let bytes = hex::decode(hex_str.trim_start_matches("0x"))
        .map_err(|e| format!("Invalid hex: {}", e))?;

    if bytes.len() != 32 {
        return Err("Subject id must be 32 bytes".to_string());
    }

    let mut arr = [0u8; 32];
    arr.copy_from_slice(&bytes);

    Ok(SubjectId::new(arr))
}

/// Serialize Fr to hex string
fn serialize_fr(f: &Fr) -> String {
    let mut bytes = Vec::new();
    f.serialize_compressed(&mut bytes).unwrap();
    format!("0x{}", hex::encode(bytes))
}

fn path_to_hex(path: &SiblingPath) -> Vec<String> {
    path.siblings().iter().map(serialize_fr).collect()
}

// ============ Mutations ============

#[derive(Deserialize)]
pub struct MutateRequest {
    pub subject: String,
    pub shield_id: u64,
}

#[derive(Serialize)]
pub struct MutateResponse {
    pub root: String,
}

pub async fn add_to_blacklist(
    State(state): State<Arc<RwLock<AppState>>>,
    Json(req): Json<MutateRequest>,
) -> impl IntoResponse {
    let subject = match parse_subject(&req.subject) {
        Ok(s) => s,
        Err(e) => return bad_request(e),
    };

    let mut state = state.write().await;

    if let Err(e) = state.ledger.add_to_blacklist(&subject, req.shield_id) {
        return ledger_error(&e);
    }
    match state.ledger.root(&subject) {
        Ok(root) => (
            StatusCode::OK,
            Json(MutateResponse {
                root: serialize_fr(&root),
            }),
        )
            .into_response(),
        Err(e) => ledger_error(&e),
    }
}

pub async fn remove_from_blacklist(
    State(state): State<Arc<RwLock<AppState>>>,
    Json(req): Json<MutateRequest>,
) -> impl IntoResponse {
    let subject = match parse_subject(&req.subject) {
        Ok(s) => s,
        Err(e) => return bad_request(e),
    };

    let mut state = state.write().await;

    if let Err(e) = state.ledger.remove_from_blacklist(&subject, req.shield_id) {
        return ledger_error(&e);
    }
    match state.ledger.root(&subject) {
        Ok(root) => (
            StatusCode::OK,
            Json(MutateResponse {
                root: serialize_fr(&root),
            }),
        )
            .into_response(),
        Err(e) => ledger_error(&e),
    }
}

// ============ Queries ============

#[derive(Deserialize)]
pub struct SubjectRequest {
    pub subject: String,
}

#[derive(Serialize)]
pub struct BlacklistResponse {
    pub shield_ids: Vec<u64>,
}

pub async fn list_blacklist(
    State(state): State<Arc<RwLock<AppState>>>,
    Json(req): Json<SubjectRequest>,
) -> impl IntoResponse {
    let subject = match parse_subject(&req.subject) {
        Ok(s) => s,
        Err(e) => return bad_request(e),
    };

    let mut state = state.write().await;

    match state.ledger.blacklist(&subject) {
        Ok(members) => {
            let mut shield_ids: Vec<u64> = members.into_iter().collect();
            shield_ids.sort_unstable();
            (StatusCode::OK, Json(BlacklistResponse { shield_ids })).into_response()
        }
        Err(e) => ledger_error(&e),
    }
}

#[derive(Deserialize)]
pub struct ContainsRequest {
    pub subject: String,
    pub shield_id: u64,
}

#[derive(Serialize)]
pub struct ContainsResponse {
    pub blacklisted: bool,
}

pub async fn contains(
    State(state): State<Arc<RwLock<AppState>>>,
    Json(req): Json<ContainsRequest>,
) -> impl IntoResponse {
    let subject = match parse_subject(&req.subject) {
        Ok(s) => s,
        Err(e) => return bad_request(e),
    };

    let mut state = state.write().await;

    match state.ledger.is_blacklisted(&subject, req.shield_id) {
        Ok(blacklisted) => (StatusCode::OK, Json(ContainsResponse { blacklisted })).into_response(),
        Err(e) => ledger_error(&e),
    }
}

#[derive(Serialize)]
pub struct RootResponse {
    pub root: String,
}

pub async fn root(
    State(state): State<Arc<RwLock<AppState>>>,
    Json(req): Json<SubjectRequest>,
) -> impl IntoResponse {
    let subject = match parse_subject(&req.subject) {
        Ok(s) => s,
        Err(e) => return bad_request(e),
    };

    let mut state = state.write().await;

    match state.ledger.root(&subject) {
        Ok(root) => (
            StatusCode::OK,
            Json(RootResponse {
                root: serialize_fr(&root),
            }),
        )
            .into_response(),
        Err(e) => ledger_error(&e),
    }
}

#[derive(Deserialize)]
pub struct SiblingPathRequest {
    pub subject: String,
    pub shield_id: u64,
}

#[derive(Serialize)]
pub struct SiblingPathResponse {
    pub siblings: Vec<String>,
}

pub async fn sibling_path(
    State(state): State<Arc<RwLock<AppState>>>,
    Json(req): Json<SiblingPathRequest>,
) -> impl IntoResponse {
    let subject = match parse_subject(&req.subject) {
        Ok(s) => s,
        Err(e) => return bad_request(e),
    };

    let mut state = state.write().await;

    match state.ledger.sibling_path(&subject, req.shield_id) {
        Ok(path) => (
            StatusCode::OK,
            Json(SiblingPathResponse {
                siblings: path_to_hex(&path),
            }),
        )
            .into_response(),
        Err(e) => ledger_error(&e),
    }
}

#[derive(Deserialize)]
pub struct SiblingPathsRequest {
    pub subject: String,
    pub shield_ids: Vec<u64>,
}

#[derive(Serialize)]
pub struct SiblingPathsResponse {
    pub paths: Vec<Vec<String>>,
}

pub async fn sibling_paths(
    State(state): State<Arc<RwLock<AppState>>>,
    Json(req): Json<SiblingPathsRequest>,
) -> impl IntoResponse {
    let subject = match parse_subject(&req.subject) {
        Ok(s) => s,
        Err(e) => return bad_request(e),
    };

    let mut state = state.write().await;

    match state.ledger.sibling_paths(&subject, &req.shield_ids) {
        Ok(paths) => (
            StatusCode::OK,
            Json(SiblingPathsResponse {
                paths: paths.iter().map(path_to_hex).collect(),
            }),
        )
            .into_response(),
        Err(e) => ledger_error(&e),
    }
}

#[cfg(test)]
mod handler_tests {
    use super::*;

    #[test]
    fn test_parse_subject_round_trip() {
        let hex_str = format!("0x{}", "ab".repeat(32));
        let subject = parse_subject(&hex_str).unwrap();
        assert_eq!(subject.to_string(), hex_str);
    }

    #[test]
    fn test_parse_subject_rejects_bad_input() {
        assert!(parse_subject("0x1234").is_err());
        assert!(parse_subject("not hex").is_err());
    }

    #[test]
    fn test_serialize_fr_is_32_byte_hex() {
        let encoded = serialize_fr(&Fr::from(1u64));
        assert!(encoded.starts_with("0x"));
        assert_eq!(encoded.len(), 2 + 64);
    }
}
