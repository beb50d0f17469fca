use axum::{extract::State, http::HeaderMap, Json};
use serde::Serialize;

use crate::error::Result;
use crate::services::withdrawal;

use super::{require_session, AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationResponse {
    /// Detached Ed25519 signature over the 56-byte authorization message,
    /// as a plain byte array for on-chain submission.
    pub signature: Vec<u8>,
    pub authorized_amount: String,
    pub nonce: String,
    pub expiry: String,
    pub authority_pubkey: String,
    pub status: String,
}

/// POST /api/v1/settlement/authorize
///
/// Withdrawal prepare + sign in one step. Idempotent inside the ticket TTL:
/// a duplicate call returns the identical amount/nonce/expiry triple, so the
/// escrow contract's nonce check defeats double submission.
pub async fn authorize_withdrawal(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AuthorizationResponse>> {
    let wallet = require_session(&headers, &state).await?;

    let authorization = withdrawal::authorize(&state, &wallet).await?;

    tracing::info!(
        wallet = %wallet,
        amount_raw = authorization.authorized_amount_raw,
        nonce = authorization.nonce,
        "withdrawal authorized"
    );

    Ok(Json(AuthorizationResponse {
        signature: authorization.signature.to_vec(),
        authorized_amount: authorization.authorized_amount_raw.to_string(),
        nonce: authorization.nonce.to_string(),
        expiry: authorization.expiry_unix.to_string(),
        authority_pubkey: authorization.authority_pubkey,
        status: "approved".to_string(),
    }))
}
