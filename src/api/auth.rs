use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::signature::SignatureInput;
use crate::error::{AppError, Result};
use crate::services::challenge;

use super::AppState;

// ==================== REQUEST/RESPONSE TYPES ====================

#[derive(Debug, Deserialize)]
pub struct ChallengeRequest {
    pub wallet: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResponse {
    pub wallet: String,
    pub nonce: String,
    pub expires_at: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub wallet: Option<String>,
    pub message: Option<String>,
    pub signature: Option<SignatureInput>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub token: String,
    pub wallet: String,
    pub expires_at: DateTime<Utc>,
}

// ==================== HANDLERS ====================

/// POST /api/v1/auth/challenge
pub async fn issue_challenge(
    State(state): State<AppState>,
    Json(req): Json<ChallengeRequest>,
) -> Result<Json<ChallengeResponse>> {
    let wallet = req
        .wallet
        .ok_or_else(|| AppError::Validation("Missing wallet".into()))?;

    let issued = challenge::issue(&state, &wallet).await?;

    Ok(Json(ChallengeResponse {
        wallet: issued.wallet,
        nonce: issued.nonce,
        expires_at: issued.expires_at,
        message: issued.message,
    }))
}

/// POST /api/v1/auth/verify
pub async fn verify_challenge(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>> {
    let (wallet, message, signature) = match (req.wallet, req.message, req.signature) {
        (Some(wallet), Some(message), Some(signature)) => (wallet, message, signature),
        _ => {
            return Err(AppError::Validation(
                "Missing wallet/message/signature".into(),
            ))
        }
    };
    let signature = signature.into_bytes()?;

    let session = challenge::verify(&state, &wallet, &message, &signature).await?;

    tracing::info!(wallet = %session.wallet, "wallet authenticated");

    Ok(Json(VerifyResponse {
        token: session.token,
        wallet: session.wallet,
        expires_at: session.expires_at,
    }))
}
