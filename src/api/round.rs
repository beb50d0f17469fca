use axum::{extract::State, http::HeaderMap, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::ledger::RoundEndRow;
use crate::services::round;
use crate::units::{raw_to_ui_whole, wager_ui_to_raw};

use super::{require_session, AppState};

// ==================== REQUEST/RESPONSE TYPES ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundStartRequest {
    pub wager_ui: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundStartResponse {
    pub wallet: String,
    pub round_id: String,
    pub play_balance_raw: String,
    pub expires_at: DateTime<Utc>,
    pub wager_ui: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundEndRequest {
    pub round_id: Option<String>,
    #[serde(default)]
    pub streaks_ms: Vec<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundEndResponse {
    pub wallet: String,
    pub round_id: String,
    pub multiplier_milli: i64,
    pub multiplier: f64,
    pub payout_raw: String,
    pub payout_ui: String,
    pub play_balance_raw: String,
    pub play_balance_ui: String,
}

#[derive(Debug, Serialize)]
pub struct RoundAbortResponse {
    pub ok: bool,
}

// ==================== HANDLERS ====================

/// POST /api/v1/round/start
pub async fn round_start(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RoundStartRequest>,
) -> Result<Json<RoundStartResponse>> {
    let wallet = require_session(&headers, &state).await?;
    let wager_ui = req
        .wager_ui
        .ok_or_else(|| AppError::Validation("Missing wagerUi".into()))?;
    // Server-side conversion; the client's claimed balance is never trusted.
    let wager_raw = wager_ui_to_raw(wager_ui)?;

    let started = round::start(&state, &wallet, wager_raw).await?;

    tracing::info!(wallet = %wallet, round_id = %started.round_id, "round started");

    Ok(Json(RoundStartResponse {
        wallet: wallet.to_string(),
        round_id: started.round_id,
        play_balance_raw: started.play_balance_raw.to_string(),
        expires_at: started.expires_at,
        wager_ui: raw_to_ui_whole(wager_raw),
    }))
}

/// POST /api/v1/round/end
pub async fn round_end(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RoundEndRequest>,
) -> Result<Json<RoundEndResponse>> {
    let wallet = require_session(&headers, &state).await?;
    let round_id = req
        .round_id
        .ok_or_else(|| AppError::Validation("Missing roundId".into()))?;

    let settled = round::end(&state, &wallet, &round_id, &req.streaks_ms).await?;

    tracing::info!(
        wallet = %wallet,
        round_id = %round_id,
        multiplier_milli = settled.multiplier_milli,
        "round settled"
    );

    Ok(Json(settled_response(wallet.to_string(), round_id, &settled)))
}

/// Payout and balance render as whole UI units here; the decimal form is
/// the session-state endpoint's job.
fn settled_response(wallet: String, round_id: String, settled: &RoundEndRow) -> RoundEndResponse {
    RoundEndResponse {
        wallet,
        round_id,
        multiplier_milli: settled.multiplier_milli,
        multiplier: settled.multiplier_milli as f64 / 1000.0,
        payout_raw: settled.payout_raw.to_string(),
        payout_ui: raw_to_ui_whole(settled.payout_raw).to_string(),
        play_balance_raw: settled.play_balance_raw.to_string(),
        play_balance_ui: raw_to_ui_whole(settled.play_balance_raw).to_string(),
    }
}

/// POST /api/v1/round/abort
pub async fn round_abort(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RoundAbortResponse>> {
    let wallet = require_session(&headers, &state).await?;
    round::abort(&state, &wallet).await?;

    tracing::info!(wallet = %wallet, "active round aborted");

    Ok(Json(RoundAbortResponse { ok: true }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settled_response_uses_whole_unit_strings_for_both_amounts() {
        let settled = RoundEndRow {
            multiplier_milli: 1500,
            payout_raw: 1_500_000_000_500,
            play_balance_raw: 2_500_999_999_999,
        };
        let resp = settled_response("w".to_string(), "r-1".to_string(), &settled);
        assert_eq!(resp.payout_ui, "1500");
        assert_eq!(resp.play_balance_ui, "2500");
        assert_eq!(resp.multiplier, 1.5);
    }
}
