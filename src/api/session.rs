use axum::{extract::State, http::HeaderMap, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::services::reconcile;
use crate::units::raw_to_ui_string;

use super::{require_session, AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStateResponse {
    pub wallet: String,
    pub play_balance_raw: String,
    pub play_balance_ui: String,
    pub escrow_observed_raw: String,
    pub needs_finalization: bool,
    pub active_round_id: Option<String>,
    pub active_expires_at: Option<DateTime<Utc>>,
}

/// POST /api/v1/session/state
///
/// Reconciles on-chain escrow first so just-completed deposits are visible
/// in the authoritative balance.
pub async fn session_state(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SessionStateResponse>> {
    let wallet = require_session(&headers, &state).await?;

    reconcile::reconcile(&state, &wallet).await?;
    let player = state.ledger.session_state(&wallet.to_string()).await?;

    Ok(Json(SessionStateResponse {
        wallet: wallet.to_string(),
        play_balance_raw: player.play_balance_raw.to_string(),
        play_balance_ui: raw_to_ui_string(player.play_balance_raw),
        escrow_observed_raw: player.escrow_observed_raw.to_string(),
        needs_finalization: player.needs_finalization,
        active_round_id: player.active_round_id,
        active_expires_at: player.active_expires_at,
    }))
}
