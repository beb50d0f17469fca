use axum::{extract::State, http::HeaderMap, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::constants::{HISTORY_LIMIT, LEADERBOARD_LIMIT};
use crate::error::Result;
use crate::ledger::SettledRoundRow;
use crate::units::raw_to_ui_whole;

use super::{require_session, AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: String,
    pub ended_at: DateTime<Utc>,
    pub wager_ui: String,
    pub payout_ui: String,
    pub multiplier: f64,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub wallet: String,
    pub items: Vec<HistoryItem>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardItem {
    pub wallet: String,
    pub ended_at: DateTime<Utc>,
    pub wager_ui: String,
    pub payout_ui: String,
    pub multiplier: f64,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub items: Vec<LeaderboardItem>,
}

fn shorten(wallet: &str) -> String {
    if wallet.len() > 10 {
        format!("{}…{}", &wallet[..4], &wallet[wallet.len() - 4..])
    } else {
        wallet.to_string()
    }
}

fn history_item(row: SettledRoundRow) -> HistoryItem {
    HistoryItem {
        id: row.id,
        ended_at: row.ended_at,
        wager_ui: raw_to_ui_whole(row.wager_raw).to_string(),
        payout_ui: raw_to_ui_whole(row.payout_raw).to_string(),
        multiplier: row.multiplier_milli as f64 / 1000.0,
    }
}

/// GET /api/v1/history
pub async fn get_history(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<HistoryResponse>> {
    let wallet = require_session(&headers, &state).await?;

    let rows = state
        .ledger
        .settled_rounds_for_wallet(&wallet.to_string(), HISTORY_LIMIT)
        .await?;

    Ok(Json(HistoryResponse {
        wallet: wallet.to_string(),
        items: rows.into_iter().map(history_item).collect(),
    }))
}

/// GET /api/v1/leaderboard (public, no session)
pub async fn get_leaderboard(
    State(state): State<AppState>,
) -> Result<Json<LeaderboardResponse>> {
    let rows = state.ledger.top_settled_rounds(LEADERBOARD_LIMIT).await?;

    let items = rows
        .into_iter()
        .map(|row| LeaderboardItem {
            wallet: shorten(&row.wallet),
            ended_at: row.ended_at,
            wager_ui: raw_to_ui_whole(row.wager_raw).to_string(),
            payout_ui: raw_to_ui_whole(row.payout_raw).to_string(),
            multiplier: row.multiplier_milli as f64 / 1000.0,
        })
        .collect();

    Ok(Json(LeaderboardResponse { items }))
}
