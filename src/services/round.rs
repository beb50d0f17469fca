//! Round lifecycle: `none → active → {settled | aborted}`. The ledger's
//! stored procedures hold the locking and the payout policy; this layer
//! validates input, converts units, and surfaces ledger rejections as state
//! conflicts.

use crate::api::AppState;
use crate::chain::pubkey::Pubkey;
use crate::error::{AppError, Result};
use crate::ledger::{RoundEndRow, RoundStartRow};
use crate::services::reconcile;

/// A round RPC the ledger refused (no balance, conflicting round, unknown
/// round id) is a state conflict for the caller, not a server fault.
fn as_state_error(err: AppError) -> AppError {
    match err {
        AppError::Ledger(msg) => AppError::State(msg),
        other => other,
    }
}

/// Debits the wager and opens a round. The ledger enforces at most one
/// active round per wallet atomically; the wager is always the
/// server-converted amount, never a client-reported balance.
pub async fn start(state: &AppState, wallet: &Pubkey, wager_raw: u64) -> Result<RoundStartRow> {
    reconcile::reconcile(state, wallet).await?;

    state
        .ledger
        .round_start(&wallet.to_string(), wager_raw)
        .await
        .map_err(as_state_error)
}

/// Settles a round from raw streak samples. The multiplier table is ledger
/// policy; nothing client-supplied beyond the samples is trusted.
pub async fn end(
    state: &AppState,
    wallet: &Pubkey,
    round_id: &str,
    streaks_ms: &[f64],
) -> Result<RoundEndRow> {
    if round_id.trim().is_empty() {
        return Err(AppError::Validation("Missing roundId".into()));
    }
    let streaks = coerce_streaks(streaks_ms);

    state
        .ledger
        .round_end(&wallet.to_string(), round_id, &streaks)
        .await
        .map_err(as_state_error)
}

/// Clears a stuck round without a settle record. Recovery path for lost
/// client sessions.
pub async fn abort(state: &AppState, wallet: &Pubkey) -> Result<()> {
    state
        .ledger
        .abort_active_round(&wallet.to_string())
        .await
        .map_err(as_state_error)
}

/// Streak samples arrive as JSON numbers; coerce each to a non-negative
/// integer millisecond count.
fn coerce_streaks(streaks_ms: &[f64]) -> Vec<u64> {
    streaks_ms
        .iter()
        .map(|&ms| {
            if ms.is_finite() && ms > 0.0 {
                ms.floor() as u64
            } else {
                0
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streaks_floor_and_clamp_to_zero() {
        let coerced = coerce_streaks(&[22000.9, -5.0, 0.0, f64::NAN, 10000.0]);
        assert_eq!(coerced, vec![22000, 0, 0, 0, 10000]);
    }

    #[test]
    fn ledger_rejections_become_state_errors() {
        let err = as_state_error(AppError::Ledger("round already active".into()));
        assert!(matches!(err, AppError::State(_)));

        let err = as_state_error(AppError::Validation("bad".into()));
        assert!(matches!(err, AppError::Validation(_)));
    }
}
