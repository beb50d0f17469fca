//! Withdrawal authorization: produces the capped, idempotent, signed message
//! the escrow contract verifies before releasing funds. The contract rejects
//! nonce reuse, so a duplicated client submission inside the ticket TTL
//! cannot double-pay.

use crate::api::AppState;
use crate::chain::pubkey::Pubkey;
use crate::constants::{AUTHORIZATION_MESSAGE_LEN, WITHDRAW_TICKET_TTL_SECS};
use crate::error::{AppError, Result};
use crate::services::reconcile;

#[derive(Debug, Clone)]
pub struct SignedAuthorization {
    pub authorized_amount_raw: u64,
    pub nonce: u64,
    pub expiry_unix: u64,
    pub signature: [u8; 64],
    pub authority_pubkey: String,
}

/// Exact byte layout the escrow contract's verifier expects:
/// `wallet(32) ‖ amount(8 LE) ‖ nonce(8 LE) ‖ expiry(8 LE)`.
pub fn pack_authorization_message(
    wallet: &Pubkey,
    amount_raw: u64,
    nonce: u64,
    expiry_unix: u64,
) -> [u8; AUTHORIZATION_MESSAGE_LEN] {
    let mut message = [0u8; AUTHORIZATION_MESSAGE_LEN];
    message[..32].copy_from_slice(wallet.as_ref());
    message[32..40].copy_from_slice(&amount_raw.to_le_bytes());
    message[40..48].copy_from_slice(&nonce.to_le_bytes());
    message[48..56].copy_from_slice(&expiry_unix.to_le_bytes());
    message
}

/// Both caps are hard rejections, never silent clamps: one guards against a
/// stale ledger read, the other against authorizing more than the chain can
/// actually redeem.
pub fn enforce_caps(authorized_raw: u64, play_balance_raw: u64, liquidity_raw: u64) -> Result<()> {
    if authorized_raw > play_balance_raw {
        return Err(AppError::State(format!(
            "Authorized amount {authorized_raw} exceeds play balance {play_balance_raw}"
        )));
    }
    if authorized_raw > liquidity_raw {
        return Err(AppError::State(format!(
            "Authorized amount {authorized_raw} exceeds on-chain liquidity {liquidity_raw}"
        )));
    }
    Ok(())
}

/// Prepares and signs a withdraw-all authorization for the wallet's current
/// play balance.
pub async fn authorize(state: &AppState, wallet: &Pubkey) -> Result<SignedAuthorization> {
    let amounts = reconcile::reconcile(state, wallet).await?;
    let player = state.ledger.session_state(&wallet.to_string()).await?;

    if player.active_round_id.is_some() {
        return Err(AppError::State(
            "Active round must be ended or aborted before withdrawal".into(),
        ));
    }

    let ticket = state
        .ledger
        .withdraw_prepare(
            &wallet.to_string(),
            player.play_balance_raw,
            WITHDRAW_TICKET_TTL_SECS,
        )
        .await?;

    let liquidity = amounts
        .liquidity_raw()
        .ok_or_else(|| AppError::State("On-chain liquidity out of range".into()))?;
    enforce_caps(
        ticket.authorized_amount_raw,
        player.play_balance_raw,
        liquidity,
    )?;

    let message = pack_authorization_message(
        wallet,
        ticket.authorized_amount_raw,
        ticket.nonce_raw,
        ticket.expiry_unix,
    );
    let signature = state.authority.sign(&message);

    Ok(SignedAuthorization {
        authorized_amount_raw: ticket.authorized_amount_raw,
        nonce: ticket.nonce_raw,
        expiry_unix: ticket.expiry_unix,
        signature,
        authority_pubkey: state.authority.pubkey().to_string(),
    })
}
