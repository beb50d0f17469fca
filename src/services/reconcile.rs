//! Escrow reconciliation: deposits land on-chain outside this service's
//! control, so the observed vault balance is pushed into the ledger before
//! any balance-sensitive decision.

use crate::api::AppState;
use crate::chain::pubkey::Pubkey;
use crate::chain::VaultAmounts;
use crate::error::Result;

/// Reads the wallet's on-chain vault and treasury balances and informs the
/// ledger via `sync_escrow`. Chain state is never mutated here.
pub async fn reconcile(state: &AppState, wallet: &Pubkey) -> Result<VaultAmounts> {
    let amounts = state.chain.vault_amounts(wallet).await;
    state
        .ledger
        .sync_escrow(&wallet.to_string(), amounts.vault_raw)
        .await?;
    Ok(amounts)
}
