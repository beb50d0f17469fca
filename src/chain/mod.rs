//! Read-only Solana JSON-RPC access. The chain is treated as an external
//! oracle for deposited escrow funds; nothing here mutates on-chain state.

pub mod pubkey;

use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::config::Config;
use crate::constants::{PLAYER_STATE_SEED, TREASURY_SEED};
use crate::error::{AppError, Result};
use pubkey::Pubkey;

#[derive(Debug, Clone, Copy, Default)]
pub struct VaultAmounts {
    pub vault_raw: u64,
    pub treasury_raw: u64,
}

impl VaultAmounts {
    /// Total redeemable on-chain liquidity.
    pub fn liquidity_raw(&self) -> Option<u64> {
        self.vault_raw.checked_add(self.treasury_raw)
    }
}

#[derive(Clone)]
pub struct ChainClient {
    http: reqwest::Client,
    rpc_url: String,
    program_id: Pubkey,
    mint: Pubkey,
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    result: Option<RpcResult>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RpcResult {
    value: RpcTokenAmount,
}

#[derive(Debug, Deserialize)]
struct RpcTokenAmount {
    amount: String,
}

impl ChainClient {
    pub fn from_config(config: &Config) -> Result<Self> {
        let program_id: Pubkey = config
            .escrow_program_id
            .parse()
            .map_err(|_| AppError::Internal("Invalid ESCROW_PROGRAM_ID".to_string()))?;
        let mint: Pubkey = config
            .weave_mint
            .parse()
            .map_err(|_| AppError::Internal("Invalid WEAVE_MINT".to_string()))?;

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Chain HTTP client init failed: {e}")))?;

        Ok(Self {
            http,
            rpc_url: config.solana_rpc_url.clone(),
            program_id,
            mint,
        })
    }

    pub fn player_vault_address(&self, wallet: &Pubkey) -> Pubkey {
        let (player_state, _) =
            Pubkey::find_program_address(&[PLAYER_STATE_SEED, wallet.as_ref()], &self.program_id);
        Pubkey::associated_token_address(&player_state, &self.mint)
    }

    pub fn treasury_vault_address(&self) -> Pubkey {
        let (treasury, _) = Pubkey::find_program_address(&[TREASURY_SEED], &self.program_id);
        Pubkey::associated_token_address(&treasury, &self.mint)
    }

    /// Reads both escrow balances for a wallet. A never-funded vault is a
    /// normal state, so absence and read failures both report zero.
    pub async fn vault_amounts(&self, wallet: &Pubkey) -> VaultAmounts {
        let vault_raw = self
            .token_account_balance(&self.player_vault_address(wallet))
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(wallet = %wallet, "vault balance read failed: {e}");
                0
            });
        let treasury_raw = self
            .token_account_balance(&self.treasury_vault_address())
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("treasury balance read failed: {e}");
                0
            });

        VaultAmounts {
            vault_raw,
            treasury_raw,
        }
    }

    async fn token_account_balance(&self, account: &Pubkey) -> Result<u64> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getTokenAccountBalance",
            "params": [account.to_string(), { "commitment": "confirmed" }],
        });

        let response = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ChainRpc(format!("getTokenAccountBalance failed: {e}")))?;

        let envelope: RpcEnvelope = response
            .json()
            .await
            .map_err(|e| AppError::ChainRpc(format!("getTokenAccountBalance parse failed: {e}")))?;

        if let Some(err) = envelope.error {
            return Err(AppError::ChainRpc(format!(
                "getTokenAccountBalance rpc error: {err}"
            )));
        }

        let result = envelope
            .result
            .ok_or_else(|| AppError::ChainRpc("getTokenAccountBalance empty result".to_string()))?;

        result
            .value
            .amount
            .parse::<u64>()
            .map_err(|e| AppError::ChainRpc(format!("Invalid token amount: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    #[test]
    fn liquidity_adds_vault_and_treasury() {
        let amounts = VaultAmounts {
            vault_raw: 3,
            treasury_raw: 4,
        };
        assert_eq!(amounts.liquidity_raw(), Some(7));

        let saturated = VaultAmounts {
            vault_raw: u64::MAX,
            treasury_raw: 1,
        };
        assert_eq!(saturated.liquidity_raw(), None);
    }

    #[test]
    fn vault_addresses_are_deterministic_per_wallet() {
        let client = ChainClient::from_config(&test_config()).unwrap();
        let wallet = Pubkey::new([9u8; 32]);
        assert_eq!(
            client.player_vault_address(&wallet),
            client.player_vault_address(&wallet)
        );
        assert_ne!(
            client.player_vault_address(&wallet),
            client.treasury_vault_address()
        );
    }
}
