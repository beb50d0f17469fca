//! Client for the external Ledger Service: a PostgREST-style REST surface
//! over the authoritative tables plus a set of atomic stored procedures.
//! Every balance decision in this crate goes through these calls; nothing is
//! cached or recomputed locally.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::units::raw_u64;

#[derive(Clone)]
pub struct LedgerClient {
    http: reqwest::Client,
    base_url: String,
    service_key: String,
}

// ==================== ROW TYPES ====================

#[derive(Debug, Clone, Deserialize)]
pub struct ChallengeRow {
    pub nonce: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionRow {
    pub wallet: String,
    pub expires_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerStateRow {
    #[serde(with = "raw_u64")]
    pub play_balance_raw: u64,
    #[serde(with = "raw_u64")]
    pub escrow_observed_raw: u64,
    pub needs_finalization: bool,
    pub active_round_id: Option<String>,
    pub active_expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoundStartRow {
    pub round_id: String,
    #[serde(with = "raw_u64")]
    pub play_balance_raw: u64,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoundEndRow {
    pub multiplier_milli: i64,
    #[serde(with = "raw_u64")]
    pub payout_raw: u64,
    #[serde(with = "raw_u64")]
    pub play_balance_raw: u64,
}

/// Idempotent withdrawal ticket: repeated `withdraw_prepare` calls inside the
/// TTL return this exact triple.
#[derive(Debug, Clone, Deserialize)]
pub struct WithdrawTicketRow {
    #[serde(with = "raw_u64")]
    pub authorized_amount_raw: u64,
    #[serde(with = "raw_u64")]
    pub nonce_raw: u64,
    #[serde(with = "raw_u64")]
    pub expiry_unix: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SettledRoundRow {
    pub id: String,
    pub wallet: String,
    #[serde(with = "raw_u64")]
    pub wager_raw: u64,
    pub multiplier_milli: i64,
    #[serde(with = "raw_u64")]
    pub payout_raw: u64,
    pub ended_at: DateTime<Utc>,
}

// ==================== TRANSPORT ====================

/// Every value interpolated into a PostgREST filter goes through here.
/// Tokens and wallets arrive from the client; unencoded `&`/`=` would land
/// in the ledger request as extra query parameters.
fn encode_query_value(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

impl LedgerClient {
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Ledger HTTP client init failed: {e}")))?;

        Ok(Self {
            http,
            base_url: config.ledger_url.trim_end_matches('/').to_string(),
            service_key: config.ledger_service_key.clone(),
        })
    }

    fn request(&self, method: reqwest::Method, path_and_query: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/rest/v1/{}", self.base_url, path_and_query);
        self.http
            .request(method, url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    async fn read_body(path: &str, response: reqwest::Response) -> Result<String> {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(AppError::Ledger(format!(
                "Ledger {path} failed: {status} {text}"
            )));
        }
        Ok(text)
    }

    async fn get<T: DeserializeOwned>(&self, path_and_query: &str) -> Result<T> {
        let response = self
            .request(reqwest::Method::GET, path_and_query)
            .send()
            .await
            .map_err(|e| AppError::Ledger(format!("Ledger GET {path_and_query} failed: {e}")))?;
        let text = Self::read_body(path_and_query, response).await?;
        serde_json::from_str(&text)
            .map_err(|e| AppError::Ledger(format!("Ledger GET {path_and_query} parse failed: {e}")))
    }

    async fn post(&self, path_and_query: &str, body: &Value, prefer: &str) -> Result<()> {
        let response = self
            .request(reqwest::Method::POST, path_and_query)
            .header("Prefer", prefer)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Ledger(format!("Ledger POST {path_and_query} failed: {e}")))?;
        Self::read_body(path_and_query, response).await?;
        Ok(())
    }

    async fn patch(&self, path_and_query: &str, body: &Value) -> Result<()> {
        let response = self
            .request(reqwest::Method::PATCH, path_and_query)
            .header("Prefer", "return=minimal")
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Ledger(format!("Ledger PATCH {path_and_query} failed: {e}")))?;
        Self::read_body(path_and_query, response).await?;
        Ok(())
    }

    async fn delete(&self, path_and_query: &str) -> Result<()> {
        let response = self
            .request(reqwest::Method::DELETE, path_and_query)
            .send()
            .await
            .map_err(|e| AppError::Ledger(format!("Ledger DELETE {path_and_query} failed: {e}")))?;
        Self::read_body(path_and_query, response).await?;
        Ok(())
    }

    /// Invokes a stored procedure. The ledger guarantees each procedure is
    /// atomic; the core never wraps them in additional locking. Void
    /// procedures return an empty body, surfaced here as `Null`.
    async fn rpc(&self, name: &str, args: Value) -> Result<Value> {
        let url = format!("{}/rest/v1/rpc/{}", self.base_url, name);
        let response = self
            .http
            .post(url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .json(&args)
            .send()
            .await
            .map_err(|e| AppError::Ledger(format!("Ledger rpc/{name} failed: {e}")))?;
        let text = Self::read_body(name, response).await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| AppError::Ledger(format!("Ledger rpc/{name} parse failed: {e}")))
    }

    async fn rpc_first<T: DeserializeOwned>(&self, name: &str, args: Value) -> Result<T> {
        let value = self.rpc(name, args).await?;
        let rows: Vec<T> = serde_json::from_value(value)
            .map_err(|e| AppError::Ledger(format!("Ledger rpc/{name} parse failed: {e}")))?;
        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::Ledger(format!("Ledger rpc/{name} returned no rows")))
    }
}

// ==================== CHALLENGES & SESSIONS ====================

impl LedgerClient {
    pub async fn get_challenge(&self, wallet: &str) -> Result<Option<ChallengeRow>> {
        let rows: Vec<ChallengeRow> = self
            .get(&format!(
                "auth_challenges?wallet=eq.{}&select=nonce,expires_at&limit=1",
                encode_query_value(wallet)
            ))
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Merge-on-conflict by wallet, so concurrent issues converge on one row.
    pub async fn upsert_challenge(
        &self,
        wallet: &str,
        nonce: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        self.post(
            "auth_challenges?on_conflict=wallet",
            &json!({ "wallet": wallet, "nonce": nonce, "expires_at": expires_at.to_rfc3339() }),
            "resolution=merge-duplicates,return=minimal",
        )
        .await
    }

    pub async fn delete_challenge(&self, wallet: &str) -> Result<()> {
        self.delete(&format!(
            "auth_challenges?wallet=eq.{}",
            encode_query_value(wallet)
        ))
        .await
    }

    pub async fn insert_session(
        &self,
        token: &str,
        wallet: &str,
        expires_at: DateTime<Utc>,
        last_seen_at: DateTime<Utc>,
    ) -> Result<()> {
        self.post(
            "sessions",
            &json!({
                "token": token,
                "wallet": wallet,
                "expires_at": expires_at.to_rfc3339(),
                "last_seen_at": last_seen_at.to_rfc3339(),
            }),
            "return=minimal",
        )
        .await
    }

    pub async fn get_session(&self, token: &str) -> Result<Option<SessionRow>> {
        let rows: Vec<SessionRow> = self
            .get(&format!(
                "sessions?token=eq.{}&select=wallet,expires_at,last_seen_at&limit=1",
                encode_query_value(token)
            ))
            .await?;
        Ok(rows.into_iter().next())
    }

    /// One coalesced write per resolve: always bumps `last_seen_at`, extends
    /// `expires_at` only when the caller asks.
    pub async fn touch_session(
        &self,
        token: &str,
        last_seen_at: DateTime<Utc>,
        extend_to: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut body = json!({ "last_seen_at": last_seen_at.to_rfc3339() });
        if let Some(expires_at) = extend_to {
            body["expires_at"] = json!(expires_at.to_rfc3339());
        }
        self.patch(
            &format!("sessions?token=eq.{}", encode_query_value(token)),
            &body,
        )
        .await
    }

    pub async fn ensure_player(&self, wallet: &str) -> Result<()> {
        self.post(
            "players?on_conflict=wallet",
            &json!({ "wallet": wallet }),
            "resolution=merge-duplicates,return=minimal",
        )
        .await
    }
}

// ==================== STORED PROCEDURES ====================

impl LedgerClient {
    pub async fn sync_escrow(&self, wallet: &str, escrow_raw: u64) -> Result<()> {
        self.rpc(
            "sync_escrow",
            json!({ "p_wallet": wallet, "p_escrow_raw": escrow_raw.to_string() }),
        )
        .await?;
        Ok(())
    }

    pub async fn session_state(&self, wallet: &str) -> Result<PlayerStateRow> {
        self.rpc_first("session_state", json!({ "p_wallet": wallet }))
            .await
    }

    pub async fn round_start(&self, wallet: &str, wager_raw: u64) -> Result<RoundStartRow> {
        self.rpc_first(
            "round_start",
            json!({ "p_wallet": wallet, "p_wager_raw": wager_raw.to_string() }),
        )
        .await
    }

    pub async fn round_end(
        &self,
        wallet: &str,
        round_id: &str,
        streaks_ms: &[u64],
    ) -> Result<RoundEndRow> {
        self.rpc_first(
            "round_end",
            json!({ "p_wallet": wallet, "p_round_id": round_id, "p_streaks_ms": streaks_ms }),
        )
        .await
    }

    pub async fn abort_active_round(&self, wallet: &str) -> Result<()> {
        self.rpc("abort_active_round", json!({ "p_wallet": wallet }))
            .await?;
        Ok(())
    }

    pub async fn withdraw_prepare(
        &self,
        wallet: &str,
        amount_raw: u64,
        ttl_seconds: u64,
    ) -> Result<WithdrawTicketRow> {
        self.rpc_first(
            "withdraw_prepare",
            json!({
                "p_wallet": wallet,
                "p_amount_raw": amount_raw.to_string(),
                "p_ttl_seconds": ttl_seconds,
            }),
        )
        .await
    }
}

// ==================== SETTLED ROUND READS ====================

impl LedgerClient {
    pub async fn settled_rounds_for_wallet(
        &self,
        wallet: &str,
        limit: u32,
    ) -> Result<Vec<SettledRoundRow>> {
        self.get(&format!(
            "rounds?wallet=eq.{}&status=eq.settled\
             &select=id,wallet,wager_raw,multiplier_milli,payout_raw,ended_at\
             &order=ended_at.desc&limit={limit}",
            encode_query_value(wallet)
        ))
        .await
    }

    pub async fn top_settled_rounds(&self, limit: u32) -> Result<Vec<SettledRoundRow>> {
        self.get(&format!(
            "rounds?status=eq.settled\
             &select=id,wallet,wager_raw,multiplier_milli,payout_raw,ended_at\
             &order=payout_raw.desc,ended_at.desc&limit={limit}"
        ))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_values_are_percent_encoded() {
        // a token crafted to smuggle extra query parameters stays one value
        assert_eq!(
            encode_query_value("junk&select=token&limit=100"),
            "junk%26select%3Dtoken%26limit%3D100"
        );
        // well-formed tokens and base58 wallets pass through unchanged
        assert_eq!(
            encode_query_value("So11111111111111111111111111111111111111112"),
            "So11111111111111111111111111111111111111112"
        );
        assert_eq!(encode_query_value("0a1b2c3d"), "0a1b2c3d");
    }

    #[test]
    fn session_filter_keeps_hostile_token_as_single_value() {
        let path = format!(
            "sessions?token=eq.{}&select=wallet,expires_at,last_seen_at&limit=1",
            encode_query_value("junk&select=token&limit=100")
        );
        assert_eq!(
            path,
            "sessions?token=eq.junk%26select%3Dtoken%26limit%3D100\
             &select=wallet,expires_at,last_seen_at&limit=1"
        );
    }

    #[test]
    fn player_state_row_parses_supabase_shapes() {
        let row: PlayerStateRow = serde_json::from_str(
            r#"{
                "play_balance_raw": "5000000000000",
                "escrow_observed_raw": 0,
                "needs_finalization": false,
                "active_round_id": null,
                "active_expires_at": null
            }"#,
        )
        .unwrap();
        assert_eq!(row.play_balance_raw, 5_000_000_000_000);
        assert_eq!(row.escrow_observed_raw, 0);
        assert!(row.active_round_id.is_none());
    }

    #[test]
    fn withdraw_ticket_row_parses_string_amounts() {
        let row: WithdrawTicketRow = serde_json::from_str(
            r#"{
                "authorized_amount_raw": "4000000000000",
                "nonce_raw": "170071234567890",
                "expiry_unix": 1700000120
            }"#,
        )
        .unwrap();
        assert_eq!(row.authorized_amount_raw, 4_000_000_000_000);
        assert_eq!(row.nonce_raw, 170_071_234_567_890);
        assert_eq!(row.expiry_unix, 1_700_000_120);
    }

    #[test]
    fn settled_round_row_parses() {
        let row: SettledRoundRow = serde_json::from_str(
            r#"{
                "id": "r-1",
                "wallet": "So11111111111111111111111111111111111111112",
                "wager_raw": "1000000000000",
                "multiplier_milli": 1500,
                "payout_raw": "1500000000000",
                "ended_at": "2026-08-29T12:00:00Z"
            }"#,
        )
        .unwrap();
        assert_eq!(row.multiplier_milli, 1500);
        assert_eq!(row.payout_raw, 1_500_000_000_000);
    }
}
