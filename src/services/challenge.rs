//! One-time signed login challenges. A wallet proves control of its private
//! key by signing the exact challenge block returned from `issue`; `verify`
//! consumes the challenge and mints a session.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::api::AppState;
use crate::chain::pubkey::Pubkey;
use crate::constants::{CHALLENGE_TTL_SECS, LOGIN_MESSAGE_HEADER, SESSION_TTL_DAYS};
use crate::crypto::signature::verify_wallet_signature;
use crate::error::{AppError, Result};

#[derive(Debug, Clone)]
pub struct IssuedChallenge {
    pub wallet: String,
    pub nonce: String,
    pub expires_at: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct MintedSession {
    pub token: String,
    pub wallet: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParsedMessage {
    pub wallet: String,
    pub nonce: String,
    pub expires_at: String,
}

/// The canonical challenge block. The client must sign these exact bytes.
pub fn build_login_message(wallet: &str, nonce: &str, expires_at: &DateTime<Utc>) -> String {
    format!(
        "{LOGIN_MESSAGE_HEADER}\nWallet: {wallet}\nNonce: {nonce}\nExpires: {}",
        expires_at.to_rfc3339()
    )
}

/// Parses the three labelled fields back out of a signed challenge block.
pub fn parse_login_message(message: &str) -> Result<ParsedMessage> {
    let mut wallet = None;
    let mut nonce = None;
    let mut expires_at = None;
    for line in message.lines().map(str::trim) {
        if let Some(rest) = line.strip_prefix("Wallet: ") {
            wallet = Some(rest.to_string());
        } else if let Some(rest) = line.strip_prefix("Nonce: ") {
            nonce = Some(rest.to_string());
        } else if let Some(rest) = line.strip_prefix("Expires: ") {
            expires_at = Some(rest.to_string());
        }
    }

    match (wallet, nonce, expires_at) {
        (Some(wallet), Some(nonce), Some(expires_at)) => Ok(ParsedMessage {
            wallet,
            nonce,
            expires_at,
        }),
        _ => Err(AppError::Validation("Malformed challenge message".into())),
    }
}

/// Issues (or re-issues) the wallet's login challenge. An unexpired challenge
/// is reused so a re-prompt cannot invalidate a signature already in flight.
pub async fn issue(state: &AppState, wallet: &str) -> Result<IssuedChallenge> {
    let wallet_key: Pubkey = wallet.parse()?;
    let wallet = wallet_key.to_string();

    let now = Utc::now();
    let existing = state.ledger.get_challenge(&wallet).await?;

    let (nonce, expires_at) = match existing {
        Some(row) if is_reusable(&row, now) => (row.nonce, row.expires_at),
        _ => {
            let nonce = Uuid::new_v4().to_string();
            let expires_at = now + Duration::seconds(CHALLENGE_TTL_SECS);
            state
                .ledger
                .upsert_challenge(&wallet, &nonce, expires_at)
                .await?;
            (nonce, expires_at)
        }
    };

    let message = build_login_message(&wallet, &nonce, &expires_at);
    Ok(IssuedChallenge {
        wallet,
        nonce,
        expires_at,
        message,
    })
}

/// Verifies a signed challenge, consumes it, and mints a session token.
pub async fn verify(
    state: &AppState,
    wallet: &str,
    message: &str,
    signature: &[u8],
) -> Result<MintedSession> {
    let wallet_key: Pubkey = wallet.parse()?;
    let wallet = wallet_key.to_string();

    let parsed = parse_login_message(message)?;
    if parsed.wallet != wallet {
        return Err(AppError::Validation("Message wallet mismatch".into()));
    }

    let now = Utc::now();
    let row = state
        .ledger
        .get_challenge(&wallet)
        .await?
        .ok_or_else(|| AppError::Auth("No active challenge for wallet".into()))?;
    if row.nonce != parsed.nonce {
        return Err(AppError::Auth("Nonce mismatch".into()));
    }
    if row.expires_at <= now {
        return Err(AppError::Auth("Challenge expired".into()));
    }

    verify_wallet_signature(&wallet_key, message, signature)?;

    // Single use: consume before minting the session.
    state.ledger.delete_challenge(&wallet).await?;

    let token = mint_token();
    let expires_at = now + Duration::days(SESSION_TTL_DAYS);
    state
        .ledger
        .insert_session(&token, &wallet, expires_at, now)
        .await?;
    state.ledger.ensure_player(&wallet).await?;

    Ok(MintedSession {
        token,
        wallet,
        expires_at,
    })
}

/// Opaque high-entropy bearer token; deliberately not a structured
/// credential.
fn mint_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// An unexpired challenge is always re-issued verbatim.
fn is_reusable(row: &crate::ledger::ChallengeRow, now: DateTime<Utc>) -> bool {
    row.expires_at > now
}
