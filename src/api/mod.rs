pub mod auth;
pub mod health;
pub mod leaderboard;
pub mod round;
pub mod session;
pub mod settlement;

use axum::http::{header::AUTHORIZATION, HeaderMap};

use crate::chain::pubkey::Pubkey;
use crate::chain::ChainClient;
use crate::config::Config;
use crate::crypto::authority::AuthoritySigner;
use crate::error::{AppError, Result};
use crate::ledger::LedgerClient;
use crate::services;

#[derive(Clone)]
pub struct AppState {
    pub ledger: LedgerClient,
    pub chain: ChainClient,
    pub authority: AuthoritySigner,
    pub config: Config,
}

fn bearer_token(headers: &HeaderMap) -> Result<&str> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Auth("Missing Authorization bearer token".to_string()))?;
    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid Authorization header".to_string()))?;
    auth_str
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Auth("Invalid Authorization scheme".to_string()))
}

/// The single authentication gate: resolves the bearer token to a wallet,
/// sliding session expiry as a side effect. No other credential is accepted.
pub async fn require_session(headers: &HeaderMap, state: &AppState) -> Result<Pubkey> {
    let token = bearer_token(headers)?;
    let wallet = services::session::resolve(state, token).await?;
    wallet
        .parse()
        .map_err(|_| AppError::Internal("Session row holds an invalid wallet".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_extracts_value() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers).unwrap(), "abc123");
    }

    #[test]
    fn bearer_token_rejects_missing_or_malformed() {
        let headers = HeaderMap::new();
        assert!(matches!(bearer_token(&headers), Err(AppError::Auth(_))));

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc123"));
        assert!(matches!(bearer_token(&headers), Err(AppError::Auth(_))));

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert!(matches!(bearer_token(&headers), Err(AppError::Auth(_))));
    }
}
