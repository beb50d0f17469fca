use serde::Deserialize;
use std::env;

use crate::constants::{DEFAULT_ESCROW_PROGRAM_ID, DEFAULT_WEAVE_MINT};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,
    pub environment: String,

    // Ledger Service (PostgREST-style REST + stored procedures)
    pub ledger_url: String,
    pub ledger_service_key: String,

    // Chain
    pub solana_rpc_url: String,
    pub escrow_program_id: String,
    pub weave_mint: String,

    // Settlement signing: JSON byte array, 64 bytes (secret || public)
    pub game_authority_key: String,

    // Outbound HTTP
    pub request_timeout_secs: u64,

    // CORS
    pub cors_allowed_origins: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),

            ledger_url: env::var("LEDGER_URL")?,
            ledger_service_key: env::var("LEDGER_SERVICE_KEY")?,

            solana_rpc_url: env::var("SOLANA_RPC_URL")
                .unwrap_or_else(|_| "https://api.devnet.solana.com".to_string()),
            escrow_program_id: env::var("ESCROW_PROGRAM_ID")
                .unwrap_or_else(|_| DEFAULT_ESCROW_PROGRAM_ID.to_string()),
            weave_mint: env::var("WEAVE_MINT").unwrap_or_else(|_| DEFAULT_WEAVE_MINT.to_string()),

            game_authority_key: env::var("GAME_AUTHORITY_KEY")?,

            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()?,

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "*".to_string()),
        })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.ledger_url.trim().is_empty() {
            anyhow::bail!("LEDGER_URL is empty");
        }
        url::Url::parse(&self.ledger_url)
            .map_err(|e| anyhow::anyhow!("LEDGER_URL is not a valid URL: {e}"))?;
        if self.ledger_service_key.trim().is_empty() {
            anyhow::bail!("LEDGER_SERVICE_KEY is empty");
        }
        url::Url::parse(&self.solana_rpc_url)
            .map_err(|e| anyhow::anyhow!("SOLANA_RPC_URL is not a valid URL: {e}"))?;
        // The authority key is required at start-up; a malformed key must
        // never degrade into per-request failures.
        if self.game_authority_key.trim().is_empty() {
            anyhow::bail!("GAME_AUTHORITY_KEY is empty");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be > 0");
        }

        if self.escrow_program_id == DEFAULT_ESCROW_PROGRAM_ID && self.environment == "production" {
            tracing::warn!("Using devnet escrow program id in production");
        }
        if self.cors_allowed_origins.trim().is_empty() {
            tracing::warn!("CORS_ALLOWED_ORIGINS is empty; browser requests may be blocked");
        }

        Ok(())
    }

    pub fn is_testnet(&self) -> bool {
        self.environment == "development" || self.environment == "testnet"
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        host: "0.0.0.0".to_string(),
        port: 3000,
        environment: "development".to_string(),
        ledger_url: "http://localhost:54321".to_string(),
        ledger_service_key: "service-key".to_string(),
        solana_rpc_url: "http://localhost:8899".to_string(),
        escrow_program_id: DEFAULT_ESCROW_PROGRAM_ID.to_string(),
        weave_mint: DEFAULT_WEAVE_MINT.to_string(),
        game_authority_key: "[]".to_string(),
        request_timeout_secs: 10,
        cors_allowed_origins: "*".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_missing_ledger_config() {
        let mut config = test_config();
        config.ledger_url = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_missing_authority_key() {
        let mut config = test_config();
        config.game_authority_key = "".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_accepts_test_config() {
        assert!(test_config().validate().is_ok());
    }
}
