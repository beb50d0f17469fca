//! Server-held authority keypair. Its public half is registered with the
//! escrow contract; the private half signs withdrawal authorizations and is
//! loaded once at start-up.

use ed25519_dalek::{Signer, SigningKey};

use crate::chain::pubkey::Pubkey;
use crate::config::Config;

#[derive(Clone)]
pub struct AuthoritySigner {
    signing_key: SigningKey,
}

impl AuthoritySigner {
    /// Parses `GAME_AUTHORITY_KEY`: a JSON array of 64 bytes in Solana
    /// keypair layout (32-byte secret seed followed by the public key).
    /// Any defect here aborts start-up.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let bytes: Vec<u8> = serde_json::from_str(&config.game_authority_key)
            .map_err(|e| anyhow::anyhow!("GAME_AUTHORITY_KEY is not a JSON byte array: {e}"))?;
        if bytes.len() != 64 {
            anyhow::bail!(
                "GAME_AUTHORITY_KEY must be 64 bytes, got {}",
                bytes.len()
            );
        }

        let seed: [u8; 32] = bytes[..32].try_into().expect("split checked above");
        let public: [u8; 32] = bytes[32..].try_into().expect("split checked above");

        let signing_key = SigningKey::from_bytes(&seed);
        if signing_key.verifying_key().to_bytes() != public {
            anyhow::bail!("GAME_AUTHORITY_KEY public half does not match its secret seed");
        }

        Ok(Self { signing_key })
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }

    pub fn pubkey(&self) -> Pubkey {
        Pubkey::new(self.signing_key.verifying_key().to_bytes())
    }
}

#[cfg(test)]
pub(crate) fn test_signer() -> AuthoritySigner {
    AuthoritySigner {
        signing_key: SigningKey::from_bytes(&rand::random::<[u8; 32]>()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use ed25519_dalek::{Verifier, VerifyingKey};

    fn keypair_json() -> String {
        let signing_key = SigningKey::from_bytes(&[42u8; 32]);
        let mut bytes = signing_key.to_bytes().to_vec();
        bytes.extend_from_slice(&signing_key.verifying_key().to_bytes());
        serde_json::to_string(&bytes).unwrap()
    }

    #[test]
    fn loads_solana_keypair_layout() {
        let mut config = test_config();
        config.game_authority_key = keypair_json();
        let signer = AuthoritySigner::from_config(&config).unwrap();

        let signature = signer.sign(b"payload");
        let verifying_key = VerifyingKey::from_bytes(&signer.pubkey().to_bytes()).unwrap();
        assert!(verifying_key
            .verify(b"payload", &ed25519_dalek::Signature::from_bytes(&signature))
            .is_ok());
    }

    #[test]
    fn rejects_wrong_length() {
        let mut config = test_config();
        config.game_authority_key = "[1,2,3]".to_string();
        assert!(AuthoritySigner::from_config(&config).is_err());
    }

    #[test]
    fn rejects_mismatched_public_half() {
        let signing_key = SigningKey::from_bytes(&[42u8; 32]);
        let mut bytes = signing_key.to_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; 32]);

        let mut config = test_config();
        config.game_authority_key = serde_json::to_string(&bytes).unwrap();
        assert!(AuthoritySigner::from_config(&config).is_err());
    }

    #[test]
    fn rejects_non_json_key() {
        let mut config = test_config();
        config.game_authority_key = "not json".to_string();
        assert!(AuthoritySigner::from_config(&config).is_err());
    }
}
