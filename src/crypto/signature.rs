//! Detached Ed25519 verification of wallet-signed messages.

use base64::Engine;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::Deserialize;

use crate::chain::pubkey::Pubkey;
use crate::error::{AppError, Result};

/// Wire format for client signatures: raw byte array or base64 text.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SignatureInput {
    Bytes(Vec<u8>),
    Base64(String),
}

impl SignatureInput {
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            SignatureInput::Bytes(bytes) => Ok(bytes),
            SignatureInput::Base64(text) => base64::engine::general_purpose::STANDARD
                .decode(text.trim())
                .map_err(|_| AppError::Validation("Invalid signature encoding".to_string())),
        }
    }
}

/// Verifies `signature` over the UTF-8 bytes of `message` against the
/// wallet's public key.
pub fn verify_wallet_signature(wallet: &Pubkey, message: &str, signature: &[u8]) -> Result<()> {
    let verifying_key = VerifyingKey::from_bytes(&wallet.to_bytes())
        .map_err(|_| AppError::Auth("Wallet key is not a valid Ed25519 point".to_string()))?;

    let signature_bytes: [u8; 64] = signature
        .try_into()
        .map_err(|_| AppError::InvalidSignature)?;
    let signature = Signature::from_bytes(&signature_bytes);

    verifying_key
        .verify(message.as_bytes(), &signature)
        .map_err(|_| AppError::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    fn test_keypair() -> (SigningKey, Pubkey) {
        let signing_key = SigningKey::from_bytes(&rand::random::<[u8; 32]>());
        let wallet = Pubkey::new(signing_key.verifying_key().to_bytes());
        (signing_key, wallet)
    }

    #[test]
    fn accepts_signature_from_wallet_key() {
        let (signing_key, wallet) = test_keypair();
        let message = "StreamWeave Login\nWallet: x\nNonce: y\nExpires: z";
        let signature = signing_key.sign(message.as_bytes());
        assert!(verify_wallet_signature(&wallet, message, &signature.to_bytes()).is_ok());
    }

    #[test]
    fn rejects_signature_from_other_key() {
        let (_, wallet) = test_keypair();
        let (other_key, _) = test_keypair();
        let message = "hello";
        let signature = other_key.sign(message.as_bytes());
        assert!(matches!(
            verify_wallet_signature(&wallet, message, &signature.to_bytes()),
            Err(AppError::InvalidSignature)
        ));
    }

    #[test]
    fn rejects_signature_over_different_message() {
        let (signing_key, wallet) = test_keypair();
        let signature = signing_key.sign(b"message a");
        assert!(verify_wallet_signature(&wallet, "message b", &signature.to_bytes()).is_err());
    }

    #[test]
    fn rejects_truncated_signature() {
        let (_, wallet) = test_keypair();
        assert!(matches!(
            verify_wallet_signature(&wallet, "m", &[0u8; 10]),
            Err(AppError::InvalidSignature)
        ));
    }

    #[test]
    fn signature_input_decodes_both_forms() {
        let bytes = SignatureInput::Bytes(vec![1, 2, 3]).into_bytes().unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);

        let encoded = base64::engine::general_purpose::STANDARD.encode([4u8, 5, 6]);
        let bytes = SignatureInput::Base64(encoded).into_bytes().unwrap();
        assert_eq!(bytes, vec![4, 5, 6]);

        assert!(SignatureInput::Base64("!!not base64!!".to_string())
            .into_bytes()
            .is_err());
    }
}
