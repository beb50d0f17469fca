//! Base58 public keys and program-derived address math for the escrow
//! program's vault accounts.

use ed25519_dalek::VerifyingKey;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::constants::{ASSOCIATED_TOKEN_PROGRAM_ID, TOKEN_PROGRAM_ID};
use crate::error::AppError;

const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// A 32-byte Ed25519 public key in Solana's base58 text form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pubkey([u8; 32]);

impl Pubkey {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    pub fn as_ref(&self) -> &[u8] {
        &self.0
    }

    /// True when the compressed bytes decode to a point on the Ed25519
    /// curve. PDAs are by construction off-curve.
    pub fn is_on_curve(&self) -> bool {
        VerifyingKey::from_bytes(&self.0).is_ok()
    }

    /// Derives the program address for `seeds`, scanning bump seeds from 255
    /// downward until the candidate falls off the curve.
    pub fn find_program_address(seeds: &[&[u8]], program_id: &Pubkey) -> (Pubkey, u8) {
        for bump in (0..=u8::MAX).rev() {
            let mut hasher = Sha256::new();
            for seed in seeds {
                hasher.update(seed);
            }
            hasher.update([bump]);
            hasher.update(program_id.as_ref());
            hasher.update(PDA_MARKER);
            let candidate = Pubkey(hasher.finalize().into());
            if !candidate.is_on_curve() {
                return (candidate, bump);
            }
        }
        // 256 consecutive on-curve hashes is not reachable in practice.
        unreachable!("no off-curve program address for seeds")
    }

    /// The associated token account holding `mint` for `owner`.
    pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
        let token_program: Pubkey = TOKEN_PROGRAM_ID.parse().expect("static token program id");
        let ata_program: Pubkey = ASSOCIATED_TOKEN_PROGRAM_ID
            .parse()
            .expect("static associated token program id");
        let (address, _) = Pubkey::find_program_address(
            &[owner.as_ref(), token_program.as_ref(), mint.as_ref()],
            &ata_program,
        );
        address
    }
}

impl FromStr for Pubkey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decoded = bs58::decode(s.trim())
            .into_vec()
            .map_err(|_| AppError::Validation(format!("Invalid wallet address: {s}")))?;
        let bytes: [u8; 32] = decoded
            .try_into()
            .map_err(|_| AppError::Validation(format!("Invalid wallet address: {s}")))?;
        Ok(Pubkey(bytes))
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DEFAULT_ESCROW_PROGRAM_ID, PLAYER_STATE_SEED, TREASURY_SEED};

    #[test]
    fn parse_and_display_round_trip() {
        let text = DEFAULT_ESCROW_PROGRAM_ID;
        let key: Pubkey = text.parse().unwrap();
        assert_eq!(key.to_string(), text);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("not-base58-0OIl".parse::<Pubkey>().is_err());
        // valid base58 but wrong length
        assert!("abc".parse::<Pubkey>().is_err());
    }

    #[test]
    fn program_addresses_are_off_curve_and_deterministic() {
        let program: Pubkey = DEFAULT_ESCROW_PROGRAM_ID.parse().unwrap();
        let (a, bump_a) = Pubkey::find_program_address(&[TREASURY_SEED], &program);
        let (b, bump_b) = Pubkey::find_program_address(&[TREASURY_SEED], &program);
        assert_eq!(a, b);
        assert_eq!(bump_a, bump_b);
        assert!(!a.is_on_curve());
    }

    #[test]
    fn player_state_addresses_differ_per_wallet() {
        let program: Pubkey = DEFAULT_ESCROW_PROGRAM_ID.parse().unwrap();
        let w1 = Pubkey::new([1u8; 32]);
        let w2 = Pubkey::new([2u8; 32]);
        let (a, _) = Pubkey::find_program_address(&[PLAYER_STATE_SEED, w1.as_ref()], &program);
        let (b, _) = Pubkey::find_program_address(&[PLAYER_STATE_SEED, w2.as_ref()], &program);
        assert_ne!(a, b);
    }

    #[test]
    fn associated_token_address_is_stable() {
        let owner = Pubkey::new([7u8; 32]);
        let mint: Pubkey = crate::constants::DEFAULT_WEAVE_MINT.parse().unwrap();
        let a = Pubkey::associated_token_address(&owner, &mint);
        let b = Pubkey::associated_token_address(&owner, &mint);
        assert_eq!(a, b);
        assert!(!a.is_on_curve());
    }
}
