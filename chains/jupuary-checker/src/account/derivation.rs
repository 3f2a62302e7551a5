//! Mnemonic to ed25519 keypair derivation (BIP-39 seed + SLIP-0010).
//!
//! Path: m/44'/501'/0'/0'. Every segment is hardened; ed25519 has no
//! non-hardened derivation.

use bip39::{Language, Mnemonic};
use ed25519_dalek::SigningKey;
use hmac::{Hmac, Mac};
use sha2::Sha512;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

type HmacSha512 = Hmac<Sha512>;

pub const HARDENED_OFFSET: u32 = 0x8000_0000;

/// m/44'/501'/0'/0'
pub const DERIVATION_PATH: [u32; 4] = [
    HARDENED_OFFSET + 44,
    HARDENED_OFFSET + 501,
    HARDENED_OFFSET,
    HARDENED_OFFSET,
];

const SEED_SALT: &[u8] = b"mnemonic";
const SEED_ROUNDS: u32 = 2048;
const MASTER_HMAC_KEY: &[u8] = b"ed25519 seed";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DerivationError {
    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("segment {0:#x} is not hardened")]
    NonHardenedSegment(u32),

    #[error("HMAC initialization failed: {0}")]
    Hmac(String),
}

/// Checks word list membership and the checksum; no hashing happens here.
pub fn validate_mnemonic(phrase: &str) -> Result<(), DerivationError> {
    Mnemonic::parse_in_normalized(Language::English, phrase)
        .map(|_| ())
        .map_err(|e| DerivationError::InvalidMnemonic(e.to_string()))
}

/// PBKDF2-HMAC-SHA512 over the phrase exactly as given, salt "mnemonic",
/// 2048 rounds, empty passphrase.
pub fn mnemonic_to_seed(phrase: &str) -> Zeroizing<[u8; 64]> {
    let mut seed = Zeroizing::new([0u8; 64]);
    pbkdf2::pbkdf2_hmac::<Sha512>(phrase.as_bytes(), SEED_SALT, SEED_ROUNDS, &mut seed[..]);
    seed
}

/// A private key together with its chain code.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ExtendedKey {
    key: [u8; 32],
    chain_code: [u8; 32],
}

impl ExtendedKey {
    pub fn master(seed: &[u8]) -> Result<Self, DerivationError> {
        Self::from_hmac(MASTER_HMAC_KEY, &[seed])
    }

    /// SLIP-0010 child: HMAC-SHA512(chain_code, 0x00 || key || index).
    pub fn derive_hardened(&self, index: u32) -> Result<Self, DerivationError> {
        if index < HARDENED_OFFSET {
            return Err(DerivationError::NonHardenedSegment(index));
        }
        // Hardened indices have the top bit set, so the minimal big-endian
        // encoding is always the full four bytes.
        Self::from_hmac(&self.chain_code, &[&[0u8], &self.key, &index.to_be_bytes()])
    }

    pub fn derive_path(&self, path: &[u32]) -> Result<Self, DerivationError> {
        path.iter()
            .try_fold(self.clone(), |current, &index| current.derive_hardened(index))
    }

    pub fn key(&self) -> &[u8; 32] {
        &self.key
    }

    pub fn chain_code(&self) -> &[u8; 32] {
        &self.chain_code
    }

    fn from_hmac(hmac_key: &[u8], parts: &[&[u8]]) -> Result<Self, DerivationError> {
        let mut mac = HmacSha512::new_from_slice(hmac_key)
            .map_err(|e| DerivationError::Hmac(e.to_string()))?;
        for part in parts {
            mac.update(part);
        }
        let mut digest = Zeroizing::new([0u8; 64]);
        digest.copy_from_slice(&mac.finalize().into_bytes());

        let mut out = Self {
            key: [0u8; 32],
            chain_code: [0u8; 32],
        };
        out.key.copy_from_slice(&digest[..32]);
        out.chain_code.copy_from_slice(&digest[32..]);
        Ok(out)
    }
}

impl std::fmt::Debug for ExtendedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtendedKey")
            .field("key", &"***REDACTED***")
            .field("chain_code", &"***REDACTED***")
            .finish()
    }
}

/// Full pipeline: validate, stretch, derive along [`DERIVATION_PATH`] and
/// expand the final 32 bytes into an ed25519 keypair.
pub fn derive_signing_key(phrase: &str) -> Result<SigningKey, DerivationError> {
    validate_mnemonic(phrase)?;

    let seed = mnemonic_to_seed(phrase);
    let leaf = ExtendedKey::master(&seed[..])?.derive_path(&DERIVATION_PATH)?;

    Ok(SigningKey::from_bytes(leaf.key()))
}
