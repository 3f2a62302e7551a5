//! Account identifiers and their resolution.
//!
//! A raw line may be a BIP-39 mnemonic, a base58 64-byte keypair or a bare
//! base58 address. Interpretations are tried in that order and the first
//! that succeeds wins.

pub mod derivation;

use crate::pubkey::Pubkey;
use ed25519_dalek::SigningKey;
use std::fmt;
use thiserror::Error;
use tracing::warn;
use zeroize::Zeroizing;

pub use derivation::{derive_signing_key, DerivationError, ExtendedKey, DERIVATION_PATH};

pub const KEYPAIR_BYTES: usize = 64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("not a mnemonic: {0}")]
    NotAMnemonic(String),

    #[error("not a private key: {0}")]
    NotAKey(String),

    #[error("not an address: {0}")]
    NotAnAddress(String),

    #[error("Not Mnemonic/PKey/Address")]
    AllFailed {
        mnemonic: Box<ResolveError>,
        key: Box<ResolveError>,
        address: Box<ResolveError>,
    },
}

/// Which interpretation produced an [`Account`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountKind {
    Mnemonic,
    PrivateKey,
    Address,
}

/// One resolved identity. Immutable once built.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    address: Pubkey,
    keypair: Option<Zeroizing<[u8; KEYPAIR_BYTES]>>,
    private_key: Option<Zeroizing<String>>,
    mnemonic: Option<Zeroizing<String>>,
}

impl Account {
    pub fn from_mnemonic(phrase: &str) -> Result<Self, ResolveError> {
        let signing_key = derive_signing_key(phrase)
            .map_err(|e| ResolveError::NotAMnemonic(e.to_string()))?;

        let mut account = Self::from_signing_key(&signing_key);
        account.mnemonic = Some(Zeroizing::new(phrase.to_string()));
        Ok(account)
    }

    pub fn from_private_key(encoded: &str) -> Result<Self, ResolveError> {
        let decoded = Zeroizing::new(
            bs58::decode(encoded)
                .into_vec()
                .map_err(|e| ResolveError::NotAKey(e.to_string()))?,
        );
        let bytes: &[u8; KEYPAIR_BYTES] = decoded.as_slice().try_into().map_err(|_| {
            ResolveError::NotAKey(format!(
                "expected {} bytes, got {}",
                KEYPAIR_BYTES,
                decoded.len()
            ))
        })?;

        let signing_key = SigningKey::from_keypair_bytes(bytes)
            .map_err(|e| ResolveError::NotAKey(e.to_string()))?;

        let mut account = Self::from_signing_key(&signing_key);
        // Keep the caller's spelling of the key for output.
        account.private_key = Some(Zeroizing::new(encoded.to_string()));
        Ok(account)
    }

    pub fn from_address(encoded: &str) -> Result<Self, ResolveError> {
        let address: Pubkey = encoded
            .parse()
            .map_err(|e| ResolveError::NotAnAddress(format!("{}", e)))?;

        Ok(Self {
            address,
            keypair: None,
            private_key: None,
            mnemonic: None,
        })
    }

    fn from_signing_key(signing_key: &SigningKey) -> Self {
        let keypair = Zeroizing::new(signing_key.to_keypair_bytes());
        let private_key = Zeroizing::new(bs58::encode(keypair.as_slice()).into_string());

        Self {
            address: Pubkey::new(signing_key.verifying_key().to_bytes()),
            keypair: Some(keypair),
            private_key: Some(private_key),
            mnemonic: None,
        }
    }

    pub fn address(&self) -> &Pubkey {
        &self.address
    }

    pub fn keypair_bytes(&self) -> Option<&[u8; KEYPAIR_BYTES]> {
        self.keypair.as_deref()
    }

    pub fn private_key(&self) -> Option<&str> {
        self.private_key.as_deref().map(String::as_str)
    }

    pub fn mnemonic(&self) -> Option<&str> {
        self.mnemonic.as_deref().map(String::as_str)
    }

    pub fn kind(&self) -> AccountKind {
        match (&self.mnemonic, &self.private_key) {
            (Some(_), _) => AccountKind::Mnemonic,
            (None, Some(_)) => AccountKind::PrivateKey,
            (None, None) => AccountKind::Address,
        }
    }

    /// Mnemonic, else private key, else address.
    pub fn display_label(&self) -> String {
        self.mnemonic()
            .or_else(|| self.private_key())
            .map(str::to_string)
            .unwrap_or_else(|| self.address.to_base58())
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.address)
            .field("kind", &self.kind())
            .field("secret", &"***REDACTED***")
            .finish()
    }
}

/// Tries mnemonic, then private key, then address.
pub fn resolve(raw: &str) -> Result<Account, ResolveError> {
    let mnemonic = match Account::from_mnemonic(raw) {
        Ok(account) => return Ok(account),
        Err(e) => e,
    };
    let key = match Account::from_private_key(raw) {
        Ok(account) => return Ok(account),
        Err(e) => e,
    };
    let address = match Account::from_address(raw) {
        Ok(account) => return Ok(account),
        Err(e) => e,
    };

    Err(ResolveError::AllFailed {
        mnemonic: Box::new(mnemonic),
        key: Box::new(key),
        address: Box::new(address),
    })
}

/// Resolves every line, logging and skipping the ones that match nothing.
pub fn resolve_all<S: AsRef<str>>(lines: &[S]) -> Vec<Account> {
    lines
        .iter()
        .filter_map(|line| {
            let line = line.as_ref();
            match resolve(line) {
                Ok(account) => Some(account),
                Err(e) => {
                    warn!("{} | {}", line, e);
                    None
                }
            }
        })
        .collect()
}
