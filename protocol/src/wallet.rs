//! # Wallet Signing Seam
//!
//! Secret derivation needs exactly one thing from the outside world: a
//! deterministic signature over a domain-separated message. This module
//! defines that seam as the [`WalletSigner`] trait and ships an Ed25519
//! implementation for local keys and tests.
//!
//! ## Why Ed25519?
//!
//! The whole derivation scheme rests on signatures being deterministic:
//! same key + same message = same signature, on any device (RFC 8032).
//! ECDSA with random nonces would torch the "reproducible on any device
//! holding the key" guarantee. Wallets that cannot produce deterministic
//! signatures cannot back a Laurel identity.
//!
//! Interactive wallets (browser extensions, hardware devices) implement
//! [`WalletSigner`] themselves; `sign_message` is async precisely because
//! a real wallet prompts a human and may wait arbitrarily long — or come
//! back with a refusal.

use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey, SECRET_KEY_LENGTH};
use rand::rngs::OsRng;
use thiserror::Error;

/// Errors a wallet can report when asked to sign.
///
/// The two variants are deliberately separate: a caller shows "connect your
/// wallet" for one and "you declined — try again?" for the other. Neither
/// corrupts any cache state.
#[derive(Debug, Error)]
pub enum WalletError {
    /// The wallet has no signing capability right now.
    #[error("wallet unavailable: {0}")]
    Unavailable(String),

    /// The holder looked at the prompt and said no.
    #[error("signature request declined")]
    Rejected,
}

/// The signing capability the secret deriver depends on.
///
/// Implementations MUST produce deterministic signatures (same message in,
/// same bytes out) or derived secrets will differ between sessions and
/// every previously published commitment becomes unopenable.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// The wallet's public key, if one is loaded. `None` means the wallet
    /// cannot currently sign and derivation will fail with
    /// [`WalletError::Unavailable`].
    fn public_key(&self) -> Option<[u8; 32]>;

    /// Request a signature over `message`. This is a suspension point: an
    /// interactive wallet will block here on user approval, unbounded.
    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, WalletError>;
}

/// A local Ed25519 wallet holding its signing key in memory.
///
/// Used directly in tests and by the CLI; production holders typically sit
/// behind an interactive wallet that implements [`WalletSigner`] over IPC.
/// The signing key is zeroized on drop by `ed25519-dalek`.
pub struct Ed25519Wallet {
    signing_key: SigningKey,
}

impl Ed25519Wallet {
    /// Generate a fresh wallet from the OS cryptographic RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Construct a wallet deterministically from a 32-byte seed. In
    /// Ed25519 the seed *is* the secret key, so weak seed = weak wallet.
    pub fn from_seed(seed: &[u8; SECRET_KEY_LENGTH]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Load a wallet from a hex-encoded 32-byte secret key.
    pub fn from_hex(hex_str: &str) -> Result<Self, WalletError> {
        let bytes = hex::decode(hex_str)
            .map_err(|_| WalletError::Unavailable("secret key is not valid hex".into()))?;
        let seed: [u8; SECRET_KEY_LENGTH] = bytes
            .try_into()
            .map_err(|_| WalletError::Unavailable("secret key must be 32 bytes".into()))?;
        Ok(Self::from_seed(&seed))
    }

    /// The verifying key bytes — the wallet's public identity.
    pub fn verifying_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }
}

#[async_trait]
impl WalletSigner for Ed25519Wallet {
    fn public_key(&self) -> Option<[u8; 32]> {
        Some(self.verifying_key_bytes())
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, WalletError> {
        // RFC 8032 signing: no nonce, no RNG, no prompt for a local key.
        Ok(self.signing_key.sign(message).to_vec())
    }
}
