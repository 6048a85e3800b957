//! Error taxonomy for the Laurel proof pipeline.
//!
//! Every fallible operation in this crate returns a [`ZkError`]. The variants
//! map one-to-one onto the failure modes a caller can meaningfully react to:
//! a rejected signature wants a "you declined" message, a transient wallet
//! fault wants "try again", an artifact fetch failure is retryable with no
//! cleanup because caches are only ever populated on success.
//!
//! Nothing here is fatal to the host process. All failures are scoped to a
//! single operation and leave shared state (signature cache, artifact cache)
//! exactly as it was.

use thiserror::Error;

use crate::wallet::WalletError;

/// Errors that can occur across the Laurel proof pipeline.
#[derive(Debug, Error)]
pub enum ZkError {
    /// The wallet has no signing capability (not connected, no key loaded).
    /// Distinct from [`ZkError::SignatureRejected`] so callers can present
    /// "connect a wallet" instead of "you declined".
    #[error("wallet unavailable: {0}")]
    WalletUnavailable(String),

    /// The holder declined the signature request. The signature cache is
    /// untouched; the caller may simply ask again.
    #[error("signature request declined by the holder")]
    SignatureRejected,

    /// A circuit artifact (proving or verification key) could not be
    /// fetched or decoded. Retryable without side effects — the artifact
    /// cache is populated atomically on success only.
    #[error("artifact fetch failed: {0}")]
    ArtifactFetchFailed(String),

    /// Groth16 proving failed for one achievement in a batch. Proofs
    /// already completed for earlier achievements are preserved in the
    /// returned pack.
    #[error("proof generation failed for \"{achievement}\": {reason}")]
    ProofGenerationFailed {
        /// The achievement code whose proof failed.
        achievement: String,
        /// Human-readable failure description.
        reason: String,
    },

    /// The verification machinery itself broke (malformed verification key,
    /// backend fault). An *invalid proof* is not an error — the verifier
    /// returns `Ok(false)` for those.
    #[error("verification failed: {0}")]
    VerificationFailed(String),

    /// An identifier or wire value could not be encoded into the scalar
    /// field (non-decimal string, value >= field order).
    #[error("input encoding failed: {0}")]
    InputEncodingFailed(String),
}

impl From<WalletError> for ZkError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::Unavailable(reason) => ZkError::WalletUnavailable(reason),
            WalletError::Rejected => ZkError::SignatureRejected,
        }
    }
}
