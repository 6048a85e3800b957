//! # Laurel Protocol — Core Library
//!
//! Laurel lets a credential holder prove, to any verifier, that they hold a
//! specific named achievement bound to a specific credential — without
//! revealing a persistent secret, without revealing which other achievements
//! they hold, and without any party ever storing that secret.
//!
//! The pipeline is three layers deep:
//!
//! 1. **Deterministic secret derivation** — a single Ed25519 wallet signature
//!    over a domain-separated message is stretched through HKDF-SHA256 into a
//!    `(student_secret, salt)` pair. Same wallet, same credential, same
//!    secrets — on any device, forever, with nothing written to disk.
//! 2. **Commitment** — `C = Poseidon(credential_hash, student_secret, salt,
//!    achievement_hash)` over the BN254 scalar field. The commitment is the
//!    only artifact the issuing side ever records.
//! 3. **Groth16 proof** — the holder proves knowledge of `(student_secret,
//!    salt)` opening a disclosed commitment, and a verifier checks the proof
//!    offline against a small verification key plus the issuance-time record.
//!
//! ## Module map
//!
//! ```text
//! config.rs      — protocol constants (domain tag, TTLs, Poseidon shape)
//! error.rs       — the ZkError taxonomy
//! encoding.rs    — identifier → field element, decimal wire codec
//! wallet.rs      — WalletSigner seam + Ed25519 implementation
//! secrets.rs     — signature cache + HKDF secret derivation
//! commitment.rs  — Poseidon H4 commitment engine
//! circuit.rs     — the membership R1CS circuit
//! artifacts.rs   — proving/verification key loading, single-flight cache
//! prover.rs      — batch proof generation with progress events
//! verifier.rs    — proof verification + registry binding check
//! ```
//!
//! ## Design stance
//!
//! - No module-level mutable state. Caches are constructed explicitly and
//!   injected, so tests never leak state into each other.
//! - Progress is a channel of stage-tagged events, not a callback — the
//!   prover knows nothing about UIs.
//! - Verification never raises on a bad proof. `Ok(false)` means "no",
//!   `Err` means "the machinery itself broke".

pub mod artifacts;
pub mod circuit;
pub mod commitment;
pub mod config;
pub mod encoding;
pub mod error;
pub mod prover;
pub mod secrets;
pub mod verifier;
pub mod wallet;

// Re-export the types people actually need so they don't have to memorize
// our module hierarchy.
pub use artifacts::{ArtifactCache, ArtifactSource, CircuitArtifacts, FsArtifactSource};
pub use commitment::{Commitment, CommitmentEngine};
pub use encoding::{decimal_to_field, encode, field_to_decimal};
pub use error::ZkError;
pub use prover::{
    BatchFailure, GeneratedProof, Groth16ProofJson, ProofGenerator, ProofPack, ProgressEvent,
    ProverConfig, Stage,
};
pub use secrets::{DerivedSecrets, SecretDeriver, SignatureCache};
pub use verifier::{
    CommitmentRegistry, InMemoryRegistry, ProofVerifier, VerificationOutcome,
};
pub use wallet::{Ed25519Wallet, WalletError, WalletSigner};
