//! # Protocol Configuration & Constants
//!
//! Every magic number in Laurel lives here. The values below are part of the
//! cross-implementation contract: the issuing side, the holder's prover, and
//! any verifier must agree on all of them, or commitments computed on one
//! side will never match proofs generated on the other.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Domain Separation
// ---------------------------------------------------------------------------

/// Domain tag mixed into everything the wallet signs and everything HKDF
/// derives. A signature produced for Laurel secret derivation can never be
/// replayed as a transaction signature (or vice versa), because no other
/// protocol signs messages with this prefix.
pub const DOMAIN_TAG: &str = "Laurel:ZK:v1";

/// The message a wallet is asked to sign for credential `id` is
/// `"<DOMAIN_TAG>:<id>"`. Kept as a function so the format lives in exactly
/// one place.
pub fn signing_message(credential_id: &str) -> String {
    format!("{DOMAIN_TAG}:{credential_id}")
}

/// HKDF `info` label for the student secret output.
pub const HKDF_INFO_STUDENT_SECRET: &[u8] = b"student_secret";

/// HKDF `info` label for the salt output. Note: this is the *protocol's*
/// salt (a circuit witness), not the HKDF salt parameter — the HKDF salt is
/// [`DOMAIN_TAG`]. The two must never be conflated.
pub const HKDF_INFO_SALT: &[u8] = b"salt";

// ---------------------------------------------------------------------------
// Circuit Identity & Artifacts
// ---------------------------------------------------------------------------

/// Fixed identifier of the membership circuit version. Bump this when the
/// constraint system changes — old proving keys are useless for a new
/// circuit and must never be mixed.
pub const CIRCUIT_ID: &str = "ach_member_v1";

/// File name of the Groth16 proving key artifact (compressed ark-serialize).
pub const PROVING_KEY_FILE: &str = "ach_member_v1.pk";

/// File name of the Groth16 verification key artifact.
pub const VERIFYING_KEY_FILE: &str = "ach_member_v1.vk";

// ---------------------------------------------------------------------------
// Signature Cache
// ---------------------------------------------------------------------------

/// How long a cached wallet signature stays usable. Within this window the
/// holder is not re-prompted to sign. 30 minutes matches a typical
/// interactive session; the signature never leaves the process either way.
pub const SIGNATURE_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

// ---------------------------------------------------------------------------
// Poseidon Parameters
// ---------------------------------------------------------------------------
//
// The commitment is a single sponge call over four field elements, so the
// rate is 4 and the capacity the standard 1. Round numbers follow the
// Poseidon paper's recommendation for alpha = 5 at 128-bit security on a
// ~254-bit field.

/// Sponge rate — the commitment absorbs exactly four inputs.
pub const POSEIDON_RATE: usize = 4;

/// Sponge capacity.
pub const POSEIDON_CAPACITY: usize = 1;

/// S-box exponent (x^5, the standard choice for BN254).
pub const POSEIDON_ALPHA: u64 = 5;

/// Number of full rounds.
pub const POSEIDON_FULL_ROUNDS: u64 = 8;

/// Number of partial rounds for width 5 at 128-bit security.
pub const POSEIDON_PARTIAL_ROUNDS: u64 = 60;

// ---------------------------------------------------------------------------
// Proof Wire Format
// ---------------------------------------------------------------------------

/// Number of public signals the circuit discloses, in order:
/// `[commitment, credential_hash, achievement_hash]`.
pub const PUBLIC_SIGNAL_COUNT: usize = 3;

/// Protocol tag carried in the proof exchange format.
pub const PROOF_PROTOCOL: &str = "groth16";

/// Curve tag carried in the proof exchange format. "bn128" is the legacy
/// name for BN254 and is what the wider Groth16 tooling ecosystem expects.
pub const PROOF_CURVE: &str = "bn128";

// ---------------------------------------------------------------------------
// Prover Policy
// ---------------------------------------------------------------------------

/// Default number of proofs generated concurrently within one pack.
///
/// Proving-key material is large; running proofs one at a time bounds peak
/// memory. Hosts with RAM to spare can raise this via
/// [`crate::prover::ProverConfig`].
pub const DEFAULT_MAX_CONCURRENT_PROOFS: usize = 1;

/// Progress percentage anchors for the proof generation stage machine.
/// Loading the proving key is the long pole before proving starts, so it
/// owns the first half of the bar; the per-achievement proving loop owns
/// the rest.
pub const PERCENT_LOADING_ARTIFACTS: u8 = 10;
pub const PERCENT_PROVING_START: u8 = 50;
pub const PERCENT_COMPLETE: u8 = 100;
