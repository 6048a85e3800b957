//! # Proof Verification
//!
//! Verification answers two separate questions, and keeps them separate:
//!
//! 1. **Is the proof cryptographically sound?** Groth16 pairing check
//!    against the circuit's verification key. A sound proof means the
//!    holder knows `(student_secret, salt)` opening the disclosed
//!    commitment for the disclosed credential/achievement hashes — nothing
//!    more, nothing less.
//! 2. **Is the commitment one we actually issued?** A sound proof over a
//!    commitment nobody ever recorded proves knowledge of a self-made
//!    secret, which is worthless. [`ProofVerifier::verify_claim`] checks
//!    the disclosed commitment against a [`CommitmentRegistry`].
//!
//! Malformed input (wrong shapes, off-curve points, non-canonical
//! decimals) is an *error*, not a `false` — a verifier that silently maps
//! garbage to "invalid proof" hides integration bugs. Only a well-formed
//! proof that fails the pairing check comes back `Ok(false)`.

use std::sync::Arc;

use ark_bn254::{Bn254, Fr};
use ark_groth16::Groth16;
use ark_snark::SNARK;
use async_trait::async_trait;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::artifacts::{ArtifactCache, ArtifactSource};
use crate::commitment::Commitment;
use crate::config::{PROOF_CURVE, PROOF_PROTOCOL, PUBLIC_SIGNAL_COUNT};
use crate::encoding::{decimal_to_field, field_to_decimal, is_canonical_decimal};
use crate::error::ZkError;
use crate::prover::{json_to_proof, GeneratedProof};

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Lookup of issued commitments, keyed by the public hash pair. Backed by
/// whatever the deployment records issuance in; the in-memory variant below
/// covers tests and single-process tools.
#[async_trait]
pub trait CommitmentRegistry: Send + Sync {
    /// The recorded commitment (decimal string) for this hash pair, if one
    /// was ever issued.
    async fn find(&self, credential_hash: &str, achievement_hash: &str) -> Option<String>;
}

/// A process-local registry.
#[derive(Default)]
pub struct InMemoryRegistry {
    entries: DashMap<(String, String), String>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one issued commitment.
    pub fn record(&self, commitment: &Commitment) {
        self.entries.insert(
            (
                field_to_decimal(&commitment.credential_hash),
                field_to_decimal(&commitment.achievement_hash),
            ),
            field_to_decimal(&commitment.commitment),
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CommitmentRegistry for InMemoryRegistry {
    async fn find(&self, credential_hash: &str, achievement_hash: &str) -> Option<String> {
        self.entries
            .get(&(credential_hash.to_string(), achievement_hash.to_string()))
            .map(|entry| entry.clone())
    }
}

// ---------------------------------------------------------------------------
// Structural validation
// ---------------------------------------------------------------------------

/// Shape-check a proof before any cryptography: protocol/curve tags, point
/// arities, signal count, and the commitment/signal duplication invariant.
pub fn validate_structure(proof: &GeneratedProof) -> Result<(), ZkError> {
    let p = &proof.proof;
    if p.protocol != PROOF_PROTOCOL {
        return Err(ZkError::VerificationFailed(format!(
            "unsupported protocol {:?}",
            p.protocol
        )));
    }
    if p.curve != PROOF_CURVE {
        return Err(ZkError::VerificationFailed(format!(
            "unsupported curve {:?}",
            p.curve
        )));
    }
    if p.pi_a.len() != 3 || p.pi_c.len() != 3 {
        return Err(ZkError::VerificationFailed(
            "malformed G1 point in proof".into(),
        ));
    }
    if p.pi_b.len() != 3 || p.pi_b.iter().any(|pair| pair.len() != 2) {
        return Err(ZkError::VerificationFailed(
            "malformed G2 point in proof".into(),
        ));
    }
    if proof.public_signals.len() != PUBLIC_SIGNAL_COUNT {
        return Err(ZkError::VerificationFailed(format!(
            "expected {} public signals, got {}",
            PUBLIC_SIGNAL_COUNT,
            proof.public_signals.len()
        )));
    }
    if let Some(bad) = proof
        .public_signals
        .iter()
        .find(|s| !is_canonical_decimal(s))
    {
        return Err(ZkError::VerificationFailed(format!(
            "public signal is not a canonical field element: {bad:?}"
        )));
    }
    if proof.commitment != proof.public_signals[0] {
        return Err(ZkError::VerificationFailed(
            "disclosed commitment does not match publicSignals[0]".into(),
        ));
    }
    Ok(())
}

fn parse_signals(proof: &GeneratedProof) -> Result<Vec<Fr>, ZkError> {
    proof
        .public_signals
        .iter()
        .map(|s| {
            decimal_to_field(s).map_err(|e| {
                ZkError::VerificationFailed(format!("malformed public signal: {e}"))
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Verifier
// ---------------------------------------------------------------------------

/// What a full claim verification found.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationOutcome {
    /// The Groth16 pairing check passed.
    pub proof_valid: bool,
    /// The disclosed commitment matches an issuance record. `None` when the
    /// proof itself was already invalid (the registry is not consulted).
    pub commitment_recognized: Option<bool>,
    /// SHA-256 of the serialized proof, hex — a stable handle for audit
    /// logs and replay bookkeeping.
    pub proof_hash: String,
}

impl VerificationOutcome {
    /// Valid proof over a recognized commitment.
    pub fn accepted(&self) -> bool {
        self.proof_valid && self.commitment_recognized == Some(true)
    }
}

/// Verifies membership proofs. Shares the [`ArtifactCache`] with the
/// prover, so a process doing both loads the keys once.
pub struct ProofVerifier {
    cache: Arc<ArtifactCache>,
}

impl ProofVerifier {
    pub fn new(cache: Arc<ArtifactCache>) -> Self {
        Self { cache }
    }

    /// Cryptographic verification only: structural checks, point decoding,
    /// then the Groth16 pairing check. `Ok(false)` means a well-formed
    /// proof that does not verify.
    pub async fn verify(
        &self,
        source: &dyn ArtifactSource,
        proof: &GeneratedProof,
    ) -> Result<bool, ZkError> {
        validate_structure(proof)?;

        let parsed = json_to_proof(&proof.proof)
            .map_err(|e| ZkError::VerificationFailed(format!("malformed proof points: {e}")))?;
        let signals = parse_signals(proof)?;

        let artifacts = self.cache.get_or_load(source).await?;
        let valid = Groth16::<Bn254>::verify(&artifacts.verifying_key, &signals, &parsed)
            .map_err(|e| ZkError::VerificationFailed(e.to_string()))?;

        if valid {
            debug!(achievement = %proof.achievement_code, "proof verified");
        } else {
            warn!(achievement = %proof.achievement_code, "pairing check rejected proof");
        }
        Ok(valid)
    }

    /// Full claim verification: the pairing check plus the registry lookup
    /// that ties the disclosed commitment back to an actual issuance.
    pub async fn verify_claim(
        &self,
        source: &dyn ArtifactSource,
        registry: &dyn CommitmentRegistry,
        proof: &GeneratedProof,
    ) -> Result<VerificationOutcome, ZkError> {
        let proof_hash = proof_hash(proof)?;
        let proof_valid = self.verify(source, proof).await?;

        let commitment_recognized = if proof_valid {
            let recorded = registry
                .find(&proof.public_signals[1], &proof.public_signals[2])
                .await;
            let recognized = recorded.as_deref() == Some(proof.commitment.as_str());
            if !recognized {
                warn!(
                    achievement = %proof.achievement_code,
                    "valid proof over unrecognized commitment"
                );
            }
            Some(recognized)
        } else {
            None
        };

        Ok(VerificationOutcome {
            proof_valid,
            commitment_recognized,
            proof_hash,
        })
    }
}

/// SHA-256 over the serialized proof, hex-encoded.
pub fn proof_hash(proof: &GeneratedProof) -> Result<String, ZkError> {
    let bytes = serde_json::to_vec(proof)
        .map_err(|e| ZkError::VerificationFailed(format!("proof not serializable: {e}")))?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitment::CommitmentEngine;
    use crate::prover::Groth16ProofJson;
    use crate::secrets::derive_from_signature;

    fn dummy_proof() -> GeneratedProof {
        // Structurally well-formed; cryptographically meaningless. The
        // structural layer never looks at curve points.
        GeneratedProof {
            achievement_code: "dean-list-2023".into(),
            proof: Groth16ProofJson {
                pi_a: vec!["1".into(), "2".into(), "1".into()],
                pi_b: vec![
                    vec!["1".into(), "2".into()],
                    vec!["3".into(), "4".into()],
                    vec!["1".into(), "0".into()],
                ],
                pi_c: vec!["5".into(), "6".into(), "1".into()],
                protocol: "groth16".into(),
                curve: "bn128".into(),
            },
            public_signals: vec!["7".into(), "8".into(), "9".into()],
            commitment: "7".into(),
        }
    }

    #[test]
    fn structure_accepts_well_formed() {
        assert!(validate_structure(&dummy_proof()).is_ok());
    }

    #[test]
    fn structure_rejects_wrong_protocol() {
        let mut proof = dummy_proof();
        proof.proof.protocol = "plonk".into();
        assert!(matches!(
            validate_structure(&proof),
            Err(ZkError::VerificationFailed(_))
        ));
    }

    #[test]
    fn structure_rejects_wrong_curve() {
        let mut proof = dummy_proof();
        proof.proof.curve = "bls12-381".into();
        assert!(validate_structure(&proof).is_err());
    }

    #[test]
    fn structure_rejects_truncated_points() {
        let mut proof = dummy_proof();
        proof.proof.pi_a.pop();
        assert!(validate_structure(&proof).is_err());

        let mut proof = dummy_proof();
        proof.proof.pi_b[1].pop();
        assert!(validate_structure(&proof).is_err());
    }

    #[test]
    fn structure_rejects_wrong_signal_count() {
        let mut proof = dummy_proof();
        proof.public_signals.push("10".into());
        assert!(validate_structure(&proof).is_err());
    }

    #[test]
    fn structure_rejects_commitment_signal_mismatch() {
        let mut proof = dummy_proof();
        proof.commitment = "12345".into();
        assert!(validate_structure(&proof).is_err());
    }

    #[test]
    fn signals_reject_non_decimal() {
        let mut proof = dummy_proof();
        proof.public_signals[1] = "0xdeadbeef".into();
        assert!(parse_signals(&proof).is_err());
    }

    #[test]
    fn proof_hash_is_stable_and_input_sensitive() {
        let proof = dummy_proof();
        let a = proof_hash(&proof).unwrap();
        let b = proof_hash(&proof).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let mut other = dummy_proof();
        other.achievement_code = "honor-roll".into();
        assert_ne!(a, proof_hash(&other).unwrap());
    }

    #[tokio::test]
    async fn registry_records_and_finds() {
        let engine = CommitmentEngine::new();
        let secrets = derive_from_signature(&[0x33u8; 64]);
        let commitment = engine.commit("cred-001", "dean-list-2023", &secrets);

        let registry = InMemoryRegistry::new();
        assert!(registry.is_empty());
        registry.record(&commitment);
        assert_eq!(registry.len(), 1);

        let found = registry
            .find(
                &field_to_decimal(&commitment.credential_hash),
                &field_to_decimal(&commitment.achievement_hash),
            )
            .await;
        assert_eq!(found, Some(field_to_decimal(&commitment.commitment)));

        let missing = registry.find("1", "2").await;
        assert!(missing.is_none());
    }
}
