//! # Poseidon Commitment Engine
//!
//! One commitment binds a holder to one `(credential, achievement)` pair:
//!
//! ```text
//! C = Poseidon(credential_hash, student_secret, salt, achievement_hash)
//! ```
//!
//! Poseidon — not SHA-256 — because the same computation has to run *inside*
//! the Groth16 circuit, where an arithmetic-friendly sponge costs a few
//! hundred constraints and a bit-oriented hash costs tens of thousands.
//!
//! The commitment is **binding** (changing any of the four inputs changes
//! `C` with overwhelming probability, by the sponge's collision resistance)
//! and **hiding** (without `student_secret` and `salt`, `C` reveals nothing
//! about whose achievement it anchors — the two identifier hashes are
//! public anyway).
//!
//! The engine owns its [`PoseidonConfig`] and is constructed explicitly at
//! startup, then injected wherever hashing happens — the prover's circuit
//! must bake in the *same* parameter set, so a lazily-materialized global
//! would be an invitation to mismatched universes.

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::poseidon::{find_poseidon_ark_and_mds, PoseidonConfig, PoseidonSponge};
use ark_crypto_primitives::sponge::{CryptographicSponge, FieldBasedCryptographicSponge};
use ark_ff::PrimeField;
use serde::{Deserialize, Serialize};

use crate::config::{
    POSEIDON_ALPHA, POSEIDON_CAPACITY, POSEIDON_FULL_ROUNDS, POSEIDON_PARTIAL_ROUNDS, POSEIDON_RATE,
};
use crate::encoding::encode;
use crate::secrets::DerivedSecrets;

/// The public record of one issued achievement.
///
/// `commitment` is the anchor the issuing side records; the two hashes are
/// disclosed alongside it and are safe to publish (they are hashes of
/// identifiers that are public to the issuer anyway). Serializes to the
/// wire as camelCase decimal strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commitment {
    /// `Poseidon(credential_hash, student_secret, salt, achievement_hash)`.
    #[serde(with = "crate::encoding::decimal")]
    pub commitment: Fr,
    /// `encode(credential_id)`.
    #[serde(with = "crate::encoding::decimal")]
    pub credential_hash: Fr,
    /// `encode(achievement_code)`.
    #[serde(with = "crate::encoding::decimal")]
    pub achievement_hash: Fr,
}

/// Build the protocol's Poseidon parameter set for BN254.
///
/// Deterministic — the ark and MDS constants come from the Grain LFSR
/// construction seeded by the field size and round numbers, so every party
/// that agrees on [`crate::config`] derives the identical configuration.
pub fn poseidon_config() -> PoseidonConfig<Fr> {
    let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(
        Fr::MODULUS_BIT_SIZE as u64,
        POSEIDON_RATE,
        POSEIDON_FULL_ROUNDS,
        POSEIDON_PARTIAL_ROUNDS,
        0,
    );

    PoseidonConfig {
        full_rounds: POSEIDON_FULL_ROUNDS as usize,
        partial_rounds: POSEIDON_PARTIAL_ROUNDS as usize,
        alpha: POSEIDON_ALPHA,
        ark,
        mds,
        rate: POSEIDON_RATE,
        capacity: POSEIDON_CAPACITY,
    }
}

/// Computes commitments. One instance per process; cheap to clone the
/// config out of, expensive to rebuild (the Grain LFSR walk is not free).
pub struct CommitmentEngine {
    config: PoseidonConfig<Fr>,
}

impl CommitmentEngine {
    /// Construct the engine with the protocol parameter set.
    pub fn new() -> Self {
        Self {
            config: poseidon_config(),
        }
    }

    /// The Poseidon parameters, for baking into the proving circuit. The
    /// circuit and the engine MUST share one parameter set or no honestly
    /// generated proof will ever verify.
    pub fn poseidon_config(&self) -> &PoseidonConfig<Fr> {
        &self.config
    }

    /// Compute the commitment for one `(credential, achievement)` pair.
    pub fn commit(
        &self,
        credential_id: &str,
        achievement_code: &str,
        secrets: &DerivedSecrets,
    ) -> Commitment {
        let credential_hash = encode(credential_id);
        let achievement_hash = encode(achievement_code);
        self.commit_hashed(credential_hash, achievement_hash, secrets)
    }

    /// Commitment from pre-encoded hashes. The batch path uses this to
    /// encode the credential id exactly once.
    pub fn commit_hashed(
        &self,
        credential_hash: Fr,
        achievement_hash: Fr,
        secrets: &DerivedSecrets,
    ) -> Commitment {
        let commitment = self.h4([
            credential_hash,
            secrets.student_secret,
            secrets.salt,
            achievement_hash,
        ]);

        Commitment {
            commitment,
            credential_hash,
            achievement_hash,
        }
    }

    /// One commitment per achievement code for a fixed credential, reusing
    /// the derived secrets and the encoded credential hash.
    pub fn commit_batch(
        &self,
        credential_id: &str,
        achievement_codes: &[String],
        secrets: &DerivedSecrets,
    ) -> Vec<(String, Commitment)> {
        let credential_hash = encode(credential_id);
        achievement_codes
            .iter()
            .map(|code| {
                let commitment =
                    self.commit_hashed(credential_hash, encode(code), secrets);
                (code.clone(), commitment)
            })
            .collect()
    }

    /// The H4 sponge: absorb four field elements, squeeze one.
    fn h4(&self, inputs: [Fr; 4]) -> Fr {
        let mut sponge = PoseidonSponge::new(&self.config);
        sponge.absorb(&inputs.to_vec());
        sponge.squeeze_native_field_elements(1)[0]
    }
}

impl Default for CommitmentEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::derive_from_signature;
    use ark_ff::UniformRand;
    use ark_std::rand::{rngs::StdRng, SeedableRng};

    fn test_secrets() -> DerivedSecrets {
        derive_from_signature(&[0x5au8; 64])
    }

    #[test]
    fn commitment_deterministic() {
        let engine = CommitmentEngine::new();
        let secrets = test_secrets();

        let a = engine.commit("cred-001", "dean-list-2023", &secrets);
        let b = engine.commit("cred-001", "dean-list-2023", &secrets);
        assert_eq!(a, b);
    }

    #[test]
    fn engines_agree_across_instances() {
        // Parameter derivation is deterministic, so two independently
        // constructed engines compute identical commitments.
        let secrets = test_secrets();
        let a = CommitmentEngine::new().commit("cred-001", "a", &secrets);
        let b = CommitmentEngine::new().commit("cred-001", "a", &secrets);
        assert_eq!(a, b);
    }

    #[test]
    fn each_input_binds() {
        let engine = CommitmentEngine::new();
        let secrets = test_secrets();
        let base = engine.commit("cred-001", "dean-list-2023", &secrets);

        // Credential changes the commitment.
        let other = engine.commit("cred-002", "dean-list-2023", &secrets);
        assert_ne!(base.commitment, other.commitment);

        // Achievement changes the commitment.
        let other = engine.commit("cred-001", "honor-roll", &secrets);
        assert_ne!(base.commitment, other.commitment);

        // Secret changes the commitment.
        let mut perturbed = secrets.clone();
        perturbed.student_secret += Fr::from(1u64);
        let other = engine.commit("cred-001", "dean-list-2023", &perturbed);
        assert_ne!(base.commitment, other.commitment);

        // Salt changes the commitment.
        let mut perturbed = test_secrets();
        perturbed.salt += Fr::from(1u64);
        let other = engine.commit("cred-001", "dean-list-2023", &perturbed);
        assert_ne!(base.commitment, other.commitment);
    }

    #[test]
    fn binding_over_random_perturbations() {
        // Flip a single random input many times; expect zero collisions.
        let engine = CommitmentEngine::new();
        let mut rng = StdRng::seed_from_u64(42);
        let secrets = test_secrets();
        let base = engine.commit("cred-001", "dean-list-2023", &secrets);

        for _ in 0..100 {
            let perturbed = DerivedSecrets {
                student_secret: Fr::rand(&mut rng),
                salt: secrets.salt,
            };
            let other = engine.commit("cred-001", "dean-list-2023", &perturbed);
            assert_ne!(base.commitment, other.commitment);
        }
    }

    #[test]
    fn hashes_match_encoder() {
        let engine = CommitmentEngine::new();
        let c = engine.commit("cred-001", "dean-list-2023", &test_secrets());
        assert_eq!(c.credential_hash, encode("cred-001"));
        assert_eq!(c.achievement_hash, encode("dean-list-2023"));
    }

    #[test]
    fn batch_matches_individual() {
        let engine = CommitmentEngine::new();
        let secrets = test_secrets();
        let codes = vec!["a".to_string(), "b".to_string(), "c".to_string()];

        let batch = engine.commit_batch("cred-001", &codes, &secrets);
        assert_eq!(batch.len(), 3);
        for (code, commitment) in &batch {
            assert_eq!(commitment, &engine.commit("cred-001", code, &secrets));
        }
    }

    #[test]
    fn input_order_matters() {
        // H4 is positional: swapping credential and achievement hashes must
        // not produce the same commitment.
        let engine = CommitmentEngine::new();
        let secrets = test_secrets();
        let forward = engine.commit_hashed(encode("x"), encode("y"), &secrets);
        let swapped = engine.commit_hashed(encode("y"), encode("x"), &secrets);
        assert_ne!(forward.commitment, swapped.commitment);
    }

    #[test]
    fn serde_round_trip_camel_case() {
        let engine = CommitmentEngine::new();
        let c = engine.commit("cred-001", "dean-list-2023", &test_secrets());

        let json = serde_json::to_string(&c).unwrap();
        assert!(json.contains("credentialHash"));
        assert!(json.contains("achievementHash"));

        let restored: Commitment = serde_json::from_str(&json).unwrap();
        assert_eq!(c, restored);
    }
}
