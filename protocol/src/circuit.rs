//! # Achievement Membership R1CS Circuit
//!
//! The statement proved by `ach_member_v1`:
//!
//! ```text
//! "I know (student_secret, salt) such that
//!      Poseidon(credential_hash, student_secret, salt, achievement_hash)
//!          == commitment"
//! ```
//!
//! ## Public inputs (in order)
//!
//! | index | value              |
//! |-------|--------------------|
//! | 0     | `commitment`       |
//! | 1     | `credential_hash`  |
//! | 2     | `achievement_hash` |
//!
//! The ordering is load-bearing twice over: Groth16 maps the first
//! `new_input` allocation to `public_inputs[0]`, and the proof exchange
//! format serializes `publicSignals` in this same order so verifiers can
//! compare positionally against the issuance record.
//!
//! ## Constraint cost
//!
//! One Poseidon permutation at width 5 (rate 4, capacity 1) with 8 full and
//! 60 partial rounds — a few hundred constraints. Proving is milliseconds;
//! the expensive part of the pipeline is loading the proving key, not this.
//!
//! The Poseidon parameters are baked in as circuit constants, so the Groth16
//! keys generated from this circuit are bound to one specific parameter set.
//! Rebuilding the parameters differently silently invalidates every existing
//! key — which is why they derive deterministically from `config.rs`.

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::constraints::CryptographicSpongeVar;
use ark_crypto_primitives::sponge::poseidon::constraints::PoseidonSpongeVar;
use ark_crypto_primitives::sponge::poseidon::PoseidonConfig;
use ark_r1cs_std::{alloc::AllocVar, eq::EqGadget, fields::fp::FpVar};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};

use crate::commitment::Commitment;
use crate::secrets::DerivedSecrets;

/// The Groth16 circuit for one achievement membership claim.
///
/// Witness fields are `Option<_>` so the same struct serves key generation
/// (constraint topology only, no assignment) and proving (fully populated).
#[derive(Clone)]
pub struct MembershipCircuit {
    /// Poseidon parameters, baked in as constants.
    poseidon: PoseidonConfig<Fr>,

    // -- Public inputs ------------------------------------------------------
    /// The disclosed commitment the proof opens.
    pub commitment: Option<Fr>,
    /// `encode(credential_id)`.
    pub credential_hash: Option<Fr>,
    /// `encode(achievement_code)`.
    pub achievement_hash: Option<Fr>,

    // -- Private witness ----------------------------------------------------
    /// The holder's derived secret.
    pub student_secret: Option<Fr>,
    /// The derived blinding salt.
    pub salt: Option<Fr>,
}

impl MembershipCircuit {
    /// Fully-populated circuit for proof generation.
    pub fn new(
        poseidon: PoseidonConfig<Fr>,
        commitment: &Commitment,
        secrets: &DerivedSecrets,
    ) -> Self {
        Self {
            poseidon,
            commitment: Some(commitment.commitment),
            credential_hash: Some(commitment.credential_hash),
            achievement_hash: Some(commitment.achievement_hash),
            student_secret: Some(secrets.student_secret),
            salt: Some(secrets.salt),
        }
    }

    /// Blank circuit for Groth16 key generation — identical constraint
    /// topology, empty witness slots.
    pub fn blank(poseidon: PoseidonConfig<Fr>) -> Self {
        Self {
            poseidon,
            commitment: None,
            credential_hash: None,
            achievement_hash: None,
            student_secret: None,
            salt: None,
        }
    }
}

impl ConstraintSynthesizer<Fr> for MembershipCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        // Public inputs, in the order the verifier will supply them.
        let commitment_var = FpVar::<Fr>::new_input(ark_relations::ns!(cs, "commitment"), || {
            self.commitment.ok_or(SynthesisError::AssignmentMissing)
        })?;

        let credential_var =
            FpVar::<Fr>::new_input(ark_relations::ns!(cs, "credential_hash"), || {
                self.credential_hash
                    .ok_or(SynthesisError::AssignmentMissing)
            })?;

        let achievement_var =
            FpVar::<Fr>::new_input(ark_relations::ns!(cs, "achievement_hash"), || {
                self.achievement_hash
                    .ok_or(SynthesisError::AssignmentMissing)
            })?;

        // Private witnesses.
        let secret_var = FpVar::<Fr>::new_witness(ark_relations::ns!(cs, "student_secret"), || {
            self.student_secret.ok_or(SynthesisError::AssignmentMissing)
        })?;

        let salt_var = FpVar::<Fr>::new_witness(ark_relations::ns!(cs, "salt"), || {
            self.salt.ok_or(SynthesisError::AssignmentMissing)
        })?;

        // In-circuit H4: absorb the four elements in commitment order,
        // squeeze one, and pin it to the disclosed commitment.
        let mut sponge = PoseidonSpongeVar::new(cs, &self.poseidon);
        sponge.absorb(&vec![
            credential_var,
            secret_var,
            salt_var,
            achievement_var,
        ])?;
        let computed = sponge.squeeze_field_elements(1)?.remove(0);

        computed.enforce_equal(&commitment_var)?;

        Ok(())
    }
}

/// Build the public input vector for verification.
///
/// The ordering MUST match `generate_constraints` — first `new_input`
/// allocation becomes `public_inputs[0]`, and so on.
pub fn public_inputs(commitment: &Commitment) -> Vec<Fr> {
    vec![
        commitment.commitment,
        commitment.credential_hash,
        commitment.achievement_hash,
    ]
}
