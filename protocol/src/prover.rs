//! # Groth16 Proof Generation
//!
//! Turns `(credential, secrets, achievements[])` into a pack of membership
//! proofs, one per achievement. The workflow per run:
//!
//! 1. **Load artifacts** — through the single-flight [`ArtifactCache`];
//!    already-resident keys skip straight to proving.
//! 2. **Prove per achievement** — compute the commitment, populate a
//!    [`MembershipCircuit`], and run Groth16 on a blocking worker thread so
//!    the caller's executor never stalls. Achievements are proved with a
//!    bounded concurrency window (default 1, i.e. strictly sequential —
//!    proving-key material is large and peak memory matters more than
//!    latency on holder hardware).
//! 3. **Report progress** — every stage transition is published as a
//!    [`ProgressEvent`] on a channel the caller supplies. The prover knows
//!    nothing about UIs; drop the receiver and events vanish harmlessly.
//!
//! ## Randomized proofs, stable signals
//!
//! Groth16 proving draws fresh randomness, so proving the same witness
//! twice yields different proof bytes — that is expected and correct. The
//! `publicSignals`, by contrast, are a pure function of the inputs and must
//! be byte-identical across runs.
//!
//! ## Partial results
//!
//! When one achievement fails mid-batch, no further achievements are
//! started, but proofs already completed are *preserved* in the returned
//! [`ProofPack`] alongside the failure record. Callers who want
//! all-or-nothing call [`ProofPack::into_complete`].

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use ark_bn254::{Bn254, Fq, Fq2, G1Affine, G2Affine};
use ark_ec::AffineRepr;
use ark_groth16::{Groth16, Proof, ProvingKey};
use ark_snark::SNARK;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::artifacts::{ArtifactCache, ArtifactSource};
use crate::circuit::MembershipCircuit;
use crate::commitment::{Commitment, CommitmentEngine};
use crate::config::{
    DEFAULT_MAX_CONCURRENT_PROOFS, PERCENT_COMPLETE, PERCENT_LOADING_ARTIFACTS,
    PERCENT_PROVING_START, PROOF_CURVE, PROOF_PROTOCOL,
};
use crate::encoding::{encode, field_to_decimal};
use crate::error::ZkError;
use crate::secrets::DerivedSecrets;

// ---------------------------------------------------------------------------
// Progress events
// ---------------------------------------------------------------------------

/// Stages of one proof-generation run, in order. `Error` is terminal and
/// reachable from any non-terminal stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Fetching and decoding the proving/verification keys.
    LoadingProvingKey,
    /// Running Groth16 for one achievement.
    GeneratingProof,
    /// The run (or one achievement within it) finished.
    Complete,
    /// The run aborted.
    Error,
}

/// One stage-tagged progress notification. Percentages reflect completed
/// work, so they are monotonically non-decreasing across a run regardless
/// of the proving concurrency window.
#[derive(Clone, Debug, Serialize)]
pub struct ProgressEvent {
    /// The achievement being worked on, when the stage is per-achievement.
    pub achievement_code: Option<String>,
    pub stage: Stage,
    pub percent: u8,
    pub message: String,
}

fn emit(progress: &Option<UnboundedSender<ProgressEvent>>, event: ProgressEvent) {
    if let Some(tx) = progress {
        // A dropped receiver just means nobody is watching.
        let _ = tx.send(event);
    }
}

// ---------------------------------------------------------------------------
// Proof exchange format
// ---------------------------------------------------------------------------

/// A Groth16 proof in the ecosystem-standard JSON shape: curve points as
/// decimal-string coordinate arrays, plus protocol/curve tags. This is what
/// travels between holder and verifier; nothing else does.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Groth16ProofJson {
    /// G1 point, `[x, y, "1"]` (projective z always normalized).
    pub pi_a: Vec<String>,
    /// G2 point, `[[x_c0, x_c1], [y_c0, y_c1], ["1", "0"]]`.
    pub pi_b: Vec<Vec<String>>,
    /// G1 point, `[x, y, "1"]`.
    pub pi_c: Vec<String>,
    /// Always `"groth16"`.
    pub protocol: String,
    /// Always `"bn128"` (the ecosystem name for BN254).
    pub curve: String,
}

/// The output of one proof-generation run for one achievement — the file a
/// holder hands to a verifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedProof {
    pub achievement_code: String,
    pub proof: Groth16ProofJson,
    /// Ordered decimal strings: `[commitment, credential_hash,
    /// achievement_hash]` — the circuit's public input order.
    pub public_signals: Vec<String>,
    /// The disclosed commitment, duplicated out of `public_signals` for
    /// registry lookup convenience.
    pub commitment: String,
}

/// Why one achievement's proof failed.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFailure {
    pub achievement_code: String,
    pub reason: String,
}

/// The result of one generation run: completed proofs, plus the failure
/// that aborted the batch, if any.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofPack {
    pub proofs: Vec<GeneratedProof>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<BatchFailure>,
}

impl ProofPack {
    /// True when every requested achievement was proved.
    pub fn is_complete(&self) -> bool {
        self.failed.is_none()
    }

    /// All-or-nothing view: the proofs if the pack completed, otherwise the
    /// failure as a [`ZkError`].
    pub fn into_complete(self) -> Result<Vec<GeneratedProof>, ZkError> {
        match self.failed {
            None => Ok(self.proofs),
            Some(failure) => Err(ZkError::ProofGenerationFailed {
                achievement: failure.achievement_code,
                reason: failure.reason,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Point encoding
// ---------------------------------------------------------------------------

fn fq_to_decimal(value: &Fq) -> String {
    let as_int: BigUint = (*value).into();
    as_int.to_string()
}

fn decimal_to_fq(s: &str) -> Result<Fq, ZkError> {
    let value = s
        .parse::<BigUint>()
        .map_err(|_| ZkError::InputEncodingFailed(format!("not a decimal integer: {s:?}")))?;
    // Range check against the base field order.
    if value >= BigUint::from(<Fq as ark_ff::PrimeField>::MODULUS) {
        return Err(ZkError::InputEncodingFailed(
            "coordinate is not a canonical base field element".into(),
        ));
    }
    Ok(Fq::from(value))
}

fn g1_to_json(point: &G1Affine) -> Vec<String> {
    if point.is_zero() {
        // Projective identity, as the ecosystem encodes it.
        return vec!["0".into(), "1".into(), "0".into()];
    }
    vec![
        fq_to_decimal(&point.x),
        fq_to_decimal(&point.y),
        "1".into(),
    ]
}

fn g2_to_json(point: &G2Affine) -> Vec<Vec<String>> {
    if point.is_zero() {
        return vec![
            vec!["0".into(), "0".into()],
            vec!["1".into(), "0".into()],
            vec!["0".into(), "0".into()],
        ];
    }
    vec![
        vec![fq_to_decimal(&point.x.c0), fq_to_decimal(&point.x.c1)],
        vec![fq_to_decimal(&point.y.c0), fq_to_decimal(&point.y.c1)],
        vec!["1".into(), "0".into()],
    ]
}

fn json_to_g1(coords: &[String]) -> Result<G1Affine, ZkError> {
    if coords.len() != 3 {
        return Err(ZkError::InputEncodingFailed(
            "G1 point must have 3 coordinates".into(),
        ));
    }
    if coords[2] == "0" {
        return Ok(G1Affine::identity());
    }
    // Only normalized points are accepted; a free z would let two distinct
    // encodings alias one point.
    if coords[2] != "1" {
        return Err(ZkError::InputEncodingFailed(
            "G1 point must be normalized (z = 1)".into(),
        ));
    }
    let point = G1Affine::new_unchecked(decimal_to_fq(&coords[0])?, decimal_to_fq(&coords[1])?);
    if !point.is_on_curve() || !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(ZkError::InputEncodingFailed(
            "G1 coordinates are not a curve point".into(),
        ));
    }
    Ok(point)
}

fn json_to_g2(coords: &[Vec<String>]) -> Result<G2Affine, ZkError> {
    if coords.len() != 3 || coords.iter().any(|pair| pair.len() != 2) {
        return Err(ZkError::InputEncodingFailed(
            "G2 point must have 3 coordinate pairs".into(),
        ));
    }
    if coords[2][0] == "0" && coords[2][1] == "0" {
        return Ok(G2Affine::identity());
    }
    if !(coords[2][0] == "1" && coords[2][1] == "0") {
        return Err(ZkError::InputEncodingFailed(
            "G2 point must be normalized (z = [1, 0])".into(),
        ));
    }
    let x = Fq2::new(decimal_to_fq(&coords[0][0])?, decimal_to_fq(&coords[0][1])?);
    let y = Fq2::new(decimal_to_fq(&coords[1][0])?, decimal_to_fq(&coords[1][1])?);
    let point = G2Affine::new_unchecked(x, y);
    if !point.is_on_curve() || !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(ZkError::InputEncodingFailed(
            "G2 coordinates are not a curve point".into(),
        ));
    }
    Ok(point)
}

/// Encode an arkworks proof into the exchange format.
pub fn proof_to_json(proof: &Proof<Bn254>) -> Groth16ProofJson {
    Groth16ProofJson {
        pi_a: g1_to_json(&proof.a),
        pi_b: g2_to_json(&proof.b),
        pi_c: g1_to_json(&proof.c),
        protocol: PROOF_PROTOCOL.to_string(),
        curve: PROOF_CURVE.to_string(),
    }
}

/// Decode an exchange-format proof back into arkworks form, validating
/// that every coordinate is canonical and every point is on-curve and in
/// the right subgroup.
pub fn json_to_proof(json: &Groth16ProofJson) -> Result<Proof<Bn254>, ZkError> {
    Ok(Proof {
        a: json_to_g1(&json.pi_a)?,
        b: json_to_g2(&json.pi_b)?,
        c: json_to_g1(&json.pi_c)?,
    })
}

/// The ordered decimal `publicSignals` for a commitment.
pub fn public_signal_strings(commitment: &Commitment) -> Vec<String> {
    vec![
        field_to_decimal(&commitment.commitment),
        field_to_decimal(&commitment.credential_hash),
        field_to_decimal(&commitment.achievement_hash),
    ]
}

// ---------------------------------------------------------------------------
// Proof generator
// ---------------------------------------------------------------------------

/// Prover policy knobs.
#[derive(Clone, Copy, Debug)]
pub struct ProverConfig {
    /// How many achievements may prove concurrently within one pack.
    /// 1 (the default) keeps peak memory at a single proving run, the
    /// right call on holder hardware. Raise it on server-grade machines.
    pub max_concurrent: usize,
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT_PROOFS,
        }
    }
}

/// The blocking proving step. A plain function pointer so tests can swap
/// in a failing step without touching the batch machinery.
type ProveTask = fn(&ProvingKey<Bn254>, MembershipCircuit) -> Result<Proof<Bn254>, String>;

fn groth16_prove_task(
    pk: &ProvingKey<Bn254>,
    circuit: MembershipCircuit,
) -> Result<Proof<Bn254>, String> {
    let mut rng = ark_std::rand::thread_rng();
    Groth16::<Bn254>::prove(pk, circuit, &mut rng).map_err(|e| e.to_string())
}

/// Best-effort message out of a panic payload.
fn panic_reason(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("proving panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("proving panicked: {s}")
    } else {
        "proving panicked".into()
    }
}

/// Generates membership proof packs. Holds the commitment engine (for the
/// Poseidon parameters the circuit bakes in) and the artifact cache; both
/// injected, both shared freely across runs.
pub struct ProofGenerator {
    engine: Arc<CommitmentEngine>,
    cache: Arc<ArtifactCache>,
    config: ProverConfig,
    prove: ProveTask,
}

impl ProofGenerator {
    pub fn new(engine: Arc<CommitmentEngine>, cache: Arc<ArtifactCache>) -> Self {
        Self::with_config(engine, cache, ProverConfig::default())
    }

    pub fn with_config(
        engine: Arc<CommitmentEngine>,
        cache: Arc<ArtifactCache>,
        config: ProverConfig,
    ) -> Self {
        Self {
            engine,
            cache,
            config: ProverConfig {
                max_concurrent: config.max_concurrent.max(1),
            },
            prove: groth16_prove_task,
        }
    }

    #[cfg(test)]
    fn with_prove_task(
        engine: Arc<CommitmentEngine>,
        cache: Arc<ArtifactCache>,
        config: ProverConfig,
        prove: ProveTask,
    ) -> Self {
        Self {
            prove,
            ..Self::with_config(engine, cache, config)
        }
    }

    /// Generate one proof per achievement for a fixed credential.
    ///
    /// Artifacts load once per process (single-flight); achievements prove
    /// within the configured concurrency window; progress lands on
    /// `progress` if supplied. On a per-achievement failure the batch stops
    /// launching further work but returns everything already proved.
    pub async fn generate_pack(
        &self,
        source: &dyn ArtifactSource,
        credential_id: &str,
        secrets: &DerivedSecrets,
        achievements: &[String],
        progress: Option<UnboundedSender<ProgressEvent>>,
    ) -> Result<ProofPack, ZkError> {
        let total = achievements.len();
        info!(credential_id, achievements = total, "generating proof pack");

        if !self.cache.is_loaded() {
            emit(
                &progress,
                ProgressEvent {
                    achievement_code: None,
                    stage: Stage::LoadingProvingKey,
                    percent: PERCENT_LOADING_ARTIFACTS,
                    message: "Loading proving key (this may take a moment)...".into(),
                },
            );
        }
        let artifacts = self.cache.get_or_load(source).await?;

        let credential_hash = encode(credential_id);
        let mut inflight: JoinSet<(usize, Result<Proof<Bn254>, String>)> = JoinSet::new();
        let mut task_index: HashMap<tokio::task::Id, usize> = HashMap::new();
        let mut results: Vec<Option<GeneratedProof>> = (0..total).map(|_| None).collect();
        let mut commitments: Vec<Option<Commitment>> = (0..total).map(|_| None).collect();
        let mut next = 0usize;
        let mut completed = 0usize;
        let mut failed: Option<BatchFailure> = None;

        while (failed.is_none() && next < total) || !inflight.is_empty() {
            // Keep the window full until a failure stops new launches.
            while failed.is_none() && next < total && inflight.len() < self.config.max_concurrent {
                let code = achievements[next].clone();
                let commitment =
                    self.engine
                        .commit_hashed(credential_hash, encode(&code), secrets);
                let circuit = MembershipCircuit::new(
                    self.engine.poseidon_config().clone(),
                    &commitment,
                    secrets,
                );
                commitments[next] = Some(commitment);

                emit(
                    &progress,
                    ProgressEvent {
                        achievement_code: Some(code.clone()),
                        stage: Stage::GeneratingProof,
                        percent: completion_percent(completed, total),
                        message: format!("Generating proof for \"{code}\"..."),
                    },
                );
                debug!(achievement = %code, "proving");

                let pk = Arc::clone(&artifacts);
                let index = next;
                let prove = self.prove;
                let handle = inflight.spawn_blocking(move || {
                    // ark-groth16 panics rather than erroring on some bad
                    // witnesses; contain the panic so it stays a
                    // per-achievement failure.
                    let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
                        prove(&pk.proving_key, circuit)
                    }));
                    (index, outcome.unwrap_or_else(|payload| Err(panic_reason(payload))))
                });
                task_index.insert(handle.id(), index);
                next += 1;
            }

            let Some(joined) = inflight.join_next().await else {
                break;
            };
            // Proving tasks contain their own panics, so a join error can
            // only mean the task was torn down underneath us. Either way it
            // is that achievement's failure, not the whole batch's: already
            // completed proofs stay in the pack.
            let (index, outcome) = match joined {
                Ok(pair) => pair,
                Err(join_err) => {
                    let index = task_index
                        .get(&join_err.id())
                        .copied()
                        .expect("every proving task is registered at spawn");
                    (index, Err(format!("proving task aborted: {join_err}")))
                }
            };
            let code = &achievements[index];

            match outcome {
                Ok(proof) => {
                    completed += 1;
                    let commitment = commitments[index]
                        .take()
                        .expect("commitment recorded at launch");
                    results[index] = Some(GeneratedProof {
                        achievement_code: code.clone(),
                        proof: proof_to_json(&proof),
                        public_signals: public_signal_strings(&commitment),
                        commitment: field_to_decimal(&commitment.commitment),
                    });
                    emit(
                        &progress,
                        ProgressEvent {
                            achievement_code: Some(code.clone()),
                            stage: Stage::Complete,
                            percent: completion_percent(completed, total),
                            message: format!("Proof generated for \"{code}\""),
                        },
                    );
                }
                Err(reason) => {
                    warn!(achievement = %code, %reason, "proof generation failed, aborting batch");
                    emit(
                        &progress,
                        ProgressEvent {
                            achievement_code: Some(code.clone()),
                            stage: Stage::Error,
                            percent: completion_percent(completed, total),
                            message: format!("Failed to generate proof: {reason}"),
                        },
                    );
                    // First failure wins; in-flight work drains but nothing
                    // new launches.
                    if failed.is_none() {
                        failed = Some(BatchFailure {
                            achievement_code: code.clone(),
                            reason,
                        });
                    }
                }
            }
        }

        if failed.is_none() {
            emit(
                &progress,
                ProgressEvent {
                    achievement_code: None,
                    stage: Stage::Complete,
                    percent: PERCENT_COMPLETE,
                    message: "Proof pack complete".into(),
                },
            );
        }

        info!(
            credential_id,
            completed,
            aborted = failed.is_some(),
            "proof pack finished"
        );

        Ok(ProofPack {
            proofs: results.into_iter().flatten().collect(),
            failed,
        })
    }
}

/// Percent after `completed` of `total` achievements are proved. Launch
/// and completion events both use this, so every percentage derives from
/// one monotone counter and never regresses, even when proving overlaps.
fn completion_percent(completed: usize, total: usize) -> u8 {
    let span = f64::from(PERCENT_COMPLETE - PERCENT_PROVING_START);
    (f64::from(PERCENT_PROVING_START) + (completed as f64 / total.max(1) as f64) * span) as u8
}
