//! # Laurel CLI
//!
//! Entry point for the `laurel` binary. Parses CLI arguments, initializes
//! logging, and drives the proof lifecycle end to end.
//!
//! The binary supports four subcommands:
//!
//! - `setup`  — run the one-time Groth16 trusted setup
//! - `commit` — compute and record issuance commitments
//! - `prove`  — generate membership proofs for a holder
//! - `verify` — check a proof pack against artifacts and registry

mod cli;
mod logging;

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use rand::rngs::OsRng;

use laurel_protocol::artifacts::{ArtifactCache, CircuitArtifacts, FsArtifactSource};
use laurel_protocol::commitment::{Commitment, CommitmentEngine};
use laurel_protocol::prover::{ProofGenerator, ProofPack, ProverConfig};
use laurel_protocol::secrets::{SecretDeriver, SignatureCache};
use laurel_protocol::verifier::{InMemoryRegistry, ProofVerifier};
use laurel_protocol::wallet::Ed25519Wallet;

use cli::{Commands, LaurelCli};
use logging::LogFormat;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = LaurelCli::parse();

    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    logging::init_logging("laurel=info,laurel_protocol=info", format);

    match cli.command {
        Commands::Setup(args) => run_setup(args),
        Commands::Commit(args) => run_commit(args).await,
        Commands::Prove(args) => run_prove(args).await,
        Commands::Verify(args) => run_verify(args).await,
    }
}

/// One-time trusted setup: generate and publish the circuit keys.
fn run_setup(args: cli::SetupArgs) -> Result<()> {
    tracing::info!(dir = %args.artifacts_dir.display(), "running Groth16 trusted setup");

    let artifacts = CircuitArtifacts::generate(&mut OsRng)?;
    artifacts
        .write_to_dir(&args.artifacts_dir)
        .with_context(|| format!("writing artifacts to {}", args.artifacts_dir.display()))?;

    tracing::info!("setup complete — publish the artifact directory to holders and verifiers");
    Ok(())
}

/// Issuance: derive the holder's secrets, compute one commitment per
/// achievement, and merge them into the registry file.
async fn run_commit(args: cli::CommitArgs) -> Result<()> {
    let wallet = Ed25519Wallet::from_hex(&args.wallet_key).context("loading wallet key")?;
    let deriver = SecretDeriver::new(SignatureCache::new());
    let secrets = deriver.derive(&wallet, &args.credential_id).await?;

    let engine = CommitmentEngine::new();
    let fresh = engine.commit_batch(&args.credential_id, &args.achievements, &secrets);

    let mut records = load_registry_file(&args.registry).unwrap_or_default();
    for (code, commitment) in &fresh {
        // Re-committing the same pair replaces the stale record.
        records.retain(|r| {
            !(r.credential_hash == commitment.credential_hash
                && r.achievement_hash == commitment.achievement_hash)
        });
        records.push(commitment.clone());
        tracing::info!(achievement = %code, "commitment recorded");
    }

    let json = serde_json::to_string_pretty(&records)?;
    std::fs::write(&args.registry, json)
        .with_context(|| format!("writing registry {}", args.registry.display()))?;

    tracing::info!(
        registry = %args.registry.display(),
        total = records.len(),
        "registry updated"
    );
    Ok(())
}

/// Holder side: derive secrets and generate one proof per achievement.
async fn run_prove(args: cli::ProveArgs) -> Result<()> {
    let wallet = Ed25519Wallet::from_hex(&args.wallet_key).context("loading wallet key")?;
    let deriver = SecretDeriver::new(SignatureCache::new());
    let secrets = deriver.derive(&wallet, &args.credential_id).await?;

    let cache = Arc::new(ArtifactCache::new());
    let generator = ProofGenerator::with_config(
        Arc::new(CommitmentEngine::new()),
        cache,
        ProverConfig {
            max_concurrent: args.concurrency,
        },
    );
    let source = FsArtifactSource::new(&args.artifacts_dir);

    // Surface progress in the logs as it happens.
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<laurel_protocol::prover::ProgressEvent>();
    let reporter = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            tracing::info!(
                stage = ?event.stage,
                percent = event.percent,
                "{}",
                event.message
            );
        }
    });

    let pack = generator
        .generate_pack(
            &source,
            &args.credential_id,
            &secrets,
            &args.achievements,
            Some(tx),
        )
        .await?;
    reporter.await.ok();

    let json = serde_json::to_string_pretty(&pack)?;
    std::fs::write(&args.out, json)
        .with_context(|| format!("writing proof pack {}", args.out.display()))?;
    tracing::info!(
        out = %args.out.display(),
        proofs = pack.proofs.len(),
        "proof pack written"
    );

    if let Some(failure) = &pack.failed {
        bail!(
            "batch aborted at \"{}\": {} ({} proof(s) completed and written)",
            failure.achievement_code,
            failure.reason,
            pack.proofs.len()
        );
    }
    Ok(())
}

/// Verifier side: check every proof in a pack, optionally binding each
/// against the issuance registry.
async fn run_verify(args: cli::VerifyArgs) -> Result<()> {
    let json = std::fs::read_to_string(&args.proofs)
        .with_context(|| format!("reading proof pack {}", args.proofs.display()))?;
    let pack: ProofPack = serde_json::from_str(&json).context("parsing proof pack")?;

    let registry = match &args.registry {
        Some(path) => {
            let records = load_registry_file(path)
                .with_context(|| format!("reading registry {}", path.display()))?;
            let registry = InMemoryRegistry::new();
            for record in &records {
                registry.record(record);
            }
            tracing::info!(records = registry.len(), "registry loaded");
            Some(registry)
        }
        None => {
            tracing::warn!(
                "no registry supplied — checking proof soundness only, not issuance binding"
            );
            None
        }
    };

    let cache = Arc::new(ArtifactCache::new());
    let verifier = ProofVerifier::new(cache);
    let source = FsArtifactSource::new(&args.artifacts_dir);

    let mut rejected = 0usize;
    for proof in &pack.proofs {
        let accepted = match &registry {
            Some(registry) => {
                let outcome = verifier.verify_claim(&source, registry, proof).await?;
                tracing::info!(
                    achievement = %proof.achievement_code,
                    proof_valid = outcome.proof_valid,
                    recognized = ?outcome.commitment_recognized,
                    proof_hash = %outcome.proof_hash,
                    "claim checked"
                );
                outcome.accepted()
            }
            None => {
                let valid = verifier.verify(&source, proof).await?;
                tracing::info!(
                    achievement = %proof.achievement_code,
                    proof_valid = valid,
                    "proof checked"
                );
                valid
            }
        };
        if !accepted {
            rejected += 1;
        }
    }

    if rejected > 0 {
        bail!("{rejected} of {} proof(s) rejected", pack.proofs.len());
    }
    tracing::info!(proofs = pack.proofs.len(), "all proofs accepted");
    Ok(())
}

fn load_registry_file(path: &Path) -> Result<Vec<Commitment>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}
