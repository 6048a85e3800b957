//! # CLI Interface
//!
//! Defines the command-line argument structure for the `laurel` binary
//! using `clap` derive. Supports four subcommands: `setup`, `commit`,
//! `prove`, and `verify`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Laurel achievement proof tools.
///
/// Runs the full lifecycle of a privacy-preserving achievement claim:
/// one-time circuit setup, issuance-time commitment recording, holder-side
/// proof generation, and offline verification.
#[derive(Parser, Debug)]
#[command(
    name = "laurel",
    about = "Privacy-preserving achievement membership proofs",
    version,
    propagate_version = true
)]
pub struct LaurelCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Emit logs as JSON lines instead of human-readable output.
    #[arg(long, global = true)]
    pub json_logs: bool,
}

/// Top-level subcommands for the laurel binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the one-time Groth16 trusted setup and write the circuit
    /// artifacts (proving + verification key) to disk.
    Setup(SetupArgs),
    /// Compute and record commitments for a holder's achievements —
    /// the issuance-time step.
    Commit(CommitArgs),
    /// Generate membership proofs for one or more achievements.
    Prove(ProveArgs),
    /// Verify a proof file against the circuit artifacts and the
    /// commitment registry.
    Verify(VerifyArgs),
}

/// Arguments for the `setup` subcommand.
#[derive(Parser, Debug)]
pub struct SetupArgs {
    /// Directory to write the proving and verification keys into.
    #[arg(long, short = 'a', env = "LAUREL_ARTIFACTS_DIR", default_value = "artifacts")]
    pub artifacts_dir: PathBuf,
}

/// Arguments for the `commit` subcommand.
#[derive(Parser, Debug)]
pub struct CommitArgs {
    /// Hex-encoded Ed25519 wallet seed (64 hex chars).
    ///
    /// **Never pass this flag in production shells** — prefer the
    /// environment variable so the seed stays out of history.
    #[arg(long, env = "LAUREL_WALLET_KEY", hide_env_values = true)]
    pub wallet_key: String,

    /// The credential the achievements belong to.
    #[arg(long)]
    pub credential_id: String,

    /// Achievement codes to commit to (repeatable).
    #[arg(long = "achievement", required = true)]
    pub achievements: Vec<String>,

    /// Registry file to record the commitments in (created if missing,
    /// merged if present).
    #[arg(long, short = 'r', env = "LAUREL_REGISTRY", default_value = "registry.json")]
    pub registry: PathBuf,
}

/// Arguments for the `prove` subcommand.
#[derive(Parser, Debug)]
pub struct ProveArgs {
    /// Hex-encoded Ed25519 wallet seed (64 hex chars).
    #[arg(long, env = "LAUREL_WALLET_KEY", hide_env_values = true)]
    pub wallet_key: String,

    /// The credential the achievements belong to.
    #[arg(long)]
    pub credential_id: String,

    /// Achievement codes to prove (repeatable).
    #[arg(long = "achievement", required = true)]
    pub achievements: Vec<String>,

    /// Directory holding the circuit artifacts from `setup`.
    #[arg(long, short = 'a', env = "LAUREL_ARTIFACTS_DIR", default_value = "artifacts")]
    pub artifacts_dir: PathBuf,

    /// File to write the proof pack to.
    #[arg(long, short = 'o', default_value = "proofs.json")]
    pub out: PathBuf,

    /// How many proofs to generate concurrently.
    #[arg(long, default_value_t = 1)]
    pub concurrency: usize,
}

/// Arguments for the `verify` subcommand.
#[derive(Parser, Debug)]
pub struct VerifyArgs {
    /// Proof pack file produced by `prove`.
    pub proofs: PathBuf,

    /// Directory holding the circuit artifacts from `setup`.
    #[arg(long, short = 'a', env = "LAUREL_ARTIFACTS_DIR", default_value = "artifacts")]
    pub artifacts_dir: PathBuf,

    /// Registry file recorded by `commit`. When omitted, only the
    /// cryptographic check runs and the issuance binding is skipped.
    #[arg(long, short = 'r', env = "LAUREL_REGISTRY")]
    pub registry: Option<PathBuf>,
}
