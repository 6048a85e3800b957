//! # Circuit Artifact Management
//!
//! The Groth16 proving key for `ach_member_v1` is large, immutable, and
//! versioned; the verification key is small enough to embed or hand out
//! freely. Both are treated as externally supplied binary artifacts:
//! fetched once through an [`ArtifactSource`], decoded, and cached for the
//! process lifetime.
//!
//! ## Caching contract
//!
//! - **Single-flight**: concurrent first callers await one in-flight load
//!   instead of fetching the proving key N times.
//! - **Atomic population**: the cache is written only after both keys have
//!   fetched *and* decoded. A failed fetch leaves it empty, so retries are
//!   side-effect free.
//! - **Lock-free reads**: once populated, readers clone an `Arc` out of a
//!   read lock; artifacts are immutable so no further coordination exists.
//!
//! Key generation (`CircuitArtifacts::generate`) lives here too — it is the
//! tooling path that produces the artifacts in the first place, run once per
//! circuit version, never on the proving hot path.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use ark_bn254::Bn254;
use ark_groth16::{Groth16, ProvingKey, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::{CircuitSpecificSetupSNARK, SNARK};
use ark_std::rand::{CryptoRng, Rng};
use async_trait::async_trait;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::info;

use crate::circuit::MembershipCircuit;
use crate::commitment::poseidon_config;
use crate::config::{PROVING_KEY_FILE, VERIFYING_KEY_FILE};
use crate::error::ZkError;

/// The decoded Groth16 key material for one circuit version. Immutable
/// once constructed; shared via `Arc`.
#[derive(Debug)]
pub struct CircuitArtifacts {
    /// The proving key — the large artifact. Holders need it; verifiers
    /// never see it.
    pub proving_key: ProvingKey<Bn254>,
    /// The verification key — small, safe to distribute to anyone.
    pub verifying_key: VerifyingKey<Bn254>,
}

impl CircuitArtifacts {
    /// Run the circuit-specific Groth16 setup and produce fresh keys.
    ///
    /// This is the trusted-setup ceremony stand-in: run it once per circuit
    /// version, publish the outputs, and never regenerate (new keys make
    /// every previously issued proof unverifiable against the new vk).
    pub fn generate<R: Rng + CryptoRng>(rng: &mut R) -> Result<Self> {
        let blank = MembershipCircuit::blank(poseidon_config());
        let (proving_key, verifying_key) = Groth16::<Bn254>::circuit_specific_setup(blank, rng)
            .context("Groth16 setup failed for the membership circuit")?;

        Ok(Self {
            proving_key,
            verifying_key,
        })
    }

    /// Serialize both keys into `dir`, logging SHA-256 checksums so the
    /// published artifacts can be pinned by consumers.
    pub fn write_to_dir(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating artifact directory {}", dir.display()))?;

        let pk_path = dir.join(PROVING_KEY_FILE);
        let mut pk_bytes = Vec::new();
        self.proving_key
            .serialize_compressed(&mut pk_bytes)
            .context("proving key serialization failed")?;
        std::fs::write(&pk_path, &pk_bytes)
            .with_context(|| format!("writing {}", pk_path.display()))?;

        let vk_path = dir.join(VERIFYING_KEY_FILE);
        let mut vk_bytes = Vec::new();
        self.verifying_key
            .serialize_compressed(&mut vk_bytes)
            .context("verification key serialization failed")?;
        std::fs::write(&vk_path, &vk_bytes)
            .with_context(|| format!("writing {}", vk_path.display()))?;

        info!(
            pk = %pk_path.display(),
            pk_bytes = pk_bytes.len(),
            pk_sha256 = %hex::encode(Sha256::digest(&pk_bytes)),
            vk = %vk_path.display(),
            vk_sha256 = %hex::encode(Sha256::digest(&vk_bytes)),
            "circuit artifacts written"
        );

        Ok(())
    }

    /// Decode artifacts from raw fetched bytes. Fails closed: any decoding
    /// problem is an artifact problem, never a partially usable key.
    fn decode(pk_bytes: &[u8], vk_bytes: &[u8]) -> Result<Self, ZkError> {
        let proving_key = ProvingKey::<Bn254>::deserialize_compressed(pk_bytes)
            .map_err(|e| ZkError::ArtifactFetchFailed(format!("proving key malformed: {e}")))?;
        let verifying_key = VerifyingKey::<Bn254>::deserialize_compressed(vk_bytes)
            .map_err(|e| ZkError::ArtifactFetchFailed(format!("verification key malformed: {e}")))?;

        Ok(Self {
            proving_key,
            verifying_key,
        })
    }
}

// ---------------------------------------------------------------------------
// Artifact sources
// ---------------------------------------------------------------------------

/// Where artifact bytes come from — the network/disk boundary.
///
/// Implementations fetch by fixed circuit identifier; versioning is in the
/// artifact names. Fetching is async because real sources sit behind I/O
/// with the host's usual timeout and retry policy.
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Fetch the serialized proving key.
    async fn fetch_proving_key(&self) -> Result<Vec<u8>, ZkError>;

    /// Fetch the serialized verification key.
    async fn fetch_verifying_key(&self) -> Result<Vec<u8>, ZkError>;
}

/// Artifact source reading from a local directory (the common deployment:
/// artifacts shipped alongside the binary or synced by the host).
pub struct FsArtifactSource {
    dir: PathBuf,
}

impl FsArtifactSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    async fn read(&self, file: &str) -> Result<Vec<u8>, ZkError> {
        let path = self.dir.join(file);
        tokio::fs::read(&path)
            .await
            .map_err(|e| ZkError::ArtifactFetchFailed(format!("{}: {e}", path.display())))
    }
}

#[async_trait]
impl ArtifactSource for FsArtifactSource {
    async fn fetch_proving_key(&self) -> Result<Vec<u8>, ZkError> {
        self.read(PROVING_KEY_FILE).await
    }

    async fn fetch_verifying_key(&self) -> Result<Vec<u8>, ZkError> {
        self.read(VERIFYING_KEY_FILE).await
    }
}

// ---------------------------------------------------------------------------
// Process-lifetime cache
// ---------------------------------------------------------------------------

/// In-memory, single-flight cache of decoded artifacts.
///
/// Constructed explicitly (usually once, shared by `Arc`), never global.
pub struct ArtifactCache {
    loaded: RwLock<Option<Arc<CircuitArtifacts>>>,
    load_lock: Mutex<()>,
}

impl ArtifactCache {
    pub fn new() -> Self {
        Self {
            loaded: RwLock::new(None),
            load_lock: Mutex::new(()),
        }
    }

    /// Whether artifacts are already resident.
    pub fn is_loaded(&self) -> bool {
        self.loaded.read().is_some()
    }

    /// Return the cached artifacts, loading them through `source` on first
    /// call. Concurrent first callers serialize on one in-flight load; a
    /// load failure caches nothing.
    pub async fn get_or_load(
        &self,
        source: &dyn ArtifactSource,
    ) -> Result<Arc<CircuitArtifacts>, ZkError> {
        // Fast path: populated means immutable, a read lock suffices.
        if let Some(artifacts) = self.loaded.read().as_ref() {
            return Ok(Arc::clone(artifacts));
        }

        // Slow path: one loader at a time. Losers of the race re-check and
        // find the winner's result.
        let _guard = self.load_lock.lock().await;
        if let Some(artifacts) = self.loaded.read().as_ref() {
            return Ok(Arc::clone(artifacts));
        }

        info!("loading circuit artifacts");
        let pk_bytes = source.fetch_proving_key().await?;
        let vk_bytes = source.fetch_verifying_key().await?;
        let artifacts = Arc::new(CircuitArtifacts::decode(&pk_bytes, &vk_bytes)?);
        info!(pk_bytes = pk_bytes.len(), "circuit artifacts cached");

        *self.loaded.write() = Some(Arc::clone(&artifacts));
        Ok(artifacts)
    }
}

impl Default for ArtifactCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use ark_std::rand::rngs::StdRng;
    use ark_std::rand::SeedableRng;

    fn generate() -> CircuitArtifacts {
        let mut rng = StdRng::seed_from_u64(42);
        CircuitArtifacts::generate(&mut rng).unwrap()
    }

    /// Source that counts fetches and serves pre-generated keys.
    struct CountingSource {
        pk: Vec<u8>,
        vk: Vec<u8>,
        fetches: AtomicUsize,
    }

    impl CountingSource {
        fn new(artifacts: &CircuitArtifacts) -> Self {
            let mut pk = Vec::new();
            artifacts.proving_key.serialize_compressed(&mut pk).unwrap();
            let mut vk = Vec::new();
            artifacts
                .verifying_key
                .serialize_compressed(&mut vk)
                .unwrap();
            Self {
                pk,
                vk,
                fetches: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ArtifactSource for CountingSource {
        async fn fetch_proving_key(&self) -> Result<Vec<u8>, ZkError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.pk.clone())
        }
        async fn fetch_verifying_key(&self) -> Result<Vec<u8>, ZkError> {
            Ok(self.vk.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl ArtifactSource for FailingSource {
        async fn fetch_proving_key(&self) -> Result<Vec<u8>, ZkError> {
            Err(ZkError::ArtifactFetchFailed("unreachable host".into()))
        }
        async fn fetch_verifying_key(&self) -> Result<Vec<u8>, ZkError> {
            Err(ZkError::ArtifactFetchFailed("unreachable host".into()))
        }
    }

    #[tokio::test]
    async fn load_once_then_serve_from_cache() {
        let artifacts = generate();
        let source = CountingSource::new(&artifacts);
        let cache = ArtifactCache::new();

        assert!(!cache.is_loaded());
        cache.get_or_load(&source).await.unwrap();
        assert!(cache.is_loaded());
        cache.get_or_load(&source).await.unwrap();
        cache.get_or_load(&source).await.unwrap();

        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_first_loads_are_single_flight() {
        let artifacts = generate();
        let source = Arc::new(CountingSource::new(&artifacts));
        let cache = Arc::new(ArtifactCache::new());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let source = Arc::clone(&source);
            handles.push(tokio::spawn(async move {
                cache.get_or_load(source.as_ref()).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(
            source.fetches.load(Ordering::SeqCst),
            1,
            "eight concurrent callers must share one fetch"
        );
    }

    #[tokio::test]
    async fn failed_load_caches_nothing_and_is_retryable() {
        let cache = ArtifactCache::new();
        let err = cache.get_or_load(&FailingSource).await.unwrap_err();
        assert!(matches!(err, ZkError::ArtifactFetchFailed(_)));
        assert!(!cache.is_loaded(), "failure must not populate the cache");

        // Retry against a working source succeeds.
        let artifacts = generate();
        let source = CountingSource::new(&artifacts);
        cache.get_or_load(&source).await.unwrap();
        assert!(cache.is_loaded());
    }

    #[tokio::test]
    async fn malformed_bytes_are_a_fetch_failure() {
        struct GarbageSource;

        #[async_trait]
        impl ArtifactSource for GarbageSource {
            async fn fetch_proving_key(&self) -> Result<Vec<u8>, ZkError> {
                Ok(vec![0xde, 0xad, 0xbe, 0xef])
            }
            async fn fetch_verifying_key(&self) -> Result<Vec<u8>, ZkError> {
                Ok(vec![0xde, 0xad])
            }
        }

        let cache = ArtifactCache::new();
        let err = cache.get_or_load(&GarbageSource).await.unwrap_err();
        assert!(matches!(err, ZkError::ArtifactFetchFailed(_)));
        assert!(!cache.is_loaded());
    }

    #[tokio::test]
    async fn fs_round_trip() {
        let artifacts = generate();
        let dir = tempfile::tempdir().unwrap();
        artifacts.write_to_dir(dir.path()).unwrap();

        let source = FsArtifactSource::new(dir.path());
        let cache = ArtifactCache::new();
        let loaded = cache.get_or_load(&source).await.unwrap();

        assert_eq!(loaded.verifying_key, artifacts.verifying_key);
    }

    #[tokio::test]
    async fn fs_missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let source = FsArtifactSource::new(dir.path());
        let err = source.fetch_proving_key().await.unwrap_err();
        assert!(err.to_string().contains(PROVING_KEY_FILE));
    }
}
