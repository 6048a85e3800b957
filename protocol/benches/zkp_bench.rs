// Proof pipeline benchmarks.
//
// Covers Groth16 trusted setup, proof generation, and proof verification
// for the membership circuit over BN254, plus the Poseidon commitment and
// identifier encoding since they sit on the proving hot path.

use criterion::{criterion_group, criterion_main, Criterion};

use ark_bn254::{Bn254, Fr};
use ark_ff::UniformRand;
use ark_groth16::Groth16;
use ark_snark::SNARK;
use ark_std::rand::{rngs::StdRng, SeedableRng};

use laurel_protocol::artifacts::CircuitArtifacts;
use laurel_protocol::circuit::{self, MembershipCircuit};
use laurel_protocol::commitment::CommitmentEngine;
use laurel_protocol::encoding::encode;
use laurel_protocol::secrets::DerivedSecrets;

fn test_secrets(rng: &mut StdRng) -> DerivedSecrets {
    DerivedSecrets {
        student_secret: Fr::rand(rng),
        salt: Fr::rand(rng),
    }
}

fn bench_identifier_encode(c: &mut Criterion) {
    c.bench_function("zkp/encode_identifier", |b| {
        b.iter(|| encode("dean-list-2023"));
    });
}

fn bench_poseidon_commit(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let engine = CommitmentEngine::new();
    let secrets = test_secrets(&mut rng);

    c.bench_function("zkp/poseidon_commit", |b| {
        b.iter(|| engine.commit("cred-001", "dean-list-2023", &secrets));
    });
}

fn bench_groth16_setup(c: &mut Criterion) {
    c.bench_function("zkp/groth16_setup", |b| {
        b.iter(|| {
            let mut rng = StdRng::seed_from_u64(42);
            CircuitArtifacts::generate(&mut rng).unwrap()
        });
    });
}

fn bench_groth16_prove(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let artifacts = CircuitArtifacts::generate(&mut rng).unwrap();
    let engine = CommitmentEngine::new();
    let secrets = test_secrets(&mut rng);
    let commitment = engine.commit("cred-001", "dean-list-2023", &secrets);

    c.bench_function("zkp/groth16_prove", |b| {
        b.iter(|| {
            let circuit =
                MembershipCircuit::new(engine.poseidon_config().clone(), &commitment, &secrets);
            Groth16::<Bn254>::prove(&artifacts.proving_key, circuit, &mut rng).unwrap()
        });
    });
}

fn bench_groth16_verify(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let artifacts = CircuitArtifacts::generate(&mut rng).unwrap();
    let engine = CommitmentEngine::new();
    let secrets = test_secrets(&mut rng);
    let commitment = engine.commit("cred-001", "dean-list-2023", &secrets);

    let proof = Groth16::<Bn254>::prove(
        &artifacts.proving_key,
        MembershipCircuit::new(engine.poseidon_config().clone(), &commitment, &secrets),
        &mut rng,
    )
    .unwrap();
    let inputs = circuit::public_inputs(&commitment);

    c.bench_function("zkp/groth16_verify", |b| {
        b.iter(|| Groth16::<Bn254>::verify(&artifacts.verifying_key, &inputs, &proof).unwrap());
    });
}

criterion_group!(
    benches,
    bench_identifier_encode,
    bench_poseidon_commit,
    bench_groth16_setup,
    bench_groth16_prove,
    bench_groth16_verify,
);
criterion_main!(benches);
