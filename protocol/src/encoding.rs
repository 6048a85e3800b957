//! # Field Encoding
//!
//! Maps arbitrary identifiers (credential ids, achievement codes) into the
//! BN254 scalar field, and handles the decimal-string wire codec for field
//! elements.
//!
//! ## The encoding contract
//!
//! `encode` is the one construction the issuing side, the prover, and every
//! verifier must reproduce bit-for-bit:
//!
//! 1. UTF-8 encode the identifier.
//! 2. SHA-256 the bytes.
//! 3. Interpret the 32-byte digest as a **big-endian** unsigned integer.
//! 4. Reduce modulo the scalar field order `r`.
//!
//! SHA-256 (not a faster hash) because the encoding must be reproducible by
//! any stack a registry or verifier happens to run — SHA-256 is everywhere.
//! The reduction bias is negligible: the digest is 256 bits against a
//! ~254-bit modulus.
//!
//! ## Wire representation
//!
//! Field elements cross process boundaries as decimal strings (the format
//! the wider Groth16 tooling ecosystem settled on). `field_to_decimal` /
//! `decimal_to_field` are the only codec; anything else is a bug.

use ark_bn254::Fr;
use ark_ff::PrimeField;
use num_bigint::BigUint;
use sha2::{Digest, Sha256};

use crate::error::ZkError;

/// Encode an identifier as a BN254 scalar field element.
///
/// Deterministic, total, and collision-resistant up to SHA-256. Two distinct
/// identifiers map to the same field element only if SHA-256 collides (or
/// with probability ~2^-254 through the reduction, which is the same thing
/// for practical purposes).
///
/// # Example
///
/// ```
/// use laurel_protocol::encoding::encode;
///
/// let a = encode("cred-001");
/// let b = encode("cred-001");
/// assert_eq!(a, b);
/// assert_ne!(a, encode("cred-002"));
/// ```
pub fn encode(input: &str) -> Fr {
    let digest = Sha256::digest(input.as_bytes());
    // Big-endian interpretation, reduced mod r. This matches the registry
    // side exactly; do not switch to the little-endian variant.
    Fr::from_be_bytes_mod_order(&digest)
}

/// Render a field element as a decimal string for the wire.
pub fn field_to_decimal(value: &Fr) -> String {
    let as_int: BigUint = (*value).into();
    as_int.to_string()
}

/// Parse a decimal string into a field element.
///
/// Rejects anything that is not a canonical field element: non-decimal
/// input, and values `>= r`. Silent modular reduction of out-of-range
/// wire values would let two distinct strings alias the same element,
/// which is exactly the ambiguity a verifier cannot afford.
pub fn decimal_to_field(s: &str) -> Result<Fr, ZkError> {
    let value = s
        .parse::<BigUint>()
        .map_err(|_| ZkError::InputEncodingFailed(format!("not a decimal integer: {s:?}")))?;

    if value >= field_order() {
        return Err(ZkError::InputEncodingFailed(
            "value is not a canonical field element (>= field order)".into(),
        ));
    }

    Ok(Fr::from(value))
}

/// Check whether a decimal string is a canonical field element. The
/// verifier's structural pass uses this to reject malformed signals before
/// any cryptography runs.
pub fn is_canonical_decimal(s: &str) -> bool {
    decimal_to_field(s).is_ok()
}

/// The scalar field order `r` of BN254 as a big integer.
pub fn field_order() -> BigUint {
    BigUint::from(Fr::MODULUS)
}

/// Serde adapter: (de)serialize an `Fr` as a decimal string.
///
/// Attach with `#[serde(with = "laurel_protocol::encoding::decimal")]`.
pub mod decimal {
    use super::*;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Fr, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&field_to_decimal(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Fr, D::Error> {
        let s = String::deserialize(deserializer)?;
        decimal_to_field(&s).map_err(de::Error::custom)
    }
}
