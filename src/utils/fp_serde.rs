//! Serde helpers storing field elements as their 32 byte little-endian representation.
use crate::utils::fp_from_bytes;
use halo2_proofs::halo2curves::{bn256::Fr as Fp, group::ff::PrimeField};
use serde::de::Error;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub fn fp_to_bytes(f: &Fp) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(f.to_repr().as_ref());
    bytes
}

/// `#[serde(with = "crate::utils::fp_serde::fp")]`
pub mod fp {
    use super::*;

    pub fn serialize<S: Serializer>(f: &Fp, serializer: S) -> Result<S::Ok, S::Error> {
        fp_to_bytes(f).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Fp, D::Error> {
        let bytes = <[u8; 32]>::deserialize(deserializer)?;
        fp_from_bytes(bytes).ok_or_else(|| D::Error::custom("non canonical field element"))
    }
}

/// `#[serde(with = "crate::utils::fp_serde::fp_vec")]`
pub mod fp_vec {
    use super::*;

    pub fn serialize<S: Serializer>(elements: &[Fp], serializer: S) -> Result<S::Ok, S::Error> {
        elements
            .iter()
            .map(fp_to_bytes)
            .collect::<Vec<_>>()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Fp>, D::Error> {
        Vec::<[u8; 32]>::deserialize(deserializer)?
            .into_iter()
            .map(|bytes| {
                fp_from_bytes(bytes).ok_or_else(|| D::Error::custom("non canonical field element"))
            })
            .collect()
    }
}
