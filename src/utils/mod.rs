pub mod hash;
mod operation_helpers;
pub mod fp_serde;

pub use operation_helpers::{
    big_uint_to_fp, fp_from_bytes, fp_from_u128, fp_to_big_uint, fp_to_hex,
};
