pub mod hash;
pub mod spec;
