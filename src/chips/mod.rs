pub mod arithmetic;
pub mod division;
pub mod ladder_table;
pub mod less_than_check;
pub mod merkle;
pub mod poseidon;
pub mod range;
