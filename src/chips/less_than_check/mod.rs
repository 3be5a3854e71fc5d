pub mod lt_check;
