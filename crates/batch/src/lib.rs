//! `restyle-batch` library crate.
//!
//! Holds the environment-to-configuration layer so it can be unit
//! tested. The binary entrypoints live in `main.rs` and `bin/smoke.rs`.

pub mod env;
