//! Semantic analysis
//!
//! The analyzer proper: name resolution over a shared built-in root,
//! version/profile/extension gating, precision derivation, deferred
//! IO-array sizing, built-in call resolution, and the Parse Context that
//! ties them together for one compilation unit.

pub mod builtin_symbols;
pub mod builtins;
pub mod feature_gate;
pub mod io_arrays;
pub mod parse_context;
pub mod precision;
pub mod symbol_table;
