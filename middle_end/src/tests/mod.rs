//! Tests for the middle-end analyzer components
//!
//! One file per area: the node factory, symbol table and copy-up
//! discipline, feature gating, precision derivation, IO-array sizing,
//! built-in resolution, and the Parse Context end-to-end scenarios.

mod builtins_tests;
mod feature_gate_tests;
mod ir_tests;
mod precision_tests;
