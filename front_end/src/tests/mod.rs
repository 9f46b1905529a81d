//! Tests for the shading-language surface types
//!
//! This module contains tests for the type model, qualifier merging rules,
//! and the diagnostic sink.

mod qualifier_tests;
mod types_tests;
