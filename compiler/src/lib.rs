//! Embedding façade over the analyzer
//!
//! An embedder builds an [Analyzer] from a [ShaderConfig] and a
//! [ResourceLimits] table, drives the Parse Context handler surface from
//! its grammar driver, and calls [Analyzer::finish] for the verdict.
//! Built-in roots can be seeded once and shared across many analyzers.

use std::sync::Arc;

pub use front_end::diagnostics::InfoSink;
pub use front_end::limits::ResourceLimits;
pub use front_end::version::{Profile, ShaderConfig, Stage, TargetEnv};
pub use middle_end::sema::parse_context::ParseContext;
pub use middle_end::sema::symbol_table::Scope;

use middle_end::sema::builtin_symbols;

/// Outcome of one analyzed compilation unit
#[derive(Debug)]
pub struct Analysis {
    /// True iff no error was recorded
    pub accepted: bool,
    pub error_count: usize,
    pub warning_count: usize,
    /// Rendered diagnostics followed by the totals line
    pub report: String,
}

/// Seed a built-in root for `config`, shareable across analyzers
pub fn builtin_root(config: &ShaderConfig) -> Arc<Scope> {
    builtin_symbols::build_builtin_scope(config)
}

/// One compilation unit's analyzer
pub struct Analyzer {
    context: ParseContext,
}

impl Analyzer {
    pub fn new(config: ShaderConfig, limits: ResourceLimits) -> Self {
        Self { context: ParseContext::new(config, limits) }
    }

    /// Analyze over an already-seeded shared built-in root
    pub fn with_builtins(config: ShaderConfig, limits: ResourceLimits, builtins: Arc<Scope>) -> Self {
        Self { context: ParseContext::with_builtins(config, limits, builtins) }
    }

    /// The handler surface the grammar driver calls into
    pub fn context(&mut self) -> &mut ParseContext {
        &mut self.context
    }

    /// Settle deferred checks and produce the verdict
    pub fn finish(mut self) -> Analysis {
        let accepted = self.context.finish();
        let sink = self.context.sink();
        Analysis {
            accepted,
            error_count: sink.error_count(),
            warning_count: sink.warning_count(),
            report: sink.report(),
        }
    }
}
