//! Compiler diagnostic system
//!
//! This module provides a unified system for error and warning reporting
//! across the analyzer. Handlers report into an [InfoSink]; the sink's
//! error counter is the only global propagation channel, and a unit is
//! accepted iff the counter is zero after the finish pass.

use std::fmt;

use colored::Colorize;

use crate::source_location::Span;

/// Severity level of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Error - prevents the unit from being accepted
    Error,
    /// Warning - reported but never causes rejection
    Warning,
    /// Note - additional information
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

/// A diagnostic message with source and token context
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,

    /// Primary message
    pub message: String,

    /// The offending token or symbol, if known
    pub context: Option<String>,

    /// Source location
    pub span: Option<Span>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            context: None,
            span: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            context: None,
            span: None,
        }
    }

    pub fn note(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Note,
            message: message.into(),
            context: None,
            span: None,
        }
    }

    /// Attach the offending token or symbol name
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.severity)?;
        if let Some(context) = &self.context {
            write!(f, "'{}' : ", context)?;
        }
        write!(f, "{}", self.message)?;
        if let Some(span) = &self.span {
            write!(f, " ({})", span)?;
        }
        Ok(())
    }
}

/// A sink that collects diagnostics and counts errors and warnings
#[derive(Debug, Default)]
pub struct InfoSink {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    warning_count: usize,
    suppress_warnings: bool,
}

impl InfoSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn suppressing_warnings() -> Self {
        Self { suppress_warnings: true, ..Self::default() }
    }

    /// Add a diagnostic, updating the counters
    pub fn add(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => self.error_count += 1,
            Severity::Warning => {
                if self.suppress_warnings {
                    return;
                }
                self.warning_count += 1;
            }
            Severity::Note => {}
        }
        self.diagnostics.push(diagnostic);
    }

    /// Report an error with token context at a location
    pub fn error(&mut self, span: &Span, context: &str, message: impl Into<String>) {
        self.add(Diagnostic::error(message).with_context(context).with_span(span.clone()));
    }

    /// Report a warning with token context at a location
    pub fn warn(&mut self, span: &Span, context: &str, message: impl Into<String>) {
        self.add(Diagnostic::warning(message).with_context(context).with_span(span.clone()));
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Render all diagnostics followed by the totals line
    pub fn report(&self) -> String {
        let mut output = String::new();

        for diagnostic in &self.diagnostics {
            output.push_str(&format!("{}\n", diagnostic));
        }

        output.push_str(&format!("{} error(s), {} warning(s) emitted\n", self.error_count, self.warning_count));

        output
    }

    /// Render all diagnostics with colored severities for terminal output
    pub fn report_colored(&self) -> String {
        let mut output = String::new();

        for diagnostic in &self.diagnostics {
            let severity = match diagnostic.severity {
                Severity::Error => "error".red().bold().to_string(),
                Severity::Warning => "warning".yellow().bold().to_string(),
                Severity::Note => "note".cyan().to_string(),
            };
            output.push_str(&format!("{}: ", severity));
            if let Some(context) = &diagnostic.context {
                output.push_str(&format!("'{}' : ", context));
            }
            output.push_str(&diagnostic.message);
            if let Some(span) = &diagnostic.span {
                output.push_str(&format!(" ({})", span));
            }
            output.push('\n');
        }

        output.push_str(&format!("{} error(s), {} warning(s) emitted\n", self.error_count, self.warning_count));

        output
    }
}
