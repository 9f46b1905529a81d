//! Scanner and preprocessor collaborator interfaces
//!
//! Lexical scanning and macro preprocessing happen outside this core. The
//! analyzer only needs the current token's text for error context and a
//! channel for pragma callbacks.

use crate::source_location::Span;

/// Provides the token under the grammar driver's cursor
pub trait TokenSource {
    /// Text of the current token, used as diagnostic context
    fn current_token(&self) -> &str;

    fn current_span(&self) -> Span;
}

/// Receives `#pragma` text forwarded by the preprocessor
pub trait PragmaHandler {
    fn handle_pragma(&mut self, span: &Span, tokens: &[String]);
}

/// A fixed token used when no scanner is attached (testing, library mode)
#[derive(Debug, Default)]
pub struct StaticToken {
    pub text: String,
    pub span: Span,
}

impl TokenSource for StaticToken {
    fn current_token(&self) -> &str {
        &self.text
    }

    fn current_span(&self) -> Span {
        self.span.clone()
    }
}
