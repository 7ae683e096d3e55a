//! OQL - a query language compiled for multiple backends.
//!
//! One statement is parsed once into an AST and translated into the native
//! representation of the chosen backend: a SQL string for the relational
//! dialects (PostgreSQL / MySQL / SQLite), an aggregation pipeline for
//! document stores (MongoDB-family), or a command descriptor for key-value
//! stores (Redis-family).
//!
//! ## Quick Start
//!
//! ```
//! use oql::{Registry, Target, TenantContext};
//!
//! let registry = Registry::new();
//! let ctx = TenantContext::default();
//!
//! let query = oql::parse("GET User WHERE age > 25 LIMIT 10", &registry)?;
//! let artifact = oql::translate(&query, Target::Postgres, &ctx, &registry)?;
//! # Ok::<(), oql::OqlError>(())
//! ```
//!
//! Or in one shot:
//!
//! ```
//! use oql::{Registry, Target, TenantContext};
//!
//! let registry = Registry::new();
//! let artifact = oql::run(
//!     "GET User WHERE age > 25",
//!     Target::Mongo,
//!     &TenantContext::default(),
//!     &registry,
//! )?;
//! # Ok::<(), oql::OqlError>(())
//! ```
//!
//! ## Pipeline
//!
//! Raw text → [`lexer::tokenize`] → token stream → [`parse::parse`] → AST →
//! [`translate::translate`] → backend artifact. All three stages are pure
//! functions over immutable input; the only shared state is the read-only
//! [`Registry`], safe to share across threads.

pub mod ast;
pub mod lexer;
pub mod parse;
pub mod registry;
pub mod token;
pub mod translate;

use thiserror::Error;

// ============ Primary Public API ============

pub use ast::Query;
pub use registry::Registry;
pub use translate::{BackendArtifact, Target, TenantContext};

/// Parse one OQL statement into its AST.
pub fn parse(text: &str, registry: &Registry) -> Result<Query, OqlError> {
    let tokens = lexer::tokenize(text, registry)?;
    Ok(parse::parse(tokens, registry)?)
}

/// Translate a parsed statement for the given backend. The AST is not
/// consumed; a failed translation can be retried against another target.
pub fn translate(
    query: &Query,
    target: Target,
    ctx: &TenantContext,
    registry: &Registry,
) -> Result<BackendArtifact, OqlError> {
    Ok(translate::translate(query, target, ctx, registry)?)
}

/// Parse and translate in one call.
pub fn run(
    text: &str,
    target: Target,
    ctx: &TenantContext,
    registry: &Registry,
) -> Result<BackendArtifact, OqlError> {
    let query = parse(text, registry)?;
    translate(&query, target, ctx, registry)
}

// ============ Errors ============

#[derive(Error, Debug)]
pub enum OqlError {
    #[error("Lex error: {0}")]
    Lex(#[from] lexer::LexError),
    #[error("Parse error: {0}")]
    Parse(#[from] parse::ParseError),
    #[error("Translate error: {0}")]
    Translate(#[from] translate::TranslateError),
}

pub use lexer::LexError;
pub use parse::ParseError;
pub use translate::TranslateError;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_produces_an_artifact_per_target() {
        let registry = Registry::new();
        let ctx = TenantContext::default();
        let text = "GET User WHERE id = 1";

        assert!(matches!(
            run(text, Target::Postgres, &ctx, &registry).unwrap(),
            BackendArtifact::Relational { .. }
        ));
        assert!(matches!(
            run(text, Target::Mongo, &ctx, &registry).unwrap(),
            BackendArtifact::DocumentPipeline { .. }
        ));
        assert!(matches!(
            run(text, Target::Redis, &ctx, &registry).unwrap(),
            BackendArtifact::KeyValue { .. }
        ));
    }

    #[test]
    fn errors_carry_their_stage() {
        let registry = Registry::new();
        let ctx = TenantContext::default();

        assert!(matches!(
            run("GET User WHERE name = 'unterminated", Target::Postgres, &ctx, &registry),
            Err(OqlError::Lex(_))
        ));
        assert!(matches!(
            run("GETT User", Target::Postgres, &ctx, &registry),
            Err(OqlError::Parse(_))
        ));
        assert!(matches!(
            run("SAVEPOINT sp", Target::Redis, &ctx, &registry),
            Err(OqlError::Translate(_))
        ));
    }
}
