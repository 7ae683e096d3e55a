//! Per-backend code generators.
//!
//! Each translator is a pure function from AST to a backend-native artifact;
//! one stateless tree-walk per call, no side effects on the input. A failed
//! translation leaves the AST valid for re-translation against another
//! backend.

mod keyvalue;
mod pipeline;
mod relational;

use log::debug;
use thiserror::Error;

use crate::ast::{Condition, Expr, Literal, Query};
use crate::registry::Registry;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranslateError {
    #[error("{operation} is not supported on {backend}")]
    Unsupported {
        operation: String,
        backend: &'static str,
    },
    #[error("{0}")]
    Invalid(String),
}

impl TranslateError {
    pub(crate) fn unsupported(operation: impl Into<String>, backend: &'static str) -> Self {
        TranslateError::Unsupported {
            operation: operation.into(),
            backend,
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        TranslateError::Invalid(message.into())
    }
}

/// Backend a statement is translated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Postgres,
    Mysql,
    Sqlite,
    Mongo,
    Redis,
}

impl Target {
    pub fn name(self) -> &'static str {
        match self {
            Target::Postgres => "postgres",
            Target::Mysql => "mysql",
            Target::Sqlite => "sqlite",
            Target::Mongo => "mongo",
            Target::Redis => "redis",
        }
    }
}

/// Per-call tenancy knobs: an optional schema qualifier for relational
/// targets and an optional key namespace prefix for key-value targets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TenantContext {
    pub schema: Option<String>,
    pub key_prefix: Option<String>,
}

/// The translator's output, tagged by backend family.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendArtifact {
    Relational {
        sql: String,
        /// Whether the caller should expect a row-set (vs an affected count).
        expects_rows: bool,
    },
    DocumentPipeline {
        collection: String,
        operation: String,
        stages: Vec<serde_json::Value>,
    },
    KeyValue {
        command: String,
        /// Exact key for point operations, `table:*`-style pattern for scans.
        key: String,
        args: Vec<String>,
        /// Conditions the client adapter must apply by scan-and-filter.
        residual_conditions: Vec<Condition>,
    },
}

/// Translate one parsed statement for the given backend.
pub fn translate(
    query: &Query,
    target: Target,
    ctx: &TenantContext,
    registry: &Registry,
) -> Result<BackendArtifact, TranslateError> {
    debug!(
        "translating {:?} statement for {}",
        query.family(),
        target.name()
    );

    match target {
        Target::Postgres | Target::Mysql | Target::Sqlite => {
            relational::translate(query, target, ctx)
        }
        Target::Mongo => pipeline::translate(query, ctx, registry),
        Target::Redis => keyvalue::translate(query, ctx, registry),
    }
}

// ============ Shared naming and literal helpers ============

/// Entity -> storage name: lowercased, pluralized with a trailing `s` unless
/// one is already there. `User` -> `users`, `Orders` -> `orders`.
pub(crate) fn table_name(entity: &str) -> String {
    let mut name = entity.to_ascii_lowercase();
    if !name.ends_with('s') {
        name.push('s');
    }
    name
}

/// Single-quoted SQL string with `''` doubling.
pub(crate) fn sql_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

pub(crate) fn literal_sql(lit: &Literal) -> String {
    match lit {
        Literal::Number(n) => n.clone(),
        Literal::String(s) => sql_quote(s),
        Literal::Bool(true) => "TRUE".to_string(),
        Literal::Bool(false) => "FALSE".to_string(),
        Literal::Null => "NULL".to_string(),
    }
}

/// A literal in a value position as JSON. Numbers keep integer-ness when the
/// raw text has no fraction or exponent.
pub(crate) fn literal_json(lit: &Literal) -> serde_json::Value {
    use serde_json::Value;
    match lit {
        Literal::Number(n) => {
            if let Ok(i) = n.parse::<i64>() {
                Value::from(i)
            } else if let Ok(f) = n.parse::<f64>() {
                Value::from(f)
            } else {
                Value::String(n.clone())
            }
        }
        Literal::String(s) => Value::String(s.clone()),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Null => Value::Null,
    }
}

/// A value-position expression as JSON. Bare identifiers on the value side
/// are unquoted string literals in the source (`status IN (active, pending)`),
/// so they resolve to strings here.
pub(crate) fn value_json(expr: &Expr) -> serde_json::Value {
    match expr {
        Expr::Literal(lit) => literal_json(lit),
        Expr::Field(name) => serde_json::Value::String(name.clone()),
        other => serde_json::Value::String(other.to_string()),
    }
}

/// A value-position expression as raw text, for key-value command arguments.
pub(crate) fn value_text(expr: &Expr) -> String {
    match expr {
        Expr::Literal(Literal::String(s)) => s.clone(),
        Expr::Literal(Literal::Number(n)) => n.clone(),
        Expr::Literal(Literal::Bool(b)) => b.to_string(),
        Expr::Literal(Literal::Null) => String::new(),
        Expr::Field(name) => name.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_naming_convention() {
        assert_eq!(table_name("User"), "users");
        assert_eq!(table_name("Orders"), "orders");
        assert_eq!(table_name("session"), "sessions");
    }

    #[test]
    fn sql_quoting_doubles_single_quotes() {
        assert_eq!(sql_quote("O'Brien"), "'O''Brien'");
    }

    #[test]
    fn literal_json_keeps_integerness() {
        assert_eq!(literal_json(&Literal::Number("25".into())), serde_json::json!(25));
        assert_eq!(literal_json(&Literal::Number("2.5".into())), serde_json::json!(2.5));
    }

    #[test]
    fn bare_identifier_values_become_strings() {
        assert_eq!(value_json(&Expr::field("active")), serde_json::json!("active"));
    }
}
