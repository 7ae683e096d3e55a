//! Key-value (Redis-family) command descriptors.
//!
//! There is no query language on this backend, so the output is a command
//! name plus a key (exact for point operations, a `table:*` pattern for
//! scans) and any residual conditions the client adapter must apply by
//! scanning matching keys and filtering client-side. Point lookups by exact
//! key are O(1); pattern-filtered reads cost O(matching keys) and carry no
//! snapshot guarantee under concurrent writes.

use crate::ast::{
    CompareOp, Condition, ConditionNode, DclOp, DclQuery, DdlKind, DdlQuery, MutationOp,
    MutationQuery, Query, SelectQuery, TclQuery,
};
use crate::registry::Registry;

use super::{table_name, value_text, BackendArtifact, TenantContext, TranslateError};

const BACKEND: &str = "redis";

pub(crate) fn translate(
    query: &Query,
    ctx: &TenantContext,
    registry: &Registry,
) -> Result<BackendArtifact, TranslateError> {
    match query {
        Query::Select(q) => select_command(q, ctx, registry),
        Query::Compound(q) => Err(TranslateError::unsupported(q.kind.as_sql(), BACKEND)),
        Query::Mutation(q) => mutation_command(q, ctx, registry),
        Query::Ddl(q) => ddl_command(q, ctx, registry),
        Query::Tcl(q) => tcl_command(q, registry),
        Query::Dcl(q) => dcl_command(q, registry),
    }
}

fn artifact(
    command: &str,
    key: String,
    args: Vec<String>,
    residual_conditions: Vec<Condition>,
) -> BackendArtifact {
    BackendArtifact::KeyValue {
        command: command.to_string(),
        key,
        args,
        residual_conditions,
    }
}

// ============ Keys ============

fn entity_key(ctx: &TenantContext, entity: &str, id: &str) -> String {
    let table = table_name(entity);
    match &ctx.key_prefix {
        Some(prefix) => format!("{prefix}:{table}:{id}"),
        None => format!("{table}:{id}"),
    }
}

fn scan_pattern(ctx: &TenantContext, entity: &str) -> String {
    entity_key(ctx, entity, "*")
}

fn prefixed(ctx: &TenantContext, pattern: &str) -> String {
    match &ctx.key_prefix {
        Some(prefix) => format!("{prefix}:{pattern}"),
        None => pattern.to_string(),
    }
}

/// The id value when the condition list is exactly one `id = <value>` leaf.
fn point_lookup(conditions: &[Condition]) -> Option<String> {
    let [cond] = conditions else { return None };
    let ConditionNode::Compare(cmp) = &cond.node else {
        return None;
    };
    if cmp.op != CompareOp::Eq || cmp.field.as_field() != Some("id") {
        return None;
    }
    cmp.value.as_ref().map(value_text)
}

// ============ Reads ============

fn select_command(
    q: &SelectQuery,
    ctx: &TenantContext,
    registry: &Registry,
) -> Result<BackendArtifact, TranslateError> {
    if !q.joins.is_empty() {
        return Err(TranslateError::unsupported("JOIN", BACKEND));
    }
    if q.aggregate.is_some() || !q.group_by.is_empty() || !q.having.is_empty() {
        return Err(TranslateError::unsupported("aggregation", BACKEND));
    }
    if !q.windows.is_empty() {
        return Err(TranslateError::unsupported("window functions", BACKEND));
    }
    if q.distinct.is_some() {
        return Err(TranslateError::unsupported("DISTINCT", BACKEND));
    }

    let command = registry
        .keyvalue_command(crate::registry::Operation::Get)
        .unwrap_or("HGETALL");

    if let Some(id) = point_lookup(&q.conditions) {
        return Ok(artifact(
            command,
            entity_key(ctx, &q.entity, &id),
            vec![],
            vec![],
        ));
    }

    // Pattern read: the adapter scans matching keys and applies the
    // residual conditions client-side.
    let pattern = match &q.like_pattern {
        Some(p) => prefixed(ctx, p),
        None => scan_pattern(ctx, &q.entity),
    };
    Ok(artifact("SCAN", pattern, vec![], q.conditions.clone()))
}

// ============ Writes ============

fn assignment_args(q: &MutationQuery) -> Vec<String> {
    let mut args = Vec::with_capacity(q.assignments.len() * 2);
    for a in &q.assignments {
        args.push(a.field.clone());
        args.push(value_text(&a.value));
    }
    args
}

fn assigned_id(q: &MutationQuery) -> Result<String, TranslateError> {
    q.assignments
        .iter()
        .find(|a| a.field == "id")
        .map(|a| value_text(&a.value))
        .ok_or_else(|| {
            TranslateError::invalid(format!(
                "{} on redis requires an id assignment",
                q.op.operation().keyword()
            ))
        })
}

fn mutation_command(
    q: &MutationQuery,
    ctx: &TenantContext,
    registry: &Registry,
) -> Result<BackendArtifact, TranslateError> {
    let command = registry
        .keyvalue_command(q.op.operation())
        .ok_or_else(|| TranslateError::unsupported(q.op.operation().keyword(), BACKEND))?;

    match q.op {
        MutationOp::Create | MutationOp::Upsert | MutationOp::Replace => {
            let id = assigned_id(q)?;
            Ok(artifact(
                command,
                entity_key(ctx, &q.entity, &id),
                assignment_args(q),
                vec![],
            ))
        }
        MutationOp::Update => {
            let Some(id) = point_lookup(&q.conditions) else {
                return Err(TranslateError::invalid(
                    "UPDATE on redis requires an id equality condition",
                ));
            };
            Ok(artifact(
                command,
                entity_key(ctx, &q.entity, &id),
                assignment_args(q),
                vec![],
            ))
        }
        MutationOp::Delete => {
            if let Some(id) = point_lookup(&q.conditions) {
                return Ok(artifact(command, entity_key(ctx, &q.entity, &id), vec![], vec![]));
            }
            // Pattern delete; any remaining conditions filter client-side.
            Ok(artifact(
                command,
                scan_pattern(ctx, &q.entity),
                vec![],
                q.conditions.clone(),
            ))
        }
        MutationOp::BulkInsert => Err(TranslateError::unsupported("BULK INSERT", BACKEND)),
    }
}

// ============ DDL / TCL / DCL ============

fn ddl_command(
    q: &DdlQuery,
    ctx: &TenantContext,
    registry: &Registry,
) -> Result<BackendArtifact, TranslateError> {
    let command = registry
        .keyvalue_command(q.kind.operation())
        .ok_or_else(|| TranslateError::unsupported(q.kind.operation().keyword(), BACKEND))?;

    match &q.kind {
        DdlKind::DropTable { entity, .. } | DdlKind::Truncate { entity } => {
            Ok(artifact(command, scan_pattern(ctx, entity), vec![], vec![]))
        }
        _ => Err(TranslateError::unsupported(
            q.kind.operation().keyword(),
            BACKEND,
        )),
    }
}

fn tcl_command(q: &TclQuery, registry: &Registry) -> Result<BackendArtifact, TranslateError> {
    let command = registry
        .keyvalue_command(q.op.operation())
        .ok_or_else(|| TranslateError::unsupported(q.op.operation().keyword(), BACKEND))?;
    Ok(artifact(command, String::new(), vec![], vec![]))
}

fn dcl_command(q: &DclQuery, registry: &Registry) -> Result<BackendArtifact, TranslateError> {
    let command = registry
        .keyvalue_command(q.op.operation())
        .ok_or_else(|| TranslateError::unsupported(q.op.operation().keyword(), BACKEND))?;

    let user = q.users.first().cloned().unwrap_or_default();
    let args = match q.op {
        DclOp::CreateUser | DclOp::AlterUser => {
            let mut args = vec![user, "on".to_string()];
            if let Some(p) = &q.password {
                args.push(format!(">{p}"));
            }
            args
        }
        DclOp::DropUser => vec![user],
        DclOp::Grant => {
            let mut args = vec![user];
            args.extend(q.permissions.iter().map(|p| format!("+{}", p.to_ascii_lowercase())));
            args
        }
        DclOp::Revoke => {
            let mut args = vec![user];
            args.extend(q.permissions.iter().map(|p| format!("-{}", p.to_ascii_lowercase())));
            args
        }
        _ => {
            return Err(TranslateError::unsupported(
                q.op.operation().keyword(),
                BACKEND,
            ));
        }
    };

    Ok(artifact(command, String::new(), args, vec![]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::registry::Registry;

    fn command(text: &str) -> (String, String, Vec<String>, Vec<Condition>) {
        command_with(text, &TenantContext::default())
    }

    fn command_with(
        text: &str,
        ctx: &TenantContext,
    ) -> (String, String, Vec<String>, Vec<Condition>) {
        let reg = Registry::new();
        let tokens = tokenize(text, &reg).unwrap();
        let query = crate::parse::parse(tokens, &reg).unwrap();
        match translate(&query, ctx, &reg).unwrap() {
            BackendArtifact::KeyValue {
                command,
                key,
                args,
                residual_conditions,
            } => (command, key, args, residual_conditions),
            other => panic!("expected key-value artifact, got {other:?}"),
        }
    }

    fn err(text: &str) -> TranslateError {
        let reg = Registry::new();
        let tokens = tokenize(text, &reg).unwrap();
        let query = crate::parse::parse(tokens, &reg).unwrap();
        translate(&query, &TenantContext::default(), &reg).unwrap_err()
    }

    #[test]
    fn id_equality_is_a_point_lookup() {
        let (command, key, args, residual) = command("GET User WHERE id = 42");
        assert_eq!(command, "HGETALL");
        assert_eq!(key, "users:42");
        assert!(args.is_empty());
        assert!(residual.is_empty());
    }

    #[test]
    fn tenant_prefix_namespaces_keys() {
        let ctx = TenantContext {
            schema: None,
            key_prefix: Some("tenant_a".to_string()),
        };
        let (_, key, _, _) = command_with("GET User WHERE id = 42", &ctx);
        assert_eq!(key, "tenant_a:users:42");
    }

    #[test]
    fn bulk_insert_is_unsupported() {
        let e = err("BULK INSERT User (name, age) VALUES ('Ada', 36)");
        assert!(e.to_string().contains("BULK INSERT"), "{e}");
    }

    #[test]
    fn filtered_reads_scan_with_residual_conditions() {
        let (command, key, _, residual) = command("GET User WHERE age > 25");
        assert_eq!(command, "SCAN");
        assert_eq!(key, "users:*");
        assert_eq!(residual.len(), 1);
    }

    #[test]
    fn like_clause_overrides_the_scan_pattern() {
        let (command, key, _, residual) = command("GET Session LIKE 'sess:*'");
        assert_eq!(command, "SCAN");
        assert_eq!(key, "sess:*");
        assert!(residual.is_empty());
    }

    #[test]
    fn create_writes_a_hash() {
        let (command, key, args, _) = command("CREATE User id = 7, name = 'Ada'");
        assert_eq!(command, "HSET");
        assert_eq!(key, "users:7");
        assert_eq!(args, vec!["id", "7", "name", "Ada"]);
    }

    #[test]
    fn create_without_id_is_rejected() {
        assert!(matches!(
            err("CREATE User name = 'Ada'"),
            TranslateError::Invalid(_)
        ));
    }

    #[test]
    fn delete_by_id_and_by_pattern() {
        let (command, key, _, residual) = command("DELETE User WHERE id = 7");
        assert_eq!(command, "DEL");
        assert_eq!(key, "users:7");
        assert!(residual.is_empty());

        let (command, key, _, residual) = self::command("DELETE User WHERE age > 90");
        assert_eq!(command, "DEL");
        assert_eq!(key, "users:*");
        assert_eq!(residual.len(), 1);
    }

    #[test]
    fn transactions_map_to_multi_exec_discard() {
        assert_eq!(command("BEGIN").0, "MULTI");
        assert_eq!(command("COMMIT").0, "EXEC");
        assert_eq!(command("ROLLBACK").0, "DISCARD");
    }

    #[test]
    fn savepoint_errors_name_the_operation() {
        let err = err("SAVEPOINT before_update");
        assert!(
            matches!(err, TranslateError::Unsupported { ref operation, .. } if operation == "SAVEPOINT"),
            "{err}"
        );
    }

    #[test]
    fn acl_commands() {
        let (command, _, args, _) = command("CREATE USER alice PASSWORD 's3cret'");
        assert_eq!(command, "ACL SETUSER");
        assert_eq!(args, vec!["alice", "on", ">s3cret"]);

        let (command, _, args, _) = self::command("GRANT SELECT ON User TO alice");
        assert_eq!(command, "ACL SETUSER");
        assert_eq!(args, vec!["alice", "+select"]);

        let (command, _, args, _) = self::command("DROP USER alice");
        assert_eq!(command, "ACL DELUSER");
        assert_eq!(args, vec!["alice"]);
    }

    #[test]
    fn joins_and_aggregates_are_unsupported() {
        assert!(matches!(
            err("GET User JOIN Orders ON id = user_id"),
            TranslateError::Unsupported { .. }
        ));
        assert!(matches!(
            err("GET Sales SUM amount"),
            TranslateError::Unsupported { .. }
        ));
    }
}
