//! SQL generation for the relational targets (PostgreSQL, MySQL, SQLite).
//!
//! One statement in, one SQL string out. Dialect differences are resolved
//! here at emission time (`ON CONFLICT` vs `ON DUPLICATE KEY`, `TRUNCATE`
//! availability, PostgreSQL-only DDL), never earlier in the pipeline.

use crate::ast::{
    AlterAction, Assignment, ColumnDef, CompareOp, Comparison, Condition, ConditionNode,
    DclOp, DclQuery, DdlKind, DdlQuery, Expr, MutationOp, MutationQuery, Query, SelectQuery,
    TclOp, TclQuery, WindowFunc,
};

use super::{literal_sql, sql_quote, table_name, BackendArtifact, Target, TenantContext, TranslateError};

pub(crate) fn translate(
    query: &Query,
    target: Target,
    ctx: &TenantContext,
) -> Result<BackendArtifact, TranslateError> {
    let sql = emit(query, target, ctx)?;
    let expects_rows = matches!(query, Query::Select(_) | Query::Compound(_));
    Ok(BackendArtifact::Relational { sql, expects_rows })
}

fn emit(query: &Query, target: Target, ctx: &TenantContext) -> Result<String, TranslateError> {
    match query {
        Query::Select(q) => select_sql(q, ctx),
        Query::Compound(q) => Ok(format!(
            "{} {} {}",
            emit(&q.left, target, ctx)?,
            q.kind.as_sql(),
            emit(&q.right, target, ctx)?
        )),
        Query::Mutation(q) => mutation_sql(q, target, ctx),
        Query::Ddl(q) => ddl_sql(q, target, ctx),
        Query::Tcl(q) => tcl_sql(q, target),
        Query::Dcl(q) => dcl_sql(q, target, ctx),
    }
}

fn qualified(ctx: &TenantContext, entity: &str) -> String {
    let table = table_name(entity);
    match &ctx.schema {
        Some(schema) => format!("{schema}.{table}"),
        None => table,
    }
}

// ============ Expressions and conditions ============

/// A field-position expression: identifiers are column references.
fn expr_sql(expr: &Expr) -> String {
    match expr {
        Expr::Field(name) => name.clone(),
        Expr::Literal(lit) => literal_sql(lit),
        Expr::Wildcard => "*".to_string(),
        Expr::Binary { left, op, right } => {
            format!("({} {} {})", expr_sql(left), op.symbol(), expr_sql(right))
        }
        Expr::Function { name, args } => {
            let args: Vec<String> = args.iter().map(expr_sql).collect();
            format!("{name}({})", args.join(", "))
        }
        Expr::CaseWhen {
            branches,
            otherwise,
        } => {
            let mut out = String::from("CASE");
            for branch in branches {
                out.push_str(&format!(
                    " WHEN {} THEN {}",
                    conditions_sql(&branch.when, None),
                    expr_sql(&branch.then)
                ));
            }
            if let Some(e) = otherwise {
                out.push_str(&format!(" ELSE {}", expr_sql(e)));
            }
            out.push_str(" END");
            out
        }
    }
}

/// A value-position expression: a *lone* bare identifier is an unquoted
/// string literal in the source, so it renders quoted. Identifiers inside
/// arithmetic stay column references (`age = age + 1`).
fn value_sql(expr: &Expr) -> String {
    match expr {
        Expr::Field(name) => sql_quote(name),
        Expr::Literal(lit) => literal_sql(lit),
        other => expr_sql(other),
    }
}

/// Render a condition list. `result_expr` substitutes the synthetic `result`
/// field of HAVING clauses with the real aggregate expression.
fn conditions_sql(conditions: &[Condition], result_expr: Option<&str>) -> String {
    let mut out = String::new();
    for (i, cond) in conditions.iter().enumerate() {
        if i > 0 {
            out.push_str(match cond.logic {
                crate::ast::Logic::Or => " OR ",
                _ => " AND ",
            });
        }
        match &cond.node {
            ConditionNode::Group(children) => {
                out.push_str(&format!("({})", conditions_sql(children, result_expr)));
            }
            ConditionNode::Compare(cmp) => out.push_str(&comparison_sql(cmp, result_expr)),
        }
    }
    out
}

fn comparison_sql(cmp: &Comparison, result_expr: Option<&str>) -> String {
    let field = match (result_expr, cmp.field.as_field()) {
        (Some(agg), Some("result")) => agg.to_string(),
        _ => expr_sql(&cmp.field),
    };
    let op = cmp.op.as_sql();

    match cmp.op {
        CompareOp::IsNull | CompareOp::IsNotNull => format!("{field} {op}"),
        CompareOp::Between | CompareOp::NotBetween => {
            let lo = cmp.value.as_ref().map(value_sql).unwrap_or_default();
            let hi = cmp.value2.as_ref().map(value_sql).unwrap_or_default();
            format!("{field} {op} {lo} AND {hi}")
        }
        CompareOp::In | CompareOp::NotIn => {
            let values: Vec<String> = cmp.values.iter().map(value_sql).collect();
            format!("{field} {op} ({})", values.join(", "))
        }
        _ => {
            let value = cmp.value.as_ref().map(value_sql).unwrap_or_default();
            format!("{field} {op} {value}")
        }
    }
}

// ============ SELECT ============

fn aggregate_sql(q: &SelectQuery) -> Option<String> {
    q.aggregate.as_ref().map(|agg| {
        let inner = match &agg.field {
            Some(f) if agg.distinct => format!("DISTINCT {f}"),
            Some(f) => f.clone(),
            None => "*".to_string(),
        };
        format!("{}({inner})", agg.func.as_sql())
    })
}

fn window_sql(w: &WindowFunc) -> String {
    let args = match (&w.field, w.offset, w.buckets) {
        (_, _, Some(buckets)) => buckets.to_string(),
        (Some(field), Some(offset), _) => format!("{field}, {offset}"),
        (Some(field), None, _) => field.clone(),
        _ => String::new(),
    };

    let mut spec = String::new();
    if !w.partition_by.is_empty() {
        spec.push_str(&format!("PARTITION BY {}", w.partition_by.join(", ")));
    }
    if !w.order_by.is_empty() {
        if !spec.is_empty() {
            spec.push(' ');
        }
        spec.push_str(&format!("ORDER BY {}", order_by_sql(&w.order_by)));
    }

    let alias = w.alias.as_deref().unwrap_or(w.func.default_alias());
    format!("{}({args}) OVER ({spec}) AS {alias}", w.func.as_sql())
}

fn order_by_sql(order_by: &[crate::ast::OrderBy]) -> String {
    order_by
        .iter()
        .map(|o| {
            if o.descending {
                format!("{} DESC", o.field)
            } else {
                o.field.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn select_sql(q: &SelectQuery, ctx: &TenantContext) -> Result<String, TranslateError> {
    if q.like_pattern.is_some() {
        return Err(TranslateError::invalid(
            "LIKE key-pattern clause has no relational mapping; use a WHERE ... LIKE condition",
        ));
    }

    let mut items: Vec<String> = Vec::new();
    if let Some(agg) = aggregate_sql(q) {
        items.push(format!("{agg} AS result"));
    } else if !q.columns.is_empty() {
        items.extend(q.columns.iter().map(expr_sql));
    } else if let Some(distinct) = &q.distinct {
        items.extend(distinct.columns.iter().cloned());
    }
    for p in &q.projections {
        match &p.alias {
            Some(alias) => items.push(format!("{} AS {alias}", expr_sql(&p.expr))),
            None => items.push(expr_sql(&p.expr)),
        }
    }
    let windows_only = items.is_empty() && !q.windows.is_empty();
    if windows_only {
        items.push("*".to_string());
    }
    items.extend(q.windows.iter().map(window_sql));
    if items.is_empty() {
        items.push("*".to_string());
    }

    let distinct_kw = if q.distinct.is_some() && q.aggregate.is_none() {
        "DISTINCT "
    } else {
        ""
    };

    let mut sql = format!(
        "SELECT {distinct_kw}{} FROM {}",
        items.join(", "),
        qualified(ctx, &q.entity)
    );

    for join in &q.joins {
        sql.push_str(&format!(
            " {} {} ON {} = {}",
            join.kind.as_sql(),
            qualified(ctx, &join.entity),
            join.left_field,
            join.right_field
        ));
    }

    if !q.conditions.is_empty() {
        sql.push_str(&format!(" WHERE {}", conditions_sql(&q.conditions, None)));
    }
    if !q.group_by.is_empty() {
        let fields: Vec<String> = q.group_by.iter().map(expr_sql).collect();
        sql.push_str(&format!(" GROUP BY {}", fields.join(", ")));
    }
    if !q.having.is_empty() {
        let agg = aggregate_sql(q);
        sql.push_str(&format!(
            " HAVING {}",
            conditions_sql(&q.having, agg.as_deref())
        ));
    }
    if !q.order_by.is_empty() {
        sql.push_str(&format!(" ORDER BY {}", order_by_sql(&q.order_by)));
    }
    if let Some(limit) = q.limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    if let Some(offset) = q.offset {
        sql.push_str(&format!(" OFFSET {offset}"));
    }
    Ok(sql)
}

// ============ Writes ============

fn assignments_sql(assignments: &[Assignment]) -> String {
    assignments
        .iter()
        .map(|a| format!("{} = {}", a.field, value_sql(&a.value)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn insert_parts(assignments: &[Assignment]) -> (String, String) {
    let fields: Vec<&str> = assignments.iter().map(|a| a.field.as_str()).collect();
    let values: Vec<String> = assignments.iter().map(|a| value_sql(&a.value)).collect();
    (fields.join(", "), values.join(", "))
}

fn mutation_sql(
    q: &MutationQuery,
    target: Target,
    ctx: &TenantContext,
) -> Result<String, TranslateError> {
    let table = qualified(ctx, &q.entity);
    let where_sql = if q.conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions_sql(&q.conditions, None))
    };

    match q.op {
        MutationOp::Create => {
            let (fields, values) = insert_parts(&q.assignments);
            Ok(format!("INSERT INTO {table} ({fields}) VALUES ({values})"))
        }
        MutationOp::Update => Ok(format!(
            "UPDATE {table} SET {}{where_sql}",
            assignments_sql(&q.assignments)
        )),
        MutationOp::Delete => Ok(format!("DELETE FROM {table}{where_sql}")),
        MutationOp::Replace => {
            let (fields, values) = insert_parts(&q.assignments);
            match target {
                Target::Mysql => Ok(format!("REPLACE INTO {table} ({fields}) VALUES ({values})")),
                Target::Sqlite => Ok(format!(
                    "INSERT OR REPLACE INTO {table} ({fields}) VALUES ({values})"
                )),
                _ => {
                    // Postgres has no REPLACE; emulate with an id-keyed
                    // upsert that re-asserts every assigned column.
                    let updates = q
                        .assignments
                        .iter()
                        .map(|a| format!("{} = EXCLUDED.{}", a.field, a.field))
                        .collect::<Vec<_>>()
                        .join(", ");
                    Ok(format!(
                        "INSERT INTO {table} ({fields}) VALUES ({values}) \
                         ON CONFLICT (id) DO UPDATE SET {updates}"
                    ))
                }
            }
        }
        MutationOp::Upsert => upsert_sql(q, target, &table),
        MutationOp::BulkInsert => {
            let rows: Vec<String> = q
                .rows
                .iter()
                .map(|row| {
                    let values: Vec<String> = row.iter().map(value_sql).collect();
                    format!("({})", values.join(", "))
                })
                .collect();
            Ok(format!(
                "INSERT INTO {table} ({}) VALUES {}",
                q.columns.join(", "),
                rows.join(", ")
            ))
        }
    }
}

fn upsert_sql(q: &MutationQuery, target: Target, table: &str) -> Result<String, TranslateError> {
    let (fields, values) = insert_parts(&q.assignments);
    let insert = format!("INSERT INTO {table} ({fields}) VALUES ({values})");

    match target {
        Target::Mysql => {
            // No conflict target needed; fall back to re-asserting the
            // inserted values when no explicit UPDATE list was given.
            let updates = match &q.conflict {
                Some(c) if !c.update.is_empty() => assignments_sql(&c.update),
                _ => q
                    .assignments
                    .iter()
                    .map(|a| format!("{} = VALUES({})", a.field, a.field))
                    .collect::<Vec<_>>()
                    .join(", "),
            };
            Ok(format!("{insert} ON DUPLICATE KEY UPDATE {updates}"))
        }
        _ => {
            let Some(conflict) = &q.conflict else {
                return Err(TranslateError::invalid(format!(
                    "UPSERT on {} requires an ON CONFLICT column list",
                    target.name()
                )));
            };
            let action = if conflict.update.is_empty() {
                "DO NOTHING".to_string()
            } else {
                format!("DO UPDATE SET {}", assignments_sql(&conflict.update))
            };
            Ok(format!(
                "{insert} ON CONFLICT ({}) {action}",
                conflict.targets.join(", ")
            ))
        }
    }
}

// ============ DDL ============

fn constraint_sql(constraint: &str, target: Target) -> String {
    match constraint {
        "primary" => "PRIMARY KEY".to_string(),
        "notnull" => "NOT NULL".to_string(),
        "unique" => "UNIQUE".to_string(),
        "autoincrement" => match target {
            Target::Postgres => "GENERATED ALWAYS AS IDENTITY".to_string(),
            Target::Mysql => "AUTO_INCREMENT".to_string(),
            _ => "AUTOINCREMENT".to_string(),
        },
        other => other.to_ascii_uppercase(),
    }
}

fn column_sql(def: &ColumnDef, target: Target) -> String {
    let mut out = format!("{} {}", def.name, def.data_type);
    for c in &def.constraints {
        out.push(' ');
        out.push_str(&constraint_sql(c, target));
    }
    out
}

fn pg_only(kind: &DdlKind, target: Target) -> Result<(), TranslateError> {
    if target == Target::Postgres {
        Ok(())
    } else {
        Err(TranslateError::unsupported(
            kind.operation().keyword(),
            target.name(),
        ))
    }
}

fn ddl_sql(q: &DdlQuery, target: Target, ctx: &TenantContext) -> Result<String, TranslateError> {
    let kind = &q.kind;
    match kind {
        DdlKind::CreateTable { entity, columns } => {
            let cols: Vec<String> = columns.iter().map(|c| column_sql(c, target)).collect();
            Ok(format!(
                "CREATE TABLE {} ({})",
                qualified(ctx, entity),
                cols.join(", ")
            ))
        }
        DdlKind::AlterTable { entity, action } => {
            let table = qualified(ctx, entity);
            match action {
                AlterAction::AddColumn(def) => Ok(format!(
                    "ALTER TABLE {table} ADD COLUMN {}",
                    column_sql(def, target)
                )),
                AlterAction::DropColumn(name) => {
                    Ok(format!("ALTER TABLE {table} DROP COLUMN {name}"))
                }
                AlterAction::RenameColumn { from, to } => Ok(format!(
                    "ALTER TABLE {table} RENAME COLUMN {from} TO {to}"
                )),
                AlterAction::ModifyColumn(def) => match target {
                    Target::Postgres => Ok(format!(
                        "ALTER TABLE {table} ALTER COLUMN {} TYPE {}",
                        def.name, def.data_type
                    )),
                    Target::Mysql => Ok(format!(
                        "ALTER TABLE {table} MODIFY COLUMN {}",
                        column_sql(def, target)
                    )),
                    _ => Err(TranslateError::unsupported(
                        "ALTER TABLE MODIFY",
                        target.name(),
                    )),
                },
            }
        }
        DdlKind::DropTable { entity, cascade } => {
            let mut sql = format!("DROP TABLE {}", qualified(ctx, entity));
            if *cascade && target != Target::Sqlite {
                sql.push_str(" CASCADE");
            }
            Ok(sql)
        }
        DdlKind::RenameTable { from, to } => Ok(format!(
            "ALTER TABLE {} RENAME TO {}",
            qualified(ctx, from),
            table_name(to)
        )),
        DdlKind::Truncate { entity } => {
            let table = qualified(ctx, entity);
            // SQLite has no TRUNCATE; an unqualified DELETE is its idiom.
            if target == Target::Sqlite {
                Ok(format!("DELETE FROM {table}"))
            } else {
                Ok(format!("TRUNCATE TABLE {table}"))
            }
        }
        DdlKind::CreateIndex {
            name,
            entity,
            columns,
            unique,
        } => {
            let unique_kw = if *unique { "UNIQUE " } else { "" };
            Ok(format!(
                "CREATE {unique_kw}INDEX {name} ON {} ({})",
                qualified(ctx, entity),
                columns.join(", ")
            ))
        }
        DdlKind::DropIndex { name } => {
            if target == Target::Mysql {
                return Err(TranslateError::invalid(
                    "DROP INDEX on mysql requires the owning table name",
                ));
            }
            Ok(format!("DROP INDEX {name}"))
        }
        DdlKind::CreateDatabase { name } => match target {
            Target::Sqlite => Err(TranslateError::unsupported("CREATE DATABASE", "sqlite")),
            _ => Ok(format!("CREATE DATABASE {name}")),
        },
        DdlKind::DropDatabase { name } => match target {
            Target::Sqlite => Err(TranslateError::unsupported("DROP DATABASE", "sqlite")),
            _ => Ok(format!("DROP DATABASE {name}")),
        },
        DdlKind::CreateView { name, query } => Ok(format!(
            "CREATE VIEW {name} AS {}",
            emit(query, target, ctx)?
        )),
        DdlKind::AlterView { name, query } => {
            let body = emit(query, target, ctx)?;
            match target {
                Target::Postgres => Ok(format!("CREATE OR REPLACE VIEW {name} AS {body}")),
                Target::Mysql => Ok(format!("ALTER VIEW {name} AS {body}")),
                _ => Err(TranslateError::unsupported("ALTER VIEW", target.name())),
            }
        }
        DdlKind::DropView { name } => Ok(format!("DROP VIEW {name}")),
        DdlKind::CreateSequence { name, attrs } => {
            pg_only(kind, target)?;
            let mut sql = format!("CREATE SEQUENCE {name}");
            if let Some(v) = attrs.start {
                sql.push_str(&format!(" START WITH {v}"));
            }
            if let Some(v) = attrs.increment {
                sql.push_str(&format!(" INCREMENT BY {v}"));
            }
            if let Some(v) = attrs.min_value {
                sql.push_str(&format!(" MINVALUE {v}"));
            }
            if let Some(v) = attrs.max_value {
                sql.push_str(&format!(" MAXVALUE {v}"));
            }
            if let Some(cycle) = attrs.cycle {
                sql.push_str(if cycle { " CYCLE" } else { " NO CYCLE" });
            }
            Ok(sql)
        }
        DdlKind::AlterSequence { name, attrs } => {
            pg_only(kind, target)?;
            let mut sql = format!("ALTER SEQUENCE {name}");
            if let Some(v) = attrs.restart {
                sql.push_str(&format!(" RESTART WITH {v}"));
            }
            if let Some(v) = attrs.increment {
                sql.push_str(&format!(" INCREMENT BY {v}"));
            }
            Ok(sql)
        }
        DdlKind::DropSequence { name } => {
            pg_only(kind, target)?;
            Ok(format!("DROP SEQUENCE {name}"))
        }
        DdlKind::CreateExtension {
            name,
            version,
            schema,
        } => {
            pg_only(kind, target)?;
            let mut sql = format!("CREATE EXTENSION {name}");
            if let Some(v) = version {
                sql.push_str(&format!(" VERSION {}", sql_quote(v)));
            }
            if let Some(s) = schema {
                sql.push_str(&format!(" SCHEMA {s}"));
            }
            Ok(sql)
        }
        DdlKind::DropExtension { name } => {
            pg_only(kind, target)?;
            Ok(format!("DROP EXTENSION {name}"))
        }
        DdlKind::CreateSchema {
            name,
            authorization,
        } => match target {
            Target::Sqlite => Err(TranslateError::unsupported("CREATE SCHEMA", "sqlite")),
            _ => {
                let mut sql = format!("CREATE SCHEMA {name}");
                if let Some(owner) = authorization {
                    if target == Target::Postgres {
                        sql.push_str(&format!(" AUTHORIZATION {owner}"));
                    }
                }
                Ok(sql)
            }
        },
        DdlKind::DropSchema { name, cascade } => match target {
            Target::Sqlite => Err(TranslateError::unsupported("DROP SCHEMA", "sqlite")),
            _ => {
                let mut sql = format!("DROP SCHEMA {name}");
                if *cascade {
                    sql.push_str(" CASCADE");
                }
                Ok(sql)
            }
        },
        DdlKind::CreateType { name, values } => {
            pg_only(kind, target)?;
            let values: Vec<String> = values.iter().map(|v| sql_quote(v)).collect();
            Ok(format!(
                "CREATE TYPE {name} AS ENUM ({})",
                values.join(", ")
            ))
        }
        DdlKind::DropType { name } => {
            pg_only(kind, target)?;
            Ok(format!("DROP TYPE {name}"))
        }
        DdlKind::CreateDomain { name, attrs } => {
            pg_only(kind, target)?;
            let data_type = attrs.data_type.as_deref().ok_or_else(|| {
                TranslateError::invalid("CREATE DOMAIN requires a 'type:' attribute")
            })?;
            let mut sql = format!("CREATE DOMAIN {name} AS {data_type}");
            if let Some(default) = &attrs.default {
                sql.push_str(&format!(" DEFAULT {default}"));
            }
            if attrs.not_null {
                sql.push_str(" NOT NULL");
            }
            if let Some(check) = &attrs.check {
                sql.push_str(&format!(" CHECK ({check})"));
            }
            Ok(sql)
        }
        DdlKind::AlterDomain { name, attrs } => {
            pg_only(kind, target)?;
            let mut sql = format!("ALTER DOMAIN {name}");
            if let Some(default) = &attrs.default {
                sql.push_str(&format!(" SET DEFAULT {default}"));
            } else if attrs.not_null {
                sql.push_str(" SET NOT NULL");
            }
            Ok(sql)
        }
        DdlKind::DropDomain { name } => {
            pg_only(kind, target)?;
            Ok(format!("DROP DOMAIN {name}"))
        }
        DdlKind::CreateFunction {
            name,
            returns,
            language,
            body,
        } => {
            pg_only(kind, target)?;
            Ok(format!(
                "CREATE FUNCTION {name}() RETURNS {} LANGUAGE {} AS $${body}$$",
                returns.as_deref().unwrap_or("void"),
                language.as_deref().unwrap_or("sql")
            ))
        }
        DdlKind::DropFunction { name } => {
            pg_only(kind, target)?;
            Ok(format!("DROP FUNCTION {name}"))
        }
        DdlKind::CreateTrigger {
            name,
            table,
            timing,
            event,
            function,
        } => {
            pg_only(kind, target)?;
            Ok(format!(
                "CREATE TRIGGER {name} {} {} ON {} FOR EACH ROW EXECUTE FUNCTION {function}()",
                timing.to_ascii_uppercase(),
                event.to_ascii_uppercase(),
                qualified(ctx, table)
            ))
        }
        DdlKind::DropTrigger { name, table } => {
            pg_only(kind, target)?;
            Ok(format!("DROP TRIGGER {name} ON {}", qualified(ctx, table)))
        }
        DdlKind::CreatePolicy {
            name,
            table,
            for_op,
            to_role,
            using,
        } => {
            pg_only(kind, target)?;
            let mut sql = format!("CREATE POLICY {name} ON {}", qualified(ctx, table));
            if let Some(op) = for_op {
                sql.push_str(&format!(" FOR {}", op.to_ascii_uppercase()));
            }
            if let Some(role) = to_role {
                sql.push_str(&format!(" TO {role}"));
            }
            if let Some(predicate) = using {
                sql.push_str(&format!(" USING ({predicate})"));
            }
            Ok(sql)
        }
        DdlKind::DropPolicy { name, table } => {
            pg_only(kind, target)?;
            Ok(format!("DROP POLICY {name} ON {}", qualified(ctx, table)))
        }
        DdlKind::CreateRule {
            name,
            table,
            event,
            action,
        } => {
            pg_only(kind, target)?;
            Ok(format!(
                "CREATE RULE {name} AS ON {} TO {} DO {action}",
                event.to_ascii_uppercase(),
                qualified(ctx, table)
            ))
        }
        DdlKind::DropRule { name, table } => {
            pg_only(kind, target)?;
            Ok(format!("DROP RULE {name} ON {}", qualified(ctx, table)))
        }
        DdlKind::CommentOn {
            object_kind,
            name,
            comment,
        } => {
            pg_only(kind, target)?;
            Ok(format!(
                "COMMENT ON {} {name} IS {}",
                object_kind.to_ascii_uppercase(),
                sql_quote(comment)
            ))
        }
    }
}

// ============ TCL / DCL ============

fn tcl_sql(q: &TclQuery, target: Target) -> Result<String, TranslateError> {
    match q.op {
        TclOp::Begin => Ok(match target {
            Target::Mysql => "START TRANSACTION".to_string(),
            _ => "BEGIN".to_string(),
        }),
        TclOp::Commit => Ok("COMMIT".to_string()),
        TclOp::Rollback => Ok("ROLLBACK".to_string()),
        TclOp::RollbackTo => Ok(format!(
            "ROLLBACK TO SAVEPOINT {}",
            q.savepoint.as_deref().unwrap_or_default()
        )),
        TclOp::Savepoint => Ok(format!(
            "SAVEPOINT {}",
            q.savepoint.as_deref().unwrap_or_default()
        )),
        TclOp::ReleaseSavepoint => Ok(format!(
            "RELEASE SAVEPOINT {}",
            q.savepoint.as_deref().unwrap_or_default()
        )),
        TclOp::SetTransaction => {
            if target == Target::Sqlite {
                return Err(TranslateError::unsupported("SET TRANSACTION", "sqlite"));
            }
            let mut sql = "SET TRANSACTION".to_string();
            if let Some(level) = q.isolation {
                sql.push_str(&format!(" ISOLATION LEVEL {}", level.as_sql()));
            }
            match q.read_only {
                Some(true) => sql.push_str(" READ ONLY"),
                Some(false) => sql.push_str(" READ WRITE"),
                None => {}
            }
            Ok(sql)
        }
    }
}

fn dcl_sql(q: &DclQuery, target: Target, ctx: &TenantContext) -> Result<String, TranslateError> {
    if target == Target::Sqlite {
        return Err(TranslateError::unsupported(
            q.op.operation().keyword(),
            "sqlite",
        ));
    }

    let grant_target = |t: &str| -> String {
        if t == "*" {
            match target {
                Target::Mysql => "*.*".to_string(),
                _ => "ALL TABLES IN SCHEMA public".to_string(),
            }
        } else {
            qualified(ctx, t)
        }
    };
    let user_sql = |name: &str| -> String {
        match target {
            Target::Mysql => sql_quote(name),
            _ => name.to_string(),
        }
    };
    let users: Vec<String> = q.users.iter().map(|u| user_sql(u)).collect();

    match q.op {
        DclOp::Grant => Ok(format!(
            "GRANT {} ON {} TO {}",
            q.permissions.join(", "),
            grant_target(q.target.as_deref().unwrap_or("*")),
            users.join(", ")
        )),
        DclOp::Revoke => Ok(format!(
            "REVOKE {} ON {} FROM {}",
            q.permissions.join(", "),
            grant_target(q.target.as_deref().unwrap_or("*")),
            users.join(", ")
        )),
        DclOp::CreateUser => {
            let user = users.first().cloned().unwrap_or_default();
            match (&q.password, target) {
                (Some(p), Target::Mysql) => {
                    Ok(format!("CREATE USER {user} IDENTIFIED BY {}", sql_quote(p)))
                }
                (Some(p), _) => Ok(format!("CREATE USER {user} WITH PASSWORD {}", sql_quote(p))),
                (None, _) => Ok(format!("CREATE USER {user}")),
            }
        }
        DclOp::AlterUser => {
            let user = users.first().cloned().unwrap_or_default();
            let password = q.password.as_deref().unwrap_or_default();
            match target {
                Target::Mysql => Ok(format!(
                    "ALTER USER {user} IDENTIFIED BY {}",
                    sql_quote(password)
                )),
                _ => Ok(format!(
                    "ALTER USER {user} WITH PASSWORD {}",
                    sql_quote(password)
                )),
            }
        }
        DclOp::DropUser => Ok(format!(
            "DROP USER {}",
            users.first().cloned().unwrap_or_default()
        )),
        DclOp::CreateRole => Ok(format!(
            "CREATE ROLE {}",
            q.roles.first().cloned().unwrap_or_default()
        )),
        DclOp::DropRole => Ok(format!(
            "DROP ROLE {}",
            q.roles.first().cloned().unwrap_or_default()
        )),
        DclOp::AssignRole => Ok(format!("GRANT {} TO {}", q.roles.join(", "), users.join(", "))),
        DclOp::RevokeRole => Ok(format!(
            "REVOKE {} FROM {}",
            q.roles.join(", "),
            users.join(", ")
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::registry::Registry;

    fn sql(text: &str, target: Target) -> String {
        sql_with(text, target, &TenantContext::default())
    }

    fn sql_with(text: &str, target: Target, ctx: &TenantContext) -> String {
        let reg = Registry::new();
        let tokens = tokenize(text, &reg).unwrap();
        let query = crate::parse::parse(tokens, &reg).unwrap();
        match translate(&query, target, ctx).unwrap() {
            BackendArtifact::Relational { sql, .. } => sql,
            other => panic!("expected relational artifact, got {other:?}"),
        }
    }

    fn err(text: &str, target: Target) -> TranslateError {
        let reg = Registry::new();
        let tokens = tokenize(text, &reg).unwrap();
        let query = crate::parse::parse(tokens, &reg).unwrap();
        translate(&query, target, &TenantContext::default()).unwrap_err()
    }

    #[test]
    fn select_end_to_end() {
        assert_eq!(
            sql(
                "GET User WHERE age > 25 AND status = 'active' ORDER BY name DESC LIMIT 10",
                Target::Postgres
            ),
            "SELECT * FROM users WHERE age > 25 AND status = 'active' ORDER BY name DESC LIMIT 10"
        );
    }

    #[test]
    fn schema_qualification() {
        let ctx = TenantContext {
            schema: Some("tenant_a".to_string()),
            key_prefix: None,
        };
        assert_eq!(
            sql_with("GET User", Target::Postgres, &ctx),
            "SELECT * FROM tenant_a.users"
        );
    }

    #[test]
    fn select_reports_row_expectation() {
        let reg = Registry::new();
        let tokens = tokenize("DELETE User WHERE id = 1", &reg).unwrap();
        let query = crate::parse::parse(tokens, &reg).unwrap();
        let BackendArtifact::Relational { expects_rows, .. } =
            translate(&query, Target::Postgres, &TenantContext::default()).unwrap()
        else {
            panic!("expected relational artifact");
        };
        assert!(!expects_rows);
    }

    #[test]
    fn aggregate_with_group_and_having() {
        assert_eq!(
            sql(
                "GET Sales SUM amount GROUP BY region HAVING result > 1000",
                Target::Postgres
            ),
            "SELECT SUM(amount) AS result FROM sales GROUP BY region HAVING SUM(amount) > 1000"
        );
    }

    #[test]
    fn bare_value_identifiers_are_quoted() {
        assert_eq!(
            sql("GET User WHERE status IN (active, pending)", Target::Postgres),
            "SELECT * FROM users WHERE status IN ('active', 'pending')"
        );
    }

    #[test]
    fn window_function_over_clause() {
        assert_eq!(
            sql(
                "GET Employee WITH ROW_NUMBER OVER (PARTITION BY dept ORDER BY salary DESC) AS rn",
                Target::Postgres
            ),
            "SELECT *, ROW_NUMBER() OVER (PARTITION BY dept ORDER BY salary DESC) AS rn FROM employees"
        );
    }

    #[test]
    fn upsert_dialect_split() {
        let text = "UPSERT User id = 1, name = 'Ada' ON CONFLICT id UPDATE name = 'Ada'";
        assert_eq!(
            sql(text, Target::Postgres),
            "INSERT INTO users (id, name) VALUES (1, 'Ada') \
             ON CONFLICT (id) DO UPDATE SET name = 'Ada'"
        );
        assert_eq!(
            sql(text, Target::Mysql),
            "INSERT INTO users (id, name) VALUES (1, 'Ada') \
             ON DUPLICATE KEY UPDATE name = 'Ada'"
        );
    }

    #[test]
    fn replace_dialects() {
        let text = "REPLACE User id = 1, name = 'Ada'";
        assert!(sql(text, Target::Mysql).starts_with("REPLACE INTO users"));
        assert!(sql(text, Target::Sqlite).starts_with("INSERT OR REPLACE INTO users"));
        assert_eq!(
            sql(text, Target::Postgres),
            "INSERT INTO users (id, name) VALUES (1, 'Ada') \
             ON CONFLICT (id) DO UPDATE SET id = EXCLUDED.id, name = EXCLUDED.name"
        );
    }

    #[test]
    fn truncate_is_a_delete_on_sqlite() {
        assert_eq!(sql("TRUNCATE User", Target::Postgres), "TRUNCATE TABLE users");
        assert_eq!(sql("TRUNCATE User", Target::Sqlite), "DELETE FROM users");
    }

    #[test]
    fn create_table_renders_constraints() {
        assert_eq!(
            sql(
                "CREATE TABLE User id:int:primary name:varchar(50):notnull",
                Target::Postgres
            ),
            "CREATE TABLE users (id int PRIMARY KEY, name varchar(50) NOT NULL)"
        );
    }

    #[test]
    fn create_view_embeds_translated_query() {
        assert_eq!(
            sql("CREATE VIEW adults AS GET User WHERE age >= 18", Target::Postgres),
            "CREATE VIEW adults AS SELECT * FROM users WHERE age >= 18"
        );
    }

    #[test]
    fn sequences_are_postgres_only() {
        assert_eq!(
            sql("CREATE SEQUENCE ids start:100 increment:5", Target::Postgres),
            "CREATE SEQUENCE ids START WITH 100 INCREMENT BY 5"
        );
        assert!(matches!(
            err("CREATE SEQUENCE ids start:100", Target::Sqlite),
            TranslateError::Unsupported { .. }
        ));
    }

    #[test]
    fn compound_select() {
        assert_eq!(
            sql("(GET User WHERE age > 30) UNION (GET Admin)", Target::Postgres),
            "SELECT * FROM users WHERE age > 30 UNION SELECT * FROM admins"
        );
    }

    #[test]
    fn tcl_statements() {
        assert_eq!(sql("BEGIN", Target::Postgres), "BEGIN");
        assert_eq!(sql("BEGIN", Target::Mysql), "START TRANSACTION");
        assert_eq!(
            sql(
                "SET TRANSACTION ISOLATION LEVEL SERIALIZABLE READ ONLY",
                Target::Postgres
            ),
            "SET TRANSACTION ISOLATION LEVEL SERIALIZABLE READ ONLY"
        );
        assert!(matches!(
            err("SET TRANSACTION READ ONLY", Target::Sqlite),
            TranslateError::Unsupported { .. }
        ));
    }

    #[test]
    fn dcl_statements() {
        assert_eq!(
            sql("GRANT SELECT, UPDATE ON User TO alice", Target::Postgres),
            "GRANT SELECT, UPDATE ON users TO alice"
        );
        assert_eq!(
            sql("CREATE USER alice PASSWORD 's3cret'", Target::Mysql),
            "CREATE USER 'alice' IDENTIFIED BY 's3cret'"
        );
        assert!(matches!(
            err("GRANT SELECT ON User TO alice", Target::Sqlite),
            TranslateError::Unsupported { .. }
        ));
    }
}
