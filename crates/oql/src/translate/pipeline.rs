//! Document-store (MongoDB-family) pipeline generation.
//!
//! Filters are never emitted naively: the condition list is folded into a
//! boolean tree. Consecutive AND-joined conditions accumulate into one term;
//! an OR-joined condition starts a new term, and the whole list becomes
//! `{$or: [term, ...]}` once more than one term exists. A pure-AND list with
//! no nesting merges into a single flat filter document (collisions fall
//! back to `$and`).

use serde_json::{json, Map, Value};

use crate::ast::{
    BinaryOp, CompareOp, Comparison, Condition, ConditionNode, DclOp, DclQuery, DdlKind,
    DdlQuery, Expr, Logic, MutationOp, MutationQuery, Query, SelectQuery, SetOpKind, TclQuery,
    WindowFn, WindowFunc,
};
use crate::registry::Registry;

use super::{table_name, value_json, BackendArtifact, TenantContext, TranslateError};

const BACKEND: &str = "mongo";

pub(crate) fn translate(
    query: &Query,
    ctx: &TenantContext,
    registry: &Registry,
) -> Result<BackendArtifact, TranslateError> {
    match query {
        Query::Select(q) => select_pipeline(q, ctx),
        Query::Compound(q) => compound_pipeline(q, ctx, registry),
        Query::Mutation(q) => mutation_pipeline(q, ctx, registry),
        Query::Ddl(q) => ddl_pipeline(q, ctx, registry),
        Query::Tcl(q) => tcl_pipeline(q, registry),
        Query::Dcl(q) => dcl_pipeline(q, registry),
    }
}

fn artifact(collection: impl Into<String>, operation: &str, stages: Vec<Value>) -> BackendArtifact {
    BackendArtifact::DocumentPipeline {
        collection: collection.into(),
        operation: operation.to_string(),
        stages,
    }
}

/// Entity collection name, carrying the tenant prefix when one is set.
fn collection_name(ctx: &TenantContext, entity: &str) -> String {
    let name = table_name(entity);
    match &ctx.key_prefix {
        Some(prefix) => format!("{prefix}_{name}"),
        None => name,
    }
}

// ============ Condition folding ============

/// Fold a condition list into a single filter document.
pub(crate) fn fold_conditions(conditions: &[Condition]) -> Result<Value, TranslateError> {
    // Split into OR-separated runs; each run is an AND-accumulated term.
    let mut runs: Vec<Vec<&Condition>> = Vec::new();
    for cond in conditions {
        if runs.is_empty() || cond.logic == Logic::Or {
            runs.push(vec![cond]);
        } else {
            runs.last_mut().unwrap().push(cond);
        }
    }

    if runs.len() == 1 {
        // No OR anywhere at this level: merge flat.
        return and_merged(&runs[0]);
    }

    let mut terms = Vec::with_capacity(runs.len());
    for run in &runs {
        terms.push(and_term(run)?);
    }
    Ok(json!({ "$or": terms }))
}

/// One AND run inside an OR: a single condition stands alone, several wrap
/// in an explicit `$and`.
fn and_term(run: &[&Condition]) -> Result<Value, TranslateError> {
    if run.len() == 1 {
        return condition_doc(run[0]);
    }
    let docs = run
        .iter()
        .map(|c| condition_doc(c))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(json!({ "$and": docs }))
}

/// A pure-AND list merges into one flat document; a key collision (same
/// field constrained twice) falls back to `$and`.
fn and_merged(run: &[&Condition]) -> Result<Value, TranslateError> {
    let docs = run
        .iter()
        .map(|c| condition_doc(c))
        .collect::<Result<Vec<_>, _>>()?;
    if docs.len() == 1 {
        return Ok(docs.into_iter().next().unwrap());
    }

    let mut merged = Map::new();
    for doc in &docs {
        let Value::Object(entries) = doc else {
            return Ok(json!({ "$and": docs }));
        };
        for (key, value) in entries {
            if merged.contains_key(key) {
                return Ok(json!({ "$and": docs }));
            }
            merged.insert(key.clone(), value.clone());
        }
    }
    Ok(Value::Object(merged))
}

fn condition_doc(cond: &Condition) -> Result<Value, TranslateError> {
    match &cond.node {
        ConditionNode::Group(children) => fold_conditions(children),
        ConditionNode::Compare(cmp) => comparison_doc(cmp),
    }
}

fn comparison_doc(cmp: &Comparison) -> Result<Value, TranslateError> {
    // Computed left-hand sides compare through $expr.
    let Some(field) = cmp.field.as_field() else {
        return Ok(json!({ "$expr": comparison_expr(cmp)? }));
    };

    let value = || cmp.value.as_ref().map(value_json).unwrap_or(Value::Null);
    Ok(match cmp.op {
        CompareOp::Eq => json!({ field: value() }),
        CompareOp::Ne => json!({ field: { "$ne": value() } }),
        CompareOp::Lt => json!({ field: { "$lt": value() } }),
        CompareOp::Le => json!({ field: { "$lte": value() } }),
        CompareOp::Gt => json!({ field: { "$gt": value() } }),
        CompareOp::Ge => json!({ field: { "$gte": value() } }),
        CompareOp::Like => json!({ field: { "$regex": like_regex(cmp)? } }),
        CompareOp::NotLike => json!({ field: { "$not": { "$regex": like_regex(cmp)? } } }),
        CompareOp::Between => {
            let lo = cmp.value.as_ref().map(value_json).unwrap_or(Value::Null);
            let hi = cmp.value2.as_ref().map(value_json).unwrap_or(Value::Null);
            json!({ field: { "$gte": lo, "$lte": hi } })
        }
        CompareOp::NotBetween => {
            let lo = cmp.value.as_ref().map(value_json).unwrap_or(Value::Null);
            let hi = cmp.value2.as_ref().map(value_json).unwrap_or(Value::Null);
            json!({ "$or": [ { field: { "$lt": lo } }, { field: { "$gt": hi } } ] })
        }
        CompareOp::In => {
            let values: Vec<Value> = cmp.values.iter().map(value_json).collect();
            json!({ field: { "$in": values } })
        }
        CompareOp::NotIn => {
            let values: Vec<Value> = cmp.values.iter().map(value_json).collect();
            json!({ field: { "$nin": values } })
        }
        CompareOp::IsNull => json!({ field: Value::Null }),
        CompareOp::IsNotNull => json!({ field: { "$ne": Value::Null } }),
    })
}

/// SQL LIKE pattern to an anchored regular expression.
fn like_pattern_regex(pattern: &str) -> String {
    let mut out = String::from("^");
    for ch in pattern.chars() {
        match ch {
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            c if "\\.+*?()[]{}|^$".contains(c) => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push('$');
    out
}

fn like_regex(cmp: &Comparison) -> Result<String, TranslateError> {
    let pattern = match cmp.value.as_ref() {
        Some(Expr::Literal(crate::ast::Literal::String(s))) => s.clone(),
        Some(Expr::Field(name)) => name.clone(),
        _ => {
            return Err(TranslateError::invalid(
                "LIKE requires a string pattern operand",
            ));
        }
    };
    Ok(like_pattern_regex(&pattern))
}

// ============ Expression compilation ($expr side) ============

fn expr_pipeline(expr: &Expr) -> Result<Value, TranslateError> {
    match expr {
        Expr::Field(name) => Ok(Value::String(format!("${name}"))),
        Expr::Literal(lit) => Ok(super::literal_json(lit)),
        Expr::Binary { left, op, right } => {
            let name = match op {
                BinaryOp::Add => "$add",
                BinaryOp::Sub => "$subtract",
                BinaryOp::Mul => "$multiply",
                BinaryOp::Div => "$divide",
                BinaryOp::Mod => "$mod",
                BinaryOp::And | BinaryOp::Or => {
                    return Err(TranslateError::invalid(
                        "logical operators are not valid in a pipeline value expression",
                    ));
                }
            };
            Ok(json!({ name: [expr_pipeline(left)?, expr_pipeline(right)?] }))
        }
        Expr::Function { name, args } => {
            let compiled = args
                .iter()
                .map(expr_pipeline)
                .collect::<Result<Vec<_>, _>>()?;
            let one = |args: &[Value]| -> Result<Value, TranslateError> {
                args.first().cloned().ok_or_else(|| {
                    TranslateError::invalid(format!("{name}() requires an argument"))
                })
            };
            Ok(match name.to_ascii_lowercase().as_str() {
                "upper" => json!({ "$toUpper": one(&compiled)? }),
                "lower" => json!({ "$toLower": one(&compiled)? }),
                "concat" => json!({ "$concat": compiled }),
                "length" => json!({ "$strLenCP": one(&compiled)? }),
                "abs" => json!({ "$abs": one(&compiled)? }),
                "round" => json!({ "$round": compiled }),
                other => {
                    return Err(TranslateError::invalid(format!(
                        "function '{other}' has no pipeline mapping"
                    )));
                }
            })
        }
        Expr::CaseWhen {
            branches,
            otherwise,
        } => {
            let mut cases = Vec::with_capacity(branches.len());
            for branch in branches {
                cases.push(json!({
                    "case": conditions_expr(&branch.when)?,
                    "then": expr_pipeline(&branch.then)?,
                }));
            }
            let mut switch = json!({ "branches": cases });
            if let Some(e) = otherwise {
                switch["default"] = expr_pipeline(e)?;
            }
            Ok(json!({ "$switch": switch }))
        }
        Expr::Wildcard => Err(TranslateError::invalid(
            "'*' is not valid in a pipeline value expression",
        )),
    }
}

/// Conditions in operator-expression form, for `$expr` and `$switch` cases.
fn conditions_expr(conditions: &[Condition]) -> Result<Value, TranslateError> {
    let mut runs: Vec<Vec<&Condition>> = Vec::new();
    for cond in conditions {
        if runs.is_empty() || cond.logic == Logic::Or {
            runs.push(vec![cond]);
        } else {
            runs.last_mut().unwrap().push(cond);
        }
    }

    let mut terms = Vec::with_capacity(runs.len());
    for run in &runs {
        let exprs = run
            .iter()
            .map(|c| match &c.node {
                ConditionNode::Group(children) => conditions_expr(children),
                ConditionNode::Compare(cmp) => comparison_expr(cmp),
            })
            .collect::<Result<Vec<_>, _>>()?;
        terms.push(if exprs.len() == 1 {
            exprs.into_iter().next().unwrap()
        } else {
            json!({ "$and": exprs })
        });
    }
    Ok(if terms.len() == 1 {
        terms.into_iter().next().unwrap()
    } else {
        json!({ "$or": terms })
    })
}

fn comparison_expr(cmp: &Comparison) -> Result<Value, TranslateError> {
    let field = expr_pipeline(&cmp.field)?;
    let value = |v: &Option<Expr>| v.as_ref().map(value_json).unwrap_or(Value::Null);

    Ok(match cmp.op {
        CompareOp::Eq => json!({ "$eq": [field, value(&cmp.value)] }),
        CompareOp::Ne => json!({ "$ne": [field, value(&cmp.value)] }),
        CompareOp::Lt => json!({ "$lt": [field, value(&cmp.value)] }),
        CompareOp::Le => json!({ "$lte": [field, value(&cmp.value)] }),
        CompareOp::Gt => json!({ "$gt": [field, value(&cmp.value)] }),
        CompareOp::Ge => json!({ "$gte": [field, value(&cmp.value)] }),
        CompareOp::Like => json!({ "$regexMatch": { "input": field, "regex": like_regex(cmp)? } }),
        CompareOp::NotLike => {
            json!({ "$not": { "$regexMatch": { "input": field, "regex": like_regex(cmp)? } } })
        }
        CompareOp::Between => json!({ "$and": [
            { "$gte": [field.clone(), value(&cmp.value)] },
            { "$lte": [field, value(&cmp.value2)] },
        ] }),
        CompareOp::NotBetween => json!({ "$or": [
            { "$lt": [field.clone(), value(&cmp.value)] },
            { "$gt": [field, value(&cmp.value2)] },
        ] }),
        CompareOp::In => {
            let values: Vec<Value> = cmp.values.iter().map(value_json).collect();
            json!({ "$in": [field, values] })
        }
        CompareOp::NotIn => {
            let values: Vec<Value> = cmp.values.iter().map(value_json).collect();
            json!({ "$not": { "$in": [field, values] } })
        }
        CompareOp::IsNull => json!({ "$eq": [field, Value::Null] }),
        CompareOp::IsNotNull => json!({ "$ne": [field, Value::Null] }),
    })
}

// ============ SELECT ============

fn select_pipeline(
    q: &SelectQuery,
    ctx: &TenantContext,
) -> Result<BackendArtifact, TranslateError> {
    if q.like_pattern.is_some() {
        return Err(TranslateError::invalid(
            "LIKE key-pattern clause has no pipeline mapping; use a WHERE ... LIKE condition",
        ));
    }

    let mut stages: Vec<Value> = Vec::new();

    if !q.conditions.is_empty() {
        stages.push(json!({ "$match": fold_conditions(&q.conditions)? }));
    }

    for join in &q.joins {
        // The joined field keeps the bare name; only the source collection
        // is tenant-prefixed.
        let foreign = table_name(&join.entity);
        stages.push(json!({ "$lookup": {
            "from": collection_name(ctx, &join.entity),
            "localField": join.left_field,
            "foreignField": join.right_field,
            "as": foreign,
        } }));
        // Inner joins drop unmatched rows; outer joins keep them.
        let preserve = join.kind != crate::ast::JoinKind::Inner;
        stages.push(json!({ "$unwind": {
            "path": format!("${foreign}"),
            "preserveNullAndEmptyArrays": preserve,
        } }));
    }

    let count_distinct = group_stages(q, &mut stages)?;

    if !q.having.is_empty() {
        stages.push(json!({ "$match": fold_conditions(&q.having)? }));
    }

    for window in &q.windows {
        stages.push(window_stage(window)?);
    }

    if let Some(distinct) = &q.distinct {
        if distinct.columns.is_empty() {
            return Err(TranslateError::unsupported("DISTINCT", BACKEND));
        }
        let mut id = Map::new();
        for col in &distinct.columns {
            id.insert(col.clone(), Value::String(format!("${col}")));
        }
        stages.push(json!({ "$group": { "_id": Value::Object(id) } }));
    }

    if !q.columns.is_empty() || !q.projections.is_empty() {
        let mut doc = Map::new();
        for col in &q.columns {
            if let Some(name) = col.as_field() {
                doc.insert(name.to_string(), json!(1));
            }
        }
        for p in &q.projections {
            let key = p
                .alias
                .clone()
                .unwrap_or_else(|| p.expr.to_string());
            doc.insert(key, expr_pipeline(&p.expr)?);
        }
        stages.push(json!({ "$project": Value::Object(doc) }));
    }

    if count_distinct {
        stages.push(json!({ "$project": { "result": { "$size": "$result" } } }));
    }

    if !q.order_by.is_empty() {
        let mut sort = Map::new();
        for o in &q.order_by {
            sort.insert(o.field.clone(), json!(if o.descending { -1 } else { 1 }));
        }
        stages.push(json!({ "$sort": Value::Object(sort) }));
    }
    if let Some(offset) = q.offset {
        stages.push(json!({ "$skip": offset }));
    }
    if let Some(limit) = q.limit {
        stages.push(json!({ "$limit": limit }));
    }

    Ok(artifact(collection_name(ctx, &q.entity), "aggregate", stages))
}

/// Emit the `$group` stage when an aggregate or GROUP BY is present. Returns
/// whether a trailing `$size` projection is needed (COUNT DISTINCT).
fn group_stages(q: &SelectQuery, stages: &mut Vec<Value>) -> Result<bool, TranslateError> {
    if q.aggregate.is_none() && q.group_by.is_empty() {
        return Ok(false);
    }

    let id = if q.group_by.is_empty() {
        Value::Null
    } else {
        let mut id = Map::new();
        for expr in &q.group_by {
            match expr.as_field() {
                Some(name) => {
                    id.insert(name.to_string(), Value::String(format!("${name}")));
                }
                None => {
                    id.insert(expr.to_string(), expr_pipeline(expr)?);
                }
            }
        }
        Value::Object(id)
    };

    let mut doc = Map::new();
    doc.insert("_id".to_string(), id);

    let mut count_distinct = false;
    if let Some(agg) = &q.aggregate {
        let acc = match (&agg.field, agg.distinct) {
            (None, _) => json!({ "$sum": 1 }),
            (Some(field), true) => {
                count_distinct = agg.func == crate::ast::AggFunc::Count;
                json!({ "$addToSet": format!("${field}") })
            }
            (Some(field), false) => {
                let name = match agg.func {
                    crate::ast::AggFunc::Count => return count_field(field, &mut doc, stages),
                    crate::ast::AggFunc::Sum => "$sum",
                    crate::ast::AggFunc::Avg => "$avg",
                    crate::ast::AggFunc::Min => "$min",
                    crate::ast::AggFunc::Max => "$max",
                };
                json!({ name: format!("${field}") })
            }
        };
        doc.insert("result".to_string(), acc);
    }

    stages.push(json!({ "$group": Value::Object(doc) }));
    Ok(count_distinct)
}

/// COUNT(field) counts documents where the field is present.
fn count_field(
    field: &str,
    doc: &mut Map<String, Value>,
    stages: &mut Vec<Value>,
) -> Result<bool, TranslateError> {
    stages.push(json!({ "$match": { field: { "$ne": Value::Null } } }));
    doc.insert("result".to_string(), json!({ "$sum": 1 }));
    stages.push(json!({ "$group": Value::Object(std::mem::take(doc)) }));
    Ok(false)
}

fn window_stage(w: &WindowFunc) -> Result<Value, TranslateError> {
    let output = match w.func {
        WindowFn::RowNumber => json!({ "$documentNumber": {} }),
        WindowFn::Rank => json!({ "$rank": {} }),
        WindowFn::DenseRank => json!({ "$denseRank": {} }),
        // No native NTILE; $rank is the closest ordering-preserving stand-in.
        WindowFn::Ntile => json!({ "$rank": {} }),
        WindowFn::Lag | WindowFn::Lead => {
            let field = w.field.as_deref().ok_or_else(|| {
                TranslateError::invalid(format!("{} requires a field", w.func.as_sql()))
            })?;
            let offset = w.offset.unwrap_or(1);
            let by = if w.func == WindowFn::Lag { -offset } else { offset };
            json!({ "$shift": { "output": format!("${field}"), "by": by } })
        }
    };

    let mut spec = Map::new();
    match w.partition_by.as_slice() {
        [] => {}
        [single] => {
            spec.insert("partitionBy".to_string(), Value::String(format!("${single}")));
        }
        many => {
            let mut partition = Map::new();
            for field in many {
                partition.insert(field.clone(), Value::String(format!("${field}")));
            }
            spec.insert("partitionBy".to_string(), Value::Object(partition));
        }
    }
    if !w.order_by.is_empty() {
        let mut sort = Map::new();
        for o in &w.order_by {
            sort.insert(o.field.clone(), json!(if o.descending { -1 } else { 1 }));
        }
        spec.insert("sortBy".to_string(), Value::Object(sort));
    }
    let alias = w.alias.clone().unwrap_or_else(|| w.func.default_alias().to_string());
    spec.insert("output".to_string(), json!({ alias: output }));

    Ok(json!({ "$setWindowFields": Value::Object(spec) }))
}

fn compound_pipeline(
    q: &crate::ast::CompoundQuery,
    ctx: &TenantContext,
    registry: &Registry,
) -> Result<BackendArtifact, TranslateError> {
    if q.kind != SetOpKind::UnionAll {
        return Err(TranslateError::unsupported(q.kind.as_sql(), BACKEND));
    }

    let left = translate(&q.left, ctx, registry)?;
    let right = translate(&q.right, ctx, registry)?;
    let (
        BackendArtifact::DocumentPipeline {
            collection,
            mut stages,
            ..
        },
        BackendArtifact::DocumentPipeline {
            collection: right_coll,
            stages: right_stages,
            ..
        },
    ) = (left, right)
    else {
        return Err(TranslateError::invalid(
            "UNION ALL sides must both be readable queries",
        ));
    };

    stages.push(json!({ "$unionWith": { "coll": right_coll, "pipeline": right_stages } }));
    Ok(artifact(collection, "aggregate", stages))
}

// ============ Writes ============

fn assignments_doc(assignments: &[crate::ast::Assignment]) -> Value {
    let mut doc = Map::new();
    for a in assignments {
        doc.insert(a.field.clone(), value_json(&a.value));
    }
    Value::Object(doc)
}

fn mutation_pipeline(
    q: &MutationQuery,
    ctx: &TenantContext,
    registry: &Registry,
) -> Result<BackendArtifact, TranslateError> {
    let operation = registry
        .pipeline_op(q.op.operation())
        .ok_or_else(|| TranslateError::unsupported(q.op.operation().keyword(), BACKEND))?;
    let collection = collection_name(ctx, &q.entity);

    let filter = if q.conditions.is_empty() {
        json!({})
    } else {
        fold_conditions(&q.conditions)?
    };

    let stages = match q.op {
        MutationOp::Create => vec![assignments_doc(&q.assignments)],
        MutationOp::BulkInsert => q
            .rows
            .iter()
            .map(|row| {
                let mut doc = Map::new();
                for (col, value) in q.columns.iter().zip(row) {
                    doc.insert(col.clone(), value_json(value));
                }
                Value::Object(doc)
            })
            .collect(),
        MutationOp::Update => vec![filter, json!({ "$set": assignments_doc(&q.assignments) })],
        MutationOp::Delete => vec![filter],
        MutationOp::Upsert => {
            let conflict = q.conflict.as_ref().ok_or_else(|| {
                TranslateError::invalid("UPSERT on mongo requires an ON CONFLICT column list")
            })?;
            let mut key = Map::new();
            for target in &conflict.targets {
                let assigned = q
                    .assignments
                    .iter()
                    .find(|a| &a.field == target)
                    .ok_or_else(|| {
                        TranslateError::invalid(format!(
                            "conflict column '{target}' has no assigned value"
                        ))
                    })?;
                key.insert(target.clone(), value_json(&assigned.value));
            }
            vec![
                Value::Object(key),
                json!({ "$set": assignments_doc(&q.assignments) }),
                json!({ "upsert": true }),
            ]
        }
        MutationOp::Replace => {
            let id = q
                .assignments
                .iter()
                .find(|a| a.field == "id")
                .ok_or_else(|| {
                    TranslateError::invalid("REPLACE on mongo requires an id assignment")
                })?;
            vec![
                json!({ "id": value_json(&id.value) }),
                assignments_doc(&q.assignments),
            ]
        }
    };

    Ok(artifact(collection, operation, stages))
}

// ============ DDL / TCL / DCL ============

fn ddl_pipeline(
    q: &DdlQuery,
    ctx: &TenantContext,
    registry: &Registry,
) -> Result<BackendArtifact, TranslateError> {
    let unsupported =
        || TranslateError::unsupported(q.kind.operation().keyword(), BACKEND);
    let operation = registry
        .pipeline_op(q.kind.operation())
        .ok_or_else(unsupported)?;

    Ok(match &q.kind {
        DdlKind::CreateTable { entity, .. } => {
            artifact(collection_name(ctx, entity), operation, vec![])
        }
        DdlKind::DropTable { entity, .. } => {
            artifact(collection_name(ctx, entity), operation, vec![])
        }
        DdlKind::Truncate { entity } => {
            artifact(collection_name(ctx, entity), operation, vec![json!({})])
        }
        DdlKind::RenameTable { from, to } => artifact(
            collection_name(ctx, from),
            operation,
            vec![json!({ "to": collection_name(ctx, to) })],
        ),
        DdlKind::CreateIndex {
            name,
            entity,
            columns,
            unique,
        } => {
            let mut keys = Map::new();
            for col in columns {
                keys.insert(col.clone(), json!(1));
            }
            artifact(
                collection_name(ctx, entity),
                operation,
                vec![json!({ "keys": Value::Object(keys), "name": name, "unique": unique })],
            )
        }
        DdlKind::DropIndex { .. } => {
            return Err(TranslateError::invalid(
                "DROP INDEX on mongo requires the owning collection",
            ));
        }
        DdlKind::CreateDatabase { name } | DdlKind::DropDatabase { name } => {
            artifact(name.clone(), operation, vec![])
        }
        DdlKind::CreateView { name, query } => {
            let BackendArtifact::DocumentPipeline {
                collection, stages, ..
            } = translate(query, ctx, registry)?
            else {
                return Err(TranslateError::invalid(
                    "CREATE VIEW requires a readable defining query",
                ));
            };
            let mut pipeline = vec![json!({ "viewOn": collection })];
            pipeline.extend(stages);
            artifact(name.clone(), operation, pipeline)
        }
        DdlKind::DropView { name } => artifact(name.clone(), operation, vec![]),
        _ => return Err(unsupported()),
    })
}

fn tcl_pipeline(q: &TclQuery, registry: &Registry) -> Result<BackendArtifact, TranslateError> {
    let operation = registry
        .pipeline_op(q.op.operation())
        .ok_or_else(|| TranslateError::unsupported(q.op.operation().keyword(), BACKEND))?;
    Ok(artifact("", operation, vec![]))
}

fn dcl_pipeline(q: &DclQuery, registry: &Registry) -> Result<BackendArtifact, TranslateError> {
    let operation = registry
        .pipeline_op(q.op.operation())
        .ok_or_else(|| TranslateError::unsupported(q.op.operation().keyword(), BACKEND))?;

    let user = q.users.first().cloned().unwrap_or_default();
    let stages = match q.op {
        DclOp::CreateUser | DclOp::AlterUser => match &q.password {
            Some(p) => vec![json!({ "user": user, "pwd": p })],
            None => vec![json!({ "user": user })],
        },
        DclOp::DropUser => vec![json!({ "user": user })],
        DclOp::CreateRole | DclOp::DropRole => {
            vec![json!({ "role": q.roles.first().cloned().unwrap_or_default() })]
        }
        DclOp::Grant | DclOp::Revoke => {
            vec![json!({ "user": user, "roles": q.permissions, "target": q.target })]
        }
        DclOp::AssignRole | DclOp::RevokeRole => {
            vec![json!({ "user": user, "roles": q.roles })]
        }
    };

    Ok(artifact("admin", operation, stages))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::registry::Registry;

    fn conditions(text: &str) -> Vec<Condition> {
        let reg = Registry::new();
        let tokens = tokenize(text, &reg).unwrap();
        let Query::Select(q) = crate::parse::parse(tokens, &reg).unwrap() else {
            panic!("expected select");
        };
        q.conditions
    }

    fn pipeline(text: &str) -> (String, String, Vec<Value>) {
        let reg = Registry::new();
        let tokens = tokenize(text, &reg).unwrap();
        let query = crate::parse::parse(tokens, &reg).unwrap();
        match translate(&query, &TenantContext::default(), &reg).unwrap() {
            BackendArtifact::DocumentPipeline {
                collection,
                operation,
                stages,
            } => (collection, operation, stages),
            other => panic!("expected pipeline artifact, got {other:?}"),
        }
    }

    #[test]
    fn tenant_prefix_lands_on_every_collection() {
        let reg = Registry::new();
        let ctx = TenantContext {
            schema: None,
            key_prefix: Some("acme".to_string()),
        };
        let coll = |text: &str| {
            let tokens = tokenize(text, &reg).unwrap();
            let query = crate::parse::parse(tokens, &reg).unwrap();
            match translate(&query, &ctx, &reg).unwrap() {
                BackendArtifact::DocumentPipeline { collection, .. } => collection,
                other => panic!("expected pipeline artifact, got {other:?}"),
            }
        };

        assert_eq!(coll("GET User WHERE id = 5"), "acme_users");
        assert_eq!(coll("UPDATE User age = 37 WHERE id = 9"), "acme_users");
        assert_eq!(coll("CREATE TABLE User id:int"), "acme_users");
        assert_eq!(coll("TRUNCATE User"), "acme_users");
    }

    #[test]
    fn tenant_prefix_reaches_lookup_and_rename_targets() {
        let reg = Registry::new();
        let ctx = TenantContext {
            schema: None,
            key_prefix: Some("acme".to_string()),
        };
        let stages = |text: &str| {
            let tokens = tokenize(text, &reg).unwrap();
            let query = crate::parse::parse(tokens, &reg).unwrap();
            match translate(&query, &ctx, &reg).unwrap() {
                BackendArtifact::DocumentPipeline { stages, .. } => stages,
                other => panic!("expected pipeline artifact, got {other:?}"),
            }
        };

        let join = stages("GET User JOIN Order ON id = user_id");
        assert_eq!(join[0]["$lookup"]["from"], json!("acme_orders"));
        // The unwound field keeps the bare collection name.
        assert_eq!(join[0]["$lookup"]["as"], json!("orders"));

        let rename = stages("RENAME TABLE User Member");
        assert_eq!(rename[0], json!({ "to": "acme_members" }));
    }

    #[test]
    fn pure_and_merges_flat() {
        let conds = conditions("GET User WHERE age > 25 AND status = 'active'");
        assert_eq!(
            fold_conditions(&conds).unwrap(),
            json!({ "age": { "$gt": 25 }, "status": "active" })
        );
    }

    #[test]
    fn or_pulls_preceding_and_term_into_a_group() {
        // [a, b(OR), c(AND)] folds to {$or: [a, {$and: [b, c]}]}
        let conds = conditions("GET User WHERE a = 1 OR b = 2 AND c = 3");
        assert_eq!(
            fold_conditions(&conds).unwrap(),
            json!({ "$or": [ { "a": 1 }, { "$and": [ { "b": 2 }, { "c": 3 } ] } ] })
        );
    }

    #[test]
    fn and_or_permutations() {
        let conds = conditions("GET User WHERE a = 1 AND b = 2 OR c = 3");
        assert_eq!(
            fold_conditions(&conds).unwrap(),
            json!({ "$or": [ { "$and": [ { "a": 1 }, { "b": 2 } ] }, { "c": 3 } ] })
        );

        let conds = conditions("GET User WHERE a = 1 OR b = 2 OR c = 3");
        assert_eq!(
            fold_conditions(&conds).unwrap(),
            json!({ "$or": [ { "a": 1 }, { "b": 2 }, { "c": 3 } ] })
        );

        let conds = conditions("GET User WHERE (a = 1 OR b = 2) AND c = 3");
        assert_eq!(
            fold_conditions(&conds).unwrap(),
            json!({ "$and": [
                { "$or": [ { "a": 1 }, { "b": 2 } ] },
                { "c": 3 },
            ] })
        );
    }

    #[test]
    fn colliding_field_constraints_fall_back_to_and() {
        let conds = conditions("GET User WHERE age > 18 AND age < 65");
        assert_eq!(
            fold_conditions(&conds).unwrap(),
            json!({ "$and": [ { "age": { "$gt": 18 } }, { "age": { "$lt": 65 } } ] })
        );
    }

    #[test]
    fn end_to_end_stage_order() {
        let (collection, operation, stages) = pipeline(
            "GET User WHERE age > 25 AND status = 'active' ORDER BY name DESC LIMIT 10",
        );
        assert_eq!(collection, "users");
        assert_eq!(operation, "aggregate");
        assert_eq!(
            stages,
            vec![
                json!({ "$match": { "age": { "$gt": 25 }, "status": "active" } }),
                json!({ "$sort": { "name": -1 } }),
                json!({ "$limit": 10 }),
            ]
        );
    }

    #[test]
    fn arithmetic_lhs_compares_through_expr() {
        let conds = conditions("GET Order WHERE (price + tax) > 100");
        assert_eq!(
            fold_conditions(&conds).unwrap(),
            json!({ "$expr": { "$gt": [ { "$add": ["$price", "$tax"] }, 100 ] } })
        );
    }

    #[test]
    fn group_and_having() {
        let (_, _, stages) =
            pipeline("GET Sales SUM amount GROUP BY region HAVING result > 1000");
        assert_eq!(
            stages[0],
            json!({ "$group": { "_id": { "region": "$region" }, "result": { "$sum": "$amount" } } })
        );
        assert_eq!(stages[1], json!({ "$match": { "result": { "$gt": 1000 } } }));
    }

    #[test]
    fn count_without_field_sums_ones() {
        let (_, _, stages) = pipeline("GET User COUNT");
        assert_eq!(
            stages[0],
            json!({ "$group": { "_id": Value::Null, "result": { "$sum": 1 } } })
        );
    }

    #[test]
    fn window_function_stage() {
        let (_, _, stages) = pipeline(
            "GET Employee WITH ROW_NUMBER OVER (PARTITION BY dept ORDER BY salary DESC) AS rn",
        );
        assert_eq!(
            stages[0],
            json!({ "$setWindowFields": {
                "partitionBy": "$dept",
                "sortBy": { "salary": -1 },
                "output": { "rn": { "$documentNumber": {} } },
            } })
        );
    }

    #[test]
    fn lag_shifts_backwards() {
        let (_, _, stages) = pipeline("GET Tick WITH LAG price 2 OVER (ORDER BY ts)");
        assert_eq!(
            stages[0],
            json!({ "$setWindowFields": {
                "sortBy": { "ts": 1 },
                "output": { "lag": { "$shift": { "output": "$price", "by": -2 } } },
            } })
        );
    }

    #[test]
    fn joins_compile_to_lookup_and_unwind() {
        let (_, _, stages) = pipeline("GET User LEFT JOIN Orders ON id = user_id");
        assert_eq!(
            stages[0],
            json!({ "$lookup": {
                "from": "orders",
                "localField": "id",
                "foreignField": "user_id",
                "as": "orders",
            } })
        );
        assert_eq!(
            stages[1],
            json!({ "$unwind": { "path": "$orders", "preserveNullAndEmptyArrays": true } })
        );
    }

    #[test]
    fn insert_and_update_documents() {
        let (collection, operation, stages) = pipeline("CREATE User name = 'Ada', age = 36");
        assert_eq!(collection, "users");
        assert_eq!(operation, "insertOne");
        assert_eq!(stages, vec![json!({ "name": "Ada", "age": 36 })]);

        let (_, operation, stages) = pipeline("UPDATE User age = 37 WHERE name = 'Ada'");
        assert_eq!(operation, "updateMany");
        assert_eq!(stages[0], json!({ "name": "Ada" }));
        assert_eq!(stages[1], json!({ "$set": { "age": 37 } }));
    }

    #[test]
    fn union_all_becomes_union_with() {
        let (collection, _, stages) = pipeline("(GET User) UNION ALL (GET Admin)");
        assert_eq!(collection, "users");
        assert_eq!(
            stages[0],
            json!({ "$unionWith": { "coll": "admins", "pipeline": [] } })
        );
    }

    #[test]
    fn savepoints_have_no_mapping() {
        let reg = Registry::new();
        let tokens = tokenize("SAVEPOINT before_update", &reg).unwrap();
        let query = crate::parse::parse(tokens, &reg).unwrap();
        let err = translate(&query, &TenantContext::default(), &reg).unwrap_err();
        assert!(err.to_string().contains("SAVEPOINT"));
    }
}
