//! Black-box integration tests for OQL
//!
//! These tests exercise the full tokenize → parse → translate pipeline.

use oql::ast::{ConditionNode, Logic, Query};
use oql::registry::{Group, Registry, WordClass};
use oql::{BackendArtifact, OqlError, Target, TenantContext, run};
use serde_json::{Value, json};

fn ctx() -> TenantContext {
    TenantContext::default()
}

fn sql(text: &str, target: Target) -> String {
    match run(text, target, &ctx(), &Registry::new()).unwrap() {
        BackendArtifact::Relational { sql, .. } => sql,
        other => panic!("expected relational artifact, got {other:?}"),
    }
}

fn stages(text: &str) -> Vec<Value> {
    match run(text, Target::Mongo, &ctx(), &Registry::new()).unwrap() {
        BackendArtifact::DocumentPipeline { stages, .. } => stages,
        other => panic!("expected pipeline artifact, got {other:?}"),
    }
}

// ============ Registry classification ============

#[test]
fn classification_is_idempotent() {
    let reg = Registry::new();
    for keyword in ["GET", "CREATE TABLE", "SAVEPOINT", "GRANT", "UPDATE"] {
        let group = reg.operation(keyword).unwrap().group();
        for _ in 0..10 {
            assert_eq!(reg.operation(keyword).unwrap().group(), group);
        }
    }
    assert_eq!(reg.classify("WHERE"), WordClass::Clause);
    assert_eq!(reg.classify("WHERE"), WordClass::Clause);
}

#[test]
fn every_statement_family_dispatches() {
    let reg = Registry::new();
    let cases = [
        ("GET User", Group::Dql),
        ("CREATE User name = 'Ada'", Group::Crud),
        ("CREATE TABLE User id:int", Group::Ddl),
        ("COMMIT", Group::Tcl),
        ("GRANT SELECT ON User TO alice", Group::Dcl),
    ];
    for (text, family) in cases {
        let query = oql::parse(text, &reg).unwrap();
        assert_eq!(query.family(), family, "{text}");
    }
}

// ============ Round-trip and condition invariants ============

#[test]
fn flat_condition_round_trips_through_display() {
    let reg = Registry::new();
    for (text, rendered) in [
        ("GET User WHERE age = 25", "age = 25"),
        ("GET User WHERE name = 'Ada'", "name = 'Ada'"),
        ("GET User WHERE name = 'café'", "name = 'café'"),
        ("GET User WHERE active = true", "active = true"),
    ] {
        let Query::Select(q) = oql::parse(text, &reg).unwrap() else {
            panic!("expected select");
        };
        assert_eq!(q.conditions[0].to_string(), rendered);
    }
}

#[test]
fn logic_tags_reflect_source_conjunctions() {
    let reg = Registry::new();
    let Query::Select(q) =
        oql::parse("GET User WHERE a = 1 OR b = 2 AND c = 3 OR d = 4", &reg).unwrap()
    else {
        panic!("expected select");
    };
    let logics: Vec<Logic> = q.conditions.iter().map(|c| c.logic).collect();
    assert_eq!(logics, vec![Logic::None, Logic::Or, Logic::And, Logic::Or]);
}

#[test]
fn between_and_in_shapes() {
    let reg = Registry::new();
    let Query::Select(q) = oql::parse(
        "GET User WHERE age BETWEEN 18 AND 65 AND status IN (active, pending)",
        &reg,
    )
    .unwrap() else {
        panic!("expected select");
    };

    let ConditionNode::Compare(between) = &q.conditions[0].node else {
        panic!("expected leaf");
    };
    assert_eq!(between.value.as_ref().unwrap().to_string(), "18");
    assert_eq!(between.value2.as_ref().unwrap().to_string(), "65");

    let ConditionNode::Compare(within) = &q.conditions[1].node else {
        panic!("expected leaf");
    };
    assert_eq!(within.values.len(), 2);
}

#[test]
fn mismatched_parens_never_produce_a_partial_tree() {
    let reg = Registry::new();
    for text in [
        "GET User WHERE (a = 1 OR b = 2",
        "GET User WHERE a = 1) AND b = 2",
        "(GET User UNION (GET Admin)",
    ] {
        assert!(
            matches!(oql::parse(text, &reg), Err(OqlError::Parse(_))),
            "{text}"
        );
    }
}

#[test]
fn nesting_depth_is_bounded() {
    let reg = Registry::new();
    let nested = |n: usize| format!("GET User WHERE {}a = 1{}", "(".repeat(n), ")".repeat(n));

    assert!(oql::parse(&nested(31), &reg).is_ok());

    let err = oql::parse(&nested(33), &reg).unwrap_err();
    assert!(err.to_string().contains("nesting deeper than 32"), "{err}");
}

// ============ End-to-end scenarios ============

#[test]
fn relational_end_to_end() {
    assert_eq!(
        sql(
            "GET User WHERE age > 25 AND status = 'active' ORDER BY name DESC LIMIT 10",
            Target::Postgres
        ),
        "SELECT * FROM users WHERE age > 25 AND status = 'active' ORDER BY name DESC LIMIT 10"
    );
}

#[test]
fn pipeline_end_to_end() {
    assert_eq!(
        stages("GET User WHERE age > 25 AND status = 'active' ORDER BY name DESC LIMIT 10"),
        vec![
            json!({ "$match": { "age": { "$gt": 25 }, "status": "active" } }),
            json!({ "$sort": { "name": -1 } }),
            json!({ "$limit": 10 }),
        ]
    );
}

#[test]
fn boolean_fold_permutations() {
    assert_eq!(
        stages("GET U WHERE a = 1 OR b = 2 AND c = 3")[0],
        json!({ "$match": { "$or": [ { "a": 1 }, { "$and": [ { "b": 2 }, { "c": 3 } ] } ] } })
    );
    assert_eq!(
        stages("GET U WHERE a = 1 AND b = 2 OR c = 3")[0],
        json!({ "$match": { "$or": [ { "$and": [ { "a": 1 }, { "b": 2 } ] }, { "c": 3 } ] } })
    );
    assert_eq!(
        stages("GET U WHERE a = 1 OR b = 2 OR c = 3 AND d = 4")[0],
        json!({ "$match": { "$or": [
            { "a": 1 },
            { "b": 2 },
            { "$and": [ { "c": 3 }, { "d": 4 } ] },
        ] } })
    );
}

#[test]
fn one_statement_translates_for_every_backend() {
    let reg = Registry::new();
    let query = oql::parse("UPDATE User age = 37 WHERE id = 9", &reg).unwrap();

    let relational = oql::translate(&query, Target::Mysql, &ctx(), &reg).unwrap();
    assert_eq!(
        relational,
        BackendArtifact::Relational {
            sql: "UPDATE users SET age = 37 WHERE id = 9".to_string(),
            expects_rows: false,
        }
    );

    let BackendArtifact::DocumentPipeline { operation, .. } =
        oql::translate(&query, Target::Mongo, &ctx(), &reg).unwrap()
    else {
        panic!("expected pipeline artifact");
    };
    assert_eq!(operation, "updateMany");

    let BackendArtifact::KeyValue { command, key, .. } =
        oql::translate(&query, Target::Redis, &ctx(), &reg).unwrap()
    else {
        panic!("expected key-value artifact");
    };
    assert_eq!(command, "HSET");
    assert_eq!(key, "users:9");
}

#[test]
fn unsupported_operations_name_the_offender() {
    let reg = Registry::new();
    let query = oql::parse("SAVEPOINT before_update", &reg).unwrap();
    let err = oql::translate(&query, Target::Redis, &ctx(), &reg).unwrap_err();
    assert!(err.to_string().contains("SAVEPOINT"), "{err}");

    let query = oql::parse("CREATE SEQUENCE ids start:1", &reg).unwrap();
    let err = oql::translate(&query, Target::Sqlite, &ctx(), &reg).unwrap_err();
    assert!(err.to_string().contains("CREATE SEQUENCE"), "{err}");
}

#[test]
fn failed_translation_leaves_the_ast_reusable() {
    let reg = Registry::new();
    let query = oql::parse("SAVEPOINT sp1", &reg).unwrap();
    assert!(oql::translate(&query, Target::Redis, &ctx(), &reg).is_err());
    assert_eq!(
        oql::translate(&query, Target::Postgres, &ctx(), &reg).unwrap(),
        BackendArtifact::Relational {
            sql: "SAVEPOINT sp1".to_string(),
            expects_rows: false,
        }
    );
}

#[test]
fn typo_suggestions_surface_in_errors() {
    let reg = Registry::new();
    let err = oql::parse("GET User WHRE age > 25", &reg).unwrap_err();
    assert!(err.to_string().contains("Did you mean 'WHERE'"), "{err}");
}

#[test]
fn nested_view_and_set_operation() {
    assert_eq!(
        sql(
            "CREATE VIEW active_names AS (GET User WHERE active = true) UNION (GET Admin)",
            Target::Postgres
        ),
        "CREATE VIEW active_names AS \
         SELECT * FROM users WHERE active = true UNION SELECT * FROM admins"
    );
}

#[test]
fn tenancy_flows_through_every_backend() {
    let tenant = TenantContext {
        schema: Some("acme".to_string()),
        key_prefix: Some("acme".to_string()),
    };
    let reg = Registry::new();

    let query = oql::parse("GET User WHERE id = 5", &reg).unwrap();
    let BackendArtifact::Relational { sql, .. } =
        oql::translate(&query, Target::Postgres, &tenant, &reg).unwrap()
    else {
        panic!("expected relational artifact");
    };
    assert_eq!(sql, "SELECT * FROM acme.users WHERE id = 5");

    let BackendArtifact::DocumentPipeline { collection, .. } =
        oql::translate(&query, Target::Mongo, &tenant, &reg).unwrap()
    else {
        panic!("expected pipeline artifact");
    };
    assert_eq!(collection, "acme_users");

    let BackendArtifact::KeyValue { key, .. } =
        oql::translate(&query, Target::Redis, &tenant, &reg).unwrap()
    else {
        panic!("expected key-value artifact");
    };
    assert_eq!(key, "acme:users:5");
}
