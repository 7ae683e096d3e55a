//! Property-based tests over generated statements.

use oql::ast::{Logic, Query};
use oql::registry::{Registry, levenshtein};
use oql::{Target, TenantContext};
use proptest::prelude::*;

fn arb_field() -> impl Strategy<Value = String> {
    // Prefixed so no generated name uppercases into a registry keyword.
    "f_[a-z0-9]{0,6}"
}

fn arb_literal() -> impl Strategy<Value = String> {
    prop_oneof![
        (0i64..100_000).prop_map(|n| n.to_string()),
        "[a-zA-Z][a-zA-Z0-9 ]{0,11}".prop_map(|s| format!("'{s}'")),
        Just("true".to_string()),
        Just("false".to_string()),
    ]
}

fn arb_comparison() -> impl Strategy<Value = String> {
    let op = prop_oneof![
        Just("="),
        Just("!="),
        Just("<"),
        Just("<="),
        Just(">"),
        Just(">="),
    ];
    (arb_field(), op, arb_literal()).prop_map(|(f, op, v)| format!("{f} {op} {v}"))
}

fn arb_logic() -> impl Strategy<Value = Logic> {
    prop_oneof![Just(Logic::And), Just(Logic::Or)]
}

/// A flat condition list rendered as source text, paired with the logic tag
/// expected on each parsed element.
fn arb_condition_list() -> impl Strategy<Value = (String, Vec<Logic>)> {
    (
        arb_comparison(),
        prop::collection::vec((arb_logic(), arb_comparison()), 0..5),
    )
        .prop_map(|(first, rest)| {
            let mut text = first;
            let mut logics = vec![Logic::None];
            for (logic, cmp) in rest {
                let word = match logic {
                    Logic::And => "AND",
                    Logic::Or => "OR",
                    Logic::None => unreachable!(),
                };
                text.push_str(&format!(" {word} {cmp}"));
                logics.push(logic);
            }
            (text, logics)
        })
}

proptest! {
    #[test]
    fn generated_condition_lists_parse((text, logics) in arb_condition_list()) {
        let reg = Registry::new();
        let query = oql::parse(&format!("GET Item WHERE {text}"), &reg).unwrap();
        let Query::Select(q) = query else {
            panic!("expected select");
        };
        prop_assert_eq!(q.conditions.len(), logics.len());
        let parsed: Vec<Logic> = q.conditions.iter().map(|c| c.logic).collect();
        prop_assert_eq!(parsed, logics);
    }

    #[test]
    fn flat_conditions_round_trip_through_display((text, _) in arb_condition_list()) {
        let reg = Registry::new();
        let Query::Select(q) = oql::parse(&format!("GET Item WHERE {text}"), &reg).unwrap()
        else {
            panic!("expected select");
        };
        let rendered: Vec<String> = q.conditions.iter().map(|c| c.to_string()).collect();
        let reparsed = oql::parse(
            &format!("GET Item WHERE {}", rendered.join(" AND ")),
            &reg,
        )
        .unwrap();
        let Query::Select(q2) = reparsed else {
            panic!("expected select");
        };
        for (a, b) in q.conditions.iter().zip(&q2.conditions) {
            prop_assert_eq!(&a.node, &b.node);
        }
    }

    #[test]
    fn unclosed_group_always_fails((text, _) in arb_condition_list()) {
        let reg = Registry::new();
        let input = format!("GET Item WHERE ({text}");
        prop_assert!(oql::parse(&input, &reg).is_err());
    }

    #[test]
    fn translation_never_panics((text, _) in arb_condition_list()) {
        let reg = Registry::new();
        let ctx = TenantContext::default();
        let query = oql::parse(&format!("GET Item WHERE {text}"), &reg).unwrap();
        for target in [
            Target::Postgres,
            Target::Mysql,
            Target::Sqlite,
            Target::Mongo,
            Target::Redis,
        ] {
            let _ = oql::translate(&query, target, &ctx, &reg);
        }
    }

    #[test]
    fn classification_is_stable(word in "[A-Z]{1,12}") {
        let reg = Registry::new();
        prop_assert_eq!(reg.classify(&word), reg.classify(&word));
        prop_assert_eq!(reg.suggest(&word), reg.suggest(&word));
    }

    #[test]
    fn levenshtein_is_a_metric(a in "[a-z]{0,10}", b in "[a-z]{0,10}") {
        prop_assert_eq!(levenshtein(&a, &a), 0);
        prop_assert_eq!(levenshtein(&a, &b), levenshtein(&b, &a));
        prop_assert!(levenshtein(&a, &b) <= a.len().max(b.len()));
    }
}
