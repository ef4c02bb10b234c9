//! Property-based tests for definition construction and dependency evaluation

use formwork::form::{
    compile, evaluate, options, CompileOptions, Condition, Dependency, Field, FieldKind, FieldOption, FormDefinition,
    HiddenFieldPolicy,
};
use formwork::rules::ChainAdapter;
use formwork::ConfigurationErrorKind;
use proptest::collection::{hash_set, vec};
use proptest::prelude::*;
use serde_json::{json, Map, Value};
use std::collections::HashSet;

fn arb_key() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,8}"
}

/// One level of a field tree: distinct sibling keys, some of them arrays
/// with their own nested level
fn arb_level() -> impl Strategy<Value = Vec<Field>> {
    let leaf = hash_set(arb_key(), 1..5).prop_map(|keys| keys.into_iter().map(Field::input).collect::<Vec<_>>());
    leaf.prop_recursive(3, 24, 4, |inner| {
        (hash_set(arb_key(), 1..5), vec(proptest::option::of(inner), 4)).prop_map(|(keys, nested)| {
            keys.into_iter()
                .zip(nested)
                .map(|(key, children)| match children {
                    Some(children) => Field::array(key, children),
                    None => Field::input(key),
                })
                .collect()
        })
    })
}

fn keys_unique_at_every_level(fields: &[Field]) -> bool {
    let keys: HashSet<&str> = fields.iter().map(|f| f.key.as_str()).collect();
    keys.len() == fields.len() && fields.iter().all(|f| f.children().map_or(true, keys_unique_at_every_level))
}

/// Follows the first array field down to the innermost sibling list
fn innermost_level(fields: &mut Vec<Field>) -> &mut Vec<Field> {
    match fields.iter().position(|f| matches!(f.kind, FieldKind::Array { .. })) {
        Some(i) => match &mut fields[i].kind {
            FieldKind::Array { children, .. } => innermost_level(children),
            _ => unreachable!(),
        },
        None => fields,
    }
}

prop_compose! {
    fn arb_date()(year in 1990i32..2030, month in 1u32..=12, day in 1u32..=28) -> String {
        format!("{:04}-{:02}-{:02}", year, month, day)
    }
}

prop_compose! {
    fn arb_range()(a in arb_date(), b in arb_date()) -> Value {
        let (start, end) = if a <= b { (a, b) } else { (b, a) };
        json!({ "start": start, "end": end })
    }
}

/// A contact item; the note is only filled in when it is shown
fn arb_contact() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(json!({ "kind": "none" })),
        "[a-z ]{3,20}".prop_map(|note| json!({ "kind": "note", "note": note })),
    ]
}

fn switches(flags: &[bool]) -> Vec<Field> {
    (0..flags.len()).map(|i| Field::switch(format!("s{}", i))).collect()
}

fn flag_values(flags: &[bool]) -> Value {
    let map: Map<String, Value> = flags
        .iter()
        .enumerate()
        .map(|(i, flag)| (format!("s{}", i), Value::Bool(*flag)))
        .collect();
    Value::Object(map)
}

proptest! {
    #[test]
    fn prop_repeated_key_is_always_rejected(
        keys in prop::collection::hash_set(arb_key(), 1..6),
        pick in any::<prop::sample::Index>(),
    ) {
        let keys: Vec<String> = keys.into_iter().collect();
        let duplicate = pick.get(&keys).clone();

        let mut fields: Vec<Field> = keys.iter().map(Field::input).collect();
        fields.push(Field::input(duplicate.clone()).with_id(format!("{}_again", duplicate)));

        let err = FormDefinition::new(fields).unwrap_err();
        let is_duplicate = |kind: &ConfigurationErrorKind| {
            matches!(kind, ConfigurationErrorKind::DuplicateKey { key, .. } if *key == duplicate)
        };
        prop_assert!(err.errors().iter().any(|e| is_duplicate(&e.kind)));
    }

    #[test]
    fn prop_distinct_keys_are_accepted(keys in prop::collection::hash_set(arb_key(), 1..8)) {
        let fields: Vec<Field> = keys.iter().map(Field::input).collect();
        let definition = FormDefinition::new(fields).unwrap();
        prop_assert_eq!(definition.list_fields().len(), keys.len());
    }

    #[test]
    fn prop_generated_trees_are_accepted(tree in arb_level()) {
        prop_assert!(keys_unique_at_every_level(&tree));
        let definition = FormDefinition::new(tree.clone());
        prop_assert!(definition.is_ok(), "{:?}", definition.err());
        let definition = definition.unwrap();
        prop_assert_eq!(definition.list_fields(), tree.as_slice());
    }

    #[test]
    fn prop_nested_repeated_key_is_rejected(mut tree in arb_level()) {
        let level = innermost_level(&mut tree);
        let duplicate = level[0].key.clone();
        level.push(Field::input(duplicate.clone()).with_id(format!("{}_again", duplicate)));

        let err = FormDefinition::new(tree).unwrap_err();
        let is_duplicate = |kind: &ConfigurationErrorKind| {
            matches!(kind, ConfigurationErrorKind::DuplicateKey { key, .. } if *key == duplicate)
        };
        prop_assert!(err.errors().iter().any(|e| is_duplicate(&e.kind)));
    }

    #[test]
    fn prop_hidden_iff_any_hides_fires(flags in prop::collection::vec(any::<bool>(), 1..6)) {
        let mut fields = switches(&flags);
        let mut target = Field::input("target");
        for i in 0..flags.len() {
            target = target.dependency(Dependency::hides(format!("s{}", i), Condition::Truthy));
        }
        fields.push(target);
        let definition = FormDefinition::new(fields).unwrap();

        let evaluation = evaluate(&definition, &flag_values(&flags));
        prop_assert_eq!(evaluation.hidden("target"), flags.iter().any(|f| *f));
    }

    #[test]
    fn prop_last_firing_sets_options_wins(flags in prop::collection::vec(any::<bool>(), 1..6)) {
        let option_set = |i: usize| vec![FieldOption::new(format!("Set {}", i), format!("v{}", i))];

        let mut fields = switches(&flags);
        let mut target = Field::select("target", options([("Declared", "declared")]));
        for i in 0..flags.len() {
            target = target.dependency(Dependency::sets_options(format!("s{}", i), Condition::Truthy, option_set(i)));
        }
        fields.push(target);
        let definition = FormDefinition::new(fields).unwrap();

        let evaluation = evaluate(&definition, &flag_values(&flags));
        let expected = match flags.iter().rposition(|f| *f) {
            Some(i) => option_set(i),
            None => options([("Declared", "declared")]),
        };
        prop_assert_eq!(evaluation.options("target"), expected.as_slice());
    }

    #[test]
    fn prop_values_built_from_the_definition_validate(
        text in "[a-zA-Z ]{1,20}",
        toggle in any::<bool>(),
        choice in 0usize..3,
        picks in prop::collection::btree_set(0usize..3, 0..=3),
        items in 1usize..4,
    ) {
        let colors = options([("Red", "red"), ("Green", "green"), ("Blue", "blue")]);
        let definition = FormDefinition::new(vec![
            Field::input("name").required(true),
            Field::switch("subscribed"),
            Field::radio("color", colors.clone()).required(true),
            Field::checkbox("extras", colors.clone()),
            Field::array("rows", vec![Field::input("label").required(true)]).item_bounds(Some(1), Some(3)),
        ])
        .unwrap();
        let schema = compile(definition, &ChainAdapter, CompileOptions::default()).unwrap();

        let extras: Vec<&str> = picks.iter().map(|i| colors[*i].value.as_str()).collect();
        let rows: Vec<Value> = (0..items).map(|i| json!({ "label": format!("{} {}", text, i) })).collect();
        let values = json!({
            "name": text,
            "subscribed": toggle,
            "color": colors[choice].value,
            "extras": extras,
            "rows": rows,
        });

        let report = schema.validate(&values);
        prop_assert!(report.is_valid(), "{:?}", report.issues());
    }

    #[test]
    fn prop_values_satisfying_rule_chains_validate(
        text in "[a-z]{3,12}",
        slack in (0usize..3, 0usize..3),
        mailbox in "[a-z]{1,8}@[a-z]{1,8}\\.[a-z]{2,3}",
        bio in "[a-zA-Z ]{0,30}",
        digits in "[0-9]{1,10}",
        born in arb_date(),
        stay in arb_range(),
        choice in 0usize..3,
        picks in prop::collection::btree_set(0usize..3, 0..=3),
        toggle in any::<bool>(),
        contacts in vec(arb_contact(), 1..4),
    ) {
        let colors = options([("Red", "red"), ("Green", "green"), ("Blue", "blue")]);
        let bounds = format!(".min({}).max({})", text.len() - slack.0, text.len() + slack.1);
        let definition = FormDefinition::new(vec![
            Field::input("name").required(true).rules(bounds),
            Field::input("email").required(true).rules(".email()"),
            Field::textarea("bio").rules(".startsWith('Hi')"),
            Field::input("code").rules(".regex(/^[0-9]+$/)"),
            Field::date("born").required(true).rules(".date()"),
            Field::date_range("stay").required(true),
            Field::select("color", colors.clone()).required(true),
            Field::checkbox("extras", colors.clone()),
            Field::switch("subscribed"),
            Field::array(
                "contacts",
                vec![
                    Field::select("kind", options([("Note", "note"), ("None", "none")])).required(true),
                    Field::textarea("note")
                        .required(true)
                        .rules(".min(3)")
                        .dependency(Dependency::hides("kind", Condition::not_equals("note"))),
                ],
            )
            .item_bounds(Some(1), Some(3)),
        ])
        .unwrap();
        let options = CompileOptions {
            hidden_fields: HiddenFieldPolicy::SkipRequired,
            ..CompileOptions::default()
        };
        let schema = compile(definition, &ChainAdapter, options).unwrap();

        let extras: Vec<&str> = picks.iter().map(|i| colors[*i].value.as_str()).collect();
        let values = json!({
            "name": text,
            "email": mailbox,
            "bio": format!("Hi{}", bio),
            "code": digits,
            "born": born,
            "stay": stay,
            "color": colors[choice].value,
            "extras": extras,
            "subscribed": toggle,
            "contacts": contacts,
        });

        let report = schema.validate(&values);
        prop_assert!(report.is_valid(), "{:?}", report.issues());
    }
}
