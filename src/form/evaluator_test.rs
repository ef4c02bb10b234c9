use super::*;
use crate::form::condition::Condition;
use crate::form::dependency::Dependency;
use crate::form::field::options;
use serde_json::json;

fn country_form() -> FormDefinition {
    FormDefinition::new(vec![
        Field::select("country", options([("United States", "US"), ("Canada", "CA")])),
        Field::input("state").dependency(Dependency::hides("country", Condition::not_equals("US"))),
        Field::select("region", options([("Any", "any")]))
            .dependency(Dependency::sets_options(
                "country",
                Condition::equals("CA"),
                options([("Ontario", "ON"), ("Quebec", "QC")]),
            ))
            .dependency(Dependency::sets_options(
                "country",
                Condition::equals("US"),
                options([("Texas", "TX")]),
            )),
    ])
    .unwrap()
}

fn values(evaluation: &Evaluation, key: &str) -> Vec<String> {
    evaluation.options(key).iter().map(|o| o.value.clone()).collect()
}

#[test]
fn test_hides_when_condition_fires() {
    let form = country_form();
    assert!(!evaluate(&form, &json!({ "country": "US" })).hidden("state"));
    assert!(evaluate(&form, &json!({ "country": "CA" })).hidden("state"));
}

#[test]
fn test_absent_source_is_not_defaulted() {
    let form = country_form();
    // Not-equals holds for an absent value, so the field hides
    assert!(evaluate(&form, &json!({})).hidden("state"));
    assert!(evaluate(&form, &json!({ "country": null })).hidden("state"));
}

#[test]
fn test_hides_is_or_of_all_dependencies() {
    let form = FormDefinition::new(vec![
        Field::switch("a"),
        Field::switch("b"),
        Field::input("c")
            .dependency(Dependency::hides("a", Condition::Truthy))
            .dependency(Dependency::hides("b", Condition::Truthy)),
    ])
    .unwrap();

    assert!(!evaluate(&form, &json!({ "a": false, "b": false })).hidden("c"));
    assert!(evaluate(&form, &json!({ "a": true, "b": false })).hidden("c"));
    assert!(evaluate(&form, &json!({ "a": false, "b": true })).hidden("c"));
    assert!(evaluate(&form, &json!({ "a": true, "b": true })).hidden("c"));
}

#[test]
fn test_sets_options_falls_back_to_declared() {
    let evaluation = evaluate(&country_form(), &json!({}));
    assert_eq!(values(&evaluation, "region"), vec!["any"]);
    assert!(!evaluation.is_overridden(&PropertyPath::key("region")));
}

#[test]
fn test_sets_options_replaces_declared() {
    let evaluation = evaluate(&country_form(), &json!({ "country": "CA" }));
    assert_eq!(values(&evaluation, "region"), vec!["ON", "QC"]);
    assert!(evaluation.is_overridden(&PropertyPath::key("region")));

    let evaluation = evaluate(&country_form(), &json!({ "country": "US" }));
    assert_eq!(values(&evaluation, "region"), vec!["TX"]);
}

#[test]
fn test_last_firing_sets_options_wins() {
    let form = FormDefinition::new(vec![
        Field::switch("pro"),
        Field::select("plan", options([("Free", "free")]))
            .dependency(Dependency::sets_options("pro", Condition::Truthy, options([("Team", "team")])))
            .dependency(Dependency::sets_options("pro", Condition::Present, options([("Org", "org")])))
            .dependency(Dependency::sets_options("pro", Condition::Absent, options([("None", "none")]))),
    ])
    .unwrap();

    let evaluation = evaluate(&form, &json!({ "pro": true }));
    assert_eq!(values(&evaluation, "plan"), vec!["org"]);
}

#[test]
fn test_sets_options_can_observe_target_value() {
    let form = FormDefinition::new(vec![
        Field::switch("locked"),
        Field::select("size", options([("S", "s"), ("M", "m"), ("L", "l")])).dependency(Dependency::sets_options(
            "locked",
            Condition::All(vec![
                Condition::Truthy,
                Condition::Target(Box::new(Condition::Present)),
            ]),
            options([("Current only", "m")]),
        )),
    ])
    .unwrap();

    assert_eq!(values(&evaluate(&form, &json!({ "locked": true })), "size").len(), 3);
    assert_eq!(
        values(&evaluate(&form, &json!({ "locked": true, "size": "m" })), "size"),
        vec!["m"]
    );
}

#[test]
fn test_values_outside_active_options_are_reported_not_cleared() {
    let snapshot = json!({ "country": "CA", "region": "TX" });
    let evaluation = evaluate(&country_form(), &snapshot);
    let conflicts: Vec<String> = evaluation.option_conflicts().map(|p| p.to_string()).collect();
    assert_eq!(conflicts, vec!["region"]);
    assert_eq!(snapshot["region"], "TX");
}

#[test]
fn test_checkbox_conflicts() {
    let form = FormDefinition::new(vec![Field::checkbox("tags", options([("A", "a"), ("B", "b")]))]).unwrap();
    assert_eq!(evaluate(&form, &json!({ "tags": ["a", "b"] })).option_conflicts().count(), 0);
    assert_eq!(evaluate(&form, &json!({ "tags": ["a", "z"] })).option_conflicts().count(), 1);
}

#[test]
fn test_array_items_evaluate_independently() {
    let form = FormDefinition::new(vec![Field::array(
        "contacts",
        vec![
            Field::select("type", options([("Email", "Email"), ("Phone", "Phone")])),
            Field::input("email").dependency(Dependency::hides("type", Condition::not_equals("Email"))),
            Field::input("phone").dependency(Dependency::hides("type", Condition::not_equals("Phone"))),
        ],
    )])
    .unwrap();

    let evaluation = evaluate(
        &form,
        &json!({ "contacts": [ { "type": "Email" }, { "type": "Phone" } ] }),
    );

    assert!(!evaluation.is_hidden(&PropertyPath::parse("contacts[0].email")));
    assert!(evaluation.is_hidden(&PropertyPath::parse("contacts[0].phone")));
    assert!(evaluation.is_hidden(&PropertyPath::parse("contacts[1].email")));
    assert!(!evaluation.is_hidden(&PropertyPath::parse("contacts[1].phone")));
    assert_eq!(
        evaluation.options_for(&PropertyPath::parse("contacts[1].type")).len(),
        2
    );
}

#[test]
fn test_children_of_hidden_array_are_hidden() {
    let form = FormDefinition::new(vec![
        Field::switch("business"),
        Field::array("vat_ids", vec![Field::input("number")])
            .dependency(Dependency::hides("business", Condition::Falsy)),
    ])
    .unwrap();

    let evaluation = evaluate(&form, &json!({ "business": false, "vat_ids": [ { "number": "1" } ] }));
    assert!(evaluation.hidden("vat_ids"));
    assert!(evaluation.is_hidden(&PropertyPath::parse("vat_ids[0].number")));
}

#[test]
fn test_malformed_snapshot_is_treated_as_absent() {
    let form = FormDefinition::new(vec![Field::array(
        "contacts",
        vec![
            Field::switch("primary"),
            Field::input("note").dependency(Dependency::hides("primary", Condition::Truthy)),
        ],
    )])
    .unwrap();

    assert_eq!(evaluate(&form, &json!("not an object")), Evaluation::default());
    assert_eq!(evaluate(&form, &json!({ "contacts": "nope" })).hidden_paths().count(), 0);

    let evaluation = evaluate(&form, &json!({ "contacts": [ 42, { "primary": true } ] }));
    assert!(!evaluation.is_hidden(&PropertyPath::parse("contacts[0].note")));
    assert!(evaluation.is_hidden(&PropertyPath::parse("contacts[1].note")));
}

#[test]
fn test_expression_conditions() {
    let form = FormDefinition::new(vec![
        Field::input("age"),
        Field::input("guardian").dependency(Dependency::hides("age", Condition::expr("source == () || source >= 18"))),
    ])
    .unwrap();

    assert!(evaluate(&form, &json!({})).hidden("guardian"));
    assert!(evaluate(&form, &json!({ "age": 30 })).hidden("guardian"));
    assert!(!evaluate(&form, &json!({ "age": 12 })).hidden("guardian"));
}

#[test]
fn test_unknown_paths_have_no_options() {
    let evaluation = evaluate(&country_form(), &json!({}));
    assert!(evaluation.options("state").is_empty());
    assert!(evaluation.options("missing").is_empty());
}
