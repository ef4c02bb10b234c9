use formwork::config::{load_definition, load_definitions_dir, parse_definition, render_definition, DefinitionFormat, Settings};
use formwork::form::{compile, evaluate, CompileOptions, FieldType, HiddenFieldPolicy};
use formwork::rules::ChainAdapter;
use formwork::{ConfigurationErrorKind, FormError};
use serde_json::json;
use std::fs;
use tempfile::TempDir;

const SIGNUP_JSON: &str = r#"
{
    "id": "signup",
    "title": "Sign up",
    "fields": [
        { "key": "email", "type": "input", "label": "Email", "required": true, "rules": ".email()" },
        {
            "key": "plan",
            "type": "radio",
            "options": [
                { "label": "Free", "value": "free" },
                { "label": "Pro", "value": "pro" }
            ]
        },
        {
            "key": "seats",
            "type": "input",
            "dependencies": [
                { "sourceField": "plan", "type": "HIDES", "when": { "notEquals": "pro" } }
            ]
        }
    ]
}
"#;

const SHIPPING_YAML: &str = r#"
id: shipping
fields:
  - key: country
    type: select
    options:
      - { label: United States, value: US }
      - { label: Canada, value: CA }
  - key: province
    type: select
    options:
      - { label: Other, value: other }
    dependencies:
      - sourceField: country
        type: SETS_OPTIONS
        value: CA
        options:
          - { label: Ontario, value: ON }
          - { label: Quebec, value: QC }
"#;

const CONTACTS_TOML: &str = r#"
id = "contacts"

[[fields]]
key = "contacts"
type = "array"
minItems = 1

[[fields.children]]
key = "kind"
type = "select"
options = [{ label = "Email", value = "email" }, { label = "Phone", value = "phone" }]

[[fields.children]]
key = "address"
type = "input"
required = true
"#;

#[test]
fn test_load_definitions_in_every_format() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let dir = temp_dir.path().join("forms");
    fs::create_dir_all(&dir)?;

    fs::write(dir.join("signup.json"), SIGNUP_JSON)?;
    fs::write(dir.join("shipping.yaml"), SHIPPING_YAML)?;
    fs::write(dir.join("contacts.toml"), CONTACTS_TOML)?;
    fs::write(dir.join("README.md"), "not a definition")?;

    let loaded = load_definitions_dir(&dir)?;
    let ids: Vec<_> = loaded.iter().map(|(_, d)| d.id().unwrap_or_default()).collect();
    // Sorted by file name
    assert_eq!(ids, vec!["contacts", "shipping", "signup"]);

    let (_, contacts) = &loaded[0];
    let array = contacts.find_field("contacts").unwrap();
    assert_eq!(array.field_type(), FieldType::Array);
    assert_eq!(array.children().map(|c| c.len()), Some(2));

    let (_, signup) = &loaded[2];
    assert_eq!(signup.title(), Some("Sign up"));
    assert_eq!(signup.list_fields().len(), 3);

    Ok(())
}

#[test]
fn test_loaded_definition_compiles_and_validates() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("signup.json");
    fs::write(&path, SIGNUP_JSON)?;

    let schema = compile(load_definition(&path)?, &ChainAdapter, CompileOptions::default())?;

    assert!(schema.validate(&json!({ "email": "a@b.io", "plan": "free" })).is_valid());

    let report = schema.validate(&json!({ "email": "nope", "plan": "gold" }));
    let messages: Vec<_> = report.issues().iter().map(|i| (i.path.to_string(), i.message.clone())).collect();
    assert!(messages.contains(&("email".to_string(), "Invalid email".to_string())));
    assert!(messages.contains(&("plan".to_string(), "Invalid option 'gold'".to_string())));

    Ok(())
}

#[test]
fn test_invalid_definition_reports_every_problem() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("broken.yaml");
    fs::write(
        &path,
        r#"
fields:
  - key: color
    type: select
  - key: color
    type: input
  - key: size
    type: input
    dependencies:
      - sourceField: weight
        type: HIDES
        value: heavy
"#,
    )?;

    let err = load_definition(&path).unwrap_err();
    let FormError::Definition(err) = err else {
        panic!("expected a definition error, got {err:?}");
    };
    assert!(err.errors().len() >= 3);
    assert!(err.contains(&ConfigurationErrorKind::MissingOptions(FieldType::Select)));
    assert!(err.contains(&ConfigurationErrorKind::DanglingSource("weight".to_string())));
    assert!(err
        .errors()
        .iter()
        .any(|e| matches!(e.kind, ConfigurationErrorKind::DuplicateKey { .. })));

    Ok(())
}

#[test]
fn test_yaml_conditions_use_map_syntax() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("address.yaml");
    fs::write(
        &path,
        r#"
fields:
  - key: country
    type: select
    options:
      - { label: United States, value: US }
      - { label: Canada, value: CA }
  - key: state
    type: input
    dependencies:
      - sourceField: country
        type: HIDES
        when: { notEquals: US }
  - key: postcode
    type: input
    dependencies:
      - sourceField: country
        type: HIDES
        when:
          any:
            - absent
            - { oneOf: [CA] }
            - { expr: 'source == "XX"' }
"#,
    )?;

    let definition = load_definition(&path)?;
    let us = evaluate(&definition, &json!({ "country": "US" }));
    assert!(!us.hidden("state"));
    assert!(!us.hidden("postcode"));

    let ca = evaluate(&definition, &json!({ "country": "CA" }));
    assert!(ca.hidden("state"));
    assert!(ca.hidden("postcode"));
    assert!(evaluate(&definition, &json!({})).hidden("postcode"));

    // Written back in the same shape it was read
    let rendered = render_definition(&definition, DefinitionFormat::Yaml)?;
    assert!(rendered.contains("notEquals: US"));
    assert_eq!(parse_definition(&rendered, DefinitionFormat::Yaml)?, definition);

    Ok(())
}

#[test]
fn test_unsupported_extension_is_rejected() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("form.ini");
    fs::write(&path, "[fields]")?;

    assert!(matches!(load_definition(&path), Err(FormError::UnsupportedFormat(_))));
    Ok(())
}

#[test]
fn test_settings_point_at_definitions() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();
    fs::create_dir_all(root.join("forms"))?;
    fs::write(root.join("forms/shipping.yml"), SHIPPING_YAML)?;
    fs::write(
        root.join("formwork.toml"),
        r#"
[compiler]
hidden_fields = "skip"

[definitions]
dir = "forms"
"#,
    )?;

    let settings = Settings::from_root(root)?;
    assert_eq!(settings.compile_options().hidden_fields, HiddenFieldPolicy::Skip);

    let definitions = settings.load_definitions()?;
    assert_eq!(definitions.len(), 1);
    assert_eq!(definitions[0].1.id(), Some("shipping"));

    Ok(())
}
