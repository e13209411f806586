use formstate_core::{FormHost, FormInput, ObjectConfig, Record, Value, ValueFieldConfig};
use serde_json::json;

fn config() -> ObjectConfig {
    ObjectConfig::new()
        .field("id", ValueFieldConfig::new())
        .field("name", ValueFieldConfig::new())
}

fn record(json: serde_json::Value) -> Record {
    Value::from_json(json).as_record().cloned().unwrap()
}

#[test]
fn same_instance_is_not_reapplied() {
    let input = record(json!({"id": 1, "name": "a"}));
    let mut host = FormHost::new(config(), FormInput::Value(input.clone().into())).unwrap();
    host.state().field("name").unwrap().set("edited").unwrap();

    // Same handle: the local edit stands.
    assert!(!host.update(FormInput::Value(input.into())).unwrap());
    assert!(host.state().dirty());
}

#[test]
fn new_instance_refreshes_clean_fields() {
    let mut host = FormHost::new(
        config(),
        FormInput::Value(record(json!({"id": 1, "name": "a"})).into()),
    )
    .unwrap();
    let next = record(json!({"id": 1, "name": "b"}));
    assert!(host.update(FormInput::Value(next.into())).unwrap());

    let name = host.state().field("name").unwrap();
    assert_eq!(name.value().as_str(), Some("b"));
    assert!(!name.dirty());
}

#[test]
fn mapped_input_falls_back_to_default() {
    let source = record(json!({"user": {"id": 7, "name": "n"}}));
    let pick_user = |input: &Value| {
        input
            .as_record()
            .map(|record| record.get("user"))
            .unwrap_or_default()
    };
    let mut host = FormHost::new(
        config(),
        FormInput::mapped(source, pick_user).with_default(record(json!({"name": "guest"}))),
    )
    .unwrap();
    assert_eq!(host.state().field("id").unwrap().value().as_f64(), Some(7.0));

    let empty = Record::new();
    assert!(
        host.update(FormInput::mapped(empty, pick_user).with_default(record(json!({"name": "guest"}))))
            .unwrap()
    );
    assert_eq!(
        host.state().field("name").unwrap().value().as_str(),
        Some("guest")
    );
}

#[test]
fn non_record_input_is_a_type_mismatch() {
    let err = FormHost::new(config(), FormInput::Value(Value::from(3))).unwrap_err();
    assert!(err.to_string().contains("expects a record"));
}
