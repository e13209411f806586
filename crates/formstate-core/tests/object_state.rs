use std::cell::Cell;
use std::rc::Rc;

use formstate_core::{
    ObjectConfig, ObjectState, Record, SetOptions, Value, ValueFieldConfig, required,
};
use insta::assert_json_snapshot;
use serde_json::json;

fn record(json: serde_json::Value) -> Record {
    Value::from_json(json).as_record().cloned().unwrap()
}

fn author_config() -> ObjectConfig {
    ObjectConfig::new()
        .field("id", ValueFieldConfig::new())
        .field("firstName", ValueFieldConfig::new())
        .field("lastName", ValueFieldConfig::new())
        .field("fullName", ValueFieldConfig::new().computed())
        .field(
            "publisher",
            ObjectConfig::new()
                .reference()
                .field("id", ValueFieldConfig::new())
                .field("name", ValueFieldConfig::new()),
        )
}

#[test]
fn required_title_blocks_validity_until_set() {
    let config = ObjectConfig::new().field("title", ValueFieldConfig::new().rule(required()));
    let form = ObjectState::new(config, Record::new());
    assert!(!form.valid());
    assert_eq!(form.errors(), ["title: Required"]);

    form.field("title").unwrap().set("b1").unwrap();
    assert!(form.valid());
    assert!(form.errors().is_empty());
}

#[test]
fn changed_value_carries_id_and_dirty_fields() {
    let form = ObjectState::new(
        author_config(),
        record(json!({"id": "a:1", "firstName": "f", "lastName": "l"})),
    );
    form.field("lastName").unwrap().set("l2").unwrap();

    assert_json_snapshot!(form.changed_value().to_json(), @r#"
    {
      "id": "a:1",
      "lastName": "l2"
    }
    "#);
}

#[test]
fn new_entity_sends_non_empty_initial_values() {
    let form = ObjectState::new(
        author_config(),
        record(json!({"firstName": "seeded", "fullName": "seeded x"})),
    );
    assert!(form.is_new_entity());
    form.field("lastName").unwrap().set("x").unwrap();

    assert_json_snapshot!(form.changed_value().to_json(), @r#"
    {
      "firstName": "seeded",
      "lastName": "x"
    }
    "#);
}

#[test]
fn reference_object_only_emits_its_id() {
    let form = ObjectState::new(
        author_config(),
        record(json!({"id": "a:1", "publisher": {"id": "p:1", "name": "Old"}})),
    );
    form.object("publisher")
        .unwrap()
        .set(record(json!({"id": "p:2", "name": "New"})))
        .unwrap();

    assert_json_snapshot!(form.changed_value().to_json(), @r#"
    {
      "id": "a:1",
      "publisher": {
        "id": "p:2"
      }
    }
    "#);
}

#[test]
fn cleared_reference_emits_null_id() {
    let form = ObjectState::new(
        author_config(),
        record(json!({"id": "a:1", "publisher": {"id": "p:1"}})),
    );
    form.object("publisher").unwrap().set(Value::Null).unwrap();
    assert_eq!(
        form.changed_value().to_json(),
        json!({"id": "a:1", "publisher": {"id": null}})
    );
}

#[test]
fn partial_set_only_touches_supplied_keys() {
    let form = ObjectState::new(
        author_config(),
        record(json!({"id": "a:1", "firstName": "f", "lastName": "l"})),
    );
    form.set(record(json!({"lastName": "l2"}))).unwrap();
    assert_eq!(form.field("firstName").unwrap().value().as_str(), Some("f"));
    assert_eq!(form.field("lastName").unwrap().value().as_str(), Some("l2"));
}

#[test]
fn bulk_set_skips_focused_field() {
    let form = ObjectState::new(
        author_config(),
        record(json!({"id": "a:1", "firstName": "f", "lastName": "l"})),
    );
    let first = form.field("firstName").unwrap();
    first.focus();
    first.set("typing").unwrap();

    form.set_with(
        record(json!({"firstName": "server", "lastName": "server"})),
        SetOptions::refresh(),
    )
    .unwrap();
    assert_eq!(first.value().as_str(), Some("typing"));
    assert_eq!(form.field("lastName").unwrap().value().as_str(), Some("server"));
}

#[test]
fn can_save_touches_everything() {
    let config = ObjectConfig::new()
        .field("title", ValueFieldConfig::new().rule(required()))
        .field("nested", ObjectConfig::new().field("a", ValueFieldConfig::new()));
    let form = ObjectState::new(config, record(json!({"nested": {}})));
    assert!(!form.touched());
    assert!(!form.can_save());
    assert!(form.touched());
    assert!(form.object("nested").unwrap().field("a").unwrap().touched());
}

#[test]
fn commit_then_revert_is_a_no_op() {
    let root = record(json!({"id": "a:1", "firstName": "f", "lastName": "l"}));
    let form = ObjectState::new(author_config(), root.clone());
    form.field("firstName").unwrap().set("g").unwrap();
    form.commit_changes().unwrap();
    assert!(!form.dirty());

    form.revert_changes();
    assert_eq!(
        Value::Record(root).to_json(),
        json!({"id": "a:1", "firstName": "g", "lastName": "l"})
    );
    assert!(!form.dirty());
}

#[test]
fn revert_twice_matches_revert_once() {
    let root = record(json!({"id": "a:1", "firstName": "f"}));
    let form = ObjectState::new(author_config(), root.clone());
    form.field("firstName").unwrap().set("g").unwrap();
    form.field("lastName").unwrap().set("l").unwrap();

    form.revert_changes();
    let once = Value::Record(root.clone()).to_json();
    form.revert_changes();
    assert_eq!(Value::Record(root).to_json(), once);
    assert_eq!(once, json!({"id": "a:1", "firstName": "f"}));
}

#[test]
fn init_hook_derives_computed_field() {
    let config = author_config().on_init(|form| {
        let weak = form.downgrade();
        form.subscribe(move || {
            let Some(form) = weak.upgrade() else { return };
            let first = form.field("firstName").unwrap().value();
            let last = form.field("lastName").unwrap().value();
            let full = format!(
                "{} {}",
                first.as_str().unwrap_or_default(),
                last.as_str().unwrap_or_default()
            );
            form.field("fullName").unwrap().set(full.trim()).unwrap();
        });
    });
    let form = ObjectState::new(config, record(json!({"id": "a:1"})));
    form.field("firstName").unwrap().set("Ada").unwrap();
    form.field("lastName").unwrap().set("Lovelace").unwrap();

    assert_eq!(
        form.field("fullName").unwrap().value().as_str(),
        Some("Ada Lovelace")
    );
    // Computed fields never reach the payload.
    assert_eq!(
        form.changed_value().to_json(),
        json!({"id": "a:1", "firstName": "Ada", "lastName": "Lovelace"})
    );
}

#[test]
fn object_rules_see_sibling_fields() {
    let config = ObjectConfig::new()
        .field("start", ValueFieldConfig::new())
        .field("end", ValueFieldConfig::new())
        .rule(Rc::new(|form: &ObjectState| {
            let start = form.field("start")?.value().as_f64()?;
            let end = form.field("end")?.value().as_f64()?;
            (end < start).then(|| "end must not precede start".to_string())
        }));
    let form = ObjectState::new(config, record(json!({"start": 5, "end": 3})));
    assert_eq!(form.errors(), ["end must not precede start"]);
    form.field("end").unwrap().set(7).unwrap();
    assert!(form.valid());
}

#[test]
fn unsubscribed_listener_is_silent() {
    let form = ObjectState::new(author_config(), Record::new());
    let hits = Rc::new(Cell::new(0));
    let counter = Rc::clone(&hits);
    let id = form.subscribe(move || counter.set(counter.get() + 1));
    form.field("firstName").unwrap().set("a").unwrap();
    assert!(form.unsubscribe(id));
    form.field("firstName").unwrap().set("b").unwrap();
    assert_eq!(hits.get(), 1);
}
