use formstate_core::{ObjectConfig, ObjectState, Record, Value, ValueFieldConfig};
use proptest::prelude::*;

const KEYS: [&str; 3] = ["a", "b", "c"];

fn config() -> ObjectConfig {
    KEYS.iter()
        .fold(ObjectConfig::new(), |config, key| {
            config.field(*key, ValueFieldConfig::new())
        })
}

fn text_strategy() -> impl Strategy<Value = String> {
    prop_oneof![Just(String::new()), "[xyz]{1,2}"]
}

fn initial_strategy() -> impl Strategy<Value = Vec<Option<String>>> {
    prop::collection::vec(prop::option::of("[xyz]{1,2}"), KEYS.len())
}

fn edits_strategy() -> impl Strategy<Value = Vec<(usize, String)>> {
    prop::collection::vec((0..KEYS.len(), text_strategy()), 0..12)
}

fn build(initial: &[Option<String>]) -> (ObjectState, Record) {
    let record = Record::new();
    for (key, value) in KEYS.iter().zip(initial) {
        if let Some(value) = value {
            record.insert(*key, Value::from(value.as_str()));
        }
    }
    (ObjectState::new(config(), record.clone()), record)
}

fn apply(form: &ObjectState, edits: &[(usize, String)]) {
    for (index, text) in edits {
        form.field(KEYS[*index]).unwrap().set(text.as_str()).unwrap();
    }
}

fn snapshot(record: &Record) -> serde_json::Value {
    Value::Record(record.clone()).to_json()
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn dirty_tracks_divergence_from_initial(
        initial in initial_strategy(),
        edits in edits_strategy(),
    ) {
        let (form, record) = build(&initial);
        let before = snapshot(&record);
        apply(&form, &edits);
        prop_assert_eq!(form.dirty(), snapshot(&record) != before);
    }

    #[test]
    fn revert_restores_and_is_idempotent(
        initial in initial_strategy(),
        edits in edits_strategy(),
    ) {
        let (form, record) = build(&initial);
        let before = snapshot(&record);
        apply(&form, &edits);

        form.revert_changes();
        prop_assert_eq!(snapshot(&record), before.clone());
        prop_assert!(!form.dirty());
        prop_assert!(!form.touched());

        form.revert_changes();
        prop_assert_eq!(snapshot(&record), before);
    }

    #[test]
    fn revert_after_commit_changes_nothing(
        initial in initial_strategy(),
        edits in edits_strategy(),
    ) {
        let (form, record) = build(&initial);
        apply(&form, &edits);
        form.commit_changes().unwrap();
        let committed = snapshot(&record);
        prop_assert!(!form.dirty());

        form.revert_changes();
        prop_assert_eq!(snapshot(&record), committed);
        prop_assert!(!form.dirty());
    }
}
