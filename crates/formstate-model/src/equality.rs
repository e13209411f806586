//! Structural equality and deep cloning over the live value graph.
//!
//! Both walks tolerate cyclic input: equality keeps a set of record/list
//! pairs already under comparison, and cloning memoizes every handle it has
//! copied so shared and cyclic structure comes out the same shape.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::value::{List, Record, Value};

/// Whether list comparison is positional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ListOrder {
    /// Lists are equal only when items match position by position.
    #[default]
    Strict,
    /// Lists are equal when they hold the same items in any order.
    Unordered,
}

impl ListOrder {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            ListOrder::Strict
        } else {
            ListOrder::Unordered
        }
    }
}

type SeenPairs = HashSet<(usize, usize)>;

/// Structural equality.
///
/// Records compare key by key with `Undefined` entries treated as absent.
/// Opaque values compare by reference unless both expose a JSON form.
pub fn deep_equal(left: &Value, right: &Value, order: ListOrder) -> bool {
    let mut seen = SeenPairs::new();
    equal_inner(left, right, order, &mut seen)
}

fn equal_inner(left: &Value, right: &Value, order: ListOrder, seen: &mut SeenPairs) -> bool {
    match (left, right) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::Text(a), Value::Text(b)) => a == b,
        (Value::Opaque(a), Value::Opaque(b)) => {
            a.ptr_eq(b)
                || matches!((a.to_json(), b.to_json()), (Some(x), Some(y)) if x == y)
        }
        (Value::Opaque(opaque), other) | (other, Value::Opaque(opaque)) => opaque
            .to_json()
            .is_some_and(|json| !other.is_undefined() && json == other.to_json()),
        (Value::Record(a), Value::Record(b)) => records_equal(a, b, order, seen),
        (Value::List(a), Value::List(b)) => lists_equal(a, b, order, seen),
        _ => false,
    }
}

fn records_equal(left: &Record, right: &Record, order: ListOrder, seen: &mut SeenPairs) -> bool {
    if left.ptr_eq(right) || !seen.insert((left.identity(), right.identity())) {
        return true;
    }
    let left_entries = left.entries();
    for (key, value) in &left_entries {
        if !equal_inner(value, &right.get(key), order, seen) {
            return false;
        }
    }
    right
        .entries()
        .iter()
        .filter(|(key, _)| !left.contains_key(key))
        .all(|(_, value)| value.is_undefined())
}

fn lists_equal(left: &List, right: &List, order: ListOrder, seen: &mut SeenPairs) -> bool {
    if left.ptr_eq(right) || !seen.insert((left.identity(), right.identity())) {
        return true;
    }
    let left_items = left.values();
    let right_items = right.values();
    if left_items.len() != right_items.len() {
        return false;
    }
    match order {
        ListOrder::Strict => left_items
            .iter()
            .zip(&right_items)
            .all(|(a, b)| equal_inner(a, b, order, seen)),
        ListOrder::Unordered => {
            let mut matched = vec![false; right_items.len()];
            'outer: for item in &left_items {
                for (index, candidate) in right_items.iter().enumerate() {
                    if matched[index] {
                        continue;
                    }
                    // A failed trial must not leave assumptions behind.
                    let mut trial = seen.clone();
                    if equal_inner(item, candidate, order, &mut trial) {
                        *seen = trial;
                        matched[index] = true;
                        continue 'outer;
                    }
                }
                return false;
            }
            true
        }
    }
}

/// Structural copy of `value`.
///
/// Records and lists are copied; opaque values are shared. A handle reached
/// twice is copied once, so cycles survive the clone.
pub fn deep_clone(value: &Value) -> Value {
    let mut memo = HashMap::new();
    clone_inner(value, &mut memo)
}

/// Structural copy of a record.
pub fn deep_clone_record(record: &Record) -> Record {
    match deep_clone(&Value::Record(record.clone())) {
        Value::Record(copy) => copy,
        _ => Record::new(),
    }
}

fn clone_inner(value: &Value, memo: &mut HashMap<usize, Value>) -> Value {
    match value {
        Value::Record(record) => {
            if let Some(copy) = memo.get(&record.identity()) {
                return copy.clone();
            }
            let copy = Record::new();
            memo.insert(record.identity(), Value::Record(copy.clone()));
            for (key, item) in record.entries() {
                copy.insert(key, clone_inner(&item, memo));
            }
            Value::Record(copy)
        }
        Value::List(list) => {
            if let Some(copy) = memo.get(&list.identity()) {
                return copy.clone();
            }
            let copy = List::new();
            memo.insert(list.identity(), Value::List(copy.clone()));
            for item in list.values() {
                copy.push(clone_inner(&item, memo));
            }
            Value::List(copy)
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Opaque, OpaqueValue};
    use serde_json::json;
    use std::any::Any;

    fn v(json: serde_json::Value) -> Value {
        Value::from_json(json)
    }

    #[derive(Debug)]
    struct Day(&'static str);

    impl OpaqueValue for Day {
        fn to_json(&self) -> Option<serde_json::Value> {
            Some(json!(self.0))
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[derive(Debug)]
    struct Handle;

    impl OpaqueValue for Handle {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn records_compare_structurally() {
        assert!(deep_equal(
            &v(json!({"a": 1, "b": {"c": [1, 2]}})),
            &v(json!({"b": {"c": [1, 2]}, "a": 1})),
            ListOrder::Strict
        ));
        assert!(!deep_equal(&v(json!({"a": 1})), &v(json!({"a": 2})), ListOrder::Strict));
    }

    #[test]
    fn undefined_entries_count_as_absent() {
        let record = Record::from_entries([("a", Value::from(1)), ("b", Value::Undefined)]);
        assert!(deep_equal(&Value::Record(record), &v(json!({"a": 1})), ListOrder::Strict));
    }

    #[test]
    fn list_order_policy() {
        let a = v(json!([1, 2, 3]));
        let b = v(json!([3, 1, 2]));
        assert!(!deep_equal(&a, &b, ListOrder::Strict));
        assert!(deep_equal(&a, &b, ListOrder::Unordered));
        assert!(!deep_equal(&a, &v(json!([1, 1, 2])), ListOrder::Unordered));
    }

    #[test]
    fn null_and_undefined_differ() {
        assert!(!deep_equal(&Value::Null, &Value::Undefined, ListOrder::Strict));
    }

    #[test]
    fn opaque_values_use_the_serialization_hook() {
        let a = Value::Opaque(Opaque::new(Day("2024-01-01")));
        let b = Value::Opaque(Opaque::new(Day("2024-01-01")));
        assert!(deep_equal(&a, &b, ListOrder::Strict));
        assert!(deep_equal(&a, &Value::from("2024-01-01"), ListOrder::Strict));
    }

    #[test]
    fn opaque_values_without_hook_compare_by_reference() {
        let handle = Opaque::new(Handle);
        let a = Value::Opaque(handle.clone());
        assert!(deep_equal(&a, &Value::Opaque(handle), ListOrder::Strict));
        assert!(!deep_equal(&a, &Value::Opaque(Opaque::new(Handle)), ListOrder::Strict));
    }

    #[test]
    fn cyclic_records_terminate() {
        let a = Record::from_entries([("name", Value::from("n"))]);
        a.insert("self", Value::Record(a.clone()));
        let b = Record::from_entries([("name", Value::from("n"))]);
        b.insert("self", Value::Record(b.clone()));
        assert!(deep_equal(&Value::Record(a.clone()), &Value::Record(b.clone()), ListOrder::Strict));

        b.insert("name", Value::from("m"));
        assert!(!deep_equal(&Value::Record(a), &Value::Record(b), ListOrder::Strict));
    }

    #[test]
    fn clone_is_detached() {
        let original = v(json!({"a": {"b": 1}}));
        let copy = deep_clone(&original);
        assert!(deep_equal(&original, &copy, ListOrder::Strict));
        assert!(!original.same_instance(&copy));

        let inner = copy.as_record().unwrap().get("a");
        inner.as_record().unwrap().insert("b", Value::from(2));
        assert_eq!(original.to_json(), json!({"a": {"b": 1}}));
    }

    #[test]
    fn clone_preserves_cycles() {
        let record = Record::new();
        record.insert("me", Value::Record(record.clone()));
        let copy = deep_clone_record(&record);
        let inner = copy.get("me");
        assert!(inner.as_record().unwrap().ptr_eq(&copy));
        assert!(!copy.ptr_eq(&record));
    }

    #[test]
    fn clone_shares_opaque_values() {
        let handle = Opaque::new(Handle);
        let record = Record::from_entries([("h", Value::Opaque(handle.clone()))]);
        let copy = deep_clone_record(&record);
        assert!(copy.get("h").same_instance(&Value::Opaque(handle)));
    }
}
