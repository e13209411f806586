//! The live value graph edited by forms.
//!
//! Records and lists are shared handles: the host and every field state that
//! edits the same instance see the same allocation, so a write through one
//! handle is immediately visible through all others. Identity ("is this the
//! same row?") is handle identity, not structural equality.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

/// A host value carried through the form without structural inspection.
///
/// Opaque values compare by reference unless both sides expose a JSON form
/// through [`OpaqueValue::to_json`].
pub trait OpaqueValue: fmt::Debug {
    /// Serialization hook used for equality and wire output.
    fn to_json(&self) -> Option<serde_json::Value> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to an [`OpaqueValue`].
#[derive(Clone)]
pub struct Opaque(Rc<dyn OpaqueValue>);

impl Opaque {
    pub fn new(value: impl OpaqueValue + 'static) -> Self {
        Self(Rc::new(value))
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }

    #[inline]
    pub fn identity(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub fn to_json(&self) -> Option<serde_json::Value> {
        self.0.to_json()
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Shared, insertion-ordered record.
#[derive(Clone, Default)]
pub struct Record(Rc<RefCell<IndexMap<String, Value>>>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from key/value pairs, keeping their order.
    pub fn from_entries<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let map = entries
            .into_iter()
            .map(|(key, value)| (key.into(), value))
            .collect();
        Self(Rc::new(RefCell::new(map)))
    }

    /// Value stored under `key`, or [`Value::Undefined`] when absent.
    pub fn get(&self, key: &str) -> Value {
        self.0.borrow().get(key).cloned().unwrap_or_default()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.borrow().contains_key(key)
    }

    /// Store `value` under `key`, returning the previous value.
    pub fn insert(&self, key: impl Into<String>, value: Value) -> Value {
        self.0
            .borrow_mut()
            .insert(key.into(), value)
            .unwrap_or_default()
    }

    /// Remove `key`, preserving the order of the remaining entries.
    pub fn remove(&self, key: &str) -> Value {
        self.0.borrow_mut().shift_remove(key).unwrap_or_default()
    }

    pub fn keys(&self) -> Vec<String> {
        self.0.borrow().keys().cloned().collect()
    }

    /// Snapshot of the entries. Nested records and lists are shared handles.
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.0
            .borrow()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Address-based identity, stable for as long as a handle is alive.
    #[inline]
    pub fn identity(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Record({})", Value::Record(self.clone()).to_json())
    }
}

/// Shared, ordered list.
#[derive(Clone, Default)]
pub struct List(Rc<RefCell<Vec<Value>>>);

impl List {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        Self(Rc::new(RefCell::new(values.into_iter().collect())))
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.borrow().get(index).cloned()
    }

    /// Replace the item at `index`. Out-of-range indexes are ignored.
    pub fn set(&self, index: usize, value: Value) {
        if let Some(slot) = self.0.borrow_mut().get_mut(index) {
            *slot = value;
        }
    }

    pub fn push(&self, value: Value) {
        self.0.borrow_mut().push(value);
    }

    /// Insert at `index`, clamped to the current length.
    pub fn insert(&self, index: usize, value: Value) {
        let mut items = self.0.borrow_mut();
        let index = index.min(items.len());
        items.insert(index, value);
    }

    pub fn remove(&self, index: usize) -> Option<Value> {
        let mut items = self.0.borrow_mut();
        (index < items.len()).then(|| items.remove(index))
    }

    /// Position of `value`, by handle identity for records, lists and opaque
    /// values and by plain equality otherwise.
    pub fn position(&self, value: &Value) -> Option<usize> {
        self.0.borrow().iter().position(|item| match value.identity() {
            Some(_) => item.same_instance(value),
            None => crate::deep_equal(item, value, crate::ListOrder::Strict),
        })
    }

    /// Snapshot of the items. Records and lists are shared handles.
    pub fn values(&self) -> Vec<Value> {
        self.0.borrow().clone()
    }

    /// Swap in new contents while keeping this list's identity.
    pub fn replace(&self, values: Vec<Value>) {
        *self.0.borrow_mut() = values;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    #[inline]
    pub fn identity(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

impl fmt::Debug for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "List({})", Value::List(self.clone()).to_json())
    }
}

/// A value held by a field or stored in a record.
#[derive(Clone, Debug, Default)]
pub enum Value {
    /// Never set.
    #[default]
    Undefined,
    /// Explicitly cleared.
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(List),
    Record(Record),
    Opaque(Opaque),
}

impl Value {
    #[inline]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// `Undefined` or `Null`.
    #[inline]
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// `Undefined`, `Null` or the empty string.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => true,
            Value::Text(text) => text.is_empty(),
            _ => false,
        }
    }

    /// A non-empty string made only of whitespace.
    pub fn is_blank_text(&self) -> bool {
        matches!(self, Value::Text(text) if !text.is_empty() && text.trim().is_empty())
    }

    /// Loose truthiness, used for row-level read-only indicators.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(flag) => *flag,
            Value::Number(number) => *number != 0.0 && !number.is_nan(),
            Value::Text(text) => !text.is_empty(),
            Value::List(_) | Value::Record(_) | Value::Opaque(_) => true,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(number) => Some(*number),
            _ => None,
        }
    }

    /// Handle identity for records, lists and opaque values.
    pub fn identity(&self) -> Option<usize> {
        match self {
            Value::Record(record) => Some(record.identity()),
            Value::List(list) => Some(list.identity()),
            Value::Opaque(opaque) => Some(opaque.identity()),
            _ => None,
        }
    }

    /// True when both sides are handles to the same allocation.
    pub fn same_instance(&self, other: &Value) -> bool {
        match (self.identity(), other.identity()) {
            (Some(left), Some(right)) => left == right,
            _ => false,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::List(_) => "list",
            Value::Record(_) => "record",
            Value::Opaque(_) => "opaque",
        }
    }

    /// Build a detached value graph from JSON.
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(flag) => Value::Bool(flag),
            serde_json::Value::Number(number) => {
                number.as_f64().map_or(Value::Null, Value::Number)
            }
            serde_json::Value::String(text) => Value::Text(text),
            serde_json::Value::Array(items) => {
                Value::List(List::from_values(items.into_iter().map(Value::from_json)))
            }
            serde_json::Value::Object(map) => Value::Record(Record::from_entries(
                map.into_iter().map(|(key, value)| (key, Value::from_json(value))),
            )),
        }
    }

    /// Render as JSON.
    ///
    /// `Undefined` record entries are omitted, and a record or list that
    /// contains itself renders the back-reference as `null`.
    pub fn to_json(&self) -> serde_json::Value {
        let mut path = Vec::new();
        self.to_json_inner(&mut path)
    }

    fn to_json_inner(&self, path: &mut Vec<usize>) -> serde_json::Value {
        match self {
            Value::Undefined | Value::Null => serde_json::Value::Null,
            Value::Bool(flag) => serde_json::Value::Bool(*flag),
            Value::Number(number) => number_to_json(*number),
            Value::Text(text) => serde_json::Value::String(text.clone()),
            Value::Opaque(opaque) => opaque.to_json().unwrap_or(serde_json::Value::Null),
            Value::List(list) => {
                let id = list.identity();
                if path.contains(&id) {
                    return serde_json::Value::Null;
                }
                path.push(id);
                let items = list
                    .values()
                    .iter()
                    .map(|item| item.to_json_inner(path))
                    .collect();
                path.pop();
                serde_json::Value::Array(items)
            }
            Value::Record(record) => {
                let id = record.identity();
                if path.contains(&id) {
                    return serde_json::Value::Null;
                }
                path.push(id);
                let mut map = serde_json::Map::new();
                for (key, value) in record.entries() {
                    if value.is_undefined() {
                        continue;
                    }
                    map.insert(key, value.to_json_inner(path));
                }
                path.pop();
                serde_json::Value::Object(map)
            }
        }
    }
}

fn number_to_json(number: f64) -> serde_json::Value {
    if number.fract() == 0.0 && number.abs() < 9_007_199_254_740_992.0 {
        serde_json::Value::from(number as i64)
    } else {
        serde_json::Number::from_f64(number).map_or(serde_json::Value::Null, serde_json::Value::Number)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

impl From<bool> for Value {
    fn from(flag: bool) -> Self {
        Value::Bool(flag)
    }
}

impl From<f64> for Value {
    fn from(number: f64) -> Self {
        Value::Number(number)
    }
}

impl From<i64> for Value {
    fn from(number: i64) -> Self {
        Value::Number(number as f64)
    }
}

impl From<i32> for Value {
    fn from(number: i32) -> Self {
        Value::Number(f64::from(number))
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(record)
    }
}

impl From<List> for Value {
    fn from(list: List) -> Self {
        Value::List(list)
    }
}

impl From<Opaque> for Value {
    fn from(opaque: Opaque) -> Self {
        Value::Opaque(opaque)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::from_json(json)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Undefined, Into::into)
    }
}
