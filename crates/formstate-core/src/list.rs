//! State for an ordered collection of rows.
//!
//! Row state is cached per live record so that reassigning the array (a
//! refresh, a revert, or the host handing over a new array) reuses the
//! existing rows, and with them any in-progress edits. The snapshot keeps
//! deep copies of the original items plus a map from each copy back to the
//! live record it was taken from, which lets a row that went through a
//! copy round trip be recognized as the same row.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::{Rc, Weak};

use formstate_model::{List, Record, Value, deep_clone, deep_clone_record};
use tracing::{debug, trace};

use crate::config::{ListConfig, ListRule};
use crate::error::{FormError, Result};
use crate::listener::{Listeners, SubscriptionId};
use crate::object::{ObjectNode, ObjectState, ParentLink, Slot};
use crate::options::SetOptions;

pub(crate) struct ListNode {
    key: String,
    config: Rc<ListConfig>,
    parent: Weak<ObjectNode>,
    /// Live record identity to row state.
    rows: RefCell<HashMap<usize, ObjectState>>,
    /// `Undefined`, `Null`, or a list of deep copies of the original items.
    original: RefCell<Value>,
    /// Copy identity to the live record it was taken from.
    clones: RefCell<HashMap<usize, Record>>,
    touched: Cell<bool>,
    read_only: Cell<bool>,
    loading: Cell<bool>,
    rules: RefCell<Vec<ListRule>>,
    listeners: Listeners,
}

/// Live state for a list of rows.
#[derive(Clone)]
pub struct ListState(pub(crate) Rc<ListNode>);

impl ListState {
    pub(crate) fn new(
        key: &str,
        config: Rc<ListConfig>,
        parent: Weak<ObjectNode>,
        value: &Value,
    ) -> Self {
        let node = Rc::new_cyclic(|weak: &Weak<ListNode>| {
            let mut rows = HashMap::new();
            if let Value::List(list) = value {
                for item in list.values() {
                    if let Value::Record(record) = item {
                        rows.entry(record.identity())
                            .or_insert_with(|| build_row(key, &config, weak, record));
                    }
                }
            }
            ListNode {
                key: key.to_string(),
                read_only: Cell::new(config.read_only),
                config: Rc::clone(&config),
                parent,
                rows: RefCell::new(rows),
                original: RefCell::new(Value::Undefined),
                clones: RefCell::new(HashMap::new()),
                touched: Cell::new(false),
                loading: Cell::new(false),
                rules: RefCell::new(Vec::new()),
                listeners: Listeners::default(),
            }
        });
        let state = ListState(node);
        state.snapshot(value);
        state
    }

    #[inline]
    pub fn key(&self) -> &str {
        &self.0.key
    }

    #[inline]
    pub fn config(&self) -> &ListConfig {
        &self.0.config
    }

    pub fn owner(&self) -> Option<ObjectState> {
        self.0.parent.upgrade().map(ObjectState)
    }

    fn require_owner(&self) -> Result<ObjectState> {
        self.owner().ok_or_else(|| FormError::detached(&self.0.key))
    }

    /// The live list, or `None` while unset.
    pub fn live(&self) -> Option<List> {
        self.owner()?
            .record()?
            .get(&self.0.key)
            .as_list()
            .cloned()
    }

    pub fn value(&self) -> Value {
        self.owner()
            .and_then(|owner| owner.record())
            .map(|record| record.get(&self.0.key))
            .unwrap_or_default()
    }

    fn ensure_list(&self) -> Result<List> {
        let record = self.require_owner()?.ensure_record()?;
        if let Value::List(list) = record.get(&self.0.key) {
            return Ok(list);
        }
        let list = List::new();
        record.insert(self.0.key.clone(), Value::List(list.clone()));
        Ok(list)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.live().map_or(0, |list| list.len())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cached(&self, record: &Record) -> Option<ObjectState> {
        self.0.rows.borrow().get(&record.identity()).cloned()
    }

    fn new_row(&self, record: Record) -> ObjectState {
        let row = build_row(&self.0.key, &self.0.config, &Rc::downgrade(&self.0), record.clone());
        self.0.rows.borrow_mut().insert(record.identity(), row.clone());
        row
    }

    /// Row state for every record in the live list, in order.
    ///
    /// Cached rows are reused. A deep copy from the snapshot is swapped back
    /// for its live record. Records never seen before get new row state.
    pub fn rows(&self) -> Vec<ObjectState> {
        let Some(list) = self.live() else {
            return Vec::new();
        };
        let mut rows = Vec::new();
        let mut fresh = Vec::new();
        for (index, item) in list.values().into_iter().enumerate() {
            let Value::Record(record) = item else {
                continue;
            };
            if let Some(row) = self.cached(&record) {
                rows.push(row);
                continue;
            }
            let recovered = self.0.clones.borrow().get(&record.identity()).cloned();
            if let Some(live) = recovered
                && let Some(row) = self.cached(&live)
            {
                trace!(key = %self.0.key, index, "recovered row from snapshot copy");
                list.set(index, Value::Record(live));
                rows.push(row);
                continue;
            }
            let row = self.new_row(record);
            fresh.push(row.clone());
            rows.push(row);
        }
        for row in fresh {
            row.run_init_hooks();
        }
        rows
    }

    pub fn row(&self, index: usize) -> Option<ObjectState> {
        self.rows().into_iter().nth(index)
    }

    // ----- flags -----

    pub fn read_only(&self) -> bool {
        self.0.read_only.get() || self.owner().is_some_and(|owner| owner.read_only())
    }

    pub fn set_read_only(&self, read_only: bool) {
        if self.0.read_only.replace(read_only) != read_only {
            self.notify();
        }
    }

    pub fn loading(&self) -> bool {
        self.0.loading.get() || self.owner().is_some_and(|owner| owner.loading())
    }

    pub fn set_loading(&self, loading: bool) {
        if self.0.loading.replace(loading) != loading {
            self.notify();
        }
    }

    pub fn touched(&self) -> bool {
        self.0.touched.get() || self.rows().iter().any(ObjectState::touched)
    }

    pub fn set_touched(&self, touched: bool) {
        self.0.touched.set(touched);
        for row in self.rows() {
            row.set_touched(touched);
        }
        self.notify();
    }

    // ----- validation -----

    pub(crate) fn rule_errors(&self) -> Vec<String> {
        let rules: Vec<ListRule> = self
            .0
            .config
            .rules
            .iter()
            .chain(self.0.rules.borrow().iter())
            .cloned()
            .collect();
        rules.iter().filter_map(|rule| rule(self)).collect()
    }

    pub(crate) fn row_errors(&self) -> Vec<(usize, String)> {
        self.rows()
            .iter()
            .enumerate()
            .flat_map(|(index, row)| row.errors().into_iter().map(move |error| (index, error)))
            .collect()
    }

    /// List rule messages, then row errors as `[index].message`.
    pub fn errors(&self) -> Vec<String> {
        let mut errors = self.rule_errors();
        errors.extend(
            self.row_errors()
                .into_iter()
                .map(|(index, error)| format!("[{index}].{error}")),
        );
        errors
    }

    pub fn valid(&self) -> bool {
        self.errors().is_empty()
    }

    pub fn add_rule(&self, rule: impl Fn(&ListState) -> Option<String> + 'static) {
        self.0.rules.borrow_mut().push(Rc::new(rule));
        self.notify();
    }

    // ----- dirty tracking -----

    fn live_identities(&self) -> Vec<usize> {
        self.live()
            .map(|list| list.values().iter().filter_map(Value::identity).collect())
            .unwrap_or_default()
    }

    /// Identities of the original items, mapped back to live records.
    fn original_identities(&self) -> Vec<usize> {
        let original = self.0.original.borrow();
        let Some(items) = original.as_list() else {
            return Vec::new();
        };
        let clones = self.0.clones.borrow();
        items
            .values()
            .iter()
            .filter_map(Value::identity)
            .map(|copy| clones.get(&copy).map_or(copy, Record::identity))
            .collect()
    }

    /// Row membership or order differs from the snapshot, or any row is
    /// dirty. An unset list counts as empty.
    pub fn dirty(&self) -> bool {
        let original_len = match &*self.0.original.borrow() {
            Value::List(list) => list.len(),
            _ => 0,
        };
        if self.len() != original_len {
            return true;
        }
        let mut current = self.live_identities();
        let mut original = self.original_identities();
        if current.len() != original.len() {
            return true;
        }
        if !self.0.config.strict_order {
            current.sort_unstable();
            original.sort_unstable();
        }
        current != original || self.rows().iter().any(ObjectState::dirty)
    }

    /// Take deep copies of the current items as the new original.
    fn snapshot(&self, value: &Value) {
        let mut clones = HashMap::new();
        let original = match value {
            Value::List(list) => Value::List(List::from_values(list.values().into_iter().map(
                |item| match item {
                    Value::Record(record) => {
                        let copy = deep_clone_record(&record);
                        clones.insert(copy.identity(), record);
                        Value::Record(copy)
                    }
                    other => deep_clone(&other),
                },
            ))),
            Value::Null => Value::Null,
            _ => Value::Undefined,
        };
        *self.0.original.borrow_mut() = original;
        *self.0.clones.borrow_mut() = clones;
    }

    /// Drop the cached row of a removed record unless the record is still
    /// listed or belongs to the snapshot (a re-add must find its row).
    fn forget_row(&self, record: &Record) {
        let identity = record.identity();
        if self.live_identities().contains(&identity) {
            return;
        }
        let original = self
            .0
            .clones
            .borrow()
            .values()
            .any(|live| live.identity() == identity);
        if !original {
            trace!(key = %self.0.key, "dropping row state of removed record");
            self.0.rows.borrow_mut().remove(&identity);
        }
    }

    /// Drop cached rows whose record is no longer in the live list.
    fn prune(&self) {
        let live: HashSet<usize> = self.live_identities().into_iter().collect();
        self.0.rows.borrow_mut().retain(|identity, _| live.contains(identity));
    }

    // ----- mutation -----

    fn guard_writable(&self) -> Result<()> {
        if self.read_only() {
            debug!(key = %self.0.key, "rejected write to read-only list");
            return Err(FormError::ReadOnly {
                key: self.0.key.clone(),
            });
        }
        Ok(())
    }

    /// Insert `record` at `index` (default: the end) and return its row.
    pub fn add(&self, record: Record, index: Option<usize>) -> Result<ObjectState> {
        self.guard_writable()?;
        let list = self.ensure_list()?;
        let position = index.unwrap_or(list.len()).min(list.len());
        list.insert(position, Value::Record(record.clone()));
        let row = match self.cached(&record) {
            Some(row) => row,
            None => {
                let row = self.new_row(record);
                row.run_init_hooks();
                row
            }
        };
        self.0.touched.set(true);
        self.notify();
        self.require_owner()?.maybe_auto_save()?;
        Ok(row)
    }

    /// Remove the row at `index`.
    pub fn remove_at(&self, index: usize) -> Result<Option<Record>> {
        self.guard_writable()?;
        let Some(list) = self.live() else {
            return Ok(None);
        };
        let Some(removed) = list.remove(index) else {
            return Ok(None);
        };
        let removed = removed.as_record().cloned();
        if let Some(record) = &removed {
            self.forget_row(record);
        }
        self.0.touched.set(true);
        self.notify();
        self.require_owner()?.maybe_auto_save()?;
        Ok(removed)
    }

    /// Remove the row holding this exact record.
    pub fn remove(&self, record: &Record) -> Result<bool> {
        let position = self
            .live()
            .and_then(|list| list.position(&Value::Record(record.clone())));
        match position {
            Some(index) => Ok(self.remove_at(index)?.is_some()),
            None => Ok(false),
        }
    }

    pub fn set(&self, value: impl Into<Value>) -> Result<()> {
        self.set_with(value, SetOptions::default())
    }

    /// Reconcile an incoming array against the existing rows.
    ///
    /// Each incoming record is matched, in order of preference, to the row
    /// of the same live record, to the row whose snapshot copy it is, or to
    /// a known row of the same entity (by id; first match wins). Only when
    /// nothing matches is new row state built. Matched rows take the
    /// incoming values through their own `set`.
    pub fn set_with(&self, value: impl Into<Value>, options: SetOptions) -> Result<()> {
        let changed = self.apply(value.into(), options)?;
        if changed && options.triggers_auto_save() {
            self.require_owner()?.maybe_auto_save()?;
        }
        Ok(())
    }

    pub(crate) fn apply(&self, value: Value, options: SetOptions) -> Result<bool> {
        if !options.bypasses_read_only() {
            self.guard_writable()?;
        }
        let incoming = match value {
            Value::List(incoming) => incoming,
            Value::Undefined | Value::Null => return self.clear(value, options),
            other => {
                return Err(FormError::TypeMismatch {
                    key: self.0.key.clone(),
                    expected: "list",
                    found: other.kind_name(),
                });
            }
        };

        let items = incoming.values();
        if let Some(other) = items.iter().find(|item| item.as_record().is_none()) {
            debug!(key = %self.0.key, found = other.kind_name(), "rejected non-record row");
            return Err(FormError::TypeMismatch {
                key: self.0.key.clone(),
                expected: "record",
                found: other.kind_name(),
            });
        }

        let known = self.known_rows();
        let mut used: HashSet<usize> = HashSet::new();
        let mut next = Vec::with_capacity(incoming.len());
        let mut fresh = Vec::new();
        let mut rows_changed = false;

        for record in items.into_iter().filter_map(|item| item.as_record().cloned()) {
            if self.cached(&record).is_some() {
                used.insert(record.identity());
                next.push(Value::Record(record));
                continue;
            }
            let recovered = self.0.clones.borrow().get(&record.identity()).cloned();
            if let Some(live) = recovered
                && let Some(row) = self.cached(&live)
                && used.insert(live.identity())
            {
                rows_changed |= row.apply(Value::Record(record), options.nested())?;
                next.push(Value::Record(live));
                continue;
            }
            let matched = known
                .iter()
                .find(|(live, row)| !used.contains(&live.identity()) && row.is_same_entity_as(&record));
            if let Some((live, row)) = matched {
                used.insert(live.identity());
                rows_changed |= row.apply(Value::Record(record), options.nested())?;
                next.push(Value::Record(live.clone()));
                continue;
            }
            trace!(key = %self.0.key, "new row for unmatched record");
            used.insert(record.identity());
            fresh.push(self.new_row(record.clone()));
            next.push(Value::Record(record));
        }

        let before = self.live_identities();
        let after: Vec<usize> = next.iter().filter_map(Value::identity).collect();
        let reordered = before != after;
        match self.live() {
            Some(list) => list.replace(next),
            None => {
                self.require_owner()?
                    .ensure_record()?
                    .insert(self.0.key.clone(), Value::List(List::from_values(next)));
            }
        }
        for row in fresh {
            row.run_init_hooks();
        }
        if options.refreshing {
            self.snapshot(&self.value());
            self.prune();
        }
        let changed = reordered || rows_changed;
        if changed || options.refreshing {
            self.notify();
        }
        Ok(changed)
    }

    /// Rows reachable by identity matching: live order first, then the
    /// order of the snapshot.
    fn known_rows(&self) -> Vec<(Record, ObjectState)> {
        let mut seen = HashSet::new();
        let mut known = Vec::new();
        let live_records = self
            .live()
            .map(|list| list.values())
            .unwrap_or_default()
            .into_iter()
            .filter_map(|item| item.as_record().cloned());
        let original_records: Vec<Record> = {
            let original = self.0.original.borrow();
            let clones = self.0.clones.borrow();
            original
                .as_list()
                .map(|items| {
                    items
                        .values()
                        .iter()
                        .filter_map(|item| item.as_record())
                        .filter_map(|copy| clones.get(&copy.identity()).cloned())
                        .collect()
                })
                .unwrap_or_default()
        };
        for record in live_records.chain(original_records) {
            if !seen.insert(record.identity()) {
                continue;
            }
            if let Some(row) = self.cached(&record) {
                known.push((record, row));
            }
        }
        known
    }

    fn clear(&self, value: Value, options: SetOptions) -> Result<bool> {
        let current = self.value();
        let unchanged = matches!(
            (&current, &value),
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null)
        );
        if !unchanged {
            self.require_owner()?
                .ensure_record()?
                .insert(self.0.key.clone(), value.clone());
        }
        if options.refreshing {
            self.snapshot(&value);
            self.prune();
        }
        if !unchanged || options.refreshing {
            self.notify();
        }
        Ok(!unchanged)
    }

    /// Restore the original rows, revert each of them and clear touched.
    pub fn revert_changes(&self) {
        let original = self.0.original.borrow().clone();
        match &original {
            Value::List(items) => {
                let restored: Vec<Value> = {
                    let clones = self.0.clones.borrow();
                    items
                        .values()
                        .into_iter()
                        .map(|item| match &item {
                            Value::Record(copy) => clones
                                .get(&copy.identity())
                                .cloned()
                                .map_or_else(|| deep_clone(&item), Value::Record),
                            _ => deep_clone(&item),
                        })
                        .collect()
                };
                match self.ensure_list() {
                    Ok(list) => list.replace(restored),
                    Err(err) => debug!(key = %self.0.key, error = %err, "revert skipped"),
                }
                for row in self.rows() {
                    row.revert_changes();
                }
            }
            unset => {
                if let Some(record) = self.owner().and_then(|owner| owner.record())
                    && !(record.get(&self.0.key).is_undefined() && unset.is_undefined())
                {
                    record.insert(self.0.key.clone(), unset.clone());
                }
            }
        }
        self.0.touched.set(false);
        self.prune();
        self.notify();
    }

    pub fn commit_changes(&self) -> Result<()> {
        self.require_owner()?.guard_commit()?;
        self.commit_internal();
        Ok(())
    }

    pub(crate) fn commit_internal(&self) {
        for row in self.rows() {
            row.commit_internal();
        }
        self.snapshot(&self.value());
        self.prune();
        self.0.touched.set(false);
        self.notify();
    }

    // ----- change extraction -----

    /// Row payloads for a partial update.
    ///
    /// Exhaustive lists emit every row so unmentioned rows are not read as
    /// deleted. Incremental lists emit only dirty or new rows, and fill an
    /// unset operation marker with `"include"`.
    pub fn changed_value(&self) -> Value {
        if self.live().is_none() {
            return match &*self.0.original.borrow() {
                Value::List(_) => Value::Null,
                _ => Value::Undefined,
            };
        }
        let incremental = self.0.config.is_incremental();
        let op_key = self.0.config.row.op_key();
        let items = self
            .rows()
            .into_iter()
            .filter(|row| !incremental || row.dirty() || row.is_new_entity())
            .map(|row| {
                let changed = row.changed_value();
                if let (Some(op_key), Value::Record(payload)) = (op_key, &changed)
                    && payload.get(op_key).is_nullish()
                {
                    payload.insert(op_key, Value::from("include"));
                }
                changed
            });
        Value::List(List::from_values(items))
    }

    // ----- notification -----

    pub fn subscribe(&self, callback: impl Fn() + 'static) -> SubscriptionId {
        self.0.listeners.subscribe(Rc::new(callback))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.0.listeners.unsubscribe(id)
    }

    pub(crate) fn notify(&self) {
        self.0.listeners.notify();
        if let Some(owner) = self.owner() {
            owner.notify();
        }
    }
}

fn build_row(key: &str, config: &ListConfig, list: &Weak<ListNode>, record: Record) -> ObjectState {
    let current = Value::Record(record.clone());
    ObjectState::build(
        key.to_string(),
        Rc::clone(&config.row),
        Slot::Owned(record),
        ParentLink::List(list.clone()),
        &current,
    )
}

impl fmt::Debug for ListState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListState")
            .field("key", &self.0.key)
            .field("value", &self.value())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ObjectConfig, ValueFieldConfig};
    use serde_json::json;

    fn books_form(list: ListConfig, json: serde_json::Value) -> (ObjectState, ListState) {
        let record = Value::from_json(json).as_record().cloned().unwrap();
        let form = ObjectState::new(ObjectConfig::new().field("books", list), record);
        let books = form.list("books").unwrap();
        (form, books)
    }

    fn book_row() -> ObjectConfig {
        ObjectConfig::new()
            .field("id", ValueFieldConfig::new())
            .field("title", ValueFieldConfig::new())
    }

    fn title(row: &ObjectState) -> Value {
        row.field("title").unwrap().value()
    }

    #[test]
    fn test_rows_are_cached_per_record() {
        let (_form, books) = books_form(
            ListConfig::new(book_row()),
            json!({"books": [{"id": "1", "title": "t1"}]}),
        );
        let first = books.rows();
        let second = books.rows();
        assert_eq!(first.len(), 1);
        assert!(first[0].ptr_eq(&second[0]));
    }

    #[test]
    fn test_reconcile_by_id_keeps_row_state() {
        let (_form, books) = books_form(
            ListConfig::new(book_row()),
            json!({"books": [{"id": "1", "title": "t1"}, {"id": "2", "title": "t2"}]}),
        );
        let rows = books.rows();
        rows[1].field("title").unwrap().focus();
        rows[1].field("title").unwrap().set("typing").unwrap();

        books
            .set_with(
                Value::from_json(json!([{"id": "2", "title": "server"}, {"id": "1", "title": "t1b"}])),
                SetOptions::refresh(),
            )
            .unwrap();

        let after = books.rows();
        assert!(after[0].ptr_eq(&rows[1]));
        assert!(after[1].ptr_eq(&rows[0]));
        assert_eq!(title(&after[0]).as_str(), Some("typing"));
        assert_eq!(title(&after[1]).as_str(), Some("t1b"));
    }

    #[test]
    fn test_duplicate_ids_first_match_wins() {
        let (_form, books) = books_form(
            ListConfig::new(book_row()),
            json!({"books": [{"id": "1", "title": "a"}, {"id": "1", "title": "b"}]}),
        );
        let rows = books.rows();
        books
            .set_with(Value::from_json(json!([{"id": "1", "title": "c"}])), SetOptions::refresh())
            .unwrap();
        let after = books.rows();
        assert_eq!(after.len(), 1);
        assert!(after[0].ptr_eq(&rows[0]));
        assert_eq!(title(&after[0]).as_str(), Some("c"));
    }

    #[test]
    fn test_rows_without_ids_are_always_new() {
        let row = ObjectConfig::new().field("title", ValueFieldConfig::new());
        let (_form, books) = books_form(ListConfig::new(row), json!({"books": [{"title": "a"}]}));
        let rows = books.rows();
        books
            .set(Value::from_json(json!([{"title": "a"}])))
            .unwrap();
        assert!(!books.rows()[0].ptr_eq(&rows[0]));
        assert!(books.dirty());
    }

    #[test]
    fn test_revert_restores_membership_and_values() {
        let (form, books) = books_form(
            ListConfig::new(book_row()),
            json!({"books": [{"id": "1", "title": "t1"}]}),
        );
        let original_row = books.rows()[0].clone();
        original_row.field("title").unwrap().set("edited").unwrap();
        books.remove_at(0).unwrap();
        books
            .add(Value::from_json(json!({"title": "new"})).as_record().cloned().unwrap(), None)
            .unwrap();
        assert!(books.dirty());

        form.revert_changes();
        let rows = books.rows();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].ptr_eq(&original_row));
        assert_eq!(title(&rows[0]).as_str(), Some("t1"));
        assert!(!books.dirty());
        assert!(!books.touched());
    }

    #[test]
    fn test_set_with_snapshot_copies_recovers_rows() {
        let (_form, books) = books_form(
            ListConfig::new(book_row()),
            json!({"books": [{"id": "1", "title": "t1"}]}),
        );
        let row = books.rows()[0].clone();
        let copies = books.0.original.borrow().clone();
        books.set(List::new()).unwrap();
        assert!(books.dirty());

        books.set(copies).unwrap();
        assert!(books.rows()[0].ptr_eq(&row));
        assert!(!books.dirty());
    }

    #[test]
    fn test_read_only_list_rejects_add() {
        let (_form, books) = books_form(ListConfig::new(book_row()).read_only(), json!({}));
        let err = books.add(Record::new(), None).unwrap_err();
        assert!(matches!(err, FormError::ReadOnly { .. }));
    }

    #[test]
    fn test_removed_new_rows_leave_the_cache() {
        let (_form, books) = books_form(
            ListConfig::new(book_row()),
            json!({"books": [{"id": "1", "title": "t1"}]}),
        );
        let first = books.rows()[0].clone();
        for _ in 0..3 {
            books.add(Record::new(), None).unwrap();
            books.remove_at(1).unwrap();
        }
        assert_eq!(books.0.rows.borrow().len(), 1);

        // Rows from the snapshot stay cached so a re-add is clean.
        let record = books.remove_at(0).unwrap().unwrap();
        assert_eq!(books.0.rows.borrow().len(), 1);
        let readded = books.add(record, None).unwrap();
        assert!(readded.ptr_eq(&first));
        assert!(!books.dirty());
    }

    #[test]
    fn test_non_record_items_are_rejected() {
        let (_form, books) = books_form(
            ListConfig::new(book_row()),
            json!({"books": [{"id": "1", "title": "t1"}]}),
        );
        let live = books.live().unwrap().values()[0].clone();
        let err = books
            .set(Value::List(List::from_values([live, Value::Null])))
            .unwrap_err();
        assert!(matches!(
            err,
            FormError::TypeMismatch { expected: "record", found: "null", .. }
        ));
        assert_eq!(books.len(), 1);
        assert!(!books.dirty());
    }

    #[test]
    fn test_unset_list_counts_as_empty() {
        let (_form, books) = books_form(ListConfig::new(book_row()), json!({}));
        assert!(!books.dirty());
        books.set(List::new()).unwrap();
        assert!(!books.dirty());
        assert!(books.changed_value().as_list().is_some_and(List::is_empty));
    }
}
