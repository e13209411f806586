//! State for a composite record.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::rc::{Rc, Weak};

use formstate_model::{ListOrder, Record, Value, deep_clone, deep_equal};
use futures::FutureExt;
use indexmap::IndexMap;
use tracing::{debug, error, trace};

use crate::autosave::{AutoSaveBinding, AutoSaveCoordinator, SaveCallback};
use crate::child::ChildState;
use crate::config::{FieldConfig, ObjectConfig, ObjectRule};
use crate::error::{FormError, Result};
use crate::field::FieldState;
use crate::fragment::FragmentState;
use crate::list::{ListNode, ListState};
use crate::listener::{Listeners, SubscriptionId};
use crate::options::SetOptions;

/// Where an object's record lives.
pub(crate) enum Slot {
    /// The object holds its record directly (form root or list row).
    Owned(Record),
    /// The record is read from the owning object's record on every access,
    /// and may be unset.
    Nested,
}

pub(crate) enum ParentLink {
    Root,
    Object(Weak<ObjectNode>),
    List(Weak<ListNode>),
}

pub(crate) struct ObjectNode {
    key: String,
    config: Rc<ObjectConfig>,
    slot: Slot,
    parent: ParentLink,
    children: IndexMap<String, ChildState>,
    /// Deep copy of the slot taken at construction, commit and refresh.
    original: RefCell<Value>,
    read_only: Cell<bool>,
    loading: Cell<bool>,
    rules: RefCell<Vec<ObjectRule>>,
    listeners: Listeners,
    auto_save: RefCell<Option<AutoSaveBinding>>,
    initialized: Cell<bool>,
}

/// Live state for a record: the form root, a nested object or a list row.
///
/// Cloning the handle is cheap and yields the same state.
#[derive(Clone)]
pub struct ObjectState(pub(crate) Rc<ObjectNode>);

/// Non-owning handle to an [`ObjectState`], for listeners and hooks that
/// must not keep the form alive.
#[derive(Clone)]
pub struct WeakObjectState(Weak<ObjectNode>);

impl WeakObjectState {
    pub fn upgrade(&self) -> Option<ObjectState> {
        self.0.upgrade().map(ObjectState)
    }
}

impl ObjectState {
    /// Build the form root over `record` and run init hooks.
    pub fn new(config: impl Into<Rc<ObjectConfig>>, record: Record) -> Self {
        let current = Value::Record(record.clone());
        let state = Self::build(
            String::new(),
            config.into(),
            Slot::Owned(record),
            ParentLink::Root,
            &current,
        );
        state.run_init_hooks();
        state
    }

    /// Like [`ObjectState::new`], accepting any value. Nullish values start
    /// from an empty record.
    pub fn from_value(config: impl Into<Rc<ObjectConfig>>, value: Value) -> Result<Self> {
        match value {
            Value::Record(record) => Ok(Self::new(config, record)),
            Value::Undefined | Value::Null => Ok(Self::new(config, Record::new())),
            other => Err(FormError::TypeMismatch {
                key: String::new(),
                expected: "record",
                found: other.kind_name(),
            }),
        }
    }

    pub(crate) fn build(
        key: String,
        config: Rc<ObjectConfig>,
        slot: Slot,
        parent: ParentLink,
        current: &Value,
    ) -> Self {
        let record = current.as_record().cloned();
        let node = Rc::new_cyclic(|weak: &Weak<ObjectNode>| {
            let children = config
                .fields
                .iter()
                .map(|(field_key, field)| {
                    let value = record
                        .as_ref()
                        .map(|record| record.get(field_key))
                        .unwrap_or_default();
                    let child = match field {
                        FieldConfig::Value(value_config) => ChildState::Value(FieldState::new(
                            field_key,
                            Rc::clone(value_config),
                            weak.clone(),
                            &value,
                        )),
                        FieldConfig::Object(object_config) => ChildState::Object(Self::build(
                            field_key.clone(),
                            Rc::clone(object_config),
                            Slot::Nested,
                            ParentLink::Object(weak.clone()),
                            &value,
                        )),
                        FieldConfig::List(list_config) => ChildState::List(ListState::new(
                            field_key,
                            Rc::clone(list_config),
                            weak.clone(),
                            &value,
                        )),
                        FieldConfig::Fragment => {
                            ChildState::Fragment(FragmentState::new(field_key, weak.clone()))
                        }
                    };
                    (field_key.clone(), child)
                })
                .collect();
            ObjectNode {
                key,
                read_only: Cell::new(config.read_only),
                config: Rc::clone(&config),
                slot,
                parent,
                children,
                original: RefCell::new(deep_clone(current)),
                loading: Cell::new(false),
                rules: RefCell::new(Vec::new()),
                listeners: Listeners::default(),
                auto_save: RefCell::new(None),
                initialized: Cell::new(false),
            }
        });
        ObjectState(node)
    }

    /// Run init hooks on this object and its descendants, parents first.
    /// Each object runs its hook at most once.
    pub(crate) fn run_init_hooks(&self) {
        if self.0.initialized.replace(true) {
            return;
        }
        if let Some(hook) = self.0.config.init.clone() {
            hook(self);
        }
        for child in self.0.children.values() {
            child.run_init_hooks();
        }
    }

    pub fn downgrade(&self) -> WeakObjectState {
        WeakObjectState(Rc::downgrade(&self.0))
    }

    #[inline]
    pub fn ptr_eq(&self, other: &ObjectState) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Key under which this object lives in its parent. Empty for the root.
    #[inline]
    pub fn key(&self) -> &str {
        &self.0.key
    }

    #[inline]
    pub fn config(&self) -> &ObjectConfig {
        &self.0.config
    }

    // ----- tree navigation -----

    pub fn child(&self, key: &str) -> Option<&ChildState> {
        self.0.children.get(key)
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &ChildState)> {
        self.0
            .children
            .iter()
            .map(|(key, child)| (key.as_str(), child))
    }

    pub fn field(&self, key: &str) -> Option<FieldState> {
        match self.child(key)? {
            ChildState::Value(field) => Some(field.clone()),
            _ => None,
        }
    }

    pub fn object(&self, key: &str) -> Option<ObjectState> {
        match self.child(key)? {
            ChildState::Object(object) => Some(object.clone()),
            _ => None,
        }
    }

    pub fn list(&self, key: &str) -> Option<ListState> {
        match self.child(key)? {
            ChildState::List(list) => Some(list.clone()),
            _ => None,
        }
    }

    pub fn fragment(&self, key: &str) -> Option<FragmentState> {
        match self.child(key)? {
            ChildState::Fragment(fragment) => Some(fragment.clone()),
            _ => None,
        }
    }

    /// Nearest ancestor object, looking through lists.
    pub fn owner(&self) -> Option<ObjectState> {
        match &self.0.parent {
            ParentLink::Root => None,
            ParentLink::Object(parent) => parent.upgrade().map(ObjectState),
            ParentLink::List(list) => list.upgrade().and_then(|list| ListState(list).owner()),
        }
    }

    /// The list this object is a row of.
    pub fn parent_list(&self) -> Option<ListState> {
        match &self.0.parent {
            ParentLink::List(list) => list.upgrade().map(ListState),
            _ => None,
        }
    }

    // ----- live record -----

    /// The live record, or `None` while this object is unset.
    pub fn record(&self) -> Option<Record> {
        match &self.0.slot {
            Slot::Owned(record) => Some(record.clone()),
            Slot::Nested => self
                .owner()?
                .record()?
                .get(&self.0.key)
                .as_record()
                .cloned(),
        }
    }

    /// The live slot: the record, or the `Null`/`Undefined` an unset
    /// nested object holds.
    pub fn value(&self) -> Value {
        match &self.0.slot {
            Slot::Owned(record) => Value::Record(record.clone()),
            Slot::Nested => self
                .owner()
                .and_then(|owner| owner.record())
                .map(|record| record.get(&self.0.key))
                .unwrap_or_default(),
        }
    }

    /// Snapshot taken at construction, commit or refresh.
    pub fn original_value(&self) -> Value {
        self.0.original.borrow().clone()
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.record().is_some()
    }

    fn was_set(&self) -> bool {
        self.0.original.borrow().as_record().is_some()
    }

    /// The live record, materializing it (and any unset ancestors) first.
    pub(crate) fn ensure_record(&self) -> Result<Record> {
        match &self.0.slot {
            Slot::Owned(record) => Ok(record.clone()),
            Slot::Nested => {
                let owner = self
                    .owner()
                    .ok_or_else(|| FormError::detached(&self.0.key))?;
                let parent_record = owner.ensure_record()?;
                if let Value::Record(record) = parent_record.get(&self.0.key) {
                    return Ok(record);
                }
                trace!(key = %self.0.key, "materializing nested record");
                let record = Record::new();
                parent_record.insert(self.0.key.clone(), Value::Record(record.clone()));
                Ok(record)
            }
        }
    }

    // ----- flags -----

    /// Local flag, a truthy read-only indicator field, or any read-only
    /// ancestor. A local `false` never overrides a read-only ancestor.
    pub fn read_only(&self) -> bool {
        if self.0.read_only.get() {
            return true;
        }
        if let Some(flag) = self.0.config.read_only_key()
            && self.record().is_some_and(|record| record.get(flag).is_truthy())
        {
            return true;
        }
        match &self.0.parent {
            ParentLink::Root => false,
            ParentLink::Object(parent) => parent
                .upgrade()
                .is_some_and(|parent| ObjectState(parent).read_only()),
            ParentLink::List(list) => list.upgrade().is_some_and(|list| ListState(list).read_only()),
        }
    }

    pub fn set_read_only(&self, read_only: bool) {
        if self.0.read_only.replace(read_only) != read_only {
            self.notify();
        }
    }

    pub fn loading(&self) -> bool {
        if self.0.loading.get() {
            return true;
        }
        match &self.0.parent {
            ParentLink::Root => false,
            ParentLink::Object(parent) => parent
                .upgrade()
                .is_some_and(|parent| ObjectState(parent).loading()),
            ParentLink::List(list) => list.upgrade().is_some_and(|list| ListState(list).loading()),
        }
    }

    pub fn set_loading(&self, loading: bool) {
        if self.0.loading.replace(loading) != loading {
            self.notify();
        }
    }

    // ----- derived state -----

    pub fn dirty(&self) -> bool {
        self.was_set() != self.is_set() || self.0.children.values().any(ChildState::dirty)
    }

    pub fn touched(&self) -> bool {
        self.0.children.values().any(ChildState::touched)
    }

    pub fn set_touched(&self, touched: bool) {
        for child in self.0.children.values() {
            child.set_touched(touched);
        }
        self.notify();
    }

    /// Child errors as `"key: message, message"`, then object-level rule
    /// messages. An unset object reports no errors.
    pub fn errors(&self) -> Vec<String> {
        if !self.is_set() {
            return Vec::new();
        }
        let mut errors: Vec<String> = self
            .0
            .children
            .iter()
            .flat_map(|(key, child)| child.qualified_errors(key))
            .collect();
        let rules: Vec<ObjectRule> = self
            .0
            .config
            .rules
            .iter()
            .chain(self.0.rules.borrow().iter())
            .cloned()
            .collect();
        errors.extend(rules.iter().filter_map(|rule| rule(self)));
        errors
    }

    pub fn valid(&self) -> bool {
        self.errors().is_empty()
    }

    /// Attach an extra object-level rule, typically from an init hook.
    pub fn add_rule(&self, rule: impl Fn(&ObjectState) -> Option<String> + 'static) {
        self.0.rules.borrow_mut().push(Rc::new(rule));
        self.notify();
    }

    /// Pre-submit gate for manual saves: marks every descendant touched so
    /// messages surface, then reports validity.
    pub fn can_save(&self) -> bool {
        self.set_touched(true);
        self.valid()
    }

    // ----- identity -----

    /// Current value of the identity field.
    pub fn id(&self) -> Value {
        match (self.0.config.id_key(), self.record()) {
            (Some(key), Some(record)) => record.get(key),
            _ => Value::Undefined,
        }
    }

    /// True when the id field is empty. Objects without an id field ask
    /// their nearest ancestor object; a root without one is not new.
    pub fn is_new_entity(&self) -> bool {
        if self.0.config.id_key().is_some() {
            return self.id().is_empty();
        }
        self.owner().is_some_and(|owner| owner.is_new_entity())
    }

    /// Both sides carry a defined, equal id. Objects without an id are
    /// never the same entity as anything.
    pub fn is_same_entity(&self, other: &ObjectState) -> bool {
        let (mine, theirs) = (self.id(), other.id());
        !mine.is_empty() && !theirs.is_empty() && deep_equal(&mine, &theirs, ListOrder::Strict)
    }

    /// Same identity test against a raw incoming record.
    pub(crate) fn is_same_entity_as(&self, record: &Record) -> bool {
        let Some(key) = self.0.config.id_key() else {
            return false;
        };
        let (mine, theirs) = (self.id(), record.get(key));
        !mine.is_empty() && !theirs.is_empty() && deep_equal(&mine, &theirs, ListOrder::Strict)
    }

    // ----- mutation -----

    /// Apply a (partial) record as a plain edit.
    pub fn set(&self, value: impl Into<Value>) -> Result<()> {
        self.set_with(value, SetOptions::default())
    }

    /// Apply a (partial) record. Only keys present in the payload reach the
    /// corresponding children, and focused value fields are left alone.
    /// `Null` or `Undefined` clears a nested object.
    pub fn set_with(&self, value: impl Into<Value>, options: SetOptions) -> Result<()> {
        let changed = self.apply(value.into(), options)?;
        if changed && options.triggers_auto_save() {
            self.maybe_auto_save()?;
        }
        Ok(())
    }

    pub(crate) fn apply(&self, value: Value, options: SetOptions) -> Result<bool> {
        if !options.bypasses_read_only() && self.read_only() {
            debug!(key = %self.0.key, "rejected write to read-only object");
            return Err(FormError::ReadOnly {
                key: self.0.key.clone(),
            });
        }
        match value {
            Value::Record(payload) => {
                let was_set = self.is_set();
                let record = self.ensure_record()?;
                let mut changed = !was_set;
                for (key, child) in &self.0.children {
                    if !payload.contains_key(key) {
                        continue;
                    }
                    if child.is_focused() {
                        trace!(key = %key, "skipping focused field");
                        continue;
                    }
                    changed |= child.apply(payload.get(key), options.nested())?;
                }
                if options.refreshing {
                    *self.0.original.borrow_mut() = deep_clone(&Value::Record(record));
                }
                if !was_set || options.refreshing {
                    self.notify();
                }
                Ok(changed)
            }
            Value::Undefined | Value::Null if matches!(self.0.slot, Slot::Nested) => {
                let current = self.value();
                let unchanged = matches!(
                    (&current, &value),
                    (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null)
                );
                if !unchanged {
                    let owner = self
                        .owner()
                        .ok_or_else(|| FormError::detached(&self.0.key))?;
                    owner
                        .ensure_record()?
                        .insert(self.0.key.clone(), value.clone());
                }
                if options.refreshing {
                    *self.0.original.borrow_mut() = value;
                }
                if !unchanged || options.refreshing {
                    self.notify();
                }
                Ok(!unchanged)
            }
            other => Err(FormError::TypeMismatch {
                key: self.0.key.clone(),
                expected: "record",
                found: other.kind_name(),
            }),
        }
    }

    /// Restore every child from its snapshot and clear touched. An object
    /// that was unset originally becomes unset again.
    pub fn revert_changes(&self) {
        let original = self.0.original.borrow().clone();
        if matches!(self.0.slot, Slot::Nested) {
            if original.as_record().is_none() {
                if let Some(record) = self.owner().and_then(|owner| owner.record())
                    && !matches!(
                        (record.get(&self.0.key), &original),
                        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null)
                    )
                {
                    record.insert(self.0.key.clone(), original);
                }
            } else if let Err(err) = self.ensure_record() {
                debug!(key = %self.0.key, error = %err, "revert could not restore record");
            }
        }
        for child in self.0.children.values() {
            child.revert_changes();
        }
        self.notify();
    }

    /// Take the current state as the new original.
    ///
    /// Fails while the coordinator this form saves through has a save in
    /// flight: changes made during the save would be wrongly marked as
    /// persisted.
    pub fn commit_changes(&self) -> Result<()> {
        self.guard_commit()?;
        self.commit_internal();
        Ok(())
    }

    pub(crate) fn guard_commit(&self) -> Result<()> {
        if let Some((_, binding)) = self.nearest_binding()
            && binding.coordinator.is_in_flight()
        {
            error!(key = %self.0.key, "commit requested while an auto-save is in flight");
            return Err(FormError::CommitDuringAutoSave);
        }
        Ok(())
    }

    pub(crate) fn commit_internal(&self) {
        for child in self.0.children.values() {
            child.commit_internal();
        }
        *self.0.original.borrow_mut() = deep_clone(&self.value());
        self.notify();
    }

    // ----- change extraction -----

    /// Minimal partial-update payload for this object.
    ///
    /// A child is included when it is dirty, when this entity is new and
    /// the child holds a non-empty value, or when it is the id field with a
    /// defined value. Computed fields and fragments are never included. A
    /// reference object emits only its id, and an unset object emits `null`
    /// (`{id: null}` for references).
    pub fn changed_value(&self) -> Value {
        let config = &self.0.config;
        let Some(record) = self.record() else {
            return match config.id_key() {
                Some(id_key) if config.reference => {
                    Value::Record(Record::from_entries([(id_key, Value::Null)]))
                }
                _ => Value::Null,
            };
        };
        let id_key = config.id_key();
        if config.reference {
            return match id_key {
                Some(id_key) => Value::Record(Record::from_entries([(id_key, record.get(id_key))])),
                None => Value::Null,
            };
        }

        let is_new = self.is_new_entity();
        let changed = Record::new();
        for (key, child) in &self.0.children {
            if matches!(child, ChildState::Fragment(_)) || child.is_computed() {
                continue;
            }
            let is_id = id_key == Some(key.as_str()) && !record.get(key).is_undefined();
            if is_id || child.dirty() || (is_new && !child.is_empty_value()) {
                changed.insert(key.clone(), child.changed_value());
            }
        }
        Value::Record(changed)
    }

    // ----- notification -----

    pub fn subscribe(&self, callback: impl Fn() + 'static) -> SubscriptionId {
        self.0.listeners.subscribe(Rc::new(callback))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.0.listeners.unsubscribe(id)
    }

    /// Notify this object's listeners, then every ancestor's.
    pub(crate) fn notify(&self) {
        self.0.listeners.notify();
        match &self.0.parent {
            ParentLink::Root => {}
            ParentLink::Object(parent) => {
                if let Some(parent) = parent.upgrade() {
                    ObjectState(parent).notify();
                }
            }
            ParentLink::List(list) => {
                if let Some(list) = list.upgrade() {
                    ListState(list).notify();
                }
            }
        }
    }

    // ----- auto-save -----

    /// Route auto-save requests from this object and its descendants to
    /// `coordinator`, saving through `callback`.
    pub fn enable_auto_save<F, Fut>(&self, coordinator: &AutoSaveCoordinator, callback: F)
    where
        F: Fn(ObjectState) -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<()>> + 'static,
    {
        let callback: SaveCallback = Rc::new(move |form| callback(form).boxed_local());
        *self.0.auto_save.borrow_mut() = Some(AutoSaveBinding {
            coordinator: coordinator.clone(),
            callback,
        });
    }

    pub fn disable_auto_save(&self) {
        self.0.auto_save.borrow_mut().take();
    }

    pub(crate) fn auto_save_binding(&self) -> Option<AutoSaveBinding> {
        self.0.auto_save.borrow().clone()
    }

    /// This object or the nearest ancestor carrying an auto-save binding.
    fn nearest_binding(&self) -> Option<(ObjectState, AutoSaveBinding)> {
        let mut current = Some(self.clone());
        while let Some(object) = current {
            if let Some(binding) = object.auto_save_binding() {
                return Some((object, binding));
            }
            current = object.owner();
        }
        None
    }

    /// Ask the coordinator bound to this form (or an ancestor) to save.
    pub fn maybe_auto_save(&self) -> Result<()> {
        match self.nearest_binding() {
            Some((form, binding)) => binding.coordinator.maybe_auto_save(&form),
            None => {
                trace!(key = %self.0.key, "no auto-save binding");
                Ok(())
            }
        }
    }
}

impl fmt::Debug for ObjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectState")
            .field("key", &self.0.key)
            .field("value", &self.value())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValueFieldConfig;
    use crate::rules::required;
    use serde_json::json;

    fn record(json: serde_json::Value) -> Record {
        Value::from_json(json).as_record().cloned().unwrap()
    }

    fn author_config() -> ObjectConfig {
        ObjectConfig::new()
            .field("id", ValueFieldConfig::new())
            .field("firstName", ValueFieldConfig::new().rule(required()))
            .field(
                "address",
                ObjectConfig::new()
                    .field("street", ValueFieldConfig::new().rule(required()))
                    .field("city", ValueFieldConfig::new()),
            )
    }

    #[test]
    fn test_unset_nested_object_is_valid_and_clean() {
        let form = ObjectState::new(author_config(), record(json!({"id": "a:1", "firstName": "f"})));
        let address = form.object("address").unwrap();
        assert!(!address.is_set());
        assert!(address.valid());
        assert!(!form.dirty());
        assert!(form.valid());
    }

    #[test]
    fn test_setting_a_field_materializes_nested_record() {
        let root = record(json!({"id": "a:1", "firstName": "f"}));
        let form = ObjectState::new(author_config(), root.clone());
        let address = form.object("address").unwrap();
        address.field("city").unwrap().set("Oslo").unwrap();

        assert!(address.is_set());
        assert!(address.dirty());
        assert_eq!(
            Value::Record(root).to_json(),
            json!({"id": "a:1", "firstName": "f", "address": {"city": "Oslo"}})
        );
        assert_eq!(form.errors(), ["address.street: Required"]);
    }

    #[test]
    fn test_revert_unsets_originally_unset_object() {
        let root = record(json!({"id": "a:1", "firstName": "f"}));
        let form = ObjectState::new(author_config(), root.clone());
        form.object("address").unwrap().set(record(json!({"street": "Main"}))).unwrap();
        assert!(form.dirty());

        form.revert_changes();
        assert!(!form.dirty());
        assert!(!form.object("address").unwrap().is_set());
        assert_eq!(Value::Record(root).to_json(), json!({"id": "a:1", "firstName": "f"}));
    }

    #[test]
    fn test_clearing_nested_object() {
        let form = ObjectState::new(
            author_config(),
            record(json!({"id": "a:1", "firstName": "f", "address": {"street": "Main"}})),
        );
        let address = form.object("address").unwrap();
        address.set(Value::Null).unwrap();
        assert!(!address.is_set());
        assert!(form.dirty());
        assert_eq!(address.changed_value().to_json(), json!(null));
        assert_eq!(
            form.changed_value().to_json(),
            json!({"id": "a:1", "address": null})
        );
    }

    #[test]
    fn test_root_rejects_null() {
        let form = ObjectState::new(author_config(), Record::new());
        let err = form.set(Value::Null).unwrap_err();
        assert!(matches!(err, FormError::TypeMismatch { expected: "record", .. }));
    }

    #[test]
    fn test_read_only_flag_field_locks_object() {
        let config = ObjectConfig::new()
            .field("locked", ValueFieldConfig::new().role(formstate_model::FieldRole::ReadOnlyFlag))
            .field("name", ValueFieldConfig::new());
        let form = ObjectState::new(config, record(json!({"locked": true, "name": "n"})));
        assert!(form.read_only());
        assert!(form.field("name").unwrap().read_only());
        assert!(matches!(
            form.field("name").unwrap().set("m"),
            Err(FormError::ReadOnly { .. })
        ));
    }

    #[test]
    fn test_local_false_cannot_override_read_only_parent() {
        let form = ObjectState::new(author_config(), record(json!({"address": {}})));
        form.set_read_only(true);
        let address = form.object("address").unwrap();
        address.set_read_only(false);
        assert!(address.read_only());
        form.set_loading(true);
        assert!(address.field("city").unwrap().loading());
    }

    #[test]
    fn test_is_new_entity_delegates_to_owner() {
        let config = ObjectConfig::new()
            .field("id", ValueFieldConfig::new())
            .field("details", ObjectConfig::new().field("note", ValueFieldConfig::new()));
        let saved = ObjectState::new(config.clone(), record(json!({"id": "x", "details": {}})));
        assert!(!saved.object("details").unwrap().is_new_entity());
        let fresh = ObjectState::new(config, record(json!({"details": {}})));
        assert!(fresh.object("details").unwrap().is_new_entity());

        let no_id = ObjectState::new(ObjectConfig::new(), Record::new());
        assert!(!no_id.is_new_entity());
    }

    #[test]
    fn test_init_hook_runs_once_parents_first() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let (outer, inner) = (Rc::clone(&order), Rc::clone(&order));
        let config = ObjectConfig::new()
            .on_init(move |_| outer.borrow_mut().push("root"))
            .field(
                "child",
                ObjectConfig::new().on_init(move |_| inner.borrow_mut().push("child")),
            );
        let form = ObjectState::new(config, Record::new());
        form.run_init_hooks();
        assert_eq!(*order.borrow(), ["root", "child"]);
    }
}
