//! State for a single scalar, list-typed or opaque value.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use formstate_model::{Value, deep_clone, deep_equal};
use tracing::{debug, trace};

use crate::config::{FieldRule, RuleContext, ValueFieldConfig};
use crate::error::{FormError, Result};
use crate::listener::{Listeners, SubscriptionId};
use crate::object::{ObjectNode, ObjectState};
use crate::options::SetOptions;

pub(crate) struct FieldNode {
    key: String,
    config: Rc<ValueFieldConfig>,
    parent: Weak<ObjectNode>,
    /// Private deep copy used only for dirty comparison and revert.
    original: RefCell<Value>,
    touched: Cell<bool>,
    focused: Cell<bool>,
    read_only: Cell<bool>,
    loading: Cell<bool>,
    rules: RefCell<Vec<FieldRule>>,
    listeners: Listeners,
}

/// Live state for one value field.
///
/// The value itself is not stored here: it is read from and written to
/// the owning object's live record, so every handle editing that record
/// sees the same data.
#[derive(Clone)]
pub struct FieldState(Rc<FieldNode>);

impl FieldState {
    pub(crate) fn new(
        key: &str,
        config: Rc<ValueFieldConfig>,
        parent: Weak<ObjectNode>,
        value: &Value,
    ) -> Self {
        Self(Rc::new(FieldNode {
            key: key.to_string(),
            read_only: Cell::new(config.read_only),
            config,
            parent,
            original: RefCell::new(deep_clone(value)),
            touched: Cell::new(false),
            focused: Cell::new(false),
            loading: Cell::new(false),
            rules: RefCell::new(Vec::new()),
            listeners: Listeners::default(),
        }))
    }

    #[inline]
    pub fn key(&self) -> &str {
        &self.0.key
    }

    #[inline]
    pub fn config(&self) -> &ValueFieldConfig {
        &self.0.config
    }

    pub fn owner(&self) -> Option<ObjectState> {
        self.0.parent.upgrade().map(ObjectState)
    }

    fn require_owner(&self) -> Result<ObjectState> {
        self.owner().ok_or_else(|| FormError::detached(&self.0.key))
    }

    pub fn value(&self) -> Value {
        self.owner()
            .and_then(|owner| owner.record())
            .map(|record| record.get(&self.0.key))
            .unwrap_or_default()
    }

    pub fn original_value(&self) -> Value {
        self.0.original.borrow().clone()
    }

    pub fn dirty(&self) -> bool {
        !deep_equal(&self.value(), &self.0.original.borrow(), self.0.config.order)
    }

    #[inline]
    pub fn touched(&self) -> bool {
        self.0.touched.get()
    }

    pub fn set_touched(&self, touched: bool) {
        if self.0.touched.replace(touched) != touched {
            self.notify();
        }
    }

    #[inline]
    pub fn focused(&self) -> bool {
        self.0.focused.get()
    }

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

    pub fn errors(&self) -> Vec<String> {
        let Some(object) = self.owner() else {
            return Vec::new();
        };
        let value = self.value();
        let original_value = self.original_value();
        let context = RuleContext {
            value: &value,
            original_value: &original_value,
            key: &self.0.key,
            object: &object,
        };
        let rules: Vec<FieldRule> = self
            .0
            .config
            .rules
            .iter()
            .chain(self.0.rules.borrow().iter())
            .cloned()
            .collect();
        rules.iter().filter_map(|rule| rule(&context)).collect()
    }

    pub fn valid(&self) -> bool {
        self.errors().is_empty()
    }

    /// Attach an extra rule, typically a cross-field rule from an init hook.
    pub fn add_rule(&self, rule: impl Fn(&RuleContext<'_>) -> Option<String> + 'static) {
        self.0.rules.borrow_mut().push(Rc::new(rule));
        self.notify();
    }

    /// A value field has no finer granularity than its value.
    pub fn changed_value(&self) -> Value {
        self.value()
    }

    pub fn set(&self, value: impl Into<Value>) -> Result<()> {
        self.set_with(value, SetOptions::default())
    }

    /// Write `value` into the owning record.
    ///
    /// Empty input becomes `Undefined`, or `Null` when the original held a
    /// value, so partial updates can tell "never set" from "cleared". An
    /// empty list over an empty original becomes `Undefined`. A refresh
    /// that conflicts with local edits is ignored.
    pub fn set_with(&self, value: impl Into<Value>, options: SetOptions) -> Result<()> {
        let changed = self.apply(value.into(), options)?;
        if changed && options.triggers_auto_save() && !self.focused() {
            self.require_owner()?.maybe_auto_save()?;
        }
        Ok(())
    }

    pub(crate) fn apply(&self, value: Value, options: SetOptions) -> Result<bool> {
        let owner = self.require_owner()?;
        if self.0.config.computed && options.bypasses_read_only() {
            trace!(key = %self.0.key, "computed field ignores refresh and reset");
            return Ok(false);
        }
        if !options.bypasses_read_only() && self.read_only() {
            debug!(key = %self.0.key, "rejected write to read-only field");
            return Err(FormError::ReadOnly {
                key: self.0.key.clone(),
            });
        }

        let order = self.0.config.order;
        let current = self.value();
        let was_dirty = self.dirty();
        if options.refreshing && was_dirty && !deep_equal(&value, &current, order) {
            trace!(key = %self.0.key, "kept local edit over refresh");
            return Ok(false);
        }

        let value = if options.resetting {
            value
        } else {
            self.normalize(value, options)
        };
        let changed = !deep_equal(&current, &value, order);
        if !(value.is_undefined() && owner.record().is_none()) {
            owner
                .ensure_record()?
                .insert(self.0.key.clone(), value.clone());
        }
        if options.refreshing {
            *self.0.original.borrow_mut() = deep_clone(&value);
        }
        if changed || was_dirty != self.dirty() {
            self.notify();
        }
        Ok(changed)
    }

    fn normalize(&self, value: Value, options: SetOptions) -> Value {
        let original = self.0.original.borrow();
        match value {
            empty if empty.is_empty() => {
                if !original.is_empty() && !options.refreshing {
                    Value::Null
                } else {
                    Value::Undefined
                }
            }
            Value::List(list) if list.is_empty() && original.is_nullish() => Value::Undefined,
            other => other,
        }
    }

    /// Mark focused. Bulk sets from ancestors skip this field until blur.
    pub fn focus(&self) {
        if !self.0.focused.replace(true) {
            self.notify();
        }
    }

    /// Leave the field: trim whitespace-only text, mark touched and ask
    /// for an auto-save whether or not anything changed.
    pub fn blur(&self) -> Result<()> {
        self.0.focused.set(false);
        if self.value().is_blank_text() && !self.read_only() {
            self.apply(Value::from(""), SetOptions::new().with_auto_save(false))?;
        }
        self.0.touched.set(true);
        self.notify();
        self.require_owner()?.maybe_auto_save()
    }

    /// Restore the value from the snapshot and clear touched. Computed
    /// fields keep their value.
    pub fn revert_changes(&self) {
        if !self.0.config.computed {
            let original = deep_clone(&self.0.original.borrow());
            if let Err(err) = self.apply(original, SetOptions::reset()) {
                debug!(key = %self.0.key, error = %err, "revert skipped");
            }
        }
        self.set_touched(false);
    }

    /// Take the current value as the new original and clear touched.
    pub fn commit_changes(&self) -> Result<()> {
        self.require_owner()?.guard_commit()?;
        self.commit_internal();
        Ok(())
    }

    pub(crate) fn commit_internal(&self) {
        *self.0.original.borrow_mut() = deep_clone(&self.value());
        self.0.touched.set(false);
        self.notify();
    }

    pub fn subscribe(&self, callback: impl Fn() + 'static) -> SubscriptionId {
        self.0.listeners.subscribe(Rc::new(callback))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.0.listeners.unsubscribe(id)
    }

    fn notify(&self) {
        self.0.listeners.notify();
        if let Some(owner) = self.owner() {
            owner.notify();
        }
    }
}

impl fmt::Debug for FieldState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldState")
            .field("key", &self.0.key)
            .field("value", &self.value())
            .field("original", &self.0.original.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ObjectConfig;
    use crate::rules::{max_length, required};
    use formstate_model::List;
    use serde_json::json;

    fn form_with(field: ValueFieldConfig, json: serde_json::Value) -> (ObjectState, FieldState) {
        let record = Value::from_json(json).as_record().cloned().unwrap();
        let form = ObjectState::new(ObjectConfig::new().field("name", field), record);
        let name = form.field("name").unwrap();
        (form, name)
    }

    #[test]
    fn test_emptying_a_set_value_records_null() {
        let (_form, name) = form_with(ValueFieldConfig::new(), json!({"name": "asdf"}));
        name.set("").unwrap();
        assert!(matches!(name.value(), Value::Null));
        assert_eq!(name.original_value().as_str(), Some("asdf"));
        assert!(name.dirty());
    }

    #[test]
    fn test_emptying_an_unset_value_stays_undefined() {
        let (_form, name) = form_with(ValueFieldConfig::new(), json!({}));
        name.set("x").unwrap();
        name.set("").unwrap();
        assert!(name.value().is_undefined());
        assert!(!name.dirty());
    }

    #[test]
    fn test_empty_list_over_unset_original_is_undefined() {
        let (_form, tags) = form_with(ValueFieldConfig::new(), json!({}));
        tags.set(List::new()).unwrap();
        assert!(tags.value().is_undefined());
        assert!(!tags.dirty());
    }

    #[test]
    fn test_unordered_list_value() {
        let (_form, tags) = form_with(ValueFieldConfig::new().unordered(), json!({"name": [1, 2]}));
        tags.set(Value::from_json(json!([2, 1]))).unwrap();
        assert!(!tags.dirty());
        tags.set(Value::from_json(json!([2, 3]))).unwrap();
        assert!(tags.dirty());
    }

    #[test]
    fn test_read_only_rejects_edits_but_not_refresh() {
        let (_form, name) = form_with(ValueFieldConfig::new().read_only(), json!({"name": "a"}));
        assert!(matches!(name.set("b"), Err(FormError::ReadOnly { .. })));
        name.set_with("c", SetOptions::refresh()).unwrap();
        assert_eq!(name.value().as_str(), Some("c"));
        assert!(!name.dirty());
    }

    #[test]
    fn test_refresh_keeps_conflicting_local_edit() {
        let (_form, name) = form_with(ValueFieldConfig::new(), json!({"name": "a"}));
        name.set("mine").unwrap();
        name.set_with("theirs", SetOptions::refresh()).unwrap();
        assert_eq!(name.value().as_str(), Some("mine"));
        assert!(name.dirty());

        // The server echoing the edit settles it.
        name.set_with("mine", SetOptions::refresh()).unwrap();
        assert!(!name.dirty());
    }

    #[test]
    fn test_blur_trims_blank_text_and_touches() {
        let (_form, name) = form_with(ValueFieldConfig::new(), json!({}));
        name.focus();
        name.set("   ").unwrap();
        assert!(name.focused());
        name.blur().unwrap();
        assert!(!name.focused());
        assert!(name.touched());
        assert!(name.value().is_undefined());
    }

    #[test]
    fn test_revert_and_commit() {
        let (_form, name) = form_with(ValueFieldConfig::new(), json!({"name": "a"}));
        name.set("b").unwrap();
        name.set_touched(true);
        name.revert_changes();
        assert_eq!(name.value().as_str(), Some("a"));
        assert!(!name.touched());

        name.set("c").unwrap();
        name.commit_changes().unwrap();
        assert!(!name.dirty());
        assert_eq!(name.original_value().as_str(), Some("c"));
    }

    #[test]
    fn test_computed_field_survives_revert() {
        let (_form, name) = form_with(ValueFieldConfig::new().computed(), json!({"name": "a"}));
        name.set("derived").unwrap();
        name.revert_changes();
        assert_eq!(name.value().as_str(), Some("derived"));
    }

    #[test]
    fn test_rules_run_in_order() {
        let (_form, name) = form_with(
            ValueFieldConfig::new().rule(required()).rule(max_length(3)),
            json!({}),
        );
        assert_eq!(name.errors(), ["Required"]);
        name.set("toolong").unwrap();
        assert_eq!(name.errors(), ["Must be at most 3 characters"]);
        name.add_rule(|ctx| (ctx.value.as_str() == Some("toolong")).then(|| "Nope".to_string()));
        assert_eq!(name.errors(), ["Must be at most 3 characters", "Nope"]);
        assert!(!name.valid());
    }

    #[test]
    fn test_listeners_fire_only_on_change() {
        let (form, name) = form_with(ValueFieldConfig::new(), json!({"name": "a"}));
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        form.subscribe(move || counter.set(counter.get() + 1));
        name.set("a").unwrap();
        assert_eq!(hits.get(), 0);
        name.set("b").unwrap();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_dropped_form_reports_invariant_violation() {
        let (form, name) = form_with(ValueFieldConfig::new(), json!({}));
        drop(form);
        assert!(matches!(name.set("x"), Err(FormError::InvariantViolation { .. })));
        assert!(name.value().is_undefined());
    }
}
