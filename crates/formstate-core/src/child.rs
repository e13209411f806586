use formstate_model::Value;

use crate::error::Result;
use crate::field::FieldState;
use crate::fragment::FragmentState;
use crate::list::ListState;
use crate::object::ObjectState;
use crate::options::SetOptions;

/// A child of an [`ObjectState`], by configured kind.
#[derive(Clone, Debug)]
pub enum ChildState {
    Value(FieldState),
    Object(ObjectState),
    List(ListState),
    Fragment(FragmentState),
}

impl ChildState {
    pub fn dirty(&self) -> bool {
        match self {
            ChildState::Value(field) => field.dirty(),
            ChildState::Object(object) => object.dirty(),
            ChildState::List(list) => list.dirty(),
            ChildState::Fragment(_) => false,
        }
    }

    pub fn touched(&self) -> bool {
        match self {
            ChildState::Value(field) => field.touched(),
            ChildState::Object(object) => object.touched(),
            ChildState::List(list) => list.touched(),
            ChildState::Fragment(_) => false,
        }
    }

    pub fn errors(&self) -> Vec<String> {
        match self {
            ChildState::Value(field) => field.errors(),
            ChildState::Object(object) => object.errors(),
            ChildState::List(list) => list.errors(),
            ChildState::Fragment(_) => Vec::new(),
        }
    }

    pub fn value(&self) -> Value {
        match self {
            ChildState::Value(field) => field.value(),
            ChildState::Object(object) => object.value(),
            ChildState::List(list) => list.value(),
            ChildState::Fragment(fragment) => fragment.value(),
        }
    }

    pub fn changed_value(&self) -> Value {
        match self {
            ChildState::Value(field) => field.changed_value(),
            ChildState::Object(object) => object.changed_value(),
            ChildState::List(list) => list.changed_value(),
            ChildState::Fragment(_) => Value::Undefined,
        }
    }

    /// Errors as the owning object reports them, prefixed with `key`.
    pub(crate) fn qualified_errors(&self, key: &str) -> Vec<String> {
        match self {
            ChildState::Value(field) => {
                let errors = field.errors();
                if errors.is_empty() {
                    Vec::new()
                } else {
                    vec![format!("{key}: {}", errors.join(", "))]
                }
            }
            ChildState::Object(object) => object
                .errors()
                .into_iter()
                .map(|error| format!("{key}.{error}"))
                .collect(),
            ChildState::List(list) => list
                .rule_errors()
                .into_iter()
                .map(|error| format!("{key}: {error}"))
                .chain(
                    list.row_errors()
                        .into_iter()
                        .map(|(index, error)| format!("{key}[{index}].{error}")),
                )
                .collect(),
            ChildState::Fragment(_) => Vec::new(),
        }
    }

    pub(crate) fn set_touched(&self, touched: bool) {
        match self {
            ChildState::Value(field) => field.set_touched(touched),
            ChildState::Object(object) => object.set_touched(touched),
            ChildState::List(list) => list.set_touched(touched),
            ChildState::Fragment(_) => {}
        }
    }

    pub(crate) fn apply(&self, value: Value, options: SetOptions) -> Result<bool> {
        match self {
            ChildState::Value(field) => field.apply(value, options),
            ChildState::Object(object) => object.apply(value, options),
            ChildState::List(list) => list.apply(value, options),
            ChildState::Fragment(fragment) => {
                fragment.write(value)?;
                Ok(false)
            }
        }
    }

    pub(crate) fn revert_changes(&self) {
        match self {
            ChildState::Value(field) => field.revert_changes(),
            ChildState::Object(object) => object.revert_changes(),
            ChildState::List(list) => list.revert_changes(),
            ChildState::Fragment(_) => {}
        }
    }

    pub(crate) fn commit_internal(&self) {
        match self {
            ChildState::Value(field) => field.commit_internal(),
            ChildState::Object(object) => object.commit_internal(),
            ChildState::List(list) => list.commit_internal(),
            ChildState::Fragment(_) => {}
        }
    }

    pub(crate) fn run_init_hooks(&self) {
        match self {
            ChildState::Object(object) => object.run_init_hooks(),
            ChildState::List(list) => {
                for row in list.rows() {
                    row.run_init_hooks();
                }
            }
            ChildState::Value(_) | ChildState::Fragment(_) => {}
        }
    }

    pub(crate) fn is_focused(&self) -> bool {
        matches!(self, ChildState::Value(field) if field.focused())
    }

    pub(crate) fn is_computed(&self) -> bool {
        matches!(self, ChildState::Value(field) if field.config().is_computed())
    }

    /// Used to decide what a brand-new entity must send.
    pub(crate) fn is_empty_value(&self) -> bool {
        match self {
            ChildState::Value(field) => field.value().is_empty(),
            ChildState::Object(object) => !object.is_set(),
            ChildState::List(list) => list.is_empty(),
            ChildState::Fragment(fragment) => fragment.value().is_empty(),
        }
    }
}
