//! Binding a form to host-supplied input.
//!
//! A host either hands the form a value that already has the form's shape,
//! or an arbitrary input plus a mapping function. The mapping is
//! re-evaluated, and the result applied as a refresh, only when the input
//! changes identity.

use std::fmt;
use std::rc::Rc;

use formstate_model::{ListOrder, Record, Value, deep_equal};
use tracing::debug;

use crate::config::ObjectConfig;
use crate::error::{FormError, Result};
use crate::object::ObjectState;
use crate::options::SetOptions;

/// Maps host input to the form's value.
pub type InputMap = Rc<dyn Fn(&Value) -> Value>;

/// What the host supplies to a [`FormHost`].
#[derive(Clone)]
pub enum FormInput {
    /// A value already shaped like the form.
    Value(Value),
    /// An input mapped to the form's value. `if_undefined` stands in when
    /// the mapping yields `Undefined`.
    Mapped {
        input: Value,
        map: InputMap,
        if_undefined: Option<Value>,
    },
}

impl FormInput {
    pub fn mapped(input: impl Into<Value>, map: impl Fn(&Value) -> Value + 'static) -> Self {
        FormInput::Mapped {
            input: input.into(),
            map: Rc::new(map),
            if_undefined: None,
        }
    }

    pub fn with_default(self, default: impl Into<Value>) -> Self {
        match self {
            FormInput::Mapped { input, map, .. } => FormInput::Mapped {
                input,
                map,
                if_undefined: Some(default.into()),
            },
            value => value,
        }
    }

    fn source(&self) -> &Value {
        match self {
            FormInput::Value(value) => value,
            FormInput::Mapped { input, .. } => input,
        }
    }

    fn resolve(&self) -> Value {
        match self {
            FormInput::Value(value) => value.clone(),
            FormInput::Mapped {
                input,
                map,
                if_undefined,
            } => match map(input) {
                Value::Undefined => if_undefined.clone().unwrap_or_default(),
                value => value,
            },
        }
    }
}

/// Owns a form and keeps it in step with host input.
pub struct FormHost {
    state: ObjectState,
    source: Value,
}

impl FormHost {
    pub fn new(config: impl Into<Rc<ObjectConfig>>, input: FormInput) -> Result<Self> {
        let state = ObjectState::from_value(config, input.resolve())?;
        Ok(Self {
            state,
            source: input.source().clone(),
        })
    }

    #[inline]
    pub fn state(&self) -> &ObjectState {
        &self.state
    }

    /// Apply new host input. Returns `false` when the input is the same
    /// instance (or an equal primitive) as last time.
    pub fn update(&mut self, input: FormInput) -> Result<bool> {
        if same_source(&self.source, input.source()) {
            return Ok(false);
        }
        debug!("host input changed, refreshing form");
        let value = match input.resolve() {
            Value::Undefined | Value::Null => Value::Record(Record::new()),
            record @ Value::Record(_) => record,
            other => {
                return Err(FormError::TypeMismatch {
                    key: String::new(),
                    expected: "record",
                    found: other.kind_name(),
                });
            }
        };
        self.state.set_with(value, SetOptions::refresh())?;
        self.source = input.source().clone();
        Ok(true)
    }
}

fn same_source(previous: &Value, next: &Value) -> bool {
    match (previous.identity(), next.identity()) {
        (Some(_), Some(_)) => previous.same_instance(next),
        (None, None) => deep_equal(previous, next, ListOrder::Strict),
        _ => false,
    }
}

impl fmt::Debug for FormHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormHost")
            .field("state", &self.state)
            .field("source", &self.source)
            .finish()
    }
}
