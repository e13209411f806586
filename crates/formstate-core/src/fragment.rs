//! Passenger values carried by a form without change tracking.

use std::fmt;
use std::rc::{Rc, Weak};

use formstate_model::Value;

use crate::error::{FormError, Result};
use crate::object::{ObjectNode, ObjectState};

pub(crate) struct FragmentNode {
    key: String,
    parent: Weak<ObjectNode>,
}

/// A value slot that is never dirty, touched or invalid, and never appears
/// in partial updates.
#[derive(Clone)]
pub struct FragmentState(Rc<FragmentNode>);

impl FragmentState {
    pub(crate) fn new(key: &str, parent: Weak<ObjectNode>) -> Self {
        Self(Rc::new(FragmentNode {
            key: key.to_string(),
            parent,
        }))
    }

    #[inline]
    pub fn key(&self) -> &str {
        &self.0.key
    }

    pub fn owner(&self) -> Option<ObjectState> {
        self.0.parent.upgrade().map(ObjectState)
    }

    pub fn value(&self) -> Value {
        self.owner()
            .and_then(|owner| owner.record())
            .map(|record| record.get(&self.0.key))
            .unwrap_or_default()
    }

    /// Replace the passenger value. No validation, auto-save or
    /// notification takes place.
    pub fn set(&self, value: impl Into<Value>) -> Result<()> {
        self.write(value.into())
    }

    pub(crate) fn write(&self, value: Value) -> Result<()> {
        let owner = self
            .owner()
            .ok_or_else(|| FormError::detached(&self.0.key))?;
        if value.is_undefined() && owner.record().is_none() {
            return Ok(());
        }
        owner.ensure_record()?.insert(self.0.key.clone(), value);
        Ok(())
    }
}

impl fmt::Debug for FragmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FragmentState")
            .field("key", &self.0.key)
            .field("value", &self.value())
            .finish()
    }
}
