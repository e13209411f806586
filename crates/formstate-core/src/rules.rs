//! Built-in validation rules.

use std::rc::Rc;

use formstate_model::{RuleSpec, Value};

use crate::config::{FieldRule, ListRule};

/// Fails on `Undefined`, `Null` and the empty string.
pub fn required() -> FieldRule {
    Rc::new(|ctx| ctx.value.is_empty().then(|| "Required".to_string()))
}

/// Fails on text longer than `max` characters.
pub fn max_length(max: usize) -> FieldRule {
    Rc::new(move |ctx| match ctx.value {
        Value::Text(text) if text.chars().count() > max => {
            Some(format!("Must be at most {max} characters"))
        }
        _ => None,
    })
}

/// Fails when the list has fewer than `min` rows.
pub fn min_rows(min: usize) -> ListRule {
    Rc::new(move |list| (list.len() < min).then(|| format!("Requires at least {min} rows")))
}

pub(crate) fn from_spec(spec: &RuleSpec) -> FieldRule {
    match spec {
        RuleSpec::Required => required(),
        RuleSpec::MaxLength { max } => max_length(*max),
    }
}
