//! Reactive, hierarchical form state.
//!
//! An [`ObjectState`] mirrors the shape of a live record according to an
//! [`ObjectConfig`], decorating every field, nested object and list with
//! dirty, touched, validity and read-only state, and extracting minimal
//! partial-update payloads with `changed_value()`. Saves triggered by edits
//! are serialized through an [`AutoSaveCoordinator`].

pub mod autosave;
pub mod child;
pub mod config;
pub mod error;
pub mod field;
pub mod fragment;
pub mod host;
pub mod list;
pub mod listener;
pub mod object;
pub mod options;
pub mod rules;

pub use autosave::{AutoSaveCoordinator, AutoSavePhase, SaveCallback, next_tick};
pub use child::ChildState;
pub use config::{
    FieldConfig, FieldRule, InitHook, ListConfig, ListRule, ObjectConfig, ObjectRule,
    RuleContext, ValueFieldConfig,
};
pub use error::{FormError, Result};
pub use field::FieldState;
pub use fragment::FragmentState;
pub use host::{FormHost, FormInput, InputMap};
pub use list::ListState;
pub use listener::SubscriptionId;
pub use object::{ObjectState, WeakObjectState};
pub use options::SetOptions;
pub use rules::{max_length, min_rows, required};

pub use formstate_model::{
    FieldRole, List, ListOrder, Opaque, OpaqueValue, Record, UpdateMode, Value, deep_clone,
    deep_equal,
};
