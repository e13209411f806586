pub mod equality;
pub mod error;
pub mod spec;
pub mod value;

pub use equality::{ListOrder, deep_clone, deep_clone_record, deep_equal};
pub use error::{ModelError, Result};
pub use spec::{
    ConfigSpec, FieldRole, FieldSpec, ListSpec, ObjectSpec, RuleSpec, UpdateMode, ValueFieldSpec,
};
pub use value::{List, Opaque, OpaqueValue, Record, Value};
