//! Runtime field configuration.
//!
//! Configuration is built once, either in code with the builder methods or
//! from a declarative [`ConfigSpec`](formstate_model::ConfigSpec), and then
//! shared by every state node built from it. The per-object accessor table
//! (which key is the id, which key carries the operation discriminator, and
//! so on) is resolved here so state nodes never inspect values to learn
//! their own shape.

use std::rc::Rc;

use formstate_model::{
    FieldRole, FieldSpec, ListOrder, ListSpec, ObjectSpec, UpdateMode, Value, ValueFieldSpec,
};
use indexmap::IndexMap;

use crate::list::ListState;
use crate::object::ObjectState;
use crate::rules;

/// Input handed to a field rule.
pub struct RuleContext<'a> {
    pub value: &'a Value,
    pub original_value: &'a Value,
    pub key: &'a str,
    pub object: &'a ObjectState,
}

/// Field validator. Returns an error message, or `None` when valid.
pub type FieldRule = Rc<dyn Fn(&RuleContext<'_>) -> Option<String>>;

/// Object-level validator, evaluated after the children.
pub type ObjectRule = Rc<dyn Fn(&ObjectState) -> Option<String>>;

/// List-level validator.
pub type ListRule = Rc<dyn Fn(&ListState) -> Option<String>>;

/// Hook run once per object state after its tree is built. Used to attach
/// cross-field rules and derived values.
pub type InitHook = Rc<dyn Fn(&ObjectState)>;

/// Configuration for a single value field.
#[derive(Clone, Default)]
pub struct ValueFieldConfig {
    pub(crate) rules: Vec<FieldRule>,
    pub(crate) role: FieldRole,
    pub(crate) computed: bool,
    pub(crate) read_only: bool,
    pub(crate) order: ListOrder,
}

impl ValueFieldConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(mut self, rule: FieldRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn role(mut self, role: FieldRole) -> Self {
        self.role = role;
        self
    }

    /// Shorthand for `role(FieldRole::Id)`.
    pub fn id(self) -> Self {
        self.role(FieldRole::Id)
    }

    /// Derived from sibling fields: excluded from partial updates and
    /// left alone by revert.
    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Compare list-typed values without regard to order.
    pub fn unordered(mut self) -> Self {
        self.order = ListOrder::Unordered;
        self
    }

    #[inline]
    pub fn field_role(&self) -> FieldRole {
        self.role
    }

    #[inline]
    pub fn is_computed(&self) -> bool {
        self.computed
    }
}

/// Configuration for a composite record.
#[derive(Clone, Default)]
pub struct ObjectConfig {
    pub(crate) fields: IndexMap<String, FieldConfig>,
    pub(crate) rules: Vec<ObjectRule>,
    pub(crate) reference: bool,
    pub(crate) read_only: bool,
    pub(crate) init: Option<InitHook>,
}

impl ObjectConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, key: impl Into<String>, config: impl Into<FieldConfig>) -> Self {
        self.fields.insert(key.into(), config.into());
        self
    }

    pub fn rule(mut self, rule: ObjectRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Partial updates carry only this object's id.
    pub fn reference(mut self) -> Self {
        self.reference = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn on_init(mut self, hook: impl Fn(&ObjectState) + 'static) -> Self {
        self.init = Some(Rc::new(hook));
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldConfig)> {
        self.fields.iter().map(|(key, config)| (key.as_str(), config))
    }

    #[inline]
    pub fn is_reference(&self) -> bool {
        self.reference
    }

    /// Key of the identity field: the field marked as id, or else a value
    /// field literally named `id`.
    pub fn id_key(&self) -> Option<&str> {
        self.key_with_role(FieldRole::Id).or_else(|| {
            matches!(self.fields.get("id"), Some(FieldConfig::Value(_))).then_some("id")
        })
    }

    pub fn op_key(&self) -> Option<&str> {
        self.key_with_role(FieldRole::Operation)
    }

    pub fn delete_key(&self) -> Option<&str> {
        self.key_with_role(FieldRole::Delete)
    }

    pub fn read_only_key(&self) -> Option<&str> {
        self.key_with_role(FieldRole::ReadOnlyFlag)
    }

    fn key_with_role(&self, role: FieldRole) -> Option<&str> {
        self.fields.iter().find_map(|(key, config)| match config {
            FieldConfig::Value(value) if value.role == role => Some(key.as_str()),
            _ => None,
        })
    }
}

/// Configuration for a list of rows.
#[derive(Clone)]
pub struct ListConfig {
    pub(crate) row: Rc<ObjectConfig>,
    pub(crate) rules: Vec<ListRule>,
    pub(crate) strict_order: bool,
    pub(crate) update: UpdateMode,
    pub(crate) read_only: bool,
}

impl ListConfig {
    pub fn new(row: ObjectConfig) -> Self {
        Self {
            row: Rc::new(row),
            rules: Vec::new(),
            strict_order: true,
            update: UpdateMode::Exhaustive,
            read_only: false,
        }
    }

    pub fn rule(mut self, rule: ListRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Row order does not count toward dirtiness.
    pub fn unordered(mut self) -> Self {
        self.strict_order = false;
        self
    }

    pub fn update(mut self, mode: UpdateMode) -> Self {
        self.update = mode;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    #[inline]
    pub fn row(&self) -> &ObjectConfig {
        &self.row
    }

    #[inline]
    pub fn is_strict_order(&self) -> bool {
        self.strict_order
    }

    /// Incremental when configured, or implied by an operation or delete
    /// marker on the rows.
    pub fn is_incremental(&self) -> bool {
        self.update == UpdateMode::Incremental
            || self.row.op_key().is_some()
            || self.row.delete_key().is_some()
    }
}

/// One entry in an object's field table.
#[derive(Clone)]
pub enum FieldConfig {
    Value(Rc<ValueFieldConfig>),
    Object(Rc<ObjectConfig>),
    List(Rc<ListConfig>),
    /// Passenger value excluded from change tracking.
    Fragment,
}

impl FieldConfig {
    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldConfig::Value(_) => "value",
            FieldConfig::Object(_) => "object",
            FieldConfig::List(_) => "list",
            FieldConfig::Fragment => "fragment",
        }
    }
}

impl From<ValueFieldConfig> for FieldConfig {
    fn from(config: ValueFieldConfig) -> Self {
        FieldConfig::Value(Rc::new(config))
    }
}

impl From<ObjectConfig> for FieldConfig {
    fn from(config: ObjectConfig) -> Self {
        FieldConfig::Object(Rc::new(config))
    }
}

impl From<ListConfig> for FieldConfig {
    fn from(config: ListConfig) -> Self {
        FieldConfig::List(Rc::new(config))
    }
}

impl From<&ValueFieldSpec> for ValueFieldConfig {
    fn from(spec: &ValueFieldSpec) -> Self {
        Self {
            rules: spec.rules.iter().map(rules::from_spec).collect(),
            role: spec.role,
            computed: spec.computed,
            read_only: spec.read_only,
            order: ListOrder::from_strict(spec.strict_order),
        }
    }
}

impl From<&ObjectSpec> for ObjectConfig {
    fn from(spec: &ObjectSpec) -> Self {
        Self {
            fields: spec
                .fields
                .iter()
                .map(|(key, field)| (key.clone(), FieldConfig::from(field)))
                .collect(),
            rules: Vec::new(),
            reference: spec.reference,
            read_only: spec.read_only,
            init: None,
        }
    }
}

impl From<&ListSpec> for ListConfig {
    fn from(spec: &ListSpec) -> Self {
        let mut config = ListConfig::new(ObjectConfig::from(&spec.row)).update(spec.update);
        config.strict_order = spec.strict_order;
        config.read_only = spec.read_only;
        if let Some(min) = spec.min_rows {
            config = config.rule(rules::min_rows(min));
        }
        config
    }
}

impl From<&FieldSpec> for FieldConfig {
    fn from(spec: &FieldSpec) -> Self {
        match spec {
            FieldSpec::Value(value) => ValueFieldConfig::from(value).into(),
            FieldSpec::Object(object) => ObjectConfig::from(object).into(),
            FieldSpec::List(list) => ListConfig::from(list).into(),
            FieldSpec::Fragment => FieldConfig::Fragment,
        }
    }
}
