//! # Type Descriptors
//!
//! A [`Descriptor`] is one node of a schema: a primitive leaf, a generic
//! container, a record, a class-backed record, or a forward reference.
//! Each descriptor pairs a shape with a [`DefaultPolicy`] and
//! implements the conversion contract:
//!
//! - [`Descriptor::to_encoded`] / [`Descriptor::from_encoded`] convert
//!   between native values and one of the two wire [`Target`]s.
//! - [`Descriptor::apply`] walks a value alongside the descriptor and
//!   rebuilds it bottom-up through a caller-supplied transform. Validation
//!   and class reconstruction are both built on it.
//!
//! ## Invariants
//!
//! - Descriptors are immutable. Attaching a default or binding template
//!   parameters returns a new descriptor; the receiver is never touched.
//! - `Value::Null` passes through every conversion unchanged without
//!   reaching descriptor-specific logic.
//! - Two descriptors are equal iff they have the same kind, the same
//!   default policy and the same structural parameters.

mod generic;
mod leaf;

pub use generic::Container;
pub use leaf::{Leaf, LeafCodec};

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;

use crate::class::ClassType;
use crate::error::SchemaError;
use crate::placeholder::Placeholder;
use crate::policy::{DefaultPolicy, Target};
use crate::record::{Record, StructType};
use crate::value::{EnumType, Value};

/// Untyped leaf: accepts any value the engine does not manage itself.
pub const ANY: Descriptor = Descriptor::leaf(Leaf::Any);
pub const INT: Descriptor = Descriptor::leaf(Leaf::Int);
pub const STR: Descriptor = Descriptor::leaf(Leaf::Str);
pub const BOOL: Descriptor = Descriptor::leaf(Leaf::Bool);
/// Accepts integers or floats, always produces floats.
pub const FLOAT: Descriptor = Descriptor::leaf(Leaf::Float);
/// Base85 text on the JSON target, raw bytes on the BSON target.
pub const BYTES: Descriptor = Descriptor::leaf(Leaf::Bytes);
/// RFC 3339 text on the JSON target, native on the BSON target.
pub const DATETIME: Descriptor = Descriptor::leaf(Leaf::Datetime);
pub const PATH: Descriptor = Descriptor::leaf(Leaf::Path);

pub const LIST: Descriptor = Descriptor::generic(Container::List);
pub const DICT: Descriptor = Descriptor::generic(Container::Dict);
pub const DEFAULT_DICT: Descriptor = Descriptor::generic(Container::DefaultDict);
pub const TUPLE: Descriptor = Descriptor::generic(Container::Tuple);

/// `List[item]`.
pub fn list_of(item: Descriptor) -> Descriptor {
    Descriptor::specialized(Container::List, vec![item])
}

/// `Dict[key, value]`.
pub fn dict_of(key: Descriptor, value: Descriptor) -> Descriptor {
    Descriptor::specialized(Container::Dict, vec![key, value])
}

/// `Dict[Str, value]`.
pub fn map_of(value: Descriptor) -> Descriptor {
    dict_of(STR, value)
}

/// `DefaultDict[key, value]`; missing keys vivify with `value`'s default.
pub fn default_dict_of(key: Descriptor, value: Descriptor) -> Descriptor {
    Descriptor::specialized(Container::DefaultDict, vec![key, value])
}

/// `Tuple[items...]`; values must have exactly `items.len()` elements.
pub fn tuple_of(items: impl IntoIterator<Item = Descriptor>) -> Descriptor {
    Descriptor::specialized(Container::Tuple, items.into_iter().collect())
}

/// Leaf descriptor for the members of `ty`.
pub fn enumeration(ty: Arc<EnumType>) -> Descriptor {
    Descriptor::from_kind(Kind::Enum(ty))
}

/// Leaf descriptor backed by a collaborator-supplied codec.
pub fn custom(codec: Arc<dyn LeafCodec>) -> Descriptor {
    Descriptor::from_kind(Kind::Custom(codec))
}

/// The shape half of a descriptor.
#[derive(Debug, Clone)]
pub(crate) enum Kind {
    Leaf(Leaf),
    Enum(Arc<EnumType>),
    Custom(Arc<dyn LeafCodec>),
    Generic(Container, Option<Vec<Descriptor>>),
    Struct(Arc<StructType>),
    Class(Arc<ClassType>),
    Placeholder(Placeholder),
}

impl PartialEq for Kind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Kind::Leaf(a), Kind::Leaf(b)) => a == b,
            (Kind::Enum(a), Kind::Enum(b)) => Arc::ptr_eq(a, b) || a == b,
            (Kind::Custom(a), Kind::Custom(b)) => a.name() == b.name(),
            (Kind::Generic(c1, p1), Kind::Generic(c2, p2)) => c1 == c2 && p1 == p2,
            (Kind::Struct(a), Kind::Struct(b)) => Arc::ptr_eq(a, b) || a == b,
            (Kind::Class(a), Kind::Class(b)) => Arc::ptr_eq(a, b) || a == b,
            (Kind::Placeholder(a), Kind::Placeholder(b)) => a == b,
            _ => false,
        }
    }
}

/// A schema node: a shape plus a default-value policy.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    kind: Kind,
    default: DefaultPolicy,
}

impl Descriptor {
    const fn leaf(leaf: Leaf) -> Self {
        Self {
            kind: Kind::Leaf(leaf),
            default: DefaultPolicy::Required,
        }
    }

    const fn generic(container: Container) -> Self {
        Self {
            kind: Kind::Generic(container, None),
            default: DefaultPolicy::Required,
        }
    }

    fn specialized(container: Container, params: Vec<Descriptor>) -> Self {
        Self::from_kind(Kind::Generic(container, Some(container.normalize(params))))
    }

    pub(crate) fn from_kind(kind: Kind) -> Self {
        Self {
            kind,
            default: DefaultPolicy::Required,
        }
    }

    // ---- default policy ----

    /// The active default policy.
    pub fn policy(&self) -> &DefaultPolicy {
        &self.default
    }

    /// Whether a value can be produced without the caller supplying one.
    pub fn has_default(&self) -> bool {
        self.default.has_default()
    }

    pub(crate) fn with_policy(&self, policy: DefaultPolicy) -> Self {
        Self {
            kind: self.kind.clone(),
            default: policy,
        }
    }

    /// Copy of this descriptor defaulting to `value`.
    pub fn with_default(&self, value: impl Into<Value>) -> Self {
        self.with_policy(DefaultPolicy::Value(value.into()))
    }

    /// Copy of this descriptor defaulting to null.
    pub fn none(&self) -> Self {
        self.with_default(Value::Null)
    }

    /// Copy of this descriptor defaulting to a freshly constructed empty value.
    pub fn empty(&self) -> Self {
        self.with_policy(DefaultPolicy::Empty)
    }

    /// Copy of this descriptor whose field may be left unset in a record.
    pub fn missing(&self) -> Self {
        self.with_policy(DefaultPolicy::Missing)
    }

    /// Copy of this descriptor with no default.
    pub fn required(&self) -> Self {
        self.with_policy(DefaultPolicy::Required)
    }

    /// Copy of a timestamp descriptor defaulting to the construction time.
    pub fn now(&self) -> Result<Self, SchemaError> {
        match self.resolved()?.kind {
            Kind::Leaf(Leaf::Datetime) => Ok(self.with_policy(DefaultPolicy::Now)),
            _ => Err(SchemaError::Policy(format!("{} has no 'now' default", self.name()))),
        }
    }

    /// The value to use when a record field is not supplied.
    ///
    /// # Errors
    ///
    /// `Policy` when the descriptor is required, or when a `missing`
    /// descriptor is queried outside record construction.
    pub fn default_value(&self) -> Result<Value, SchemaError> {
        if let Kind::Placeholder(_) = self.kind {
            return self.resolved()?.default_value();
        }
        match &self.default {
            DefaultPolicy::Required => Err(SchemaError::Policy(format!("{self} has no default value"))),
            DefaultPolicy::Empty => self.instantiate(),
            DefaultPolicy::Missing => Err(SchemaError::Policy(format!(
                "{self} can only be left unset inside a record"
            ))),
            DefaultPolicy::Now => match self.kind {
                Kind::Leaf(Leaf::Datetime) => Ok(Value::DateTime(Utc::now())),
                _ => Err(SchemaError::Policy(format!("{self} cannot compute 'now'"))),
            },
            DefaultPolicy::Value(value) => Ok(value.clone()),
        }
    }

    /// Construct a value with the native zero-argument constructor.
    pub fn instantiate(&self) -> Result<Value, SchemaError> {
        match &self.kind {
            Kind::Leaf(leaf) => leaf.instantiate(),
            Kind::Enum(ty) => Err(SchemaError::Policy(format!(
                "enum {} cannot be constructed without arguments",
                ty.name()
            ))),
            Kind::Custom(codec) => codec.instantiate(),
            Kind::Generic(container, params) => Ok(container.instantiate(params.as_deref())),
            Kind::Struct(schema) => schema.new_record(Vec::<(String, Value)>::new()).map(Value::Record),
            Kind::Class(class) => class.schema().new_record(Vec::<(String, Value)>::new()).map(Value::Record),
            Kind::Placeholder(_) => self.resolved()?.instantiate(),
        }
    }

    // ---- naming ----

    /// Display name without the default policy, e.g. `Dict[Str, Int]`.
    pub fn name(&self) -> String {
        match &self.kind {
            Kind::Leaf(leaf) => leaf.name().to_string(),
            Kind::Enum(ty) => ty.name().to_string(),
            Kind::Custom(codec) => codec.name().to_string(),
            Kind::Generic(container, None) => container.base_name().to_string(),
            Kind::Generic(container, Some(params)) => {
                let inner: Vec<String> = params.iter().map(Descriptor::name).collect();
                format!("{}[{}]", container.base_name(), inner.join(", "))
            }
            Kind::Struct(schema) => schema.name(),
            Kind::Class(class) => class.name(),
            Kind::Placeholder(placeholder) => placeholder.name().to_string(),
        }
    }

    // ---- forward references ----

    /// Follow forward references to the bound descriptor, carrying this
    /// descriptor's own default policy onto it.
    pub(crate) fn resolved(&self) -> Result<Cow<'_, Descriptor>, SchemaError> {
        match &self.kind {
            Kind::Placeholder(placeholder) => {
                let target = placeholder
                    .target()
                    .ok_or_else(|| SchemaError::UnresolvedReference(placeholder.name().to_string()))?;
                let bound = target.with_policy(self.default.clone());
                let owned = bound.resolved()?.into_owned();
                Ok(Cow::Owned(owned))
            }
            _ => Ok(Cow::Borrowed(self)),
        }
    }

    /// The record schema behind a record or class descriptor.
    pub fn as_struct(&self) -> Option<Arc<StructType>> {
        match &self.resolved().ok()?.kind {
            Kind::Struct(schema) => Some(Arc::clone(schema)),
            Kind::Class(class) => Some(Arc::clone(class.schema())),
            _ => None,
        }
    }

    /// The class type behind a class-backed descriptor.
    pub fn as_class(&self) -> Option<Arc<ClassType>> {
        match &self.resolved().ok()?.kind {
            Kind::Class(class) => Some(Arc::clone(class)),
            _ => None,
        }
    }

    /// Template parameters of a specialized container.
    pub fn parameters(&self) -> Option<&[Descriptor]> {
        match &self.kind {
            Kind::Generic(_, params) => params.as_deref(),
            _ => None,
        }
    }

    // ---- generic specialization ----

    /// Bind template parameters on an unspecialized container.
    ///
    /// `Dict` with a single parameter binds `Dict[Str, param]`.
    ///
    /// # Errors
    ///
    /// `AlreadySpecialized` if parameters are already bound, `Arity` if the
    /// container does not take that many parameters, `TypeMismatch` if the
    /// descriptor is not a container.
    pub fn of(&self, params: impl IntoIterator<Item = Descriptor>) -> Result<Descriptor, SchemaError> {
        match &self.kind {
            Kind::Generic(container, existing) => {
                if existing.is_some() {
                    return Err(SchemaError::AlreadySpecialized(self.name()));
                }
                let params = container.check_parameters(params.into_iter().collect())?;
                Ok(Self {
                    kind: Kind::Generic(*container, Some(params)),
                    default: self.default.clone(),
                })
            }
            _ => Err(SchemaError::TypeMismatch {
                expected: "a generic container".into(),
                actual: self.name(),
            }),
        }
    }

    // ---- records ----

    /// Build a record value from named fields; record and class descriptors only.
    pub fn new_record<K: Into<String>>(
        &self,
        fields: impl IntoIterator<Item = (K, Value)>,
    ) -> Result<Record, SchemaError> {
        let resolved = self.resolved()?;
        match &resolved.kind {
            Kind::Struct(schema) => schema.new_record(fields),
            Kind::Class(class) => class.schema().new_record(fields),
            _ => Err(SchemaError::TypeMismatch {
                expected: "a record descriptor".into(),
                actual: self.name(),
            }),
        }
    }

    // ---- conversion ----

    /// Convert a native value to its encoded form for `target`.
    pub fn to_encoded(&self, value: &Value, target: Target) -> Result<Value, SchemaError> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        match &self.kind {
            Kind::Leaf(leaf) => leaf.to_encoded(value, target),
            Kind::Enum(ty) => leaf::enum_to_encoded(ty, value),
            Kind::Custom(codec) => {
                codec.check(value)?;
                codec.to_encoded(value, target)
            }
            Kind::Generic(container, params) => self.generic_to_encoded(*container, params.as_deref(), value, target),
            Kind::Struct(schema) => schema.to_encoded(value, target),
            Kind::Class(class) => class.schema().to_encoded(value, target),
            Kind::Placeholder(_) => self.resolved()?.to_encoded(value, target),
        }
    }

    /// Convert an encoded value from `source` back to its native form.
    pub fn from_encoded(&self, encoded: &Value, source: Target) -> Result<Value, SchemaError> {
        if encoded.is_null() {
            return Ok(Value::Null);
        }
        match &self.kind {
            Kind::Leaf(leaf) => leaf.from_encoded(encoded, source),
            Kind::Enum(ty) => leaf::enum_from_encoded(ty, encoded),
            Kind::Custom(codec) => codec.from_encoded(encoded, source),
            Kind::Generic(container, params) => {
                self.generic_from_encoded(*container, params.as_deref(), encoded, source)
            }
            Kind::Struct(schema) => schema.from_encoded(encoded, source),
            Kind::Class(class) => class.schema().from_encoded(encoded, source),
            Kind::Placeholder(_) => self.resolved()?.from_encoded(encoded, source),
        }
    }

    /// Encode for the JSON target and bridge to `serde_json`.
    pub fn to_json(&self, value: &Value) -> Result<serde_json::Value, SchemaError> {
        self.to_encoded(value, Target::Json)?.to_json()
    }

    /// Decode a `serde_json` document from the JSON target.
    pub fn from_json(&self, json: serde_json::Value) -> Result<Value, SchemaError> {
        self.from_encoded(&Value::from_json(json), Target::Json)
    }

    /// Encode for the BSON target.
    pub fn to_bson(&self, value: &Value) -> Result<Value, SchemaError> {
        self.to_encoded(value, Target::Bson)
    }

    /// Decode from the BSON target.
    pub fn from_bson(&self, encoded: &Value) -> Result<Value, SchemaError> {
        self.from_encoded(encoded, Target::Bson)
    }

    // ---- traversal ----

    /// Walk `value` alongside this descriptor, calling `func(descriptor, sub_value)`
    /// bottom-up on every leaf and composite and rebuilding composites from
    /// the results.
    ///
    /// Forward references are followed, so `func` always sees the bound
    /// descriptor rather than the reference.
    pub fn apply<F>(&self, value: Value, func: &mut F) -> Result<Value, SchemaError>
    where
        F: FnMut(&Descriptor, Value) -> Result<Value, SchemaError>,
    {
        if let Kind::Placeholder(_) = self.kind {
            return self.resolved()?.apply(value, func);
        }
        if value.is_null() {
            return func(self, value);
        }
        match &self.kind {
            Kind::Generic(container, params) => self.generic_apply(*container, params.as_deref(), value, func),
            Kind::Struct(schema) => schema.apply(self, value, func),
            Kind::Class(class) => class.apply(self, value, func),
            _ => func(self, value),
        }
    }

    /// Check that `value` has the shape this descriptor describes.
    pub fn validate(&self, value: &Value) -> Result<(), SchemaError> {
        self.apply(value.clone(), &mut |descriptor, sub| {
            if !sub.is_null() {
                descriptor.check_leaf(&sub)?;
            }
            Ok(sub)
        })
        .map(|_| ())
    }

    fn check_leaf(&self, value: &Value) -> Result<(), SchemaError> {
        match &self.kind {
            Kind::Leaf(leaf) => leaf.check(value),
            Kind::Enum(ty) => leaf::enum_to_encoded(ty, value).map(|_| ()),
            Kind::Custom(codec) => codec.check(value),
            // Composite shapes were checked while the apply walk rebuilt them.
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Kind::Placeholder(placeholder) = &self.kind {
            if let Some(target) = placeholder.target() {
                return write!(f, "{}", target.with_policy(self.default.clone()));
            }
        }
        let name = self.name();
        match &self.default {
            DefaultPolicy::Required => f.write_str(&name),
            DefaultPolicy::Value(Value::Null) => write!(f, "{name}.none"),
            DefaultPolicy::Value(value) => write!(f, "{name}.default({value})"),
            DefaultPolicy::Empty => write!(f, "{name}.empty"),
            DefaultPolicy::Missing => write!(f, "{name}.missing"),
            DefaultPolicy::Now => write!(f, "{name}.now"),
        }
    }
}
