//! # Class-Backed Records
//!
//! A [`ClassType`] is a record schema derived from a constructor
//! [`Signature`], optionally bound to the [`Callable`] that builds the
//! real instance. Conversion walks treat its values as ordinary records;
//! [`ClassType::reconstruct`] turns one back into the target instance.
//!
//! ## Field inference
//!
//! For each parameter, in order of precedence:
//!
//! 1. An [`Override::Descriptor`] is used verbatim.
//! 2. The declared descriptor.
//! 3. A descriptor guessed from the parameter default.
//! 4. `Any`, defaulting to null.
//!
//! A variadic-positional parameter becomes `List[T]` and a
//! variadic-keyword parameter `Dict[Str, T]`; both are `.empty` unless a
//! default is given. A nested class descriptor without a default becomes
//! `.empty` when all of its own fields have defaults.
//!
//! Deriving twice from the same signature and constructor yields equal
//! descriptors: constructors are identified by name and Rust type.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::error::SchemaError;
use crate::inspect::descriptor_for;
use crate::policy::DefaultPolicy;
use crate::record::{Record, StructType};
use crate::types::{list_of, map_of, Descriptor, Kind, ANY};
use crate::value::Value;

/// How a parameter receives its argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// Positional-or-keyword.
    Positional,
    KeywordOnly,
    /// Collects surplus positional arguments (`*args`).
    VarPositional,
    /// Collects surplus keyword arguments (`**kwargs`).
    VarKeyword,
}

/// One constructor parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: String,
    kind: ParamKind,
    declared: Option<Descriptor>,
    default: Option<Value>,
}

impl Parameter {
    fn with_kind(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            declared: None,
            default: None,
        }
    }

    pub fn positional(name: impl Into<String>) -> Self {
        Self::with_kind(name, ParamKind::Positional)
    }

    pub fn keyword_only(name: impl Into<String>) -> Self {
        Self::with_kind(name, ParamKind::KeywordOnly)
    }

    pub fn var_positional(name: impl Into<String>) -> Self {
        Self::with_kind(name, ParamKind::VarPositional)
    }

    pub fn var_keyword(name: impl Into<String>) -> Self {
        Self::with_kind(name, ParamKind::VarKeyword)
    }

    /// Declare the parameter's descriptor. For variadic parameters this is
    /// the element descriptor.
    pub fn annotated(mut self, descriptor: Descriptor) -> Self {
        self.declared = Some(descriptor);
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ParamKind {
        self.kind
    }
}

/// An ordered constructor parameter list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Signature {
    parameters: Vec<Parameter>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }
}

/// Replaces what a parameter would otherwise infer.
#[derive(Debug, Clone, PartialEq)]
pub enum Override {
    /// Use this descriptor as the field, policy included.
    Descriptor(Descriptor),
    /// Use this value as the parameter default.
    Default(Value),
}

/// Arguments assembled for a constructor call.
#[derive(Debug, Clone, PartialEq)]
pub struct CallArgs {
    target: String,
    positional: Vec<Value>,
    keyword: Vec<(String, Value)>,
}

impl CallArgs {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            positional: Vec::new(),
            keyword: Vec::new(),
        }
    }

    pub fn push(&mut self, value: Value) {
        self.positional.push(value);
    }

    /// Add a keyword argument.
    ///
    /// # Errors
    ///
    /// `Construction` when the keyword was already given.
    pub fn push_keyword(&mut self, name: impl Into<String>, value: Value) -> Result<(), SchemaError> {
        let name = name.into();
        if self.keyword(&name).is_some() {
            return Err(SchemaError::construction(
                &self.target,
                format!("got multiple values for argument '{name}'"),
            ));
        }
        self.keyword.push((name, value));
        Ok(())
    }

    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    pub fn keywords(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.keyword.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn keyword(&self, name: &str) -> Option<&Value> {
        self.keyword.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// The argument at `index`, or else the keyword `name`.
    pub fn arg(&self, index: usize, name: &str) -> Option<&Value> {
        self.positional.get(index).or_else(|| self.keyword(name))
    }

    /// Like [`CallArgs::arg`], failing with `Construction` when absent.
    pub fn require(&self, index: usize, name: &str) -> Result<&Value, SchemaError> {
        self.arg(index, name)
            .ok_or_else(|| SchemaError::construction(&self.target, format!("missing argument '{name}'")))
    }

    /// Positional arguments from `index` on.
    pub fn rest(&self, index: usize) -> &[Value] {
        self.positional.get(index..).unwrap_or_default()
    }
}

type Constructor = dyn Fn(CallArgs) -> Result<Value, SchemaError> + Send + Sync;

/// A named constructor a class descriptor rebuilds instances with.
#[derive(Clone)]
pub struct Callable {
    name: String,
    id: TypeId,
    func: Arc<Constructor>,
}

impl Callable {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(CallArgs) -> Result<Value, SchemaError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            id: TypeId::of::<F>(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: CallArgs) -> Result<Value, SchemaError> {
        (self.func)(args)
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.id == other.id
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callable({})", self.name)
    }
}

/// A Rust type that can describe and rebuild itself from call arguments.
pub trait Reflect: Any + Send + Sync + Sized {
    fn signature() -> Signature;

    fn construct(args: CallArgs) -> Result<Self, SchemaError>;

    /// Constructor name; the unqualified type name by default.
    fn type_name() -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    fn overrides() -> Vec<(String, Override)> {
        Vec::new()
    }
}

fn construct_opaque<T: Reflect>(args: CallArgs) -> Result<Value, SchemaError> {
    T::construct(args).map(Value::opaque)
}

/// A record schema derived from a constructor signature.
#[derive(Debug, PartialEq)]
pub struct ClassType {
    record: Arc<StructType>,
    target: Option<Callable>,
    positional: Vec<String>,
    args_name: Option<String>,
    kwargs_name: Option<String>,
    empty_constructible: bool,
}

impl ClassType {
    /// Derive a class schema from `signature`, bound to `target` if given.
    pub fn derive(signature: &Signature, target: Option<Callable>) -> Result<Arc<Self>, SchemaError> {
        Self::derive_with(signature, target, Vec::<(String, Override)>::new())
    }

    /// Derive with per-parameter overrides.
    ///
    /// # Errors
    ///
    /// `UnknownField` when an override names no parameter; `Policy` when a
    /// declared descriptor already carries a default and the parameter
    /// supplies another non-null one.
    pub fn derive_with<K: Into<String>>(
        signature: &Signature,
        target: Option<Callable>,
        overrides: impl IntoIterator<Item = (K, Override)>,
    ) -> Result<Arc<Self>, SchemaError> {
        let name = match &target {
            Some(callable) => format!("{}Struct", callable.name()),
            None => "ClassStruct".to_string(),
        };
        let mut overrides: Vec<(String, Override)> = overrides.into_iter().map(|(k, o)| (k.into(), o)).collect();

        let mut fields = Vec::with_capacity(signature.parameters.len());
        let mut positional = Vec::new();
        let mut args_name = None;
        let mut kwargs_name = None;
        for parameter in &signature.parameters {
            match parameter.kind {
                ParamKind::Positional => positional.push(parameter.name.clone()),
                ParamKind::KeywordOnly => {}
                ParamKind::VarPositional => args_name = Some(parameter.name.clone()),
                ParamKind::VarKeyword => kwargs_name = Some(parameter.name.clone()),
            }
            let extra = overrides
                .iter()
                .position(|(n, _)| *n == parameter.name)
                .map(|index| overrides.swap_remove(index).1);
            let field = empty_defaultify(infer_field(parameter, extra)?);
            fields.push((parameter.name.clone(), field));
        }
        if let Some((unknown, _)) = overrides.first() {
            return Err(SchemaError::UnknownField {
                record: name,
                field: unknown.clone(),
            });
        }

        let empty_constructible = fields.iter().all(|(_, field)| field.has_default());
        tracing::debug!(class = %name, fields = fields.len(), empty_constructible, "derived class descriptor");
        Ok(Arc::new(Self {
            record: StructType::from_fields(Some(name), fields),
            target,
            positional,
            args_name,
            kwargs_name,
            empty_constructible,
        }))
    }

    /// Derive the class schema of a [`Reflect`] type, bound to its constructor.
    pub fn of<T: Reflect>() -> Result<Arc<Self>, SchemaError> {
        let target = Callable::new(T::type_name(), construct_opaque::<T>);
        Self::derive_with(&T::signature(), Some(target), T::overrides())
    }

    pub fn descriptor(self: &Arc<Self>) -> Descriptor {
        Descriptor::from_kind(Kind::Class(Arc::clone(self)))
    }

    pub fn schema(&self) -> &Arc<StructType> {
        &self.record
    }

    pub fn name(&self) -> String {
        self.record.name()
    }

    pub fn target(&self) -> Option<&Callable> {
        self.target.as_ref()
    }

    pub fn has_target(&self) -> bool {
        self.target.is_some()
    }

    /// Whether every field has a default, so a record can be built from nothing.
    pub fn is_empty_constructible(&self) -> bool {
        self.empty_constructible
    }

    /// Call the bound target with the fields of `record`.
    ///
    /// Positional parameters go positionally in signature order, up to the
    /// first unset one. The variadic-positional field is spread after them.
    /// Every other set field, plus the entries of the variadic-keyword
    /// field, goes by keyword.
    pub fn reconstruct(&self, record: &Record) -> Result<Value, SchemaError> {
        let target = self.target.as_ref().ok_or_else(|| {
            SchemaError::Policy(format!("{} has no target to reconstruct", self.name()))
        })?;
        let mut remaining: Vec<(String, Value)> = record.iter().map(|(n, v)| (n.to_string(), v.clone())).collect();
        let mut take = |name: &str| {
            let index = remaining.iter().position(|(n, _)| n == name)?;
            Some(remaining.remove(index).1)
        };

        let mut args = CallArgs::new(target.name());
        for name in &self.positional {
            match take(name) {
                Some(value) => args.push(value),
                None => break,
            }
        }
        if let Some(spread) = self.args_name.as_deref().and_then(&mut take) {
            match spread {
                Value::List(items) | Value::Tuple(items) => args.positional.extend(items),
                Value::Null => {}
                other => return Err(SchemaError::mismatch("a positional spread", &other)),
            }
        }
        let merged = self.kwargs_name.as_deref().and_then(&mut take);
        for (name, value) in remaining {
            args.push_keyword(name, value)?;
        }
        match merged {
            Some(Value::Map(map)) => {
                for (key, value) in map {
                    let Value::Str(key) = key else {
                        return Err(SchemaError::mismatch("a keyword name", &key));
                    };
                    args.push_keyword(key, value)?;
                }
            }
            Some(Value::DefaultMap(map)) => {
                for (key, value) in map.into_entries() {
                    let Value::Str(key) = key else {
                        return Err(SchemaError::mismatch("a keyword name", &key));
                    };
                    args.push_keyword(key, value)?;
                }
            }
            Some(Value::Null) | None => {}
            Some(other) => return Err(SchemaError::mismatch("a keyword mapping", &other)),
        }

        tracing::trace!(
            callable = %target.name(),
            positional = args.positional.len(),
            keyword = args.keyword.len(),
            "reconstructing instance"
        );
        target.call(args)
    }

    /// Records are rebuilt field by field; anything else, such as an
    /// already reconstructed instance, goes to `func` untouched.
    pub(crate) fn apply<F>(&self, descriptor: &Descriptor, value: Value, func: &mut F) -> Result<Value, SchemaError>
    where
        F: FnMut(&Descriptor, Value) -> Result<Value, SchemaError>,
    {
        match value {
            Value::Record(_) => {
                let record = self.record.rebuild(value, func)?;
                func(descriptor, Value::Record(record))
            }
            other => func(descriptor, other),
        }
    }
}

fn infer_field(parameter: &Parameter, extra: Option<Override>) -> Result<Descriptor, SchemaError> {
    let default = match extra {
        Some(Override::Descriptor(descriptor)) => return Ok(descriptor),
        Some(Override::Default(value)) => Some(value),
        None => parameter.default.clone(),
    };

    let guessed = match (&parameter.declared, &default) {
        (Some(declared), _) => Some(declared.clone()),
        (None, Some(value)) if !value.is_null() => Some(descriptor_for(value)),
        _ => None,
    };
    let field = match parameter.kind {
        ParamKind::VarPositional => {
            let list = list_of(guessed.unwrap_or(ANY));
            if default.is_none() {
                list.empty()
            } else {
                list
            }
        }
        ParamKind::VarKeyword => {
            let map = map_of(guessed.unwrap_or(ANY));
            if default.is_none() {
                map.empty()
            } else {
                map
            }
        }
        ParamKind::Positional | ParamKind::KeywordOnly => match guessed {
            Some(descriptor) => descriptor,
            None => ANY.none(),
        },
    };

    match default {
        None => Ok(field),
        Some(value) if !field.has_default() => Ok(field.with_default(value)),
        Some(Value::Null) => Ok(field),
        Some(value) => Err(SchemaError::Policy(format!(
            "default value {value} provided for '{}' but {field} already has a default",
            parameter.name
        ))),
    }
}

/// A required class descriptor whose fields all have defaults becomes `.empty`.
pub(crate) fn empty_defaultify(descriptor: Descriptor) -> Descriptor {
    if descriptor.policy() != &DefaultPolicy::Required {
        return descriptor;
    }
    match descriptor.as_class() {
        Some(class) if class.is_empty_constructible() => descriptor.empty(),
        _ => descriptor,
    }
}
