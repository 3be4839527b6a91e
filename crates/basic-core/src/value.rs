//! # Native Value Model
//!
//! [`Value`] is the dynamic tree every descriptor validates, encodes and
//! decodes. The same type doubles as the encoded form: a JSON-target
//! encoding only ever contains `Null`, `Bool`, `Int`, `Float`, `Str`,
//! `List` and `Map` nodes, while a BSON-target encoding additionally keeps
//! raw `Bytes` and `DateTime` leaves.
//!
//! ## Equality
//!
//! - Maps compare and hash independently of insertion order.
//! - A [`DefaultMap`] equals a plain map holding the same entries.
//! - Floats compare by value; `NaN` equals `NaN` so that `Eq` holds.
//! - Opaque target instances compare by pointer identity.

use std::any::Any;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;

use crate::error::SchemaError;
use crate::record::Record;
use crate::types::Descriptor;

/// A native value handled by the schema engine.
#[derive(Debug, Clone)]
pub enum Value {
    /// Absence of a value; passes through every descriptor unchanged.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    DateTime(DateTime<Utc>),
    Path(PathBuf),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Map(ValueMap),
    DefaultMap(DefaultMap),
    Record(Record),
    Enum(EnumValue),
    /// An instance produced by a reconstructing class descriptor.
    Opaque(Opaque),
}

impl Value {
    /// Short lowercase name of the value kind, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Bytes(_) => "bytes",
            Value::DateTime(_) => "datetime",
            Value::Path(_) => "path",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Map(_) => "map",
            Value::DefaultMap(_) => "defaultmap",
            Value::Record(_) => "record",
            Value::Enum(_) => "enum",
            Value::Opaque(_) => "object",
        }
    }

    pub(crate) fn describe(&self) -> String {
        let mut rendered = self.to_string();
        if rendered.chars().count() > 48 {
            rendered = rendered.chars().take(45).collect::<String>() + "...";
        }
        format!("{} {}", self.kind_name(), rendered)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Elements of a list or tuple.
    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// Entries of a map or default map.
    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Value::Map(map) => Some(map),
            Value::DefaultMap(map) => Some(&map.entries),
            _ => None,
        }
    }

    /// Borrow a reconstructed target instance as its concrete type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Opaque(opaque) => opaque.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Wrap a Rust value as an opaque target instance.
    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        Value::Opaque(Opaque::new(value))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::DateTime(v)
    }
}

impl From<PathBuf> for Value {
    fn from(v: PathBuf) -> Self {
        Value::Path(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Record(v)
    }
}

impl From<ValueMap> for Value {
    fn from(v: ValueMap) -> Self {
        Value::Map(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Path(a), Value::Path(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a == b,
            (Value::Enum(a), Value::Enum(b)) => a == b,
            (Value::Opaque(a), Value::Opaque(b)) => a == b,
            (a, b) => match (a.as_map(), b.as_map()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Map and DefaultMap share a discriminant so that equal values hash alike.
        match self {
            Value::Null => 0u8.hash(state),
            Value::Bool(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            Value::Int(i) => {
                2u8.hash(state);
                i.hash(state);
            }
            Value::Float(f) => {
                3u8.hash(state);
                let canonical = if *f == 0.0 {
                    0.0f64
                } else if f.is_nan() {
                    f64::NAN
                } else {
                    *f
                };
                canonical.to_bits().hash(state);
            }
            Value::Str(s) => {
                4u8.hash(state);
                s.hash(state);
            }
            Value::Bytes(b) => {
                5u8.hash(state);
                b.hash(state);
            }
            Value::DateTime(dt) => {
                6u8.hash(state);
                dt.hash(state);
            }
            Value::Path(p) => {
                7u8.hash(state);
                p.hash(state);
            }
            Value::List(items) => {
                8u8.hash(state);
                items.hash(state);
            }
            Value::Tuple(items) => {
                9u8.hash(state);
                items.hash(state);
            }
            Value::Map(map) => {
                10u8.hash(state);
                map.hash(state);
            }
            Value::DefaultMap(map) => {
                10u8.hash(state);
                map.entries.hash(state);
            }
            Value::Record(r) => {
                11u8.hash(state);
                r.hash(state);
            }
            Value::Enum(e) => {
                12u8.hash(state);
                e.hash(state);
            }
            Value::Opaque(o) => {
                13u8.hash(state);
                o.hash(state);
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Bytes(b) => write!(f, "b\"{}\"", b.escape_ascii()),
            Value::DateTime(dt) => f.write_str(&dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::Path(p) => write!(f, "Path({:?})", p.display().to_string()),
            Value::List(items) => {
                f.write_str("[")?;
                write_joined(f, items)?;
                f.write_str("]")
            }
            Value::Tuple(items) => {
                f.write_str("(")?;
                write_joined(f, items)?;
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            Value::Map(map) => write!(f, "{map}"),
            Value::DefaultMap(map) => write!(f, "defaultmap({})", map.entries),
            Value::Record(r) => write!(f, "{r}"),
            Value::Enum(e) => write!(f, "{e}"),
            Value::Opaque(o) => write!(f, "<{}>", o.type_name()),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// Insertion-ordered mapping with arbitrary value keys.
///
/// Lookups hash the key; equality ignores insertion order.
#[derive(Debug, Clone, Default)]
pub struct ValueMap {
    entries: IndexMap<Value, Value>,
}

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &Value) -> Option<&mut Value> {
        self.entries.get_mut(key)
    }

    /// Look up a string key.
    pub fn get_str(&self, key: &str) -> Option<&Value> {
        self.entries.get(&Value::Str(key.to_string()))
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or replace; a replaced key keeps its original position.
    pub fn insert(&mut self, key: impl Into<Value>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    /// Remove a key, keeping the order of the remaining entries.
    pub fn remove(&mut self, key: &Value) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.keys()
    }
}

impl PartialEq for ValueMap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .entries
                .iter()
                .all(|(k, v)| other.entries.get(k).is_some_and(|o| o == v))
    }
}

impl Eq for ValueMap {}

impl Hash for ValueMap {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut combined: u64 = 0;
        for entry in &self.entries {
            let mut hasher = DefaultHasher::new();
            entry.hash(&mut hasher);
            combined = combined.wrapping_add(hasher.finish());
        }
        self.entries.len().hash(state);
        combined.hash(state);
    }
}

impl IntoIterator for ValueMap {
    type Item = (Value, Value);
    type IntoIter = indexmap::map::IntoIter<Value, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Into<Value>, V: Into<Value>> FromIterator<(K, V)> for ValueMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = ValueMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl fmt::Display for ValueMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{k}: {v}")?;
        }
        f.write_str("}")
    }
}

/// A map whose missing keys are filled from a descriptor's default value.
#[derive(Debug, Clone)]
pub struct DefaultMap {
    pub(crate) entries: ValueMap,
    factory: Box<Descriptor>,
}

impl DefaultMap {
    /// Create a map that vivifies missing keys with `factory.default_value()`.
    pub fn new(factory: Descriptor, entries: ValueMap) -> Self {
        Self {
            entries,
            factory: Box::new(factory),
        }
    }

    /// Descriptor whose default value fills missing keys.
    pub fn factory(&self) -> &Descriptor {
        &self.factory
    }

    pub fn entries(&self) -> &ValueMap {
        &self.entries
    }

    pub fn into_entries(self) -> ValueMap {
        self.entries
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: impl Into<Value>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key, value)
    }

    /// Return the entry for `key`, inserting the factory default when absent.
    pub fn get_or_default(&mut self, key: impl Into<Value>) -> Result<&mut Value, SchemaError> {
        let key = key.into();
        if !self.entries.contains_key(&key) {
            let fresh = self.factory.default_value()?;
            self.entries.insert(key.clone(), fresh);
        }
        self.entries
            .get_mut(&key)
            .ok_or_else(|| SchemaError::Policy("default map entry vanished after insertion".into()))
    }
}

/// A closed set of named integer constants.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumType {
    name: String,
    members: Vec<(String, i64)>,
}

impl EnumType {
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        members: impl IntoIterator<Item = (S, i64)>,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            members: members.into_iter().map(|(n, v)| (n.into(), v)).collect(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The member with the given name.
    pub fn member(self: &Arc<Self>, name: &str) -> Option<Value> {
        let index = self.members.iter().position(|(n, _)| n == name)?;
        Some(Value::Enum(EnumValue {
            ty: Arc::clone(self),
            index,
        }))
    }

    /// The member carrying the given integer value.
    pub fn from_int(self: &Arc<Self>, value: i64) -> Option<Value> {
        let index = self.members.iter().position(|(_, v)| *v == value)?;
        Some(Value::Enum(EnumValue {
            ty: Arc::clone(self),
            index,
        }))
    }
}

/// One member of an [`EnumType`].
#[derive(Debug, Clone)]
pub struct EnumValue {
    ty: Arc<EnumType>,
    index: usize,
}

impl EnumValue {
    pub fn enum_type(&self) -> &Arc<EnumType> {
        &self.ty
    }

    pub fn name(&self) -> &str {
        &self.ty.members[self.index].0
    }

    pub fn value(&self) -> i64 {
        self.ty.members[self.index].1
    }
}

impl PartialEq for EnumValue {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && (Arc::ptr_eq(&self.ty, &other.ty) || self.ty == other.ty)
    }
}

impl Eq for EnumValue {}

impl Hash for EnumValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ty.name.hash(state);
        self.index.hash(state);
    }
}

impl fmt::Display for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.ty.name, self.name())
    }
}

/// A reconstructed target instance, shared by reference.
#[derive(Clone)]
pub struct Opaque {
    type_name: &'static str,
    inner: Arc<dyn Any + Send + Sync>,
}

impl Opaque {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            inner: Arc::new(value),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opaque<{}>", self.type_name)
    }
}

impl PartialEq for Opaque {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Opaque {}

impl Hash for Opaque {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.inner) as *const () as usize).hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash_of(value: &Value) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_map_equality_ignores_order() {
        let a: ValueMap = [("a", 1), ("b", 2)].into_iter().collect();
        let b: ValueMap = [("b", 2), ("a", 1)].into_iter().collect();
        assert_eq!(a, b);
        assert_eq!(hash_of(&Value::Map(a)), hash_of(&Value::Map(b)));
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut map: ValueMap = [("a", 1), ("b", 2)].into_iter().collect();
        assert_eq!(map.insert("a", 9), Some(Value::Int(1)));
        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, vec![Value::from("a"), Value::from("b")]);
        assert_eq!(map.get_str("a"), Some(&Value::Int(9)));
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut map: ValueMap = [("a", 1), ("b", 2), ("c", 3)].into_iter().collect();
        assert_eq!(map.remove(&Value::from("a")), Some(Value::Int(1)));
        assert_eq!(map.remove(&Value::from("z")), None);
        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, vec![Value::from("b"), Value::from("c")]);
    }

    #[test]
    fn test_float_nan_is_reflexive() {
        let nan = Value::Float(f64::NAN);
        assert_eq!(nan, nan.clone());
        assert_eq!(hash_of(&Value::Float(0.0)), hash_of(&Value::Float(-0.0)));
    }

    #[test]
    fn test_list_and_tuple_differ() {
        let items = vec![Value::Int(1)];
        assert_ne!(Value::List(items.clone()), Value::Tuple(items));
    }

    #[test]
    fn test_enum_lookup() {
        let color = EnumType::new("Color", [("Red", 1), ("Green", 2)]);
        let red = color.member("Red").unwrap();
        assert_eq!(color.from_int(1), Some(red.clone()));
        assert_eq!(red.to_string(), "Color.Red");
        assert!(color.from_int(7).is_none());
    }

    #[test]
    fn test_opaque_identity() {
        let a = Value::opaque(5u32);
        let b = Value::opaque(5u32);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!(a.downcast_ref::<u32>(), Some(&5));
    }

    #[test]
    fn test_display_renders_nested() {
        let value = Value::Tuple(vec![Value::from("x"), Value::List(vec![Value::Int(1)])]);
        assert_eq!(value.to_string(), "(\"x\", [1])");
        assert_eq!(Value::Tuple(vec![Value::Int(1)]).to_string(), "(1,)");
    }
}
