//! # Records
//!
//! A [`StructType`] is an ordered field-name → descriptor schema; a
//! [`Record`] is a mutable value checked against exactly one schema.
//!
//! ## Invariants
//!
//! - Only schema-declared names can be read, written or removed. Anything
//!   else is `UnknownField`.
//! - Construction fills every unsupplied field from its descriptor's
//!   default, except `missing` fields, which stay unset. `required`
//!   fields must be supplied.
//! - Equality and hashing use the `(name, value-or-unset)` sequence in
//!   schema order, so insertion order never matters.
//! - Encoding omits unset fields instead of emitting nulls.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::SchemaError;
use crate::policy::{DefaultPolicy, Target};
use crate::types::{Descriptor, Kind};
use crate::value::{Value, ValueMap};

/// An ordered record schema.
#[derive(Debug, PartialEq)]
pub struct StructType {
    name: Option<String>,
    fields: Vec<(String, Descriptor)>,
}

/// Collects fields for a [`StructType`] in declaration order.
#[derive(Debug, Clone, Default)]
pub struct StructBuilder {
    name: Option<String>,
    fields: Vec<(String, Descriptor)>,
}

impl StructBuilder {
    /// Declare a field; redeclaring a name replaces its descriptor in place.
    pub fn field(mut self, name: impl Into<String>, descriptor: Descriptor) -> Self {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = descriptor,
            None => self.fields.push((name, descriptor)),
        }
        self
    }

    pub fn build_type(self) -> Arc<StructType> {
        Arc::new(StructType {
            name: self.name,
            fields: self.fields,
        })
    }

    pub fn build(self) -> Descriptor {
        self.build_type().descriptor()
    }
}

impl StructType {
    /// Start a record schema displayed as `name`.
    pub fn named(name: impl Into<String>) -> StructBuilder {
        StructBuilder {
            name: Some(name.into()),
            fields: Vec::new(),
        }
    }

    /// Start a record schema displayed by its field list.
    pub fn anonymous() -> StructBuilder {
        StructBuilder::default()
    }

    pub(crate) fn from_fields(name: Option<String>, fields: Vec<(String, Descriptor)>) -> Arc<Self> {
        Arc::new(Self { name, fields })
    }

    /// The record descriptor for this schema.
    pub fn descriptor(self: &Arc<Self>) -> Descriptor {
        Descriptor::from_kind(Kind::Struct(Arc::clone(self)))
    }

    /// The declared name, or `struct(a=Int, b=Str)` for anonymous schemas.
    pub fn name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => {
                let fields: Vec<String> = self
                    .fields
                    .iter()
                    .map(|(name, descriptor)| format!("{name}={}", descriptor.name()))
                    .collect();
                format!("struct({})", fields.join(", "))
            }
        }
    }

    fn record_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Struct")
    }

    pub fn fields(&self) -> &[(String, Descriptor)] {
        &self.fields
    }

    /// Descriptor of a declared field.
    pub fn field(&self, name: &str) -> Result<&Descriptor, SchemaError> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, descriptor)| descriptor)
            .ok_or_else(|| SchemaError::UnknownField {
                record: self.name(),
                field: name.to_string(),
            })
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|(n, _)| n == name)
    }

    /// Build a record from the supplied fields plus schema defaults.
    ///
    /// # Errors
    ///
    /// `UnknownField` for an undeclared name, `MissingField` for an
    /// unsupplied `required` field, and any error the defaults raise.
    pub fn new_record<K: Into<String>>(
        self: &Arc<Self>,
        fields: impl IntoIterator<Item = (K, Value)>,
    ) -> Result<Record, SchemaError> {
        let mut record = Record {
            schema: Arc::clone(self),
            fields: Vec::with_capacity(self.fields.len()),
        };
        for (name, value) in fields {
            record.set(name, value)?;
        }
        for (name, descriptor) in &self.fields {
            if record.is_set(name) {
                continue;
            }
            match descriptor.policy() {
                DefaultPolicy::Required => {
                    return Err(SchemaError::MissingField {
                        record: self.name(),
                        field: name.clone(),
                    })
                }
                DefaultPolicy::Missing => {}
                _ => record.fields.push((name.clone(), descriptor.default_value()?)),
            }
        }
        Ok(record)
    }

    fn expect_record<'v>(&self, value: &'v Value) -> Result<&'v Record, SchemaError> {
        value.as_record().ok_or_else(|| SchemaError::mismatch(self.name(), value))
    }

    pub(crate) fn to_encoded(&self, value: &Value, target: Target) -> Result<Value, SchemaError> {
        let record = self.expect_record(value)?;
        let mut encoded = ValueMap::new();
        for (name, field) in record.iter() {
            encoded.insert(name, self.field(name)?.to_encoded(field, target)?);
        }
        Ok(Value::Map(encoded))
    }

    pub(crate) fn from_encoded(self: &Arc<Self>, encoded: &Value, source: Target) -> Result<Value, SchemaError> {
        let map = encoded.as_map().ok_or_else(|| SchemaError::mismatch(self.name(), encoded))?;
        let mut decoded = Vec::with_capacity(map.len());
        for (key, field) in map.iter() {
            let name = key
                .as_str()
                .ok_or_else(|| SchemaError::mismatch("a field name", key))?;
            decoded.push((name.to_string(), self.field(name)?.from_encoded(field, source)?));
        }
        self.new_record(decoded).map(Value::Record)
    }

    /// Walk the set fields, rebuild the record, then hand it to `func`
    /// together with `descriptor`, the node the walk arrived through.
    pub(crate) fn apply<F>(self: &Arc<Self>, descriptor: &Descriptor, value: Value, func: &mut F) -> Result<Value, SchemaError>
    where
        F: FnMut(&Descriptor, Value) -> Result<Value, SchemaError>,
    {
        let record = self.rebuild(value, func)?;
        func(descriptor, Value::Record(record))
    }

    pub(crate) fn rebuild<F>(self: &Arc<Self>, value: Value, func: &mut F) -> Result<Record, SchemaError>
    where
        F: FnMut(&Descriptor, Value) -> Result<Value, SchemaError>,
    {
        let Value::Record(record) = value else {
            return Err(SchemaError::mismatch(self.name(), &value));
        };
        let mut rebuilt = Vec::with_capacity(record.fields.len());
        for (name, field) in record.fields {
            let applied = self.field(&name)?.apply(field, func)?;
            rebuilt.push((name, applied));
        }
        self.new_record(rebuilt)
    }
}

/// A record value bound to its schema.
#[derive(Debug, Clone)]
pub struct Record {
    schema: Arc<StructType>,
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn schema(&self) -> &Arc<StructType> {
        &self.schema
    }

    fn position(&self, name: &str) -> Result<Option<usize>, SchemaError> {
        if !self.schema.has_field(name) {
            return Err(SchemaError::UnknownField {
                record: self.schema.name(),
                field: name.to_string(),
            });
        }
        Ok(self.fields.iter().position(|(n, _)| n == name))
    }

    fn not_set(&self, name: &str) -> SchemaError {
        SchemaError::FieldNotSet {
            record: self.schema.name(),
            field: name.to_string(),
        }
    }

    /// Read a field.
    ///
    /// # Errors
    ///
    /// `UnknownField` for an undeclared name, `FieldNotSet` when absent.
    pub fn get(&self, name: &str) -> Result<&Value, SchemaError> {
        match self.position(name)? {
            Some(index) => Ok(&self.fields[index].1),
            None => Err(self.not_set(name)),
        }
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut Value, SchemaError> {
        match self.position(name)? {
            Some(index) => Ok(&mut self.fields[index].1),
            None => Err(self.not_set(name)),
        }
    }

    /// Write a field, returning the previous value if it was set.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Result<Option<Value>, SchemaError> {
        let name = name.into();
        let value = value.into();
        match self.position(&name)? {
            Some(index) => Ok(Some(std::mem::replace(&mut self.fields[index].1, value))),
            None => {
                self.fields.push((name, value));
                Ok(None)
            }
        }
    }

    /// Remove a field, returning its value.
    pub fn unset(&mut self, name: &str) -> Result<Value, SchemaError> {
        match self.position(name)? {
            Some(index) => Ok(self.fields.remove(index).1),
            None => Err(self.not_set(name)),
        }
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.fields.iter().any(|(n, _)| n == name)
    }

    /// Set fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn into_fields(self) -> Vec<(String, Value)> {
        self.fields
    }

    fn comparison_key(&self) -> Vec<(&str, Option<&Value>)> {
        self.schema
            .fields
            .iter()
            .map(|(name, _)| {
                let value = self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v);
                (name.as_str(), value)
            })
            .collect()
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.comparison_key() == other.comparison_key()
    }
}

impl Eq for Record {}

impl Hash for Record {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.comparison_key().hash(state);
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.schema.record_name())?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{list_of, INT, STR};
    use std::collections::hash_map::DefaultHasher;

    fn person() -> Arc<StructType> {
        StructType::named("Person")
            .field("name", STR)
            .field("age", INT.with_default(0))
            .build_type()
    }

    fn hash_of(record: &Record) -> u64 {
        let mut hasher = DefaultHasher::new();
        record.hash(&mut hasher);
        hasher.finish()
    }

    // ---- construction ----

    #[test]
    fn test_defaults_fill_unsupplied_fields() {
        let bo = person().new_record([("name", Value::from("Bo"))]).unwrap();
        assert_eq!(bo.get("age").unwrap(), &Value::Int(0));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = person()
            .new_record([("name", Value::from("Bo")), ("unknown", Value::Int(1))])
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownField {
                record: "Person".into(),
                field: "unknown".into()
            }
        );
    }

    #[test]
    fn test_required_field_must_be_supplied() {
        let err = person().new_record(Vec::<(String, Value)>::new()).unwrap_err();
        assert!(matches!(err, SchemaError::MissingField { field, .. } if field == "name"));
    }

    #[test]
    fn test_missing_policy_leaves_field_unset() {
        let schema = StructType::named("Job").field("tag", STR.missing()).build_type();
        let job = schema.new_record(Vec::<(String, Value)>::new()).unwrap();
        assert!(!job.is_set("tag"));
        assert!(matches!(job.get("tag"), Err(SchemaError::FieldNotSet { .. })));
        assert!(matches!(job.get("nope"), Err(SchemaError::UnknownField { .. })));
    }

    #[test]
    fn test_empty_defaults_are_fresh_per_record() {
        let schema = StructType::named("Bag").field("items", list_of(INT).empty()).build_type();
        let mut first = schema.new_record(Vec::<(String, Value)>::new()).unwrap();
        let second = schema.new_record(Vec::<(String, Value)>::new()).unwrap();
        if let Value::List(items) = first.get_mut("items").unwrap() {
            items.push(Value::Int(1));
        }
        assert_eq!(second.get("items").unwrap(), &Value::List(Vec::new()));
        assert_ne!(first, second);
    }

    // ---- mutation ----

    #[test]
    fn test_set_and_unset() {
        let mut bo = person().new_record([("name", Value::from("Bo"))]).unwrap();
        assert_eq!(bo.set("age", 7).unwrap(), Some(Value::Int(0)));
        assert!(bo.set("height", 180).is_err());
        assert_eq!(bo.unset("age").unwrap(), Value::Int(7));
        assert!(matches!(bo.unset("age"), Err(SchemaError::FieldNotSet { .. })));
    }

    // ---- equality ----

    #[test]
    fn test_equality_ignores_insertion_order() {
        let schema = person();
        let a = schema
            .new_record([("name", Value::from("Bo")), ("age", Value::Int(2))])
            .unwrap();
        let b = schema
            .new_record([("age", Value::Int(2)), ("name", Value::from("Bo"))])
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    // ---- naming ----

    #[test]
    fn test_display() {
        let bo = person().new_record([("name", Value::from("Bo"))]).unwrap();
        assert_eq!(bo.to_string(), "Person(name=\"Bo\", age=0)");
        let anon = StructType::anonymous().field("a", INT).build();
        assert_eq!(anon.name(), "struct(a=Int)");
        let record = anon.new_record([("a", Value::Int(1))]).unwrap();
        assert_eq!(record.to_string(), "Struct(a=1)");
    }

    // ---- conversion ----

    #[test]
    fn test_encoding_omits_unset_fields() {
        let schema = StructType::named("Job")
            .field("id", INT)
            .field("tag", STR.missing())
            .build_type();
        let descriptor = schema.descriptor();
        let job = Value::Record(schema.new_record([("id", Value::Int(4))]).unwrap());
        let encoded = descriptor.to_encoded(&job, Target::Json).unwrap();
        assert_eq!(encoded, Value::Map([("id", 4)].into_iter().collect()));
        assert_eq!(descriptor.from_encoded(&encoded, Target::Json).unwrap(), job);
    }

    #[test]
    fn test_decoding_fills_defaults_and_rejects_unknown_keys() {
        let descriptor = person().descriptor();
        let decoded = descriptor
            .from_encoded(&Value::Map([("name", "Al")].into_iter().collect()), Target::Bson)
            .unwrap();
        assert_eq!(decoded.as_record().unwrap().get("age").unwrap(), &Value::Int(0));
        let bad = Value::Map([("name", Value::from("Al")), ("x", Value::Int(1))].into_iter().collect());
        assert!(matches!(
            descriptor.from_encoded(&bad, Target::Bson),
            Err(SchemaError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_apply_reaches_record_last() {
        let descriptor = person().descriptor();
        let bo = Value::Record(person().new_record([("name", Value::from("Bo"))]).unwrap());
        let mut seen = Vec::new();
        descriptor
            .apply(bo, &mut |d, v| {
                seen.push(d.name());
                Ok(v)
            })
            .unwrap();
        assert_eq!(seen, vec!["Str", "Int", "Person"]);
    }
}
