//! # Inspection Helpers
//!
//! Descriptor guessing from sample values, record schemas built from a mix
//! of descriptors and samples, and [`convert`], which swaps class-backed
//! records for their reconstructed instances.

use crate::class::empty_defaultify;
use crate::error::SchemaError;
use crate::record::StructType;
use crate::types::{enumeration, Descriptor, ANY, BOOL, BYTES, DATETIME, DICT, FLOAT, INT, LIST, PATH, STR, TUPLE};
use crate::value::Value;

/// The descriptor matching the kind of `value`, without a default.
///
/// Records map to their own schema. Null and opaque instances have no
/// better guess than `Any`.
pub fn descriptor_for(value: &Value) -> Descriptor {
    match value {
        Value::Bool(_) => BOOL,
        Value::Int(_) => INT,
        Value::Float(_) => FLOAT,
        Value::Str(_) => STR,
        Value::Bytes(_) => BYTES,
        Value::DateTime(_) => DATETIME,
        Value::Path(_) => PATH,
        Value::List(_) => LIST,
        Value::Tuple(_) => TUPLE,
        Value::Map(_) | Value::DefaultMap(_) => DICT,
        Value::Record(record) => record.schema().descriptor(),
        Value::Enum(member) => enumeration(member.enum_type().clone()),
        Value::Null | Value::Opaque(_) => ANY,
    }
}

/// A descriptor for `value` that defaults to `value` itself.
pub fn guess_type(value: &Value) -> Descriptor {
    if value.is_null() {
        return ANY.none();
    }
    descriptor_for(value).with_default(value.clone())
}

/// A record field given either as a descriptor or as a sample value.
#[derive(Debug, Clone, PartialEq)]
pub enum Guess {
    Type(Descriptor),
    Sample(Value),
}

impl From<Descriptor> for Guess {
    fn from(descriptor: Descriptor) -> Self {
        Guess::Type(descriptor)
    }
}

impl From<Value> for Guess {
    fn from(value: Value) -> Self {
        Guess::Sample(value)
    }
}

impl Guess {
    fn into_field(self) -> Descriptor {
        let descriptor = match self {
            Guess::Type(descriptor) => descriptor,
            Guess::Sample(value) => guess_type(&value),
        };
        empty_defaultify(descriptor)
    }
}

/// A named record descriptor with fields guessed from `fields`.
pub fn guess_struct<K, G>(name: impl Into<String>, fields: impl IntoIterator<Item = (K, G)>) -> Descriptor
where
    K: Into<String>,
    G: Into<Guess>,
{
    fields
        .into_iter()
        .fold(StructType::named(name), |builder, (k, g)| builder.field(k, g.into().into_field()))
        .build()
}

/// Like [`guess_struct`], for an anonymous record.
pub fn guess_anonymous<K, G>(fields: impl IntoIterator<Item = (K, G)>) -> Descriptor
where
    K: Into<String>,
    G: Into<Guess>,
{
    fields
        .into_iter()
        .fold(StructType::anonymous(), |builder, (k, g)| builder.field(k, g.into().into_field()))
        .build()
}

/// Replace every record sitting under a bound class descriptor with the
/// instance its target builds, innermost first.
pub fn convert(descriptor: &Descriptor, value: Value) -> Result<Value, SchemaError> {
    descriptor.apply(value, &mut |sub_descriptor, sub_value| match (sub_descriptor.as_class(), sub_value) {
        (Some(class), Value::Record(record)) if class.has_target() => class.reconstruct(&record),
        (_, other) => Ok(other),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{CallArgs, Callable, ClassType, Parameter, Signature};
    use crate::types::list_of;
    use std::path::PathBuf;

    #[test]
    fn test_guess_type_from_samples() {
        assert_eq!(guess_type(&Value::Int(3)), INT.with_default(3));
        assert_eq!(guess_type(&Value::from("a")), STR.with_default("a"));
        assert_eq!(guess_type(&Value::Null), ANY.none());
        assert_eq!(guess_type(&Value::Path(PathBuf::from("/x"))).name(), "Path");
        assert_eq!(guess_type(&Value::Tuple(Vec::new())).name(), "Tuple");
    }

    #[test]
    fn test_guess_struct_mixes_types_and_samples() {
        let descriptor = guess_struct("Config", [("lr", Guess::from(Value::Float(0.1))), ("epochs", Guess::from(INT))]);
        let schema = descriptor.as_struct().unwrap();
        assert_eq!(schema.field("lr").unwrap(), &FLOAT.with_default(0.1));
        assert_eq!(schema.field("epochs").unwrap(), &INT);
        assert_eq!(descriptor.name(), "Config");
        assert_eq!(guess_anonymous([("a", Value::Int(1))]).name(), "struct(a=Int)");
    }

    #[test]
    fn test_convert_rebuilds_nested_instances() {
        let sum = Callable::new("Sum", |args: CallArgs| {
            Ok(Value::Int(args.positional().iter().filter_map(Value::as_int).sum()))
        });
        let class = ClassType::derive(&Signature::new().param(Parameter::var_positional("terms").annotated(INT)), Some(sum))
            .unwrap();
        let descriptor = list_of(class.descriptor());
        let record = class
            .schema()
            .new_record([("terms", Value::List(vec![Value::Int(2), Value::Int(5)]))])
            .unwrap();
        let converted = convert(&descriptor, Value::List(vec![Value::Record(record)])).unwrap();
        assert_eq!(converted, Value::List(vec![Value::Int(7)]));
    }

    #[test]
    fn test_convert_leaves_targetless_records() {
        let class = ClassType::derive(&Signature::new().param(Parameter::positional("a").default(1)), None).unwrap();
        let record = Value::Record(class.schema().new_record(Vec::<(String, Value)>::new()).unwrap());
        assert_eq!(convert(&class.descriptor(), record.clone()).unwrap(), record);
    }
}
