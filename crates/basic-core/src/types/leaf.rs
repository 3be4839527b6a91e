//! Primitive descriptors and the codec seam for collaborator leaves.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDateTime, SecondsFormat, Utc};

use crate::b85;
use crate::error::SchemaError;
use crate::policy::Target;
use crate::value::{EnumType, Value};

const RFC3339_YEARS: std::ops::RangeInclusive<i32> = 0..=9999;

/// The built-in primitive shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Leaf {
    Any,
    Int,
    Str,
    Bool,
    Float,
    Bytes,
    Datetime,
    Path,
}

impl Leaf {
    pub fn name(self) -> &'static str {
        match self {
            Leaf::Any => "Any",
            Leaf::Int => "Int",
            Leaf::Str => "Str",
            Leaf::Bool => "Bool",
            Leaf::Float => "Float",
            Leaf::Bytes => "Bytes",
            Leaf::Datetime => "Datetime",
            Leaf::Path => "Path",
        }
    }

    /// Check the native shape of `value`.
    ///
    /// Timestamps are limited to the four-digit years RFC 3339 text carries.
    pub(crate) fn check(self, value: &Value) -> Result<(), SchemaError> {
        if let (Leaf::Datetime, Value::DateTime(dt)) = (self, value) {
            if !RFC3339_YEARS.contains(&dt.year()) {
                return Err(SchemaError::TypeMismatch {
                    expected: "Datetime (years 0000 to 9999)".into(),
                    actual: format!("datetime in year {}", dt.year()),
                });
            }
        }
        let ok = match (self, value) {
            (Leaf::Any, value) => !is_managed(value),
            (Leaf::Int, Value::Int(_))
            | (Leaf::Str, Value::Str(_))
            | (Leaf::Bool, Value::Bool(_))
            | (Leaf::Float, Value::Float(_) | Value::Int(_))
            | (Leaf::Bytes, Value::Bytes(_))
            | (Leaf::Datetime, Value::DateTime(_))
            | (Leaf::Path, Value::Path(_) | Value::Str(_)) => true,
            _ => false,
        };
        if ok {
            Ok(())
        } else {
            Err(SchemaError::mismatch(self.name(), value))
        }
    }

    pub(crate) fn to_encoded(self, value: &Value, target: Target) -> Result<Value, SchemaError> {
        self.check(value)?;
        Ok(match (self, value, target) {
            (Leaf::Float, Value::Int(i), _) => Value::Float(*i as f64),
            (Leaf::Bytes, Value::Bytes(b), Target::Json) => Value::Str(b85::encode(b)),
            (Leaf::Datetime, Value::DateTime(dt), Target::Json) => {
                Value::Str(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            (Leaf::Path, Value::Path(p), _) => Value::Str(p.to_string_lossy().into_owned()),
            (_, value, _) => value.clone(),
        })
    }

    pub(crate) fn from_encoded(self, encoded: &Value, source: Target) -> Result<Value, SchemaError> {
        match (self, encoded, source) {
            (Leaf::Float, Value::Int(i), _) => Ok(Value::Float(*i as f64)),
            (Leaf::Bytes, Value::Str(text), Target::Json) => {
                b85::decode(text)
                    .map(Value::Bytes)
                    .map_err(|reason| SchemaError::InvalidEncoding {
                        descriptor: self.name().into(),
                        reason,
                    })
            }
            (Leaf::Bytes, other, Target::Json) => Err(SchemaError::mismatch("Bytes (base85 text)", other)),
            (Leaf::Datetime, Value::Str(text), Target::Json) => {
                let decoded = Value::DateTime(parse_timestamp(text)?);
                self.check(&decoded)?;
                Ok(decoded)
            }
            (Leaf::Datetime, other, Target::Json) => Err(SchemaError::mismatch("Datetime (RFC 3339 text)", other)),
            (Leaf::Path, Value::Str(s), _) => Ok(Value::Path(PathBuf::from(s))),
            (leaf, value, _) => {
                leaf.check(value)?;
                Ok(value.clone())
            }
        }
    }

    pub(crate) fn instantiate(self) -> Result<Value, SchemaError> {
        match self {
            Leaf::Int => Ok(Value::Int(0)),
            Leaf::Str => Ok(Value::Str(String::new())),
            Leaf::Bool => Ok(Value::Bool(false)),
            Leaf::Float => Ok(Value::Float(0.0)),
            Leaf::Bytes => Ok(Value::Bytes(Vec::new())),
            Leaf::Path => Ok(Value::Path(PathBuf::from("."))),
            Leaf::Any | Leaf::Datetime => Err(SchemaError::Policy(format!(
                "{} cannot be constructed without arguments",
                self.name()
            ))),
        }
    }
}

/// Records and target instances are never untyped leaves.
fn is_managed(value: &Value) -> bool {
    match value {
        Value::Record(_) | Value::Opaque(_) => true,
        Value::List(items) | Value::Tuple(items) => items.iter().any(is_managed),
        Value::Map(map) => map.iter().any(|(k, v)| is_managed(k) || is_managed(v)),
        Value::DefaultMap(map) => map.entries().iter().any(|(k, v)| is_managed(k) || is_managed(v)),
        _ => false,
    }
}

/// Parse RFC 3339 text; offset-less text is taken as UTC.
fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, SchemaError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(naive.and_utc());
        }
    }
    Err(SchemaError::InvalidEncoding {
        descriptor: Leaf::Datetime.name().into(),
        reason: format!("not an RFC 3339 timestamp: {text:?}"),
    })
}

pub(crate) fn enum_to_encoded(ty: &Arc<EnumType>, value: &Value) -> Result<Value, SchemaError> {
    match value {
        Value::Enum(member) if Arc::ptr_eq(member.enum_type(), ty) || member.enum_type() == ty => {
            Ok(Value::Int(member.value()))
        }
        other => Err(SchemaError::mismatch(ty.name(), other)),
    }
}

pub(crate) fn enum_from_encoded(ty: &Arc<EnumType>, encoded: &Value) -> Result<Value, SchemaError> {
    match encoded {
        Value::Int(i) => ty.from_int(*i).ok_or_else(|| SchemaError::mismatch(ty.name(), encoded)),
        Value::Enum(_) => {
            enum_to_encoded(ty, encoded)?;
            Ok(encoded.clone())
        }
        other => Err(SchemaError::mismatch(ty.name(), other)),
    }
}

/// An extra leaf descriptor supplied by a collaborator (object ids,
/// tensors, ...). Custom leaves compare equal by name.
pub trait LeafCodec: fmt::Debug + Send + Sync {
    /// Display name, also the leaf's identity.
    fn name(&self) -> &str;

    /// Check the native shape of a non-null value.
    fn check(&self, value: &Value) -> Result<(), SchemaError>;

    /// Encode a checked, non-null value.
    fn to_encoded(&self, value: &Value, target: Target) -> Result<Value, SchemaError>;

    /// Decode a non-null encoded value.
    fn from_encoded(&self, encoded: &Value, source: Target) -> Result<Value, SchemaError>;

    /// Zero-argument construction, used by the `empty` policy.
    fn instantiate(&self) -> Result<Value, SchemaError> {
        Err(SchemaError::Policy(format!(
            "{} cannot be constructed without arguments",
            self.name()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_float_widens_int() {
        assert_eq!(Leaf::Float.to_encoded(&Value::Int(2), Target::Json).unwrap(), Value::Float(2.0));
        assert_eq!(Leaf::Float.from_encoded(&Value::Int(2), Target::Bson).unwrap(), Value::Float(2.0));
        assert!(Leaf::Float.to_encoded(&Value::from("2"), Target::Json).is_err());
    }

    #[test]
    fn test_bytes_per_target() {
        let raw = Value::Bytes(b"hello".to_vec());
        let json = Leaf::Bytes.to_encoded(&raw, Target::Json).unwrap();
        assert_eq!(json, Value::from("Xk~0{Zv"));
        assert_eq!(Leaf::Bytes.from_encoded(&json, Target::Json).unwrap(), raw);
        assert_eq!(Leaf::Bytes.to_encoded(&raw, Target::Bson).unwrap(), raw);
        assert!(Leaf::Bytes.from_encoded(&raw, Target::Json).is_err());
    }

    #[test]
    fn test_datetime_per_target() {
        let dt = Utc.with_ymd_and_hms(2026, 1, 15, 12, 30, 45).unwrap();
        let native = Value::DateTime(dt);
        let json = Leaf::Datetime.to_encoded(&native, Target::Json).unwrap();
        assert_eq!(json, Value::from("2026-01-15T12:30:45Z"));
        assert_eq!(Leaf::Datetime.from_encoded(&json, Target::Json).unwrap(), native);
        assert_eq!(Leaf::Datetime.to_encoded(&native, Target::Bson).unwrap(), native);
    }

    #[test]
    fn test_datetime_accepts_naive_and_offset_text() {
        let expected = Value::DateTime(Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap());
        for text in ["2026-01-15 12:00:00", "2026-01-15T12:00:00", "2026-01-15T17:00:00+05:00"] {
            assert_eq!(Leaf::Datetime.from_encoded(&Value::from(text), Target::Json).unwrap(), expected);
        }
        assert!(matches!(
            Leaf::Datetime.from_encoded(&Value::from("yesterday"), Target::Json),
            Err(SchemaError::InvalidEncoding { .. })
        ));
    }

    #[test]
    fn test_datetime_year_bounds() {
        let last = Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59).unwrap();
        let encoded = Leaf::Datetime.to_encoded(&Value::DateTime(last), Target::Json).unwrap();
        assert_eq!(encoded, Value::from("9999-12-31T23:59:59Z"));
        assert_eq!(Leaf::Datetime.from_encoded(&encoded, Target::Json).unwrap(), Value::DateTime(last));

        let first = Utc.with_ymd_and_hms(0, 1, 1, 0, 0, 0).unwrap();
        let encoded = Leaf::Datetime.to_encoded(&Value::DateTime(first), Target::Json).unwrap();
        assert_eq!(Leaf::Datetime.from_encoded(&encoded, Target::Json).unwrap(), Value::DateTime(first));

        for year in [10_000, -1] {
            let out_of_range = Value::DateTime(Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap());
            for target in [Target::Json, Target::Bson] {
                assert!(matches!(
                    Leaf::Datetime.to_encoded(&out_of_range, target),
                    Err(SchemaError::TypeMismatch { .. })
                ));
            }
            assert!(Leaf::Datetime.check(&out_of_range).is_err());
        }
    }

    #[test]
    fn test_path_is_text() {
        let path = Value::Path(PathBuf::from("/tmp/x"));
        assert_eq!(Leaf::Path.to_encoded(&path, Target::Bson).unwrap(), Value::from("/tmp/x"));
        assert_eq!(Leaf::Path.from_encoded(&Value::from("/tmp/x"), Target::Json).unwrap(), path);
    }

    #[test]
    fn test_any_rejects_records_and_instances() {
        assert!(Leaf::Any.check(&Value::List(vec![Value::Int(1), Value::from("a")])).is_ok());
        assert!(Leaf::Any.check(&Value::List(vec![Value::opaque(1u8)])).is_err());
    }

    #[test]
    fn test_bool_is_not_int() {
        assert!(Leaf::Int.check(&Value::Bool(true)).is_err());
    }

    #[test]
    fn test_enum_codec() {
        let color = EnumType::new("Color", [("Red", 1), ("Green", 2)]);
        let green = color.member("Green").unwrap();
        assert_eq!(enum_to_encoded(&color, &green).unwrap(), Value::Int(2));
        assert_eq!(enum_from_encoded(&color, &Value::Int(2)).unwrap(), green);
        assert!(enum_from_encoded(&color, &Value::Int(3)).is_err());
    }
}
