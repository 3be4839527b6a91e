//! Template containers: `List`, `Dict`, `DefaultDict` and `Tuple`.
//!
//! An unspecialized container treats every position as `Any`. Encoding
//! and the apply walk both map element-wise through the parameter
//! descriptors; a specialized tuple additionally pins the element count.

use crate::error::SchemaError;
use crate::policy::Target;
use crate::value::{DefaultMap, Value, ValueMap};

use super::{Descriptor, ANY, STR};

/// Parameter used for every position of an unspecialized container.
static UNTYPED: Descriptor = ANY;

/// The container families a generic descriptor can be built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Container {
    List,
    Dict,
    DefaultDict,
    Tuple,
}

impl Container {
    pub fn base_name(self) -> &'static str {
        match self {
            Container::List => "List",
            Container::Dict => "Dict",
            Container::DefaultDict => "DefaultDict",
            Container::Tuple => "Tuple",
        }
    }

    fn is_mapping(self) -> bool {
        matches!(self, Container::Dict | Container::DefaultDict)
    }

    /// A single mapping parameter binds the value type over `Str` keys.
    pub(crate) fn normalize(self, params: Vec<Descriptor>) -> Vec<Descriptor> {
        if self.is_mapping() && params.len() == 1 {
            let mut params = params;
            params.insert(0, STR);
            params
        } else {
            params
        }
    }

    pub(crate) fn check_parameters(self, params: Vec<Descriptor>) -> Result<Vec<Descriptor>, SchemaError> {
        let expected = match self {
            Container::List if params.len() != 1 => "1",
            Container::Dict | Container::DefaultDict if !matches!(params.len(), 1 | 2) => "1 or 2",
            _ => return Ok(self.normalize(params)),
        };
        Err(SchemaError::Arity {
            descriptor: self.base_name().into(),
            expected: expected.into(),
            actual: params.len(),
        })
    }

    /// The zero-argument native value: an empty container.
    pub(crate) fn instantiate(self, params: Option<&[Descriptor]>) -> Value {
        match self {
            Container::List => Value::List(Vec::new()),
            Container::Tuple => Value::Tuple(Vec::new()),
            Container::Dict => Value::Map(ValueMap::new()),
            Container::DefaultDict => {
                let (_, value) = mapping_parameters(params);
                Value::DefaultMap(DefaultMap::new(value.clone(), ValueMap::new()))
            }
        }
    }
}

fn item_parameter(params: Option<&[Descriptor]>) -> &Descriptor {
    params.and_then(<[Descriptor]>::first).unwrap_or(&UNTYPED)
}

fn mapping_parameters(params: Option<&[Descriptor]>) -> (&Descriptor, &Descriptor) {
    match params {
        Some([key, value]) => (key, value),
        _ => (&UNTYPED, &UNTYPED),
    }
}

/// One descriptor per element, checking a specialized tuple's arity.
fn tuple_parameters<'a>(
    descriptor: &Descriptor,
    params: Option<&'a [Descriptor]>,
    len: usize,
) -> Result<Vec<&'a Descriptor>, SchemaError> {
    match params {
        Some(params) if params.len() != len => Err(SchemaError::Arity {
            descriptor: descriptor.name(),
            expected: params.len().to_string(),
            actual: len,
        }),
        Some(params) => Ok(params.iter().collect()),
        None => Ok(vec![&UNTYPED; len]),
    }
}

impl Descriptor {
    fn sequence<'v>(&self, value: &'v Value) -> Result<&'v [Value], SchemaError> {
        value.as_seq().ok_or_else(|| SchemaError::mismatch(self.name(), value))
    }

    fn mapping<'v>(&self, value: &'v Value) -> Result<&'v ValueMap, SchemaError> {
        value.as_map().ok_or_else(|| SchemaError::mismatch(self.name(), value))
    }

    pub(super) fn generic_to_encoded(
        &self,
        container: Container,
        params: Option<&[Descriptor]>,
        value: &Value,
        target: Target,
    ) -> Result<Value, SchemaError> {
        match container {
            Container::List => {
                let item = item_parameter(params);
                let items = self.sequence(value)?;
                let encoded = items
                    .iter()
                    .map(|v| item.to_encoded(v, target))
                    .collect::<Result<_, _>>()?;
                Ok(Value::List(encoded))
            }
            Container::Tuple => {
                let items = self.sequence(value)?;
                let per_item = tuple_parameters(self, params, items.len())?;
                let encoded = per_item
                    .into_iter()
                    .zip(items)
                    .map(|(d, v)| d.to_encoded(v, target))
                    .collect::<Result<_, _>>()?;
                Ok(Value::List(encoded))
            }
            Container::Dict | Container::DefaultDict => {
                let (key, item) = mapping_parameters(params);
                let entries = self.mapping(value)?;
                let mut encoded = ValueMap::with_capacity(entries.len());
                for (k, v) in entries.iter() {
                    encoded.insert(key.to_encoded(k, target)?, item.to_encoded(v, target)?);
                }
                Ok(Value::Map(encoded))
            }
        }
    }

    pub(super) fn generic_from_encoded(
        &self,
        container: Container,
        params: Option<&[Descriptor]>,
        encoded: &Value,
        source: Target,
    ) -> Result<Value, SchemaError> {
        match container {
            Container::List => {
                let item = item_parameter(params);
                let decoded = self
                    .sequence(encoded)?
                    .iter()
                    .map(|v| item.from_encoded(v, source))
                    .collect::<Result<_, _>>()?;
                Ok(Value::List(decoded))
            }
            Container::Tuple => {
                let items = self.sequence(encoded)?;
                let per_item = tuple_parameters(self, params, items.len())?;
                let decoded = per_item
                    .into_iter()
                    .zip(items)
                    .map(|(d, v)| d.from_encoded(v, source))
                    .collect::<Result<_, _>>()?;
                Ok(Value::Tuple(decoded))
            }
            Container::Dict | Container::DefaultDict => {
                let (key, item) = mapping_parameters(params);
                let entries = self.mapping(encoded)?;
                let mut decoded = ValueMap::with_capacity(entries.len());
                for (k, v) in entries.iter() {
                    decoded.insert(key.from_encoded(k, source)?, item.from_encoded(v, source)?);
                }
                Ok(self.rebuild_mapping(container, params, decoded))
            }
        }
    }

    pub(super) fn generic_apply<F>(
        &self,
        container: Container,
        params: Option<&[Descriptor]>,
        value: Value,
        func: &mut F,
    ) -> Result<Value, SchemaError>
    where
        F: FnMut(&Descriptor, Value) -> Result<Value, SchemaError>,
    {
        let rebuilt = match (container, value) {
            (Container::List, Value::List(items) | Value::Tuple(items)) => {
                let item = item_parameter(params);
                Value::List(
                    items
                        .into_iter()
                        .map(|v| item.apply(v, func))
                        .collect::<Result<_, _>>()?,
                )
            }
            (Container::Tuple, Value::Tuple(items) | Value::List(items)) => {
                let per_item = tuple_parameters(self, params, items.len())?;
                Value::Tuple(
                    per_item
                        .into_iter()
                        .zip(items)
                        .map(|(d, v)| d.apply(v, func))
                        .collect::<Result<_, _>>()?,
                )
            }
            (Container::Dict | Container::DefaultDict, Value::Map(map)) => {
                self.apply_mapping(container, params, map, func)?
            }
            (Container::Dict | Container::DefaultDict, Value::DefaultMap(map)) => {
                self.apply_mapping(container, params, map.into_entries(), func)?
            }
            (_, other) => return Err(SchemaError::mismatch(self.name(), &other)),
        };
        func(self, rebuilt)
    }

    fn apply_mapping<F>(
        &self,
        container: Container,
        params: Option<&[Descriptor]>,
        map: ValueMap,
        func: &mut F,
    ) -> Result<Value, SchemaError>
    where
        F: FnMut(&Descriptor, Value) -> Result<Value, SchemaError>,
    {
        let (key, item) = mapping_parameters(params);
        let mut rebuilt = ValueMap::new();
        for (k, v) in map {
            rebuilt.insert(key.apply(k, func)?, item.apply(v, func)?);
        }
        Ok(self.rebuild_mapping(container, params, rebuilt))
    }

    fn rebuild_mapping(&self, container: Container, params: Option<&[Descriptor]>, entries: ValueMap) -> Value {
        match container {
            Container::DefaultDict => {
                let (_, item) = mapping_parameters(params);
                Value::DefaultMap(DefaultMap::new(item.clone(), entries))
            }
            _ => Value::Map(entries),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{default_dict_of, dict_of, list_of, map_of, tuple_of, BYTES, DEFAULT_DICT, DICT, INT, LIST, TUPLE};

    fn str_int_map() -> Value {
        Value::Map([("a", 1), ("b", 2)].into_iter().collect())
    }

    #[test]
    fn test_names() {
        assert_eq!(LIST.name(), "List");
        assert_eq!(list_of(INT).name(), "List[Int]");
        assert_eq!(DEFAULT_DICT.of([INT]).unwrap().name(), "DefaultDict[Str, Int]");
        assert_eq!(tuple_of([INT, STR]).name(), "Tuple[Int, Str]");
    }

    #[test]
    fn test_map_round_trip_both_targets() {
        let descriptor = map_of(INT);
        for target in [Target::Json, Target::Bson] {
            let encoded = descriptor.to_encoded(&str_int_map(), target).unwrap();
            assert_eq!(encoded, str_int_map());
            assert_eq!(descriptor.from_encoded(&encoded, target).unwrap(), str_int_map());
        }
    }

    #[test]
    fn test_list_encodes_elements() {
        let descriptor = list_of(BYTES);
        let value = Value::List(vec![Value::Bytes(b"hello".to_vec())]);
        let encoded = descriptor.to_encoded(&value, Target::Json).unwrap();
        assert_eq!(encoded, Value::List(vec![Value::from("Xk~0{Zv")]));
        assert_eq!(descriptor.from_encoded(&encoded, Target::Json).unwrap(), value);
    }

    #[test]
    fn test_list_rejects_scalars() {
        assert!(matches!(
            list_of(INT).to_encoded(&Value::Int(1), Target::Json),
            Err(SchemaError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_tuple_arity() {
        let pair = tuple_of([INT, INT]);
        let three = Value::Tuple(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert!(matches!(pair.to_encoded(&three, Target::Json), Err(SchemaError::Arity { .. })));
        assert!(matches!(pair.validate(&three), Err(SchemaError::Arity { .. })));
        assert!(TUPLE.validate(&three).is_ok());
    }

    #[test]
    fn test_mapping_arity_reports_accepted_range() {
        let err = DICT.of(Vec::<Descriptor>::new()).unwrap_err();
        assert!(matches!(
            &err,
            SchemaError::Arity { expected, actual: 0, .. } if expected == "1 or 2"
        ));
        assert_eq!(err.to_string(), "arity mismatch for Dict: expected 1 or 2 elements, got 0");
        assert!(matches!(
            DEFAULT_DICT.of([STR, INT, INT]),
            Err(SchemaError::Arity { actual: 3, .. })
        ));
        assert!(matches!(
            LIST.of(Vec::<Descriptor>::new()),
            Err(SchemaError::Arity { expected, .. }) if expected == "1"
        ));
    }

    #[test]
    fn test_large_map_decodes_and_compares() {
        let n: i64 = 50_000;
        let encoded = Value::Map((0..n).map(|i| (format!("key{i}"), i)).collect());
        let descriptor = map_of(INT);
        let decoded = descriptor.from_encoded(&encoded, Target::Json).unwrap();
        let map = decoded.as_map().unwrap();
        assert_eq!(map.len(), n as usize);
        assert_eq!(map.get_str("key49999"), Some(&Value::Int(49_999)));
        assert_eq!(decoded, decoded.clone());
        let mut entries: Vec<(Value, Value)> = map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        entries.reverse();
        let reversed = Value::Map(entries.into_iter().collect());
        assert_eq!(decoded, reversed);
    }

    #[test]
    fn test_tuple_decodes_to_tuple() {
        let pair = tuple_of([STR, INT]);
        let native = Value::Tuple(vec![Value::from("a"), Value::Int(1)]);
        let encoded = pair.to_encoded(&native, Target::Json).unwrap();
        assert_eq!(encoded, Value::List(vec![Value::from("a"), Value::Int(1)]));
        assert_eq!(pair.from_encoded(&encoded, Target::Json).unwrap(), native);
    }

    #[test]
    fn test_unspecialized_dict_is_untyped() {
        let encoded = DICT.to_encoded(&str_int_map(), Target::Json).unwrap();
        assert_eq!(encoded, str_int_map());
    }

    #[test]
    fn test_non_string_keys_go_through_key_descriptor() {
        let descriptor = dict_of(INT, STR);
        let value = Value::Map([(1, "x")].into_iter().collect());
        assert_eq!(descriptor.to_encoded(&value, Target::Bson).unwrap(), value);
        let bad = Value::Map([("1", "x")].into_iter().collect());
        assert!(descriptor.to_encoded(&bad, Target::Bson).is_err());
    }

    #[test]
    fn test_default_dict_vivifies_from_value_descriptor() {
        let descriptor = default_dict_of(STR, list_of(INT).empty());
        let decoded = descriptor
            .from_encoded(&Value::Map(ValueMap::new()), Target::Json)
            .unwrap();
        let Value::DefaultMap(mut map) = decoded else {
            panic!("expected a default map");
        };
        map.get_or_default("k").unwrap();
        assert_eq!(map.get(&Value::from("k")), Some(&Value::List(Vec::new())));
    }

    #[test]
    fn test_apply_keeps_default_dict_shape() {
        let descriptor = default_dict_of(STR, INT.with_default(0));
        let native = descriptor.instantiate().unwrap();
        let out = descriptor.apply(native, &mut |_, v| Ok(v)).unwrap();
        assert!(matches!(out, Value::DefaultMap(_)));
    }
}
