//! Conversion between in-memory keys/values and the generic JSON values a
//! backend persists.

use std::any::{self, TypeId};
use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{StoreError, StoreResult};

/// Identity of a translator implementation.
///
/// Two translators are the same kind exactly when they are the same concrete
/// type, regardless of how they behave.
#[derive(Clone, Copy)]
pub struct TranslatorKind {
    id: TypeId,
    name: &'static str,
}

impl TranslatorKind {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: any::type_name::<T>(),
        }
    }

    /// Type name of the implementation, for diagnostics only.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TranslatorKind {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TranslatorKind {}

impl fmt::Debug for TranslatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TranslatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Encodes values of `T` to JSON and back.
///
/// Implementations must round-trip: `decode(&encode(v)?)?` equals `v` for
/// every value the backend will store.
pub trait Translator<T>: Send + Sync + 'static {
    fn encode(&self, value: &T) -> StoreResult<Value>;

    fn decode(&self, value: &Value) -> StoreResult<T>;

    /// The implementation identity used for compatibility checks.
    fn kind(&self) -> TranslatorKind {
        TranslatorKind::of::<Self>()
    }
}

/// Translator for any serde type.
pub struct JsonTranslator<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonTranslator<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonTranslator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonTranslator<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for JsonTranslator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JsonTranslator<{}>", any::type_name::<T>())
    }
}

impl<T> Translator<T> for JsonTranslator<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    fn encode(&self, value: &T) -> StoreResult<Value> {
        serde_json::to_value(value).map_err(|e| StoreError::Translation(e.to_string()))
    }

    fn decode(&self, value: &Value) -> StoreResult<T> {
        serde_json::from_value(value.clone()).map_err(|e| StoreError::Translation(e.to_string()))
    }
}

/// Strings stored as JSON strings.
#[derive(Clone, Copy, Debug, Default)]
pub struct StringTranslator;

impl Translator<String> for StringTranslator {
    fn encode(&self, value: &String) -> StoreResult<Value> {
        Ok(Value::String(value.clone()))
    }

    fn decode(&self, value: &Value) -> StoreResult<String> {
        match value {
            Value::String(s) => Ok(s.clone()),
            other => Err(StoreError::Translation(format!(
                "expected a string, found {other}"
            ))),
        }
    }
}

/// Signed 64-bit integers stored as JSON numbers.
#[derive(Clone, Copy, Debug, Default)]
pub struct IntegerTranslator;

impl Translator<i64> for IntegerTranslator {
    fn encode(&self, value: &i64) -> StoreResult<Value> {
        Ok(Value::from(*value))
    }

    fn decode(&self, value: &Value) -> StoreResult<i64> {
        value
            .as_i64()
            .ok_or_else(|| StoreError::Translation(format!("expected an integer, found {value}")))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn json_translator_roundtrip() {
        let translator = JsonTranslator::<BTreeMap<String, Vec<u32>>>::new();
        let mut value = BTreeMap::new();
        value.insert("a".to_string(), vec![1, 2]);
        let encoded = translator.encode(&value).unwrap();
        assert_eq!(translator.decode(&encoded).unwrap(), value);
    }

    #[test]
    fn json_translator_keeps_null_values() {
        let translator = JsonTranslator::<Option<i32>>::new();
        let encoded = translator.encode(&None).unwrap();
        assert_eq!(encoded, Value::Null);
        assert_eq!(translator.decode(&encoded).unwrap(), None);
    }

    #[test]
    fn string_and_integer_translators() {
        assert_eq!(
            StringTranslator.decode(&StringTranslator.encode(&"x".to_string()).unwrap()).unwrap(),
            "x"
        );
        assert_eq!(IntegerTranslator.decode(&Value::from(-4)).unwrap(), -4);
        assert!(matches!(
            StringTranslator.decode(&Value::from(1)),
            Err(StoreError::Translation(_))
        ));
        assert!(matches!(
            IntegerTranslator.decode(&Value::from("1")),
            Err(StoreError::Translation(_))
        ));
    }

    #[test]
    fn kind_is_implementation_identity() {
        let a = Translator::<String>::kind(&StringTranslator);
        let b = Translator::<String>::kind(&StringTranslator);
        let c = Translator::<String>::kind(&JsonTranslator::<String>::new());
        let d = Translator::<i64>::kind(&JsonTranslator::<i64>::new());
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(c, d);
        assert!(a.name().ends_with("StringTranslator"));
    }

    #[test]
    fn kind_through_trait_object_is_concrete() {
        let boxed: Box<dyn Translator<String>> = Box::new(StringTranslator);
        assert_eq!(boxed.kind(), TranslatorKind::of::<StringTranslator>());
    }
}
