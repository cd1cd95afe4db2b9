use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::core::{DataError, Result, Value};

/// Bidirectional conversion between the entity-side and persisted
/// representation of one property.
pub trait AttributeConverter: Send + Sync {
    fn to_persisted(&self, value: Value) -> Result<Value>;
    fn to_entity(&self, value: Value) -> Result<Value>;
}

pub type ConverterFactory = Arc<dyn Fn() -> Result<Arc<dyn AttributeConverter>> + Send + Sync>;

/// Named converter factories, resolved by persistent properties on first use.
#[derive(Clone, Default)]
pub struct ConverterRegistry {
    factories: HashMap<String, ConverterFactory>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in converters.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .register::<JsonTextConverter>("json_text")
            .register::<BooleanIntegerConverter>("bool_int");
        registry
    }

    pub fn register<C>(&mut self, name: impl Into<String>) -> &mut Self
    where
        C: AttributeConverter + Default + 'static,
    {
        self.register_factory(name, || Ok(Arc::new(C::default())))
    }

    pub fn register_factory<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Result<Arc<dyn AttributeConverter>> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Construct a fresh converter instance. Callers memoize.
    pub fn instantiate(&self, name: &str, property: &str) -> Result<Arc<dyn AttributeConverter>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| DataError::ConverterResolution {
                converter: name.to_string(),
                property: property.to_string(),
                reason: "no converter registered under this name".to_string(),
            })?;

        factory().map_err(|err| match err {
            DataError::ConverterResolution { .. } => err,
            other => DataError::ConverterResolution {
                converter: name.to_string(),
                property: property.to_string(),
                reason: other.to_string(),
            },
        })
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("ConverterRegistry")
            .field("converters", &names)
            .finish()
    }
}

/// Stores JSON documents as text columns.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonTextConverter;

impl AttributeConverter for JsonTextConverter {
    fn to_persisted(&self, value: Value) -> Result<Value> {
        match value {
            Value::Json(json) => Ok(Value::Text(json.to_string())),
            other => Ok(other),
        }
    }

    fn to_entity(&self, value: Value) -> Result<Value> {
        match value {
            Value::Text(text) => serde_json::from_str(&text)
                .map(Value::Json)
                .map_err(|err| DataError::TypeMismatch(format!("invalid json column: {err}"))),
            other => Ok(other),
        }
    }
}

/// Stores booleans as 0/1 integers.
#[derive(Debug, Default, Clone, Copy)]
pub struct BooleanIntegerConverter;

impl AttributeConverter for BooleanIntegerConverter {
    fn to_persisted(&self, value: Value) -> Result<Value> {
        match value {
            Value::Boolean(b) => Ok(Value::Integer(i64::from(b))),
            other => Ok(other),
        }
    }

    fn to_entity(&self, value: Value) -> Result<Value> {
        match value {
            Value::Integer(i) => Ok(Value::Boolean(i != 0)),
            other => Ok(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_converters_round_trip() {
        let registry = ConverterRegistry::with_defaults();
        let json = registry.instantiate("json_text", "Book.meta").unwrap();
        let persisted = json
            .to_persisted(Value::Json(serde_json::json!({"a": 1})))
            .unwrap();
        assert_eq!(persisted, Value::Text("{\"a\":1}".to_string()));
        assert_eq!(
            json.to_entity(persisted).unwrap(),
            Value::Json(serde_json::json!({"a": 1}))
        );

        let flag = registry.instantiate("bool_int", "Book.active").unwrap();
        assert_eq!(flag.to_persisted(Value::Boolean(true)).unwrap(), Value::Integer(1));
    }

    #[test]
    fn unknown_converter_is_a_resolution_failure() {
        let registry = ConverterRegistry::new();
        let err = registry.instantiate("missing", "Book.title").err().unwrap();
        assert!(matches!(err, DataError::ConverterResolution { .. }));
    }
}
