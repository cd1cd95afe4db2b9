//! Moves values between entity-side and persisted form.

use crate::core::{DataError, Result, Value};
use crate::model::{Entity, PersistentEntity};

/// Apply each property's converter to an entity-side row.
pub fn persist_row(entity: &PersistentEntity, values: Vec<Value>) -> Result<Vec<Value>> {
    if values.len() != entity.properties().len() {
        return Err(DataError::TypeMismatch(format!(
            "{} has {} properties but {} values were written",
            entity.name(),
            entity.properties().len(),
            values.len()
        )));
    }
    entity
        .properties()
        .iter()
        .zip(values)
        .map(|(property, value)| match property.converter()? {
            Some(converter) if !value.is_null() => converter.to_persisted(value),
            _ => Ok(value),
        })
        .collect()
}

/// Persisted form of one query argument bound against `property`.
///
/// `IN` lists are converted element-wise.
pub fn persist_value(entity: &PersistentEntity, property: Option<&str>, value: Value) -> Result<Value> {
    let Some(property) = property.and_then(|name| entity.property(name)) else {
        return Ok(value);
    };
    let Some(converter) = property.converter()? else {
        return Ok(value);
    };
    match value {
        Value::Null => Ok(Value::Null),
        Value::List(items) => items
            .into_iter()
            .map(|item| converter.to_persisted(item))
            .collect::<Result<Vec<_>>>()
            .map(Value::List),
        other => converter.to_persisted(other),
    }
}

/// Entity-side form of a value read from `property`'s column.
pub fn entity_value(entity: &PersistentEntity, property: Option<&str>, value: Value) -> Result<Value> {
    let Some(property) = property.and_then(|name| entity.property(name)) else {
        return Ok(value);
    };
    match property.converter()? {
        Some(converter) if !value.is_null() => converter.to_entity(value),
        _ => Ok(value),
    }
}

/// Rebuild an entity from a driver row.
///
/// Columns are matched to properties by persisted name; properties missing
/// from the row read as `Null`.
pub fn hydrate<E: Entity>(entity: &PersistentEntity, columns: &[String], row: Vec<Value>) -> Result<E> {
    let mut values = vec![Value::Null; entity.properties().len()];
    for (column, value) in columns.iter().zip(row) {
        let slot = entity
            .properties()
            .iter()
            .position(|property| property.persisted_name() == column);
        if let Some(idx) = slot {
            values[idx] = value;
        }
    }

    let values = entity
        .properties()
        .iter()
        .zip(values)
        .map(|(property, value)| match property.converter()? {
            Some(converter) if !value.is_null() => converter.to_entity(value),
            _ => Ok(value),
        })
        .collect::<Result<Vec<_>>>()?;
    E::from_values(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityDefinition, MappingStrategies, PropertyDef, TypeRef};

    #[derive(Debug, PartialEq)]
    struct Flag {
        id: i64,
        active: bool,
    }

    impl Entity for Flag {
        fn definition() -> EntityDefinition {
            EntityDefinition::new("Flag")
                .property(PropertyDef::new("id", TypeRef::of::<i64>()).id())
                .property(PropertyDef::new("active", TypeRef::of::<bool>()).converter("bool_int"))
        }

        fn to_values(&self) -> Vec<Value> {
            vec![self.id.into(), self.active.into()]
        }

        fn from_values(values: Vec<Value>) -> Result<Self> {
            let mut values = values.into_iter();
            Ok(Self {
                id: crate::core::FromValue::from_value(values.next().unwrap_or(Value::Null))?,
                active: crate::core::FromValue::from_value(values.next().unwrap_or(Value::Null))?,
            })
        }
    }

    #[test]
    fn converters_apply_in_both_directions() {
        let entity = PersistentEntity::of::<Flag>(&MappingStrategies::default()).unwrap();
        let flag = Flag { id: 1, active: true };

        let persisted = persist_row(&entity, flag.to_values()).unwrap();
        assert_eq!(persisted, vec![Value::Integer(1), Value::Integer(1)]);

        let columns = vec!["active".to_string(), "id".to_string()];
        let back: Flag = hydrate(&entity, &columns, vec![Value::Integer(0), Value::Integer(1)]).unwrap();
        assert_eq!(back, Flag { id: 1, active: false });

        assert_eq!(
            persist_value(&entity, Some("active"), Value::list([true, false])).unwrap(),
            Value::List(vec![Value::Integer(1), Value::Integer(0)])
        );
    }
}
