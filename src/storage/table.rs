use std::collections::{BTreeMap, HashMap};

use uuid::Uuid;

use crate::core::{DataError, Result, Value};
use crate::model::{DataType, PersistentEntity};

pub type Row = Vec<Value>;

/// Rows of one entity, in insertion order, with a unique identity index.
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    columns: Vec<String>,
    rows: BTreeMap<u64, Row>,
    next_row_id: u64,
    id_index: HashMap<Vec<Value>, u64>,
    sequence: i64,
}

impl Table {
    pub fn new(entity: &PersistentEntity) -> Self {
        Self {
            name: entity.persisted_name().to_string(),
            columns: entity
                .properties()
                .iter()
                .map(|property| property.persisted_name().to_string())
                .collect(),
            rows: BTreeMap::new(),
            next_row_id: 0,
            id_index: HashMap::new(),
            sequence: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Rows with their storage ids, in insertion order.
    pub fn scan(&self) -> impl Iterator<Item = (u64, &Row)> {
        self.rows.iter().map(|(id, row)| (*id, row))
    }

    pub fn get(&self, row_id: u64) -> Option<&Row> {
        self.rows.get(&row_id)
    }

    pub fn get_mut(&mut self, row_id: u64) -> Option<&mut Row> {
        self.rows.get_mut(&row_id)
    }

    /// Storage id of the row with this identity.
    pub fn lookup(&self, id: &[Value]) -> Option<u64> {
        self.id_index.get(id).copied()
    }

    /// Fill generated identities and check the batch against stored rows.
    ///
    /// Nothing is stored; [`insert`](Self::insert) takes the returned rows.
    /// The identity sequence only advances when the whole batch is accepted.
    pub fn prepare_insert(&mut self, entity: &PersistentEntity, rows: Vec<Row>) -> Result<Vec<Row>> {
        let identity = entity.identity().indexes();
        let mut sequence = self.sequence;
        let mut seen = Vec::with_capacity(rows.len());
        let mut prepared = Vec::with_capacity(rows.len());

        for mut row in rows {
            if row.len() != self.columns.len() {
                return Err(DataError::Backend(format!(
                    "{} expects {} columns, got {}",
                    self.name,
                    self.columns.len(),
                    row.len()
                )));
            }
            for &idx in &identity {
                let property = &entity.properties()[idx];
                match row[idx] {
                    Value::Null if property.is_generated() => {
                        row[idx] = self.generate(property.data_type(), &mut sequence)?;
                    }
                    Value::Null => {
                        return Err(DataError::Backend(format!(
                            "{} requires a value for identity column {}",
                            self.name,
                            property.persisted_name()
                        )));
                    }
                    Value::Integer(explicit) => sequence = sequence.max(explicit),
                    _ => {}
                }
            }

            let id = entity.id_values(&row);
            if self.id_index.contains_key(&id) || seen.contains(&id) {
                return Err(DataError::Backend(format!(
                    "duplicate identity {} in {}",
                    Value::List(id),
                    self.name
                )));
            }
            seen.push(id);
            prepared.push(row);
        }
        self.sequence = sequence;
        Ok(prepared)
    }

    fn generate(&self, data_type: DataType, sequence: &mut i64) -> Result<Value> {
        match data_type {
            DataType::Uuid => Ok(Value::Uuid(Uuid::new_v4())),
            DataType::String => Ok(Value::Text(Uuid::new_v4().to_string())),
            _ => {
                *sequence = sequence.checked_add(1).ok_or_else(|| {
                    DataError::Backend(format!("identity sequence of {} is exhausted", self.name))
                })?;
                Ok(Value::Integer(*sequence))
            }
        }
    }

    pub fn insert(&mut self, id: Vec<Value>, row: Row) -> u64 {
        let row_id = self.next_row_id;
        self.next_row_id += 1;
        self.rows.insert(row_id, row);
        self.id_index.insert(id, row_id);
        row_id
    }

    pub fn remove(&mut self, row_id: u64, id: &[Value]) -> Option<Row> {
        let removed = self.rows.remove(&row_id);
        if removed.is_some() {
            self.id_index.remove(id);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityDefinition, MappingStrategies, PropertyDef, TypeRef};

    fn entity() -> PersistentEntity {
        EntityDefinition::new("Book")
            .property(PropertyDef::new("id", TypeRef::optional::<i64>()).id().generated())
            .property(PropertyDef::new("title", TypeRef::of::<String>()))
            .build(&MappingStrategies::default())
            .unwrap()
    }

    #[test]
    fn generates_identities_after_explicit_ones() {
        let entity = entity();
        let mut table = Table::new(&entity);
        let rows = table
            .prepare_insert(
                &entity,
                vec![
                    vec![Value::Integer(10), Value::from("a")],
                    vec![Value::Null, Value::from("b")],
                ],
            )
            .unwrap();
        assert_eq!(rows[1][0], Value::Integer(11));

        for row in rows {
            let id = entity.id_values(&row);
            table.insert(id, row);
        }
        assert_eq!(table.lookup(&[Value::Integer(11)]), Some(1));
    }

    #[test]
    fn rejects_duplicate_identities() {
        let entity = entity();
        let mut table = Table::new(&entity);
        let row = vec![Value::Integer(1), Value::from("a")];
        assert!(
            table
                .prepare_insert(&entity, vec![row.clone(), row.clone()])
                .is_err()
        );

        let prepared = table.prepare_insert(&entity, vec![row.clone()]).unwrap();
        table.insert(vec![Value::Integer(1)], prepared[0].clone());
        assert!(table.prepare_insert(&entity, vec![row]).is_err());
    }

    #[test]
    fn rejected_batches_leave_the_sequence_alone() {
        let entity = entity();
        let mut table = Table::new(&entity);
        let row = vec![Value::Integer(50), Value::from("a")];
        assert!(
            table
                .prepare_insert(&entity, vec![row.clone(), vec![Value::Null, Value::from("b")], row])
                .is_err()
        );
        assert_eq!(table.sequence, 0);

        let rows = table
            .prepare_insert(&entity, vec![vec![Value::Null, Value::from("c")]])
            .unwrap();
        assert_eq!(rows[0][0], Value::Integer(1));
    }

    #[test]
    fn exhausted_sequence_is_an_error() {
        let entity = entity();
        let mut table = Table::new(&entity);
        let result = table.prepare_insert(
            &entity,
            vec![
                vec![Value::Integer(i64::MAX), Value::from("last")],
                vec![Value::Null, Value::from("overflow")],
            ],
        );
        assert!(matches!(result, Err(DataError::Backend(_))));
        assert_eq!(table.sequence, 0);
    }
}
