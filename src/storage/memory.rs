use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use async_trait::async_trait;
use log::debug;

use super::eval::RowEvaluator;
use super::table::{Row, Table};
use crate::core::{DataError, Result, Value};
use crate::model::PersistentEntity;
use crate::query::{Direction, PreparedQuery, Projection, StatementKind};
use crate::runtime::{AsyncDriver, Driver, ResultSet, Statement};

/// In-process table store implementing both driver boundaries.
///
/// Tables are created on first use, named by the entity's persisted name.
/// Every statement runs under one lock, so each is atomic with respect to
/// the others.
#[derive(Debug, Default)]
pub struct MemoryDriver {
    tables: RwLock<HashMap<String, Table>>,
    executed: AtomicU64,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of statements executed so far.
    pub fn executed(&self) -> u64 {
        self.executed.load(AtomicOrdering::Relaxed)
    }

    pub fn table_names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.tables.read()?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    pub fn row_count(&self, table: &str) -> Result<usize> {
        Ok(self.tables.read()?.get(table).map_or(0, Table::row_count))
    }

    /// Raw stored rows of a table, in insertion order.
    pub fn dump(&self, table: &str) -> Result<Vec<Row>> {
        Ok(self
            .tables
            .read()?
            .get(table)
            .map(|t| t.scan().map(|(_, row)| row.clone()).collect())
            .unwrap_or_default())
    }

    fn read(&self, entity: &PersistentEntity, query: &PreparedQuery) -> Result<ResultSet> {
        let tables = self.tables.read()?;
        let Some(table) = tables.get(entity.persisted_name()) else {
            return project(entity, query, Vec::new());
        };
        let rows = select(table, query)?;
        project(entity, query, rows)
    }

    fn find_by_id(&self, entity: &PersistentEntity, id: &[Value]) -> Result<ResultSet> {
        let tables = self.tables.read()?;
        let row = tables
            .get(entity.persisted_name())
            .and_then(|table| table.lookup(id).and_then(|row_id| table.get(row_id)))
            .cloned();
        Ok(ResultSet::new(columns(entity), row.into_iter().collect()))
    }

    fn execute_criteria(&self, query: &PreparedQuery) -> Result<ResultSet> {
        let entity = query.entity();
        let mut tables = self.tables.write()?;
        let Some(table) = tables.get_mut(entity.persisted_name()) else {
            return Ok(ResultSet::affected(0));
        };
        let evaluator = RowEvaluator::new(query);
        let mut targets = Vec::new();
        for (row_id, row) in table.scan() {
            if evaluator.matches(row)? {
                targets.push(row_id);
            }
        }

        match query.kind() {
            StatementKind::Delete => {
                for &row_id in &targets {
                    let id = table.get(row_id).map(|row| entity.id_values(row));
                    if let Some(id) = id {
                        table.remove(row_id, &id);
                    }
                }
            }
            StatementKind::Update(assignments) => {
                let mut updates = Vec::with_capacity(assignments.len());
                for assignment in assignments {
                    let idx = entity.property_index(&assignment.property).ok_or_else(|| {
                        DataError::Backend(format!(
                            "{} has no column for property '{}'",
                            table.name(),
                            assignment.property
                        ))
                    })?;
                    updates.push((idx, query.bind(&assignment.value)?));
                }
                for &row_id in &targets {
                    if let Some(row) = table.get_mut(row_id) {
                        for (idx, value) in &updates {
                            row[*idx] = value.clone();
                        }
                    }
                }
            }
            other => {
                return Err(DataError::Backend(format!(
                    "{other:?} statements cannot be executed as writes"
                )));
            }
        }
        debug!("{}: {} rows affected", table.name(), targets.len());
        Ok(ResultSet::affected(targets.len() as u64))
    }

    fn insert(&self, entity: &PersistentEntity, rows: Vec<Row>) -> Result<ResultSet> {
        let mut tables = self.tables.write()?;
        let table = tables
            .entry(entity.persisted_name().to_string())
            .or_insert_with(|| Table::new(entity));

        let rows = table.prepare_insert(entity, rows)?;
        for row in &rows {
            table.insert(entity.id_values(row), row.clone());
        }
        let mut result = ResultSet::new(table.columns().to_vec(), rows);
        result.affected = result.rows.len() as u64;
        Ok(result)
    }

    /// Replace stored rows by identity. Read-only columns keep their stored
    /// value; rows with no stored counterpart are skipped.
    fn update_rows(&self, entity: &PersistentEntity, rows: Vec<Row>) -> Result<ResultSet> {
        let mut tables = self.tables.write()?;
        let Some(table) = tables.get_mut(entity.persisted_name()) else {
            return Ok(ResultSet::new(columns(entity), Vec::new()));
        };

        let mut updated = Vec::with_capacity(rows.len());
        for row in rows {
            let id = entity.id_values(&row);
            let Some(row_id) = table.lookup(&id) else {
                debug!("{}: no row with identity {}", table.name(), Value::List(id));
                continue;
            };
            let Some(stored) = table.get_mut(row_id) else {
                continue;
            };
            for (idx, (slot, value)) in stored.iter_mut().zip(row).enumerate() {
                if !entity.properties()[idx].is_read_only() {
                    *slot = value;
                }
            }
            updated.push(stored.clone());
        }
        let mut result = ResultSet::new(table.columns().to_vec(), updated);
        result.affected = result.rows.len() as u64;
        Ok(result)
    }

    fn delete_rows(&self, entity: &PersistentEntity, ids: Vec<Vec<Value>>) -> Result<ResultSet> {
        let mut tables = self.tables.write()?;
        let Some(table) = tables.get_mut(entity.persisted_name()) else {
            return Ok(ResultSet::affected(0));
        };
        let mut affected = 0;
        for id in ids {
            if let Some(row_id) = table.lookup(&id)
                && table.remove(row_id, &id).is_some()
            {
                affected += 1;
            }
        }
        Ok(ResultSet::affected(affected))
    }
}

fn columns(entity: &PersistentEntity) -> Vec<String> {
    entity
        .properties()
        .iter()
        .map(|property| property.persisted_name().to_string())
        .collect()
}

/// Matching rows in requested order.
fn select(table: &Table, query: &PreparedQuery) -> Result<Vec<Row>> {
    let evaluator = RowEvaluator::new(query);

    let candidates: Vec<&Row> = match query.id_values()? {
        Some(id) => table
            .lookup(&id)
            .and_then(|row_id| table.get(row_id))
            .into_iter()
            .collect(),
        None => table.scan().map(|(_, row)| row).collect(),
    };

    let mut rows = Vec::new();
    for row in candidates {
        if evaluator.matches(row)? {
            rows.push(row.clone());
        }
    }

    if !query.order().is_empty() {
        let mut keys = Vec::with_capacity(query.order().len());
        for order in query.order() {
            let idx = query.entity().property_index(&order.property).ok_or_else(|| {
                DataError::Backend(format!("cannot order by unknown property '{}'", order.property))
            })?;
            keys.push((idx, order.direction, order.ignore_case));
        }
        rows.sort_by(|a, b| {
            for &(idx, direction, ignore_case) in &keys {
                let (left, right) = if ignore_case {
                    (lowered(&a[idx]), lowered(&b[idx]))
                } else {
                    (a[idx].clone(), b[idx].clone())
                };
                let ordering = left.compare(&right).unwrap_or(Ordering::Equal);
                let ordering = match direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }
    Ok(rows)
}

fn lowered(value: &Value) -> Value {
    match value {
        Value::Text(text) => Value::Text(text.to_lowercase()),
        other => other.clone(),
    }
}

fn window<T>(items: Vec<T>, query: &PreparedQuery) -> Vec<T> {
    let offset = query.offset().unwrap_or(0);
    let limit = query.limit().unwrap_or(usize::MAX);
    items.into_iter().skip(offset).take(limit).collect()
}

fn distinct<T: Clone + Eq + std::hash::Hash>(items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|item| seen.insert(item.clone())).collect()
}

/// Apply the projection. Aggregates see every matching row; the window
/// applies to entity and property reads.
fn project(entity: &PersistentEntity, query: &PreparedQuery, rows: Vec<Row>) -> Result<ResultSet> {
    let column_of = |property: &str| {
        entity.property_index(property).ok_or_else(|| {
            DataError::Backend(format!("cannot project unknown property '{property}'"))
        })
    };

    let result = match query.projection() {
        Projection::Entity => {
            let rows = if query.is_distinct() { distinct(rows) } else { rows };
            ResultSet::new(columns(entity), window(rows, query))
        }
        Projection::Property(property) => {
            let idx = column_of(property)?;
            let values: Vec<Value> = rows.into_iter().map(|mut row| row.swap_remove(idx)).collect();
            let values = if query.is_distinct() { distinct(values) } else { values };
            let name = entity.properties()[idx].persisted_name().to_string();
            ResultSet::new(
                vec![name],
                window(values, query).into_iter().map(|value| vec![value]).collect(),
            )
        }
        Projection::Properties(properties) => {
            let indexes = properties
                .iter()
                .map(|property| column_of(property))
                .collect::<Result<Vec<usize>>>()?;
            let picked: Vec<Row> = rows
                .iter()
                .map(|row| indexes.iter().map(|&idx| row[idx].clone()).collect())
                .collect();
            let picked = if query.is_distinct() { distinct(picked) } else { picked };
            let names = indexes
                .iter()
                .map(|&idx| entity.properties()[idx].persisted_name().to_string())
                .collect();
            ResultSet::new(names, window(picked, query))
        }
        Projection::Count => {
            let rows = if query.is_distinct() { distinct(rows) } else { rows };
            ResultSet::scalar("count", Value::Integer(window(rows, query).len() as i64))
        }
        Projection::CountDistinct(property) => {
            let idx = column_of(property)?;
            let values: HashSet<Value> = rows
                .into_iter()
                .map(|mut row| row.swap_remove(idx))
                .filter(|value| !value.is_null())
                .collect();
            ResultSet::scalar("count", Value::Integer(values.len() as i64))
        }
        Projection::Max(property) | Projection::Min(property) => {
            let idx = column_of(property)?;
            let want = if matches!(query.projection(), Projection::Max(_)) {
                Ordering::Greater
            } else {
                Ordering::Less
            };
            let mut best: Option<Value> = None;
            for row in &rows {
                let value = &row[idx];
                if value.is_null() {
                    continue;
                }
                let replace = match &best {
                    Some(current) => value.compare(current)? == want,
                    None => true,
                };
                if replace {
                    best = Some(value.clone());
                }
            }
            ResultSet::scalar(property.clone(), best.unwrap_or(Value::Null))
        }
        Projection::Sum(property) | Projection::Avg(property) => {
            let idx = column_of(property)?;
            let values: Vec<&Value> = rows.iter().map(|row| &row[idx]).filter(|v| !v.is_null()).collect();
            let mut total = 0f64;
            let mut integral = 0i64;
            let mut all_integers = true;
            for value in &values {
                let number = value.as_f64().ok_or_else(|| {
                    DataError::TypeMismatch(format!(
                        "cannot aggregate {} values of '{property}'",
                        value.type_name()
                    ))
                })?;
                total += number;
                match value {
                    Value::Integer(i) => integral = integral.saturating_add(*i),
                    _ => all_integers = false,
                }
            }
            let value = match query.projection() {
                Projection::Sum(_) if values.is_empty() => Value::Null,
                Projection::Sum(_) if all_integers => Value::Integer(integral),
                Projection::Sum(_) => Value::Float(total),
                _ if values.is_empty() => Value::Null,
                _ => Value::Float(total / values.len() as f64),
            };
            ResultSet::scalar(property.clone(), value)
        }
        Projection::Exists => ResultSet::scalar("exists", Value::Boolean(!rows.is_empty())),
    };
    Ok(result)
}

impl Driver for MemoryDriver {
    fn execute(&self, statement: Statement) -> Result<ResultSet> {
        self.executed.fetch_add(1, AtomicOrdering::Relaxed);
        debug!("memory: {statement}");
        match statement {
            Statement::Query(query) => self.read(query.entity(), &query),
            Statement::FindById { entity, id } => self.find_by_id(&entity, &id),
            Statement::Execute(query) => self.execute_criteria(&query),
            Statement::Insert { entity, rows } => self.insert(&entity, rows),
            Statement::UpdateRows { entity, rows } => self.update_rows(&entity, rows),
            Statement::DeleteRows { entity, ids } => self.delete_rows(&entity, ids),
        }
    }
}

#[async_trait]
impl AsyncDriver for MemoryDriver {
    async fn execute_async(&self, statement: Statement) -> Result<ResultSet> {
        tokio::task::yield_now().await;
        self.execute(statement)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::{EntityDefinition, MappingStrategies, PropertyDef, TypeRef};
    use crate::query::{CriteriaBuilder, Operand, Order, Predicate, QueryDescriptor};

    fn book() -> PersistentEntity {
        EntityDefinition::new("Book")
            .property(PropertyDef::new("id", TypeRef::optional::<i64>()).id().generated())
            .property(PropertyDef::new("title", TypeRef::of::<String>()))
            .property(PropertyDef::new("pages", TypeRef::of::<i32>()))
            .property(PropertyDef::new("created", TypeRef::of::<String>()).read_only())
            .build(&MappingStrategies::default())
            .unwrap()
    }

    fn seeded() -> (MemoryDriver, PersistentEntity) {
        let driver = MemoryDriver::new();
        let entity = book();
        let rows = [("Dune", 412), ("Emma", 320), ("Ubik", 202)]
            .into_iter()
            .map(|(title, pages)| {
                vec![Value::Null, Value::from(title), Value::Integer(pages), Value::from("t0")]
            })
            .collect();
        driver
            .execute(Statement::Insert {
                entity: entity.clone(),
                rows,
            })
            .unwrap();
        (driver, entity)
    }

    fn prepared(builder: CriteriaBuilder, args: Vec<Value>) -> PreparedQuery {
        Arc::new(QueryDescriptor::from(builder.build().unwrap())).refine(args, None, None)
    }

    #[test]
    fn inserts_generate_identities() {
        let (driver, _) = seeded();
        let ids: Vec<Value> = driver.dump("book").unwrap().into_iter().map(|row| row[0].clone()).collect();
        assert_eq!(ids, vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]);
        assert_eq!(driver.table_names().unwrap(), vec!["book".to_string()]);
    }

    #[test]
    fn queries_filter_order_and_window() {
        let (driver, entity) = seeded();
        let query = prepared(
            CriteriaBuilder::select(&entity)
                .filter(Predicate::gt("pages", Operand::param(0)))
                .order_by(Order::desc("pages"))
                .limit(1),
            vec![Value::Integer(250)],
        );
        let result = driver.execute(Statement::Query(query)).unwrap();
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0][1], Value::from("Dune"));
    }

    #[test]
    fn aggregates_ignore_the_window() {
        let (driver, entity) = seeded();
        let max = prepared(
            CriteriaBuilder::select(&entity).project(Projection::Max("pages".into())),
            Vec::new(),
        );
        let result = driver.execute(Statement::Query(max)).unwrap();
        assert_eq!(result.first_value(), Some(&Value::Integer(412)));

        let sum = prepared(
            CriteriaBuilder::select(&entity).project(Projection::Sum("pages".into())),
            Vec::new(),
        );
        let result = driver.execute(Statement::Query(sum)).unwrap();
        assert_eq!(result.first_value(), Some(&Value::Integer(934)));
    }

    #[test]
    fn criteria_updates_and_deletes_report_affected_rows() {
        let (driver, entity) = seeded();
        let update = prepared(
            CriteriaBuilder::update(&entity)
                .set("pages", Operand::param(0))
                .filter(Predicate::eq("title", Operand::param(1))),
            vec![Value::Integer(500), Value::from("Emma")],
        );
        assert_eq!(driver.execute(Statement::Execute(update)).unwrap().affected, 1);

        let delete = prepared(
            CriteriaBuilder::delete(&entity).filter(Predicate::lt("pages", Operand::param(0))),
            vec![Value::Integer(450)],
        );
        assert_eq!(driver.execute(Statement::Execute(delete)).unwrap().affected, 2);
        assert_eq!(driver.row_count("book").unwrap(), 1);
    }

    #[test]
    fn row_updates_keep_read_only_columns() {
        let (driver, entity) = seeded();
        let row = vec![Value::Integer(2), Value::from("Emma"), Value::Integer(1), Value::from("t9")];
        let result = driver
            .execute(Statement::UpdateRows {
                entity: entity.clone(),
                rows: vec![row],
            })
            .unwrap();
        assert_eq!(result.rows[0][2], Value::Integer(1));
        assert_eq!(result.rows[0][3], Value::from("t0"));

        let found = driver
            .execute(Statement::FindById {
                entity,
                id: vec![Value::Integer(2)],
            })
            .unwrap();
        assert_eq!(found.rows[0][2], Value::Integer(1));
    }

    #[test]
    fn duplicate_identity_is_a_backend_error() {
        let (driver, entity) = seeded();
        let row = vec![Value::Integer(1), Value::from("Again"), Value::Integer(1), Value::Null];
        let result = driver.execute(Statement::Insert {
            entity,
            rows: vec![row],
        });
        assert!(matches!(result, Err(DataError::Backend(_))));
        assert_eq!(driver.row_count("book").unwrap(), 3);
    }
}
