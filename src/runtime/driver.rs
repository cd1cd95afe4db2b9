//! Backend driver boundary.
//!
//! Drivers receive statements whose values are already in persisted form
//! (converters applied) and laid out in declared property order. They return
//! raw rows keyed by persisted column name.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::{Result, Value};
use crate::model::PersistentEntity;
use crate::query::PreparedQuery;

/// One backend round trip.
#[derive(Debug, Clone)]
pub enum Statement {
    /// Select with predicate, projection, ordering and paging.
    Query(PreparedQuery),
    /// Identity lookup; values in identity order.
    FindById {
        entity: PersistentEntity,
        id: Vec<Value>,
    },
    /// Criteria update or delete.
    Execute(PreparedQuery),
    /// New rows, in property order. Generated identities may be `Null`.
    Insert {
        entity: PersistentEntity,
        rows: Vec<Vec<Value>>,
    },
    /// Full-row replacement matched by identity.
    UpdateRows {
        entity: PersistentEntity,
        rows: Vec<Vec<Value>>,
    },
    /// Removal by identity; each id in identity order.
    DeleteRows {
        entity: PersistentEntity,
        ids: Vec<Vec<Value>>,
    },
}

impl Statement {
    pub fn entity(&self) -> &PersistentEntity {
        match self {
            Self::Query(query) | Self::Execute(query) => query.entity(),
            Self::FindById { entity, .. }
            | Self::Insert { entity, .. }
            | Self::UpdateRows { entity, .. }
            | Self::DeleteRows { entity, .. } => entity,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query(query) | Self::Execute(query) => f.write_str(query.descriptor().rendered()),
            Self::FindById { entity, id } => {
                write!(f, "FIND {} BY ID {}", entity.name(), Value::List(id.clone()))
            }
            Self::Insert { entity, rows } => write!(f, "INSERT {} ({} rows)", entity.name(), rows.len()),
            Self::UpdateRows { entity, rows } => {
                write!(f, "UPDATE {} ({} rows)", entity.name(), rows.len())
            }
            Self::DeleteRows { entity, ids } => {
                write!(f, "DELETE {} ({} ids)", entity.name(), ids.len())
            }
        }
    }
}

/// Raw driver output.
///
/// Entity rows carry one column per property, named by persisted name.
/// Writes report `affected` and return the stored rows for inserts and
/// row updates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub affected: u64,
}

impl ResultSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows,
            affected: 0,
        }
    }

    pub fn affected(affected: u64) -> Self {
        Self {
            affected,
            ..Self::default()
        }
    }

    /// Single-column, single-row result (counts, aggregates, exists).
    pub fn scalar(column: impl Into<String>, value: Value) -> Self {
        Self::new(vec![column.into()], vec![vec![value]])
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First column of the first row.
    pub fn first_value(&self) -> Option<&Value> {
        self.rows.first().and_then(|row| row.first())
    }
}

/// Blocking backend.
pub trait Driver: Send + Sync {
    fn execute(&self, statement: Statement) -> Result<ResultSet>;
}

/// Non-blocking backend.
///
/// Dropping the returned future must abandon the call; reactive streams
/// rely on this to cancel in-flight work.
#[async_trait]
pub trait AsyncDriver: Send + Sync {
    async fn execute_async(&self, statement: Statement) -> Result<ResultSet>;
}

impl<D: Driver + ?Sized> Driver for Arc<D> {
    fn execute(&self, statement: Statement) -> Result<ResultSet> {
        (**self).execute(statement)
    }
}

#[async_trait]
impl<D: AsyncDriver + ?Sized> AsyncDriver for Arc<D> {
    async fn execute_async(&self, statement: Statement) -> Result<ResultSet> {
        (**self).execute_async(statement).await
    }
}

/// Runs a blocking driver on tokio's blocking pool so it can back async and
/// reactive repositories.
pub struct BlockingAdapter<D> {
    inner: Arc<D>,
}

impl<D: Driver + 'static> BlockingAdapter<D> {
    pub fn new(driver: D) -> Self {
        Self {
            inner: Arc::new(driver),
        }
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }
}

impl<D: Driver + 'static> Driver for BlockingAdapter<D> {
    fn execute(&self, statement: Statement) -> Result<ResultSet> {
        self.inner.execute(statement)
    }
}

#[async_trait]
impl<D: Driver + 'static> AsyncDriver for BlockingAdapter<D> {
    async fn execute_async(&self, statement: Statement) -> Result<ResultSet> {
        let driver = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || driver.execute(statement)).await?
    }
}
