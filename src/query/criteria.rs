//! Criteria query: the structural, entity-typed query representation built
//! by the matcher engine (or by hand) and consumed once into a
//! [`QueryDescriptor`](crate::query::QueryDescriptor).

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::{DataError, Result};
use crate::model::PersistentEntity;
use crate::query::predicate::{CompareOp, Operand, Predicate};
use crate::query::sort::Order;

/// What a query returns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Projection {
    #[default]
    Entity,
    Property(String),
    /// Several properties at once, read into an introspected type.
    Properties(Vec<String>),
    Count,
    CountDistinct(String),
    Max(String),
    Min(String),
    Sum(String),
    Avg(String),
    Exists,
}

impl Projection {
    pub fn property(&self) -> Option<&str> {
        match self {
            Self::Property(p)
            | Self::CountDistinct(p)
            | Self::Max(p)
            | Self::Min(p)
            | Self::Sum(p)
            | Self::Avg(p) => Some(p),
            Self::Entity | Self::Properties(_) | Self::Count | Self::Exists => None,
        }
    }

    /// Whether the projection folds every matching row into one value.
    pub fn is_aggregate(&self) -> bool {
        !matches!(self, Self::Entity | Self::Property(_) | Self::Properties(_))
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity => f.write_str("*"),
            Self::Property(p) => f.write_str(p),
            Self::Properties(properties) => f.write_str(&properties.join(", ")),
            Self::Count => f.write_str("COUNT(*)"),
            Self::CountDistinct(p) => write!(f, "COUNT(DISTINCT {p})"),
            Self::Max(p) => write!(f, "MAX({p})"),
            Self::Min(p) => write!(f, "MIN({p})"),
            Self::Sum(p) => write!(f, "SUM({p})"),
            Self::Avg(p) => write!(f, "AVG({p})"),
            Self::Exists => f.write_str("EXISTS"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum JoinType {
    #[default]
    Inner,
    Left,
    Right,
    Fetch,
    LeftFetch,
}

impl JoinType {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().replace(['_', '-'], "").as_str() {
            "inner" | "default" => Some(Self::Inner),
            "left" | "outer" => Some(Self::Left),
            "right" => Some(Self::Right),
            "fetch" => Some(Self::Fetch),
            "leftfetch" => Some(Self::LeftFetch),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinSpec {
    pub path: String,
    #[serde(default)]
    pub kind: JoinType,
    #[serde(default)]
    pub alias: Option<String>,
}

impl JoinSpec {
    pub fn new(path: impl Into<String>, kind: JoinType) -> Self {
        Self {
            path: path.into(),
            kind,
            alias: None,
        }
    }
}

/// `SET property = value` of an update statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub property: String,
    pub value: Operand,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum StatementKind {
    #[default]
    Select,
    Update(Vec<Assignment>),
    Delete,
    Insert,
}

#[derive(Debug, Clone)]
pub struct CriteriaQuery {
    pub entity: PersistentEntity,
    pub kind: StatementKind,
    pub predicate: Option<Predicate>,
    pub projection: Projection,
    pub distinct: bool,
    pub joins: Vec<JoinSpec>,
    pub order: Vec<Order>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl CriteriaQuery {
    /// Operands bound to the identity properties, in identity order, when
    /// the restriction is nothing but identity equality.
    pub fn id_restriction(&self) -> Option<Vec<Operand>> {
        if !self.joins.is_empty() {
            return None;
        }
        let predicate = self.predicate.as_ref()?;
        let id_names: Vec<&str> = self
            .entity
            .id_properties()
            .into_iter()
            .map(|p| p.name())
            .collect();

        let conjuncts = predicate.conjuncts();
        if conjuncts.len() != id_names.len() {
            return None;
        }

        let mut bound: Vec<Option<Operand>> = vec![None; id_names.len()];
        for conjunct in conjuncts {
            let Predicate::Compare {
                property,
                op: CompareOp::Eq,
                value,
                ignore_case: false,
            } = conjunct
            else {
                return None;
            };
            let slot = id_names.iter().position(|name| name == property)?;
            if bound[slot].is_some() {
                return None;
            }
            bound[slot] = Some(value.clone());
        }
        bound.into_iter().collect()
    }

    pub fn has_only_id_restriction(&self) -> bool {
        self.id_restriction().is_some()
    }

    pub fn is_select(&self) -> bool {
        matches!(self.kind, StatementKind::Select)
    }
}

impl fmt::Display for CriteriaQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.entity.name();
        match &self.kind {
            StatementKind::Select => {
                f.write_str("SELECT ")?;
                if self.distinct {
                    f.write_str("DISTINCT ")?;
                }
                write!(f, "{} FROM {table}", self.projection)?;
            }
            StatementKind::Update(assignments) => {
                write!(f, "UPDATE {table} SET ")?;
                for (i, assignment) in assignments.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{} = {}", assignment.property, assignment.value)?;
                }
            }
            StatementKind::Delete => write!(f, "DELETE FROM {table}")?,
            StatementKind::Insert => write!(f, "INSERT INTO {table}")?,
        }
        for join in &self.joins {
            write!(f, " {:?} JOIN {}", join.kind, join.path)?;
        }
        if let Some(predicate) = &self.predicate {
            write!(f, " WHERE {predicate}")?;
        }
        if !self.order.is_empty() {
            f.write_str(" ORDER BY ")?;
            for (i, order) in self.order.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{order}")?;
            }
        }
        if let Some(limit) = self.limit {
            write!(f, " LIMIT {limit}")?;
        }
        if let Some(offset) = self.offset {
            write!(f, " OFFSET {offset}")?;
        }
        Ok(())
    }
}

/// Incremental builder for [`CriteriaQuery`].
///
/// Property references are validated against the root entity in
/// [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct CriteriaBuilder {
    query: CriteriaQuery,
}

impl CriteriaBuilder {
    fn new(entity: PersistentEntity, kind: StatementKind) -> Self {
        Self {
            query: CriteriaQuery {
                entity,
                kind,
                predicate: None,
                projection: Projection::Entity,
                distinct: false,
                joins: Vec::new(),
                order: Vec::new(),
                limit: None,
                offset: None,
            },
        }
    }

    pub fn select(entity: &PersistentEntity) -> Self {
        Self::new(entity.clone(), StatementKind::Select)
    }

    pub fn update(entity: &PersistentEntity) -> Self {
        Self::new(entity.clone(), StatementKind::Update(Vec::new()))
    }

    pub fn delete(entity: &PersistentEntity) -> Self {
        Self::new(entity.clone(), StatementKind::Delete)
    }

    pub fn insert(entity: &PersistentEntity) -> Self {
        Self::new(entity.clone(), StatementKind::Insert)
    }

    pub fn entity(&self) -> &PersistentEntity {
        &self.query.entity
    }

    /// AND the predicate onto the current restriction.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.query.predicate = Some(match self.query.predicate.take() {
            Some(current) => current.and(predicate),
            None => predicate,
        });
        self
    }

    pub fn project(mut self, projection: Projection) -> Self {
        self.query.projection = projection;
        self
    }

    pub fn distinct(mut self, distinct: bool) -> Self {
        self.query.distinct = distinct;
        self
    }

    pub fn join(mut self, join: JoinSpec) -> Self {
        self.query.joins.push(join);
        self
    }

    pub fn order_by(mut self, order: Order) -> Self {
        self.query.order.push(order);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.query.offset = Some(offset);
        self
    }

    pub fn set(mut self, property: impl Into<String>, value: Operand) -> Self {
        if let StatementKind::Update(assignments) = &mut self.query.kind {
            assignments.push(Assignment {
                property: property.into(),
                value,
            });
        }
        self
    }

    pub fn build(self) -> Result<CriteriaQuery> {
        let query = self.query;
        let entity = &query.entity;
        let mut referenced: Vec<&str> = Vec::new();

        if let Some(predicate) = &query.predicate {
            referenced.extend(predicate.properties());
        }
        if let Some(property) = query.projection.property() {
            referenced.push(property);
        }
        if let Projection::Properties(properties) = &query.projection {
            referenced.extend(properties.iter().map(String::as_str));
        }
        referenced.extend(query.order.iter().map(|o| o.property.as_str()));
        referenced.extend(query.joins.iter().map(|j| root_segment(&j.path)));

        if let StatementKind::Update(assignments) = &query.kind {
            let mut seen = HashSet::new();
            for assignment in assignments {
                if !seen.insert(assignment.property.as_str()) {
                    return Err(DataError::InvalidMethod {
                        method: entity.name().to_string(),
                        reason: format!("property '{}' assigned twice", assignment.property),
                    });
                }
                referenced.push(&assignment.property);
            }
        }

        for property in referenced {
            if entity.property(property).is_none() {
                return Err(DataError::UnknownProperty {
                    entity: entity.name().to_string(),
                    property: property.to_string(),
                });
            }
        }

        Ok(query)
    }
}

fn root_segment(path: &str) -> &str {
    path.split('.').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityDefinition, MappingStrategies, PropertyDef, TypeRef};

    fn book() -> PersistentEntity {
        EntityDefinition::new("Book")
            .property(PropertyDef::new("id", TypeRef::of::<i64>()).id())
            .property(PropertyDef::new("title", TypeRef::of::<String>()))
            .property(PropertyDef::new("pages", TypeRef::of::<i32>()))
            .build(&MappingStrategies::default())
            .unwrap()
    }

    fn enrollment() -> PersistentEntity {
        EntityDefinition::new("Enrollment")
            .property(PropertyDef::new("student", TypeRef::of::<i64>()).id())
            .property(PropertyDef::new("course", TypeRef::of::<i64>()).id())
            .property(PropertyDef::new("grade", TypeRef::of::<String>()))
            .build(&MappingStrategies::default())
            .unwrap()
    }

    #[test]
    fn detects_identity_only_restriction() {
        let entity = book();
        let query = CriteriaBuilder::select(&entity)
            .filter(Predicate::eq("id", Operand::param(0)))
            .build()
            .unwrap();
        assert!(query.has_only_id_restriction());

        let filtered = CriteriaBuilder::select(&entity)
            .filter(Predicate::eq("id", Operand::param(0)))
            .filter(Predicate::gt("pages", Operand::param(1)))
            .build()
            .unwrap();
        assert!(!filtered.has_only_id_restriction());

        let unfiltered = CriteriaBuilder::select(&entity).build().unwrap();
        assert!(!unfiltered.has_only_id_restriction());
    }

    #[test]
    fn composite_identity_needs_every_member() {
        let entity = enrollment();
        let both = CriteriaBuilder::select(&entity)
            .filter(Predicate::eq("course", Operand::param(1)))
            .filter(Predicate::eq("student", Operand::param(0)))
            .build()
            .unwrap();
        let operands = both.id_restriction().unwrap();
        assert_eq!(operands, vec![Operand::param(0), Operand::param(1)]);

        let partial = CriteriaBuilder::select(&entity)
            .filter(Predicate::eq("student", Operand::param(0)))
            .build()
            .unwrap();
        assert!(!partial.has_only_id_restriction());
    }

    #[test]
    fn join_disables_identity_shortcut() {
        let entity = book();
        let query = CriteriaBuilder::select(&entity)
            .filter(Predicate::eq("id", Operand::param(0)))
            .join(JoinSpec::new("title", JoinType::Fetch))
            .build()
            .unwrap();
        assert!(!query.has_only_id_restriction());
    }

    #[test]
    fn rejects_unknown_properties() {
        let err = CriteriaBuilder::select(&book())
            .filter(Predicate::eq("author", Operand::param(0)))
            .build()
            .unwrap_err();
        assert!(matches!(err, DataError::UnknownProperty { .. }));
    }

    #[test]
    fn renders_statement() {
        let query = CriteriaBuilder::select(&book())
            .filter(Predicate::gt("pages", Operand::param(0)))
            .order_by(Order::desc("title"))
            .limit(3)
            .build()
            .unwrap();
        assert_eq!(
            query.to_string(),
            "SELECT * FROM Book WHERE pages > ?0 ORDER BY title DESC LIMIT 3"
        );
    }
}
