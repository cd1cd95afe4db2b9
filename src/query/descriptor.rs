use std::sync::Arc;

use crate::core::{DataError, Result, Value};
use crate::model::PersistentEntity;
use crate::query::criteria::{CriteriaQuery, JoinSpec, Projection, StatementKind};
use crate::query::predicate::{Operand, Predicate};
use crate::query::sort::{Order, Pageable, Sort};

/// Bound, immutable query produced from a [`CriteriaQuery`].
///
/// Shared by every invocation of the method it was derived for. Call-time
/// arguments and `Sort`/`Pageable` refinements produce a [`PreparedQuery`]
/// without touching the descriptor.
#[derive(Debug)]
pub struct QueryDescriptor {
    entity: PersistentEntity,
    kind: StatementKind,
    predicate: Option<Predicate>,
    projection: Projection,
    distinct: bool,
    joins: Vec<JoinSpec>,
    order: Vec<Order>,
    limit: Option<usize>,
    offset: Option<usize>,
    id_lookup: Option<Vec<Operand>>,
    rendered: String,
}

impl From<CriteriaQuery> for QueryDescriptor {
    fn from(query: CriteriaQuery) -> Self {
        let id_lookup = if query.is_select() {
            query.id_restriction()
        } else {
            None
        };
        let rendered = query.to_string();
        let CriteriaQuery {
            entity,
            kind,
            predicate,
            projection,
            distinct,
            joins,
            order,
            limit,
            offset,
        } = query;

        Self {
            entity,
            kind,
            predicate,
            projection,
            distinct,
            joins,
            order,
            limit,
            offset,
            id_lookup,
            rendered,
        }
    }
}

impl QueryDescriptor {
    pub fn entity(&self) -> &PersistentEntity {
        &self.entity
    }

    pub fn kind(&self) -> &StatementKind {
        &self.kind
    }

    pub fn predicate(&self) -> Option<&Predicate> {
        self.predicate.as_ref()
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    pub fn joins(&self) -> &[JoinSpec] {
        &self.joins
    }

    pub fn order(&self) -> &[Order] {
        &self.order
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn offset(&self) -> Option<usize> {
        self.offset
    }

    /// Identity operands when the restriction is identity equality only.
    pub fn id_lookup(&self) -> Option<&[Operand]> {
        self.id_lookup.as_deref()
    }

    /// Number of invocation arguments the descriptor reads.
    pub fn parameter_count(&self) -> usize {
        let mut indexes: Vec<usize> = Vec::new();
        if let Some(predicate) = &self.predicate {
            indexes.extend(predicate.parameters().into_iter().map(|p| p.index));
        }
        if let StatementKind::Update(assignments) = &self.kind {
            for assignment in assignments {
                if let Operand::Parameter(param) = &assignment.value {
                    indexes.push(param.index);
                }
            }
        }
        indexes.into_iter().max().map_or(0, |max| max + 1)
    }

    /// Rendered statement, for logs and diagnostics.
    pub fn rendered(&self) -> &str {
        &self.rendered
    }

    /// Bind arguments and apply call-time ordering and paging.
    ///
    /// Static ordering comes first and `sort` orders are appended. A page
    /// request offsets past any static offset and never widens a static
    /// limit.
    pub fn refine(
        self: &Arc<Self>,
        arguments: Vec<Value>,
        sort: Option<&Sort>,
        pageable: Option<&Pageable>,
    ) -> PreparedQuery {
        let mut order = self.order.clone();
        if let Some(sort) = sort {
            order.extend(sort.orders().iter().cloned());
        }

        let mut limit = self.limit;
        let mut offset = self.offset;
        if let Some(pageable) = pageable {
            order.extend(pageable.sort().orders().iter().cloned());
            if let Some(size) = pageable.size() {
                limit = Some(limit.map_or(size, |current| current.min(size)));
                offset = Some(offset.unwrap_or(0).saturating_add(pageable.offset()));
            }
        }

        PreparedQuery {
            descriptor: Arc::clone(self),
            arguments,
            projection: self.projection.clone(),
            order,
            limit,
            offset,
        }
    }
}

/// A descriptor with arguments bound, ready for a driver.
#[derive(Debug, Clone)]
pub struct PreparedQuery {
    descriptor: Arc<QueryDescriptor>,
    arguments: Vec<Value>,
    projection: Projection,
    order: Vec<Order>,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl PreparedQuery {
    pub fn descriptor(&self) -> &QueryDescriptor {
        &self.descriptor
    }

    pub fn entity(&self) -> &PersistentEntity {
        &self.descriptor.entity
    }

    pub fn kind(&self) -> &StatementKind {
        &self.descriptor.kind
    }

    pub fn predicate(&self) -> Option<&Predicate> {
        self.descriptor.predicate.as_ref()
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn is_distinct(&self) -> bool {
        self.descriptor.distinct
    }

    pub fn order(&self) -> &[Order] {
        &self.order
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn offset(&self) -> Option<usize> {
        self.offset
    }

    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    pub fn bind(&self, operand: &Operand) -> Result<Value> {
        match operand {
            Operand::Literal(value) => Ok(value.clone()),
            Operand::Parameter(param) => {
                self.arguments.get(param.index).cloned().ok_or_else(|| {
                    DataError::TypeMismatch(format!(
                        "query on {} expects argument #{} but received {}",
                        self.descriptor.entity.name(),
                        param.index,
                        self.arguments.len()
                    ))
                })
            }
        }
    }

    /// Bound identity values for the find-by-id path.
    pub fn id_values(&self) -> Result<Option<Vec<Value>>> {
        match self.descriptor.id_lookup() {
            Some(operands) => operands
                .iter()
                .map(|operand| self.bind(operand))
                .collect::<Result<Vec<_>>>()
                .map(Some),
            None => Ok(None),
        }
    }

    /// Same restriction, counting instead of fetching.
    pub fn counting(&self) -> Self {
        Self {
            descriptor: Arc::clone(&self.descriptor),
            arguments: self.arguments.clone(),
            projection: Projection::Count,
            order: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityDefinition, MappingStrategies, PropertyDef, TypeRef};
    use crate::query::criteria::CriteriaBuilder;

    fn descriptor(limit: Option<usize>) -> Arc<QueryDescriptor> {
        let entity = EntityDefinition::new("Book")
            .property(PropertyDef::new("id", TypeRef::of::<i64>()).id())
            .property(PropertyDef::new("title", TypeRef::of::<String>()))
            .build(&MappingStrategies::default())
            .unwrap();
        let mut builder = CriteriaBuilder::select(&entity)
            .filter(Predicate::eq("title", Operand::param(0)))
            .order_by(Order::asc("title"));
        if let Some(limit) = limit {
            builder = builder.limit(limit);
        }
        Arc::new(QueryDescriptor::from(builder.build().unwrap()))
    }

    #[test]
    fn refine_appends_sort_and_pages() {
        let descriptor = descriptor(None);
        let sort = Sort::by([Order::desc("id")]);
        let prepared = descriptor.refine(
            vec![Value::from("Dune")],
            Some(&sort),
            Some(&Pageable::from(1, 5)),
        );
        assert_eq!(prepared.order().len(), 2);
        assert_eq!(prepared.limit(), Some(5));
        assert_eq!(prepared.offset(), Some(5));
        assert_eq!(descriptor.order().len(), 1);
        assert_eq!(prepared.bind(&Operand::param(0)).unwrap(), Value::from("Dune"));
    }

    #[test]
    fn page_never_widens_static_limit() {
        let prepared = descriptor(Some(3)).refine(Vec::new(), None, Some(&Pageable::from(0, 10)));
        assert_eq!(prepared.limit(), Some(3));
    }

    #[test]
    fn far_pages_saturate_the_offset() {
        let entity = EntityDefinition::new("Book")
            .property(PropertyDef::new("id", TypeRef::of::<i64>()).id())
            .build(&MappingStrategies::default())
            .unwrap();
        let descriptor = Arc::new(QueryDescriptor::from(
            CriteriaBuilder::select(&entity).offset(7).build().unwrap(),
        ));
        let prepared = descriptor.refine(Vec::new(), None, Some(&Pageable::from(usize::MAX, 10)));
        assert_eq!(prepared.offset(), Some(usize::MAX));
        assert_eq!(prepared.limit(), Some(10));
    }

    #[test]
    fn missing_argument_is_reported() {
        let prepared = descriptor(None).refine(Vec::new(), None, None);
        assert!(prepared.bind(&Operand::param(0)).is_err());
        assert_eq!(prepared.descriptor().parameter_count(), 1);
    }
}
