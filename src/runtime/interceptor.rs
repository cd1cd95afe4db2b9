//! Interceptor execution: bind call arguments, plan the backend statements
//! for the method's family, and shape the driver output into an
//! [`Outcome`].
//!
//! The plan and the shaping are shared by every flavor; only the way the
//! statements reach the driver differs.

use tracing::{Level, event};

use crate::config::DataConfig;
use crate::core::{DataError, FromValue, Result, Value};
use crate::matcher::interceptor::{InterceptorKind, ResultShape};
use crate::model::{Entity, Introspected, PersistentEntity};
use crate::query::{Page, Pageable, Projection, Slice, Sort};
use crate::runtime::dispatch::{ArgRole, BoundMethod};
use crate::runtime::driver::{AsyncDriver, Driver, ResultSet, Statement};
use crate::runtime::hydrate::{entity_value, hydrate, persist_row, persist_value};

/// One call argument.
#[derive(Debug, Clone)]
pub enum Arg<E> {
    Value(Value),
    Entity(E),
    Entities(Vec<E>),
    Sort(Sort),
    Pageable(Pageable),
}

impl<E> Arg<E> {
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Value(value.into())
    }

    fn role(&self) -> ArgRole {
        match self {
            Self::Value(_) => ArgRole::Value,
            Self::Entity(_) => ArgRole::Entity,
            Self::Entities(_) => ArgRole::Entities,
            Self::Sort(_) => ArgRole::Sort,
            Self::Pageable(_) => ArgRole::Pageable,
        }
    }
}

impl<E> From<Value> for Arg<E> {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl<E> From<Sort> for Arg<E> {
    fn from(sort: Sort) -> Self {
        Self::Sort(sort)
    }
}

impl<E> From<Pageable> for Arg<E> {
    fn from(pageable: Pageable) -> Self {
        Self::Pageable(pageable)
    }
}

/// Result of one repository call, shaped by the declared return type.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<E> {
    Unit,
    Entity(E),
    Optional(Option<E>),
    Entities(Vec<E>),
    Page(Page<E>),
    Slice(Slice<E>),
    Scalar(Value),
    OptionalScalar(Option<Value>),
    Scalars(Vec<Value>),
    /// Field values of an introspected type, in field order.
    Record(Vec<Value>),
    OptionalRecord(Option<Vec<Value>>),
    Records(Vec<Vec<Value>>),
    Count(u64),
    Exists(bool),
}

fn unexpected<T, E>(wanted: &str, outcome: &Outcome<E>) -> Result<T> {
    Err(DataError::TypeMismatch(format!(
        "expected {wanted} result, got {}",
        outcome.describe()
    )))
}

impl<E> Outcome<E> {
    /// Short name of the variant, for diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Entity(_) => "entity",
            Self::Optional(_) => "optional entity",
            Self::Entities(_) => "entity list",
            Self::Page(_) => "page",
            Self::Slice(_) => "slice",
            Self::Scalar(_) => "scalar",
            Self::OptionalScalar(_) => "optional scalar",
            Self::Scalars(_) => "scalar list",
            Self::Record(_) => "record",
            Self::OptionalRecord(_) => "optional record",
            Self::Records(_) => "record list",
            Self::Count(_) => "count",
            Self::Exists(_) => "exists",
        }
    }

    pub fn into_entity(self) -> Result<E> {
        match self {
            Self::Entity(entity) => Ok(entity),
            other => unexpected("entity", &other),
        }
    }

    pub fn into_optional(self) -> Result<Option<E>> {
        match self {
            Self::Optional(entity) => Ok(entity),
            Self::Entity(entity) => Ok(Some(entity)),
            other => unexpected("optional entity", &other),
        }
    }

    pub fn into_entities(self) -> Result<Vec<E>> {
        match self {
            Self::Entities(entities) => Ok(entities),
            Self::Page(page) => Ok(page.into_content()),
            Self::Slice(slice) => Ok(slice.into_content()),
            other => unexpected("entity list", &other),
        }
    }

    pub fn into_page(self) -> Result<Page<E>> {
        match self {
            Self::Page(page) => Ok(page),
            other => unexpected("page", &other),
        }
    }

    pub fn into_slice(self) -> Result<Slice<E>> {
        match self {
            Self::Slice(slice) => Ok(slice),
            other => unexpected("slice", &other),
        }
    }

    /// Scalar converted to a Rust value.
    pub fn into_scalar<T: FromValue>(self) -> Result<T> {
        match self {
            Self::Scalar(value) => T::from_value(value),
            Self::OptionalScalar(value) => T::from_value(value.unwrap_or(Value::Null)),
            Self::Count(count) => T::from_value(Value::Integer(count as i64)),
            other => unexpected("scalar", &other),
        }
    }

    pub fn into_scalars<T: FromValue>(self) -> Result<Vec<T>> {
        match self {
            Self::Scalars(values) => values.into_iter().map(T::from_value).collect(),
            other => unexpected("scalar list", &other),
        }
    }

    pub fn into_projection<T: Introspected>(self) -> Result<T> {
        match self {
            Self::Record(values) => T::from_values(values),
            other => unexpected("record", &other),
        }
    }

    pub fn into_optional_projection<T: Introspected>(self) -> Result<Option<T>> {
        match self {
            Self::OptionalRecord(values) => values.map(T::from_values).transpose(),
            Self::Record(values) => T::from_values(values).map(Some),
            other => unexpected("optional record", &other),
        }
    }

    pub fn into_projections<T: Introspected>(self) -> Result<Vec<T>> {
        match self {
            Self::Records(rows) => rows.into_iter().map(T::from_values).collect(),
            other => unexpected("record list", &other),
        }
    }

    pub fn into_count(self) -> Result<u64> {
        match self {
            Self::Count(count) => Ok(count),
            other => unexpected("count", &other),
        }
    }

    pub fn into_exists(self) -> Result<bool> {
        match self {
            Self::Exists(exists) => Ok(exists),
            other => unexpected("exists", &other),
        }
    }

    /// Split multi-valued outcomes into one outcome per element.
    pub(crate) fn into_elements(self) -> Vec<Self> {
        match self {
            Self::Entities(entities) => entities.into_iter().map(Self::Entity).collect(),
            Self::Scalars(values) => values.into_iter().map(Self::Scalar).collect(),
            Self::Records(rows) => rows.into_iter().map(Self::Record).collect(),
            Self::Optional(None) | Self::OptionalScalar(None) | Self::OptionalRecord(None) => {
                Vec::new()
            }
            Self::OptionalRecord(Some(values)) => vec![Self::Record(values)],
            Self::Optional(Some(entity)) => vec![Self::Entity(entity)],
            Self::OptionalScalar(Some(value)) => vec![Self::Scalar(value)],
            other => vec![other],
        }
    }
}

/// Statements to run for one call, and what shaping needs to know.
#[derive(Debug)]
pub struct Plan {
    pub statements: Vec<Statement>,
    pageable: Option<Pageable>,
}

/// Bind `args` to `method` and decide which statements to run.
pub fn plan<E: Entity>(method: &BoundMethod, config: &DataConfig, args: Vec<Arg<E>>) -> Result<Plan> {
    if args.len() != method.args.len() {
        return Err(DataError::TypeMismatch(format!(
            "{} takes {} arguments but was called with {}",
            method.signature,
            method.args.len(),
            args.len()
        )));
    }

    let descriptor = &method.descriptor;
    let entity = descriptor.entity();
    let mut values = Vec::new();
    let mut sort = None;
    let mut pageable = None;
    let mut rows: Vec<Vec<Value>> = Vec::new();

    for (position, (arg, role)) in args.into_iter().zip(&method.args).enumerate() {
        if arg.role() != *role {
            return Err(DataError::TypeMismatch(format!(
                "argument #{position} of {} must be {role:?}, got {:?}",
                method.signature,
                arg.role()
            )));
        }
        match arg {
            Arg::Value(value) => {
                let property = method
                    .value_properties
                    .get(values.len())
                    .and_then(|p| p.as_deref());
                values.push(persist_value(entity, property, value)?);
            }
            Arg::Entity(item) => rows.push(persist_row(entity, item.to_values())?),
            Arg::Entities(items) => {
                for item in items {
                    rows.push(persist_row(entity, item.to_values())?);
                }
            }
            Arg::Sort(s) => sort = Some(s),
            Arg::Pageable(p) => pageable = Some(p),
        }
    }

    let kind = method.kind();
    if matches!(kind, InterceptorKind::FindPage | InterceptorKind::FindSlice) {
        let requested = pageable.unwrap_or_default();
        pageable = Some(if requested.is_unpaged() {
            Pageable::from(0, config.default_page_size).with_sort(requested.sort().clone())
        } else {
            requested.limited_to(config.max_page_size)
        });
    }

    let prepared = descriptor.refine(values, sort.as_ref(), pageable.as_ref());
    let ids = |rows: &[Vec<Value>]| -> Vec<Vec<Value>> {
        rows.iter().map(|row| entity.id_values(row)).collect()
    };

    let statements = match kind {
        InterceptorKind::FindById => {
            let id = prepared.id_values()?.ok_or_else(|| {
                DataError::InvalidMethod {
                    method: method.signature.clone(),
                    reason: "find-by-id without an identity restriction".to_string(),
                }
            })?;
            vec![Statement::FindById {
                entity: entity.clone(),
                id,
            }]
        }
        InterceptorKind::FindPage => {
            let counting = prepared.counting();
            vec![Statement::Query(prepared), Statement::Query(counting)]
        }
        InterceptorKind::FindAll
        | InterceptorKind::FindOne
        | InterceptorKind::FindOptional
        | InterceptorKind::FindSlice
        | InterceptorKind::Count
        | InterceptorKind::Exists => vec![Statement::Query(prepared)],
        InterceptorKind::DeleteAll | InterceptorKind::Update => vec![Statement::Execute(prepared)],
        InterceptorKind::DeleteOne | InterceptorKind::DeleteAllEntities => {
            vec![Statement::DeleteRows {
                entity: entity.clone(),
                ids: ids(&rows),
            }]
        }
        InterceptorKind::UpdateEntity | InterceptorKind::UpdateAllEntities => {
            vec![Statement::UpdateRows {
                entity: entity.clone(),
                rows,
            }]
        }
        InterceptorKind::Save | InterceptorKind::SaveAll => vec![Statement::Insert {
            entity: entity.clone(),
            rows,
        }],
    };

    Ok(Plan {
        statements,
        pageable,
    })
}

/// Run a plan on a blocking driver.
pub fn run<D: Driver + ?Sized>(driver: &D, plan: &mut Plan) -> Result<Vec<ResultSet>> {
    let mut results = Vec::with_capacity(plan.statements.len());
    for statement in plan.statements.drain(..) {
        event!(Level::TRACE, statement = %statement, "executing");
        results.push(driver.execute(statement)?);
    }
    Ok(results)
}

/// Run a plan on an async driver.
pub async fn run_async<D: AsyncDriver + ?Sized>(driver: &D, plan: &mut Plan) -> Result<Vec<ResultSet>> {
    let mut results = Vec::with_capacity(plan.statements.len());
    for statement in plan.statements.drain(..) {
        event!(Level::TRACE, statement = %statement, "executing");
        results.push(driver.execute_async(statement).await?);
    }
    Ok(results)
}

/// Shape driver output into the method's declared result.
pub fn finish<E: Entity>(method: &BoundMethod, plan: Plan, results: Vec<ResultSet>) -> Result<Outcome<E>> {
    let entity = method.descriptor.entity();
    let mut results = results.into_iter();
    let main = results.next().unwrap_or_default();

    let outcome = match method.interceptor_match.shape {
        ResultShape::Unit => Outcome::Unit,
        ResultShape::Entity => {
            let mut entities = entities::<E>(entity, main)?;
            if entities.is_empty() {
                return Err(DataError::EmptyResult(format!(
                    "{} returned no {}",
                    method.signature,
                    entity.name()
                )));
            }
            Outcome::Entity(entities.swap_remove(0))
        }
        ResultShape::OptionalEntity => {
            Outcome::Optional(entities::<E>(entity, main)?.into_iter().next())
        }
        ResultShape::Entities => Outcome::Entities(entities::<E>(entity, main)?),
        ResultShape::Page => {
            let total = results
                .next()
                .and_then(|count| count.first_value().and_then(Value::as_i64))
                .unwrap_or(0)
                .max(0) as u64;
            let content = entities::<E>(entity, main)?;
            Outcome::Page(Page::new(content, plan.pageable.unwrap_or_default(), total))
        }
        ResultShape::Slice => Outcome::Slice(Slice::new(
            entities::<E>(entity, main)?,
            plan.pageable.unwrap_or_default(),
        )),
        ResultShape::Scalar => {
            let value = scalars(method, main)?.into_iter().next().ok_or_else(|| {
                DataError::EmptyResult(format!("{} returned no value", method.signature))
            })?;
            Outcome::Scalar(value)
        }
        ResultShape::OptionalScalar => Outcome::OptionalScalar(
            scalars(method, main)?
                .into_iter()
                .next()
                .filter(|value| !value.is_null()),
        ),
        ResultShape::Scalars => Outcome::Scalars(scalars(method, main)?),
        ResultShape::Record => {
            let record = records(method, main)?.into_iter().next().ok_or_else(|| {
                DataError::EmptyResult(format!("{} returned no row", method.signature))
            })?;
            Outcome::Record(record)
        }
        ResultShape::OptionalRecord => {
            Outcome::OptionalRecord(records(method, main)?.into_iter().next())
        }
        ResultShape::Records => Outcome::Records(records(method, main)?),
        ResultShape::Count if method.kind().is_read() => {
            let count = main.first_value().and_then(Value::as_i64).unwrap_or(0);
            Outcome::Count(count.max(0) as u64)
        }
        ResultShape::Count => Outcome::Count(main.affected),
        ResultShape::Bool => Outcome::Exists(
            main.first_value()
                .map(|value| bool::from_value(value.clone()))
                .transpose()?
                .unwrap_or(false),
        ),
    };
    Ok(outcome)
}

fn entities<E: Entity>(entity: &PersistentEntity, result: ResultSet) -> Result<Vec<E>> {
    let ResultSet { columns, rows, .. } = result;
    rows.into_iter()
        .map(|row| hydrate::<E>(entity, &columns, row))
        .collect()
}

/// First column of every row, converted back when it reads a property.
fn scalars(method: &BoundMethod, result: ResultSet) -> Result<Vec<Value>> {
    let entity = method.descriptor.entity();
    let property = match method.descriptor.projection() {
        Projection::Property(p) | Projection::Max(p) | Projection::Min(p) => Some(p.as_str()),
        _ => None,
    };
    result
        .rows
        .into_iter()
        .map(|row| {
            let value = row.into_iter().next().unwrap_or(Value::Null);
            entity_value(entity, property, value)
        })
        .collect()
}

/// Projected rows, each value converted back through its property.
fn records(method: &BoundMethod, result: ResultSet) -> Result<Vec<Vec<Value>>> {
    let entity = method.descriptor.entity();
    let properties: &[String] = match method.descriptor.projection() {
        Projection::Properties(properties) => properties,
        _ => &[],
    };
    result
        .rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .zip(properties)
                .map(|(value, property)| entity_value(entity, Some(property.as_str()), value))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{MethodElement, MethodMatchContext, match_method};
    use crate::model::{EntityDefinition, MappingStrategies, PropertyDef, TypeRef};

    #[derive(Debug, Clone, PartialEq)]
    struct Book {
        id: Option<i64>,
        title: String,
    }

    impl Entity for Book {
        fn definition() -> EntityDefinition {
            EntityDefinition::new("Book")
                .property(PropertyDef::new("id", TypeRef::optional::<i64>()).id().generated())
                .property(PropertyDef::new("title", TypeRef::of::<String>()))
        }

        fn to_values(&self) -> Vec<Value> {
            vec![self.id.into(), self.title.clone().into()]
        }

        fn from_values(values: Vec<Value>) -> Result<Self> {
            let mut values = values.into_iter();
            Ok(Self {
                id: FromValue::from_value(values.next().unwrap_or(Value::Null))?,
                title: FromValue::from_value(values.next().unwrap_or(Value::Null))?,
            })
        }
    }

    fn bound(signature: &str) -> BoundMethod {
        let entity = PersistentEntity::of::<Book>(&MappingStrategies::default()).unwrap();
        let method = MethodElement::parse(signature).unwrap();
        let config = DataConfig::default();
        let ctx = MethodMatchContext::new("BookRepository", &entity, &method, &config);
        let roles = ctx.arg_roles().to_vec();
        let matched = match_method(&ctx).unwrap();
        BoundMethod::new("BookRepository", &method, roles, matched)
    }

    #[test]
    fn find_by_id_plans_an_identity_lookup() {
        let method = bound("findById(id: i64): Book");
        let plan = plan::<Book>(&method, &DataConfig::default(), vec![Arg::value(7i64)]).unwrap();
        assert!(matches!(
            plan.statements.as_slice(),
            [Statement::FindById { id, .. }] if id == &vec![Value::Integer(7)]
        ));
    }

    #[test]
    fn pages_issue_a_count_and_use_the_default_size() {
        let method = bound("findAll(pageable: Pageable): Page<Book>");
        let config = DataConfig::default().default_page_size(5);
        let plan = plan::<Book>(&method, &config, vec![Arg::Pageable(Pageable::unpaged())]).unwrap();
        assert_eq!(plan.statements.len(), 2);
        let Statement::Query(query) = &plan.statements[0] else {
            panic!("expected a query");
        };
        assert_eq!(query.limit(), Some(5));
        let Statement::Query(count) = &plan.statements[1] else {
            panic!("expected a count");
        };
        assert_eq!(count.projection(), &Projection::Count);
    }

    #[test]
    fn rejects_mismatched_arguments() {
        let method = bound("findByTitle(title: String): Vec<Book>");
        assert!(matches!(
            plan::<Book>(&method, &DataConfig::default(), vec![Arg::Sort(Sort::unsorted())]),
            Err(DataError::TypeMismatch(_))
        ));
        assert!(matches!(
            plan::<Book>(&method, &DataConfig::default(), Vec::new()),
            Err(DataError::TypeMismatch(_))
        ));
    }

    #[test]
    fn shapes_missing_entity_as_empty_result() {
        let method = bound("findByTitle(title: String): Book");
        let plan = plan::<Book>(&method, &DataConfig::default(), vec![Arg::value("x")]).unwrap();
        let result = finish::<Book>(&method, plan, vec![ResultSet::empty()]);
        assert!(matches!(result, Err(DataError::EmptyResult(_))));
    }

    #[test]
    fn shapes_rows_into_entities() {
        let method = bound("findByTitle(title: String): Vec<Book>");
        let plan = plan::<Book>(&method, &DataConfig::default(), vec![Arg::value("Dune")]).unwrap();
        let rows = ResultSet::new(
            vec!["id".into(), "title".into()],
            vec![vec![Value::Integer(1), Value::from("Dune")]],
        );
        let outcome = finish::<Book>(&method, plan, vec![rows]).unwrap();
        assert_eq!(
            outcome.into_entities().unwrap(),
            vec![Book {
                id: Some(1),
                title: "Dune".into()
            }]
        );
    }
}
