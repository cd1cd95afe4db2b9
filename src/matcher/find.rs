use crate::core::Result;
use crate::matcher::context::{Container, MethodMatchContext, ReturnAnalysis};
use crate::core::DataError;
use crate::matcher::expression::{parse_projection, parse_subject, resolve_property, split_name};
use crate::matcher::interceptor::{InterceptorKind, InterceptorMatch, InterceptorType, ResultShape};
use crate::matcher::restrict;
use crate::query::{CriteriaBuilder, CriteriaQuery, Projection};
use crate::runtime::dispatch::ArgRole;

/// Unit returns decline here; a generic Page or Slice role on a unit
/// return has no Rust signature to carry it.
pub(super) fn matches(
    ctx: &MethodMatchContext<'_>,
) -> Option<Result<(InterceptorMatch, CriteriaQuery)>> {
    let returns = ctx.returns()?;
    if returns.container == Container::Unit {
        return None;
    }
    Some(build(ctx, returns))
}

fn build(
    ctx: &MethodMatchContext<'_>,
    returns: &ReturnAnalysis,
) -> Result<(InterceptorMatch, CriteriaQuery)> {
    if ctx.has_role(ArgRole::Entity) || ctx.has_role(ArgRole::Entities) {
        return Err(ctx.invalid("find methods cannot take entity arguments"));
    }
    if ctx.count_role(ArgRole::Sort) > 1 || ctx.count_role(ArgRole::Pageable) > 1 {
        return Err(ctx.invalid("at most one Sort and one Pageable parameter"));
    }

    let parts = split_name(ctx.tokens());
    let subject = parse_subject(&parts.subject);
    let mut projection = parse_projection(ctx, &subject.rest, subject.distinct)?;
    if returns.is_introspected() {
        if projection != Projection::Entity {
            return Err(ctx.invalid(format!(
                "return type {} does not match projection {}",
                ctx.method.returns, projection
            )));
        }
        projection = introspected_projection(ctx, returns)?;
    }

    let mut builder = CriteriaBuilder::select(ctx.entity)
        .project(projection.clone())
        .distinct(subject.distinct);
    if let Some(limit) = subject.limit {
        builder = builder.limit(limit);
    }
    let query = restrict(ctx, &parts, builder)?.build()?;

    let projects_entity = projection == Projection::Entity;
    let projects_record = matches!(projection, Projection::Properties(_));
    if projects_entity != returns.is_entity() {
        return Err(ctx.invalid(format!(
            "return type {} does not match projection {}",
            ctx.method.returns, projection
        )));
    }

    let (kind, shape) = match (returns.container, projects_entity) {
        (Container::Many, _) if projection.is_aggregate() => {
            return Err(ctx.invalid("aggregate projections return a single value"));
        }
        (Container::Many, _) if projects_record => (InterceptorKind::FindAll, ResultShape::Records),
        (Container::Optional, _) if projects_record => {
            (InterceptorKind::FindOptional, ResultShape::OptionalRecord)
        }
        (Container::Single, _) if projects_record => (InterceptorKind::FindOne, ResultShape::Record),
        (Container::Many, true) => (InterceptorKind::FindAll, ResultShape::Entities),
        (Container::Many, false) => (InterceptorKind::FindAll, ResultShape::Scalars),
        (Container::Optional, true) => (InterceptorKind::FindOptional, ResultShape::OptionalEntity),
        (Container::Optional, false) => (InterceptorKind::FindOptional, ResultShape::OptionalScalar),
        (Container::Single, true) => (InterceptorKind::FindOne, ResultShape::Entity),
        (Container::Single, false) => (InterceptorKind::FindOne, ResultShape::Scalar),
        (Container::Page | Container::Slice, _) if !ctx.has_role(ArgRole::Pageable) => {
            return Err(ctx.invalid("Page and Slice results need a Pageable parameter"));
        }
        (Container::Page, _) => (InterceptorKind::FindPage, ResultShape::Page),
        (Container::Slice, _) => (InterceptorKind::FindSlice, ResultShape::Slice),
        (Container::Unit, _) => return Err(ctx.invalid("find methods must return a value")),
    };

    let mut interceptor = InterceptorType::new(kind, returns.flavor);
    if kind == InterceptorKind::FindOne && is_find_by_id(ctx, returns, &query) {
        interceptor = interceptor.with_kind(InterceptorKind::FindById);
    }

    Ok((
        InterceptorMatch {
            return_type: returns.element_type(),
            interceptor,
            shape,
        },
        query,
    ))
}

/// Properties read for each field of a registered result type.
fn introspected_projection(ctx: &MethodMatchContext<'_>, returns: &ReturnAnalysis) -> Result<Projection> {
    let name = returns.element.as_ref().map(|ty| ty.name()).unwrap_or_default();
    let fields = ctx.config.fields_of(name).unwrap_or_default();
    if fields.is_empty() {
        return Err(ctx.invalid(format!("result type {name} declares no fields")));
    }

    let properties = fields
        .iter()
        .map(|field| {
            resolve_property(ctx.entity, std::slice::from_ref(field)).ok_or_else(|| {
                DataError::UnknownProperty {
                    entity: ctx.entity.name().to_string(),
                    property: field.clone(),
                }
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Projection::Properties(properties))
}

/// Identity-only restriction, no declared joins, the exact root entity as
/// result, and implicit queries enabled.
fn is_find_by_id(ctx: &MethodMatchContext<'_>, returns: &ReturnAnalysis, query: &CriteriaQuery) -> bool {
    ctx.config.implicit_queries
        && ctx.method.joins.is_empty()
        && returns.container == Container::Single
        && returns.element.as_ref().is_some_and(|ty| ctx.is_entity_type(ty))
        && query.projection == Projection::Entity
        && query.limit.is_none()
        && query.order.is_empty()
        && query.has_only_id_restriction()
}

#[cfg(test)]
mod tests {
    use crate::config::DataConfig;
    use crate::core::DataError;
    use crate::matcher::interceptor::{Flavor, InterceptorKind, ResultShape};
    use crate::matcher::{MethodElement, MethodMatchContext, match_method};
    use crate::model::{EntityDefinition, MappingStrategies, PersistentEntity, PropertyDef, TypeRef};
    use crate::query::{JoinSpec, JoinType, Projection};

    fn book() -> PersistentEntity {
        EntityDefinition::new("Book")
            .property(PropertyDef::new("id", TypeRef::of::<i64>()).id())
            .property(PropertyDef::new("title", TypeRef::of::<String>()))
            .property(PropertyDef::new("pages", TypeRef::of::<i32>()))
            .build(&MappingStrategies::default())
            .unwrap()
    }

    fn kind_of(method: MethodElement, config: &DataConfig) -> crate::core::Result<(InterceptorKind, Flavor)> {
        let entity = book();
        let ctx = MethodMatchContext::new("BookRepository", &entity, &method, config);
        let matched = match_method(&ctx)?;
        let interceptor = matched.interceptor_match.interceptor;
        Ok((interceptor.kind, interceptor.flavor))
    }

    fn kind(signature: &str) -> crate::core::Result<(InterceptorKind, Flavor)> {
        kind_of(MethodElement::parse(signature).unwrap(), &DataConfig::default())
    }

    #[test]
    fn find_by_id_is_specialized_in_every_flavor() {
        assert_eq!(
            kind("findById(id: i64): Book").unwrap(),
            (InterceptorKind::FindById, Flavor::Sync)
        );
        assert_eq!(
            kind("findById(id: i64): Future<Book>").unwrap(),
            (InterceptorKind::FindById, Flavor::Async)
        );
        assert_eq!(
            kind("findById(id: i64): Mono<Book>").unwrap(),
            (InterceptorKind::FindById, Flavor::Reactive)
        );
    }

    #[test]
    fn extra_filter_keeps_generic_find_one() {
        assert_eq!(
            kind("findByIdAndTitle(id: i64, title: String): Book").unwrap().0,
            InterceptorKind::FindOne
        );
        assert_eq!(kind("findByTitle(title: String): Book").unwrap().0, InterceptorKind::FindOne);
    }

    #[test]
    fn find_by_id_requires_exact_entity_and_implicit_queries() {
        assert_eq!(
            kind("findById(id: i64): Option<Book>").unwrap().0,
            InterceptorKind::FindOptional
        );

        let config = DataConfig::default().implicit_queries(false);
        let method = MethodElement::parse("findById(id: i64): Book").unwrap();
        assert_eq!(kind_of(method, &config).unwrap().0, InterceptorKind::FindOne);

        let joined = MethodElement::parse("findById(id: i64): Book")
            .unwrap()
            .join(JoinSpec::new("title", JoinType::Fetch));
        assert_eq!(kind_of(joined, &DataConfig::default()).unwrap().0, InterceptorKind::FindOne);
    }

    #[test]
    fn named_parameters_bind_without_by_clause() {
        assert_eq!(kind("find(id: i64): Book").unwrap().0, InterceptorKind::FindById);
        assert_eq!(kind("findAll(): Vec<Book>").unwrap().0, InterceptorKind::FindAll);
    }

    #[test]
    fn pages_and_slices_need_pageable() {
        assert_eq!(
            kind("findByPagesGreaterThan(pages: i32, pageable: Pageable): Page<Book>")
                .unwrap()
                .0,
            InterceptorKind::FindPage
        );
        assert_eq!(
            kind("findAll(pageable: Pageable): Future<Slice<Book>>").unwrap(),
            (InterceptorKind::FindSlice, Flavor::Async)
        );
        assert!(matches!(
            kind("findByTitle(title: String): Page<Book>"),
            Err(DataError::InvalidMethod { .. })
        ));
    }

    #[test]
    fn projections_shape_scalar_results() {
        let entity = book();
        let method = MethodElement::parse("findDistinctTitleByPagesGreaterThan(pages: i32): Vec<String>")
            .unwrap();
        let config = DataConfig::default();
        let ctx = MethodMatchContext::new("BookRepository", &entity, &method, &config);
        let matched = match_method(&ctx).unwrap();
        assert_eq!(matched.query.projection, Projection::Property("title".into()));
        assert!(matched.query.distinct);
        assert_eq!(matched.interceptor_match.shape, ResultShape::Scalars);

        assert!(matches!(
            kind("findTitleByPages(pages: i32): Vec<Book>"),
            Err(DataError::InvalidMethod { .. })
        ));
    }

    #[test]
    fn registered_result_types_project_their_fields() {
        let entity = book();
        let config = DataConfig::default().introspected("BookSummary", &["title", "pages"]);
        let method = MethodElement::parse("findByTitle(title: String): Vec<BookSummary>").unwrap();
        let ctx = MethodMatchContext::new("BookRepository", &entity, &method, &config);
        let matched = match_method(&ctx).unwrap();
        assert_eq!(
            matched.query.projection,
            Projection::Properties(vec!["title".into(), "pages".into()])
        );
        assert_eq!(matched.interceptor_match.interceptor.kind, InterceptorKind::FindAll);
        assert_eq!(matched.interceptor_match.shape, ResultShape::Records);

        let method = MethodElement::parse("findById(id: i64): Option<BookSummary>").unwrap();
        let ctx = MethodMatchContext::new("BookRepository", &entity, &method, &config);
        let matched = match_method(&ctx).unwrap();
        assert_eq!(matched.interceptor_match.interceptor.kind, InterceptorKind::FindOptional);
        assert_eq!(matched.interceptor_match.shape, ResultShape::OptionalRecord);
    }

    #[test]
    fn registered_result_types_need_matching_properties() {
        let config = DataConfig::default().introspected("BookCard", &["title", "author"]);
        let method = MethodElement::parse("findAll(): Vec<BookCard>").unwrap();
        assert!(matches!(
            kind_of(method, &config),
            Err(DataError::UnknownProperty { .. })
        ));

        let config = DataConfig::default().introspected("BookSummary", &["title"]);
        let method = MethodElement::parse("findTitleByPages(pages: i32): Vec<BookSummary>").unwrap();
        assert!(matches!(
            kind_of(method, &config),
            Err(DataError::InvalidMethod { .. })
        ));
    }

    #[test]
    fn unit_returns_decline() {
        assert!(matches!(
            kind("findAll(pageable: Pageable): ()"),
            Err(DataError::NoMatcherFound(_))
        ));
    }

    #[test]
    fn unsupported_return_type_declines() {
        assert!(matches!(
            kind("findAll(): HashMap<String, Book>"),
            Err(DataError::NoMatcherFound(_))
        ));
    }

    #[test]
    fn streams_are_reactive_find_all() {
        assert_eq!(
            kind("findByTitleOrderByPagesDesc(title: String): Flux<Book>").unwrap(),
            (InterceptorKind::FindAll, Flavor::Reactive)
        );
    }
}
