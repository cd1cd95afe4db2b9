//! Count and exists matchers.

use crate::core::Result;
use crate::matcher::context::MethodMatchContext;
use crate::matcher::expression::{NameParts, parse_subject, resolve_property, split_name};
use crate::matcher::interceptor::{InterceptorKind, InterceptorMatch, InterceptorType, ResultShape};
use crate::matcher::restrict;
use crate::query::{CriteriaBuilder, CriteriaQuery, Projection};
use crate::runtime::dispatch::ArgRole;

pub(super) fn matches_count(
    ctx: &MethodMatchContext<'_>,
) -> Option<Result<(InterceptorMatch, CriteriaQuery)>> {
    let returns = ctx.returns()?;
    if !returns.is_integer() {
        return None;
    }
    Some(build(ctx, InterceptorKind::Count, ResultShape::Count))
}

pub(super) fn matches_exists(
    ctx: &MethodMatchContext<'_>,
) -> Option<Result<(InterceptorMatch, CriteriaQuery)>> {
    let returns = ctx.returns()?;
    if !returns.is_bool() {
        return None;
    }
    Some(build(ctx, InterceptorKind::Exists, ResultShape::Bool))
}

fn build(
    ctx: &MethodMatchContext<'_>,
    kind: InterceptorKind,
    shape: ResultShape,
) -> Result<(InterceptorMatch, CriteriaQuery)> {
    let roles = ctx.arg_roles();
    if roles.iter().any(|role| *role != ArgRole::Value) {
        return Err(ctx.invalid(format!(
            "{} methods only take query values",
            kind.name().to_ascii_lowercase()
        )));
    }

    let parts = split_name(ctx.tokens());
    let projection = projection(ctx, kind, &parts)?;
    let builder = CriteriaBuilder::select(ctx.entity).project(projection);
    let query = restrict(ctx, &parts, builder)?.build()?;

    let flavor = ctx.returns().map(|r| r.flavor).unwrap_or_default();
    Ok((
        InterceptorMatch {
            return_type: ctx.returns().map(|r| r.element_type()).unwrap_or_default(),
            interceptor: InterceptorType::new(kind, flavor),
            shape,
        },
        query,
    ))
}

fn projection(
    ctx: &MethodMatchContext<'_>,
    kind: InterceptorKind,
    parts: &NameParts,
) -> Result<Projection> {
    if kind == InterceptorKind::Exists {
        return Ok(Projection::Exists);
    }

    let subject = parse_subject(&parts.subject);
    if subject.rest.is_empty() || is_entity_name(ctx, &subject.rest) {
        return Ok(Projection::Count);
    }
    match resolve_property(ctx.entity, &subject.rest) {
        Some(property) if subject.distinct => Ok(Projection::CountDistinct(property)),
        _ => Err(ctx.invalid("count subject must be empty or Distinct<Property>")),
    }
}

fn is_entity_name(ctx: &MethodMatchContext<'_>, words: &[String]) -> bool {
    let spelled = words.concat().to_ascii_lowercase();
    let name = ctx.entity.name().to_ascii_lowercase();
    spelled == name || spelled == format!("{name}s")
}

#[cfg(test)]
mod tests {
    use crate::config::DataConfig;
    use crate::core::DataError;
    use crate::matcher::interceptor::InterceptorKind;
    use crate::matcher::{MethodElement, MethodMatch, MethodMatchContext, match_method};
    use crate::model::{EntityDefinition, MappingStrategies, PersistentEntity, PropertyDef, TypeRef};
    use crate::query::Projection;

    fn book() -> PersistentEntity {
        EntityDefinition::new("Book")
            .property(PropertyDef::new("id", TypeRef::of::<i64>()).id())
            .property(PropertyDef::new("title", TypeRef::of::<String>()))
            .build(&MappingStrategies::default())
            .unwrap()
    }

    fn matched(signature: &str) -> crate::core::Result<MethodMatch> {
        let entity = book();
        let method = MethodElement::parse(signature).unwrap();
        let config = DataConfig::default();
        let ctx = MethodMatchContext::new("BookRepository", &entity, &method, &config);
        match_method(&ctx)
    }

    #[test]
    fn counts_with_and_without_criteria() {
        let all = matched("count(): i64").unwrap();
        assert_eq!(all.interceptor_match.interceptor.kind, InterceptorKind::Count);
        assert!(all.query.predicate.is_none());

        let filtered = matched("countByTitleLike(pattern: String): u64").unwrap();
        assert_eq!(filtered.query.predicate.unwrap().to_string(), "title LIKE ?0");

        let distinct = matched("countDistinctTitle(): i64").unwrap();
        assert_eq!(distinct.query.projection, Projection::CountDistinct("title".into()));

        let books = matched("countBooks(): usize").unwrap();
        assert_eq!(books.query.projection, Projection::Count);
    }

    #[test]
    fn count_with_wrong_return_declines() {
        assert!(matches!(
            matched("countByTitle(title: String): Vec<Book>"),
            Err(DataError::NoMatcherFound(_))
        ));
    }

    #[test]
    fn exists_needs_bool() {
        let exists = matched("existsById(id: i64): bool").unwrap();
        assert_eq!(exists.interceptor_match.interceptor.kind, InterceptorKind::Exists);
        assert_eq!(exists.query.projection, Projection::Exists);
        assert!(matches!(
            matched("existsById(id: i64): i64"),
            Err(DataError::NoMatcherFound(_))
        ));
    }
}
