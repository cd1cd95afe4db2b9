//! Delete, update, and save matchers.

use crate::core::{DataError, Result};
use crate::matcher::context::{Container, MethodMatchContext, ReturnAnalysis};
use crate::matcher::expression::{
    NameParts, ParamCursor, parse_criteria, parse_subject, resolve_property, split_name,
};
use crate::matcher::interceptor::{InterceptorKind, InterceptorMatch, InterceptorType, ResultShape};
use crate::matcher::restrict;
use crate::query::{CriteriaBuilder, CriteriaQuery, Operand, ParameterRef, Predicate};
use crate::runtime::dispatch::ArgRole;

type Matched = Result<(InterceptorMatch, CriteriaQuery)>;

/// Unit, an integer count, the entity, or a collection of the entity.
fn write_shape(returns: &ReturnAnalysis) -> Option<ResultShape> {
    match returns.container {
        Container::Unit => Some(ResultShape::Unit),
        Container::Single if returns.is_integer() => Some(ResultShape::Count),
        Container::Single if returns.is_entity() => Some(ResultShape::Entity),
        Container::Many if returns.is_entity() => Some(ResultShape::Entities),
        _ => None,
    }
}

fn finish(
    returns: &ReturnAnalysis,
    kind: InterceptorKind,
    shape: ResultShape,
    query: CriteriaQuery,
) -> Matched {
    Ok((
        InterceptorMatch {
            return_type: returns.element_type(),
            interceptor: InterceptorType::new(kind, returns.flavor),
            shape,
        },
        query,
    ))
}

/// Entity-argument methods take nothing but that argument.
fn single_entity_argument(ctx: &MethodMatchContext<'_>) -> Option<ArgRole> {
    match ctx.arg_roles() {
        [role @ (ArgRole::Entity | ArgRole::Entities)] => Some(*role),
        _ => None,
    }
}

/// The subject may only repeat modifiers or name the entity.
fn plain_subject(ctx: &MethodMatchContext<'_>, parts: &NameParts) -> Result<()> {
    let subject = parse_subject(&parts.subject);
    if subject.rest.is_empty() {
        return Ok(());
    }
    let spelled = subject.rest.concat().to_ascii_lowercase();
    let name = ctx.entity.name().to_ascii_lowercase();
    if spelled == name || spelled == format!("{name}s") {
        Ok(())
    } else {
        Err(ctx.invalid(format!("unexpected '{}' in method name", subject.rest.concat())))
    }
}

pub(super) fn matches_delete(ctx: &MethodMatchContext<'_>) -> Option<Matched> {
    let returns = ctx.returns()?;
    let shape = write_shape(returns)?;
    if !matches!(shape, ResultShape::Unit | ResultShape::Count) {
        return None;
    }
    Some(build_delete(ctx, returns, shape))
}

fn build_delete(ctx: &MethodMatchContext<'_>, returns: &ReturnAnalysis, shape: ResultShape) -> Matched {
    let parts = split_name(ctx.tokens());
    plain_subject(ctx, &parts)?;

    if let Some(role) = single_entity_argument(ctx) {
        if parts.criteria.is_some() {
            return Err(ctx.invalid("entity deletes cannot declare criteria"));
        }
        let kind = if role == ArgRole::Entity {
            InterceptorKind::DeleteOne
        } else {
            InterceptorKind::DeleteAllEntities
        };
        let query = CriteriaBuilder::delete(ctx.entity).build()?;
        return finish(returns, kind, shape, query);
    }

    if ctx.arg_roles().iter().any(|role| *role != ArgRole::Value) {
        return Err(ctx.invalid("criteria deletes only take query values"));
    }
    let query = restrict(ctx, &parts, CriteriaBuilder::delete(ctx.entity))?.build()?;
    finish(returns, InterceptorKind::DeleteAll, shape, query)
}

pub(super) fn matches_update(ctx: &MethodMatchContext<'_>) -> Option<Matched> {
    let returns = ctx.returns()?;
    let shape = write_shape(returns)?;
    Some(build_update(ctx, returns, shape))
}

fn build_update(ctx: &MethodMatchContext<'_>, returns: &ReturnAnalysis, shape: ResultShape) -> Matched {
    let parts = split_name(ctx.tokens());

    if let Some(role) = single_entity_argument(ctx) {
        plain_subject(ctx, &parts)?;
        if parts.criteria.is_some() {
            return Err(ctx.invalid("entity updates cannot declare criteria"));
        }
        let kind = match (role, shape) {
            (ArgRole::Entity, ResultShape::Unit | ResultShape::Entity) => InterceptorKind::UpdateEntity,
            (ArgRole::Entities, ResultShape::Unit | ResultShape::Entities) => {
                InterceptorKind::UpdateAllEntities
            }
            _ => return Err(ctx.invalid("entity updates return (), the entity, or its collection")),
        };
        let query = CriteriaBuilder::update(ctx.entity).build()?;
        return finish(returns, kind, shape, query);
    }

    if !matches!(shape, ResultShape::Unit | ResultShape::Count) {
        return Err(ctx.invalid("criteria updates return () or the number of updated rows"));
    }
    if ctx.arg_roles().iter().any(|role| *role != ArgRole::Value) {
        return Err(ctx.invalid("criteria updates only take query values"));
    }

    let targets = update_targets(ctx, &parts)?;
    let values = ctx.value_params();
    let mut builder = CriteriaBuilder::update(ctx.entity);

    // (ordinal, parameter name) of the values that become assignments
    let assigned: Vec<(usize, &str)> = match &parts.criteria {
        Some(words) => {
            // values named after an assigned property never feed the criteria
            let (reserved, criteria): (Vec<(usize, &str)>, Vec<(usize, &str)>) = values
                .iter()
                .map(|(ordinal, param)| (*ordinal, param.name.as_str()))
                .partition(|(_, name)| names_any(ctx, &targets, name));
            let mut cursor = ParamCursor::new(criteria);
            builder = builder.filter(parse_criteria(ctx, words, &mut cursor)?);
            let mut assigned = cursor.remaining();
            assigned.extend(reserved);
            assigned.sort_by_key(|(ordinal, _)| *ordinal);
            assigned
        }
        None => {
            let mut assigned = Vec::new();
            let mut predicate: Option<Predicate> = None;
            for (ordinal, param) in &values {
                let words = vec![param.name.clone()];
                match resolve_property(ctx.entity, &words) {
                    Some(property) if ctx.entity.is_identity(&property) => {
                        let condition = Predicate::eq(
                            property,
                            Operand::Parameter(ParameterRef::named(*ordinal, &param.name)),
                        );
                        predicate = Some(match predicate {
                            Some(current) => current.and(condition),
                            None => condition,
                        });
                    }
                    _ => assigned.push((*ordinal, param.name.as_str())),
                }
            }
            let predicate = predicate.ok_or_else(|| {
                ctx.invalid("updates without 'By' must take the identity as a parameter")
            })?;
            builder = builder.filter(predicate);
            assigned
        }
    };

    if assigned.is_empty() {
        return Err(ctx.invalid("nothing to update"));
    }

    if !targets.is_empty() && targets.len() != assigned.len() {
        return Err(ctx.invalid(format!(
            "{} properties named for update but {} values supplied",
            targets.len(),
            assigned.len()
        )));
    }

    for (property, (ordinal, name)) in bind_assignments(ctx, &targets, assigned)? {
        let Some(meta) = ctx.entity.property(&property) else {
            continue;
        };
        if meta.is_id() || meta.is_read_only() {
            return Err(ctx.invalid(format!("property '{property}' cannot be updated")));
        }
        builder = builder.set(property, Operand::Parameter(ParameterRef::named(ordinal, name)));
    }

    let query = builder.build()?;
    finish(returns, InterceptorKind::Update, shape, query)
}

/// Whether the parameter is named after one of the properties.
fn names_any(ctx: &MethodMatchContext<'_>, properties: &[String], param: &str) -> bool {
    resolve_property(ctx.entity, &[param.to_string()])
        .is_some_and(|resolved| properties.contains(&resolved))
}

/// Pair every assigned value with its property.
///
/// With properties named in the subject, a value named after one of them
/// goes there and the rest fill the remaining ones in declaration order.
/// Otherwise each value names its own property.
fn bind_assignments<'p>(
    ctx: &MethodMatchContext<'_>,
    targets: &[String],
    assigned: Vec<(usize, &'p str)>,
) -> Result<Vec<(String, (usize, &'p str))>> {
    if targets.is_empty() {
        return assigned
            .into_iter()
            .map(|(ordinal, name)| {
                let property = resolve_property(ctx.entity, &[name.to_string()]).ok_or_else(|| {
                    DataError::UnknownProperty {
                        entity: ctx.entity.name().to_string(),
                        property: name.to_string(),
                    }
                })?;
                Ok((property, (ordinal, name)))
            })
            .collect();
    }

    let mut slots: Vec<Option<(usize, &'p str)>> = vec![None; targets.len()];
    let mut unnamed = Vec::new();
    for (ordinal, name) in assigned {
        match targets.iter().position(|target| names_any(ctx, std::slice::from_ref(target), name)) {
            Some(at) if slots[at].is_none() => slots[at] = Some((ordinal, name)),
            Some(_) => {
                return Err(ctx.invalid(format!("more than one value for property '{name}'")));
            }
            None if resolve_property(ctx.entity, &[name.to_string()]).is_some() => {
                return Err(ctx.invalid(format!(
                    "parameter '{name}' names a property that is not updated"
                )));
            }
            None => unnamed.push((ordinal, name)),
        }
    }

    let mut unnamed = unnamed.into_iter();
    targets
        .iter()
        .zip(slots)
        .map(|(target, slot)| {
            let value = slot
                .or_else(|| unnamed.next())
                .ok_or_else(|| ctx.invalid(format!("missing value for property '{target}'")))?;
            Ok((target.clone(), value))
        })
        .collect()
}

/// Properties named in the subject: `updatePagesAndTitleById`.
fn update_targets(ctx: &MethodMatchContext<'_>, parts: &NameParts) -> Result<Vec<String>> {
    let subject = parse_subject(&parts.subject);
    if subject.rest.is_empty() {
        return Ok(Vec::new());
    }
    subject
        .rest
        .split(|word| word == "And")
        .map(|words| {
            resolve_property(ctx.entity, words).ok_or_else(|| DataError::UnknownProperty {
                entity: ctx.entity.name().to_string(),
                property: words.concat(),
            })
        })
        .collect()
}

pub(super) fn matches_save(ctx: &MethodMatchContext<'_>) -> Option<Matched> {
    let returns = ctx.returns()?;
    let shape = write_shape(returns)?;
    if shape == ResultShape::Count {
        return None;
    }
    Some(build_save(ctx, returns, shape))
}

fn build_save(ctx: &MethodMatchContext<'_>, returns: &ReturnAnalysis, shape: ResultShape) -> Matched {
    let parts = split_name(ctx.tokens());
    plain_subject(ctx, &parts)?;
    if parts.criteria.is_some() || !parts.order.is_empty() {
        return Err(ctx.invalid("save methods cannot declare criteria"));
    }

    let kind = match (single_entity_argument(ctx), shape) {
        (Some(ArgRole::Entity), ResultShape::Unit | ResultShape::Entity) => InterceptorKind::Save,
        (Some(ArgRole::Entities), ResultShape::Unit | ResultShape::Entities) => InterceptorKind::SaveAll,
        (Some(_), _) => return Err(ctx.invalid("save returns (), the entity, or its collection")),
        (None, _) => {
            return Err(ctx.invalid("save methods take one entity or a collection of entities"));
        }
    };
    let query = CriteriaBuilder::insert(ctx.entity).build()?;
    finish(returns, kind, shape, query)
}
