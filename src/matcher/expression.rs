//! Method-name grammar.
//!
//! ```text
//! <verb>[All|One][Distinct][First|Top<N>][<Projection>][By<Criteria>][OrderBy<Prop>[Asc|Desc]...]
//! ```
//!
//! Words are compared after capitalization, so camelCase and snake_case
//! names parse the same way. Property references pick the longest run of
//! words that names a property of the root entity.

use crate::core::{DataError, Result};
use crate::matcher::context::MethodMatchContext;
use crate::model::PersistentEntity;
use crate::query::{CompareOp, Operand, Order, ParameterRef, Predicate, Projection};

/// Method name split into its clauses; the verb is dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NameParts {
    pub subject: Vec<String>,
    /// `None` when the name has no `By` clause.
    pub criteria: Option<Vec<String>>,
    pub order: Vec<String>,
}

pub fn split_name(tokens: &[String]) -> NameParts {
    let mut parts = NameParts::default();
    let mut section = 0;
    let mut i = 1;
    while i < tokens.len() {
        let word = tokens[i].as_str();
        let next_is_by = tokens.get(i + 1).is_some_and(|next| next == "By");
        if word == "Order" && next_is_by {
            section = 2;
            i += 2;
            continue;
        }
        if word == "By" && section == 0 {
            // `findFirstByOrderByPages`: no criteria, only ordering
            let order_follows = tokens.get(i + 1).is_some_and(|next| next == "Order")
                && tokens.get(i + 2).is_some_and(|next| next == "By");
            if order_follows {
                i += 1;
                continue;
            }
            section = 1;
            parts.criteria = Some(Vec::new());
            i += 1;
            continue;
        }
        match section {
            0 => parts.subject.push(tokens[i].clone()),
            1 => {
                if let Some(criteria) = parts.criteria.as_mut() {
                    criteria.push(tokens[i].clone());
                }
            }
            _ => parts.order.push(tokens[i].clone()),
        }
        i += 1;
    }
    parts
}

/// Subject clause modifiers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Subject {
    pub distinct: bool,
    pub limit: Option<usize>,
    /// Words left once modifiers are removed.
    pub rest: Vec<String>,
}

pub fn parse_subject(words: &[String]) -> Subject {
    let mut subject = Subject::default();
    let mut i = 0;
    while i < words.len() {
        let word = words[i].as_str();
        match word {
            "All" | "One" if i == 0 => {}
            "Distinct" => subject.distinct = true,
            _ => {
                if let Some(limit) = limit_keyword(word) {
                    subject.limit = Some(limit);
                } else {
                    break;
                }
            }
        }
        i += 1;
    }
    subject.rest = words[i..].to_vec();
    subject
}

fn limit_keyword(word: &str) -> Option<usize> {
    for keyword in ["First", "Top"] {
        if let Some(digits) = word.strip_prefix(keyword) {
            if digits.is_empty() {
                return Some(1);
            }
            if let Ok(n) = digits.parse::<usize>() {
                return Some(n.max(1));
            }
        }
    }
    None
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Declared name of the property spelled by `words`, if any.
pub fn resolve_property(entity: &PersistentEntity, words: &[String]) -> Option<String> {
    if words.is_empty() {
        return None;
    }
    let wanted = normalize(&words.concat());
    entity
        .properties()
        .iter()
        .find(|property| normalize(property.name()) == wanted)
        .map(|property| property.name().to_string())
}

/// Whether `words` merely name the root entity (`findBook`, `findBooks`).
fn names_entity(entity: &PersistentEntity, words: &[String]) -> bool {
    let spelled = normalize(&words.concat());
    let name = normalize(entity.name());
    spelled == name || spelled == format!("{name}s")
}

/// Projection spelled by the subject words of a read method.
pub fn parse_projection(
    ctx: &MethodMatchContext<'_>,
    words: &[String],
    distinct: bool,
) -> Result<Projection> {
    if words.is_empty() || names_entity(ctx.entity, words) {
        return Ok(Projection::Entity);
    }

    let property = |rest: &[String]| {
        resolve_property(ctx.entity, rest).ok_or_else(|| unknown(ctx, rest))
    };

    let head = words[0].as_str();
    let rest = &words[1..];
    let projection = match head {
        "Max" => Projection::Max(property(rest)?),
        "Min" => Projection::Min(property(rest)?),
        "Sum" => Projection::Sum(property(rest)?),
        "Avg" | "Average" => Projection::Avg(property(rest)?),
        "Count" if rest.is_empty() => Projection::Count,
        "Count" if rest.first().is_some_and(|w| w == "Distinct") => {
            Projection::CountDistinct(property(&rest[1..])?)
        }
        "Count" if distinct => Projection::CountDistinct(property(rest)?),
        _ => Projection::Property(property(words)?),
    };
    Ok(projection)
}

fn unknown(ctx: &MethodMatchContext<'_>, words: &[String]) -> DataError {
    DataError::UnknownProperty {
        entity: ctx.entity.name().to_string(),
        property: words.concat(),
    }
}

/// Hands out query-value parameters.
///
/// A parameter named after the property being bound wins. Otherwise the
/// first unused parameter whose name resolves to no property is taken, so
/// `findByTitleStartingWith(prefix: String)` still binds by position. A
/// parameter named after some other property is never bound by position.
pub struct ParamCursor<'p> {
    params: Vec<(usize, &'p str)>,
    used: Vec<bool>,
}

impl<'p> ParamCursor<'p> {
    pub fn new(params: Vec<(usize, &'p str)>) -> Self {
        let used = vec![false; params.len()];
        Self { params, used }
    }

    pub fn next_operand(&mut self, ctx: &MethodMatchContext<'_>, property: &str) -> Result<Operand> {
        let wanted = normalize(property);
        let unused: Vec<usize> = (0..self.params.len()).filter(|&slot| !self.used[slot]).collect();

        let by_name = unused
            .iter()
            .copied()
            .find(|&slot| normalize(self.params[slot].1) == wanted);
        let slot = match by_name {
            Some(slot) => slot,
            None => {
                let positional = unused.iter().copied().find(|&slot| {
                    resolve_property(ctx.entity, &[self.params[slot].1.to_string()]).is_none()
                });
                match (positional, unused.first().copied()) {
                    (Some(slot), _) => slot,
                    (None, Some(other)) => {
                        return Err(ctx.invalid(format!(
                            "parameter '{}' names another property than '{property}'",
                            self.params[other].1
                        )));
                    }
                    (None, None) => {
                        return Err(ctx.invalid(format!("missing parameter for property '{property}'")));
                    }
                }
            }
        };

        self.used[slot] = true;
        let (ordinal, name) = self.params[slot];
        Ok(Operand::Parameter(ParameterRef::named(ordinal, name)))
    }

    /// Unused parameters, in declaration order.
    pub fn remaining(&self) -> Vec<(usize, &'p str)> {
        self.params
            .iter()
            .zip(&self.used)
            .filter(|(_, used)| !**used)
            .map(|(param, _)| *param)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConditionOp {
    Compare(CompareOp),
    NotLike,
    NotContains,
    Between,
    In,
    NotIn,
    IsNull,
    IsNotNull,
    IsEmpty,
    IsNotEmpty,
    True,
    False,
}

/// Operator keywords, longest spellings first within each family.
const OPERATORS: &[(&[&str], ConditionOp)] = &[
    (&["Is", "Not", "Null"], ConditionOp::IsNotNull),
    (&["Not", "Null"], ConditionOp::IsNotNull),
    (&["Is", "Null"], ConditionOp::IsNull),
    (&["Null"], ConditionOp::IsNull),
    (&["Is", "Not", "Empty"], ConditionOp::IsNotEmpty),
    (&["Not", "Empty"], ConditionOp::IsNotEmpty),
    (&["Is", "Empty"], ConditionOp::IsEmpty),
    (&["Empty"], ConditionOp::IsEmpty),
    (&["Is", "True"], ConditionOp::True),
    (&["True"], ConditionOp::True),
    (&["Is", "False"], ConditionOp::False),
    (&["False"], ConditionOp::False),
    (&["Greater", "Than", "Equals"], ConditionOp::Compare(CompareOp::Gte)),
    (&["Greater", "Than", "Equal"], ConditionOp::Compare(CompareOp::Gte)),
    (&["Greater", "Than"], ConditionOp::Compare(CompareOp::Gt)),
    (&["After"], ConditionOp::Compare(CompareOp::Gt)),
    (&["Less", "Than", "Equals"], ConditionOp::Compare(CompareOp::Lte)),
    (&["Less", "Than", "Equal"], ConditionOp::Compare(CompareOp::Lte)),
    (&["Less", "Than"], ConditionOp::Compare(CompareOp::Lt)),
    (&["Before"], ConditionOp::Compare(CompareOp::Lt)),
    (&["Is", "Between"], ConditionOp::Between),
    (&["Between"], ConditionOp::Between),
    (&["Not", "In"], ConditionOp::NotIn),
    (&["Is", "In"], ConditionOp::In),
    (&["In", "List"], ConditionOp::In),
    (&["In"], ConditionOp::In),
    (&["Not", "Like"], ConditionOp::NotLike),
    (&["Is", "Like"], ConditionOp::Compare(CompareOp::Like)),
    (&["Like"], ConditionOp::Compare(CompareOp::Like)),
    (&["I", "Like"], ConditionOp::Compare(CompareOp::ILike)),
    (&["Ilike"], ConditionOp::Compare(CompareOp::ILike)),
    (&["Is", "Starting", "With"], ConditionOp::Compare(CompareOp::StartsWith)),
    (&["Starting", "With"], ConditionOp::Compare(CompareOp::StartsWith)),
    (&["Starts", "With"], ConditionOp::Compare(CompareOp::StartsWith)),
    (&["Is", "Ending", "With"], ConditionOp::Compare(CompareOp::EndsWith)),
    (&["Ending", "With"], ConditionOp::Compare(CompareOp::EndsWith)),
    (&["Ends", "With"], ConditionOp::Compare(CompareOp::EndsWith)),
    (&["Not", "Containing"], ConditionOp::NotContains),
    (&["Not", "Contains"], ConditionOp::NotContains),
    (&["Is", "Containing"], ConditionOp::Compare(CompareOp::Contains)),
    (&["Containing"], ConditionOp::Compare(CompareOp::Contains)),
    (&["Contains"], ConditionOp::Compare(CompareOp::Contains)),
    (&["Is", "Not", "Equal"], ConditionOp::Compare(CompareOp::Ne)),
    (&["Not", "Equals"], ConditionOp::Compare(CompareOp::Ne)),
    (&["Not", "Equal"], ConditionOp::Compare(CompareOp::Ne)),
    (&["Is", "Not"], ConditionOp::Compare(CompareOp::Ne)),
    (&["Not"], ConditionOp::Compare(CompareOp::Ne)),
    (&["Is", "Equal"], ConditionOp::Compare(CompareOp::Eq)),
    (&["Equals"], ConditionOp::Compare(CompareOp::Eq)),
    (&["Equal"], ConditionOp::Compare(CompareOp::Eq)),
    (&["Is"], ConditionOp::Compare(CompareOp::Eq)),
];

const IGNORE_CASE: &[&[&str]] = &[&["Ignore", "Case"], &["Ignoring", "Case"]];

fn strip_suffix<'w>(words: &'w [String], suffix: &[&str]) -> Option<&'w [String]> {
    if words.len() < suffix.len() {
        return None;
    }
    let split = words.len() - suffix.len();
    words[split..]
        .iter()
        .zip(suffix)
        .all(|(word, expected)| word == expected)
        .then(|| &words[..split])
}

#[derive(Debug, Clone)]
struct Condition {
    property: String,
    op: ConditionOp,
    ignore_case: bool,
}

/// Longest property first, then an optional operator and `IgnoreCase`.
fn parse_condition(entity: &PersistentEntity, words: &[String]) -> Option<Condition> {
    for split in (1..=words.len()).rev() {
        let Some(property) = resolve_property(entity, &words[..split]) else {
            continue;
        };

        let mut tail = &words[split..];
        let mut ignore_case = false;
        for suffix in IGNORE_CASE {
            if let Some(stripped) = strip_suffix(tail, suffix) {
                tail = stripped;
                ignore_case = true;
                break;
            }
        }

        let op = if tail.is_empty() {
            Some(ConditionOp::Compare(CompareOp::Eq))
        } else {
            OPERATORS
                .iter()
                .find(|(keyword, _)| tail.len() == keyword.len() && tail.iter().zip(*keyword).all(|(w, k)| w == k))
                .map(|(_, op)| *op)
        };

        if let Some(op) = op {
            return Some(Condition {
                property,
                op,
                ignore_case,
            });
        }
    }
    None
}

impl Condition {
    /// `AllIgnoreCase` reaches every comparison that can ignore case; a
    /// condition's own `IgnoreCase` must be on one.
    fn into_predicate(
        self,
        ctx: &MethodMatchContext<'_>,
        params: &mut ParamCursor<'_>,
        ignore_all: bool,
    ) -> Result<Predicate> {
        let property = self.property;
        let ignore_case = self.ignore_case || ignore_all;
        let compare = |property: String, op: CompareOp, value: Operand| {
            let predicate = Predicate::compare(property, op, value);
            if ignore_case {
                predicate.ignoring_case()
            } else {
                predicate
            }
        };

        let predicate = match self.op {
            ConditionOp::Compare(op) => {
                let value = params.next_operand(ctx, &property)?;
                compare(property, op, value)
            }
            ConditionOp::NotLike => {
                let value = params.next_operand(ctx, &property)?;
                Predicate::not(compare(property, CompareOp::Like, value))
            }
            ConditionOp::NotContains => {
                let value = params.next_operand(ctx, &property)?;
                Predicate::not(compare(property, CompareOp::Contains, value))
            }
            _ if self.ignore_case => {
                return Err(ctx.invalid(format!(
                    "'IgnoreCase' cannot apply to {:?} on '{property}'",
                    self.op
                )));
            }
            ConditionOp::Between => {
                let low = params.next_operand(ctx, &property)?;
                let high = params.next_operand(ctx, &property)?;
                Predicate::between(property, low, high)
            }
            ConditionOp::In | ConditionOp::NotIn => {
                let values = params.next_operand(ctx, &property)?;
                Predicate::In {
                    property,
                    values,
                    negated: self.op == ConditionOp::NotIn,
                }
            }
            ConditionOp::IsNull => Predicate::is_null(property),
            ConditionOp::IsNotNull => Predicate::is_not_null(property),
            ConditionOp::IsEmpty | ConditionOp::IsNotEmpty => Predicate::IsEmpty {
                property,
                negated: self.op == ConditionOp::IsNotEmpty,
            },
            ConditionOp::True | ConditionOp::False => Predicate::IsTrue {
                property,
                expected: self.op == ConditionOp::True,
            },
        };
        Ok(predicate)
    }
}

/// `Id` names the identity when no property is literally called `id`.
fn is_identity_alias(entity: &PersistentEntity, words: &[String]) -> bool {
    words.len() == 1 && words[0] == "Id" && resolve_property(entity, words).is_none()
}

/// Equality on every identity property, in identity order.
fn identity_predicate(ctx: &MethodMatchContext<'_>, params: &mut ParamCursor<'_>) -> Result<Predicate> {
    let mut predicate: Option<Predicate> = None;
    for property in ctx.entity.id_properties() {
        let value = params.next_operand(ctx, property.name())?;
        let condition = Predicate::eq(property.name(), value);
        predicate = Some(match predicate {
            Some(current) => current.and(condition),
            None => condition,
        });
    }
    predicate.ok_or_else(|| ctx.invalid("entity has no identity"))
}

/// Parse the words after `By` into a predicate. `And` binds tighter than
/// `Or`.
pub fn parse_criteria(
    ctx: &MethodMatchContext<'_>,
    words: &[String],
    params: &mut ParamCursor<'_>,
) -> Result<Predicate> {
    let mut words = words;
    let mut ignore_all = false;
    for suffix in [["All", "Ignore", "Case"], ["All", "Ignoring", "Case"]] {
        if let Some(stripped) = strip_suffix(words, &suffix) {
            words = stripped;
            ignore_all = true;
            break;
        }
    }
    if words.is_empty() {
        return Err(ctx.invalid("empty criteria after 'By'"));
    }

    let mut groups: Vec<Vec<Predicate>> = vec![Vec::new()];
    let mut start = 0;
    while start < words.len() {
        let mut matched = None;
        for end in (start + 1..=words.len()).rev() {
            let at_boundary = end == words.len() || matches!(words[end].as_str(), "And" | "Or");
            if !at_boundary {
                continue;
            }
            if let Some(condition) = parse_condition(ctx.entity, &words[start..end]) {
                matched = Some((Some(condition), end));
                break;
            }
            if is_identity_alias(ctx.entity, &words[start..end]) {
                matched = Some((None, end));
                break;
            }
        }

        let predicate = match matched {
            Some((Some(condition), end)) => {
                start = end;
                condition.into_predicate(ctx, params, ignore_all)?
            }
            Some((None, end)) => {
                start = end;
                identity_predicate(ctx, params)?
            }
            None => return Err(unknown(ctx, &words[start..])),
        };
        if let Some(group) = groups.last_mut() {
            group.push(predicate);
        }

        if start < words.len() {
            if words[start] == "Or" {
                groups.push(Vec::new());
            }
            start += 1;
            if start == words.len() {
                return Err(ctx.invalid("dangling 'And'/'Or' in criteria"));
            }
        }
    }

    let mut disjuncts = groups.into_iter().filter_map(|group| {
        group.into_iter().reduce(Predicate::and)
    });
    let first = disjuncts
        .next()
        .ok_or_else(|| ctx.invalid("empty criteria after 'By'"))?;
    Ok(disjuncts.fold(first, Predicate::or))
}

/// Parse the words after `OrderBy`.
pub fn parse_order(ctx: &MethodMatchContext<'_>, words: &[String]) -> Result<Vec<Order>> {
    let mut orders = Vec::new();
    let mut start = 0;
    while start < words.len() {
        let mut matched = None;
        for end in (start + 1..=words.len()).rev() {
            let slice = &words[start..end];
            let (property_words, descending) = match slice.last().map(String::as_str) {
                Some("Desc") => (&slice[..slice.len() - 1], true),
                Some("Asc") => (&slice[..slice.len() - 1], false),
                _ => (slice, false),
            };
            if let Some(property) = resolve_property(ctx.entity, property_words) {
                matched = Some((property, descending, end));
                break;
            }
        }

        let Some((property, descending, end)) = matched else {
            return Err(unknown(ctx, &words[start..]));
        };
        orders.push(if descending {
            Order::desc(property)
        } else {
            Order::asc(property)
        });
        start = end;
        if words.get(start).is_some_and(|w| w == "And") {
            start += 1;
        }
    }
    Ok(orders)
}

/// Equality on each named parameter, for methods without a `By` clause.
pub fn parse_named_parameters(
    ctx: &MethodMatchContext<'_>,
    params: &mut ParamCursor<'_>,
) -> Result<Option<Predicate>> {
    let mut predicate: Option<Predicate> = None;
    while let Some(&(_, name)) = params.remaining().first() {
        let words = vec![name.to_string()];
        let property = resolve_property(ctx.entity, &words).ok_or_else(|| {
            DataError::UnknownProperty {
                entity: ctx.entity.name().to_string(),
                property: name.to_string(),
            }
        })?;
        let value = params.next_operand(ctx, &property)?;
        let condition = Predicate::eq(property, value);
        predicate = Some(match predicate {
            Some(current) => current.and(condition),
            None => condition,
        });
    }
    Ok(predicate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataConfig;
    use crate::matcher::element::MethodElement;
    use crate::model::{EntityDefinition, MappingStrategies, PropertyDef, TypeRef};

    fn person() -> PersistentEntity {
        EntityDefinition::new("Person")
            .property(PropertyDef::new("id", TypeRef::of::<i64>()).id())
            .property(PropertyDef::new("name", TypeRef::of::<String>()))
            .property(PropertyDef::new("age", TypeRef::of::<i32>()))
            .property(PropertyDef::new("brand", TypeRef::of::<String>()))
            .property(PropertyDef::new("date_created", TypeRef::of::<String>()))
            .property(PropertyDef::new("active", TypeRef::of::<bool>()))
            .build(&MappingStrategies::default())
            .unwrap()
    }

    fn criteria(signature: &str) -> Result<Predicate> {
        let entity = person();
        let method = MethodElement::parse(signature).unwrap();
        let config = DataConfig::default();
        let ctx = MethodMatchContext::new("PersonRepository", &entity, &method, &config);
        let parts = split_name(ctx.tokens());
        let values = ctx.value_params();
        let mut cursor =
            ParamCursor::new(values.iter().map(|(i, p)| (*i, p.name.as_str())).collect());
        parse_criteria(&ctx, parts.criteria.as_deref().unwrap_or(&[]), &mut cursor)
    }

    #[test]
    fn round_trips_two_predicate_conjunction() {
        let predicate =
            criteria("findByAgeGreaterThanAndNameEquals(age: i32, name: String): Vec<Person>")
                .unwrap();
        assert_eq!(predicate.to_string(), "(age > ?0 AND name = ?1)");
    }

    #[test]
    fn or_binds_looser_than_and() {
        let predicate = criteria(
            "findByNameOrAgeBetweenAndActiveTrue(name: String, low: i32, high: i32): Vec<Person>",
        )
        .unwrap();
        assert_eq!(
            predicate.to_string(),
            "(name = ?0 OR (age BETWEEN ?1 AND ?2 AND active IS TRUE))"
        );
    }

    #[test]
    fn property_names_may_contain_keywords() {
        let predicate = criteria("findByBrandAndDateCreatedIsNull(brand: String): Vec<Person>")
            .unwrap();
        assert_eq!(predicate.to_string(), "(brand = ?0 AND date_created IS NULL)");
    }

    #[test]
    fn ignore_case_variants() {
        let single = criteria("findByNameIgnoreCase(name: String): Vec<Person>").unwrap();
        assert_eq!(single.to_string(), "LOWER(name) = LOWER(?0)");

        let all = criteria(
            "findByNameStartingWithAndBrandAllIgnoreCase(n: String, b: String): Vec<Person>",
        )
        .unwrap();
        assert_eq!(
            all.to_string(),
            "(LOWER(name) STARTS WITH LOWER(?0) AND LOWER(brand) = LOWER(?1))"
        );
    }

    #[test]
    fn ignore_case_reaches_negated_operators() {
        let not_like = criteria("findByNameNotLikeIgnoreCase(name: String): Vec<Person>").unwrap();
        assert_eq!(not_like.to_string(), "NOT (LOWER(name) LIKE LOWER(?0))");

        let not_containing = criteria(
            "findByNameNotContainingAndBrandAllIgnoreCase(n: String, b: String): Vec<Person>",
        )
        .unwrap();
        assert_eq!(
            not_containing.to_string(),
            "(NOT (LOWER(name) CONTAINS LOWER(?0)) AND LOWER(brand) = LOWER(?1))"
        );
    }

    #[test]
    fn ignore_case_is_rejected_where_it_cannot_apply() {
        for signature in [
            "findByAgeBetweenIgnoreCase(low: i32, high: i32): Vec<Person>",
            "findByNameInIgnoreCase(names: Vec<String>): Vec<Person>",
            "findByNameIsNullIgnoreCase(): Vec<Person>",
        ] {
            assert!(
                matches!(criteria(signature), Err(DataError::InvalidMethod { .. })),
                "{signature}"
            );
        }

        let all = criteria(
            "findByAgeBetweenAndNameAllIgnoreCase(low: i32, high: i32, n: String): Vec<Person>",
        )
        .unwrap();
        assert_eq!(all.to_string(), "(age BETWEEN ?0 AND ?1 AND LOWER(name) = LOWER(?2))");
    }

    #[test]
    fn reports_unknown_property_and_missing_parameter() {
        assert!(matches!(
            criteria("findByShoeSize(size: i32): Vec<Person>"),
            Err(DataError::UnknownProperty { .. })
        ));
        assert!(matches!(
            criteria("findByNameAndAge(name: String): Vec<Person>"),
            Err(DataError::InvalidMethod { .. })
        ));
    }

    #[test]
    fn parameters_bind_by_name_before_position() {
        let predicate =
            criteria("findByNameAndAge(age: i32, name: String): Vec<Person>").unwrap();
        assert_eq!(predicate.to_string(), "(name = ?1 AND age = ?0)");

        let mixed = criteria("findByNameAndAge(age: i32, n: String): Vec<Person>").unwrap();
        assert_eq!(mixed.to_string(), "(name = ?1 AND age = ?0)");

        assert!(matches!(
            criteria("findByName(age: i32): Vec<Person>"),
            Err(DataError::InvalidMethod { .. })
        ));
    }

    #[test]
    fn splits_subject_criteria_and_order() {
        let tokens: Vec<String> = ["Find", "Top3", "By", "Age", "Order", "By", "Name", "Desc"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let parts = split_name(&tokens);
        assert_eq!(parts.subject, vec!["Top3"]);
        assert_eq!(parts.criteria, Some(vec!["Age".to_string()]));
        assert_eq!(parts.order, vec!["Name", "Desc"]);
        assert_eq!(parse_subject(&parts.subject).limit, Some(3));
    }

    #[test]
    fn order_directly_after_by_has_no_criteria() {
        let tokens: Vec<String> = ["Find", "First", "By", "Order", "By", "Pages", "Asc"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let parts = split_name(&tokens);
        assert_eq!(parts.subject, vec!["First"]);
        assert_eq!(parts.criteria, None);
        assert_eq!(parts.order, vec!["Pages", "Asc"]);
    }
}
