//! Method matcher engine.
//!
//! Classifies repository methods by name, parameters, and return type,
//! derives a [`CriteriaQuery`] for each, and selects the interceptor that
//! will execute it. Matchers are tried in configured priority order; the
//! first one that accepts a method decides it.

pub mod compiler;
pub mod context;
pub mod contract;
pub mod element;
pub mod expression;
pub mod interceptor;

mod aggregate;
mod find;
mod write;

use std::fmt;
use std::str::FromStr;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::core::{DataError, Result};
use crate::query::{CriteriaBuilder, CriteriaQuery};

pub use compiler::{CompiledRepository, RepositoryCompiler};
pub use context::{Container, MethodMatchContext, ReturnAnalysis, TypeRole};
pub use contract::ContractMethod;
pub use element::{
    Contract, EntityElement, MethodElement, ParameterElement, PropertyElement,
    RepositoryDefinition, RepositoryElement, TypeElement,
};
pub use interceptor::{Flavor, InterceptorKind, InterceptorMatch, InterceptorType, ResultShape};

use expression::{NameParts, ParamCursor, parse_criteria, parse_named_parameters, parse_order};

/// One matcher variant. Each recognizes its own verb prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatcherKind {
    Find,
    Exists,
    Count,
    Delete,
    Update,
    Save,
}

impl MatcherKind {
    pub fn default_order() -> [MatcherKind; 6] {
        [
            Self::Find,
            Self::Exists,
            Self::Count,
            Self::Delete,
            Self::Update,
            Self::Save,
        ]
    }

    /// Built-in verb prefixes.
    pub fn verbs(self) -> &'static [&'static str] {
        match self {
            Self::Find => &["find", "get", "query", "retrieve", "read", "search", "list", "stream"],
            Self::Exists => &["exists"],
            Self::Count => &["count"],
            Self::Delete => &["delete", "remove", "erase", "eliminate"],
            Self::Update => &["update", "modify"],
            Self::Save => &["save", "persist", "store", "insert"],
        }
    }

    fn accepts_verb(self, ctx: &MethodMatchContext<'_>) -> bool {
        let verb = ctx.verb();
        self.verbs().contains(&verb.as_str())
            || ctx
                .config
                .verbs_for(self)
                .any(|custom| custom.eq_ignore_ascii_case(&verb))
    }

    /// `None` when this matcher declines the method (verb or return type);
    /// otherwise the match or the reason the accepted method is invalid.
    pub fn try_match(self, ctx: &MethodMatchContext<'_>) -> Option<Result<MethodMatch>> {
        if !self.accepts_verb(ctx) {
            return None;
        }
        let outcome = match self {
            Self::Find => find::matches(ctx),
            Self::Exists => aggregate::matches_exists(ctx),
            Self::Count => aggregate::matches_count(ctx),
            Self::Delete => write::matches_delete(ctx),
            Self::Update => write::matches_update(ctx),
            Self::Save => write::matches_save(ctx),
        }?;
        Some(outcome.map(|(interceptor_match, query)| MethodMatch {
            matcher: self,
            interceptor_match,
            query,
            ambiguous_with: Vec::new(),
        }))
    }
}

impl fmt::Display for MatcherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Find => "find",
            Self::Exists => "exists",
            Self::Count => "count",
            Self::Delete => "delete",
            Self::Update => "update",
            Self::Save => "save",
        };
        f.write_str(name)
    }
}

impl FromStr for MatcherKind {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "find" => Ok(Self::Find),
            "exists" => Ok(Self::Exists),
            "count" => Ok(Self::Count),
            "delete" => Ok(Self::Delete),
            "update" => Ok(Self::Update),
            "save" => Ok(Self::Save),
            other => Err(DataError::Config(format!("unknown matcher '{other}'"))),
        }
    }
}

/// A successful match, before it is bound into the dispatch table.
#[derive(Debug, Clone)]
pub struct MethodMatch {
    pub matcher: MatcherKind,
    pub interceptor_match: InterceptorMatch,
    pub query: CriteriaQuery,
    /// Lower-priority matchers that also accepted the method.
    pub ambiguous_with: Vec<MatcherKind>,
}

/// Run the matcher chain over one method.
pub fn match_method(ctx: &MethodMatchContext<'_>) -> Result<MethodMatch> {
    let mut chosen: Option<(MatcherKind, Result<MethodMatch>)> = None;
    let mut ambiguous = Vec::new();

    for kind in &ctx.config.matcher_order {
        if let Some(outcome) = kind.try_match(ctx) {
            if chosen.is_none() {
                chosen = Some((*kind, outcome));
            } else {
                ambiguous.push(*kind);
            }
        }
    }

    let Some((kind, outcome)) = chosen else {
        return Err(DataError::NoMatcherFound(ctx.signature()));
    };

    let mut matched = outcome?;
    if !ambiguous.is_empty() {
        warn!(
            "Ambiguous match for {}: {} matcher chosen over {:?}",
            ctx.signature(),
            kind,
            ambiguous
        );
        matched.ambiguous_with = ambiguous;
    }
    debug!(
        "Matched {} with {} ({})",
        ctx.signature(),
        matched.interceptor_match.interceptor,
        matched.query
    );
    Ok(matched)
}

/// Apply the `By`/`OrderBy` clauses, named-parameter equality, and
/// declared joins. Every query-value parameter must be consumed.
pub(crate) fn restrict(
    ctx: &MethodMatchContext<'_>,
    parts: &NameParts,
    mut builder: CriteriaBuilder,
) -> Result<CriteriaBuilder> {
    let values = ctx.value_params();
    let mut cursor = ParamCursor::new(
        values
            .iter()
            .map(|(ordinal, param)| (*ordinal, param.name.as_str()))
            .collect(),
    );

    let predicate = match &parts.criteria {
        Some(words) => Some(parse_criteria(ctx, words, &mut cursor)?),
        None => parse_named_parameters(ctx, &mut cursor)?,
    };
    if let Some(predicate) = predicate {
        builder = builder.filter(predicate);
    }

    if let Some(&(_, unused)) = cursor.remaining().first() {
        return Err(ctx.invalid(format!("parameter '{unused}' is not used by the query")));
    }

    for order in parse_order(ctx, &parts.order)? {
        builder = builder.order_by(order);
    }
    for join in &ctx.method.joins {
        builder = builder.join(join.clone());
    }
    Ok(builder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataConfig;
    use crate::model::{EntityDefinition, MappingStrategies, PersistentEntity, PropertyDef, TypeRef};

    fn book() -> PersistentEntity {
        EntityDefinition::new("Book")
            .property(PropertyDef::new("id", TypeRef::of::<i64>()).id())
            .property(PropertyDef::new("title", TypeRef::of::<String>()))
            .property(PropertyDef::new("pages", TypeRef::of::<i32>()))
            .build(&MappingStrategies::default())
            .unwrap()
    }

    fn matched(signature: &str, config: &DataConfig) -> Result<MethodMatch> {
        let entity = book();
        let method = MethodElement::parse(signature).unwrap();
        let ctx = MethodMatchContext::new("BookRepository", &entity, &method, config);
        match_method(&ctx)
    }

    #[test]
    fn unknown_verb_finds_no_matcher() {
        let err = matched("zzzFetchAll(): Vec<Book>", &DataConfig::default()).unwrap_err();
        assert_eq!(
            err,
            DataError::NoMatcherFound("BookRepository.zzzFetchAll(): Vec<Book>".to_string())
        );
    }

    #[test]
    fn custom_verbs_extend_a_matcher() {
        let config = DataConfig::default().verb(MatcherKind::Find, "fetch");
        let found = matched("fetchByTitle(title: String): Vec<Book>", &config).unwrap();
        assert_eq!(found.matcher, MatcherKind::Find);
        assert_eq!(found.interceptor_match.interceptor.kind, InterceptorKind::FindAll);
    }

    #[test]
    fn ambiguity_is_resolved_by_priority_and_recorded() {
        let config = DataConfig::default().verb(MatcherKind::Count, "find");
        let found = matched("findMaxPagesByTitle(title: String): i32", &config).unwrap();
        assert_eq!(found.matcher, MatcherKind::Find);
        assert_eq!(found.ambiguous_with, vec![MatcherKind::Count]);

        let reordered = config.matcher_order(vec![
            MatcherKind::Count,
            MatcherKind::Find,
            MatcherKind::Exists,
            MatcherKind::Delete,
            MatcherKind::Update,
            MatcherKind::Save,
        ]);
        let err = matched("findMaxPagesByTitle(title: String): i32", &reordered).unwrap_err();
        assert!(matches!(err, DataError::InvalidMethod { .. }));
    }

    #[test]
    fn unused_parameters_are_rejected() {
        let err = matched(
            "findByTitle(title: String, pages: i32): Vec<Book>",
            &DataConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DataError::InvalidMethod { .. }));
    }
}
