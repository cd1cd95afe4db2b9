//! Static dispatch table: method key to bound query and interceptor.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::{DataError, Result};
use crate::matcher::element::MethodElement;
use crate::matcher::interceptor::{Flavor, InterceptorKind, InterceptorMatch, InterceptorType};
use crate::matcher::{MatcherKind, MethodMatch};
use crate::query::{Operand, Predicate, QueryDescriptor, StatementKind};

/// What a declared parameter supplies at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArgRole {
    /// A query value, bound to the next `?n` placeholder.
    Value,
    Sort,
    Pageable,
    Entity,
    Entities,
}

/// A matched method, ready to execute.
#[derive(Debug)]
pub struct BoundMethod {
    pub key: String,
    pub name: String,
    pub signature: String,
    pub matcher: MatcherKind,
    pub interceptor_match: InterceptorMatch,
    pub descriptor: Arc<QueryDescriptor>,
    pub args: Vec<ArgRole>,
    /// Property each query value is compared with or assigned to, by value
    /// ordinal. Used to run values through property converters.
    pub value_properties: Vec<Option<String>>,
    pub ambiguous_with: Vec<MatcherKind>,
}

impl BoundMethod {
    pub fn new(repository: &str, method: &MethodElement, args: Vec<ArgRole>, matched: MethodMatch) -> Self {
        let value_count = args.iter().filter(|role| **role == ArgRole::Value).count();
        let value_properties = value_properties(&matched, value_count);
        Self {
            key: method.key(),
            name: method.name.clone(),
            signature: format!("{repository}.{}", method.signature()),
            matcher: matched.matcher,
            interceptor_match: matched.interceptor_match,
            descriptor: Arc::new(QueryDescriptor::from(matched.query)),
            args,
            value_properties,
            ambiguous_with: matched.ambiguous_with,
        }
    }

    pub fn interceptor(&self) -> InterceptorType {
        self.interceptor_match.interceptor
    }

    pub fn kind(&self) -> InterceptorKind {
        self.interceptor_match.interceptor.kind
    }

    pub fn flavor(&self) -> Flavor {
        self.interceptor_match.interceptor.flavor
    }
}

impl fmt::Display for BoundMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.signature, self.interceptor_match)
    }
}

fn value_properties(matched: &MethodMatch, value_count: usize) -> Vec<Option<String>> {
    fn bind(property: &str, operand: &Operand, slots: &mut [Option<String>]) {
        if let Operand::Parameter(param) = operand {
            if let Some(slot) = slots.get_mut(param.index) {
                slot.get_or_insert_with(|| property.to_string());
            }
        }
    }

    fn visit(predicate: &Predicate, slots: &mut [Option<String>]) {
        match predicate {
            Predicate::And(children) | Predicate::Or(children) => {
                for child in children {
                    visit(child, slots);
                }
            }
            Predicate::Not(inner) => visit(inner, slots),
            Predicate::Compare { property, value, .. } => bind(property, value, slots),
            Predicate::Between {
                property,
                low,
                high,
            } => {
                bind(property, low, slots);
                bind(property, high, slots);
            }
            Predicate::In {
                property, values, ..
            } => bind(property, values, slots),
            Predicate::IsNull { .. } | Predicate::IsEmpty { .. } | Predicate::IsTrue { .. } => {}
        }
    }

    let mut slots = vec![None; value_count];
    if let Some(predicate) = &matched.query.predicate {
        visit(predicate, &mut slots);
    }
    if let StatementKind::Update(assignments) = &matched.query.kind {
        for assignment in assignments {
            bind(&assignment.property, &assignment.value, &mut slots);
        }
    }
    slots
}

/// Bound methods of one repository, keyed by [`MethodElement::key`].
#[derive(Debug, Default)]
pub struct DispatchTable {
    methods: HashMap<String, Arc<BoundMethod>>,
    order: Vec<String>,
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a method, returning the one it replaced.
    pub fn insert(&mut self, method: BoundMethod) -> Option<Arc<BoundMethod>> {
        let key = method.key.clone();
        let previous = self.methods.insert(key.clone(), Arc::new(method));
        if previous.is_none() {
            self.order.push(key);
        }
        previous
    }

    pub fn get(&self, key: &str) -> Option<&Arc<BoundMethod>> {
        self.methods.get(key)
    }

    /// Look a method up by its full key, or by name when the name is not
    /// overloaded.
    pub fn resolve(&self, key_or_name: &str) -> Result<&Arc<BoundMethod>> {
        if let Some(method) = self.methods.get(key_or_name) {
            return Ok(method);
        }
        let mut candidates = self.iter().filter(|method| method.name == key_or_name);
        match (candidates.next(), candidates.next()) {
            (Some(method), None) => Ok(method),
            (Some(_), Some(_)) => Err(DataError::InvalidMethod {
                method: key_or_name.to_string(),
                reason: "method is overloaded; call it by its full key".to_string(),
            }),
            (None, _) => Err(DataError::NoMatcherFound(key_or_name.to_string())),
        }
    }

    /// Methods in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<BoundMethod>> {
        self.order.iter().filter_map(|key| self.methods.get(key))
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataConfig;
    use crate::matcher::{MethodMatchContext, match_method};
    use crate::model::{EntityDefinition, MappingStrategies, PersistentEntity, PropertyDef, TypeRef};

    fn book() -> PersistentEntity {
        EntityDefinition::new("Book")
            .property(PropertyDef::new("id", TypeRef::of::<i64>()).id())
            .property(PropertyDef::new("title", TypeRef::of::<String>()))
            .property(PropertyDef::new("pages", TypeRef::of::<i32>()))
            .build(&MappingStrategies::default())
            .unwrap()
    }

    fn bind(entity: &PersistentEntity, signature: &str) -> BoundMethod {
        let method = MethodElement::parse(signature).unwrap();
        let config = DataConfig::default();
        let ctx = MethodMatchContext::new("BookRepository", entity, &method, &config);
        let roles = ctx.arg_roles().to_vec();
        let matched = match_method(&ctx).unwrap();
        BoundMethod::new("BookRepository", &method, roles, matched)
    }

    #[test]
    fn records_the_property_behind_each_value() {
        let entity = book();
        let bound = bind(
            &entity,
            "findByTitleAndPagesBetween(title: String, low: i32, high: i32, sort: Sort): Vec<Book>",
        );
        assert_eq!(
            bound.value_properties,
            vec![
                Some("title".to_string()),
                Some("pages".to_string()),
                Some("pages".to_string())
            ]
        );
        assert_eq!(bound.args.last(), Some(&ArgRole::Sort));
    }

    #[test]
    fn resolves_by_key_or_unique_name() {
        let entity = book();
        let mut table = DispatchTable::new();
        table.insert(bind(&entity, "findByTitle(title: String): Vec<Book>"));
        table.insert(bind(&entity, "findAll(): Vec<Book>"));
        table.insert(bind(&entity, "findAll(sort: Sort): Vec<Book>"));

        assert_eq!(table.len(), 3);
        assert_eq!(table.resolve("findByTitle").unwrap().kind(), InterceptorKind::FindAll);
        assert!(table.resolve("findAll(Sort): Vec<Book>").is_ok());
        assert!(matches!(
            table.resolve("findAll"),
            Err(DataError::InvalidMethod { .. })
        ));
        assert!(matches!(
            table.resolve("missing"),
            Err(DataError::NoMatcherFound(_))
        ));
    }
}
