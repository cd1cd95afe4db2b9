use crate::config::DataConfig;
use crate::core::DataError;
use crate::matcher::element::{MethodElement, ParameterElement, TypeElement};
use crate::matcher::interceptor::Flavor;
use crate::model::PersistentEntity;
use crate::model::naming::split_words;
use crate::runtime::dispatch::ArgRole;

const PRIMITIVES: &[&str] = &[
    "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32", "u64", "u128", "usize", "f32",
    "f64", "bool", "char",
];

const INTEGERS: &[&str] = &[
    "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32", "u64", "u128", "usize",
];

const BASIC_TYPES: &[&str] = &[
    "String",
    "str",
    "Uuid",
    "NaiveDate",
    "NaiveTime",
    "NaiveDateTime",
    "DateTime",
    "Decimal",
    "BigDecimal",
    "Value",
];

const COLLECTIONS: &[&str] = &[
    "Vec",
    "VecDeque",
    "List",
    "Set",
    "HashSet",
    "BTreeSet",
    "Iterable",
    "Collection",
];

/// Role a type plays in a repository method signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeRole {
    Unit,
    Primitive,
    Basic,
    Entity,
    /// A registered result type read field by field from entity properties.
    Introspected,
    Collection,
    Optional,
    Page,
    Slice,
    Future,
    Stream,
    Single,
    Sort,
    Pageable,
    Unknown,
}

/// Result container once the flavor wrapper is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Unit,
    Single,
    Optional,
    Many,
    Page,
    Slice,
}

/// A return type that passed the compatibility gate.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnAnalysis {
    pub flavor: Flavor,
    pub container: Container,
    /// `None` for unit.
    pub element: Option<TypeElement>,
    pub element_role: TypeRole,
}

impl ReturnAnalysis {
    pub fn is_entity(&self) -> bool {
        self.element_role == TypeRole::Entity
    }

    pub fn is_introspected(&self) -> bool {
        self.element_role == TypeRole::Introspected
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self.element_role, TypeRole::Primitive | TypeRole::Basic)
    }

    pub fn is_integer(&self) -> bool {
        self.container == Container::Single
            && self
                .element
                .as_ref()
                .is_some_and(|ty| INTEGERS.contains(&ty.name()))
    }

    pub fn is_bool(&self) -> bool {
        self.container == Container::Single
            && self.element.as_ref().is_some_and(|ty| ty.is_named("bool"))
    }

    pub fn element_type(&self) -> TypeElement {
        self.element.clone().unwrap_or_default()
    }
}

/// Ephemeral state around one candidate method while matchers inspect it.
pub struct MethodMatchContext<'a> {
    pub entity: &'a PersistentEntity,
    pub method: &'a MethodElement,
    pub config: &'a DataConfig,
    pub repository: &'a str,
    tokens: Vec<String>,
    returns: Option<ReturnAnalysis>,
    roles: Vec<ArgRole>,
}

impl<'a> MethodMatchContext<'a> {
    pub fn new(
        repository: &'a str,
        entity: &'a PersistentEntity,
        method: &'a MethodElement,
        config: &'a DataConfig,
    ) -> Self {
        let tokens = split_words(&method.name)
            .into_iter()
            .map(|word| capitalize(&word))
            .collect();
        let mut context = Self {
            entity,
            method,
            config,
            repository,
            tokens,
            returns: None,
            roles: Vec::new(),
        };
        context.returns = context.analyze_return(&method.returns);
        context.roles = method
            .parameters
            .iter()
            .map(|param| context.arg_role(&param.ty))
            .collect();
        context
    }

    /// Method name split into capitalized words.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn verb(&self) -> String {
        self.tokens
            .first()
            .map(|verb| verb.to_ascii_lowercase())
            .unwrap_or_default()
    }

    /// `None` when the declared return type fails the compatibility gate.
    pub fn returns(&self) -> Option<&ReturnAnalysis> {
        self.returns.as_ref()
    }

    pub fn arg_roles(&self) -> &[ArgRole] {
        &self.roles
    }

    /// Parameters bound as query values, with their ordinal among values.
    pub fn value_params(&self) -> Vec<(usize, &'a ParameterElement)> {
        self.method
            .parameters
            .iter()
            .zip(&self.roles)
            .filter(|(_, role)| **role == ArgRole::Value)
            .map(|(param, _)| param)
            .enumerate()
            .collect()
    }

    pub fn has_role(&self, role: ArgRole) -> bool {
        self.roles.contains(&role)
    }

    pub fn count_role(&self, role: ArgRole) -> usize {
        self.roles.iter().filter(|r| **r == role).count()
    }

    pub fn signature(&self) -> String {
        format!("{}.{}", self.repository, self.method.signature())
    }

    pub fn invalid(&self, reason: impl Into<String>) -> DataError {
        DataError::InvalidMethod {
            method: self.signature(),
            reason: reason.into(),
        }
    }

    pub fn is_entity_type(&self, ty: &TypeElement) -> bool {
        ty.args().is_empty() && ty.name() == self.entity.name()
    }

    pub fn role_of(&self, ty: &TypeElement) -> TypeRole {
        let name = ty.name();
        if ty.is_unit() {
            TypeRole::Unit
        } else if self.is_entity_type(ty) {
            TypeRole::Entity
        } else if PRIMITIVES.contains(&name) {
            TypeRole::Primitive
        } else if BASIC_TYPES.contains(&name) {
            TypeRole::Basic
        } else if ty.args().is_empty() && self.config.fields_of(name).is_some() {
            TypeRole::Introspected
        } else if name == "Option" && ty.args().len() == 1 {
            TypeRole::Optional
        } else if COLLECTIONS.contains(&name) && ty.args().len() == 1 {
            TypeRole::Collection
        } else if name == self.config.page_type {
            TypeRole::Page
        } else if name == self.config.slice_type {
            TypeRole::Slice
        } else if self.config.future_types.iter().any(|t| t == name) {
            TypeRole::Future
        } else if self.config.stream_types.iter().any(|t| t == name) {
            TypeRole::Stream
        } else if self.config.single_types.iter().any(|t| t == name) {
            TypeRole::Single
        } else if name == "Sort" {
            TypeRole::Sort
        } else if name == "Pageable" {
            TypeRole::Pageable
        } else {
            TypeRole::Unknown
        }
    }

    fn arg_role(&self, ty: &TypeElement) -> ArgRole {
        match self.role_of(ty) {
            TypeRole::Sort => ArgRole::Sort,
            TypeRole::Pageable => ArgRole::Pageable,
            TypeRole::Entity => ArgRole::Entity,
            TypeRole::Collection
                if ty.first_arg().is_some_and(|inner| self.is_entity_type(inner)) =>
            {
                ArgRole::Entities
            }
            _ => ArgRole::Value,
        }
    }

    /// Return-type compatibility gate.
    fn analyze_return(&self, ty: &TypeElement) -> Option<ReturnAnalysis> {
        let (flavor, inner, streamed) = match self.role_of(ty) {
            TypeRole::Future => (Flavor::Async, ty.first_arg()?, false),
            TypeRole::Single => (Flavor::Reactive, ty.first_arg()?, false),
            TypeRole::Stream => (Flavor::Reactive, ty.first_arg()?, true),
            _ => (Flavor::Sync, ty, false),
        };

        if streamed {
            let role = self.element_role(inner)?;
            return Some(ReturnAnalysis {
                flavor,
                container: Container::Many,
                element: Some(inner.clone()),
                element_role: role,
            });
        }

        let (container, element) = match self.role_of(inner) {
            TypeRole::Unit => {
                return Some(ReturnAnalysis {
                    flavor,
                    container: Container::Unit,
                    element: None,
                    element_role: TypeRole::Unit,
                });
            }
            TypeRole::Optional => (Container::Optional, inner.first_arg()?),
            TypeRole::Collection => (Container::Many, inner.first_arg()?),
            TypeRole::Page => (Container::Page, inner.first_arg()?),
            TypeRole::Slice => (Container::Slice, inner.first_arg()?),
            TypeRole::Entity
            | TypeRole::Introspected
            | TypeRole::Primitive
            | TypeRole::Basic => (Container::Single, inner),
            _ => return None,
        };

        let role = self.element_role(element)?;
        if matches!(container, Container::Page | Container::Slice) && role != TypeRole::Entity {
            return None;
        }
        Some(ReturnAnalysis {
            flavor,
            container,
            element: Some(element.clone()),
            element_role: role,
        })
    }

    fn element_role(&self, ty: &TypeElement) -> Option<TypeRole> {
        match self.role_of(ty) {
            role @ (TypeRole::Entity
            | TypeRole::Introspected
            | TypeRole::Primitive
            | TypeRole::Basic) => Some(role),
            _ => None,
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityDefinition, MappingStrategies, PropertyDef, TypeRef};

    fn book() -> PersistentEntity {
        EntityDefinition::new("Book")
            .property(PropertyDef::new("id", TypeRef::of::<i64>()).id())
            .property(PropertyDef::new("title", TypeRef::of::<String>()))
            .build(&MappingStrategies::default())
            .unwrap()
    }

    fn analyze(signature: &str) -> Option<ReturnAnalysis> {
        let entity = book();
        let method = MethodElement::parse(signature).unwrap();
        let config = DataConfig::default();
        let ctx = MethodMatchContext::new("BookRepository", &entity, &method, &config);
        ctx.returns().cloned()
    }

    #[test]
    fn unwraps_flavor_containers() {
        let future = analyze("findAll(): Future<Page<Book>>").unwrap();
        assert_eq!(future.flavor, Flavor::Async);
        assert_eq!(future.container, Container::Page);
        assert!(future.is_entity());

        let flux = analyze("findAll(): Flux<Book>").unwrap();
        assert_eq!(flux.flavor, Flavor::Reactive);
        assert_eq!(flux.container, Container::Many);

        let mono = analyze("findById(id: i64): Mono<Option<Book>>").unwrap();
        assert_eq!(mono.container, Container::Optional);
    }

    #[test]
    fn gate_rejects_unknown_types() {
        assert!(analyze("findAll(): Vec<Frobnicator>").is_none());
        assert!(analyze("findAll(): Page<String>").is_none());
        assert!(analyze("count(): i64").unwrap().is_integer());
        assert!(analyze("exists(): bool").unwrap().is_bool());
    }

    #[test]
    fn registered_result_types_pass_the_gate() {
        let entity = book();
        let config = DataConfig::default().introspected("BookSummary", &["title"]);
        let gate = |signature: &str| {
            let method = MethodElement::parse(signature).unwrap();
            MethodMatchContext::new("BookRepository", &entity, &method, &config)
                .returns()
                .cloned()
        };

        let many = gate("findAll(): Vec<BookSummary>").unwrap();
        assert_eq!(many.container, Container::Many);
        assert!(many.is_introspected());
        assert!(!many.is_entity());

        assert_eq!(gate("findOne(): BookSummary").unwrap().container, Container::Single);
        assert!(gate("findAll(): Flux<BookSummary>").unwrap().is_introspected());
        assert!(gate("findAll(): Page<BookSummary>").is_none());
        assert!(analyze("findAll(): Vec<BookSummary>").is_none());
    }

    #[test]
    fn snake_case_names_tokenize_like_camel_case() {
        let entity = book();
        let config = DataConfig::default();
        let camel = MethodElement::parse("findByTitle(title: String): Vec<Book>").unwrap();
        let snake = MethodElement::parse("find_by_title(title: String): Vec<Book>").unwrap();
        let a = MethodMatchContext::new("R", &entity, &camel, &config);
        let b = MethodMatchContext::new("R", &entity, &snake, &config);
        assert_eq!(a.tokens(), b.tokens());
        assert_eq!(a.verb(), "find");
    }
}
