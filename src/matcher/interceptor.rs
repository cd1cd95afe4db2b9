use std::fmt;

use serde::{Deserialize, Serialize};

use crate::matcher::element::TypeElement;

/// Execution family selected for a repository method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterceptorKind {
    FindAll,
    FindOne,
    FindById,
    FindOptional,
    FindPage,
    FindSlice,
    Count,
    Exists,
    DeleteAll,
    DeleteOne,
    DeleteAllEntities,
    Update,
    UpdateEntity,
    UpdateAllEntities,
    Save,
    SaveAll,
}

impl InterceptorKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::FindAll => "FindAll",
            Self::FindOne => "FindOne",
            Self::FindById => "FindById",
            Self::FindOptional => "FindOptional",
            Self::FindPage => "FindPage",
            Self::FindSlice => "FindSlice",
            Self::Count => "Count",
            Self::Exists => "Exists",
            Self::DeleteAll => "DeleteAll",
            Self::DeleteOne => "DeleteOne",
            Self::DeleteAllEntities => "DeleteAllEntities",
            Self::Update => "Update",
            Self::UpdateEntity => "UpdateEntity",
            Self::UpdateAllEntities => "UpdateAllEntities",
            Self::Save => "Save",
            Self::SaveAll => "SaveAll",
        }
    }

    pub fn is_read(self) -> bool {
        matches!(
            self,
            Self::FindAll
                | Self::FindOne
                | Self::FindById
                | Self::FindOptional
                | Self::FindPage
                | Self::FindSlice
                | Self::Count
                | Self::Exists
        )
    }
}

/// How an invocation runs: blocking, as a spawned future, or as a cold
/// reactive producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Flavor {
    #[default]
    Sync,
    Async,
    Reactive,
}

impl Flavor {
    fn suffix(self) -> &'static str {
        match self {
            Self::Sync => "",
            Self::Async => "Async",
            Self::Reactive => "Reactive",
        }
    }
}

/// Concrete interceptor implementation: family crossed with flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InterceptorType {
    pub kind: InterceptorKind,
    pub flavor: Flavor,
}

impl InterceptorType {
    pub fn new(kind: InterceptorKind, flavor: Flavor) -> Self {
        Self { kind, flavor }
    }

    /// Same flavor, different family.
    pub fn with_kind(self, kind: InterceptorKind) -> Self {
        Self { kind, ..self }
    }
}

impl fmt::Display for InterceptorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}Interceptor", self.kind.name(), self.flavor.suffix())
    }
}

/// What the caller gets back, once the flavor wrapper is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultShape {
    Unit,
    Entity,
    OptionalEntity,
    Entities,
    Page,
    Slice,
    Scalar,
    OptionalScalar,
    Scalars,
    /// Introspected types, read as rows of their fields.
    Record,
    OptionalRecord,
    Records,
    Count,
    Bool,
}

/// Output of method matching: the resolved return type paired with the
/// interceptor that will execute the method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterceptorMatch {
    /// Element type of the result (`Book` for `Future<Vec<Book>>`).
    pub return_type: TypeElement,
    pub interceptor: InterceptorType,
    pub shape: ResultShape,
}

impl fmt::Display for InterceptorMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.interceptor, self.return_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interceptor_names_follow_flavor() {
        let sync = InterceptorType::new(InterceptorKind::FindById, Flavor::Sync);
        assert_eq!(sync.to_string(), "FindByIdInterceptor");
        let reactive = sync.with_kind(InterceptorKind::FindOne);
        assert_eq!(
            InterceptorType { flavor: Flavor::Reactive, ..reactive }.to_string(),
            "FindOneReactiveInterceptor"
        );
        assert_eq!(
            InterceptorType::new(InterceptorKind::SaveAll, Flavor::Async).to_string(),
            "SaveAllAsyncInterceptor"
        );
    }
}
