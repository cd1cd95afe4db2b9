use std::any::{TypeId, type_name};
use std::fmt;

/// Declared Rust type of a persistent property.
///
/// Carries the `TypeId` when the metadata was produced from real Rust types
/// (derive or hand-written), and only the name when it was read from a
/// textual definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRef {
    name: String,
    id: Option<TypeId>,
    inner: Option<TypeId>,
    optional: bool,
}

impl TypeRef {
    pub fn of<T: 'static>() -> Self {
        Self {
            name: type_name::<T>().to_string(),
            id: Some(TypeId::of::<T>()),
            inner: None,
            optional: false,
        }
    }

    /// A declared `Option<T>`; assignable to both `Option<T>` and `T`.
    pub fn optional<T: 'static>() -> Self {
        Self {
            name: type_name::<Option<T>>().to_string(),
            id: Some(TypeId::of::<Option<T>>()),
            inner: Some(TypeId::of::<T>()),
            optional: true,
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        let optional = simple_name(&name) == "Option";
        Self {
            name,
            id: None,
            inner: None,
            optional,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn simple_name(&self) -> &str {
        simple_name(&self.name)
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn type_id(&self) -> Option<TypeId> {
        self.id
    }

    pub fn is<T: 'static>(&self) -> bool {
        let wanted = TypeId::of::<T>();
        self.id == Some(wanted) || self.inner == Some(wanted)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn simple_name(name: &str) -> &str {
    let base = name.split('<').next().unwrap_or(name).trim();
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_matches_inner_type() {
        let declared = TypeRef::optional::<i64>();
        assert!(declared.is::<i64>());
        assert!(declared.is::<Option<i64>>());
        assert!(!declared.is::<i32>());
        assert_eq!(declared.simple_name(), "Option");
    }

    #[test]
    fn named_types_have_no_identity() {
        let declared = TypeRef::named("String");
        assert!(!declared.is::<String>());
        assert_eq!(declared.simple_name(), "String");
    }
}
