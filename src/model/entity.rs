use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::core::{DataError, Result, Value};
use crate::model::converter::{AttributeConverter, ConverterRegistry};
use crate::model::naming::{NamingStrategy, default_naming_strategy, naming_strategy};
use crate::model::property::{PersistentProperty, PropertyDef};

/// A mapped Rust type: knows its metadata and how to move its state in and
/// out of positional property values (declared property order).
pub trait Entity: Sized + Send + Sync + 'static {
    /// Structural description used to build the [`PersistentEntity`].
    fn definition() -> EntityDefinition;

    /// Entity-side property values, in declared order.
    fn to_values(&self) -> Vec<Value>;

    /// Rebuild an instance from entity-side values, in declared order.
    fn from_values(values: Vec<Value>) -> Result<Self>;
}

/// A read-only view a finder can return instead of the entity.
///
/// Each field is read from the entity property of the same name; values
/// arrive in [`fields`](Self::fields) order.
pub trait Introspected: Sized + Send + 'static {
    /// Type name as written in method signatures.
    fn type_name() -> &'static str;

    fn fields() -> Vec<&'static str>;

    fn from_values(values: Vec<Value>) -> Result<Self>;
}

/// Strategies attached to an entity when its metadata is built.
#[derive(Clone, Debug)]
pub struct MappingStrategies {
    pub naming: Arc<dyn NamingStrategy>,
    pub converters: Arc<ConverterRegistry>,
}

impl MappingStrategies {
    pub fn new(naming: Arc<dyn NamingStrategy>, converters: ConverterRegistry) -> Self {
        Self {
            naming,
            converters: Arc::new(converters),
        }
    }

    pub fn with_naming(mut self, naming: Arc<dyn NamingStrategy>) -> Self {
        self.naming = naming;
        self
    }

    pub fn with_converters(mut self, converters: ConverterRegistry) -> Self {
        self.converters = Arc::new(converters);
        self
    }
}

impl Default for MappingStrategies {
    fn default() -> Self {
        Self {
            naming: default_naming_strategy(),
            converters: Arc::new(ConverterRegistry::with_defaults()),
        }
    }
}

/// Identity concept of an entity: exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Single(usize),
    Composite(Vec<usize>),
}

impl Identity {
    pub fn indexes(&self) -> Vec<usize> {
        match self {
            Self::Single(idx) => vec![*idx],
            Self::Composite(idxs) => idxs.clone(),
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Composite(_))
    }
}

/// Structural description of an entity: its name and member list.
#[derive(Debug, Clone)]
pub struct EntityDefinition {
    name: String,
    type_name: String,
    table: Option<String>,
    naming: Option<String>,
    properties: Vec<PropertyDef>,
}

impl EntityDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            type_name: name.clone(),
            name,
            table: None,
            naming: None,
            properties: Vec::new(),
        }
    }

    /// Fully-qualified Rust path, for diagnostics.
    pub fn type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = type_name.into();
        self
    }

    /// Explicit table name; bypasses the naming strategy.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Per-entity naming strategy override, by strategy identifier.
    pub fn naming(mut self, naming: impl Into<String>) -> Self {
        self.naming = Some(naming.into());
        self
    }

    pub fn property(mut self, property: PropertyDef) -> Self {
        self.properties.push(property);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn properties(&self) -> &[PropertyDef] {
        &self.properties
    }

    /// Validate and resolve into a [`PersistentEntity`].
    pub fn build(self, strategies: &MappingStrategies) -> Result<PersistentEntity> {
        if self.properties.is_empty() {
            return Err(DataError::InvalidEntity(format!(
                "{}: an entity needs at least one property",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for property in &self.properties {
            if !seen.insert(property.name.as_str()) {
                return Err(DataError::InvalidEntity(format!(
                    "{}: duplicate property '{}'",
                    self.name, property.name
                )));
            }
        }

        let id_indexes: Vec<usize> = self
            .properties
            .iter()
            .enumerate()
            .filter(|(_, property)| property.id)
            .map(|(idx, _)| idx)
            .collect();
        let identity = match id_indexes.as_slice() {
            [] => {
                return Err(DataError::InvalidEntity(format!(
                    "{}: no identity property declared",
                    self.name
                )));
            }
            [single] => Identity::Single(*single),
            many => {
                if let Some(generated) = many.iter().find(|idx| self.properties[**idx].generated) {
                    return Err(DataError::InvalidEntity(format!(
                        "{}: composite identity member '{}' cannot be generated",
                        self.name, self.properties[*generated].name
                    )));
                }
                Identity::Composite(many.to_vec())
            }
        };

        let mut strategies = strategies.clone();
        if let Some(naming) = self.naming.as_deref() {
            strategies.naming = naming_strategy(naming)?;
        }

        let index: HashMap<String, usize> = self
            .properties
            .iter()
            .enumerate()
            .map(|(idx, property)| (property.name.clone(), idx))
            .collect();

        let EntityDefinition {
            name,
            type_name,
            table,
            properties: defs,
            ..
        } = self;

        let inner = Arc::new_cyclic(|owner| EntityInner {
            name,
            type_name,
            explicit_table: table,
            table: OnceCell::new(),
            properties: defs
                .into_iter()
                .map(|def| PersistentProperty::resolve(def, owner.clone()))
                .collect(),
            index,
            identity,
            strategies,
        });

        Ok(PersistentEntity { inner })
    }
}

pub(crate) struct EntityInner {
    pub(crate) name: String,
    pub(crate) type_name: String,
    explicit_table: Option<String>,
    table: OnceCell<String>,
    pub(crate) properties: Vec<PersistentProperty>,
    index: HashMap<String, usize>,
    pub(crate) identity: Identity,
    pub(crate) strategies: MappingStrategies,
}

/// Resolved, shareable metadata for one mapped type.
#[derive(Clone)]
pub struct PersistentEntity {
    inner: Arc<EntityInner>,
}

impl PersistentEntity {
    pub(crate) fn from_inner(inner: Arc<EntityInner>) -> Self {
        Self { inner }
    }

    pub fn of<E: Entity>(strategies: &MappingStrategies) -> Result<Self> {
        E::definition().build(strategies)
    }

    /// Simple (unqualified) entity name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn type_name(&self) -> &str {
        &self.inner.type_name
    }

    /// Table name, computed once through the naming strategy.
    pub fn persisted_name(&self) -> &str {
        self.inner.table.get_or_init(|| match &self.inner.explicit_table {
            Some(table) => table.clone(),
            None => self.inner.strategies.naming.mapped_entity_name(&self.inner.name),
        })
    }

    pub fn naming_strategy(&self) -> &Arc<dyn NamingStrategy> {
        &self.inner.strategies.naming
    }

    pub fn strategies(&self) -> &MappingStrategies {
        &self.inner.strategies
    }

    pub fn properties(&self) -> &[PersistentProperty] {
        &self.inner.properties
    }

    pub fn property(&self, name: &str) -> Option<&PersistentProperty> {
        self.property_index(name).map(|idx| &self.inner.properties[idx])
    }

    pub fn property_index(&self, name: &str) -> Option<usize> {
        self.inner.index.get(name).copied()
    }

    pub fn identity(&self) -> &Identity {
        &self.inner.identity
    }

    pub fn id_properties(&self) -> Vec<&PersistentProperty> {
        self.inner
            .identity
            .indexes()
            .into_iter()
            .map(|idx| &self.inner.properties[idx])
            .collect()
    }

    /// The single identity property, if the identity is not composite.
    pub fn id_property(&self) -> Option<&PersistentProperty> {
        match self.inner.identity {
            Identity::Single(idx) => Some(&self.inner.properties[idx]),
            Identity::Composite(_) => None,
        }
    }

    pub fn is_identity(&self, property_name: &str) -> bool {
        self.property(property_name).is_some_and(PersistentProperty::is_id)
    }

    /// Identity values of an entity instance, in identity order.
    pub fn id_values(&self, values: &[Value]) -> Vec<Value> {
        self.inner
            .identity
            .indexes()
            .into_iter()
            .map(|idx| values.get(idx).cloned().unwrap_or(Value::Null))
            .collect()
    }

    /// Construct the named converter through this entity's registry.
    pub fn resolve_converter(
        &self,
        converter: &str,
        property: &PersistentProperty,
    ) -> Result<Arc<dyn AttributeConverter>> {
        let label = format!("{}.{}", self.inner.name, property.name());
        self.inner.strategies.converters.instantiate(converter, &label)
    }

    /// Resolve every persisted name and converter now.
    ///
    /// Used when a repository is built so converter failures surface there
    /// instead of on the first query.
    pub fn warm(&self) -> Result<()> {
        self.persisted_name();
        for property in self.properties() {
            property.persisted_name();
            property.converter()?;
        }
        Ok(())
    }

    /// Whether two handles point at the same metadata instance.
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for PersistentEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistentEntity")
            .field("name", &self.inner.name)
            .field("identity", &self.inner.identity)
            .field("properties", &self.inner.properties)
            .finish()
    }
}

impl fmt::Display for PersistentEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::data_type::DataType;
    use crate::model::naming::UpperCase;
    use crate::model::type_ref::TypeRef;

    fn book() -> EntityDefinition {
        EntityDefinition::new("Book")
            .property(PropertyDef::new("id", TypeRef::optional::<i64>()).id().generated())
            .property(PropertyDef::new("title", TypeRef::of::<String>()))
            .property(PropertyDef::new("pages", TypeRef::of::<i32>()))
            .property(PropertyDef::new("date_created", TypeRef::of::<chrono::NaiveDate>()))
    }

    #[test]
    fn builds_single_identity() {
        let entity = book().build(&MappingStrategies::default()).unwrap();
        assert_eq!(entity.identity(), &Identity::Single(0));
        assert_eq!(entity.id_property().unwrap().name(), "id");
        assert_eq!(entity.persisted_name(), "book");
        assert_eq!(entity.property("pages").unwrap().data_type(), DataType::Integer);
    }

    #[test]
    fn rejects_duplicate_and_missing_identity() {
        let duplicate = book().property(PropertyDef::new("title", TypeRef::of::<String>()));
        assert!(matches!(
            duplicate.build(&MappingStrategies::default()),
            Err(DataError::InvalidEntity(_))
        ));

        let no_id = EntityDefinition::new("Note")
            .property(PropertyDef::new("body", TypeRef::of::<String>()));
        assert!(no_id.build(&MappingStrategies::default()).is_err());
    }

    #[test]
    fn composite_identity_keeps_declared_order() {
        let entity = EntityDefinition::new("Enrollment")
            .property(PropertyDef::new("student", TypeRef::of::<i64>()).id())
            .property(PropertyDef::new("course", TypeRef::of::<i64>()).id())
            .property(PropertyDef::new("grade", TypeRef::of::<String>()))
            .build(&MappingStrategies::default())
            .unwrap();
        assert_eq!(entity.identity(), &Identity::Composite(vec![0, 1]));
        assert!(entity.id_property().is_none());
    }

    #[test]
    fn property_back_reference_reaches_owner() {
        let entity = book().build(&MappingStrategies::default()).unwrap();
        let owner = entity.property("title").unwrap().owner().unwrap();
        assert!(owner.same_as(&entity));
        assert_eq!(entity.property("title").unwrap().to_string(), "Book.title");
    }

    #[test]
    fn entity_level_naming_override_applies() {
        let strategies = MappingStrategies::default().with_naming(Arc::new(UpperCase));
        let entity = book().naming("raw").build(&strategies).unwrap();
        assert_eq!(entity.property("date_created").unwrap().persisted_name(), "date_created");
        assert_eq!(entity.naming_strategy().name(), "raw");
    }
}
