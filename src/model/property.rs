use std::fmt;
use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;

use crate::core::{DataError, Result};
use crate::model::converter::AttributeConverter;
use crate::model::data_type::{DataType, JsonDataType};
use crate::model::entity::EntityInner;
use crate::model::naming::{NamingStrategy, default_naming_strategy};
use crate::model::type_ref::TypeRef;
use crate::model::PersistentEntity;

/// Structural description of one mapped member, before resolution.
#[derive(Debug, Clone)]
pub struct PropertyDef {
    pub(crate) name: String,
    pub(crate) declared_type: TypeRef,
    pub(crate) data_type: Option<DataType>,
    pub(crate) json_data_type: Option<JsonDataType>,
    pub(crate) persisted_name: Option<String>,
    pub(crate) alias: Option<String>,
    pub(crate) converter: Option<String>,
    pub(crate) id: bool,
    pub(crate) generated: bool,
    pub(crate) flags: PropertyFlags,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropertyFlags {
    pub constructor_argument: bool,
    pub read_only: bool,
    pub optional: bool,
    pub enum_valued: bool,
    pub association: bool,
}

impl PropertyDef {
    pub fn new(name: impl Into<String>, declared_type: TypeRef) -> Self {
        let optional = declared_type.is_optional();
        Self {
            name: name.into(),
            declared_type,
            data_type: None,
            json_data_type: None,
            persisted_name: None,
            alias: None,
            converter: None,
            id: false,
            generated: false,
            flags: PropertyFlags {
                constructor_argument: true,
                optional,
                ..PropertyFlags::default()
            },
        }
    }

    pub fn id(mut self) -> Self {
        self.id = true;
        self
    }

    pub fn generated(mut self) -> Self {
        self.generated = true;
        self
    }

    /// Explicit column name; bypasses the naming strategy.
    pub fn persisted_name(mut self, name: impl Into<String>) -> Self {
        self.persisted_name = Some(name.into());
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn converter(mut self, name: impl Into<String>) -> Self {
        self.converter = Some(name.into());
        self
    }

    pub fn data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    pub fn json_data_type(mut self, json_data_type: JsonDataType) -> Self {
        self.json_data_type = Some(json_data_type);
        self
    }

    pub fn read_only(mut self) -> Self {
        self.flags.read_only = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.flags.optional = true;
        self
    }

    pub fn enum_valued(mut self) -> Self {
        self.flags.enum_valued = true;
        self
    }

    pub fn association(mut self) -> Self {
        self.flags.association = true;
        self
    }

    pub fn constructor_argument(mut self, constructor_argument: bool) -> Self {
        self.flags.constructor_argument = constructor_argument;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// One mapped attribute of a [`PersistentEntity`].
///
/// Immutable after construction except for the persisted name and the
/// converter, which are computed once on first access and then shared by
/// every thread.
pub struct PersistentProperty {
    owner: Weak<EntityInner>,
    name: String,
    declared_type: TypeRef,
    data_type: DataType,
    json_data_type: Option<JsonDataType>,
    explicit_persisted_name: Option<String>,
    alias: Option<String>,
    converter_name: Option<String>,
    id: bool,
    generated: bool,
    flags: PropertyFlags,
    persisted_name: OnceCell<String>,
    converter: OnceCell<Arc<dyn AttributeConverter>>,
}

impl PersistentProperty {
    pub(crate) fn resolve(def: PropertyDef, owner: Weak<EntityInner>) -> Self {
        let data_type = def.data_type.unwrap_or_else(|| {
            if def.flags.association {
                DataType::Entity
            } else {
                DataType::classify(def.declared_type.name())
            }
        });
        let json_data_type = if data_type == DataType::Json {
            Some(def.json_data_type.unwrap_or_default())
        } else {
            None
        };

        Self {
            owner,
            name: def.name,
            declared_type: def.declared_type,
            data_type,
            json_data_type,
            explicit_persisted_name: def.persisted_name,
            alias: def.alias,
            converter_name: def.converter,
            id: def.id,
            generated: def.generated,
            flags: def.flags,
            persisted_name: OnceCell::new(),
            converter: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_type(&self) -> &TypeRef {
        &self.declared_type
    }

    pub fn type_name(&self) -> &str {
        self.declared_type.name()
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Present only for JSON-classified properties.
    pub fn json_data_type(&self) -> Option<JsonDataType> {
        self.json_data_type
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn explicit_persisted_name(&self) -> Option<&str> {
        self.explicit_persisted_name.as_deref()
    }

    pub fn converter_name(&self) -> Option<&str> {
        self.converter_name.as_deref()
    }

    pub fn is_id(&self) -> bool {
        self.id
    }

    pub fn is_generated(&self) -> bool {
        self.generated
    }

    pub fn is_constructor_argument(&self) -> bool {
        self.flags.constructor_argument
    }

    pub fn is_read_only(&self) -> bool {
        self.flags.read_only
    }

    pub fn is_optional(&self) -> bool {
        self.flags.optional
    }

    pub fn is_enum(&self) -> bool {
        self.flags.enum_valued
    }

    pub fn is_association(&self) -> bool {
        self.flags.association
    }

    pub fn owner(&self) -> Option<PersistentEntity> {
        self.owner.upgrade().map(PersistentEntity::from_inner)
    }

    /// Column name in the physical store, computed once through the owner's
    /// naming strategy.
    pub fn persisted_name(&self) -> &str {
        self.persisted_name.get_or_init(|| {
            let strategy: Arc<dyn NamingStrategy> = match self.owner.upgrade() {
                Some(owner) => owner.strategies.naming.clone(),
                // properties are only reachable through their entity, so this
                // branch only runs while the entity itself is being dropped
                None => default_naming_strategy(),
            };
            strategy.mapped_property_name(self)
        })
    }

    /// The declared converter, constructed at most once.
    ///
    /// Concurrent first callers block on the same initialization; a failed
    /// resolution leaves the cell empty so a later call can retry.
    pub fn converter(&self) -> Result<Option<Arc<dyn AttributeConverter>>> {
        let Some(converter_name) = self.converter_name.as_deref() else {
            return Ok(None);
        };

        let converter = self.converter.get_or_try_init(|| {
            let owner = self.owner.upgrade().ok_or_else(|| DataError::ConverterResolution {
                converter: converter_name.to_string(),
                property: self.name.clone(),
                reason: "owning entity no longer exists".to_string(),
            })?;
            PersistentEntity::from_inner(owner).resolve_converter(converter_name, self)
        })?;
        Ok(Some(Arc::clone(converter)))
    }

    /// Type compatibility for query binding.
    pub fn is_assignable<T: 'static>(&self) -> bool {
        self.declared_type.is::<T>()
    }

    /// Name-based assignability belongs to build-time type descriptions, not
    /// to the runtime model.
    pub fn is_assignable_to_name(&self, _type_name: &str) -> Result<bool> {
        Err(DataError::UnsupportedOperation(
            "Use is_assignable::<T>() instead".to_string(),
        ))
    }
}

impl fmt::Display for PersistentProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.owner.upgrade() {
            Some(owner) => write!(f, "{}.{}", owner.name, self.name),
            None => f.write_str(&self.name),
        }
    }
}

impl fmt::Debug for PersistentProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistentProperty")
            .field("name", &self.name)
            .field("declared_type", &self.declared_type.name())
            .field("data_type", &self.data_type)
            .field("id", &self.id)
            .field("converter", &self.converter_name)
            .finish()
    }
}
