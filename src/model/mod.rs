//! Runtime persistent model: entities, their properties, and the naming and
//! conversion strategies attached to them when the metadata is built.
//!
//! Metadata is write-once. The only state that changes after construction
//! is memoized (persisted names, converters) and computed at most once.

pub mod converter;
pub mod data_type;
pub mod entity;
pub mod naming;
pub mod property;
pub mod type_ref;

pub use converter::{AttributeConverter, ConverterRegistry};
pub use data_type::{DataType, JsonDataType};
pub use entity::{
    Entity, EntityDefinition, Identity, Introspected, MappingStrategies, PersistentEntity,
};
pub use naming::NamingStrategy;
pub use property::{PersistentProperty, PropertyDef, PropertyFlags};
pub use type_ref::TypeRef;
