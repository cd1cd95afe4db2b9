//! Methods inherited from the repository contracts.
//!
//! Contract methods are ordinary [`MethodElement`]s with the entity and
//! identity types substituted. They go through the same matcher chain as
//! user-declared methods.

use serde::{Deserialize, Serialize};

use crate::matcher::element::{Contract, MethodElement, TypeElement};
use crate::matcher::interceptor::Flavor;
use crate::model::PersistentEntity;

/// Operation a contract method stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractMethod {
    Save,
    SaveAll,
    FindById,
    ExistsById,
    FindAll,
    Count,
    DeleteById,
    Delete,
    DeleteAll,
    DeleteAllEntities,
    Update,
    UpdateAll,
    FindAllSorted,
    FindAllPaged,
}

impl ContractMethod {
    const CRUD: [ContractMethod; 12] = [
        Self::Save,
        Self::SaveAll,
        Self::FindById,
        Self::ExistsById,
        Self::FindAll,
        Self::Count,
        Self::DeleteById,
        Self::Delete,
        Self::DeleteAll,
        Self::DeleteAllEntities,
        Self::Update,
        Self::UpdateAll,
    ];

    const PAGING: [ContractMethod; 2] = [Self::FindAllSorted, Self::FindAllPaged];

    /// Methods a contract contributes, paging contracts including CRUD.
    pub fn of(contract: Contract) -> Vec<ContractMethod> {
        match contract {
            Contract::CrudRepository
            | Contract::AsyncCrudRepository
            | Contract::ReactiveCrudRepository => Self::CRUD.to_vec(),
            Contract::PageableRepository
            | Contract::AsyncPageableRepository
            | Contract::ReactivePageableRepository => {
                Self::CRUD.iter().chain(Self::PAGING.iter()).copied().collect()
            }
        }
    }

    /// Build the method element for `entity` in the given flavor.
    pub fn element(self, entity: &PersistentEntity, flavor: Flavor) -> MethodElement {
        let entity_type = TypeElement::simple(entity.name());
        let entities = TypeElement::generic("Vec", vec![entity_type.clone()]);
        let id_params = id_parameters(entity);

        let (name, params, returns, streamed): (&str, Vec<(String, TypeElement)>, TypeElement, bool) =
            match self {
                Self::Save => (
                    "save",
                    vec![("entity".into(), entity_type.clone())],
                    entity_type.clone(),
                    false,
                ),
                Self::SaveAll => (
                    "saveAll",
                    vec![("entities".into(), entities.clone())],
                    entities.clone(),
                    true,
                ),
                Self::FindById => (
                    "findById",
                    id_params,
                    TypeElement::generic("Option", vec![entity_type.clone()]),
                    false,
                ),
                Self::ExistsById => ("existsById", id_params, TypeElement::simple("bool"), false),
                Self::FindAll => ("findAll", Vec::new(), entities.clone(), true),
                Self::Count => ("count", Vec::new(), TypeElement::simple("i64"), false),
                Self::DeleteById => ("deleteById", id_params, TypeElement::unit(), false),
                Self::Delete => (
                    "delete",
                    vec![("entity".into(), entity_type.clone())],
                    TypeElement::unit(),
                    false,
                ),
                Self::DeleteAll => ("deleteAll", Vec::new(), TypeElement::unit(), false),
                Self::DeleteAllEntities => (
                    "deleteAll",
                    vec![("entities".into(), entities.clone())],
                    TypeElement::unit(),
                    false,
                ),
                Self::Update => (
                    "update",
                    vec![("entity".into(), entity_type.clone())],
                    entity_type.clone(),
                    false,
                ),
                Self::UpdateAll => (
                    "updateAll",
                    vec![("entities".into(), entities.clone())],
                    entities.clone(),
                    true,
                ),
                Self::FindAllSorted => (
                    "findAll",
                    vec![("sort".into(), TypeElement::simple("Sort"))],
                    entities.clone(),
                    true,
                ),
                Self::FindAllPaged => (
                    "findAll",
                    vec![("pageable".into(), TypeElement::simple("Pageable"))],
                    TypeElement::generic("Page", vec![entity_type.clone()]),
                    false,
                ),
            };

        let returns = wrap(returns, flavor, streamed);
        params
            .into_iter()
            .fold(MethodElement::new(name).returns(returns), |method, (param, ty)| {
                method.param(param, ty)
            })
    }
}

/// One parameter per identity property, `Option` stripped.
fn id_parameters(entity: &PersistentEntity) -> Vec<(String, TypeElement)> {
    entity
        .id_properties()
        .into_iter()
        .map(|property| {
            let declared = TypeElement::parse(property.type_name())
                .unwrap_or_else(|_| TypeElement::simple(property.declared_type().simple_name()));
            let ty = match declared.first_arg() {
                Some(inner) if declared.is_named("Option") => inner.clone(),
                _ => declared,
            };
            (property.name().to_string(), ty)
        })
        .collect()
}

/// Async results become `Future<T>`; reactive collections become
/// `Flux<E>` and everything else `Mono<T>`.
fn wrap(returns: TypeElement, flavor: Flavor, streamed: bool) -> TypeElement {
    match flavor {
        Flavor::Sync => returns,
        Flavor::Async => TypeElement::generic("Future", vec![returns]),
        Flavor::Reactive if streamed => match returns.first_arg() {
            Some(element) => TypeElement::generic("Flux", vec![element.clone()]),
            None => TypeElement::generic("Mono", vec![returns]),
        },
        Flavor::Reactive => TypeElement::generic("Mono", vec![returns]),
    }
}

/// Flavor a contract's methods are generated in.
pub fn contract_flavor(contract: Contract) -> Flavor {
    match contract {
        Contract::CrudRepository | Contract::PageableRepository => Flavor::Sync,
        Contract::AsyncCrudRepository | Contract::AsyncPageableRepository => Flavor::Async,
        Contract::ReactiveCrudRepository | Contract::ReactivePageableRepository => {
            Flavor::Reactive
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityDefinition, MappingStrategies, PropertyDef, TypeRef};

    fn book() -> PersistentEntity {
        EntityDefinition::new("Book")
            .property(PropertyDef::new("id", TypeRef::optional::<i64>()).id().generated())
            .property(PropertyDef::new("title", TypeRef::of::<String>()))
            .build(&MappingStrategies::default())
            .unwrap()
    }

    #[test]
    fn substitutes_entity_and_identity_types() {
        let entity = book();
        let find = ContractMethod::FindById.element(&entity, Flavor::Sync);
        assert_eq!(find.signature(), "findById(id: i64): Option<Book>");

        let paged = ContractMethod::FindAllPaged.element(&entity, Flavor::Async);
        assert_eq!(paged.signature(), "findAll(pageable: Pageable): Future<Page<Book>>");

        let all = ContractMethod::FindAll.element(&entity, Flavor::Reactive);
        assert_eq!(all.signature(), "findAll(): Flux<Book>");

        let count = ContractMethod::Count.element(&entity, Flavor::Reactive);
        assert_eq!(count.signature(), "count(): Mono<i64>");
    }

    #[test]
    fn composite_identity_spreads_parameters() {
        let entity = EntityDefinition::new("Enrollment")
            .property(PropertyDef::new("student", TypeRef::of::<i64>()).id())
            .property(PropertyDef::new("course", TypeRef::of::<String>()).id())
            .build(&MappingStrategies::default())
            .unwrap();
        let delete = ContractMethod::DeleteById.element(&entity, Flavor::Sync);
        assert_eq!(
            delete.signature(),
            "deleteById(student: i64, course: String): ()"
        );
    }

    #[test]
    fn pageable_contracts_extend_crud() {
        assert_eq!(ContractMethod::of(Contract::CrudRepository).len(), 12);
        assert!(ContractMethod::of(Contract::ReactivePageableRepository)
            .contains(&ContractMethod::FindAllPaged));
    }
}
