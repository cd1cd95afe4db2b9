//! Repository compiler: runs the matcher chain over every method of a
//! repository and binds the results into a dispatch table.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use log::{debug, info, warn};

use crate::config::DataConfig;
use crate::core::{CompileErrors, DataError, Result};
use crate::matcher::contract::{ContractMethod, contract_flavor};
use crate::matcher::element::{Contract, MethodElement, RepositoryElement};
use crate::matcher::interceptor::Flavor;
use crate::matcher::{MethodMatchContext, match_method};
use crate::model::PersistentEntity;
use crate::runtime::dispatch::{BoundMethod, DispatchTable};

pub struct RepositoryCompiler {
    config: DataConfig,
}

impl RepositoryCompiler {
    pub fn new(config: DataConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DataConfig {
        &self.config
    }

    /// Compile `repository` against `entity`.
    ///
    /// Every method is matched even after a failure so one pass reports all
    /// of them.
    pub fn compile(
        &self,
        repository: &RepositoryElement,
        entity: &PersistentEntity,
    ) -> std::result::Result<CompiledRepository, CompileErrors> {
        let mut errors = CompileErrors::new(&repository.name);

        if repository.entity != entity.name() {
            errors.push(DataError::InvalidEntity(format!(
                "repository {} manages {} but was compiled against {}",
                repository.name,
                repository.entity,
                entity.name()
            )));
            return Err(errors);
        }
        if let Err(err) = entity.warm() {
            errors.push(err);
        }

        let mut methods: Vec<MethodElement> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut contracts: HashMap<(ContractMethod, Flavor), String> = HashMap::new();

        for contract in &repository.extends {
            let flavor = contract_flavor(*contract);
            for operation in ContractMethod::of(*contract) {
                let method = operation.element(entity, flavor);
                let key = method.key();
                contracts.insert((operation, flavor), key.clone());
                if !positions.contains_key(&key) {
                    positions.insert(key, methods.len());
                    methods.push(method);
                }
            }
        }

        let mut declared = HashSet::new();
        for method in &repository.methods {
            let key = method.key();
            if !declared.insert(key.clone()) {
                errors.push(DataError::InvalidMethod {
                    method: format!("{}.{}", repository.name, method.signature()),
                    reason: "declared twice".to_string(),
                });
                continue;
            }
            match positions.get(&key) {
                Some(&position) => {
                    debug!(
                        "{}.{} overrides the inherited contract method",
                        repository.name,
                        method.signature()
                    );
                    methods[position] = method.clone();
                }
                None => {
                    positions.insert(key, methods.len());
                    methods.push(method.clone());
                }
            }
        }

        let mut table = DispatchTable::new();
        for method in &methods {
            let ctx = MethodMatchContext::new(&repository.name, entity, method, &self.config);
            let roles = ctx.arg_roles().to_vec();
            match match_method(&ctx) {
                Ok(matched) => {
                    table.insert(BoundMethod::new(&repository.name, method, roles, matched));
                }
                Err(err) => {
                    warn!("{err}");
                    errors.push(err);
                }
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        info!(
            "Compiled repository {} for {} ({} methods)",
            repository.name,
            entity.name(),
            table.len()
        );
        Ok(CompiledRepository {
            name: repository.name.clone(),
            entity: entity.clone(),
            extends: repository.extends.clone(),
            table,
            contracts,
        })
    }
}

impl Default for RepositoryCompiler {
    fn default() -> Self {
        Self::new(DataConfig::default())
    }
}

/// Output of [`RepositoryCompiler::compile`].
#[derive(Debug)]
pub struct CompiledRepository {
    name: String,
    entity: PersistentEntity,
    extends: Vec<Contract>,
    table: DispatchTable,
    contracts: HashMap<(ContractMethod, Flavor), String>,
}

impl CompiledRepository {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entity(&self) -> &PersistentEntity {
        &self.entity
    }

    pub fn extends(&self) -> &[Contract] {
        &self.extends
    }

    pub fn table(&self) -> &DispatchTable {
        &self.table
    }

    /// Bound method implementing a contract operation in one flavor.
    pub fn contract(&self, operation: ContractMethod, flavor: Flavor) -> Result<&Arc<BoundMethod>> {
        let key = self.contracts.get(&(operation, flavor)).ok_or_else(|| {
            DataError::UnsupportedOperation(format!(
                "{} does not extend a {flavor:?} contract providing {operation:?}",
                self.name
            ))
        })?;
        self.table
            .get(key)
            .ok_or_else(|| DataError::NoMatcherFound(format!("{}.{key}", self.name)))
    }
}

impl fmt::Display for CompiledRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({})", self.name, self.entity)?;
        for method in self.table.iter() {
            write!(f, "  {method}")?;
            if !method.ambiguous_with.is_empty() {
                write!(f, " (also accepted by {:?})", method.ambiguous_with)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::interceptor::InterceptorKind;
    use crate::model::{EntityDefinition, MappingStrategies, PropertyDef, TypeRef};

    fn book() -> PersistentEntity {
        EntityDefinition::new("Book")
            .property(PropertyDef::new("id", TypeRef::optional::<i64>()).id().generated())
            .property(PropertyDef::new("title", TypeRef::of::<String>()))
            .property(PropertyDef::new("pages", TypeRef::of::<i32>()))
            .build(&MappingStrategies::default())
            .unwrap()
    }

    #[test]
    fn compiles_contract_and_declared_methods() {
        let repository = RepositoryElement::new("BookRepository", "Book")
            .extends(Contract::PageableRepository)
            .method(MethodElement::parse("findByTitle(title: String): Vec<Book>").unwrap());
        let compiled = RepositoryCompiler::default().compile(&repository, &book()).unwrap();

        assert_eq!(compiled.table().len(), 15);
        let find = compiled.contract(ContractMethod::FindById, Flavor::Sync).unwrap();
        assert_eq!(find.kind(), InterceptorKind::FindOptional);
        let page = compiled.contract(ContractMethod::FindAllPaged, Flavor::Sync).unwrap();
        assert_eq!(page.kind(), InterceptorKind::FindPage);
        assert!(matches!(
            compiled.contract(ContractMethod::Count, Flavor::Async),
            Err(DataError::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn collects_every_failure() {
        let repository = RepositoryElement::new("BookRepository", "Book")
            .method(MethodElement::parse("zzzFetchAll(): Vec<Book>").unwrap())
            .method(MethodElement::parse("findByColour(colour: String): Vec<Book>").unwrap())
            .method(MethodElement::parse("findByTitle(title: String): Vec<Book>").unwrap());
        let errors = RepositoryCompiler::default()
            .compile(&repository, &book())
            .unwrap_err();

        assert_eq!(errors.len(), 2);
        assert!(matches!(errors.errors[0], DataError::NoMatcherFound(_)));
        assert!(matches!(errors.errors[1], DataError::UnknownProperty { .. }));
    }

    #[test]
    fn declared_method_overrides_contract_method() {
        let custom = MethodElement::parse("count(): i64").unwrap();
        let repository = RepositoryElement::new("BookRepository", "Book")
            .extends(Contract::CrudRepository)
            .method(custom);
        let compiled = RepositoryCompiler::default().compile(&repository, &book()).unwrap();
        assert_eq!(compiled.table().len(), 12);
        assert!(compiled.contract(ContractMethod::Count, Flavor::Sync).is_ok());
    }

    #[test]
    fn reactive_contracts_select_reactive_interceptors() {
        let repository = RepositoryElement::new("BookRepository", "Book")
            .extends(Contract::ReactiveCrudRepository);
        let compiled = RepositoryCompiler::default().compile(&repository, &book()).unwrap();
        for method in compiled.table().iter() {
            assert_eq!(method.flavor(), Flavor::Reactive, "{method}");
        }
    }
}
