use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::future::{self, FutureExt, TryFutureExt};
use futures::stream::{self, StreamExt};
use tracing::{Instrument, Level, event, info_span};

use crate::config::DataConfig;
use crate::core::{CompileErrors, DataError, Result, Value};
use crate::matcher::element::{Contract, MethodElement, RepositoryElement};
use crate::matcher::interceptor::Flavor;
use crate::matcher::{CompiledRepository, ContractMethod, RepositoryCompiler};
use crate::model::{ConverterRegistry, Entity, Introspected, PersistentEntity};
use crate::query::{Page, Pageable, Sort};
use crate::repository::contracts::{
    AsyncCrudRepository, AsyncPageableRepository, CrudRepository, PageableRepository,
    ReactiveCrudRepository, ReactivePageableRepository,
};
use crate::runtime::interceptor::{self, Arg, Outcome};
use crate::runtime::{AsyncDriver, BoundMethod, DataFuture, Driver, Flux, Mono};

/// Repository for entity `E` backed by driver `D`.
///
/// Methods are compiled once by [`RepositoryBuilder::build`]; every call
/// afterwards is a dispatch-table lookup followed by interceptor execution.
/// Cloning is cheap and clones share the compiled table and the driver.
pub struct Repository<E, D> {
    compiled: Arc<CompiledRepository>,
    driver: Arc<D>,
    config: Arc<DataConfig>,
    _entity: PhantomData<fn() -> E>,
}

impl<E, D> Clone for Repository<E, D> {
    fn clone(&self) -> Self {
        Self {
            compiled: Arc::clone(&self.compiled),
            driver: Arc::clone(&self.driver),
            config: Arc::clone(&self.config),
            _entity: PhantomData,
        }
    }
}

impl<E, D> fmt::Debug for Repository<E, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("name", &self.compiled.name())
            .field("entity", &self.compiled.entity().name())
            .field("methods", &self.compiled.table().len())
            .finish()
    }
}

impl<E: Entity, D> Repository<E, D> {
    pub fn builder(driver: D) -> RepositoryBuilder<E, D> {
        RepositoryBuilder::new(driver)
    }

    pub fn compiled(&self) -> &CompiledRepository {
        &self.compiled
    }

    pub fn entity(&self) -> &PersistentEntity {
        self.compiled.entity()
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn config(&self) -> &DataConfig {
        &self.config
    }

    /// Bound method by full key or by unique name.
    pub fn method(&self, key_or_name: &str) -> Result<&Arc<BoundMethod>> {
        self.compiled.table().resolve(key_or_name)
    }

    fn bound(&self, key_or_name: &str, flavor: Flavor) -> Result<Arc<BoundMethod>> {
        let method = self.method(key_or_name)?;
        if method.flavor() != flavor {
            return Err(DataError::UnsupportedOperation(format!(
                "{} is a {:?} method and cannot be called as {flavor:?}",
                method.signature,
                method.flavor()
            )));
        }
        Ok(Arc::clone(method))
    }

    fn contract(&self, operation: ContractMethod, flavor: Flavor) -> Result<Arc<BoundMethod>> {
        self.compiled.contract(operation, flavor).map(Arc::clone)
    }

    /// Call arguments for an identity; lists spread over composite ids.
    fn id_args(&self, id: Value) -> Vec<Arg<E>> {
        match id {
            Value::List(parts) if self.entity().identity().is_composite() => {
                parts.into_iter().map(Arg::Value).collect()
            }
            other => vec![Arg::Value(other)],
        }
    }
}

impl<E: Entity, D: Driver> Repository<E, D> {
    /// Invoke a blocking method.
    pub fn execute(&self, method: &str, args: Vec<Arg<E>>) -> Result<Outcome<E>> {
        let bound = self.bound(method, Flavor::Sync)?;
        self.invoke(&bound, args)
    }

    fn invoke(&self, method: &BoundMethod, args: Vec<Arg<E>>) -> Result<Outcome<E>> {
        let span = info_span!(
            "repository.invoke",
            method = %method.signature,
            interceptor = %method.interceptor()
        );
        let _enter = span.enter();

        let outcome = interceptor::plan(method, &self.config, args).and_then(|mut plan| {
            let results = interceptor::run(self.driver.as_ref(), &mut plan)?;
            interceptor::finish(method, plan, results)
        });
        log_outcome(&outcome);
        outcome
    }

    fn call(&self, operation: ContractMethod, args: Vec<Arg<E>>) -> Result<Outcome<E>> {
        let method = self.contract(operation, Flavor::Sync)?;
        self.invoke(&method, args)
    }
}

impl<E: Entity, D: AsyncDriver + 'static> Repository<E, D> {
    /// Invoke an async method. The call is running when this returns.
    pub fn execute_async(&self, method: &str, args: Vec<Arg<E>>) -> DataFuture<Outcome<E>> {
        match self.bound(method, Flavor::Async) {
            Ok(bound) => DataFuture::spawn(self.deferred(bound, args)),
            Err(err) => DataFuture::failed(err),
        }
    }

    /// Invoke a reactive method.
    ///
    /// Multi-valued results are emitted element by element; everything else
    /// is a single item. Nothing runs until the stream is polled.
    pub fn execute_reactive(&self, method: &str, args: Vec<Arg<E>>) -> Flux<Outcome<E>> {
        let call = match self.bound(method, Flavor::Reactive) {
            Ok(bound) => self.deferred(bound, args),
            Err(err) => future::ready(Err(err)).boxed(),
        };
        call.map_ok(|outcome| {
            stream::iter(outcome.into_elements().into_iter().map(Ok::<_, DataError>))
        })
        .try_flatten_stream()
        .boxed()
    }

    /// Async view sharing this repository's dispatch table and driver.
    ///
    /// ```no_run
    /// use rustdata::prelude::*;
    /// # #[derive(Entity, Clone)]
    /// # struct Book { #[id] #[generated] id: Option<i64>, title: String }
    /// # tokio_test::block_on(async {
    /// let books = Repository::<Book, _>::builder(MemoryDriver::new())
    ///     .build()
    ///     .unwrap()
    ///     .to_async();
    /// let saved = books.save(Book { id: None, title: "Dune".into() }).await.unwrap();
    /// assert!(books.exists_by_id(saved.id.unwrap()).await.unwrap());
    /// # });
    /// ```
    pub fn to_async(&self) -> AsyncRepository<E, D> {
        AsyncRepository {
            inner: self.clone(),
        }
    }

    pub fn to_reactive(&self) -> ReactiveRepository<E, D> {
        ReactiveRepository {
            inner: self.clone(),
        }
    }

    fn deferred(&self, method: Arc<BoundMethod>, args: Vec<Arg<E>>) -> Mono<Outcome<E>> {
        invoke_async(
            method,
            Arc::clone(&self.driver),
            Arc::clone(&self.config),
            args,
        )
        .boxed()
    }
}

async fn invoke_async<E: Entity, D: AsyncDriver + 'static>(
    method: Arc<BoundMethod>,
    driver: Arc<D>,
    config: Arc<DataConfig>,
    args: Vec<Arg<E>>,
) -> Result<Outcome<E>> {
    let span = info_span!(
        "repository.invoke",
        method = %method.signature,
        interceptor = %method.interceptor()
    );
    async move {
        let outcome = async {
            let mut plan = interceptor::plan(&method, &config, args)?;
            let results = interceptor::run_async(driver.as_ref(), &mut plan).await?;
            interceptor::finish(&method, plan, results)
        }
        .await;
        log_outcome(&outcome);
        outcome
    }
    .instrument(span)
    .await
}

fn log_outcome<E>(outcome: &Result<Outcome<E>>) {
    match outcome {
        Ok(result) => event!(Level::DEBUG, result = result.describe(), "repository call completed"),
        Err(err) => event!(Level::ERROR, error = %err, "repository call failed"),
    }
}

/// Builds and compiles a [`Repository`].
///
/// Without explicit [`extends`](Self::extends) calls the repository inherits
/// every contract, so it can be used through all three flavors.
pub struct RepositoryBuilder<E, D> {
    driver: D,
    name: Option<String>,
    config: DataConfig,
    converters: ConverterRegistry,
    extends: Vec<Contract>,
    methods: Vec<Result<MethodElement>>,
    introspected: Vec<(&'static str, Vec<&'static str>)>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity, D> RepositoryBuilder<E, D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            name: None,
            config: DataConfig::default(),
            converters: ConverterRegistry::with_defaults(),
            extends: Vec::new(),
            methods: Vec::new(),
            introspected: Vec::new(),
            _entity: PhantomData,
        }
    }

    /// Repository name used in diagnostics. Defaults to `<Entity>Repository`.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn config(mut self, config: DataConfig) -> Self {
        self.config = config;
        self
    }

    pub fn converters(mut self, converters: ConverterRegistry) -> Self {
        self.converters = converters;
        self
    }

    pub fn extends(mut self, contract: Contract) -> Self {
        if !self.extends.contains(&contract) {
            self.extends.push(contract);
        }
        self
    }

    /// Declare a method from its signature, e.g.
    /// `findByTitle(title: String): Vec<Book>`.
    pub fn method(mut self, signature: &str) -> Self {
        self.methods.push(MethodElement::parse(signature));
        self
    }

    pub fn method_element(mut self, method: MethodElement) -> Self {
        self.methods.push(Ok(method));
        self
    }

    /// Let finders return `T`, read from the entity properties its fields name.
    pub fn introspect<T: Introspected>(mut self) -> Self {
        self.introspected.push((T::type_name(), T::fields()));
        self
    }

    /// Resolve the entity metadata and compile every method.
    pub fn build(self) -> std::result::Result<Repository<E, D>, CompileErrors> {
        let name = self
            .name
            .unwrap_or_else(|| format!("{}Repository", E::definition().name()));
        let mut errors = CompileErrors::new(&name);

        let config = self
            .introspected
            .iter()
            .fold(self.config, |config, (type_name, fields)| {
                config.introspected(type_name, fields)
            });
        if let Err(err) = config.validate() {
            errors.push(err);
            return Err(errors);
        }
        let entity = match config
            .strategies(self.converters)
            .and_then(|strategies| PersistentEntity::of::<E>(&strategies))
        {
            Ok(entity) => entity,
            Err(err) => {
                errors.push(err);
                return Err(errors);
            }
        };

        let mut element = RepositoryElement::new(&name, entity.name());
        element.extends = if self.extends.is_empty() {
            Contract::ALL.to_vec()
        } else {
            self.extends
        };
        for method in self.methods {
            match method {
                Ok(method) => element.methods.push(method),
                Err(err) => errors.push(err),
            }
        }

        let compiled = match RepositoryCompiler::new(config.clone()).compile(&element, &entity) {
            Ok(compiled) => compiled,
            Err(failed) => {
                errors.errors.extend(failed.errors);
                return Err(errors);
            }
        };
        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Repository {
            compiled: Arc::new(compiled),
            driver: Arc::new(self.driver),
            config: Arc::new(config),
            _entity: PhantomData,
        })
    }
}

fn unit<E>(_: Outcome<E>) -> Result<()> {
    Ok(())
}

impl<E: Entity, D: Driver> CrudRepository<E> for Repository<E, D> {
    fn save(&self, entity: E) -> Result<E> {
        self.call(ContractMethod::Save, vec![Arg::Entity(entity)])?
            .into_entity()
    }

    fn save_all(&self, entities: Vec<E>) -> Result<Vec<E>> {
        self.call(ContractMethod::SaveAll, vec![Arg::Entities(entities)])?
            .into_entities()
    }

    fn find_by_id<I: Into<Value>>(&self, id: I) -> Result<Option<E>> {
        self.call(ContractMethod::FindById, self.id_args(id.into()))?
            .into_optional()
    }

    fn exists_by_id<I: Into<Value>>(&self, id: I) -> Result<bool> {
        self.call(ContractMethod::ExistsById, self.id_args(id.into()))?
            .into_exists()
    }

    fn find_all(&self) -> Result<Vec<E>> {
        self.call(ContractMethod::FindAll, Vec::new())?.into_entities()
    }

    fn count(&self) -> Result<u64> {
        self.call(ContractMethod::Count, Vec::new())?.into_count()
    }

    fn delete_by_id<I: Into<Value>>(&self, id: I) -> Result<()> {
        self.call(ContractMethod::DeleteById, self.id_args(id.into()))
            .and_then(unit)
    }

    fn delete(&self, entity: E) -> Result<()> {
        self.call(ContractMethod::Delete, vec![Arg::Entity(entity)])
            .and_then(unit)
    }

    fn delete_all(&self) -> Result<()> {
        self.call(ContractMethod::DeleteAll, Vec::new()).and_then(unit)
    }

    fn delete_all_entities(&self, entities: Vec<E>) -> Result<()> {
        self.call(ContractMethod::DeleteAllEntities, vec![Arg::Entities(entities)])
            .and_then(unit)
    }

    fn update(&self, entity: E) -> Result<E> {
        self.call(ContractMethod::Update, vec![Arg::Entity(entity)])?
            .into_entity()
    }

    fn update_all(&self, entities: Vec<E>) -> Result<Vec<E>> {
        self.call(ContractMethod::UpdateAll, vec![Arg::Entities(entities)])?
            .into_entities()
    }
}

impl<E: Entity, D: Driver> PageableRepository<E> for Repository<E, D> {
    fn find_all_sorted(&self, sort: Sort) -> Result<Vec<E>> {
        self.call(ContractMethod::FindAllSorted, vec![Arg::Sort(sort)])?
            .into_entities()
    }

    fn find_all_paged(&self, pageable: Pageable) -> Result<Page<E>> {
        self.call(ContractMethod::FindAllPaged, vec![Arg::Pageable(pageable)])?
            .into_page()
    }
}

/// Async view of a [`Repository`], implementing the async contracts.
pub struct AsyncRepository<E, D> {
    inner: Repository<E, D>,
}

impl<E, D> Clone for AsyncRepository<E, D> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E: Entity, D: AsyncDriver + 'static> AsyncRepository<E, D> {
    pub fn repository(&self) -> &Repository<E, D> {
        &self.inner
    }

    fn call<T: Send + 'static>(
        &self,
        operation: ContractMethod,
        args: Vec<Arg<E>>,
        shape: fn(Outcome<E>) -> Result<T>,
    ) -> DataFuture<T> {
        match self.inner.contract(operation, Flavor::Async) {
            Ok(method) => {
                let call = self.inner.deferred(method, args);
                DataFuture::spawn(async move { shape(call.await?) })
            }
            Err(err) => DataFuture::failed(err),
        }
    }
}

impl<E: Entity, D: AsyncDriver + 'static> AsyncCrudRepository<E> for AsyncRepository<E, D> {
    fn save(&self, entity: E) -> DataFuture<E> {
        self.call(ContractMethod::Save, vec![Arg::Entity(entity)], Outcome::into_entity)
    }

    fn save_all(&self, entities: Vec<E>) -> DataFuture<Vec<E>> {
        self.call(
            ContractMethod::SaveAll,
            vec![Arg::Entities(entities)],
            Outcome::into_entities,
        )
    }

    fn find_by_id<I: Into<Value>>(&self, id: I) -> DataFuture<Option<E>> {
        let args = self.inner.id_args(id.into());
        self.call(ContractMethod::FindById, args, Outcome::into_optional)
    }

    fn exists_by_id<I: Into<Value>>(&self, id: I) -> DataFuture<bool> {
        let args = self.inner.id_args(id.into());
        self.call(ContractMethod::ExistsById, args, Outcome::into_exists)
    }

    fn find_all(&self) -> DataFuture<Vec<E>> {
        self.call(ContractMethod::FindAll, Vec::new(), Outcome::into_entities)
    }

    fn count(&self) -> DataFuture<u64> {
        self.call(ContractMethod::Count, Vec::new(), Outcome::into_count)
    }

    fn delete_by_id<I: Into<Value>>(&self, id: I) -> DataFuture<()> {
        let args = self.inner.id_args(id.into());
        self.call(ContractMethod::DeleteById, args, unit)
    }

    fn delete(&self, entity: E) -> DataFuture<()> {
        self.call(ContractMethod::Delete, vec![Arg::Entity(entity)], unit)
    }

    fn delete_all(&self) -> DataFuture<()> {
        self.call(ContractMethod::DeleteAll, Vec::new(), unit)
    }

    fn delete_all_entities(&self, entities: Vec<E>) -> DataFuture<()> {
        self.call(
            ContractMethod::DeleteAllEntities,
            vec![Arg::Entities(entities)],
            unit,
        )
    }

    fn update(&self, entity: E) -> DataFuture<E> {
        self.call(ContractMethod::Update, vec![Arg::Entity(entity)], Outcome::into_entity)
    }

    fn update_all(&self, entities: Vec<E>) -> DataFuture<Vec<E>> {
        self.call(
            ContractMethod::UpdateAll,
            vec![Arg::Entities(entities)],
            Outcome::into_entities,
        )
    }
}

impl<E: Entity, D: AsyncDriver + 'static> AsyncPageableRepository<E> for AsyncRepository<E, D> {
    fn find_all_sorted(&self, sort: Sort) -> DataFuture<Vec<E>> {
        self.call(
            ContractMethod::FindAllSorted,
            vec![Arg::Sort(sort)],
            Outcome::into_entities,
        )
    }

    fn find_all_paged(&self, pageable: Pageable) -> DataFuture<Page<E>> {
        self.call(
            ContractMethod::FindAllPaged,
            vec![Arg::Pageable(pageable)],
            Outcome::into_page,
        )
    }
}

/// Reactive view of a [`Repository`], implementing the reactive contracts.
pub struct ReactiveRepository<E, D> {
    inner: Repository<E, D>,
}

impl<E, D> Clone for ReactiveRepository<E, D> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E: Entity, D: AsyncDriver + 'static> ReactiveRepository<E, D> {
    pub fn repository(&self) -> &Repository<E, D> {
        &self.inner
    }

    fn mono<T: Send + 'static>(
        &self,
        operation: ContractMethod,
        args: Vec<Arg<E>>,
        shape: fn(Outcome<E>) -> Result<T>,
    ) -> Mono<T> {
        match self.inner.contract(operation, Flavor::Reactive) {
            Ok(method) => self
                .inner
                .deferred(method, args)
                .map(move |outcome| outcome.and_then(shape))
                .boxed(),
            Err(err) => future::ready(Err(err)).boxed(),
        }
    }

    fn flux(&self, operation: ContractMethod, args: Vec<Arg<E>>) -> Flux<E> {
        self.mono(operation, args, Ok)
            .map_ok(|outcome| {
                stream::iter(outcome.into_elements().into_iter().map(Outcome::into_entity))
            })
            .try_flatten_stream()
            .boxed()
    }
}

impl<E: Entity, D: AsyncDriver + 'static> ReactiveCrudRepository<E> for ReactiveRepository<E, D> {
    fn save(&self, entity: E) -> Mono<E> {
        self.mono(ContractMethod::Save, vec![Arg::Entity(entity)], Outcome::into_entity)
    }

    fn save_all(&self, entities: Vec<E>) -> Flux<E> {
        self.flux(ContractMethod::SaveAll, vec![Arg::Entities(entities)])
    }

    fn find_by_id<I: Into<Value>>(&self, id: I) -> Mono<Option<E>> {
        let args = self.inner.id_args(id.into());
        self.mono(ContractMethod::FindById, args, Outcome::into_optional)
    }

    fn exists_by_id<I: Into<Value>>(&self, id: I) -> Mono<bool> {
        let args = self.inner.id_args(id.into());
        self.mono(ContractMethod::ExistsById, args, Outcome::into_exists)
    }

    fn find_all(&self) -> Flux<E> {
        self.flux(ContractMethod::FindAll, Vec::new())
    }

    fn count(&self) -> Mono<u64> {
        self.mono(ContractMethod::Count, Vec::new(), Outcome::into_count)
    }

    fn delete_by_id<I: Into<Value>>(&self, id: I) -> Mono<()> {
        let args = self.inner.id_args(id.into());
        self.mono(ContractMethod::DeleteById, args, unit)
    }

    fn delete(&self, entity: E) -> Mono<()> {
        self.mono(ContractMethod::Delete, vec![Arg::Entity(entity)], unit)
    }

    fn delete_all(&self) -> Mono<()> {
        self.mono(ContractMethod::DeleteAll, Vec::new(), unit)
    }

    fn delete_all_entities(&self, entities: Vec<E>) -> Mono<()> {
        self.mono(
            ContractMethod::DeleteAllEntities,
            vec![Arg::Entities(entities)],
            unit,
        )
    }

    fn update(&self, entity: E) -> Mono<E> {
        self.mono(ContractMethod::Update, vec![Arg::Entity(entity)], Outcome::into_entity)
    }

    fn update_all(&self, entities: Vec<E>) -> Flux<E> {
        self.flux(ContractMethod::UpdateAll, vec![Arg::Entities(entities)])
    }
}

impl<E: Entity, D: AsyncDriver + 'static> ReactivePageableRepository<E> for ReactiveRepository<E, D> {
    fn find_all_sorted(&self, sort: Sort) -> Flux<E> {
        self.flux(ContractMethod::FindAllSorted, vec![Arg::Sort(sort)])
    }

    fn find_all_paged(&self, pageable: Pageable) -> Mono<Page<E>> {
        self.mono(
            ContractMethod::FindAllPaged,
            vec![Arg::Pageable(pageable)],
            Outcome::into_page,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::core::FromValue;
    use crate::model::{EntityDefinition, PropertyDef, TypeRef};
    use crate::runtime::{ResultSet, Statement};

    #[derive(Debug, Clone, PartialEq)]
    struct Tag {
        id: i64,
        label: String,
    }

    impl Entity for Tag {
        fn definition() -> EntityDefinition {
            EntityDefinition::new("Tag")
                .property(PropertyDef::new("id", TypeRef::of::<i64>()).id())
                .property(PropertyDef::new("label", TypeRef::of::<String>()))
        }

        fn to_values(&self) -> Vec<Value> {
            vec![self.id.into(), self.label.clone().into()]
        }

        fn from_values(values: Vec<Value>) -> Result<Self> {
            let mut values = values.into_iter();
            Ok(Self {
                id: FromValue::from_value(values.next().unwrap_or(Value::Null))?,
                label: FromValue::from_value(values.next().unwrap_or(Value::Null))?,
            })
        }
    }

    /// Records every statement and answers with an empty result.
    #[derive(Default)]
    struct Recording {
        seen: Mutex<Vec<String>>,
    }

    impl Recording {
        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl Driver for Recording {
        fn execute(&self, statement: Statement) -> Result<ResultSet> {
            self.seen.lock()?.push(statement.to_string());
            Ok(ResultSet::empty())
        }
    }

    #[async_trait]
    impl AsyncDriver for Recording {
        async fn execute_async(&self, statement: Statement) -> Result<ResultSet> {
            self.execute(statement)
        }
    }

    fn repository() -> Repository<Tag, Recording> {
        Repository::builder(Recording::default())
            .method("findByLabel(label: String): Vec<Tag>")
            .method("streamByLabel(label: String): Flux<Tag>")
            .build()
            .unwrap()
    }

    #[test]
    fn default_name_and_contracts() {
        let repository = repository();
        assert_eq!(repository.compiled().name(), "TagRepository");
        assert_eq!(repository.compiled().extends(), &Contract::ALL[..]);
    }

    #[test]
    fn rejects_flavor_mismatch() {
        let repository = repository();
        let result = repository.execute("streamByLabel", vec![Arg::value("x")]);
        assert!(matches!(result, Err(DataError::UnsupportedOperation(_))));
        assert!(repository.driver().seen().is_empty());
    }

    #[test]
    fn collects_signature_and_match_errors() {
        let errors = Repository::<Tag, _>::builder(Recording::default())
            .method("findByLabel(label: String")
            .method("findByColour(colour: String): Vec<Tag>")
            .build()
            .unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.repository, "TagRepository");
    }

    #[tokio::test]
    async fn reactive_calls_are_cold() {
        let repository = repository();
        let stream = repository.execute_reactive("streamByLabel", vec![Arg::value("x")]);
        assert!(repository.driver().seen().is_empty());

        let items: Vec<_> = stream.collect().await;
        assert!(items.is_empty());
        assert_eq!(repository.driver().seen().len(), 1);
    }

    #[test]
    fn missing_method_is_reported() {
        let repository = repository();
        assert!(matches!(
            repository.execute("findByNothing", Vec::new()),
            Err(DataError::NoMatcherFound(_))
        ));
    }
}
