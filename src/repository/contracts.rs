//! Repository contracts.
//!
//! Each trait mirrors one inheritable contract. Identity arguments take any
//! value convertible to [`Value`]; composite identities are passed as a
//! [`Value::List`] in identity order.

use crate::core::{Result, Value};
use crate::model::Entity;
use crate::query::{Page, Pageable, Sort};
use crate::runtime::{DataFuture, Flux, Mono};

/// Blocking create/read/update/delete operations.
pub trait CrudRepository<E: Entity> {
    /// Insert one entity and return it as stored (generated identity filled in).
    fn save(&self, entity: E) -> Result<E>;

    fn save_all(&self, entities: Vec<E>) -> Result<Vec<E>>;

    fn find_by_id<I: Into<Value>>(&self, id: I) -> Result<Option<E>>;

    fn exists_by_id<I: Into<Value>>(&self, id: I) -> Result<bool>;

    fn find_all(&self) -> Result<Vec<E>>;

    fn count(&self) -> Result<u64>;

    fn delete_by_id<I: Into<Value>>(&self, id: I) -> Result<()>;

    fn delete(&self, entity: E) -> Result<()>;

    fn delete_all(&self) -> Result<()>;

    fn delete_all_entities(&self, entities: Vec<E>) -> Result<()>;

    /// Replace the stored row matching the entity's identity.
    fn update(&self, entity: E) -> Result<E>;

    fn update_all(&self, entities: Vec<E>) -> Result<Vec<E>>;
}

/// Blocking sorted and paged reads.
pub trait PageableRepository<E: Entity>: CrudRepository<E> {
    fn find_all_sorted(&self, sort: Sort) -> Result<Vec<E>>;

    /// One page plus the total number of stored entities.
    fn find_all_paged(&self, pageable: Pageable) -> Result<Page<E>>;
}

/// Future-returning variant of [`CrudRepository`].
///
/// Calls start immediately; the returned [`DataFuture`] completes on a
/// runtime worker.
pub trait AsyncCrudRepository<E: Entity> {
    fn save(&self, entity: E) -> DataFuture<E>;

    fn save_all(&self, entities: Vec<E>) -> DataFuture<Vec<E>>;

    fn find_by_id<I: Into<Value>>(&self, id: I) -> DataFuture<Option<E>>;

    fn exists_by_id<I: Into<Value>>(&self, id: I) -> DataFuture<bool>;

    fn find_all(&self) -> DataFuture<Vec<E>>;

    fn count(&self) -> DataFuture<u64>;

    fn delete_by_id<I: Into<Value>>(&self, id: I) -> DataFuture<()>;

    fn delete(&self, entity: E) -> DataFuture<()>;

    fn delete_all(&self) -> DataFuture<()>;

    fn delete_all_entities(&self, entities: Vec<E>) -> DataFuture<()>;

    fn update(&self, entity: E) -> DataFuture<E>;

    fn update_all(&self, entities: Vec<E>) -> DataFuture<Vec<E>>;
}

pub trait AsyncPageableRepository<E: Entity>: AsyncCrudRepository<E> {
    fn find_all_sorted(&self, sort: Sort) -> DataFuture<Vec<E>>;

    fn find_all_paged(&self, pageable: Pageable) -> DataFuture<Page<E>>;
}

/// Cold reactive variant of [`CrudRepository`].
///
/// Nothing reaches the backend until the returned producer is polled, and
/// dropping it abandons the in-flight call.
pub trait ReactiveCrudRepository<E: Entity> {
    fn save(&self, entity: E) -> Mono<E>;

    fn save_all(&self, entities: Vec<E>) -> Flux<E>;

    fn find_by_id<I: Into<Value>>(&self, id: I) -> Mono<Option<E>>;

    fn exists_by_id<I: Into<Value>>(&self, id: I) -> Mono<bool>;

    fn find_all(&self) -> Flux<E>;

    fn count(&self) -> Mono<u64>;

    fn delete_by_id<I: Into<Value>>(&self, id: I) -> Mono<()>;

    fn delete(&self, entity: E) -> Mono<()>;

    fn delete_all(&self) -> Mono<()>;

    fn delete_all_entities(&self, entities: Vec<E>) -> Mono<()>;

    fn update(&self, entity: E) -> Mono<E>;

    fn update_all(&self, entities: Vec<E>) -> Flux<E>;
}

pub trait ReactivePageableRepository<E: Entity>: ReactiveCrudRepository<E> {
    fn find_all_sorted(&self, sort: Sort) -> Flux<E>;

    fn find_all_paged(&self, pageable: Pageable) -> Mono<Page<E>>;
}
