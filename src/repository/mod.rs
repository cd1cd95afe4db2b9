//! Repository surface: the inheritable contracts and the generic
//! repository that implements them over a compiled dispatch table.

pub mod contracts;
mod generic;

pub use contracts::{
    AsyncCrudRepository, AsyncPageableRepository, CrudRepository, PageableRepository,
    ReactiveCrudRepository, ReactivePageableRepository,
};
pub use generic::{AsyncRepository, ReactiveRepository, Repository, RepositoryBuilder};
