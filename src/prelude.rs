//! Commonly used types, grouped for a single glob import.
//!
//! `use rustdata::prelude::*;` brings in the entity derive, the repository
//! contracts and builders, the in-memory driver, and the query value types
//! most call sites need.

pub use crate::{Entity, Introspected};
pub use crate::config::DataConfig;
pub use crate::core::{CompileErrors, DataError, FromValue, Result, Value};
pub use crate::model::{ConverterRegistry, EntityDefinition, PropertyDef, TypeRef};
pub use crate::query::{Direction, Order, Page, Pageable, Slice, Sort};
pub use crate::repository::{
    AsyncCrudRepository, AsyncPageableRepository, AsyncRepository, CrudRepository,
    PageableRepository, ReactiveCrudRepository, ReactivePageableRepository, ReactiveRepository,
    Repository, RepositoryBuilder,
};
pub use crate::runtime::{Arg, AsyncDriver, DataFuture, Driver, Flux, Mono, Outcome};
pub use crate::storage::MemoryDriver;

pub mod advanced {
    //! Escape hatch for the compile-time pieces: matcher engine, criteria IR
    //! and the dispatch table. Application code normally stays on the
    //! top-level prelude.
    pub use crate::matcher::{
        CompiledRepository, Contract, MatcherKind, MethodElement, MethodMatchContext,
        RepositoryCompiler, RepositoryDefinition, match_method,
    };
    pub use crate::model::{PersistentEntity, PersistentProperty};
    pub use crate::query::{CriteriaBuilder, CriteriaQuery, Predicate, PreparedQuery};
    pub use crate::runtime::{BoundMethod, DispatchTable, ResultSet, Statement};
}
