// ============================================================================
// rustdata Library
// ============================================================================

//! Repository method derivation and entity mapping.
//!
//! Entities describe their persistent shape through [`Entity`] (usually
//! derived). A repository is declared as a list of method signatures; each
//! is matched by name, parameters and return type into a backend-agnostic
//! criteria query, and executed through a [`Driver`](runtime::Driver) in a
//! blocking, async or reactive flavor.
//!
//! ```ignore
//! use rustdata::prelude::*;
//!
//! #[derive(Entity, Clone, Debug)]
//! struct Book {
//!     #[id]
//!     #[generated]
//!     id: Option<i64>,
//!     title: String,
//!     pages: i32,
//! }
//!
//! let books = Repository::<Book, _>::builder(MemoryDriver::new())
//!     .method("findByTitleStartingWith(prefix: String): Vec<Book>")
//!     .build()?;
//! books.save(Book { id: None, title: "Dune".into(), pages: 412 })?;
//! let found = books
//!     .execute("findByTitleStartingWith", vec![Arg::value("Du")])?
//!     .into_entities()?;
//! ```

extern crate self as rustdata;

pub mod config;
pub mod core;
pub mod matcher;
pub mod model;
pub mod prelude;
pub mod query;
pub mod repository;
pub mod runtime;
pub mod storage;

mod expression;

// Re-export main types for convenience
pub use config::DataConfig;
pub use core::{CompileErrors, DataError, FromValue, Result, Value};
pub use model::{
    DataType, Entity, EntityDefinition, Introspected, PersistentEntity, PropertyDef, TypeRef,
};
pub use query::{Page, Pageable, Slice, Sort};
pub use repository::{Repository, RepositoryBuilder};
pub use runtime::{DataFuture, Flux, Mono};
pub use storage::MemoryDriver;

pub use rustdata_derive::{Entity, Introspected};
