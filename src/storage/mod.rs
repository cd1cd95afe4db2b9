//! In-process reference backend.

mod eval;
pub mod memory;
pub mod table;

pub use memory::MemoryDriver;
pub use table::{Row, Table};
