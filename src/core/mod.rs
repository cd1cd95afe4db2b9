pub mod error;
pub mod value;

pub use error::{CompileErrors, DataError, Result};
pub use value::{FromValue, Value};
