//! Runtime side of repositories: dispatch tables, interceptor execution,
//! the driver boundary, and the async/reactive result wrappers.

pub mod dispatch;
pub mod driver;
pub mod future;
pub mod hydrate;
pub mod interceptor;

pub use dispatch::{ArgRole, BoundMethod, DispatchTable};
pub use driver::{AsyncDriver, BlockingAdapter, Driver, ResultSet, Statement};
pub use future::{DataFuture, Flux, Mono};
pub use interceptor::{Arg, Outcome, Plan};
