//! Criteria IR: predicates, projections, joins, ordering, and pagination.
//!
//! Backend-agnostic. The matcher engine builds a [`CriteriaQuery`], consumes
//! it into a shared [`QueryDescriptor`], and drivers execute the
//! [`PreparedQuery`] produced per call.

pub mod criteria;
pub mod descriptor;
pub mod page;
pub mod predicate;
pub mod sort;

pub use criteria::{
    Assignment, CriteriaBuilder, CriteriaQuery, JoinSpec, JoinType, Projection, StatementKind,
};
pub use descriptor::{PreparedQuery, QueryDescriptor};
pub use page::{Page, Slice};
pub use predicate::{CompareOp, Operand, ParameterRef, Predicate};
pub use sort::{Direction, Order, Pageable, Sort};
