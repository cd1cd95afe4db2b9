//! Scalar expression helpers shared by the in-memory backend.

pub mod pattern;

pub use pattern::eval_like;
