//! Predicate evaluation over stored rows.
//!
//! `NULL` never satisfies a comparison; only the null and empty checks
//! match it.

use std::cmp::Ordering;

use crate::core::{DataError, Result, Value};
use crate::expression::pattern::eval_like;
use crate::model::PersistentEntity;
use crate::query::{CompareOp, PreparedQuery, Predicate};

pub struct RowEvaluator<'a> {
    entity: &'a PersistentEntity,
    query: &'a PreparedQuery,
}

impl<'a> RowEvaluator<'a> {
    pub fn new(query: &'a PreparedQuery) -> Self {
        Self {
            entity: query.entity(),
            query,
        }
    }

    /// Column value of `property` in `row`.
    pub fn column<'r>(&self, row: &'r [Value], property: &str) -> Result<&'r Value> {
        self.entity
            .property_index(property)
            .and_then(|idx| row.get(idx))
            .ok_or_else(|| {
                DataError::Backend(format!(
                    "{} has no column for property '{property}'",
                    self.entity.persisted_name()
                ))
            })
    }

    pub fn matches(&self, row: &[Value]) -> Result<bool> {
        match self.query.predicate() {
            Some(predicate) => self.eval(predicate, row),
            None => Ok(true),
        }
    }

    fn eval(&self, predicate: &Predicate, row: &[Value]) -> Result<bool> {
        match predicate {
            Predicate::And(children) => {
                for child in children {
                    if !self.eval(child, row)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Predicate::Or(children) => {
                for child in children {
                    if self.eval(child, row)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Predicate::Not(inner) => Ok(!self.eval(inner, row)?),
            Predicate::Compare {
                property,
                op,
                value,
                ignore_case,
            } => {
                let left = self.column(row, property)?;
                let right = self.query.bind(value)?;
                compare(left, *op, &right, *ignore_case)
            }
            Predicate::Between {
                property,
                low,
                high,
            } => {
                let value = self.column(row, property)?;
                let (low, high) = (self.query.bind(low)?, self.query.bind(high)?);
                if value.is_null() || low.is_null() || high.is_null() {
                    return Ok(false);
                }
                Ok(value.compare(&low)? != Ordering::Less && value.compare(&high)? != Ordering::Greater)
            }
            Predicate::In {
                property,
                values,
                negated,
            } => {
                let value = self.column(row, property)?;
                if value.is_null() {
                    return Ok(false);
                }
                let found = match self.query.bind(values)? {
                    Value::List(items) => items.iter().any(|item| item == value),
                    single => &single == value,
                };
                Ok(found != *negated)
            }
            Predicate::IsNull { property, negated } => {
                Ok(self.column(row, property)?.is_null() != *negated)
            }
            Predicate::IsEmpty { property, negated } => {
                Ok(self.column(row, property)?.is_empty() != *negated)
            }
            Predicate::IsTrue { property, expected } => {
                Ok(self.column(row, property)?.as_bool() == Some(*expected))
            }
        }
    }
}

fn folded(value: &Value, ignore_case: bool) -> Value {
    match value {
        Value::Text(text) if ignore_case => Value::Text(text.to_lowercase()),
        other => other.clone(),
    }
}

fn text<'v>(value: &'v Value, op: CompareOp) -> Result<&'v str> {
    value.as_str().ok_or_else(|| {
        DataError::TypeMismatch(format!(
            "{} needs text operands, got {}",
            op.symbol(),
            value.type_name()
        ))
    })
}

fn compare(left: &Value, op: CompareOp, right: &Value, ignore_case: bool) -> Result<bool> {
    if left.is_null() || right.is_null() {
        return Ok(false);
    }
    if op.is_textual() {
        let (haystack, needle) = (text(left, op)?, text(right, op)?);
        return match op {
            CompareOp::Like => eval_like(haystack, needle, !ignore_case),
            CompareOp::ILike => eval_like(haystack, needle, false),
            _ => {
                let (haystack, needle) = if ignore_case {
                    (haystack.to_lowercase(), needle.to_lowercase())
                } else {
                    (haystack.to_string(), needle.to_string())
                };
                Ok(match op {
                    CompareOp::StartsWith => haystack.starts_with(&needle),
                    CompareOp::EndsWith => haystack.ends_with(&needle),
                    _ => haystack.contains(&needle),
                })
            }
        };
    }

    let ordering = folded(left, ignore_case).compare(&folded(right, ignore_case))?;
    Ok(match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Ne => ordering != Ordering::Equal,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Lte => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_never_compares() {
        assert!(!compare(&Value::Null, CompareOp::Eq, &Value::Null, false).unwrap());
        assert!(!compare(&Value::Integer(1), CompareOp::Ne, &Value::Null, false).unwrap());
    }

    #[test]
    fn text_operators_honor_case() {
        let title = Value::from("Dune Messiah");
        assert!(compare(&title, CompareOp::StartsWith, &Value::from("dune"), true).unwrap());
        assert!(!compare(&title, CompareOp::StartsWith, &Value::from("dune"), false).unwrap());
        assert!(compare(&title, CompareOp::Contains, &Value::from("Mess"), false).unwrap());
        assert!(compare(&title, CompareOp::ILike, &Value::from("%MESSIAH"), false).unwrap());
        assert!(compare(&title, CompareOp::Eq, &Value::from("dune messiah"), true).unwrap());
        assert!(compare(&Value::Integer(3), CompareOp::StartsWith, &Value::from("3"), false).is_err());
    }

    #[test]
    fn numeric_ordering_coerces() {
        assert!(compare(&Value::Integer(3), CompareOp::Lt, &Value::Float(3.5), false).unwrap());
        assert!(compare(&Value::Integer(3), CompareOp::Gte, &Value::Integer(3), false).unwrap());
    }
}
