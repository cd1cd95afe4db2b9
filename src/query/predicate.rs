//! Predicate tree of the criteria IR.
//!
//! Pure and backend-agnostic: properties are referenced by declared name and
//! values are either literals or references to invocation arguments. Column
//! resolution and evaluation happen in drivers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::Value;

/// Reference to a runtime invocation argument, by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterRef {
    pub index: usize,
    pub name: Option<String>,
}

impl ParameterRef {
    pub fn new(index: usize) -> Self {
        Self { index, name: None }
    }

    pub fn named(index: usize, name: impl Into<String>) -> Self {
        Self {
            index,
            name: Some(name.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Parameter(ParameterRef),
    Literal(Value),
}

impl Operand {
    pub fn param(index: usize) -> Self {
        Self::Parameter(ParameterRef::new(index))
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parameter(param) => write!(f, "?{}", param.index),
            Self::Literal(Value::Text(text)) => write!(f, "'{}'", text.replace('\'', "''")),
            Self::Literal(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
    ILike,
    StartsWith,
    EndsWith,
    Contains,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Like => "LIKE",
            Self::ILike => "ILIKE",
            Self::StartsWith => "STARTS WITH",
            Self::EndsWith => "ENDS WITH",
            Self::Contains => "CONTAINS",
        }
    }

    pub fn is_textual(self) -> bool {
        matches!(
            self,
            Self::Like | Self::ILike | Self::StartsWith | Self::EndsWith | Self::Contains
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    And(Vec<Self>),
    Or(Vec<Self>),
    Not(Box<Self>),
    Compare {
        property: String,
        op: CompareOp,
        value: Operand,
        ignore_case: bool,
    },
    Between {
        property: String,
        low: Operand,
        high: Operand,
    },
    In {
        property: String,
        values: Operand,
        negated: bool,
    },
    IsNull {
        property: String,
        negated: bool,
    },
    IsEmpty {
        property: String,
        negated: bool,
    },
    IsTrue {
        property: String,
        expected: bool,
    },
}

impl Predicate {
    pub fn compare(property: impl Into<String>, op: CompareOp, value: Operand) -> Self {
        Self::Compare {
            property: property.into(),
            op,
            value,
            ignore_case: false,
        }
    }

    pub fn eq(property: impl Into<String>, value: Operand) -> Self {
        Self::compare(property, CompareOp::Eq, value)
    }

    pub fn ne(property: impl Into<String>, value: Operand) -> Self {
        Self::compare(property, CompareOp::Ne, value)
    }

    pub fn lt(property: impl Into<String>, value: Operand) -> Self {
        Self::compare(property, CompareOp::Lt, value)
    }

    pub fn lte(property: impl Into<String>, value: Operand) -> Self {
        Self::compare(property, CompareOp::Lte, value)
    }

    pub fn gt(property: impl Into<String>, value: Operand) -> Self {
        Self::compare(property, CompareOp::Gt, value)
    }

    pub fn gte(property: impl Into<String>, value: Operand) -> Self {
        Self::compare(property, CompareOp::Gte, value)
    }

    pub fn between(property: impl Into<String>, low: Operand, high: Operand) -> Self {
        Self::Between {
            property: property.into(),
            low,
            high,
        }
    }

    pub fn in_list(property: impl Into<String>, values: Operand) -> Self {
        Self::In {
            property: property.into(),
            values,
            negated: false,
        }
    }

    pub fn is_null(property: impl Into<String>) -> Self {
        Self::IsNull {
            property: property.into(),
            negated: false,
        }
    }

    pub fn is_not_null(property: impl Into<String>) -> Self {
        Self::IsNull {
            property: property.into(),
            negated: true,
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(predicate: Self) -> Self {
        Self::Not(Box::new(predicate))
    }

    /// Mark a textual comparison case-insensitive. No-op for other nodes.
    pub fn ignoring_case(mut self) -> Self {
        if let Self::Compare { ignore_case, .. } = &mut self {
            *ignore_case = true;
        }
        self
    }

    /// Conjunction, flattening nested `And` nodes.
    pub fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::And(mut left), Self::And(right)) => {
                left.extend(right);
                Self::And(left)
            }
            (Self::And(mut left), right) => {
                left.push(right);
                Self::And(left)
            }
            (left, Self::And(mut right)) => {
                right.insert(0, left);
                Self::And(right)
            }
            (left, right) => Self::And(vec![left, right]),
        }
    }

    /// Disjunction, flattening nested `Or` nodes.
    pub fn or(self, other: Self) -> Self {
        match (self, other) {
            (Self::Or(mut left), Self::Or(right)) => {
                left.extend(right);
                Self::Or(left)
            }
            (Self::Or(mut left), right) => {
                left.push(right);
                Self::Or(left)
            }
            (left, right) => Self::Or(vec![left, right]),
        }
    }

    /// Top-level conjuncts; a non-`And` node is its own single conjunct.
    pub fn conjuncts(&self) -> Vec<&Self> {
        match self {
            Self::And(children) => children.iter().collect(),
            other => vec![other],
        }
    }

    /// Every property referenced anywhere in the tree.
    pub fn properties(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_properties(&mut out);
        out
    }

    fn collect_properties<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::And(children) | Self::Or(children) => {
                for child in children {
                    child.collect_properties(out);
                }
            }
            Self::Not(inner) => inner.collect_properties(out),
            Self::Compare { property, .. }
            | Self::Between { property, .. }
            | Self::In { property, .. }
            | Self::IsNull { property, .. }
            | Self::IsEmpty { property, .. }
            | Self::IsTrue { property, .. } => out.push(property),
        }
    }

    /// Every argument reference, in tree order.
    pub fn parameters(&self) -> Vec<&ParameterRef> {
        let mut out = Vec::new();
        self.collect_parameters(&mut out);
        out
    }

    fn collect_parameters<'a>(&'a self, out: &mut Vec<&'a ParameterRef>) {
        fn push<'a>(operand: &'a Operand, out: &mut Vec<&'a ParameterRef>) {
            if let Operand::Parameter(param) = operand {
                out.push(param);
            }
        }

        match self {
            Self::And(children) | Self::Or(children) => {
                for child in children {
                    child.collect_parameters(out);
                }
            }
            Self::Not(inner) => inner.collect_parameters(out),
            Self::Compare { value, .. } => push(value, out),
            Self::Between { low, high, .. } => {
                push(low, out);
                push(high, out);
            }
            Self::In { values, .. } => push(values, out),
            Self::IsNull { .. } | Self::IsEmpty { .. } | Self::IsTrue { .. } => {}
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And(children) => write_joined(f, children, " AND "),
            Self::Or(children) => write_joined(f, children, " OR "),
            Self::Not(inner) => write!(f, "NOT ({inner})"),
            Self::Compare {
                property,
                op,
                value,
                ignore_case: true,
            } => write!(f, "LOWER({property}) {} LOWER({value})", op.symbol()),
            Self::Compare {
                property, op, value, ..
            } => write!(f, "{property} {} {value}", op.symbol()),
            Self::Between {
                property,
                low,
                high,
            } => write!(f, "{property} BETWEEN {low} AND {high}"),
            Self::In {
                property,
                values,
                negated,
            } => {
                let keyword = if *negated { "NOT IN" } else { "IN" };
                write!(f, "{property} {keyword} {values}")
            }
            Self::IsNull { property, negated } => {
                let keyword = if *negated { "IS NOT NULL" } else { "IS NULL" };
                write!(f, "{property} {keyword}")
            }
            Self::IsEmpty { property, negated } => {
                let keyword = if *negated { "IS NOT EMPTY" } else { "IS EMPTY" };
                write!(f, "{property} {keyword}")
            }
            Self::IsTrue { property, expected } => {
                let keyword = if *expected { "IS TRUE" } else { "IS FALSE" };
                write!(f, "{property} {keyword}")
            }
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, children: &[Predicate], separator: &str) -> fmt::Result {
    f.write_str("(")?;
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{child}")?;
    }
    f.write_str(")")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_flattens_and_renders() {
        let predicate = Predicate::gt("age", Operand::param(0))
            .and(Predicate::eq("name", Operand::param(1)))
            .and(Predicate::is_not_null("email"));
        assert_eq!(predicate.conjuncts().len(), 3);
        assert_eq!(
            predicate.to_string(),
            "(age > ?0 AND name = ?1 AND email IS NOT NULL)"
        );
    }

    #[test]
    fn collects_parameters_in_order() {
        let predicate = Predicate::between("pages", Operand::param(0), Operand::param(1))
            .or(Predicate::eq("title", Operand::literal("x")));
        let indexes: Vec<usize> = predicate.parameters().iter().map(|p| p.index).collect();
        assert_eq!(indexes, vec![0, 1]);
        assert_eq!(predicate.properties(), vec!["pages", "title"]);
        assert_eq!(
            predicate.to_string(),
            "(pages BETWEEN ?0 AND ?1 OR title = 'x')"
        );
    }

    #[test]
    fn ignore_case_renders_lowered() {
        let predicate = Predicate::eq("title", Operand::param(0)).ignoring_case();
        assert_eq!(predicate.to_string(), "LOWER(title) = LOWER(?0)");
    }
}
