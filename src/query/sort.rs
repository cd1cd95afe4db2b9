use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Order {
    pub property: String,
    pub direction: Direction,
    #[serde(default)]
    pub ignore_case: bool,
}

impl Order {
    pub fn asc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: Direction::Asc,
            ignore_case: false,
        }
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: Direction::Desc,
            ignore_case: false,
        }
    }

    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = match self.direction {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        };
        if self.ignore_case {
            write!(f, "LOWER({}) {direction}", self.property)
        } else {
            write!(f, "{} {direction}", self.property)
        }
    }
}

/// Ordering supplied at call time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Sort {
    orders: Vec<Order>,
}

impl Sort {
    pub fn unsorted() -> Self {
        Self::default()
    }

    pub fn by(orders: impl IntoIterator<Item = Order>) -> Self {
        Self {
            orders: orders.into_iter().collect(),
        }
    }

    pub fn and(mut self, order: Order) -> Self {
        self.orders.push(order);
        self
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn is_sorted(&self) -> bool {
        !self.orders.is_empty()
    }
}

/// Page request: zero-based page number, page size, and ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pageable {
    number: usize,
    size: Option<usize>,
    sort: Sort,
}

impl Pageable {
    pub fn from(number: usize, size: usize) -> Self {
        Self {
            number,
            size: Some(size.max(1)),
            sort: Sort::unsorted(),
        }
    }

    pub fn unpaged() -> Self {
        Self {
            number: 0,
            size: None,
            sort: Sort::unsorted(),
        }
    }

    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    pub fn number(&self) -> usize {
        self.number
    }

    pub fn size(&self) -> Option<usize> {
        self.size
    }

    pub fn sort(&self) -> &Sort {
        &self.sort
    }

    pub fn is_unpaged(&self) -> bool {
        self.size.is_none()
    }

    pub fn offset(&self) -> usize {
        self.size.map_or(0, |size| self.number.saturating_mul(size))
    }

    pub fn next(&self) -> Self {
        Self {
            number: self.number.saturating_add(1),
            size: self.size,
            sort: self.sort.clone(),
        }
    }

    /// Clamp the page size to an upper bound.
    pub fn limited_to(mut self, max_size: usize) -> Self {
        if let Some(size) = self.size {
            self.size = Some(size.min(max_size.max(1)));
        }
        self
    }
}

impl Default for Pageable {
    fn default() -> Self {
        Self::unpaged()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_follows_page_number() {
        let pageable = Pageable::from(2, 10);
        assert_eq!(pageable.offset(), 20);
        assert_eq!(pageable.next().offset(), 30);
        assert_eq!(Pageable::unpaged().offset(), 0);
        assert_eq!(Pageable::from(usize::MAX, 10).offset(), usize::MAX);
        assert_eq!(Pageable::from(usize::MAX, 10).next().number(), usize::MAX);
    }

    #[test]
    fn clamps_to_max_size() {
        assert_eq!(Pageable::from(0, 500).limited_to(100).size(), Some(100));
        assert_eq!(Pageable::unpaged().limited_to(100).size(), None);
    }
}
