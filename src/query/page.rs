use crate::query::sort::Pageable;

/// A page of results plus the total number of matching records.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    content: Vec<T>,
    pageable: Pageable,
    total_size: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, pageable: Pageable, total_size: u64) -> Self {
        Self {
            content,
            pageable,
            total_size,
        }
    }

    pub fn content(&self) -> &[T] {
        &self.content
    }

    pub fn into_content(self) -> Vec<T> {
        self.content
    }

    pub fn pageable(&self) -> &Pageable {
        &self.pageable
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn total_pages(&self) -> u64 {
        match self.pageable.size() {
            Some(size) => self.total_size.div_ceil(size as u64),
            None => u64::from(self.total_size > 0),
        }
    }

    pub fn number_of_elements(&self) -> usize {
        self.content.len()
    }

    pub fn has_next(&self) -> bool {
        (self.pageable.number() as u64).saturating_add(1) < self.total_pages()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            pageable: self.pageable,
            total_size: self.total_size,
        }
    }
}

/// A page of results without a total count.
#[derive(Debug, Clone, PartialEq)]
pub struct Slice<T> {
    content: Vec<T>,
    pageable: Pageable,
}

impl<T> Slice<T> {
    pub fn new(content: Vec<T>, pageable: Pageable) -> Self {
        Self { content, pageable }
    }

    pub fn content(&self) -> &[T] {
        &self.content
    }

    pub fn into_content(self) -> Vec<T> {
        self.content
    }

    pub fn pageable(&self) -> &Pageable {
        &self.pageable
    }

    pub fn number_of_elements(&self) -> usize {
        self.content.len()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Slice<U> {
        Slice {
            content: self.content.into_iter().map(f).collect(),
            pageable: self.pageable,
        }
    }
}
