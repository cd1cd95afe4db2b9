use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("No possible implementation found for method: {0}")]
    NoMatcherFound(String),

    #[error("Invalid repository method {method}: {reason}")]
    InvalidMethod { method: String, reason: String },

    #[error("Cannot query entity [{entity}] on non-existent property: {property}")]
    UnknownProperty { entity: String, property: String },

    #[error("Invalid entity '{0}'")]
    InvalidEntity(String),

    #[error("Cannot resolve converter '{converter}' for property {property}: {reason}")]
    ConverterResolution {
        converter: String,
        property: String,
        reason: String,
    },

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Empty result: {0}")]
    EmptyResult(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("No async runtime available: {0}")]
    NoRuntime(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

pub type Result<T> = std::result::Result<T, DataError>;

impl DataError {
    /// Prefix a type mismatch with the location it was found at.
    pub fn context(self, at: &str) -> Self {
        match self {
            Self::TypeMismatch(msg) => Self::TypeMismatch(format!("{at}: {msg}")),
            other => other,
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for DataError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<tokio::task::JoinError> for DataError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Backend(format!("backend worker failed: {err}"))
    }
}

/// Every build-time failure found while compiling one repository.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompileErrors {
    pub repository: String,
    pub errors: Vec<DataError>,
}

impl CompileErrors {
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            errors: Vec::new(),
        }
    }

    pub fn push(&mut self, err: DataError) {
        self.errors.push(err);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DataError> {
        self.errors.iter()
    }
}

impl fmt::Display for CompileErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} error(s) compiling repository {}",
            self.errors.len(),
            self.repository
        )?;
        for err in &self.errors {
            writeln!(f, "  - {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileErrors {}
