//! Naming strategies: how declared property and entity names become
//! persisted column and table names.

use std::fmt;
use std::sync::Arc;

use crate::core::{DataError, Result};
use crate::model::property::PersistentProperty;

/// Maps declared names to persisted names.
///
/// Explicit mapped names declared on a property always win over the
/// strategy's transformation.
pub trait NamingStrategy: Send + Sync + fmt::Debug {
    /// Stable identifier, as accepted by [`naming_strategy`].
    fn name(&self) -> &'static str;

    /// Transform a single declared name.
    fn mapped_name(&self, name: &str) -> String;

    fn mapped_property_name(&self, property: &PersistentProperty) -> String {
        match property.explicit_persisted_name() {
            Some(explicit) => explicit.to_string(),
            None => self.mapped_name(property.name()),
        }
    }

    fn mapped_entity_name(&self, simple_name: &str) -> String {
        self.mapped_name(simple_name)
    }
}

/// Split an identifier into words at `_`, `-`, whitespace and case changes.
///
/// Acronyms stay together: `parseHTTPResponse` -> `parse`, `HTTP`, `Response`.
pub fn split_words(identifier: &str) -> Vec<String> {
    let chars: Vec<char> = identifier.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &ch) in chars.iter().enumerate() {
        if ch == '_' || ch == '-' || ch.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if ch.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|c| c.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower)
            {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(ch);
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Raw;

impl NamingStrategy for Raw {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn mapped_name(&self, name: &str) -> String {
        name.to_string()
    }
}

/// `dateCreated` -> `date_created`; the default.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnderScoreSeparatedLowerCase;

impl NamingStrategy for UnderScoreSeparatedLowerCase {
    fn name(&self) -> &'static str {
        "underscore_lower_case"
    }

    fn mapped_name(&self, name: &str) -> String {
        split_words(name).join("_").to_lowercase()
    }
}

/// `dateCreated` -> `DATE_CREATED`
#[derive(Debug, Clone, Copy, Default)]
pub struct UnderScoreSeparatedUpperCase;

impl NamingStrategy for UnderScoreSeparatedUpperCase {
    fn name(&self) -> &'static str {
        "underscore_upper_case"
    }

    fn mapped_name(&self, name: &str) -> String {
        split_words(name).join("_").to_uppercase()
    }
}

/// `date_created` -> `datecreated`
#[derive(Debug, Clone, Copy, Default)]
pub struct LowerCase;

impl NamingStrategy for LowerCase {
    fn name(&self) -> &'static str {
        "lower_case"
    }

    fn mapped_name(&self, name: &str) -> String {
        split_words(name).concat().to_lowercase()
    }
}

/// `date_created` -> `DATECREATED`
#[derive(Debug, Clone, Copy, Default)]
pub struct UpperCase;

impl NamingStrategy for UpperCase {
    fn name(&self) -> &'static str {
        "upper_case"
    }

    fn mapped_name(&self, name: &str) -> String {
        split_words(name).concat().to_uppercase()
    }
}

/// `date_created` -> `date-created`
#[derive(Debug, Clone, Copy, Default)]
pub struct KebabCase;

impl NamingStrategy for KebabCase {
    fn name(&self) -> &'static str {
        "kebab_case"
    }

    fn mapped_name(&self, name: &str) -> String {
        split_words(name).join("-").to_lowercase()
    }
}

/// `date_created` -> `dateCreated`
#[derive(Debug, Clone, Copy, Default)]
pub struct CamelCase;

impl NamingStrategy for CamelCase {
    fn name(&self) -> &'static str {
        "camel_case"
    }

    fn mapped_name(&self, name: &str) -> String {
        let mut out = String::with_capacity(name.len());
        for (i, word) in split_words(name).iter().enumerate() {
            let lower = word.to_lowercase();
            if i == 0 {
                out.push_str(&lower);
                continue;
            }
            let mut chars = lower.chars();
            if let Some(first) = chars.next() {
                out.extend(first.to_uppercase());
                out.push_str(chars.as_str());
            }
        }
        out
    }
}

/// Resolve a strategy by its identifier.
pub fn naming_strategy(name: &str) -> Result<Arc<dyn NamingStrategy>> {
    let strategy: Arc<dyn NamingStrategy> = match name.trim().to_ascii_lowercase().as_str() {
        "raw" => Arc::new(Raw),
        "underscore_lower_case" | "underscore_separated_lower_case" | "snake_case" => {
            Arc::new(UnderScoreSeparatedLowerCase)
        }
        "underscore_upper_case" | "underscore_separated_upper_case" => {
            Arc::new(UnderScoreSeparatedUpperCase)
        }
        "lower_case" => Arc::new(LowerCase),
        "upper_case" => Arc::new(UpperCase),
        "kebab_case" => Arc::new(KebabCase),
        "camel_case" => Arc::new(CamelCase),
        other => {
            return Err(DataError::Config(format!(
                "unknown naming strategy '{other}'"
            )));
        }
    };
    Ok(strategy)
}

pub fn default_naming_strategy() -> Arc<dyn NamingStrategy> {
    Arc::new(UnderScoreSeparatedLowerCase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_camel_snake_and_acronyms() {
        assert_eq!(split_words("dateCreated"), vec!["date", "Created"]);
        assert_eq!(split_words("date_created"), vec!["date", "created"]);
        assert_eq!(split_words("findByISBN"), vec!["find", "By", "ISBN"]);
        assert_eq!(
            split_words("parseHTTPResponse"),
            vec!["parse", "HTTP", "Response"]
        );
        assert_eq!(split_words("findTop10ByAge"), vec!["find", "Top10", "By", "Age"]);
    }

    #[test]
    fn strategies_transform_names() {
        assert_eq!(UnderScoreSeparatedLowerCase.mapped_name("dateCreated"), "date_created");
        assert_eq!(UnderScoreSeparatedLowerCase.mapped_name("title"), "title");
        assert_eq!(UnderScoreSeparatedUpperCase.mapped_name("date_created"), "DATE_CREATED");
        assert_eq!(UpperCase.mapped_name("date_created"), "DATECREATED");
        assert_eq!(KebabCase.mapped_name("dateCreated"), "date-created");
        assert_eq!(CamelCase.mapped_name("date_created"), "dateCreated");
        assert_eq!(Raw.mapped_name("dateCreated"), "dateCreated");
    }

    #[test]
    fn resolves_by_name() {
        assert_eq!(naming_strategy("upper_case").unwrap().name(), "upper_case");
        assert!(naming_strategy("shouting").is_err());
    }
}
