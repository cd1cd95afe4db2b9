use std::sync::Arc;

use crate::core::{DataError, Result};
use crate::matcher::MatcherKind;
use crate::model::naming::naming_strategy;
use crate::model::{ConverterRegistry, MappingStrategies, NamingStrategy};

/// Framework configuration
///
/// Controls how repository methods are matched and how entity metadata is
/// resolved. Built with chained setters or parsed from a `rustdata://`
/// option string.
#[derive(Debug, Clone)]
pub struct DataConfig {
    /// Naming strategy applied to entities without their own override
    pub naming: String,

    /// Whether auto-derived queries may be specialized (find-by-id)
    pub implicit_queries: bool,

    /// Matcher priority, highest first
    pub matcher_order: Vec<MatcherKind>,

    /// Additional verb prefixes per matcher
    pub custom_verbs: Vec<(MatcherKind, String)>,

    /// Page size used when a method is called with an unpaged request
    pub default_page_size: usize,

    /// Upper bound for any requested page size
    pub max_page_size: usize,

    /// Type name playing the Page role
    pub page_type: String,

    /// Type name playing the Slice role
    pub slice_type: String,

    /// Async container type names
    pub future_types: Vec<String>,

    /// Reactive multi-value container type names
    pub stream_types: Vec<String>,

    /// Reactive single-value container type names
    pub single_types: Vec<String>,

    /// Introspected result types and their field names
    pub introspected: Vec<(String, Vec<String>)>,
}

impl DataConfig {
    pub fn new() -> Self {
        Self {
            naming: "underscore_separated_lower_case".to_string(),
            implicit_queries: true,
            matcher_order: MatcherKind::default_order().to_vec(),
            custom_verbs: Vec::new(),
            default_page_size: 100,
            max_page_size: 1000,
            page_type: "Page".to_string(),
            slice_type: "Slice".to_string(),
            future_types: vec![
                "Future".to_string(),
                "DataFuture".to_string(),
                "CompletableFuture".to_string(),
            ],
            stream_types: vec![
                "Flux".to_string(),
                "Stream".to_string(),
                "Publisher".to_string(),
            ],
            single_types: vec!["Mono".to_string()],
            introspected: Vec::new(),
        }
    }

    /// Set the default naming strategy by identifier
    pub fn naming(mut self, naming: &str) -> Self {
        self.naming = naming.to_string();
        self
    }

    pub fn implicit_queries(mut self, enabled: bool) -> Self {
        self.implicit_queries = enabled;
        self
    }

    pub fn matcher_order(mut self, order: Vec<MatcherKind>) -> Self {
        self.matcher_order = order;
        self
    }

    /// Register an extra verb prefix for a matcher
    pub fn verb(mut self, matcher: MatcherKind, verb: &str) -> Self {
        self.custom_verbs.push((matcher, verb.to_string()));
        self
    }

    pub fn default_page_size(mut self, size: usize) -> Self {
        self.default_page_size = size;
        self
    }

    pub fn max_page_size(mut self, size: usize) -> Self {
        self.max_page_size = size;
        self
    }

    pub fn page_type(mut self, name: &str) -> Self {
        self.page_type = name.to_string();
        self
    }

    pub fn slice_type(mut self, name: &str) -> Self {
        self.slice_type = name.to_string();
        self
    }

    /// Register a type finders may return instead of the entity
    pub fn introspected(mut self, name: &str, fields: &[&str]) -> Self {
        self.introspected.retain(|(known, _)| known != name);
        self.introspected.push((
            name.to_string(),
            fields.iter().map(|field| field.to_string()).collect(),
        ));
        self
    }

    /// Field names of a registered introspected type
    pub fn fields_of(&self, name: &str) -> Option<&[String]> {
        self.introspected
            .iter()
            .find(|(known, _)| known == name)
            .map(|(_, fields)| fields.as_slice())
    }

    /// Verbs registered for a matcher through configuration
    pub fn verbs_for(&self, matcher: MatcherKind) -> impl Iterator<Item = &str> {
        self.custom_verbs
            .iter()
            .filter(move |(kind, _)| *kind == matcher)
            .map(|(_, verb)| verb.as_str())
    }

    pub fn naming_strategy(&self) -> Result<Arc<dyn NamingStrategy>> {
        naming_strategy(&self.naming)
    }

    /// Mapping strategies for entity metadata built under this configuration
    pub fn strategies(&self, converters: ConverterRegistry) -> Result<MappingStrategies> {
        Ok(MappingStrategies::new(self.naming_strategy()?, converters))
    }

    /// Parse from an option string
    ///
    /// Format: "rustdata://?naming=kebab_case&implicit_queries=false"
    ///
    /// Recognized keys: `naming`, `implicit_queries`, `matchers`
    /// (comma-separated priority), `verbs` (comma-separated
    /// `matcher:verb` pairs), `default_page_size`, `max_page_size`,
    /// `page_type`, `slice_type`.
    ///
    /// Container type lists and introspected types are set in code only.
    pub fn from_url(url: &str) -> Result<Self> {
        let rest = url
            .strip_prefix("rustdata://")
            .ok_or_else(|| DataError::Config("URL must start with 'rustdata://'".to_string()))?;

        let query = match rest.split_once('?') {
            Some((_, query)) => query,
            None => "",
        };

        let mut config = Self::new();
        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| DataError::Config(format!("Invalid option '{pair}'")))?;

            match key {
                "naming" => {
                    naming_strategy(value)?;
                    config.naming = value.to_string();
                }
                "implicit_queries" => config.implicit_queries = parse_flag(key, value)?,
                "matchers" => {
                    config.matcher_order = value
                        .split(',')
                        .map(str::parse)
                        .collect::<Result<Vec<MatcherKind>>>()?;
                }
                "verbs" => {
                    for entry in value.split(',').filter(|entry| !entry.is_empty()) {
                        let (matcher, verb) = entry.split_once(':').ok_or_else(|| {
                            DataError::Config(format!("'verbs' expects matcher:verb, got '{entry}'"))
                        })?;
                        config = config.verb(matcher.parse()?, verb);
                    }
                }
                "default_page_size" => config.default_page_size = parse_size(key, value)?,
                "max_page_size" => config.max_page_size = parse_size(key, value)?,
                "page_type" => config.page_type = value.to_string(),
                "slice_type" => config.slice_type = value.to_string(),
                other => {
                    return Err(DataError::Config(format!("Unknown option '{other}'")));
                }
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Convert to option string; [`from_url`](Self::from_url) reads it back
    /// unchanged.
    pub fn to_url(&self) -> String {
        let matchers: Vec<String> = self.matcher_order.iter().map(ToString::to_string).collect();
        let mut url = format!(
            "rustdata://?naming={}&implicit_queries={}&matchers={}",
            self.naming,
            self.implicit_queries,
            matchers.join(",")
        );
        if !self.custom_verbs.is_empty() {
            let verbs: Vec<String> = self
                .custom_verbs
                .iter()
                .map(|(matcher, verb)| format!("{matcher}:{verb}"))
                .collect();
            url.push_str(&format!("&verbs={}", verbs.join(",")));
        }
        url.push_str(&format!(
            "&default_page_size={}&max_page_size={}&page_type={}&slice_type={}",
            self.default_page_size, self.max_page_size, self.page_type, self.slice_type
        ));
        url
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.matcher_order.is_empty() {
            return Err(DataError::Config("matcher order cannot be empty".to_string()));
        }

        for (i, kind) in self.matcher_order.iter().enumerate() {
            if self.matcher_order[..i].contains(kind) {
                return Err(DataError::Config(format!("matcher '{kind}' listed twice")));
            }
        }

        if self.default_page_size == 0 || self.max_page_size == 0 {
            return Err(DataError::Config("page sizes must be > 0".to_string()));
        }

        if self.default_page_size > self.max_page_size {
            return Err(DataError::Config(
                "default_page_size cannot exceed max_page_size".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    value
        .parse()
        .map_err(|_| DataError::Config(format!("'{key}' expects true or false, got '{value}'")))
}

fn parse_size(key: &str, value: &str) -> Result<usize> {
    value
        .parse()
        .map_err(|_| DataError::Config(format!("'{key}' expects a number, got '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DataConfig::default();
        assert!(config.implicit_queries);
        assert_eq!(config.matcher_order[0], MatcherKind::Find);
        assert_eq!(config.page_type, "Page");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = DataConfig::new()
            .naming("kebab_case")
            .implicit_queries(false)
            .verb(MatcherKind::Find, "fetch")
            .max_page_size(50)
            .default_page_size(10);

        assert_eq!(config.naming_strategy().unwrap().name(), "kebab_case");
        assert!(!config.implicit_queries);
        assert_eq!(config.verbs_for(MatcherKind::Find).collect::<Vec<_>>(), vec!["fetch"]);
        assert_eq!(config.verbs_for(MatcherKind::Count).count(), 0);
    }

    #[test]
    fn test_from_url() {
        let config = DataConfig::from_url(
            "rustdata://?naming=upper_case&implicit_queries=false&matchers=exists,find,count,delete,update,save&max_page_size=20&default_page_size=5",
        )
        .unwrap();

        assert_eq!(config.naming, "upper_case");
        assert!(!config.implicit_queries);
        assert_eq!(config.matcher_order[0], MatcherKind::Exists);
        assert_eq!(config.max_page_size, 20);

        let round_trip = DataConfig::from_url(&config.to_url()).unwrap();
        assert_eq!(round_trip.matcher_order, config.matcher_order);
    }

    #[test]
    fn test_to_url_keeps_every_option() {
        let config = DataConfig::new()
            .naming("kebab_case")
            .verb(MatcherKind::Find, "fetch")
            .verb(MatcherKind::Delete, "purge")
            .page_type("Paged")
            .slice_type("Window")
            .default_page_size(7)
            .max_page_size(70);

        let round_trip = DataConfig::from_url(&config.to_url()).unwrap();
        assert_eq!(round_trip.naming, "kebab_case");
        assert_eq!(round_trip.page_type, "Paged");
        assert_eq!(round_trip.slice_type, "Window");
        assert_eq!(round_trip.custom_verbs, config.custom_verbs);
        assert_eq!(round_trip.default_page_size, 7);
        assert_eq!(round_trip.max_page_size, 70);
        assert_eq!(round_trip.to_url(), config.to_url());
    }

    #[test]
    fn test_introspected_registration() {
        let config = DataConfig::new()
            .introspected("BookSummary", &["title"])
            .introspected("BookSummary", &["title", "pages"]);

        assert_eq!(config.introspected.len(), 1);
        assert_eq!(
            config.fields_of("BookSummary"),
            Some(&["title".to_string(), "pages".to_string()][..])
        );
        assert_eq!(config.fields_of("Book"), None);
    }

    #[test]
    fn test_invalid_url() {
        assert!(DataConfig::from_url("postgres://x").is_err());
        assert!(DataConfig::from_url("rustdata://?naming=shouting").is_err());
        assert!(DataConfig::from_url("rustdata://?matchers=find,find").is_err());
        assert!(DataConfig::from_url("rustdata://?max_page_size=1&default_page_size=5").is_err());
        assert!(DataConfig::from_url("rustdata://?verbs=fetch").is_err());
        assert!(DataConfig::from_url("rustdata://?verbs=select:fetch").is_err());
    }
}
