//! Build-time descriptions of repositories, their methods, and the entities
//! they manage.
//!
//! Elements are plain data. They come from Rust code (the generic
//! repository, derived entities) or from JSON definition files, and may be
//! written as compact strings such as `findByTitle(title: String): Vec<Book>`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::{DataError, Result};
use crate::model::{DataType, EntityDefinition, JsonDataType, PropertyDef, TypeRef};
use crate::query::JoinSpec;

/// A (possibly generic) type as written in a method signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TypeElement {
    name: String,
    args: Vec<TypeElement>,
}

impl TypeElement {
    pub fn unit() -> Self {
        Self::simple("()")
    }

    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn generic(name: impl Into<String>, args: Vec<TypeElement>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Element for a real Rust type, with module paths dropped.
    pub fn of<T: ?Sized>() -> Self {
        let name = std::any::type_name::<T>();
        Self::parse(name).unwrap_or_else(|_| Self::simple(name))
    }

    pub fn parse(input: &str) -> Result<Self> {
        let mut parser = TypeParser {
            chars: input.chars().collect(),
            pos: 0,
            input,
        };
        let parsed = parser.parse_type()?;
        parser.skip_whitespace();
        if parser.pos != parser.chars.len() {
            return Err(parser.error("trailing characters"));
        }
        Ok(parsed)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[TypeElement] {
        &self.args
    }

    pub fn first_arg(&self) -> Option<&TypeElement> {
        self.args.first()
    }

    pub fn is_unit(&self) -> bool {
        self.name == "()" && self.args.is_empty()
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name == name
    }
}

impl Default for TypeElement {
    fn default() -> Self {
        Self::unit()
    }
}

impl fmt::Display for TypeElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.args.is_empty() {
            f.write_str("<")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{arg}")?;
            }
            f.write_str(">")?;
        }
        Ok(())
    }
}

impl FromStr for TypeElement {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TypeElement {
    type Error = DataError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<TypeElement> for String {
    fn from(value: TypeElement) -> Self {
        value.to_string()
    }
}

struct TypeParser<'a> {
    chars: Vec<char>,
    pos: usize,
    input: &'a str,
}

impl TypeParser<'_> {
    fn error(&self, reason: &str) -> DataError {
        DataError::InvalidMethod {
            method: self.input.to_string(),
            reason: format!("cannot parse type at offset {}: {reason}", self.pos),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.chars.get(self.pos).is_some_and(|c| c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_whitespace();
        if self.chars.get(self.pos) == Some(&expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_type(&mut self) -> Result<TypeElement> {
        self.skip_whitespace();
        // references and lifetimes carry no meaning for matching
        if self.eat('&') {
            if self.eat('\'') {
                self.parse_path()?;
            }
            return self.parse_type();
        }
        if self.eat('(') {
            if self.eat(')') {
                return Ok(TypeElement::unit());
            }
            return Err(self.error("tuples are not supported"));
        }

        let name = self.parse_path()?;
        let mut args = Vec::new();
        if self.eat('<') {
            loop {
                args.push(self.parse_type()?);
                if self.eat(',') {
                    continue;
                }
                if self.eat('>') {
                    break;
                }
                return Err(self.error("expected ',' or '>'"));
            }
        }
        Ok(TypeElement::generic(name, args))
    }

    /// Identifier path; only the last segment is kept.
    fn parse_path(&mut self) -> Result<String> {
        self.skip_whitespace();
        let start = self.pos;
        while self
            .chars
            .get(self.pos)
            .is_some_and(|c| c.is_alphanumeric() || *c == '_' || *c == ':')
        {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("expected a type name"));
        }
        let path: String = self.chars[start..self.pos].iter().collect();
        let last = path.rsplit("::").next().unwrap_or(&path);
        if last.is_empty() {
            return Err(self.error("empty path segment"));
        }
        Ok(last.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterElement {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeElement,
}

impl ParameterElement {
    pub fn new(name: impl Into<String>, ty: TypeElement) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// One repository method: name, parameters, and declared return type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MethodRepr")]
pub struct MethodElement {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<ParameterElement>,
    #[serde(default)]
    pub returns: TypeElement,
    /// Explicit join declarations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub joins: Vec<JoinSpec>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MethodRepr {
    Signature(String),
    Element {
        name: String,
        #[serde(default)]
        parameters: Vec<ParameterElement>,
        #[serde(default)]
        returns: TypeElement,
        #[serde(default)]
        joins: Vec<JoinSpec>,
    },
}

impl TryFrom<MethodRepr> for MethodElement {
    type Error = DataError;

    fn try_from(repr: MethodRepr) -> Result<Self> {
        match repr {
            MethodRepr::Signature(signature) => Self::parse(&signature),
            MethodRepr::Element {
                name,
                parameters,
                returns,
                joins,
            } => Ok(Self {
                name,
                parameters,
                returns,
                joins,
            }),
        }
    }
}

impl MethodElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            returns: TypeElement::unit(),
            joins: Vec::new(),
        }
    }

    pub fn param(mut self, name: impl Into<String>, ty: TypeElement) -> Self {
        self.parameters.push(ParameterElement::new(name, ty));
        self
    }

    pub fn returns(mut self, ty: TypeElement) -> Self {
        self.returns = ty;
        self
    }

    pub fn join(mut self, join: JoinSpec) -> Self {
        self.joins.push(join);
        self
    }

    /// Parse `name(param: Type, ...): Return` (`->` also accepted).
    ///
    /// A missing return type means `()`.
    pub fn parse(signature: &str) -> Result<Self> {
        let invalid = |reason: &str| DataError::InvalidMethod {
            method: signature.to_string(),
            reason: reason.to_string(),
        };

        let open = signature.find('(').ok_or_else(|| invalid("missing '('"))?;
        let close = matching_paren(signature, open).ok_or_else(|| invalid("unbalanced '('"))?;
        let name = signature[..open].trim();
        if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(invalid("invalid method name"));
        }

        let mut method = Self::new(name);
        for raw in split_top_level(&signature[open + 1..close]) {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let (param, ty) = raw
                .split_once(':')
                .ok_or_else(|| invalid("parameters are written 'name: Type'"))?;
            method = method.param(param.trim(), TypeElement::parse(ty)?);
        }

        let tail = signature[close + 1..].trim();
        let tail = tail
            .strip_prefix("->")
            .or_else(|| tail.strip_prefix(':'))
            .unwrap_or(tail)
            .trim();
        if !tail.is_empty() {
            method.returns = TypeElement::parse(tail)?;
        }
        Ok(method)
    }

    /// Human-readable signature used in diagnostics.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .parameters
            .iter()
            .map(|p| format!("{}: {}", p.name, p.ty))
            .collect();
        format!("{}({}): {}", self.name, params.join(", "), self.returns)
    }

    /// Dispatch key: name, parameter types, and return type.
    pub fn key(&self) -> String {
        let params: Vec<String> = self.parameters.iter().map(|p| p.ty.to_string()).collect();
        format!("{}({}): {}", self.name, params.join(", "), self.returns)
    }
}

impl fmt::Display for MethodElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature())
    }
}

fn matching_paren(input: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, ch) in input.char_indices().skip_while(|(i, _)| *i < open) {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn split_top_level(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, ch) in input.char_indices() {
        match ch {
            '<' | '(' => depth += 1,
            '>' | ')' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

/// Repository contracts a repository can inherit methods from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Contract {
    CrudRepository,
    PageableRepository,
    AsyncCrudRepository,
    AsyncPageableRepository,
    ReactiveCrudRepository,
    ReactivePageableRepository,
}

impl Contract {
    pub const ALL: [Contract; 6] = [
        Contract::CrudRepository,
        Contract::PageableRepository,
        Contract::AsyncCrudRepository,
        Contract::AsyncPageableRepository,
        Contract::ReactiveCrudRepository,
        Contract::ReactivePageableRepository,
    ];
}

/// A repository interface: the entity it manages, inherited contracts, and
/// its own declared methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryElement {
    pub name: String,
    pub entity: String,
    #[serde(default)]
    pub extends: Vec<Contract>,
    #[serde(default)]
    pub methods: Vec<MethodElement>,
}

impl RepositoryElement {
    pub fn new(name: impl Into<String>, entity: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity: entity.into(),
            extends: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn extends(mut self, contract: Contract) -> Self {
        if !self.extends.contains(&contract) {
            self.extends.push(contract);
        }
        self
    }

    pub fn method(mut self, method: MethodElement) -> Self {
        self.methods.push(method);
        self
    }
}

/// Textual property description, as found in definition files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyElement {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub id: bool,
    #[serde(default)]
    pub generated: bool,
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub converter: Option<String>,
    #[serde(default)]
    pub data_type: Option<DataType>,
    #[serde(default)]
    pub json_data_type: Option<JsonDataType>,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub association: bool,
}

/// Textual entity description, as found in definition files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityElement {
    pub name: String,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub naming: Option<String>,
    pub properties: Vec<PropertyElement>,
}

impl EntityElement {
    pub fn into_definition(self) -> EntityDefinition {
        let mut definition = EntityDefinition::new(&self.name);
        if let Some(table) = self.table {
            definition = definition.table(table);
        }
        if let Some(naming) = self.naming {
            definition = definition.naming(naming);
        }

        for property in self.properties {
            let declared = TypeRef::named(&property.ty);
            let optional = declared.is_optional();
            let mut def = PropertyDef::new(property.name, declared);
            if property.id {
                def = def.id();
            }
            if property.generated {
                def = def.generated();
            }
            if let Some(column) = property.column {
                def = def.persisted_name(column);
            }
            if let Some(alias) = property.alias {
                def = def.alias(alias);
            }
            if let Some(converter) = property.converter {
                def = def.converter(converter);
            }
            if let Some(data_type) = property.data_type {
                def = def.data_type(data_type);
            }
            if let Some(json_data_type) = property.json_data_type {
                def = def.json_data_type(json_data_type);
            }
            if property.read_only {
                def = def.read_only();
            }
            if property.association {
                def = def.association();
            }
            if optional {
                def = def.optional();
            }
            definition = definition.property(def);
        }
        definition
    }
}

/// A self-contained definition file: one entity and its repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryDefinition {
    pub entity: EntityElement,
    pub repository: RepositoryElement,
    /// Optional `rustdata://` configuration string.
    #[serde(default)]
    pub config: Option<String>,
    /// Result types finders may return, with their field names.
    #[serde(default)]
    pub introspected: BTreeMap<String, Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_generics() {
        let ty = TypeElement::parse("Future<Page<Book>>").unwrap();
        assert_eq!(ty.name(), "Future");
        assert_eq!(ty.first_arg().unwrap().to_string(), "Page<Book>");
        assert_eq!(ty.to_string(), "Future<Page<Book>>");
        assert!(TypeElement::parse("()").unwrap().is_unit());
        assert!(TypeElement::parse("Vec<Book").is_err());
    }

    #[test]
    fn strips_module_paths() {
        let ty = TypeElement::of::<Option<String>>();
        assert_eq!(ty.to_string(), "Option<String>");
        assert_eq!(TypeElement::of::<&str>().to_string(), "str");
    }

    #[test]
    fn parses_method_signature() {
        let method =
            MethodElement::parse("findByTitle(title: String, pageable: Pageable): Page<Book>")
                .unwrap();
        assert_eq!(method.name, "findByTitle");
        assert_eq!(method.parameters.len(), 2);
        assert_eq!(method.parameters[1].ty.name(), "Pageable");
        assert_eq!(method.key(), "findByTitle(String, Pageable): Page<Book>");

        let unit = MethodElement::parse("deleteAll()").unwrap();
        assert!(unit.returns.is_unit());

        let arrow = MethodElement::parse("count() -> i64").unwrap();
        assert_eq!(arrow.returns.name(), "i64");
    }

    #[test]
    fn methods_deserialize_from_strings_or_objects() {
        let json = r#"{
            "name": "BookRepository",
            "entity": "Book",
            "extends": ["CrudRepository"],
            "methods": [
                "findByPagesGreaterThan(pages: i32): Vec<Book>",
                {"name": "countByTitle", "parameters": [{"name": "title", "type": "String"}], "returns": "i64"}
            ]
        }"#;
        let repository: RepositoryElement = serde_json::from_str(json).unwrap();
        assert_eq!(repository.methods.len(), 2);
        assert_eq!(repository.methods[0].returns.to_string(), "Vec<Book>");
        assert_eq!(repository.methods[1].parameters[0].ty.name(), "String");
        assert_eq!(repository.extends, vec![Contract::CrudRepository]);
    }

    #[test]
    fn entity_element_builds_definition() {
        let json = r#"{
            "name": "Book",
            "properties": [
                {"name": "id", "type": "Option<i64>", "id": true, "generated": true},
                {"name": "title", "type": "String", "column": "book_title"}
            ]
        }"#;
        let element: EntityElement = serde_json::from_str(json).unwrap();
        let definition = element.into_definition();
        assert_eq!(definition.name(), "Book");
        assert_eq!(definition.properties().len(), 2);
    }
}
