//! Expression parser and evaluator
//!
//! Parses the `#{root.step['key'][0]}` path grammar into a [`Path`] and
//! evaluates it against an [`ElContext`].

use crate::error::{Error, Result};
use crate::value::Value;

use super::{ElContext, ValueExpression, ValueReference};

/// A single navigation step after the root identifier
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// `.name`
    Property(String),
    /// `[index]`
    Index(Index),
}

/// The content of a bracket step
#[derive(Debug, Clone, PartialEq)]
pub enum Index {
    /// Quoted string key
    Text(String),
    /// Integer position or key
    Integer(i64),
    /// Nested path evaluated to produce the key
    Path(Path),
}

/// A root identifier followed by navigation steps
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    /// Top-level identifier
    pub root: String,
    /// Steps applied in order
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq)]
enum Body {
    Literal(String),
    Path(Path),
}

/// A parsed value expression
#[derive(Debug, Clone, PartialEq)]
pub struct PathExpression {
    source: String,
    body: Body,
}

/// Parse expression text
pub fn parse_expression(source: &str) -> Result<PathExpression> {
    let trimmed = source.trim();
    let inner = ["#{", "${"]
        .iter()
        .find_map(|open| trimmed.strip_prefix(open))
        .map(|rest| {
            rest.strip_suffix('}').ok_or_else(|| {
                Error::Expression(format!("Unterminated expression: '{}'", source))
            })
        })
        .transpose()?;

    let body = match inner {
        Some(text) => {
            let mut parser = Parser::new(text);
            let path = parser.parse_path()?;
            parser.skip_whitespace();
            if !parser.at_end() {
                return Err(parser.error("unexpected trailing input"));
            }
            Body::Path(path)
        }
        None => {
            if source.contains("#{") || source.contains("${") {
                return Err(Error::Expression(format!(
                    "Composite expressions are not supported: '{}'",
                    source
                )));
            }
            Body::Literal(source.to_string())
        }
    };

    Ok(PathExpression {
        source: source.to_string(),
        body,
    })
}

impl PathExpression {
    /// Get the parsed path, if this is not a literal
    pub fn path(&self) -> Option<&Path> {
        match self.body {
            Body::Path(ref path) => Some(path),
            Body::Literal(_) => None,
        }
    }
}

impl ValueExpression for PathExpression {
    fn expression_string(&self) -> &str {
        &self.source
    }

    fn is_literal_text(&self) -> bool {
        matches!(self.body, Body::Literal(_))
    }

    fn get_value(&self, context: &dyn ElContext) -> Result<Value> {
        match self.body {
            Body::Literal(ref text) => Ok(Value::Text(text.clone())),
            Body::Path(ref path) => evaluate(path, path.steps.len(), context),
        }
    }

    fn get_reference(&self, context: &dyn ElContext) -> Result<Option<ValueReference>> {
        let path = match self.body {
            Body::Path(ref path) => path,
            Body::Literal(_) => return Ok(None),
        };
        let Some(last) = path.steps.last() else {
            return Ok(None);
        };

        let base = evaluate(path, path.steps.len() - 1, context)?;
        if base.is_null() {
            return Ok(None);
        }
        Ok(step_key(last, context)?.map(|property| ValueReference::new(base, property)))
    }
}

/// Evaluate the root and the first `depth` steps of a path
fn evaluate(path: &Path, depth: usize, context: &dyn ElContext) -> Result<Value> {
    let mut current = context.resolve_variable(&path.root).unwrap_or_default();
    for step in &path.steps[..depth] {
        if current.is_null() {
            return Ok(Value::Null);
        }
        let Some(key) = step_key(step, context)? else {
            return Ok(Value::Null);
        };
        current = navigate(&current, &key)?;
    }
    Ok(current)
}

fn step_key(step: &Step, context: &dyn ElContext) -> Result<Option<String>> {
    Ok(match step {
        Step::Property(name) => Some(name.clone()),
        Step::Index(Index::Text(s)) => Some(s.clone()),
        Step::Index(Index::Integer(i)) => Some(i.to_string()),
        Step::Index(Index::Path(inner)) => {
            let key = evaluate(inner, inner.steps.len(), context)?;
            if key.is_null() {
                None
            } else {
                Some(key.to_string())
            }
        }
    })
}

fn navigate(base: &Value, key: &str) -> Result<Value> {
    match base {
        Value::Bean(bean) => bean.get(key).ok_or_else(|| {
            Error::Expression(format!(
                "Property '{}' not found on type {}",
                key,
                bean.class()
            ))
        }),
        Value::Map(map) => Ok(map.get(key).cloned().unwrap_or_default()),
        Value::List(items) | Value::Array(items) => {
            let index: usize = key.parse().map_err(|_| {
                Error::Expression(format!(
                    "Cannot index {} with '{}'",
                    base.type_name(),
                    key
                ))
            })?;
            Ok(items.get(index).cloned().unwrap_or_default())
        }
        other => Err(Error::Expression(format!(
            "Property '{}' not found on type {}",
            key,
            other.type_name()
        ))),
    }
}

struct Parser<'a> {
    text: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn error(&self, reason: &str) -> Error {
        Error::Expression(format!(
            "Invalid expression '{}' at position {}: {}",
            self.text, self.pos, reason
        ))
    }

    fn parse_path(&mut self) -> Result<Path> {
        self.skip_whitespace();
        let root = self.parse_identifier()?;
        let mut steps = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('.') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    steps.push(Step::Property(self.parse_identifier()?));
                }
                Some('[') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    let index = self.parse_index()?;
                    self.skip_whitespace();
                    if self.peek() != Some(']') {
                        return Err(self.error("expected ']'"));
                    }
                    self.pos += 1;
                    steps.push(Step::Index(index));
                }
                _ => break,
            }
        }
        Ok(Path { root, steps })
    }

    fn parse_identifier(&mut self) -> Result<String> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_alphabetic() || c == '_' || c == '$' => self.pos += 1,
            _ => return Err(self.error("expected identifier")),
        }
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '$')
        {
            self.pos += 1;
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse_index(&mut self) -> Result<Index> {
        match self.peek() {
            Some(quote @ ('\'' | '"')) => {
                self.pos += 1;
                let mut text = String::new();
                loop {
                    match self.peek() {
                        None => return Err(self.error("unterminated string")),
                        Some('\\') => {
                            self.pos += 1;
                            let escaped = self.peek().ok_or_else(|| self.error("unterminated string"))?;
                            text.push(escaped);
                            self.pos += 1;
                        }
                        Some(c) if c == quote => {
                            self.pos += 1;
                            break;
                        }
                        Some(c) => {
                            text.push(c);
                            self.pos += 1;
                        }
                    }
                }
                Ok(Index::Text(text))
            }
            Some(c) if c.is_ascii_digit() || c == '-' => {
                let start = self.pos;
                self.pos += 1;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
                let digits: String = self.chars[start..self.pos].iter().collect();
                digits
                    .parse()
                    .map(Index::Integer)
                    .map_err(|_| self.error("invalid integer index"))
            }
            _ => Ok(Index::Path(self.parse_path()?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Bean;
    use indexmap::IndexMap;
    use std::collections::HashMap;

    struct Vars(HashMap<String, Value>);

    impl ElContext for Vars {
        fn resolve_variable(&self, name: &str) -> Option<Value> {
            self.0.get(name).cloned()
        }
    }

    fn vars() -> Vars {
        let address = Bean::from_pairs("com.example.Address", [("street", "Main St")]);
        let person = Bean::from_pairs(
            "com.example.Person",
            [("age", Value::from(21)), ("address", Value::Bean(address))],
        );
        let mut lookup = IndexMap::new();
        lookup.insert("first name".to_string(), Value::Bean(person.clone()));
        let mut map = HashMap::new();
        map.insert("person".to_string(), Value::Bean(person));
        map.insert("lookup".to_string(), Value::Map(lookup));
        map.insert("key".to_string(), Value::from("first name"));
        map.insert("items".to_string(), Value::List(vec![Value::from(7)]));
        Vars(map)
    }

    #[test]
    fn test_parse_path() {
        let expr = parse_expression("#{person.address['street']}").unwrap();
        let path = expr.path().unwrap();
        assert_eq!(path.root, "person");
        assert_eq!(
            path.steps,
            vec![
                Step::Property("address".into()),
                Step::Index(Index::Text("street".into())),
            ]
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_expression("#{person.").is_err());
        assert!(parse_expression("#{person").is_err());
        assert!(parse_expression("#{person[0}").is_err());
        assert!(parse_expression("#{1abc}").is_err());
        assert!(parse_expression("Hello #{person.name}").is_err());
    }

    #[test]
    fn test_literal_expression() {
        let expr = parse_expression("plain text").unwrap();
        assert!(expr.is_literal_text());
        assert_eq!(expr.get_value(&vars()).unwrap(), Value::from("plain text"));
        assert_eq!(expr.get_reference(&vars()).unwrap(), None);
    }

    #[test]
    fn test_evaluate() {
        let ctx = vars();
        let eval = |s: &str| parse_expression(s).unwrap().get_value(&ctx).unwrap();
        assert_eq!(eval("#{person.age}"), Value::from(21));
        assert_eq!(eval("${person.address.street}"), Value::from("Main St"));
        assert_eq!(eval("#{lookup[key].age}"), Value::from(21));
        assert_eq!(eval("#{items[0]}"), Value::from(7));
        assert_eq!(eval("#{items[3]}"), Value::Null);
        assert_eq!(eval("#{missing.anything}"), Value::Null);
    }

    #[test]
    fn test_unknown_bean_property_is_error() {
        let expr = parse_expression("#{person.nickname}").unwrap();
        assert!(expr.get_value(&vars()).is_err());
    }

    #[test]
    fn test_reference_names_last_step() {
        let ctx = vars();
        let expr = parse_expression("#{person.address.street}").unwrap();
        let reference = expr.get_reference(&ctx).unwrap().unwrap();
        assert_eq!(reference.property, "street");
        assert_eq!(reference.base_class(), "com.example.Address");

        let expr = parse_expression("#{lookup['first name']}").unwrap();
        let reference = expr.get_reference(&ctx).unwrap().unwrap();
        assert_eq!(reference.property, "first name");
        assert!(reference.base.is_bulk());
    }

    #[test]
    fn test_reference_absent() {
        let ctx = vars();
        // bare identifier has no base
        assert_eq!(parse_expression("#{person}").unwrap().get_reference(&ctx).unwrap(), None);
        // null base
        assert_eq!(
            parse_expression("#{missing.age}").unwrap().get_reference(&ctx).unwrap(),
            None
        );
    }
}
