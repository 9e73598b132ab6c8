//! Value expressions
//!
//! This module provides the expression capability the validators depend on:
//! evaluating an expression against a context, and finding the
//! `(base, property)` pair an expression ultimately points at.
//!
//! ## Supported syntax
//!
//! ```text
//! #{person.address.street}
//! #{person['first name']}
//! #{order.lines[0].quantity}
//! #{catalog.items[selection.key]}
//! ```
//!
//! `${...}` is accepted as a synonym for `#{...}`. Text without delimiters
//! is a literal expression: it evaluates to itself and never has a reference.

mod implicit;
mod parser;
mod resolver;

pub use implicit::ImplicitObject;
pub use parser::{parse_expression, Index, Path, PathExpression, Step};
pub use resolver::{is_resolvable, resolve_reference};

use std::fmt;

use crate::error::Result;
use crate::value::Value;

/// Context an expression is evaluated against
pub trait ElContext {
    /// Resolve a top-level identifier
    ///
    /// Returns `None` if nothing is bound to the name.
    fn resolve_variable(&self, name: &str) -> Option<Value>;
}

/// An expression bound to a component attribute
pub trait ValueExpression: fmt::Debug + Send + Sync {
    /// The original expression text
    fn expression_string(&self) -> &str;

    /// Check if the expression is plain literal text
    fn is_literal_text(&self) -> bool;

    /// Evaluate the expression
    fn get_value(&self, context: &dyn ElContext) -> Result<Value>;

    /// Find the base object and property the expression points at
    ///
    /// Only the part of the expression leading up to the final property is
    /// evaluated. `Ok(None)` means the expression has no reference.
    fn get_reference(&self, context: &dyn ElContext) -> Result<Option<ValueReference>>;
}

/// The `(base, property)` pair an expression resolves to
#[derive(Debug, Clone, PartialEq)]
pub struct ValueReference {
    /// The object owning the property
    pub base: Value,
    /// Name of the property on the base
    pub property: String,
}

impl ValueReference {
    /// Create a reference
    pub fn new(base: Value, property: impl Into<String>) -> Self {
        Self {
            base,
            property: property.into(),
        }
    }

    /// Runtime class of the base object
    pub fn base_class(&self) -> &str {
        self.base.type_name()
    }
}
