//! Component model
//!
//! Validators depend only on the narrow [`Component`] capability trait.
//! [`UIInput`] is the concrete editable component used by the lifecycle.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use indexmap::IndexMap;

use crate::context::Application;
use crate::error::Result;
use crate::expression::ValueExpression;
use crate::locale::Locale;
use crate::validators::Validator;
use crate::value::Value;

/// Shared handle to a component
pub type ComponentRef = Arc<dyn Component>;

/// What validators need to know about a component
pub trait Component: fmt::Debug + Send + Sync {
    /// Identifier of the component within the view
    fn client_id(&self) -> &str;

    /// Expression bound to the named attribute
    fn value_expression(&self, name: &str) -> Option<Arc<dyn ValueExpression>>;

    /// Literal value of the named attribute
    fn attribute(&self, name: &str) -> Option<Value>;

    /// Check if the component's value passed validation
    fn is_valid(&self) -> bool;

    /// Mark the component's value as valid or invalid
    fn set_valid(&self, valid: bool);
}

/// Root of a component tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewRoot {
    view_id: String,
    locale: Option<Locale>,
}

impl ViewRoot {
    /// Create a view root
    pub fn new(view_id: impl Into<String>) -> Self {
        Self {
            view_id: view_id.into(),
            locale: None,
        }
    }

    /// Set the view locale
    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = Some(locale);
        self
    }

    /// Get the view identifier
    pub fn view_id(&self) -> &str {
        &self.view_id
    }

    /// Get the view locale
    pub fn locale(&self) -> Option<&Locale> {
        self.locale.as_ref()
    }
}

/// An editable input component
pub struct UIInput {
    client_id: String,
    attributes: IndexMap<String, Value>,
    expressions: IndexMap<String, Arc<dyn ValueExpression>>,
    submitted_value: RwLock<Value>,
    validators: Vec<Arc<dyn Validator>>,
    valid: AtomicBool,
}

impl UIInput {
    /// Create an input component
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            attributes: IndexMap::new(),
            expressions: IndexMap::new(),
            submitted_value: RwLock::new(Value::Null),
            validators: Vec::new(),
            valid: AtomicBool::new(true),
        }
    }

    /// Set a literal attribute
    pub fn with_attribute(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    /// Bind an expression to an attribute
    pub fn with_value_expression(mut self, name: &str, expression: impl ValueExpression + 'static) -> Self {
        self.expressions.insert(name.to_string(), Arc::new(expression));
        self
    }

    /// Set the converted submitted value
    pub fn with_submitted_value(self, value: impl Into<Value>) -> Self {
        self.set_submitted_value(value);
        self
    }

    /// Attach a validator
    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validators.push(validator);
        self
    }

    /// Attach the application's default validators
    pub fn with_default_validators(mut self, application: &Application) -> Result<Self> {
        for id in application.default_validator_ids() {
            self.validators.push(application.create_validator(id)?);
        }
        Ok(self)
    }

    /// Get the converted submitted value
    pub fn submitted_value(&self) -> Value {
        self.submitted_value
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// Replace the submitted value
    pub fn set_submitted_value(&self, value: impl Into<Value>) {
        *self.submitted_value.write().unwrap_or_else(|p| p.into_inner()) = value.into();
    }

    /// Attached validators in attachment order
    pub fn validators(&self) -> &[Arc<dyn Validator>] {
        &self.validators
    }
}

impl Component for UIInput {
    fn client_id(&self) -> &str {
        &self.client_id
    }

    fn value_expression(&self, name: &str) -> Option<Arc<dyn ValueExpression>> {
        self.expressions.get(name).cloned()
    }

    fn attribute(&self, name: &str) -> Option<Value> {
        self.attributes.get(name).cloned()
    }

    fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    fn set_valid(&self, valid: bool) {
        self.valid.store(valid, Ordering::Release);
    }
}

impl fmt::Debug for UIInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UIInput")
            .field("client_id", &self.client_id)
            .field("attributes", &self.attributes)
            .field("expressions", &self.expressions.keys().collect::<Vec<_>>())
            .field("validators", &self.validators.len())
            .field("valid", &self.is_valid())
            .finish()
    }
}
