//! JSON validation scenarios
//!
//! A scenario describes an application (settings, known groups, constraint
//! metadata, application-scoped beans) together with one request's input
//! components and their submitted values. Running it performs the
//! process-validations phase and reports the queued messages.
//!
//! ```json
//! {
//!   "settings": { "enable_whole_bean": true },
//!   "groups": ["com.example.Strict"],
//!   "locale": "en_US",
//!   "classes": {
//!     "com.example.Person": {
//!       "properties": { "age": [{ "constraint": "Min", "value": 18 }] }
//!     }
//!   },
//!   "beans": { "person": { "class": "com.example.Person", "properties": { "age": 30 } } },
//!   "inputs": [{ "id": "form:age", "label": "Age", "value": "#{person.age}", "submitted": 15 }]
//! }
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::component::{Component, UIInput, ViewRoot};
use crate::config::Settings;
use crate::context::{Application, FacesContext};
use crate::error::{Error, Result};
use crate::expression::parse_expression;
use crate::lifecycle::Lifecycle;
use crate::locale::Locale;
use crate::validators::constraints::{ClassConstraint, Constraint, ConstraintDescriptor};
use crate::validators::engine::{BeanMetadata, ClassDescriptor};
use crate::validators::groups::{GroupMarker, GroupRegistry};
use crate::validators::messages::Severity;
use crate::validators::{BeanValidator, WholeBeanValidator};
use crate::value::{Bean, Value};

// ============================================================================
// Definitions
// ============================================================================

/// A complete scenario
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Scenario {
    /// Application settings
    pub settings: Settings,
    /// Init parameters overlaid on the settings
    pub init_params: HashMap<String, String>,
    /// Validation group names known to the application
    pub groups: Vec<String>,
    /// Locale of the view (`lang` or `lang_COUNTRY`)
    pub locale: Option<String>,
    /// View identifier
    pub view_id: Option<String>,
    /// Constraint metadata by class name
    pub classes: IndexMap<String, ClassDef>,
    /// Application-scoped beans by name
    pub beans: IndexMap<String, BeanDef>,
    /// Input components in tree order
    pub inputs: Vec<InputDef>,
    /// Groups of the whole-bean step; the step runs only when set
    pub whole_bean_groups: Option<String>,
}

/// Declared properties and constraints of a class
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassDef {
    /// Constraints by property; an empty list declares the property only
    pub properties: IndexMap<String, Vec<ConstraintDef>>,
    /// Class-level constraints
    pub class_constraints: Vec<ClassConstraintDef>,
}

/// A property constraint with its groups and message override
#[derive(Debug, Clone, Deserialize)]
pub struct ConstraintDef {
    /// The constraint
    #[serde(flatten)]
    pub kind: ConstraintKind,
    /// Groups of the constraint
    #[serde(default)]
    pub groups: Vec<String>,
    /// Message template override
    #[serde(default)]
    pub message: Option<String>,
}

/// Property constraint kinds
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "constraint")]
#[allow(missing_docs)]
pub enum ConstraintKind {
    NotNull,
    Null,
    NotEmpty,
    NotBlank,
    AssertTrue,
    AssertFalse,
    Min { value: i64 },
    Max { value: i64 },
    DecimalMin {
        value: serde_json::Value,
        #[serde(default = "inclusive")]
        inclusive: bool,
    },
    DecimalMax {
        value: serde_json::Value,
        #[serde(default = "inclusive")]
        inclusive: bool,
    },
    Positive,
    Negative,
    Size {
        #[serde(default)]
        min: usize,
        #[serde(default = "unbounded")]
        max: usize,
    },
    Digits { integer: u32, fraction: u32 },
    Pattern { regexp: String },
    Email,
    #[serde(rename = "URL", alias = "Url")]
    Url,
    Past,
    Future,
}

fn inclusive() -> bool {
    true
}

fn unbounded() -> usize {
    usize::MAX
}

/// A class-level constraint with its groups and message override
#[derive(Debug, Clone, Deserialize)]
pub struct ClassConstraintDef {
    /// The constraint
    #[serde(flatten)]
    pub kind: ClassConstraintKind,
    /// Groups of the constraint
    #[serde(default)]
    pub groups: Vec<String>,
    /// Message template override
    #[serde(default)]
    pub message: Option<String>,
}

/// Class-level constraint kinds
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "constraint")]
#[allow(missing_docs)]
pub enum ClassConstraintKind {
    FieldsMatch { first: String, second: String },
    Ordered { lesser: String, greater: String },
}

/// An application-scoped bean
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BeanDef {
    /// Class name
    pub class: String,
    /// Property values
    #[serde(default)]
    pub properties: IndexMap<String, serde_json::Value>,
}

/// An input component
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputDef {
    /// Client id
    pub id: String,
    /// Literal label
    #[serde(default)]
    pub label: Option<String>,
    /// Expression bound to the label
    #[serde(default)]
    pub label_expression: Option<String>,
    /// Expression bound to the value
    #[serde(default)]
    pub value: Option<String>,
    /// Converted submitted value
    #[serde(default)]
    pub submitted: serde_json::Value,
    /// Groups of an explicitly attached bean validator
    #[serde(default)]
    pub validation_groups: Option<String>,
}

// ============================================================================
// Conversion
// ============================================================================

fn markers(groups: &[String]) -> Vec<GroupMarker> {
    groups.iter().map(|g| GroupMarker::new(g)).collect()
}

fn decimal(value: &serde_json::Value) -> Result<rust_decimal::Decimal> {
    let parsed = match value {
        serde_json::Value::String(text) => text.trim().parse().ok(),
        other => Value::from_json(other)?.as_decimal(),
    };
    parsed.ok_or_else(|| Error::Configuration(format!("Expected a decimal bound, got {}", value)))
}

impl ConstraintDef {
    /// Convert to an engine descriptor
    pub fn to_descriptor(&self) -> Result<ConstraintDescriptor<Constraint>> {
        let constraint = match self.kind {
            ConstraintKind::NotNull => Constraint::NotNull,
            ConstraintKind::Null => Constraint::Null,
            ConstraintKind::NotEmpty => Constraint::NotEmpty,
            ConstraintKind::NotBlank => Constraint::NotBlank,
            ConstraintKind::AssertTrue => Constraint::AssertTrue,
            ConstraintKind::AssertFalse => Constraint::AssertFalse,
            ConstraintKind::Min { value } => Constraint::Min(value),
            ConstraintKind::Max { value } => Constraint::Max(value),
            ConstraintKind::DecimalMin { ref value, inclusive } => Constraint::DecimalMin {
                value: decimal(value)?,
                inclusive,
            },
            ConstraintKind::DecimalMax { ref value, inclusive } => Constraint::DecimalMax {
                value: decimal(value)?,
                inclusive,
            },
            ConstraintKind::Positive => Constraint::Positive,
            ConstraintKind::Negative => Constraint::Negative,
            ConstraintKind::Size { min, max } => Constraint::Size { min, max },
            ConstraintKind::Digits { integer, fraction } => Constraint::Digits { integer, fraction },
            ConstraintKind::Pattern { ref regexp } => Constraint::pattern(regexp)?,
            ConstraintKind::Email => Constraint::Email,
            ConstraintKind::Url => Constraint::Url,
            ConstraintKind::Past => Constraint::Past,
            ConstraintKind::Future => Constraint::Future,
        };
        let mut descriptor = ConstraintDescriptor::new(constraint).in_groups(markers(&self.groups));
        if let Some(ref message) = self.message {
            descriptor = descriptor.with_message(message.as_str());
        }
        Ok(descriptor)
    }
}

impl ClassConstraintDef {
    /// Convert to an engine descriptor
    pub fn to_descriptor(&self) -> ConstraintDescriptor<ClassConstraint> {
        let constraint = match self.kind {
            ClassConstraintKind::FieldsMatch { ref first, ref second } => ClassConstraint::FieldsMatch {
                first: first.clone(),
                second: second.clone(),
            },
            ClassConstraintKind::Ordered { ref lesser, ref greater } => ClassConstraint::Ordered {
                lesser: lesser.clone(),
                greater: greater.clone(),
            },
        };
        let mut descriptor = ConstraintDescriptor::new(constraint).in_groups(markers(&self.groups));
        if let Some(ref message) = self.message {
            descriptor = descriptor.with_message(message.as_str());
        }
        descriptor
    }
}

impl ClassDef {
    /// Convert to an engine class descriptor
    pub fn to_descriptor(&self) -> Result<ClassDescriptor> {
        let mut descriptor = ClassDescriptor::new();
        for (property, constraints) in &self.properties {
            let constraints = constraints
                .iter()
                .map(ConstraintDef::to_descriptor)
                .collect::<Result<Vec<_>>>()?;
            descriptor = descriptor.declare(property).property(property, constraints);
        }
        for constraint in &self.class_constraints {
            descriptor = descriptor.class_constraint(constraint.to_descriptor());
        }
        Ok(descriptor)
    }
}

// ============================================================================
// Running
// ============================================================================

/// A message queued while running a scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportedMessage {
    /// Component the message belongs to (`None` for global messages)
    pub client_id: Option<String>,
    /// Message severity
    pub severity: Severity,
    /// Short text
    pub summary: String,
    /// Full text
    pub detail: String,
}

/// Outcome of running a scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    /// Whether any validation failed
    pub failed: bool,
    /// Client ids of components marked invalid
    pub invalid: Vec<String>,
    /// Queued messages in order
    pub messages: Vec<ReportedMessage>,
}

impl Scenario {
    /// Parse a scenario from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a scenario from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "loaded scenario");
        Self::from_json(&text)
    }

    /// Effective settings: `settings` overlaid with `init_params`
    pub fn effective_settings(&self) -> Result<Settings> {
        self.settings.clone().merge_init_params(&self.init_params)
    }

    /// Registry of the declared group names
    pub fn group_registry(&self) -> GroupRegistry {
        GroupRegistry::with_groups(self.groups.iter().map(String::as_str))
    }

    /// Constraint metadata of the declared classes
    pub fn metadata(&self) -> Result<BeanMetadata> {
        let mut metadata = BeanMetadata::new();
        for (class, def) in &self.classes {
            metadata.insert(class, def.to_descriptor()?);
        }
        Ok(metadata)
    }

    /// Build the application with its beans bound
    pub fn application(&self) -> Result<Arc<Application>> {
        let mut builder = Application::builder()
            .settings(self.effective_settings()?)
            .metadata(self.metadata()?);
        for group in &self.groups {
            builder = builder.group(group.as_str());
        }
        let application = builder.build();
        for (name, def) in &self.beans {
            let bean = Bean::new(def.class.as_str());
            for (property, value) in &def.properties {
                bean.set(property.as_str(), Value::from_json(value)?);
            }
            application.put_bean(name, bean);
        }
        Ok(application)
    }

    /// Build the input components with their validators attached
    ///
    /// An input with `validation_groups` gets an explicitly configured bean
    /// validator; the others get the application's default validators.
    pub fn inputs(&self, application: &Application) -> Result<Vec<Arc<UIInput>>> {
        let mut inputs = Vec::with_capacity(self.inputs.len());
        for def in &self.inputs {
            let mut input = UIInput::new(def.id.as_str()).with_submitted_value(Value::from_json(&def.submitted)?);
            if let Some(ref label) = def.label {
                input = input.with_attribute("label", label.as_str());
            }
            if let Some(ref expression) = def.label_expression {
                input = input.with_value_expression("label", parse_expression(expression)?);
            }
            if let Some(ref expression) = def.value {
                input = input.with_value_expression("value", parse_expression(expression)?);
            }
            input = match def.validation_groups {
                Some(ref groups) => {
                    input.with_validator(Arc::new(BeanValidator::new().with_validation_groups(groups)))
                }
                None => input.with_default_validators(application)?,
            };
            inputs.push(Arc::new(input));
        }
        Ok(inputs)
    }

    /// Run the process-validations phase
    ///
    /// `locale` overrides the scenario's own locale.
    pub fn run(&self, locale: Option<Locale>) -> Result<Report> {
        let locale = match locale {
            Some(locale) => Some(locale),
            None => self.locale.as_deref().map(Locale::parse).transpose()?,
        };
        let application = self.application()?;
        let inputs = self.inputs(&application)?;

        let mut view = ViewRoot::new(self.view_id.as_deref().unwrap_or("/"));
        if let Some(locale) = locale {
            view = view.with_locale(locale);
        }
        let mut context = FacesContext::new(Arc::clone(&application)).with_view_root(view);

        let mut lifecycle = Lifecycle::new();
        if let Some(ref groups) = self.whole_bean_groups {
            lifecycle = lifecycle.with_whole_bean(WholeBeanValidator::new().with_validation_groups(groups.as_str()));
        }
        let outcome = lifecycle.process_validations(&mut context, &inputs);
        application.shutdown();
        outcome?;

        Ok(Report {
            failed: context.is_validation_failed(),
            invalid: inputs
                .iter()
                .filter(|input| !input.is_valid())
                .map(|input| input.client_id().to_string())
                .collect(),
            messages: context
                .messages()
                .iter()
                .map(|(client_id, message)| ReportedMessage {
                    client_id: client_id.clone(),
                    severity: message.severity,
                    summary: message.summary.clone(),
                    detail: message.detail.clone(),
                })
                .collect(),
        })
    }
}
