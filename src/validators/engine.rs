//! Constraint engine
//!
//! The traits in this module are the seam between the framework and a
//! bean-constraint engine: a [`ValidationProvider`] builds a
//! [`ValidatorFactory`], which hands out [`ConstraintValidator`]s configured
//! with a [`MessageInterpolator`].
//!
//! [`MetadataProvider`] is the built-in engine. It validates beans against
//! constraints declared per class in a [`BeanMetadata`] registry.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::EngineError;
use crate::locale::{Locale, MessageBundle};
use crate::value::{Bean, Value};

use super::constraints::{Attributes, ClassConstraint, Constraint, ConstraintDescriptor};
use super::groups::ValidationGroupSet;

/// Data available while interpolating a message template
#[derive(Debug, Clone, Copy)]
pub struct InterpolationContext<'a> {
    /// Attributes of the violated constraint
    pub attributes: &'a [(&'static str, String)],
    /// The value that failed validation
    pub validated_value: &'a Value,
}

/// Turns message templates into user-facing text
pub trait MessageInterpolator: fmt::Debug + Send + Sync {
    /// Interpolate using the interpolator's own default locale
    fn interpolate(&self, template: &str, context: &InterpolationContext<'_>) -> String;

    /// Interpolate for a specific locale
    fn interpolate_with_locale(
        &self,
        template: &str,
        context: &InterpolationContext<'_>,
        locale: &Locale,
    ) -> String;
}

/// A single failed constraint
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintViolation {
    /// Interpolated message
    pub message: String,
    /// Template the message was built from
    pub message_template: String,
    /// Property the violation is reported on (empty for the bean itself)
    pub property_path: String,
    /// The offending value
    pub invalid_value: Value,
    /// Name of the violated constraint
    pub constraint: &'static str,
}

/// Validates values and beans against declared constraints
pub trait ConstraintValidator: fmt::Debug + Send + Sync {
    /// Validate a candidate value for a property of a class
    ///
    /// Fails with [`EngineError::PropertyNotAddressable`] when the class has
    /// no such property.
    fn validate_value(
        &self,
        class: &str,
        property: &str,
        value: &Value,
        groups: &ValidationGroupSet,
    ) -> Result<Vec<ConstraintViolation>, EngineError>;

    /// Validate every property and class-level constraint of a bean
    fn validate(
        &self,
        bean: &Bean,
        groups: &ValidationGroupSet,
    ) -> Result<Vec<ConstraintViolation>, EngineError>;
}

/// Application-wide source of validators
pub trait ValidatorFactory: fmt::Debug + Send + Sync {
    /// The factory's own message interpolator
    fn message_interpolator(&self) -> Arc<dyn MessageInterpolator>;

    /// Get a validator that interpolates messages with `interpolator`
    fn validator(&self, interpolator: Arc<dyn MessageInterpolator>) -> Box<dyn ConstraintValidator>;
}

/// Builds the default validator factory
pub trait ValidationProvider: fmt::Debug + Send + Sync {
    /// Build a factory, failing if the engine cannot be configured
    fn build_default_factory(&self) -> Result<Arc<dyn ValidatorFactory>, EngineError>;
}

/// Interpolator resolving `{bundle.key}` and `{attribute}` placeholders
///
/// Bundle keys are looked up first, then constraint attributes.
/// `${validatedValue}` is replaced by the rejected value. Unknown
/// placeholders are left untouched.
#[derive(Debug, Clone)]
pub struct BundleMessageInterpolator {
    bundle: Arc<MessageBundle>,
    default_locale: Locale,
}

impl BundleMessageInterpolator {
    /// Create an interpolator using the platform default locale
    pub fn new(bundle: Arc<MessageBundle>) -> Self {
        Self {
            bundle,
            default_locale: Locale::platform_default(),
        }
    }

    /// Set the locale used when none is given
    pub fn with_default_locale(mut self, locale: Locale) -> Self {
        self.default_locale = locale;
        self
    }

    fn resolve(&self, text: &str, context: &InterpolationContext<'_>, locale: &Locale, depth: usize) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(open) = rest.find('{') {
            let Some(len) = rest[open..].find('}') else {
                break;
            };
            let token = &rest[open + 1..open + len];
            let dollar = rest[..open].ends_with('$');
            out.push_str(&rest[..if dollar { open - 1 } else { open }]);

            let replacement = if dollar && token == "validatedValue" {
                Some(context.validated_value.to_string())
            } else if let Some(text) = self.bundle.get(token, locale).filter(|_| depth < 3) {
                Some(self.resolve(text, context, locale, depth + 1))
            } else {
                context
                    .attributes
                    .iter()
                    .find(|(name, _)| *name == token)
                    .map(|(_, value)| value.clone())
            };

            match replacement {
                Some(value) => out.push_str(&value),
                None => {
                    if dollar {
                        out.push('$');
                    }
                    out.push_str(&rest[open..=open + len]);
                }
            }
            rest = &rest[open + len + 1..];
        }
        out.push_str(rest);
        out
    }
}

impl MessageInterpolator for BundleMessageInterpolator {
    fn interpolate(&self, template: &str, context: &InterpolationContext<'_>) -> String {
        self.resolve(template, context, &self.default_locale, 0)
    }

    fn interpolate_with_locale(
        &self,
        template: &str,
        context: &InterpolationContext<'_>,
        locale: &Locale,
    ) -> String {
        self.resolve(template, context, locale, 0)
    }
}

/// Declared properties and constraints of one class
#[derive(Debug, Clone, Default)]
pub struct ClassDescriptor {
    properties: IndexMap<String, Vec<ConstraintDescriptor<Constraint>>>,
    class_constraints: Vec<ConstraintDescriptor<ClassConstraint>>,
}

impl ClassDescriptor {
    /// Create a descriptor without properties
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an unconstrained property
    pub fn declare(mut self, property: &str) -> Self {
        self.properties.entry(property.to_string()).or_default();
        self
    }

    /// Declare a property with constraints
    pub fn property<D>(mut self, property: &str, constraints: impl IntoIterator<Item = D>) -> Self
    where
        D: Into<ConstraintDescriptor<Constraint>>,
    {
        self.properties
            .entry(property.to_string())
            .or_default()
            .extend(constraints.into_iter().map(Into::into));
        self
    }

    /// Add a class-level constraint
    pub fn class_constraint(mut self, constraint: impl Into<ConstraintDescriptor<ClassConstraint>>) -> Self {
        self.class_constraints.push(constraint.into());
        self
    }

    /// Check if a property is declared
    pub fn has_property(&self, property: &str) -> bool {
        self.properties.contains_key(property)
    }

    /// Constraints declared on a property
    pub fn constraints(&self, property: &str) -> &[ConstraintDescriptor<Constraint>] {
        self.properties.get(property).map(Vec::as_slice).unwrap_or_default()
    }

    /// Class-level constraints
    pub fn class_constraints(&self) -> &[ConstraintDescriptor<ClassConstraint>] {
        &self.class_constraints
    }

    fn check(&self, class: &str) -> Result<(), String> {
        for (property, constraints) in &self.properties {
            for descriptor in constraints {
                descriptor
                    .constraint
                    .check_definition()
                    .map_err(|e| format!("{}.{}: {}", class, property, e))?;
            }
        }
        for descriptor in &self.class_constraints {
            for property in descriptor.constraint.referenced_properties() {
                if !self.has_property(property) {
                    return Err(format!(
                        "{} constraint on {} references undeclared property '{}'",
                        descriptor.constraint.name(),
                        class,
                        property
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Constraint declarations for all known classes
#[derive(Debug, Clone, Default)]
pub struct BeanMetadata {
    classes: IndexMap<String, ClassDescriptor>,
}

impl BeanMetadata {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class
    pub fn with_class(mut self, class: &str, descriptor: ClassDescriptor) -> Self {
        self.classes.insert(class.to_string(), descriptor);
        self
    }

    /// Register a class in place
    pub fn insert(&mut self, class: &str, descriptor: ClassDescriptor) {
        self.classes.insert(class.to_string(), descriptor);
    }

    /// Get the descriptor of a class
    pub fn class(&self, class: &str) -> Option<&ClassDescriptor> {
        self.classes.get(class)
    }

    /// Check every declaration
    pub fn check(&self) -> Result<(), String> {
        for (class, descriptor) in &self.classes {
            descriptor.check(class)?;
        }
        Ok(())
    }
}

/// Provider of the metadata-driven engine
#[derive(Debug, Clone)]
pub struct MetadataProvider {
    metadata: Arc<BeanMetadata>,
    bundle: Arc<MessageBundle>,
}

impl MetadataProvider {
    /// Create a provider for the given metadata and messages
    pub fn new(metadata: BeanMetadata, bundle: Arc<MessageBundle>) -> Self {
        Self {
            metadata: Arc::new(metadata),
            bundle,
        }
    }
}

impl ValidationProvider for MetadataProvider {
    fn build_default_factory(&self) -> Result<Arc<dyn ValidatorFactory>, EngineError> {
        self.metadata.check().map_err(EngineError::Construction)?;
        Ok(Arc::new(MetadataValidatorFactory {
            metadata: Arc::clone(&self.metadata),
            interpolator: Arc::new(BundleMessageInterpolator::new(Arc::clone(&self.bundle))),
        }))
    }
}

/// Factory of the metadata-driven engine
#[derive(Debug)]
pub struct MetadataValidatorFactory {
    metadata: Arc<BeanMetadata>,
    interpolator: Arc<BundleMessageInterpolator>,
}

impl ValidatorFactory for MetadataValidatorFactory {
    fn message_interpolator(&self) -> Arc<dyn MessageInterpolator> {
        self.interpolator.clone()
    }

    fn validator(&self, interpolator: Arc<dyn MessageInterpolator>) -> Box<dyn ConstraintValidator> {
        Box::new(MetadataValidator {
            metadata: Arc::clone(&self.metadata),
            interpolator,
        })
    }
}

/// Validator of the metadata-driven engine
#[derive(Debug)]
pub struct MetadataValidator {
    metadata: Arc<BeanMetadata>,
    interpolator: Arc<dyn MessageInterpolator>,
}

impl MetadataValidator {
    fn descriptor(&self, class: &str, property: &str) -> Result<&ClassDescriptor, EngineError> {
        self.metadata
            .class(class)
            .filter(|descriptor| descriptor.has_property(property))
            .ok_or_else(|| EngineError::PropertyNotAddressable {
                class: class.to_string(),
                property: property.to_string(),
            })
    }

    fn violation(
        &self,
        name: &'static str,
        template: String,
        attributes: &Attributes,
        property: &str,
        value: &Value,
    ) -> ConstraintViolation {
        let context = InterpolationContext {
            attributes,
            validated_value: value,
        };
        ConstraintViolation {
            message: self.interpolator.interpolate(&template, &context),
            message_template: template,
            property_path: property.to_string(),
            invalid_value: value.clone(),
            constraint: name,
        }
    }

    fn property_violations(
        &self,
        descriptor: &ClassDescriptor,
        property: &str,
        value: &Value,
        groups: &ValidationGroupSet,
    ) -> Vec<ConstraintViolation> {
        descriptor
            .constraints(property)
            .iter()
            .filter(|d| d.applies_to(groups) && !d.constraint.is_valid(value))
            .map(|d| {
                let name = d.constraint.name();
                self.violation(name, d.template(name), &d.constraint.attributes(), property, value)
            })
            .collect()
    }
}

impl ConstraintValidator for MetadataValidator {
    fn validate_value(
        &self,
        class: &str,
        property: &str,
        value: &Value,
        groups: &ValidationGroupSet,
    ) -> Result<Vec<ConstraintViolation>, EngineError> {
        let descriptor = self.descriptor(class, property)?;
        Ok(self.property_violations(descriptor, property, value, groups))
    }

    fn validate(
        &self,
        bean: &Bean,
        groups: &ValidationGroupSet,
    ) -> Result<Vec<ConstraintViolation>, EngineError> {
        let descriptor = self.metadata.class(bean.class()).ok_or_else(|| {
            EngineError::PropertyNotAddressable {
                class: bean.class().to_string(),
                property: String::new(),
            }
        })?;

        let mut violations = Vec::new();
        for property in descriptor.properties.keys() {
            let value = bean.get(property).unwrap_or_default();
            violations.extend(self.property_violations(descriptor, property, &value, groups));
        }
        for d in descriptor.class_constraints() {
            if d.applies_to(groups) && !d.constraint.is_valid(bean) {
                let name = d.constraint.name();
                let property = d.constraint.reported_property();
                let value = bean.get(property).unwrap_or_default();
                violations.push(self.violation(
                    name,
                    d.template(name),
                    &d.constraint.attributes(),
                    property,
                    &value,
                ));
            }
        }
        Ok(violations)
    }
}
