//! Bridge between the framework and the constraint engine
//!
//! Obtains the application's validator factory (building and caching it on
//! first use), decorates message interpolation with the locale of the
//! current view, and runs property validation.

use std::any::Any;
use std::sync::Arc;

use tracing::debug;

use crate::context::{Application, FacesContext};
use crate::error::{Error, Result};
use crate::expression::{ValueExpression, ValueReference};
use crate::locale::Locale;
use crate::value::Value;
use crate::VALIDATOR_FACTORY_KEY;

use super::engine::{
    ConstraintValidator, ConstraintViolation, InterpolationContext, MessageInterpolator,
    ValidatorFactory,
};
use super::groups::ValidationGroupSet;

fn as_factory(object: &Arc<dyn Any + Send + Sync>) -> Option<Arc<dyn ValidatorFactory>> {
    object.downcast_ref::<Arc<dyn ValidatorFactory>>().cloned()
}

/// Get the application's validator factory, building it on first use
///
/// Concurrent first calls may each build a factory; the first one stored
/// wins and the others are dropped.
pub fn validator_factory(application: &Application) -> Result<Arc<dyn ValidatorFactory>> {
    if let Some(factory) = application
        .attribute(VALIDATOR_FACTORY_KEY)
        .as_ref()
        .and_then(as_factory)
    {
        return Ok(factory);
    }

    let factory = application.provider().build_default_factory().map_err(|e| {
        Error::Configuration(format!("Could not build a default Bean Validator factory: {}", e))
    })?;
    debug!(key = VALIDATOR_FACTORY_KEY, "built default validator factory");

    Ok(application.with_attributes_mut(|attributes| {
        if let Some(existing) = attributes.get(VALIDATOR_FACTORY_KEY).and_then(as_factory) {
            return existing;
        }
        let stored: Arc<dyn Any + Send + Sync> = Arc::new(Arc::clone(&factory));
        attributes.insert(VALIDATOR_FACTORY_KEY.to_string(), stored);
        factory
    }))
}

/// Get a validator whose messages follow the locale of the current view
pub fn bean_validator(context: &FacesContext) -> Result<Box<dyn ConstraintValidator>> {
    let factory = validator_factory(context.application())?;
    let interpolator = LocaleAwareInterpolator::new(context.view_locale(), factory.message_interpolator());
    Ok(factory.validator(Arc::new(interpolator)))
}

/// Validate a value for the property a reference points at
///
/// A property the engine cannot address on the runtime type of the base is
/// logged and treated as having no violations.
pub fn validate_property(
    validator: &dyn ConstraintValidator,
    reference: &ValueReference,
    value: &Value,
    groups: &ValidationGroupSet,
    expression: &dyn ValueExpression,
) -> Result<Vec<ConstraintViolation>> {
    match validator.validate_value(reference.base_class(), &reference.property, value, groups) {
        Ok(violations) => Ok(violations),
        Err(e) if e.is_not_addressable() => {
            debug!(
                expression = expression.expression_string(),
                error = %e,
                "property not addressable, skipping validation"
            );
            Ok(Vec::new())
        }
        Err(e) => Err(e.into()),
    }
}

/// Interpolator that uses the view locale instead of the process default
#[derive(Debug)]
pub struct LocaleAwareInterpolator {
    locale: Option<Locale>,
    delegate: Arc<dyn MessageInterpolator>,
}

impl LocaleAwareInterpolator {
    /// Wrap `delegate`, interpolating for `locale` when one is known
    pub fn new(locale: Option<Locale>, delegate: Arc<dyn MessageInterpolator>) -> Self {
        Self { locale, delegate }
    }
}

impl MessageInterpolator for LocaleAwareInterpolator {
    fn interpolate(&self, template: &str, context: &InterpolationContext<'_>) -> String {
        let locale = self.locale.clone().unwrap_or_else(Locale::platform_default);
        self.delegate.interpolate_with_locale(template, context, &locale)
    }

    fn interpolate_with_locale(
        &self,
        template: &str,
        context: &InterpolationContext<'_>,
        locale: &Locale,
    ) -> String {
        self.delegate.interpolate_with_locale(template, context, locale)
    }
}
