//! Per-field Bean Validation
//!
//! [`BeanValidator`] is attached to input components. For each submitted
//! value it resolves the property the component's `value` expression points
//! at, validates the value against that property's constraints and turns the
//! violations into user-facing messages.

use std::sync::Arc;

use serde_json::json;

use crate::component::ComponentRef;
use crate::context::{Application, FacesContext};
use crate::error::{Error, Result, ValidatorException};
use crate::expression::{is_resolvable, resolve_reference};
use crate::value::Value;
use crate::MESSAGE_ID;

use super::adapter::{bean_validator, validate_property};
use super::groups::{is_empty_group_list, GroupCache, ValidationGroupSet};
use super::messages::{get_label, get_message, FacesMessage};
use super::whole_bean::{record_validation_result, whole_bean_validation_enabled, CandidateValue};
use super::Validator;

// ============================================================================
// State saving
// ============================================================================

/// An object whose state survives between requests
pub trait StateHolder {
    /// Save the state, `None` when there is nothing to save
    fn save_state(&self) -> Option<serde_json::Value>;

    /// Restore state produced by [`StateHolder::save_state`]
    fn restore_state(&mut self, state: Option<&serde_json::Value>) -> Result<()>;

    /// Check if the object should be left out of saved state entirely
    fn is_transient(&self) -> bool;

    /// Set whether the object is left out of saved state
    fn set_transient(&mut self, transient: bool);
}

/// A state holder that can skip saving while unchanged since construction
pub trait PartialStateHolder: StateHolder {
    /// Mark the current state as the initial one
    fn mark_initial_state(&mut self);

    /// Check if the state is still the marked initial one
    fn initial_state_marked(&self) -> bool;

    /// Forget the initial state mark
    fn clear_initial_state(&mut self);
}

// ============================================================================
// Validator
// ============================================================================

/// Validator delegating to the constraint engine
#[derive(Debug, Default)]
pub struct BeanValidator {
    validation_groups: Option<String>,
    cache: GroupCache,
    initial_state: bool,
    transient: bool,
}

impl BeanValidator {
    /// Create a validator for the default group
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the comma-delimited validation groups
    pub fn with_validation_groups(mut self, groups: &str) -> Self {
        self.set_validation_groups(Some(groups));
        self
    }

    /// Get the comma-delimited validation groups
    pub fn validation_groups(&self) -> Option<&str> {
        self.validation_groups.as_deref()
    }

    /// Set the comma-delimited validation groups
    ///
    /// A list naming no group is stored as `None`. Clears the initial state
    /// mark, so the new value is saved.
    pub fn set_validation_groups(&mut self, groups: Option<&str>) {
        self.clear_initial_state();
        self.validation_groups = groups
            .filter(|groups| !is_empty_group_list(groups))
            .map(str::to_string);
    }

    /// Resolve the validation groups, reusing the last parse while unchanged
    pub fn groups(&self, application: &Application) -> Result<Arc<ValidationGroupSet>> {
        self.cache
            .get_or_parse(self.validation_groups.as_deref(), application.groups())
    }
}

impl Validator for BeanValidator {
    fn validate(&self, context: &mut FacesContext, component: &ComponentRef, value: &Value) -> Result<()> {
        let Some(expression) = component.value_expression("value") else {
            return Ok(());
        };

        let validator = bean_validator(context)?;
        let groups = self.groups(context.application())?;

        let Some(reference) = resolve_reference(&*expression, &*context) else {
            return Ok(());
        };
        if !is_resolvable(&reference, &*expression) {
            return Ok(());
        }

        let violations = validate_property(&*validator, &reference, value, &groups, &*expression)?;
        let record = whole_bean_validation_enabled(context, &groups);

        if let Some((first, rest)) = violations.split_first() {
            let label = get_label(context, &**component);
            let primary = get_message(context, MESSAGE_ID, &first.message, &label);
            let others: Vec<FacesMessage> = rest
                .iter()
                .map(|violation| get_message(context, MESSAGE_ID, &violation.message, &label))
                .collect();

            if record {
                record_validation_result(
                    context,
                    component,
                    &reference.base,
                    &reference.property,
                    CandidateValue::FailedFieldLevelValidation,
                );
            }
            return Err(Error::Validator(ValidatorException::with_messages(primary, others)));
        }

        if record {
            record_validation_result(
                context,
                component,
                &reference.base,
                &reference.property,
                CandidateValue::Value(value.clone()),
            );
        }
        Ok(())
    }
}

impl StateHolder for BeanValidator {
    fn save_state(&self) -> Option<serde_json::Value> {
        if self.initial_state_marked() {
            return None;
        }
        Some(json!([self.validation_groups]))
    }

    fn restore_state(&mut self, state: Option<&serde_json::Value>) -> Result<()> {
        let Some(state) = state else {
            return Ok(());
        };
        let groups = match state.as_array().map(Vec::as_slice) {
            Some([serde_json::Value::Null]) => None,
            Some([serde_json::Value::String(groups)]) => Some(groups.clone()),
            _ => {
                return Err(Error::State(format!(
                    "expected a one-element array holding the validation groups, got {}",
                    state
                )))
            }
        };
        self.validation_groups = groups;
        Ok(())
    }

    fn is_transient(&self) -> bool {
        self.transient
    }

    fn set_transient(&mut self, transient: bool) {
        self.transient = transient;
    }
}

impl PartialStateHolder for BeanValidator {
    fn mark_initial_state(&mut self) {
        self.initial_state = true;
    }

    fn initial_state_marked(&self) -> bool {
        self.initial_state
    }

    fn clear_initial_state(&mut self) {
        self.initial_state = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Component, UIInput, ViewRoot};
    use crate::config::Settings;
    use crate::expression::parse_expression;
    use crate::locale::Locale;
    use crate::validators::constraints::{Constraint, ConstraintDescriptor};
    use crate::validators::engine::{BeanMetadata, ClassDescriptor};
    use crate::validators::groups::GroupMarker;
    use crate::value::Bean;
    use pretty_assertions::assert_eq;

    fn application() -> Arc<Application> {
        let person = ClassDescriptor::new()
            .property("age", [Constraint::Min(18), Constraint::Max(150)])
            .property(
                "nickname",
                [
                    ConstraintDescriptor::new(Constraint::Size { min: 2, max: 10 })
                        .with_message("is not a valid nickname"),
                    ConstraintDescriptor::new(Constraint::pattern("[a-z]+").unwrap())
                        .with_message("is not a valid nickname"),
                ],
            )
            .property(
                "email",
                [ConstraintDescriptor::new(Constraint::Email)
                    .in_groups([GroupMarker::new("com.example.Strict")])],
            );
        Application::builder()
            .settings(Settings::new().with_enable_whole_bean(true))
            .group("com.example.Strict")
            .metadata(BeanMetadata::new().with_class("com.example.Person", person))
            .build()
    }

    fn context() -> FacesContext {
        let mut context = FacesContext::new(application())
            .with_view_root(ViewRoot::new("/person.xhtml").with_locale(Locale::english()));
        context.set_request_attribute(
            "person",
            Bean::from_pairs("com.example.Person", [("age", 30)]),
        );
        context.set_request_attribute("scores", Value::List(vec![Value::from(1)]));
        context
    }

    fn input(expression: &str) -> ComponentRef {
        Arc::new(
            UIInput::new("form:field")
                .with_attribute("label", "Field")
                .with_value_expression("value", parse_expression(expression).unwrap()),
        )
    }

    fn messages(err: Error) -> Vec<String> {
        match err {
            Error::Validator(e) => e.into_messages().into_iter().map(|m| m.detail).collect(),
            other => panic!("expected a validation failure, got {other}"),
        }
    }

    #[test]
    fn test_no_value_expression_is_skipped() {
        let mut context = context();
        let component: ComponentRef = Arc::new(UIInput::new("form:plain"));
        BeanValidator::new()
            .validate(&mut context, &component, &Value::from(1))
            .unwrap();
    }

    #[test]
    fn test_bulk_base_is_skipped() {
        let mut context = context();
        BeanValidator::new()
            .validate(&mut context, &input("#{scores[0]}"), &Value::from(-5))
            .unwrap();
        assert!(context.candidates().is_none());
    }

    #[test]
    fn test_unknown_property_is_swallowed() {
        let mut context = context();
        context.set_request_attribute("other", Bean::from_pairs("com.example.Other", [("x", 1)]));
        BeanValidator::new()
            .validate(&mut context, &input("#{other.x}"), &Value::from(1))
            .unwrap();
    }

    #[test]
    fn test_single_violation() {
        let mut context = context();
        let err = BeanValidator::new()
            .validate(&mut context, &input("#{person.age}"), &Value::from(15))
            .unwrap_err();
        assert_eq!(messages(err), vec!["Field: must be greater than or equal to 18"]);
    }

    #[test]
    fn test_duplicate_messages_collapse() {
        let mut context = context();
        let err = BeanValidator::new()
            .validate(&mut context, &input("#{person.nickname}"), &Value::from("X"))
            .unwrap_err();
        assert_eq!(messages(err), vec!["Field: is not a valid nickname"]);
    }

    #[test]
    fn test_valid_value_passes() {
        let mut context = context();
        BeanValidator::new()
            .validate(&mut context, &input("#{person.age}"), &Value::from(21))
            .unwrap();
        assert!(context.candidates().is_none());
    }

    #[test]
    fn test_unknown_group_is_configuration_error() {
        let mut context = context();
        let err = BeanValidator::new()
            .with_validation_groups("com.example.Missing")
            .validate(&mut context, &input("#{person.age}"), &Value::from(21))
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(!err.is_validation_failure());
    }

    #[test]
    fn test_failure_recorded_before_raise() {
        let mut context = context();
        let component = input("#{person.email}");
        let err = BeanValidator::new()
            .with_validation_groups("com.example.Strict")
            .validate(&mut context, &component, &Value::from("bad"))
            .unwrap_err();
        assert!(err.is_validation_failure());

        let candidates = context.candidates().unwrap();
        let candidate = candidates.iter().next().unwrap();
        assert!(candidate.get("email").unwrap().value.is_failure());
        assert_eq!(candidate.get("email").unwrap().component.client_id(), "form:field");
    }

    #[test]
    fn test_group_cache_follows_source() {
        let application = application();
        let mut validator = BeanValidator::new().with_validation_groups("com.example.Strict");
        let first = validator.groups(&application).unwrap();
        assert!(Arc::ptr_eq(&first, &validator.groups(&application).unwrap()));

        validator.set_validation_groups(None);
        let second = validator.groups(&application).unwrap();
        assert!(second.is_default_only());
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_state_round_trip() {
        let mut validator = BeanValidator::new().with_validation_groups("com.example.Strict");
        let state = validator.save_state();
        assert_eq!(state, Some(json!(["com.example.Strict"])));

        let mut restored = BeanValidator::new();
        restored.restore_state(state.as_ref()).unwrap();
        assert_eq!(restored.validation_groups(), Some("com.example.Strict"));

        validator.mark_initial_state();
        assert_eq!(validator.save_state(), None);
        validator.set_validation_groups(Some("javax.validation.groups.Default"));
        assert!(!validator.initial_state_marked());
        assert!(validator.save_state().is_some());
    }

    #[test]
    fn test_group_list_naming_no_group_is_stored_as_none() {
        let mut validator = BeanValidator::new().with_validation_groups("com.example.Strict");
        validator.set_validation_groups(Some(" , , "));
        assert_eq!(validator.validation_groups(), None);
        assert_eq!(validator.save_state(), Some(json!([null])));

        let validator = BeanValidator::new().with_validation_groups(",");
        assert_eq!(validator.validation_groups(), None);
    }

    #[test]
    fn test_restore_rejects_malformed_state() {
        let mut validator = BeanValidator::new();
        assert!(validator.restore_state(Some(&json!({"groups": "a"}))).is_err());
        assert!(validator.restore_state(Some(&json!(["a", "b"]))).is_err());
        validator.restore_state(None).unwrap();
        validator.restore_state(Some(&json!([null]))).unwrap();
        assert_eq!(validator.validation_groups(), None);
    }
}
