//! Whole-bean (cross-field) validation
//!
//! Field validators record their outcome per bean instance while the
//! component tree is processed. Once every field has run, [`WholeBeanValidator`]
//! checks the class-level constraints of each bean whose fields all passed,
//! using a copy of the bean carrying the submitted values.

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::component::{Component, ComponentRef};
use crate::context::FacesContext;
use crate::error::Result;
use crate::value::{BeanRef, Value};
use crate::MESSAGE_ID;

use super::adapter::bean_validator;
use super::groups::{is_empty_group_list, GroupCache, ValidationGroupSet};
use super::messages::{get_label, get_message, FacesMessage};

/// Outcome recorded for one field
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateValue {
    /// The field passed with this value
    Value(Value),
    /// The field failed its own constraints
    FailedFieldLevelValidation,
}

impl CandidateValue {
    /// Check if this is the failure marker
    pub fn is_failure(&self) -> bool {
        matches!(self, CandidateValue::FailedFieldLevelValidation)
    }

    /// Get the recorded value, if the field passed
    pub fn value(&self) -> Option<&Value> {
        match self {
            CandidateValue::Value(value) => Some(value),
            CandidateValue::FailedFieldLevelValidation => None,
        }
    }
}

/// A component and the outcome of its field validation
#[derive(Debug, Clone)]
pub struct CandidateTuple {
    /// Component the value came from
    pub component: ComponentRef,
    /// Recorded outcome
    pub value: CandidateValue,
}

/// All fields recorded for one bean instance
#[derive(Debug, Clone)]
pub struct BeanCandidate {
    bean: BeanRef,
    properties: IndexMap<String, CandidateTuple>,
}

impl BeanCandidate {
    fn new(bean: BeanRef) -> Self {
        Self {
            bean,
            properties: IndexMap::new(),
        }
    }

    /// The bean the fields are bound to
    pub fn bean(&self) -> &BeanRef {
        &self.bean
    }

    /// Recorded fields in recording order
    pub fn properties(&self) -> &IndexMap<String, CandidateTuple> {
        &self.properties
    }

    /// Get the recorded field for a property
    pub fn get(&self, property: &str) -> Option<&CandidateTuple> {
        self.properties.get(property)
    }

    /// Check if any field failed
    pub fn has_failure(&self) -> bool {
        self.properties.values().any(|t| t.value.is_failure())
    }

    /// Number of recorded fields
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Check if no field is recorded
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// Per-request candidates, keyed by bean identity
#[derive(Debug, Clone, Default)]
pub struct CandidateRegistry {
    entries: IndexMap<usize, BeanCandidate>,
}

impl CandidateRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a field outcome, merging into the bean's existing entry
    pub fn record(
        &mut self,
        bean: &BeanRef,
        property: &str,
        component: &ComponentRef,
        value: CandidateValue,
    ) {
        let candidate = self
            .entries
            .entry(bean.identity())
            .or_insert_with(|| BeanCandidate::new(BeanRef::clone(bean)));
        candidate.properties.insert(
            property.to_string(),
            CandidateTuple {
                component: ComponentRef::clone(component),
                value,
            },
        );
    }

    /// Get the entry for a bean instance
    pub fn get(&self, bean: &BeanRef) -> Option<&BeanCandidate> {
        self.entries.get(&bean.identity())
    }

    /// Entries in the order their beans were first recorded
    pub fn iter(&self) -> impl Iterator<Item = &BeanCandidate> {
        self.entries.values()
    }

    /// Number of beans
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Check if field outcomes should be recorded for a group set
///
/// Requires the application flag and a group set that is not just the
/// default group.
pub fn whole_bean_validation_enabled(context: &FacesContext, groups: &ValidationGroupSet) -> bool {
    context.application().settings().enable_whole_bean && !groups.is_default_only()
}

/// Record a field outcome for the bean the field is bound to
///
/// Only beans are recorded; any other base is ignored.
pub fn record_validation_result(
    context: &mut FacesContext,
    component: &ComponentRef,
    base: &Value,
    property: &str,
    value: CandidateValue,
) {
    let Some(bean) = base.as_bean() else {
        trace!(base = base.type_name(), property, "base is not a bean, nothing recorded");
        return;
    };
    trace!(
        class = bean.class(),
        property,
        failed = value.is_failure(),
        "recording whole-bean candidate"
    );
    context
        .candidates_mut()
        .record(bean, property, component, value);
}

/// Runs class-level constraints over the recorded candidates
#[derive(Debug, Default)]
pub struct WholeBeanValidator {
    validation_groups: Option<String>,
    cache: GroupCache,
}

impl WholeBeanValidator {
    /// Create a validator for the default group
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the comma-delimited validation groups
    pub fn with_validation_groups(mut self, groups: impl Into<String>) -> Self {
        let groups = groups.into();
        self.set_validation_groups(Some(&groups));
        self
    }

    /// Get the validation groups
    pub fn validation_groups(&self) -> Option<&str> {
        self.validation_groups.as_deref()
    }

    /// Set the validation groups, storing a list naming no group as `None`
    pub fn set_validation_groups(&mut self, groups: Option<&str>) {
        self.validation_groups = groups
            .filter(|groups| !is_empty_group_list(groups))
            .map(str::to_string);
    }

    /// Validate every candidate bean whose fields all passed
    ///
    /// Violations are queued on the components of the properties they report,
    /// or as global messages when no such property was recorded. Returns the
    /// number of queued messages.
    pub fn validate_candidates(&self, context: &mut FacesContext) -> Result<usize> {
        let Some(candidates) = context.candidates().filter(|c| !c.is_empty()).cloned() else {
            return Ok(0);
        };
        let groups = self
            .cache
            .get_or_parse(self.validation_groups.as_deref(), context.application().groups())?;
        let validator = bean_validator(context)?;

        let mut queued = 0;
        for candidate in candidates.iter() {
            let bean = candidate.bean();
            if candidate.has_failure() {
                debug!(class = bean.class(), "field validation failed, skipping whole-bean validation");
                continue;
            }

            let copy = bean.copy();
            for (property, tuple) in candidate.properties() {
                if let Some(value) = tuple.value.value() {
                    copy.set(property.as_str(), value.clone());
                }
            }

            let violations = match validator.validate(&copy, &groups) {
                Ok(violations) => violations,
                Err(e) if e.is_not_addressable() => {
                    debug!(class = bean.class(), error = %e, "unable to validate whole bean");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            for violation in violations {
                match candidate.get(&violation.property_path) {
                    Some(tuple) => {
                        let component: &dyn Component = &*tuple.component;
                        let label = get_label(context, component);
                        let message = get_message(context, MESSAGE_ID, &violation.message, &label);
                        context.add_message(Some(component.client_id()), message);
                        component.set_valid(false);
                    }
                    None => context.add_message(None, FacesMessage::error(violation.message)),
                }
                queued += 1;
            }
        }

        if queued > 0 {
            context.mark_validation_failed();
        }
        Ok(queued)
    }
}
