//! Validators
//!
//! This module contains the Bean Validation integration: group parsing, the
//! constraint engine and its adapter, the per-field validator and the
//! whole-bean aggregator.

use std::fmt;

use crate::component::ComponentRef;
use crate::context::FacesContext;
use crate::error::Result;
use crate::value::Value;

pub mod adapter;
pub mod bean_validator;
pub mod constraints;
pub mod engine;
pub mod groups;
pub mod messages;
pub mod whole_bean;

// Re-exports
pub use adapter::{bean_validator, validate_property, validator_factory, LocaleAwareInterpolator};
pub use bean_validator::{BeanValidator, PartialStateHolder, StateHolder};
pub use constraints::{ClassConstraint, Constraint, ConstraintDescriptor};
pub use engine::{
    BeanMetadata, BundleMessageInterpolator, ClassDescriptor, ConstraintValidator,
    ConstraintViolation, MessageInterpolator, MetadataProvider, ValidationProvider,
    ValidatorFactory,
};
pub use groups::{parse_validation_groups, GroupCache, GroupMarker, GroupRegistry, ValidationGroupSet};
pub use messages::{get_label, get_message, FacesMessage, Severity};
pub use whole_bean::{
    record_validation_result, whole_bean_validation_enabled, BeanCandidate, CandidateRegistry,
    CandidateTuple, CandidateValue, WholeBeanValidator,
};

/// A validator attached to an input component
///
/// A failed check is reported as [`crate::Error::Validator`]; every other
/// error kind is fatal for the request.
pub trait Validator: fmt::Debug + Send + Sync {
    /// Validate the converted value of `component`
    fn validate(&self, context: &mut FacesContext, component: &ComponentRef, value: &Value) -> Result<()>;
}
