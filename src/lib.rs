//! # beanvalidator
//!
//! Bean Validation for a server-side UI component lifecycle.
//!
//! Input components are bound to properties of application objects through
//! value expressions. During the process-validations phase every input is
//! validated against the constraints declared for the property its
//! expression points at, and violations become localized user-facing
//! messages.
//!
//! ## Features
//!
//! - Expression reference resolution (`#{person.address.city}` to the
//!   `(address, "city")` pair)
//! - Validation groups parsed from comma-delimited names and cached per validator
//! - A constraint engine driven by declared class metadata
//! - Locale-aware message interpolation
//! - Whole-bean (cross-field) validation over the collected field values
//! - State saving for validators
//!
//! ## Example
//!
//! ```rust,ignore
//! use beanvalidator::{Application, FacesContext, Lifecycle, UIInput};
//!
//! let application = Application::builder().metadata(metadata).build();
//! let input = UIInput::new("form:age")
//!     .with_value_expression("value", parse_expression("#{person.age}")?)
//!     .with_submitted_value(15)
//!     .with_default_validators(&application)?;
//!
//! let mut context = FacesContext::new(application);
//! Lifecycle::new().process_validations(&mut context, &[Arc::new(input)])?;
//! assert!(context.is_validation_failed());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod config;
pub mod locale;
pub mod value;

// Expressions and components
pub mod expression;
pub mod component;
pub mod context;

// Validation
pub mod validators;
pub mod lifecycle;

// Scenario files
pub mod scenario;

// Re-exports for convenience
pub use component::{Component, ComponentRef, UIInput, ViewRoot};
pub use config::Settings;
pub use context::{Application, ApplicationBuilder, FacesContext};
pub use error::{EngineError, Error, Result, ValidatorException};
pub use expression::{parse_expression, ElContext, ValueExpression, ValueReference};
pub use lifecycle::Lifecycle;
pub use locale::{Locale, MessageBundle};
pub use validators::{BeanValidator, FacesMessage, Validator, WholeBeanValidator};
pub use value::{Bean, BeanRef, Value};

/// Version of the beanvalidator library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Identifier the bean validator is registered under
pub const VALIDATOR_ID: &str = "javax.faces.Bean";

/// Bundle key of the pattern combining violation text and component label
pub const MESSAGE_ID: &str = "javax.faces.validator.BeanValidator.MESSAGE";

/// Application attribute holding the validator factory
pub const VALIDATOR_FACTORY_KEY: &str = "javax.faces.validator.beanValidator.ValidatorFactory";

/// Separator of validation group names
pub const VALIDATION_GROUPS_DELIMITER: &str = ",";

/// Pattern of a group list that names no group
pub const EMPTY_VALIDATION_GROUPS_PATTERN: &str = r"^[\W,]*$";

/// Init parameter disabling the default bean validator
pub const DISABLE_DEFAULT_BEAN_VALIDATOR_PARAM_NAME: &str =
    "javax.faces.validator.DISABLE_DEFAULT_BEAN_VALIDATOR";

/// Init parameter enabling whole-bean validation
pub const ENABLE_VALIDATE_WHOLE_BEAN_PARAM_NAME: &str =
    "javax.faces.validator.ENABLE_VALIDATE_WHOLE_BEAN";

/// Name of the default validation group
pub const DEFAULT_GROUP: &str = "javax.validation.groups.Default";
