//! Process-validations phase
//!
//! Walks the input components in tree order, runs their validators and
//! finally the whole-bean step.

use std::sync::Arc;

use tracing::debug;

use crate::component::{Component, ComponentRef, UIInput};
use crate::context::FacesContext;
use crate::error::{Error, Result};
use crate::validators::WholeBeanValidator;

/// Drives validation for one request
#[derive(Debug, Default)]
pub struct Lifecycle {
    whole_bean: Option<WholeBeanValidator>,
}

impl Lifecycle {
    /// Create a lifecycle without a whole-bean step
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `validator` after all fields when whole-bean validation is enabled
    pub fn with_whole_bean(mut self, validator: WholeBeanValidator) -> Self {
        self.whole_bean = Some(validator);
        self
    }

    /// Validate `inputs` in order
    ///
    /// A failing validator queues its messages for the component, marks it
    /// invalid and stops the remaining validators of that component; the next
    /// component is processed normally. Errors other than validation
    /// failures abort the phase.
    pub fn process_validations(&self, context: &mut FacesContext, inputs: &[Arc<UIInput>]) -> Result<()> {
        for input in inputs {
            let component: ComponentRef = input.clone();
            let value = input.submitted_value();
            for validator in input.validators() {
                match validator.validate(context, &component, &value) {
                    Ok(()) => {}
                    Err(Error::Validator(exception)) => {
                        debug!(client_id = component.client_id(), "field validation failed");
                        for message in exception.into_messages() {
                            context.add_message(Some(component.client_id()), message);
                        }
                        component.set_valid(false);
                        context.mark_validation_failed();
                        break;
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        if context.application().settings().enable_whole_bean {
            if let Some(ref whole_bean) = self.whole_bean {
                whole_bean.validate_candidates(context)?;
            }
        }
        Ok(())
    }
}
