//! User-facing messages
//!
//! Messages are built from bundle patterns using `{0}`, `{1}`, ... positional
//! placeholders, looked up for the locale of the current view.

use std::fmt;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;

use crate::component::Component;
use crate::context::FacesContext;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{(\d+)\}").unwrap());

/// Message severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational
    Info,
    /// Warning
    Warn,
    /// Error
    Error,
    /// Fatal error
    Fatal,
}

impl Severity {
    /// Get the severity as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A message queued for display to the user
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FacesMessage {
    /// Message severity
    pub severity: Severity,
    /// Short text
    pub summary: String,
    /// Full text
    pub detail: String,
}

impl FacesMessage {
    /// Create a message
    pub fn new(severity: Severity, summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity,
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    /// Create an error message whose summary and detail are the same text
    pub fn error(detail: impl Into<String>) -> Self {
        let detail = detail.into();
        Self::new(Severity::Error, detail.clone(), detail)
    }
}

impl fmt::Display for FacesMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.detail)
    }
}

/// Replace `{n}` placeholders with the matching argument
///
/// Placeholders without an argument are kept as written.
pub fn format_message(pattern: &str, args: &[&str]) -> String {
    PLACEHOLDER
        .replace_all(pattern, |caps: &Captures<'_>| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|i| args.get(i))
                .map(|arg| arg.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Build an error message from the bundle pattern registered under `message_id`
///
/// The violation text fills `{0}` and the component label fills `{1}`. A
/// `<message_id>_detail` pattern, when present, is used for the detail.
/// Without a pattern the violation text is used as is.
pub fn get_message(
    context: &FacesContext,
    message_id: &str,
    violation_text: &str,
    label: &str,
) -> FacesMessage {
    let locale = context.message_locale();
    let bundle = context.application().bundle();
    let args = [violation_text, label];

    let summary = bundle
        .get(message_id, &locale)
        .map(|pattern| format_message(pattern, &args))
        .unwrap_or_else(|| violation_text.to_string());
    let detail = bundle
        .get(&format!("{}_detail", message_id), &locale)
        .map(|pattern| format_message(pattern, &args))
        .unwrap_or_else(|| summary.clone());

    FacesMessage::new(Severity::Error, summary, detail)
}

/// Get the display label of a component
///
/// Uses the `label` attribute, else the value of an expression bound to
/// `label`, else the client id.
pub fn get_label(context: &FacesContext, component: &dyn Component) -> String {
    if let Some(label) = component.attribute("label").filter(|v| !v.is_null()) {
        return label.to_string();
    }
    if let Some(expression) = component.value_expression("label") {
        match expression.get_value(context) {
            Ok(label) if !label.is_null() => return label.to_string(),
            Ok(_) => {}
            Err(e) => tracing::debug!(
                expression = expression.expression_string(),
                error = %e,
                "could not evaluate label expression"
            ),
        }
    }
    component.client_id().to_string()
}
