//! Declarative constraints
//!
//! Field constraints check a single property value; class constraints check
//! relations between several properties of one bean. `null` satisfies every
//! field constraint except `NotNull`, `NotEmpty` and `NotBlank`.

use std::fmt;

use chrono::{NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

use crate::error::{Error, Result};
use crate::value::{Bean, Value};

use super::groups::{GroupMarker, ValidationGroupSet};

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~.-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)*$")
        .unwrap()
});

/// Attribute values made available to message interpolation
pub type Attributes = Vec<(&'static str, String)>;

/// A constraint on a single property value
#[derive(Debug, Clone)]
pub enum Constraint {
    /// Value must not be null
    NotNull,
    /// Value must be null
    Null,
    /// Text or collection must not be null or empty
    NotEmpty,
    /// Text must not be null and must contain a non-whitespace character
    NotBlank,
    /// Boolean must be true
    AssertTrue,
    /// Boolean must be false
    AssertFalse,
    /// Number must be at least the bound
    Min(i64),
    /// Number must be at most the bound
    Max(i64),
    /// Number must be above (or equal to) the bound
    DecimalMin {
        /// Lower bound
        value: Decimal,
        /// Whether the bound itself is allowed
        inclusive: bool,
    },
    /// Number must be below (or equal to) the bound
    DecimalMax {
        /// Upper bound
        value: Decimal,
        /// Whether the bound itself is allowed
        inclusive: bool,
    },
    /// Number must be strictly positive
    Positive,
    /// Number must be strictly negative
    Negative,
    /// Length of text or size of a collection must be within bounds
    Size {
        /// Minimum size
        min: usize,
        /// Maximum size
        max: usize,
    },
    /// Number must not have more integer or fraction digits than allowed
    Digits {
        /// Maximum integer digits
        integer: u32,
        /// Maximum fraction digits
        fraction: u32,
    },
    /// Text must match the regular expression in full
    Pattern(Regex),
    /// Text must be an email address
    Email,
    /// Text must be an absolute URL
    Url,
    /// Date must be before today
    Past,
    /// Date must be after today
    Future,
}

impl Constraint {
    /// Create a pattern constraint
    pub fn pattern(regexp: &str) -> Result<Self> {
        let anchored = format!("^(?:{})$", regexp);
        Regex::new(&anchored)
            .map(Constraint::Pattern)
            .map_err(|e| Error::Configuration(format!("Invalid pattern '{}': {}", regexp, e)))
    }

    /// Create an inclusive decimal lower bound
    pub fn decimal_min(value: Decimal) -> Self {
        Constraint::DecimalMin {
            value,
            inclusive: true,
        }
    }

    /// Create an inclusive decimal upper bound
    pub fn decimal_max(value: Decimal) -> Self {
        Constraint::DecimalMax {
            value,
            inclusive: true,
        }
    }

    /// Get the constraint name used for message lookup
    pub fn name(&self) -> &'static str {
        match self {
            Constraint::NotNull => "NotNull",
            Constraint::Null => "Null",
            Constraint::NotEmpty => "NotEmpty",
            Constraint::NotBlank => "NotBlank",
            Constraint::AssertTrue => "AssertTrue",
            Constraint::AssertFalse => "AssertFalse",
            Constraint::Min(_) => "Min",
            Constraint::Max(_) => "Max",
            Constraint::DecimalMin { .. } => "DecimalMin",
            Constraint::DecimalMax { .. } => "DecimalMax",
            Constraint::Positive => "Positive",
            Constraint::Negative => "Negative",
            Constraint::Size { .. } => "Size",
            Constraint::Digits { .. } => "Digits",
            Constraint::Pattern(_) => "Pattern",
            Constraint::Email => "Email",
            Constraint::Url => "URL",
            Constraint::Past => "Past",
            Constraint::Future => "Future",
        }
    }

    /// Attributes available as `{name}` placeholders in messages
    pub fn attributes(&self) -> Attributes {
        let inclusive = |yes: bool| if yes { " or equal to".to_string() } else { String::new() };
        match self {
            Constraint::Min(v) | Constraint::Max(v) => vec![("value", v.to_string())],
            Constraint::DecimalMin { value, inclusive: i }
            | Constraint::DecimalMax { value, inclusive: i } => {
                vec![("value", value.to_string()), ("inclusive", inclusive(*i))]
            }
            Constraint::Size { min, max } => vec![("min", min.to_string()), ("max", max.to_string())],
            Constraint::Digits { integer, fraction } => vec![
                ("integer", integer.to_string()),
                ("fraction", fraction.to_string()),
            ],
            Constraint::Pattern(regex) => vec![("regexp", display_pattern(regex))],
            _ => Vec::new(),
        }
    }

    /// Check the constraint definition itself
    pub fn check_definition(&self) -> std::result::Result<(), String> {
        match self {
            Constraint::Size { min, max } if min > max => Err(format!(
                "Size constraint has min {} greater than max {}",
                min, max
            )),
            _ => Ok(()),
        }
    }

    /// Check a value against the constraint
    pub fn is_valid(&self, value: &Value) -> bool {
        match self {
            Constraint::NotNull => !value.is_null(),
            Constraint::Null => value.is_null(),
            Constraint::NotEmpty => size_of(value).is_some_and(|size| size > 0),
            Constraint::NotBlank => value.as_str().is_some_and(|s| !s.trim().is_empty()),
            _ if value.is_null() => true,
            Constraint::AssertTrue => matches!(value, Value::Bool(true)),
            Constraint::AssertFalse => matches!(value, Value::Bool(false)),
            Constraint::Min(min) => numeric(value).is_some_and(|n| n >= Decimal::from(*min)),
            Constraint::Max(max) => numeric(value).is_some_and(|n| n <= Decimal::from(*max)),
            Constraint::DecimalMin { value: bound, inclusive } => numeric(value)
                .is_some_and(|n| if *inclusive { n >= *bound } else { n > *bound }),
            Constraint::DecimalMax { value: bound, inclusive } => numeric(value)
                .is_some_and(|n| if *inclusive { n <= *bound } else { n < *bound }),
            Constraint::Positive => numeric(value).is_some_and(|n| n > Decimal::ZERO),
            Constraint::Negative => numeric(value).is_some_and(|n| n < Decimal::ZERO),
            Constraint::Size { min, max } => {
                size_of(value).is_some_and(|size| size >= *min && size <= *max)
            }
            Constraint::Digits { integer, fraction } => numeric(value).is_some_and(|n| {
                let n = n.normalize();
                let scale = n.scale();
                let integer_digits = n.trunc().abs().to_string().trim_start_matches('0').len();
                integer_digits <= *integer as usize && scale <= *fraction
            }),
            Constraint::Pattern(regex) => value.as_str().is_some_and(|s| regex.is_match(s)),
            Constraint::Email => value.as_str().is_some_and(|s| EMAIL.is_match(s)),
            Constraint::Url => value
                .as_str()
                .is_some_and(|s| url::Url::parse(s).is_ok_and(|u| u.has_host())),
            Constraint::Past => date(value).is_some_and(|d| d < today()),
            Constraint::Future => date(value).is_some_and(|d| d > today()),
        }
    }
}

/// Pattern text without the anchors added by [`Constraint::pattern`]
fn display_pattern(regex: &Regex) -> String {
    let source = regex.as_str();
    source
        .strip_prefix("^(?:")
        .and_then(|s| s.strip_suffix(")$"))
        .unwrap_or(source)
        .to_string()
}

fn numeric(value: &Value) -> Option<Decimal> {
    value
        .as_decimal()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

fn size_of(value: &Value) -> Option<usize> {
    match value {
        Value::Text(s) => Some(s.chars().count()),
        Value::List(items) | Value::Array(items) => Some(items.len()),
        Value::Map(map) => Some(map.len()),
        _ => None,
    }
}

fn date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Date(d) => Some(*d),
        Value::Text(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok(),
        _ => None,
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// A constraint spanning several properties of one bean
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassConstraint {
    /// Two properties must hold equal values
    FieldsMatch {
        /// First property
        first: String,
        /// Second property, the one the violation is reported on
        second: String,
    },
    /// One property must not be greater than another
    Ordered {
        /// Property expected to be smaller, the one the violation is reported on
        lesser: String,
        /// Property expected to be greater
        greater: String,
    },
}

impl ClassConstraint {
    /// Get the constraint name used for message lookup
    pub fn name(&self) -> &'static str {
        match self {
            ClassConstraint::FieldsMatch { .. } => "FieldsMatch",
            ClassConstraint::Ordered { .. } => "Ordered",
        }
    }

    /// Properties the constraint reads
    pub fn referenced_properties(&self) -> [&str; 2] {
        match self {
            ClassConstraint::FieldsMatch { first, second } => [first.as_str(), second.as_str()],
            ClassConstraint::Ordered { lesser, greater } => [lesser.as_str(), greater.as_str()],
        }
    }

    /// Property a violation is reported on
    pub fn reported_property(&self) -> &str {
        match self {
            ClassConstraint::FieldsMatch { second, .. } => second,
            ClassConstraint::Ordered { lesser, .. } => lesser,
        }
    }

    /// Attributes available as `{name}` placeholders in messages
    pub fn attributes(&self) -> Attributes {
        match self {
            ClassConstraint::FieldsMatch { first, second } => {
                vec![("first", first.clone()), ("second", second.clone())]
            }
            ClassConstraint::Ordered { lesser, greater } => {
                vec![("lesser", lesser.clone()), ("greater", greater.clone())]
            }
        }
    }

    /// Check a bean against the constraint
    pub fn is_valid(&self, bean: &Bean) -> bool {
        let get = |name: &str| bean.get(name).unwrap_or_default();
        match self {
            ClassConstraint::FieldsMatch { first, second } => get(first.as_str()) == get(second.as_str()),
            ClassConstraint::Ordered { lesser, greater } => {
                let (low, high) = (get(lesser.as_str()), get(greater.as_str()));
                if low.is_null() || high.is_null() {
                    return true;
                }
                if let (Some(a), Some(b)) = (numeric(&low), numeric(&high)) {
                    return a <= b;
                }
                if let (Some(a), Some(b)) = (date(&low), date(&high)) {
                    return a <= b;
                }
                false
            }
        }
    }
}

/// A declared constraint with its groups and optional message override
#[derive(Debug, Clone)]
pub struct ConstraintDescriptor<C> {
    /// The constraint
    pub constraint: C,
    /// Groups the constraint belongs to (empty means the default group)
    pub groups: Vec<GroupMarker>,
    /// Message template replacing the default one
    pub message: Option<String>,
}

impl<C> ConstraintDescriptor<C> {
    /// Declare a constraint in the default group
    pub fn new(constraint: C) -> Self {
        Self {
            constraint,
            groups: Vec::new(),
            message: None,
        }
    }

    /// Set the groups of the constraint
    pub fn in_groups(mut self, groups: impl IntoIterator<Item = GroupMarker>) -> Self {
        self.groups = groups.into_iter().collect();
        self
    }

    /// Set the message template
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Check if the constraint is selected by any of the requested groups
    pub fn applies_to(&self, groups: &ValidationGroupSet) -> bool {
        if self.groups.is_empty() {
            return groups.markers().iter().any(GroupMarker::is_default);
        }
        self.groups.iter().any(|g| groups.contains(g))
    }

    /// Message template for the constraint
    pub fn template(&self, name: &str) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| format!("{{javax.validation.constraints.{}.message}}", name))
    }
}

impl From<Constraint> for ConstraintDescriptor<Constraint> {
    fn from(constraint: Constraint) -> Self {
        Self::new(constraint)
    }
}

impl From<ClassConstraint> for ConstraintDescriptor<ClassConstraint> {
    fn from(constraint: ClassConstraint) -> Self {
        Self::new(constraint)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let attributes = self.attributes();
        if attributes.is_empty() {
            return write!(f, "@{}", self.name());
        }
        let parts: Vec<_> = attributes
            .iter()
            .filter(|(k, _)| *k != "inclusive")
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        write!(f, "@{}({})", self.name(), parts.join(", "))
    }
}
