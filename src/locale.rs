//! Locales and message bundles
//!
//! Locales are identified by a language and an optional country, written
//! either `en_US` or `en-US`. Message bundles look a key up along the
//! usual fallback chain: `language_COUNTRY`, then `language`, then the root
//! bundle.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;

use crate::error::{Error, Result};
use crate::MESSAGE_ID;

/// A language with an optional country
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locale {
    language: String,
    country: Option<String>,
}

static PLATFORM_DEFAULT: Lazy<Locale> = Lazy::new(|| {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find_map(|value| Locale::from_posix(&value))
        .unwrap_or_else(Locale::english)
});

impl Locale {
    /// Create a locale from a language and optional country
    pub fn new(language: impl Into<String>, country: Option<&str>) -> Self {
        Self {
            language: language.into().to_ascii_lowercase(),
            country: country.map(|c| c.to_ascii_uppercase()),
        }
    }

    /// Parse a locale tag such as `de`, `en_US` or `pt-BR`
    pub fn parse(tag: &str) -> Result<Self> {
        let tag = tag.trim();
        let mut parts = tag.split(['_', '-']);
        let language = parts.next().unwrap_or_default();
        if language.is_empty() || !language.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(Error::Configuration(format!("Invalid locale: '{}'", tag)));
        }
        let country = parts.next().filter(|c| !c.is_empty());
        if let Some(c) = country {
            if !c.chars().all(|ch| ch.is_ascii_alphanumeric()) {
                return Err(Error::Configuration(format!("Invalid locale: '{}'", tag)));
            }
        }
        Ok(Self::new(language, country))
    }

    /// The English locale without country
    pub fn english() -> Self {
        Self::new("en", None)
    }

    /// The default locale of the running platform
    ///
    /// Derived once from `LC_ALL`, `LC_MESSAGES` or `LANG`, falling back to English.
    pub fn platform_default() -> Locale {
        PLATFORM_DEFAULT.clone()
    }

    fn from_posix(value: &str) -> Option<Self> {
        let name = value.split(['.', '@']).next().unwrap_or_default();
        if name.is_empty() || name == "C" || name == "POSIX" {
            return None;
        }
        Self::parse(name).ok()
    }

    /// Get the language code
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Get the country code
    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    /// Bundle keys to try, most specific first
    fn candidates(&self) -> Vec<String> {
        let mut keys = Vec::with_capacity(3);
        if let Some(ref country) = self.country {
            keys.push(format!("{}_{}", self.language, country));
        }
        keys.push(self.language.clone());
        keys.push(String::new());
        keys
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.country {
            Some(ref country) => write!(f, "{}_{}", self.language, country),
            None => write!(f, "{}", self.language),
        }
    }
}

const ROOT_MESSAGES: &[(&str, &str)] = &[
    (MESSAGE_ID, "{1}: {0}"),
    ("javax.validation.constraints.AssertFalse.message", "must be false"),
    ("javax.validation.constraints.AssertTrue.message", "must be true"),
    ("javax.validation.constraints.DecimalMax.message", "must be less than{inclusive} {value}"),
    ("javax.validation.constraints.DecimalMin.message", "must be greater than{inclusive} {value}"),
    ("javax.validation.constraints.Digits.message", "numeric value out of bounds (<{integer} digits>.<{fraction} digits> expected)"),
    ("javax.validation.constraints.Email.message", "must be a well-formed email address"),
    ("javax.validation.constraints.Future.message", "must be a future date"),
    ("javax.validation.constraints.Max.message", "must be less than or equal to {value}"),
    ("javax.validation.constraints.Min.message", "must be greater than or equal to {value}"),
    ("javax.validation.constraints.Negative.message", "must be less than 0"),
    ("javax.validation.constraints.NotBlank.message", "must not be blank"),
    ("javax.validation.constraints.NotEmpty.message", "must not be empty"),
    ("javax.validation.constraints.NotNull.message", "must not be null"),
    ("javax.validation.constraints.Null.message", "must be null"),
    ("javax.validation.constraints.Past.message", "must be a past date"),
    ("javax.validation.constraints.Pattern.message", "must match \"{regexp}\""),
    ("javax.validation.constraints.Positive.message", "must be greater than 0"),
    ("javax.validation.constraints.Size.message", "size must be between {min} and {max}"),
    ("javax.validation.constraints.URL.message", "must be a valid URL"),
    ("javax.validation.constraints.FieldsMatch.message", "{first} and {second} must match"),
    ("javax.validation.constraints.Ordered.message", "{lesser} must not be greater than {greater}"),
];

const GERMAN_MESSAGES: &[(&str, &str)] = &[
    (MESSAGE_ID, "{1}: {0}"),
    ("javax.validation.constraints.AssertFalse.message", "muss falsch sein"),
    ("javax.validation.constraints.AssertTrue.message", "muss wahr sein"),
    ("javax.validation.constraints.Email.message", "muss eine korrekt formatierte E-Mail-Adresse sein"),
    ("javax.validation.constraints.Future.message", "muss ein Datum in der Zukunft sein"),
    ("javax.validation.constraints.Max.message", "muss kleiner oder gleich {value} sein"),
    ("javax.validation.constraints.Min.message", "muss größer oder gleich {value} sein"),
    ("javax.validation.constraints.NotBlank.message", "darf nicht leer sein"),
    ("javax.validation.constraints.NotEmpty.message", "darf nicht leer sein"),
    ("javax.validation.constraints.NotNull.message", "darf nicht null sein"),
    ("javax.validation.constraints.Past.message", "muss ein Datum in der Vergangenheit sein"),
    ("javax.validation.constraints.Pattern.message", "muss auf Ausdruck \"{regexp}\" passen"),
    ("javax.validation.constraints.Size.message", "Größe muss zwischen {min} und {max} sein"),
];

/// Localized message templates with locale fallback
#[derive(Debug, Clone, Default)]
pub struct MessageBundle {
    /// Locale key (`""` for root) to message key to text
    entries: HashMap<String, HashMap<String, String>>,
}

impl MessageBundle {
    /// Create an empty bundle
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bundle holding the built-in English and German messages
    pub fn builtin() -> Self {
        let mut bundle = Self::new();
        bundle.add_all(None, ROOT_MESSAGES.iter().copied());
        bundle.add_all(Some(&Locale::new("de", None)), GERMAN_MESSAGES.iter().copied());
        bundle
    }

    /// Add or replace a message for a locale (`None` for the root bundle)
    pub fn add(&mut self, locale: Option<&Locale>, key: impl Into<String>, text: impl Into<String>) {
        let locale_key = locale.map(|l| l.to_string()).unwrap_or_default();
        self.entries
            .entry(locale_key)
            .or_default()
            .insert(key.into(), text.into());
    }

    /// Add several messages for a locale
    pub fn add_all<'a>(
        &mut self,
        locale: Option<&Locale>,
        messages: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) {
        for (key, text) in messages {
            self.add(locale, key, text);
        }
    }

    /// Look up a message, falling back towards the root bundle
    pub fn get(&self, key: &str, locale: &Locale) -> Option<&str> {
        locale.candidates().iter().find_map(|candidate| {
            self.entries
                .get(candidate)
                .and_then(|messages| messages.get(key))
                .map(String::as_str)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_locale() {
        let locale = Locale::parse("en_us").unwrap();
        assert_eq!(locale.language(), "en");
        assert_eq!(locale.country(), Some("US"));
        assert_eq!(locale.to_string(), "en_US");

        assert_eq!(Locale::parse("pt-BR").unwrap().to_string(), "pt_BR");
        assert_eq!(Locale::parse("de").unwrap().country(), None);
        assert!(Locale::parse("").is_err());
        assert!(Locale::parse("e1").is_err());
    }

    #[test]
    fn test_posix_locale_names() {
        assert_eq!(Locale::from_posix("de_DE.UTF-8"), Some(Locale::new("de", Some("DE"))));
        assert_eq!(Locale::from_posix("C"), None);
        assert_eq!(Locale::from_posix("POSIX"), None);
    }

    #[test]
    fn test_bundle_fallback() {
        let bundle = MessageBundle::builtin();
        let swiss = Locale::parse("de_CH").unwrap();
        assert_eq!(
            bundle.get("javax.validation.constraints.NotNull.message", &swiss),
            Some("darf nicht null sein")
        );
        // Not translated: falls back to the root bundle
        assert_eq!(
            bundle.get("javax.validation.constraints.Negative.message", &swiss),
            Some("must be less than 0")
        );
        assert_eq!(bundle.get("no.such.key", &swiss), None);
    }

    #[test]
    fn test_country_specific_override() {
        let mut bundle = MessageBundle::builtin();
        let us = Locale::parse("en_US").unwrap();
        bundle.add(Some(&us), MESSAGE_ID, "{0} ({1})");
        assert_eq!(bundle.get(MESSAGE_ID, &us), Some("{0} ({1})"));
        assert_eq!(bundle.get(MESSAGE_ID, &Locale::english()), Some("{1}: {0}"));
    }
}
