//! Validation groups
//!
//! Groups select which subset of the declared constraints applies to a
//! validation call. A group list is written as a comma-delimited string of
//! group names; the names are resolved through a [`GroupRegistry`] that the
//! application populates at startup.

use std::fmt;
use std::sync::{Arc, RwLock};

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use crate::error::{Error, Result};
use crate::{DEFAULT_GROUP, EMPTY_VALIDATION_GROUPS_PATTERN, VALIDATION_GROUPS_DELIMITER};

static EMPTY_VALIDATION_GROUPS: Lazy<Regex> =
    Lazy::new(|| Regex::new(EMPTY_VALIDATION_GROUPS_PATTERN).unwrap());

/// Check if a group list contains nothing but delimiters and non-word characters
pub fn is_empty_group_list(groups: &str) -> bool {
    EMPTY_VALIDATION_GROUPS.is_match(groups)
}

/// An opaque tag naming a validation group
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct GroupMarker(Arc<str>);

impl GroupMarker {
    /// Create a marker for a group name
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    /// The built-in default group
    pub fn default_group() -> Self {
        Self::new(DEFAULT_GROUP)
    }

    /// Get the group name
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Check if this is the default group
    pub fn is_default(&self) -> bool {
        &*self.0 == DEFAULT_GROUP
    }
}

impl fmt::Debug for GroupMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupMarker({})", self.0)
    }
}

impl fmt::Display for GroupMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Known validation groups, by name
#[derive(Debug, Default)]
pub struct GroupRegistry {
    markers: RwLock<IndexMap<String, GroupMarker>>,
}

impl GroupRegistry {
    /// Create a registry containing only the default group
    pub fn new() -> Self {
        let registry = Self::default();
        registry.register(DEFAULT_GROUP);
        registry
    }

    /// Create a registry with the given group names
    pub fn with_groups<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let registry = Self::new();
        for name in names {
            registry.register(name);
        }
        registry
    }

    /// Register a group name, returning its marker
    ///
    /// Registering an already known name returns the existing marker.
    pub fn register(&self, name: &str) -> GroupMarker {
        let mut markers = self.markers.write().unwrap_or_else(|p| p.into_inner());
        markers
            .entry(name.to_string())
            .or_insert_with(|| GroupMarker::new(name))
            .clone()
    }

    /// Resolve a group name to its marker
    pub fn resolve(&self, name: &str) -> Option<GroupMarker> {
        let markers = self.markers.read().unwrap_or_else(|p| p.into_inner());
        markers.get(name).cloned()
    }

    /// Names of all registered groups, in registration order
    pub fn names(&self) -> Vec<String> {
        let markers = self.markers.read().unwrap_or_else(|p| p.into_inner());
        markers.keys().cloned().collect()
    }
}

/// An ordered set of group markers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationGroupSet {
    markers: Vec<GroupMarker>,
}

impl ValidationGroupSet {
    /// The set holding only the default group
    pub fn default_only() -> Self {
        Self {
            markers: vec![GroupMarker::default_group()],
        }
    }

    /// Create a set from markers, dropping repeats
    pub fn from_markers(markers: impl IntoIterator<Item = GroupMarker>) -> Self {
        let mut unique: Vec<GroupMarker> = Vec::new();
        for marker in markers {
            if !unique.contains(&marker) {
                unique.push(marker);
            }
        }
        if unique.is_empty() {
            return Self::default_only();
        }
        Self { markers: unique }
    }

    /// Get the markers in declaration order
    pub fn markers(&self) -> &[GroupMarker] {
        &self.markers
    }

    /// Check if the set contains a marker
    pub fn contains(&self, marker: &GroupMarker) -> bool {
        self.markers.contains(marker)
    }

    /// Check if the set holds nothing but the default group
    pub fn is_default_only(&self) -> bool {
        self.markers.len() == 1 && self.markers[0].is_default()
    }

    /// Number of markers
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// Always false: a parsed set holds at least the default group
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

/// Parse a comma-delimited group list
///
/// `None`, empty and delimiter-only input yield the default group. Every other
/// name must be registered; an unknown name is a configuration error.
pub fn parse_validation_groups(
    groups: Option<&str>,
    registry: &GroupRegistry,
) -> Result<ValidationGroupSet> {
    let Some(groups) = groups.filter(|g| !is_empty_group_list(g)) else {
        return Ok(ValidationGroupSet::default_only());
    };

    let mut markers = Vec::new();
    for name in groups.split(VALIDATION_GROUPS_DELIMITER) {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        if name == DEFAULT_GROUP {
            markers.push(GroupMarker::default_group());
        } else {
            let marker = registry.resolve(name).ok_or_else(|| {
                Error::Configuration(format!("Validation group not found: {}", name))
            })?;
            markers.push(marker);
        }
    }
    Ok(ValidationGroupSet::from_markers(markers))
}

/// State of a memoized group set, keyed by the source string
#[derive(Debug, Clone)]
enum Cache<T> {
    Empty,
    Valid { source: Option<String>, value: Arc<T> },
}

/// Memoized parse of a group string
///
/// A cached set is reused only while the source string is equal to the one
/// it was parsed from. The cached set is swapped as a whole under the lock,
/// so concurrent readers never see a partially built set.
#[derive(Debug)]
pub struct GroupCache {
    state: RwLock<Cache<ValidationGroupSet>>,
}

impl Default for GroupCache {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            state: RwLock::new(Cache::Empty),
        }
    }

    /// Get the parsed set for `source`, parsing it if the cache is stale
    pub fn get_or_parse(
        &self,
        source: Option<&str>,
        registry: &GroupRegistry,
    ) -> Result<Arc<ValidationGroupSet>> {
        {
            let state = self.state.read().unwrap_or_else(|p| p.into_inner());
            if let Cache::Valid {
                source: ref cached,
                ref value,
            } = *state
            {
                if cached.as_deref() == source {
                    return Ok(Arc::clone(value));
                }
            }
        }

        let value = Arc::new(parse_validation_groups(source, registry)?);
        trace!(source, groups = value.len(), "parsed validation groups");
        let mut state = self.state.write().unwrap_or_else(|p| p.into_inner());
        *state = Cache::Valid {
            source: source.map(str::to_string),
            value: Arc::clone(&value),
        };
        Ok(value)
    }

    /// Get the cached set without parsing
    pub fn cached(&self) -> Option<Arc<ValidationGroupSet>> {
        let state = self.state.read().unwrap_or_else(|p| p.into_inner());
        match *state {
            Cache::Valid { ref value, .. } => Some(Arc::clone(value)),
            Cache::Empty => None,
        }
    }

    /// Drop the cached set
    pub fn invalidate(&self) {
        let mut state = self.state.write().unwrap_or_else(|p| p.into_inner());
        *state = Cache::Empty;
    }
}
