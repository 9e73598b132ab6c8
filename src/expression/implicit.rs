//! Implicit objects
//!
//! Names that resolve to framework objects before any scoped variable is
//! consulted. They are read-only views built on demand.

/// Framework objects available to every expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImplicitObject {
    /// Attributes of the application scope, as a map
    ApplicationScope,
    /// Attributes of the current request, as a map
    RequestScope,
    /// The view root of the current request
    View,
}

/// Implicit object names, sorted for binary search
const IMPLICIT_OBJECTS: &[(&str, ImplicitObject)] = &[
    ("applicationScope", ImplicitObject::ApplicationScope),
    ("requestScope", ImplicitObject::RequestScope),
    ("view", ImplicitObject::View),
];

impl ImplicitObject {
    /// Look an implicit object up by name
    pub fn from_name(name: &str) -> Option<Self> {
        IMPLICIT_OBJECTS
            .binary_search_by(|(candidate, _)| (*candidate).cmp(name))
            .ok()
            .map(|index| IMPLICIT_OBJECTS[index].1)
    }

    /// Get the name of the implicit object
    pub fn name(&self) -> &'static str {
        match self {
            ImplicitObject::ApplicationScope => "applicationScope",
            ImplicitObject::RequestScope => "requestScope",
            ImplicitObject::View => "view",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(ImplicitObject::from_name("view"), Some(ImplicitObject::View));
        assert_eq!(
            ImplicitObject::from_name("requestScope"),
            Some(ImplicitObject::RequestScope)
        );
        assert_eq!(ImplicitObject::from_name("person"), None);
    }

    #[test]
    fn test_names_round_trip() {
        for (name, object) in IMPLICIT_OBJECTS {
            assert_eq!(object.name(), *name);
        }
    }
}
