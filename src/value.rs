//! Dynamic object graph
//!
//! Application data reachable from expressions is modelled as [`Value`]s.
//! Beans are shared by reference and compared by identity, so two
//! expressions that reach the same bean instance see the same object.

use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::NaiveDate;
use indexmap::IndexMap;
use rust_decimal::Decimal;

use crate::error::{Error, Result};

/// Shared handle to a bean instance
pub type BeanRef = Arc<Bean>;

/// A value in the application object graph
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absent value
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Integral number
    Integer(i64),
    /// Decimal number
    Decimal(Decimal),
    /// Text
    Text(String),
    /// Calendar date
    Date(NaiveDate),
    /// Growable list
    List(Vec<Value>),
    /// Fixed-size array
    Array(Vec<Value>),
    /// String-keyed map
    Map(IndexMap<String, Value>),
    /// Bean instance
    Bean(BeanRef),
}

impl Value {
    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if the value is a bulk collection (map, list or array)
    pub fn is_bulk(&self) -> bool {
        matches!(self, Value::List(_) | Value::Array(_) | Value::Map(_))
    }

    /// Get the bean if this value is one
    pub fn as_bean(&self) -> Option<&BeanRef> {
        if let Value::Bean(bean) = self {
            Some(bean)
        } else {
            None
        }
    }

    /// Get the text if this value is text
    pub fn as_str(&self) -> Option<&str> {
        if let Value::Text(s) = self {
            Some(s)
        } else {
            None
        }
    }

    /// Get the value as a decimal if it is numeric
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Integer(i) => Some(Decimal::from(*i)),
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// Name of the runtime type, used as the class of a bean base
    pub fn type_name(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "Boolean",
            Value::Integer(_) => "Integer",
            Value::Decimal(_) => "Decimal",
            Value::Text(_) => "String",
            Value::Date(_) => "Date",
            Value::List(_) => "List",
            Value::Array(_) => "Array",
            Value::Map(_) => "Map",
            Value::Bean(bean) => bean.class(),
        }
    }

    /// Convert from a JSON value
    ///
    /// Integral numbers become [`Value::Integer`], other numbers
    /// [`Value::Decimal`]. Objects become maps, arrays become lists.
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        Ok(match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => {
                    let parsed = n.to_string().parse::<Decimal>().or_else(|_| {
                        Decimal::from_scientific(&n.to_string())
                    });
                    Value::Decimal(parsed.map_err(|e| {
                        Error::Expression(format!("Number {} is not representable: {}", n, e))
                    })?)
                }
            },
            serde_json::Value::String(s) => Value::Text(s.clone()),
            serde_json::Value::Array(items) => Value::List(
                items.iter().map(Value::from_json).collect::<Result<Vec<_>>>()?,
            ),
            serde_json::Value::Object(entries) => {
                let mut map = IndexMap::with_capacity(entries.len());
                for (key, value) in entries {
                    map.insert(key.clone(), Value::from_json(value)?);
                }
                Value::Map(map)
            }
        })
    }

    /// Convert to a JSON value
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Integer(i) => serde_json::Value::from(*i),
            Value::Decimal(d) => serde_json::Value::String(d.to_string()),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Date(d) => serde_json::Value::String(d.to_string()),
            Value::List(items) | Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Bean(bean) => {
                let mut object = serde_json::Map::new();
                for (name, value) in bean.properties().iter() {
                    object.insert(name.clone(), value.to_json());
                }
                serde_json::Value::Object(object)
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::Integer(a), Value::Decimal(b)) | (Value::Decimal(b), Value::Integer(a)) => {
                Decimal::from(*a) == *b
            }
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Bean(a), Value::Bean(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Text(s) => write!(f, "{}", s),
            Value::Date(d) => write!(f, "{}", d),
            Value::List(items) | Value::Array(items) => {
                let parts: Vec<_> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Value::Map(map) => {
                let parts: Vec<_> = map.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
            Value::Bean(bean) => write!(f, "{}@{:x}", bean.class(), bean.identity()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<BeanRef> for Value {
    fn from(bean: BeanRef) -> Self {
        Value::Bean(bean)
    }
}

/// A bean instance: a class name and a set of named properties
pub struct Bean {
    class: String,
    properties: RwLock<IndexMap<String, Value>>,
}

impl Bean {
    /// Create a bean without properties
    pub fn new(class: impl Into<String>) -> BeanRef {
        Self::with_properties(class, IndexMap::new())
    }

    /// Create a bean with the given properties
    pub fn with_properties(class: impl Into<String>, properties: IndexMap<String, Value>) -> BeanRef {
        Arc::new(Self {
            class: class.into(),
            properties: RwLock::new(properties),
        })
    }

    /// Build a bean from `(name, value)` pairs
    pub fn from_pairs<K, V>(class: impl Into<String>, pairs: impl IntoIterator<Item = (K, V)>) -> BeanRef
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self::with_properties(
            class,
            pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        )
    }

    /// Get the class name
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Identity of this instance, stable while any handle is alive
    pub fn identity(&self) -> usize {
        self as *const Bean as usize
    }

    /// Get a property value
    pub fn get(&self, name: &str) -> Option<Value> {
        self.properties().get(name).cloned()
    }

    /// Check if the bean carries a property
    pub fn has_property(&self, name: &str) -> bool {
        self.properties().contains_key(name)
    }

    /// Set a property value, returning the previous one
    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.properties_mut().insert(name.into(), value.into())
    }

    /// Create a new instance of the same class with copied properties
    pub fn copy(&self) -> BeanRef {
        Self::with_properties(self.class.clone(), self.properties().clone())
    }

    /// Property names in declaration order
    pub fn property_names(&self) -> Vec<String> {
        self.properties().keys().cloned().collect()
    }

    fn properties(&self) -> RwLockReadGuard<'_, IndexMap<String, Value>> {
        self.properties.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn properties_mut(&self) -> RwLockWriteGuard<'_, IndexMap<String, Value>> {
        self.properties.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for Bean {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bean")
            .field("class", &self.class)
            .field("properties", &*self.properties())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulk_classification() {
        assert!(Value::List(vec![]).is_bulk());
        assert!(Value::Array(vec![]).is_bulk());
        assert!(Value::Map(IndexMap::new()).is_bulk());
        assert!(!Value::Bean(Bean::new("com.example.Person")).is_bulk());
        assert!(!Value::from("text").is_bulk());
    }

    #[test]
    fn test_bean_identity_equality() {
        let a = Bean::from_pairs("com.example.Person", [("age", 21)]);
        let b = Bean::from_pairs("com.example.Person", [("age", 21)]);
        assert_eq!(Value::Bean(a.clone()), Value::Bean(a.clone()));
        assert_ne!(Value::Bean(a), Value::Bean(b));
    }

    #[test]
    fn test_bean_copy_is_independent() {
        let original = Bean::from_pairs("com.example.Person", [("name", "Ada")]);
        let copy = original.copy();
        copy.set("name", "Grace");
        assert_eq!(original.get("name"), Some(Value::from("Ada")));
        assert_eq!(copy.get("name"), Some(Value::from("Grace")));
        assert_ne!(original.identity(), copy.identity());
    }

    #[test]
    fn test_from_json() {
        let json = serde_json::json!({"age": 15, "ratio": 0.5, "tags": ["a"], "none": null});
        let value = Value::from_json(&json).unwrap();
        let Value::Map(map) = value else {
            panic!("expected map");
        };
        assert_eq!(map["age"], Value::Integer(15));
        assert_eq!(map["ratio"], Value::Decimal(Decimal::new(5, 1)));
        assert_eq!(map["tags"], Value::List(vec![Value::from("a")]));
        assert!(map["none"].is_null());
    }

    #[test]
    fn test_numeric_equality_across_kinds() {
        assert_eq!(Value::Integer(3), Value::Decimal(Decimal::from(3)));
        assert_ne!(Value::Integer(3), Value::from("3"));
    }
}
