//! The connector object: the generic, schema-conformant record handed to the
//! platform.
//!
//! Attributes are sparse. An attribute is present only when the finding
//! definition set it; there are no null or empty placeholders.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::schema::{AttributeInfo, ObjectClass};
use crate::Uid;

/// One attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    String(String),
    StringSet(BTreeSet<String>),
}

impl AttributeValue {
    /// Returns the value when it is single-valued.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            AttributeValue::StringSet(_) => None,
        }
    }

    /// Returns the values when the attribute is multi-valued.
    pub fn as_set(&self) -> Option<&BTreeSet<String>> {
        match self {
            AttributeValue::StringSet(set) => Some(set),
            AttributeValue::String(_) => None,
        }
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_owned())
    }
}

impl From<BTreeSet<String>> for AttributeValue {
    fn from(value: BTreeSet<String>) -> Self {
        AttributeValue::StringSet(value)
    }
}

/// A single record of some [`ObjectClass`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectorObject {
    object_class: ObjectClass,
    uid: Uid,
    name: String,
    attributes: BTreeMap<&'static str, AttributeValue>,
}

impl ConnectorObject {
    /// Creates an object with no attributes. The object's name defaults to its uid.
    pub fn new(object_class: ObjectClass, uid: Uid) -> Self {
        let name = uid.as_str().to_owned();
        Self {
            object_class,
            uid,
            name,
            attributes: BTreeMap::new(),
        }
    }

    pub fn object_class(&self) -> ObjectClass {
        self.object_class
    }

    pub fn uid(&self) -> &Uid {
        &self.uid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets (or replaces) the value of the attribute described by `info`.
    pub fn set_attribute(&mut self, info: &AttributeInfo, value: impl Into<AttributeValue>) {
        let value = value.into();
        debug_assert_eq!(
            info.multi_valued,
            matches!(value, AttributeValue::StringSet(_)),
            "value cardinality does not match the declaration of {}",
            info.name
        );
        self.attributes.insert(info.name, value);
    }

    /// Returns the value of the named attribute, if set.
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Returns `true` when the named attribute is set.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Iterates over the set attributes in name order.
    pub fn attributes(&self) -> impl Iterator<Item = (&'static str, &AttributeValue)> {
        self.attributes.iter().map(|(k, v)| (*k, v))
    }
}
