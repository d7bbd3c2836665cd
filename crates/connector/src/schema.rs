//! Attribute and object-class descriptors exposed to the platform.
//!
//! Descriptors are plain immutable values. Each finding definition assembles
//! its [`ObjectClassInfo`] once from the shared attributes declared here plus
//! any attributes of its own.

use serde::Serialize;

// ---------------------------------------------------------------------------
// Object classes and model names
// ---------------------------------------------------------------------------

/// The type name of a family of connector objects (e.g. `"Code Scanning Alert"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ObjectClass(&'static str);

impl ObjectClass {
    /// Creates an object class from its static type name.
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Returns the type name.
    pub fn as_str(self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

/// The platform data model an object class is mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ModelName(&'static str);

impl ModelName {
    /// Definitions of static-analysis (SAST) findings.
    pub const STATIC_CODE_FINDING_DEFINITION: ModelName = ModelName("StaticCodeFindingDefinition");

    /// Returns the model name.
    pub fn as_str(self) -> &'static str {
        self.0
    }
}

/// Tags the platform understands on object-class metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PredefinedTag {
    /// The object class must be synced for the connector to be usable.
    Required,
}

// ---------------------------------------------------------------------------
// Attributes
// ---------------------------------------------------------------------------

/// Value type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    String,
}

/// Declares one attribute of an object class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct AttributeInfo {
    /// Attribute key used in connector objects (e.g. `"SOURCE_SEVERITY"`).
    pub name: &'static str,
    /// Human-readable title shown by the platform.
    pub title: &'static str,
    /// Type of each value.
    pub value_type: AttributeType,
    /// `true` when the attribute holds a set of values.
    pub multi_valued: bool,
    /// `true` for attributes that are declared in the schema but not currently
    /// populated by any sync.
    pub reserved: bool,
}

impl AttributeInfo {
    /// A single-valued string attribute.
    pub const fn string(name: &'static str, title: &'static str) -> Self {
        Self {
            name,
            title,
            value_type: AttributeType::String,
            multi_valued: false,
            reserved: false,
        }
    }

    /// A multi-valued string attribute.
    pub const fn string_set(name: &'static str, title: &'static str) -> Self {
        Self {
            multi_valued: true,
            ..Self::string(name, title)
        }
    }

    /// Marks the attribute as reserved: declared, currently unpopulated.
    pub const fn reserved(self) -> Self {
        Self {
            reserved: true,
            ..self
        }
    }
}

/// Unique identifier of the object within its class.
pub const UID: AttributeInfo = AttributeInfo::string("UID", "Unique ID");
/// Canonical severity produced by [`crate::normalize_finding_severity`].
pub const SEVERITY: AttributeInfo = AttributeInfo::string("SEVERITY", "Severity");
/// Severity exactly as the source reported it.
pub const SOURCE_SEVERITY: AttributeInfo = AttributeInfo::string("SOURCE_SEVERITY", "Source severity");
pub const DESCRIPTION: AttributeInfo = AttributeInfo::string("DESCRIPTION", "Description");
pub const NAME: AttributeInfo = AttributeInfo::string("NAME", "Name");
pub const CATEGORIES: AttributeInfo = AttributeInfo::string_set("CATEGORIES", "Categories");
pub const TAGS: AttributeInfo = AttributeInfo::string_set("TAGS", "Tags");

// ---------------------------------------------------------------------------
// Object class descriptors
// ---------------------------------------------------------------------------

/// The schema of one object class: its type and the attributes it may carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectClassInfo {
    /// The object class described.
    pub object_type: ObjectClass,
    /// Position of this class in the platform's sync ordering.
    pub order: u32,
    attributes: Vec<AttributeInfo>,
}

impl ObjectClassInfo {
    /// Creates a descriptor. Attributes are kept in declaration order; a
    /// repeated name keeps its first declaration.
    pub fn new(
        object_type: ObjectClass,
        order: u32,
        attributes: impl IntoIterator<Item = AttributeInfo>,
    ) -> Self {
        let mut unique: Vec<AttributeInfo> = Vec::new();
        for info in attributes {
            if !unique.iter().any(|a| a.name == info.name) {
                unique.push(info);
            }
        }
        Self {
            object_type,
            order,
            attributes: unique,
        }
    }

    /// Returns the declared attributes in declaration order.
    pub fn attributes(&self) -> &[AttributeInfo] {
        &self.attributes
    }

    /// Looks up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&AttributeInfo> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// Identifying metadata for an object class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectClassInfoMetaData {
    /// Platform model the class maps onto.
    pub target: ModelName,
    pub tags: Vec<PredefinedTag>,
    /// Names of the attributes that identify an object.
    pub identifiers: Vec<&'static str>,
    /// Display title; not used for matching.
    pub title: &'static str,
}
