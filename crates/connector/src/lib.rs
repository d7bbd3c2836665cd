//! Core connector domain for the code-scanning connector.
//!
//! This crate contains every domain concept, newtype identifier, shared value
//! type, schema descriptor, and cross-cutting error type used by the finding
//! definitions. Infrastructure crates implement the traits defined here; they
//! never add mapping rules.
//!
//! ## Architectural Layer
//!
//! **Domain model + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; infrastructure crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`InstallationId`, `RuleId`, `Uid`, etc.) |
//! | [`types`] | Shared value types (`Timestamp`, `OperationOptions`, `SyncSummary`) |
//! | [`severity`] | Canonical [`Severity`] and the source severity normalizer |
//! | [`schema`] | Attribute and object-class descriptors exposed to the platform |
//! | [`object`] | [`ConnectorObject`], the schema-conformant output record |
//! | [`source`] | GitHub source port ([`CodeScanningSource`], [`AlertSink`]) and its data model |
//! | [`handler`] | The push-style [`ObjectHandler`] sink |
//! | [`finding`] | The [`FindingDefinition`] capability implemented per finding type |
//! | [`errors`] | Top-level error and retry-policy types |

pub mod errors;
pub mod finding;
pub mod handler;
pub mod identifiers;
pub mod object;
pub mod schema;
pub mod severity;
pub mod source;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use errors::{ConnectorError, RetryPolicy, SourceError};
pub use finding::FindingDefinition;
pub use handler::ObjectHandler;
pub use identifiers::{AccountLogin, AlertNumber, InstallationId, RepositoryId, RuleId, Uid};
pub use object::{AttributeValue, ConnectorObject};
pub use schema::{
    AttributeInfo, AttributeType, ModelName, ObjectClass, ObjectClassInfo, ObjectClassInfoMetaData,
    PredefinedTag,
};
pub use severity::{normalize_finding_severity, Severity};
pub use source::{
    AccountType, AlertSink, AlertState, CodeScanningAlert, CodeScanningSource, Installation,
    Repository, Rule,
};
pub use types::{OperationOptions, SyncSummary, Timestamp};
