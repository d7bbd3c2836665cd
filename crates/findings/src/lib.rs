//! Finding definitions for the code-scanning connector.
//!
//! Each finding type implements [`connector::FindingDefinition`]: it declares
//! the schema of its object class, converts source records into
//! [`connector::ConnectorObject`]s, and drives a sync from the source port into
//! the platform's [`connector::ObjectHandler`].
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** Definitions sequence calls to the
//! [`connector::CodeScanningSource`] port and map what it returns. They contain
//! no transport details; authentication, pagination and retries stay in the
//! infrastructure crate behind the port.

pub mod code_scanning;

pub use code_scanning::{build_connector_object, CodeScanningAlertDefinition};
