//! The capability every finding type exposes to the orchestrator.

use async_trait::async_trait;

use crate::schema::{ObjectClass, ObjectClassInfo, ObjectClassInfoMetaData};
use crate::{ConnectorError, ObjectHandler, OperationOptions, SyncSummary, Timestamp};

/// A finding type the connector can describe and sync.
///
/// Implemented once per finding type. Schema methods are pure and are called
/// at registration time; [`FindingDefinition::sync`] is called by a scheduler
/// for every run.
#[async_trait]
pub trait FindingDefinition: Send + Sync {
    /// The object class produced by this definition.
    fn object_type(&self) -> ObjectClass;

    /// The attributes objects of this class may carry.
    fn schema(&self) -> ObjectClassInfo;

    /// Identifying metadata for the object class.
    fn schema_metadata(&self) -> ObjectClassInfoMetaData;

    /// Pushes every object changed since `since` into `handler`.
    ///
    /// Stops as soon as the handler returns `false`. Source failures abort the
    /// call and are returned unmodified inside [`ConnectorError::Source`].
    async fn sync(
        &self,
        since: Timestamp,
        handler: &mut dyn ObjectHandler,
        options: &OperationOptions,
    ) -> Result<SyncSummary, ConnectorError>;
}
