//! The push-style sink that receives connector objects from a sync.

use async_trait::async_trait;

use crate::{ConnectorObject, Timestamp};

/// Receives connector objects one at a time.
///
/// Returning `false` requests early termination: the sync that is feeding this
/// handler delivers nothing further in the current call. This is the only
/// cancellation signal a sync observes.
#[async_trait]
pub trait ObjectHandler: Send {
    /// Consumes one object. `last_updated` is the start time of the sync run
    /// and is identical for every object of that run.
    async fn handle(&mut self, object: ConnectorObject, last_updated: Timestamp) -> bool;
}

