//! The "Code Scanning Alert" finding definition.
//!
//! Walks organization installations → repositories with code scanning enabled
//! → alerts updated since the watermark, converting each alert's rule into a
//! connector object. A single [`AlertSink`] carries every alert from the source
//! to the handler, so the stop-on-`false` rule lives in one place.

use std::ops::ControlFlow;

use async_trait::async_trait;
use connector::schema::{
    AttributeInfo, CATEGORIES, DESCRIPTION, NAME, SEVERITY, SOURCE_SEVERITY, TAGS, UID,
};
use connector::{
    normalize_finding_severity, AlertSink, CodeScanningAlert, CodeScanningSource, ConnectorError,
    ConnectorObject, FindingDefinition, Installation, ModelName, ObjectClass, ObjectClassInfo,
    ObjectClassInfoMetaData, ObjectHandler, OperationOptions, PredefinedTag, Repository,
    SourceError, SyncSummary, Timestamp, Uid,
};
use tracing::{debug, info, instrument, trace};

/// Type name of the object class.
pub const OBJECT_TYPE: &str = "Code Scanning Alert";

pub const OBJECT_CLASS: ObjectClass = ObjectClass::new(OBJECT_TYPE);

/// Security severity level of the rule. Reserved: not populated.
pub const RULE_SECURITY_SEVERITY: AttributeInfo =
    AttributeInfo::string("RULE_SECURITY_SEVERITY", "Rule security severity").reserved();

/// Numeric severity score. Reserved: not populated.
pub const SEVERITY_SCORE: AttributeInfo =
    AttributeInfo::string("SEVERITY_SCORE", "Severity score").reserved();

/// Position of this class in the platform's sync ordering.
const SCHEMA_ORDER: u32 = 2;

// ---------------------------------------------------------------------------
// Schema provider
// ---------------------------------------------------------------------------

/// The attributes a "Code Scanning Alert" object may carry.
pub fn schema() -> ObjectClassInfo {
    ObjectClassInfo::new(
        OBJECT_CLASS,
        SCHEMA_ORDER,
        [
            UID,
            SEVERITY,
            SOURCE_SEVERITY,
            SEVERITY_SCORE,
            DESCRIPTION,
            NAME,
            RULE_SECURITY_SEVERITY,
            CATEGORIES,
            TAGS,
        ],
    )
}

/// Identifying metadata: mapped onto static code finding definitions and
/// identified by `UID`.
pub fn schema_metadata() -> ObjectClassInfoMetaData {
    ObjectClassInfoMetaData {
        target: ModelName::STATIC_CODE_FINDING_DEFINITION,
        tags: vec![PredefinedTag::Required],
        identifiers: vec![UID.name],
        title: OBJECT_TYPE,
    }
}

// ---------------------------------------------------------------------------
// Object builder
// ---------------------------------------------------------------------------

/// Converts one alert into a connector object.
///
/// Returns `None` when the alert carries no rule. Every optional rule field
/// independently decides whether its attribute is set; `TAGS` is always set.
pub fn build_connector_object(
    installation: &Installation,
    repository: &Repository,
    alert: &CodeScanningAlert,
) -> Option<ConnectorObject> {
    let Some(rule) = alert.rule.as_ref() else {
        trace!(
            installation = %installation.id,
            repository = %repository.id,
            alert = %alert.number,
            "Alert has no rule; no object emitted"
        );
        return None;
    };

    let mut object = ConnectorObject::new(OBJECT_CLASS, Uid::from(&rule.id));
    object.set_attribute(&UID, rule.id.as_str());

    if let Some(severity) = rule.severity.as_deref() {
        object.set_attribute(&SEVERITY, normalize_finding_severity(severity).as_str());
        object.set_attribute(&SOURCE_SEVERITY, severity);
    }
    if let Some(description) = rule.description.as_deref() {
        object.set_attribute(&DESCRIPTION, description);
    }
    if let Some(name) = rule.name.as_deref() {
        object.set_attribute(&NAME, name);
    }
    object.set_attribute(&TAGS, rule.tags.clone());

    Some(object)
}

// ---------------------------------------------------------------------------
// Sink: builder + handler
// ---------------------------------------------------------------------------

struct HandlerSink<'a> {
    installation: &'a Installation,
    repository: &'a Repository,
    handler: &'a mut dyn ObjectHandler,
    last_updated: Timestamp,
    summary: &'a mut SyncSummary,
}

#[async_trait]
impl AlertSink for HandlerSink<'_> {
    async fn accept(&mut self, alert: CodeScanningAlert) -> ControlFlow<()> {
        self.summary.alerts += 1;
        let Some(object) = build_connector_object(self.installation, self.repository, &alert)
        else {
            self.summary.skipped += 1;
            return ControlFlow::Continue(());
        };

        self.summary.objects += 1;
        if self.handler.handle(object, self.last_updated).await {
            ControlFlow::Continue(())
        } else {
            self.summary.stopped = true;
            ControlFlow::Break(())
        }
    }
}

// ---------------------------------------------------------------------------
// Definition
// ---------------------------------------------------------------------------

/// Finding definition for GitHub code scanning alerts.
pub struct CodeScanningAlertDefinition<S> {
    source: S,
}

impl<S: CodeScanningSource> CodeScanningAlertDefinition<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Syncs every code-scanning-enabled repository of one organization
    /// installation.
    async fn sync_installation(
        &self,
        installation: &Installation,
        since: Timestamp,
        handler: &mut dyn ObjectHandler,
        options: &OperationOptions,
        last_updated: Timestamp,
        summary: &mut SyncSummary,
    ) -> Result<ControlFlow<()>, SourceError> {
        let repositories = self.source.list_repositories(installation).await?;
        debug!(
            installation = %installation.id,
            account = %installation.account,
            repositories = repositories.len(),
            "Listed installation repositories"
        );

        for repository in &repositories {
            if !self
                .source
                .has_code_scanning_analysis(installation, repository)
                .await?
            {
                debug!(repository = %repository.id, "Code scanning not enabled; skipping");
                continue;
            }

            summary.repositories += 1;
            debug!(
                repository = %repository.id,
                archived = repository.archived,
                "Listing code scanning alerts"
            );
            let mut sink = HandlerSink {
                installation,
                repository,
                handler: &mut *handler,
                last_updated,
                summary: &mut *summary,
            };
            let flow = self
                .source
                .list_code_scanning_alerts(installation, repository, since, options, &mut sink)
                .await?;
            if flow.is_break() || summary.stopped {
                return Ok(ControlFlow::Break(()));
            }
        }

        Ok(ControlFlow::Continue(()))
    }
}

#[async_trait]
impl<S: CodeScanningSource> FindingDefinition for CodeScanningAlertDefinition<S> {
    fn object_type(&self) -> ObjectClass {
        OBJECT_CLASS
    }

    fn schema(&self) -> ObjectClassInfo {
        schema()
    }

    fn schema_metadata(&self) -> ObjectClassInfoMetaData {
        schema_metadata()
    }

    #[instrument(skip_all, fields(object_type = OBJECT_TYPE, since = %since))]
    async fn sync(
        &self,
        since: Timestamp,
        handler: &mut dyn ObjectHandler,
        options: &OperationOptions,
    ) -> Result<SyncSummary, ConnectorError> {
        let last_updated = Timestamp::now();
        let mut summary = SyncSummary::default();

        let installations = self.source.list_installations().await?;
        for installation in &installations {
            if !installation.is_organization_account() {
                debug!(
                    installation = %installation.id,
                    account = %installation.account,
                    "Not an organization installation; skipping"
                );
                continue;
            }

            summary.installations += 1;
            let flow = self
                .sync_installation(installation, since, handler, options, last_updated, &mut summary)
                .await?;
            if flow.is_break() {
                debug!(installation = %installation.id, "Handler requested stop");
                break;
            }
        }

        info!(
            installations = summary.installations,
            repositories = summary.repositories,
            alerts = summary.alerts,
            objects = summary.objects,
            skipped = summary.skipped,
            stopped = summary.stopped,
            "Code scanning alert sync finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
#[path = "code_scanning_tests.rs"]
mod tests;
