use std::collections::{BTreeSet, HashMap, HashSet};
use std::ops::ControlFlow;
use std::sync::Mutex;

use async_trait::async_trait;
use connector::{
    AccountLogin, AccountType, AlertNumber, AlertSink, AlertState, AttributeValue,
    CodeScanningAlert, CodeScanningSource, ConnectorError, ConnectorObject, FindingDefinition,
    Installation, InstallationId, ObjectHandler, OperationOptions, Repository, RepositoryId, Rule,
    RuleId, Severity, SourceError, Timestamp, normalize_finding_severity,
};

use super::*;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn installation(id: u64, login: &str, account_type: AccountType) -> Installation {
    Installation {
        id: InstallationId::new(id),
        account: AccountLogin::new(login).unwrap(),
        account_type,
    }
}

fn repository(full_name: &str) -> Repository {
    Repository {
        id: RepositoryId::new(full_name).unwrap(),
        archived: false,
    }
}

fn rule(id: &str) -> Rule {
    Rule {
        id: RuleId::new(id).unwrap(),
        severity: Some("error".into()),
        security_severity_level: Some("high".into()),
        description: Some(format!("Description of {id}")),
        name: Some(format!("Name of {id}")),
        tags: BTreeSet::from(["security".to_string(), "external/cwe/cwe-079".to_string()]),
    }
}

fn alert(number: u64, rule: Option<Rule>) -> CodeScanningAlert {
    CodeScanningAlert {
        number: AlertNumber::new(number),
        state: AlertState::Open,
        updated_at: Some("2024-05-01T12:00:00Z".parse().unwrap()),
        rule,
    }
}

/// In-memory source that records which calls it served.
#[derive(Default)]
struct FakeSource {
    installations: Vec<Installation>,
    repositories: HashMap<InstallationId, Vec<Repository>>,
    enabled: HashSet<RepositoryId>,
    alerts: HashMap<RepositoryId, Vec<CodeScanningAlert>>,
    calls: Mutex<Vec<String>>,
    fail_repositories: bool,
    /// Repository whose alert listing fails after delivering its alerts.
    fail_alerts_after_delivery: Option<RepositoryId>,
}

impl FakeSource {
    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CodeScanningSource for FakeSource {
    async fn list_installations(&self) -> Result<Vec<Installation>, SourceError> {
        self.record("installations".into());
        Ok(self.installations.clone())
    }

    async fn list_repositories(
        &self,
        installation: &Installation,
    ) -> Result<Vec<Repository>, SourceError> {
        self.record(format!("repositories:{}", installation.id));
        if self.fail_repositories {
            return Err(SourceError::RateLimited { retry_after: None });
        }
        Ok(self
            .repositories
            .get(&installation.id)
            .cloned()
            .unwrap_or_default())
    }

    async fn has_code_scanning_analysis(
        &self,
        _installation: &Installation,
        repository: &Repository,
    ) -> Result<bool, SourceError> {
        self.record(format!("analysis:{}", repository.id));
        Ok(self.enabled.contains(&repository.id))
    }

    async fn list_code_scanning_alerts(
        &self,
        _installation: &Installation,
        repository: &Repository,
        since: Timestamp,
        _options: &OperationOptions,
        sink: &mut dyn AlertSink,
    ) -> Result<ControlFlow<()>, SourceError> {
        self.record(format!("alerts:{}", repository.id));
        let alerts = self.alerts.get(&repository.id).cloned().unwrap_or_default();
        for alert in alerts {
            if alert.updated_at.is_some_and(|at| at < since) {
                continue;
            }
            if sink.accept(alert).await.is_break() {
                return Ok(ControlFlow::Break(()));
            }
        }
        if self.fail_alerts_after_delivery.as_ref() == Some(&repository.id) {
            return Err(SourceError::Http {
                status: 502,
                message: "Bad Gateway".into(),
            });
        }
        Ok(ControlFlow::Continue(()))
    }
}

/// Handler that collects objects and optionally stops after the n-th one.
#[derive(Default)]
struct RecordingHandler {
    received: Vec<(ConnectorObject, Timestamp)>,
    stop_after: Option<usize>,
}

#[async_trait]
impl ObjectHandler for RecordingHandler {
    async fn handle(&mut self, object: ConnectorObject, last_updated: Timestamp) -> bool {
        self.received.push((object, last_updated));
        self.stop_after.map_or(true, |n| self.received.len() < n)
    }
}

impl RecordingHandler {
    fn uids(&self) -> Vec<String> {
        self.received
            .iter()
            .map(|(o, _)| o.uid().as_str().to_owned())
            .collect()
    }
}

fn single_org_source(alerts: Vec<CodeScanningAlert>) -> FakeSource {
    let org = installation(1, "octo-org", AccountType::Organization);
    let repo = repository("octo-org/app");
    FakeSource {
        installations: vec![org.clone()],
        repositories: HashMap::from([(org.id, vec![repo.clone()])]),
        enabled: HashSet::from([repo.id.clone()]),
        alerts: HashMap::from([(repo.id, alerts)]),
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Object builder
// ---------------------------------------------------------------------------

#[test]
fn test_build_sets_uid_and_name_to_rule_id() {
    let org = installation(1, "octo-org", AccountType::Organization);
    let repo = repository("octo-org/app");
    let object = build_connector_object(&org, &repo, &alert(1, Some(rule("js/xss")))).unwrap();

    assert_eq!(object.object_class(), OBJECT_CLASS);
    assert_eq!(object.uid().as_str(), "js/xss");
    assert_eq!(object.name(), "js/xss");
    assert_eq!(object.attribute("UID").and_then(AttributeValue::as_str), Some("js/xss"));
}

#[test]
fn test_build_without_rule_produces_nothing() {
    let org = installation(1, "octo-org", AccountType::Organization);
    let repo = repository("octo-org/app");
    assert!(build_connector_object(&org, &repo, &alert(1, None)).is_none());
}

#[test]
fn test_build_copies_raw_and_normalized_severity() {
    let org = installation(1, "octo-org", AccountType::Organization);
    let repo = repository("octo-org/app");
    let object = build_connector_object(&org, &repo, &alert(1, Some(rule("js/xss")))).unwrap();

    assert_eq!(
        object.attribute("SOURCE_SEVERITY").and_then(AttributeValue::as_str),
        Some("error")
    );
    assert_eq!(
        object.attribute("SEVERITY").and_then(AttributeValue::as_str),
        Some(normalize_finding_severity("error").as_str())
    );
    assert_eq!(normalize_finding_severity("error"), Severity::High);
}

#[test]
fn test_build_omits_absent_optional_fields() {
    let org = installation(1, "octo-org", AccountType::Organization);
    let repo = repository("octo-org/app");
    let mut bare = rule("js/xss");
    bare.severity = None;
    bare.description = None;
    bare.name = None;
    bare.tags.clear();

    let object = build_connector_object(&org, &repo, &alert(1, Some(bare))).unwrap();

    assert!(!object.has_attribute("SEVERITY"));
    assert!(!object.has_attribute("SOURCE_SEVERITY"));
    assert!(!object.has_attribute("DESCRIPTION"));
    assert!(!object.has_attribute("NAME"));
    // The uid still doubles as the object name even without a rule name.
    assert_eq!(object.name(), "js/xss");
    assert_eq!(
        object.attribute("TAGS").and_then(AttributeValue::as_set),
        Some(&BTreeSet::new())
    );
}

#[test]
fn test_build_copies_tags_description_and_name() {
    let org = installation(1, "octo-org", AccountType::Organization);
    let repo = repository("octo-org/app");
    let object = build_connector_object(&org, &repo, &alert(1, Some(rule("js/xss")))).unwrap();

    assert_eq!(
        object.attribute("DESCRIPTION").and_then(AttributeValue::as_str),
        Some("Description of js/xss")
    );
    assert_eq!(
        object.attribute("NAME").and_then(AttributeValue::as_str),
        Some("Name of js/xss")
    );
    let tags = object.attribute("TAGS").and_then(AttributeValue::as_set).unwrap();
    assert!(tags.contains("security"));
    assert_eq!(tags.len(), 2);
}

#[test]
fn test_build_never_populates_reserved_attributes() {
    let org = installation(1, "octo-org", AccountType::Organization);
    let repo = repository("octo-org/app");
    let object = build_connector_object(&org, &repo, &alert(1, Some(rule("js/xss")))).unwrap();

    assert!(!object.has_attribute(RULE_SECURITY_SEVERITY.name));
    assert!(!object.has_attribute(SEVERITY_SCORE.name));
    assert!(!object.has_attribute("CATEGORIES"));
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

#[test]
fn test_schema_declares_exactly_the_expected_attributes() {
    let definition = CodeScanningAlertDefinition::new(FakeSource::default());
    let schema = definition.schema();
    let names: Vec<&str> = schema.attributes().iter().map(|a| a.name).collect();

    assert_eq!(schema.object_type.as_str(), "Code Scanning Alert");
    assert_eq!(schema.order, 2);
    assert_eq!(
        names,
        [
            "UID",
            "SEVERITY",
            "SOURCE_SEVERITY",
            "SEVERITY_SCORE",
            "DESCRIPTION",
            "NAME",
            "RULE_SECURITY_SEVERITY",
            "CATEGORIES",
            "TAGS"
        ]
    );
    assert!(schema.attribute("SEVERITY_SCORE").unwrap().reserved);
    assert!(schema.attribute("RULE_SECURITY_SEVERITY").unwrap().reserved);
}

#[test]
fn test_schema_metadata_identifies_by_uid() {
    let definition = CodeScanningAlertDefinition::new(FakeSource::default());
    let meta = definition.schema_metadata();

    assert_eq!(meta.target, ModelName::STATIC_CODE_FINDING_DEFINITION);
    assert_eq!(meta.tags, vec![PredefinedTag::Required]);
    assert_eq!(meta.identifiers, vec!["UID"]);
    assert_eq!(meta.title, "Code Scanning Alert");
    assert_eq!(definition.object_type(), OBJECT_CLASS);
}

// ---------------------------------------------------------------------------
// Sync driver
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_sync_delivers_alerts_in_listing_order_with_one_timestamp() {
    let source = single_org_source(vec![
        alert(1, Some(rule("r1"))),
        alert(2, Some(rule("r2"))),
        alert(3, Some(rule("r3"))),
    ]);
    let definition = CodeScanningAlertDefinition::new(source);
    let mut handler = RecordingHandler::default();

    let summary = definition
        .sync(Timestamp::UNIX_EPOCH, &mut handler, &OperationOptions::default())
        .await
        .unwrap();

    assert_eq!(handler.uids(), ["r1", "r2", "r3"]);
    let first = handler.received[0].1;
    assert!(handler.received.iter().all(|(_, ts)| *ts == first));
    assert_eq!(summary.objects, 3);
    assert!(!summary.stopped);
}

#[tokio::test]
async fn test_sync_skips_alerts_without_rule() {
    let source = single_org_source(vec![
        alert(1, Some(rule("r1"))),
        alert(2, None),
        alert(3, Some(rule("r3"))),
    ]);
    let definition = CodeScanningAlertDefinition::new(source);
    let mut handler = RecordingHandler::default();

    let summary = definition
        .sync(Timestamp::UNIX_EPOCH, &mut handler, &OperationOptions::default())
        .await
        .unwrap();

    assert_eq!(handler.uids(), ["r1", "r3"]);
    assert_eq!(summary.alerts, 3);
    assert_eq!(summary.skipped, 1);
}

#[tokio::test]
async fn test_sync_only_reads_repositories_with_code_scanning_enabled() {
    let org = installation(1, "octo-org", AccountType::Organization);
    let enabled = repository("octo-org/enabled");
    let disabled = repository("octo-org/disabled");
    let source = FakeSource {
        installations: vec![org.clone()],
        repositories: HashMap::from([(org.id, vec![disabled.clone(), enabled.clone()])]),
        enabled: HashSet::from([enabled.id.clone()]),
        alerts: HashMap::from([
            (enabled.id.clone(), vec![alert(1, Some(rule("from-enabled")))]),
            (disabled.id.clone(), vec![alert(1, Some(rule("from-disabled")))]),
        ]),
        ..Default::default()
    };
    let definition = CodeScanningAlertDefinition::new(source);
    let mut handler = RecordingHandler::default();

    let summary = definition
        .sync(Timestamp::UNIX_EPOCH, &mut handler, &OperationOptions::default())
        .await
        .unwrap();

    assert_eq!(handler.uids(), ["from-enabled"]);
    assert_eq!(summary.repositories, 1);
    assert!(!definition
        .source
        .calls()
        .contains(&"alerts:octo-org/disabled".to_string()));
}

#[tokio::test]
async fn test_sync_ignores_non_organization_installations() {
    let user = installation(7, "octocat", AccountType::User);
    let repo = repository("octocat/dotfiles");
    let source = FakeSource {
        installations: vec![user.clone()],
        repositories: HashMap::from([(user.id, vec![repo.clone()])]),
        enabled: HashSet::from([repo.id.clone()]),
        alerts: HashMap::from([(repo.id, vec![alert(1, Some(rule("r1")))])]),
        ..Default::default()
    };
    let definition = CodeScanningAlertDefinition::new(source);
    let mut handler = RecordingHandler::default();

    let summary = definition
        .sync(Timestamp::UNIX_EPOCH, &mut handler, &OperationOptions::default())
        .await
        .unwrap();

    assert!(handler.received.is_empty());
    assert_eq!(summary.installations, 0);
    assert_eq!(definition.source.calls(), ["installations"]);
}

#[tokio::test]
async fn test_sync_stops_everything_when_handler_returns_false() {
    let org = installation(1, "octo-org", AccountType::Organization);
    let second_org = installation(2, "other-org", AccountType::Organization);
    let first = repository("octo-org/first");
    let second = repository("octo-org/second");
    let third = repository("other-org/third");
    let source = FakeSource {
        installations: vec![org.clone(), second_org.clone()],
        repositories: HashMap::from([
            (org.id, vec![first.clone(), second.clone()]),
            (second_org.id, vec![third.clone()]),
        ]),
        enabled: HashSet::from([first.id.clone(), second.id.clone(), third.id.clone()]),
        alerts: HashMap::from([
            (first.id.clone(), (1..=5).map(|n| alert(n, Some(rule(&format!("a{n}"))))).collect()),
            (second.id.clone(), vec![alert(1, Some(rule("b1")))]),
            (third.id.clone(), vec![alert(1, Some(rule("c1")))]),
        ]),
        ..Default::default()
    };
    let definition = CodeScanningAlertDefinition::new(source);
    let mut handler = RecordingHandler {
        stop_after: Some(2),
        ..Default::default()
    };

    let summary = definition
        .sync(Timestamp::UNIX_EPOCH, &mut handler, &OperationOptions::default())
        .await
        .unwrap();

    assert_eq!(handler.uids(), ["a1", "a2"]);
    assert!(summary.stopped);
    let calls = definition.source.calls();
    assert!(!calls.contains(&"alerts:octo-org/second".to_string()));
    assert!(!calls.contains(&"repositories:2".to_string()));
}

#[tokio::test]
async fn test_sync_passes_since_watermark_to_the_source() {
    let mut stale = alert(1, Some(rule("stale")));
    stale.updated_at = Some("2023-01-01T00:00:00Z".parse().unwrap());
    let source = single_org_source(vec![stale, alert(2, Some(rule("fresh")))]);
    let definition = CodeScanningAlertDefinition::new(source);
    let mut handler = RecordingHandler::default();

    definition
        .sync(
            "2024-01-01T00:00:00Z".parse().unwrap(),
            &mut handler,
            &OperationOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(handler.uids(), ["fresh"]);
}

#[tokio::test]
async fn test_sync_propagates_source_errors() {
    let mut source = single_org_source(vec![alert(1, Some(rule("r1")))]);
    source.fail_repositories = true;
    let definition = CodeScanningAlertDefinition::new(source);
    let mut handler = RecordingHandler::default();

    let err = definition
        .sync(Timestamp::UNIX_EPOCH, &mut handler, &OperationOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ConnectorError::Source(SourceError::RateLimited { .. })
    ));
    assert!(handler.received.is_empty());
}

#[tokio::test]
async fn test_sync_aborts_when_alert_listing_fails_mid_run() {
    let org = installation(1, "octo-org", AccountType::Organization);
    let second_org = installation(2, "other-org", AccountType::Organization);
    let first = repository("octo-org/first");
    let second = repository("octo-org/second");
    let third = repository("other-org/third");
    let source = FakeSource {
        installations: vec![org.clone(), second_org.clone()],
        repositories: HashMap::from([
            (org.id, vec![first.clone(), second.clone()]),
            (second_org.id, vec![third.clone()]),
        ]),
        enabled: HashSet::from([first.id.clone(), second.id.clone(), third.id.clone()]),
        alerts: HashMap::from([
            (first.id.clone(), vec![alert(1, Some(rule("a1"))), alert(2, Some(rule("a2")))]),
            (second.id.clone(), vec![alert(1, Some(rule("b1")))]),
            (third.id.clone(), vec![alert(1, Some(rule("c1")))]),
        ]),
        fail_alerts_after_delivery: Some(first.id.clone()),
        ..Default::default()
    };
    let definition = CodeScanningAlertDefinition::new(source);
    let mut handler = RecordingHandler::default();

    let err = definition
        .sync(Timestamp::UNIX_EPOCH, &mut handler, &OperationOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ConnectorError::Source(SourceError::Http { status: 502, .. })
    ));
    assert_eq!(handler.uids(), ["a1", "a2"]);
    let calls = definition.source.calls();
    assert!(!calls.contains(&"alerts:octo-org/second".to_string()));
    assert!(!calls.contains(&"repositories:2".to_string()));
}

/// Source that keeps listing after the sink asks it to stop.
struct IgnoresBreakSource {
    inner: FakeSource,
}

#[async_trait]
impl CodeScanningSource for IgnoresBreakSource {
    async fn list_installations(&self) -> Result<Vec<Installation>, SourceError> {
        self.inner.list_installations().await
    }

    async fn list_repositories(
        &self,
        installation: &Installation,
    ) -> Result<Vec<Repository>, SourceError> {
        self.inner.list_repositories(installation).await
    }

    async fn has_code_scanning_analysis(
        &self,
        installation: &Installation,
        repository: &Repository,
    ) -> Result<bool, SourceError> {
        self.inner
            .has_code_scanning_analysis(installation, repository)
            .await
    }

    async fn list_code_scanning_alerts(
        &self,
        _installation: &Installation,
        repository: &Repository,
        _since: Timestamp,
        _options: &OperationOptions,
        sink: &mut dyn AlertSink,
    ) -> Result<ControlFlow<()>, SourceError> {
        self.inner.record(format!("alerts:{}", repository.id));
        let alerts = self.inner.alerts.get(&repository.id).cloned().unwrap_or_default();
        for alert in alerts {
            let _ = sink.accept(alert).await;
        }
        Ok(ControlFlow::Continue(()))
    }
}

#[tokio::test]
async fn test_sync_stops_after_handler_false_even_if_source_continues() {
    let org = installation(1, "octo-org", AccountType::Organization);
    let first = repository("octo-org/first");
    let second = repository("octo-org/second");
    let inner = FakeSource {
        installations: vec![org.clone()],
        repositories: HashMap::from([(org.id, vec![first.clone(), second.clone()])]),
        enabled: HashSet::from([first.id.clone(), second.id.clone()]),
        alerts: HashMap::from([
            (first.id.clone(), vec![alert(1, Some(rule("a1")))]),
            (second.id.clone(), vec![alert(1, Some(rule("b1")))]),
        ]),
        ..Default::default()
    };
    let definition = CodeScanningAlertDefinition::new(IgnoresBreakSource { inner });
    let mut handler = RecordingHandler {
        stop_after: Some(1),
        ..Default::default()
    };

    let summary = definition
        .sync(Timestamp::UNIX_EPOCH, &mut handler, &OperationOptions::default())
        .await
        .unwrap();

    assert!(summary.stopped);
    assert_eq!(handler.uids(), ["a1"]);
    assert!(!definition
        .source
        .inner
        .calls()
        .contains(&"alerts:octo-org/second".to_string()));
}

#[tokio::test]
async fn test_repeated_syncs_produce_identical_objects() {
    let definition = CodeScanningAlertDefinition::new(single_org_source(vec![
        alert(1, Some(rule("r1"))),
        alert(2, Some(rule("r2"))),
    ]));
    let mut first = RecordingHandler::default();
    let mut second = RecordingHandler::default();
    let options = OperationOptions::default();

    definition.sync(Timestamp::UNIX_EPOCH, &mut first, &options).await.unwrap();
    definition.sync(Timestamp::UNIX_EPOCH, &mut second, &options).await.unwrap();

    let objects = |h: &RecordingHandler| h.received.iter().map(|(o, _)| o.clone()).collect::<Vec<_>>();
    assert_eq!(objects(&first), objects(&second));
}
