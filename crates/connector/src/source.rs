//! The GitHub source port and the data it yields.
//!
//! The `github` crate supplies the production implementation. Everything here
//! is transport-agnostic: pagination, authentication and retries stay behind
//! [`CodeScanningSource`].

use std::collections::BTreeSet;
use std::ops::ControlFlow;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    AccountLogin, AlertNumber, InstallationId, OperationOptions, RepositoryId, RuleId,
    SourceError, Timestamp,
};

// ---------------------------------------------------------------------------
// Installations and repositories
// ---------------------------------------------------------------------------

/// The kind of account a GitHub App installation is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountType {
    Organization,
    User,
    /// Any account type GitHub adds in future (e.g. `"Enterprise"`).
    #[serde(other)]
    Other,
}

/// A GitHub App's authorized binding to an organization or user account.
///
/// Fetched fresh for every sync call and discarded afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installation {
    pub id: InstallationId,
    pub account: AccountLogin,
    pub account_type: AccountType,
}

impl Installation {
    /// Returns `true` when the installation belongs to an organization.
    pub fn is_organization_account(&self) -> bool {
        self.account_type == AccountType::Organization
    }
}

/// A repository visible to an installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// `"owner/repo"`.
    pub id: RepositoryId,
    pub archived: bool,
}

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

/// Lifecycle state of a code scanning alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertState {
    Open,
    Dismissed,
    Fixed,
    #[serde(other)]
    Closed,
}

/// The static-analysis rule that triggered an alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    /// Source-specific severity (`"error"`, `"warning"`, `"note"`, ...).
    pub severity: Option<String>,
    /// Security severity level (`"critical"`, `"high"`, ...) for security rules.
    pub security_severity_level: Option<String>,
    pub description: Option<String>,
    pub name: Option<String>,
    pub tags: BTreeSet<String>,
}

/// A security finding produced by GitHub code scanning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeScanningAlert {
    pub number: AlertNumber,
    pub state: AlertState,
    pub updated_at: Option<Timestamp>,
    /// Absent when the analysis did not report a rule; such alerts are skipped.
    pub rule: Option<Rule>,
}

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Consumer side of an alert listing.
///
/// The source drives the sink: it calls [`AlertSink::accept`] once per alert,
/// in listing order, and stops fetching as soon as the sink breaks.
#[async_trait]
pub trait AlertSink: Send {
    async fn accept(&mut self, alert: CodeScanningAlert) -> ControlFlow<()>;
}

/// Read access to GitHub App installations, their repositories, and the
/// repositories' code scanning alerts.
#[async_trait]
pub trait CodeScanningSource: Send + Sync {
    /// Lists every installation of the configured GitHub App.
    async fn list_installations(&self) -> Result<Vec<Installation>, SourceError>;

    /// Lists the repositories the installation has access to.
    async fn list_repositories(
        &self,
        installation: &Installation,
    ) -> Result<Vec<Repository>, SourceError>;

    /// Returns `true` when at least one code scanning analysis exists for the
    /// repository.
    async fn has_code_scanning_analysis(
        &self,
        installation: &Installation,
        repository: &Repository,
    ) -> Result<bool, SourceError>;

    /// Streams alerts updated at or after `since` into `sink`.
    ///
    /// Returns [`ControlFlow::Break`] when the sink stopped the listing and
    /// [`ControlFlow::Continue`] when the listing was exhausted.
    async fn list_code_scanning_alerts(
        &self,
        installation: &Installation,
        repository: &Repository,
        since: Timestamp,
        options: &OperationOptions,
        sink: &mut dyn AlertSink,
    ) -> Result<ControlFlow<()>, SourceError>;
}
