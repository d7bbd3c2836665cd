//! REST payload shapes and their conversion into connector domain types.
//!
//! Only the fields the connector reads are declared; everything else GitHub
//! sends is ignored by serde.

use std::collections::BTreeSet;

use connector::{
    AccountLogin, AccountType, AlertNumber, AlertState, CodeScanningAlert, Installation,
    InstallationId, Repository, RepositoryId, Rule, RuleId, Timestamp,
};
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Installations
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct WireAccount {
    login: String,
    #[serde(rename = "type")]
    account_type: Option<AccountType>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireInstallation {
    id: u64,
    account: Option<WireAccount>,
    target_type: Option<AccountType>,
}

impl WireInstallation {
    /// Returns `None` for installations without an account login (e.g.
    /// enterprise-level installations).
    pub(crate) fn into_installation(self) -> Option<Installation> {
        let account = self.account?;
        let account_type = account
            .account_type
            .or(self.target_type)
            .unwrap_or(AccountType::Other);
        Some(Installation {
            id: InstallationId::new(self.id),
            account: AccountLogin::new(account.login)?,
            account_type,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireAccessToken {
    pub(crate) token: String,
    pub(crate) expires_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Repositories
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct WireRepository {
    full_name: String,
    #[serde(default)]
    archived: bool,
}

impl WireRepository {
    pub(crate) fn into_repository(self) -> Option<Repository> {
        Some(Repository {
            id: RepositoryId::new(self.full_name)?,
            archived: self.archived,
        })
    }
}

/// Envelope of `GET /installation/repositories`.
#[derive(Debug, Deserialize)]
pub(crate) struct WireRepositoryPage {
    pub(crate) repositories: Vec<WireRepository>,
}

// ---------------------------------------------------------------------------
// Code scanning alerts
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct WireRule {
    id: Option<String>,
    severity: Option<String>,
    security_severity_level: Option<String>,
    description: Option<String>,
    name: Option<String>,
    tags: Option<Vec<String>>,
}

impl WireRule {
    /// A rule without an id cannot identify a finding definition.
    fn into_rule(self) -> Option<Rule> {
        Some(Rule {
            id: RuleId::new(self.id?)?,
            severity: self.severity,
            security_severity_level: self.security_severity_level,
            description: self.description,
            name: self.name,
            tags: self.tags.unwrap_or_default().into_iter().collect::<BTreeSet<_>>(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireAlert {
    number: u64,
    state: AlertState,
    updated_at: Option<Timestamp>,
    rule: Option<WireRule>,
}

impl WireAlert {
    pub(crate) fn updated_at(&self) -> Option<Timestamp> {
        self.updated_at
    }

    pub(crate) fn into_alert(self) -> CodeScanningAlert {
        CodeScanningAlert {
            number: AlertNumber::new(self.number),
            state: self.state,
            updated_at: self.updated_at,
            rule: self.rule.and_then(WireRule::into_rule),
        }
    }
}
