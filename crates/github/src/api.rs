//! [`CodeScanningSource`] over the GitHub REST API.

use std::ops::ControlFlow;

use async_trait::async_trait;
use connector::{
    AlertSink, CodeScanningSource, Installation, OperationOptions, Repository, SourceError,
    Timestamp,
};
use tracing::{debug, instrument};

use crate::client::GithubClient;
use crate::wire::{WireAlert, WireInstallation, WireRepositoryPage};

#[async_trait]
impl CodeScanningSource for GithubClient {
    #[instrument(skip_all)]
    async fn list_installations(&self) -> Result<Vec<Installation>, SourceError> {
        let mut next = Some(self.url(&format!(
            "/app/installations?per_page={}",
            self.page_size(None)
        )));
        let mut installations = Vec::new();

        while let Some(url) = next {
            let page = self
                .fetch_page::<Vec<WireInstallation>>(&url, self.app_token())
                .await?;
            installations.extend(page.items.into_iter().filter_map(|wire| {
                let installation = wire.into_installation();
                if installation.is_none() {
                    debug!("Ignoring installation without an account");
                }
                installation
            }));
            next = page.next;
        }

        debug!(count = installations.len(), "Listed installations");
        Ok(installations)
    }

    #[instrument(skip_all, fields(installation = %installation.id))]
    async fn list_repositories(
        &self,
        installation: &Installation,
    ) -> Result<Vec<Repository>, SourceError> {
        let token = self.installation_token(installation).await?;
        let mut next = Some(self.url(&format!(
            "/installation/repositories?per_page={}",
            self.page_size(None)
        )));
        let mut repositories = Vec::new();

        while let Some(url) = next {
            let page = self.fetch_page::<WireRepositoryPage>(&url, &token).await?;
            repositories.extend(
                page.items
                    .repositories
                    .into_iter()
                    .filter_map(|wire| wire.into_repository()),
            );
            next = page.next;
        }

        Ok(repositories)
    }

    #[instrument(skip_all, fields(repository = %repository.id))]
    async fn has_code_scanning_analysis(
        &self,
        installation: &Installation,
        repository: &Repository,
    ) -> Result<bool, SourceError> {
        let token = self.installation_token(installation).await?;
        let url = self.url(&format!(
            "/repos/{}/{}/code-scanning/analyses?per_page=1",
            repository.id.owner(),
            repository.id.name()
        ));

        match self.fetch_page::<Vec<serde_json::Value>>(&url, &token).await {
            Ok(page) => Ok(!page.items.is_empty()),
            // 404: no analysis uploaded yet. 403: code scanning or Advanced
            // Security is not enabled for the repository.
            Err(SourceError::Http { status, message }) if status == 404 || status == 403 => {
                debug!(status, body = %message, "No code scanning analysis available");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    #[instrument(skip_all, fields(repository = %repository.id, since = %since))]
    async fn list_code_scanning_alerts(
        &self,
        installation: &Installation,
        repository: &Repository,
        since: Timestamp,
        options: &OperationOptions,
        sink: &mut dyn AlertSink,
    ) -> Result<ControlFlow<()>, SourceError> {
        let token = self.installation_token(installation).await?;
        // Sorted newest first, so the first alert older than `since` ends the
        // listing.
        let mut next = Some(self.url(&format!(
            "/repos/{}/{}/code-scanning/alerts?sort=updated&direction=desc&per_page={}",
            repository.id.owner(),
            repository.id.name(),
            self.page_size(options.page_size)
        )));

        while let Some(url) = next {
            let page = self.fetch_page::<Vec<WireAlert>>(&url, &token).await?;
            for wire in page.items {
                if wire.updated_at().is_some_and(|at| at < since) {
                    return Ok(ControlFlow::Continue(()));
                }
                if sink.accept(wire.into_alert()).await.is_break() {
                    return Ok(ControlFlow::Break(()));
                }
            }
            next = page.next;
        }

        Ok(ControlFlow::Continue(()))
    }
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
