//! GitHub infrastructure adapter for the code-scanning connector.
//!
//! Implements the [`connector::CodeScanningSource`] port on top of the GitHub
//! REST API using `reqwest`.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain mapping rules.
//! All GitHub API details (rate limiting, pagination, authentication) are handled
//! here; the [`connector`] and `findings` crates never see them.
//!
//! ## Authentication
//!
//! The client is configured with a GitHub App bearer token (a signed App JWT
//! minted by the deployment). That token is used for the `/app/...` endpoints;
//! every other call uses an installation access token exchanged from it and
//! cached per installation until shortly before it expires.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`client`] | [`GithubClient`], configuration, request execution with retries |
//! | [`response`] | Status classification and `Link` header pagination |
//! | `api` | The [`connector::CodeScanningSource`] implementation |
//! | `wire` | REST payload shapes and their conversion into domain types |

mod api;
pub mod client;
pub mod response;
mod wire;

pub use client::{GithubClient, GithubClientConfig};
