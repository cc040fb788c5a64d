//! Extension identity resolution.
//!
//! An unpacked extension gets its identifier from the browser at load time,
//! so it is read back from the background service worker's address
//! (`<scheme>://<identifier>/<path>`) instead of being configured.

use crate::result::{PopshotError, PopshotResult};
use crate::wait::WaitOptions;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::time::Instant;

/// Scheme extension pages and workers are served from
pub const EXTENSION_SCHEME: &str = "chrome-extension";

/// Default budget for the background worker to register (30 seconds)
pub const DEFAULT_WORKER_TIMEOUT_MS: u64 = 30_000;

const WORKER_URL_PATTERN: &str = r"^([A-Za-z][A-Za-z0-9+.\-]*)://([^/?#]+)/(.*)$";

/// Runtime identifier of a loaded extension.
///
/// Valid only for the browser context it was resolved from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExtensionId {
    scheme: String,
    id: String,
}

impl ExtensionId {
    /// The identifier token
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.id
    }

    /// Scheme the identifier was served under
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Origin of the extension, e.g. `chrome-extension://abc`
    #[must_use]
    pub fn origin(&self) -> String {
        format!("{}://{}", self.scheme, self.id)
    }

    /// URL of a page inside the extension
    #[must_use]
    pub fn page_url(&self, relative: &str) -> String {
        format!("{}/{}", self.origin(), relative.trim_start_matches('/'))
    }
}

impl fmt::Display for ExtensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Extract the identifier from a worker address.
pub fn parse_worker_url(url: &str, expected_scheme: &str) -> PopshotResult<ExtensionId> {
    let pattern = regex::Regex::new(WORKER_URL_PATTERN)
        .map_err(|e| PopshotError::identity(format!("invalid worker URL pattern: {e}")))?;
    let captures = pattern.captures(url).ok_or_else(|| {
        PopshotError::identity(format!(
            "worker address '{url}' does not match <scheme>://<identifier>/<path>"
        ))
    })?;

    let scheme = &captures[1];
    if !scheme.eq_ignore_ascii_case(expected_scheme) {
        return Err(PopshotError::identity(format!(
            "worker address '{url}' uses scheme '{scheme}', expected '{expected_scheme}'"
        )));
    }

    Ok(ExtensionId {
        scheme: expected_scheme.to_string(),
        id: captures[2].to_string(),
    })
}

/// Anything that can enumerate the service workers of a browser context.
#[async_trait]
pub trait WorkerSource: Send + Sync {
    /// Addresses of the currently registered service workers, oldest first
    async fn service_worker_urls(&self) -> PopshotResult<Vec<String>>;
}

/// Resolves the runtime identifier of the extension loaded into a context
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    wait: WaitOptions,
    scheme: String,
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self {
            wait: WaitOptions::new().with_timeout(DEFAULT_WORKER_TIMEOUT_MS),
            scheme: EXTENSION_SCHEME.to_string(),
        }
    }
}

impl IdentityResolver {
    /// Create a resolver with default timeout and scheme
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how long to wait for a worker to register
    #[must_use]
    pub const fn with_wait(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }

    /// Expect worker addresses under another scheme
    #[must_use]
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Use the first registered worker, waiting for one if none is registered yet.
    pub async fn resolve<S>(&self, source: &S) -> PopshotResult<ExtensionId>
    where
        S: WorkerSource + ?Sized,
    {
        let start = Instant::now();
        let url = loop {
            if let Some(first) = source.service_worker_urls().await?.into_iter().next() {
                break first;
            }
            if start.elapsed() >= self.wait.timeout() {
                return Err(PopshotError::identity(format!(
                    "no service worker registered within {}ms",
                    self.wait.timeout_ms
                )));
            }
            tokio::time::sleep(self.wait.poll_interval()).await;
        };

        let id = parse_worker_url(&url, &self.scheme)?;
        tracing::info!(extension_id = %id, worker = %url, "resolved extension identity");
        Ok(id)
    }
}
