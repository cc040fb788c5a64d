//! Browser launching.
//!
//! Launch configuration, profile handling and the manifest pre-flight are
//! always available. The chromium backend itself (`BrowserSession`,
//! `CdpPage`) needs the `browser` feature.

use crate::result::{PopshotError, PopshotResult};
use crate::scenario::{Scenario, Target, Viewport};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Manifest fields checked before launching
#[derive(Debug, Clone, Deserialize)]
pub struct ExtensionManifest {
    /// Manifest format version
    pub manifest_version: u32,
    /// Extension name
    #[serde(default)]
    pub name: Option<String>,
    /// Extension version
    #[serde(default)]
    pub version: Option<String>,
    /// Background declaration
    #[serde(default)]
    pub background: Option<serde_json::Value>,
}

impl ExtensionManifest {
    /// Whether the manifest declares a background service worker
    #[must_use]
    pub fn has_service_worker(&self) -> bool {
        self.background
            .as_ref()
            .and_then(|b| b.get("service_worker"))
            .is_some_and(serde_json::Value::is_string)
    }
}

/// Check that `extension_dir` holds a loadable unpacked extension.
///
/// # Errors
///
/// Returns [`PopshotError::Launch`] if the directory or its `manifest.json`
/// is missing, unparseable, or lacks `manifest_version`.
pub fn check_manifest(extension_dir: &Path) -> PopshotResult<ExtensionManifest> {
    if !extension_dir.is_dir() {
        return Err(PopshotError::launch(format!(
            "extension directory {} does not exist",
            extension_dir.display()
        )));
    }
    let path = extension_dir.join("manifest.json");
    let source = std::fs::read_to_string(&path)
        .map_err(|e| PopshotError::launch(format!("cannot read {}: {e}", path.display())))?;
    let manifest: ExtensionManifest = serde_json::from_str(&source)
        .map_err(|e| PopshotError::launch(format!("invalid {}: {e}", path.display())))?;

    if !manifest.has_service_worker() {
        tracing::warn!(
            manifest = %path.display(),
            "manifest declares no background service worker; identity resolution will time out"
        );
    }
    Ok(manifest)
}

/// Arguments that both enable and load an unpacked extension
#[must_use]
pub fn extension_args(extension_dir: &Path) -> Vec<String> {
    let dir = extension_dir.display();
    vec![
        format!("--disable-extensions-except={dir}"),
        format!("--load-extension={dir}"),
    ]
}

/// Profile directory owned by one run
#[derive(Debug)]
pub enum ProfileDir {
    /// Temporary directory removed on release
    Temporary(TempDir),
    /// Caller-supplied directory, left in place
    Persistent(PathBuf),
}

impl ProfileDir {
    /// Use `dir` if given (creating it), otherwise a fresh temporary directory.
    ///
    /// # Errors
    ///
    /// Returns [`PopshotError::Launch`] if the directory cannot be created.
    pub fn prepare(dir: Option<&Path>) -> PopshotResult<Self> {
        match dir {
            Some(dir) => {
                std::fs::create_dir_all(dir).map_err(|e| {
                    PopshotError::launch(format!(
                        "cannot create profile directory {}: {e}",
                        dir.display()
                    ))
                })?;
                Ok(Self::Persistent(dir.to_path_buf()))
            }
            None => tempfile::Builder::new()
                .prefix("popshot-profile-")
                .tempdir()
                .map(Self::Temporary)
                .map_err(|e| PopshotError::launch(format!("cannot create temporary profile: {e}"))),
        }
    }

    /// Directory path
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Temporary(dir) => dir.path(),
            Self::Persistent(path) => path,
        }
    }

    /// Remove a temporary profile; persistent ones are kept
    pub fn release(self) {
        if let Self::Temporary(dir) = self {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                tracing::warn!(profile = %path.display(), error = %e, "failed to remove temporary profile");
            }
        }
    }
}

/// Unpacked extension to load at launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionLaunch {
    /// Unpacked extension directory
    pub extension_dir: PathBuf,
    /// Profile directory; temporary when `None`
    pub profile_dir: Option<PathBuf>,
}

/// Browser launch settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    /// Run without a window
    pub headless: bool,
    /// Viewport size
    pub viewport: Viewport,
    /// Chromium binary; auto-detected when `None`
    pub chromium_path: Option<PathBuf>,
    /// Use the chromium sandbox
    pub sandbox: bool,
    /// Extension to load, in live mode
    pub extension: Option<ExtensionLaunch>,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport: Viewport::default(),
            chromium_path: None,
            sandbox: true,
            extension: None,
        }
    }
}

impl LaunchConfig {
    /// Settings derived from a scenario
    #[must_use]
    pub fn for_scenario(scenario: &Scenario) -> Self {
        let extension = match &scenario.target {
            Target::LiveExtension {
                extension_dir,
                profile_dir,
                ..
            } => Some(ExtensionLaunch {
                extension_dir: scenario.resolve_path(extension_dir),
                profile_dir: profile_dir.as_deref().map(|p| scenario.resolve_path(p)),
            }),
            Target::Static { .. } => None,
        };
        Self {
            headless: scenario.headless(),
            viewport: scenario.viewport,
            extension,
            ..Self::default()
        }
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set the chromium binary
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

#[cfg(feature = "browser")]
mod cdp {
    use super::*;
    use crate::driver::{center_expression, probe_expression, ElementProbe, PageDriver};
    use crate::identity::WorkerSource;
    use crate::locator::Locator;
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::cdp::browser_protocol::input::{
        DispatchMouseEventParams, DispatchMouseEventType, MouseButton,
    };
    use chromiumoxide::cdp::browser_protocol::page::{
        AddScriptToEvaluateOnNewDocumentParams, CaptureScreenshotFormat, CaptureScreenshotParams,
    };
    use chromiumoxide::handler::viewport::Viewport as CdpViewport;
    use chromiumoxide::page::Page;
    use futures::StreamExt;
    use tokio::sync::Mutex;
    use tokio::task::JoinHandle;

    const SERVICE_WORKER_TARGET: &str = "service_worker";
    const ERROR_PAGE_PREFIX: &str = "chrome-error://";

    /// A launched browser and the resources it owns.
    ///
    /// Call [`BrowserSession::close`] on every path; dropping the session only
    /// stops the event handler.
    #[derive(Debug)]
    pub struct BrowserSession {
        config: LaunchConfig,
        inner: Mutex<CdpBrowser>,
        handler: Option<JoinHandle<()>>,
        profile: Option<ProfileDir>,
    }

    impl BrowserSession {
        /// Launch chromium, loading the extension when one is configured
        ///
        /// # Errors
        ///
        /// Returns [`PopshotError::Launch`] if the manifest check, profile
        /// creation or the browser process fails.
        pub async fn launch(config: LaunchConfig) -> PopshotResult<Self> {
            let mut builder = CdpConfig::builder()
                .window_size(config.viewport.width, config.viewport.height)
                .viewport(Some(CdpViewport {
                    width: config.viewport.width,
                    height: config.viewport.height,
                    ..CdpViewport::default()
                }));

            if !config.headless {
                builder = builder.with_head();
            }
            if !config.sandbox {
                builder = builder.no_sandbox();
            }
            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }

            let mut profile = None;
            if let Some(ref extension) = config.extension {
                let manifest = check_manifest(&extension.extension_dir)?;
                let extension_dir = std::fs::canonicalize(&extension.extension_dir)
                    .map_err(|e| PopshotError::launch(e.to_string()))?;
                let dir = ProfileDir::prepare(extension.profile_dir.as_deref())?;
                tracing::info!(
                    extension = %extension_dir.display(),
                    name = manifest.name.as_deref().unwrap_or("<unnamed>"),
                    profile = %dir.path().display(),
                    "loading unpacked extension"
                );
                builder = builder
                    .user_data_dir(dir.path())
                    .extension(extension_dir.display().to_string())
                    .args(extension_args(&extension_dir));
                if config.headless {
                    builder = builder.new_headless_mode();
                }
                profile = Some(dir);
            }

            let cdp_config = match builder.build() {
                Ok(cdp_config) => cdp_config,
                Err(e) => {
                    if let Some(dir) = profile {
                        dir.release();
                    }
                    return Err(PopshotError::launch(e));
                }
            };

            let (browser, mut handler) = match CdpBrowser::launch(cdp_config).await {
                Ok(launched) => launched,
                Err(e) => {
                    if let Some(dir) = profile {
                        dir.release();
                    }
                    return Err(PopshotError::launch(e.to_string()));
                }
            };

            let handle = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            tracing::info!(headless = config.headless, live = config.extension.is_some(), "browser launched");
            Ok(Self {
                config,
                inner: Mutex::new(browser),
                handler: Some(handle),
                profile,
            })
        }

        /// Launch settings in effect
        #[must_use]
        pub const fn config(&self) -> &LaunchConfig {
            &self.config
        }

        /// Open a blank page
        ///
        /// # Errors
        ///
        /// Returns [`PopshotError::Page`] if the target cannot be created.
        pub async fn new_page(&self) -> PopshotResult<CdpPage> {
            let browser = self.inner.lock().await;
            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| PopshotError::page(e.to_string()))?;
            Ok(CdpPage { inner: page })
        }

        /// Close the browser and release the profile directory.
        ///
        /// # Errors
        ///
        /// Returns [`PopshotError::Launch`] if chromium does not shut down
        /// cleanly; the profile is released regardless.
        pub async fn close(mut self) -> PopshotResult<()> {
            let closed = {
                let mut browser = self.inner.lock().await;
                match browser.close().await {
                    Ok(_) => browser.wait().await.map(|_| ()).map_err(|e| e.to_string()),
                    Err(e) => Err(e.to_string()),
                }
            };
            if let Some(handle) = self.handler.take() {
                handle.abort();
            }
            if let Some(profile) = self.profile.take() {
                profile.release();
            }
            tracing::debug!("browser closed");
            closed.map_err(PopshotError::launch)
        }
    }

    impl Drop for BrowserSession {
        fn drop(&mut self) {
            if let Some(handle) = self.handler.take() {
                handle.abort();
            }
        }
    }

    #[async_trait]
    impl WorkerSource for BrowserSession {
        async fn service_worker_urls(&self) -> PopshotResult<Vec<String>> {
            let mut browser = self.inner.lock().await;
            let targets = browser
                .fetch_targets()
                .await
                .map_err(|e| PopshotError::identity(e.to_string()))?;
            Ok(targets
                .into_iter()
                .filter(|t| t.r#type == SERVICE_WORKER_TARGET)
                .map(|t| t.url)
                .collect())
        }
    }

    /// A chromium page driven over CDP
    #[derive(Debug, Clone)]
    pub struct CdpPage {
        inner: Page,
    }

    impl CdpPage {
        async fn evaluate<T: serde::de::DeserializeOwned>(&self, expression: &str) -> PopshotResult<T> {
            self.inner
                .evaluate(expression)
                .await
                .map_err(|e| PopshotError::page(e.to_string()))?
                .into_value()
                .map_err(|e| PopshotError::page(format!("unexpected evaluation result: {e}")))
        }

        async fn mouse(&self, kind: DispatchMouseEventType, x: f64, y: f64) -> PopshotResult<()> {
            let params = DispatchMouseEventParams::builder()
                .r#type(kind)
                .x(x)
                .y(y)
                .button(MouseButton::Left)
                .click_count(1)
                .build()
                .map_err(PopshotError::page)?;
            self.inner
                .execute(params)
                .await
                .map_err(|e| PopshotError::page(e.to_string()))?;
            Ok(())
        }
    }

    #[async_trait]
    impl PageDriver for CdpPage {
        async fn add_init_script(&self, source: &str) -> PopshotResult<()> {
            self.inner
                .execute(AddScriptToEvaluateOnNewDocumentParams::new(source))
                .await
                .map_err(|e| PopshotError::page(e.to_string()))?;
            Ok(())
        }

        async fn navigate(&self, url: &str) -> PopshotResult<()> {
            self.inner
                .goto(url)
                .await
                .map_err(|e| PopshotError::navigation(url, e.to_string()))?;
            let landed = self.current_url().await?;
            if landed.starts_with(ERROR_PAGE_PREFIX) {
                return Err(PopshotError::navigation(url, "browser showed an error page"));
            }
            Ok(())
        }

        async fn current_url(&self) -> PopshotResult<String> {
            Ok(self
                .inner
                .url()
                .await
                .map_err(|e| PopshotError::page(e.to_string()))?
                .unwrap_or_default())
        }

        async fn probe(&self, locator: &Locator) -> PopshotResult<ElementProbe> {
            self.evaluate(&probe_expression(locator)).await
        }

        async fn click(&self, locator: &Locator) -> PopshotResult<()> {
            let center: Option<[f64; 2]> = self.evaluate(&center_expression(locator)).await?;
            let [x, y] = center
                .ok_or_else(|| PopshotError::page(format!("{locator} has no clickable box")))?;
            self.mouse(DispatchMouseEventType::MousePressed, x, y).await?;
            self.mouse(DispatchMouseEventType::MouseReleased, x, y).await
        }

        async fn evaluate_bool(&self, expression: &str) -> PopshotResult<bool> {
            self.evaluate(expression).await
        }

        async fn screenshot(&self) -> PopshotResult<Vec<u8>> {
            use base64::Engine;

            let params = CaptureScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .build();
            let screenshot = self
                .inner
                .execute(params)
                .await
                .map_err(|e| PopshotError::screenshot(e.to_string()))?;
            base64::engine::general_purpose::STANDARD
                .decode(&screenshot.data)
                .map_err(|e| PopshotError::screenshot(e.to_string()))
        }
    }
}

#[cfg(feature = "browser")]
pub use cdp::{BrowserSession, CdpPage};
