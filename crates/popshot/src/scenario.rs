//! Scenario configuration.
//!
//! A scenario bundles everything one verification run needs: where the page
//! comes from, the fake storage state, and the ordered steps. Scenarios are
//! loaded from YAML or built in code (see [`crate::builtin`]).

use crate::checkpoint::validate_checkpoint_name;
use crate::fake_api::{FakeApiOptions, FakePlatformApi, FakeStorageState};
use crate::result::{PopshotError, PopshotResult};
use crate::step::{InteractionStep, NavTarget};
use crate::wait::{SettleOptions, DEFAULT_WAIT_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Root under which scenarios without an explicit `output_dir` write artifacts
pub const DEFAULT_ARTIFACT_ROOT: &str = "target/popshot";

/// Where the page under test comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Target {
    /// Popup document served as a plain page, with the fake standing in for the platform API
    Static {
        /// File path (relative to the scenario file) or absolute URL
        url: String,
    },
    /// Extension loaded unpacked into a persistent browser profile
    LiveExtension {
        /// Unpacked extension directory (contains `manifest.json`)
        extension_dir: PathBuf,
        /// Profile directory; a temporary one is used when omitted
        #[serde(default, skip_serializing_if = "Option::is_none")]
        profile_dir: Option<PathBuf>,
        /// Extension page opened before the steps run
        #[serde(default, skip_serializing_if = "Option::is_none")]
        entry_page: Option<String>,
    },
}

impl Target {
    /// Whether this target loads the real extension
    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(self, Self::LiveExtension { .. })
    }

    /// Navigation performed before the first step, if any
    #[must_use]
    pub fn initial_navigation(&self) -> Option<NavTarget> {
        match self {
            Self::Static { url } if url.contains("://") => Some(NavTarget::Url(url.clone())),
            Self::Static { url } => Some(NavTarget::File(PathBuf::from(url))),
            Self::LiveExtension { entry_page, .. } => entry_page.clone().map(NavTarget::Extension),
        }
    }
}

/// Browser viewport in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width
    pub width: u32,
    /// Height
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 400,
            height: 600,
        }
    }
}

const fn default_timeout_ms() -> u64 {
    DEFAULT_WAIT_TIMEOUT_MS
}

/// One verification run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Scenario name
    pub name: String,
    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Page source
    pub target: Target,
    /// `chrome.storage.local` contents
    #[serde(default)]
    pub fake_data: FakeStorageState,
    /// Optional parts of the fake surface
    #[serde(default)]
    pub fake_api: FakeApiOptions,
    /// Headless browser; defaults to `true` for static and `false` for live targets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headless: Option<bool>,
    /// Artifact directory; defaults to `target/popshot/<name>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    /// Browser viewport
    #[serde(default)]
    pub viewport: Viewport,
    /// Settle barrier behaviour
    #[serde(default)]
    pub settle: SettleOptions,
    /// Timeout for wait steps without their own
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,
    /// Ordered steps
    pub steps: Vec<InteractionStep>,
    /// Directory relative paths are resolved against
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl Scenario {
    /// Empty scenario against `target`
    #[must_use]
    pub fn new(name: impl Into<String>, target: Target) -> Self {
        Self {
            name: name.into(),
            description: None,
            target,
            fake_data: FakeStorageState::default(),
            fake_api: FakeApiOptions::default(),
            headless: None,
            output_dir: None,
            viewport: Viewport::default(),
            settle: SettleOptions::default(),
            default_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            steps: Vec::new(),
            base_dir: None,
        }
    }

    /// Set the fake storage contents
    #[must_use]
    pub fn with_fake_data(mut self, fake_data: FakeStorageState) -> Self {
        self.fake_data = fake_data;
        self
    }

    /// Set the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Append a step
    #[must_use]
    pub fn step(mut self, step: InteractionStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Append several steps
    #[must_use]
    pub fn steps(mut self, steps: impl IntoIterator<Item = InteractionStep>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// Parse a scenario from YAML
    pub fn from_yaml_str(source: &str) -> PopshotResult<Self> {
        Ok(serde_yaml_ng::from_str(source)?)
    }

    /// Load a scenario file; relative paths inside resolve against its directory
    pub fn from_file(path: impl AsRef<Path>) -> PopshotResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let mut scenario = Self::from_yaml_str(&source)?;
        scenario.base_dir = path.parent().map(Path::to_path_buf);
        Ok(scenario)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> PopshotResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Whether the browser should run headless
    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless.unwrap_or(!self.target.is_live())
    }

    /// Directory checkpoints are written to
    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| Path::new(DEFAULT_ARTIFACT_ROOT).join(&self.name))
    }

    /// Directory relative paths are resolved against
    #[must_use]
    pub fn base_dir(&self) -> PathBuf {
        self.base_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Resolve a scenario-relative path
    #[must_use]
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir().join(path)
        }
    }

    /// Fake surface for this scenario
    #[must_use]
    pub fn fake_api(&self) -> FakePlatformApi {
        FakePlatformApi::new(self.fake_data.clone()).with_options(self.fake_api.clone())
    }

    /// Names of all screenshot checkpoints, in order
    #[must_use]
    pub fn checkpoint_names(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter_map(|s| match s {
                InteractionStep::Screenshot { name } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Check the scenario before any browser is started.
    ///
    /// # Errors
    ///
    /// Returns [`PopshotError::Config`] describing the first problem found.
    pub fn validate(&self) -> PopshotResult<()> {
        if self.name.trim().is_empty() {
            return Err(PopshotError::config("scenario name must not be empty"));
        }
        if self.steps.is_empty() {
            return Err(PopshotError::config(format!(
                "scenario '{}' has no steps",
                self.name
            )));
        }
        if self.default_timeout_ms == 0 {
            return Err(PopshotError::config("default_timeout_ms must be positive"));
        }
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(PopshotError::config("viewport dimensions must be positive"));
        }

        match &self.target {
            Target::Static { url } if url.trim().is_empty() => {
                return Err(PopshotError::config("static target url must not be empty"));
            }
            Target::LiveExtension { extension_dir, .. }
                if extension_dir.as_os_str().is_empty() =>
            {
                return Err(PopshotError::config("extension_dir must not be empty"));
            }
            _ => {}
        }

        let mut seen = HashSet::new();
        for (index, step) in self.steps.iter().enumerate() {
            self.validate_step(index, step)?;
            if let InteractionStep::Screenshot { name } = step {
                if !seen.insert(name.as_str()) {
                    tracing::warn!(
                        scenario = %self.name,
                        checkpoint = %name,
                        "checkpoint name used twice; the later capture overwrites the earlier"
                    );
                }
            }
        }
        Ok(())
    }

    fn validate_step(&self, index: usize, step: &InteractionStep) -> PopshotResult<()> {
        let invalid = |message: String| PopshotError::config(format!("step {index} ({step}): {message}"));

        if let Some(locator) = step.locator() {
            if locator.is_empty() {
                return Err(invalid("locator is empty".to_string()));
            }
        }
        match step {
            InteractionStep::Click { locator } if !locator.is_stable() => Err(invalid(format!(
                "click target {locator} is ambiguous; use an id, test id, CSS selector or role with a name"
            ))),
            InteractionStep::Navigate {
                target: NavTarget::Extension(_),
            } if !self.target.is_live() => Err(invalid(
                "extension pages need a live_extension target".to_string(),
            )),
            InteractionStep::WaitForText {
                timeout_ms: Some(0),
                ..
            }
            | InteractionStep::WaitForClass {
                timeout_ms: Some(0),
                ..
            }
            | InteractionStep::WaitForVisible {
                timeout_ms: Some(0),
                ..
            } => Err(invalid("timeout_ms must be positive".to_string())),
            InteractionStep::Screenshot { name } => {
                validate_checkpoint_name(name).map_err(|e| invalid(e.to_string()))
            }
            InteractionStep::ExpectScript { expression, .. } if expression.trim().is_empty() => {
                Err(invalid("expression is empty".to_string()))
            }
            _ => Ok(()),
        }
    }
}
