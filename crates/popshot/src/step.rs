//! Interaction steps.
//!
//! A scenario is an ordered list of [`InteractionStep`]s. Steps are written in
//! YAML tagged by `action`, mirroring how they read in a test script:
//!
//! ```yaml
//! - action: wait_for_class
//!   locator: { css: .chart-container }
//!   class: hidden
//!   present: true
//! - action: click
//!   locator: { id: showChartBtn }
//! - action: screenshot
//!   name: expanded
//! ```

use crate::locator::Locator;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Where a navigate step goes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavTarget {
    /// Absolute URL (`http://`, `file://`, ...)
    Url(String),
    /// Local file, resolved to an absolute `file://` URL
    File(PathBuf),
    /// Page inside the loaded extension, relative to its origin
    Extension(String),
}

impl fmt::Display for NavTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => f.write_str(url),
            Self::File(path) => write!(f, "file {}", path.display()),
            Self::Extension(path) => write!(f, "extension page {path}"),
        }
    }
}

/// Structural assertion evaluated once, without waiting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    /// Text equals exactly (surrounding whitespace ignored)
    TextEquals(String),
    /// Text contains the substring
    TextContains(String),
    /// Text equals exactly one of the given strings
    TextOneOf(Vec<String>),
    /// Class is present (`true`) or absent (`false`)
    HasClass {
        /// Class name
        class: String,
        /// Expected presence
        present: bool,
    },
    /// Element is visible (`true`) or hidden/absent (`false`)
    Visible(bool),
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TextEquals(text) => write!(f, "text equals {text:?}"),
            Self::TextContains(text) => write!(f, "text contains {text:?}"),
            Self::TextOneOf(options) => write!(f, "text is one of {options:?}"),
            Self::HasClass {
                class,
                present: true,
            } => write!(f, "class '{class}' present"),
            Self::HasClass {
                class,
                present: false,
            } => write!(f, "class '{class}' absent"),
            Self::Visible(true) => f.write_str("visible"),
            Self::Visible(false) => f.write_str("hidden"),
        }
    }
}

/// One step of an interaction sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum InteractionStep {
    /// Load a page and wait for it
    Navigate {
        /// Destination, written `{ url: ... }`, `{ file: ... }` or `{ extension: ... }`
        #[serde(with = "serde_yaml_ng::with::singleton_map")]
        target: NavTarget,
    },
    /// Poll until the element's text contains `substring`
    WaitForText {
        /// Element to read
        locator: Locator,
        /// Required substring
        substring: String,
        /// Override of the scenario's default timeout
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    /// Poll until the element has (or lacks) a class
    WaitForClass {
        /// Element to inspect
        locator: Locator,
        /// Class name
        class: String,
        /// Expected presence
        present: bool,
        /// Override of the scenario's default timeout
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    /// Poll until the element is (or is not) rendered visibly
    WaitForVisible {
        /// Element to inspect
        locator: Locator,
        /// Expected visibility
        visible: bool,
        /// Override of the scenario's default timeout
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    /// Click an element addressed by a stable locator
    Click {
        /// Element to click
        locator: Locator,
    },
    /// Let transitions finish: fixed delay, then the animation predicate if enabled
    WaitIdle {
        /// Delay; the scenario's settle idle when omitted
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u64>,
    },
    /// Capture a checkpoint screenshot to `<output_dir>/<name>.png`
    Screenshot {
        /// Checkpoint name
        name: String,
    },
    /// Evaluate a structural assertion
    Expect {
        /// Element to inspect
        locator: Locator,
        /// Condition that must hold now, written `{ text_equals: ... }` and so on
        #[serde(with = "serde_yaml_ng::with::singleton_map")]
        condition: Expectation,
        /// Checkpoint this assertion belongs to
        #[serde(default, skip_serializing_if = "Option::is_none")]
        checkpoint: Option<String>,
    },
    /// Evaluate a page expression that must be `true`
    ExpectScript {
        /// Boolean JavaScript expression
        expression: String,
        /// Checkpoint this assertion belongs to
        #[serde(default, skip_serializing_if = "Option::is_none")]
        checkpoint: Option<String>,
    },
}

impl InteractionStep {
    /// Navigate to an absolute URL
    #[must_use]
    pub fn navigate_url(url: impl Into<String>) -> Self {
        Self::Navigate {
            target: NavTarget::Url(url.into()),
        }
    }

    /// Navigate to a page of the loaded extension
    #[must_use]
    pub fn navigate_extension(path: impl Into<String>) -> Self {
        Self::Navigate {
            target: NavTarget::Extension(path.into()),
        }
    }

    /// Wait for text with the default timeout
    #[must_use]
    pub fn wait_for_text(locator: Locator, substring: impl Into<String>) -> Self {
        Self::WaitForText {
            locator,
            substring: substring.into(),
            timeout_ms: None,
        }
    }

    /// Wait for class presence with the default timeout
    #[must_use]
    pub fn wait_for_class(locator: Locator, class: impl Into<String>, present: bool) -> Self {
        Self::WaitForClass {
            locator,
            class: class.into(),
            present,
            timeout_ms: None,
        }
    }

    /// Wait for visibility with the default timeout
    #[must_use]
    pub const fn wait_for_visible(locator: Locator, visible: bool) -> Self {
        Self::WaitForVisible {
            locator,
            visible,
            timeout_ms: None,
        }
    }

    /// Click
    #[must_use]
    pub const fn click(locator: Locator) -> Self {
        Self::Click { locator }
    }

    /// Idle for the scenario's settle delay
    #[must_use]
    pub const fn wait_idle() -> Self {
        Self::WaitIdle { duration_ms: None }
    }

    /// Idle for a fixed delay
    #[must_use]
    pub const fn wait_idle_ms(duration_ms: u64) -> Self {
        Self::WaitIdle {
            duration_ms: Some(duration_ms),
        }
    }

    /// Screenshot checkpoint
    #[must_use]
    pub fn screenshot(name: impl Into<String>) -> Self {
        Self::Screenshot { name: name.into() }
    }

    /// Assertion step
    #[must_use]
    pub const fn expect(locator: Locator, condition: Expectation) -> Self {
        Self::Expect {
            locator,
            condition,
            checkpoint: None,
        }
    }

    /// Short action name, as written in YAML
    #[must_use]
    pub const fn action(&self) -> &'static str {
        match self {
            Self::Navigate { .. } => "navigate",
            Self::WaitForText { .. } => "wait_for_text",
            Self::WaitForClass { .. } => "wait_for_class",
            Self::WaitForVisible { .. } => "wait_for_visible",
            Self::Click { .. } => "click",
            Self::WaitIdle { .. } => "wait_idle",
            Self::Screenshot { .. } => "screenshot",
            Self::Expect { .. } => "expect",
            Self::ExpectScript { .. } => "expect_script",
        }
    }

    /// Whether the step leaves the page visually settled for a screenshot
    #[must_use]
    pub const fn is_settle_barrier(&self) -> bool {
        matches!(
            self,
            Self::WaitIdle { .. } | Self::WaitForClass { .. } | Self::WaitForVisible { .. }
        )
    }

    /// Whether the step needs a resolved extension identity
    #[must_use]
    pub const fn needs_extension(&self) -> bool {
        matches!(
            self,
            Self::Navigate {
                target: NavTarget::Extension(_)
            }
        )
    }

    /// Locator the step acts on, if any
    #[must_use]
    pub const fn locator(&self) -> Option<&Locator> {
        match self {
            Self::WaitForText { locator, .. }
            | Self::WaitForClass { locator, .. }
            | Self::WaitForVisible { locator, .. }
            | Self::Click { locator }
            | Self::Expect { locator, .. } => Some(locator),
            Self::Navigate { .. }
            | Self::WaitIdle { .. }
            | Self::Screenshot { .. }
            | Self::ExpectScript { .. } => None,
        }
    }
}

impl fmt::Display for InteractionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Navigate { target } => write!(f, "navigate to {target}"),
            Self::WaitForText {
                locator, substring, ..
            } => write!(f, "wait for {locator} text {substring:?}"),
            Self::WaitForClass {
                locator,
                class,
                present,
                ..
            } => {
                let verb = if *present { "gain" } else { "lose" };
                write!(f, "wait for {locator} to {verb} class '{class}'")
            }
            Self::WaitForVisible {
                locator, visible, ..
            } => {
                let state = if *visible { "visible" } else { "hidden" };
                write!(f, "wait for {locator} to be {state}")
            }
            Self::Click { locator } => write!(f, "click {locator}"),
            Self::WaitIdle {
                duration_ms: Some(ms),
            } => write!(f, "idle {ms}ms"),
            Self::WaitIdle { duration_ms: None } => f.write_str("idle until settled"),
            Self::Screenshot { name } => write!(f, "screenshot '{name}'"),
            Self::Expect {
                locator, condition, ..
            } => write!(f, "expect {locator} {condition}"),
            Self::ExpectScript { expression, .. } => write!(f, "expect script {expression}"),
        }
    }
}
