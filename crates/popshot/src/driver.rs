//! PageDriver - abstract automation seam
//!
//! The sequencer and runner only talk to a page through [`PageDriver`], so the
//! chromium backend can be swapped for an in-memory page in tests.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌─────────────────────┐
//! │  Sequencer   │────►│  PageDriver  │────►│ CdpPage (chromium)  │
//! │  Runner      │     │  (trait)     │     │ MockPage (tests)    │
//! └──────────────┘     └──────────────┘     └─────────────────────┘
//! ```

use crate::locator::Locator;
use crate::result::PopshotResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Expression evaluating to `true` when no CSS animation or transition is running
/// (infinite animations such as spinners are ignored)
pub const ANIMATIONS_SETTLED_EXPR: &str = "(typeof document.getAnimations !== 'function') || \
     document.getAnimations().every(a => (a.playState !== 'running' && !a.pending) || \
     (a.effect !== null && a.effect.getComputedTiming().endTime === Infinity))";

/// Snapshot of one element's observable state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementProbe {
    /// Whether the locator matched an element
    pub found: bool,
    /// Rendered text (`innerText`, falling back to `textContent`)
    #[serde(default)]
    pub text: String,
    /// Class list
    #[serde(default)]
    pub classes: Vec<String>,
    /// Rendered with a non-empty box and not hidden by `display`/`visibility`
    #[serde(default)]
    pub visible: bool,
}

impl ElementProbe {
    /// Probe result for a locator that matched nothing
    #[must_use]
    pub fn missing() -> Self {
        Self::default()
    }

    /// Probe result for a visible element
    #[must_use]
    pub fn visible(text: impl Into<String>, classes: &[&str]) -> Self {
        Self {
            found: true,
            text: text.into(),
            classes: classes.iter().map(|c| (*c).to_string()).collect(),
            visible: true,
        }
    }

    /// Whether the element carries `class`
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

/// Build the expression that probes an element matched by `locator`.
#[must_use]
pub fn probe_expression(locator: &Locator) -> String {
    format!(
        "(() => {{\
         const el = {query};\
         if (!el) return {{ found: false, text: '', classes: [], visible: false }};\
         const style = window.getComputedStyle(el);\
         const rect = el.getBoundingClientRect();\
         const visible = style.display !== 'none' && style.visibility !== 'hidden' && rect.width > 0 && rect.height > 0;\
         const text = typeof el.innerText === 'string' ? el.innerText : (el.textContent || '');\
         return {{ found: true, text, classes: Array.from(el.classList), visible }};\
         }})()",
        query = locator.to_query()
    )
}

/// Build the expression that returns the viewport center of the element, or `null`.
#[must_use]
pub fn center_expression(locator: &Locator) -> String {
    format!(
        "(() => {{\
         const el = {query};\
         if (!el) return null;\
         el.scrollIntoView({{ block: 'center', inline: 'center' }});\
         const rect = el.getBoundingClientRect();\
         if (rect.width === 0 || rect.height === 0) return null;\
         return [rect.left + rect.width / 2, rect.top + rect.height / 2];\
         }})()",
        query = locator.to_query()
    )
}

/// Page-level automation primitives used by a verification run.
///
/// Implementations execute one call at a time; a run never issues concurrent
/// calls against the same page.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Register a script to run before any page script on every new document
    async fn add_init_script(&self, source: &str) -> PopshotResult<()>;

    /// Navigate to a URL and wait for the load event
    async fn navigate(&self, url: &str) -> PopshotResult<()>;

    /// Current document URL
    async fn current_url(&self) -> PopshotResult<String>;

    /// Observe one element without waiting
    async fn probe(&self, locator: &Locator) -> PopshotResult<ElementProbe>;

    /// Click the element's center. Fails if the element is absent or has no box.
    async fn click(&self, locator: &Locator) -> PopshotResult<()>;

    /// Evaluate an expression expected to produce a boolean
    async fn evaluate_bool(&self, expression: &str) -> PopshotResult<bool>;

    /// Whether every animation/transition on the page has finished
    async fn animations_settled(&self) -> PopshotResult<bool> {
        self.evaluate_bool(ANIMATIONS_SETTLED_EXPR).await
    }

    /// Capture the viewport as PNG bytes
    async fn screenshot(&self) -> PopshotResult<Vec<u8>>;
}
