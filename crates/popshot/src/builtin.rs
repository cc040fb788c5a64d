//! Built-in scenarios for the usage-tracker popup.
//!
//! The popup contract (element ids, the chart toggle's two labels, the
//! settings page path) lives in [`PopupContract`] so the scenarios can be
//! pointed at a build with different markup.

use crate::fake_api::FakeStorageState;
use crate::locator::Locator;
use crate::result::{PopshotError, PopshotResult};
use crate::scenario::{Scenario, Target};
use crate::step::{Expectation, InteractionStep};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// What the scenarios rely on in the popup's markup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopupContract {
    /// Popup document, relative to the extension root
    pub popup_page: String,
    /// Settings document, relative to the extension root
    pub settings_page: String,
    /// Activity summary element
    pub summary: Locator,
    /// Text the summary shows once storage was read
    pub summary_marker: String,
    /// Chart container
    pub chart_container: Locator,
    /// Chart canvas inside the container
    pub usage_chart: Locator,
    /// Class that hides the chart container
    pub hidden_class: String,
    /// Chart toggle button
    pub chart_toggle: Locator,
    /// Toggle label while the chart is hidden
    pub show_label: String,
    /// Toggle label while the chart is shown
    pub hide_label: String,
    /// Theme toggle button
    pub theme_toggle: Locator,
    /// Element carrying the theme class
    pub theme_root: Locator,
    /// Class present in dark mode
    pub dark_class: String,
}

impl Default for PopupContract {
    fn default() -> Self {
        Self {
            popup_page: "popup/popup.html".to_string(),
            settings_page: "popup/settings.html".to_string(),
            summary: Locator::id("output"),
            summary_marker: "Recent activity".to_string(),
            chart_container: Locator::css(".chart-container"),
            usage_chart: Locator::id("usageChart"),
            hidden_class: "hidden".to_string(),
            chart_toggle: Locator::id("showChartBtn"),
            show_label: "📊 Show Chart".to_string(),
            hide_label: "🙈 Hide Chart".to_string(),
            theme_toggle: Locator::id("themeToggle"),
            theme_root: Locator::css("body"),
            dark_class: "dark-mode".to_string(),
        }
    }
}

impl PopupContract {
    fn summary_loaded(&self) -> InteractionStep {
        InteractionStep::wait_for_text(self.summary.clone(), self.summary_marker.clone())
    }

    /// Class and rendered visibility are checked separately; neither implies the other
    fn chart_hidden(&self, hidden: bool) -> [InteractionStep; 2] {
        [
            InteractionStep::wait_for_class(
                self.chart_container.clone(),
                self.hidden_class.clone(),
                hidden,
            ),
            InteractionStep::wait_for_visible(self.chart_container.clone(), !hidden),
        ]
    }

    fn chart_drawn(&self) -> InteractionStep {
        InteractionStep::wait_for_visible(self.usage_chart.clone(), true)
    }

    fn toggle_reads(&self, label: &str) -> InteractionStep {
        InteractionStep::expect(
            self.chart_toggle.clone(),
            Expectation::TextEquals(label.to_string()),
        )
    }

    fn toggle_label_valid(&self) -> InteractionStep {
        InteractionStep::expect(
            self.chart_toggle.clone(),
            Expectation::TextOneOf(vec![self.show_label.clone(), self.hide_label.clone()]),
        )
    }

    fn dark(&self, present: bool) -> InteractionStep {
        InteractionStep::wait_for_class(self.theme_root.clone(), self.dark_class.clone(), present)
    }
}

/// Usage data the popup summarizes: three minutes on github.com, ninety seconds on stackoverflow.com
#[must_use]
pub fn usage_fixture() -> FakeStorageState {
    FakeStorageState::new().with(
        "usage",
        json!({ "github.com": 180_000, "stackoverflow.com": 90_000 }),
    )
}

/// Built-in scenario names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinScenario {
    /// Summary loads, chart expands and collapses, labels flip
    PopupToggle,
    /// Compact and expanded popup checkpoints
    PopupCompactExpanded,
    /// Theme toggles to dark and back
    ThemeRoundTrip,
    /// Settings page of the live extension
    SettingsCentered,
}

impl BuiltinScenario {
    /// Every built-in, in listing order
    pub const ALL: [Self; 4] = [
        Self::PopupToggle,
        Self::PopupCompactExpanded,
        Self::ThemeRoundTrip,
        Self::SettingsCentered,
    ];

    /// Name used on the command line
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PopupToggle => "popup-toggle",
            Self::PopupCompactExpanded => "popup-compact-expanded",
            Self::ThemeRoundTrip => "theme-round-trip",
            Self::SettingsCentered => "settings-centered",
        }
    }

    /// One-line description
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::PopupToggle => "summary renders from fake storage; chart toggles open and closed",
            Self::PopupCompactExpanded => "checkpoints of the popup with the chart hidden and shown",
            Self::ThemeRoundTrip => "theme toggle switches to dark mode and back",
            Self::SettingsCentered => "settings page of the loaded extension (live only)",
        }
    }

    /// Whether the scenario can only run against the loaded extension
    #[must_use]
    pub const fn requires_live(self) -> bool {
        matches!(self, Self::SettingsCentered)
    }

    /// Build the scenario
    ///
    /// # Errors
    ///
    /// Returns [`PopshotError::Config`] when a live-only scenario is built
    /// without an extension directory.
    pub fn build(self, options: &BuiltinOptions) -> PopshotResult<Scenario> {
        let contract = &options.contract;
        let target = options.target(self)?;
        let scenario = Scenario::new(self.name(), target)
            .with_description(self.description())
            .with_fake_data(options.fake_data.clone());

        let scenario = match self {
            Self::PopupToggle => scenario
                .step(contract.summary_loaded())
                .steps(contract.chart_hidden(true))
                .step(contract.toggle_reads(&contract.show_label))
                .step(InteractionStep::click(contract.chart_toggle.clone()))
                .steps(contract.chart_hidden(false))
                .step(contract.chart_drawn())
                .step(contract.toggle_reads(&contract.hide_label))
                .step(InteractionStep::screenshot("expanded"))
                .step(InteractionStep::click(contract.chart_toggle.clone()))
                .steps(contract.chart_hidden(true))
                .step(contract.toggle_reads(&contract.show_label)),
            Self::PopupCompactExpanded => scenario
                .step(contract.summary_loaded())
                .steps(contract.chart_hidden(true))
                .step(InteractionStep::wait_idle())
                .step(InteractionStep::screenshot("compact"))
                .step(InteractionStep::click(contract.chart_toggle.clone()))
                .steps(contract.chart_hidden(false))
                .step(contract.chart_drawn())
                .step(contract.toggle_label_valid())
                .step(InteractionStep::wait_idle_ms(1_000))
                .step(InteractionStep::screenshot("expanded")),
            Self::ThemeRoundTrip => scenario.steps([
                contract.summary_loaded(),
                contract.dark(false),
                InteractionStep::screenshot("light"),
                InteractionStep::click(contract.theme_toggle.clone()),
                contract.dark(true),
                InteractionStep::screenshot("dark"),
                InteractionStep::click(contract.theme_toggle.clone()),
                contract.dark(false),
                InteractionStep::screenshot("light-restored"),
            ]),
            Self::SettingsCentered => scenario.steps([
                InteractionStep::navigate_extension(contract.settings_page.clone()),
                InteractionStep::wait_for_visible(contract.theme_root.clone(), true),
                InteractionStep::wait_idle(),
                InteractionStep::screenshot("settings"),
            ]),
        };
        Ok(scenario)
    }
}

impl fmt::Display for BuiltinScenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BuiltinScenario {
    type Err = PopshotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|b| b.name() == s)
            .ok_or_else(|| {
                let names: Vec<_> = Self::ALL.iter().map(|b| b.name()).collect();
                PopshotError::config(format!(
                    "unknown built-in scenario '{s}' (available: {})",
                    names.join(", ")
                ))
            })
    }
}

/// Inputs shared by the built-in scenarios
#[derive(Debug, Clone)]
pub struct BuiltinOptions {
    /// Popup document for static runs (file path or URL)
    pub popup_url: String,
    /// Unpacked extension; switches popup scenarios to live mode
    pub extension_dir: Option<PathBuf>,
    /// Markup contract
    pub contract: PopupContract,
    /// Storage contents
    pub fake_data: FakeStorageState,
}

impl Default for BuiltinOptions {
    fn default() -> Self {
        let contract = PopupContract::default();
        Self {
            popup_url: contract.popup_page.clone(),
            extension_dir: None,
            contract,
            fake_data: usage_fixture(),
        }
    }
}

impl BuiltinOptions {
    /// Run popup scenarios against the extension in `dir`
    #[must_use]
    pub fn with_extension_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.extension_dir = Some(dir.into());
        self
    }

    /// Serve the popup from `url` in static mode
    #[must_use]
    pub fn with_popup_url(mut self, url: impl Into<String>) -> Self {
        self.popup_url = url.into();
        self
    }

    fn target(&self, scenario: BuiltinScenario) -> PopshotResult<Target> {
        match (&self.extension_dir, scenario) {
            (Some(dir), BuiltinScenario::SettingsCentered) => Ok(Target::LiveExtension {
                extension_dir: dir.clone(),
                profile_dir: None,
                entry_page: None,
            }),
            (Some(dir), _) => Ok(Target::LiveExtension {
                extension_dir: dir.clone(),
                profile_dir: None,
                entry_page: Some(self.contract.popup_page.clone()),
            }),
            (None, b) if b.requires_live() => Err(PopshotError::config(format!(
                "built-in '{b}' needs an extension directory"
            ))),
            (None, _) => Ok(Target::Static {
                url: self.popup_url.clone(),
            }),
        }
    }
}
