//! In-memory popup page for exercising the sequencer without a browser.
//!
//! Models the extension popup: a summary that renders once the fake storage
//! is installed, a chart container toggled by `#showChartBtn` and a theme
//! toggle flipping `dark-mode` on the body. `#usageChart` renders only while
//! the container is shown. `popup/settings.html` renders a
//! static settings container.

use crate::driver::{ElementProbe, PageDriver, ANIMATIONS_SETTLED_EXPR};
use crate::fake_api::FAKE_HANDLE;
use crate::locator::Locator;
use crate::result::{PopshotError, PopshotResult};
use async_trait::async_trait;
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::sync::{Mutex, MutexGuard};

pub(crate) const SHOW_LABEL: &str = "📊 Show Chart";
pub(crate) const HIDE_LABEL: &str = "🙈 Hide Chart";
pub(crate) const SUMMARY: &str =
    "Recent activity:\ngithub.com: 3.0 min\nstackoverflow.com: 1.5 min";

#[derive(Debug, Default)]
struct MockState {
    init_scripts: Vec<String>,
    url: Option<String>,
    fake_active: bool,
    chart_hidden: bool,
    dark: bool,
    summary_delay: u32,
    summary_polls_left: u32,
    click_animation_polls: u32,
    animation_polls_left: u32,
    events: Vec<String>,
}

#[derive(Debug, Default)]
pub(crate) struct MockPage {
    state: Mutex<MockState>,
}

impl MockPage {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Summary renders only after this many probes of it
    pub(crate) fn with_summary_delay(self, polls: u32) -> Self {
        self.lock().summary_delay = polls;
        self
    }

    /// Each click starts a transition reported as running for this many polls
    pub(crate) fn with_click_animation(self, polls: u32) -> Self {
        self.lock().click_animation_polls = polls;
        self
    }

    pub(crate) fn events(&self) -> Vec<String> {
        self.lock().events.clone()
    }

    pub(crate) fn init_scripts(&self) -> Vec<String> {
        self.lock().init_scripts.clone()
    }

    pub(crate) fn chart_hidden(&self) -> bool {
        self.lock().chart_hidden
    }

    pub(crate) fn is_dark(&self) -> bool {
        self.lock().dark
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }
}

impl MockState {
    fn on_settings_page(&self) -> bool {
        self.url
            .as_deref()
            .is_some_and(|u| u.ends_with("settings.html"))
    }

    fn label(&self) -> &'static str {
        if self.chart_hidden {
            SHOW_LABEL
        } else {
            HIDE_LABEL
        }
    }

    /// Resolve a locator to one of the modelled element keys
    fn element(&self, locator: &Locator) -> Option<&'static str> {
        self.url.as_ref()?;
        let key = match locator {
            Locator::Id { id } => match id.as_str() {
                "output" => "output",
                "showChartBtn" => "toggle",
                "themeToggle" => "theme",
                "usageChart" => "usage_chart",
                _ => return None,
            },
            Locator::Css { css } => match css.as_str() {
                "#output" => "output",
                "#showChartBtn" => "toggle",
                "#themeToggle" => "theme",
                ".chart-container" => "chart",
                ".settings-container" => "settings",
                "body" => "body",
                _ => return None,
            },
            Locator::Role {
                role,
                name: Some(name),
            } if role == "button" && name == self.label() => "toggle",
            Locator::Text { text } if self.label().contains(text.as_str()) => "toggle",
            _ => return None,
        };
        let on_settings = self.on_settings_page();
        match key {
            "body" => Some(key),
            "settings" if on_settings => Some(key),
            "settings" => None,
            _ if on_settings => None,
            _ => Some(key),
        }
    }
}

#[async_trait]
impl PageDriver for MockPage {
    async fn add_init_script(&self, source: &str) -> PopshotResult<()> {
        let mut state = self.lock();
        state.events.push("init_script".to_string());
        state.init_scripts.push(source.to_string());
        Ok(())
    }

    async fn navigate(&self, url: &str) -> PopshotResult<()> {
        if url.contains("unreachable") {
            return Err(PopshotError::navigation(url, "net::ERR_NAME_NOT_RESOLVED"));
        }
        let mut state = self.lock();
        state.events.push(format!("navigate {url}"));
        state.fake_active = state.init_scripts.iter().any(|s| s.contains(FAKE_HANDLE));
        state.url = Some(url.to_string());
        state.chart_hidden = true;
        state.dark = false;
        state.summary_polls_left = state.summary_delay;
        state.animation_polls_left = 0;
        Ok(())
    }

    async fn current_url(&self) -> PopshotResult<String> {
        Ok(self.lock().url.clone().unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn probe(&self, locator: &Locator) -> PopshotResult<ElementProbe> {
        let mut state = self.lock();
        let Some(key) = state.element(locator) else {
            return Ok(ElementProbe::missing());
        };
        let probe = match key {
            "output" => {
                if state.summary_polls_left > 0 {
                    state.summary_polls_left -= 1;
                    ElementProbe::visible("Loading...", &[])
                } else if state.fake_active {
                    ElementProbe::visible(SUMMARY, &[])
                } else {
                    ElementProbe::visible("Error: chrome is not defined", &[])
                }
            }
            "chart" => {
                let mut probe = ElementProbe::visible("", &["chart-container"]);
                if state.chart_hidden {
                    probe.classes.push("hidden".to_string());
                    probe.visible = false;
                }
                probe
            }
            "usage_chart" => {
                let mut probe = ElementProbe::visible("", &[]);
                probe.visible = !state.chart_hidden;
                probe
            }
            "toggle" => ElementProbe::visible(state.label(), &["toggle-btn"]),
            "theme" => ElementProbe::visible("🌓", &[]),
            "settings" => ElementProbe::visible("Settings", &["settings-container"]),
            _ => {
                let classes: &[&str] = if state.dark { &["dark-mode"] } else { &[] };
                ElementProbe::visible("", classes)
            }
        };
        Ok(probe)
    }

    async fn click(&self, locator: &Locator) -> PopshotResult<()> {
        let mut state = self.lock();
        let key = state
            .element(locator)
            .ok_or_else(|| PopshotError::page(format!("no element matches {locator}")))?;
        state.events.push(format!("click {key}"));
        match key {
            "toggle" => state.chart_hidden = !state.chart_hidden,
            "theme" => state.dark = !state.dark,
            _ => {}
        }
        state.animation_polls_left = state.click_animation_polls;
        Ok(())
    }

    async fn evaluate_bool(&self, expression: &str) -> PopshotResult<bool> {
        let mut state = self.lock();
        if expression == ANIMATIONS_SETTLED_EXPR {
            state.events.push("animations?".to_string());
            if state.animation_polls_left > 0 {
                state.animation_polls_left -= 1;
                return Ok(false);
            }
            return Ok(true);
        }
        if expression.contains("dark-mode") {
            return Ok(state.dark);
        }
        if expression.contains(FAKE_HANDLE) {
            return Ok(state.fake_active);
        }
        Err(PopshotError::page(format!("unsupported expression: {expression}")))
    }

    async fn screenshot(&self) -> PopshotResult<Vec<u8>> {
        let mut state = self.lock();
        state.events.push("screenshot".to_string());
        let shade = if state.dark { 30 } else { 240 };
        let height = if state.chart_hidden { 200 } else { 420 };
        let img = RgbaImage::from_pixel(360, height, Rgba([shade, shade, shade, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| PopshotError::screenshot(e.to_string()))?;
        Ok(bytes)
    }
}
