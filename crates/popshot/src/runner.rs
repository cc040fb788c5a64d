//! Scenario runner.
//!
//! [`drive_page`] runs a validated scenario against any [`PageDriver`]:
//! install the fake, open the target, then hand the steps to the sequencer.
//! With the `browser` feature, [`run_scenario`] wraps it with a chromium
//! launch and guarantees the session is closed on every exit path.

use crate::driver::PageDriver;
use crate::identity::ExtensionId;
use crate::result::PopshotResult;
use crate::scenario::Scenario;
use crate::sequencer::{RunReport, Sequencer};
use tracing::Instrument;

/// Whether the fake platform API is installed for this scenario.
///
/// Static pages always get it. Live extension pages have the real API, so the
/// fake only replaces it when the scenario supplies fake storage contents.
#[must_use]
pub fn installs_fake(scenario: &Scenario) -> bool {
    !scenario.target.is_live() || !scenario.fake_data.is_empty()
}

/// Run `scenario` on an already-open page.
///
/// # Errors
///
/// Returns the validation error, the fake installation or initial navigation
/// failure, or the first failing step.
pub async fn drive_page<D>(
    driver: &D,
    scenario: &Scenario,
    identity: Option<ExtensionId>,
) -> PopshotResult<RunReport>
where
    D: PageDriver + ?Sized,
{
    scenario.validate()?;
    let span = tracing::info_span!("scenario", name = %scenario.name);

    async {
        if installs_fake(scenario) {
            let mut fake = scenario.fake_api();
            if let Some(id) = &identity {
                fake = fake.with_extension_id(id.as_str());
            }
            driver.add_init_script(&fake.to_script()?).await?;
            tracing::debug!(keys = scenario.fake_data.len(), "fake platform API installed");
        }

        let sequencer = Sequencer::new(driver, scenario.output_dir())
            .with_identity(identity)
            .with_settle(scenario.settle)
            .with_default_timeout(scenario.default_timeout_ms)
            .with_base_dir(scenario.base_dir());

        if let Some(target) = scenario.target.initial_navigation() {
            let url = sequencer.resolve_target(&target).await?;
            driver.navigate(&url).await?;
            tracing::info!(%url, "opened target");
        }

        let mut report = sequencer.run(&scenario.steps).await?;
        report.scenario.clone_from(&scenario.name);
        tracing::info!(
            steps = report.steps_executed,
            checkpoints = report.checkpoints.len(),
            elapsed_ms = report.elapsed_ms,
            "scenario complete"
        );
        Ok(report)
    }
    .instrument(span)
    .await
}

#[cfg(feature = "browser")]
mod live {
    use super::*;
    use crate::browser::{BrowserSession, LaunchConfig};
    use crate::identity::IdentityResolver;

    /// Launch chromium for `scenario` and run it.
    ///
    /// The browser and any temporary profile are released whether the run
    /// succeeds or fails. A run error takes precedence over a close error.
    ///
    /// # Errors
    ///
    /// Returns launch, identity, navigation, step or artifact errors.
    pub async fn run_scenario(scenario: &Scenario, launch: LaunchConfig) -> PopshotResult<RunReport> {
        scenario.validate()?;
        let live = scenario.target.is_live();
        let session = BrowserSession::launch(launch).await?;

        let outcome = async {
            let identity = if live {
                Some(IdentityResolver::new().resolve(&session).await?)
            } else {
                None
            };
            let page = session.new_page().await?;
            drive_page(&page, scenario, identity).await
        }
        .await;

        let closed = session.close().await;
        match (outcome, closed) {
            (Ok(report), Ok(())) => Ok(report),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_error)) => {
                tracing::warn!(error = %close_error, "browser did not close cleanly");
                Err(e)
            }
        }
    }
}

#[cfg(feature = "browser")]
pub use live::run_scenario;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{BuiltinOptions, BuiltinScenario};
    use crate::fake_api::FAKE_HANDLE;
    use crate::identity::{parse_worker_url, EXTENSION_SCHEME};
    use crate::mock_page::{MockPage, SUMMARY};
    use crate::result::PopshotError;
    use crate::scenario::Target;
    use crate::step::{Expectation, InteractionStep};
    use crate::locator::Locator;
    use std::path::Path;

    fn static_builtin(builtin: BuiltinScenario, out: &Path) -> Scenario {
        let mut scenario = builtin
            .build(&BuiltinOptions::default().with_popup_url("http://localhost:8000/popup/popup.html"))
            .unwrap();
        scenario.output_dir = Some(out.to_path_buf());
        scenario
    }

    mod fake_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_fake_installed_before_navigation() {
            let dir = tempfile::tempdir().unwrap();
            let page = MockPage::new();
            let scenario = static_builtin(BuiltinScenario::PopupToggle, dir.path());

            drive_page(&page, &scenario, None).await.unwrap();

            let events = page.events();
            let install = events.iter().position(|e| e == "init_script").unwrap();
            let navigate = events.iter().position(|e| e.starts_with("navigate")).unwrap();
            assert!(install < navigate);
            assert!(page.init_scripts()[0].contains(FAKE_HANDLE));
            assert!(page.init_scripts()[0].contains("github.com"));
        }

        #[test]
        fn test_live_fake_only_with_data() {
            let live = Scenario::new(
                "live",
                Target::LiveExtension {
                    extension_dir: "ext".into(),
                    profile_dir: None,
                    entry_page: None,
                },
            );
            assert!(!installs_fake(&live));
            assert!(installs_fake(
                &live.with_fake_data(crate::builtin::usage_fixture())
            ));
        }

        #[tokio::test(start_paused = true)]
        async fn test_summary_marker_with_fake() {
            let dir = tempfile::tempdir().unwrap();
            let page = MockPage::new().with_summary_delay(3);
            let scenario = static_builtin(BuiltinScenario::PopupToggle, dir.path()).step(
                InteractionStep::expect(
                    Locator::id("output"),
                    Expectation::TextEquals(SUMMARY.to_string()),
                ),
            );
            drive_page(&page, &scenario, None).await.unwrap();
        }
    }

    mod builtin_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_popup_toggle_end_to_end() {
            let dir = tempfile::tempdir().unwrap();
            let page = MockPage::new().with_click_animation(2);
            let scenario = static_builtin(BuiltinScenario::PopupToggle, dir.path());

            let report = drive_page(&page, &scenario, None).await.unwrap();

            assert_eq!(report.scenario, "popup-toggle");
            assert_eq!(report.steps_executed, scenario.steps.len());
            let expanded = report.checkpoint("expanded").unwrap();
            assert_eq!(expanded.path, dir.path().join("expanded.png"));
            assert!(expanded.height > 200);
            assert!(page.chart_hidden());
        }

        #[tokio::test(start_paused = true)]
        async fn test_compact_expanded_checkpoints_differ() {
            let dir = tempfile::tempdir().unwrap();
            let page = MockPage::new();
            let scenario = static_builtin(BuiltinScenario::PopupCompactExpanded, dir.path());

            let report = drive_page(&page, &scenario, None).await.unwrap();

            let compact = report.checkpoint("compact").unwrap();
            let expanded = report.checkpoint("expanded").unwrap();
            assert_ne!(compact.sha256, expanded.sha256);
        }

        #[tokio::test(start_paused = true)]
        async fn test_theme_round_trip_restores_state() {
            let dir = tempfile::tempdir().unwrap();
            let page = MockPage::new();
            let scenario = static_builtin(BuiltinScenario::ThemeRoundTrip, dir.path());

            let report = drive_page(&page, &scenario, None).await.unwrap();

            let light = report.checkpoint("light").unwrap();
            let dark = report.checkpoint("dark").unwrap();
            let restored = report.checkpoint("light-restored").unwrap();
            assert_ne!(light.sha256, dark.sha256);
            assert_eq!(light.sha256, restored.sha256);
            assert!(!page.is_dark());
        }

        #[tokio::test(start_paused = true)]
        async fn test_settings_uses_resolved_identity() {
            let dir = tempfile::tempdir().unwrap();
            let page = MockPage::new();
            let mut scenario = BuiltinScenario::SettingsCentered
                .build(&BuiltinOptions::default().with_extension_dir("ext"))
                .unwrap();
            scenario.output_dir = Some(dir.path().to_path_buf());
            let id = parse_worker_url("chrome-extension://runtimeid/background.js", EXTENSION_SCHEME)
                .unwrap();

            let report = drive_page(&page, &scenario, Some(id)).await.unwrap();

            assert_eq!(report.extension_id.as_deref(), Some("runtimeid"));
            assert!(page
                .events()
                .contains(&"navigate chrome-extension://runtimeid/popup/settings.html".to_string()));
            assert!(dir.path().join("settings.png").exists());
        }
    }

    mod failure_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_invalid_scenario_touches_nothing() {
            let page = MockPage::new();
            let scenario = Scenario::new("empty", Target::Static { url: "x.html".into() });
            let err = drive_page(&page, &scenario, None).await.unwrap_err();
            assert!(matches!(err, PopshotError::Config { .. }));
            assert!(page.events().is_empty());
        }

        #[tokio::test(start_paused = true)]
        async fn test_unreachable_target() {
            let page = MockPage::new();
            let scenario = Scenario::new(
                "unreachable",
                Target::Static {
                    url: "http://unreachable.invalid/popup.html".into(),
                },
            )
            .step(InteractionStep::wait_idle());
            let err = drive_page(&page, &scenario, None).await.unwrap_err();
            assert!(matches!(err, PopshotError::Navigation { .. }));
        }

        #[tokio::test(start_paused = true)]
        async fn test_live_entry_page_without_identity() {
            let page = MockPage::new();
            let mut scenario = BuiltinScenario::PopupToggle
                .build(&BuiltinOptions::default().with_extension_dir("ext"))
                .unwrap();
            scenario.output_dir = Some(std::env::temp_dir().join("popshot-unused"));
            let err = drive_page(&page, &scenario, None).await.unwrap_err();
            assert!(matches!(err, PopshotError::Config { .. }));
        }
    }

    #[cfg(feature = "browser")]
    mod chromium_tests {
        use super::*;
        use crate::browser::LaunchConfig;

        const POPUP_FIXTURE: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<style>
  .hidden { display: none; }
  .chart-container, #usageChart { display: block; width: 300px; height: 120px; }
  .chart-container.hidden { display: none; }
</style>
</head>
<body>
<pre id="output">Loading...</pre>
<button id="showChartBtn">📊 Show Chart</button>
<div class="chart-container hidden"><canvas id="usageChart"></canvas></div>
<script>
  chrome.storage.local.get('usage', (data) => {
    const lines = Object.entries(data.usage || {})
      .map(([site, ms]) => `${site}: ${(ms / 60000).toFixed(1)} min`);
    document.getElementById('output').textContent = ['Recent activity:'].concat(lines).join('\n');
  });
  const button = document.getElementById('showChartBtn');
  button.addEventListener('click', () => {
    const hidden = document.querySelector('.chart-container').classList.toggle('hidden');
    button.textContent = hidden ? '📊 Show Chart' : '🙈 Hide Chart';
  });
</script>
</body>
</html>
"#;

        #[tokio::test]
        #[ignore = "Requires chromium"]
        async fn test_popup_toggle_against_fixture_page() {
            let dir = tempfile::tempdir().unwrap();
            let popup = dir.path().join("popup.html");
            std::fs::write(&popup, POPUP_FIXTURE).unwrap();

            let mut scenario = BuiltinScenario::PopupToggle
                .build(&BuiltinOptions::default().with_popup_url(popup.display().to_string()))
                .unwrap();
            scenario.output_dir = Some(dir.path().join("shots"));
            let launch = LaunchConfig::for_scenario(&scenario).with_no_sandbox();

            let report = run_scenario(&scenario, launch).await.unwrap();
            assert_eq!(report.steps_executed, scenario.steps.len());
            assert_eq!(report.checkpoints.len(), 1);
            let checkpoint = &report.checkpoints[0];
            assert_eq!(checkpoint.name, "expanded");
            assert!(std::fs::read(&checkpoint.path)
                .unwrap()
                .starts_with(&[0x89, b'P', b'N', b'G']));
        }
    }
}
