//! Interaction sequencer.
//!
//! Executes [`InteractionStep`]s strictly in order against a [`PageDriver`].
//! The first failing step ends the run; checkpoints captured before it stay
//! on disk.
//!
//! Before every screenshot the sequencer guarantees a settle barrier: if the
//! preceding step is not already one (`wait_idle`, `wait_for_class`,
//! `wait_for_visible`), an idle wait is inserted.

use crate::checkpoint::{Checkpoint, CheckpointRecorder};
use crate::driver::{ElementProbe, PageDriver};
use crate::identity::ExtensionId;
use crate::locator::Locator;
use crate::result::{PopshotError, PopshotResult};
use crate::step::{Expectation, InteractionStep, NavTarget};
use crate::wait::{poll_until, SettleOptions, WaitOptions, DEFAULT_WAIT_TIMEOUT_MS};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;
use tracing::Instrument;

/// Summary of a completed run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// Scenario name
    pub scenario: String,
    /// Resolved extension identifier, in live mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension_id: Option<String>,
    /// Number of steps executed
    pub steps_executed: usize,
    /// Settle barriers inserted before screenshots
    pub settle_barriers_inserted: usize,
    /// Captured checkpoints, in order
    pub checkpoints: Vec<Checkpoint>,
    /// Wall time of the step sequence
    pub elapsed_ms: u64,
}

impl RunReport {
    /// Look up a checkpoint by name
    #[must_use]
    pub fn checkpoint(&self, name: &str) -> Option<&Checkpoint> {
        self.checkpoints.iter().find(|c| c.name == name)
    }
}

/// Runs a step sequence against one page
pub struct Sequencer<'a, D: PageDriver + ?Sized> {
    driver: &'a D,
    recorder: CheckpointRecorder,
    identity: Option<ExtensionId>,
    settle: SettleOptions,
    default_timeout_ms: u64,
    poll_interval_ms: Option<u64>,
    base_dir: PathBuf,
    barriers_inserted: usize,
}

impl<D: PageDriver + ?Sized> std::fmt::Debug for Sequencer<'_, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequencer")
            .field("output_dir", &self.recorder.output_dir())
            .field("identity", &self.identity)
            .field("settle", &self.settle)
            .field("default_timeout_ms", &self.default_timeout_ms)
            .finish_non_exhaustive()
    }
}

impl<'a, D: PageDriver + ?Sized> Sequencer<'a, D> {
    /// Sequencer writing checkpoints into `output_dir`
    pub fn new(driver: &'a D, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            driver,
            recorder: CheckpointRecorder::new(output_dir),
            identity: None,
            settle: SettleOptions::default(),
            default_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: None,
            base_dir: PathBuf::from("."),
            barriers_inserted: 0,
        }
    }

    /// Identity used to build extension page URLs
    #[must_use]
    pub fn with_identity(mut self, identity: Option<ExtensionId>) -> Self {
        self.identity = identity;
        self
    }

    /// Settle barrier behaviour
    #[must_use]
    pub const fn with_settle(mut self, settle: SettleOptions) -> Self {
        self.settle = settle;
        self
    }

    /// Timeout for wait steps that do not set their own
    #[must_use]
    pub const fn with_default_timeout(mut self, timeout_ms: u64) -> Self {
        self.default_timeout_ms = timeout_ms;
        self
    }

    /// Polling interval for wait steps
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = Some(poll_interval_ms);
        self
    }

    /// Directory relative `file` targets are resolved against
    #[must_use]
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    /// Resolve a navigation target to a URL
    pub async fn resolve_target(&self, target: &NavTarget) -> PopshotResult<String> {
        match target {
            NavTarget::Url(url) => Ok(url.clone()),
            NavTarget::File(path) => file_url(&self.base_dir, path).await,
            NavTarget::Extension(relative) => self
                .identity
                .as_ref()
                .map(|id| id.page_url(relative))
                .ok_or_else(|| {
                    PopshotError::config(format!(
                        "extension page '{relative}' needs a live extension target"
                    ))
                }),
        }
    }

    /// Execute `steps` in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first step failure: [`PopshotError::StepTimeout`] for unmet
    /// waits, [`PopshotError::AssertionFailure`] for failed expectations, or the
    /// underlying navigation/page/artifact error.
    pub async fn run(mut self, steps: &[InteractionStep]) -> PopshotResult<RunReport> {
        let start = Instant::now();

        for (index, step) in steps.iter().enumerate() {
            let span = tracing::debug_span!("step", index, action = step.action());
            let previous = index.checked_sub(1).and_then(|i| steps.get(i));
            let result = self
                .execute(index, step, previous)
                .instrument(span)
                .await
                .map_err(|e| attribute_timeout(e, index, step));
            if let Err(e) = result {
                tracing::warn!(index, step = %step, error = %e, "step failed, aborting run");
                return Err(e);
            }
        }

        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        Ok(RunReport {
            scenario: String::new(),
            extension_id: self.identity.as_ref().map(ToString::to_string),
            steps_executed: steps.len(),
            settle_barriers_inserted: self.barriers_inserted,
            checkpoints: self.recorder.into_records(),
            elapsed_ms,
        })
    }

    async fn execute(
        &mut self,
        index: usize,
        step: &InteractionStep,
        previous: Option<&InteractionStep>,
    ) -> PopshotResult<()> {
        tracing::debug!(%step, "executing");
        match step {
            InteractionStep::Navigate { target } => {
                let url = self.resolve_target(target).await?;
                self.driver.navigate(&url).await?;
                tracing::info!(%url, "navigated");
            }
            InteractionStep::WaitForText {
                locator,
                substring,
                timeout_ms,
            } => {
                let driver = self.driver;
                poll_until(
                    &self.wait_options(*timeout_ms),
                    format!("{locator} text to contain {substring:?}"),
                    || async move {
                        let probe = driver.probe(locator).await?;
                        Ok(probe.found && probe.text.contains(substring.as_str()))
                    },
                )
                .await?;
            }
            InteractionStep::WaitForClass {
                locator,
                class,
                present,
                timeout_ms,
            } => {
                let driver = self.driver;
                let verb = if *present { "have" } else { "lack" };
                poll_until(
                    &self.wait_options(*timeout_ms),
                    format!("{locator} to {verb} class '{class}'"),
                    || async move {
                        let probe = driver.probe(locator).await?;
                        Ok(probe.found && probe.has_class(class) == *present)
                    },
                )
                .await?;
            }
            InteractionStep::WaitForVisible {
                locator,
                visible,
                timeout_ms,
            } => {
                let driver = self.driver;
                let state = if *visible { "visible" } else { "hidden" };
                poll_until(
                    &self.wait_options(*timeout_ms),
                    format!("{locator} to be {state}"),
                    || async move {
                        let probe = driver.probe(locator).await?;
                        Ok((probe.found && probe.visible) == *visible)
                    },
                )
                .await?;
            }
            InteractionStep::Click { locator } => self.click(locator).await?,
            InteractionStep::WaitIdle { duration_ms } => {
                let idle = duration_ms.map_or_else(|| self.settle.idle(), Duration::from_millis);
                self.settle_barrier(idle).await?;
            }
            InteractionStep::Screenshot { name } => {
                if !previous.is_some_and(InteractionStep::is_settle_barrier) {
                    tracing::debug!(checkpoint = %name, "inserting settle barrier");
                    self.barriers_inserted += 1;
                    self.settle_barrier(self.settle.idle()).await?;
                }
                let png = self.driver.screenshot().await?;
                self.recorder.record(name, index, &png).await?;
            }
            InteractionStep::Expect {
                locator,
                condition,
                checkpoint,
            } => {
                let probe = self.driver.probe(locator).await?;
                if let Some(message) = check_expectation(&probe, condition) {
                    return Err(PopshotError::AssertionFailure {
                        index,
                        checkpoint: checkpoint.clone().unwrap_or_else(|| step.to_string()),
                        message: format!("{locator}: {message}"),
                    });
                }
            }
            InteractionStep::ExpectScript {
                expression,
                checkpoint,
            } => {
                if !self.driver.evaluate_bool(expression).await? {
                    return Err(PopshotError::AssertionFailure {
                        index,
                        checkpoint: checkpoint.clone().unwrap_or_else(|| step.to_string()),
                        message: format!("expression evaluated to false: {expression}"),
                    });
                }
            }
        }
        Ok(())
    }

    async fn click(&self, locator: &Locator) -> PopshotResult<()> {
        if !locator.is_stable() {
            return Err(PopshotError::config(format!(
                "click target {locator} is ambiguous; use an id, test id, CSS selector or role with a name"
            )));
        }
        let driver = self.driver;
        poll_until(
            &self.wait_options(None),
            format!("{locator} to be clickable"),
            || async move {
                let probe = driver.probe(locator).await?;
                Ok(probe.found && probe.visible)
            },
        )
        .await?;
        driver.click(locator).await
    }

    /// Fixed idle, then the animation predicate when enabled
    async fn settle_barrier(&self, idle: Duration) -> PopshotResult<()> {
        tokio::time::sleep(idle).await;
        if self.settle.await_animations {
            let driver = self.driver;
            poll_until(&self.settle.animation_wait(), "animations to finish", || {
                driver.animations_settled()
            })
            .await?;
        }
        Ok(())
    }

    fn wait_options(&self, timeout_ms: Option<u64>) -> WaitOptions {
        let options = WaitOptions::new().with_timeout(timeout_ms.unwrap_or(self.default_timeout_ms));
        match self.poll_interval_ms {
            Some(interval) => options.with_poll_interval(interval),
            None => options,
        }
    }
}

/// `None` when the expectation holds, otherwise what was observed instead
fn check_expectation(probe: &ElementProbe, condition: &Expectation) -> Option<String> {
    if let Expectation::Visible(expected) = condition {
        let actual = probe.found && probe.visible;
        return (actual != *expected).then(|| {
            let state = if actual { "visible" } else { "hidden or absent" };
            format!("expected {condition}, element is {state}")
        });
    }
    if !probe.found {
        return Some(format!("expected {condition}, but no element matched"));
    }
    let text = probe.text.trim();
    let holds = match condition {
        Expectation::TextEquals(expected) => text == expected.trim(),
        Expectation::TextContains(needle) => probe.text.contains(needle.as_str()),
        Expectation::TextOneOf(options) => options.iter().any(|o| o.trim() == text),
        Expectation::HasClass { class, present } => probe.has_class(class) == *present,
        Expectation::Visible(_) => true,
    };
    (!holds).then(|| {
        format!(
            "expected {condition}, found text {:?} with classes {:?}",
            probe.text, probe.classes
        )
    })
}

fn attribute_timeout(error: PopshotError, index: usize, step: &InteractionStep) -> PopshotError {
    match error {
        PopshotError::Timeout { ms, waited_for } => PopshotError::StepTimeout {
            index,
            step: step.to_string(),
            condition: waited_for,
            ms,
        },
        other => other,
    }
}

async fn file_url(base_dir: &Path, path: &Path) -> PopshotResult<String> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    };
    let absolute = tokio::fs::canonicalize(&joined)
        .await
        .map_err(|e| PopshotError::navigation(joined.display().to_string(), e.to_string()))?;
    url::Url::from_file_path(&absolute)
        .map(String::from)
        .map_err(|()| {
            PopshotError::navigation(
                absolute.display().to_string(),
                "path cannot be expressed as a file URL",
            )
        })
}
