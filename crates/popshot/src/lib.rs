//! Popshot: screenshot verification for browser extension popups
//!
//! Popshot drives a chromium page through a scripted sequence of waits,
//! clicks and assertions, capturing named screenshot checkpoints along the
//! way. The extension's platform API is replaced by a deterministic fake so
//! every run renders the same data.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  Scenario    │──►│  Runner      │──►│  Sequencer   │──►│  Checkpoint  │
//! │  (YAML)      │   │  fake + nav  │   │  steps       │   │  Recorder    │
//! └──────────────┘   └──────┬───────┘   └──────┬───────┘   └──────────────┘
//!                           │                  │
//!                    ┌──────▼───────┐   ┌──────▼───────┐
//!                    │  Identity    │   │  PageDriver  │
//!                    │  Resolver    │   │  (chromium)  │
//!                    └──────────────┘   └──────────────┘
//! ```
//!
//! Two modes are supported: a *static* page with the fake installed before
//! navigation, and a *live* extension loaded unpacked into a browser profile,
//! whose runtime identifier is read back from its service worker.

#![warn(missing_docs)]

mod browser;
mod builtin;
mod checkpoint;
mod driver;
mod fake_api;
mod identity;
mod locator;
#[cfg(test)]
mod mock_page;
mod result;
mod runner;
mod scenario;
mod sequencer;
mod step;
mod wait;

pub use browser::{
    check_manifest, extension_args, ExtensionLaunch, ExtensionManifest, LaunchConfig, ProfileDir,
};
#[cfg(feature = "browser")]
pub use browser::{BrowserSession, CdpPage};
pub use builtin::{usage_fixture, BuiltinOptions, BuiltinScenario, PopupContract};
pub use checkpoint::{sha256_hex, validate_checkpoint_name, Checkpoint, CheckpointRecorder};
pub use driver::{
    center_expression, probe_expression, ElementProbe, PageDriver, ANIMATIONS_SETTLED_EXPR,
};
pub use fake_api::{FakeApiOptions, FakePlatformApi, FakeStorageState, FAKE_HANDLE};
pub use identity::{
    parse_worker_url, ExtensionId, IdentityResolver, WorkerSource, DEFAULT_WORKER_TIMEOUT_MS,
    EXTENSION_SCHEME,
};
pub use locator::Locator;
pub use result::{PopshotError, PopshotResult};
#[cfg(feature = "browser")]
pub use runner::run_scenario;
pub use runner::{drive_page, installs_fake};
pub use scenario::{Scenario, Target, Viewport, DEFAULT_ARTIFACT_ROOT};
pub use sequencer::{RunReport, Sequencer};
pub use step::{Expectation, InteractionStep, NavTarget};
pub use wait::{
    poll_until, SettleOptions, WaitOptions, WaitResult, DEFAULT_ANIMATION_TIMEOUT_MS,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_SETTLE_IDLE_MS, DEFAULT_WAIT_TIMEOUT_MS,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::{
        BuiltinScenario, Expectation, FakeStorageState, InteractionStep, Locator, PageDriver,
        PopshotError, PopshotResult, RunReport, Scenario, Target,
    };
}
