use std::sync::Arc;

use perkdir_client::PerkDescriptor;
use perkdir_config::HarnessConfig;
use perkdir_fixture::{FixtureError, FixtureLifecycle, FixtureResult};
use perkdir_ui::{ClientDirectoryBackend, DirectoryController, DirectoryHandle, DirectoryOptions};

use crate::scenario::{ScenarioOutcome, ScenarioVerifier};

/// The deterministic baseline record every run seeds and asserts against.
pub fn baseline_descriptor() -> PerkDescriptor {
    PerkDescriptor {
        title: "Integration Preview Benefit".to_owned(),
        description: "Baseline record created during setup for deterministic rendering checks."
            .to_owned(),
        category: "travel".to_owned(),
        merchant: "Integration Merchant".to_owned(),
        discount_percent: 15,
    }
}

#[derive(Debug)]
pub struct SuiteReport {
    pub outcomes: Vec<(String, ScenarioOutcome)>,
    pub teardown_error: Option<FixtureError>,
}

impl SuiteReport {
    pub fn succeeded(&self) -> bool {
        self.teardown_error.is_none()
            && self
                .outcomes
                .iter()
                .all(|(_, outcome)| !outcome.is_failure())
    }
}

/// Runs the whole suite: setup, both filter scenarios, then teardown.
/// Setup failures abort immediately; scenario failures are collected;
/// teardown runs exactly once no matter how the scenarios went.
pub async fn run_suite(config: &HarnessConfig) -> FixtureResult<SuiteReport> {
    let mut lifecycle = FixtureLifecycle::new(config);
    let context = lifecycle.set_up(&baseline_descriptor()).await?;

    let mut outcomes = Vec::new();
    {
        let verifier = ScenarioVerifier::new(&context);

        // Each scenario drives a freshly mounted page and shares nothing
        // with its siblings beyond the published context.
        let mut handle = mount_directory(&lifecycle, config);
        outcomes.push((
            "name filtering".to_owned(),
            verifier.verify_name_filtering(&mut handle).await,
        ));
        handle.shut_down().await;

        let mut handle = mount_directory(&lifecycle, config);
        outcomes.push((
            "merchant filtering".to_owned(),
            verifier.verify_merchant_filtering(&mut handle).await,
        ));
        handle.shut_down().await;
    }

    let teardown_error = lifecycle.tear_down(context).await.err();
    Ok(SuiteReport {
        outcomes,
        teardown_error,
    })
}

fn mount_directory(lifecycle: &FixtureLifecycle, config: &HarnessConfig) -> DirectoryHandle {
    let backend = ClientDirectoryBackend::new(lifecycle.client().clone());
    DirectoryController::spawn(
        Arc::new(backend),
        DirectoryOptions {
            debounce: config.debounce,
        },
    )
}
