use futures_util::future;
use perkdir_client::{PerkDescriptor, PerkRecord, RegisterRequest, RemoteSessionClient};
use perkdir_config::HarnessConfig;

use crate::error::{FixtureError, FixtureResult};
use crate::identity::TestIdentity;
use crate::seeder::FixtureSeeder;
use crate::store_channel::StoreAccessChannel;

/// Ids of every record this run created, in creation order. Appended only
/// during setup, drained only during teardown; no other component writes it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreatedRecordSet {
    ids: Vec<String>,
}

impl CreatedRecordSet {
    pub fn record(&mut self, id: impl Into<String>) {
        let id = id.into();
        if !self.ids.contains(&id) {
            self.ids.push(id);
        }
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn into_ids(self) -> Vec<String> {
        self.ids
    }
}

/// The oracle data published to scenarios once setup completes. Scenarios
/// receive it as an explicit value and treat it as read-only; teardown
/// consumes it.
#[derive(Debug, Clone)]
pub struct TestContext {
    pub base_url: String,
    pub identity: TestIdentity,
    pub token: String,
    pub seeded_perk: PerkRecord,
    pub created_records: CreatedRecordSet,
}

/// Orchestrates suite-scoped setup and teardown. Setup is fatal on any
/// failure; teardown is best-effort for records and fatal only for the
/// identity-removal step.
pub struct FixtureLifecycle {
    client: RemoteSessionClient,
    channel: StoreAccessChannel,
}

impl FixtureLifecycle {
    pub fn new(config: &HarnessConfig) -> Self {
        Self {
            client: RemoteSessionClient::new(config.api_base_url.clone()),
            channel: StoreAccessChannel::new(
                config.cleanup_shell.clone(),
                config.database_uri.clone(),
            ),
        }
    }

    /// The authenticated client, for wiring scenario backends against the
    /// same session the fixtures were created under.
    pub fn client(&self) -> &RemoteSessionClient {
        &self.client
    }

    pub async fn set_up(&mut self, descriptor: &PerkDescriptor) -> FixtureResult<TestContext> {
        let identity = TestIdentity::generate();
        let session = self
            .client
            .register(&RegisterRequest {
                name: identity.name.clone(),
                email: identity.email.clone(),
                password: identity.password.clone(),
            })
            .await
            .map_err(|error| {
                FixtureError::Registration(format!(
                    "registering {} failed: {error}",
                    identity.email
                ))
            })?;
        tracing::info!(email = %identity.email, "registered suite identity");

        let seeded = FixtureSeeder::new(&self.client).seed(descriptor).await?;
        let mut created_records = CreatedRecordSet::default();
        if let Some(id) = seeded.record.id.as_deref() {
            created_records.record(id);
        }
        tracing::info!(
            disposition = ?seeded.disposition,
            title = %seeded.record.title,
            "seeded baseline perk"
        );

        Ok(TestContext {
            base_url: self.client.base_url().to_owned(),
            identity,
            token: session.token,
            seeded_perk: seeded.record,
            created_records,
        })
    }

    /// Runs exactly once per suite, after every scenario has finished,
    /// regardless of their outcomes. Record deletes run concurrently and are
    /// all awaited before the identity goes away: removing the identity
    /// first would orphan records that could no longer be authenticated for
    /// cleanup.
    pub async fn tear_down(&self, context: TestContext) -> FixtureResult<()> {
        let TestContext {
            identity,
            created_records,
            ..
        } = context;

        let deletes = created_records.into_ids().into_iter().map(|id| {
            let client = self.client.clone();
            async move {
                if let Err(error) = client.delete_perk(&id).await {
                    tracing::warn!(record = %id, error = %error, "best-effort perk cleanup failed");
                }
            }
        });
        future::join_all(deletes).await;

        self.channel.remove_identity(&identity.email).await
    }
}
