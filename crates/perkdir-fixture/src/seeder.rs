use perkdir_client::{PerkDescriptor, PerkRecord, RemoteSessionClient};
use time::OffsetDateTime;

use crate::error::{FixtureError, FixtureResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedDisposition {
    Created,
    Reused,
}

#[derive(Debug, Clone)]
pub struct SeededPerk {
    pub record: PerkRecord,
    pub disposition: SeedDisposition,
}

/// Idempotent seeding against a possibly shared store: create optimistically,
/// reuse on conflict, and only mint a disambiguated title when the
/// conflicting record cannot be found through any listing shape.
pub struct FixtureSeeder<'a> {
    client: &'a RemoteSessionClient,
}

impl<'a> FixtureSeeder<'a> {
    pub fn new(client: &'a RemoteSessionClient) -> Self {
        Self { client }
    }

    pub async fn seed(&self, descriptor: &PerkDescriptor) -> FixtureResult<SeededPerk> {
        match self.client.create_perk(descriptor).await {
            Ok(record) => Ok(SeededPerk {
                record,
                disposition: SeedDisposition::Created,
            }),
            Err(error) if error.is_conflict() => self.recover_from_conflict(descriptor).await,
            Err(error) => Err(FixtureError::Seeding(format!(
                "perk creation failed: {error}"
            ))),
        }
    }

    async fn recover_from_conflict(&self, descriptor: &PerkDescriptor) -> FixtureResult<SeededPerk> {
        tracing::info!(
            title = %descriptor.title,
            merchant = %descriptor.merchant,
            "seed descriptor already present, looking up the existing record"
        );
        let listing = self.client.list_perks().await.map_err(|error| {
            FixtureError::Seeding(format!("conflict recovery listing failed: {error}"))
        })?;

        if let Some(existing) = listing
            .into_iter()
            .find(|record| record.logical_key() == descriptor.logical_key())
        {
            return Ok(SeededPerk {
                record: existing,
                disposition: SeedDisposition::Reused,
            });
        }

        // The conflicting record is not reachable through any listing shape;
        // mint a fresh title instead of blocking the whole run on it.
        let disambiguated = descriptor.with_title(format!(
            "{} {}",
            descriptor.title,
            OffsetDateTime::now_utc().unix_timestamp()
        ));
        tracing::info!(
            title = %disambiguated.title,
            "conflicting record not listed, creating a disambiguated fixture"
        );
        let record = self
            .client
            .create_perk(&disambiguated)
            .await
            .map_err(|error| {
                FixtureError::Seeding(format!("disambiguated perk creation failed: {error}"))
            })?;
        Ok(SeededPerk {
            record,
            disposition: SeedDisposition::Created,
        })
    }
}
