//! Suite-scoped fixture lifecycle: provisions an ephemeral identity against
//! the live API, seeds one known-good directory record, and guarantees both
//! are removed again afterwards, tolerating shared-store duplicates and
//! partial cleanup failures.

mod error;
mod identity;
mod lifecycle;
mod seeder;
mod store_channel;

pub use error::{FixtureError, FixtureResult};
pub use identity::{TestIdentity, TEST_IDENTITY_PASSWORD};
pub use lifecycle::{CreatedRecordSet, FixtureLifecycle, TestContext};
pub use seeder::{FixtureSeeder, SeedDisposition, SeededPerk};
pub use store_channel::StoreAccessChannel;
