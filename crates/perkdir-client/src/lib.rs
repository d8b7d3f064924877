//! Authenticated HTTP session client for the perk directory API.

mod client;
mod error;
mod listing;
mod types;

pub use client::RemoteSessionClient;
pub use error::{ClientError, ClientResult};
pub use types::{PerkDescriptor, PerkRecord, RegisterRequest, RegisteredSession, RegisteredUser};
