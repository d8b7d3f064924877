//! The directory page's filter state machine: a debounced, race-safe,
//! server-querying search loop with an externally observable view snapshot.

mod backend;
mod controller;
mod state;

pub use backend::{BackendError, BackendResult, ClientDirectoryBackend, DirectoryBackend};
pub use controller::{
    DirectoryController, DirectoryError, DirectoryHandle, DirectoryInput, DirectoryOptions,
};
pub use state::{
    DirectoryViewSnapshot, DirectoryViewState, FilterQuery, LOADING_INDICATOR,
    NAME_INPUT_PLACEHOLDER, SEARCHING_INDICATOR,
};
