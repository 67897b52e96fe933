// Update checking, release metadata and update events for AssetDesk

pub mod backend;
pub mod config;
pub mod error;
pub mod events;
pub mod listeners;
pub mod release;
pub mod updater;
pub mod version;

pub use backend::{InAppBackend, Installer, UpdateBackend};
pub use error::{Result, UpdateError};
pub use events::UpdateEvent;
pub use listeners::{Listener, ListenerId, Listeners, Subscription};
pub use release::{GithubReleases, ReleaseAsset, ReleaseInfo, ReleaseSource};
pub use updater::{CheckOutcome, DownloadState, PeriodicCheck, UpdateChecker, UpdateStatus};
pub use version::{compare_versions, version_newer};
