// Update events broadcast to UI listeners

use std::path::PathBuf;

use serde::Serialize;

/// Everything the update subsystem tells its listeners.
///
/// Serialized with a `type` discriminant (`UPDATE_AVAILABLE`, ...) and
/// camelCase payload fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum UpdateEvent {
    UpdateAvailable {
        current_version: String,
        latest_version: String,
        update_url: Option<String>,
        release_notes: Option<String>,
    },
    NoUpdateAvailable {
        current_version: String,
        latest_version: String,
    },
    UpdateCheckError {
        error: String,
    },
    UpdateDownloadStart {
        version: String,
    },
    UpdateDownloadProgress {
        version: String,
        percent: u8,
    },
    UpdateDownloadComplete {
        version: String,
        path: Option<PathBuf>,
    },
    UpdateDownloadError {
        version: String,
        error: String,
    },
    UpdateReadyToInstall {
        version: String,
        path: Option<PathBuf>,
    },
}

impl UpdateEvent {
    /// The wire name of this event's variant
    pub fn kind(&self) -> &'static str {
        match self {
            UpdateEvent::UpdateAvailable { .. } => "UPDATE_AVAILABLE",
            UpdateEvent::NoUpdateAvailable { .. } => "NO_UPDATE_AVAILABLE",
            UpdateEvent::UpdateCheckError { .. } => "UPDATE_CHECK_ERROR",
            UpdateEvent::UpdateDownloadStart { .. } => "UPDATE_DOWNLOAD_START",
            UpdateEvent::UpdateDownloadProgress { .. } => "UPDATE_DOWNLOAD_PROGRESS",
            UpdateEvent::UpdateDownloadComplete { .. } => "UPDATE_DOWNLOAD_COMPLETE",
            UpdateEvent::UpdateDownloadError { .. } => "UPDATE_DOWNLOAD_ERROR",
            UpdateEvent::UpdateReadyToInstall { .. } => "UPDATE_READY_TO_INSTALL",
        }
    }

    pub fn is_download_event(&self) -> bool {
        matches!(
            self,
            UpdateEvent::UpdateDownloadStart { .. }
                | UpdateEvent::UpdateDownloadProgress { .. }
                | UpdateEvent::UpdateDownloadComplete { .. }
                | UpdateEvent::UpdateDownloadError { .. }
                | UpdateEvent::UpdateReadyToInstall { .. }
        )
    }
}
