// One interface over the in-app checker and the native shell updater

use std::path::Path;
use std::sync::Arc;

use crate::error::{Result, UpdateError};
use crate::listeners::{Listener, Subscription};
use crate::updater::{DownloadState, UpdateChecker, UpdateStatus};

/// What UI presenters need from an update source.
///
/// Implemented by `InAppBackend` and by the desktop shell's native bridge
/// client; the composition root decides which one the UI receives.
pub trait UpdateBackend: Send + Sync {
    /// Short name for logs ("in-app", "native")
    fn name(&self) -> &'static str;

    /// Start a check without blocking the caller. Results arrive as events.
    fn check_now(&self);

    /// Download the known update, or install it once it is ready.
    /// Fails with `NoUpdateAvailable` when nothing is known.
    fn download_or_install(&self) -> Result<()>;

    fn subscribe(&self, listener: Listener) -> Subscription;

    fn status(&self) -> UpdateStatus;
}

/// Applies a downloaded artifact (normally replaces the app and restarts)
pub trait Installer: Send + Sync {
    fn install(&self, artifact: &Path) -> Result<()>;
}

/// Backend driven by the in-app `UpdateChecker`
pub struct InAppBackend {
    checker: Arc<UpdateChecker>,
    installer: Arc<dyn Installer>,
}

impl InAppBackend {
    pub fn new(checker: Arc<UpdateChecker>, installer: Arc<dyn Installer>) -> Self {
        Self { checker, installer }
    }
}

impl UpdateBackend for InAppBackend {
    fn name(&self) -> &'static str {
        "in-app"
    }

    fn check_now(&self) {
        let checker = Arc::clone(&self.checker);
        let spawned = std::thread::Builder::new()
            .name("update-check-now".into())
            .spawn(move || {
                checker.force_check();
            });
        if let Err(e) = spawned {
            log::error!("Failed to start update check: {}", e);
        }
    }

    fn download_or_install(&self) -> Result<()> {
        match self.checker.download_state() {
            DownloadState::Downloaded {
                path: Some(path), ..
            } => {
                log::info!("Installing update from {}", path.display());
                return self.installer.install(&path);
            }
            DownloadState::Downloading { .. } => return Err(UpdateError::DownloadInProgress),
            _ => {}
        }

        if !self.checker.status().update_available {
            return Err(UpdateError::NoUpdateAvailable);
        }

        let checker = Arc::clone(&self.checker);
        std::thread::Builder::new()
            .name("update-download".into())
            .spawn(move || {
                // Failures are reported to listeners as UPDATE_DOWNLOAD_ERROR
                let _ = checker.download_update();
            })?;
        Ok(())
    }

    fn subscribe(&self, listener: Listener) -> Subscription {
        self.checker.subscribe(listener)
    }

    fn status(&self) -> UpdateStatus {
        self.checker.status()
    }
}
