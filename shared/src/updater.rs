// In-app update checker: polls the release endpoint and broadcasts events

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::error::{Result, UpdateError};
use crate::events::UpdateEvent;
use crate::listeners::{Listener, ListenerId, Listeners, Subscription};
use crate::release::{progress_percent, ReleaseInfo, ReleaseSource, PLATFORM_ASSET_SUFFIX};
use crate::version::version_newer;

/// Default interval between in-app checks
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Snapshot of what the checker currently knows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatus {
    pub current_version: String,
    pub latest_version: Option<String>,
    pub update_available: bool,
    pub last_check: Option<DateTime<Utc>>,
    pub is_checking: bool,
    pub update_url: Option<String>,
    pub release_notes: Option<String>,
}

/// Progress of the artifact download for the known update
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DownloadState {
    #[default]
    Idle,
    Downloading { version: String, percent: u8 },
    /// `path` is None when the release page was opened instead of saving a file
    Downloaded { version: String, path: Option<PathBuf> },
    Failed { version: String, error: String },
}

/// What a single `check_for_updates` call did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Another check was in flight; nothing was requested or emitted
    Skipped,
    UpToDate { latest_version: String },
    Available { latest_version: String },
    Failed(String),
}

#[derive(Default)]
struct CheckerState {
    latest: Option<ReleaseInfo>,
    last_check: Option<DateTime<Utc>>,
    download: DownloadState,
}

/// Clears the in-flight flag when dropped, including on unwind
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        if flag.swap(true, Ordering::SeqCst) {
            None
        } else {
            Some(InFlight(flag))
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Owns update-check state, scheduling and the listener registry.
///
/// Built once by the application's composition root and shared as
/// `Arc<UpdateChecker>`.
pub struct UpdateChecker {
    current_version: String,
    asset_suffix: String,
    source: Arc<dyn ReleaseSource>,
    checking: AtomicBool,
    periodic_active: Arc<AtomicBool>,
    state: Mutex<CheckerState>,
    listeners: Listeners,
}

impl UpdateChecker {
    pub fn new(current_version: &str, source: Arc<dyn ReleaseSource>) -> Self {
        Self::with_asset_suffix(current_version, source, PLATFORM_ASSET_SUFFIX)
    }

    pub fn with_asset_suffix(
        current_version: &str,
        source: Arc<dyn ReleaseSource>,
        asset_suffix: &str,
    ) -> Self {
        Self {
            current_version: current_version.to_string(),
            asset_suffix: asset_suffix.to_string(),
            source,
            checking: AtomicBool::new(false),
            periodic_active: Arc::new(AtomicBool::new(false)),
            state: Mutex::new(CheckerState::default()),
            listeners: Listeners::new(),
        }
    }

    pub fn current_version(&self) -> &str {
        &self.current_version
    }

    pub fn is_checking(&self) -> bool {
        self.checking.load(Ordering::SeqCst)
    }

    /// Register a listener; it stays registered until `remove_listener`
    pub fn add_listener(&self, listener: Listener) -> ListenerId {
        self.listeners.add(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Register a listener for as long as the returned guard lives
    pub fn subscribe(&self, listener: Listener) -> Subscription {
        self.listeners.subscribe(listener)
    }

    pub fn notify_listeners(&self, event: &UpdateEvent) {
        log::debug!("Update event {}", event.kind());
        self.listeners.notify(event);
    }

    /// Run one check against the release endpoint.
    ///
    /// Returns `Skipped` without touching the network if a check is already
    /// in flight.
    pub fn check_for_updates(&self) -> CheckOutcome {
        let Some(guard) = InFlight::acquire(&self.checking) else {
            log::debug!("Update check already in progress, skipping");
            return CheckOutcome::Skipped;
        };

        log::info!("Checking for updates (current v{})", self.current_version);
        let result = self.source.latest_release();

        let (outcome, event) = match result {
            Ok(release) => self.record_release(release),
            Err(e) => {
                log::warn!("Update check failed: {}", e);
                let error = e.to_string();
                (
                    CheckOutcome::Failed(error.clone()),
                    UpdateEvent::UpdateCheckError { error },
                )
            }
        };

        // Release before notifying so listeners can trigger a follow-up check
        drop(guard);
        self.notify_listeners(&event);
        outcome
    }

    /// User-initiated check ("Check Again"); same in-flight rules apply
    pub fn force_check(&self) -> CheckOutcome {
        log::info!("Manual update check requested");
        self.check_for_updates()
    }

    fn record_release(&self, release: ReleaseInfo) -> (CheckOutcome, UpdateEvent) {
        let latest_version = release.version().to_string();
        let available = version_newer(&latest_version, &self.current_version);

        let event = if available {
            UpdateEvent::UpdateAvailable {
                current_version: self.current_version.clone(),
                latest_version: latest_version.clone(),
                update_url: release.html_url.clone(),
                release_notes: release.body.clone(),
            }
        } else {
            UpdateEvent::NoUpdateAvailable {
                current_version: self.current_version.clone(),
                latest_version: latest_version.clone(),
            }
        };

        {
            let mut state = self.state.lock();
            // A different release makes the previous download stale
            let stale = match &state.download {
                DownloadState::Downloaded { version, .. }
                | DownloadState::Failed { version, .. } => *version != latest_version,
                _ => false,
            };
            if stale {
                state.download = DownloadState::Idle;
            }
            state.latest = Some(release);
            state.last_check = Some(Utc::now());
        }

        if available {
            log::info!(
                "Update available: v{} -> v{}",
                self.current_version,
                latest_version
            );
            (CheckOutcome::Available { latest_version }, event)
        } else {
            log::info!("No update available (latest v{})", latest_version);
            (CheckOutcome::UpToDate { latest_version }, event)
        }
    }

    /// Current derived status; never performs I/O
    pub fn status(&self) -> UpdateStatus {
        let state = self.state.lock();
        let latest_version = state.latest.as_ref().map(|r| r.version().to_string());
        let update_available = latest_version
            .as_deref()
            .is_some_and(|latest| version_newer(latest, &self.current_version));
        UpdateStatus {
            current_version: self.current_version.clone(),
            latest_version,
            update_available,
            last_check: state.last_check,
            is_checking: self.is_checking(),
            update_url: state.latest.as_ref().and_then(|r| r.html_url.clone()),
            release_notes: state.latest.as_ref().and_then(|r| r.body.clone()),
        }
    }

    pub fn download_state(&self) -> DownloadState {
        self.state.lock().download.clone()
    }

    /// Fetch the artifact for the known update.
    ///
    /// Saves the platform installer to the temp directory and returns its path,
    /// or opens the release page and returns `None` when the release has no
    /// installer for this platform.
    pub fn download_update(&self) -> Result<Option<PathBuf>> {
        let release = {
            let mut state = self.state.lock();
            let release = match &state.latest {
                Some(r) if version_newer(r.version(), &self.current_version) => r.clone(),
                _ => return Err(UpdateError::NoUpdateAvailable),
            };
            if matches!(state.download, DownloadState::Downloading { .. }) {
                return Err(UpdateError::DownloadInProgress);
            }
            state.download = DownloadState::Downloading {
                version: release.version().to_string(),
                percent: 0,
            };
            release
        };
        let version = release.version().to_string();

        log::info!("Downloading update v{}", version);
        self.notify_listeners(&UpdateEvent::UpdateDownloadStart {
            version: version.clone(),
        });

        match self.fetch_artifact(&release, &version) {
            Ok(path) => {
                self.state.lock().download = DownloadState::Downloaded {
                    version: version.clone(),
                    path: path.clone(),
                };
                log::info!("Update v{} downloaded", version);
                self.notify_listeners(&UpdateEvent::UpdateDownloadComplete {
                    version: version.clone(),
                    path: path.clone(),
                });
                if path.is_some() {
                    self.notify_listeners(&UpdateEvent::UpdateReadyToInstall {
                        version,
                        path: path.clone(),
                    });
                }
                Ok(path)
            }
            Err(e) => {
                log::error!("Update download failed: {}", e);
                let error = e.to_string();
                self.state.lock().download = DownloadState::Failed {
                    version: version.clone(),
                    error: error.clone(),
                };
                self.notify_listeners(&UpdateEvent::UpdateDownloadError { version, error });
                Err(e)
            }
        }
    }

    fn fetch_artifact(&self, release: &ReleaseInfo, version: &str) -> Result<Option<PathBuf>> {
        let Some(asset) = release.asset_for(&self.asset_suffix) else {
            let page = release
                .html_url
                .as_deref()
                .ok_or_else(|| UpdateError::NoInstallerAsset(version.to_string()))?;
            log::info!("No {} asset in v{}, opening {}", self.asset_suffix, version, page);
            self.source.open_release_page(page)?;
            return Ok(None);
        };

        let dest = std::env::temp_dir().join(&asset.name);
        let mut last_pct: Option<u8> = None;
        let mut report = |done: u64, total: Option<u64>| {
            let pct = progress_percent(done, total);
            if last_pct != Some(pct) {
                last_pct = Some(pct);
                if let DownloadState::Downloading { percent, .. } = &mut self.state.lock().download {
                    *percent = pct;
                }
                self.notify_listeners(&UpdateEvent::UpdateDownloadProgress {
                    version: version.to_string(),
                    percent: pct,
                });
            }
        };

        if let Err(e) = self
            .source
            .download(&asset.browser_download_url, &dest, &mut report)
        {
            // Clean up partial download
            let _ = std::fs::remove_file(&dest);
            return Err(e);
        }
        Ok(Some(dest))
    }

    /// Check now, then every `interval` until the returned handle is stopped.
    pub fn start_periodic_check(self: &Arc<Self>, interval: Duration) -> Result<PeriodicCheck> {
        if self.periodic_active.swap(true, Ordering::SeqCst) {
            return Err(UpdateError::PeriodicCheckActive);
        }

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let checker = Arc::clone(self);
        let spawned = std::thread::Builder::new()
            .name("update-check".into())
            .spawn(move || {
                log::info!("Periodic update check every {}s", interval.as_secs());
                loop {
                    checker.check_for_updates();
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        _ => break,
                    }
                }
                log::debug!("Periodic update check stopped");
            });

        match spawned {
            Ok(handle) => Ok(PeriodicCheck {
                stop: Some(stop_tx),
                handle: Some(handle),
                active: Arc::clone(&self.periodic_active),
            }),
            Err(e) => {
                self.periodic_active.store(false, Ordering::SeqCst);
                Err(e.into())
            }
        }
    }
}

/// Handle to a running periodic check; stops it when dropped
pub struct PeriodicCheck {
    stop: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
    active: Arc<AtomicBool>,
}

impl PeriodicCheck {
    /// Stop the timer and wait for an in-progress check to finish
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        self.active.store(false, Ordering::SeqCst);
    }
}

impl Drop for PeriodicCheck {
    fn drop(&mut self) {
        self.shutdown();
    }
}
