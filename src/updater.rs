// Platform auto-update client and self-replacing installer for the desktop shell

use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use assetdesk_shared::release::{open_url, PLATFORM_ASSET_SUFFIX};
use assetdesk_shared::{version_newer, Installer, ReleaseSource, Result, UpdateError};
use parking_lot::Mutex;

use crate::bridge::{CheckTrigger, DownloadFailure, NativeUpdater, ShellMessage, UpdateInfo};

/// Application version, taken from the package manifest
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Flag passed to the relaunched process after an install
pub const UPDATED_FLAG: &str = "--updated";

/// How the process should end once the front end lets go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppExit {
    Quit,
    /// An update was applied; background work must stop so the new build can take over
    Restart,
}

/// Auto-update client used by the native bridge.
///
/// A check that finds a newer release announces it, downloads the platform
/// installer straight away and announces the download; `quit_and_install`
/// then applies it. The bridge worker runs checks one at a time.
pub struct ReleaseAutoUpdater {
    source: Arc<dyn ReleaseSource>,
    current_version: String,
    asset_suffix: String,
    installer: Arc<dyn Installer>,
    downloaded: Mutex<Option<(UpdateInfo, PathBuf)>>,
    /// Version whose release page was already shown
    page_shown: Mutex<Option<String>>,
}

impl ReleaseAutoUpdater {
    pub fn new(source: Arc<dyn ReleaseSource>, installer: Arc<dyn Installer>) -> Self {
        Self::with_options(source, installer, APP_VERSION, PLATFORM_ASSET_SUFFIX)
    }

    pub fn with_options(
        source: Arc<dyn ReleaseSource>,
        installer: Arc<dyn Installer>,
        current_version: &str,
        asset_suffix: &str,
    ) -> Self {
        Self {
            source,
            current_version: current_version.to_string(),
            asset_suffix: asset_suffix.to_string(),
            installer,
            downloaded: Mutex::new(None),
            page_shown: Mutex::new(None),
        }
    }
}

impl NativeUpdater for ReleaseAutoUpdater {
    fn check_for_updates(&self, trigger: CheckTrigger, emit: &dyn Fn(ShellMessage)) -> Result<()> {
        let release = self.source.latest_release()?;
        let info = UpdateInfo::from_release(&release);

        if !version_newer(&info.version, &self.current_version) {
            log::info!("[Updater] Up to date (latest v{})", info.version);
            emit(ShellMessage::UpdateNotAvailable(info));
            return Ok(());
        }

        let already_downloaded = self
            .downloaded
            .lock()
            .as_ref()
            .is_some_and(|(ready, _)| ready.version == info.version);
        if already_downloaded {
            emit(ShellMessage::UpdateDownloaded(info));
            return Ok(());
        }

        log::info!("[Updater] Update available: v{}", info.version);
        emit(ShellMessage::UpdateAvailable(info.clone()));

        let Some(asset) = release.asset_for(&self.asset_suffix) else {
            self.show_release_page(&info, trigger, emit);
            return Ok(());
        };

        let dest = std::env::temp_dir().join(&asset.name);
        if let Err(e) = self
            .source
            .download(&asset.browser_download_url, &dest, &mut |_, _| {})
        {
            log::error!("[Updater] Download of v{} failed: {}", info.version, e);
            let _ = std::fs::remove_file(&dest);
            emit(ShellMessage::UpdateDownloadError(DownloadFailure {
                version: info.version,
                error: e.to_string(),
            }));
            return Ok(());
        }

        log::info!("[Updater] Downloaded v{} to {}", info.version, dest.display());
        *self.downloaded.lock() = Some((info.clone(), dest));
        emit(ShellMessage::UpdateDownloaded(info));
        Ok(())
    }

    fn quit_and_install(&self) -> Result<()> {
        let (info, path) = self
            .downloaded
            .lock()
            .clone()
            .ok_or(UpdateError::NoUpdateAvailable)?;
        log::info!("[Updater] Installing v{} from {}", info.version, path.display());
        self.installer.install(&path)
    }
}

impl ReleaseAutoUpdater {
    /// Fallback for releases without an installer for this platform.
    /// Scheduled checks open the page once per version; user requests always do.
    fn show_release_page(&self, info: &UpdateInfo, trigger: CheckTrigger, emit: &dyn Fn(ShellMessage)) {
        let missing = || DownloadFailure {
            version: info.version.clone(),
            error: UpdateError::NoInstallerAsset(info.version.clone()).to_string(),
        };
        let Some(page) = info.release_url.as_deref() else {
            emit(ShellMessage::UpdateDownloadError(missing()));
            return;
        };

        let seen = self.page_shown.lock().as_deref() == Some(info.version.as_str());
        if !seen || trigger.is_user_initiated() {
            log::info!("[Updater] No {} asset in v{}, opening {}", self.asset_suffix, info.version, page);
            if let Err(e) = self.source.open_release_page(page) {
                log::warn!("[Updater] Cannot open release page: {}", e);
                emit(ShellMessage::UpdateDownloadError(missing()));
                return;
            }
            *self.page_shown.lock() = Some(info.version.clone());
        }
        emit(ShellMessage::UpdateReleasePageOpened(info.clone()));
    }
}

/// Replaces the running executable, or hands other installer formats to the OS,
/// then asks the composition root to shut down so the new build can take over.
pub struct SelfReplaceInstaller {
    current_exe: PathBuf,
    exit: Mutex<Sender<AppExit>>,
}

impl SelfReplaceInstaller {
    pub fn new(exit: Sender<AppExit>) -> Result<Self> {
        let current_exe = std::env::current_exe()
            .map_err(|e| UpdateError::Install(format!("Cannot determine current exe path: {e}")))?;
        Ok(Self::for_exe(current_exe, exit))
    }

    pub fn for_exe(current_exe: PathBuf, exit: Sender<AppExit>) -> Self {
        Self {
            current_exe,
            exit: Mutex::new(exit),
        }
    }
}

impl Installer for SelfReplaceInstaller {
    fn install(&self, artifact: &Path) -> Result<()> {
        let replaceable = artifact.extension() == self.current_exe.extension()
            || artifact.extension().is_some_and(|ext| ext == "AppImage");
        if replaceable {
            apply_update_and_relaunch(&self.current_exe, artifact)?;
        } else {
            // Disk images and packaged installers are opened by the OS
            open_url(&artifact.to_string_lossy())?;
        }
        log::info!("[Updater] Update handed off, requesting shutdown");
        // Only fails once the composition root is already exiting
        let _ = self.exit.lock().send(AppExit::Restart);
        Ok(())
    }
}

/// Swap `current_exe` for `downloaded` and start the new binary.
/// The old binary is kept as `<name>.old` until the next start.
pub fn apply_update_and_relaunch(current_exe: &Path, downloaded: &Path) -> Result<()> {
    let old_path = old_exe_path(current_exe);
    let _ = std::fs::remove_file(&old_path);

    std::fs::rename(current_exe, &old_path)
        .map_err(|e| UpdateError::Install(format!("Failed to rename current exe: {e}")))?;

    if let Err(e) = std::fs::copy(downloaded, current_exe) {
        let _ = std::fs::rename(&old_path, current_exe);
        return Err(UpdateError::Install(format!("Failed to copy new exe: {e}")));
    }
    make_executable(current_exe)?;
    let _ = std::fs::remove_file(downloaded);

    std::process::Command::new(current_exe)
        .arg(UPDATED_FLAG)
        .spawn()
        .map_err(|e| UpdateError::Install(format!("Failed to relaunch: {e}")))?;
    Ok(())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o755);
    std::fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

fn old_exe_path(exe: &Path) -> PathBuf {
    let mut name = exe.as_os_str().to_owned();
    name.push(".old");
    PathBuf::from(name)
}

/// Check if the app was just updated (launched with --updated flag)
pub fn was_just_updated() -> bool {
    std::env::args().any(|a| a == UPDATED_FLAG)
}

/// Clean up the .old file from a previous update
pub fn cleanup_old_exe() {
    if let Ok(current) = std::env::current_exe() {
        let old_path = old_exe_path(&current);
        if std::fs::remove_file(&old_path).is_ok() {
            log::info!("[Updater] Removed {}", old_path.display());
        }
    }
}
