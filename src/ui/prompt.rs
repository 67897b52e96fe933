// Update modal: check spinner, available / up-to-date / error, download progress

use std::sync::Arc;

use assetdesk_shared::{Result, Subscription, UpdateBackend, UpdateError, UpdateEvent};
use parking_lot::Mutex;

/// Presentation state of the update modal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptState {
    pub visible: bool,
    pub checking: bool,
    pub current_version: String,
    pub latest_version: Option<String>,
    pub release_notes: Option<String>,
    /// Download percentage while a download runs
    pub progress: Option<u8>,
    pub ready_to_install: bool,
    pub up_to_date: bool,
    pub error: Option<String>,
}

impl PromptState {
    pub fn apply(&mut self, event: &UpdateEvent) {
        match event {
            UpdateEvent::UpdateAvailable {
                latest_version,
                release_notes,
                ..
            } => {
                if self.latest_version.as_ref() != Some(latest_version) {
                    self.ready_to_install = false;
                    self.progress = None;
                }
                self.visible = true;
                self.checking = false;
                self.up_to_date = false;
                self.error = None;
                self.latest_version = Some(latest_version.clone());
                self.release_notes = release_notes.clone();
            }
            UpdateEvent::NoUpdateAvailable { latest_version, .. } => {
                self.checking = false;
                self.up_to_date = true;
                self.error = None;
                self.ready_to_install = false;
                self.progress = None;
                self.latest_version = Some(latest_version.clone());
            }
            UpdateEvent::UpdateCheckError { error } => {
                self.checking = false;
                self.error = Some(error.clone());
            }
            UpdateEvent::UpdateDownloadStart { .. } => {
                self.progress = Some(0);
                self.error = None;
            }
            UpdateEvent::UpdateDownloadProgress { percent, .. } => {
                self.progress = Some(*percent);
            }
            UpdateEvent::UpdateDownloadComplete { .. } => {
                self.progress = None;
            }
            UpdateEvent::UpdateDownloadError { error, .. } => {
                self.progress = None;
                self.error = Some(error.clone());
            }
            UpdateEvent::UpdateReadyToInstall { version, .. } => {
                self.visible = true;
                self.progress = None;
                self.ready_to_install = true;
                self.latest_version = Some(version.clone());
            }
        }
    }

    pub fn render(&self) -> Vec<String> {
        if !self.visible {
            return Vec::new();
        }
        let mut lines = vec!["== Software Update ==".to_string()];
        let latest = self.latest_version.as_deref().unwrap_or("?");

        if self.checking {
            lines.push("Checking for updates...".into());
        } else if self.ready_to_install {
            lines.push(format!("Version {latest} is ready to install."));
            lines.push("[install] Restart now   [dismiss] Later".into());
        } else if let Some(pct) = self.progress {
            lines.push(format!("Downloading v{latest}... {pct}%"));
        } else if self.up_to_date {
            lines.push(format!(
                "You're up to date (v{}).",
                self.current_version
            ));
            lines.push("[check] Check Again   [dismiss] Close".into());
        } else if self.latest_version.is_some() {
            lines.push(format!(
                "A new version is available: v{} -> v{latest}",
                self.current_version
            ));
            if let Some(notes) = self.release_notes.as_deref().filter(|n| !n.trim().is_empty()) {
                lines.push("Release notes:".into());
                lines.extend(notes.lines().map(|l| format!("  {l}")));
            }
            lines.push("[download] Download   [dismiss] Later".into());
        }

        if let Some(error) = &self.error {
            lines.push(format!("Error: {error}"));
            lines.push("[check] Check Again".into());
        }
        lines
    }
}

/// Modal update prompt bound to an update backend; unsubscribes when dropped
pub struct UpdatePrompt {
    backend: Arc<dyn UpdateBackend>,
    state: Arc<Mutex<PromptState>>,
    _subscription: Subscription,
}

impl UpdatePrompt {
    pub fn mount(backend: Arc<dyn UpdateBackend>) -> Self {
        let status = backend.status();
        let state = Arc::new(Mutex::new(PromptState {
            current_version: status.current_version,
            latest_version: status.latest_version,
            release_notes: status.release_notes,
            checking: status.is_checking,
            ..PromptState::default()
        }));

        let sink = Arc::clone(&state);
        let subscription = backend.subscribe(Arc::new(move |event: &UpdateEvent| {
            sink.lock().apply(event);
        }));

        Self {
            backend,
            state,
            _subscription: subscription,
        }
    }

    pub fn state(&self) -> PromptState {
        self.state.lock().clone()
    }

    pub fn render(&self) -> Vec<String> {
        self.state.lock().render()
    }

    /// "Check Again"
    pub fn check_again(&self) {
        {
            let mut state = self.state.lock();
            state.visible = true;
            state.checking = true;
            state.up_to_date = false;
            state.error = None;
        }
        self.backend.check_now();
    }

    /// "Download" / "Install"
    pub fn download(&self) -> Result<()> {
        let result = self.backend.download_or_install();
        match &result {
            Err(UpdateError::DownloadInProgress) => {
                self.state.lock().error = None;
            }
            Err(e) => {
                let mut state = self.state.lock();
                state.visible = true;
                state.error = Some(e.to_string());
            }
            Ok(()) => {}
        }
        result
    }

    pub fn dismiss(&self) {
        self.state.lock().visible = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn available(version: &str) -> UpdateEvent {
        UpdateEvent::UpdateAvailable {
            current_version: "4.5.1".into(),
            latest_version: version.into(),
            update_url: None,
            release_notes: Some("Faster imports\nNew barcode sizes".into()),
        }
    }

    fn state() -> PromptState {
        PromptState {
            current_version: "4.5.1".into(),
            ..PromptState::default()
        }
    }

    #[test]
    fn available_opens_modal_with_notes() {
        let mut state = state();
        state.checking = true;
        state.apply(&available("4.6.0"));
        assert!(state.visible && !state.checking);
        let lines = state.render();
        assert!(lines.iter().any(|l| l.contains("v4.5.1 -> v4.6.0")));
        assert!(lines.iter().any(|l| l.contains("New barcode sizes")));
    }

    #[test]
    fn download_flow_tracks_progress_then_ready() {
        let mut state = state();
        state.apply(&available("4.6.0"));
        state.apply(&UpdateEvent::UpdateDownloadStart { version: "4.6.0".into() });
        state.apply(&UpdateEvent::UpdateDownloadProgress { version: "4.6.0".into(), percent: 42 });
        assert!(state.render().iter().any(|l| l.contains("42%")));

        state.apply(&UpdateEvent::UpdateDownloadComplete { version: "4.6.0".into(), path: None });
        state.apply(&UpdateEvent::UpdateReadyToInstall { version: "4.6.0".into(), path: None });
        assert!(state.ready_to_install);
        assert_eq!(state.progress, None);
        assert!(state.render().iter().any(|l| l.contains("ready to install")));
    }

    #[test]
    fn errors_stop_the_spinner() {
        let mut state = state();
        state.visible = true;
        state.checking = true;
        state.apply(&UpdateEvent::UpdateCheckError { error: "request timed out".into() });
        assert!(!state.checking);
        assert!(state.render().iter().any(|l| l == "Error: request timed out"));
    }

    #[test]
    fn up_to_date_keeps_modal_closed_unless_open() {
        let mut state = state();
        state.apply(&UpdateEvent::NoUpdateAvailable {
            current_version: "4.5.1".into(),
            latest_version: "4.5.1".into(),
        });
        assert!(state.render().is_empty());

        state.visible = true;
        assert!(state.render().iter().any(|l| l.contains("up to date")));
    }

    #[test]
    fn newer_release_resets_ready_flag() {
        let mut state = state();
        state.apply(&UpdateEvent::UpdateReadyToInstall { version: "4.6.0".into(), path: None });
        state.apply(&available("4.7.0"));
        assert!(!state.ready_to_install);
        assert_eq!(state.latest_version.as_deref(), Some("4.7.0"));
    }
}
