// Bottom-right toast: "update ready" with an install action, and the post-update greeting

use std::sync::Arc;

use assetdesk_shared::{Result, Subscription, UpdateBackend, UpdateEvent};
use parking_lot::Mutex;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Toast {
    #[default]
    Hidden,
    /// Shown once after relaunching into a new version
    Updated { version: String },
    Available { version: String },
    Ready { version: String },
}

impl Toast {
    pub fn apply(&mut self, event: &UpdateEvent) {
        match event {
            UpdateEvent::UpdateAvailable { latest_version, .. } => {
                if !matches!(&*self, Toast::Ready { version } if version == latest_version) {
                    *self = Toast::Available {
                        version: latest_version.clone(),
                    };
                }
            }
            UpdateEvent::UpdateReadyToInstall { version, .. } => {
                *self = Toast::Ready {
                    version: version.clone(),
                };
            }
            UpdateEvent::NoUpdateAvailable { .. } => {
                if matches!(self, Toast::Available { .. } | Toast::Ready { .. }) {
                    *self = Toast::Hidden;
                }
            }
            _ => {}
        }
    }

    pub fn render(&self) -> Option<String> {
        match self {
            Toast::Hidden => None,
            Toast::Updated { version } => Some(format!("Updated to v{version} successfully!")),
            Toast::Available { version } => Some(format!(
                "AssetDesk v{version} is available. Type `download` to get it."
            )),
            Toast::Ready { version } => Some(format!(
                "AssetDesk v{version} is ready. Type `install` to restart and update."
            )),
        }
    }
}

pub struct UpdateNotification {
    backend: Arc<dyn UpdateBackend>,
    toast: Arc<Mutex<Toast>>,
    _subscription: Subscription,
}

impl UpdateNotification {
    /// `just_updated` is true when the process was relaunched by the installer
    pub fn mount(backend: Arc<dyn UpdateBackend>, just_updated: bool) -> Self {
        let status = backend.status();
        let initial = if just_updated {
            Toast::Updated {
                version: status.current_version,
            }
        } else {
            match status.latest_version {
                Some(version) if status.update_available => Toast::Available { version },
                _ => Toast::Hidden,
            }
        };
        let toast = Arc::new(Mutex::new(initial));

        let sink = Arc::clone(&toast);
        let subscription = backend.subscribe(Arc::new(move |event: &UpdateEvent| {
            sink.lock().apply(event);
        }));

        Self {
            backend,
            toast,
            _subscription: subscription,
        }
    }

    pub fn render(&self) -> Option<String> {
        self.toast.lock().render()
    }

    /// Install action. Restarts the app when the update is ready.
    pub fn install(&self) -> Result<()> {
        self.backend.download_or_install()
    }

    pub fn dismiss(&self) {
        *self.toast.lock() = Toast::Hidden;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_replaces_available() {
        let mut toast = Toast::Hidden;
        toast.apply(&UpdateEvent::UpdateAvailable {
            current_version: "4.5.1".into(),
            latest_version: "4.6.0".into(),
            update_url: None,
            release_notes: None,
        });
        assert_eq!(toast, Toast::Available { version: "4.6.0".into() });

        toast.apply(&UpdateEvent::UpdateReadyToInstall { version: "4.6.0".into(), path: None });
        assert!(toast.render().unwrap().contains("`install`"));

        // A repeat announcement of the same version keeps the install action
        toast.apply(&UpdateEvent::UpdateAvailable {
            current_version: "4.5.1".into(),
            latest_version: "4.6.0".into(),
            update_url: None,
            release_notes: None,
        });
        assert_eq!(toast, Toast::Ready { version: "4.6.0".into() });
    }

    #[test]
    fn up_to_date_hides_stale_toast_but_not_greeting() {
        let no_update = UpdateEvent::NoUpdateAvailable {
            current_version: "4.6.0".into(),
            latest_version: "4.6.0".into(),
        };

        let mut toast = Toast::Available { version: "4.6.0".into() };
        toast.apply(&no_update);
        assert_eq!(toast, Toast::Hidden);

        let mut toast = Toast::Updated { version: "4.6.0".into() };
        toast.apply(&no_update);
        assert_eq!(toast.render().as_deref(), Some("Updated to v4.6.0 successfully!"));
    }
}
