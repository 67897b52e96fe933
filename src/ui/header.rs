// Title bar with an update badge

use std::sync::Arc;

use assetdesk_shared::{Subscription, UpdateBackend, UpdateEvent};
use parking_lot::Mutex;

pub struct HeaderBadge {
    current_version: String,
    badge: Arc<Mutex<Option<String>>>,
    _subscription: Subscription,
}

fn apply(badge: &mut Option<String>, event: &UpdateEvent) {
    match event {
        UpdateEvent::UpdateAvailable { latest_version, .. } => *badge = Some(latest_version.clone()),
        UpdateEvent::UpdateReadyToInstall { version, .. } => *badge = Some(version.clone()),
        UpdateEvent::NoUpdateAvailable { .. } => *badge = None,
        _ => {}
    }
}

impl HeaderBadge {
    pub fn mount(backend: &dyn UpdateBackend) -> Self {
        let status = backend.status();
        let badge = Arc::new(Mutex::new(
            status.latest_version.filter(|_| status.update_available),
        ));

        let sink = Arc::clone(&badge);
        let subscription = backend.subscribe(Arc::new(move |event: &UpdateEvent| {
            apply(&mut sink.lock(), event);
        }));

        Self {
            current_version: status.current_version,
            badge,
            _subscription: subscription,
        }
    }

    pub fn render(&self) -> String {
        match &*self.badge.lock() {
            Some(version) => format!("AssetDesk v{}  [update v{version}]", self.current_version),
            None => format!("AssetDesk v{}", self.current_version),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn badge_follows_events() {
        let mut badge = None;
        apply(&mut badge, &UpdateEvent::UpdateAvailable {
            current_version: "4.5.1".into(),
            latest_version: "4.6.0".into(),
            update_url: None,
            release_notes: None,
        });
        assert_eq!(badge.as_deref(), Some("4.6.0"));

        apply(&mut badge, &UpdateEvent::UpdateCheckError { error: "offline".into() });
        assert_eq!(badge.as_deref(), Some("4.6.0"));

        apply(&mut badge, &UpdateEvent::NoUpdateAvailable {
            current_version: "4.5.1".into(),
            latest_version: "4.5.1".into(),
        });
        assert_eq!(badge, None);
    }
}
