// Native update bridge: shell-side worker that drives the platform updater,
// and the UI-side client that turns its messages into update events.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use assetdesk_shared::{
    version_newer, Listener, Listeners, ReleaseInfo, Result, Subscription, UpdateBackend,
    UpdateError, UpdateEvent, UpdateStatus,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::hotkeys::ShortcutRegistry;

/// Platform auto-update client driven by the bridge
pub trait NativeUpdater: Send + Sync {
    /// Check for a newer release; progress is reported through `emit`
    fn check_for_updates(&self, trigger: CheckTrigger, emit: &dyn Fn(ShellMessage)) -> Result<()>;

    /// Apply the downloaded update; the installer then asks the app to restart
    fn quit_and_install(&self) -> Result<()>;
}

/// Release details sent along with shell messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInfo {
    pub version: String,
    pub release_notes: Option<String>,
    pub release_url: Option<String>,
    pub release_date: Option<String>,
}

impl UpdateInfo {
    pub fn from_release(release: &ReleaseInfo) -> Self {
        Self {
            version: release.version().to_string(),
            release_notes: release.body.clone(),
            release_url: release.html_url.clone(),
            release_date: release.published_at.clone(),
        }
    }
}

/// A shell-side download that did not produce an installer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadFailure {
    pub version: String,
    pub error: String,
}

/// Shell -> UI messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "payload", rename_all = "kebab-case")]
pub enum ShellMessage {
    UpdateAvailable(UpdateInfo),
    UpdateDownloaded(UpdateInfo),
    UpdateNotAvailable(UpdateInfo),
    /// No installer for this platform; the release page was shown instead
    UpdateReleasePageOpened(UpdateInfo),
    UpdateDownloadError(DownloadFailure),
    UpdateError(String),
}

impl ShellMessage {
    pub fn channel(&self) -> &'static str {
        match self {
            ShellMessage::UpdateAvailable(_) => "update-available",
            ShellMessage::UpdateDownloaded(_) => "update-downloaded",
            ShellMessage::UpdateNotAvailable(_) => "update-not-available",
            ShellMessage::UpdateReleasePageOpened(_) => "update-release-page-opened",
            ShellMessage::UpdateDownloadError(_) => "update-download-error",
            ShellMessage::UpdateError(_) => "update-error",
        }
    }
}

/// UI -> shell requests. Nothing else can cross the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UiRequest {
    CheckForUpdates,
    QuitAndInstall,
}

/// What started a native check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckTrigger {
    Startup,
    Timer,
    Shortcut,
    Ui,
}

impl CheckTrigger {
    /// Shortcut presses and UI requests, as opposed to scheduled checks
    pub fn is_user_initiated(self) -> bool {
        matches!(self, CheckTrigger::Shortcut | CheckTrigger::Ui)
    }
}

enum Command {
    Check(CheckTrigger),
    QuitAndInstall,
    Shutdown,
}

pub struct BridgeOptions {
    /// Run a check as soon as the bridge starts
    pub check_on_start: bool,
    /// Interval of the shell's own periodic check; None disables it
    pub check_interval: Option<Duration>,
    /// Global shortcut that triggers a check
    pub check_shortcut: Option<String>,
}

/// The UI's end of the bridge
pub struct UiPort {
    pub requests: RequestSender,
    pub messages: Receiver<ShellMessage>,
}

/// Capability to send `UiRequest`s to the shell
#[derive(Clone)]
pub struct RequestSender(Sender<Command>);

impl RequestSender {
    pub fn send(&self, request: UiRequest) -> Result<()> {
        let command = match request {
            UiRequest::CheckForUpdates => Command::Check(CheckTrigger::Ui),
            UiRequest::QuitAndInstall => Command::QuitAndInstall,
        };
        self.0.send(command).map_err(|_| UpdateError::BridgeClosed)
    }
}

struct Interval {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

impl Interval {
    fn start(every: Duration, commands: Sender<Command>) -> std::io::Result<Self> {
        let (stop, stop_rx) = mpsc::channel::<()>();
        let handle = std::thread::Builder::new()
            .name("native-update-timer".into())
            .spawn(move || loop {
                match stop_rx.recv_timeout(every) {
                    Err(RecvTimeoutError::Timeout) => {
                        if commands.send(Command::Check(CheckTrigger::Timer)).is_err() {
                            break;
                        }
                    }
                    _ => break,
                }
            })?;
        Ok(Self { stop, handle })
    }

    fn stop(self) {
        let _ = self.stop.send(());
        let _ = self.handle.join();
    }
}

/// Shell side of the native update path.
///
/// Owns the worker that talks to the platform updater, the periodic timer and
/// the global shortcut; `shutdown` (or drop) releases all three.
pub struct NativeBridge {
    commands: Sender<Command>,
    worker: Option<JoinHandle<()>>,
    timer: Option<Interval>,
    shortcuts: Box<dyn ShortcutRegistry>,
}

impl NativeBridge {
    pub fn start(
        updater: Arc<dyn NativeUpdater>,
        options: BridgeOptions,
        mut shortcuts: Box<dyn ShortcutRegistry>,
    ) -> Result<(Self, UiPort)> {
        let (commands, command_rx) = mpsc::channel();
        let (to_ui, messages) = mpsc::channel();

        let worker = std::thread::Builder::new()
            .name("native-updater".into())
            .spawn(move || run_worker(updater, command_rx, to_ui))?;

        let timer = match options.check_interval {
            Some(every) => Some(Interval::start(every, commands.clone())?),
            None => None,
        };

        if let Some(accelerator) = options.check_shortcut.as_deref() {
            let trigger = commands.clone();
            let registered = shortcuts.register(
                accelerator,
                Box::new(move || {
                    let _ = trigger.send(Command::Check(CheckTrigger::Shortcut));
                }),
            );
            if let Err(e) = registered {
                log::warn!("[Bridge] Update shortcut unavailable: {}", e);
            }
        }

        if options.check_on_start {
            let _ = commands.send(Command::Check(CheckTrigger::Startup));
        }

        let port = UiPort {
            requests: RequestSender(commands.clone()),
            messages,
        };
        let bridge = Self {
            commands,
            worker: Some(worker),
            timer,
            shortcuts,
        };
        Ok((bridge, port))
    }

    /// Stop the timer, unregister shortcuts and wait for the worker
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.stop();
        }
        self.shortcuts.unregister_all();
        if let Some(worker) = self.worker.take() {
            let _ = self.commands.send(Command::Shutdown);
            let _ = worker.join();
            log::info!("[Bridge] Stopped");
        }
    }
}

impl Drop for NativeBridge {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker(updater: Arc<dyn NativeUpdater>, commands: Receiver<Command>, to_ui: Sender<ShellMessage>) {
    let forward = |msg: ShellMessage| {
        log::debug!("[Bridge] -> {}", msg.channel());
        if to_ui.send(msg).is_err() {
            log::debug!("[Bridge] UI side is gone, message dropped");
        }
    };

    for command in commands {
        match command {
            Command::Check(trigger) => {
                log::info!("[Bridge] Update check ({:?})", trigger);
                if let Err(e) = updater.check_for_updates(trigger, &forward) {
                    log::warn!("[Bridge] Update check failed: {}", e);
                    forward(ShellMessage::UpdateError(e.to_string()));
                }
            }
            Command::QuitAndInstall => {
                if let Err(e) = updater.quit_and_install() {
                    log::error!("[Bridge] Install failed: {}", e);
                    forward(ShellMessage::UpdateError(e.to_string()));
                }
            }
            Command::Shutdown => break,
        }
    }
}

/// Where the shell's automatic download stands, as seen from the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ShellDownload {
    #[default]
    None,
    /// Announced as available; the shell is fetching the installer
    Pending,
    Ready,
    Failed,
    /// No installer for this platform; the user was sent to the release page
    ReleasePage,
}

#[derive(Default)]
struct ClientState {
    latest: Option<UpdateInfo>,
    download: ShellDownload,
    checking: bool,
    last_check: Option<DateTime<Utc>>,
}

struct ClientShared {
    current_version: String,
    state: Mutex<ClientState>,
    listeners: Listeners,
}

impl ClientShared {
    fn apply(&self, message: ShellMessage) {
        let events = {
            let mut state = self.state.lock();
            state.checking = false;
            match message {
                ShellMessage::UpdateAvailable(info) => {
                    state.last_check = Some(Utc::now());
                    state.download = ShellDownload::Pending;
                    let event = UpdateEvent::UpdateAvailable {
                        current_version: self.current_version.clone(),
                        latest_version: info.version.clone(),
                        update_url: info.release_url.clone(),
                        release_notes: info.release_notes.clone(),
                    };
                    state.latest = Some(info);
                    vec![event]
                }
                ShellMessage::UpdateDownloaded(info) => {
                    state.download = ShellDownload::Ready;
                    let version = info.version.clone();
                    state.latest = Some(info);
                    vec![
                        UpdateEvent::UpdateDownloadComplete {
                            version: version.clone(),
                            path: None,
                        },
                        UpdateEvent::UpdateReadyToInstall { version, path: None },
                    ]
                }
                ShellMessage::UpdateReleasePageOpened(info) => {
                    state.download = ShellDownload::ReleasePage;
                    let version = info.version.clone();
                    state.latest = Some(info);
                    vec![UpdateEvent::UpdateDownloadComplete { version, path: None }]
                }
                ShellMessage::UpdateDownloadError(failure) => {
                    state.download = ShellDownload::Failed;
                    vec![UpdateEvent::UpdateDownloadError {
                        version: failure.version,
                        error: failure.error,
                    }]
                }
                ShellMessage::UpdateNotAvailable(info) => {
                    state.last_check = Some(Utc::now());
                    state.download = ShellDownload::None;
                    let event = UpdateEvent::NoUpdateAvailable {
                        current_version: self.current_version.clone(),
                        latest_version: info.version.clone(),
                    };
                    state.latest = Some(info);
                    vec![event]
                }
                ShellMessage::UpdateError(error) => vec![UpdateEvent::UpdateCheckError { error }],
            }
        };
        for event in &events {
            self.listeners.notify(event);
        }
    }
}

/// UI-side `UpdateBackend` that talks to the shell through a `UiPort`
pub struct NativeUpdateClient {
    requests: RequestSender,
    shared: Arc<ClientShared>,
}

impl NativeUpdateClient {
    /// Start pumping shell messages into update events
    pub fn connect(port: UiPort, current_version: &str) -> Result<Self> {
        let shared = Arc::new(ClientShared {
            current_version: current_version.to_string(),
            state: Mutex::new(ClientState::default()),
            listeners: Listeners::new(),
        });

        let pump_shared = Arc::clone(&shared);
        let messages = port.messages;
        // Ends once the bridge worker drops its sender
        std::thread::Builder::new()
            .name("native-update-pump".into())
            .spawn(move || {
                for message in messages {
                    pump_shared.apply(message);
                }
            })?;

        Ok(Self {
            requests: port.requests,
            shared,
        })
    }
}

impl UpdateBackend for NativeUpdateClient {
    fn name(&self) -> &'static str {
        "native"
    }

    fn check_now(&self) {
        self.shared.state.lock().checking = true;
        if let Err(e) = self.requests.send(UiRequest::CheckForUpdates) {
            log::warn!("Cannot reach native updater: {}", e);
            self.shared.state.lock().checking = false;
            self.shared
                .listeners
                .notify(&UpdateEvent::UpdateCheckError { error: e.to_string() });
        }
    }

    fn download_or_install(&self) -> Result<()> {
        let (download, available) = {
            let state = self.shared.state.lock();
            let available = state
                .latest
                .as_ref()
                .is_some_and(|info| version_newer(&info.version, &self.shared.current_version));
            (state.download, available)
        };
        match download {
            ShellDownload::Ready => self.requests.send(UiRequest::QuitAndInstall),
            _ if !available => Err(UpdateError::NoUpdateAvailable),
            // The shell downloads on its own; install becomes possible afterwards
            ShellDownload::Pending => Err(UpdateError::DownloadInProgress),
            // A user-initiated check fetches the installer again (or reopens the page)
            ShellDownload::Failed | ShellDownload::ReleasePage | ShellDownload::None => {
                log::info!("Retrying update download through the shell");
                {
                    let mut state = self.shared.state.lock();
                    state.checking = true;
                    state.download = ShellDownload::Pending;
                }
                let sent = self.requests.send(UiRequest::CheckForUpdates);
                if sent.is_err() {
                    let mut state = self.shared.state.lock();
                    state.checking = false;
                    state.download = download;
                }
                sent
            }
        }
    }

    fn subscribe(&self, listener: Listener) -> Subscription {
        self.shared.listeners.subscribe(listener)
    }

    fn status(&self) -> UpdateStatus {
        let state = self.shared.state.lock();
        let latest_version = state.latest.as_ref().map(|info| info.version.clone());
        UpdateStatus {
            current_version: self.shared.current_version.clone(),
            update_available: latest_version
                .as_deref()
                .is_some_and(|latest| version_newer(latest, &self.shared.current_version)),
            latest_version,
            last_check: state.last_check,
            is_checking: state.checking,
            update_url: state.latest.as_ref().and_then(|info| info.release_url.clone()),
            release_notes: state.latest.as_ref().and_then(|info| info.release_notes.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkeys::ShortcutAction;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const WAIT: Duration = Duration::from_secs(5);

    fn info(version: &str) -> UpdateInfo {
        UpdateInfo {
            version: version.into(),
            release_notes: Some("notes".into()),
            release_url: Some("https://example.com/r".into()),
            release_date: None,
        }
    }

    struct FakeUpdater {
        script: Vec<ShellMessage>,
        fail: bool,
        checks: Mutex<Sender<()>>,
        installs: AtomicUsize,
    }

    impl FakeUpdater {
        fn new(script: Vec<ShellMessage>) -> (Arc<Self>, Receiver<()>) {
            let (tx, rx) = mpsc::channel();
            let updater = Arc::new(Self {
                script,
                fail: false,
                checks: Mutex::new(tx),
                installs: AtomicUsize::new(0),
            });
            (updater, rx)
        }
    }

    impl NativeUpdater for FakeUpdater {
        fn check_for_updates(&self, _trigger: CheckTrigger, emit: &dyn Fn(ShellMessage)) -> Result<()> {
            let _ = self.checks.lock().send(());
            if self.fail {
                return Err(UpdateError::Timeout);
            }
            for msg in &self.script {
                emit(msg.clone());
            }
            Ok(())
        }

        fn quit_and_install(&self) -> Result<()> {
            self.installs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Keeps registered actions so tests can "press" them
    #[derive(Clone, Default)]
    struct FakeShortcuts {
        actions: Arc<Mutex<Vec<(String, ShortcutAction)>>>,
        unregistered: Arc<AtomicUsize>,
    }

    impl FakeShortcuts {
        fn press(&self, accelerator: &str) {
            for (accel, action) in self.actions.lock().iter() {
                if accel == accelerator {
                    action();
                }
            }
        }
    }

    impl ShortcutRegistry for FakeShortcuts {
        fn register(&mut self, accelerator: &str, action: ShortcutAction) -> Result<()> {
            self.actions.lock().push((accelerator.to_string(), action));
            Ok(())
        }

        fn unregister_all(&mut self) {
            self.actions.lock().clear();
            self.unregistered.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn options() -> BridgeOptions {
        BridgeOptions {
            check_on_start: false,
            check_interval: None,
            check_shortcut: Some("Ctrl+Alt+U".into()),
        }
    }

    #[test]
    fn startup_check_is_relayed_to_ui() {
        let script = vec![
            ShellMessage::UpdateAvailable(info("4.6.0")),
            ShellMessage::UpdateDownloaded(info("4.6.0")),
        ];
        let (updater, checks) = FakeUpdater::new(script.clone());
        let opts = BridgeOptions { check_on_start: true, ..options() };
        let (bridge, port) = NativeBridge::start(updater, opts, Box::new(FakeShortcuts::default())).unwrap();

        checks.recv_timeout(WAIT).unwrap();
        assert_eq!(port.messages.recv_timeout(WAIT).unwrap(), script[0]);
        assert_eq!(port.messages.recv_timeout(WAIT).unwrap(), script[1]);
        bridge.shutdown();
    }

    #[test]
    fn ui_requests_reach_the_updater() {
        let (updater, checks) = FakeUpdater::new(Vec::new());
        let (bridge, port) =
            NativeBridge::start(updater.clone(), options(), Box::new(FakeShortcuts::default())).unwrap();

        port.requests.send(UiRequest::CheckForUpdates).unwrap();
        checks.recv_timeout(WAIT).unwrap();

        port.requests.send(UiRequest::QuitAndInstall).unwrap();
        bridge.shutdown();
        assert_eq!(updater.installs.load(Ordering::SeqCst), 1);
        assert!(matches!(
            port.requests.send(UiRequest::CheckForUpdates),
            Err(UpdateError::BridgeClosed)
        ));
    }

    #[test]
    fn shortcut_and_timer_trigger_checks() {
        let (updater, checks) = FakeUpdater::new(Vec::new());
        let shortcuts = FakeShortcuts::default();
        let opts = BridgeOptions {
            check_interval: Some(Duration::from_millis(20)),
            ..options()
        };
        let (bridge, _port) = NativeBridge::start(updater, opts, Box::new(shortcuts.clone())).unwrap();

        // Timer ticks
        checks.recv_timeout(WAIT).unwrap();
        checks.recv_timeout(WAIT).unwrap();

        shortcuts.press("Ctrl+Alt+U");
        checks.recv_timeout(WAIT).unwrap();

        bridge.shutdown();
        assert_eq!(shortcuts.unregistered.load(Ordering::SeqCst), 1);
        assert!(shortcuts.actions.lock().is_empty());
    }

    #[test]
    fn failed_check_is_reported_and_bridge_keeps_running() {
        let (tx, checks) = mpsc::channel();
        let updater = Arc::new(FakeUpdater {
            script: Vec::new(),
            fail: true,
            checks: Mutex::new(tx),
            installs: AtomicUsize::new(0),
        });
        let (bridge, port) = NativeBridge::start(updater, options(), Box::new(FakeShortcuts::default())).unwrap();

        for _ in 0..2 {
            port.requests.send(UiRequest::CheckForUpdates).unwrap();
            checks.recv_timeout(WAIT).unwrap();
            assert!(matches!(
                port.messages.recv_timeout(WAIT).unwrap(),
                ShellMessage::UpdateError(msg) if !msg.is_empty()
            ));
        }
        drop(bridge);
    }

    #[test]
    fn client_turns_messages_into_events() {
        let script = vec![
            ShellMessage::UpdateAvailable(info("4.6.0")),
            ShellMessage::UpdateDownloaded(info("4.6.0")),
        ];
        let (updater, _checks) = FakeUpdater::new(script);
        let (bridge, port) =
            NativeBridge::start(updater.clone(), options(), Box::new(FakeShortcuts::default())).unwrap();
        let client = NativeUpdateClient::connect(port, "4.5.1").unwrap();

        assert!(matches!(client.download_or_install(), Err(UpdateError::NoUpdateAvailable)));

        let (event_tx, event_rx) = mpsc::channel::<UpdateEvent>();
        let event_tx = Mutex::new(event_tx);
        let _sub = client.subscribe(Arc::new(move |event: &UpdateEvent| {
            let _ = event_tx.lock().send(event.clone());
        }));

        client.check_now();
        let kinds: Vec<&str> = (0..3)
            .map(|_| event_rx.recv_timeout(WAIT).unwrap().kind())
            .collect();
        assert_eq!(
            kinds,
            ["UPDATE_AVAILABLE", "UPDATE_DOWNLOAD_COMPLETE", "UPDATE_READY_TO_INSTALL"]
        );

        let status = client.status();
        assert!(status.update_available);
        assert!(!status.is_checking);
        assert_eq!(status.latest_version.as_deref(), Some("4.6.0"));

        client.download_or_install().unwrap();
        bridge.shutdown();
        assert_eq!(updater.installs.load(Ordering::SeqCst), 1);
    }

    fn record(client: &NativeUpdateClient) -> (Receiver<UpdateEvent>, Subscription) {
        let (event_tx, event_rx) = mpsc::channel::<UpdateEvent>();
        let event_tx = Mutex::new(event_tx);
        let sub = client.subscribe(Arc::new(move |event: &UpdateEvent| {
            let _ = event_tx.lock().send(event.clone());
        }));
        (event_rx, sub)
    }

    #[test]
    fn failed_shell_download_can_be_retried() {
        let script = vec![
            ShellMessage::UpdateAvailable(info("4.6.0")),
            ShellMessage::UpdateDownloadError(DownloadFailure {
                version: "4.6.0".into(),
                error: "connection reset".into(),
            }),
        ];
        let (updater, checks) = FakeUpdater::new(script);
        let (bridge, port) =
            NativeBridge::start(updater.clone(), options(), Box::new(FakeShortcuts::default())).unwrap();
        let client = NativeUpdateClient::connect(port, "4.5.1").unwrap();
        let (events, _sub) = record(&client);

        client.check_now();
        checks.recv_timeout(WAIT).unwrap();
        assert_eq!(events.recv_timeout(WAIT).unwrap().kind(), "UPDATE_AVAILABLE");
        match events.recv_timeout(WAIT).unwrap() {
            UpdateEvent::UpdateDownloadError { version, error } => {
                assert_eq!(version, "4.6.0");
                assert_eq!(error, "connection reset");
            }
            other => panic!("unexpected event {other:?}"),
        }

        // Not stuck in "already downloading": Download asks the shell to fetch again
        client.download_or_install().unwrap();
        checks.recv_timeout(WAIT).unwrap();
        assert_eq!(events.recv_timeout(WAIT).unwrap().kind(), "UPDATE_AVAILABLE");
        assert_eq!(events.recv_timeout(WAIT).unwrap().kind(), "UPDATE_DOWNLOAD_ERROR");

        bridge.shutdown();
        assert_eq!(updater.installs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn release_page_fallback_completes_without_install() {
        let script = vec![
            ShellMessage::UpdateAvailable(info("4.6.0")),
            ShellMessage::UpdateReleasePageOpened(info("4.6.0")),
        ];
        let (updater, checks) = FakeUpdater::new(script);
        let (bridge, port) =
            NativeBridge::start(updater.clone(), options(), Box::new(FakeShortcuts::default())).unwrap();
        let client = NativeUpdateClient::connect(port, "4.5.1").unwrap();
        let (events, _sub) = record(&client);

        client.check_now();
        checks.recv_timeout(WAIT).unwrap();
        assert_eq!(events.recv_timeout(WAIT).unwrap().kind(), "UPDATE_AVAILABLE");
        assert_eq!(
            events.recv_timeout(WAIT).unwrap(),
            UpdateEvent::UpdateDownloadComplete { version: "4.6.0".into(), path: None }
        );

        // Download reopens the page through the shell instead of installing
        client.download_or_install().unwrap();
        checks.recv_timeout(WAIT).unwrap();
        bridge.shutdown();
        assert_eq!(updater.installs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn pending_shell_download_reports_in_progress() {
        let (updater, checks) = FakeUpdater::new(vec![ShellMessage::UpdateAvailable(info("4.6.0"))]);
        let (bridge, port) =
            NativeBridge::start(updater, options(), Box::new(FakeShortcuts::default())).unwrap();
        let client = NativeUpdateClient::connect(port, "4.5.1").unwrap();
        let (events, _sub) = record(&client);

        client.check_now();
        checks.recv_timeout(WAIT).unwrap();
        events.recv_timeout(WAIT).unwrap();
        assert!(matches!(client.download_or_install(), Err(UpdateError::DownloadInProgress)));
        bridge.shutdown();
    }

    #[test]
    fn client_reports_closed_bridge_as_check_error() {
        let (updater, _checks) = FakeUpdater::new(Vec::new());
        let (bridge, port) = NativeBridge::start(updater, options(), Box::new(FakeShortcuts::default())).unwrap();
        let client = NativeUpdateClient::connect(port, "4.5.1").unwrap();
        bridge.shutdown();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = client.subscribe(Arc::new(move |event: &UpdateEvent| sink.lock().push(event.kind())));
        client.check_now();
        assert_eq!(*seen.lock(), vec!["UPDATE_CHECK_ERROR"]);
        assert!(!client.status().is_checking);
    }

    #[test]
    fn messages_use_channel_names() {
        let json = serde_json::to_value(ShellMessage::UpdateDownloaded(info("4.6.0"))).unwrap();
        assert_eq!(json["channel"], "update-downloaded");
        assert_eq!(json["payload"]["version"], "4.6.0");
        assert_eq!(json["payload"]["releaseNotes"], "notes");
        assert_eq!(ShellMessage::UpdateError("x".into()).channel(), "update-error");

        let failure = ShellMessage::UpdateDownloadError(DownloadFailure {
            version: "4.6.0".into(),
            error: "offline".into(),
        });
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["channel"], failure.channel());
        assert_eq!(json["channel"], "update-download-error");
        assert_eq!(json["payload"]["error"], "offline");

        let parse = |raw: &str| serde_json::from_str::<UiRequest>(raw).ok();
        assert_eq!(parse(r#""check-for-updates""#), Some(UiRequest::CheckForUpdates));
        assert_eq!(parse(r#""quit-and-install""#), Some(UiRequest::QuitAndInstall));
        assert_eq!(parse(r#""open-devtools""#), None);
    }
}
