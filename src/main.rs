// AssetDesk update shell: picks an update backend and runs the console front end

mod bridge;
mod hotkeys;
mod ui;
mod updater;

use std::sync::mpsc::{self, Sender};
use std::sync::Arc;

use anyhow::Context;
use assetdesk_shared::config::{self, UpdaterConfig};
use assetdesk_shared::{
    GithubReleases, InAppBackend, Installer, PeriodicCheck, ReleaseSource, UpdateBackend,
    UpdateChecker,
};

use bridge::{BridgeOptions, NativeBridge, NativeUpdateClient};
use updater::{AppExit, ReleaseAutoUpdater, SelfReplaceInstaller, APP_VERSION};

/// Background machinery that must be stopped before exit
enum Runtime {
    Native(NativeBridge),
    InApp(Option<PeriodicCheck>),
}

impl Runtime {
    fn shutdown(self) {
        match self {
            Runtime::Native(bridge) => bridge.shutdown(),
            Runtime::InApp(Some(periodic)) => periodic.stop(),
            Runtime::InApp(None) => {}
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Clean up .old exe from a previous self-update
    updater::cleanup_old_exe();
    let just_updated = updater::was_just_updated();

    let stored = config::load_config();
    if !config::config_path().exists() {
        // Write defaults so the file can be edited by hand
        if let Err(e) = config::save_config(&stored) {
            log::warn!("Could not write default updater config: {}", e);
        }
    }
    let cfg = stored.with_env_overrides();

    let releases = GithubReleases::new(
        &cfg.release_endpoint,
        cfg.request_timeout(),
        cfg.download_timeout(),
    );
    log::info!(
        "AssetDesk v{} starting (updates from {})",
        APP_VERSION,
        releases.endpoint()
    );
    let source: Arc<dyn ReleaseSource> = Arc::new(releases);

    let (exit_tx, exit_rx) = mpsc::channel();
    let installer: Arc<dyn Installer> = Arc::new(
        SelfReplaceInstaller::new(exit_tx.clone()).context("failed to locate the running executable")?,
    );

    // Packaged builds use the shell updater; dev builds keep the in-app checker
    let use_native = cfg.prefer_native && !cfg!(debug_assertions);
    let (backend, runtime) = if use_native {
        start_native(&cfg, source, installer)?
    } else {
        start_in_app(&cfg, source, installer)?
    };
    log::info!("Using {} update backend", backend.name());

    let console = spawn_console(backend, just_updated, exit_tx)?;

    // Either the user quits or an installed update asks for a restart
    let exit = exit_rx.recv().unwrap_or(AppExit::Quit);
    runtime.shutdown();

    match exit {
        AppExit::Quit => console
            .join()
            .map_err(|_| anyhow::anyhow!("console thread panicked"))?,
        AppExit::Restart => {
            // The console may still be blocked on stdin; leaving main ends it
            log::info!("Exiting for update");
            Ok(())
        }
    }
}

fn spawn_console(
    backend: Arc<dyn UpdateBackend>,
    just_updated: bool,
    exit: Sender<AppExit>,
) -> anyhow::Result<std::thread::JoinHandle<anyhow::Result<()>>> {
    let handle = std::thread::Builder::new()
        .name("console".into())
        .spawn(move || {
            let console = ui::Console::mount(backend, just_updated, true);
            let result = console
                .run(std::io::stdin().lock(), &mut std::io::stdout())
                .context("console I/O failed");
            drop(console);
            let _ = exit.send(AppExit::Quit);
            result
        })
        .context("failed to start console")?;
    Ok(handle)
}

fn start_native(
    cfg: &UpdaterConfig,
    source: Arc<dyn ReleaseSource>,
    installer: Arc<dyn Installer>,
) -> anyhow::Result<(Arc<dyn UpdateBackend>, Runtime)> {
    let updater = Arc::new(ReleaseAutoUpdater::new(source, installer));
    let options = BridgeOptions {
        check_on_start: cfg.auto_update,
        check_interval: cfg.auto_update.then(|| cfg.native_check_interval()),
        check_shortcut: Some(cfg.check_shortcut.clone()).filter(|s| !s.trim().is_empty()),
    };
    let (bridge, port) = NativeBridge::start(updater, options, hotkeys::platform_registry())
        .context("failed to start native update bridge")?;
    let client = NativeUpdateClient::connect(port, APP_VERSION)
        .context("failed to connect to native update bridge")?;
    Ok((Arc::new(client), Runtime::Native(bridge)))
}

fn start_in_app(
    cfg: &UpdaterConfig,
    source: Arc<dyn ReleaseSource>,
    installer: Arc<dyn Installer>,
) -> anyhow::Result<(Arc<dyn UpdateBackend>, Runtime)> {
    let checker = Arc::new(UpdateChecker::new(APP_VERSION, source));
    let periodic = if cfg.auto_update {
        Some(
            checker
                .start_periodic_check(cfg.check_interval())
                .context("failed to start periodic update check")?,
        )
    } else {
        log::info!("Automatic update checks disabled");
        None
    };
    let backend = InAppBackend::new(checker, installer);
    Ok((Arc::new(backend), Runtime::InApp(periodic)))
}
