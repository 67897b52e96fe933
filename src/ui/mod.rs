// Console front end: header, update modal and toast driven by an update backend

pub mod header;
pub mod notification;
pub mod prompt;

use std::io::{BufRead, Write};
use std::sync::Arc;

use assetdesk_shared::{Subscription, UpdateBackend, UpdateError, UpdateEvent};

use header::HeaderBadge;
use notification::UpdateNotification;
use prompt::UpdatePrompt;

const HELP: &str = "\
Commands:
  check      Check for updates now
  download   Download the available update
  install    Restart and install a downloaded update
  status     Show updater status
  dismiss    Close the update prompt and toast
  help       Show this list
  quit       Exit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Everything that draws
pub struct Screen {
    pub header: HeaderBadge,
    pub prompt: UpdatePrompt,
    pub notification: UpdateNotification,
}

impl Screen {
    pub fn render(&self) -> Vec<String> {
        let mut lines = vec![self.header.render()];
        lines.extend(self.prompt.render());
        if let Some(toast) = self.notification.render() {
            lines.push(format!("* {toast}"));
        }
        lines
    }
}

pub struct Console {
    backend: Arc<dyn UpdateBackend>,
    screen: Arc<Screen>,
    _redraw: Option<Subscription>,
}

impl Console {
    /// Mount the presenters. With `redraw` set, every update event reprints the screen.
    pub fn mount(backend: Arc<dyn UpdateBackend>, just_updated: bool, redraw: bool) -> Self {
        let screen = Arc::new(Screen {
            header: HeaderBadge::mount(backend.as_ref()),
            prompt: UpdatePrompt::mount(Arc::clone(&backend)),
            notification: UpdateNotification::mount(Arc::clone(&backend), just_updated),
        });

        // Registered after the presenters so they have already applied the event
        let redraw = redraw.then(|| {
            let weak = Arc::downgrade(&screen);
            backend.subscribe(Arc::new(move |event: &UpdateEvent| {
                log::debug!("[Update] redraw after {}", event.kind());
                if let Some(screen) = weak.upgrade() {
                    let mut out = std::io::stdout().lock();
                    for line in screen.render() {
                        let _ = writeln!(out, "{line}");
                    }
                }
            }))
        });

        Self {
            backend,
            screen,
            _redraw: redraw,
        }
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    /// Run one command, writing its output to `out`
    pub fn handle(&self, line: &str, out: &mut dyn Write) -> std::io::Result<Flow> {
        match line.trim().to_ascii_lowercase().as_str() {
            "" => {}
            "check" => {
                self.screen.prompt.check_again();
                writeln!(out, "Checking for updates...")?;
            }
            "download" => match self.screen.prompt.download() {
                Ok(()) => writeln!(out, "Update download started.")?,
                Err(UpdateError::DownloadInProgress) => {
                    writeln!(out, "The update is already downloading.")?
                }
                Err(e) => writeln!(out, "Cannot download: {e}")?,
            },
            "install" => match self.screen.notification.install() {
                Ok(()) => writeln!(out, "Installing update...")?,
                Err(e) => writeln!(out, "Cannot install: {e}")?,
            },
            "status" => {
                let status = self.backend.status();
                match serde_json::to_string_pretty(&status) {
                    Ok(json) => writeln!(out, "{json}")?,
                    Err(e) => writeln!(out, "Cannot show status: {e}")?,
                }
            }
            "dismiss" => {
                self.screen.prompt.dismiss();
                self.screen.notification.dismiss();
            }
            "help" | "?" => writeln!(out, "{HELP}")?,
            "quit" | "exit" => return Ok(Flow::Quit),
            other => writeln!(out, "Unknown command '{other}'. Type `help`.")?,
        }
        Ok(Flow::Continue)
    }

    /// Read commands until `quit` or end of input
    pub fn run(&self, input: impl BufRead, out: &mut dyn Write) -> std::io::Result<()> {
        for line in self.screen.render() {
            writeln!(out, "{line}")?;
        }
        writeln!(out, "Type `help` for commands.")?;

        for line in input.lines() {
            if self.handle(&line?, out)? == Flow::Quit {
                break;
            }
        }
        log::info!("Console closed ({} updates)", self.backend.name());
        Ok(())
    }
}
