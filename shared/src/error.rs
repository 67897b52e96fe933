use thiserror::Error;

/// Errors raised by update checks, downloads and installs
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("release endpoint returned HTTP {0}")]
    Status(u16),

    #[error("request timed out")]
    Timeout,

    #[error("invalid release metadata: {0}")]
    InvalidResponse(#[from] serde_json::Error),

    #[error("release has no version tag")]
    MissingTag,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no update is available")]
    NoUpdateAvailable,

    #[error("an update download is already in progress")]
    DownloadInProgress,

    #[error("release {0} has no installer for this platform")]
    NoInstallerAsset(String),

    #[error("periodic update check is already running")]
    PeriodicCheckActive,

    #[error("install failed: {0}")]
    Install(String),

    #[error("shortcut error: {0}")]
    Shortcut(String),

    #[error("update bridge is closed")]
    BridgeClosed,
}

impl From<ureq::Error> for UpdateError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(code, _) => UpdateError::Status(code),
            ureq::Error::Transport(transport) => {
                let timed_out = std::error::Error::source(&transport)
                    .and_then(|source| source.downcast_ref::<std::io::Error>())
                    .is_some_and(|io| {
                        matches!(
                            io.kind(),
                            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
                        )
                    });
                if timed_out {
                    UpdateError::Timeout
                } else {
                    UpdateError::Request(transport.to_string())
                }
            }
        }
    }
}

/// Convenience Result type using our Error
pub type Result<T> = std::result::Result<T, UpdateError>;
