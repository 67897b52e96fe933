// Release metadata and artifact downloads against a GitHub-style releases API

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, UpdateError};
use crate::version::strip_tag_prefix;

/// Default release endpoint for AssetDesk builds
pub const DEFAULT_RELEASE_ENDPOINT: &str =
    "https://api.github.com/repos/assetdesk/assetdesk-desktop/releases/latest";

/// Installer suffix looked up in release assets for the running platform
#[cfg(target_os = "windows")]
pub const PLATFORM_ASSET_SUFFIX: &str = ".exe";
#[cfg(target_os = "macos")]
pub const PLATFORM_ASSET_SUFFIX: &str = ".dmg";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub const PLATFORM_ASSET_SUFFIX: &str = ".AppImage";

const USER_AGENT: &str = concat!("AssetDesk-Updater/", env!("CARGO_PKG_VERSION"));

/// A downloadable file attached to a release
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
    #[serde(default)]
    pub size: Option<u64>,
}

/// Latest published release as reported by the release endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseInfo {
    pub tag_name: String,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

impl ReleaseInfo {
    /// Parse the JSON body of a release endpoint response
    pub fn from_json(body: &str) -> Result<Self> {
        let release: ReleaseInfo = serde_json::from_str(body)?;
        if release.version().is_empty() {
            return Err(UpdateError::MissingTag);
        }
        Ok(release)
    }

    /// Version number with the optional leading `v` removed
    pub fn version(&self) -> &str {
        strip_tag_prefix(&self.tag_name)
    }

    /// First asset whose name ends with `suffix`
    pub fn asset_for(&self, suffix: &str) -> Option<&ReleaseAsset> {
        self.assets.iter().find(|a| a.name.ends_with(suffix))
    }
}

/// Where release metadata and artifacts come from.
///
/// `GithubReleases` is the production source; tests substitute fakes.
pub trait ReleaseSource: Send + Sync {
    /// Fetch the latest release metadata
    fn latest_release(&self) -> Result<ReleaseInfo>;

    /// Download `url` into `dest`, reporting `(bytes_so_far, total_if_known)`
    fn download(&self, url: &str, dest: &Path, progress: &mut dyn FnMut(u64, Option<u64>))
        -> Result<()>;

    /// Show a release page to the user
    fn open_release_page(&self, url: &str) -> Result<()> {
        open_url(url)
    }
}

/// Release source backed by a GitHub `releases/latest` endpoint
pub struct GithubReleases {
    endpoint: String,
    metadata: ureq::Agent,
    downloads: ureq::Agent,
}

impl GithubReleases {
    pub fn new(endpoint: &str, request_timeout: Duration, download_timeout: Duration) -> Self {
        let metadata = ureq::AgentBuilder::new()
            .timeout(request_timeout)
            .user_agent(USER_AGENT)
            .build();
        let downloads = ureq::AgentBuilder::new()
            .timeout(download_timeout)
            .user_agent(USER_AGENT)
            .build();
        Self {
            endpoint: endpoint.to_string(),
            metadata,
            downloads,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ReleaseSource for GithubReleases {
    fn latest_release(&self) -> Result<ReleaseInfo> {
        let response = self
            .metadata
            .get(&self.endpoint)
            .set("Accept", "application/vnd.github+json")
            .call()?;
        let body = response.into_string()?;
        ReleaseInfo::from_json(&body)
    }

    fn download(
        &self,
        url: &str,
        dest: &Path,
        progress: &mut dyn FnMut(u64, Option<u64>),
    ) -> Result<()> {
        let response = self.downloads.get(url).call()?;
        let total = response
            .header("Content-Length")
            .and_then(|len| len.parse::<u64>().ok());

        let mut reader = response.into_reader();
        let mut file = File::create(dest)?;
        copy_with_progress(&mut reader, &mut file, total, progress)?;
        file.flush()?;
        Ok(())
    }
}

/// Copy `reader` into `writer` in chunks, reporting progress after each chunk
pub fn copy_with_progress(
    reader: &mut dyn Read,
    writer: &mut dyn Write,
    total: Option<u64>,
    progress: &mut dyn FnMut(u64, Option<u64>),
) -> Result<u64> {
    let mut buf = [0u8; 64 * 1024];
    let mut written: u64 = 0;
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n])?;
        written += n as u64;
        progress(written, total);
    }
    Ok(written)
}

/// Map downloaded bytes to a percentage.
/// Without a known length the estimate is capped at 99 until the download ends.
pub fn progress_percent(downloaded: u64, total: Option<u64>) -> u8 {
    match total {
        Some(total) if total > 0 => ((downloaded * 100) / total).min(100) as u8,
        _ => 99u64.min(downloaded / (1024 * 100)) as u8,
    }
}

/// Open a URL in the default browser (cross-platform)
pub fn open_url(url: &str) -> Result<()> {
    #[cfg(target_os = "windows")]
    let spawned = std::process::Command::new("cmd")
        .args(["/C", "start", "", url])
        .spawn();
    #[cfg(target_os = "macos")]
    let spawned = std::process::Command::new("open").arg(url).spawn();
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    let spawned = std::process::Command::new("xdg-open").arg(url).spawn();

    spawned.map(|_| ()).map_err(UpdateError::from)
}
