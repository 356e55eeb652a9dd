//! noVNC asset bundle provisioning
//!
//! Guarantees that a pinned noVNC release is extracted under the per-user
//! cache directory. The bundle is downloaded and unpacked on first use only:
//! once the marker file exists the directory is treated as complete and is
//! never re-validated. A new version string means a new directory; old
//! versions are left in place.

use std::fs;
use std::future::Future;
use std::io::{self, Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::info;
use zip::ZipArchive;

use crate::error::{Error, Result};

/// noVNC release pinned by this build.
pub const NOVNC_VERSION: &str = "1.5.0";

/// File whose presence marks a bundle as fully extracted.
pub const MARKER_FILE: &str = "vnc.html";

/// Top-level folder name inside the release archive, `<BUNDLE_NAME>-<version>`.
const BUNDLE_NAME: &str = "noVNC";

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// URL of the versioned release archive on GitHub.
pub fn release_url(version: &str) -> String {
    format!("https://github.com/novnc/noVNC/archive/refs/tags/v{version}.zip")
}

/// Per-user cache root for extracted bundles.
///
/// Uses the platform cache-directory convention, falling back to
/// `~/.cache/webvnc` when it is unavailable.
pub fn default_cache_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".cache")
        })
        .join("webvnc")
}

/// Ensure noVNC `version` is extracted under `cache_root` and return the
/// directory containing `vnc.html`.
///
/// A cache hit performs no I/O beyond the existence check.
pub async fn ensure_bundle(cache_root: &Path, version: &str) -> Result<PathBuf> {
    ensure_bundle_with(cache_root, version, || fetch_archive(release_url(version))).await
}

/// Provisioning core with the fetch step injected, so callers (and tests)
/// control where the archive bytes come from.
async fn ensure_bundle_with<F, Fut>(cache_root: &Path, version: &str, fetch: F) -> Result<PathBuf>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<u8>>>,
{
    let target = cache_root.join(format!("{BUNDLE_NAME}-{version}"));
    if target.join(MARKER_FILE).exists() {
        return Ok(target);
    }

    fs::create_dir_all(cache_root)?;

    info!(version, "downloading noVNC");
    let bytes = fetch().await?;

    info!(bytes = bytes.len(), "extracting noVNC");
    extract_bundle(&bytes, version, &target)?;

    if !target.join(MARKER_FILE).exists() {
        return Err(Error::Provisioning(format!(
            "{MARKER_FILE} not found after extraction"
        )));
    }
    Ok(target)
}

async fn fetch_archive(url: String) -> Result<Vec<u8>> {
    let client = reqwest::Client::builder()
        .timeout(DOWNLOAD_TIMEOUT)
        .build()
        .map_err(|e| Error::Provisioning(format!("http client setup failed: {e}")))?;

    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| Error::Provisioning(format!("download from {url} failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::Provisioning(format!(
            "download from {url} failed with status {status}"
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::Provisioning(format!("download from {url} failed: {e}")))?;
    Ok(bytes.to_vec())
}

/// Unpack every archive member nested under the bundle's root folder into
/// `target`, preserving relative paths and file bytes verbatim.
fn extract_bundle(bytes: &[u8], version: &str, target: &Path) -> Result<()> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| Error::Provisioning(format!("failed to open archive: {e}")))?;

    let root = find_root_folder(&mut archive, version).ok_or_else(|| {
        Error::Provisioning("archive has no recognizable root folder".to_string())
    })?;
    let prefix = format!("{root}/");

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| Error::Provisioning(format!("failed to read archive entry: {e}")))?;
        let Some(rel) = file.name().strip_prefix(&prefix) else {
            continue;
        };
        let rel = rel.trim_end_matches('/');
        if rel.is_empty() {
            continue;
        }

        let dest = target.join(rel);
        if file.is_dir() {
            fs::create_dir_all(&dest)?;
        } else {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = fs::File::create(&dest)?;
            io::copy(&mut file, &mut out)?;
        }
    }
    Ok(())
}

/// Locate the archive's single top-level folder.
///
/// Release archives are rooted at `noVNC-<version>/`. If no directory entry
/// carries that suffix, fall back to whichever member path ends with the
/// marker filename and take its top-level segment. The fallback matches on a
/// path suffix, not a full name, so it is not hardened against crafted
/// archives.
fn find_root_folder<R: Read + Seek>(archive: &mut ZipArchive<R>, version: &str) -> Option<String> {
    let suffix = format!("{BUNDLE_NAME}-{version}");
    let names: Vec<String> = archive.file_names().map(str::to_string).collect();

    for name in &names {
        if name.ends_with('/') && name.trim_end_matches('/').ends_with(&suffix) {
            return Some(name.trim_end_matches('/').to_string());
        }
    }
    for name in &names {
        if name.trim_end_matches('/').ends_with(MARKER_FILE) {
            return name.split('/').next().map(str::to_string);
        }
    }
    None
}
