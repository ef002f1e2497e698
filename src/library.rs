//! Asset discovery.
//!
//! [`VideoLibrary::scan`] lists a directory (non-recursive), keeps regular
//! files whose extension is one of [`VIDEO_EXTENSIONS`], shuffles them and
//! probes each through an [`AssetProber`] until `max_videos` assets have been
//! accepted. Files that cannot be probed are skipped with a warning and files
//! shorter than the minimum playable duration are dropped quietly.
//!
//! Progress is reported through [`ScanProgress`] so the binary can draw a
//! bar while library callers stay silent.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use rand::{Rng, seq::SliceRandom};

use crate::{
    asset::{AssetInfo, VideoAsset},
    config::PlayerConfig,
    error::PlaybackError,
};

/// File extensions (lower-case) treated as video files.
pub const VIDEO_EXTENSIONS: [&str; 4] = ["mov", "mp4", "avi", "mkv"];

/// Reads stream facts from a candidate file.
pub trait AssetProber {
    /// # Errors
    ///
    /// Any error marks the file as unplayable; the scan skips it.
    fn probe(&self, path: &Path) -> Result<AssetInfo, PlaybackError>;
}

/// Scan progress callbacks. All methods default to no-ops.
pub trait ScanProgress {
    /// Called once with the number of candidate files found.
    fn on_start(&self, _candidates: usize) {}

    /// Called after each candidate has been probed, accepted or not.
    fn on_probed(&self, _path: &Path, _accepted: bool) {}

    /// Called once when the scan stops.
    fn on_finish(&self, _accepted: usize) {}
}

/// A [`ScanProgress`] that reports nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoScanProgress;

impl ScanProgress for NoScanProgress {}

/// Filters applied while scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Assets shorter than this many seconds are rejected.
    pub min_duration_secs: u64,
    /// Stop after accepting this many assets. `None` accepts all.
    pub max_videos: Option<usize>,
}

impl ScanOptions {
    /// Minimum duration follows the shortest segment the player would cut.
    pub fn from_config(config: &PlayerConfig) -> Self {
        Self {
            min_duration_secs: config.min_interval(),
            max_videos: config.max_videos(),
        }
    }
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self::from_config(&PlayerConfig::default())
    }
}

/// The set of playable assets found by a scan.
#[derive(Debug, Clone)]
pub struct VideoLibrary {
    directory: PathBuf,
    assets: Vec<Arc<VideoAsset>>,
}

impl VideoLibrary {
    /// Scan `directory` for playable videos.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::IoError`] if the directory cannot be read and
    /// [`PlaybackError::NoAssets`] if nothing playable was found.
    pub fn scan<P, R>(
        directory: P,
        options: &ScanOptions,
        prober: &dyn AssetProber,
        progress: &dyn ScanProgress,
        rng: &mut R,
    ) -> Result<Self, PlaybackError>
    where
        P: AsRef<Path>,
        R: Rng,
    {
        let directory = directory.as_ref().to_path_buf();
        let mut candidates = candidate_files(&directory)?;
        candidates.shuffle(rng);

        log::info!(
            "Found {} candidate files in {}",
            candidates.len(),
            directory.display()
        );
        progress.on_start(candidates.len());

        let limit = options.max_videos.unwrap_or(usize::MAX);
        let mut assets = Vec::new();

        for path in candidates {
            if assets.len() >= limit {
                break;
            }
            let accepted = match probe_asset(&path, options, prober) {
                Ok(Some(asset)) => {
                    log::debug!(
                        "Accepted {} ({}s, {:.2} fps)",
                        path.display(),
                        asset.duration_secs(),
                        asset.native_fps()
                    );
                    assets.push(Arc::new(asset));
                    true
                }
                Ok(None) => false,
                Err(error) => {
                    log::warn!("Error processing {}: {error}", path.display());
                    false
                }
            };
            progress.on_probed(&path, accepted);
        }

        progress.on_finish(assets.len());

        if assets.is_empty() {
            return Err(PlaybackError::NoAssets { directory });
        }
        log::info!("Loaded {} videos", assets.len());

        Ok(Self { directory, assets })
    }

    /// Build a library from already-probed assets.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::NoAssets`] if `assets` is empty.
    pub fn from_assets(
        directory: impl Into<PathBuf>,
        assets: Vec<VideoAsset>,
    ) -> Result<Self, PlaybackError> {
        let directory = directory.into();
        if assets.is_empty() {
            return Err(PlaybackError::NoAssets { directory });
        }
        Ok(Self {
            directory,
            assets: assets.into_iter().map(Arc::new).collect(),
        })
    }

    /// Directory the assets came from.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Accepted assets, in scan order.
    pub fn assets(&self) -> &[Arc<VideoAsset>] {
        &self.assets
    }

    /// Number of accepted assets.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Always `false` for a library built by `scan` or `from_assets`.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Sum of all asset durations, in seconds.
    pub fn total_duration_secs(&self) -> u64 {
        self.assets.iter().map(|asset| asset.duration_secs()).sum()
    }
}

/// `true` if `path` ends in one of [`VIDEO_EXTENSIONS`], ignoring case.
pub fn has_video_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| {
            VIDEO_EXTENSIONS
                .iter()
                .any(|known| extension.eq_ignore_ascii_case(known))
        })
}

/// Regular files with a video extension, sorted by path.
fn candidate_files(directory: &Path) -> Result<Vec<PathBuf>, PlaybackError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        let path = entry.path();
        if !has_video_extension(&path) {
            continue;
        }
        match entry.file_type() {
            Ok(file_type) if file_type.is_file() => files.push(path),
            Ok(_) => {}
            Err(error) => log::warn!("Error processing {}: {error}", path.display()),
        }
    }
    files.sort();
    Ok(files)
}

fn probe_asset(
    path: &Path,
    options: &ScanOptions,
    prober: &dyn AssetProber,
) -> Result<Option<VideoAsset>, PlaybackError> {
    let info = prober.probe(path)?;
    if info.duration_secs < options.min_duration_secs {
        log::debug!(
            "Skipping {}: {}s is shorter than {}s",
            path.display(),
            info.duration_secs,
            options.min_duration_secs
        );
        return Ok(None);
    }
    let file_size_bytes = fs::metadata(path)?.len();
    Ok(Some(VideoAsset::new(path, info, file_size_bytes)))
}
