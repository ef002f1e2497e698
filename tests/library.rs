//! Library scan tests over a temporary directory.

mod common;

use std::{
    fs,
    path::Path,
    sync::{Mutex, PoisonError},
};

use rand::{SeedableRng, rngs::StdRng};
use reelshuffle::{NoScanProgress, PlaybackError, ScanOptions, ScanProgress, VideoLibrary};

use common::MockProber;

fn touch(directory: &Path, name: &str, bytes: usize) {
    fs::write(directory.join(name), vec![0_u8; bytes]).expect("write fixture file");
}

fn options(min_duration_secs: u64, max_videos: Option<usize>) -> ScanOptions {
    ScanOptions {
        min_duration_secs,
        max_videos,
    }
}

fn names(library: &VideoLibrary) -> Vec<String> {
    let mut names: Vec<String> = library.assets().iter().map(|asset| asset.file_name()).collect();
    names.sort();
    names
}

#[test]
fn scan_keeps_only_video_extensions() {
    let directory = tempfile::tempdir().unwrap();
    touch(directory.path(), "a.mp4", 10);
    touch(directory.path(), "b.MKV", 10);
    touch(directory.path(), "c.avi", 10);
    touch(directory.path(), "d.mov", 10);
    touch(directory.path(), "notes.txt", 10);
    touch(directory.path(), "mp4", 10);
    fs::create_dir(directory.path().join("folder.mp4")).unwrap();

    let prober = MockProber::default()
        .with("a.mp4", 60)
        .with("b.MKV", 60)
        .with("c.avi", 60)
        .with("d.mov", 60)
        .with("notes.txt", 60)
        .with("mp4", 60)
        .with("folder.mp4", 60);

    let library = VideoLibrary::scan(
        directory.path(),
        &options(30, None),
        &prober,
        &NoScanProgress,
        &mut StdRng::seed_from_u64(1),
    )
    .unwrap();

    assert_eq!(names(&library), ["a.mp4", "b.MKV", "c.avi", "d.mov"]);
    assert_eq!(library.directory(), directory.path());
}

#[test]
fn scan_skips_short_and_unreadable_files() {
    let directory = tempfile::tempdir().unwrap();
    touch(directory.path(), "long.mp4", 2048);
    touch(directory.path(), "short.mp4", 10);
    touch(directory.path(), "broken.mp4", 10);

    let prober = MockProber::default()
        .with("long.mp4", 120)
        .with("short.mp4", 29);

    let library = VideoLibrary::scan(
        directory.path(),
        &options(30, None),
        &prober,
        &NoScanProgress,
        &mut StdRng::seed_from_u64(1),
    )
    .unwrap();

    assert_eq!(names(&library), ["long.mp4"]);
    let asset = &library.assets()[0];
    assert_eq!(asset.duration_secs(), 120);
    assert_eq!(asset.file_size_bytes(), 2048);
    assert_eq!(library.total_duration_secs(), 120);
}

#[test]
fn minimum_duration_is_inclusive() {
    let directory = tempfile::tempdir().unwrap();
    touch(directory.path(), "exact.mp4", 10);
    let prober = MockProber::default().with("exact.mp4", 30);

    let library = VideoLibrary::scan(
        directory.path(),
        &options(30, None),
        &prober,
        &NoScanProgress,
        &mut StdRng::seed_from_u64(1),
    )
    .unwrap();
    assert_eq!(library.len(), 1);
}

#[test]
fn scan_stops_at_max_videos() {
    let directory = tempfile::tempdir().unwrap();
    let mut prober = MockProber::default();
    for index in 0..10 {
        let name = format!("clip{index}.mp4");
        touch(directory.path(), &name, 10);
        prober = prober.with(&name, 45);
    }

    let library = VideoLibrary::scan(
        directory.path(),
        &options(30, Some(3)),
        &prober,
        &NoScanProgress,
        &mut StdRng::seed_from_u64(1),
    )
    .unwrap();
    assert_eq!(library.len(), 3);
}

#[test]
fn max_videos_picks_a_random_subset() {
    let directory = tempfile::tempdir().unwrap();
    let mut prober = MockProber::default();
    for index in 0..20 {
        let name = format!("clip{index:02}.mp4");
        touch(directory.path(), &name, 10);
        prober = prober.with(&name, 45);
    }

    let subsets: Vec<Vec<String>> = (0..5)
        .map(|seed| {
            let library = VideoLibrary::scan(
                directory.path(),
                &options(30, Some(3)),
                &prober,
                &NoScanProgress,
                &mut StdRng::seed_from_u64(seed),
            )
            .unwrap();
            names(&library)
        })
        .collect();

    assert!(subsets.iter().any(|subset| subset != &subsets[0]));
}

#[test]
fn empty_directory_has_no_assets() {
    let directory = tempfile::tempdir().unwrap();
    touch(directory.path(), "readme.md", 10);

    let result = VideoLibrary::scan(
        directory.path(),
        &options(30, None),
        &MockProber::default(),
        &NoScanProgress,
        &mut StdRng::seed_from_u64(1),
    );
    assert!(matches!(result, Err(PlaybackError::NoAssets { .. })));
}

#[test]
fn missing_directory_is_an_io_error() {
    let directory = tempfile::tempdir().unwrap();
    let missing = directory.path().join("nope");

    let result = VideoLibrary::scan(
        &missing,
        &options(30, None),
        &MockProber::default(),
        &NoScanProgress,
        &mut StdRng::seed_from_u64(1),
    );
    assert!(matches!(result, Err(PlaybackError::IoError(_))));
}

#[derive(Default)]
struct CountingProgress {
    events: Mutex<Vec<String>>,
}

impl CountingProgress {
    fn push(&self, event: String) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl ScanProgress for CountingProgress {
    fn on_start(&self, candidates: usize) {
        self.push(format!("start {candidates}"));
    }

    fn on_probed(&self, _path: &Path, accepted: bool) {
        self.push(format!("probed {accepted}"));
    }

    fn on_finish(&self, accepted: usize) {
        self.push(format!("finish {accepted}"));
    }
}

#[test]
fn progress_reports_each_probe() {
    let directory = tempfile::tempdir().unwrap();
    touch(directory.path(), "good.mp4", 10);
    touch(directory.path(), "bad.mp4", 10);
    let prober = MockProber::default().with("good.mp4", 60);
    let progress = CountingProgress::default();

    VideoLibrary::scan(
        directory.path(),
        &options(30, None),
        &prober,
        &progress,
        &mut StdRng::seed_from_u64(1),
    )
    .unwrap();

    let mut events = progress.events.into_inner().unwrap();
    assert_eq!(events.first().map(String::as_str), Some("start 2"));
    assert_eq!(events.last().map(String::as_str), Some("finish 1"));
    events.sort();
    assert_eq!(events, ["finish 1", "probed false", "probed true", "start 2"]);
}

#[test]
fn from_assets_rejects_empty_list() {
    let result = VideoLibrary::from_assets("/videos", Vec::new());
    assert!(matches!(result, Err(PlaybackError::NoAssets { .. })));
}
