use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use crossbeam_channel::Receiver;
use indicatif::{ProgressBar, ProgressStyle};
use reelshuffle::{
    FfmpegLogLevel, FfmpegOpener, FfmpegProber, MonotonicClock, PlayerConfig, PlayerEvent,
    ScanOptions, ScanProgress, SegmentScheduler, VideoLibrary, WindowRenderer,
    config::{DEFAULT_MAX_INTERVAL, DEFAULT_MIN_INTERVAL, DEFAULT_TARGET_FPS},
};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  reelshuffle play ~/Videos\n  reelshuffle play ~/Videos --min 10 --max 20 --fps 30\n  reelshuffle scan ~/Videos --json\n  reelshuffle completions zsh > _reelshuffle\n\nKeys during playback:\n  S        skip to the next segment\n  Q / Esc  quit";

#[derive(Debug, Parser)]
#[command(
    name = "reelshuffle",
    version,
    about = "Play random segments of the videos in a directory",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone)]
struct GlobalOptions {
    /// Show debug logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, global = true, default_value = "error")]
    ffmpeg_log_level: FfmpegLogLevel,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Open a window and shuffle through a directory of videos.
    #[command(
        about = "Play random video segments",
        after_help = "Examples:\n  reelshuffle play ~/Videos\n  reelshuffle play . --max-videos 20 --width 1920 --height 1080"
    )]
    Play {
        /// Directory containing the videos.
        #[arg(default_value = ".")]
        directory: PathBuf,

        /// Shortest segment, in seconds.
        #[arg(long, default_value_t = DEFAULT_MIN_INTERVAL)]
        min: u64,

        /// Longest segment, in seconds.
        #[arg(long, default_value_t = DEFAULT_MAX_INTERVAL)]
        max: u64,

        /// Load at most this many videos.
        #[arg(long)]
        max_videos: Option<usize>,

        /// Playback frame rate.
        #[arg(long, default_value_t = DEFAULT_TARGET_FPS)]
        fps: f64,

        /// Initial window width.
        #[arg(long, default_value_t = 1280)]
        width: u32,

        /// Initial window height.
        #[arg(long, default_value_t = 720)]
        height: u32,
    },

    /// List the videos that would be played.
    #[command(
        about = "Scan a directory for playable videos",
        after_help = "Examples:\n  reelshuffle scan ~/Videos\n  reelshuffle scan ~/Videos --min 60 --json"
    )]
    Scan {
        /// Directory containing the videos.
        #[arg(default_value = ".")]
        directory: PathBuf,

        /// Skip videos shorter than this many seconds.
        #[arg(long, default_value_t = DEFAULT_MIN_INTERVAL)]
        min: u64,

        /// Stop after this many videos.
        #[arg(long)]
        max_videos: Option<usize>,

        /// Output the library as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    #[command(
        about = "Generate shell completions",
        after_help = "Examples:\n  reelshuffle completions bash > reelshuffle.bash\n  reelshuffle completions zsh > _reelshuffle"
    )]
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn apply_global_options(global: &GlobalOptions) {
    let default_filter = if global.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
    reelshuffle::set_ffmpeg_log_level(global.ffmpeg_log_level);
}

/// Terminal progress bar for the library scan.
struct TerminalScanProgress {
    bar: ProgressBar,
}

impl TerminalScanProgress {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(0);
        let style =
            ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }
}

impl ScanProgress for TerminalScanProgress {
    fn on_start(&self, candidates: usize) {
        self.bar.set_length(candidates as u64);
    }

    fn on_probed(&self, path: &Path, _accepted: bool) {
        if let Some(name) = path.file_name() {
            self.bar.set_message(name.to_string_lossy().into_owned());
        }
        self.bar.inc(1);
    }

    fn on_finish(&self, accepted: usize) {
        self.bar
            .finish_with_message(format!("{accepted} playable videos"));
    }
}

fn scan_library(
    directory: &Path,
    options: &ScanOptions,
) -> Result<VideoLibrary, Box<dyn std::error::Error>> {
    let progress = TerminalScanProgress::new()?;
    let library = VideoLibrary::scan(
        directory,
        options,
        &FfmpegProber,
        &progress,
        &mut rand::rng(),
    )?;
    Ok(library)
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    apply_global_options(&cli.global);

    match cli.command {
        Commands::Play {
            directory,
            min,
            max,
            max_videos,
            fps,
            width,
            height,
        } => {
            let config = PlayerConfig::new()
                .with_intervals(min, max)
                .with_target_fps(fps)
                .with_max_videos(max_videos)
                .with_initial_window_size(width, height);
            config.validate()?;

            let library = scan_library(&directory, &ScanOptions::from_config(&config))?;
            if library.len() < 2 {
                eprintln!(
                    "{} {}",
                    "warning:".yellow().bold(),
                    "only one video found; every segment will come from it".yellow()
                );
            }

            let size = config.initial_window_size();
            let session = move |mut renderer: WindowRenderer, mut events: Receiver<PlayerEvent>| {
                let clock = MonotonicClock::new();
                let mut scheduler = SegmentScheduler::new(
                    &library,
                    &config,
                    Arc::new(FfmpegOpener),
                    rand::rng(),
                    &clock,
                );
                scheduler.run(&mut renderer, &mut events)
            };
            let summary = reelshuffle::run_window("reelshuffle", size, session)?;

            println!(
                "Played {} segments ({} frames): {} completed, {} skipped, {} stalled, {} failed",
                summary.segments,
                summary.frames_rendered,
                summary.completed,
                summary.skipped,
                summary.stalled,
                summary.failed
            );
        }
        Commands::Scan {
            directory,
            min,
            max_videos,
            json,
        } => {
            let options = ScanOptions {
                min_duration_secs: min,
                max_videos,
            };
            let library = scan_library(&directory, &options)?;

            if json {
                let payload = json!({
                    "directory": library.directory().display().to_string(),
                    "total_duration_seconds": library.total_duration_secs(),
                    "videos": library.assets().iter().map(|asset| json!({
                        "path": asset.path().display().to_string(),
                        "duration_seconds": asset.duration_secs(),
                        "fps": asset.native_fps(),
                        "width": asset.frame_size().0,
                        "height": asset.frame_size().1,
                        "size_bytes": asset.file_size_bytes(),
                    })).collect::<Vec<_>>(),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                for asset in library.assets() {
                    let (width, height) = asset.frame_size();
                    println!(
                        "{}  {}s  {}x{}  {:.2} fps  {:.2} MB",
                        asset.file_name().bold(),
                        asset.duration_secs(),
                        width,
                        height,
                        asset.native_fps(),
                        asset.file_size_mb()
                    );
                }
                println!(
                    "{} videos, {} total",
                    library.len(),
                    reelshuffle::format_clock(Duration::from_secs(library.total_duration_secs()))
                );
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "reelshuffle", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}
