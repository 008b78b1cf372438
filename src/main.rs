mod annotations;
mod core;
mod decoder;
mod shared;
mod utils;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

use crate::annotations::{AnnotationEdit, AnnotationStore};
use crate::core::catalog;
use crate::core::export::{self, ReviewExporter};
use crate::core::extractor::{EncodeOptions, ExtractionEvent};
use crate::core::session::{ExtractionRequest, SessionManager};
use crate::core::worker;
use crate::decoder::{FrameSource, VideoDecoder};
use crate::shared::constants;
use crate::shared::error::Error;
use crate::shared::settings::Settings;
use crate::utils::time_utils;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file (`key = value` lines)
    #[arg(short, long, global = true, default_value = constants::CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List videos in the data folder with their metadata
    Videos,
    /// Report whether a video has an annotation file
    CheckCsv { video: String },
    /// Print every annotation of a video
    Annotations { video: String },
    /// Extract one frame per annotated touch
    Extract { video: String },
    /// Extract an evenly sampled timeline that includes every touch
    Timeline {
        video: String,
        /// Frames per second to sample (defaults to the configured rate)
        #[arg(short, long)]
        rate: Option<f64>,
    },
    /// Save the current session's frames to the review folder
    Save,
    /// Zip every working frame into one archive
    ExportZip {
        /// Archive path (defaults to extracted_frames_<stamp>.zip)
        output: Option<PathBuf>,
    },
    /// Empty the working frame folder
    Cleanup {
        /// Discard unsaved frames
        #[arg(short, long, default_value_t = false)]
        force: bool,
    },
    /// Add a touch at a 1-based frame number
    AddTouch {
        video: String,
        frame: u32,
        #[arg(short, long, default_value = constants::DEFAULT_BODY_PART)]
        body_part: String,
    },
    /// Move a touch to another frame
    MoveTouch { video: String, from: u32, to: u32 },
    /// Delete the touch at a frame
    RemoveTouch { video: String, frame: u32 },
    /// Apply a JSON list of edits ({"op": "upsert", ...} / {"op": "delete", "frame_number": N})
    SaveEdits { video: String, edits: PathBuf },
    /// Write a single frame (0-based index) to a JPEG file
    Frame { video: String, index: i64, output: PathBuf },
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn video_path(settings: &Settings, video: &str) -> Result<PathBuf> {
    let path = settings.data_dir.join(video);
    if !path.is_file() {
        return Err(Error::source_unavailable(&path, "video file not found").into());
    }
    Ok(path)
}

fn current_fps(settings: &Settings, video: &str) -> Result<f64> {
    let decoder = VideoDecoder::open(&video_path(settings, video)?)?;
    Ok(decoder.metadata().fps)
}

fn run_extraction(settings: &Settings, video: &str, timeline_rate: Option<f64>) -> Result<()> {
    let store = AnnotationStore::new(&settings.csv_dir, &settings.backup_dir);
    let request = ExtractionRequest {
        video_filename: video.to_string(),
        video_path: settings.data_dir.join(video),
        annotations_path: store.csv_path(video),
    };
    let options = EncodeOptions {
        frame_quality: settings.frame_quality,
        preview_quality: settings.preview_quality,
    };

    let mut sessions = SessionManager::open(&settings.frames_dir, &settings.session_file)?;
    if let Some(previous) = sessions.current().filter(|s| !s.saved) {
        eprintln!(
            "warning: unsaved frames of session {} will be discarded",
            previous.session_id
        );
    }

    let extraction = match timeline_rate {
        Some(rate) => sessions.extract_timeline(&request, rate, options, VideoDecoder::open),
        None => sessions.extract_touches(&request, options, VideoDecoder::open),
    };

    let (sender, receiver) = crossbeam_channel::bounded(16);
    let handle = worker::spawn_extraction(extraction, sender);

    let mut outcome = None;
    for event in receiver.iter() {
        match event {
            ExtractionEvent::Progress {
                current,
                total,
                frame_number,
            } => eprintln!("[{current}/{total}] frame {frame_number}"),
            ExtractionEvent::Complete(summary) => outcome = Some(Ok(summary)),
            ExtractionEvent::Failed(e) => outcome = Some(Err(e)),
        }
    }
    if handle.join().is_err() {
        anyhow::bail!("extraction thread panicked");
    }

    match outcome {
        Some(Ok(summary)) => print_json(&summary),
        Some(Err(e)) => Err(e).context(format!("extraction of {video} failed")),
        None => anyhow::bail!("extraction of {video} ended without a result"),
    }
}

fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    crate::utils::logger::init(&settings.log_dir);

    let store = AnnotationStore::new(&settings.csv_dir, &settings.backup_dir);

    match &cli.command {
        Commands::Videos => {
            let videos = catalog::list_videos(&settings.data_dir, &store, |path| {
                VideoDecoder::open(path).map(|decoder| decoder.metadata())
            })?;
            print_json(&videos)?;
        }
        Commands::CheckCsv { video } => {
            print_json(&catalog::check_annotations(&store, video)?)?;
        }
        Commands::Annotations { video } => {
            let set = store.load(video)?;
            print_json(&set.records())?;
        }
        Commands::Extract { video } => {
            run_extraction(&settings, video, None)?;
        }
        Commands::Timeline { video, rate } => {
            run_extraction(&settings, video, Some(rate.unwrap_or(settings.timeline_rate)))?;
        }
        Commands::Save => {
            let mut sessions = SessionManager::open(&settings.frames_dir, &settings.session_file)?;
            let receipt = ReviewExporter::new(&settings.reviewed_dir).save(&mut sessions)?;
            print_json(&receipt)?;
        }
        Commands::ExportZip { output } => {
            let archive = output
                .clone()
                .unwrap_or_else(|| PathBuf::from(format!("extracted_frames_{}.zip", time_utils::archive_stamp())));
            print_json(&export::archive_frames(&settings.frames_dir, &archive)?)?;
        }
        Commands::Cleanup { force } => {
            let mut sessions = SessionManager::open(&settings.frames_dir, &settings.session_file)?;
            let removed = sessions.cleanup(*force)?;
            println!("removed {removed} frame file(s)");
        }
        Commands::AddTouch {
            video,
            frame,
            body_part,
        } => {
            let fps = current_fps(&settings, video)?;
            let (record, report) = store.add_touch(video, *frame, body_part, fps)?;
            print_json(&serde_json::json!({ "touch": record, "report": report }))?;
        }
        Commands::MoveTouch { video, from, to } => {
            let fps = current_fps(&settings, video)?;
            let (record, report) = store.move_touch(video, *from, *to, fps)?;
            print_json(&serde_json::json!({ "touch": record, "fps": fps, "report": report }))?;
        }
        Commands::RemoveTouch { video, frame } => {
            print_json(&store.remove_touch(video, *frame)?)?;
        }
        Commands::SaveEdits { video, edits } => {
            let edits = read_edits(edits)?;
            print_json(&store.save_edits(video, &edits)?)?;
        }
        Commands::Frame {
            video,
            index,
            output,
        } => {
            let mut decoder = VideoDecoder::open(&video_path(&settings, video)?)?;
            let preview = catalog::preview_frame(&mut decoder, *index, settings.single_frame_quality)?;
            fs::write(output, &preview.jpeg)
                .with_context(|| format!("failed to write {}", output.display()))?;
            print_json(&preview)?;
        }
    }

    Ok(())
}

fn read_edits(path: &Path) -> Result<Vec<AnnotationEdit>> {
    let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("malformed edit list in {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let result = run(cli);
    if let Err(e) = &result {
        crate::utils::logger::error(&format!("{:#}", e));
    }
    result
}
