//! demo - scripted end-to-end run of the book alignment guidance loop
//!
//! Walks a synthetic book through every instruction (absent, too far, too
//! close, off-centre, aligned, absent again) and prints what was announced.
//! By default the clock is simulated, so the run finishes immediately.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::time::{Duration, Instant};

use booktracker::detect::{ScriptedBackend, TrackedObjectFilter};
use booktracker::ingest::{FrameSource, SourceSettings, SyntheticSource};
use booktracker::{
    AnnouncementQueue, GuidanceSession, Language, LogAnnouncer, PhraseBook, RecordingAnnouncer,
    SessionSettings, SpokenInstruction, TargetZone,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Seconds each scripted step lasts.
    #[arg(long, default_value_t = 4)]
    seconds_per_step: u32,
    /// Frames per second for the synthetic source.
    #[arg(long, default_value_t = 10)]
    fps: u32,
    /// Frame width in pixels.
    #[arg(long, default_value_t = 1280)]
    width: u32,
    /// Frame height in pixels.
    #[arg(long, default_value_t = 720)]
    height: u32,
    /// Probability that the detector misses the book on a given frame.
    #[arg(long, default_value_t = 0.0)]
    flicker: f64,
    /// Seed for the flicker.
    #[arg(long, default_value_t = 7)]
    seed: u64,
    /// Phrase language: bilingual, thai or english.
    #[arg(long, default_value = "english")]
    language: String,
    /// Run at wall-clock speed and log announcements as they happen.
    #[arg(long)]
    realtime: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    if args.fps == 0 {
        return Err(anyhow!("fps must be >= 1"));
    }
    let language: Language = args.language.parse()?;

    stage("open synthetic source");
    let mut source = SyntheticSource::new(SourceSettings {
        url: "stub://demo".to_string(),
        width: args.width,
        height: args.height,
        target_fps: args.fps,
    });
    source.connect()?;
    let first = source.next_frame()?;
    let dims = first.dimensions()?;

    let settings = SessionSettings::default();
    let zone = TargetZone::compute(dims, &settings.ratios)?;
    let steps = ScriptedBackend::guided_approach(&zone, args.fps, args.seconds_per_step);
    let mut detector = ScriptedBackend::new(steps, args.seed).with_flicker(args.flicker);
    let total_frames = detector.total_frames();
    let filter = TrackedObjectFilter::default();

    let start = Instant::now();
    let mut session =
        GuidanceSession::new(settings, PhraseBook::new(language), dims, start)?;

    let recorder = RecordingAnnouncer::new();
    let queue = if args.realtime {
        AnnouncementQueue::spawn(LogAnnouncer)?
    } else {
        AnnouncementQueue::spawn(recorder.clone())?
    };

    stage("run guidance loop");
    let frame_interval = Duration::from_millis(1000 / u64::from(args.fps));
    let mut timeline: Vec<(Duration, SpokenInstruction)> = Vec::new();
    let mut next = Some(first);
    for index in 0..total_frames {
        let frame = match next.take() {
            Some(frame) => frame,
            None => source.next_frame()?,
        };
        let now = if args.realtime {
            Instant::now()
        } else {
            start + frame_interval * index as u32
        };
        let report = session.process_frame(&frame, &mut detector, &filter, now)?;
        if let Some(instruction) = report.announcement {
            timeline.push((now.saturating_duration_since(start), instruction.clone()));
            queue.submit(instruction)?;
            if !args.realtime {
                // Simulated time has no playback duration.
                queue.wait_idle(Duration::from_secs(1))?;
            }
        }
        if args.realtime {
            std::thread::sleep(frame_interval);
        }
    }

    queue.wait_idle(Duration::from_secs(10))?;
    let queue_stats = queue.shutdown()?;
    let session_stats = session.stats();

    println!("demo summary:");
    println!(
        "  target zone: {}x{} at ({}, {}) in {}x{}",
        zone.target_w, zone.target_h, zone.target_x, zone.target_y, dims.width, dims.height
    );
    println!("  frames processed: {}", total_frames);
    println!("  detector runs: {}", session_stats.detector_runs);
    println!("  detections: {}", session_stats.detections);
    println!(
        "  announcements: {} (played {}, dropped {}, failed {})",
        session_stats.announcements, queue_stats.played, queue_stats.dropped, queue_stats.failed
    );
    println!("timeline:");
    for (at, instruction) in &timeline {
        println!(
            "  {:>6.1}s  #{:<3} {:<10} {}",
            at.as_secs_f64(),
            instruction.sequence,
            instruction.state.key(),
            instruction.phrase
        );
    }
    if !args.realtime && recorder.announced().len() != timeline.len() {
        return Err(anyhow!(
            "announcer played {} of {} instructions",
            recorder.announced().len(),
            timeline.len()
        ));
    }
    Ok(())
}

fn stage(msg: &str) {
    eprintln!("demo: {}", msg);
}
