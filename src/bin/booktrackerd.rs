//! booktrackerd - book alignment guidance daemon
//!
//! This daemon:
//! 1. Loads configuration from `BOOKTRACKER_CONFIG` and `BOOKTRACKER_*` overrides
//! 2. Pulls frames from the configured source
//! 3. Runs the detector (scripted walk-through, or a JSON-lines feed)
//! 4. Evaluates alignment once per frame and schedules instructions
//! 5. Hands instructions to the announcement queue until Ctrl-C

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use booktracker::detect::{DetectorBackend, JsonLinesBackend, ScriptedBackend};
use booktracker::ingest::open_source;
use booktracker::{AnnouncementQueue, BooktrackerConfig, GuidanceSession, TargetZone};

#[derive(Parser, Debug)]
#[command(author, version, about = "Book alignment guidance daemon")]
struct Args {
    /// Read detections from a JSON-lines feed ("-" for stdin) instead of the
    /// scripted walk-through.
    #[arg(long, env = "BOOKTRACKER_DETECTIONS")]
    detections: Option<String>,
    /// Seconds each step of the scripted walk-through lasts.
    #[arg(long, default_value_t = 4)]
    seconds_per_step: u32,
    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = BooktrackerConfig::load()?;

    let mut source = open_source(&config.source)?;
    source.connect()?;
    let first = source.next_frame()?;
    let dims = first.dimensions()?;

    let mut detector = build_detector(&args, &config, dims)?;
    detector.warm_up()?;

    let start = Instant::now();
    let mut session = GuidanceSession::new(
        config.session_settings(),
        config.phrase_book()?,
        dims,
        start,
    )?;
    let filter = config.filter();
    let queue = AnnouncementQueue::spawn(config.build_announcer()?)?;

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = running.clone();
    ctrlc::set_handler(move || {
        handler_flag.store(false, Ordering::SeqCst);
    })
    .map_err(|e| anyhow!("error setting Ctrl-C handler: {}", e))?;

    log::info!(
        "booktrackerd running. source={} detector={} announcer={}",
        config.source.url,
        detector.name(),
        queue.announcer_name()
    );
    log::info!(
        "cooldown={}ms no_detection_timeout={}ms confidence>{} class={}",
        config.timing.instruction_cooldown.as_millis(),
        config.timing.no_detection_timeout.as_millis(),
        filter.confidence_threshold,
        filter.class_id
    );

    let frame_interval = Duration::from_millis(1000 / u64::from(config.source.target_fps));
    let mut last_health_log = Instant::now();
    let mut next = Some(first);

    while running.load(Ordering::SeqCst) {
        let frame = match next.take() {
            Some(frame) => frame,
            None => match source.next_frame() {
                Ok(frame) => frame,
                Err(err) => {
                    log::warn!("frame capture failed: {}", err);
                    std::thread::sleep(frame_interval);
                    continue;
                }
            },
        };
        let report =
            match session.process_frame(&frame, detector.as_mut(), &filter, Instant::now()) {
                Ok(report) => report,
                Err(err) => {
                    log::warn!("skipping frame {}: {}", frame.index, err);
                    std::thread::sleep(frame_interval);
                    continue;
                }
            };

        if let Some(instruction) = report.announcement {
            if let Err(err) = queue.submit(instruction) {
                log::warn!("announcement not queued: {}", err);
            }
        }

        if last_health_log.elapsed() >= Duration::from_secs(5) {
            let source_stats = source.stats();
            let session_stats = session.stats();
            let queue_stats = queue.stats();
            log::info!(
                "source health={} frames={} detector_runs={} detections={} announcements={} played={} dropped={}",
                source.is_healthy(),
                source_stats.frames_captured,
                session_stats.detector_runs,
                session_stats.detections,
                session_stats.announcements,
                queue_stats.played,
                queue_stats.dropped
            );
            last_health_log = Instant::now();
        }

        if detector.is_exhausted() {
            log::info!("detector {} exhausted, stopping", detector.name());
            break;
        }
        if args.max_frames.is_some_and(|max| frame.index + 1 >= max) {
            break;
        }
        std::thread::sleep(frame_interval);
    }

    log::info!("shutting down, waiting for announcer...");
    if !queue.wait_idle(Duration::from_secs(10))? {
        log::warn!("announcer still busy after 10s");
    }
    let stats = queue.shutdown()?;
    log::info!(
        "announcements submitted={} played={} dropped={} failed={}",
        stats.submitted,
        stats.played,
        stats.dropped,
        stats.failed
    );
    Ok(())
}

fn build_detector(
    args: &Args,
    config: &BooktrackerConfig,
    dims: booktracker::FrameDimensions,
) -> Result<Box<dyn DetectorBackend>> {
    match args.detections.as_deref() {
        Some("-") => {
            let reader: Box<dyn BufRead + Send> = Box::new(BufReader::new(std::io::stdin()));
            Ok(Box::new(JsonLinesBackend::new(reader)))
        }
        Some(path) => {
            let path = PathBuf::from(path);
            let file = File::open(&path)
                .with_context(|| format!("failed to open detections {}", path.display()))?;
            let reader: Box<dyn BufRead + Send> = Box::new(BufReader::new(file));
            Ok(Box::new(JsonLinesBackend::new(reader)))
        }
        None => {
            let zone = TargetZone::compute(dims, &config.ratios)?;
            let steps = ScriptedBackend::guided_approach(
                &zone,
                config.source.target_fps,
                args.seconds_per_step,
            );
            Ok(Box::new(ScriptedBackend::new(steps, 0).looping(true)))
        }
    }
}
