//! One guidance session: the body of the evaluation loop.
//!
//! Each evaluated tick runs zone -> alignment -> decision -> scheduler
//! synchronously and returns at most one instruction for the caller to hand to
//! the announcement queue. Nothing here blocks on playback.
//!
//! Frames held back by the rate limit or frame skip are not evaluated: the
//! scheduler only sees ticks where the detector actually ran.

use std::time::{Duration, Instant};

use crate::align::{analyze, Detection};
use crate::announce::SpokenInstruction;
use crate::detect::{DetectorBackend, TrackedObjectFilter};
use crate::error::{GuidanceError, GuidanceResult};
use crate::frame::Frame;
use crate::guidance::{decide, GuidanceState, Observation};
use crate::phrase::PhraseBook;
use crate::scheduler::{InstructionScheduler, SchedulerSettings};
use crate::zone::{FrameDimensions, TargetZone, ZoneRatios};

#[derive(Clone, Debug, PartialEq)]
pub struct SessionSettings {
    pub ratios: ZoneRatios,
    pub scheduler: SchedulerSettings,
    /// Minimum time between detector runs while the object is being held.
    pub detection_interval: Duration,
    /// Run the detector on every Nth frame only.
    pub frame_skip: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            ratios: ZoneRatios::default(),
            scheduler: SchedulerSettings::default(),
            detection_interval: Duration::from_millis(500),
            frame_skip: 1,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub ticks: u64,
    pub detector_runs: u64,
    pub detections: u64,
    pub invalid_boxes: u64,
    pub detector_errors: u64,
    pub announcements: u64,
}

/// Outcome of one tick.
#[derive(Clone, Debug, PartialEq)]
pub struct TickReport {
    pub detector_ran: bool,
    pub detection: Option<Detection>,
    /// `None` when the frame was not evaluated.
    pub candidate: Option<GuidanceState>,
    pub announcement: Option<SpokenInstruction>,
}

pub struct GuidanceSession {
    settings: SessionSettings,
    zone: TargetZone,
    scheduler: InstructionScheduler,
    phrases: PhraseBook,
    last_hit: Option<Instant>,
    stats: SessionStats,
}

impl GuidanceSession {
    pub fn new(
        settings: SessionSettings,
        phrases: PhraseBook,
        frame: FrameDimensions,
        start: Instant,
    ) -> GuidanceResult<Self> {
        if settings.frame_skip == 0 {
            return Err(GuidanceError::config("frame_skip", "must be >= 1"));
        }
        if settings.detection_interval >= settings.scheduler.no_detection_timeout {
            return Err(GuidanceError::config(
                "detection_interval",
                format!(
                    "{}ms must be shorter than no_detection_timeout {}ms",
                    settings.detection_interval.as_millis(),
                    settings.scheduler.no_detection_timeout.as_millis()
                ),
            ));
        }
        let zone = TargetZone::compute(frame, &settings.ratios)?;
        log::info!(
            "target zone {}x{} at ({}, {}) in {}x{} frame, tolerance ±{}px/±{}px, size band {:.2}..{:.2}",
            zone.target_w,
            zone.target_h,
            zone.target_x,
            zone.target_y,
            frame.width,
            frame.height,
            zone.position_threshold_x,
            zone.position_threshold_y,
            zone.min_size_ratio,
            zone.max_size_ratio
        );
        Ok(Self {
            scheduler: InstructionScheduler::new(settings.scheduler, start),
            settings,
            zone,
            phrases,
            last_hit: None,
            stats: SessionStats::default(),
        })
    }

    pub fn zone(&self) -> &TargetZone {
        &self.zone
    }

    pub fn scheduler(&self) -> &InstructionScheduler {
        &self.scheduler
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Recompute the target zone for new frame dimensions.
    pub fn resize(&mut self, frame: FrameDimensions) -> GuidanceResult<()> {
        if frame == self.zone.frame {
            return Ok(());
        }
        self.zone = TargetZone::compute(frame, &self.settings.ratios)?;
        log::info!(
            "frame resized to {}x{}; target zone now {}x{} at ({}, {})",
            frame.width,
            frame.height,
            self.zone.target_w,
            self.zone.target_h,
            self.zone.target_x,
            self.zone.target_y
        );
        Ok(())
    }

    /// Whether the detector should run on frame `frame_index` at `now`.
    pub fn should_run_detector(&self, frame_index: u64, now: Instant) -> bool {
        if frame_index % u64::from(self.settings.frame_skip) != 0 {
            return false;
        }
        match self.last_hit {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.settings.detection_interval,
        }
    }

    /// Process one captured frame: resize if needed, then run the detector and
    /// evaluate when the rate limit allows. Otherwise the detector is told to
    /// skip the frame and nothing is evaluated.
    ///
    /// Detector failures are logged and the tick is treated as a tick without
    /// detection. Only a frame with unusable dimensions is an error.
    pub fn process_frame(
        &mut self,
        frame: &Frame,
        detector: &mut dyn DetectorBackend,
        filter: &TrackedObjectFilter,
        now: Instant,
    ) -> GuidanceResult<TickReport> {
        self.resize(frame.dimensions()?)?;

        if !self.should_run_detector(frame.index, now) {
            self.stats.ticks += 1;
            if let Err(err) = detector.skip(frame) {
                self.stats.detector_errors += 1;
                log::warn!(
                    "detector {} failed to skip frame {}: {}",
                    detector.name(),
                    frame.index,
                    err
                );
            }
            return Ok(TickReport {
                detector_ran: false,
                detection: None,
                candidate: None,
                announcement: None,
            });
        }

        self.stats.detector_runs += 1;
        let detection = match detector.detect(frame) {
            Ok(detections) => filter.select(&detections),
            Err(err) => {
                self.stats.detector_errors += 1;
                log::warn!(
                    "detector {} failed on frame {}: {}",
                    detector.name(),
                    frame.index,
                    err
                );
                None
            }
        };
        Ok(self.evaluate_inner(detection, now))
    }

    /// Evaluate one tick given this tick's detection (already filtered to the
    /// tracked class), bypassing the detector and its rate limit.
    pub fn evaluate(&mut self, detection: Option<Detection>, now: Instant) -> TickReport {
        self.evaluate_inner(detection, now)
    }

    fn evaluate_inner(&mut self, detection: Option<Detection>, now: Instant) -> TickReport {
        self.stats.ticks += 1;

        let observation = match detection {
            None => Observation::NoDetection,
            Some(det) => match analyze(&det, &self.zone, self.zone.frame_center()) {
                Ok(features) => {
                    self.stats.detections += 1;
                    self.last_hit = Some(now);
                    Observation::Detected(features)
                }
                Err(err) => {
                    self.stats.invalid_boxes += 1;
                    log::warn!("skipping detection: {}", err);
                    Observation::NoDetection
                }
            },
        };

        let candidate = decide(&observation, &self.zone);
        if let Observation::Detected(features) = observation {
            log::debug!(
                "offset=({}, {}) size_ratio={:.3} -> {}",
                features.offset_x,
                features.offset_y,
                features.size_ratio,
                candidate
            );
        }

        let announcement = self.scheduler.tick(candidate, now).map(|ann| {
            self.stats.announcements += 1;
            SpokenInstruction {
                sequence: ann.sequence,
                state: ann.state,
                phrase: self.phrases.phrase(ann.state).to_string(),
            }
        });

        TickReport {
            detector_ran: true,
            detection: match observation {
                Observation::Detected(_) => detection,
                Observation::NoDetection => None,
            },
            candidate: Some(candidate),
            announcement,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{ScriptStep, ScriptedBackend};
    use crate::phrase::Language;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn session(start: Instant) -> GuidanceSession {
        GuidanceSession::new(
            SessionSettings::default(),
            PhraseBook::new(Language::English),
            FrameDimensions::new(1280, 720).unwrap(),
            start,
        )
        .unwrap()
    }

    #[test]
    fn small_box_announces_closer_with_phrase() {
        let t0 = Instant::now();
        let mut session = session(t0);
        let report = session.evaluate(Some(Detection::new(100, 100, 300, 300, 0.9)), t0);
        assert_eq!(report.candidate, Some(GuidanceState::Closer));
        let instruction = report.announcement.expect("announced");
        assert_eq!(instruction.phrase, "closer");
        assert_eq!(instruction.sequence, 1);
    }

    #[test]
    fn invalid_box_is_treated_as_missing_detection() {
        let t0 = Instant::now();
        let mut session = session(t0);
        let report = session.evaluate(Some(Detection::new(300, 300, 100, 100, 0.9)), t0);
        assert_eq!(report.candidate, Some(GuidanceState::NoObject));
        assert!(report.detection.is_none());
        assert!(report.announcement.is_none());
        assert_eq!(session.stats().invalid_boxes, 1);
        assert_eq!(session.stats().detections, 0);
    }

    #[test]
    fn detector_is_rate_limited_while_object_held() {
        let t0 = Instant::now();
        let mut session = session(t0);
        assert!(session.should_run_detector(0, t0));
        session.evaluate(Some(Detection::new(205, 72, 1075, 648, 0.9)), t0);
        assert!(!session.should_run_detector(1, t0 + ms(100)));
        assert!(!session.should_run_detector(4, t0 + ms(499)));
        assert!(session.should_run_detector(5, t0 + ms(500)));
    }

    #[test]
    fn frame_skip_limits_detector_to_every_nth_frame() {
        let t0 = Instant::now();
        let session = GuidanceSession::new(
            SessionSettings {
                frame_skip: 5,
                ..SessionSettings::default()
            },
            PhraseBook::default(),
            FrameDimensions::new(640, 480).unwrap(),
            t0,
        )
        .unwrap();
        let runs: Vec<u64> = (0..12).filter(|i| session.should_run_detector(*i, t0)).collect();
        assert_eq!(runs, vec![0, 5, 10]);
    }

    #[test]
    fn zero_frame_skip_is_a_config_error() {
        let result = GuidanceSession::new(
            SessionSettings {
                frame_skip: 0,
                ..SessionSettings::default()
            },
            PhraseBook::default(),
            FrameDimensions::new(640, 480).unwrap(),
            Instant::now(),
        );
        assert!(matches!(
            result,
            Err(GuidanceError::Config { param: "frame_skip", .. })
        ));
    }

    #[test]
    fn process_frame_recomputes_zone_on_resize() {
        let t0 = Instant::now();
        let mut session = session(t0);
        let mut detector = ScriptedBackend::new(vec![ScriptStep::absent(10)], 1);
        let filter = TrackedObjectFilter::default();

        let frame = Frame::blank(640, 480, 0);
        session
            .process_frame(&frame, &mut detector, &filter, t0)
            .unwrap();
        assert_eq!(session.zone().frame, FrameDimensions::new(640, 480).unwrap());
        assert_eq!(session.zone().target_w, 435);

        let bad = Frame::blank(0, 480, 1);
        assert!(session
            .process_frame(&bad, &mut detector, &filter, t0)
            .is_err());
    }

    #[test]
    fn held_object_is_not_lost_between_sparse_detector_runs() {
        let t0 = Instant::now();
        let mut session = GuidanceSession::new(
            SessionSettings {
                frame_skip: 50,
                ..SessionSettings::default()
            },
            PhraseBook::new(Language::English),
            FrameDimensions::new(1280, 720).unwrap(),
            t0,
        )
        .unwrap();
        let mut detector = ScriptedBackend::new(
            vec![ScriptStep::present(200, [205.0, 72.0, 1075.0, 648.0])],
            1,
        );
        let filter = TrackedObjectFilter::default();

        let mut announced = Vec::new();
        for index in 0..200u64 {
            let frame = Frame::blank(1280, 720, index);
            let report = session
                .process_frame(&frame, &mut detector, &filter, t0 + ms(100 * index))
                .unwrap();
            if !report.detector_ran {
                assert_eq!(report.candidate, None);
            }
            if let Some(instruction) = report.announcement {
                announced.push((index, instruction.state));
            }
        }
        assert_eq!(announced, vec![(0, GuidanceState::Perfect)]);
        assert_eq!(session.stats().detector_runs, 4);
        assert_eq!(session.stats().ticks, 200);
    }

    #[test]
    fn detection_interval_must_be_shorter_than_timeout() {
        let result = GuidanceSession::new(
            SessionSettings {
                detection_interval: ms(3000),
                ..SessionSettings::default()
            },
            PhraseBook::default(),
            FrameDimensions::new(640, 480).unwrap(),
            Instant::now(),
        );
        assert!(matches!(
            result,
            Err(GuidanceError::Config { param: "detection_interval", .. })
        ));
    }

    #[test]
    fn bad_frame_leaves_session_usable() {
        let t0 = Instant::now();
        let mut session = session(t0);
        let mut detector = ScriptedBackend::new(
            vec![ScriptStep::present(3, [205.0, 72.0, 1075.0, 648.0])],
            1,
        );
        let filter = TrackedObjectFilter::default();

        let first = session
            .process_frame(&Frame::blank(1280, 720, 0), &mut detector, &filter, t0)
            .unwrap();
        assert_eq!(first.candidate, Some(GuidanceState::Perfect));

        let bad = Frame::blank(0, 720, 1);
        assert!(session
            .process_frame(&bad, &mut detector, &filter, t0 + ms(500))
            .is_err());

        let next = session
            .process_frame(&Frame::blank(1280, 720, 2), &mut detector, &filter, t0 + ms(1000))
            .unwrap();
        assert_eq!(next.candidate, Some(GuidanceState::Perfect));
        assert!(next.announcement.is_none());
        assert_eq!(session.zone().frame, FrameDimensions::new(1280, 720).unwrap());
    }

    #[test]
    fn process_frame_filters_other_classes() {
        let t0 = Instant::now();
        let mut session = session(t0);
        let mut detector = ScriptedBackend::new(
            vec![ScriptStep::present(1, [205.0, 72.0, 1075.0, 648.0])],
            1,
        );
        let filter = TrackedObjectFilter::default();
        let report = session
            .process_frame(&Frame::blank(1280, 720, 0), &mut detector, &filter, t0)
            .unwrap();
        assert!(report.detector_ran);
        assert_eq!(report.candidate, Some(GuidanceState::Perfect));
        assert_eq!(session.stats().detector_runs, 1);
    }
}
