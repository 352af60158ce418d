use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{ObjectDetection, COCO_BOOK_CLASS_ID};
use crate::frame::Frame;
use crate::zone::TargetZone;

const PERSON_CLASS_ID: u32 = 0;
const SCRIPTED_CONFIDENCE: f32 = 0.85;

/// One segment of a scripted run: `frames` frames with the tracked object at
/// `target` (or absent when `None`).
#[derive(Clone, Debug, PartialEq)]
pub struct ScriptStep {
    pub frames: u32,
    pub target: Option<[f32; 4]>,
}

impl ScriptStep {
    pub fn present(frames: u32, target: [f32; 4]) -> Self {
        Self {
            frames,
            target: Some(target),
        }
    }

    pub fn absent(frames: u32) -> Self {
        Self {
            frames,
            target: None,
        }
    }
}

/// Replays a fixed script of boxes, ignoring pixel content.
///
/// The script is keyed by frame index, so skipped or rate-limited frames do
/// not stretch it.
///
/// Every call also reports a confident box of another class, so the class
/// filter is always exercised. With flicker enabled, the tracked box is
/// randomly withheld on some frames, reproducibly for a given seed.
pub struct ScriptedBackend {
    steps: Vec<ScriptStep>,
    flicker: f64,
    looping: bool,
    exhausted: bool,
    rng: StdRng,
}

impl ScriptedBackend {
    pub fn new(mut steps: Vec<ScriptStep>, seed: u64) -> Self {
        steps.retain(|step| step.frames > 0);
        let exhausted = steps.is_empty();
        Self {
            steps,
            flicker: 0.0,
            looping: false,
            exhausted,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Probability in [0, 1] that a present box is withheld on a given frame.
    pub fn with_flicker(mut self, probability: f64) -> Self {
        self.flicker = if probability.is_finite() {
            probability.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self
    }

    /// Restart from the first step instead of going quiet at the end.
    pub fn looping(mut self, enabled: bool) -> Self {
        self.looping = enabled;
        self
    }

    pub fn total_frames(&self) -> u64 {
        self.steps.iter().map(|step| u64::from(step.frames)).sum()
    }

    /// A walk through every instruction: absent, too far, too close, off to
    /// the left, too high, aligned, absent again. Each step lasts
    /// `seconds_per_step` at `fps`.
    pub fn guided_approach(zone: &TargetZone, fps: u32, seconds_per_step: u32) -> Vec<ScriptStep> {
        let frames = fps.saturating_mul(seconds_per_step).max(1);
        let fw = zone.frame.width as f32;
        let fh = zone.frame.height as f32;
        let tx = zone.target_x as f32;
        let ty = zone.target_y as f32;
        let tw = zone.target_w as f32;
        let th = zone.target_h as f32;
        let dx = (zone.position_threshold_x as f32 * 3.0).max(1.0);
        let dy = (zone.position_threshold_y as f32 * 3.0).max(1.0);
        let clamp = |b: [f32; 4]| {
            [
                b[0].clamp(0.0, fw),
                b[1].clamp(0.0, fh),
                b[2].clamp(0.0, fw),
                b[3].clamp(0.0, fh),
            ]
        };

        vec![
            ScriptStep::absent(frames),
            ScriptStep::present(
                frames,
                [fw * 0.4, fh * 0.4, fw * 0.6, fh * 0.6],
            ),
            ScriptStep::present(frames, [0.0, 0.0, fw, fh]),
            ScriptStep::present(frames, clamp([tx - dx, ty, tx + tw - dx, ty + th])),
            ScriptStep::present(frames, clamp([tx, ty - dy, tx + tw, ty + th - dy])),
            ScriptStep::present(frames, [tx, ty, tx + tw, ty + th]),
            ScriptStep::absent(frames),
        ]
    }

    /// Target for frame `index`, or `None` past the end of a finite script.
    fn step_at(&self, index: u64) -> Option<&ScriptStep> {
        let total = self.total_frames();
        if total == 0 || (!self.looping && index >= total) {
            return None;
        }
        let mut offset = index % total;
        for step in &self.steps {
            let frames = u64::from(step.frames);
            if offset < frames {
                return Some(step);
            }
            offset -= frames;
        }
        None
    }
}

impl DetectorBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<ObjectDetection>> {
        if self.exhausted {
            return Ok(Vec::new());
        }
        let target = match self.step_at(frame.index).map(|step| step.target) {
            Some(target) => target,
            None => {
                self.exhausted = true;
                return Ok(Vec::new());
            }
        };
        if !self.looping && frame.index + 1 >= self.total_frames() {
            self.exhausted = true;
        }

        let mut detections = vec![ObjectDetection::new(
            PERSON_CLASS_ID,
            0.9,
            [0.0, 0.0, frame.width as f32 * 0.2, frame.height as f32 * 0.3],
        )];
        if let Some(bbox) = target {
            let withheld = self.flicker > 0.0 && self.rng.gen_bool(self.flicker);
            if !withheld {
                detections.push(ObjectDetection::new(
                    COCO_BOOK_CLASS_ID,
                    SCRIPTED_CONFIDENCE,
                    bbox,
                ));
            }
        }
        Ok(detections)
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}
