//! Target zone derivation.
//!
//! The target zone is the rectangle, centred in the frame, where the tracked
//! object should sit when it is properly aligned. It is derived once from the
//! frame dimensions and recomputed only when the frame source changes size.

use serde::{Deserialize, Serialize};

use crate::error::{GuidanceError, GuidanceResult};

/// Dimensions of the frames delivered by the frame source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameDimensions {
    pub width: u32,
    pub height: u32,
}

impl FrameDimensions {
    pub fn new(width: u32, height: u32) -> GuidanceResult<Self> {
        if width == 0 {
            return Err(GuidanceError::config("frame_width", "must be > 0"));
        }
        if height == 0 {
            return Err(GuidanceError::config("frame_height", "must be > 0"));
        }
        Ok(Self { width, height })
    }

    /// Frame centre in pixel coordinates (origin top-left, floor division).
    pub fn center(&self) -> (i32, i32) {
        ((self.width / 2) as i32, (self.height / 2) as i32)
    }
}

/// Ratio parameters the target zone is derived from.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZoneRatios {
    /// Target width as a fraction of frame width, in (0, 1].
    pub width_ratio: f64,
    /// Target height as a fraction of frame height, in (0, 1].
    pub height_ratio: f64,
    /// Horizontal positional tolerance as a fraction of frame width.
    pub x_tolerance_ratio: f64,
    /// Vertical positional tolerance as a fraction of frame height.
    pub y_tolerance_ratio: f64,
    /// Smallest acceptable box area relative to the target area.
    pub min_size_ratio: f64,
    /// Largest acceptable box area relative to the target area.
    pub max_size_ratio: f64,
}

impl Default for ZoneRatios {
    fn default() -> Self {
        Self {
            width_ratio: 0.68,
            height_ratio: 0.8,
            x_tolerance_ratio: 0.05,
            y_tolerance_ratio: 0.07,
            min_size_ratio: 0.5,
            max_size_ratio: 1.2,
        }
    }
}

impl ZoneRatios {
    /// Range checks that do not depend on the frame size.
    pub fn validate(&self) -> GuidanceResult<()> {
        unit_interval("width_ratio", self.width_ratio)?;
        unit_interval("height_ratio", self.height_ratio)?;
        non_negative("x_tolerance_ratio", self.x_tolerance_ratio)?;
        non_negative("y_tolerance_ratio", self.y_tolerance_ratio)?;
        non_negative("min_size_ratio", self.min_size_ratio)?;
        if !self.max_size_ratio.is_finite() || self.max_size_ratio <= self.min_size_ratio {
            return Err(GuidanceError::config(
                "max_size_ratio",
                format!(
                    "must be greater than min_size_ratio ({} <= {})",
                    self.max_size_ratio, self.min_size_ratio
                ),
            ));
        }
        Ok(())
    }
}

fn unit_interval(param: &'static str, value: f64) -> GuidanceResult<()> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(GuidanceError::config(
            param,
            format!("must be in (0, 1], got {}", value),
        ))
    }
}

fn non_negative(param: &'static str, value: f64) -> GuidanceResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(GuidanceError::config(
            param,
            format!("must be >= 0, got {}", value),
        ))
    }
}

/// Target rectangle and tolerance thresholds for one frame size.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TargetZone {
    pub frame: FrameDimensions,
    pub target_x: u32,
    pub target_y: u32,
    pub target_w: u32,
    pub target_h: u32,
    pub position_threshold_x: u32,
    pub position_threshold_y: u32,
    pub min_size_ratio: f64,
    pub max_size_ratio: f64,
}

impl TargetZone {
    /// Derive the target zone for `frame`.
    ///
    /// Fails with `GuidanceError::Config` when the ratios are out of range or
    /// when a tolerance would cover half the target or more, which would make
    /// every detection "perfect" on that axis.
    pub fn compute(frame: FrameDimensions, ratios: &ZoneRatios) -> GuidanceResult<Self> {
        let frame = FrameDimensions::new(frame.width, frame.height)?;
        ratios.validate()?;

        let target_w = scale(frame.width, ratios.width_ratio);
        let target_h = scale(frame.height, ratios.height_ratio);
        if target_w == 0 || target_h == 0 {
            return Err(GuidanceError::config(
                "width_ratio/height_ratio",
                format!(
                    "target zone is empty for a {}x{} frame",
                    frame.width, frame.height
                ),
            ));
        }

        let position_threshold_x = scale(frame.width, ratios.x_tolerance_ratio);
        let position_threshold_y = scale(frame.height, ratios.y_tolerance_ratio);
        if u64::from(position_threshold_x) * 2 >= u64::from(target_w) {
            return Err(GuidanceError::config(
                "x_tolerance_ratio",
                format!(
                    "threshold {}px must be less than half the target width {}px",
                    position_threshold_x, target_w
                ),
            ));
        }
        if u64::from(position_threshold_y) * 2 >= u64::from(target_h) {
            return Err(GuidanceError::config(
                "y_tolerance_ratio",
                format!(
                    "threshold {}px must be less than half the target height {}px",
                    position_threshold_y, target_h
                ),
            ));
        }

        Ok(Self {
            frame,
            target_x: (frame.width - target_w) / 2,
            target_y: (frame.height - target_h) / 2,
            target_w,
            target_h,
            position_threshold_x,
            position_threshold_y,
            min_size_ratio: ratios.min_size_ratio,
            max_size_ratio: ratios.max_size_ratio,
        })
    }

    pub fn area(&self) -> u64 {
        u64::from(self.target_w) * u64::from(self.target_h)
    }

    pub fn frame_center(&self) -> (i32, i32) {
        self.frame.center()
    }
}

fn scale(dimension: u32, ratio: f64) -> u32 {
    (f64::from(dimension) * ratio).floor() as u32
}
