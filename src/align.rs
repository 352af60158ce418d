//! Alignment evaluation: bounding box + target zone -> geometric features.

use serde::{Deserialize, Serialize};

use crate::error::{GuidanceError, GuidanceResult};
use crate::zone::TargetZone;

/// A detection of the tracked object, in frame pixel coordinates.
///
/// Class and confidence filtering happen upstream; the core only checks
/// geometric validity.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    pub confidence: f32,
}

impl Detection {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32, confidence: f32) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            confidence,
        }
    }

    pub fn width(&self) -> i64 {
        i64::from(self.x2) - i64::from(self.x1)
    }

    pub fn height(&self) -> i64 {
        i64::from(self.y2) - i64::from(self.y1)
    }

    /// Box centre, rounded toward negative infinity.
    pub fn center(&self) -> (i64, i64) {
        (
            (i64::from(self.x1) + i64::from(self.x2)).div_euclid(2),
            (i64::from(self.y1) + i64::from(self.y2)).div_euclid(2),
        )
    }
}

/// Per-tick geometric features of a detection relative to the target zone.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AlignmentFeatures {
    /// Box centre minus frame centre; positive means right of centre.
    pub offset_x: i64,
    /// Box centre minus frame centre; positive means below centre.
    pub offset_y: i64,
    /// Box area over target area.
    pub size_ratio: f64,
}

/// Compute alignment features for `detection` against `zone`.
///
/// `frame_center` is normally `zone.frame_center()`. Fails with
/// `GuidanceError::InvalidBox` when the box has no positive width or height.
pub fn analyze(
    detection: &Detection,
    zone: &TargetZone,
    frame_center: (i32, i32),
) -> GuidanceResult<AlignmentFeatures> {
    let box_w = detection.width();
    let box_h = detection.height();
    if box_w <= 0 || box_h <= 0 {
        return Err(GuidanceError::InvalidBox {
            x1: detection.x1,
            y1: detection.y1,
            x2: detection.x2,
            y2: detection.y2,
        });
    }

    let (center_x, center_y) = detection.center();
    let box_area = (box_w * box_h) as f64;

    Ok(AlignmentFeatures {
        offset_x: center_x - i64::from(frame_center.0),
        offset_y: center_y - i64::from(frame_center.1),
        size_ratio: box_area / zone.area() as f64,
    })
}
