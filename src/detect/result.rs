use serde::{Deserialize, Serialize};

use crate::align::Detection;

/// COCO class index for "book".
pub const COCO_BOOK_CLASS_ID: u32 = 73;

/// One box reported by a detector backend, in frame pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectDetection {
    #[serde(alias = "cls", alias = "class")]
    pub class_id: u32,
    #[serde(alias = "conf", alias = "score")]
    pub confidence: f32,
    #[serde(alias = "xyxy", rename = "box")]
    pub bbox: [f32; 4],
}

impl ObjectDetection {
    pub fn new(class_id: u32, confidence: f32, bbox: [f32; 4]) -> Self {
        Self {
            class_id,
            confidence,
            bbox,
        }
    }

    /// Pixel box with coordinates truncated toward zero.
    pub fn to_detection(&self) -> Detection {
        let [x1, y1, x2, y2] = self.bbox;
        Detection::new(x1 as i32, y1 as i32, x2 as i32, y2 as i32, self.confidence)
    }
}

/// Selects the tracked object from a backend's output.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackedObjectFilter {
    pub class_id: u32,
    /// Detections must score strictly above this.
    pub confidence_threshold: f32,
}

impl Default for TrackedObjectFilter {
    fn default() -> Self {
        Self {
            class_id: COCO_BOOK_CLASS_ID,
            confidence_threshold: 0.4,
        }
    }
}

impl TrackedObjectFilter {
    /// First detection of the tracked class above the threshold, in backend order.
    pub fn select(&self, detections: &[ObjectDetection]) -> Option<Detection> {
        detections
            .iter()
            .find(|d| d.class_id == self.class_id && d.confidence > self.confidence_threshold)
            .map(ObjectDetection::to_detection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_first_tracked_detection_above_threshold() {
        let filter = TrackedObjectFilter::default();
        let detections = [
            ObjectDetection::new(0, 0.99, [0.0, 0.0, 50.0, 50.0]),
            ObjectDetection::new(73, 0.40, [1.0, 1.0, 2.0, 2.0]),
            ObjectDetection::new(73, 0.75, [10.9, 20.2, 310.7, 400.5]),
            ObjectDetection::new(73, 0.95, [5.0, 5.0, 6.0, 6.0]),
        ];
        let det = filter.select(&detections).expect("book");
        assert_eq!((det.x1, det.y1, det.x2, det.y2), (10, 20, 310, 400));
        assert_eq!(det.confidence, 0.75);
    }

    #[test]
    fn nothing_selected_without_tracked_class() {
        let filter = TrackedObjectFilter::default();
        assert!(filter.select(&[]).is_none());
        assert!(filter
            .select(&[ObjectDetection::new(0, 0.9, [0.0, 0.0, 1.0, 1.0])])
            .is_none());
    }

    #[test]
    fn parses_detector_json_with_aliases() {
        let parsed: Vec<ObjectDetection> = serde_json::from_str(
            r#"[{"cls": 73, "conf": 0.8, "xyxy": [1, 2, 3, 4]},
                {"class_id": 0, "confidence": 0.5, "box": [0, 0, 10, 10]}]"#,
        )
        .unwrap();
        assert_eq!(parsed[0], ObjectDetection::new(73, 0.8, [1.0, 2.0, 3.0, 4.0]));
        assert_eq!(parsed[1].class_id, 0);
    }
}
