use anyhow::Result;

use super::result::ObjectDetection;
use crate::frame::Frame;

/// Detector backend trait.
///
/// Implementations must treat the frame as read-only and must not retain it
/// beyond the `detect` call.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a frame. Returns every box found, of any class.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<ObjectDetection>>;

    /// Called instead of `detect` on frames the session does not evaluate.
    /// Backends fed one record per frame consume and discard it here.
    fn skip(&mut self, _frame: &Frame) -> Result<()> {
        Ok(())
    }

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }

    /// True once the backend can produce no further detections.
    fn is_exhausted(&self) -> bool {
        false
    }
}
