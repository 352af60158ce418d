//! Frame sources.
//!
//! A frame source supplies the frame dimensions once at startup (and again
//! whenever they change) and one `Frame` per evaluation tick.
//!
//! Built-in sources:
//! - Synthetic source (`stub://...`) for the demo and tests
//!
//! Camera capture is provided by external collaborators implementing
//! `FrameSource`.

pub mod synthetic;

use anyhow::{anyhow, Result};

use crate::frame::Frame;

pub use synthetic::SyntheticSource;

/// Configuration for a frame source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceSettings {
    /// Source URL, e.g. "stub://front_camera".
    pub url: String,
    pub width: u32,
    pub height: u32,
    /// Target frame rate (frames per second).
    pub target_fps: u32,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            url: "stub://camera".to_string(),
            width: 1280,
            height: 720,
            target_fps: 10,
        }
    }
}

/// Statistics for a frame source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub url: String,
}

pub trait FrameSource: Send {
    fn connect(&mut self) -> Result<()>;

    /// Capture the next frame.
    fn next_frame(&mut self) -> Result<Frame>;

    fn is_healthy(&self) -> bool;

    fn stats(&self) -> SourceStats;
}

/// Open the source named by `settings.url`.
pub fn open_source(settings: &SourceSettings) -> Result<Box<dyn FrameSource>> {
    if settings.url.starts_with("stub://") {
        Ok(Box::new(SyntheticSource::new(settings.clone())))
    } else {
        Err(anyhow!(
            "unsupported frame source '{}': only stub:// sources are built in",
            settings.url
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_only_stub_sources() {
        assert!(open_source(&SourceSettings::default()).is_ok());
        let camera = SourceSettings {
            url: "rtsp://192.168.1.106:554/stream".to_string(),
            ..SourceSettings::default()
        };
        assert!(open_source(&camera).is_err());
    }
}
