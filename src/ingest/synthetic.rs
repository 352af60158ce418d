//! Synthetic frame source (`stub://`).
//!
//! Produces uniform frames of the configured size. Frame content changes
//! slowly so that consecutive frames are not byte-identical.

use anyhow::Result;

use super::{FrameSource, SourceSettings, SourceStats};
use crate::frame::Frame;

pub struct SyntheticSource {
    settings: SourceSettings,
    frame_count: u64,
    connected: bool,
    /// (frame index, new width, new height)
    resize: Option<(u64, u32, u32)>,
}

impl SyntheticSource {
    pub fn new(settings: SourceSettings) -> Self {
        Self {
            settings,
            frame_count: 0,
            connected: false,
            resize: None,
        }
    }

    /// Switch to `width`x`height` starting with frame `at_frame`.
    pub fn with_resize(mut self, at_frame: u64, width: u32, height: u32) -> Self {
        self.resize = Some((at_frame, width, height));
        self
    }

    fn current_size(&self) -> (u32, u32) {
        match self.resize {
            Some((at, w, h)) if self.frame_count >= at => (w, h),
            _ => (self.settings.width, self.settings.height),
        }
    }
}

impl FrameSource for SyntheticSource {
    fn connect(&mut self) -> Result<()> {
        log::info!(
            "SyntheticSource: connected to {} ({}x{} @ {} fps)",
            self.settings.url,
            self.settings.width,
            self.settings.height,
            self.settings.target_fps
        );
        self.connected = true;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame> {
        let (width, height) = self.current_size();
        let shade = (self.frame_count / 10 % 256) as u8;
        let len = width as usize * height as usize * 3;
        let frame = Frame::new(vec![shade; len], width, height, self.frame_count)?;
        self.frame_count += 1;
        Ok(frame)
    }

    fn is_healthy(&self) -> bool {
        self.connected
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            url: self.settings.url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SourceSettings {
        SourceSettings {
            width: 64,
            height: 48,
            ..SourceSettings::default()
        }
    }

    #[test]
    fn produces_numbered_frames_of_configured_size() {
        let mut source = SyntheticSource::new(settings());
        assert!(!source.is_healthy());
        source.connect().unwrap();
        assert!(source.is_healthy());

        let first = source.next_frame().unwrap();
        let second = source.next_frame().unwrap();
        assert_eq!((first.width, first.height), (64, 48));
        assert_eq!(first.pixels().len(), 64 * 48 * 3);
        assert_eq!((first.index, second.index), (0, 1));
        assert_eq!(source.stats().frames_captured, 2);
    }

    #[test]
    fn resizes_at_requested_frame() {
        let mut source = SyntheticSource::new(settings()).with_resize(2, 32, 24);
        source.connect().unwrap();
        let sizes: Vec<(u32, u32)> = (0..4)
            .map(|_| {
                let frame = source.next_frame().unwrap();
                (frame.width, frame.height)
            })
            .collect();
        assert_eq!(sizes, vec![(64, 48), (64, 48), (32, 24), (32, 24)]);
    }
}
