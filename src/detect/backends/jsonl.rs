use anyhow::{anyhow, Context, Result};
use std::io::BufRead;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::ObjectDetection;
use crate::frame::Frame;

/// Reads detections produced by an external detector process.
///
/// One line per frame, each a JSON array of boxes, e.g.
/// `[{"cls": 73, "conf": 0.82, "xyxy": [412, 96, 1010, 640]}]`.
/// An empty line or `[]` means nothing was detected on that frame. End of
/// input exhausts the backend.
pub struct JsonLinesBackend<R> {
    reader: R,
    line: String,
    lines_read: u64,
    exhausted: bool,
}

impl<R: BufRead + Send> JsonLinesBackend<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            lines_read: 0,
            exhausted: false,
        }
    }

    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    /// Read the next line into `self.line`. False at end of input.
    fn next_line(&mut self) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        self.line.clear();
        let read = self
            .reader
            .read_line(&mut self.line)
            .context("failed to read detection feed")?;
        if read == 0 {
            log::info!("detection feed closed after {} lines", self.lines_read);
            self.exhausted = true;
            return Ok(false);
        }
        self.lines_read += 1;
        Ok(true)
    }
}

impl<R: BufRead + Send> DetectorBackend for JsonLinesBackend<R> {
    fn name(&self) -> &'static str {
        "jsonl"
    }

    fn detect(&mut self, _frame: &Frame) -> Result<Vec<ObjectDetection>> {
        if !self.next_line()? {
            return Ok(Vec::new());
        }
        let trimmed = self.line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(trimmed)
            .map_err(|e| anyhow!("invalid detection line {}: {}", self.lines_read, e))
    }

    fn skip(&mut self, _frame: &Frame) -> Result<()> {
        self.next_line()?;
        Ok(())
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_one_line_per_frame() {
        let feed = "[{\"cls\": 73, \"conf\": 0.9, \"xyxy\": [1, 2, 30, 40]}]\n\n[]\nnot json\n";
        let mut backend = JsonLinesBackend::new(Cursor::new(feed));
        let frame = Frame::blank(8, 8, 0);

        let first = backend.detect(&frame).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].class_id, 73);
        assert!(backend.detect(&frame).unwrap().is_empty());
        assert!(backend.detect(&frame).unwrap().is_empty());
        assert!(backend.detect(&frame).is_err());
        assert!(!backend.is_exhausted());

        assert!(backend.detect(&frame).unwrap().is_empty());
        assert!(backend.is_exhausted());
        assert_eq!(backend.lines_read(), 4);
    }

    #[test]
    fn skip_discards_one_line_without_parsing() {
        let feed = "not json\n[{\"cls\": 73, \"conf\": 0.9, \"xyxy\": [1, 2, 30, 40]}]\n";
        let mut backend = JsonLinesBackend::new(Cursor::new(feed));
        let frame = Frame::blank(8, 8, 0);

        backend.skip(&frame).unwrap();
        assert_eq!(backend.detect(&frame).unwrap().len(), 1);
        backend.skip(&frame).unwrap();
        assert!(backend.is_exhausted());
        assert_eq!(backend.lines_read(), 2);
    }
}
