//! Detector interface.
//!
//! Detection itself is an external concern: a backend turns a frame into a
//! list of class-labelled boxes. This module narrows that list down to the one
//! detection of the tracked class the guidance core consumes.

mod backend;
pub mod backends;
mod result;

pub use backend::DetectorBackend;
pub use backends::{JsonLinesBackend, ScriptStep, ScriptedBackend};
pub use result::{ObjectDetection, TrackedObjectFilter, COCO_BOOK_CLASS_ID};
