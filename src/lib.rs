//! Book-alignment guidance
//!
//! Guides a user, by short spoken instructions, to hold a book (or any single
//! tracked object) inside a target zone of a camera frame.
//!
//! # Pipeline
//!
//! Each evaluation tick runs synchronously:
//!
//! 1. **Target zone** (`zone`): derived once from the frame dimensions.
//! 2. **Alignment** (`align`): offset and relative size of the detection.
//! 3. **Guidance** (`guidance`): one of eight states, size before position.
//! 4. **Scheduling** (`scheduler`): debounce, cooldown and the no-detection
//!    timeout decide whether the state is announced.
//! 5. **Announcement** (`announce`): a single-slot queue hands the phrase to
//!    a worker thread so playback never stalls the loop.
//!
//! # Module Structure
//!
//! - `frame`, `ingest`: frames and frame sources
//! - `detect`: detector backends and the tracked-class filter
//! - `session`: one tick of the loop, wired end to end
//! - `config`: file and environment configuration for the daemon

pub mod align;
pub mod announce;
pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod guidance;
pub mod ingest;
pub mod phrase;
pub mod scheduler;
pub mod session;
pub mod zone;

pub use align::{analyze, AlignmentFeatures, Detection};
pub use announce::{
    AnnouncementQueue, Announcer, CommandAnnouncer, LogAnnouncer, QueueStats, RecordingAnnouncer,
    SpokenInstruction, SubmitOutcome,
};
pub use config::BooktrackerConfig;
pub use detect::{DetectorBackend, ObjectDetection, TrackedObjectFilter};
pub use error::{GuidanceError, GuidanceResult};
pub use frame::Frame;
pub use guidance::{decide, GuidanceState, Observation};
pub use ingest::{FrameSource, SourceSettings};
pub use phrase::{Language, PhraseBook};
pub use scheduler::{Announcement, InstructionScheduler, SchedulerSettings};
pub use session::{GuidanceSession, SessionSettings, TickReport};
pub use zone::{FrameDimensions, TargetZone, ZoneRatios};
