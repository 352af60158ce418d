//! Announcement delivery.
//!
//! The evaluation loop never talks to an `Announcer` directly. It submits
//! instructions to an `AnnouncementQueue`, whose single worker thread owns the
//! announcer and plays one instruction at a time.
//!
//! Backends:
//! - `LogAnnouncer`: writes the phrase to the log (default, headless)
//! - `CommandAnnouncer`: runs an external text-to-speech program per phrase
//! - `RecordingAnnouncer`: keeps every phrase in memory (tests, demo)

mod queue;

use anyhow::{anyhow, Context, Result};
use std::process::Command;
use std::sync::{Arc, Mutex};

use crate::guidance::GuidanceState;

pub use queue::{AnnouncementQueue, QueueStats, SubmitOutcome};

/// An instruction ready to be rendered audibly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpokenInstruction {
    pub sequence: u64,
    pub state: GuidanceState,
    pub phrase: String,
}

/// Renders instructions for the user.
///
/// `announce` may block for as long as playback takes; it runs on the queue's
/// worker thread, never on the evaluation loop.
pub trait Announcer: Send {
    fn name(&self) -> &'static str;

    fn announce(&mut self, instruction: &SpokenInstruction) -> Result<()>;
}

impl Announcer for Box<dyn Announcer> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn announce(&mut self, instruction: &SpokenInstruction) -> Result<()> {
        (**self).announce(instruction)
    }
}

#[derive(Default)]
pub struct LogAnnouncer;

impl Announcer for LogAnnouncer {
    fn name(&self) -> &'static str {
        "log"
    }

    fn announce(&mut self, instruction: &SpokenInstruction) -> Result<()> {
        log::info!(
            "announce #{} [{}] {}",
            instruction.sequence,
            instruction.state,
            instruction.phrase
        );
        Ok(())
    }
}

/// Runs `program args... <phrase>` and waits for it to exit.
pub struct CommandAnnouncer {
    program: String,
    args: Vec<String>,
}

impl CommandAnnouncer {
    /// `command` is the program followed by its fixed arguments,
    /// e.g. `["espeak-ng", "-v", "th"]`.
    pub fn new(command: &[String]) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| anyhow!("announcer command must not be empty"))?;
        if program.trim().is_empty() {
            return Err(anyhow!("announcer command must not be empty"));
        }
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl Announcer for CommandAnnouncer {
    fn name(&self) -> &'static str {
        "command"
    }

    fn announce(&mut self, instruction: &SpokenInstruction) -> Result<()> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(&instruction.phrase)
            .status()
            .with_context(|| format!("failed to run announcer command {}", self.program))?;
        if !status.success() {
            return Err(anyhow!(
                "announcer command {} exited with {}",
                self.program,
                status
            ));
        }
        Ok(())
    }
}

/// Keeps every announced instruction; clones share the same record.
#[derive(Clone, Default)]
pub struct RecordingAnnouncer {
    record: Arc<Mutex<Vec<SpokenInstruction>>>,
}

impl RecordingAnnouncer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn announced(&self) -> Vec<SpokenInstruction> {
        self.record
            .lock()
            .map(|record| record.clone())
            .unwrap_or_default()
    }

    pub fn states(&self) -> Vec<GuidanceState> {
        self.announced().into_iter().map(|i| i.state).collect()
    }
}

impl Announcer for RecordingAnnouncer {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn announce(&mut self, instruction: &SpokenInstruction) -> Result<()> {
        self.record
            .lock()
            .map_err(|_| anyhow!("recording announcer lock poisoned"))?
            .push(instruction.clone());
        Ok(())
    }
}
