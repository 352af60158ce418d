pub mod jsonl;
pub mod scripted;

pub use jsonl::JsonLinesBackend;
pub use scripted::{ScriptStep, ScriptedBackend};
