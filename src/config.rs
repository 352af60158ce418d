use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::announce::{Announcer, CommandAnnouncer, LogAnnouncer};
use crate::detect::{TrackedObjectFilter, COCO_BOOK_CLASS_ID};
use crate::ingest::SourceSettings;
use crate::phrase::{Language, PhraseBook};
use crate::scheduler::{SchedulerSettings, DEFAULT_INSTRUCTION_COOLDOWN, DEFAULT_NO_DETECTION_TIMEOUT};
use crate::session::SessionSettings;
use crate::zone::{FrameDimensions, TargetZone, ZoneRatios};

const DEFAULT_SOURCE_URL: &str = "stub://camera";
const DEFAULT_SOURCE_FPS: u32 = 10;
const DEFAULT_SOURCE_WIDTH: u32 = 1280;
const DEFAULT_SOURCE_HEIGHT: u32 = 720;
const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.4;
const DEFAULT_DETECTION_INTERVAL_MS: u64 = 500;
const DEFAULT_FRAME_SKIP: u32 = 1;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct BooktrackerConfigFile {
    zone: Option<ZoneConfigFile>,
    detection: Option<DetectionConfigFile>,
    timing: Option<TimingConfigFile>,
    source: Option<SourceConfigFile>,
    announcer: Option<AnnouncerConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ZoneConfigFile {
    width_ratio: Option<f64>,
    height_ratio: Option<f64>,
    x_tolerance_ratio: Option<f64>,
    y_tolerance_ratio: Option<f64>,
    min_size_ratio: Option<f64>,
    max_size_ratio: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DetectionConfigFile {
    confidence_threshold: Option<f32>,
    tracked_class_id: Option<u32>,
    detection_interval_ms: Option<u64>,
    frame_skip: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TimingConfigFile {
    instruction_cooldown_ms: Option<u64>,
    no_detection_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SourceConfigFile {
    url: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    target_fps: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct AnnouncerConfigFile {
    backend: Option<AnnouncerBackend>,
    command: Option<Vec<String>>,
    language: Option<Language>,
    phrases: Option<BTreeMap<String, String>>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnouncerBackend {
    #[default]
    Log,
    Command,
}

#[derive(Debug, Clone)]
pub struct BooktrackerConfig {
    pub ratios: ZoneRatios,
    pub detection: DetectionSettings,
    pub timing: SchedulerSettings,
    pub source: SourceSettings,
    pub announcer: AnnouncerSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectionSettings {
    pub confidence_threshold: f32,
    pub tracked_class_id: u32,
    pub detection_interval: Duration,
    pub frame_skip: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnouncerSettings {
    pub backend: AnnouncerBackend,
    pub command: Vec<String>,
    pub language: Language,
    pub phrases: BTreeMap<String, String>,
}

impl Default for BooktrackerConfig {
    fn default() -> Self {
        Self::from_file(BooktrackerConfigFile::default())
    }
}

impl BooktrackerConfig {
    /// Load from `BOOKTRACKER_CONFIG` (if set), apply environment overrides,
    /// then validate. Any out-of-range value refuses startup.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("BOOKTRACKER_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: BooktrackerConfigFile) -> Self {
        let defaults = ZoneRatios::default();
        let zone = file.zone.unwrap_or_default();
        let ratios = ZoneRatios {
            width_ratio: zone.width_ratio.unwrap_or(defaults.width_ratio),
            height_ratio: zone.height_ratio.unwrap_or(defaults.height_ratio),
            x_tolerance_ratio: zone.x_tolerance_ratio.unwrap_or(defaults.x_tolerance_ratio),
            y_tolerance_ratio: zone.y_tolerance_ratio.unwrap_or(defaults.y_tolerance_ratio),
            min_size_ratio: zone.min_size_ratio.unwrap_or(defaults.min_size_ratio),
            max_size_ratio: zone.max_size_ratio.unwrap_or(defaults.max_size_ratio),
        };

        let detection = file.detection.unwrap_or_default();
        let detection = DetectionSettings {
            confidence_threshold: detection
                .confidence_threshold
                .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
            tracked_class_id: detection.tracked_class_id.unwrap_or(COCO_BOOK_CLASS_ID),
            detection_interval: Duration::from_millis(
                detection
                    .detection_interval_ms
                    .unwrap_or(DEFAULT_DETECTION_INTERVAL_MS),
            ),
            frame_skip: detection.frame_skip.unwrap_or(DEFAULT_FRAME_SKIP),
        };

        let timing = file.timing.unwrap_or_default();
        let timing = SchedulerSettings {
            instruction_cooldown: timing
                .instruction_cooldown_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_INSTRUCTION_COOLDOWN),
            no_detection_timeout: timing
                .no_detection_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_NO_DETECTION_TIMEOUT),
        };

        let source = file.source.unwrap_or_default();
        let source = SourceSettings {
            url: source.url.unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string()),
            width: source.width.unwrap_or(DEFAULT_SOURCE_WIDTH),
            height: source.height.unwrap_or(DEFAULT_SOURCE_HEIGHT),
            target_fps: source.target_fps.unwrap_or(DEFAULT_SOURCE_FPS),
        };

        let announcer = file.announcer.unwrap_or_default();
        let announcer = AnnouncerSettings {
            backend: announcer.backend.unwrap_or_default(),
            command: announcer.command.unwrap_or_default(),
            language: announcer.language.unwrap_or_default(),
            phrases: announcer.phrases.unwrap_or_default(),
        };

        Self {
            ratios,
            detection,
            timing,
            source,
            announcer,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("BOOKTRACKER_SOURCE_URL") {
            if !url.trim().is_empty() {
                self.source.url = url;
            }
        }
        if let Ok(ms) = std::env::var("BOOKTRACKER_COOLDOWN_MS") {
            self.timing.instruction_cooldown = parse_millis("BOOKTRACKER_COOLDOWN_MS", &ms)?;
        }
        if let Ok(ms) = std::env::var("BOOKTRACKER_NO_DETECTION_TIMEOUT_MS") {
            self.timing.no_detection_timeout =
                parse_millis("BOOKTRACKER_NO_DETECTION_TIMEOUT_MS", &ms)?;
        }
        if let Ok(confidence) = std::env::var("BOOKTRACKER_CONFIDENCE") {
            self.detection.confidence_threshold = confidence.trim().parse().map_err(|_| {
                anyhow!("BOOKTRACKER_CONFIDENCE must be a number between 0 and 1")
            })?;
        }
        if let Ok(language) = std::env::var("BOOKTRACKER_LANGUAGE") {
            if !language.trim().is_empty() {
                self.announcer.language = language.parse()?;
            }
        }
        if let Ok(backend) = std::env::var("BOOKTRACKER_ANNOUNCER") {
            self.announcer.backend = match backend.trim().to_ascii_lowercase().as_str() {
                "log" => AnnouncerBackend::Log,
                "command" => AnnouncerBackend::Command,
                other => {
                    return Err(anyhow!(
                        "BOOKTRACKER_ANNOUNCER must be 'log' or 'command', got '{}'",
                        other
                    ))
                }
            };
        }
        if let Ok(command) = std::env::var("BOOKTRACKER_ANNOUNCER_COMMAND") {
            let parsed = split_words(&command);
            if !parsed.is_empty() {
                self.announcer.command = parsed;
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let frame = FrameDimensions::new(self.source.width, self.source.height)?;
        TargetZone::compute(frame, &self.ratios)?;

        let confidence = self.detection.confidence_threshold;
        if !(0.0..=1.0).contains(&confidence) {
            return Err(anyhow!(
                "confidence_threshold must be in [0, 1], got {}",
                confidence
            ));
        }
        if self.detection.frame_skip == 0 {
            return Err(anyhow!("frame_skip must be >= 1"));
        }
        if self.source.target_fps == 0 {
            return Err(anyhow!("target_fps must be >= 1"));
        }
        if self.timing.instruction_cooldown.is_zero() {
            return Err(anyhow!("instruction_cooldown must be greater than zero"));
        }
        if self.timing.no_detection_timeout.is_zero() {
            return Err(anyhow!("no_detection_timeout must be greater than zero"));
        }
        let timeout = self.timing.no_detection_timeout;
        if self.detection.detection_interval >= timeout {
            return Err(anyhow!(
                "detection_interval ({}ms) must be shorter than no_detection_timeout ({}ms)",
                self.detection.detection_interval.as_millis(),
                timeout.as_millis()
            ));
        }
        let skip_gap = Duration::from_millis(
            u64::from(self.detection.frame_skip) * 1000 / u64::from(self.source.target_fps),
        );
        if skip_gap >= timeout {
            return Err(anyhow!(
                "frame_skip {} at {} fps leaves {}ms between detector runs, not shorter than no_detection_timeout ({}ms)",
                self.detection.frame_skip,
                self.source.target_fps,
                skip_gap.as_millis(),
                timeout.as_millis()
            ));
        }
        if self.announcer.backend == AnnouncerBackend::Command && self.announcer.command.is_empty()
        {
            return Err(anyhow!("announcer backend 'command' requires a command"));
        }
        PhraseBook::with_overrides(self.announcer.language, &self.announcer.phrases)?;
        Ok(())
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            ratios: self.ratios,
            scheduler: self.timing,
            detection_interval: self.detection.detection_interval,
            frame_skip: self.detection.frame_skip,
        }
    }

    pub fn filter(&self) -> TrackedObjectFilter {
        TrackedObjectFilter {
            class_id: self.detection.tracked_class_id,
            confidence_threshold: self.detection.confidence_threshold,
        }
    }

    pub fn phrase_book(&self) -> Result<PhraseBook> {
        Ok(PhraseBook::with_overrides(
            self.announcer.language,
            &self.announcer.phrases,
        )?)
    }

    pub fn build_announcer(&self) -> Result<Box<dyn Announcer>> {
        match self.announcer.backend {
            AnnouncerBackend::Log => Ok(Box::new(LogAnnouncer)),
            AnnouncerBackend::Command => {
                Ok(Box::new(CommandAnnouncer::new(&self.announcer.command)?))
            }
        }
    }
}

fn read_config_file(path: &Path) -> Result<BooktrackerConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn parse_millis(name: &str, value: &str) -> Result<Duration> {
    let millis: u64 = value
        .trim()
        .parse()
        .map_err(|_| anyhow!("{} must be an integer number of milliseconds", name))?;
    Ok(Duration::from_millis(millis))
}

fn split_words(value: &str) -> Vec<String> {
    value.split_whitespace().map(|word| word.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = BooktrackerConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.source.url, DEFAULT_SOURCE_URL);
        assert_eq!(cfg.detection.tracked_class_id, 73);
        assert_eq!(cfg.timing.instruction_cooldown, Duration::from_secs(3));
        assert_eq!(cfg.session_settings().frame_skip, 1);
        assert_eq!(cfg.filter().confidence_threshold, 0.4);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut cfg = BooktrackerConfig::default();
        cfg.ratios.width_ratio = 0.0;
        assert!(cfg.validate().is_err());

        let mut cfg = BooktrackerConfig::default();
        cfg.detection.confidence_threshold = 1.5;
        assert!(cfg.validate().is_err());

        let mut cfg = BooktrackerConfig::default();
        cfg.source.width = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = BooktrackerConfig::default();
        cfg.detection.detection_interval = Duration::from_secs(3);
        assert!(cfg.validate().is_err());

        let mut cfg = BooktrackerConfig::default();
        cfg.detection.frame_skip = 29;
        assert!(cfg.validate().is_ok());
        cfg.detection.frame_skip = 30;
        assert!(cfg.validate().is_err());

        let mut cfg = BooktrackerConfig::default();
        cfg.announcer.backend = AnnouncerBackend::Command;
        assert!(cfg.validate().is_err());
        cfg.announcer.command = vec!["espeak-ng".to_string()];
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn parses_toml_sections() {
        let file: BooktrackerConfigFile = toml::from_str(
            r#"
            [zone]
            width_ratio = 0.65
            height_ratio = 0.85

            [timing]
            instruction_cooldown_ms = 2500

            [announcer]
            backend = "command"
            command = ["espeak-ng", "-v", "th"]
            language = "thai"
            "#,
        )
        .unwrap();
        let cfg = BooktrackerConfig::from_file(file);
        assert_eq!(cfg.ratios.width_ratio, 0.65);
        assert_eq!(cfg.ratios.x_tolerance_ratio, 0.05);
        assert_eq!(cfg.timing.instruction_cooldown, Duration::from_millis(2500));
        assert_eq!(cfg.announcer.backend, AnnouncerBackend::Command);
        assert_eq!(cfg.announcer.language, Language::Thai);
        cfg.validate().unwrap();
    }

    #[test]
    fn rejects_unknown_fields() {
        let parsed: std::result::Result<BooktrackerConfigFile, _> =
            serde_json::from_str(r#"{"zone": {"widht_ratio": 0.5}}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn splits_command_words() {
        assert_eq!(
            split_words("  espeak-ng  -v th "),
            vec!["espeak-ng", "-v", "th"]
        );
    }
}
