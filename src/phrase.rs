//! Spoken phrases for each guidance state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::{GuidanceError, GuidanceResult};
use crate::guidance::GuidanceState;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    /// Thai phrase followed by the English keyword.
    #[default]
    Bilingual,
    Thai,
    English,
}

impl FromStr for Language {
    type Err = GuidanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bilingual" | "th+en" => Ok(Language::Bilingual),
            "thai" | "th" => Ok(Language::Thai),
            "english" | "en" => Ok(Language::English),
            other => Err(GuidanceError::config(
                "language",
                format!("unsupported language '{}'", other),
            )),
        }
    }
}

fn thai(state: GuidanceState) -> &'static str {
    match state {
        GuidanceState::Perfect => "สมบูรณ์แบบ",
        GuidanceState::Left => "เลื่อนซ้าย",
        GuidanceState::Right => "เลื่อนขวา",
        GuidanceState::Up => "เลื่อนขึ้น",
        GuidanceState::Down => "เลื่อนลง",
        GuidanceState::Closer => "เข้าใกล้มากขึ้น",
        GuidanceState::Further => "ถอยออกไป",
        GuidanceState::NoObject => "ไม่เห็นหนังสือ",
    }
}

fn english(state: GuidanceState) -> &'static str {
    match state {
        GuidanceState::Perfect => "perfect",
        GuidanceState::Left => "left",
        GuidanceState::Right => "right",
        GuidanceState::Up => "up",
        GuidanceState::Down => "down",
        GuidanceState::Closer => "closer",
        GuidanceState::Further => "further",
        GuidanceState::NoObject => "no book",
    }
}

fn slot(state: GuidanceState) -> usize {
    match state {
        GuidanceState::Perfect => 0,
        GuidanceState::Left => 1,
        GuidanceState::Right => 2,
        GuidanceState::Up => 3,
        GuidanceState::Down => 4,
        GuidanceState::Closer => 5,
        GuidanceState::Further => 6,
        GuidanceState::NoObject => 7,
    }
}

/// One phrase per guidance state. Every state always has a phrase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhraseBook {
    phrases: [String; 8],
}

impl PhraseBook {
    pub fn new(language: Language) -> Self {
        let phrases = GuidanceState::ALL.map(|state| match language {
            Language::Bilingual => format!("{}, {}", thai(state), english(state)),
            Language::Thai => thai(state).to_string(),
            Language::English => english(state).to_string(),
        });
        Self { phrases }
    }

    /// Build a phrase book and replace phrases keyed by state key
    /// (`"left"`, `"no_object"`, ...).
    pub fn with_overrides(
        language: Language,
        overrides: &BTreeMap<String, String>,
    ) -> GuidanceResult<Self> {
        let mut book = Self::new(language);
        for (key, phrase) in overrides {
            let state: GuidanceState = key.parse().map_err(|_| {
                GuidanceError::config("phrases", format!("unknown guidance state '{}'", key))
            })?;
            if phrase.trim().is_empty() {
                return Err(GuidanceError::config(
                    "phrases",
                    format!("phrase for '{}' is empty", key),
                ));
            }
            book.phrases[slot(state)] = phrase.clone();
        }
        Ok(book)
    }

    pub fn phrase(&self, state: GuidanceState) -> &str {
        &self.phrases[slot(state)]
    }
}

impl Default for PhraseBook {
    fn default() -> Self {
        Self::new(Language::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bilingual_phrases_match_instruction_table() {
        let book = PhraseBook::default();
        assert_eq!(book.phrase(GuidanceState::Left), "เลื่อนซ้าย, left");
        assert_eq!(book.phrase(GuidanceState::Further), "ถอยออกไป, further");
        assert_eq!(book.phrase(GuidanceState::NoObject), "ไม่เห็นหนังสือ, no book");
    }

    #[test]
    fn slots_follow_state_order() {
        for (index, state) in GuidanceState::ALL.into_iter().enumerate() {
            assert_eq!(slot(state), index);
        }
        let book = PhraseBook::new(Language::English);
        for state in GuidanceState::ALL {
            assert!(!book.phrase(state).is_empty());
        }
    }

    #[test]
    fn overrides_replace_single_phrase() {
        let mut overrides = BTreeMap::new();
        overrides.insert("Perfect".to_string(), "hold still".to_string());
        let book = PhraseBook::with_overrides(Language::English, &overrides).unwrap();
        assert_eq!(book.phrase(GuidanceState::Perfect), "hold still");
        assert_eq!(book.phrase(GuidanceState::Up), "up");
    }

    #[test]
    fn overrides_reject_unknown_state_and_empty_phrase() {
        let mut overrides = BTreeMap::new();
        overrides.insert("sideways".to_string(), "x".to_string());
        assert!(matches!(
            PhraseBook::with_overrides(Language::Thai, &overrides),
            Err(GuidanceError::Config { param: "phrases", .. })
        ));

        let mut overrides = BTreeMap::new();
        overrides.insert("left".to_string(), "  ".to_string());
        assert!(matches!(
            PhraseBook::with_overrides(Language::Thai, &overrides),
            Err(GuidanceError::Config { param: "phrases", .. })
        ));
    }

    #[test]
    fn parses_language_aliases() {
        assert_eq!("TH".parse::<Language>().unwrap(), Language::Thai);
        assert_eq!("english".parse::<Language>().unwrap(), Language::English);
        assert!("fr".parse::<Language>().is_err());
    }
}
