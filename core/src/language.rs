//! Supported languages and deterministic language detection.

use lazy_static::lazy_static;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use whatlang::{Detector, Lang};

/// Detection on anything shorter than this is noise.
pub const MIN_DETECT_CHARS: usize = 20;
/// Below this confidence the detector answer is discarded as unknown.
pub const MIN_DETECT_CONFIDENCE: f64 = 0.60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Spanish,
    English,
    French,
    German,
    Italian,
    Portuguese,
}

impl Language {
    pub const ALL: [Language; 6] = [
        Language::Spanish,
        Language::English,
        Language::French,
        Language::German,
        Language::Italian,
        Language::Portuguese,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Language::Spanish => "spanish",
            Language::English => "english",
            Language::French => "french",
            Language::German => "german",
            Language::Italian => "italian",
            Language::Portuguese => "portuguese",
        }
    }

    pub(crate) fn algorithm(self) -> Algorithm {
        match self {
            Language::Spanish => Algorithm::Spanish,
            Language::English => Algorithm::English,
            Language::French => Algorithm::French,
            Language::German => Algorithm::German,
            Language::Italian => Algorithm::Italian,
            Language::Portuguese => Algorithm::Portuguese,
        }
    }

    pub(crate) fn stop_words(self) -> stop_words::LANGUAGE {
        match self {
            Language::Spanish => stop_words::LANGUAGE::Spanish,
            Language::English => stop_words::LANGUAGE::English,
            Language::French => stop_words::LANGUAGE::French,
            Language::German => stop_words::LANGUAGE::German,
            Language::Italian => stop_words::LANGUAGE::Italian,
            Language::Portuguese => stop_words::LANGUAGE::Portuguese,
        }
    }

    fn from_whatlang(lang: Lang) -> Option<Language> {
        match lang {
            Lang::Spa => Some(Language::Spanish),
            Lang::Eng => Some(Language::English),
            Lang::Fra => Some(Language::French),
            Lang::Deu => Some(Language::German),
            Lang::Ita => Some(Language::Italian),
            Lang::Por => Some(Language::Portuguese),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "spanish" => Ok(Language::Spanish),
            "english" => Ok(Language::English),
            "french" => Ok(Language::French),
            "german" => Ok(Language::German),
            "italian" => Ok(Language::Italian),
            "portuguese" => Ok(Language::Portuguese),
            other => Err(format!("unsupported language: {other}")),
        }
    }
}

lazy_static! {
    static ref DETECTOR: Detector = Detector::with_allowlist(vec![
        Lang::Spa,
        Lang::Eng,
        Lang::Fra,
        Lang::Deu,
        Lang::Ita,
        Lang::Por,
    ]);
    static ref STEMMERS: HashMap<Language, Stemmer> = Language::ALL
        .iter()
        .map(|&lang| (lang, Stemmer::create(lang.algorithm())))
        .collect();
}

pub(crate) fn stemmer(language: Language) -> &'static Stemmer {
    &STEMMERS[&language]
}

/// Classify `text` into one of the supported languages.
///
/// Returns `(None, confidence)` when the text is too short, the detector has
/// no answer, or the best candidate falls under [`MIN_DETECT_CONFIDENCE`].
/// Pure and safe to call from parallel workers.
pub fn detect(text: &str) -> (Option<Language>, f64) {
    let text = text.trim();
    if text.chars().count() < MIN_DETECT_CHARS {
        return (None, 0.0);
    }
    match DETECTOR.detect(text) {
        Some(info) if info.confidence() >= MIN_DETECT_CONFIDENCE => {
            (Language::from_whatlang(info.lang()), info.confidence())
        }
        Some(info) => (None, info.confidence()),
        None => (None, 0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_unknown() {
        let (lang, confidence) = detect("hola");
        assert_eq!(lang, None);
        assert_eq!(confidence, 0.0);
    }

    #[test]
    fn detects_spanish_prose() {
        let (lang, _) = detect(
            "La biblioteca municipal permanecerá cerrada durante las vacaciones \
             porque necesitan reparar el tejado del edificio principal.",
        );
        assert_eq!(lang, Some(Language::Spanish));
    }

    #[test]
    fn detects_english_prose() {
        let (lang, _) = detect(
            "The municipal library will remain closed during the holidays \
             because the roof of the main building needs to be repaired.",
        );
        assert_eq!(lang, Some(Language::English));
    }

    #[test]
    fn parses_labels() {
        assert_eq!("Spanish".parse::<Language>().unwrap(), Language::Spanish);
        assert!("klingon".parse::<Language>().is_err());
    }
}
