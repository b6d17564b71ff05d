//! Per-language text pipeline applied identically at index and query time:
//! normalize, detect language, tokenize, drop stopwords, filter, stem.

use crate::language::{self, Language};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref TOKEN_RE: Regex = Regex::new(r"(?u)\p{L}[\p{L}\p{N}_']*").expect("valid regex");
    static ref WS_RE: Regex = Regex::new(r"\s+").expect("valid regex");
    static ref STOPWORDS: HashMap<Language, HashSet<String>> = Language::ALL
        .iter()
        .map(|&lang| (lang, stop_words::get(lang.stop_words()).into_iter().collect()))
        .collect();
}

/// NFKC-normalize, fold to lowercase, and collapse whitespace runs.
pub fn normalize(text: &str) -> String {
    let folded = text.nfkc().collect::<String>().to_lowercase();
    WS_RE.replace_all(&folded, " ").trim().to_string()
}

/// Split a normalized string into candidate tokens, order preserved.
pub fn tokenize(normalized: &str) -> Vec<String> {
    TOKEN_RE
        .find_iter(normalized)
        .map(|m| m.as_str().to_string())
        .collect()
}

pub fn remove_stopwords(tokens: Vec<String>, language: Language) -> Vec<String> {
    let stopwords = &STOPWORDS[&language];
    tokens
        .into_iter()
        .filter(|t| !stopwords.contains(t.as_str()))
        .collect()
}

/// Drop tokens shorter than `min_len` chars and tokens that are all digits.
pub fn filter_tokens(tokens: Vec<String>, min_len: usize) -> Vec<String> {
    tokens
        .into_iter()
        .filter(|t| t.chars().count() >= min_len && !t.chars().all(|c| c.is_numeric()))
        .collect()
}

pub fn stem(tokens: Vec<String>, language: Language) -> Vec<String> {
    let stemmer = language::stemmer(language);
    tokens
        .into_iter()
        .map(|t| stemmer.stem(&t).to_string())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    /// What the detector said, `None` for unknown.
    pub detected: Option<Language>,
    /// Language the stopword and stemming stages actually ran with.
    pub resolved: Language,
    pub tokens: Vec<String>,
}

/// Run the whole pipeline. Pure function of `(text, fallback, min_token_len)`;
/// malformed text yields an empty token list, never an error.
pub fn analyze(text: &str, fallback: Language, min_token_len: usize) -> Analysis {
    let normalized = normalize(text);
    let (detected, _confidence) = language::detect(&normalized);
    let resolved = detected.unwrap_or(fallback);
    let tokens = tokenize(&normalized);
    let tokens = remove_stopwords(tokens, resolved);
    let tokens = filter_tokens(tokens, min_token_len);
    let tokens = stem(tokens, resolved);
    Analysis {
        detected,
        resolved,
        tokens,
    }
}
