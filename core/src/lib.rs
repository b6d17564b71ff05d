pub mod block;
pub mod builder;
pub mod config;
pub mod error;
pub mod language;
pub mod merge;
pub mod partition;
pub mod persist;
pub mod pipeline;
pub mod scheduler;
pub mod search;

use serde::{Deserialize, Serialize};

/// Dense internal document identifier, assigned during a build. Distinct from
/// the external `doc_id` supplied by the corpus, which may repeat.
pub type DocUid = u64;

/// Maximum number of characters of the raw text kept for result previews.
pub const SNIPPET_CHARS: usize = 240;

/// One record of the input corpus, parsed from a single JSONL line.
#[derive(Debug, Clone, Deserialize)]
pub struct RawDocument {
    pub doc_id: String,
    #[serde(default)]
    pub title: String,
    pub text: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// One line of the document store. `doc_uid` equals the line number after the
/// merge pass compacts any gaps left by rejected corpus lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDoc {
    pub doc_uid: DocUid,
    pub doc_id: String,
    pub title: String,
    pub url: Option<String>,
    pub snippet: String,
    pub language: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub doc_id: String,
    pub score: f64,
    pub title: String,
    pub snippet: String,
    pub url: Option<String>,
}
