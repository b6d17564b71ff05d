//! Read side of the index: loads the meta descriptor, term map, and packed
//! doc index at startup, then answers queries with positioned reads into the
//! postings file and doc store.

use crate::config::Config;
use crate::error::SearchError;
use crate::language::Language;
use crate::persist::{self, IndexMeta, IndexPaths};
use crate::pipeline;
use crate::{DocUid, SearchHit, StoredDoc};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// Immutable after `open`; safe to share across concurrent queries because
/// every read opens its own handle and seeks independently.
pub struct Searcher {
    paths: IndexPaths,
    meta: IndexMeta,
    terms: HashMap<String, (u64, u64)>,
    doc_offsets: Vec<u64>,
}

impl Searcher {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, SearchError> {
        let paths = IndexPaths::new(root);
        if !paths.meta().is_file() {
            return Err(SearchError::IndexMissing);
        }
        let meta = persist::load_meta(&paths)?;
        let terms = persist::load_terms(&paths)?;
        let doc_offsets = persist::load_doc_index(&paths)?;
        Ok(Self {
            paths,
            meta,
            terms,
            doc_offsets,
        })
    }

    pub fn num_docs(&self) -> u64 {
        self.meta.n_docs
    }

    pub fn vocab_size(&self) -> u64 {
        self.meta.vocab_size
    }

    /// Ranked TF-IDF retrieval: `score(d) = Σ (1 + ln tf) · ln(N/df) · qtf`.
    /// Language resolution order: detected, then the caller's override, then
    /// `default_query_language`. A failed postings read skips that term and
    /// degrades coverage instead of failing the query.
    pub fn search(
        &self,
        query: &str,
        default_language: Option<Language>,
        config: &Config,
    ) -> Result<Vec<SearchHit>, SearchError> {
        if query.trim().is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        let fallback = default_language.unwrap_or(config.default_query_language);
        let analysis = pipeline::analyze(query, fallback, config.min_token_len);

        let mut qtf: HashMap<String, u32> = HashMap::new();
        for token in analysis.tokens {
            *qtf.entry(token).or_insert(0) += 1;
        }

        let n = self.meta.n_docs as f64;
        let mut scores: HashMap<DocUid, f64> = HashMap::new();
        for (term, qcount) in &qtf {
            let Some(&(offset, len)) = self.terms.get(term) else {
                continue;
            };
            let postings = match self.read_postings(offset, len) {
                Ok(postings) => postings,
                Err(err) => {
                    tracing::warn!(term = %term, %err, "skipping term after failed postings read");
                    continue;
                }
            };
            if postings.is_empty() {
                continue;
            }
            let idf = (n / postings.len() as f64).ln();
            for (doc_uid, tf) in postings {
                let weight = (1.0 + (tf as f64).ln()) * idf * (*qcount as f64);
                *scores.entry(doc_uid).or_insert(0.0) += weight;
            }
        }

        let mut ranked: Vec<(DocUid, f64)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        ranked.truncate(config.top_k);

        let mut hits = Vec::with_capacity(ranked.len());
        for (doc_uid, score) in ranked {
            let doc = self.read_doc(doc_uid)?;
            hits.push(SearchHit {
                doc_id: doc.doc_id,
                score,
                title: doc.title,
                snippet: doc.snippet,
                url: doc.url,
            });
        }
        Ok(hits)
    }

    fn read_postings(&self, offset: u64, len: u64) -> Result<Vec<(DocUid, u32)>, SearchError> {
        let mut file = File::open(self.paths.postings())?;
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len as usize];
        file.read_exact(&mut buf)?;
        let line = std::str::from_utf8(&buf)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        let raw = line
            .split_once('\t')
            .map(|(_, raw)| raw)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "postings line has no tab"))?;
        Ok(serde_json::from_str(raw)?)
    }

    fn read_doc(&self, doc_uid: DocUid) -> Result<StoredDoc, SearchError> {
        let offset = self
            .doc_offsets
            .get(doc_uid as usize)
            .copied()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("doc_uid {doc_uid} out of range"),
                )
            })?;
        let mut reader = BufReader::new(File::open(self.paths.doc_store())?);
        reader.seek(SeekFrom::Start(offset))?;
        let mut line = String::new();
        reader.read_line(&mut line)?;
        Ok(serde_json::from_str(line.trim_end())?)
    }
}
