//! Merges per-block outputs into the final artifact set: concatenated doc
//! store, packed doc index, k-way merged postings, and the term map.

use crate::block::BlockOutput;
use crate::error::BuildError;
use crate::persist::{self, IndexMeta, IndexPaths};
use crate::{DocUid, StoredDoc};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct MergeOptions {
    pub min_df: u64,
    pub max_df_ratio: f64,
}

#[derive(Debug)]
pub struct MergeSummary {
    pub n_docs: u64,
    pub vocab_size: u64,
}

/// Assemble the final index inside `staging` from block outputs sorted by
/// `block_id`. Postings referencing documents that were rejected after uid
/// assignment cannot exist; short blocks only leave trailing gaps, which the
/// doc-store pass compacts and the postings pass rewrites.
pub fn merge_blocks(
    staging: &IndexPaths,
    outputs: &[BlockOutput],
    opts: &MergeOptions,
) -> Result<MergeSummary, BuildError> {
    let (n_docs, remap) = write_doc_store(staging, outputs)?;
    let vocab_size = merge_postings(staging, outputs, n_docs, remap.as_ref(), opts)?;

    let meta = IndexMeta {
        format: "block".to_string(),
        n_docs,
        vocab_size,
        postings_path: persist::POSTINGS_FILE.to_string(),
        terms_index_path: persist::TERMS_FILE.to_string(),
        doc_store_path: persist::DOC_STORE_FILE.to_string(),
        doc_index_path: persist::DOC_INDEX_FILE.to_string(),
        doc_index_type: "packed".to_string(),
    };
    persist::save_meta(staging, &meta)?;

    Ok(MergeSummary { n_docs, vocab_size })
}

/// Concatenate doc-store shards in block order, reassigning dense doc_uids
/// and recording each line's byte offset into the packed doc index. Returns
/// the uid remap, or `None` when every uid already matched its line number.
fn write_doc_store(
    staging: &IndexPaths,
    outputs: &[BlockOutput],
) -> Result<(u64, Option<HashMap<DocUid, DocUid>>), BuildError> {
    let mut store = BufWriter::new(File::create(staging.doc_store())?);
    let mut offsets: Vec<u64> = Vec::new();
    let mut remap: HashMap<DocUid, DocUid> = HashMap::new();
    let mut identity = true;
    let mut offset = 0u64;

    for output in outputs {
        let reader = BufReader::new(File::open(&output.doc_store_path)?);
        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let mut doc: StoredDoc = serde_json::from_str(&line)?;
            let new_uid = offsets.len() as DocUid;
            if doc.doc_uid != new_uid {
                identity = false;
            }
            remap.insert(doc.doc_uid, new_uid);
            doc.doc_uid = new_uid;

            let encoded = serde_json::to_string(&doc)?;
            offsets.push(offset);
            store.write_all(encoded.as_bytes())?;
            store.write_all(b"\n")?;
            offset += encoded.len() as u64 + 1;
        }
    }
    store.flush()?;
    store.into_inner().map_err(|err| err.into_error())?.sync_all()?;

    persist::save_doc_index(staging, &offsets)?;
    let n_docs = offsets.len() as u64;
    Ok((n_docs, if identity { None } else { Some(remap) }))
}

/// One open block postings file plus its current head line.
struct BlockCursor {
    reader: BufReader<File>,
    term: String,
    raw_postings: String,
}

impl BlockCursor {
    fn open(path: &Path) -> Result<Option<Self>, BuildError> {
        let mut cursor = Self {
            reader: BufReader::new(File::open(path)?),
            term: String::new(),
            raw_postings: String::new(),
        };
        Ok(cursor.advance()?.then_some(cursor))
    }

    fn advance(&mut self) -> Result<bool, BuildError> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(false);
        }
        let trimmed = line.trim_end_matches('\n');
        match trimmed.split_once('\t') {
            Some((term, raw)) => {
                self.term = term.to_string();
                self.raw_postings = raw.to_string();
                Ok(true)
            }
            None => Err(BuildError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("malformed block postings line: {trimmed:?}"),
            ))),
        }
    }
}

fn merge_postings(
    staging: &IndexPaths,
    outputs: &[BlockOutput],
    n_docs: u64,
    remap: Option<&HashMap<DocUid, DocUid>>,
    opts: &MergeOptions,
) -> Result<u64, BuildError> {
    let mut cursors: Vec<BlockCursor> = Vec::with_capacity(outputs.len());
    let mut heap: BinaryHeap<Reverse<(String, usize)>> = BinaryHeap::new();
    for output in outputs {
        if let Some(cursor) = BlockCursor::open(&output.postings_path)? {
            heap.push(Reverse((cursor.term.clone(), cursors.len())));
            cursors.push(cursor);
        }
    }

    let mut out = BufWriter::new(File::create(staging.postings())?);
    let mut terms: BTreeMap<String, (u64, u64)> = BTreeMap::new();
    let mut offset = 0u64;

    while let Some(Reverse((term, first))) = heap.pop() {
        let mut contributors = vec![first];
        while heap
            .peek()
            .is_some_and(|Reverse((next_term, _))| *next_term == term)
        {
            if let Some(Reverse((_, idx))) = heap.pop() {
                contributors.push(idx);
            }
        }

        let mut combined: Vec<(DocUid, u32)> = Vec::new();
        for &idx in &contributors {
            let list: Vec<(DocUid, u32)> = serde_json::from_str(&cursors[idx].raw_postings)?;
            combined.extend(list);
        }
        if let Some(remap) = remap {
            combined.retain_mut(|posting| match remap.get(&posting.0) {
                Some(&new_uid) => {
                    posting.0 = new_uid;
                    true
                }
                None => false,
            });
        }
        let combined = coalesce(combined);

        let df = combined.len() as u64;
        if df >= opts.min_df && (df as f64) <= opts.max_df_ratio * (n_docs as f64) {
            let encoded = serde_json::to_string(&combined)?;
            let len = (term.len() + 1 + encoded.len()) as u64;
            out.write_all(term.as_bytes())?;
            out.write_all(b"\t")?;
            out.write_all(encoded.as_bytes())?;
            out.write_all(b"\n")?;
            terms.insert(term, (offset, len));
            offset += len + 1;
        }

        for idx in contributors {
            if cursors[idx].advance()? {
                heap.push(Reverse((cursors[idx].term.clone(), idx)));
            }
        }
    }
    out.flush()?;
    out.into_inner().map_err(|err| err.into_error())?.sync_all()?;

    persist::save_terms(staging, &terms)?;
    Ok(terms.len() as u64)
}

/// Sort by doc_uid and fold duplicates by summing tf. Duplicates cannot
/// occur under correct partitioning; this is a safety net.
fn coalesce(mut postings: Vec<(DocUid, u32)>) -> Vec<(DocUid, u32)> {
    postings.sort_unstable_by_key(|&(uid, _)| uid);
    let mut folded: Vec<(DocUid, u32)> = Vec::with_capacity(postings.len());
    for (uid, tf) in postings {
        match folded.last_mut() {
            Some(last) if last.0 == uid => last.1 += tf,
            _ => folded.push((uid, tf)),
        }
    }
    folded
}
