//! Block worker: turns one byte range of the corpus into a sorted partial
//! postings file plus a document-store shard.

use crate::error::BuildError;
use crate::language::Language;
use crate::partition::BlockRange;
use crate::pipeline;
use crate::{DocUid, RawDocument, StoredDoc, SNIPPET_CHARS};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

/// Shared, immutable input every worker needs.
#[derive(Debug, Clone)]
pub struct BlockContext {
    pub corpus_path: PathBuf,
    pub blocks_dir: PathBuf,
    pub doc_store_parts_dir: PathBuf,
    pub block_docs: u64,
    pub default_language: Language,
    pub min_token_len: usize,
}

#[derive(Debug)]
pub struct BlockOutput {
    pub block_id: u64,
    pub postings_path: PathBuf,
    pub doc_store_path: PathBuf,
    pub accepted: u64,
    pub rejected: u64,
}

/// Process one block: parse records, run the pipeline, and write both output
/// files. Unparseable or incomplete lines are counted and skipped; the k-th
/// accepted record gets `doc_uid = block_id * block_docs + k`, so gaps from
/// rejected lines are compacted later by the merger.
pub fn process_block(ctx: &BlockContext, range: BlockRange) -> Result<BlockOutput, BuildError> {
    let base_doc_uid = range.block_id * ctx.block_docs;

    let mut corpus = File::open(&ctx.corpus_path)?;
    corpus.seek(SeekFrom::Start(range.start))?;
    let mut reader = BufReader::new(corpus.take(range.end - range.start));

    let doc_store_path = ctx
        .doc_store_parts_dir
        .join(format!("doc_store_{}.jsonl", range.block_id));
    let mut store = BufWriter::new(File::create(&doc_store_path)?);

    let mut postings: BTreeMap<String, Vec<(DocUid, u32)>> = BTreeMap::new();
    let mut accepted = 0u64;
    let mut rejected = 0u64;

    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed.trim().is_empty() {
            rejected += 1;
            continue;
        }
        let doc: RawDocument = match serde_json::from_str(trimmed) {
            Ok(doc) => doc,
            Err(err) => {
                tracing::warn!(block_id = range.block_id, %err, "skipping unparseable corpus line");
                rejected += 1;
                continue;
            }
        };
        if doc.doc_id.is_empty() {
            tracing::warn!(block_id = range.block_id, "skipping record with empty doc_id");
            rejected += 1;
            continue;
        }

        let doc_uid = base_doc_uid + accepted;
        accepted += 1;

        let combined = format!("{} {}", doc.title, doc.text);
        let analysis = pipeline::analyze(&combined, ctx.default_language, ctx.min_token_len);

        let mut tf: HashMap<String, u32> = HashMap::new();
        for token in analysis.tokens {
            *tf.entry(token).or_insert(0) += 1;
        }
        for (term, count) in tf {
            postings.entry(term).or_default().push((doc_uid, count));
        }

        let stored = StoredDoc {
            doc_uid,
            doc_id: doc.doc_id,
            title: doc.title,
            url: doc.url,
            snippet: doc.text.chars().take(SNIPPET_CHARS).collect(),
            language: analysis
                .detected
                .map(|l| l.as_str().to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        };
        serde_json::to_writer(&mut store, &stored)?;
        store.write_all(b"\n")?;
    }
    store.flush()?;

    // BTreeMap iteration gives term-ascending lines; postings are doc_uid
    // ascending because documents were consumed in uid order.
    let postings_path = ctx
        .blocks_dir
        .join(format!("block_{}.jsonl", range.block_id));
    let mut out = BufWriter::new(File::create(&postings_path)?);
    for (term, list) in &postings {
        out.write_all(term.as_bytes())?;
        out.write_all(b"\t")?;
        serde_json::to_writer(&mut out, list)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;

    Ok(BlockOutput {
        block_id: range.block_id,
        postings_path,
        doc_store_path,
        accepted,
        rejected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_outputs_are_sorted_and_counted() {
        let dir = tempfile::tempdir().unwrap();
        let corpus_path = dir.path().join("corpus.jsonl");
        let mut corpus = File::create(&corpus_path).unwrap();
        writeln!(corpus, r#"{{"doc_id":"a","text":"el gato y el perro"}}"#).unwrap();
        writeln!(corpus, "not json at all").unwrap();
        writeln!(corpus, r#"{{"doc_id":"b","text":"el perro ladra"}}"#).unwrap();
        let end = std::fs::metadata(&corpus_path).unwrap().len();

        let ctx = BlockContext {
            corpus_path,
            blocks_dir: dir.path().to_path_buf(),
            doc_store_parts_dir: dir.path().to_path_buf(),
            block_docs: 10,
            default_language: Language::Spanish,
            min_token_len: 2,
        };
        let out = process_block(
            &ctx,
            BlockRange {
                block_id: 0,
                start: 0,
                end,
            },
        )
        .unwrap();

        assert_eq!(out.accepted, 2);
        assert_eq!(out.rejected, 1);

        let lines: Vec<String> = std::fs::read_to_string(&out.postings_path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect();
        let terms: Vec<&str> = lines
            .iter()
            .map(|l| l.split_once('\t').unwrap().0)
            .collect();
        let mut sorted = terms.clone();
        sorted.sort();
        assert_eq!(terms, sorted);
        assert!(terms.contains(&"perr"));

        // "perr" appears in both accepted docs, uid ascending
        let perr = lines.iter().find(|l| l.starts_with("perr\t")).unwrap();
        let list: Vec<(u64, u32)> =
            serde_json::from_str(perr.split_once('\t').unwrap().1).unwrap();
        assert_eq!(list, vec![(0, 1), (1, 1)]);
    }
}
