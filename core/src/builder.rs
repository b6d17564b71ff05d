//! Orchestrates a full index build: partition, schedule, merge, publish.

use crate::block::BlockContext;
use crate::config::Config;
use crate::error::BuildError;
use crate::merge::{self, MergeOptions};
use crate::partition::BlockRanges;
use crate::persist::{self, IndexPaths};
use crate::scheduler::{self, SchedulerOptions};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Serialize)]
pub struct BuildSummary {
    pub indexed_docs: u64,
    pub rejected_docs: u64,
    pub vocab_size: u64,
    pub index_path: String,
}

/// Build a fresh index from `corpus_path` and atomically publish it at
/// `index_root`. On any failure the previously published index is left
/// untouched; staging output is removed unless `index_keep_blocks` is set.
pub fn build_index(
    corpus_path: &Path,
    index_root: &Path,
    config: &Config,
) -> Result<BuildSummary, BuildError> {
    if !corpus_path.is_file() {
        return Err(BuildError::CorpusMissing(corpus_path.to_path_buf()));
    }
    let started = Instant::now();

    let staging_dir = index_root.with_extension("staging");
    if staging_dir.exists() {
        fs::remove_dir_all(&staging_dir)?;
    }
    let staging = IndexPaths::new(&staging_dir);
    fs::create_dir_all(staging.blocks_dir())?;
    fs::create_dir_all(staging.doc_store_parts_dir())?;

    let result = run_build(corpus_path, &staging, config);
    match result {
        Ok(summary) => {
            if !config.index_keep_blocks {
                fs::remove_dir_all(staging.blocks_dir())?;
                fs::remove_dir_all(staging.doc_store_parts_dir())?;
            }
            persist::publish(&staging_dir, index_root)?;
            tracing::info!(
                indexed_docs = summary.indexed_docs,
                rejected_docs = summary.rejected_docs,
                vocab_size = summary.vocab_size,
                elapsed_s = started.elapsed().as_secs_f64(),
                "index build complete"
            );
            Ok(BuildSummary {
                index_path: index_root.display().to_string(),
                ..summary
            })
        }
        Err(err) => {
            if !config.index_keep_blocks {
                let _ = fs::remove_dir_all(&staging_dir);
            }
            Err(err)
        }
    }
}

fn run_build(
    corpus_path: &Path,
    staging: &IndexPaths,
    config: &Config,
) -> Result<BuildSummary, BuildError> {
    let ranges = BlockRanges::open(corpus_path, config.index_block_docs)?;
    let ctx = Arc::new(BlockContext {
        corpus_path: corpus_path.to_path_buf(),
        blocks_dir: staging.blocks_dir(),
        doc_store_parts_dir: staging.doc_store_parts_dir(),
        block_docs: config.index_block_docs,
        default_language: config.default_language,
        min_token_len: config.min_token_len,
    });
    let opts = SchedulerOptions {
        workers: config.index_workers,
        max_in_flight: config.in_flight_window(),
        max_tasks_per_child: config.index_max_tasks_per_child,
    };

    let outputs = scheduler::run_blocks(ctx, ranges, &opts)?;
    let indexed_docs: u64 = outputs.iter().map(|o| o.accepted).sum();
    let rejected_docs: u64 = outputs.iter().map(|o| o.rejected).sum();
    if indexed_docs == 0 {
        return Err(BuildError::EmptyCorpus);
    }

    let merge_opts = MergeOptions {
        min_df: config.min_df,
        max_df_ratio: config.max_df_ratio,
    };
    let summary = merge::merge_blocks(staging, &outputs, &merge_opts)?;

    Ok(BuildSummary {
        indexed_docs,
        rejected_docs,
        vocab_size: summary.vocab_size,
        index_path: String::new(),
    })
}
