use anyhow::Result;
use clap::{Parser, Subcommand};
use lexio_core::builder::build_index;
use lexio_core::config::Config;
use lexio_core::language::Language;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build the block inverted index from a JSONL corpus", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a fresh index and atomically replace the published one
    Build {
        /// Corpus file (defaults to DATA_DIR/raw/corpus.jsonl)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Index directory (defaults to DATA_DIR/indexes)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Fallback language when detection returns unknown
        #[arg(long)]
        language: Option<Language>,
        /// Worker pool size
        #[arg(long)]
        workers: Option<usize>,
        /// Documents per block
        #[arg(long)]
        block_docs: Option<u64>,
        /// In-flight window; 0 means twice the worker count
        #[arg(long)]
        max_in_flight: Option<usize>,
        /// Recycle a worker after this many blocks; 0 disables
        #[arg(long)]
        max_tasks_per_child: Option<usize>,
        /// Prune terms with a lower document frequency
        #[arg(long)]
        min_df: Option<u64>,
        /// Prune terms present in more than this fraction of documents
        #[arg(long)]
        max_df_ratio: Option<f64>,
        /// Keep blocks/ and doc_store_parts/ after a successful build
        #[arg(long, default_value_t = false)]
        keep_blocks: bool,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            input,
            output,
            language,
            workers,
            block_docs,
            max_in_flight,
            max_tasks_per_child,
            min_df,
            max_df_ratio,
            keep_blocks,
        } => {
            let mut config = Config::from_env();
            if let Some(language) = language {
                config.default_language = language;
            }
            if let Some(workers) = workers {
                config.index_workers = workers;
            }
            if let Some(block_docs) = block_docs {
                config.index_block_docs = block_docs;
            }
            if let Some(max_in_flight) = max_in_flight {
                config.index_max_in_flight = max_in_flight;
            }
            if let Some(max_tasks_per_child) = max_tasks_per_child {
                config.index_max_tasks_per_child = max_tasks_per_child;
            }
            if let Some(min_df) = min_df {
                config.min_df = min_df;
            }
            if let Some(max_df_ratio) = max_df_ratio {
                config.max_df_ratio = max_df_ratio;
            }
            config.index_keep_blocks |= keep_blocks;

            let corpus = input.unwrap_or_else(|| config.default_corpus_path());
            let index_root = output.unwrap_or_else(|| config.index_dir());

            let summary = build_index(&corpus, &index_root, &config)?;
            tracing::info!(
                indexed_docs = summary.indexed_docs,
                rejected_docs = summary.rejected_docs,
                vocab_size = summary.vocab_size,
                index_path = %summary.index_path,
                "index build complete"
            );
            Ok(())
        }
    }
}
