//! Runtime configuration, environment-variable backed with sane defaults.

use crate::language::Language;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the data layout; the default corpus lives under `raw/` and
    /// index artifacts under `indexes/`.
    pub data_dir: PathBuf,
    /// Fallback language for the preprocessing debug endpoints.
    pub default_language: Language,
    /// Fallback when a query's language detects as unknown.
    pub default_query_language: Language,
    pub top_k: usize,
    pub min_token_len: usize,
    /// Terms with a lower document frequency are pruned at merge time.
    pub min_df: u64,
    /// Terms with `df / N` above this are pruned at merge time.
    pub max_df_ratio: f64,
    pub index_workers: usize,
    pub index_block_docs: u64,
    /// Bounded in-flight window; 0 means `2 * index_workers`.
    pub index_max_in_flight: usize,
    /// Recycle a worker after this many tasks; 0 disables recycling.
    pub index_max_tasks_per_child: usize,
    /// Retain `blocks/` and `doc_store_parts/` after a successful build.
    pub index_keep_blocks: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            default_language: Language::Spanish,
            default_query_language: Language::Spanish,
            top_k: 10,
            min_token_len: 2,
            min_df: 1,
            max_df_ratio: 0.9,
            index_workers: 4,
            index_block_docs: 1000,
            index_max_in_flight: 0,
            index_max_tasks_per_child: 0,
            index_keep_blocks: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            data_dir: env::var("DATA_DIR").map(PathBuf::from).unwrap_or(d.data_dir),
            default_language: env_parse("DEFAULT_LANGUAGE", d.default_language),
            default_query_language: env_parse("DEFAULT_QUERY_LANGUAGE", d.default_query_language),
            top_k: env_parse("TOP_K", d.top_k),
            min_token_len: env_parse("MIN_TOKEN_LEN", d.min_token_len),
            min_df: env_parse("MIN_DF", d.min_df),
            max_df_ratio: env_parse("MAX_DF_RATIO", d.max_df_ratio),
            index_workers: env_parse("INDEX_WORKERS", d.index_workers),
            index_block_docs: env_parse("INDEX_BLOCK_DOCS", d.index_block_docs),
            index_max_in_flight: env_parse("INDEX_MAX_IN_FLIGHT", d.index_max_in_flight),
            index_max_tasks_per_child: env_parse(
                "INDEX_MAX_TASKS_PER_CHILD",
                d.index_max_tasks_per_child,
            ),
            index_keep_blocks: env_flag("INDEX_KEEP_BLOCKS"),
        }
    }

    pub fn default_corpus_path(&self) -> PathBuf {
        self.data_dir.join("raw").join("corpus.jsonl")
    }

    pub fn index_dir(&self) -> PathBuf {
        self.data_dir.join("indexes")
    }

    /// Effective in-flight window for the build scheduler.
    pub fn in_flight_window(&self) -> usize {
        if self.index_max_in_flight == 0 {
            2 * self.index_workers.max(1)
        } else {
            self.index_max_in_flight
        }
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str) -> bool {
    matches!(
        env::var(key).as_deref(),
        Ok("1") | Ok("true") | Ok("yes") | Ok("on")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_defaults_to_twice_workers() {
        let config = Config {
            index_workers: 3,
            index_max_in_flight: 0,
            ..Config::default()
        };
        assert_eq!(config.in_flight_window(), 6);

        let config = Config {
            index_max_in_flight: 5,
            ..config
        };
        assert_eq!(config.in_flight_window(), 5);

        // an explicit window below the worker count is kept as configured
        let config = Config {
            index_workers: 8,
            index_max_in_flight: 2,
            ..config
        };
        assert_eq!(config.in_flight_window(), 2);
    }
}
