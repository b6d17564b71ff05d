//! On-disk index artifacts: meta descriptor, term map, packed doc index, and
//! the staged-directory publish that keeps index replacement atomic.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const META_FILE: &str = "index.meta.json";
pub const POSTINGS_FILE: &str = "index.postings";
pub const TERMS_FILE: &str = "index.terms.json";
pub const DOC_STORE_FILE: &str = "doc_store.jsonl";
pub const DOC_INDEX_FILE: &str = "doc_index.bin";
pub const BLOCKS_DIR: &str = "blocks";
pub const DOC_STORE_PARTS_DIR: &str = "doc_store_parts";

/// Descriptor of a published index. `n_docs` counts doc_uids, which are dense
/// in `[0, n_docs)` after a successful build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMeta {
    pub format: String,
    #[serde(rename = "N")]
    pub n_docs: u64,
    pub vocab_size: u64,
    pub postings_path: String,
    pub terms_index_path: String,
    pub doc_store_path: String,
    pub doc_index_path: String,
    pub doc_index_type: String,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn meta(&self) -> PathBuf {
        self.root.join(META_FILE)
    }
    pub fn postings(&self) -> PathBuf {
        self.root.join(POSTINGS_FILE)
    }
    pub fn terms(&self) -> PathBuf {
        self.root.join(TERMS_FILE)
    }
    pub fn doc_store(&self) -> PathBuf {
        self.root.join(DOC_STORE_FILE)
    }
    pub fn doc_index(&self) -> PathBuf {
        self.root.join(DOC_INDEX_FILE)
    }
    pub fn blocks_dir(&self) -> PathBuf {
        self.root.join(BLOCKS_DIR)
    }
    pub fn doc_store_parts_dir(&self) -> PathBuf {
        self.root.join(DOC_STORE_PARTS_DIR)
    }
}

pub fn save_meta(paths: &IndexPaths, meta: &IndexMeta) -> io::Result<()> {
    let mut file = File::create(paths.meta())?;
    file.write_all(to_json(meta)?.as_bytes())?;
    file.sync_all()
}

pub fn load_meta(paths: &IndexPaths) -> io::Result<IndexMeta> {
    from_json(&fs::read_to_string(paths.meta())?)
}

/// The term map is serialized sorted by term so that rebuilding an identical
/// corpus yields byte-identical artifacts.
pub fn save_terms(paths: &IndexPaths, terms: &BTreeMap<String, (u64, u64)>) -> io::Result<()> {
    let mut file = File::create(paths.terms())?;
    file.write_all(to_json(terms)?.as_bytes())?;
    file.sync_all()
}

pub fn load_terms(paths: &IndexPaths) -> io::Result<HashMap<String, (u64, u64)>> {
    from_json(&fs::read_to_string(paths.terms())?)
}

/// doc_uid is dense, so the doc index is a packed array of little-endian u64
/// byte offsets into the doc store; entry k belongs to doc_uid k.
pub fn save_doc_index(paths: &IndexPaths, offsets: &[u64]) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(paths.doc_index())?);
    for &offset in offsets {
        out.write_u64::<LittleEndian>(offset)?;
    }
    out.flush()?;
    out.into_inner()?.sync_all()
}

pub fn load_doc_index(paths: &IndexPaths) -> io::Result<Vec<u64>> {
    let file = File::open(paths.doc_index())?;
    let entries = (file.metadata()?.len() / 8) as usize;
    let mut reader = BufReader::new(file);
    let mut offsets = Vec::with_capacity(entries);
    for _ in 0..entries {
        offsets.push(reader.read_u64::<LittleEndian>()?);
    }
    Ok(offsets)
}

/// Swap a fully written staging directory into place. The old index (if any)
/// is only removed after the new one has been renamed in, so readers never
/// observe a partially written artifact set.
pub fn publish(staging: &Path, root: &Path) -> io::Result<()> {
    let old = root.with_extension("old");
    if old.exists() {
        fs::remove_dir_all(&old)?;
    }
    if root.exists() {
        fs::rename(root, &old)?;
    }
    fs::rename(staging, root)?;
    if old.exists() {
        fs::remove_dir_all(&old)?;
    }
    Ok(())
}

fn to_json<T: Serialize>(value: &T) -> io::Result<String> {
    serde_json::to_string(value).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
}

fn from_json<T: for<'de> Deserialize<'de>>(raw: &str) -> io::Result<T> {
    serde_json::from_str(raw).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_index_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let offsets = vec![0u64, 17, 121, 4096];
        save_doc_index(&paths, &offsets).unwrap();
        assert_eq!(load_doc_index(&paths).unwrap(), offsets);
    }

    #[test]
    fn publish_replaces_previous_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("indexes");
        let staging = dir.path().join("indexes.staging");

        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("marker"), "old").unwrap();
        fs::create_dir_all(&staging).unwrap();
        fs::write(staging.join("marker"), "new").unwrap();

        publish(&staging, &root).unwrap();
        assert_eq!(fs::read_to_string(root.join("marker")).unwrap(), "new");
        assert!(!staging.exists());
        assert!(!root.with_extension("old").exists());
    }
}
