//! Splits the corpus file into byte ranges of whole lines without parsing
//! records, so workers can open and seek independently.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// A contiguous byte range `[start, end)` of the corpus holding complete
/// lines. `start` is line-aligned; `end` is one past the terminator of the
/// range's last line (or EOF for an unterminated final line).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    pub block_id: u64,
    pub start: u64,
    pub end: u64,
}

/// Lazy iterator of [`BlockRange`]s with `block_docs` lines each; only the
/// last range may be shorter. Costs one sequential scan of the file and
/// never holds more than one line in memory.
pub struct BlockRanges {
    reader: BufReader<File>,
    block_docs: u64,
    next_block_id: u64,
    offset: u64,
    buf: Vec<u8>,
    done: bool,
}

impl BlockRanges {
    pub fn open(path: &Path, block_docs: u64) -> io::Result<Self> {
        Ok(Self {
            reader: BufReader::new(File::open(path)?),
            block_docs: block_docs.max(1),
            next_block_id: 0,
            offset: 0,
            buf: Vec::new(),
            done: false,
        })
    }
}

impl Iterator for BlockRanges {
    type Item = io::Result<BlockRange>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let start = self.offset;
        let mut lines = 0;
        while lines < self.block_docs {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    self.done = true;
                    break;
                }
                Ok(n) => {
                    self.offset += n as u64;
                    lines += 1;
                }
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
        if lines == 0 {
            return None;
        }
        let range = BlockRange {
            block_id: self.next_block_id,
            start,
            end: self.offset,
        };
        self.next_block_id += 1;
        Some(Ok(range))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_lines(lines: &[&str], trailing_newline: bool) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for (i, line) in lines.iter().enumerate() {
            if i + 1 == lines.len() && !trailing_newline {
                write!(file, "{line}").unwrap();
            } else {
                writeln!(file, "{line}").unwrap();
            }
        }
        file
    }

    #[test]
    fn splits_into_uniform_ranges() {
        let lines: Vec<String> = (0..25).map(|i| format!("line-{i}")).collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let file = write_lines(&refs, true);

        let ranges: Vec<BlockRange> = BlockRanges::open(file.path(), 10)
            .unwrap()
            .map(Result::unwrap)
            .collect();
        assert_eq!(ranges.len(), 3);
        assert_eq!(ranges[0].start, 0);
        for pair in ranges.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        let file_len = std::fs::metadata(file.path()).unwrap().len();
        assert_eq!(ranges[2].end, file_len);
    }

    #[test]
    fn unterminated_final_line_is_counted() {
        let file = write_lines(&["a", "b", "c"], false);
        let ranges: Vec<BlockRange> = BlockRanges::open(file.path(), 2)
            .unwrap()
            .map(Result::unwrap)
            .collect();
        assert_eq!(ranges.len(), 2);
        let file_len = std::fs::metadata(file.path()).unwrap().len();
        assert_eq!(ranges[1].end, file_len);
    }

    #[test]
    fn empty_file_yields_nothing() {
        let file = write_lines(&[], true);
        assert_eq!(BlockRanges::open(file.path(), 4).unwrap().count(), 0);
    }
}
