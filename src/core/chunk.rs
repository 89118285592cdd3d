use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Transfer unit for jar uploads and resource files.
pub const CHUNK_SIZE: usize = 1024 * 1024;

/// `(offset, length)` pairs covering `len` bytes exactly once.
pub fn chunk_spans(len: u64, chunk_size: usize) -> Vec<(u64, usize)> {
    let step = chunk_size.max(1) as u64;
    let mut spans = Vec::new();
    let mut offset = 0;
    while offset < len {
        let size = (len - offset).min(step);
        spans.push((offset, size as usize));
        offset += size;
    }
    spans
}

pub struct FileChunks {
    file: File,
    spans: std::vec::IntoIter<(u64, usize)>,
}

impl FileChunks {
    pub fn open(path: &Path, chunk_size: usize) -> std::io::Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            file,
            spans: chunk_spans(len, chunk_size).into_iter(),
        })
    }
}

impl Iterator for FileChunks {
    type Item = std::io::Result<(u64, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        let (offset, size) = self.spans.next()?;
        let mut buf = vec![0u8; size];
        let read = self
            .file
            .seek(SeekFrom::Start(offset))
            .and_then(|_| self.file.read_exact(&mut buf));
        Some(read.map(|_| (offset, buf)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_spans_cover_file_without_gaps() {
        let spans = chunk_spans(10, 4);
        assert_eq!(spans, vec![(0, 4), (4, 4), (8, 2)]);
        assert_eq!(spans.iter().map(|(_, n)| n).sum::<usize>(), 10);
    }

    #[test]
    fn test_spans_exact_multiple() {
        assert_eq!(chunk_spans(8, 4), vec![(0, 4), (4, 4)]);
        assert_eq!(chunk_spans(CHUNK_SIZE as u64 * 2, CHUNK_SIZE).len(), 2);
    }

    #[test]
    fn test_spans_empty_file() {
        assert!(chunk_spans(0, CHUNK_SIZE).is_empty());
    }

    #[test]
    fn test_file_chunks_reads_content() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"abcdefghij").unwrap();

        let chunks: Vec<_> = FileChunks::open(file.path(), 4)
            .unwrap()
            .collect::<std::io::Result<_>>()
            .unwrap();

        assert_eq!(
            chunks,
            vec![
                (0, b"abcd".to_vec()),
                (4, b"efgh".to_vec()),
                (8, b"ij".to_vec())
            ]
        );
    }
}
