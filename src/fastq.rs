//! Streaming fastq input and output.
//!
//! Records are read lazily, four lines at a time, from plain or gzip compressed files.
//! Paired-end files are advanced in lockstep with [`iter_fastq2`].

use flate2::read::MultiGzDecoder;

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::sync::Arc;

use crate::errors::*;

/// Where a stream of records comes from, used when reporting errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    File(String),
    Bytes,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Origin::*;
        match self {
            File(file) => write!(f, "file: \"{}\"", file),
            Bytes => write!(f, "bytes"),
        }
    }
}

/// A single fastq record, kept as the raw bytes of its four lines without line terminators.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FastqRecord {
    pub header: Vec<u8>,
    pub seq: Vec<u8>,
    pub plus: Vec<u8>,
    pub qual: Vec<u8>,
}

impl FastqRecord {
    pub fn new(
        header: impl Into<Vec<u8>>,
        seq: impl Into<Vec<u8>>,
        plus: impl Into<Vec<u8>>,
        qual: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            header: header.into(),
            seq: seq.into(),
            plus: plus.into(),
            qual: qual.into(),
        }
    }
}

/// An R1 record and the R2 record at the same position in the mate file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadPair {
    pub r1: FastqRecord,
    pub r2: FastqRecord,
}

/// Lazily reads four-line fastq records from a buffered reader.
///
/// A trailing record with fewer than four lines is dropped.
pub struct FastqReader<R: BufRead> {
    reader: R,
    origin: Arc<Origin>,
    idx: usize,
    done: bool,
}

impl<R: BufRead> FastqReader<R> {
    pub fn new(reader: R, origin: Origin) -> Self {
        Self {
            reader,
            origin: Arc::new(origin),
            idx: 0,
            done: false,
        }
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Read one line into `buf`, returning `false` at end of stream.
    fn read_line(&mut self, buf: &mut Vec<u8>) -> Result<bool> {
        buf.clear();
        let n = self
            .reader
            .read_until(b'\n', buf)
            .map_err(|e| Error::ParseRecord {
                origin: (*self.origin).clone(),
                idx: self.idx,
                source: e,
            })?;

        if n == 0 {
            return Ok(false);
        }

        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }

        Ok(true)
    }

    fn next_record(&mut self) -> Result<Option<FastqRecord>> {
        let mut record = FastqRecord::default();

        if !self.read_line(&mut record.header)? {
            return Ok(None);
        }

        let complete = self.read_line(&mut record.seq)?
            && self.read_line(&mut record.plus)?
            && self.read_line(&mut record.qual)?;

        if !complete {
            log::debug!(
                "Dropping incomplete record {} at the end of {}",
                self.idx,
                self.origin
            );
            return Ok(None);
        }

        self.idx += 1;
        Ok(Some(record))
    }
}

impl FastqReader<Box<dyn BufRead + Send>> {
    /// Open a fastq file, decompressing it if the file name ends in `.gz`.
    pub fn from_path(file: impl AsRef<Path>) -> Result<Self> {
        let path = file.as_ref();
        let f = File::open(path).map_err(|e| Error::file_io(path, e))?;

        let reader: Box<dyn BufRead + Send> = if is_gzip(path) {
            Box::new(BufReader::new(MultiGzDecoder::new(f)))
        } else {
            Box::new(BufReader::new(f))
        };

        Ok(Self::new(reader, Origin::File(path.display().to_string())))
    }
}

impl<'a> FastqReader<&'a [u8]> {
    pub fn from_bytes(bytes: &'a [u8]) -> Self {
        Self::new(bytes, Origin::Bytes)
    }
}

impl<R: BufRead> Iterator for FastqReader<R> {
    type Item = Result<FastqRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let res = self.next_record().transpose();
        if !matches!(res, Some(Ok(_))) {
            self.done = true;
        }
        res
    }
}

/// Advances two readers in lockstep, stopping at the end of the shorter one.
pub struct PairedReads<R1: BufRead, R2: BufRead> {
    reader1: FastqReader<R1>,
    reader2: FastqReader<R2>,
}

impl<R1: BufRead, R2: BufRead> PairedReads<R1, R2> {
    pub fn new(reader1: FastqReader<R1>, reader2: FastqReader<R2>) -> Self {
        Self { reader1, reader2 }
    }
}

impl<R1: BufRead, R2: BufRead> Iterator for PairedReads<R1, R2> {
    type Item = Result<ReadPair>;

    fn next(&mut self) -> Option<Self::Item> {
        let r1 = match self.reader1.next()? {
            Ok(r) => r,
            Err(e) => return Some(Err(e)),
        };
        let r2 = match self.reader2.next()? {
            Ok(r) => r,
            Err(e) => return Some(Err(e)),
        };

        Some(Ok(ReadPair { r1, r2 }))
    }
}

pub type FileReader = FastqReader<Box<dyn BufRead + Send>>;

/// Stream paired-end reads from two fastq files.
pub fn iter_fastq2(
    file1: impl AsRef<Path>,
    file2: impl AsRef<Path>,
) -> Result<PairedReads<Box<dyn BufRead + Send>, Box<dyn BufRead + Send>>> {
    let reader1 = FileReader::from_path(file1)?;
    let reader2 = FileReader::from_path(file2)?;
    Ok(PairedReads::new(reader1, reader2))
}

/// Stream paired-end reads from two byte slices.
#[must_use]
pub fn iter_fastq2_bytes<'a>(bytes1: &'a [u8], bytes2: &'a [u8]) -> PairedReads<&'a [u8], &'a [u8]> {
    PairedReads::new(FastqReader::from_bytes(bytes1), FastqReader::from_bytes(bytes2))
}

pub fn is_gzip(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "gz")
}

pub fn write_fastq_record(writer: &mut dyn Write, record: &FastqRecord) -> std::io::Result<()> {
    writer.write_all(&record.header)?;
    writer.write_all(b"\n")?;
    writer.write_all(&record.seq)?;
    writer.write_all(b"\n")?;
    writer.write_all(&record.plus)?;
    writer.write_all(b"\n")?;
    writer.write_all(&record.qual)?;
    writer.write_all(b"\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_records() {
        let bytes = b"@r1 1:N:0:AAAA\nACGT\n+\nIIII\n@r2 1:N:0:CCCC\nGGGG\n+r2\n####\n";
        let records = FastqReader::from_bytes(bytes)
            .collect::<Result<Vec<_>>>()
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0], FastqRecord::new("@r1 1:N:0:AAAA", "ACGT", "+", "IIII"));
        assert_eq!(records[1].plus, b"+r2");
        assert_eq!(records[1].qual, b"####");
    }

    #[test]
    fn test_crlf_and_missing_final_newline() {
        let bytes = b"@r1\r\nACGT\r\n+\r\nIIII";
        let records = FastqReader::from_bytes(bytes)
            .collect::<Result<Vec<_>>>()
            .unwrap();

        assert_eq!(records, vec![FastqRecord::new("@r1", "ACGT", "+", "IIII")]);
    }

    #[test]
    fn test_truncated_record_dropped() {
        let bytes = b"@r1\nACGT\n+\nIIII\n@r2\nACGT\n";
        let mut reader = FastqReader::from_bytes(bytes);

        assert!(reader.next().unwrap().is_ok());
        assert!(reader.next().is_none());
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_pairs_stop_at_shorter_stream() {
        let r1 = b"@a\nA\n+\nI\n@b\nC\n+\nI\n@c\nG\n+\nI\n";
        let r2 = b"@a\nT\n+\nI\n@b\nG\n+\nI\n";

        let pairs = iter_fastq2_bytes(r1, r2)
            .collect::<Result<Vec<_>>>()
            .unwrap();

        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1].r1.header, b"@b");
        assert_eq!(pairs[1].r2.seq, b"G");
    }

    #[test]
    fn test_write_record() {
        let mut out = Vec::new();
        write_fastq_record(&mut out, &FastqRecord::new("@r1", "ACGT", "+", "IIII")).unwrap();
        assert_eq!(out, b"@r1\nACGT\n+\nIIII\n");
    }

    #[test]
    fn test_missing_file() {
        let res = FileReader::from_path("/nonexistent/dir/reads.fastq");
        assert!(matches!(res, Err(Error::FileIo { .. })));
    }

    #[test]
    fn test_gzip_extension() {
        assert!(is_gzip(Path::new("reads.fastq.gz")));
        assert!(!is_gzip(Path::new("reads.fastq")));
        assert!(!is_gzip(Path::new("reads.gzip")));
    }
}
