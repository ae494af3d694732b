//! Output file handles for demultiplexed reads.

use flate2::{write::GzEncoder, Compression};
use rustc_hash::{FxHashMap, FxHashSet};

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::OutputOptions;
use crate::errors::*;
use crate::fastq::*;

enum Sink {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl Sink {
    fn create(path: &Path, compress: bool) -> Result<Self> {
        let f = BufWriter::new(File::create(path).map_err(|e| Error::file_io(path, e))?);

        if compress {
            Ok(Sink::Gzip(GzEncoder::new(f, Compression::default())))
        } else {
            Ok(Sink::Plain(f))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Sink::Plain(w) => w as &mut dyn Write,
            Sink::Gzip(w) => w as &mut dyn Write,
        }
    }

    fn finish(self) -> std::io::Result<()> {
        match self {
            Sink::Plain(mut w) => w.flush(),
            Sink::Gzip(w) => w.finish()?.flush(),
        }
    }
}

/// An open R1/R2 output file pair.
pub struct WriterPair {
    sink1: Sink,
    sink2: Sink,
    path1: PathBuf,
    path2: PathBuf,
    written: u64,
}

impl WriterPair {
    fn create(out_dir: &Path, stem: &str, options: &OutputOptions) -> Result<Self> {
        let ext = if options.compress { "fastq.gz" } else { "fastq" };
        let path1 = out_dir.join(format!("{}.r1.{}", stem, ext));
        let path2 = out_dir.join(format!("{}.r2.{}", stem, ext));

        Ok(Self {
            sink1: Sink::create(&path1, options.compress)?,
            sink2: Sink::create(&path2, options.compress)?,
            path1,
            path2,
            written: 0,
        })
    }

    /// Write the R1 record and then the R2 record of a pair.
    pub fn write_pair(&mut self, pair: &ReadPair) -> Result<()> {
        write_fastq_record(self.sink1.writer(), &pair.r1).map_err(|e| Error::file_io(&self.path1, e))?;
        write_fastq_record(self.sink2.writer(), &pair.r2).map_err(|e| Error::file_io(&self.path2, e))?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    fn close(self) -> Result<()> {
        let WriterPair { sink1, sink2, path1, path2, .. } = self;
        let res1 = sink1.finish().map_err(|e| Error::file_io(&path1, e));
        let res2 = sink2.finish().map_err(|e| Error::file_io(&path2, e));
        res1.and(res2)
    }
}

/// File name stem for a sample id, with path separators and NUL replaced by `_`.
///
/// Names made only of dots are prefixed so they never refer to a directory.
pub fn file_stem(sample_id: &str) -> String {
    let stem = sample_id
        .chars()
        .map(|c| if std::path::is_separator(c) || c == '\\' || c == '\0' { '_' } else { c })
        .collect::<String>();

    if stem.chars().all(|c| c == '.') {
        format!("_{}", stem)
    } else {
        stem
    }
}

/// Handle to the output files of one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleHandle(usize);

/// Owns every output file of a run.
///
/// Sample files are created on request, the undetermined pair is created up front.
pub struct OutputWriters {
    out_dir: PathBuf,
    options: OutputOptions,
    samples: Vec<WriterPair>,
    handles: FxHashMap<String, SampleHandle>,
    // file stems in use, including the undetermined prefix
    stems: FxHashSet<String>,
    undetermined: WriterPair,
}

impl OutputWriters {
    /// Create the output directory and the undetermined files.
    pub fn new(out_dir: impl Into<PathBuf>, options: OutputOptions) -> Result<Self> {
        let out_dir = out_dir.into();
        std::fs::create_dir_all(&out_dir).map_err(|e| Error::file_io(&out_dir, e))?;

        let undetermined = WriterPair::create(&out_dir, &options.undetermined_prefix, &options)?;
        let mut stems = FxHashSet::default();
        stems.insert(options.undetermined_prefix.clone());

        Ok(Self {
            out_dir,
            options,
            samples: Vec::new(),
            handles: FxHashMap::default(),
            stems,
            undetermined,
        })
    }

    /// Create the output files for a sample.
    ///
    /// Files are always created directly in the output directory. If the sample id is not a
    /// plain file name, or its name is already taken by another sample or by the undetermined
    /// files, a numbered suffix is added to the file name.
    pub fn open_sample(&mut self, sample_id: &str) -> Result<SampleHandle> {
        if self.handles.contains_key(sample_id) {
            return Err(Error::DuplicateSample {
                sample_id: sample_id.to_owned(),
            });
        }

        let stem = self.unique_stem(sample_id);
        let writer = WriterPair::create(&self.out_dir, &stem, &self.options)?;
        self.stems.insert(stem);
        log::debug!(
            "Opened {} and {}",
            writer.path1.display(),
            writer.path2.display()
        );

        let handle = SampleHandle(self.samples.len());
        self.samples.push(writer);
        self.handles.insert(sample_id.to_owned(), handle);
        Ok(handle)
    }

    fn unique_stem(&self, sample_id: &str) -> String {
        let base = file_stem(sample_id);
        let mut stem = base.clone();
        let mut n = 2;
        while self.stems.contains(&stem) {
            stem = format!("{}_{}", base, n);
            n += 1;
        }

        if stem != sample_id {
            log::warn!(
                "Writing reads of sample \"{}\" to files named \"{}\"",
                sample_id,
                stem
            );
        }
        stem
    }

    pub fn handle(&self, sample_id: &str) -> Option<SampleHandle> {
        self.handles.get(sample_id).copied()
    }

    pub fn write_pair(&mut self, handle: SampleHandle, pair: &ReadPair) -> Result<()> {
        self.samples[handle.0].write_pair(pair)
    }

    pub fn write_undetermined(&mut self, pair: &ReadPair) -> Result<()> {
        self.undetermined.write_pair(pair)
    }

    pub fn sample_written(&self, handle: SampleHandle) -> u64 {
        self.samples[handle.0].written()
    }

    pub fn undetermined_written(&self) -> u64 {
        self.undetermined.written()
    }

    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }

    /// Flush and close every file, returning the first error.
    ///
    /// All files are closed even if an earlier one fails.
    pub fn close(self) -> Result<()> {
        let mut res = Ok(());

        for writer in self.samples.into_iter().chain(std::iter::once(self.undetermined)) {
            let r = writer.close();
            if res.is_ok() {
                res = r;
            }
        }

        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Read;

    use flate2::read::MultiGzDecoder;

    fn pair(name: &str) -> ReadPair {
        ReadPair {
            r1: FastqRecord::new(format!("@{} 1:N:0:AAAA", name), "ACGT", "+", "IIII"),
            r2: FastqRecord::new(format!("@{} 2:N:0:AAAA", name), "TTGG", "+", "####"),
        }
    }

    #[test]
    fn test_lazy_sample_files() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("out");
        let mut writers = OutputWriters::new(&out_dir, OutputOptions::default()).unwrap();

        assert!(out_dir.join("undetermined.r1.fastq").exists());
        assert!(out_dir.join("undetermined.r2.fastq").exists());
        assert!(!out_dir.join("s1.r1.fastq").exists());

        let handle = writers.open_sample("s1").unwrap();
        assert_eq!(writers.handle("s1"), Some(handle));
        writers.write_pair(handle, &pair("a")).unwrap();
        writers.write_undetermined(&pair("b")).unwrap();
        assert_eq!(writers.sample_written(handle), 1);
        writers.close().unwrap();

        let r1 = std::fs::read_to_string(out_dir.join("s1.r1.fastq")).unwrap();
        let r2 = std::fs::read_to_string(out_dir.join("s1.r2.fastq")).unwrap();
        assert_eq!(r1, "@a 1:N:0:AAAA\nACGT\n+\nIIII\n");
        assert_eq!(r2, "@a 2:N:0:AAAA\nTTGG\n+\n####\n");

        let u1 = std::fs::read_to_string(out_dir.join("undetermined.r1.fastq")).unwrap();
        assert_eq!(u1, "@b 1:N:0:AAAA\nACGT\n+\nIIII\n");
    }

    #[test]
    fn test_reopen_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut writers = OutputWriters::new(dir.path(), OutputOptions::default()).unwrap();

        writers.open_sample("s1").unwrap();
        assert!(matches!(writers.open_sample("s1"), Err(Error::DuplicateSample { .. })));
        assert_eq!(writers.num_samples(), 1);
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("AC/GT"), "AC_GT");
        assert_eq!(file_stem("/abs/x"), "_abs_x");
        assert_eq!(file_stem("a\\b"), "a_b");
        assert_eq!(file_stem(".."), "_..");
        assert_eq!(file_stem(""), "_");
        assert_eq!(file_stem("ACGT..TT"), "ACGT..TT");
    }

    #[test]
    fn test_taken_names_get_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let mut writers = OutputWriters::new(dir.path(), OutputOptions::default()).unwrap();

        let reserved = writers.open_sample("undetermined").unwrap();
        let slash = writers.open_sample("AC/GT").unwrap();
        let underscore = writers.open_sample("AC_GT").unwrap();
        writers.write_pair(reserved, &pair("a")).unwrap();
        writers.write_pair(slash, &pair("b")).unwrap();
        writers.write_pair(underscore, &pair("c")).unwrap();
        writers.close().unwrap();

        let read = |name: &str| std::fs::read_to_string(dir.path().join(name)).unwrap();
        assert_eq!(read("undetermined.r1.fastq"), "");
        assert_eq!(read("undetermined_2.r1.fastq"), "@a 1:N:0:AAAA\nACGT\n+\nIIII\n");
        assert_eq!(read("AC_GT.r1.fastq"), "@b 1:N:0:AAAA\nACGT\n+\nIIII\n");
        assert_eq!(read("AC_GT_2.r2.fastq"), "@c 2:N:0:AAAA\nTTGG\n+\n####\n");
    }

    #[test]
    fn test_compressed_output() {
        let dir = tempfile::tempdir().unwrap();
        let options = OutputOptions {
            compress: true,
            ..OutputOptions::default()
        };
        let mut writers = OutputWriters::new(dir.path(), options).unwrap();
        let handle = writers.open_sample("s1").unwrap();
        writers.write_pair(handle, &pair("a")).unwrap();
        writers.close().unwrap();

        let mut text = String::new();
        MultiGzDecoder::new(File::open(dir.path().join("s1.r1.fastq.gz")).unwrap())
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "@a 1:N:0:AAAA\nACGT\n+\nIIII\n");
        assert!(dir.path().join("undetermined.r2.fastq.gz").exists());
    }
}
