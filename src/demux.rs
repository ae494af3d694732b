//! Demultiplexing paired-end reads into per-sample fastq files.
//!
//! Reads of a sample are buffered in memory until the sample has `min_reads` reads. At that
//! point the sample's output files are created, the buffer is written out, and later reads
//! of the sample go straight to the files. Samples that never reach `min_reads` are written
//! to the undetermined files once all input has been consumed, so at most `min_reads - 1`
//! pairs are ever held per sample.

use rustc_hash::FxHashMap;
use serde::Serialize;

use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::barcode::sample_id;
use crate::config::*;
use crate::errors::*;
use crate::fastq::*;
use crate::progress::{minutes, ProgressLogger};
use crate::samples::SampleMap;
use crate::writers::*;

struct SampleState {
    sample_id: String,
    count: u64,
    buffer: Vec<ReadPair>,
    writer: Option<SampleHandle>,
}

/// Assigns read pairs to samples and routes them to output files.
pub struct Demultiplexer {
    sample_map: SampleMap,
    min_reads: usize,
    // in the order samples were first seen
    states: Vec<SampleState>,
    index: FxHashMap<String, usize>,
    writers: OutputWriters,
    progress: ProgressLogger,
}

impl Demultiplexer {
    /// Create the output directory and undetermined files and start an empty run.
    pub fn new(
        out_dir: impl Into<PathBuf>,
        min_reads: usize,
        options: OutputOptions,
        sample_map: SampleMap,
    ) -> Result<Self> {
        Ok(Self {
            sample_map,
            min_reads,
            states: Vec::new(),
            index: FxHashMap::default(),
            writers: OutputWriters::new(out_dir, options)?,
            progress: ProgressLogger::new(DEFAULT_PROGRESS_INTERVAL),
        })
    }

    #[must_use]
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress = ProgressLogger::new(interval);
        self
    }

    /// Number of reads a sample needs before its files are created.
    fn threshold(&self) -> u64 {
        self.min_reads.max(1) as u64
    }

    /// Assign one read pair to its sample.
    pub fn push(&mut self, pair: ReadPair) -> Result<()> {
        self.progress.record();

        let id = sample_id(&pair.r1, &self.sample_map);
        let threshold = self.threshold();

        let idx = match self.index.get(&id) {
            Some(&idx) => idx,
            None => {
                let idx = self.states.len();
                self.index.insert(id.clone(), idx);
                self.states.push(SampleState {
                    sample_id: id,
                    count: 0,
                    buffer: Vec::new(),
                    writer: None,
                });
                idx
            }
        };

        let state = &mut self.states[idx];
        state.count += 1;

        if let Some(handle) = state.writer {
            return self.writers.write_pair(handle, &pair);
        }

        if state.count < threshold {
            state.buffer.push(pair);
            return Ok(());
        }

        let handle = self.writers.open_sample(&state.sample_id)?;
        state.writer = Some(handle);

        for buffered in std::mem::take(&mut state.buffer) {
            self.writers.write_pair(handle, &buffered)?;
        }
        self.writers.write_pair(handle, &pair)
    }

    /// Consume every pair, then finish the run.
    ///
    /// All output files are closed before an error is returned.
    pub fn run(mut self, pairs: impl IntoIterator<Item = Result<ReadPair>>) -> Result<DemuxSummary> {
        for pair in pairs {
            if let Err(e) = pair.and_then(|p| self.push(p)) {
                if let Err(close_err) = self.writers.close() {
                    log::warn!("Error closing output files after a failed run: {}", close_err);
                }
                return Err(e);
            }
        }

        self.finish()
    }

    /// Write buffered reads of samples below the threshold to the undetermined files and close
    /// every output file.
    pub fn finish(self) -> Result<DemuxSummary> {
        let Demultiplexer {
            min_reads,
            states,
            mut writers,
            progress,
            ..
        } = self;

        let drained = drain_undetermined(&mut writers, &states);
        let closed = writers.close();
        drained?;
        closed?;

        log::info!(
            "Processed {} read pairs in {:.1} minutes.",
            progress.count(),
            minutes(progress.elapsed())
        );

        let samples = states
            .iter()
            .map(|s| SampleMetric {
                sample_id: s.sample_id.clone(),
                reads: s.count,
                demultiplexed: s.count >= min_reads as u64,
            })
            .collect::<Vec<_>>();
        let undetermined_pairs = samples
            .iter()
            .filter(|s| !s.demultiplexed)
            .map(|s| s.reads)
            .sum();

        Ok(DemuxSummary {
            total_pairs: progress.count(),
            undetermined_pairs,
            min_reads,
            samples_seen: samples.len(),
            samples_written: samples.iter().filter(|s| s.demultiplexed).count(),
            samples,
        })
    }
}

fn drain_undetermined(writers: &mut OutputWriters, states: &[SampleState]) -> Result<()> {
    for state in states.iter().filter(|s| s.writer.is_none()) {
        for pair in &state.buffer {
            writers.write_undetermined(pair)?;
        }
    }

    log::debug!("Wrote {} read pairs to the undetermined files", writers.undetermined_written());
    Ok(())
}

/// Read count of one sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleMetric {
    pub sample_id: String,
    pub reads: u64,
    /// Whether the sample got its own output files.
    pub demultiplexed: bool,
}

/// Outcome of a demultiplexing run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DemuxSummary {
    pub total_pairs: u64,
    pub undetermined_pairs: u64,
    pub min_reads: usize,
    pub samples_seen: usize,
    pub samples_written: usize,
    pub samples: Vec<SampleMetric>,
}

impl DemuxSummary {
    pub fn write_yaml(&self, file: impl AsRef<Path>) -> Result<()> {
        let path = file.as_ref();
        let f = File::create(path).map_err(|e| Error::file_io(path, e))?;
        serde_yaml::to_writer(BufWriter::new(f), self).map_err(|e| Error::Metrics {
            file: path.display().to_string(),
            source: e,
        })
    }
}

impl fmt::Display for DemuxSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Wrote FASTQs for {} sample barcodes (out of {} total) with at least {} reads.",
            self.samples_written, self.samples_seen, self.min_reads
        )
    }
}

/// Demultiplex the read pairs described by `config`.
pub fn demultiplex(config: &DemuxConfig) -> Result<DemuxSummary> {
    config.validate()?;

    let sample_map = SampleMap::load(config.sample_barcodes.as_ref())?;
    let pairs = iter_fastq2(&config.read1, &config.read2)?;

    log::info!(
        "Demultiplexing \"{}\" and \"{}\" into \"{}\"",
        config.read1.display(),
        config.read2.display(),
        config.out_dir.display()
    );

    let summary = Demultiplexer::new(
        &config.out_dir,
        config.min_reads,
        config.output.clone(),
        sample_map,
    )?
    .with_progress_interval(config.progress_interval)
    .run(pairs)?;

    log::info!("{}", summary);

    if let Some(metrics) = &config.metrics {
        summary.write_yaml(metrics)?;
    }

    Ok(summary)
}
