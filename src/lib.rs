//! Demultiplex paired-end fastq files by the sample barcode in the read headers.
//!
//! # Overview
//! Illumina read headers end with a field like `1:N:0:ACGTACGT+TTGGCCAA` that holds the
//! sample barcode. demuxseq reads R1 and R2 in lockstep, takes the barcode from each R1
//! header, and writes every pair to the fastq files of its sample:
//! ```text
//! <out_dir>/<sample_id>.r1.fastq
//! <out_dir>/<sample_id>.r2.fastq
//! ```
//! Samples with fewer than `min_reads` read pairs do not get their own files. Their reads go
//! to `undetermined.r1.fastq` and `undetermined.r2.fastq` instead.
//!
//! ## Sample ids
//! A barcode table with `sample_id barcode` lines gives friendly names to barcodes. Barcodes
//! that are not in the table are used as the sample id directly. Dual-index barcodes are
//! shortened to 8 bases per index before lookup, so `ACGTACGTAA+TTGGCCAAGG` is looked up as
//! `ACGTACGTTTGGCCAA`. Reads whose header has no barcode field are grouped under
//! [`UNKNOWN_BARCODE_FORMAT`].
//!
//! ## Memory
//! Reads are streamed. The only reads held in memory are those of samples that have not yet
//! reached `min_reads`, so memory use is bounded by the number of samples times `min_reads`.
//!
//! ## Example
//! ```no_run
//! use demuxseq::*;
//!
//! let mut config = DemuxConfig::new("run_R1.fastq.gz", "run_R2.fastq.gz");
//! config.sample_barcodes = Some("samples.tsv".into());
//! config.min_reads = 100;
//!
//! let summary = demultiplex(&config).unwrap_or_else(|e| panic!("{e}"));
//! println!("{summary}");
//! ```

pub mod barcode;
pub mod config;
pub mod demux;
pub mod errors;
pub mod fastq;
pub mod progress;
pub mod samples;
pub mod writers;

mod parse_utils;

// commonly used functions and types

pub use crate::barcode::*;
pub use crate::config::*;
pub use crate::demux::*;
pub use crate::errors::{Error, Result};
pub use crate::fastq::*;
pub use crate::samples::*;
