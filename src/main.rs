use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use env_logger::Env;

use std::path::PathBuf;

use demuxseq::*;

/// Demultiplex paired-end fastq files based on the barcodes in the read headers.
#[derive(Parser, Debug)]
#[command(name = "demuxseq", version)]
struct Args {
    /// Path to the R1 fastq file (optionally gzipped).
    #[arg(long, value_name = "PATH")]
    read1: PathBuf,

    /// Path to the R2 fastq file (optionally gzipped).
    #[arg(long, value_name = "PATH")]
    read2: PathBuf,

    /// Whitespace-separated table of `sample_id barcode` lines. Barcodes act as sample ids
    /// if the file does not exist.
    #[arg(long, alias = "sample_barcodes", value_name = "PATH")]
    sample_barcodes: PathBuf,

    /// Directory to write output fastq files to.
    #[arg(long, alias = "out_dir", default_value = DEFAULT_OUT_DIR)]
    out_dir: PathBuf,

    /// Minimum number of reads for a sample to get its own fastq files.
    #[arg(long, alias = "min_reads", default_value_t = DEFAULT_MIN_READS)]
    min_reads: usize,

    /// File name prefix for reads of samples below the minimum.
    #[arg(long, default_value = DEFAULT_UNDETERMINED_PREFIX)]
    undetermined_prefix: String,

    /// Gzip the output fastq files.
    #[arg(long)]
    compress: bool,

    /// Write per-sample read counts to this YAML file.
    #[arg(long, value_name = "PATH")]
    metrics: Option<PathBuf>,

    /// Log progress every this many read pairs.
    #[arg(long, default_value_t = DEFAULT_PROGRESS_INTERVAL)]
    progress_interval: u64,
}

impl From<Args> for DemuxConfig {
    fn from(args: Args) -> Self {
        DemuxConfig {
            read1: args.read1,
            read2: args.read2,
            sample_barcodes: Some(args.sample_barcodes),
            out_dir: args.out_dir,
            min_reads: args.min_reads,
            output: OutputOptions {
                undetermined_prefix: args.undetermined_prefix,
                compress: args.compress,
            },
            metrics: args.metrics,
            progress_interval: args.progress_interval,
        }
    }
}

fn run(args: Args) -> Result<()> {
    let config = DemuxConfig::from(args);
    demultiplex(&config).with_context(|| {
        format!(
            "Failed to demultiplex \"{}\" and \"{}\"",
            config.read1.display(),
            config.read2.display()
        )
    })?;
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Args::parse()) {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
