use serde::{Deserialize, Serialize};

use std::fs::File;
use std::path::{Path, PathBuf};

use crate::errors::*;

pub const DEFAULT_OUT_DIR: &str = "demux_output";
pub const DEFAULT_MIN_READS: usize = 10;
pub const DEFAULT_UNDETERMINED_PREFIX: &str = "undetermined";
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1_000_000;

/// Everything needed to demultiplex one pair of fastq files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemuxConfig {
    pub read1: PathBuf,
    pub read2: PathBuf,
    #[serde(default)]
    pub sample_barcodes: Option<PathBuf>,
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
    #[serde(default = "default_min_reads")]
    pub min_reads: usize,
    #[serde(flatten)]
    pub output: OutputOptions,
    #[serde(default)]
    pub metrics: Option<PathBuf>,
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
}

/// How output files are named and encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputOptions {
    #[serde(default = "default_undetermined_prefix")]
    pub undetermined_prefix: String,
    #[serde(default)]
    pub compress: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            undetermined_prefix: default_undetermined_prefix(),
            compress: false,
        }
    }
}

impl DemuxConfig {
    /// Config with default settings for a pair of input files.
    pub fn new(read1: impl Into<PathBuf>, read2: impl Into<PathBuf>) -> Self {
        Self {
            read1: read1.into(),
            read2: read2.into(),
            sample_barcodes: None,
            out_dir: default_out_dir(),
            min_reads: DEFAULT_MIN_READS,
            output: OutputOptions::default(),
            metrics: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    /// Load a run description from a YAML file.
    pub fn from_yaml(file: impl AsRef<Path>) -> Result<Self> {
        let path = file.as_ref();
        let f = File::open(path).map_err(|e| Error::file_io(path, e))?;
        let config: Self = serde_yaml::from_reader(f).map_err(|e| Error::ParseConfig {
            file: path.display().to_string(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.progress_interval == 0 {
            return Err(Error::InvalidConfig(
                "the progress interval must be greater than zero".to_owned(),
            ));
        }

        let prefix = &self.output.undetermined_prefix;
        if prefix.is_empty() || prefix.contains(std::path::is_separator) {
            return Err(Error::InvalidConfig(format!(
                "\"{}\" is not a valid undetermined file prefix",
                prefix
            )));
        }

        Ok(())
    }
}

fn default_out_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUT_DIR)
}

fn default_min_reads() -> usize {
    DEFAULT_MIN_READS
}

fn default_undetermined_prefix() -> String {
    DEFAULT_UNDETERMINED_PREFIX.to_owned()
}

fn default_progress_interval() -> u64 {
    DEFAULT_PROGRESS_INTERVAL
}
