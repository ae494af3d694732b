use thiserror;

use crate::fastq::Origin;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Error reading or writing \"{file}\": {source}")]
    FileIo {
        file: String,
        source: std::io::Error,
    },

    #[error("Error reading record {idx} in {origin}: {source}")]
    ParseRecord {
        origin: Origin,
        idx: usize,
        source: std::io::Error,
    },

    #[error("Output files for sample \"{sample_id}\" were already opened")]
    DuplicateSample { sample_id: String },

    #[error("Error writing metrics to \"{file}\": {source}")]
    Metrics {
        file: String,
        source: serde_yaml::Error,
    },

    #[error("Error parsing config \"{file}\": {source}")]
    ParseConfig {
        file: String,
        source: serde_yaml::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub(crate) fn file_io(file: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Error::FileIo {
            file: file.as_ref().display().to_string(),
            source,
        }
    }
}
