//! Sample barcode table.
//!
//! The table maps a barcode such as `AAAAAAAACCCCCCCC` to a friendly sample id. It is optional:
//! without it every barcode is its own sample id.

use rustc_hash::FxHashMap;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::errors::*;

/// Friendly sample names keyed by barcode.
///
/// Barcodes without an entry are used as sample ids directly.
#[derive(Debug, Clone, Default)]
pub struct SampleMap {
    names: FxHashMap<String, String>,
}

impl SampleMap {
    /// Load a whitespace-separated `sample_id barcode` table.
    ///
    /// A missing path or a path that does not exist gives an empty map. Comment lines
    /// starting with `#`, lines that are not valid UTF-8 and lines without exactly two fields
    /// are skipped.
    pub fn load(file: Option<impl AsRef<Path>>) -> Result<Self> {
        let Some(file) = file else {
            return Ok(Self::default());
        };
        let path = file.as_ref();

        if !path.exists() {
            log::info!(
                "Sample barcode table \"{}\" not found, using barcodes as sample ids",
                path.display()
            );
            return Ok(Self::default());
        }

        let f = File::open(path).map_err(|e| Error::file_io(path, e))?;
        let map = Self::from_reader(BufReader::new(f)).map_err(|e| Error::file_io(path, e))?;

        log::info!(
            "Loaded {} sample barcodes from \"{}\"",
            map.len(),
            path.display()
        );
        Ok(map)
    }

    pub fn from_reader(mut reader: impl BufRead) -> std::io::Result<Self> {
        let mut names = FxHashMap::default();
        let mut buf = Vec::new();
        let mut line_no = 0;

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            line_no += 1;

            let Ok(line) = std::str::from_utf8(&buf) else {
                log::debug!("Skipping sample table line {}: not valid UTF-8", line_no);
                continue;
            };
            if line.trim_start().starts_with('#') {
                continue;
            }

            let fields = line.split_ascii_whitespace().collect::<Vec<_>>();
            let [sample_id, barcode] = fields[..] else {
                continue;
            };

            if let Some(prev) = names.insert(barcode.to_owned(), sample_id.to_owned()) {
                log::warn!(
                    "Barcode {} is listed for both {} and {}, using {}",
                    barcode,
                    prev,
                    sample_id,
                    sample_id
                );
            }
        }

        Ok(Self { names })
    }

    #[must_use]
    pub fn get(&self, barcode: &str) -> Option<&str> {
        self.names.get(barcode).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<B: Into<String>, S: Into<String>> FromIterator<(B, S)> for SampleMap {
    fn from_iter<I: IntoIterator<Item = (B, S)>>(iter: I) -> Self {
        Self {
            names: iter
                .into_iter()
                .map(|(barcode, sample_id)| (barcode.into(), sample_id.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_table() {
        let table = "# sample barcode\n\
                     s1\tAAAAAAAACCCCCCCC\n\
                     s2   GGGGGGGGTTTTTTTT\n\
                     \n\
                     too many fields\n\
                     lonely\n";
        let map = SampleMap::from_reader(table.as_bytes()).unwrap();

        assert_eq!(map.len(), 2);
        assert_eq!(map.get("AAAAAAAACCCCCCCC"), Some("s1"));
        assert_eq!(map.get("GGGGGGGGTTTTTTTT"), Some("s2"));
        assert_eq!(map.get("fields"), None);
    }

    #[test]
    fn test_duplicate_barcode_last_wins() {
        let map = SampleMap::from_reader("a ACGT\nb ACGT\n".as_bytes()).unwrap();
        assert_eq!(map.get("ACGT"), Some("b"));
    }

    #[test]
    fn test_invalid_utf8_line_skipped() {
        let table = b"s1 AAAA\n\xff\xfe CCCC\ns2\tGGGG\r\ns3 TT\xc3\n";
        let map = SampleMap::from_reader(&table[..]).unwrap();

        assert_eq!(map.len(), 2);
        assert_eq!(map.get("AAAA"), Some("s1"));
        assert_eq!(map.get("CCCC"), None);
        assert_eq!(map.get("GGGG"), Some("s2"));
    }

    #[test]
    fn test_missing_table() {
        assert!(SampleMap::load(None::<&str>).unwrap().is_empty());
        assert!(SampleMap::load(Some("/nonexistent/samples.tsv")).unwrap().is_empty());
    }
}
