//! Sample barcodes from Illumina read headers.
//!
//! Headers are expected to end in a field like `1:N:0:ACGTACGT+TTGGCCAA`. The last
//! colon-delimited token of the last space-delimited field is the barcode. Dual-index
//! barcodes keep at most 8 bases of each index.

use crate::fastq::FastqRecord;
use crate::parse_utils::*;
use crate::samples::SampleMap;

/// Barcode assigned to reads whose header does not have the expected structure.
pub const UNKNOWN_BARCODE_FORMAT: &str = "unknown_barcode_format";

/// Bases kept from each half of a dual-index barcode.
pub const INDEX_LEN: usize = 8;

/// Extract the barcode from the header of an R1 record.
///
/// Never fails: malformed headers give [`UNKNOWN_BARCODE_FORMAT`].
#[must_use]
pub fn extract_barcode(record: &FastqRecord) -> String {
    match parse_barcode(&record.header) {
        Some(barcode) => String::from_utf8_lossy(&barcode).into_owned(),
        None => UNKNOWN_BARCODE_FORMAT.to_owned(),
    }
}

fn parse_barcode(header: &[u8]) -> Option<Vec<u8>> {
    let header = trim_ascii_whitespace(header)?;
    let info = after_last(header, b' ')?;
    let raw = after_last(info, b':')?;

    if raw.is_empty() {
        return None;
    }

    let barcode = match split_once(raw, b'+') {
        Some((index1, index2)) => {
            let mut b = Vec::with_capacity(INDEX_LEN * 2);
            b.extend_from_slice(&index1[..index1.len().min(INDEX_LEN)]);
            b.extend_from_slice(&index2[..index2.len().min(INDEX_LEN)]);
            b
        }
        None => raw.to_vec(),
    };

    Some(barcode)
}

/// Resolve the sample id of a read: its mapped sample name, or the barcode itself.
#[must_use]
pub fn sample_id(record: &FastqRecord, sample_map: &SampleMap) -> String {
    let barcode = extract_barcode(record);
    match sample_map.get(&barcode) {
        Some(name) => name.to_owned(),
        None => barcode,
    }
}
