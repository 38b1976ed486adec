//! BLF (Binary Log Format) file reader
//!
//! Reads Vector BLF files using the `ablf` crate.
//! BLF is a proprietary format from Vector Informatik for storing CAN bus data.
//!
//! ## Supported Object Types
//! - Type 86 (CanMessage2): CAN 2.0 and CAN-FD messages
//! - Type 10 (LogContainer): Automatically decompressed by ablf
//!
//! Error frames, application text and all other object types are skipped;
//! each unsupported type is logged once.

use crate::formats::LogReader;
use crate::types::{Frame, Result, TraceError};
use ablf::{BlfFile, ObjectTypes};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Extended-ID flag bit in the BLF CAN message id field
const BLF_EXTENDED_ID_FLAG: u32 = 0x8000_0000;

/// Iterator over CAN frames from a BLF file
pub struct BlfReader {
    objects: ablf::ObjectIterator<BufReader<File>>,
    skipped_types: HashSet<u32>,
}

impl LogReader for BlfReader {
    /// Opens the BLF file and validates its structure
    fn open(path: &Path) -> Result<Self> {
        log::info!("Parsing BLF file: {:?}", path);

        let file = File::open(path).map_err(|e| {
            TraceError::LogParseError(format!("Failed to open BLF file {:?}: {}", path, e))
        })?;

        let reader = BufReader::new(file);

        let blf = BlfFile::from_reader(reader).map_err(|(e, _)| {
            TraceError::LogParseError(format!("Failed to parse BLF file: {}", e))
        })?;

        if !blf.is_valid() {
            return Err(TraceError::LogParseError(
                "Invalid BLF file format".to_string(),
            ));
        }

        Ok(BlfReader {
            objects: blf.into_iter(),
            skipped_types: HashSet::new(),
        })
    }
}

impl Iterator for BlfReader {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let obj = self.objects.next()?;
            let object_type = obj.object_type;
            match obj.data {
                ObjectTypes::CanMessage86(msg) => {
                    let dlc = msg.dlc;
                    let mut data = msg.data;
                    // Classic frames carry padding after the declared length
                    if (dlc as usize) < data.len() && dlc <= 8 {
                        data.truncate(dlc as usize);
                    }
                    return Some(Ok(Frame {
                        timestamp: msg.header.timestamp_ns as f64 / 1_000_000_000.0,
                        channel: msg.channel.min(u8::MAX as u16) as u8,
                        can_id: msg.id & !BLF_EXTENDED_ID_FLAG,
                        data,
                        dlc,
                    }));
                }
                _ => {
                    if self.skipped_types.insert(object_type) {
                        log::debug!("Skipping BLF object type {}", object_type);
                    }
                    continue;
                }
            }
        }
    }
}
