//! Log file format parsers
//!
//! This module contains one parser per log dialect. Tabular (CSV) and
//! BusMaster logs are parsed directly into a [`Recording`]; the remaining
//! dialects (ASC, BLF, candump) are read through the [`LogReader`] trait and
//! collected by the [`GenericLogAdapter`].

use crate::config::TraceConfig;
use crate::types::{Frame, Recording, Result, TraceError};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

pub mod asc;
pub mod blf;
pub mod busmaster;
pub mod candump;
pub mod generic;
pub mod mock;
pub mod tabular;

pub use asc::AscReader;
pub use blf::BlfReader;
pub use candump::CandumpReader;
pub use generic::GenericLogAdapter;

/// Header marker identifying a BusMaster text log
pub const BUSMASTER_MARKER: &str = "***BUSMASTER";

/// Common trait for the generic log readers
///
/// A reader opens a file and yields frames in file order. Per-record errors
/// are yielded as `Err` items and skipped by the adapter.
pub trait LogReader: Iterator<Item = Result<Frame>> + Sized {
    /// Open a log file and return an iterator over its frames
    fn open(path: &Path) -> Result<Self>;
}

/// Supported log dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Delimited rows with a header (.csv)
    Tabular,
    /// BusMaster text log (.log with a `***BUSMASTER` header)
    BusMaster,
    /// Vector ASCII log (.asc)
    Asc,
    /// Vector binary log (.blf)
    Blf,
    /// Linux candump log (any other .log)
    Candump,
}

impl LogFormat {
    /// Detect the dialect of a log file
    ///
    /// Detection is by extension, except that `.log` files are peeked for the
    /// BusMaster header marker first.
    pub fn detect(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase());

        match extension.as_deref() {
            Some("csv") => Ok(LogFormat::Tabular),
            Some("asc") => Ok(LogFormat::Asc),
            Some("blf") => Ok(LogFormat::Blf),
            Some("log") => {
                if has_busmaster_header(path)? {
                    Ok(LogFormat::BusMaster)
                } else {
                    Ok(LogFormat::Candump)
                }
            }
            _ => Err(TraceError::UnsupportedFormat(format!(
                "Unsupported file extension: {:?}",
                extension
            ))),
        }
    }
}

fn has_busmaster_header(path: &Path) -> Result<bool> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();
    reader.read_until(b'\n', &mut buf)?;
    let header = String::from_utf8_lossy(&buf);
    Ok(header.trim_start_matches('\u{feff}').starts_with(BUSMASTER_MARKER))
}

/// Load a log file into a recording
///
/// Returns [`TraceError::NoFrames`] when the file parses but holds no frames,
/// so that the caller can keep whatever recording it already has.
pub fn load_recording(path: &Path, config: &TraceConfig) -> Result<Recording> {
    let format = LogFormat::detect(path)?;
    log::debug!("Detected {:?} log format for {:?}", format, path);

    let recording = match format {
        LogFormat::Tabular => tabular::parse_file(path, config)?,
        LogFormat::BusMaster => busmaster::parse_file(path, config)?,
        LogFormat::Asc => GenericLogAdapter::load::<AscReader>(path, config)?,
        LogFormat::Blf => GenericLogAdapter::load::<BlfReader>(path, config)?,
        LogFormat::Candump => GenericLogAdapter::load::<CandumpReader>(path, config)?,
    };

    if recording.is_empty() {
        return Err(TraceError::NoFrames(path.to_path_buf()));
    }

    log::info!("Loaded log ({:?}): {} frames", path, recording.len());
    Ok(recording)
}

/// Read a text log line by line, tolerating non-UTF-8 bytes
pub(crate) fn read_lines(path: &Path) -> Result<impl Iterator<Item = String>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    Ok(reader.split(b'\n').map_while(|line| line.ok()).map(|bytes| {
        String::from_utf8_lossy(&bytes)
            .trim_end_matches('\r')
            .to_string()
    }))
}

/// Parse one hex byte token such as `0A`
pub(crate) fn parse_hex_byte(token: &str) -> Option<u8> {
    if token.is_empty() || token.len() > 2 {
        return None;
    }
    u8::from_str_radix(token, 16).ok()
}

/// Parse a hex payload string; whitespace is ignored and an odd digit count
/// is padded with a leading zero
pub(crate) fn parse_hex_payload(text: &str) -> Option<Vec<u8>> {
    let mut digits: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() % 2 != 0 {
        digits.insert(0, '0');
    }
    digits
        .as_bytes()
        .chunks(2)
        .map(|pair| std::str::from_utf8(pair).ok().and_then(parse_hex_byte))
        .collect()
}

/// Parse a hex arbitration id, accepting an optional `0x` prefix and an
/// optional `x` suffix marking an extended id
pub(crate) fn parse_hex_id(token: &str) -> Option<u32> {
    let trimmed = token.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed)
        .trim_end_matches(['x', 'X']);
    if digits.is_empty() {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn temp_with(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_detect_by_extension() {
        assert_eq!(
            LogFormat::detect(Path::new("trace.CSV")).unwrap(),
            LogFormat::Tabular
        );
        assert_eq!(
            LogFormat::detect(Path::new("trace.asc")).unwrap(),
            LogFormat::Asc
        );
        assert_eq!(
            LogFormat::detect(Path::new("trace.blf")).unwrap(),
            LogFormat::Blf
        );
        assert!(matches!(
            LogFormat::detect(Path::new("trace.txt")),
            Err(TraceError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_detect_busmaster_header() {
        let busmaster = temp_with(
            ".log",
            "***BUSMASTER Ver 3.2.2***\n17:48:32:9099 Rx 1 0x004 s 1 04\n",
        );
        assert_eq!(
            LogFormat::detect(busmaster.path()).unwrap(),
            LogFormat::BusMaster
        );

        let candump = temp_with(".log", "(1436509052.249713) vcan0 123#0011\n");
        assert_eq!(
            LogFormat::detect(candump.path()).unwrap(),
            LogFormat::Candump
        );
    }

    #[test]
    fn test_missing_log_file_is_io_error() {
        let result = LogFormat::detect(Path::new("/nonexistent/trace.log"));
        assert!(matches!(result, Err(TraceError::IoError(_))));
    }

    #[test]
    fn test_parse_hex_helpers() {
        assert_eq!(parse_hex_payload("0102 0a"), Some(vec![0x01, 0x02, 0x0A]));
        assert_eq!(parse_hex_payload("abc"), Some(vec![0x0A, 0xBC]));
        assert_eq!(parse_hex_payload(""), Some(vec![]));
        assert_eq!(parse_hex_payload("zz"), None);
        assert_eq!(parse_hex_id("0x004"), Some(4));
        assert_eq!(parse_hex_id("17334410x"), Some(0x1733_4410));
        assert_eq!(parse_hex_id("1A0"), Some(0x1A0));
        assert_eq!(parse_hex_id("0x"), None);
    }

    #[test]
    fn test_load_recording_no_frames() {
        let empty = temp_with(".log", "***BUSMASTER Ver 3.2.2***\n***END***\n");
        let result = load_recording(empty.path(), &TraceConfig::default());
        assert!(matches!(result, Err(TraceError::NoFrames(_))));
    }
}
