//! Tabular (CSV) log parser
//!
//! Reads delimited rows with a header line. Header names are normalized and
//! mapped onto the canonical columns through a fixed alias table:
//!
//! | Aliases | Column |
//! |---|---|
//! | `time`, `timestamp` | Timestamp |
//! | `id`, `can_id`, `identifier` | ID |
//! | `dlc`, `len`, `length` | DLC |
//! | `data`, `payload` | Data |
//! | `channel`, `ch` | Channel |
//!
//! Timestamp, ID and Data are required; a missing one fails the load. A row
//! with an unparseable cell is skipped on its own.
//!
//! Cells may be double-quoted, in which case the delimiter is literal inside
//! the quotes and `""` stands for one quote. A quoted payload may separate
//! its bytes with commas or semicolons (`"01,02"`).

use crate::config::TraceConfig;
use crate::formats::{parse_hex_id, parse_hex_payload, read_lines};
use crate::types::{Frame, Recording, Result, TraceError};
use std::path::Path;

/// Canonical columns of the tabular schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Timestamp,
    Id,
    Dlc,
    Data,
    Channel,
}

impl Column {
    fn from_header(name: &str) -> Option<Self> {
        let normalized = name.trim().trim_matches('"').trim().to_lowercase();
        match normalized.as_str() {
            "time" | "timestamp" => Some(Column::Timestamp),
            "id" | "can_id" | "identifier" => Some(Column::Id),
            "dlc" | "len" | "length" => Some(Column::Dlc),
            "data" | "payload" => Some(Column::Data),
            "channel" | "ch" => Some(Column::Channel),
            _ => None,
        }
    }
}

/// Positions of the canonical columns in one file's header
#[derive(Debug)]
struct Layout {
    delimiter: char,
    timestamp: usize,
    id: usize,
    data: usize,
    dlc: Option<usize>,
    channel: Option<usize>,
}

impl Layout {
    fn from_header(header: &str) -> Result<Self> {
        let delimiter = detect_delimiter(header);
        let mut timestamp = None;
        let mut id = None;
        let mut data = None;
        let mut dlc = None;
        let mut channel = None;

        for (pos, name) in split_cells(header, delimiter).iter().enumerate() {
            let slot = match Column::from_header(name) {
                Some(Column::Timestamp) => &mut timestamp,
                Some(Column::Id) => &mut id,
                Some(Column::Data) => &mut data,
                Some(Column::Dlc) => &mut dlc,
                Some(Column::Channel) => &mut channel,
                None => continue,
            };
            // First matching column wins
            slot.get_or_insert(pos);
        }

        Ok(Self {
            delimiter,
            timestamp: timestamp.ok_or_else(|| TraceError::MissingColumn("Timestamp".into()))?,
            id: id.ok_or_else(|| TraceError::MissingColumn("ID".into()))?,
            data: data.ok_or_else(|| TraceError::MissingColumn("Data".into()))?,
            dlc,
            channel,
        })
    }
}

/// Why a single row was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
enum RowError {
    MissingCell(&'static str),
    BadCell(&'static str, String),
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowError::MissingCell(column) => write!(f, "missing {}", column),
            RowError::BadCell(column, value) => write!(f, "invalid {} '{}'", column, value),
        }
    }
}

fn detect_delimiter(header: &str) -> char {
    [',', ';', '\t']
        .into_iter()
        .max_by_key(|d| header.matches(*d).count())
        .filter(|d| header.contains(*d))
        .unwrap_or(',')
}

/// Parse a CSV log file into a recording sorted by timestamp
pub fn parse_file(path: &Path, config: &TraceConfig) -> Result<Recording> {
    log::info!("Parsing tabular log: {:?}", path);

    let mut lines = read_lines(path)?.filter(|l| !l.trim().is_empty());
    let header = lines
        .next()
        .ok_or_else(|| TraceError::LogParseError(format!("Empty tabular log: {:?}", path)))?;
    let layout = Layout::from_header(header.trim_start_matches('\u{feff}'))?;

    let mut frames = Vec::new();
    let mut skipped = 0usize;

    for (row_number, line) in lines.enumerate() {
        match parse_row(&line, &layout) {
            Ok(frame) => {
                if config.should_process_frame(frame.channel, frame.can_id) {
                    frames.push(frame);
                }
            }
            Err(e) => {
                skipped += 1;
                log::debug!("Skipping row {}: {}", row_number + 2, e);
            }
        }
    }

    if skipped > 0 {
        log::warn!("Skipped {} malformed rows in {:?}", skipped, path);
    }

    Ok(Recording::new(frames))
}

/// Split one line into trimmed cells, honouring double quotes
fn split_cells(line: &str, delimiter: char) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            c if c == delimiter && !quoted => {
                cells.push(current.trim().to_string());
                current.clear();
            }
            c => current.push(c),
        }
    }
    cells.push(current.trim().to_string());
    cells
}

fn parse_row(line: &str, layout: &Layout) -> std::result::Result<Frame, RowError> {
    let cells = split_cells(line, layout.delimiter);
    let cell = |pos: usize, name: &'static str| {
        cells
            .get(pos)
            .map(String::as_str)
            .filter(|c| !c.is_empty())
            .ok_or(RowError::MissingCell(name))
    };

    let raw_time = cell(layout.timestamp, "Timestamp")?;
    let timestamp: f64 = raw_time
        .parse()
        .map_err(|_| RowError::BadCell("Timestamp", raw_time.to_string()))?;

    let raw_id = cell(layout.id, "ID")?;
    let can_id = parse_id(raw_id).ok_or_else(|| RowError::BadCell("ID", raw_id.to_string()))?;

    // An empty payload cell is a valid zero-length frame
    let raw_data = cells.get(layout.data).map(String::as_str).unwrap_or_default();
    let data = parse_hex_payload(&raw_data.replace([',', ';'], " "))
        .ok_or_else(|| RowError::BadCell("Data", raw_data.to_string()))?;

    let channel = match layout.channel.and_then(|pos| cells.get(pos).map(String::as_str)) {
        Some(raw) if !raw.is_empty() => raw
            .parse::<u8>()
            .map_err(|_| RowError::BadCell("Channel", raw.to_string()))?,
        _ => 1,
    };

    let mut frame = Frame::new(timestamp, channel, can_id, data);
    if let Some(raw) = layout.dlc.and_then(|pos| cells.get(pos).map(String::as_str)) {
        if !raw.is_empty() {
            frame.dlc = raw
                .parse::<u8>()
                .map_err(|_| RowError::BadCell("DLC", raw.to_string()))?;
        }
    }

    Ok(frame)
}

/// IDs with a hex marker are base-16, everything else base-10
fn parse_id(raw: &str) -> Option<u32> {
    if raw.contains(['x', 'X']) {
        parse_hex_id(raw)
    } else {
        raw.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn csv_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_parse_aliases_and_sorting() {
        let file = csv_file(
            "Time, CAN_ID, Len, Payload\n\
             0.20,0x1A0,2,0102\n\
             0.10,416,2,0304\n",
        );
        let recording = parse_file(file.path(), &TraceConfig::default()).unwrap();

        assert_eq!(recording.len(), 2);
        let first = &recording.frames()[0];
        assert_eq!(first.timestamp, 0.10);
        assert_eq!(first.can_id, 416);
        assert_eq!(first.data, vec![0x03, 0x04]);
        assert_eq!(first.channel, 1);
        assert_eq!(recording.frames()[1].can_id, 0x1A0);
    }

    #[test]
    fn test_missing_required_column_is_fatal() {
        let file = csv_file("timestamp,dlc,data\n0.1,1,01\n");
        let result = parse_file(file.path(), &TraceConfig::default());
        assert!(matches!(result, Err(TraceError::MissingColumn(ref c)) if c == "ID"));
    }

    #[test]
    fn test_malformed_row_is_skipped() {
        let file = csv_file(
            "timestamp;id;data;channel\n\
             0.1;0x100;01 02;2\n\
             abc;0x100;01 02;2\n\
             0.3;0x100;zz;2\n",
        );
        let recording = parse_file(file.path(), &TraceConfig::default()).unwrap();
        assert_eq!(recording.len(), 1);
        assert_eq!(recording.frames()[0].channel, 2);
        assert_eq!(recording.frames()[0].dlc, 2);
    }

    #[test]
    fn test_declared_length_kept_separately() {
        let file = csv_file("timestamp,id,dlc,data\n0.0,256,8,abc\n");
        let recording = parse_file(file.path(), &TraceConfig::default()).unwrap();
        let frame = &recording.frames()[0];
        assert_eq!(frame.data, vec![0x0A, 0xBC]);
        assert_eq!(frame.dlc, 8);
    }

    #[test]
    fn test_parse_is_idempotent() {
        let file = csv_file("timestamp,id,data\n0.2,0x200,11\n0.1,0x100,22\n");
        let first = parse_file(file.path(), &TraceConfig::default()).unwrap();
        let second = parse_file(file.path(), &TraceConfig::default()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_quoted_cells_keep_delimiter() {
        let file = csv_file(
            "\"Time\",\"ID\",\"Data\"\n\
             0.1,\"0x100\",\"01,02\"\n\
             0.2,0x101,\"AA BB CC\"\n",
        );
        let recording = parse_file(file.path(), &TraceConfig::default()).unwrap();
        assert_eq!(recording.len(), 2);
        assert_eq!(recording.frames()[0].data, vec![0x01, 0x02]);
        assert_eq!(recording.frames()[0].dlc, 2);
        assert_eq!(recording.frames()[1].data, vec![0xAA, 0xBB, 0xCC]);
    }

    #[test]
    fn test_split_cells() {
        assert_eq!(split_cells(" a , \"b,c\" ,d", ','), vec!["a", "b,c", "d"]);
        assert_eq!(split_cells("\"say \"\"hi\"\"\";x", ';'), vec!["say \"hi\"", "x"]);
        assert_eq!(split_cells("a,,", ','), vec!["a", "", ""]);
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a,b,c"), ',');
        assert_eq!(detect_delimiter("a;b;c"), ';');
        assert_eq!(detect_delimiter("a\tb"), '\t');
        assert_eq!(detect_delimiter("single"), ',');
    }
}
