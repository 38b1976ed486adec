//! candump log reader
//!
//! Reads the text format written by `candump -l`:
//!
//! ```text
//! (1436509052.249713) vcan0 12345678#0011223344556677
//! (1436509052.449847) can1 123##1AABBCC
//! ```
//!
//! The channel number is taken from the trailing digits of the interface
//! name. Remote frames (`123#R`) are skipped.

use crate::formats::{parse_hex_payload, read_lines, LogReader};
use crate::types::{Frame, Result, TraceError};
use std::path::Path;

/// Iterator over CAN frames from a candump log
pub struct CandumpReader {
    lines: std::vec::IntoIter<String>,
    line_number: usize,
}

impl LogReader for CandumpReader {
    fn open(path: &Path) -> Result<Self> {
        log::info!("Parsing candump log: {:?}", path);
        let lines: Vec<String> = read_lines(path)?.collect();
        Ok(Self::from_lines(lines))
    }
}

impl CandumpReader {
    /// Build a reader over lines already in memory
    pub fn from_lines(lines: Vec<String>) -> Self {
        Self {
            lines: lines.into_iter(),
            line_number: 0,
        }
    }
}

fn parse_line(line: &str) -> Result<Option<Frame>> {
    let mut tokens = line.split_whitespace();
    let Some(time_token) = tokens.next() else {
        return Ok(None);
    };
    let (Some(interface), Some(body)) = (tokens.next(), tokens.next()) else {
        return Err(TraceError::LogParseError(format!("Truncated line: {}", line)));
    };

    let timestamp: f64 = time_token
        .trim_start_matches('(')
        .trim_end_matches(')')
        .parse()
        .map_err(|_| TraceError::LogParseError(format!("Invalid timestamp: {}", time_token)))?;

    let channel = channel_from_interface(interface);

    let (id_text, rest) = body
        .split_once('#')
        .ok_or_else(|| TraceError::LogParseError(format!("Missing '#' separator: {}", body)))?;
    let can_id = u32::from_str_radix(id_text, 16)
        .map_err(|_| TraceError::LogParseError(format!("Invalid CAN ID: {}", id_text)))?;

    let data_text = match rest.strip_prefix('#') {
        // CAN FD: one flags nibble precedes the data
        Some(fd) => fd.get(1..).unwrap_or_default(),
        None if rest.starts_with(['R', 'r']) => return Ok(None),
        None => rest,
    };
    let data = parse_hex_payload(&data_text.replace('.', ""))
        .ok_or_else(|| TraceError::LogParseError(format!("Invalid data: {}", data_text)))?;

    Ok(Some(Frame::new(timestamp, channel, can_id, data)))
}

fn channel_from_interface(interface: &str) -> u8 {
    let digits = interface
        .bytes()
        .rev()
        .take_while(u8::is_ascii_digit)
        .count();
    interface[interface.len() - digits..].parse().unwrap_or(0)
}

impl Iterator for CandumpReader {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            self.line_number += 1;
            match parse_line(&line) {
                Ok(Some(frame)) => return Some(Ok(frame)),
                Ok(None) => continue,
                Err(e) => {
                    return Some(Err(TraceError::LogParseError(format!(
                        "line {}: {}",
                        self.line_number, e
                    ))))
                }
            }
        }
    }
}
