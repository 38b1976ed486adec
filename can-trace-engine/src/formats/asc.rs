//! Vector ASC (ASCII) log reader
//!
//! Supported line shapes:
//!
//! ```text
//! 0.016728 1  17334410x       Rx   d 8 3E 42 03 00 39 00 03 01
//! 0.100000 CANFD 2 Tx 1F3 1 0 c 12 11 22 33 44 55 66 77 88 99 AA BB CC
//! ```
//!
//! Header lines (`date`, `base`, `Begin Triggerblock`...), remote frames,
//! error frames and other events are skipped. IDs are hex unless the header
//! declares `base dec`.

use crate::formats::{parse_hex_byte, read_lines, LogReader};
use crate::types::{Frame, Result, TraceError};
use std::path::Path;

/// Number base used for IDs and data bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Base {
    Hex,
    Dec,
}

/// Iterator over CAN frames from an ASC file
pub struct AscReader {
    lines: std::vec::IntoIter<String>,
    base: Base,
    line_number: usize,
}

impl LogReader for AscReader {
    fn open(path: &Path) -> Result<Self> {
        log::info!("Parsing ASC file: {:?}", path);
        let lines: Vec<String> = read_lines(path)?.collect();
        Ok(Self::from_lines(lines))
    }
}

impl AscReader {
    /// Build a reader over lines already in memory
    pub fn from_lines(lines: Vec<String>) -> Self {
        Self {
            lines: lines.into_iter(),
            base: Base::Hex,
            line_number: 0,
        }
    }

    /// Parse one line; `Ok(None)` for lines that carry no CAN frame
    fn parse_line(&mut self, line: &str) -> Result<Option<Frame>> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(first) = tokens.first() else {
            return Ok(None);
        };

        if first.eq_ignore_ascii_case("base") {
            self.base = match tokens.get(1) {
                Some(b) if b.eq_ignore_ascii_case("dec") => Base::Dec,
                _ => Base::Hex,
            };
            return Ok(None);
        }

        // Data lines always start with a timestamp
        let Ok(timestamp) = first.parse::<f64>() else {
            return Ok(None);
        };

        match tokens.get(1) {
            Some(kind) if kind.eq_ignore_ascii_case("CANFD") => self.parse_fd(timestamp, &tokens),
            Some(channel) if channel.parse::<u8>().is_ok() => self.parse_classic(timestamp, &tokens),
            _ => Ok(None),
        }
    }

    fn parse_classic(&self, timestamp: f64, tokens: &[&str]) -> Result<Option<Frame>> {
        // <t> <ch> <id> <dir> d <dlc> <bytes...>
        if tokens.len() < 6 || !tokens[4].eq_ignore_ascii_case("d") {
            // Remote frames ("r"), ErrorFrame and status events
            return Ok(None);
        }

        let channel = self.parse_u8(tokens[1])?;
        let can_id = self.parse_id(tokens[2])?;
        let dlc = self.parse_u8(tokens[5])?;
        let data = self.parse_data(&tokens[6..], dlc as usize)?;

        Ok(Some(Frame {
            timestamp,
            channel,
            can_id,
            data,
            dlc,
        }))
    }

    fn parse_fd(&self, timestamp: f64, tokens: &[&str]) -> Result<Option<Frame>> {
        // <t> CANFD <ch> <dir> <id> [symbolic name] <brs> <esi> <dlc> <len> <bytes...>
        if tokens.len() < 9 {
            return Ok(None);
        }
        let channel = self.parse_u8(tokens[2])?;
        let can_id = self.parse_id(tokens[4])?;

        let is_flag = |t: &str| t == "0" || t == "1";
        let mut pos = 5;
        if !(is_flag(tokens[5]) && is_flag(tokens[6])) {
            pos += 1;
        }
        // brs, esi, dlc
        pos += 3;
        let Some(len_token) = tokens.get(pos) else {
            return Ok(None);
        };
        let data_length: usize = len_token.parse().map_err(|_| {
            TraceError::LogParseError(format!("Invalid CAN FD data length: {}", len_token))
        })?;
        let data = self.parse_data(&tokens[pos + 1..], data_length)?;

        Ok(Some(Frame {
            timestamp,
            channel,
            can_id,
            dlc: data_length.min(u8::MAX as usize) as u8,
            data,
        }))
    }

    fn parse_u8(&self, token: &str) -> Result<u8> {
        token
            .parse()
            .map_err(|_| TraceError::LogParseError(format!("Invalid number: {}", token)))
    }

    fn parse_id(&self, token: &str) -> Result<u32> {
        let digits = token.trim_end_matches(['x', 'X']);
        let radix = match self.base {
            Base::Hex => 16,
            Base::Dec => 10,
        };
        u32::from_str_radix(digits, radix)
            .map_err(|_| TraceError::LogParseError(format!("Invalid CAN ID: {}", token)))
    }

    fn parse_data(&self, tokens: &[&str], count: usize) -> Result<Vec<u8>> {
        tokens
            .iter()
            .take(count)
            .map(|t| {
                let byte = match self.base {
                    Base::Hex => parse_hex_byte(t),
                    Base::Dec => t.parse().ok(),
                };
                byte.ok_or_else(|| TraceError::LogParseError(format!("Invalid data byte: {}", t)))
            })
            .collect()
    }
}

impl Iterator for AscReader {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            self.line_number += 1;
            match self.parse_line(&line) {
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
