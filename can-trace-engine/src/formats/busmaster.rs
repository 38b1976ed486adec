//! BusMaster text log parser
//!
//! Each data line is whitespace separated with positional fields:
//!
//! ```text
//! <time> <Tx|Rx> <channel> <id> <type> <dlc> <byte>...
//! 17:48:32:9099 Rx 1 0x004 s 8 04 08 01 02 03 04 05 06
//! ```
//!
//! Time is `HH:MM:SS:FFFF` where `FFFF` counts tenths of a millisecond. The
//! first parsed line becomes time zero. Lines starting with `***` are header
//! or comment lines. A malformed line is skipped on its own.

use crate::config::TraceConfig;
use crate::formats::{parse_hex_byte, parse_hex_id, read_lines};
use crate::types::{Frame, Recording, Result};
use chrono::{NaiveTime, Timelike};
use std::path::Path;

const SECONDS_PER_DAY: f64 = 24.0 * 3600.0;

/// Why a single line was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    TooFewTokens(usize),
    BadTime(String),
    BadChannel(String),
    BadId(String),
    BadDlc(String),
    BadByte(String),
}

/// One tokenized data line, time still absolute
#[derive(Debug, Clone, PartialEq)]
pub struct BusMasterLine {
    /// Seconds since midnight
    pub time_of_day: f64,
    pub channel: u8,
    pub can_id: u32,
    pub dlc: u8,
    pub data: Vec<u8>,
}

/// Parse a BusMaster log file into a recording relative to its first frame
pub fn parse_file(path: &Path, config: &TraceConfig) -> Result<Recording> {
    log::info!("Parsing BusMaster log: {:?}", path);
    let frames = parse_lines(read_lines(path)?, config);
    Ok(Recording::new(frames))
}

/// Parse BusMaster lines into frames with times relative to the first
/// well-formed line
pub fn parse_lines<I, S>(lines: I, config: &TraceConfig) -> Vec<Frame>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut frames = Vec::new();
    let mut base_time: Option<f64> = None;
    let mut skipped = 0usize;

    for (line_number, raw) in lines.into_iter().enumerate() {
        let line = raw.as_ref().trim();
        if line.is_empty() || line.starts_with("***") {
            continue;
        }

        let parsed = match parse_line(line) {
            Ok(parsed) => parsed,
            Err(e) => {
                skipped += 1;
                log::debug!("Skipping BusMaster line {}: {:?}", line_number + 1, e);
                continue;
            }
        };

        let base = *base_time.get_or_insert(parsed.time_of_day);
        let mut relative = parsed.time_of_day - base;
        // Log crossed midnight
        if relative < 0.0 {
            relative += SECONDS_PER_DAY;
        }

        if !config.should_process_frame(parsed.channel, parsed.can_id) {
            continue;
        }

        frames.push(Frame {
            timestamp: relative,
            channel: parsed.channel,
            can_id: parsed.can_id,
            data: parsed.data,
            dlc: parsed.dlc,
        });
    }

    if skipped > 0 {
        log::warn!("Skipped {} malformed BusMaster lines", skipped);
    }

    frames
}

/// Tokenize and parse a single data line
pub fn parse_line(line: &str) -> std::result::Result<BusMasterLine, LineError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 6 {
        return Err(LineError::TooFewTokens(tokens.len()));
    }

    let time_of_day = parse_time(tokens[0]).ok_or_else(|| LineError::BadTime(tokens[0].into()))?;
    let channel: u8 = tokens[2]
        .parse()
        .map_err(|_| LineError::BadChannel(tokens[2].into()))?;
    let can_id = parse_hex_id(tokens[3]).ok_or_else(|| LineError::BadId(tokens[3].into()))?;
    let dlc: u8 = tokens[5]
        .parse()
        .map_err(|_| LineError::BadDlc(tokens[5].into()))?;

    let data = tokens[6..]
        .iter()
        .take(dlc as usize)
        .map(|t| parse_hex_byte(t).ok_or_else(|| LineError::BadByte((*t).into())))
        .collect::<std::result::Result<Vec<u8>, _>>()?;

    Ok(BusMasterLine {
        time_of_day,
        channel,
        can_id,
        dlc,
        data,
    })
}

/// Convert `HH:MM:SS:FFFF` to seconds since midnight
pub fn parse_time(token: &str) -> Option<f64> {
    let mut fields = token.split(':');
    let hours: u32 = fields.next()?.parse().ok()?;
    let minutes: u32 = fields.next()?.parse().ok()?;
    let seconds: u32 = fields.next()?.parse().ok()?;
    let fraction: u32 = fields.next()?.parse().ok()?;
    if fields.next().is_some() || fraction > 9999 {
        return None;
    }

    let time = NaiveTime::from_hms_opt(hours, minutes, seconds)?;
    Some(time.num_seconds_from_midnight() as f64 + fraction as f64 / 10_000.0)
}
