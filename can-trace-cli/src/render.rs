//! Terminal output for trace updates and series
//!
//! Text mode marks byte and signal freshness inline: a Changed value is
//! wrapped as `[..]`, a Settled one as `(..)`, a Fresh one is left plain.

use anyhow::Result;
use can_trace_engine::{ColorClass, DatabaseStats, FrameStore, MessageRow, SignalSeries, TraceUpdate};
use serde::Serialize;

fn mark(text: &str, color: ColorClass) -> String {
    match color {
        ColorClass::Neutral => format!(" {} ", text),
        ColorClass::Alert => format!("[{}]", text),
        ColorClass::Warn => format!("({})", text),
    }
}

/// One message line, followed by one indented line per signal
pub fn format_row(row: &MessageRow) -> String {
    let bytes: String = row
        .bytes
        .iter()
        .map(|b| mark(&format!("{:02X}", b.value), b.color))
        .collect();

    let mut out = format!(
        "{:>12.4}  {:>2}  {:>10}  {:<20}  {:>2}  {}",
        row.timestamp,
        row.channel,
        row.id_label,
        row.name.as_deref().unwrap_or("Unknown"),
        row.dlc,
        bytes.trim_end()
    );

    if row.signals.is_empty() {
        out.push_str(&format!("  {}", row.decoded));
    }
    for signal in &row.signals {
        out.push_str(&format!(
            "\n{:>44}{:<24} {}",
            "",
            signal.name,
            mark(&signal.display, signal.color).trim_end()
        ));
    }
    out
}

pub fn format_update(update: &TraceUpdate) -> String {
    let mut out = format!(
        "── frame {} @ {:.4} s{}",
        update.position,
        update.timestamp,
        if update.reset { " (rebuilt)" } else { "" }
    );
    for row in &update.rows {
        out.push('\n');
        out.push_str(&format_row(row));
    }
    out
}

/// Print a value as pretty JSON on stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_update(update: &TraceUpdate, json: bool) -> Result<()> {
    if json {
        print_json(update)
    } else {
        println!("{}", format_update(update));
        Ok(())
    }
}

pub fn print_series(series: &SignalSeries, json: bool) -> Result<()> {
    if json {
        return print_json(series);
    }
    for (timestamp, value) in series.timestamps.iter().zip(&series.values) {
        println!("{:>12.4}  {}", timestamp, value);
    }
    if let Some((lo, hi)) = series.value_range() {
        println!("{} points, range {} .. {}", series.len(), lo, hi);
    } else {
        println!("No data points");
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct IdSummary {
    id: String,
    name: Option<String>,
    count: usize,
}

#[derive(Debug, Serialize)]
struct RecordingSummary {
    frames: usize,
    duration_s: f64,
    messages: usize,
    signals: usize,
    ids: Vec<IdSummary>,
}

/// Overview of the loaded recording and database
pub fn print_info(
    store: &FrameStore,
    stats: DatabaseStats,
    name_of: impl Fn(u32) -> Option<String>,
    json: bool,
) -> Result<()> {
    let summary = RecordingSummary {
        frames: store.len(),
        duration_s: store.duration(),
        messages: stats.num_messages,
        signals: stats.num_signals,
        ids: store
            .ids()
            .iter()
            .map(|&id| IdSummary {
                id: format!("0x{:X}", id),
                name: name_of(id),
                count: store.count_for_id(id),
            })
            .collect(),
    };

    if json {
        return print_json(&summary);
    }

    println!("📄 Recording:");
    println!("  Frames:   {}", summary.frames);
    println!("  Duration: {:.4} s", summary.duration_s);
    println!("\n📊 Signal Database:");
    println!("  Messages: {}", summary.messages);
    println!("  Signals:  {}", summary.signals);
    println!("\n  {:>10}  {:<20}  {:>8}", "ID", "Name", "Frames");
    for id in &summary.ids {
        println!(
            "  {:>10}  {:<20}  {:>8}",
            id.id,
            id.name.as_deref().unwrap_or("-"),
            id.count
        );
    }
    Ok(())
}
