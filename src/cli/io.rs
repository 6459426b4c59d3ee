//! Report output and monitor renderers

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde_json::Value;

use crate::health::HealthReport;
use crate::model::Record;
use crate::monitor::{ConnectionState, MonitorState, RenderPort};
use crate::observability::Logger;

use super::errors::{CliError, CliResult};

/// Write a pretty-printed JSON value to stdout
pub fn write_json(value: &Value) -> CliResult<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}

/// Write a pretty-printed JSON value to a file
pub fn write_report_file(path: &Path, value: &Value) -> CliResult<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)
        .map_err(|e| CliError::io_error(format!("failed to write {}: {}", path.display(), e)))
}

/// Render one health report as aligned text lines
pub fn print_health_report(report: &HealthReport) {
    for result in &report.results {
        println!(
            "[{:>4}] {:<32} {} ({} ms)",
            result.status.as_str().to_uppercase(),
            result.name,
            result.message,
            result.duration_ms
        );
        if let Some(suggestion) = &result.suggestion {
            println!("       hint: {}", suggestion);
        }
    }

    let (pass, warn, fail, info) = report.counts();
    println!(
        "overall: {} ({} pass, {} warn, {} fail, {} info)",
        report.overall().as_str(),
        pass,
        warn,
        fail,
        info
    );
}

/// Print records as one aligned line each
pub fn print_record_lines(records: &[Record]) {
    for record in records {
        println!(
            "{:<12} {:<12} {:<8} {:<16} {} {}",
            record.id,
            record.status,
            record.priority,
            record.service_type,
            record.created_at.format("%Y-%m-%d %H:%M"),
            record.name
        );
    }
}

/// `pending=3 in_progress=1` style summary of a count map
fn counts_line(counts: &BTreeMap<String, usize>) -> String {
    counts
        .iter()
        .map(|(key, count)| format!("{}={}", key, count))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Logs each tick's events as JSON lines; used by `monitor`.
pub struct EventLogRender;

impl RenderPort for EventLogRender {
    fn render(&self, state: &MonitorState) {
        if state.connection == ConnectionState::Disconnected {
            Logger::warn(
                "store_unreachable",
                &[("tick", &state.ticks.to_string())],
            );
            return;
        }

        for event in &state.last_tick_events {
            Logger::info(
                "record_changed",
                &[
                    ("kind", event.kind.as_str()),
                    ("id", &event.record.id),
                    ("status", &event.record.status),
                    ("observed_at", &event.observed_at.to_rfc3339()),
                ],
            );
        }
    }
}

/// Clears and redraws the terminal each tick; used by `live`.
pub struct DashboardRender;

impl RenderPort for DashboardRender {
    fn render(&self, state: &MonitorState) {
        // Home the cursor and wipe the previous frame
        print!("\x1b[2J\x1b[H");

        let connection = match state.connection {
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "DISCONNECTED",
        };
        println!(
            "caseops live | {} | {} records | tick {}",
            connection, state.records, state.ticks
        );
        if let Some(last_fetch) = state.last_fetch {
            println!("last fetch: {}", last_fetch.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        println!();
        println!("status:   {}", counts_line(&state.by_status));
        println!("priority: {}", counts_line(&state.by_priority));

        if !state.alerts.is_empty() {
            println!();
            for alert in &state.alerts {
                println!("ALERT [{}] {}", alert.name, alert.message);
            }
        }

        println!();
        println!("recent changes:");
        if state.recent_events.is_empty() {
            println!("  (none yet)");
        }
        for event in &state.recent_events {
            println!(
                "  {} {:<6} {:<12} {}",
                event.observed_at.format("%H:%M:%S"),
                event.kind.as_str(),
                event.record.id,
                event.record.status
            );
        }

        let _ = io::stdout().flush();
    }
}
