use std::io::{self, Write};

use serde::Serialize;

use crate::app::{CopyReport, FetchReport, ProgressEvent, ProgressSink, RunReport, StatusReport};
use crate::domain::NormalizedRecord;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Text,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_fetch(result: &FetchReport) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_copy(result: &CopyReport) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_run(result: &RunReport) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_status(result: &StatusReport) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_preview(records: &[NormalizedRecord]) -> io::Result<()> {
        Self::print_json(&records)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

pub struct TextOutput;

impl TextOutput {
    pub fn fetch_summary(result: &FetchReport) -> String {
        format!(
            "Fetched {} pages ({} total results): staged {} of {} products into {}, skipped {}",
            result.pages_requested,
            result.total_results,
            result.records_staged,
            result.records_seen,
            result.staging_collection,
            result.records_skipped
        )
    }

    pub fn copy_summary(result: &CopyReport) -> String {
        if result.records_written == 0 {
            return format!(
                "No staged documents found in {}, nothing copied",
                result.staging_collection
            );
        }
        format!(
            "Copying from {} to {} completed: {} documents in {} batch(es)",
            result.staging_collection,
            result.destination_collection,
            result.records_written,
            result.batches
        )
    }

    pub fn status_summary(result: &StatusReport) -> String {
        format!(
            "{}: {} documents\n{}: {} documents",
            result.staging.name,
            result.staging.documents,
            result.destination.name,
            result.destination.documents
        )
    }
}

/// Writes progress lines to stderr.
pub struct ConsoleSink;

impl ProgressSink for ConsoleSink {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => eprintln!("{} ({:.1}s)", event.message, elapsed.as_secs_f64()),
            None => eprintln!("{}", event.message),
        }
    }
}
