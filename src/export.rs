//! CSV export of the selected records.

use crate::timeline::axis::local_time;
use crate::timeline::{RecordStore, Rating};
use crate::timeline::selection::SelectionSet;
use chrono::{FixedOffset, NaiveDate};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CSV_HEADER: &str = "ID,Timestamp,Time,Project,Rating,Prompt,Note";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("nothing selected")]
    EmptySelection,

    #[error("failed to write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn escape_quotes(s: &str) -> String {
    s.replace('"', "\"\"")
}

/// One row per selected record, oldest first. Prompt and note are always quoted.
pub fn export_csv(store: &RecordStore, selection: &SelectionSet, offset: FixedOffset) -> String {
    let mut lines = vec![CSV_HEADER.to_string()];
    for record in store.sorted_by_time(selection.iter()) {
        let time = local_time(record.timestamp, offset)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        let rating = record.rating.map(|r: Rating| r.value().to_string()).unwrap_or_default();
        lines.push(format!(
            "{},{},{},{},{},\"{}\",\"{}\"",
            record.id,
            record.timestamp,
            time,
            escape_quotes(record.project.as_deref().unwrap_or("")),
            rating,
            escape_quotes(&record.display),
            escape_quotes(record.note.as_deref().unwrap_or("")),
        ));
    }
    lines.join("\n")
}

pub fn export_file_name(focus_date: NaiveDate, selected: usize) -> String {
    format!("prompts_{}_{}_selected.csv", focus_date.format("%Y-%m-%d"), selected)
}

/// Write the selection's CSV into `dir`. Returns the written path.
pub fn write_export(
    dir: &Path,
    store: &RecordStore,
    selection: &SelectionSet,
    focus_date: NaiveDate,
    offset: FixedOffset,
) -> Result<PathBuf, ExportError> {
    if selection.is_empty() {
        return Err(ExportError::EmptySelection);
    }
    let path = dir.join(export_file_name(focus_date, selection.len()));
    let csv = export_csv(store, selection, offset);
    std::fs::write(&path, csv).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;
    tracing::info!("Exported {} records to {:?}", selection.len(), path);
    Ok(path)
}
