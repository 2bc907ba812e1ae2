//! Best-effort publishing of extraction results to a search index and a table store.
mod names;
mod search;
mod table;

use serde::Serialize;
use tracing::{info, warn};

use crate::extract::ExtractionResult;

pub use names::{sanitize_name, Labels};
pub use search::{bulk_lines, NdjsonBulkSink, SearchSink};
pub use table::{result_frame, CsvTableSink, TableSink};

/// Whether a write replaces the target or adds to it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    #[default]
    Replace,
    Append,
}

/// What happened at one sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SinkOutcome {
    pub sink: &'static str,
    /// Index or table name.
    pub target: String,
    pub written: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SinkOutcome {
    #[inline] pub fn is_ok(&self) -> bool { self.error.is_none() }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PublishReport {
    pub outcomes: Vec<SinkOutcome>,
}

impl PublishReport {
    pub fn all_ok(&self) -> bool { self.outcomes.iter().all(SinkOutcome::is_ok) }

    fn record(&mut self, sink: &'static str, target: String, outcome: anyhow::Result<usize>) {
        let outcome = match outcome {
            Ok(written) => {
                info!("{sink} sink: wrote {written} records to {target}");
                SinkOutcome { sink, target, written, error: None }
            }
            Err(e) => {
                warn!("{sink} sink failed for {target}: {e:#}");
                SinkOutcome { sink, target, written: 0, error: Some(format!("{e:#}")) }
            }
        };
        self.outcomes.push(outcome);
    }
}

/// Push `result` to whichever sinks are given. Failures are recorded in the
/// report and logged; they never affect `result` or the other sink.
pub fn publish(
    result: &ExtractionResult,
    labels: &Labels,
    search: Option<&mut dyn SearchSink>,
    table: Option<&mut dyn TableSink>,
    mode: WriteMode,
) -> PublishReport {
    let mut report = PublishReport::default();
    if let Some(sink) = search {
        let index = labels.index_name();
        let outcome = sink.index(&index, result, mode);
        report.record(sink.name(), index, outcome);
    }
    if let Some(sink) = table {
        let table_name = labels.table_name();
        let outcome = sink.write_table(&table_name, result, mode);
        report.record(sink.name(), table_name, outcome);
    }
    report
}
