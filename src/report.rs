// elastic-health - Node inventory report for Elasticsearch clusters
// Copyright (C) 2024 Mathias Uhl <mathiasuhl@gmx.de>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use crate::node::{self, Column, ExtractError, NodeRecord};
use regex::Regex;
use serde_json::{Map, Value};
use std::fmt::Write as _;
use tracing::debug;

pub const NO_DATA: &str = "No Data";

/// Node records in the order they were discovered in the response.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReportSet {
    records: Vec<NodeRecord>,
}

impl ReportSet {
    pub fn push(&mut self, record: NodeRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Consumes the set, returning rows ordered by the sort column.
    pub fn into_sorted(self) -> Vec<NodeRecord> {
        let sort = sort_column();
        let mut rows = self.records;
        rows.sort_by_cached_key(|row| row.cell(sort));
        rows
    }
}

/// Rows sort by the second declared column.
fn sort_column() -> Column {
    Column::ALL[1]
}

/// Returns the `nodes` object of a `_nodes` response.
pub fn nodes_of(response: &Value) -> Result<&Map<String, Value>, ExtractError> {
    response
        .get("nodes")
        .and_then(Value::as_object)
        .ok_or(ExtractError::MissingNodes)
}

/// Extracts every node whose raw name matches `pattern` (all nodes when no
/// pattern is given). The first malformed node aborts collection.
pub fn collect(
    nodes: &Map<String, Value>,
    pattern: Option<&Regex>,
    suffix: &str,
) -> Result<ReportSet, ExtractError> {
    let mut report = ReportSet::default();

    for (node_id, node) in nodes {
        if let Some(pattern) = pattern {
            let name = node::raw_name(node, node_id)?;
            if !pattern.is_match(name) {
                debug!(node_id = %node_id, name, "skipping node, name does not match pattern");
                continue;
            }
        }
        report.push(node::extract(node, node_id, suffix)?);
    }

    debug!(
        total = nodes.len(),
        kept = report.len(),
        "collected node records"
    );
    Ok(report)
}

/// Convenience over [`nodes_of`] and [`collect`] for a whole response body.
pub fn collect_response(
    response: &Value,
    pattern: Option<&Regex>,
    suffix: &str,
) -> Result<ReportSet, ExtractError> {
    collect(nodes_of(response)?, pattern, suffix)
}

/// Renders the report as a fixed-width table, or [`NO_DATA`] when empty.
pub fn render_table(report: ReportSet, verbose: bool) -> String {
    if report.is_empty() {
        return NO_DATA.to_string();
    }

    let columns: &[Column] = if verbose {
        &Column::ALL
    } else {
        &Column::REDUCED
    };

    let table: Vec<Vec<String>> = report
        .into_sorted()
        .iter()
        .map(|row| columns.iter().map(|col| row.cell(*col)).collect())
        .collect();

    let mut widths: Vec<usize> = columns.iter().map(|c| c.header().len()).collect();
    for row in &table {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(cell.chars().count());
        }
    }

    let header: Vec<String> = columns.iter().map(|c| c.header().to_string()).collect();
    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();

    let mut out = String::new();
    for row in std::iter::once(&header)
        .chain(std::iter::once(&separator))
        .chain(table.iter())
    {
        let mut line = String::new();
        for (i, cell) in row.iter().enumerate() {
            if i > 0 {
                line.push_str("  ");
            }
            let _ = write!(line, "{:width$}", cell, width = widths[i]);
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out.truncate(out.trim_end().len());
    out
}

/// Renders the sorted report as a JSON array with every column.
pub fn render_json(report: ReportSet) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&report.into_sorted())
}
