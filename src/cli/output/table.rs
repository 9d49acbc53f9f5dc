//! Table output for anomaly reports using comfy-table.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};

use crate::domain::models::{AnomalyKind, AnomalyReport, PlacementStream};

/// Table formatter for anomaly reports
pub struct ReportTable {
    use_colors: bool,
}

impl ReportTable {
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Flag and per-stream summary
    pub fn format_summary(&self, report: &AnomalyReport) -> String {
        let mut table = Self::base_table();
        table.set_header(vec![
            Cell::new("Stream").add_attribute(Attribute::Bold),
            Cell::new("Under-replicated").add_attribute(Attribute::Bold),
            Cell::new("Over-replicated").add_attribute(Attribute::Bold),
        ]);

        for stream in PlacementStream::ALL {
            let tally = report.tally(stream);
            table.add_row(vec![
                Cell::new(stream.to_string()),
                self.count_cell(tally.under_replicated),
                self.count_cell(tally.over_replicated),
            ]);
        }

        table.add_row(vec![
            Cell::new("flag").add_attribute(Attribute::Bold),
            self.flag_cell(report.has_under_replication),
            self.flag_cell(report.has_over_replication),
        ]);

        table.to_string()
    }

    /// Most recent anomaly records
    pub fn format_recent(&self, report: &AnomalyReport) -> String {
        let mut table = Self::base_table();
        table.set_header(vec![
            Cell::new("Kind").add_attribute(Attribute::Bold),
            Cell::new("Stream").add_attribute(Attribute::Bold),
            Cell::new("Resource").add_attribute(Attribute::Bold),
            Cell::new("Partition").add_attribute(Attribute::Bold),
            Cell::new("Observed").add_attribute(Attribute::Bold),
            Cell::new("Bounds").add_attribute(Attribute::Bold),
        ]);

        for record in &report.recent {
            let kind = Cell::new(record.kind.to_string());
            let kind = if self.use_colors {
                kind.fg(match record.kind {
                    AnomalyKind::UnderReplicated => Color::Red,
                    AnomalyKind::OverReplicated => Color::Yellow,
                })
            } else {
                kind
            };
            table.add_row(vec![
                kind,
                Cell::new(record.stream.to_string()),
                Cell::new(&record.resource),
                Cell::new(&record.partition),
                Cell::new(record.observed),
                Cell::new(format!("{}..={}", record.expected, record.upper_bound)),
            ]);
        }

        table.to_string()
    }

    fn count_cell(&self, count: u64) -> Cell {
        let cell = Cell::new(count);
        if self.use_colors && count > 0 {
            cell.fg(Color::Yellow)
        } else {
            cell
        }
    }

    fn flag_cell(&self, set: bool) -> Cell {
        let text = if set { "SET" } else { "clear" };
        let cell = Cell::new(text);
        match (self.use_colors, set) {
            (true, true) => cell.fg(Color::Red).add_attribute(Attribute::Bold),
            (true, false) => cell.fg(Color::Green),
            (false, _) => cell,
        }
    }

    fn base_table() -> Table {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL_CONDENSED)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{AnomalyRecord, StreamTally};
    use chrono::Utc;

    fn report() -> AnomalyReport {
        AnomalyReport {
            has_under_replication: true,
            has_over_replication: false,
            declared: StreamTally::default(),
            actual: StreamTally {
                under_replicated: 2,
                over_replicated: 0,
            },
            recent: vec![AnomalyRecord::new(
                AnomalyKind::UnderReplicated,
                PlacementStream::Actual,
                "Test-DB-1",
                "Test-DB-1_4",
                2,
                3,
                13,
            )],
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn test_summary_lists_both_streams_and_flags() {
        let rendered = ReportTable::new(false).format_summary(&report());
        assert!(rendered.contains("declared"));
        assert!(rendered.contains("actual"));
        assert!(rendered.contains("SET"));
        assert!(rendered.contains("clear"));
    }

    #[test]
    fn test_recent_lists_partition_and_bounds() {
        let rendered = ReportTable::new(false).format_recent(&report());
        assert!(rendered.contains("Test-DB-1_4"));
        assert!(rendered.contains("3..=13"));
    }
}
