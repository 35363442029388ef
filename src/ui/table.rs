use crate::report::ReportTable;
use crate::storage::StoreStats;
use tabled::{builder::Builder, settings::Style, Table, Tabled};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn stats_table(stats: &StoreStats) -> String {
    let mut builder = TableBuilder::new();
    builder.add_row("Transfers", &stats.transfers.to_string());
    builder.add_row("Users", &stats.users.to_string());
    builder.add_row("Artists", &stats.artists.to_string());
    builder.add_row("First upload", stats.earliest.as_deref().unwrap_or("-"));
    builder.add_row("Last upload", stats.latest.as_deref().unwrap_or("-"));
    builder.build()
}

/// Render a report with its own column headers
pub fn report_table(report: &ReportTable) -> String {
    if report.columns.is_empty() {
        return String::new();
    }

    let mut builder = Builder::default();
    builder.push_record(report.columns.iter().cloned());
    for row in &report.rows {
        builder.push_record(row.iter().map(ToString::to_string));
    }
    builder.build().with(Style::rounded()).to_string()
}
