// Detail table with a non-destructive circuit search.
use crate::types::{AnalysisResult, Status};
use tabled::builder::Builder;
use tabled::settings::Style;

#[derive(Debug, Clone)]
pub struct DetailRow {
    pub circuit: String,
    pub statuses: Vec<Status>,
    pub visible: bool,
}

#[derive(Debug, Clone)]
pub struct DetailTable {
    pub header: Vec<String>,
    pub rows: Vec<DetailRow>,
    term: String,
}

impl DetailTable {
    /// One row per data row of `analysis`, in sheet order, all visible.
    pub fn from_analysis(analysis: &AnalysisResult) -> Self {
        let rows = analysis
            .full_data
            .iter()
            .map(|record| DetailRow {
                circuit: record.circuit.clone(),
                statuses: record.statuses().collect(),
                visible: true,
            })
            .collect();
        Self {
            header: analysis.header.clone(),
            rows,
            term: String::new(),
        }
    }

    /// Show only rows whose circuit id contains `term`, ignoring case.
    /// Hidden rows are kept; an empty term shows everything again.
    pub fn filter(&mut self, term: &str) {
        let needle = term.to_lowercase();
        for row in &mut self.rows {
            row.visible = needle.is_empty() || row.circuit.to_lowercase().contains(&needle);
        }
        self.term = term.to_string();
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn visible_rows(&self) -> impl Iterator<Item = &DetailRow> + '_ {
        self.rows.iter().filter(|r| r.visible)
    }

    pub fn visible_count(&self) -> usize {
        self.visible_rows().count()
    }

    /// Markdown rendering of at most `max_rows` visible rows.
    pub fn to_markdown(&self, max_rows: usize) -> String {
        let mut builder = Builder::default();
        builder.push_record(self.header.iter().cloned());
        for row in self.visible_rows().take(max_rows) {
            let mut record = vec![row.circuit.clone()];
            record.extend(row.statuses.iter().map(|s| s.to_string()));
            // short rows were padded at aggregation; keep the grid rectangular
            record.resize(self.header.len().max(1), "-".to_string());
            builder.push_record(record);
        }
        builder.build().with(Style::markdown()).to_string()
    }
}
