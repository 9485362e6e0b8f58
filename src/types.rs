use crate::config::{COLOR_PP, COLOR_SD, COLOR_UP, STATUS_LABELS};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tabled::Tabled;

/// One row of the decoded sheet. Trailing blank cells are already trimmed.
pub type RawRow = Vec<Option<String>>;
pub type RawSheet = Vec<RawRow>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StatusCode {
    #[serde(rename = "UP")]
    Up,
    #[serde(rename = "SD")]
    Sd,
    #[serde(rename = "PP")]
    Pp,
}

static LABEL_TO_CODE: Lazy<HashMap<&'static str, StatusCode>> = Lazy::new(|| {
    STATUS_LABELS
        .iter()
        .filter_map(|(label, code)| StatusCode::from_short(code).map(|c| (*label, c)))
        .collect()
});

impl StatusCode {
    pub const ALL: [StatusCode; 3] = [StatusCode::Up, StatusCode::Sd, StatusCode::Pp];

    pub fn short(self) -> &'static str {
        match self {
            StatusCode::Up => "UP",
            StatusCode::Sd => "SD",
            StatusCode::Pp => "PP",
        }
    }

    pub fn from_short(s: &str) -> Option<Self> {
        match s {
            "UP" => Some(StatusCode::Up),
            "SD" => Some(StatusCode::Sd),
            "PP" => Some(StatusCode::Pp),
            _ => None,
        }
    }

    /// The raw sheet label this code is read from.
    pub fn label(self) -> &'static str {
        STATUS_LABELS
            .iter()
            .find(|(_, code)| *code == self.short())
            .map(|(label, _)| *label)
            .unwrap_or_else(|| self.short())
    }

    /// Exact-match lookup of a raw sheet label.
    pub fn from_label(label: &str) -> Option<Self> {
        LABEL_TO_CODE.get(label).copied()
    }

    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            StatusCode::Up => COLOR_UP,
            StatusCode::Sd => COLOR_SD,
            StatusCode::Pp => COLOR_PP,
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short())
    }
}

/// A single daily cell, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Coded(StatusCode),
    /// Any other text; shown as-is, never counted.
    Unknown(String),
    /// Blank or absent cell.
    Missing,
}

impl Status {
    pub fn from_cell(cell: Option<&str>) -> Self {
        match cell {
            None | Some("") => Status::Missing,
            Some(raw) => match StatusCode::from_label(raw) {
                Some(code) => Status::Coded(code),
                None => Status::Unknown(raw.to_string()),
            },
        }
    }

    pub fn code(&self) -> Option<StatusCode> {
        match self {
            Status::Coded(code) => Some(*code),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Coded(code) => write!(f, "{}", code),
            Status::Unknown(raw) => f.write_str(raw),
            Status::Missing => f.write_str("-"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusTotals {
    #[serde(rename = "UP")]
    pub up: usize,
    #[serde(rename = "SD")]
    pub sd: usize,
    #[serde(rename = "PP")]
    pub pp: usize,
}

impl StatusTotals {
    pub fn get(&self, code: StatusCode) -> usize {
        match code {
            StatusCode::Up => self.up,
            StatusCode::Sd => self.sd,
            StatusCode::Pp => self.pp,
        }
    }

    pub fn bump(&mut self, code: StatusCode) {
        match code {
            StatusCode::Up => self.up += 1,
            StatusCode::Sd => self.sd += 1,
            StatusCode::Pp => self.pp += 1,
        }
    }

    pub fn sum(&self) -> usize {
        self.up + self.sd + self.pp
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CircuitStats {
    #[serde(rename = "UP")]
    pub up: usize,
    #[serde(rename = "SD")]
    pub sd: usize,
    #[serde(rename = "PP")]
    pub pp: usize,
    pub total_days: usize,
}

impl CircuitStats {
    pub fn get(&self, code: StatusCode) -> usize {
        match code {
            StatusCode::Up => self.up,
            StatusCode::Sd => self.sd,
            StatusCode::Pp => self.pp,
        }
    }

    pub fn record(&mut self, code: StatusCode) {
        match code {
            StatusCode::Up => self.up += 1,
            StatusCode::Sd => self.sd += 1,
            StatusCode::Pp => self.pp += 1,
        }
        self.total_days += 1;
    }
}

/// Per-circuit tallies keyed by circuit id, iterated in order of first
/// appearance in the sheet.
#[derive(Debug, Clone, Default)]
pub struct CircuitStatsTable {
    order: Vec<String>,
    by_id: HashMap<String, CircuitStats>,
}

impl CircuitStatsTable {
    /// Returns the tally for `id` and whether it was created by this call.
    pub fn entry(&mut self, id: &str) -> (&mut CircuitStats, bool) {
        let inserted = !self.by_id.contains_key(id);
        if inserted {
            self.order.push(id.to_string());
        }
        (self.by_id.entry(id.to_string()).or_default(), inserted)
    }

    pub fn get(&self, id: &str) -> Option<&CircuitStats> {
        self.by_id.get(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CircuitStats)> + '_ {
        self.order
            .iter()
            .filter_map(move |id| self.by_id.get(id).map(|s| (id.as_str(), s)))
    }
}

/// A data row materialized against the header: `cells[i]` belongs to
/// `header[i]`, column 0 being the circuit id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRecord {
    pub circuit: String,
    pub cells: Vec<Option<String>>,
}

impl RowRecord {
    /// Classified statuses of the date columns, in header order.
    pub fn statuses(&self) -> impl Iterator<Item = Status> + '_ {
        self.cells
            .iter()
            .skip(1)
            .map(|c| Status::from_cell(c.as_deref()))
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub header: Vec<String>,
    pub full_data: Vec<RowRecord>,
    pub total_circuits: usize,
    pub status_totals: StatusTotals,
    pub circuit_stats: CircuitStatsTable,
}

impl AnalysisResult {
    pub fn circuit_label(&self) -> &str {
        self.header.first().map(String::as_str).unwrap_or_default()
    }

    pub fn date_labels(&self) -> &[String] {
        self.header.get(1..).unwrap_or_default()
    }
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct KpiRow {
    #[serde(rename = "Indicator")]
    #[tabled(rename = "Indicador")]
    pub label: String,
    #[serde(rename = "Value")]
    #[tabled(rename = "Valor")]
    pub value: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct RankingRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Circuit")]
    #[tabled(rename = "Circuito")]
    pub circuit: String,
    #[serde(rename = "UP")]
    #[tabled(rename = "Dias em UP")]
    pub up_days: usize,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CircuitStatsRow {
    #[serde(rename = "Circuit")]
    #[tabled(rename = "Circuito")]
    pub circuit: String,
    #[serde(rename = "UP")]
    #[tabled(rename = "UP")]
    pub up: usize,
    #[serde(rename = "SD")]
    #[tabled(rename = "SD")]
    pub sd: usize,
    #[serde(rename = "PP")]
    #[tabled(rename = "PP")]
    pub pp: usize,
    #[serde(rename = "TotalDays")]
    #[tabled(rename = "TotalDays")]
    pub total_days: usize,
}

/// Days per status of one circuit in a generated status sheet.
#[derive(Debug, Serialize, Tabled, Clone, PartialEq, Eq)]
pub struct UsageCountRow {
    #[serde(rename = "Circuito")]
    #[tabled(rename = "Circuito")]
    pub circuit: String,
    #[serde(rename = "Uso Programado")]
    #[tabled(rename = "Uso Programado")]
    pub up: usize,
    #[serde(rename = "Sem Demanda")]
    #[tabled(rename = "Sem Demanda")]
    pub sd: usize,
    #[serde(rename = "Parada Planejada")]
    #[tabled(rename = "Parada Planejada")]
    pub pp: usize,
}

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub file_name: String,
    pub generated_at: String,
    pub total_circuits: usize,
    pub total_rows: usize,
    pub date_columns: usize,
    pub status_totals: StatusTotals,
    pub classified_days: usize,
    pub avg_days_per_circuit: Option<DailyAverages>,
}

/// Mean days per circuit for each status code.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyAverages {
    #[serde(rename = "UP")]
    pub up: f64,
    #[serde(rename = "SD")]
    pub sd: f64,
    #[serde(rename = "PP")]
    pub pp: f64,
}

impl DailyAverages {
    pub fn get(&self, code: StatusCode) -> f64 {
        match code {
            StatusCode::Up => self.up,
            StatusCode::Sd => self.sd,
            StatusCode::Pp => self.pp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_labels_map_to_codes() {
        assert_eq!(
            Status::from_cell(Some("Uso Programado")),
            Status::Coded(StatusCode::Up)
        );
        assert_eq!(
            Status::from_cell(Some("Sem Demanda")),
            Status::Coded(StatusCode::Sd)
        );
        assert_eq!(
            Status::from_cell(Some("Parada Planejada")),
            Status::Coded(StatusCode::Pp)
        );
    }

    #[test]
    fn unmapped_values_pass_through() {
        let s = Status::from_cell(Some("N/A"));
        assert_eq!(s, Status::Unknown("N/A".to_string()));
        assert_eq!(s.to_string(), "N/A");
        assert_eq!(s.code(), None);
        // label match is exact
        assert!(matches!(
            Status::from_cell(Some("uso programado")),
            Status::Unknown(_)
        ));
        assert_eq!(Status::from_cell(None).to_string(), "-");
        assert_eq!(Status::from_cell(Some("")), Status::Missing);
    }

    #[test]
    fn codes_map_back_to_their_labels() {
        for code in StatusCode::ALL {
            assert_eq!(StatusCode::from_label(code.label()), Some(code));
        }
        assert_eq!(StatusCode::Up.label(), "Uso Programado");
    }

    #[test]
    fn stats_table_keeps_first_appearance_order() {
        let mut table = CircuitStatsTable::default();
        let (_, new_b) = table.entry("B");
        assert!(new_b);
        table.entry("A").0.record(StatusCode::Up);
        let (b, again) = table.entry("B");
        assert!(!again);
        b.record(StatusCode::Pp);

        let ids: Vec<&str> = table.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["B", "A"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("B").map(|s| s.total_days), Some(1));
    }
}
