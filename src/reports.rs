use crate::types::{
    AnalysisResult, CircuitStatsRow, DailyAverages, KpiRow, RankingRow, StatusCode, SummaryStats,
};
use crate::util::{format_int, format_one_decimal, ratio};
use chrono::Utc;

#[derive(Debug, Clone, PartialEq)]
pub struct KpiSummary {
    pub total_circuits: usize,
    pub averages: DailyAverages,
}

impl KpiSummary {
    /// Rows as shown on the KPI cards: circuit count, then one mean per code
    /// with one decimal.
    pub fn rows(&self) -> Vec<KpiRow> {
        let mut rows = vec![KpiRow {
            label: "Total Circuitos".to_string(),
            value: format_int(self.total_circuits),
        }];
        for code in StatusCode::ALL {
            rows.push(KpiRow {
                label: format!("Média Dias {}", code),
                value: format_one_decimal(self.averages.get(code)),
            });
        }
        rows
    }
}

/// Headline numbers for the KPI cards.
///
/// - `total_circuits` is the count of distinct circuit ids.
/// - Each average is the fleet-wide tally of a code divided by that count,
///   so circuits without any classified day still pull the mean down.
/// - Returns `None` when there are no circuits to average over; the cards
///   are then left out entirely instead of showing zeros.
pub fn kpi_summary(analysis: &AnalysisResult) -> Option<KpiSummary> {
    let n = analysis.total_circuits;
    if n == 0 {
        return None;
    }
    let totals = &analysis.status_totals;
    Some(KpiSummary {
        total_circuits: n,
        averages: DailyAverages {
            up: ratio(totals.up, n),
            sd: ratio(totals.sd, n),
            pp: ratio(totals.pp, n),
        },
    })
}

/// Circuits with the most UP days, highest first, at most `limit` of them.
///
/// - The sort is stable, so circuits with equal UP counts keep the order in
///   which they first appeared in the sheet.
/// - Ranks start at 1 and follow the sorted position; ties do not share a
///   rank.
/// - Fewer circuits than `limit` simply yields all of them.
pub fn top_circuits(analysis: &AnalysisResult, limit: usize) -> Vec<RankingRow> {
    let mut ranked: Vec<(&str, usize)> = analysis
        .circuit_stats
        .iter()
        .map(|(id, stats)| (id, stats.up))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(idx, (circuit, up_days))| RankingRow {
            rank: idx + 1,
            circuit: circuit.to_string(),
            up_days,
        })
        .collect()
}

/// One export row per circuit, in first-appearance order.
pub fn circuit_stats_rows(analysis: &AnalysisResult) -> Vec<CircuitStatsRow> {
    analysis
        .circuit_stats
        .iter()
        .map(|(id, s)| CircuitStatsRow {
            circuit: id.to_string(),
            up: s.up,
            sd: s.sd,
            pp: s.pp,
            total_days: s.total_days,
        })
        .collect()
}

/// Build the JSON summary written next to the dashboard page.
///
/// `generated_at` is stamped in UTC, RFC 3339.
pub fn generate_summary(analysis: &AnalysisResult, file_name: &str) -> SummaryStats {
    SummaryStats {
        file_name: file_name.to_string(),
        generated_at: Utc::now().to_rfc3339(),
        total_circuits: analysis.total_circuits,
        total_rows: analysis.full_data.len(),
        date_columns: analysis.date_labels().len(),
        status_totals: analysis.status_totals,
        classified_days: analysis.status_totals.sum(),
        avg_days_per_circuit: kpi_summary(analysis).map(|k| k.averages),
    }
}
