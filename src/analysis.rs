// Turns a decoded sheet into per-circuit and fleet-wide status tallies.
use crate::error::DashboardError;
use crate::types::{AnalysisResult, CircuitStatsTable, RawRow, RawSheet, RowRecord, StatusTotals};
use std::collections::HashMap;
use tracing::debug;

fn first_cell(row: &RawRow) -> Option<&str> {
    row.first()
        .and_then(|c| c.as_deref())
        .filter(|s| !s.is_empty())
}

/// For every header position, the column its value is read from: the last
/// column carrying the same label. A row is keyed by label, so a repeated
/// label shows (and counts) the right-most column's value at each of its
/// positions.
fn source_columns(header: &[String]) -> Vec<usize> {
    let mut last: HashMap<&str, usize> = HashMap::new();
    for (idx, label) in header.iter().enumerate() {
        last.insert(label.as_str(), idx);
    }
    header
        .iter()
        .enumerate()
        .map(|(idx, label)| last.get(label.as_str()).copied().unwrap_or(idx))
        .collect()
}

/// Align a raw row to the header: `cells[i]` is read from `sources[i]`,
/// cells past the header are dropped and missing ones are `None`.
fn materialize(row: &RawRow, sources: &[usize], first: &str) -> RowRecord {
    let cells: Vec<Option<String>> = sources
        .iter()
        .map(|&src| row.get(src).cloned().flatten())
        .collect();
    // the row was kept because column 0 is filled; a later duplicate of the
    // circuit label may still be blank
    let circuit = cells
        .first()
        .and_then(|c| c.as_deref())
        .filter(|s| !s.is_empty())
        .unwrap_or(first)
        .to_string();
    RowRecord { circuit, cells }
}

/// Aggregate a decoded sheet into status tallies.
///
/// - Row 0 is the header; its first cell names the circuit column and the
///   remaining cells label the date columns.
/// - Fewer than two rows is [`DashboardError::EmptyData`]; a blank first
///   header cell is [`DashboardError::MissingCircuitColumn`].
/// - Data rows whose first cell is empty are dropped before anything is
///   counted.
/// - Every remaining row is aligned to the header and each date cell is
///   classified. Only the three known labels are counted, both fleet-wide
///   and per circuit; rows sharing a circuit id accumulate into one entry.
///
/// A sheet whose data rows all lack a circuit id is not an error: it yields
/// zero circuits and empty tallies.
pub fn analyze(sheet: &RawSheet) -> Result<AnalysisResult, DashboardError> {
    if sheet.len() < 2 {
        return Err(DashboardError::EmptyData);
    }
    let header_row = &sheet[0];
    if first_cell(header_row).is_none() {
        return Err(DashboardError::MissingCircuitColumn);
    }
    let header: Vec<String> = header_row
        .iter()
        .map(|c| c.clone().unwrap_or_default())
        .collect();
    let sources = source_columns(&header);

    let full_data: Vec<RowRecord> = sheet[1..]
        .iter()
        .filter_map(|row| first_cell(row).map(|id| materialize(row, &sources, id)))
        .collect();

    let mut status_totals = StatusTotals::default();
    let mut circuit_stats = CircuitStatsTable::default();
    let mut total_circuits = 0usize;

    for record in &full_data {
        let (stats, inserted) = circuit_stats.entry(&record.circuit);
        if inserted {
            total_circuits += 1;
        }
        for code in record.statuses().filter_map(|s| s.code()) {
            status_totals.bump(code);
            stats.record(code);
        }
    }

    debug!(
        rows = full_data.len(),
        dropped = sheet.len() - 1 - full_data.len(),
        circuits = total_circuits,
        classified = status_totals.sum(),
        "sheet aggregated"
    );

    Ok(AnalysisResult {
        header,
        full_data,
        total_circuits,
        status_totals,
        circuit_stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CircuitStats;

    fn sheet(rows: &[&[&str]]) -> RawSheet {
        rows.iter()
            .map(|r| {
                r.iter()
                    .map(|c| if c.is_empty() { None } else { Some(c.to_string()) })
                    .collect()
            })
            .collect()
    }

    fn assert_invariants(a: &AnalysisResult) {
        let days: usize = a.circuit_stats.iter().map(|(_, s)| s.total_days).sum();
        assert_eq!(a.status_totals.sum(), days);
        assert_eq!(a.total_circuits, a.circuit_stats.len());
        for (id, _) in a.circuit_stats.iter() {
            assert!(a.full_data.iter().any(|r| r.circuit == id));
        }
    }

    #[test]
    fn aggregates_reference_sheet() {
        let a = analyze(&sheet(&[
            &["Circuit", "Day1", "Day2"],
            &["C1", "Uso Programado", "Sem Demanda"],
            &["C2", "Parada Planejada", "Uso Programado"],
        ]))
        .unwrap();

        assert_eq!(a.status_totals, StatusTotals { up: 2, sd: 1, pp: 1 });
        assert_eq!(a.total_circuits, 2);
        assert_eq!(
            a.circuit_stats.get("C1"),
            Some(&CircuitStats { up: 1, sd: 1, pp: 0, total_days: 2 })
        );
        assert_eq!(
            a.circuit_stats.get("C2"),
            Some(&CircuitStats { up: 1, sd: 0, pp: 1, total_days: 2 })
        );
        assert_eq!(a.header, vec!["Circuit", "Day1", "Day2"]);
        assert_invariants(&a);
    }

    #[test]
    fn header_only_sheet_is_empty_data() {
        let err = analyze(&sheet(&[&["Circuit", "Day1"]])).unwrap_err();
        assert_eq!(err, DashboardError::EmptyData);
        assert_eq!(analyze(&Vec::new()).unwrap_err(), DashboardError::EmptyData);
    }

    #[test]
    fn blank_circuit_header_is_rejected() {
        let err = analyze(&sheet(&[&["", "Day1"], &["C1", "Uso Programado"]])).unwrap_err();
        assert_eq!(err, DashboardError::MissingCircuitColumn);

        let no_cells: RawSheet = vec![vec![], vec![Some("C1".to_string())]];
        assert_eq!(
            analyze(&no_cells).unwrap_err(),
            DashboardError::MissingCircuitColumn
        );
    }

    #[test]
    fn rows_without_circuit_id_are_dropped() {
        let a = analyze(&sheet(&[
            &["Circuit", "Day1"],
            &["", "Uso Programado"],
            &[],
            &["C1", "Sem Demanda"],
        ]))
        .unwrap();
        assert_eq!(a.full_data.len(), 1);
        assert_eq!(a.full_data[0].circuit, "C1");
        assert_eq!(a.status_totals, StatusTotals { up: 0, sd: 1, pp: 0 });
        assert_invariants(&a);
    }

    #[test]
    fn unknown_statuses_are_not_counted() {
        let a = analyze(&sheet(&[
            &["Circuit", "Day1", "Day2", "Day3"],
            &["C1", "N/A", "Uso Programado", ""],
            &["C2", "N/A", "", ""],
        ]))
        .unwrap();
        assert_eq!(a.total_circuits, 2);
        assert_eq!(
            a.circuit_stats.get("C1"),
            Some(&CircuitStats { up: 1, sd: 0, pp: 0, total_days: 1 })
        );
        assert_eq!(a.circuit_stats.get("C2").map(|s| s.total_days), Some(0));
        assert_eq!(a.status_totals.sum(), 1);
        assert_invariants(&a);
    }

    #[test]
    fn circuit_split_across_rows_accumulates() {
        let a = analyze(&sheet(&[
            &["Circuit", "Day1", "Day2"],
            &["C1", "Uso Programado", "Uso Programado"],
            &["C2", "Sem Demanda", ""],
            &["C1", "Parada Planejada", "Uso Programado"],
        ]))
        .unwrap();
        assert_eq!(a.total_circuits, 2);
        assert_eq!(a.full_data.len(), 3);
        assert_eq!(
            a.circuit_stats.get("C1"),
            Some(&CircuitStats { up: 3, sd: 0, pp: 1, total_days: 4 })
        );
        let order: Vec<&str> = a.circuit_stats.iter().map(|(id, _)| id).collect();
        assert_eq!(order, vec!["C1", "C2"]);
        assert_invariants(&a);
    }

    #[test]
    fn rows_are_aligned_to_header_width() {
        let a = analyze(&sheet(&[
            &["Circuit", "Day1", "Day2"],
            &["C1", "Uso Programado"],
            &["C2", "Sem Demanda", "Sem Demanda", "Uso Programado"],
        ]))
        .unwrap();
        assert_eq!(a.full_data[0].cells.len(), 3);
        assert_eq!(a.full_data[0].cells[2], None);
        assert_eq!(a.full_data[1].cells.len(), 3);
        // the cell beyond the header is ignored
        assert_eq!(a.status_totals, StatusTotals { up: 1, sd: 2, pp: 0 });
        assert_invariants(&a);
    }

    #[test]
    fn repeated_date_labels_read_the_last_column() {
        let a = analyze(&sheet(&[
            &["Circuit", "01/03/2025", "02/03/2025", "01/03/2025"],
            &["C1", "Uso Programado", "Parada Planejada", "Sem Demanda"],
        ]))
        .unwrap();
        // both "01/03/2025" positions take the right-most value
        assert_eq!(
            a.full_data[0].cells,
            vec![
                Some("C1".to_string()),
                Some("Sem Demanda".to_string()),
                Some("Parada Planejada".to_string()),
                Some("Sem Demanda".to_string()),
            ]
        );
        assert_eq!(
            a.circuit_stats.get("C1"),
            Some(&CircuitStats { up: 0, sd: 2, pp: 1, total_days: 3 })
        );
        assert_invariants(&a);
    }

    #[test]
    fn repeated_circuit_label_falls_back_to_first_column() {
        let a = analyze(&sheet(&[
            &["Circuit", "D1", "Circuit"],
            &["C1", "Uso Programado", "C9"],
            &["C2", "Sem Demanda"],
        ]))
        .unwrap();
        let ids: Vec<&str> = a.circuit_stats.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["C9", "C2"]);
        assert_invariants(&a);
    }
}
