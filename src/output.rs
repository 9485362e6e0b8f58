use crate::charts::{ChartKind, ChartSession};
use crate::config::{hex_color, COLOR_NEUTRAL};
use crate::reports::KpiSummary;
use crate::table::DetailTable;
use crate::types::{RankingRow, Status, StatusCode};
use crate::util::escape_html;
use serde::Serialize;
use std::error::Error;
use std::fmt::Write as _;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

/// Serialize `rows` into a CSV file at `path`, header taken from the serde
/// field names. An empty slice still creates the (empty) file.
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), Box<dyn Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Pretty-printed JSON of `value` at `path`.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), Box<dyn Error>> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Print up to `max_rows` rows as a markdown table on stdout.
///
/// Used for the quick terminal previews; prints `(no rows)` when there is
/// nothing to show.
pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

/// Everything the HTML page shows, borrowed from the current render.
pub struct DashboardPage<'a> {
    pub file_name: &'a str,
    pub kpis: Option<&'a KpiSummary>,
    pub ranking: &'a [RankingRow],
    pub table: &'a DetailTable,
    pub charts: &'a ChartSession,
}

const PAGE_STYLE: &str = "body{font-family:sans-serif;margin:24px;color:#334155;background:#f8fafc}\
.grid{display:flex;gap:16px;flex-wrap:wrap;margin-bottom:24px}\
.card{background:#fff;border-radius:8px;padding:16px;box-shadow:0 1px 3px rgba(0,0,0,.1)}\
.kpi-card{border-left:4px solid;min-width:160px}\
.kpi-label{font-size:.85em;color:#64748b;margin:0}\
.kpi-value{font-size:1.8em;font-weight:bold;margin:4px 0 0}\
table{border-collapse:collapse;width:100%}\
th,td{border:1px solid #e2e8f0;padding:4px 8px;text-align:center;white-space:nowrap}\
td:first-child{text-align:left}";

const FILTER_SCRIPT: &str = "document.getElementById('search-input').addEventListener('keyup',function(e){\
var term=e.target.value.toLowerCase();\
document.querySelectorAll('#details-table tbody tr').forEach(function(row){\
var cell=row.querySelector('td:first-child');\
if(cell){row.style.display=cell.textContent.toLowerCase().includes(term)?'':'none';}});});";

fn status_cell(status: &Status) -> String {
    match status {
        Status::Coded(code) => {
            let color = hex_color(code.rgb());
            format!(
                "<td style=\"background-color:{c}20;color:{c};font-weight:600\">{}</td>",
                code,
                c = color
            )
        }
        other => format!("<td>{}</td>", escape_html(&other.to_string())),
    }
}

/// Render the standalone dashboard page.
///
/// Layout, top to bottom:
/// - title and the loaded file name;
/// - the four KPI cards (circuit count, then mean UP/SD/PP days), left out
///   when there are no KPIs;
/// - the distribution and ranking charts, referenced by file name so the
///   page sits next to its SVGs; a missing chart is simply not shown;
/// - the detail table, one row per data row and one cell per date column,
///   coded cells tinted with their status color, anything else shown as
///   its raw text or `-`, plus a search box that hides rows by circuit id.
///
/// All sheet text is HTML-escaped.
pub fn render_html(page: &DashboardPage<'_>) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"pt-BR\">\n<head>\n<meta charset=\"utf-8\">\n\
<title>Painel de Circuitos</title>\n<style>{}</style>\n</head>\n<body>\n\
<h1>Painel de Circuitos</h1>\n<p>Arquivo: {}</p>\n",
        PAGE_STYLE,
        escape_html(page.file_name)
    );

    if let Some(kpis) = page.kpis {
        html.push_str("<div class=\"grid\">\n");
        let colors = [
            COLOR_NEUTRAL,
            StatusCode::Up.rgb(),
            StatusCode::Sd.rgb(),
            StatusCode::Pp.rgb(),
        ];
        for (row, rgb) in kpis.rows().iter().zip(colors) {
            let color = hex_color(rgb);
            let _ = writeln!(
                html,
                "<div class=\"card kpi-card\" style=\"border-color:{c}\">\
<p class=\"kpi-label\">{}</p><p class=\"kpi-value\" style=\"color:{c}\">{}</p></div>",
                escape_html(&row.label),
                escape_html(&row.value),
                c = color
            );
        }
        html.push_str("</div>\n");
    }

    html.push_str("<div class=\"grid\">\n");
    let charts = [page.charts.distribution(), page.charts.ranking()];
    for chart in charts.into_iter().flatten() {
        let alt = match chart.kind {
            ChartKind::Distribution => "Distribuição de Status".to_string(),
            ChartKind::Ranking => page
                .ranking
                .iter()
                .map(|r| format!("{}: {}", r.circuit, r.up_days))
                .collect::<Vec<_>>()
                .join(", "),
        };
        let _ = writeln!(
            html,
            "<div class=\"card\"><img src=\"{}\" alt=\"{}\"></div>",
            escape_html(&chart.file_name()),
            escape_html(&alt)
        );
    }
    html.push_str("</div>\n");

    html.push_str(
        "<div class=\"card\">\n<h3>Relatório Detalhado</h3>\n\
<input type=\"text\" id=\"search-input\" placeholder=\"Pesquisar por circuito...\">\n\
<table id=\"details-table\">\n<thead><tr>",
    );
    for h in &page.table.header {
        let _ = write!(html, "<th>{}</th>", escape_html(h));
    }
    html.push_str("</tr></thead>\n<tbody>\n");
    for row in &page.table.rows {
        let _ = write!(html, "<tr><td>{}</td>", escape_html(&row.circuit));
        for status in &row.statuses {
            html.push_str(&status_cell(status));
        }
        html.push_str("</tr>\n");
    }
    let _ = write!(
        html,
        "</tbody>\n</table>\n</div>\n<script>{}</script>\n</body>\n</html>\n",
        FILTER_SCRIPT
    );
    html
}

pub fn write_html(path: &Path, page: &DashboardPage<'_>) -> Result<(), Box<dyn Error>> {
    std::fs::write(path, render_html(page))?;
    Ok(())
}
