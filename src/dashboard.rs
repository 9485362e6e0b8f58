// Presentation state of a populated dashboard: what the terminal shows and
// what gets exported to the output directory.
use crate::charts::ChartSession;
use crate::config::{AppConfig, HTML_FILE, STATS_CSV_FILE, SUMMARY_JSON_FILE};
use crate::error::DashboardError;
use crate::output::{self, DashboardPage};
use crate::reports::{self, KpiSummary};
use crate::table::DetailTable;
use crate::types::{AnalysisResult, RankingRow};
use std::fs;
use std::io;
use tracing::{info, warn};

#[derive(Debug)]
pub struct RenderedView {
    pub file_name: String,
    pub analysis: AnalysisResult,
    pub kpis: Option<KpiSummary>,
    pub ranking: Vec<RankingRow>,
    pub table: DetailTable,
}

#[derive(Debug)]
pub struct Dashboard {
    config: AppConfig,
    charts: ChartSession,
    view: Option<RenderedView>,
}

impl Dashboard {
    pub fn new(config: AppConfig) -> Self {
        let charts = ChartSession::new(config.out_dir.clone());
        Self {
            config,
            charts,
            view: None,
        }
    }

    pub fn view(&self) -> Option<&RenderedView> {
        self.view.as_ref()
    }

    pub fn view_mut(&mut self) -> Option<&mut RenderedView> {
        self.view.as_mut()
    }

    pub fn charts(&self) -> &ChartSession {
        &self.charts
    }

    /// Replace whatever is shown with `analysis`.
    ///
    /// Derives the KPIs, the top-N ranking and the detail table, swaps the
    /// charts (old ones disposed first), then writes the stats CSV, the JSON
    /// summary and the HTML page. The previous view is dropped, never
    /// merged. Any write failure is a [`DashboardError::Export`] and leaves
    /// the previous view in place for the caller to reset.
    pub fn render(&mut self, analysis: AnalysisResult, file_name: &str) -> Result<(), DashboardError> {
        let kpis = reports::kpi_summary(&analysis);
        let ranking = reports::top_circuits(&analysis, self.config.top_n);
        let table = DetailTable::from_analysis(&analysis);

        fs::create_dir_all(&self.config.out_dir).map_err(DashboardError::export)?;
        self.charts
            .replace(&analysis.status_totals, &ranking)
            .map_err(DashboardError::export)?;

        let out = &self.config.out_dir;
        output::write_csv(&out.join(STATS_CSV_FILE), &reports::circuit_stats_rows(&analysis))
            .map_err(DashboardError::export)?;
        output::write_json(
            &out.join(SUMMARY_JSON_FILE),
            &reports::generate_summary(&analysis, file_name),
        )
        .map_err(DashboardError::export)?;
        output::write_html(
            &out.join(HTML_FILE),
            &DashboardPage {
                file_name,
                kpis: kpis.as_ref(),
                ranking: &ranking,
                table: &table,
                charts: &self.charts,
            },
        )
        .map_err(DashboardError::export)?;

        info!(
            file = file_name,
            circuits = analysis.total_circuits,
            out_dir = %out.display(),
            "dashboard rendered"
        );
        self.view = Some(RenderedView {
            file_name: file_name.to_string(),
            analysis,
            kpis,
            ranking,
            table,
        });
        Ok(())
    }

    /// Back to the empty state.
    ///
    /// - The view is dropped.
    /// - Both chart handles are disposed, then any chart file no handle owns
    ///   (a previous run's, say) is swept from the output directory.
    /// - The HTML page and the CSV/JSON exports are removed.
    ///
    /// Failures here are logged, never raised: an empty dashboard is shown
    /// either way.
    pub fn reset(&mut self) {
        self.view = None;
        if let Err(e) = self.charts.dispose_all() {
            warn!(error = %e, "could not dispose charts");
        }
        if let Err(e) = self.charts.sweep_orphans() {
            warn!(error = %e, "could not sweep old charts");
        }
        for name in [HTML_FILE, STATS_CSV_FILE, SUMMARY_JSON_FILE] {
            let path = self.config.out_dir.join(name);
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "could not remove export"),
            }
        }
    }
}
