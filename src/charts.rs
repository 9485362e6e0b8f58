// Chart files for the exported dashboard. The session owns the handles of
// the charts currently on disk and disposes them before drawing new ones.
use crate::config::COLOR_UP;
use crate::types::{RankingRow, StatusCode, StatusTotals};
use plotters::element::Pie;
use plotters::prelude::*;
use std::error::Error;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Distribution,
    Ranking,
}

impl ChartKind {
    const ALL: [ChartKind; 2] = [ChartKind::Distribution, ChartKind::Ranking];

    fn stem(self) -> &'static str {
        match self {
            ChartKind::Distribution => "status_distribution",
            ChartKind::Ranking => "top_circuits",
        }
    }

    /// Whether `file_name` looks like a chart of this kind: `<stem>_<n>.svg`.
    fn owns(self, file_name: &str) -> bool {
        file_name
            .strip_prefix(self.stem())
            .and_then(|rest| rest.strip_prefix('_'))
            .and_then(|rest| rest.strip_suffix(".svg"))
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
    }
}

#[derive(Debug)]
pub struct ChartHandle {
    pub kind: ChartKind,
    pub path: PathBuf,
}

impl ChartHandle {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn dispose(self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[derive(Debug)]
pub struct ChartSession {
    dir: PathBuf,
    generation: u64,
    distribution: Option<ChartHandle>,
    ranking: Option<ChartHandle>,
}

impl ChartSession {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            generation: 0,
            distribution: None,
            ranking: None,
        }
    }

    pub fn distribution(&self) -> Option<&ChartHandle> {
        self.distribution.as_ref()
    }

    pub fn ranking(&self) -> Option<&ChartHandle> {
        self.ranking.as_ref()
    }

    /// Dispose the current charts, then draw a fresh pair. Every generation
    /// gets new file names.
    pub fn replace(
        &mut self,
        totals: &StatusTotals,
        ranking: &[RankingRow],
    ) -> Result<(), Box<dyn Error>> {
        self.dispose_all()?;
        fs::create_dir_all(&self.dir)?;
        self.generation += 1;

        // a doughnut of nothing has no angles to draw
        if totals.sum() > 0 {
            let path = self.path_for(ChartKind::Distribution);
            draw_distribution(&path, totals)?;
            self.distribution = Some(ChartHandle {
                kind: ChartKind::Distribution,
                path,
            });
        }
        if !ranking.is_empty() {
            let path = self.path_for(ChartKind::Ranking);
            draw_ranking(&path, ranking)?;
            self.ranking = Some(ChartHandle {
                kind: ChartKind::Ranking,
                path,
            });
        }
        debug!(generation = self.generation, "charts replaced");
        Ok(())
    }

    pub fn dispose_all(&mut self) -> io::Result<()> {
        if let Some(handle) = self.distribution.take() {
            handle.dispose()?;
        }
        if let Some(handle) = self.ranking.take() {
            handle.dispose()?;
        }
        Ok(())
    }

    /// Remove chart files left in the output directory that no handle owns,
    /// e.g. the charts of an earlier run. Returns how many were removed.
    ///
    /// Only names of the form `<stem>_<n>.svg` are touched; a missing
    /// directory counts as nothing to sweep.
    pub fn sweep_orphans(&self) -> io::Result<usize> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };
        let owned: Vec<&Path> = [self.distribution.as_ref(), self.ranking.as_ref()]
            .into_iter()
            .flatten()
            .map(|h| h.path.as_path())
            .collect();
        let mut removed = 0;
        for entry in entries {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !ChartKind::ALL.iter().any(|k| k.owns(name)) || owned.contains(&path.as_path()) {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        if removed > 0 {
            debug!(removed, dir = %self.dir.display(), "orphan charts swept");
        }
        Ok(removed)
    }

    fn path_for(&self, kind: ChartKind) -> PathBuf {
        self.dir
            .join(format!("{}_{}.svg", kind.stem(), self.generation))
    }
}

fn rgb((r, g, b): (u8, u8, u8)) -> RGBColor {
    RGBColor(r, g, b)
}

fn draw_distribution(path: &Path, totals: &StatusTotals) -> Result<(), Box<dyn Error>> {
    let root = SVGBackend::new(path, (480, 360)).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled("Distribuição de Status", ("sans-serif", 20))?;

    let (w, h) = root.dim_in_pixel();
    let center = ((w / 2) as i32, (h / 2) as i32);
    let radius = w.min(h) as f64 * 0.38;
    let sizes: Vec<f64> = StatusCode::ALL
        .iter()
        .map(|c| totals.get(*c) as f64)
        .collect();
    let colors: Vec<RGBColor> = StatusCode::ALL.iter().map(|c| rgb(c.rgb())).collect();
    let labels: Vec<String> = StatusCode::ALL
        .iter()
        .map(|c| format!("{} ({})", c, totals.get(*c)))
        .collect();

    let mut pie = Pie::new(
        &center,
        &radius,
        sizes.as_slice(),
        colors.as_slice(),
        labels.as_slice(),
    );
    pie.donut_hole(radius * 0.55);
    pie.label_style(("sans-serif", 14).into_font().color(&BLACK));
    root.draw(&pie)?;
    root.present()?;
    Ok(())
}

fn draw_ranking(path: &Path, ranking: &[RankingRow]) -> Result<(), Box<dyn Error>> {
    let root = SVGBackend::new(path, (720, 360)).into_drawing_area();
    root.fill(&WHITE)?;

    let n = ranking.len() as u32;
    let max_up = ranking.iter().map(|r| r.up_days).max().unwrap_or(0).max(1) as u32;
    let labels: Vec<String> = ranking.iter().map(|r| r.circuit.clone()).collect();

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("Top {} Circuitos por Dias em UP", ranking.len()),
            ("sans-serif", 20),
        )
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(40)
        .build_cartesian_2d((0u32..n).into_segmented(), 0u32..max_up + 1)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(labels.len())
        .y_desc("Dias em UP")
        .x_label_formatter(&|v: &SegmentValue<u32>| match v {
            SegmentValue::Exact(i) | SegmentValue::CenterOf(i) => {
                labels.get(*i as usize).cloned().unwrap_or_default()
            }
            SegmentValue::Last => String::new(),
        })
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .style(rgb(COLOR_UP).filled())
            .margin(4)
            .data(
                ranking
                    .iter()
                    .enumerate()
                    .map(|(i, r)| (i as u32, r.up_days as u32)),
            ),
    )?;
    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn ranking() -> Vec<RankingRow> {
        vec![
            RankingRow {
                rank: 1,
                circuit: "C2".to_string(),
                up_days: 5,
            },
            RankingRow {
                rank: 2,
                circuit: "C1".to_string(),
                up_days: 2,
            },
        ]
    }

    #[test]
    fn replace_disposes_previous_generation() {
        let dir = tempdir().unwrap();
        let mut session = ChartSession::new(dir.path());
        let totals = StatusTotals { up: 7, sd: 2, pp: 1 };

        session.replace(&totals, &ranking()).unwrap();
        let first_pie = session.distribution().unwrap().path.clone();
        let first_bar = session.ranking().unwrap().path.clone();
        assert!(first_pie.exists());
        assert!(first_bar.exists());

        session.replace(&totals, &ranking()).unwrap();
        let second_pie = session.distribution().unwrap().path.clone();
        assert_ne!(first_pie, second_pie);
        assert!(!first_pie.exists());
        assert!(!first_bar.exists());
        assert!(second_pie.exists());
        assert_eq!(session.ranking().unwrap().kind, ChartKind::Ranking);
    }

    #[test]
    fn dispose_all_clears_handles_and_files() {
        let dir = tempdir().unwrap();
        let mut session = ChartSession::new(dir.path());
        session
            .replace(&StatusTotals { up: 1, sd: 0, pp: 0 }, &ranking())
            .unwrap();
        let pie = session.distribution().unwrap().path.clone();

        session.dispose_all().unwrap();
        assert!(session.distribution().is_none());
        assert!(session.ranking().is_none());
        assert!(!pie.exists());
        // disposing again is harmless
        session.dispose_all().unwrap();
    }

    #[test]
    fn empty_tallies_skip_the_doughnut() {
        let dir = tempdir().unwrap();
        let mut session = ChartSession::new(dir.path());
        session.replace(&StatusTotals::default(), &[]).unwrap();
        assert!(session.distribution().is_none());
        assert!(session.ranking().is_none());
    }

    #[test]
    fn sweep_removes_only_unowned_chart_files() {
        let dir = tempdir().unwrap();
        for name in [
            "status_distribution_3.svg",
            "top_circuits_12.svg",
            "top_circuits_final.svg",
            "notes.svg",
        ] {
            fs::write(dir.path().join(name), "<svg/>").unwrap();
        }
        let mut session = ChartSession::new(dir.path());
        session
            .replace(&StatusTotals { up: 2, sd: 1, pp: 0 }, &ranking())
            .unwrap();
        let live = session.distribution().unwrap().path.clone();

        assert_eq!(session.sweep_orphans().unwrap(), 2);
        assert!(live.exists());
        assert!(session.ranking().unwrap().path.exists());
        assert!(!dir.path().join("status_distribution_3.svg").exists());
        assert!(!dir.path().join("top_circuits_12.svg").exists());
        assert!(dir.path().join("top_circuits_final.svg").exists());
        assert!(dir.path().join("notes.svg").exists());
    }

    #[test]
    fn sweep_of_missing_dir_is_a_no_op() {
        let dir = tempdir().unwrap();
        let session = ChartSession::new(dir.path().join("never_created"));
        assert_eq!(session.sweep_orphans().unwrap(), 0);
    }
}
