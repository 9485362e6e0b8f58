// Entry point and high-level CLI flow.
//
// The landing menu leads into the dashboard menu, where a spreadsheet can be
// loaded, its circuits searched and the detail table printed. Every
// successful load also exports an HTML dashboard with its charts, a CSV of
// per-circuit tallies and a JSON summary into the output directory.
//
// The `generate` subcommand (or option [2] of the landing menu) builds such a
// spreadsheet for one month out of a circuit activity log.
mod analysis;
mod charts;
mod config;
mod controller;
mod dashboard;
mod error;
mod generator;
mod loader;
mod output;
mod reports;
mod table;
mod types;
mod util;

use chrono::{Datelike, Local, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use config::{AppConfig, HTML_FILE};
use controller::{Controller, LoadOutcome, Panel, Screen};
use error::GenerateError;
use generator::{ForceMode, ForceRule, Month};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use types::StatusCode;

#[derive(Parser, Debug)]
#[command(author, version, about = "Circuit status dashboard", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Spreadsheet to load right after entering the dashboard
    #[arg(long)]
    file: Option<PathBuf>,

    /// Directory receiving the HTML dashboard, charts and exports
    #[arg(long, global = true, default_value = config::DEFAULT_OUT_DIR)]
    out_dir: PathBuf,

    /// Number of circuits in the UP ranking
    #[arg(long, default_value_t = config::DEFAULT_TOP_N)]
    top: usize,

    /// Rows printed in terminal table previews
    #[arg(long, default_value_t = config::DEFAULT_PREVIEW_ROWS)]
    preview_rows: usize,

    /// Load --file, export, and exit without showing menus
    #[arg(long, requires = "file")]
    batch: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a month's status spreadsheet from a circuit activity log
    Generate(GenerateArgs),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// `;`-separated log with `circuito;datastart;datastop` columns
    input: PathBuf,

    /// Year of the sheet (defaults to the current year)
    #[arg(long)]
    year: Option<i32>,

    /// Month of the sheet, 1-12 (defaults to the current month)
    #[arg(long)]
    month: Option<u32>,

    /// Circuits filled in by --force-mode instead of their activities
    #[arg(long, value_delimiter = ',')]
    force: Vec<String>,

    /// Pattern applied to forced circuits
    #[arg(long, value_enum, default_value_t = ForceOpt::AllUp)]
    force_mode: ForceOpt,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ForceOpt {
    /// Every day UP
    AllUp,
    /// Monday to Friday UP, weekends PP
    Weekdays,
}

impl From<ForceOpt> for ForceMode {
    fn from(value: ForceOpt) -> Self {
        match value {
            ForceOpt::AllUp => ForceMode::AllUp,
            ForceOpt::Weekdays => ForceMode::Weekdays,
        }
    }
}

impl Cli {
    fn app_config(&self) -> AppConfig {
        AppConfig {
            out_dir: self.out_dir.clone(),
            top_n: self.top,
            preview_rows: self.preview_rows,
            ..AppConfig::default()
        }
    }
}

/// Read one trimmed line after printing `prompt`.
fn read_line(prompt: &str) -> Option<String> {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

fn print_dashboard(ctl: &Controller, preview_rows: usize) {
    let Some(view) = ctl.dashboard().view() else {
        return;
    };
    println!("Arquivo: {}\n", view.file_name);
    if let Some(kpis) = &view.kpis {
        output::preview_table_rows(&kpis.rows(), 4);
    }
    println!(
        "Status totals: UP {} | SD {} | PP {}\n",
        util::format_int(view.analysis.status_totals.up),
        util::format_int(view.analysis.status_totals.sd),
        util::format_int(view.analysis.status_totals.pp)
    );
    println!("Top {} circuits by UP days\n", view.ranking.len());
    output::preview_table_rows(&view.ranking, view.ranking.len());
    print_detail(ctl, preview_rows);
}

fn print_detail(ctl: &Controller, preview_rows: usize) {
    let Some(view) = ctl.dashboard().view() else {
        return;
    };
    let table = &view.table;
    println!("Relatório Detalhado");
    if !table.term().is_empty() {
        println!("(filter: \"{}\")", table.term());
    }
    println!("{}", table.to_markdown(preview_rows));
    println!(
        "({} of {} rows shown)\n",
        util::format_int(table.visible_count().min(preview_rows)),
        util::format_int(table.rows.len())
    );
}

fn print_circuit_tally(ctl: &Controller) {
    let Some(view) = ctl.dashboard().view() else {
        return;
    };
    let Some(row) = view.table.visible_rows().next() else {
        return;
    };
    if let Some(stats) = view.analysis.circuit_stats.get(&row.circuit) {
        let parts: Vec<String> = StatusCode::ALL
            .iter()
            .map(|code| format!("{} {}", code, util::format_int(stats.get(*code))))
            .collect();
        println!(
            "{}: {} ({} days)\n",
            row.circuit,
            parts.join(" | "),
            util::format_int(stats.total_days)
        );
    }
}

fn report_outcome(ctl: &Controller, outcome: Option<LoadOutcome>, cfg: &AppConfig) {
    match outcome {
        None => println!("A file is already being processed.\n"),
        Some(LoadOutcome::Rendered) => {
            print_dashboard(ctl, cfg.preview_rows);
            println!(
                "(Dashboard exported to {})\n",
                cfg.out_dir.join(HTML_FILE).display()
            );
            let charts = ctl.dashboard().charts();
            for chart in [charts.distribution(), charts.ranking()].into_iter().flatten() {
                println!("Chart written: {}", chart.path.display());
            }
            println!();
        }
        Some(LoadOutcome::Failed(e)) => {
            let msg = ctl
                .active_alert(Instant::now())
                .map(str::to_string)
                .unwrap_or_else(|| e.to_string());
            println!("Erro: {}\n", msg);
        }
        Some(LoadOutcome::Stale) => {}
    }
}

/// Build and write a month's status sheet, then print where it went and
/// the per-circuit day counts.
///
/// - `year`/`month` fall back to today's.
/// - An empty `force` list means no circuit is forced.
fn run_generate(
    input: &Path,
    year: Option<i32>,
    month: Option<u32>,
    force: Vec<String>,
    mode: ForceMode,
    cfg: &AppConfig,
) -> Result<(), GenerateError> {
    let today: NaiveDate = Local::now().date_naive();
    let month = Month::new(
        year.unwrap_or_else(|| today.year()),
        month.unwrap_or_else(|| today.month()),
    )?;
    let rule = (!force.is_empty()).then_some(ForceRule {
        circuits: force,
        mode,
    });
    println!(
        "Generating status sheet for {:02}/{}...\n",
        month.number(),
        month.year()
    );
    let files = generator::generate(input, month, today, rule.as_ref(), &cfg.out_dir)?;
    let counts = files.sheet.usage_counts();
    output::preview_table_rows(&counts, cfg.preview_rows);
    println!(
        "(Status sheet for {} circuits written to {})",
        util::format_int(counts.len()),
        files.sheet_path.display()
    );
    println!("(Day counts written to {})\n", files.counts_path.display());
    Ok(())
}

/// Handle landing option [2]: prompt for the log, month and forcing rule.
fn handle_generate(cfg: &AppConfig) {
    let Some(input) = read_line("Activity log path: ").filter(|p| !p.is_empty()) else {
        return;
    };
    let parse_or_default = |prompt: &str| -> Result<Option<u32>, ()> {
        match read_line(prompt).as_deref() {
            None | Some("") => Ok(None),
            Some(v) => v.parse().map(Some).map_err(|_| ()),
        }
    };
    let (Ok(year), Ok(month)) = (
        parse_or_default("Year (blank for current): "),
        parse_or_default("Month 1-12 (blank for current): "),
    ) else {
        println!("Invalid input. Please enter numbers only.\n");
        return;
    };
    let force: Vec<String> = read_line("Circuits to force, comma separated (blank for none): ")
        .unwrap_or_default()
        .split(',')
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    let mode = if force.is_empty() {
        ForceMode::AllUp
    } else {
        match read_line("[1] 100% UP  [2] Mon-Fri UP: ").as_deref() {
            Some("2") => ForceMode::Weekdays,
            _ => ForceMode::AllUp,
        }
    };
    let year = year.map(|y| y as i32);
    if let Err(e) = run_generate(&PathBuf::from(input), year, month, force, mode, cfg) {
        println!("Erro: {}\n", e);
    }
}

fn landing(ctl: &mut Controller, cfg: &AppConfig) -> bool {
    loop {
        println!("Painel de Circuitos");
        println!("[1] Enter dashboard");
        println!("[2] Generate status sheet from activity log");
        println!("[0] Exit\n");
        match read_line("Enter choice: ").as_deref() {
            Some("1") => {
                ctl.enter_dashboard();
                return true;
            }
            Some("2") => handle_generate(cfg),
            Some("0") | None => return false,
            _ => println!("Invalid choice. Please enter 1, 2 or 0.\n"),
        }
    }
}

fn dashboard_menu(ctl: &mut Controller, cfg: &AppConfig) {
    loop {
        if let Some(msg) = ctl.active_alert(Instant::now()) {
            println!("[!] {}", msg);
        }
        let populated = ctl.screen() == Screen::Dashboard(Panel::Populated);
        match ctl.file_name() {
            Some(name) => println!("Dashboard ({})", name),
            None => println!("Dashboard (no file loaded)"),
        }
        println!("[1] Load a file");
        if populated {
            println!("[2] Search circuits");
            println!("[3] Show detail table");
        }
        println!("[0] Exit\n");

        match read_line("Enter choice: ").as_deref() {
            Some("1") if ctl.is_loading() => println!("A file is already being processed.\n"),
            Some("1") => {
                let Some(path) = read_line("File path: ") else {
                    return;
                };
                if path.is_empty() {
                    continue;
                }
                println!("Processing {}...\n", path);
                let outcome = ctl.load_file(&PathBuf::from(path));
                report_outcome(ctl, outcome, cfg);
            }
            Some("2") if populated => {
                let label = ctl
                    .dashboard()
                    .view()
                    .map(|v| v.analysis.circuit_label().to_string())
                    .unwrap_or_default();
                let term = read_line(&format!("Search {}: ", label)).unwrap_or_default();
                if let Some(shown) = ctl.search(&term) {
                    println!("{} matching rows\n", util::format_int(shown));
                    if shown == 1 {
                        print_circuit_tally(ctl);
                    }
                }
                print_detail(ctl, cfg.preview_rows);
            }
            Some("3") if populated => print_detail(ctl, cfg.preview_rows),
            Some("0") | None => return,
            _ => println!("Invalid choice.\n"),
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = cli.app_config();

    if let Some(Command::Generate(args)) = cli.command {
        return match run_generate(
            &args.input,
            args.year,
            args.month,
            args.force,
            args.force_mode.into(),
            &cfg,
        ) {
            Ok(_) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!(error = %e, "status sheet generation failed");
                println!("Erro: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    let mut ctl = Controller::new(cfg.clone());

    if cli.batch {
        ctl.enter_dashboard();
        let Some(path) = cli.file.as_deref() else {
            return ExitCode::FAILURE;
        };
        let outcome = ctl.load_file(path);
        let ok = matches!(outcome, Some(LoadOutcome::Rendered));
        report_outcome(&ctl, outcome, &cfg);
        return if ok {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        };
    }

    if !landing(&mut ctl, &cfg) {
        println!("Exiting the program.");
        return ExitCode::SUCCESS;
    }
    if let Some(path) = cli.file.as_deref() {
        let outcome = ctl.load_file(path);
        report_outcome(&ctl, outcome, &cfg);
    }
    dashboard_menu(&mut ctl, &cfg);
    println!("Exiting the program.");
    ExitCode::SUCCESS
}
