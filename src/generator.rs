// Builds the monthly status sheet the dashboard reads, from a log of circuit
// activities (`circuito;datastart;datastop`).
//
// Every circuit gets one column per day of the month. Weekdays start as
// "Sem Demanda", weekends as "Parada Planejada", and any day covered by an
// activity becomes "Uso Programado". Circuits that end the month without a
// single UP day are left out.
use crate::config::{
    status_sheet_file, usage_counts_file, ACTIVITY_DATETIME_FORMATS, ACTIVITY_DATE_FORMATS,
    GENERATED_CIRCUIT_LABEL, SHEET_DATE_FORMAT,
};
use crate::error::GenerateError;
use crate::output;
use crate::types::{RawSheet, StatusCode, UsageCountRow};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::collections::HashSet;
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One line of the activity log, before its timestamps are parsed.
#[derive(Debug, Deserialize)]
struct ActivityRecord {
    circuito: Option<String>,
    datastart: Option<String>,
    datastop: Option<String>,
}

/// A circuit busy from `start` until `stop`; `stop` is `None` while the
/// activity is still running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    pub circuit: String,
    pub start: NaiveDateTime,
    pub stop: Option<NaiveDateTime>,
}

/// A calendar month. Construction validates the month number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Month {
    first: NaiveDate,
    last: NaiveDate,
}

impl Month {
    pub fn new(year: i32, month: u32) -> Result<Self, GenerateError> {
        let invalid = || GenerateError::InvalidMonth { year, month };
        let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        };
        let last = next.and_then(|d| d.pred_opt()).ok_or_else(invalid)?;
        Ok(Self { first, last })
    }

    pub fn year(&self) -> i32 {
        self.first.year()
    }

    pub fn number(&self) -> u32 {
        self.first.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first
    }

    pub fn last_day(&self) -> NaiveDate {
        self.last
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.first.iter_days().take_while(move |d| *d <= self.last)
    }
}

/// How forced circuits are filled in, regardless of their activities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceMode {
    /// Every day of the month is UP.
    AllUp,
    /// Monday to Friday UP, weekends PP.
    Weekdays,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForceRule {
    pub circuits: Vec<String>,
    pub mode: ForceMode,
}

impl ForceRule {
    fn applies_to(&self, circuit: &str) -> bool {
        self.circuits.iter().any(|c| c == circuit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarRow {
    pub circuit: String,
    pub days: Vec<StatusCode>,
}

impl CalendarRow {
    fn count(&self, code: StatusCode) -> usize {
        self.days.iter().filter(|d| **d == code).count()
    }
}

/// One month of daily statuses, one row per circuit.
#[derive(Debug, Clone)]
pub struct StatusSheet {
    pub month: Month,
    pub rows: Vec<CalendarRow>,
}

impl StatusSheet {
    /// `Circuito` followed by every day of the month as `dd/mm/yyyy`.
    pub fn header(&self) -> Vec<String> {
        let mut header = vec![GENERATED_CIRCUIT_LABEL.to_string()];
        header.extend(
            self.month
                .days()
                .map(|d| d.format(SHEET_DATE_FORMAT).to_string()),
        );
        header
    }

    /// The sheet as the dashboard would read it back, labels spelled out.
    pub fn to_raw(&self) -> RawSheet {
        let mut sheet: RawSheet = vec![self.header().into_iter().map(Some).collect()];
        for row in &self.rows {
            let mut cells = vec![Some(row.circuit.clone())];
            cells.extend(row.days.iter().map(|code| Some(code.label().to_string())));
            sheet.push(cells);
        }
        sheet
    }

    pub fn usage_counts(&self) -> Vec<UsageCountRow> {
        self.rows
            .iter()
            .map(|row| UsageCountRow {
                circuit: row.circuit.clone(),
                up: row.count(StatusCode::Up),
                sd: row.count(StatusCode::Sd),
                pp: row.count(StatusCode::Pp),
            })
            .collect()
    }
}

/// Where [`generate`] put its files.
#[derive(Debug)]
pub struct GeneratedFiles {
    pub sheet_path: PathBuf,
    pub counts_path: PathBuf,
    pub sheet: StatusSheet,
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    ACTIVITY_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            ACTIVITY_DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// Read a `;`-separated activity log with a `circuito;datastart;datastop`
/// header. Extra columns are ignored.
///
/// - Lines without a circuit or with an unreadable `datastart` are skipped
///   (and counted in the log).
/// - An empty or unreadable `datastop` means the activity is still open.
/// - Timestamps may be ISO (`2025-03-01 08:00:00`) or day-first
///   (`01/03/2025 08:00`), with or without seconds, or bare dates.
pub fn read_activities(path: &Path) -> Result<Vec<Activity>, GenerateError> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(GenerateError::activity_read)?;

    let mut activities = Vec::new();
    let mut skipped = 0usize;
    for record in rdr.deserialize::<ActivityRecord>() {
        let record = record.map_err(GenerateError::activity_read)?;
        let circuit = record.circuito.filter(|c| !c.is_empty());
        let start = record.datastart.as_deref().and_then(parse_timestamp);
        match (circuit, start) {
            (Some(circuit), Some(start)) => activities.push(Activity {
                circuit,
                start,
                stop: record.datastop.as_deref().and_then(parse_timestamp),
            }),
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!(path = %path.display(), skipped, "activity lines without circuit or start");
    }
    info!(path = %path.display(), activities = activities.len(), "activity log read");
    Ok(activities)
}

/// Order circuits by the first number in their id (`Circuit2` before
/// `Circuit10`); ids without digits go last. Equal keys keep log order.
fn sort_circuits(ids: &mut [String]) {
    fn number(id: &str) -> Option<u64> {
        let digits: String = id
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse().ok()
    }
    ids.sort_by_key(|id| (number(id).is_none(), number(id)));
}

/// First and last day (inclusive) an activity marks as UP within `month`.
fn covered_days(activity: &Activity, month: &Month, today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = activity.start.date().max(month.first_day());
    let end = match activity.stop {
        Some(stop) => stop.date().min(month.last_day()),
        // an open activity left over from an earlier month counts one day
        None if activity.start.date() < month.first_day() => start,
        None => today.min(month.last_day()),
    };
    (start, end.max(start))
}

fn default_status(day: NaiveDate) -> StatusCode {
    match day.weekday() {
        Weekday::Sat | Weekday::Sun => StatusCode::Pp,
        _ => StatusCode::Sd,
    }
}

fn forced_status(day: NaiveDate, mode: ForceMode) -> StatusCode {
    match mode {
        ForceMode::AllUp => StatusCode::Up,
        ForceMode::Weekdays => match day.weekday() {
            Weekday::Sat | Weekday::Sun => StatusCode::Pp,
            _ => StatusCode::Up,
        },
    }
}

/// Lay the activities out on `month`.
///
/// - Only activities overlapping the month take part: started on or before
///   its last day, and stopped on or after its first day (or still open).
/// - A closed activity covers its start day through its stop day, clipped
///   to the month. An open one runs until `today` when it started this
///   month, and counts a single day when it started earlier. A stop before
///   the start still marks the start day.
/// - Forced circuits ignore their activities and take the rule's pattern;
///   they are kept even without UP days. Forced ids that never appear in
///   the log are ignored.
/// - Every other circuit without an UP day is dropped.
///
/// Fails with [`GenerateError::NoActivity`] when nothing overlaps the month
/// and no circuit is forced, and with [`GenerateError::NoUsage`] when no
/// circuit is left.
pub fn build_sheet(
    activities: &[Activity],
    month: Month,
    today: NaiveDate,
    force: Option<&ForceRule>,
) -> Result<StatusSheet, GenerateError> {
    let (year, number) = (month.year(), month.number());
    let forced = |circuit: &str| force.is_some_and(|rule| rule.applies_to(circuit));

    let in_period: Vec<&Activity> = activities
        .iter()
        .filter(|a| a.start.date() <= month.last_day())
        .filter(|a| a.stop.map_or(true, |stop| stop.date() >= month.first_day()))
        .filter(|a| !forced(&a.circuit))
        .collect();

    let mut seen = HashSet::new();
    let mut circuits: Vec<String> = Vec::new();
    for a in &in_period {
        if seen.insert(a.circuit.as_str()) {
            circuits.push(a.circuit.clone());
        }
    }
    for a in activities.iter().filter(|a| forced(&a.circuit)) {
        if seen.insert(a.circuit.as_str()) {
            circuits.push(a.circuit.clone());
        }
    }
    if let Some(rule) = force {
        for id in rule.circuits.iter().filter(|id| !seen.contains(id.as_str())) {
            warn!(circuit = %id, "forced circuit not in the activity log");
        }
    }
    if circuits.is_empty() {
        return Err(GenerateError::NoActivity { year, month: number });
    }
    sort_circuits(&mut circuits);

    let days: Vec<NaiveDate> = month.days().collect();
    let mut rows = Vec::with_capacity(circuits.len());
    for circuit in circuits {
        let statuses: Vec<StatusCode> = match force {
            Some(rule) if rule.applies_to(&circuit) => {
                days.iter().map(|d| forced_status(*d, rule.mode)).collect()
            }
            _ => {
                let mut statuses: Vec<StatusCode> = days.iter().map(|d| default_status(*d)).collect();
                for a in in_period.iter().filter(|a| a.circuit == circuit) {
                    let (from, to) = covered_days(a, &month, today);
                    for (day, status) in days.iter().zip(statuses.iter_mut()) {
                        if *day >= from && *day <= to {
                            *status = StatusCode::Up;
                        }
                    }
                }
                if !statuses.contains(&StatusCode::Up) {
                    debug!(circuit = %circuit, "no UP day, circuit left out");
                    continue;
                }
                statuses
            }
        };
        rows.push(CalendarRow {
            circuit,
            days: statuses,
        });
    }

    if rows.is_empty() {
        return Err(GenerateError::NoUsage { year, month: number });
    }
    info!(year, month = number, circuits = rows.len(), "status sheet built");
    Ok(StatusSheet { month, rows })
}

/// Write the sheet as CSV: the header from [`StatusSheet::header`], then one
/// line per circuit with the full status labels.
pub fn write_sheet(path: &Path, sheet: &StatusSheet) -> Result<(), Box<dyn Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    for row in sheet.to_raw() {
        wtr.write_record(row.iter().map(|c| c.as_deref().unwrap_or_default()))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Read `input`, build the sheet for `month` and write it, with the
/// per-circuit day counts, into `out_dir`.
pub fn generate(
    input: &Path,
    month: Month,
    today: NaiveDate,
    force: Option<&ForceRule>,
    out_dir: &Path,
) -> Result<GeneratedFiles, GenerateError> {
    let activities = read_activities(input)?;
    let sheet = build_sheet(&activities, month, today, force)?;

    std::fs::create_dir_all(out_dir).map_err(GenerateError::write)?;
    let sheet_path = out_dir.join(status_sheet_file(month.year(), month.number()));
    let counts_path = out_dir.join(usage_counts_file(month.year(), month.number()));
    write_sheet(&sheet_path, &sheet).map_err(GenerateError::write)?;
    output::write_csv(&counts_path, &sheet.usage_counts()).map_err(GenerateError::write)?;
    info!(sheet = %sheet_path.display(), counts = %counts_path.display(), "status sheet written");

    Ok(GeneratedFiles {
        sheet_path,
        counts_path,
        sheet,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use crate::loader::read_sheet;
    use tempfile::tempdir;

    fn at(s: &str) -> NaiveDateTime {
        parse_timestamp(s).unwrap()
    }

    fn activity(circuit: &str, start: &str, stop: Option<&str>) -> Activity {
        Activity {
            circuit: circuit.to_string(),
            start: at(start),
            stop: stop.map(at),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // March 2025 starts on a Saturday and has 31 days.
    fn march() -> Month {
        Month::new(2025, 3).unwrap()
    }

    fn row<'a>(sheet: &'a StatusSheet, circuit: &str) -> &'a CalendarRow {
        sheet.rows.iter().find(|r| r.circuit == circuit).unwrap()
    }

    #[test]
    fn month_bounds_and_validation() {
        let feb = Month::new(2024, 2).unwrap();
        assert_eq!(feb.last_day(), date(2024, 2, 29));
        assert_eq!(feb.days().count(), 29);
        assert_eq!(Month::new(2025, 12).unwrap().last_day(), date(2025, 12, 31));
        assert_eq!(
            Month::new(2025, 13).unwrap_err(),
            GenerateError::InvalidMonth { year: 2025, month: 13 }
        );
    }

    #[test]
    fn activity_days_are_up_on_top_of_the_weekly_default() {
        let acts = vec![activity("Circuit1", "2025-03-03 08:00:00", Some("04/03/2025 17:30"))];
        let sheet = build_sheet(&acts, march(), date(2025, 3, 31), None).unwrap();
        let days = &row(&sheet, "Circuit1").days;
        assert_eq!(days.len(), 31);
        assert_eq!(days[0], StatusCode::Pp); // Sat 1st
        assert_eq!(days[1], StatusCode::Pp); // Sun 2nd
        assert_eq!(days[2], StatusCode::Up);
        assert_eq!(days[3], StatusCode::Up);
        assert_eq!(days[4], StatusCode::Sd);

        let counts = sheet.usage_counts();
        assert_eq!(counts[0].up, 2);
        assert_eq!(counts[0].up + counts[0].sd + counts[0].pp, 31);
    }

    #[test]
    fn activities_are_clipped_to_the_month() {
        let acts = vec![activity("Circuit1", "2025-02-20 00:00:00", Some("2025-03-02 10:00:00"))];
        let sheet = build_sheet(&acts, march(), date(2025, 4, 10), None).unwrap();
        let days = &row(&sheet, "Circuit1").days;
        assert_eq!(&days[..3], &[StatusCode::Up, StatusCode::Up, StatusCode::Sd]);
    }

    #[test]
    fn open_activities_run_until_today_or_count_one_day() {
        let acts = vec![
            activity("Circuit1", "2025-03-10 09:00:00", None),
            activity("Circuit2", "2025-01-15 09:00:00", None),
        ];
        let sheet = build_sheet(&acts, march(), date(2025, 3, 12), None).unwrap();
        let up = |c: &str| row(&sheet, c).count(StatusCode::Up);
        // 10th through the 12th
        assert_eq!(up("Circuit1"), 3);
        // started before March: only the 1st
        assert_eq!(up("Circuit2"), 1);
        assert_eq!(row(&sheet, "Circuit2").days[0], StatusCode::Up);
    }

    #[test]
    fn circuits_without_usage_are_dropped_and_sorted_by_number() {
        let acts = vec![
            activity("Circuit10", "2025-03-05 08:00:00", Some("2025-03-05 09:00:00")),
            activity("Circuit2", "2025-03-06 08:00:00", Some("2025-03-06 09:00:00")),
            // finished before March
            activity("Circuit3", "2025-02-01 08:00:00", Some("2025-02-02 09:00:00")),
        ];
        let sheet = build_sheet(&acts, march(), date(2025, 3, 31), None).unwrap();
        let ids: Vec<&str> = sheet.rows.iter().map(|r| r.circuit.as_str()).collect();
        assert_eq!(ids, vec!["Circuit2", "Circuit10"]);
    }

    #[test]
    fn nothing_in_the_month_is_an_error() {
        let acts = vec![activity("Circuit1", "2025-05-01 08:00:00", None)];
        assert_eq!(
            build_sheet(&acts, march(), date(2025, 5, 2), None).unwrap_err(),
            GenerateError::NoActivity { year: 2025, month: 3 }
        );
    }

    #[test]
    fn forced_circuits_follow_the_rule() {
        let acts = vec![
            activity("Circuit1", "2025-03-03 08:00:00", Some("2025-03-03 09:00:00")),
            activity("Circuit5", "2024-11-01 08:00:00", Some("2024-11-02 08:00:00")),
        ];
        let all = ForceRule {
            circuits: vec!["Circuit5".to_string(), "Circuit99".to_string()],
            mode: ForceMode::AllUp,
        };
        let sheet = build_sheet(&acts, march(), date(2025, 3, 31), Some(&all)).unwrap();
        assert_eq!(row(&sheet, "Circuit5").count(StatusCode::Up), 31);
        assert!(sheet.rows.iter().all(|r| r.circuit != "Circuit99"));

        let weekdays = ForceRule {
            circuits: vec!["Circuit1".to_string()],
            mode: ForceMode::Weekdays,
        };
        let sheet = build_sheet(&acts, march(), date(2025, 3, 31), Some(&weekdays)).unwrap();
        let c1 = row(&sheet, "Circuit1");
        assert_eq!(c1.count(StatusCode::Up), 21);
        assert_eq!(c1.count(StatusCode::Pp), 10);
        assert_eq!(c1.count(StatusCode::Sd), 0);
    }

    #[test]
    fn reads_semicolon_log_and_skips_bad_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dados_processados.csv");
        std::fs::write(
            &path,
            "circuito;datastart;datastop\n\
             Circuit1;01/03/2025 08:00:00;02/03/2025 10:00:00\n\
             Circuit2;2025-03-05 08:00:00;\n\
             Circuit3;not a date;\n\
             ;01/03/2025 08:00;\n",
        )
        .unwrap();
        let acts = read_activities(&path).unwrap();
        assert_eq!(acts.len(), 2);
        assert_eq!(acts[0].stop, Some(at("2025-03-02 10:00:00")));
        assert_eq!(acts[1].circuit, "Circuit2");
        assert_eq!(acts[1].stop, None);

        assert!(matches!(
            read_activities(&dir.path().join("missing.csv")).unwrap_err(),
            GenerateError::ActivityRead { .. }
        ));
    }

    #[test]
    fn generated_sheet_loads_into_the_dashboard() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("log.csv");
        std::fs::write(
            &input,
            "circuito;datastart;datastop\n\
             Circuit7;2025-03-03 08:00:00;2025-03-07 18:00:00\n\
             Circuit2;2025-03-10 08:00:00;2025-03-10 12:00:00\n",
        )
        .unwrap();
        let out = dir.path().join("out");
        let files = generate(&input, march(), date(2025, 3, 31), None, &out).unwrap();
        assert_eq!(files.sheet_path, out.join("relatorio_oee_2025-03.csv"));
        assert!(files.counts_path.exists());

        let raw = read_sheet(&files.sheet_path).unwrap();
        assert_eq!(raw[0][0].as_deref(), Some("Circuito"));
        assert_eq!(raw[0][1].as_deref(), Some("01/03/2025"));
        assert_eq!(raw[0].len(), 32);

        let analysis = analyze(&raw).unwrap();
        assert_eq!(analysis.total_circuits, 2);
        assert_eq!(analysis.circuit_stats.get("Circuit7").map(|s| s.up), Some(5));
        assert_eq!(analysis.circuit_stats.get("Circuit2").map(|s| s.up), Some(1));
        assert_eq!(analysis.status_totals.sum(), 62);
        let ids: Vec<&str> = analysis.circuit_stats.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["Circuit2", "Circuit7"]);

        let counts = std::fs::read_to_string(&files.counts_path).unwrap();
        assert!(counts.starts_with("Circuito,Uso Programado,Sem Demanda,Parada Planejada"));
    }
}
