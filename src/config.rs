// Fixed vocabulary, colors and user-facing texts, plus the runtime
// configuration assembled from the command line.
use std::path::PathBuf;
use std::time::Duration;

/// Raw sheet labels and the short code each one maps to.
pub const STATUS_LABELS: [(&str, &str); 3] = [
    ("Uso Programado", "UP"),
    ("Sem Demanda", "SD"),
    ("Parada Planejada", "PP"),
];

pub const COLOR_UP: (u8, u8, u8) = (0x14, 0x53, 0x2D);
pub const COLOR_SD: (u8, u8, u8) = (0xA1, 0x62, 0x07);
pub const COLOR_PP: (u8, u8, u8) = (0x1E, 0x3A, 0x8A);
pub const COLOR_NEUTRAL: (u8, u8, u8) = (0x64, 0x74, 0x8B);

pub const FILE_ERROR_TEXT: &str = "Ocorreu um erro ao ler o arquivo. Verifique o formato.";
pub const INVALID_DATA_TEXT: &str = "O arquivo parece estar vazio ou em um formato inesperado.";
pub const COLUMN_ERROR_TEXT: &str =
    "Não foi possível encontrar a coluna de circuitos. Verifique o cabeçalho do arquivo.";
pub const EXPORT_ERROR_TEXT: &str = "Não foi possível gravar os arquivos do painel.";
pub const ACTIVITY_READ_TEXT: &str = "Não foi possível ler o arquivo de atividades.";
pub const SHEET_WRITE_TEXT: &str = "Não foi possível gravar a planilha de status.";

/// How long an error alert stays on screen.
pub const ALERT_TTL: Duration = Duration::from_secs(5);

pub const DEFAULT_TOP_N: usize = 10;
pub const DEFAULT_PREVIEW_ROWS: usize = 10;
pub const DEFAULT_OUT_DIR: &str = "dashboard_out";

pub const HTML_FILE: &str = "dashboard.html";
pub const STATS_CSV_FILE: &str = "circuit_stats.csv";
pub const SUMMARY_JSON_FILE: &str = "summary.json";

/// Header of the circuit column in generated status sheets.
pub const GENERATED_CIRCUIT_LABEL: &str = "Circuito";
/// Date format of the generated sheet's day columns.
pub const SHEET_DATE_FORMAT: &str = "%d/%m/%Y";
/// Timestamp layouts accepted in the activity log, tried in order.
pub const ACTIVITY_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y-%m-%d %H:%M",
];
pub const ACTIVITY_DATE_FORMATS: [&str; 2] = ["%d/%m/%Y", "%Y-%m-%d"];

pub fn status_sheet_file(year: i32, month: u32) -> String {
    format!("relatorio_oee_{}-{:02}.csv", year, month)
}

pub fn usage_counts_file(year: i32, month: u32) -> String {
    format!("resumo_oee_{}-{:02}.csv", year, month)
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub out_dir: PathBuf,
    pub top_n: usize,
    pub preview_rows: usize,
    pub alert_ttl: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            top_n: DEFAULT_TOP_N,
            preview_rows: DEFAULT_PREVIEW_ROWS,
            alert_ttl: ALERT_TTL,
        }
    }
}

pub fn hex_color((r, g, b): (u8, u8, u8)) -> String {
    format!("#{:02X}{:02X}{:02X}", r, g, b)
}
