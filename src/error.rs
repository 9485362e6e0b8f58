use crate::config::{
    ACTIVITY_READ_TEXT, COLUMN_ERROR_TEXT, EXPORT_ERROR_TEXT, FILE_ERROR_TEXT, INVALID_DATA_TEXT,
    SHEET_WRITE_TEXT,
};
use thiserror::Error;

/// Everything that can go wrong between picking a file and showing the
/// dashboard. `Display` is the message the user sees; `detail` carries the
/// underlying cause for the log.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DashboardError {
    #[error("{}", FILE_ERROR_TEXT)]
    FileRead { detail: String },
    #[error("{}", INVALID_DATA_TEXT)]
    EmptyData,
    #[error("{}", COLUMN_ERROR_TEXT)]
    MissingCircuitColumn,
    #[error("{}", EXPORT_ERROR_TEXT)]
    Export { detail: String },
}

impl DashboardError {
    pub fn file_read(detail: impl ToString) -> Self {
        DashboardError::FileRead {
            detail: detail.to_string(),
        }
    }

    pub fn export(detail: impl ToString) -> Self {
        DashboardError::Export {
            detail: detail.to_string(),
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            DashboardError::FileRead { detail } | DashboardError::Export { detail } => {
                Some(detail)
            }
            _ => None,
        }
    }
}

/// Failures of the status sheet generator. Like [`DashboardError`], the
/// `Display` text is what the user reads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    #[error("{}", ACTIVITY_READ_TEXT)]
    ActivityRead { detail: String },
    #[error("Mês inválido ({month}). Digite um número entre 1 e 12.")]
    InvalidMonth { year: i32, month: u32 },
    #[error("Nenhuma atividade encontrada para o período de {month:02}/{year}.")]
    NoActivity { year: i32, month: u32 },
    #[error("Nenhum circuito teve 'Uso Programado' no período de {month:02}/{year}.")]
    NoUsage { year: i32, month: u32 },
    #[error("{}", SHEET_WRITE_TEXT)]
    Write { detail: String },
}

impl GenerateError {
    pub fn activity_read(detail: impl ToString) -> Self {
        GenerateError::ActivityRead {
            detail: detail.to_string(),
        }
    }

    pub fn write(detail: impl ToString) -> Self {
        GenerateError::Write {
            detail: detail.to_string(),
        }
    }
}
