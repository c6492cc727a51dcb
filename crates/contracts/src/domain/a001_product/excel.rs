use serde::{Deserialize, Serialize};

/// Ошибка по одной строке файла
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowFailure {
    /// Номер строки данных, с 1, без учёта заголовка
    pub row: usize,
    pub message: String,
}

/// Результат импорта: сводка по всем обработанным строкам.
///
/// Строковые ошибки не прерывают импорт, а копятся здесь.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportOutcome {
    #[serde(rename = "total")]
    pub total_processed: usize,
    #[serde(rename = "success")]
    pub success_count: usize,
    pub errors: Vec<RowFailure>,
    /// Импорт остановлен отменой, результат частичный
    #[serde(default)]
    pub cancelled: bool,
}

impl ImportOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    /// Начать обработку очередной строки, возвращает её номер
    pub fn begin_row(&mut self) -> usize {
        self.total_processed += 1;
        self.total_processed
    }

    pub fn record_success(&mut self) {
        self.success_count += 1;
    }

    pub fn record_failure(&mut self, row: usize, message: impl Into<String>) {
        self.errors.push(RowFailure {
            row,
            message: message.into(),
        });
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}
