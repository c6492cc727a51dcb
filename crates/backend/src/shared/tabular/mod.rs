//! Табличные форматы обмена товарами: Excel и CSV.
//!
//! Обе реализации читают и пишут одни и те же пять колонок в фиксированном
//! порядке: идентификатор, наименование, описание, цена, остаток.
//! Идентификатор при импорте игнорируется: его назначает хранилище.

pub mod csv_codec;
pub mod excel_codec;
pub mod row;

use std::io::{Cursor, Read};
use std::str::FromStr;

use contracts::domain::a001_product::Product;
use thiserror::Error;

pub use csv_codec::CsvCodec;
pub use excel_codec::ExcelCodec;
pub use row::RawRow;

/// Заголовок выгрузки
pub const HEADER: [&str; 5] = ["ProductId", "ProductName", "Description", "Price", "Stock"];

pub const COLUMN_COUNT: usize = HEADER.len();

#[derive(Debug, Error)]
pub enum TabularError {
    #[error("Unsupported format: {0}. Only excel or csv files are supported")]
    UnsupportedFormat(String),

    #[error("Workbook does not contain any worksheets")]
    NoSheets,

    #[error("Cannot read input: {0}")]
    Unreadable(String),

    #[error("{0}")]
    MalformedRow(String),

    #[error("Cannot write output: {0}")]
    Encode(String),
}

impl TabularError {
    /// Ошибка касается одной строки, импорт продолжается со следующей
    pub fn is_row_level(&self) -> bool {
        matches!(self, TabularError::MalformedRow(_))
    }
}

/// Ленивая последовательность строк файла.
///
/// Однопроходная и неперезапускаемая: каждая строка читается только при
/// запросе, повторно перебрать уже прочитанное нельзя.
pub type RowStream = Box<dyn Iterator<Item = Result<RawRow, TabularError>> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatTag {
    Spreadsheet,
    DelimitedText,
}

impl FormatTag {
    /// Формат по расширению загруженного файла
    pub fn from_file_name(file_name: &str) -> Result<Self, TabularError> {
        let extension = std::path::Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        extension.parse()
    }

    pub fn extension(&self) -> &'static str {
        match self {
            FormatTag::Spreadsheet => "xlsx",
            FormatTag::DelimitedText => "csv",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            FormatTag::Spreadsheet => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            FormatTag::DelimitedText => "text/csv",
        }
    }
}

impl FromStr for FormatTag {
    type Err = TabularError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_lowercase().as_str() {
            "excel" | "xlsx" | "xls" => Ok(FormatTag::Spreadsheet),
            "csv" => Ok(FormatTag::DelimitedText),
            other => Err(TabularError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Кодек табличного файла
pub trait TabularCodec: Send + Sync {
    /// Разбирает вход в ленивую последовательность строк.
    /// Ошибка здесь структурная: файл не открыт, ни одна строка не обработана.
    fn decode(
        &self,
        input: Box<dyn Read + Send>,
        has_header: bool,
    ) -> Result<RowStream, TabularError>;

    /// Полностью сформированный файл, курсор стоит в начале
    fn encode(&self, products: &[Product]) -> Result<Cursor<Vec<u8>>, TabularError>;
}

pub fn codec_for(format: FormatTag, sheet_name: Option<String>) -> Box<dyn TabularCodec> {
    match format {
        FormatTag::Spreadsheet => Box::new(ExcelCodec::new(sheet_name)),
        FormatTag::DelimitedText => Box::new(CsvCodec),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_tag_parsing() {
        assert_eq!("excel".parse::<FormatTag>().unwrap(), FormatTag::Spreadsheet);
        assert_eq!("XLSX".parse::<FormatTag>().unwrap(), FormatTag::Spreadsheet);
        assert_eq!(".xls".parse::<FormatTag>().unwrap(), FormatTag::Spreadsheet);
        assert_eq!(" csv ".parse::<FormatTag>().unwrap(), FormatTag::DelimitedText);
        assert!(matches!(
            "pdf".parse::<FormatTag>(),
            Err(TabularError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_format_from_file_name() {
        assert_eq!(
            FormatTag::from_file_name("Products.CSV").unwrap(),
            FormatTag::DelimitedText
        );
        assert_eq!(
            FormatTag::from_file_name("report.2024.xlsx").unwrap(),
            FormatTag::Spreadsheet
        );
        assert!(FormatTag::from_file_name("no_extension").is_err());
    }

    #[test]
    fn test_only_malformed_rows_are_row_level() {
        assert!(TabularError::MalformedRow("x".into()).is_row_level());
        assert!(!TabularError::NoSheets.is_row_level());
        assert!(!TabularError::Unreadable("x".into()).is_row_level());
    }
}
