use std::io::{Cursor, Read};

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use contracts::domain::a001_product::Product;
use rust_xlsxwriter::{Format, Workbook, XlsxError};

use super::{RawRow, RowStream, TabularCodec, TabularError, COLUMN_COUNT, HEADER};

/// Книга Excel (xlsx, xls и другие варианты, которые понимает calamine).
///
/// Контейнер книги требует произвольного доступа, поэтому вход читается в
/// память целиком, а лист разбирается один раз. Строки из листа выдаются
/// лениво, по одной.
#[derive(Debug, Clone, Default)]
pub struct ExcelCodec {
    sheet_name: Option<String>,
}

impl ExcelCodec {
    pub fn new(sheet_name: Option<String>) -> Self {
        Self { sheet_name }
    }
}

impl TabularCodec for ExcelCodec {
    fn decode(
        &self,
        mut input: Box<dyn Read + Send>,
        has_header: bool,
    ) -> Result<RowStream, TabularError> {
        let mut bytes = Vec::new();
        input
            .read_to_end(&mut bytes)
            .map_err(|e| TabularError::Unreadable(e.to_string()))?;

        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
            .map_err(|e| TabularError::Unreadable(e.to_string()))?;

        let sheet = pick_sheet(&workbook.sheet_names(), self.sheet_name.as_deref())?;
        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| TabularError::Unreadable(e.to_string()))?;

        Ok(Box::new(SheetRows::new(range, has_header)))
    }

    fn encode(&self, products: &[Product]) -> Result<Cursor<Vec<u8>>, TabularError> {
        let encode_err = |e: XlsxError| TabularError::Encode(e.to_string());

        let mut workbook = Workbook::new();
        let header_format = Format::new().set_bold();
        let worksheet = workbook.add_worksheet();

        for (col, title) in HEADER.iter().enumerate() {
            worksheet
                .write_string_with_format(0, col as u16, *title, &header_format)
                .map_err(encode_err)?;
        }

        for (index, product) in products.iter().enumerate() {
            let row = u32::try_from(index + 1)
                .map_err(|_| TabularError::Encode("too many rows for a worksheet".into()))?;
            worksheet
                .write_number(row, 0, product.id as f64)
                .map_err(encode_err)?;
            worksheet
                .write_string(row, 1, &product.name)
                .map_err(encode_err)?;
            if let Some(description) = &product.description {
                worksheet
                    .write_string(row, 2, description)
                    .map_err(encode_err)?;
            }
            worksheet
                .write_number(row, 3, product.price)
                .map_err(encode_err)?;
            worksheet
                .write_number(row, 4, product.stock)
                .map_err(encode_err)?;
        }

        let buffer = workbook.save_to_buffer().map_err(encode_err)?;
        Ok(Cursor::new(buffer))
    }
}

/// Запрошенный лист, если он есть в книге, иначе первый
fn pick_sheet(sheet_names: &[String], wanted: Option<&str>) -> Result<String, TabularError> {
    let first_sheet = sheet_names.first().cloned().ok_or(TabularError::NoSheets)?;
    match wanted {
        Some(name) if sheet_names.iter().any(|s| s == name) => Ok(name.to_string()),
        Some(name) => {
            tracing::warn!(
                "Sheet '{}' not found, falling back to first sheet '{}'",
                name,
                first_sheet
            );
            Ok(first_sheet)
        }
        None => Ok(first_sheet),
    }
}

/// Строки листа по абсолютным номерам; колонка 0 это первая колонка листа,
/// даже если занятая область начинается правее
struct SheetRows {
    range: Range<Data>,
    next_row: u32,
    last_row: Option<u32>,
    header_pending: bool,
}

impl SheetRows {
    fn new(range: Range<Data>, has_header: bool) -> Self {
        let next_row = range.start().map(|(row, _)| row).unwrap_or_default();
        let last_row = range.end().map(|(row, _)| row);
        Self {
            range,
            next_row,
            last_row,
            header_pending: has_header,
        }
    }

    fn read_row(&self, row: u32) -> RawRow {
        let cells = (0..COLUMN_COUNT as u32)
            .map(|col| match self.range.get_value((row, col)) {
                None | Some(Data::Empty) => String::new(),
                Some(value) => value.to_string(),
            })
            .collect();
        RawRow::new(cells)
    }
}

impl Iterator for SheetRows {
    type Item = Result<RawRow, TabularError>;

    fn next(&mut self) -> Option<Self::Item> {
        let last_row = self.last_row?;
        while self.next_row <= last_row {
            let row = self.read_row(self.next_row);
            self.next_row += 1;

            if row.is_blank() {
                continue;
            }
            if self.header_pending {
                self.header_pending = false;
                continue;
            }
            return Some(Ok(row));
        }
        None
    }
}
