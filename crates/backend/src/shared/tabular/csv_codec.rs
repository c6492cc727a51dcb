use std::io::{BufRead, BufReader, Cursor, ErrorKind, Read};

use contracts::domain::a001_product::Product;

use super::{RawRow, RowStream, TabularCodec, TabularError, HEADER};

/// CSV: запятая как разделитель, кавычки с удвоением, UTF-8.
///
/// Файл читается построчно, одна запись на строку файла. Поэтому
/// незакрытая кавычка портит только свою строку, а не весь остаток файла.
/// При выгрузке переводы строк внутри текста заменяются пробелом, чтобы
/// каждая запись оставалась на одной строке.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvCodec;

impl TabularCodec for CsvCodec {
    fn decode(
        &self,
        input: Box<dyn Read + Send>,
        has_header: bool,
    ) -> Result<RowStream, TabularError> {
        let mut header_pending = has_header;
        let rows = BufReader::new(input)
            .lines()
            .filter_map(move |line| {
                let line = match line {
                    Ok(line) => line,
                    Err(e) if e.kind() == ErrorKind::InvalidData => {
                        return Some(Err(TabularError::MalformedRow(
                            "line is not valid UTF-8".to_string(),
                        )))
                    }
                    Err(e) => return Some(Err(TabularError::Unreadable(e.to_string()))),
                };

                // Strip UTF-8 BOM if present
                let line = line.trim_start_matches('\u{FEFF}').trim();
                if line.is_empty() {
                    return None;
                }
                if header_pending {
                    header_pending = false;
                    return None;
                }
                Some(parse_line(line))
            });
        Ok(Box::new(rows))
    }

    fn encode(&self, products: &[Product]) -> Result<Cursor<Vec<u8>>, TabularError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        let encode_err = |e: csv::Error| TabularError::Encode(e.to_string());

        writer.write_record(HEADER).map_err(encode_err)?;
        for product in products {
            writer
                .write_record([
                    product.id.to_string(),
                    single_line(&product.name),
                    single_line(product.description.as_deref().unwrap_or_default()),
                    product.price.to_string(),
                    product.stock.to_string(),
                ])
                .map_err(encode_err)?;
        }

        let buffer = writer
            .into_inner()
            .map_err(|e| TabularError::Encode(e.to_string()))?;
        Ok(Cursor::new(buffer))
    }
}

fn single_line(text: &str) -> String {
    text.replace("\r\n", " ")
        .replace(|c: char| c == '\r' || c == '\n', " ")
}

/// Поле, открытое кавычкой, не закрыто до конца строки.
/// Кавычка внутри поля без открывающей кавычки считается обычным символом.
fn has_unterminated_quote(line: &str) -> bool {
    let mut chars = line.chars().peekable();
    let mut field_start = true;
    let mut quoted = false;
    while let Some(c) = chars.next() {
        if quoted {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                } else {
                    quoted = false;
                }
            }
            continue;
        }
        match c {
            ',' => {
                field_start = true;
                continue;
            }
            '"' if field_start => quoted = true,
            _ => {}
        }
        field_start = false;
    }
    quoted
}

fn parse_line(line: &str) -> Result<RawRow, TabularError> {
    if has_unterminated_quote(line) {
        return Err(TabularError::MalformedRow(
            "unterminated quoted field".to_string(),
        ));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());
    let mut record = csv::StringRecord::new();
    match reader.read_record(&mut record) {
        Ok(_) => Ok(RawRow::new(record.iter().map(str::to_string).collect())),
        Err(e) => Err(TabularError::MalformedRow(format!(
            "malformed CSV record: {}",
            e
        ))),
    }
}
