use contracts::domain::a001_product::ProductDraft;

use super::{TabularError, COLUMN_COUNT};

const NAME: usize = 1;
const DESCRIPTION: usize = 2;
const PRICE: usize = 3;
const STOCK: usize = 4;

/// Строка файла: ячейки по логическим номерам колонок
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawRow {
    cells: Vec<String>,
}

impl RawRow {
    pub fn new(cells: Vec<String>) -> Self {
        Self { cells }
    }

    /// Значение ячейки без пробелов по краям; пустая ячейка даёт None
    pub fn cell(&self, index: usize) -> Option<&str> {
        self.cells
            .get(index)
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
    }

    pub fn is_blank(&self) -> bool {
        (0..self.cells.len()).all(|i| self.cell(i).is_none())
    }

    /// Кандидат в товар.
    ///
    /// `Ok(None)`: в колонках данных пусто. Недостающие колонки не
    /// подставляются из соседних: без наименования или цены строку отклонит
    /// валидация. Нечисловая цена или остаток считается ошибкой этой строки.
    pub fn to_draft(&self) -> Result<Option<ProductDraft>, TabularError> {
        if (NAME..COLUMN_COUNT).all(|i| self.cell(i).is_none()) {
            return Ok(None);
        }

        let price = match self.cell(PRICE) {
            Some(raw) => parse_price(raw)?,
            None => 0.0,
        };
        let stock = match self.cell(STOCK) {
            Some(raw) => parse_stock(raw)?,
            None => 0,
        };

        Ok(Some(
            ProductDraft {
                name: self.cell(NAME).unwrap_or_default().to_string(),
                description: self.cell(DESCRIPTION).map(str::to_string),
                price,
                stock,
            }
            .normalized(),
        ))
    }
}

fn parse_price(raw: &str) -> Result<f64, TabularError> {
    let normalized = raw.replace(',', ".");
    match normalized.parse::<f64>() {
        Ok(price) if price.is_finite() => Ok(price),
        _ => Err(TabularError::MalformedRow(format!(
            "invalid price value '{}'",
            raw
        ))),
    }
}

fn parse_stock(raw: &str) -> Result<i32, TabularError> {
    raw.parse()
        .map_err(|_| TabularError::MalformedRow(format!("invalid stock value '{}'", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> RawRow {
        RawRow::new(cells.iter().map(|c| c.to_string()).collect())
    }

    #[test]
    fn test_full_row_maps_columns_in_order() {
        let draft = row(&["99", " Lamp ", "Desk lamp", "19.90", "4"])
            .to_draft()
            .unwrap()
            .unwrap();
        assert_eq!(draft.name, "Lamp");
        assert_eq!(draft.description.as_deref(), Some("Desk lamp"));
        assert_eq!(draft.price, 19.9);
        assert_eq!(draft.stock, 4);
    }

    #[test]
    fn test_decimal_comma_price() {
        let draft = row(&["", "Lamp", "", "5309,00", "1"])
            .to_draft()
            .unwrap()
            .unwrap();
        assert_eq!(draft.price, 5309.0);
        assert_eq!(draft.description, None);
    }

    #[test]
    fn test_short_row_is_not_shifted() {
        // только id и наименование: цена не берётся из соседней колонки
        let draft = row(&["1", "Lamp"]).to_draft().unwrap().unwrap();
        assert_eq!(draft.name, "Lamp");
        assert_eq!(draft.price, 0.0);
        assert_eq!(draft.stock, 0);
    }

    #[test]
    fn test_empty_data_columns_give_no_candidate() {
        assert_eq!(row(&["15", "", " ", ""]).to_draft().unwrap(), None);
        assert_eq!(row(&[]).to_draft().unwrap(), None);
    }

    #[test]
    fn test_non_numeric_cells_are_row_errors() {
        let err = row(&["", "Lamp", "", "cheap", "1"]).to_draft().unwrap_err();
        assert!(err.is_row_level());
        assert_eq!(err.to_string(), "invalid price value 'cheap'");

        let err = row(&["", "Lamp", "", "10", "many"]).to_draft().unwrap_err();
        assert!(err.is_row_level());

        // знак остатка проверяет валидатор, не разбор ячейки
        let draft = row(&["", "Lamp", "", "10", "-3"]).to_draft().unwrap().unwrap();
        assert_eq!(draft.stock, -3);
    }

    #[test]
    fn test_blank_row() {
        assert!(row(&[" ", "", "\t"]).is_blank());
        assert!(!row(&["", "x"]).is_blank());
    }
}
