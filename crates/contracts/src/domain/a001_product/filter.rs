use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Условия отбора товаров для списка и выгрузки.
///
/// Каждое поле необязательно: `None` означает «без ограничения».
/// Заполненные условия объединяются через AND.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductFilter {
    /// Подстрока в наименовании
    pub name: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_stock: Option<i32>,
    /// Дата создания, включительно
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// Показывать и помеченные на удаление
    #[serde(default)]
    pub include_deleted: bool,
}

impl ProductFilter {
    /// Пустая строка поиска равносильна её отсутствию
    pub fn name_fragment(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}
