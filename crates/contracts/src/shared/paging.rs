use serde::{Deserialize, Serialize};

/// Запрошенная страница. Номер страницы с 1, размер больше нуля.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    page_index: u64,
    page_size: u64,
}

impl PageRequest {
    pub fn new(page_index: u64, page_size: u64) -> Result<Self, String> {
        if page_size == 0 {
            return Err("page size must be greater than zero".into());
        }
        if page_index == 0 {
            return Err("page index starts at 1".into());
        }
        Ok(Self {
            page_index,
            page_size,
        })
    }

    pub fn page_index(&self) -> u64 {
        self.page_index
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Сколько записей пропустить до начала страницы
    pub fn offset(&self) -> u64 {
        (self.page_index - 1).saturating_mul(self.page_size)
    }
}

/// Страница результата вместе с метаданными пагинации
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagedList<T> {
    pub page_index: u64,
    pub page_size: u64,
    pub total_count: u64,
    pub total_pages: u64,
    pub has_previous_page: bool,
    pub has_next_page: bool,
    pub items: Vec<T>,
}

impl<T> PagedList<T> {
    /// Номер страницы не ограничивается: страница за пределами total_pages
    /// даёт пустой список и has_next_page = false, а не ошибку.
    pub fn compute(total_count: u64, request: PageRequest, items: Vec<T>) -> Self {
        let total_pages = (total_count as f64 / request.page_size as f64).ceil() as u64;
        Self {
            page_index: request.page_index,
            page_size: request.page_size,
            total_count,
            total_pages,
            has_previous_page: request.page_index > 1,
            has_next_page: request.page_index < total_pages,
            items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_rejects_zero() {
        assert!(PageRequest::new(1, 0).is_err());
        assert!(PageRequest::new(0, 10).is_err());
        assert_eq!(PageRequest::new(3, 10).unwrap().offset(), 20);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let page = PagedList::compute(21, PageRequest::new(1, 10).unwrap(), vec![0; 10]);
        assert_eq!(page.total_pages, 3);
        assert!(!page.has_previous_page);
        assert!(page.has_next_page);
    }

    #[test]
    fn test_last_page_has_no_next() {
        let page = PagedList::compute(20, PageRequest::new(2, 10).unwrap(), vec![0; 10]);
        assert_eq!(page.total_pages, 2);
        assert!(page.has_previous_page);
        assert!(!page.has_next_page);
    }

    #[test]
    fn test_page_beyond_range_is_empty_not_error() {
        let page: PagedList<i32> =
            PagedList::compute(5, PageRequest::new(9, 10).unwrap(), Vec::new());
        assert_eq!(page.total_pages, 1);
        assert!(!page.has_next_page);
        assert!(page.has_previous_page);
        assert!(page.items.is_empty());
    }

    #[test]
    fn test_empty_store_has_zero_pages() {
        let page: PagedList<i32> =
            PagedList::compute(0, PageRequest::new(1, 10).unwrap(), Vec::new());
        assert_eq!(page.total_pages, 0);
        assert!(!page.has_next_page);
    }
}
