use std::io::Cursor;
use std::time::Instant;

use chrono::Utc;
use contracts::domain::a001_product::ProductFilter;
use contracts::shared::paging::PageRequest;
use uuid::Uuid;

use super::error::ProductResult;
use super::filter::FilterPredicateBuilder;
use super::repository::ProductStore;
use crate::shared::tabular::{codec_for, FormatTag};

/// Готовый файл выгрузки
#[derive(Debug)]
pub struct ExportFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub content: Cursor<Vec<u8>>,
}

/// Выгружает одну страницу отфильтрованных товаров в заданном формате
pub async fn export_page<S: ProductStore>(
    store: &S,
    filter: &ProductFilter,
    page: PageRequest,
    format: FormatTag,
    file_name: Option<&str>,
) -> ProductResult<ExportFile> {
    let run_id = Uuid::new_v4();
    let started = Instant::now();

    let predicate = FilterPredicateBuilder::build(filter);
    let products = store
        .find_page(&predicate, page.offset(), page.page_size())
        .await?;

    let content = codec_for(format, None).encode(&products)?;
    let file_name = export_file_name(file_name, format);

    tracing::info!(
        "Export {} finished in {} ms: {} products, page {} (size {}), file {}",
        run_id,
        started.elapsed().as_millis(),
        products.len(),
        page.page_index(),
        page.page_size(),
        file_name
    );

    Ok(ExportFile {
        file_name,
        content_type: format.content_type(),
        content,
    })
}

/// Имя файла для Content-Disposition: только ASCII-буквы, цифры и `-_.`,
/// с расширением формата на конце
pub fn export_file_name(requested: Option<&str>, format: FormatTag) -> String {
    let sanitized: String = requested
        .unwrap_or_default()
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let sanitized = sanitized.trim_matches('.');

    let base = if sanitized.trim_matches('_').is_empty() {
        format!("products_{}", Utc::now().format("%Y%m%d_%H%M%S"))
    } else {
        sanitized.to_string()
    };

    let extension = format!(".{}", format.extension());
    if base.to_lowercase().ends_with(&extension) {
        base
    } else {
        format!("{}{}", base, extension)
    }
}
