use std::io::Cursor;

use contracts::domain::a001_product::{
    ImportOutcome, Product, ProductDraft, ProductFilter, ProductId, ProductUpdate,
};
use contracts::shared::paging::{PageRequest, PagedList};
use tokio_util::sync::CancellationToken;

use super::bulk::BulkMutationEngine;
use super::error::{ProductError, ProductResult};
use super::excel_export::{self, ExportFile};
use super::excel_import::ImportPipeline;
use super::filter::FilterPredicateBuilder;
use super::repository::{ProductStore, SeaOrmProductStore};
use super::validation::validate;
use crate::shared::config;
use crate::shared::data::db::get_connection;
use crate::shared::tabular::FormatTag;

/// Хранилище поверх общего подключения к БД
pub fn store() -> SeaOrmProductStore {
    SeaOrmProductStore::new(get_connection().clone())
}

fn validated(draft: ProductDraft) -> ProductResult<ProductDraft> {
    let draft = draft.normalized();
    validate(Some(&draft)).map_err(ProductError::Validation)?;
    Ok(draft)
}

/// Товар по id; помеченный на удаление считается отсутствующим
async fn load_live<S: ProductStore>(store: &S, id: ProductId) -> ProductResult<Product> {
    store
        .get_by_id(id)
        .await?
        .filter(|p| !p.is_deleted())
        .ok_or(ProductError::NotFound(id))
}

pub async fn create<S: ProductStore>(store: &S, draft: ProductDraft) -> ProductResult<Product> {
    let draft = validated(draft)?;
    let product = BulkMutationEngine::new(store).insert_one(&draft).await?;
    tracing::info!("Product {} created", product.id);
    Ok(product)
}

pub async fn get_by_id<S: ProductStore>(store: &S, id: ProductId) -> ProductResult<Product> {
    load_live(store, id).await
}

/// Полная замена данных товара
pub async fn update<S: ProductStore>(
    store: &S,
    id: ProductId,
    draft: ProductDraft,
) -> ProductResult<Product> {
    let draft = validated(draft)?;
    let mut product = load_live(store, id).await?;
    product.apply(draft);
    store.replace(&product).await?;
    Ok(product)
}

pub async fn delete<S: ProductStore>(
    store: &S,
    id: ProductId,
    actor: Option<&str>,
) -> ProductResult<()> {
    load_live(store, id).await?;
    BulkMutationEngine::new(store)
        .bulk_soft_delete(&[id], actor)
        .await?;
    Ok(())
}

/// Физическое удаление, в том числе ранее помеченной записи
pub async fn delete_permanently<S: ProductStore>(store: &S, id: ProductId) -> ProductResult<()> {
    if store.delete_hard(id).await? == 0 {
        return Err(ProductError::NotFound(id));
    }
    tracing::info!("Product {} deleted permanently", id);
    Ok(())
}

/// Товар по id и наименованию; оба должны совпасть
pub async fn find_by_id_and_name<S: ProductStore>(
    store: &S,
    id: ProductId,
    name: &str,
) -> ProductResult<Product> {
    store
        .find_by_id_and_name(id, name.trim())
        .await?
        .filter(|p| !p.is_deleted())
        .ok_or(ProductError::NotFound(id))
}

pub async fn list_paginated<S: ProductStore>(
    store: &S,
    filter: &ProductFilter,
    page: PageRequest,
) -> ProductResult<PagedList<Product>> {
    let predicate = FilterPredicateBuilder::build(filter);
    let total = store.count(&predicate).await?;
    let items = store
        .find_page(&predicate, page.offset(), page.page_size())
        .await?;
    Ok(PagedList::compute(total, page, items))
}

pub async fn bulk_insert<S: ProductStore>(
    store: &S,
    drafts: Vec<ProductDraft>,
) -> ProductResult<u64> {
    BulkMutationEngine::new(store).bulk_insert(drafts).await
}

pub async fn bulk_update<S: ProductStore>(
    store: &S,
    updates: Vec<ProductUpdate>,
) -> ProductResult<usize> {
    BulkMutationEngine::new(store).bulk_update(updates).await
}

pub async fn bulk_delete<S: ProductStore>(
    store: &S,
    ids: &[ProductId],
    actor: Option<&str>,
) -> ProductResult<u64> {
    BulkMutationEngine::new(store)
        .bulk_soft_delete(ids, actor)
        .await
}

/// Импорт файла целиком из памяти. Лист Excel берётся из настроек.
pub async fn import_products<S: ProductStore>(
    store: &S,
    bytes: Vec<u8>,
    format: FormatTag,
    has_header: bool,
    cancel: &CancellationToken,
) -> ProductResult<ImportOutcome> {
    let engine = BulkMutationEngine::new(store);
    ImportPipeline::new(format)
        .has_header(has_header)
        .sheet_name(config::get().import.sheet_name.clone())
        .run(Box::new(Cursor::new(bytes)), &engine, cancel)
        .await
}

pub async fn export_products<S: ProductStore>(
    store: &S,
    filter: &ProductFilter,
    page: PageRequest,
    format: FormatTag,
    file_name: Option<&str>,
) -> ProductResult<ExportFile> {
    let max_page_size = config::get().export.max_page_size;
    if page.page_size() > max_page_size {
        return Err(ProductError::Validation(format!(
            "page size {} exceeds the maximum of {}",
            page.page_size(),
            max_page_size
        )));
    }
    excel_export::export_page(store, filter, page, format, file_name).await
}
