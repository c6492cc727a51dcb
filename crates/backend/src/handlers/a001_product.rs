use std::time::Duration;

use axum::{
    extract::{Multipart, Path, Query},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use contracts::domain::a001_product::{
    ImportOutcome, Product, ProductDraft, ProductFilter, ProductId, ProductUpdate,
};
use contracts::domain::common::AggregateId;
use contracts::shared::paging::{PageRequest, PagedList};
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::domain::a001_product::{service, ProductError};
use crate::shared::config;
use crate::shared::tabular::FormatTag;

impl IntoResponse for ProductError {
    fn into_response(self) -> Response {
        let status = match &self {
            ProductError::NotFound(_) => StatusCode::NOT_FOUND,
            ProductError::Validation(_) | ProductError::Format(_) => StatusCode::BAD_REQUEST,
            ProductError::Store(e) => {
                tracing::error!("Product store error: {:#}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Параметры списка и выгрузки: страница, поля фильтра, формат файла.
/// serde_urlencoded не поддерживает flatten, поэтому поля перечислены явно.
#[derive(Debug, Default, Deserialize)]
pub struct ProductListParams {
    pub format: Option<String>,
    pub file_name: Option<String>,
    pub page_index: Option<u64>,
    pub page_size: Option<u64>,
    pub name: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_stock: Option<i32>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub include_deleted: Option<bool>,
}

impl ProductListParams {
    fn filter(&self) -> ProductFilter {
        ProductFilter {
            name: self.name.clone(),
            min_price: self.min_price,
            max_price: self.max_price,
            min_stock: self.min_stock,
            start_date: self.start_date,
            end_date: self.end_date,
            include_deleted: self.include_deleted.unwrap_or(false),
        }
    }

    fn page(&self, default_size: u64) -> Result<PageRequest, ProductError> {
        PageRequest::new(
            self.page_index.unwrap_or(1),
            self.page_size.unwrap_or(default_size),
        )
        .map_err(ProductError::Validation)
    }
}

#[derive(Debug, Deserialize)]
pub struct ImportParams {
    pub has_header: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct LookupParams {
    pub id: ProductId,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub ids: Vec<ProductId>,
    pub deleted_by: Option<String>,
}

fn parse_id(id: &str) -> Result<ProductId, ProductError> {
    <ProductId as AggregateId>::from_string(id)
        .map_err(|_| ProductError::Validation(format!("invalid product id '{}'", id)))
}

/// GET /api/a001/product
pub async fn list_paginated(
    Query(params): Query<ProductListParams>,
) -> Result<Json<PagedList<Product>>, ProductError> {
    let page = params.page(config::get().export.default_page_size)?;
    let list = service::list_paginated(&service::store(), &params.filter(), page).await?;
    Ok(Json(list))
}

/// POST /api/a001/product
pub async fn create(
    Json(draft): Json<ProductDraft>,
) -> Result<(StatusCode, Json<Product>), ProductError> {
    let product = service::create(&service::store(), draft).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// GET /api/a001/product/:id
pub async fn get_by_id(Path(id): Path<String>) -> Result<Json<Product>, ProductError> {
    let id = parse_id(&id)?;
    Ok(Json(service::get_by_id(&service::store(), id).await?))
}

/// PUT /api/a001/product/:id
pub async fn update(
    Path(id): Path<String>,
    Json(draft): Json<ProductDraft>,
) -> Result<Json<Product>, ProductError> {
    let id = parse_id(&id)?;
    Ok(Json(service::update(&service::store(), id, draft).await?))
}

/// DELETE /api/a001/product/:id
pub async fn delete(Path(id): Path<String>) -> Result<StatusCode, ProductError> {
    let id = parse_id(&id)?;
    service::delete(&service::store(), id, None).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/a001/product/:id/hard
pub async fn delete_permanently(Path(id): Path<String>) -> Result<StatusCode, ProductError> {
    let id = parse_id(&id)?;
    service::delete_permanently(&service::store(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/a001/product/lookup?id=..&name=..
pub async fn lookup(Query(params): Query<LookupParams>) -> Result<Json<Product>, ProductError> {
    let product =
        service::find_by_id_and_name(&service::store(), params.id, &params.name).await?;
    Ok(Json(product))
}

/// POST /api/a001/product/bulk-insert
pub async fn bulk_insert(
    Json(drafts): Json<Vec<ProductDraft>>,
) -> Result<Json<serde_json::Value>, ProductError> {
    let inserted = service::bulk_insert(&service::store(), drafts).await?;
    Ok(Json(json!({ "inserted": inserted })))
}

/// POST /api/a001/product/bulk-update
pub async fn bulk_update(
    Json(updates): Json<Vec<ProductUpdate>>,
) -> Result<Json<serde_json::Value>, ProductError> {
    let updated = service::bulk_update(&service::store(), updates).await?;
    Ok(Json(json!({ "updated": updated })))
}

/// POST /api/a001/product/bulk-delete
pub async fn bulk_delete(
    Json(request): Json<BulkDeleteRequest>,
) -> Result<Json<serde_json::Value>, ProductError> {
    let deleted = service::bulk_delete(
        &service::store(),
        &request.ids,
        request.deleted_by.as_deref(),
    )
    .await?;
    Ok(Json(json!({ "deleted": deleted })))
}

/// POST /api/a001/product/import
///
/// Файл в поле `file`; формат определяется по расширению. По истечении
/// `import.timeout_secs` импорт останавливается и возвращает частичный итог.
pub async fn import(
    Query(params): Query<ImportParams>,
    mut multipart: Multipart,
) -> Result<Json<ImportOutcome>, ProductError> {
    let settings = &config::get().import;
    let has_header = params.has_header.unwrap_or(settings.has_header);

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ProductError::Validation(format!("invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let format = FormatTag::from_file_name(&file_name)?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ProductError::Validation(format!("cannot read uploaded file: {}", e)))?;

        if bytes.is_empty() {
            return Err(ProductError::Validation("uploaded file is empty".into()));
        }
        if bytes.len() > settings.max_file_size_bytes() {
            return Err(ProductError::Validation(format!(
                "file exceeds the maximum size of {} MB",
                settings.max_file_size_mb
            )));
        }

        tracing::info!(
            "Import request: file '{}' ({} bytes), has_header={}",
            file_name,
            bytes.len(),
            has_header
        );

        let cancel = CancellationToken::new();
        let deadline = cancel.clone();
        let timeout = Duration::from_secs(settings.timeout_secs);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            deadline.cancel();
        });

        let result = service::import_products(
            &service::store(),
            bytes.to_vec(),
            format,
            has_header,
            &cancel,
        )
        .await;
        timer.abort();

        return Ok(Json(result?));
    }

    Err(ProductError::Validation(
        "multipart field 'file' is missing".into(),
    ))
}

/// GET /api/a001/product/export
pub async fn export(
    Query(params): Query<ProductListParams>,
) -> Result<impl IntoResponse, ProductError> {
    let settings = &config::get().export;
    let format: FormatTag = params
        .format
        .as_deref()
        .unwrap_or(&settings.default_format)
        .parse()?;
    let page = params.page(settings.default_page_size)?;

    let file = service::export_products(
        &service::store(),
        &params.filter(),
        page,
        format,
        params.file_name.as_deref(),
    )
    .await?;

    let disposition = format!("attachment; filename=\"{}\"", file.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.content.into_inner(),
    ))
}
