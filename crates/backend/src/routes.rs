use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

use crate::handlers;
use crate::shared::config;

/// Запас на служебные части multipart сверх размера самого файла
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Конфигурация всех роутов приложения
pub fn configure_routes() -> Router {
    let upload_limit = config::get().import.max_file_size_bytes() + MULTIPART_OVERHEAD;

    Router::new()
        .route("/health", get(|| async { "ok" }))
        // ========================================
        // A001 Product
        // ========================================
        .route(
            "/api/a001/product",
            get(handlers::a001_product::list_paginated).post(handlers::a001_product::create),
        )
        .route(
            "/api/a001/product/bulk-insert",
            post(handlers::a001_product::bulk_insert),
        )
        .route(
            "/api/a001/product/bulk-update",
            post(handlers::a001_product::bulk_update),
        )
        .route(
            "/api/a001/product/bulk-delete",
            post(handlers::a001_product::bulk_delete),
        )
        .route(
            "/api/a001/product/import",
            post(handlers::a001_product::import).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/api/a001/product/export",
            get(handlers::a001_product::export),
        )
        .route(
            "/api/a001/product/lookup",
            get(handlers::a001_product::lookup),
        )
        .route(
            "/api/a001/product/:id/hard",
            delete(handlers::a001_product::delete_permanently),
        )
        .route(
            "/api/a001/product/:id",
            get(handlers::a001_product::get_by_id)
                .put(handlers::a001_product::update)
                .delete(handlers::a001_product::delete),
        )
}
