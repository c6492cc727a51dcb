use contracts::domain::a001_product::ProductId;
use thiserror::Error;

use crate::shared::tabular::TabularError;

#[derive(Debug, Error)]
pub enum ProductError {
    #[error("Product {0} not found")]
    NotFound(ProductId),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Format(#[from] TabularError),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub type ProductResult<T> = Result<T, ProductError>;
