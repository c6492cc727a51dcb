pub mod bulk;
pub mod error;
pub mod excel_export;
pub mod excel_import;
pub mod filter;
pub mod repository;
pub mod service;
pub mod validation;

pub use error::{ProductError, ProductResult};
