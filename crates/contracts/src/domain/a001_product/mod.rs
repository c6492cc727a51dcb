pub mod aggregate;
pub mod excel;
pub mod filter;

pub use aggregate::{Product, ProductDraft, ProductField, ProductId, ProductUpdate};
pub use excel::{ImportOutcome, RowFailure};
pub use filter::ProductFilter;
