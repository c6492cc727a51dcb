use crate::domain::common::{EntityMetadata, Patchable};
use serde::{Deserialize, Serialize};

/// Идентификатор товара назначается хранилищем и после создания не меняется
pub type ProductId = i64;

// ============================================================================
// Aggregate
// ============================================================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,

    pub name: String,

    pub description: Option<String>,

    pub price: f64,

    pub stock: i32,

    #[serde(flatten)]
    pub metadata: EntityMetadata,
}

impl Product {
    pub fn is_deleted(&self) -> bool {
        self.metadata.is_deleted
    }

    /// Полная замена данных (id и дата создания сохраняются)
    pub fn apply(&mut self, draft: ProductDraft) {
        self.name = draft.name;
        self.description = draft.description;
        self.price = draft.price;
        self.stock = draft.stock;
        self.metadata.touch();
    }
}

// ============================================================================
// Draft: запись без id (создание, импорт)
// ============================================================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProductDraft {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    pub price: f64,

    #[serde(default)]
    pub stock: i32,
}

impl ProductDraft {
    /// Убирает пробелы по краям; пустое описание превращается в None
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        self
    }
}

// ============================================================================
// Update: запрос группового обновления
// ============================================================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub id: ProductId,

    #[serde(flatten)]
    pub draft: ProductDraft,
}

/// Изменяемое поле товара с новым значением.
/// Варианта для id нет: идентификатор через patch не меняется.
#[derive(Debug, Clone, PartialEq)]
pub enum ProductField {
    Name(String),
    Description(Option<String>),
    Price(f64),
    Stock(i32),
}

impl Patchable for ProductUpdate {
    type Id = ProductId;
    type Snapshot = Product;
    type Field = ProductField;

    fn key(&self) -> ProductId {
        self.id
    }

    fn changed_fields(&self, snapshot: &Product) -> Vec<ProductField> {
        let mut fields = Vec::new();
        if self.draft.name != snapshot.name {
            fields.push(ProductField::Name(self.draft.name.clone()));
        }
        if self.draft.description != snapshot.description {
            fields.push(ProductField::Description(self.draft.description.clone()));
        }
        if self.draft.price != snapshot.price {
            fields.push(ProductField::Price(self.draft.price));
        }
        if self.draft.stock != snapshot.stock {
            fields.push(ProductField::Stock(self.draft.stock));
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> Product {
        Product {
            id: 7,
            name: "Lamp".into(),
            description: Some("Desk lamp".into()),
            price: 19.9,
            stock: 4,
            metadata: EntityMetadata::new(),
        }
    }

    fn snapshot_draft() -> ProductDraft {
        ProductDraft {
            name: "Lamp".into(),
            description: Some("Desk lamp".into()),
            price: 19.9,
            stock: 4,
        }
    }

    #[test]
    fn test_changed_fields_only_reports_differences() {
        let update = ProductUpdate {
            id: 7,
            draft: ProductDraft {
                name: "Lamp".into(),
                description: Some("Desk lamp".into()),
                price: 24.5,
                stock: 4,
            },
        };
        assert_eq!(
            update.changed_fields(&snapshot()),
            vec![ProductField::Price(24.5)]
        );
    }

    #[test]
    fn test_changed_fields_empty_when_identical() {
        let update = ProductUpdate {
            id: 7,
            draft: snapshot_draft(),
        };
        assert!(update.changed_fields(&snapshot()).is_empty());
    }

    #[test]
    fn test_clearing_description_is_a_change() {
        let mut draft = snapshot_draft();
        draft.description = None;
        let update = ProductUpdate { id: 7, draft };
        let fields = update.changed_fields(&snapshot());
        assert_eq!(fields, vec![ProductField::Description(None)]);
    }

    #[test]
    fn test_normalized_trims_and_drops_blank_description() {
        let draft = ProductDraft {
            name: "  Chair ".into(),
            description: Some("   ".into()),
            price: 10.0,
            stock: 1,
        }
        .normalized();
        assert_eq!(draft.name, "Chair");
        assert_eq!(draft.description, None);
    }

    #[test]
    fn test_update_deserializes_flat_json() {
        let json = r#"{"id": 3, "name": "Desk", "price": 120.0, "stock": 2}"#;
        let update: ProductUpdate = serde_json::from_str(json).unwrap();
        assert_eq!(update.id, 3);
        assert_eq!(update.draft.name, "Desk");
        assert_eq!(update.draft.description, None);
    }
}
