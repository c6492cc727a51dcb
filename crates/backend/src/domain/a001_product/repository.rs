use async_trait::async_trait;
use chrono::Utc;
use contracts::domain::a001_product::{Product, ProductDraft, ProductField, ProductId};
use contracts::domain::common::EntityMetadata;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveValue::NotSet, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};

use super::filter::{search_key, ProductPredicate};

/// Строк в одном INSERT при пакетной вставке
const INSERT_CHUNK: usize = 200;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a001_product")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    /// Наименование в нижнем регистре для поиска по фрагменту
    pub name_key: String,
    pub description: Option<String>,
    pub price: f64,
    pub stock: i32,
    pub is_deleted: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Product {
    fn from(m: Model) -> Self {
        Product {
            id: m.id,
            name: m.name,
            description: m.description,
            price: m.price,
            stock: m.stock,
            metadata: EntityMetadata {
                created_at: m.created_at,
                updated_at: m.updated_at,
                is_deleted: m.is_deleted,
            },
        }
    }
}

fn new_active_model(draft: &ProductDraft) -> ActiveModel {
    let metadata = EntityMetadata::new();
    ActiveModel {
        id: NotSet,
        name: Set(draft.name.clone()),
        name_key: Set(search_key(&draft.name)),
        description: Set(draft.description.clone()),
        price: Set(draft.price),
        stock: Set(draft.stock),
        is_deleted: Set(false),
        created_at: Set(metadata.created_at),
        updated_at: Set(metadata.updated_at),
    }
}

/// Хранилище товаров.
///
/// Каждая операция выполняется отдельно; общей транзакции между вызовами нет.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Вставка одной записи, возвращает её с назначенным id
    async fn add(&self, draft: &ProductDraft) -> anyhow::Result<Product>;

    /// Полная замена данных записи по id
    async fn replace(&self, product: &Product) -> anyhow::Result<()>;

    /// Чтение по id, включая помеченные на удаление
    async fn get_by_id(&self, id: ProductId) -> anyhow::Result<Option<Product>>;

    async fn get_by_ids(&self, ids: &[ProductId]) -> anyhow::Result<Vec<Product>>;

    /// Запись с данным id и точно таким наименованием
    async fn find_by_id_and_name(
        &self,
        id: ProductId,
        name: &str,
    ) -> anyhow::Result<Option<Product>>;

    /// Пакетная вставка, возвращает число записанных строк
    async fn insert_many(&self, drafts: &[ProductDraft]) -> anyhow::Result<u64>;

    /// Обновляет только перечисленные поля и updated_at
    async fn patch(&self, id: ProductId, fields: &[ProductField]) -> anyhow::Result<u64>;

    /// Пометка на удаление одним запросом
    async fn set_deleted(&self, ids: &[ProductId]) -> anyhow::Result<u64>;

    /// Физическое удаление строки, возвращает число удалённых
    async fn delete_hard(&self, id: ProductId) -> anyhow::Result<u64>;

    async fn count(&self, predicate: &ProductPredicate) -> anyhow::Result<u64>;

    /// Страница в порядке id
    async fn find_page(
        &self,
        predicate: &ProductPredicate,
        offset: u64,
        limit: u64,
    ) -> anyhow::Result<Vec<Product>>;
}

#[derive(Clone)]
pub struct SeaOrmProductStore {
    db: DatabaseConnection,
}

impl SeaOrmProductStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProductStore for SeaOrmProductStore {
    async fn add(&self, draft: &ProductDraft) -> anyhow::Result<Product> {
        let model = new_active_model(draft).insert(&self.db).await?;
        Ok(model.into())
    }

    async fn replace(&self, product: &Product) -> anyhow::Result<()> {
        let active = ActiveModel {
            id: Set(product.id),
            name: Set(product.name.clone()),
            name_key: Set(search_key(&product.name)),
            description: Set(product.description.clone()),
            price: Set(product.price),
            stock: Set(product.stock),
            is_deleted: Set(product.metadata.is_deleted),
            updated_at: Set(product.metadata.updated_at),
            created_at: NotSet,
        };
        active.update(&self.db).await?;
        Ok(())
    }

    async fn get_by_id(&self, id: ProductId) -> anyhow::Result<Option<Product>> {
        let result = Entity::find_by_id(id).one(&self.db).await?;
        Ok(result.map(Into::into))
    }

    async fn get_by_ids(&self, ids: &[ProductId]) -> anyhow::Result<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let items = Entity::find()
            .filter(Column::Id.is_in(ids.iter().copied()))
            .all(&self.db)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();
        Ok(items)
    }

    async fn find_by_id_and_name(
        &self,
        id: ProductId,
        name: &str,
    ) -> anyhow::Result<Option<Product>> {
        let result = Entity::find()
            .filter(Column::Id.eq(id))
            .filter(Column::Name.eq(name))
            .one(&self.db)
            .await?;
        Ok(result.map(Into::into))
    }

    async fn insert_many(&self, drafts: &[ProductDraft]) -> anyhow::Result<u64> {
        if drafts.is_empty() {
            return Ok(0);
        }

        let txn = self.db.begin().await?;
        for chunk in drafts.chunks(INSERT_CHUNK) {
            Entity::insert_many(chunk.iter().map(new_active_model))
                .exec(&txn)
                .await?;
        }
        txn.commit().await?;

        Ok(drafts.len() as u64)
    }

    async fn patch(&self, id: ProductId, fields: &[ProductField]) -> anyhow::Result<u64> {
        let mut update = Entity::update_many()
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::Id.eq(id));

        for field in fields {
            update = match field {
                ProductField::Name(v) => update
                    .col_expr(Column::Name, Expr::value(v.clone()))
                    .col_expr(Column::NameKey, Expr::value(search_key(v))),
                ProductField::Description(v) => {
                    update.col_expr(Column::Description, Expr::value(v.clone()))
                }
                ProductField::Price(v) => update.col_expr(Column::Price, Expr::value(*v)),
                ProductField::Stock(v) => update.col_expr(Column::Stock, Expr::value(*v)),
            };
        }

        let result = update.exec(&self.db).await?;
        Ok(result.rows_affected)
    }

    async fn set_deleted(&self, ids: &[ProductId]) -> anyhow::Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = Entity::update_many()
            .col_expr(Column::IsDeleted, Expr::value(true))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::Id.is_in(ids.iter().copied()))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    async fn delete_hard(&self, id: ProductId) -> anyhow::Result<u64> {
        let result = Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected)
    }

    async fn count(&self, predicate: &ProductPredicate) -> anyhow::Result<u64> {
        let total = Entity::find()
            .filter(predicate.to_condition())
            .count(&self.db)
            .await?;
        Ok(total)
    }

    async fn find_page(
        &self,
        predicate: &ProductPredicate,
        offset: u64,
        limit: u64,
    ) -> anyhow::Result<Vec<Product>> {
        let items = Entity::find()
            .filter(predicate.to_condition())
            .order_by_asc(Column::Id)
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();
        Ok(items)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::shared::data::db::connect_in_memory;

    pub async fn memory_store() -> SeaOrmProductStore {
        SeaOrmProductStore::new(connect_in_memory().await.unwrap())
    }

    pub fn draft(name: &str, price: f64, stock: i32) -> ProductDraft {
        ProductDraft {
            name: name.to_string(),
            description: None,
            price,
            stock,
        }
    }
}
