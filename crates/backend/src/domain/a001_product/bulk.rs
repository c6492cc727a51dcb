use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use contracts::domain::a001_product::{Product, ProductDraft, ProductId, ProductUpdate};
use contracts::domain::common::Patchable;

use super::error::{ProductError, ProductResult};
use super::excel_import::ImportSink;
use super::repository::ProductStore;
use super::validation::validate;

/// Пакетные изменения поверх хранилища.
///
/// Группы обновления применяются по очереди; ошибка в группе прерывает
/// операцию, уже применённые группы не откатываются.
pub struct BulkMutationEngine<'a, S> {
    store: &'a S,
}

impl<'a, S: ProductStore> BulkMutationEngine<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Одна запись; путь записи для импорта
    pub async fn insert_one(&self, draft: &ProductDraft) -> ProductResult<Product> {
        Ok(self.store.add(draft).await?)
    }

    pub async fn bulk_insert(&self, drafts: Vec<ProductDraft>) -> ProductResult<u64> {
        if drafts.is_empty() {
            return Ok(0);
        }

        let drafts: Vec<ProductDraft> = drafts.into_iter().map(ProductDraft::normalized).collect();
        for (index, draft) in drafts.iter().enumerate() {
            validate(Some(draft))
                .map_err(|reason| ProductError::Validation(format!("item {}: {}", index + 1, reason)))?;
        }

        let written = self.store.insert_many(&drafts).await?;
        tracing::info!("Bulk insert: {} products written", written);
        Ok(written)
    }

    /// Возвращает число различных id в запросе.
    ///
    /// Для повторяющегося id действует первое вхождение, остальные
    /// отбрасываются с предупреждением в лог.
    pub async fn bulk_update(&self, updates: Vec<ProductUpdate>) -> ProductResult<usize> {
        let mut seen = HashSet::new();
        let mut groups = Vec::new();
        for mut update in updates {
            if !seen.insert(update.key()) {
                tracing::warn!(
                    "Bulk update: duplicate entry for product {} ignored, first one wins",
                    update.key()
                );
                continue;
            }
            update.draft = update.draft.normalized();
            validate(Some(&update.draft)).map_err(|reason| {
                ProductError::Validation(format!("product {}: {}", update.key(), reason))
            })?;
            groups.push(update);
        }

        if groups.is_empty() {
            return Ok(0);
        }

        let ids: Vec<ProductId> = groups.iter().map(|g| g.key()).collect();
        let snapshots: HashMap<ProductId, Product> = self
            .store
            .get_by_ids(&ids)
            .await?
            .into_iter()
            .filter(|p| !p.is_deleted())
            .map(|p| (p.id, p))
            .collect();

        let mut patched = 0;
        for group in &groups {
            let snapshot = snapshots
                .get(&group.key())
                .ok_or(ProductError::NotFound(group.key()))?;

            let fields = group.changed_fields(snapshot);
            if fields.is_empty() {
                continue;
            }
            self.store.patch(group.key(), &fields).await?;
            patched += 1;
        }

        tracing::info!(
            "Bulk update: {} distinct products, {} changed",
            groups.len(),
            patched
        );
        Ok(groups.len())
    }

    /// Помечает записи на удаление; `actor` только пишется в лог
    pub async fn bulk_soft_delete(
        &self,
        ids: &[ProductId],
        actor: Option<&str>,
    ) -> ProductResult<u64> {
        let affected = self.store.set_deleted(ids).await?;
        tracing::info!(
            "Bulk soft delete: {} of {} requested products marked deleted by {}",
            affected,
            ids.len(),
            actor.unwrap_or("unknown")
        );
        Ok(affected)
    }
}

#[async_trait]
impl<'a, S: ProductStore> ImportSink for BulkMutationEngine<'a, S> {
    async fn persist(&self, draft: ProductDraft) -> anyhow::Result<()> {
        self.insert_one(&draft).await?;
        Ok(())
    }
}
