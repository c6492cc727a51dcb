use std::io::Read;
use std::time::Instant;

use async_trait::async_trait;
use contracts::domain::a001_product::{ImportOutcome, ProductDraft};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::error::ProductResult;
use super::validation::validate;
use crate::shared::tabular::{codec_for, FormatTag};

/// Каждые N строк в лог пишется прогресс
const PROGRESS_EVERY: usize = 100;

/// Куда импорт пишет прошедшие проверку записи
#[async_trait]
pub trait ImportSink: Send + Sync {
    async fn persist(&self, draft: ProductDraft) -> anyhow::Result<()>;
}

/// Импорт файла: строки читаются по одной, проверяются и пишутся в хранилище.
///
/// Ошибка в строке не прерывает импорт, а попадает в [`ImportOutcome`].
/// Прерывает только структурная ошибка: формат не открыт или вход не читается.
pub struct ImportPipeline {
    format: FormatTag,
    has_header: bool,
    sheet_name: Option<String>,
}

impl ImportPipeline {
    pub fn new(format: FormatTag) -> Self {
        Self {
            format,
            has_header: true,
            sheet_name: None,
        }
    }

    pub fn has_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    pub fn sheet_name(mut self, sheet_name: Option<String>) -> Self {
        self.sheet_name = sheet_name;
        self
    }

    pub async fn run<K: ImportSink>(
        &self,
        input: Box<dyn Read + Send>,
        sink: &K,
        cancel: &CancellationToken,
    ) -> ProductResult<ImportOutcome> {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        tracing::info!(
            "Import {} started: format={:?}, has_header={}",
            run_id,
            self.format,
            self.has_header
        );

        // книга Excel разбирается целиком, поэтому не на рабочем потоке tokio
        let codec = codec_for(self.format, self.sheet_name.clone());
        let has_header = self.has_header;
        let mut rows = tokio::task::spawn_blocking(move || codec.decode(input, has_header))
            .await
            .map_err(|e| anyhow::anyhow!("decode task failed: {}", e))??;
        let mut outcome = ImportOutcome::new();

        loop {
            // отмена проверяется только между строками
            if cancel.is_cancelled() {
                outcome.cancelled = true;
                tracing::warn!(
                    "Import {} cancelled after {} rows",
                    run_id,
                    outcome.total_processed
                );
                break;
            }

            let Some(next) = rows.next() else {
                break;
            };
            let position = outcome.begin_row();
            if position % PROGRESS_EVERY == 0 {
                tracing::info!("Import {}: {} rows processed", run_id, position);
            }

            let draft = match next.and_then(|row| row.to_draft()) {
                Ok(draft) => draft,
                Err(e) if e.is_row_level() => {
                    outcome.record_failure(position, e.to_string());
                    continue;
                }
                Err(e) => {
                    tracing::error!("Import {} aborted at row {}: {}", run_id, position, e);
                    return Err(e.into());
                }
            };

            if let Err(reason) = validate(draft.as_ref()) {
                outcome.record_failure(position, reason);
                continue;
            }
            let Some(draft) = draft else {
                continue;
            };

            match sink.persist(draft).await {
                Ok(()) => outcome.record_success(),
                Err(e) => outcome.record_failure(position, format!("processing error: {}", e)),
            }
        }

        tracing::info!(
            "Import {} finished in {} ms: total={}, success={}, errors={}",
            run_id,
            started.elapsed().as_millis(),
            outcome.total_processed,
            outcome.success_count,
            outcome.error_count()
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::a001_product::bulk::BulkMutationEngine;
    use crate::domain::a001_product::error::ProductError;
    use crate::domain::a001_product::filter::FilterPredicateBuilder;
    use crate::domain::a001_product::repository::test_support::memory_store;
    use crate::domain::a001_product::repository::ProductStore;
    use crate::shared::tabular::TabularError;
    use contracts::domain::a001_product::ProductFilter;
    use std::io::Cursor;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CollectingSink {
        drafts: Mutex<Vec<ProductDraft>>,
    }

    #[async_trait]
    impl ImportSink for CollectingSink {
        async fn persist(&self, draft: ProductDraft) -> anyhow::Result<()> {
            if draft.name == "Broken" {
                anyhow::bail!("constraint violated");
            }
            self.drafts.lock().unwrap().push(draft);
            Ok(())
        }
    }

    /// Отменяет импорт после заданного числа записей
    struct CancellingSink {
        after: usize,
        written: Mutex<usize>,
        cancel: CancellationToken,
    }

    #[async_trait]
    impl ImportSink for CancellingSink {
        async fn persist(&self, _draft: ProductDraft) -> anyhow::Result<()> {
            let mut written = self.written.lock().unwrap();
            *written += 1;
            if *written == self.after {
                self.cancel.cancel();
            }
            Ok(())
        }
    }

    fn csv(text: &str) -> Box<dyn Read + Send> {
        Box::new(Cursor::new(text.as_bytes().to_vec()))
    }

    #[tokio::test]
    async fn test_row_failure_does_not_stop_import() {
        let store = memory_store().await;
        let engine = BulkMutationEngine::new(&store);
        let input = csv(
            "ProductId,ProductName,Description,Price,Stock\n\
             ,Lamp,,10,1\n\
             ,,,20,2\n\
             ,Chair,,30,3\n",
        );

        let outcome = ImportPipeline::new(FormatTag::DelimitedText)
            .run(input, &engine, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.total_processed, 3);
        assert_eq!(outcome.success_count, 2);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].row, 2);
        assert_eq!(outcome.errors[0].message, "name is required.");
        assert!(!outcome.cancelled);

        let all = FilterPredicateBuilder::build(&ProductFilter::default());
        assert_eq!(store.count(&all).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_every_failure_kind_is_recorded_once() {
        let sink = CollectingSink::default();
        let input = csv(
            "1,Lamp,,10,1\n\
             2,\"Bad,,10,1\n\
             3,Desk,,cheap,1\n\
             4,Free,,0,1\n\
             5,Broken,,5,1\n\
             6\n\
             7,Chair,,12,1\n",
        );

        let outcome = ImportPipeline::new(FormatTag::DelimitedText)
            .has_header(false)
            .run(input, &sink, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.total_processed, 7);
        assert_eq!(outcome.success_count, 2);
        let rows: Vec<usize> = outcome.errors.iter().map(|e| e.row).collect();
        assert_eq!(rows, [2, 3, 4, 5, 6]);
        assert_eq!(outcome.errors[1].message, "invalid price value 'cheap'");
        assert_eq!(outcome.errors[2].message, "price must be positive.");
        assert_eq!(
            outcome.errors[3].message,
            "processing error: constraint violated"
        );
        assert_eq!(outcome.errors[4].message, "record is empty.");
        assert_eq!(sink.drafts.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_cancellation_stops_between_rows() {
        let text: String = (1..=10).map(|i| format!(",Item {},,{},1\n", i, i)).collect();
        let cancel = CancellationToken::new();
        let sink = CancellingSink {
            after: 5,
            written: Mutex::new(0),
            cancel: cancel.clone(),
        };

        let outcome = ImportPipeline::new(FormatTag::DelimitedText)
            .has_header(false)
            .run(csv(&text), &sink, &cancel)
            .await
            .unwrap();

        assert!(outcome.total_processed <= 5);
        assert_eq!(outcome.success_count, 5);
        assert!(outcome.cancelled);
        assert!(outcome.errors.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_before_start_reads_nothing() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let sink = CollectingSink::default();

        let outcome = ImportPipeline::new(FormatTag::DelimitedText)
            .run(csv(",Lamp,,10,1\n"), &sink, &cancel)
            .await
            .unwrap();
        assert_eq!(outcome.total_processed, 0);
        assert!(outcome.cancelled);
    }

    #[tokio::test]
    async fn test_unreadable_workbook_is_structural() {
        let sink = CollectingSink::default();
        let err = ImportPipeline::new(FormatTag::Spreadsheet)
            .run(csv("not a workbook"), &sink, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProductError::Format(TabularError::Unreadable(_))
        ));
    }

    #[tokio::test]
    async fn test_progress_is_reported_for_large_files() {
        let text: String = (1..=250).map(|i| format!(",Item {},,{},1\n", i, i)).collect();
        let sink = CollectingSink::default();
        let outcome = ImportPipeline::new(FormatTag::DelimitedText)
            .has_header(false)
            .run(csv(&text), &sink, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.total_processed, 250);
        assert_eq!(outcome.success_count, 250);
    }

    #[tokio::test]
    async fn test_failed_row_on_progress_boundary_still_counts() {
        let text: String = (1..=200)
            .map(|i| {
                if i % PROGRESS_EVERY == 0 {
                    format!(",Item {},,free,1\n", i)
                } else {
                    format!(",Item {},,{},1\n", i, i)
                }
            })
            .collect();
        let sink = CollectingSink::default();
        let outcome = ImportPipeline::new(FormatTag::DelimitedText)
            .has_header(false)
            .run(csv(&text), &sink, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.total_processed, 200);
        let rows: Vec<usize> = outcome.errors.iter().map(|e| e.row).collect();
        assert_eq!(rows, [100, 200]);
    }

    #[tokio::test]
    async fn test_excel_import_end_to_end() {
        use rust_xlsxwriter::Workbook;

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, title) in ["ProductId", "ProductName", "Description", "Price", "Stock"]
            .iter()
            .enumerate()
        {
            sheet.write_string(0, col as u16, *title).unwrap();
        }
        sheet.write_string(1, 1, "Lamp").unwrap();
        sheet.write_string(1, 2, "Desk lamp").unwrap();
        sheet.write_number(1, 3, 19.5).unwrap();
        sheet.write_number(1, 4, 4).unwrap();
        sheet.write_string(2, 1, "Chair").unwrap();
        sheet.write_string(2, 3, "cheap").unwrap();
        sheet.write_number(2, 4, 1).unwrap();
        // строка 3 пустая и не считается
        sheet.write_string(4, 1, "Desk").unwrap();
        sheet.write_number(4, 3, 120).unwrap();
        sheet.write_number(4, 4, 2).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let sink = CollectingSink::default();
        let outcome = ImportPipeline::new(FormatTag::Spreadsheet)
            .run(Box::new(Cursor::new(bytes)), &sink, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.total_processed, 3);
        assert_eq!(outcome.success_count, 2);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].row, 2);
        assert_eq!(outcome.errors[0].message, "invalid price value 'cheap'");

        let drafts = sink.drafts.lock().unwrap();
        assert_eq!(drafts[0].name, "Lamp");
        assert_eq!(drafts[0].description.as_deref(), Some("Desk lamp"));
        assert_eq!((drafts[0].price, drafts[0].stock), (19.5, 4));
        assert_eq!((drafts[1].name.as_str(), drafts[1].price), ("Desk", 120.0));
    }

    #[tokio::test]
    async fn test_negative_stock_row_is_rejected_by_validator() {
        let sink = CollectingSink::default();
        let outcome = ImportPipeline::new(FormatTag::DelimitedText)
            .has_header(false)
            .run(csv(",Lamp,,10,-3\n,Chair,,10,0\n"), &sink, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.success_count, 1);
        assert_eq!(outcome.errors[0].row, 1);
        assert_eq!(outcome.errors[0].message, "stock must not be negative.");
    }
}
