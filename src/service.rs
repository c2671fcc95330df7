// Kind-erased operations shared by the screens and the CLI

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::api::ApiClient;
use crate::export::{ExportFormat, write_export};
use crate::forms::{FormValues, ValidationErrors};
use crate::listing::ListQuery;
use crate::models::{Attachment, LocalFile, Lookups, StoredFile};
use crate::records::{CellValue, Column, Record, RecordKind, columns_of, with_record};

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub id: Option<u64>,
    pub cells: Vec<CellValue>,
}

/// One page of a table, ready to render
#[derive(Debug, Clone, PartialEq)]
pub struct TablePage {
    pub kind: RecordKind,
    pub columns: &'static [Column],
    pub rows: Vec<TableRow>,
    pub total: u64,
    pub page: u32,
    pub page_count: u32,
}

impl TablePage {
    pub fn empty(kind: RecordKind) -> Self {
        Self {
            kind,
            columns: columns_of(kind),
            rows: Vec::new(),
            total: 0,
            page: 1,
            page_count: 1,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.page_count
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Saved { id: Option<u64> },
    /// Nothing was sent; the form needs fixing first
    Invalid(ValidationErrors),
}

pub async fn load_page(
    api: &ApiClient,
    kind: RecordKind,
    query: &ListQuery,
    lookups: &Lookups,
) -> Result<TablePage> {
    with_record!(kind, R => load_page_of::<R>(api, query, lookups).await)
}

async fn load_page_of<R: Record>(
    api: &ApiClient,
    query: &ListQuery,
    lookups: &Lookups,
) -> Result<TablePage> {
    let page = api
        .list::<R>(query)
        .await
        .with_context(|| format!("Failed to load {}", R::KIND.title()))?;

    let page_count = page.page_count();
    let rows = page
        .data
        .iter()
        .map(|record| TableRow {
            id: record.id(),
            cells: record.row(lookups),
        })
        .collect();

    debug!(kind = %R::KIND, page = page.page, total = page.total, "page loaded");
    Ok(TablePage {
        kind: R::KIND,
        columns: R::columns(),
        rows,
        total: page.total,
        page: page.page,
        page_count,
    })
}

/// Form values of an existing record, freshly fetched.
pub async fn load_form(api: &ApiClient, kind: RecordKind, id: u64) -> Result<FormValues> {
    with_record!(kind, R => {
        let record = api
            .get::<R>(id)
            .await
            .with_context(|| format!("Failed to load {} #{id}", kind.title()))?;
        let mut values = record.to_form();
        R::derive(&mut values);
        Ok(values)
    })
}

/// Defaults for a new record of `kind`.
pub fn new_form(kind: RecordKind) -> FormValues {
    with_record!(kind, R => {
        let mut values = R::blank_form();
        R::derive(&mut values);
        values
    })
}

pub fn derive(kind: RecordKind, values: &mut FormValues) {
    with_record!(kind, R => R::derive(values))
}

/// Validate, upload pending attachments, then create or update.
pub async fn save(
    api: &ApiClient,
    kind: RecordKind,
    id: Option<u64>,
    values: &FormValues,
) -> Result<SaveOutcome> {
    with_record!(kind, R => save_record::<R>(api, id, values).await)
}

async fn save_record<R: Record>(
    api: &ApiClient,
    id: Option<u64>,
    values: &FormValues,
) -> Result<SaveOutcome> {
    let mut record = match R::from_form(values) {
        Ok(record) => record,
        Err(errors) => {
            debug!(kind = %R::KIND, errors = errors.len(), "form rejected");
            return Ok(SaveOutcome::Invalid(errors));
        }
    };

    upload_pending(api, record.attachments_mut()).await?;

    let saved = match id {
        Some(id) => {
            record.set_id(Some(id));
            api.update(id, &record)
                .await
                .with_context(|| format!("Failed to update {} #{id}", R::KIND.title()))?
        }
        None => api
            .create(&record)
            .await
            .with_context(|| format!("Failed to create {}", R::KIND.title()))?,
    };

    Ok(SaveOutcome::Saved { id: saved.id() })
}

fn pending_files(attachments: &[Attachment]) -> Vec<(usize, LocalFile)> {
    attachments
        .iter()
        .enumerate()
        .filter_map(|(i, attachment)| match attachment {
            Attachment::Local(file) => Some((i, file.clone())),
            Attachment::Stored(_) => None,
        })
        .collect()
}

/// Replace the pending entries at `indices` with their server descriptors.
fn apply_uploads(attachments: &mut [Attachment], indices: &[usize], stored: Vec<StoredFile>) {
    for (i, file) in indices.iter().zip(stored) {
        if let Some(slot) = attachments.get_mut(*i) {
            *slot = Attachment::Stored(file);
        }
    }
}

async fn upload_pending(api: &ApiClient, attachments: &mut [Attachment]) -> Result<()> {
    let pending = pending_files(attachments);
    if pending.is_empty() {
        return Ok(());
    }

    let (indices, files): (Vec<usize>, Vec<LocalFile>) = pending.into_iter().unzip();
    let stored = api
        .upload(&files)
        .await
        .context("Failed to upload attachments")?;
    apply_uploads(attachments, &indices, stored);
    Ok(())
}

pub async fn delete(api: &ApiClient, kind: RecordKind, id: u64) -> Result<()> {
    api.delete(kind, id)
        .await
        .with_context(|| format!("Failed to delete {} #{id}", kind.title()))
}

/// Export every record matching `query` (all pages) and return the file path.
pub async fn export(
    api: &ApiClient,
    kind: RecordKind,
    query: &ListQuery,
    lookups: &Lookups,
    format: ExportFormat,
    dir: PathBuf,
) -> Result<PathBuf> {
    let rows = with_record!(kind, R => {
        let records = api
            .fetch_all::<R>(query)
            .await
            .with_context(|| format!("Failed to fetch {} for export", kind.title()))?;
        records.iter().map(|r| r.row(lookups)).collect::<Vec<_>>()
    });

    let path = tokio::task::spawn_blocking(move || write_export(kind, &rows, format, &dir))
        .await
        .context("Export task failed")??;
    info!(%kind, path = %path.display(), "exported");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::today;

    fn offline_client() -> ApiClient {
        let config = Config::from_pairs([("API_URL".to_string(), "http://127.0.0.1:9".to_string())])
            .unwrap();
        ApiClient::new(&config).unwrap()
    }

    fn local(name: &str) -> Attachment {
        Attachment::Local(LocalFile {
            path: PathBuf::from(name),
            file_name: name.to_string(),
            size: 100,
        })
    }

    fn stored(name: &str) -> StoredFile {
        StoredFile {
            file_name: name.to_string(),
            file_path: format!("/uploads/{name}"),
        }
    }

    #[test]
    fn new_forms_start_from_today() {
        let values = new_form(RecordKind::GeneralBill);
        assert_eq!(values.date("billDate"), Some(today()));

        let values = new_form(RecordKind::LabourExpenseReport);
        assert_eq!(values.get("twoYearTotalCost"), "0.00");
    }

    #[test]
    fn derive_dispatches_by_kind() {
        let mut values = new_form(RecordKind::GeneralBill);
        values.set("amount", "100");
        values.set("vatAmount", "5");
        derive(RecordKind::GeneralBill, &mut values);
        assert_eq!(values.get("totalAmount"), "105.00");
    }

    #[tokio::test]
    async fn invalid_form_is_not_sent() {
        let api = offline_client();
        let values = FormValues::default();
        let outcome = save(&api, RecordKind::VehicleBill, None, &values).await.unwrap();
        match outcome {
            SaveOutcome::Invalid(errors) => assert!(errors.for_field("amount").is_some()),
            SaveOutcome::Saved { .. } => panic!("invalid form was saved"),
        }
    }

    #[test]
    fn uploads_replace_pending_entries_in_place() {
        let mut attachments = vec![
            local("a.pdf"),
            Attachment::Stored(stored("old.png")),
            local("b.jpg"),
        ];
        let pending = pending_files(&attachments);
        let indices: Vec<usize> = pending.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![0, 2]);

        apply_uploads(&mut attachments, &indices, vec![stored("a.pdf"), stored("b.jpg")]);
        assert!(attachments.iter().all(Attachment::is_uploaded));
        assert_eq!(attachments[2].file_name(), "b.jpg");
        assert_eq!(attachments[1].file_name(), "old.png");
    }

    #[test]
    fn empty_table_page_has_one_page() {
        let page = TablePage::empty(RecordKind::PayrollReport);
        assert_eq!(page.page_count, 1);
        assert!(!page.has_next());
        assert_eq!(page.columns.len(), columns_of(RecordKind::PayrollReport).len());
    }
}
