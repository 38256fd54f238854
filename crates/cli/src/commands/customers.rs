//! Customer CSV commands.
//!
//! Same rules as the import and export pages: the file is Shift_JIS and
//! nothing is written when any row has an error.

use std::path::Path;

use thiserror::Error;

use tradedesk_admin::db::CustomerRepository;
use tradedesk_admin::models::ImportOutcome;
use tradedesk_core::customer_csv::{self, CsvError};

use super::{CommandError, connect, find_store};

/// Errors raised by the CSV commands.
#[derive(Debug, Error)]
pub enum CsvCommandError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("could not access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("import rejected with {0} error(s)")]
    Rejected(usize),

    #[error("export failed: {0}")]
    Export(#[from] CsvError),
}

impl CsvCommandError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Import a customer file into `store_name`.
pub async fn import(store_name: &str, file: &Path) -> Result<ImportOutcome, CsvCommandError> {
    let bytes = std::fs::read(file).map_err(|e| CsvCommandError::io(file, e))?;

    let pool = connect().await?;
    let store = find_store(&pool, store_name).await?;

    let report = customer_csv::import_customer_csv(&bytes, &store.name);
    for message in report.warning_messages() {
        tracing::warn!("{message}");
    }
    if !report.is_importable() {
        for message in report.error_messages() {
            tracing::error!("{message}");
        }
        return Err(CsvCommandError::Rejected(report.errors.len()));
    }

    let drafts: Vec<_> = report.records.into_iter().map(|r| r.customer).collect();
    let outcome = CustomerRepository::new(&pool, store.id)
        .upsert_many(&drafts)
        .await
        .map_err(CommandError::from)?;

    tracing::info!(
        store_id = %store.id,
        created = outcome.created,
        updated = outcome.updated,
        "Customers imported"
    );
    Ok(outcome)
}

/// Export every customer of `store_name` to `file`.
pub async fn export(store_name: &str, file: &Path) -> Result<(), CsvCommandError> {
    let pool = connect().await?;
    let store = find_store(&pool, store_name).await?;

    let customers = CustomerRepository::new(&pool, store.id)
        .list()
        .await
        .map_err(CommandError::from)?;
    let rows: Vec<_> = customers
        .iter()
        .map(|c| c.to_csv_row(&store.name))
        .collect();

    let exported = customer_csv::write_customer_csv(&rows)?;
    if exported.replaced {
        tracing::warn!("Some characters could not be written as Shift_JIS and were replaced");
    }
    std::fs::write(file, &exported.bytes).map_err(|e| CsvCommandError::io(file, e))?;

    tracing::info!(
        store_id = %store.id,
        customers = rows.len(),
        path = %file.display(),
        "Customers exported"
    );
    Ok(())
}
