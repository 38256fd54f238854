//! Shift_JIS CSV export.

use encoding_rs::SHIFT_JIS;
use serde::Serialize;

use super::HEADERS;

/// Errors raised while writing CSV output.
#[derive(thiserror::Error, Debug)]
pub enum CsvError {
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV output was not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Encoded CSV output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedCsv {
    /// Shift_JIS bytes with CRLF line endings.
    pub bytes: Vec<u8>,
    /// Whether some characters had no Shift_JIS mapping and were replaced
    /// with numeric character references.
    pub replaced: bool,
}

/// Write a header and rows as CRLF-terminated CSV, encoded as Shift_JIS.
///
/// # Errors
///
/// Returns an error when the CSV writer fails.
pub fn write_shift_jis_csv<H, R, F>(header: H, rows: R) -> Result<ExportedCsv, CsvError>
where
    H: IntoIterator,
    H::Item: AsRef<[u8]>,
    R: IntoIterator<Item = F>,
    F: IntoIterator,
    F::Item: AsRef<[u8]>,
{
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());

    writer.write_record(header)?;
    for row in rows {
        writer.write_record(row)?;
    }
    let utf8 = writer.into_inner().map_err(|e| e.into_error())?;
    let text = String::from_utf8(utf8)?;

    let (bytes, _, replaced) = SHIFT_JIS.encode(&text);
    Ok(ExportedCsv {
        bytes: bytes.into_owned(),
        replaced,
    })
}

/// One customer as written to the export file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CustomerCsvRow {
    pub code: String,
    pub store_name: String,
    pub name: String,
    pub contact_person: String,
    pub address: String,
    pub phone: String,
    pub delivery_condition: String,
    pub note: String,
}

impl CustomerCsvRow {
    fn fields(&self) -> [&str; 8] {
        [
            self.code.as_str(),
            self.store_name.as_str(),
            self.name.as_str(),
            self.contact_person.as_str(),
            self.address.as_str(),
            self.phone.as_str(),
            self.delivery_condition.as_str(),
            self.note.as_str(),
        ]
    }
}

/// Write customers in the import layout, so an export can be edited and
/// imported again.
///
/// # Errors
///
/// Returns an error when the CSV writer fails.
pub fn write_customer_csv(rows: &[CustomerCsvRow]) -> Result<ExportedCsv, CsvError> {
    write_shift_jis_csv(HEADERS, rows.iter().map(CustomerCsvRow::fields))
}
