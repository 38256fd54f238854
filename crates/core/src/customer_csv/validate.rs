//! Structural and per-row validation of customer CSV files.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use super::{COLUMN_COUNT, HEADERS, REQUIRED_COLUMNS};
use crate::forms::{CustomerDraft, CustomerForm};

/// One finding of the validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportIssue {
    /// 1-based physical line in the file, when the issue belongs to a line.
    pub line: Option<u64>,
    /// Human-readable message.
    pub message: String,
}

impl ImportIssue {
    fn file(message: impl Into<String>) -> Self {
        Self {
            line: None,
            message: message.into(),
        }
    }

    fn at(line: u64, message: impl Into<String>) -> Self {
        Self {
            line: Some(line),
            message: message.into(),
        }
    }
}

impl fmt::Display for ImportIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {line}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// A customer row that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerRecord {
    /// Line the row was read from.
    pub line: u64,
    /// Store name column as written in the file.
    pub store_name: Option<String>,
    /// The validated customer.
    pub customer: CustomerDraft,
}

/// Result of validating a customer CSV file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Rows without errors.
    pub records: Vec<CustomerRecord>,
    /// Problems that do not block the import.
    pub warnings: Vec<ImportIssue>,
    /// Problems that block the import.
    pub errors: Vec<ImportIssue>,
}

impl ImportReport {
    /// Whether the file can be imported: no errors and at least one row.
    #[must_use]
    pub fn is_importable(&self) -> bool {
        self.errors.is_empty() && !self.records.is_empty()
    }

    /// Error messages, line-prefixed.
    #[must_use]
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    /// Warning messages, line-prefixed.
    #[must_use]
    pub fn warning_messages(&self) -> Vec<String> {
        self.warnings.iter().map(ToString::to_string).collect()
    }

    fn error(&mut self, issue: ImportIssue) {
        self.errors.push(issue);
    }

    fn warning(&mut self, issue: ImportIssue) {
        self.warnings.push(issue);
    }
}

fn is_blank(record: &csv::StringRecord) -> bool {
    record.iter().all(|field| field.trim().is_empty())
}

fn line_of(record: &csv::StringRecord) -> u64 {
    record.position().map_or(0, csv::Position::line)
}

/// Validate decoded customer CSV text.
///
/// `store_name` is the name of the store the rows will be imported into;
/// rows naming a different store produce a warning.
#[must_use]
pub fn validate_customer_csv(text: &str, store_name: &str) -> ImportReport {
    let mut report = ImportReport::default();
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut header: Option<csv::StringRecord> = None;
    let mut seen: HashMap<String, u64> = HashMap::new();
    let mut data_rows = 0usize;

    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                let line = e.position().map(csv::Position::line);
                report.error(ImportIssue {
                    line,
                    message: format!("could not be read: {e}"),
                });
                continue;
            }
        };

        if is_blank(&record) {
            continue;
        }

        if header.is_none() {
            if !check_header(&record, &mut report) {
                return report;
            }
            header = Some(record);
            continue;
        }

        data_rows += 1;
        check_row(&record, store_name, &mut seen, &mut report);
    }

    if header.is_none() {
        report.error(ImportIssue::file("CSV file is empty"));
    } else if data_rows == 0 {
        report.error(ImportIssue::file("no customer rows found"));
    }

    report
}

/// Returns `false` when the header is unusable and rows should not be read.
fn check_header(record: &csv::StringRecord, report: &mut ImportReport) -> bool {
    let line = line_of(record);
    if record.len() != COLUMN_COUNT {
        report.error(ImportIssue::at(
            line,
            format!(
                "header must have {COLUMN_COUNT} columns, found {}",
                record.len()
            ),
        ));
        return false;
    }

    let mut usable = true;
    for (index, (found, expected)) in record.iter().zip(HEADERS).enumerate() {
        if found == expected {
            continue;
        }
        if REQUIRED_COLUMNS.contains(&index) {
            report.error(ImportIssue::at(
                line,
                format!("required column \"{expected}\" is missing (found \"{found}\")"),
            ));
            usable = false;
        } else {
            report.warning(ImportIssue::at(
                line,
                format!(
                    "column {} is headed \"{found}\", expected \"{expected}\"",
                    index + 1
                ),
            ));
        }
    }
    usable
}

fn field(record: &csv::StringRecord, index: usize) -> String {
    record.get(index).unwrap_or_default().to_string()
}

fn check_row(
    record: &csv::StringRecord,
    store_name: &str,
    seen: &mut HashMap<String, u64>,
    report: &mut ImportReport,
) {
    let line = line_of(record);
    if record.len() != COLUMN_COUNT {
        report.error(ImportIssue::at(
            line,
            format!(
                "expected {COLUMN_COUNT} fields, found {}",
                record.len()
            ),
        ));
        return;
    }

    let form = CustomerForm {
        code: field(record, 0),
        name: field(record, 2),
        contact_person: field(record, 3),
        address: field(record, 4),
        phone: field(record, 5),
        delivery_condition: field(record, 6),
        note: field(record, 7),
    };
    let row_store = field(record, 1);

    let mut row_ok = true;

    let code = form.code.trim().to_string();
    if !code.is_empty() {
        if let Some(first) = seen.get(&code) {
            report.error(ImportIssue::at(
                line,
                format!("customer ID \"{code}\" already appears on line {first}"),
            ));
            row_ok = false;
        } else {
            seen.insert(code, line);
        }
    }

    if !row_store.is_empty() && row_store != store_name {
        report.warning(ImportIssue::at(
            line,
            format!(
                "store \"{row_store}\" differs from the selected store \"{store_name}\"; the row is imported into \"{store_name}\""
            ),
        ));
    }

    match form.validate() {
        Ok(customer) if row_ok => report.records.push(CustomerRecord {
            line,
            store_name: (!row_store.is_empty()).then_some(row_store),
            customer,
        }),
        Ok(_) => {}
        Err(errors) => {
            for error in &errors {
                report.error(ImportIssue::at(line, error.message.clone()));
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const HEADER: &str = "顧客ID,店舗名,顧客名,担当者,住所,電話番号,配送条件,備考";

    fn csv_text(rows: &[&str]) -> String {
        let mut text = String::from(HEADER);
        for row in rows {
            text.push_str("\r\n");
            text.push_str(row);
        }
        text
    }

    #[test]
    fn test_valid_file() {
        let text = csv_text(&[
            "C-001,Main,Sato Shoten,Sato,Osaka,06-1234-5678,AM only,",
            "C-002,,Aoki Foods,,Tokyo,,,\"likes, commas\"",
        ]);
        let report = validate_customer_csv(&text, "Main");
        assert!(report.is_importable(), "{:?}", report.errors);
        assert!(report.warnings.is_empty());
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[0].line, 2);
        assert_eq!(report.records[0].store_name.as_deref(), Some("Main"));
        assert_eq!(
            report.records[1].customer.note.as_deref(),
            Some("likes, commas")
        );
    }

    #[test]
    fn test_empty_file() {
        let report = validate_customer_csv("\r\n\r\n", "Main");
        assert_eq!(report.error_messages(), vec!["CSV file is empty"]);
        assert!(!report.is_importable());
    }

    #[test]
    fn test_header_only() {
        let report = validate_customer_csv(HEADER, "Main");
        assert_eq!(report.error_messages(), vec!["no customer rows found"]);
    }

    #[test]
    fn test_header_column_count() {
        let report = validate_customer_csv("顧客ID,顧客名\nC-1,Sato", "Main");
        assert_eq!(
            report.error_messages(),
            vec!["line 1: header must have 8 columns, found 2"]
        );
        assert!(report.records.is_empty());
    }

    #[test]
    fn test_missing_required_column() {
        let text = "ID,店舗名,顧客名,担当者,住所,電話番号,配送条件,備考\nC-1,,Sato,,,,,";
        let report = validate_customer_csv(text, "Main");
        assert_eq!(
            report.error_messages(),
            vec!["line 1: required column \"顧客ID\" is missing (found \"ID\")"]
        );
        assert!(report.records.is_empty());
    }

    #[test]
    fn test_renamed_optional_column_is_a_warning() {
        let text = "顧客ID,店舗,顧客名,担当者,住所,電話番号,配送条件,備考\nC-1,,Sato,,,,,";
        let report = validate_customer_csv(text, "Main");
        assert!(report.is_importable());
        assert_eq!(
            report.warning_messages(),
            vec!["line 1: column 2 is headed \"店舗\", expected \"店舗名\""]
        );
    }

    #[test]
    fn test_row_field_count() {
        let text = csv_text(&["C-1,,Sato,,,,", "C-2,,Aoki,,,,,"]);
        let report = validate_customer_csv(&text, "Main");
        assert_eq!(
            report.error_messages(),
            vec!["line 2: expected 8 fields, found 7"]
        );
        assert_eq!(report.records.len(), 1);
        assert!(!report.is_importable());
    }

    #[test]
    fn test_row_format_errors() {
        let text = csv_text(&["C 1,,,,,phone?,,"]);
        let report = validate_customer_csv(&text, "Main");
        assert_eq!(report.errors.len(), 3);
        assert!(report.errors.iter().all(|e| e.line == Some(2)));
        assert_eq!(
            report.errors[1].to_string(),
            "line 2: customer name is required"
        );
    }

    #[test]
    fn test_duplicate_customer_id() {
        let text = csv_text(&["C-1,,Sato,,,,,", "", "C-1,,Aoki,,,,,"]);
        let report = validate_customer_csv(&text, "Main");
        assert_eq!(
            report.error_messages(),
            vec!["line 4: customer ID \"C-1\" already appears on line 2"]
        );
    }

    #[test]
    fn test_other_store_is_a_warning() {
        let text = csv_text(&["C-1,Branch,Sato,,,,,"]);
        let report = validate_customer_csv(&text, "Main");
        assert!(report.is_importable());
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].message.contains("\"Branch\""));
    }

    #[test]
    fn test_blank_and_comma_only_lines_are_skipped() {
        let text = csv_text(&[",,,,,,,", "C-1,,Sato,,,,,", "   "]);
        let report = validate_customer_csv(&text, "Main");
        assert!(report.is_importable(), "{:?}", report.errors);
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].line, 3);
    }

    #[test]
    fn test_fields_are_trimmed() {
        let text = csv_text(&["  C-1 , Main ,  Sato  ,,,,,"]);
        let report = validate_customer_csv(&text, "Main");
        assert!(report.warnings.is_empty());
        assert_eq!(report.records[0].customer.name, "Sato");
        assert_eq!(report.records[0].customer.code.as_str(), "C-1");
    }

    #[test]
    fn test_bom_before_header() {
        let text = format!("\u{feff}{}", csv_text(&["C-1,,Sato,,,,,"]));
        let report = validate_customer_csv(&text, "Main");
        assert!(report.is_importable());
    }
}
