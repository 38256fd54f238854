//! Customer CSV import and export.
//!
//! Both directions use the same eight-column layout with Japanese header
//! labels. Imports are decoded from Shift_JIS (or UTF-8 with a byte order
//! mark); exports are always written as Shift_JIS with CRLF line endings.

mod decode;
mod export;
mod validate;

pub use decode::{Decoded, decode};
pub use export::{CsvError, CustomerCsvRow, ExportedCsv, write_customer_csv, write_shift_jis_csv};
pub use validate::{CustomerRecord, ImportIssue, ImportReport, validate_customer_csv};

/// Header labels, in column order.
pub const HEADERS: [&str; 8] = [
    "顧客ID",
    "店舗名",
    "顧客名",
    "担当者",
    "住所",
    "電話番号",
    "配送条件",
    "備考",
];

/// Number of columns in every row.
pub const COLUMN_COUNT: usize = HEADERS.len();

/// Indexes of columns whose header must match exactly (customer ID and name).
pub const REQUIRED_COLUMNS: &[usize] = &[0, 2];

/// Decode and validate an uploaded customer file.
///
/// Malformed byte sequences do not stop validation; they are reported as a
/// warning so the user can check the affected rows.
#[must_use]
pub fn import_customer_csv(bytes: &[u8], store_name: &str) -> ImportReport {
    let decoded = decode(bytes);
    let mut report = validate_customer_csv(&decoded.text, store_name);
    if decoded.had_errors {
        report.warnings.insert(
            0,
            ImportIssue {
                line: None,
                message: format!(
                    "some bytes could not be read as {} and were replaced",
                    decoded.encoding.name()
                ),
            },
        );
    }
    report
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    /// Header row encoded as Shift_JIS.
    fn sjis_header() -> Vec<u8> {
        let hex = "8cda8b7149442c935895dc96bc2c8cda8b7196bc2c925393968ed22c8f5a8f8a2c\
                   9364986294d48d862c947a91978ff08c8f2c94f58d6c";
        (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).unwrap())
            .collect()
    }

    #[test]
    fn test_import_shift_jis_file() {
        let mut bytes = sjis_header();
        bytes.extend_from_slice(b"\r\nC-001,,Sato,,,,,\r\n");
        let report = import_customer_csv(&bytes, "Main");
        assert!(report.is_importable(), "{:?}", report.errors);
        assert_eq!(report.records[0].customer.code.as_str(), "C-001");
    }

    #[test]
    fn test_import_utf8_with_bom() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(HEADERS.join(",").as_bytes());
        bytes.extend_from_slice("\nC-001,,佐藤商店,,,,,\n".as_bytes());
        let report = import_customer_csv(&bytes, "Main");
        assert!(report.is_importable());
        assert_eq!(report.records[0].customer.name, "佐藤商店");
    }

    #[test]
    fn test_malformed_bytes_add_a_warning() {
        let mut bytes = sjis_header();
        bytes.extend_from_slice(b"\r\nC-001,,Sato,,,,,\x82");
        let report = import_customer_csv(&bytes, "Main");
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].line, None);
        assert!(report.warnings[0].message.contains("Shift_JIS"));
    }

    #[test]
    fn test_export_then_import() {
        let rows = vec![CustomerCsvRow {
            code: "C-9".to_string(),
            store_name: "Main".to_string(),
            name: "青木食品".to_string(),
            phone: "03-0000-1111".to_string(),
            ..CustomerCsvRow::default()
        }];
        let exported = write_customer_csv(&rows).unwrap();
        let report = import_customer_csv(&exported.bytes, "Main");
        assert!(report.is_importable(), "{:?}", report.errors);
        assert!(report.warnings.is_empty());
        assert_eq!(report.records[0].customer.name, "青木食品");
    }
}
