//! Customer CSV round trips through the public core API.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use tradedesk_core::customer_csv::{
    CustomerCsvRow, HEADERS, decode, import_customer_csv, write_customer_csv,
};

fn row(code: &str, store: &str, name: &str) -> CustomerCsvRow {
    CustomerCsvRow {
        code: code.to_string(),
        store_name: store.to_string(),
        name: name.to_string(),
        address: "大阪府大阪市北区1-2-3".to_string(),
        phone: "06-1234-5678".to_string(),
        ..CustomerCsvRow::default()
    }
}

#[test]
fn test_exported_file_imports_cleanly() {
    let rows = vec![row("C-001", "本店", "佐藤商店"), row("C-002", "本店", "山田食品")];
    let exported = write_customer_csv(&rows).unwrap();
    assert!(!exported.replaced);

    let report = import_customer_csv(&exported.bytes, "本店");
    assert!(report.is_importable(), "{:?}", report.error_messages());
    assert!(report.warnings.is_empty(), "{:?}", report.warning_messages());
    assert_eq!(report.records.len(), 2);
    assert_eq!(report.records[1].customer.name, "山田食品");
    assert_eq!(
        report.records[0].customer.phone.as_ref().map(|p| p.as_str()),
        Some("06-1234-5678")
    );
}

#[test]
fn test_export_is_shift_jis_with_crlf() {
    let exported = write_customer_csv(&[row("C-001", "本店", "佐藤商店")]).unwrap();
    assert!(std::str::from_utf8(&exported.bytes).is_err());
    assert!(exported.bytes.windows(2).any(|w| w == b"\r\n"));

    let decoded = decode(&exported.bytes);
    assert!(!decoded.had_errors);
    assert!(decoded.text.starts_with(&HEADERS.join(",")));
}

#[test]
fn test_rows_for_another_store_are_imported_with_warning() {
    let exported = write_customer_csv(&[row("C-001", "支店", "佐藤商店")]).unwrap();
    let report = import_customer_csv(&exported.bytes, "本店");
    assert!(report.is_importable());
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.records[0].store_name.as_deref(), Some("支店"));
}

#[test]
fn test_duplicate_codes_are_rejected() {
    let rows = vec![row("C-001", "本店", "佐藤商店"), row("C-001", "本店", "山田食品")];
    let exported = write_customer_csv(&rows).unwrap();
    let report = import_customer_csv(&exported.bytes, "本店");
    assert!(!report.is_importable());
}
