//! Canonical CSV format: read (historical datasets, re-import) and write (output).

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use tally_core::{CanonicalRecord, Category, Direction, Result, TallyError, time::export_format};

use crate::parsers::parse_table;

/// Column headers in output order
pub const HEADERS: [&str; 8] = [
    "交易时间",
    "类型",
    "金额(元)",
    "收/支",
    "支付方式",
    "交易对方",
    "商品名称",
    "备注",
];

#[derive(Debug, Serialize, Deserialize)]
struct CanonicalRow {
    #[serde(rename = "交易时间", with = "export_format")]
    timestamp: NaiveDateTime,
    #[serde(rename = "类型", default, deserialize_with = "category_cell")]
    category: Option<Category>,
    #[serde(rename = "金额(元)")]
    amount: String,
    #[serde(rename = "收/支")]
    direction: Direction,
    #[serde(rename = "支付方式", default)]
    channel: String,
    #[serde(rename = "交易对方", default)]
    counterparty: String,
    #[serde(rename = "商品名称", default)]
    item: String,
    #[serde(rename = "备注", default)]
    note: String,
}

/// Empty cells and the "unassigned" sentinel both mean no category.
fn category_cell<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<Category>, D::Error> {
    let cell = String::deserialize(deserializer)?;
    let cell = cell.trim();
    if cell.is_empty() || cell == "unassigned" {
        return Ok(None);
    }
    cell.parse().map(Some).map_err(serde::de::Error::custom)
}

impl From<CanonicalRow> for CanonicalRecord {
    fn from(row: CanonicalRow) -> Self {
        CanonicalRecord::new(
            row.timestamp,
            row.amount,
            row.direction,
            row.channel,
            row.counterparty,
            row.item,
            row.note,
        )
        .with_category(row.category)
    }
}

impl From<&CanonicalRecord> for CanonicalRow {
    fn from(record: &CanonicalRecord) -> Self {
        Self {
            timestamp: record.timestamp,
            category: record.category(),
            amount: record.amount.clone(),
            direction: record.direction,
            channel: record.channel.clone(),
            counterparty: record.counterparty.clone(),
            item: record.item.clone(),
            note: record.note.clone(),
        }
    }
}

/// Read canonical rows, skipping blank ones. A malformed row rejects the whole input.
pub fn read_canonical_csv<R: Read>(reader: R, source_name: &str) -> Result<Vec<CanonicalRecord>> {
    let rows: Vec<CanonicalRow> = parse_table(reader, source_name)?;
    Ok(rows.into_iter().map(CanonicalRecord::from).collect())
}

pub fn read_canonical_file(path: &Path) -> Result<Vec<CanonicalRecord>> {
    let file = File::open(path).map_err(|e| TallyError::io(path, e))?;
    read_canonical_csv(file, &path.display().to_string())
}

/// Write records with a header row, in the order given.
pub fn write_canonical_csv<W: Write>(writer: W, records: &[CanonicalRecord]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(HEADERS)?;
    for record in records {
        wtr.serialize(CanonicalRow::from(record))?;
    }
    wtr.flush().map_err(|e| TallyError::io("<output>", e))?;
    Ok(())
}

/// Write a canonical file, creating parent directories as needed.
pub fn write_canonical_file(path: &Path, records: &[CanonicalRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| TallyError::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| TallyError::io(path, e))?;
    write_canonical_csv(file, records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::{CHANNEL_WECHAT_PAY, time::parse_timestamp};

    fn record(ts: &str, category: Option<Category>) -> CanonicalRecord {
        CanonicalRecord::new(
            parse_timestamp(ts).unwrap(),
            "35.00",
            Direction::Expense,
            CHANNEL_WECHAT_PAY,
            "海底捞",
            "火锅, 四人套餐",
            "",
        )
        .with_category(category)
    }

    #[test]
    fn test_header_written_for_empty_output() {
        let mut out = Vec::new();
        write_canonical_csv(&mut out, &[]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "交易时间,类型,金额(元),收/支,支付方式,交易对方,商品名称,备注\n"
        );
    }

    #[test]
    fn test_export_then_reimport_keeps_fields() {
        let records = vec![
            record("2024-03-01 19:20:00", Some(Category::Dining)),
            record("2024-03-02 12:00:00", None),
        ];
        let mut out = Vec::new();
        write_canonical_csv(&mut out, &records).unwrap();

        let text = String::from_utf8(out.clone()).unwrap();
        assert!(text.contains("2024/03/01 19:20:00,餐饮,35.00,支出,微信支付,海底捞,\"火锅, 四人套餐\","));

        let back = read_canonical_csv(out.as_slice(), "out.csv").unwrap();
        assert_eq!(back, records);
    }

    #[test]
    fn test_reads_english_labels_and_sentinel() {
        let text = "交易时间,类型,金额(元),收/支,支付方式,交易对方,商品名称,备注\n\
                    2024/1/5 14:03:22,living,8.00,expense,支付宝,便利店,饮料,\n\
                    2024/1/6 09:00:00,unassigned,1.00,/,支付宝,,,\n";
        let records = read_canonical_csv(text.as_bytes(), "history.csv").unwrap();
        assert_eq!(records[0].category(), Some(Category::Living));
        assert_eq!(records[1].category(), None);
        assert_eq!(records[1].direction, Direction::NotApplicable);
    }

    #[test]
    fn test_unknown_category_is_parse_error() {
        let text = "交易时间,类型,金额(元),收/支,支付方式,交易对方,商品名称,备注\n\
                    2024/1/5 14:03:22,groceries,8.00,支出,支付宝,便利店,饮料,\n";
        let err = read_canonical_csv(text.as_bytes(), "history.csv").unwrap_err();
        assert!(matches!(err, TallyError::Parse { row: 1, .. }));
    }
}
