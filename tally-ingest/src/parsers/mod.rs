pub mod alipay;
pub mod wechat;

use std::io::Read;

use serde::de::DeserializeOwned;
use tally_core::{Result, TallyError};

/// Parse a headed, comma-separated table into typed rows.
///
/// Fields are trimmed and rows whose fields are all empty are skipped; row
/// numbers in errors count the remaining data rows from 1.
/// Any row that fails to deserialize aborts the whole table.
pub(crate) fn parse_table<T: DeserializeOwned, R: Read>(table: R, source_name: &str) -> Result<Vec<T>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(table);

    let headers = rdr.headers()?.clone();
    let mut rows = Vec::new();
    let mut row_no = 0;

    for result in rdr.records() {
        let record = result.map_err(|e| TallyError::Parse {
            source_name: source_name.to_string(),
            row: row_no + 1,
            reason: e.to_string(),
        })?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        row_no += 1;
        let row = record
            .deserialize(Some(&headers))
            .map_err(|e| TallyError::Parse {
                source_name: source_name.to_string(),
                row: row_no,
                reason: e.to_string(),
            })?;
        rows.push(row);
    }

    Ok(rows)
}
