//! Provider row → canonical record mapping.

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use tally_core::{CanonicalRecord, Result, TallyError, time::parse_timestamp};

use crate::parsers::{alipay, wechat};
use crate::types::RawProviderRow;

static DECIMAL_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?\d+(?:\.\d+)?$").expect("valid regex"));

const CURRENCY_GLYPHS: [char; 2] = ['¥', '￥'];

/// Maps decoded rows of any provider into [`CanonicalRecord`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldMapper;

impl FieldMapper {
    /// Map a single row. `row_no` is the 1-based data row used in errors.
    pub fn map(&self, row: RawProviderRow, source_name: &str, row_no: usize) -> Result<CanonicalRecord> {
        let mapped = match row {
            RawProviderRow::Alipay(r) => alipay::map_row(r),
            RawProviderRow::Wechat(r) => wechat::map_row(r),
        };
        mapped.map_err(|reason| TallyError::Parse {
            source_name: source_name.to_string(),
            row: row_no,
            reason,
        })
    }

    /// Map every row of a file; the first failure rejects the whole file.
    pub fn map_all(&self, rows: Vec<RawProviderRow>, source_name: &str) -> Result<Vec<CanonicalRecord>> {
        rows.into_iter()
            .enumerate()
            .map(|(i, row)| self.map(row, source_name, i + 1))
            .collect()
    }
}

pub(crate) fn parse_row_timestamp(text: &str) -> std::result::Result<NaiveDateTime, String> {
    parse_timestamp(text).ok_or_else(|| format!("invalid timestamp '{text}'"))
}

/// Strip currency glyphs and check the rest is a plain decimal.
pub(crate) fn normalize_amount(text: &str) -> std::result::Result<String, String> {
    let amount: String = text.chars().filter(|c| !CURRENCY_GLYPHS.contains(c)).collect();
    let amount = amount.trim();
    if !DECIMAL_AMOUNT.is_match(amount) {
        return Err(format!("invalid amount '{text}'"));
    }
    Ok(amount.to_string())
}
